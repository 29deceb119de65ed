//! http handlers for chronicle api endpoints.

mod admin;
mod auth;
mod error;
mod health;
mod index;
mod lookup;
mod publish;
mod replica;
mod signing;

pub use admin::{register, revoke};
pub(crate) use admin::generate_client_id;
pub use auth::{SignedRequest, validate_request_time};
pub use error::{ApiError, OptionExt, ResultExt};
pub use health::health;
pub use index::index;
pub use lookup::{export, last_hash, lookup, since};
pub use publish::publish;
pub use replica::{replica_export, replica_index, replica_last_hash, replica_lookup, replica_since};
pub use signing::sign_response;

use axum::Json;
use chrono::Utc;
use chronicle_types::format_created;
use serde::Serialize;

use crate::VERSION;

/// success envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    version: &'static str,
    datetime: String,
    status: &'static str,
    results: T,
}

/// wrap `results` in a success envelope
pub(crate) fn ok<T: Serialize>(results: T) -> Json<Envelope<T>> {
    Json(Envelope {
        version: VERSION,
        datetime: format_created(Utc::now()),
        status: "OK",
        results,
    })
}
