//! api description endpoint

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use chronicle_chain::CLIENT_ID_HEADER;
use chronicle_db::Database;
use serde::Serialize;

use super::{ApiError, Envelope, ResultExt, ok};
use crate::LedgerContext;

#[derive(Debug, Serialize)]
pub struct Route {
    uri: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'static str>,
}

const fn route(uri: &'static str, description: &'static str) -> Route {
    Route {
        uri,
        description,
        note: None,
    }
}

#[derive(Debug, Serialize)]
pub struct IndexResults {
    #[serde(rename = "public-key")]
    public_key: String,
    routes: Vec<Route>,
}

/// GET /chronicle
///
/// the server's public key and the routes available to the caller. publish,
/// register and revoke are only listed for a registered client naming
/// itself in the client id header.
pub async fn index(
    State(ctx): State<LedgerContext>,
    headers: HeaderMap,
) -> Result<Json<Envelope<IndexResults>>, ApiError> {
    let mut routes = vec![
        route("/chronicle/lasthash", "latest entry of this chronicle"),
        route("/chronicle/lookup/{hash}", "entries matching a hash"),
        route("/chronicle/since/{hash}", "entries after a hash"),
        route("/chronicle/export", "the entire chain"),
        route("/chronicle/replica", "chronicles replicated onto this one"),
        route("/chronicle", "api description"),
    ];

    let client_id = headers.get(CLIENT_ID_HEADER).and_then(|v| v.to_str().ok());
    if let Some(client_id) = client_id
        && let Some(client) = ctx
            .db
            .get_client_by_public_id(client_id)
            .await
            .map_internal()?
    {
        routes.push(Route {
            note: Some("approved clients only"),
            ..route("/chronicle/publish", "publish a new message")
        });
        if client.is_admin {
            routes.push(Route {
                note: Some("administrators only"),
                ..route("/chronicle/register", "approve a new client")
            });
            routes.push(Route {
                note: Some("administrators only"),
                ..route("/chronicle/revoke", "revoke a client")
            });
        }
    }

    Ok(ok(IndexResults {
        public_key: ctx.signing_key.public_key().to_base64(),
        routes,
    }))
}
