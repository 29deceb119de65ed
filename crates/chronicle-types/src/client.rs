//! clients allowed to publish to this instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// a registered publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// database id.
    pub id: u64,

    /// identifier sent in the `Chronicle-Client-Key-ID` header.
    pub public_id: String,

    /// base64url ed25519 key requests must be signed with.
    pub public_key: String,

    /// admins may register and revoke other clients.
    pub is_admin: bool,

    /// free-form note.
    pub comment: String,

    /// when the client was registered.
    pub created_at: DateTime<Utc>,

    /// when the client was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// create a new client; the id is assigned on insert.
    pub fn new(public_id: String, public_key: String, is_admin: bool, comment: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            public_id,
            public_key,
            is_admin,
            comment,
            created_at: now,
            updated_at: now,
        }
    }
}
