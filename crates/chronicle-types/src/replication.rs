//! upstream chains this instance mirrors.

use serde::{Deserialize, Serialize};

/// unique identifier for a replication source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u64);

impl From<u64> for SourceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a remote chronicle whose chain is pulled into a local mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationSource {
    /// unique identifier.
    pub id: SourceId,

    /// public, url-safe identifier used in `/replica/{uniqueid}` routes.
    pub unique_id: String,

    /// display name.
    pub name: String,

    /// base url of the upstream api, e.g. `https://example.com/chronicle`.
    pub url: String,

    /// base64url ed25519 key the upstream signs its responses with.
    pub public_key: String,
}

impl ReplicationSource {
    /// create a new source; the id is assigned on insert.
    pub fn new(unique_id: String, name: String, url: String, public_key: String) -> Self {
        Self {
            id: SourceId(0),
            unique_id,
            name,
            url,
            public_key,
        }
    }

    /// url of an upstream endpoint below the base url.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let source = ReplicationSource::new(
            "abc".into(),
            "upstream".into(),
            "https://example.com/chronicle/".into(),
            "pk".into(),
        );
        assert_eq!(source.endpoint("export"), "https://example.com/chronicle/export");
    }
}
