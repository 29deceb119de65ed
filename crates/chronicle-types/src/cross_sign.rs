//! peers this instance pushes its chain head to, and the policy deciding when.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// unique identifier for a cross-sign target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl From<u64> for TargetId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// when to push to a target. stored as json in the `policy` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossSignPolicy {
    /// push once this many entries were appended since the last push.
    #[serde(
        rename = "push-after",
        alias = "push_after",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub push_after: Option<u64>,

    /// push once this many days passed since the last push.
    #[serde(
        rename = "push-days",
        alias = "push_days",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub push_days: Option<u64>,
}

impl CrossSignPolicy {
    /// whether a push is due.
    ///
    /// with no previous run a push is always due. otherwise `push-after` is
    /// checked against the primary chain head first, then `push-days`
    /// against the last run time. a policy with neither is a configuration
    /// error.
    pub fn is_due(
        &self,
        last_run: Option<&LastRun>,
        head_sequence: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let Some(last) = last_run else {
            return Ok(true);
        };

        if let Some(after) = self.push_after {
            let after = i64::try_from(after)
                .map_err(|_| Error::Config(format!("push-after {} is out of range", after)))?;
            if head_sequence.saturating_sub(last.sequence) >= after {
                return Ok(true);
            }
        }

        match (self.push_after, self.push_days) {
            (_, Some(days)) => {
                let next = i64::try_from(days)
                    .ok()
                    .and_then(Duration::try_days)
                    .and_then(|interval| last.time.checked_add_signed(interval))
                    .ok_or_else(|| Error::Config(format!("push-days {} is out of range", days)))?;
                Ok(now >= next)
            }
            (Some(_), None) => Ok(false),
            (None, None) => Err(Error::Config(
                "cross-sign policy needs push-after or push-days".to_string(),
            )),
        }
    }
}

/// outcome of the last successful push. stored as json in `lastrun`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastRun {
    /// sequence of the primary entry that was pushed.
    #[serde(rename = "id")]
    pub sequence: i64,

    /// when the push completed.
    pub time: DateTime<Utc>,

    /// the peer's verified response body.
    pub response: serde_json::Value,
}

/// a peer chronicle that receives this instance's chain head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSignTarget {
    /// unique identifier.
    pub id: TargetId,

    /// display name.
    pub name: String,

    /// base url of the peer api.
    pub url: String,

    /// base64url ed25519 key the peer signs its responses with.
    pub public_key: String,

    /// client id this instance is registered under at the peer.
    pub client_id: Option<String>,

    /// when to push.
    pub policy: CrossSignPolicy,

    /// last successful push, if any.
    pub last_run: Option<LastRun>,
}

impl CrossSignTarget {
    /// create a new target; the id is assigned on insert.
    pub fn new(name: String, url: String, public_key: String, policy: CrossSignPolicy) -> Self {
        Self {
            id: TargetId(0),
            name,
            url,
            public_key,
            client_id: None,
            policy,
            last_run: None,
        }
    }

    /// url of a peer endpoint below the base url.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), path)
    }

    /// whether a push is due against the given primary chain head.
    pub fn needs_to_run(&self, head_sequence: i64, now: DateTime<Utc>) -> Result<bool, Error> {
        self.policy
            .is_due(self.last_run.as_ref(), head_sequence, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last_run(sequence: i64, time: DateTime<Utc>) -> LastRun {
        LastRun {
            sequence,
            time,
            response: serde_json::Value::Null,
        }
    }

    #[test]
    fn due_without_previous_run() {
        let policy = CrossSignPolicy {
            push_after: Some(5),
            push_days: None,
        };
        assert!(policy.is_due(None, 0, Utc::now()).unwrap());
    }

    #[test]
    fn push_after_counts_entries_since_last_run() {
        let policy = CrossSignPolicy {
            push_after: Some(5),
            push_days: None,
        };
        let last = last_run(10, Utc::now());
        assert!(!policy.is_due(Some(&last), 14, Utc::now()).unwrap());
        assert!(policy.is_due(Some(&last), 15, Utc::now()).unwrap());
    }

    #[test]
    fn push_days_compares_against_last_run_time() {
        let policy = CrossSignPolicy {
            push_after: None,
            push_days: Some(1),
        };
        let now = Utc::now();
        let two_days_ago = last_run(1, now - Duration::days(2));
        let hour_ago = last_run(1, now - Duration::hours(1));
        assert!(policy.is_due(Some(&two_days_ago), 1, now).unwrap());
        assert!(!policy.is_due(Some(&hour_ago), 1, now).unwrap());
    }

    #[test]
    fn push_days_still_applies_when_push_after_not_reached() {
        let policy = CrossSignPolicy {
            push_after: Some(100),
            push_days: Some(1),
        };
        let now = Utc::now();
        let last = last_run(1, now - Duration::days(3));
        assert!(policy.is_due(Some(&last), 2, now).unwrap());
    }

    #[test]
    fn empty_policy_is_a_configuration_error() {
        let policy = CrossSignPolicy::default();
        let last = last_run(1, Utc::now());
        assert!(matches!(
            policy.is_due(Some(&last), 1, Utc::now()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn out_of_range_policy_is_a_configuration_error() {
        let last = last_run(1, Utc::now());

        let policy = CrossSignPolicy {
            push_after: None,
            push_days: Some(1_000_000_000),
        };
        assert!(matches!(
            policy.is_due(Some(&last), 1, Utc::now()),
            Err(Error::Config(_))
        ));

        let policy = CrossSignPolicy {
            push_after: Some(u64::MAX),
            push_days: None,
        };
        assert!(matches!(
            policy.is_due(Some(&last), 1, Utc::now()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn policy_json_uses_dashed_keys() {
        let policy: CrossSignPolicy = serde_json::from_str(r#"{"push-after": 5}"#).unwrap();
        assert_eq!(policy.push_after, Some(5));
        let policy: CrossSignPolicy = serde_json::from_str(r#"{"push_days": 2}"#).unwrap();
        assert_eq!(policy.push_days, Some(2));
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"{"push-days":2}"#);
    }

    #[test]
    fn last_run_json_uses_id_for_sequence() {
        let json = serde_json::json!({
            "id": 42,
            "time": "2026-03-01T12:00:00+00:00",
            "response": {"status": "OK"},
        });
        let run: LastRun = serde_json::from_value(json).unwrap();
        assert_eq!(run.sequence, 42);
    }
}
