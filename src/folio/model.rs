use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identity and timestamps for one stored record.
///
/// Under auto-increment this is the `record` half of an [`Envelope`]. Types
/// stored with explicit identity can embed it with `#[serde(flatten)]` to get
/// the same fields at the top level of their file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy with the same identity and `created_at`, and an
    /// `updated_at` that is guaranteed to be later than the current one.
    pub fn touched(&self) -> Self {
        Self {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: next_instant(self.updated_at),
        }
    }
}

impl Identified for Record {
    fn id(&self) -> &str {
        &self.id
    }
}

/// The unit of persistence for auto-increment collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub record: Record,
    pub data: T,
}

/// A payload that knows its own identifier.
///
/// Implement this for types written through a `Driver<ExplicitId>`; the
/// returned value becomes the file name of the record.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Now, or one microsecond past `previous` when the clock hasn't moved on
/// (coarse clocks, or a clock stepped backwards).
fn next_instant(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_equal_timestamps() {
        let r = Record::new("7");
        assert_eq!(r.id, "7");
        assert_eq!(r.created_at, r.updated_at);
    }

    #[test]
    fn test_touched_moves_forward_even_from_the_future() {
        let mut r = Record::new("1");
        r.updated_at = Utc::now() + Duration::hours(1);
        let t = r.touched();
        assert!(t.updated_at > r.updated_at);
        assert_eq!(t.created_at, r.created_at);
        assert_eq!(t.id, r.id);
    }

    #[test]
    fn test_envelope_json_shape() {
        let env = Envelope {
            record: Record::new("1"),
            data: serde_json::json!({"title": "MyTitle"}),
        };
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["record"]["id"], "1");
        assert!(value["record"]["created_at"].is_string());
        assert_eq!(value["data"]["title"], "MyTitle");
    }
}
