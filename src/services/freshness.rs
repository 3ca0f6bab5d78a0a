//! Freshness evaluation for persisted batches.

use chrono::{DateTime, Utc};

use crate::types::Freshness;

/// Evaluate the age of the latest persisted batch against a staleness
/// threshold. Pure function of two timestamps and one config value.
///
/// No batch at all is reported as stale with no age.
pub fn evaluate(
    last_computed: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    staleness_secs: i64,
) -> Freshness {
    match last_computed {
        Some(computed_at) => {
            let age_seconds = (now - computed_at).num_seconds();
            Freshness {
                age_seconds: Some(age_seconds),
                is_stale: age_seconds > staleness_secs,
            }
        }
        None => Freshness {
            age_seconds: None,
            is_stale: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fresh_batch() {
        let now = Utc::now();
        let fresh = evaluate(Some(now - Duration::seconds(120)), now, 3600);
        assert_eq!(fresh.age_seconds, Some(120));
        assert!(!fresh.is_stale);
    }

    #[test]
    fn test_stale_batch() {
        let now = Utc::now();
        let stale = evaluate(Some(now - Duration::seconds(7200)), now, 3600);
        assert_eq!(stale.age_seconds, Some(7200));
        assert!(stale.is_stale);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let now = Utc::now();
        let at_threshold = evaluate(Some(now - Duration::seconds(3600)), now, 3600);
        assert!(!at_threshold.is_stale);
    }

    #[test]
    fn test_no_batch_is_stale() {
        let fresh = evaluate(None, Utc::now(), 3600);
        assert_eq!(fresh.age_seconds, None);
        assert!(fresh.is_stale);
    }
}
