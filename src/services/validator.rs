//! Batch completeness validation.
//!
//! A computation cycle's results become a persistable batch only when
//! they cover exactly the expected sector set. Partial batches are
//! discarded, never stored.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::AppError;
use crate::types::{SectorResult, SentimentBatch, Timeframe};

/// Validate a cycle's sector results against the expected sector set.
///
/// Membership is order-independent; duplicates are rejected. On success
/// the results are reordered to the expected sector order and wrapped in
/// a new batch. Must run before any persistence call.
pub fn validate(
    timeframe: Timeframe,
    results: Vec<SectorResult>,
    expected_sectors: &[String],
    computed_at: DateTime<Utc>,
) -> Result<SentimentBatch, AppError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(results.len());
    for result in &results {
        if !seen.insert(result.sector.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Duplicate sector in batch: {}",
                result.sector
            )));
        }
    }

    let missing: Vec<String> = expected_sectors
        .iter()
        .filter(|s| !seen.contains(s.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(AppError::IncompleteBatch { missing });
    }

    let unexpected: Vec<String> = results
        .iter()
        .filter(|r| !expected_sectors.iter().any(|s| *s == r.sector))
        .map(|r| r.sector.clone())
        .collect();
    if !unexpected.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Unexpected sectors in batch: {:?}",
            unexpected
        )));
    }

    // Reorder into configured sector order.
    let mut by_sector: std::collections::HashMap<String, SectorResult> = results
        .into_iter()
        .map(|r| (r.sector.clone(), r))
        .collect();
    let sectors = expected_sectors
        .iter()
        .filter_map(|s| by_sector.remove(s))
        .collect();

    Ok(SentimentBatch {
        id: Uuid::new_v4(),
        timeframe,
        computed_at,
        sectors,
    })
}
