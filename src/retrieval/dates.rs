//! Soft release-date preference.

use super::SearchHit;
use crate::error::{PodsiftError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Inclusive range of release dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(PodsiftError::InvalidInput(format!(
                "Date range start {} is after its end {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// Parse a range from two `YYYY-MM-DD` strings.
    pub fn parse(from: &str, to: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|e| PodsiftError::InvalidInput(format!("Invalid date '{}': {}", s, e)))
        };
        Self::new(parse(from)?, parse(to)?)
    }

    /// Optional range from optional bounds; both or neither must be given.
    pub fn from_bounds(from: Option<&str>, to: Option<&str>) -> Result<Option<Self>> {
        match (from, to) {
            (Some(from), Some(to)) => Self::parse(from, to).map(Some),
            (None, None) => Ok(None),
            _ => Err(PodsiftError::InvalidInput(
                "A date range needs both a start and an end date".to_string(),
            )),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Parse a release date of the form `YYYY-MM-DD`, optionally followed by a
/// space-separated time part.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split_whitespace().next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Tag hits with `in_date_range` and prefer in-range ones.
///
/// Without a range every hit is tagged in range and returned unchanged.
/// With a range, in-range hits come first in rank order (at most
/// `pool_size` of them), followed by out-of-range backfill. Backfill is
/// bounded by both half of `requested`, the number of results the caller
/// will keep, and the slots the in-range hits left free within it. Hits
/// with a missing or unparseable date count as out of range.
pub fn apply_date_preference(
    hits: Vec<SearchHit>,
    range: Option<&DateRange>,
    pool_size: usize,
    requested: usize,
) -> Vec<SearchHit> {
    let Some(range) = range else {
        return hits
            .into_iter()
            .map(|mut h| {
                h.in_date_range = true;
                h
            })
            .collect();
    };

    let (mut in_range, out_of_range): (Vec<SearchHit>, Vec<SearchHit>) = hits
        .into_iter()
        .map(|mut h| {
            h.in_date_range = h
                .chunk
                .episode
                .release_date
                .as_deref()
                .and_then(parse_release_date)
                .is_some_and(|d| range.contains(d));
            h
        })
        .partition(|h| h.in_date_range);

    in_range.truncate(pool_size);
    let backfill = (requested / 2).min(requested.saturating_sub(in_range.len()));

    debug!(
        "{} hits in date range, {} backfill slots",
        in_range.len(),
        backfill
    );

    in_range.extend(out_of_range.into_iter().take(backfill));
    in_range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_support::chunk;
    use crate::vector_store::ScoredChunk;

    fn hit(rank: usize, release_date: Option<&str>) -> SearchHit {
        let mut c = chunk(&format!("ep{}", rank), 0, 100.0, "text");
        c.episode.release_date = release_date.map(str::to_string);
        SearchHit::from(ScoredChunk {
            chunk: c,
            score: 1.0 - rank as f32 / 100.0,
        })
    }

    fn h1_2023() -> DateRange {
        DateRange::parse("2023-01-01", "2023-06-30").unwrap()
    }

    #[test]
    fn test_parse_release_date() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 14);
        assert_eq!(parse_release_date("2023-03-14"), expected);
        assert_eq!(parse_release_date("2023-03-14 08:30:00"), expected);
        assert_eq!(parse_release_date("14/03/2023"), None);
        assert_eq!(parse_release_date(""), None);
    }

    #[test]
    fn test_in_range_hits_precede_bounded_backfill() {
        // Odd ranks below 16 are in range: 8 of 20.
        let hits: Vec<SearchHit> = (0..20)
            .map(|i| {
                if i % 2 == 1 && i < 16 {
                    hit(i, Some("2023-03-01"))
                } else {
                    hit(i, Some("2022-03-01"))
                }
            })
            .collect();

        let requested = 10;
        let result = apply_date_preference(hits, Some(&h1_2023()), 25, requested);

        let in_range: Vec<&SearchHit> = result.iter().filter(|h| h.in_date_range).collect();
        assert_eq!(in_range.len(), 8);
        assert!(result[..8].iter().all(|h| h.in_date_range));
        assert!(result[8..].iter().all(|h| !h.in_date_range));

        let backfill = result.len() - 8;
        assert!(backfill <= requested - 8);
        assert!(backfill <= requested / 2);

        // Rank order is kept within each group.
        let ranks: Vec<&str> = result.iter().map(|h| h.episode_id()).collect();
        assert_eq!(
            ranks,
            vec!["ep1", "ep3", "ep5", "ep7", "ep9", "ep11", "ep13", "ep15", "ep0", "ep2"]
        );
    }

    #[test]
    fn test_narrow_range_still_returns_results() {
        let hits: Vec<SearchHit> = (0..20).map(|i| hit(i, Some("2021-01-01"))).collect();
        let result = apply_date_preference(hits, Some(&h1_2023()), 25, 10);

        assert_eq!(result.len(), 5);
        assert!(result.iter().all(|h| !h.in_date_range));
    }

    #[test]
    fn test_backfill_follows_requested_not_pool() {
        let hits: Vec<SearchHit> = (0..20)
            .map(|i| hit(i, Some(if i == 0 { "2023-03-01" } else { "2022-03-01" })))
            .collect();
        let result = apply_date_preference(hits, Some(&h1_2023()), 25, 10);

        assert_eq!(result.len(), 6);
        assert!(result[0].in_date_range);
        assert_eq!(result.iter().filter(|h| !h.in_date_range).count(), 5);
    }

    #[test]
    fn test_in_range_beyond_requested_leaves_no_backfill() {
        let hits: Vec<SearchHit> = (0..12)
            .map(|i| hit(i, Some(if i < 8 { "2023-03-01" } else { "2022-03-01" })))
            .collect();
        let result = apply_date_preference(hits, Some(&h1_2023()), 25, 5);

        assert_eq!(result.len(), 8);
        assert!(result.iter().all(|h| h.in_date_range));
    }

    #[test]
    fn test_missing_dates_are_out_of_range() {
        let hits = vec![hit(0, None), hit(1, Some("not a date")), hit(2, Some("2023-02-02 10:00:00"))];
        let result = apply_date_preference(hits, Some(&h1_2023()), 25, 4);

        assert_eq!(result[0].episode_id(), "ep2");
        assert!(result[0].in_date_range);
        assert_eq!(result.len(), 3);
        assert!(!result[1].in_date_range);
    }

    #[test]
    fn test_no_range_tags_everything() {
        let mut hits = vec![hit(0, None), hit(1, Some("2020-01-01"))];
        hits[0].in_date_range = false;

        let result = apply_date_preference(hits, None, 25, 1);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|h| h.in_date_range));
    }

    #[test]
    fn test_from_bounds_requires_both_ends() {
        assert_eq!(DateRange::from_bounds(None, None).unwrap(), None);
        assert_eq!(
            DateRange::from_bounds(Some("2023-01-01"), Some("2023-06-30")).unwrap(),
            Some(h1_2023())
        );
        assert!(matches!(
            DateRange::from_bounds(Some("2023-01-01"), None),
            Err(PodsiftError::InvalidInput(_))
        ));
        assert!(DateRange::from_bounds(None, Some("2023-06-30")).is_err());
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        assert!(DateRange::parse("2023-06-30", "2023-01-01").is_err());
        assert!(DateRange::parse("2023-13-01", "2023-12-31").is_err());
    }
}
