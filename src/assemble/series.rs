//! Series grouping shared by the canonical and derived modes
//!
//! Rows are bucketed by series key in first-seen order, then each bucket is
//! sorted by time before it becomes a frame.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;

use crate::frame::{parse_time_token, FrameError, FrameResult, TimeValuePoint};

/// Parse a numeric cell; NULL reads as zero
pub(crate) fn read_number(raw: Option<&str>, column: &str) -> FrameResult<f64> {
    let text = raw.unwrap_or("0");
    text.parse::<f64>()
        .map_err(|e| FrameError::InvalidNumericValue {
            value: text.to_string(),
            column: column.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a time cell; NULL reads as epoch zero
pub(crate) fn read_time(raw: Option<&str>) -> FrameResult<DateTime<Utc>> {
    parse_time_token(raw.unwrap_or("0"))
}

/// Points grouped by series key, in first-seen key order
#[derive(Debug)]
pub(crate) struct SeriesGroups<K> {
    index: HashMap<K, usize>,
    groups: Vec<(K, Vec<TimeValuePoint>)>,
}

impl<K: Eq + Hash + Clone> SeriesGroups<K> {
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, key: K, point: TimeValuePoint) {
        match self.index.get(&key) {
            Some(&slot) => self.groups[slot].1.push(point),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push((key, vec![point]));
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.groups.len()
    }

    /// Consume the groups, each sorted by time ascending.
    ///
    /// The sort is stable so points sharing a timestamp keep row order.
    pub(crate) fn into_sorted(self) -> Vec<(K, Vec<TimeValuePoint>)> {
        self.groups
            .into_iter()
            .map(|(key, mut points)| {
                points.sort_by_key(|p| p.timestamp);
                (key, points)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(secs: i64, value: f64) -> TimeValuePoint {
        TimeValuePoint::new(DateTime::from_timestamp(secs, 0).unwrap(), value)
    }

    #[test]
    fn test_groups_keep_first_seen_order_and_sort_points() {
        let mut groups = SeriesGroups::new();
        groups.push("b".to_string(), point(30, 3.0));
        groups.push("a".to_string(), point(20, 2.0));
        groups.push("b".to_string(), point(10, 1.0));

        assert_eq!(groups.len(), 2);
        let sorted = groups.into_sorted();
        assert_eq!(sorted[0].0, "b");
        assert_eq!(sorted[0].1, vec![point(10, 1.0), point(30, 3.0)]);
        assert_eq!(sorted[1].0, "a");
    }

    #[test]
    fn test_read_number() {
        assert_eq!(read_number(Some("1.5"), "V").unwrap(), 1.5);
        assert_eq!(read_number(None, "V").unwrap(), 0.0);

        let err = read_number(Some("bad-number"), "VALUE").unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidNumericValue { ref value, ref column, .. }
                if value == "bad-number" && column == "VALUE"
        ));
    }

    #[test]
    fn test_read_time_null_is_epoch() {
        assert_eq!(read_time(None).unwrap().timestamp(), 0);
    }
}
