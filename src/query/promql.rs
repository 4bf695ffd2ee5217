//! PromQL range conversion
//!
//! A PromQL expression is evaluated by the telemetry package over a range of
//! Unix seconds. Dense requests are downsampled so a range never yields more
//! than `max_points` samples, and the start is aligned to the step so
//! successive refreshes sample the same instants.

use super::spec::TimeWindow;
use super::templates::{DeploymentVariant, TemplateKind};

/// Default upper bound on samples per range
pub const MAX_DATA_POINTS: i64 = 720;

/// Normalized range bounds in Unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeBounds {
    pub from: i64,
    pub to: i64,
    pub step: i64,
}

/// Compute the step actually used for a range.
///
/// Keeps `step` unless the span holds more than `max_points` samples, in
/// which case the step becomes `ceil(span / max_points)`. The span is
/// computed in `i128`, so any pair of `i64` bounds is accepted.
pub fn normalize_step(from: i64, to: i64, step: i64, max_points: i64) -> i64 {
    let step = step.max(1);
    let max_points = i128::from(max_points.max(1));
    let span = i128::from(to) - i128::from(from);

    if span / i128::from(step) <= max_points {
        return step;
    }

    let mut widened = span / max_points;
    if span % max_points != 0 {
        widened += 1;
    }
    i64::try_from(widened).unwrap_or(i64::MAX)
}

/// Normalize the step and align `from` down to a multiple of it
pub fn range_bounds(window: &TimeWindow, step: i64, max_points: i64) -> RangeBounds {
    let (from, to) = (window.from_secs(), window.to_secs());
    let step = normalize_step(from, to, step, max_points);
    RangeBounds {
        from: from.div_euclid(step).saturating_mul(step),
        to,
        step,
    }
}

/// Build the range statement for `expr` over `window`
pub fn range_query(
    expr: &str,
    window: &TimeWindow,
    step: i64,
    max_points: i64,
    variant: DeploymentVariant,
) -> String {
    let bounds = range_bounds(window, step, max_points);
    if bounds.step != step {
        tracing::debug!(requested = step, used = bounds.step, "range step widened");
    }

    TemplateKind::RangeQuery {
        expr: expr.to_string(),
        from: bounds.from,
        to: bounds.to,
        step: bounds.step,
    }
    .render(variant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(from: i64, to: i64) -> TimeWindow {
        TimeWindow::from_unix(from, to).unwrap()
    }

    #[test]
    fn test_step_kept_when_sparse() {
        assert_eq!(normalize_step(0, 7200, 10, MAX_DATA_POINTS), 10);
        assert_eq!(normalize_step(105, 825, 10, MAX_DATA_POINTS), 10);
    }

    #[test]
    fn test_step_widened_when_dense() {
        assert_eq!(normalize_step(0, 7200, 1, MAX_DATA_POINTS), 10);
        assert_eq!(normalize_step(0, 7201, 1, MAX_DATA_POINTS), 11);
    }

    #[test]
    fn test_widened_step_bounds_point_count() {
        for (from, to, step) in [(0, 86_400, 1), (17, 100_003, 3), (1_700_000_000, 1_700_604_800, 15)] {
            let used = normalize_step(from, to, step, MAX_DATA_POINTS);
            assert!((to - from) / used <= MAX_DATA_POINTS, "{} {} {}", from, to, step);
            assert!(used >= step);
        }
    }

    #[test]
    fn test_wide_span_does_not_overflow() {
        let (from, to) = (-5_000_000_000_000_000_000, 5_000_000_000_000_000_000);
        let used = normalize_step(from, to, 1, MAX_DATA_POINTS);
        assert_eq!(used, 13_888_888_888_888_889);
        assert!((i128::from(to) - i128::from(from)) / i128::from(used) <= i128::from(MAX_DATA_POINTS));

        assert_eq!(normalize_step(i64::MIN, i64::MAX, 1, 1), i64::MAX);
        assert_eq!(normalize_step(i64::MIN, i64::MAX, i64::MAX, MAX_DATA_POINTS), i64::MAX);
    }

    #[test]
    fn test_from_aligned_down() {
        let bounds = range_bounds(&window(105, 825), 10, MAX_DATA_POINTS);
        assert_eq!(bounds, RangeBounds { from: 100, to: 825, step: 10 });

        // alignment uses the widened step
        let bounds = range_bounds(&window(1_005, 8_206), 1, MAX_DATA_POINTS);
        assert_eq!(bounds.step, 11);
        assert_eq!(bounds.from % 11, 0);
        assert!(bounds.from <= 1_005);
    }

    #[test]
    fn test_range_query_text() {
        let text = range_query("up", &window(105, 825), 10, MAX_DATA_POINTS, DeploymentVariant::Autonomous);
        assert_eq!(
            text,
            "select DBMS_CLOUD_TELEMETRY_QUERY.promql_range('up',100,825,10) from dual"
        );
    }
}
