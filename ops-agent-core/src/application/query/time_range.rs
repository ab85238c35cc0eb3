//! Default time window injection for configured queries.

use crate::config::{ConfigError, QuerySpec, parse_duration};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Argument names that mark a query as already carrying a time window.
pub const TIME_PARAM_KEYS: [&str; 7] = [
    "start_time",
    "end_time",
    "since",
    "duration",
    "time_range",
    "from",
    "to",
];

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const FALLBACK_RANGE: Duration = Duration::from_secs(3_600);

pub fn parse_time_range(range: &str) -> Result<Duration, ConfigError> {
    parse_duration(range)
}

pub fn has_time_params(query: &QuerySpec) -> bool {
    TIME_PARAM_KEYS.iter().any(|key| query.args.contains_key(*key))
}

/// Add a time window ending now. See [`add_time_params_at`].
pub fn add_time_params(query: &mut QuerySpec, range: &str, param_names: Option<&str>) -> bool {
    add_time_params_at(query, range, param_names, Utc::now())
}

/// Add a time window ending at `now` unless the query already has one.
///
/// Event tools (`get-events*`) take a unix-seconds `start_time`. Other tools get ISO
/// timestamps under the configured names: two names receive start and end, a single
/// `duration`/`time_range` name receives the range itself, any other single name the
/// start. Without names, or with more than two, `start_time`/`end_time` are used.
/// Returns whether anything was added.
pub fn add_time_params_at(
    query: &mut QuerySpec,
    range: &str,
    param_names: Option<&str>,
    now: DateTime<Utc>,
) -> bool {
    let Some(tool_name) = query.tool_name.clone() else {
        return false;
    };
    if has_time_params(query) {
        debug!(tool = %tool_name, "Query already carries a time window");
        return false;
    }

    let window = parse_time_range(range).unwrap_or_else(|err| {
        warn!(range, %err, "Invalid time range, falling back to 1h");
        FALLBACK_RANGE
    });
    let start = window_start(now, window).unwrap_or_else(|| {
        warn!(range, "Time range exceeds the representable window, falling back to 1h");
        now - ChronoDuration::seconds(FALLBACK_RANGE.as_secs() as i64)
    });

    if tool_name.to_lowercase().contains("get-events") {
        query.args.insert(
            "start_time".into(),
            Value::String(start.timestamp().to_string()),
        );
        return true;
    }

    let start_iso = start.format(ISO_FORMAT).to_string();
    let end_iso = now.format(ISO_FORMAT).to_string();
    let names: Vec<&str> = param_names
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    match names.as_slice() {
        [] => {
            query.args.insert("start_time".into(), Value::String(start_iso));
            query.args.insert("end_time".into(), Value::String(end_iso));
        }
        [single] if matches!(*single, "duration" | "time_range") => {
            query.args.insert(single.to_string(), Value::String(range.to_string()));
        }
        [single] => {
            query.args.insert(single.to_string(), Value::String(start_iso));
        }
        [start_name, end_name] => {
            query.args.insert(start_name.to_string(), Value::String(start_iso));
            query.args.insert(end_name.to_string(), Value::String(end_iso));
        }
        _ => {
            debug!(tool = %tool_name, ?names, "More than two time parameter names, using defaults");
            query.args.insert("start_time".into(), Value::String(start_iso));
            query.args.insert("end_time".into(), Value::String(end_iso));
        }
    }
    true
}

fn window_start(now: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(window.as_secs()).ok()?;
    now.checked_sub_signed(ChronoDuration::try_seconds(seconds)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 13, 12, 0, 0).single().expect("valid date")
    }

    #[test]
    fn existing_time_params_are_left_alone() {
        for key in TIME_PARAM_KEYS {
            let mut query = QuerySpec::new("search-logs").with_arg(key, "now-2h");
            let before = query.args.clone();
            assert!(!add_time_params_at(&mut query, "1h", None, fixed_now()));
            assert_eq!(query.args, before, "{key} should suppress defaults");
        }
    }

    #[test]
    fn default_names_receive_iso_window() {
        let mut query = QuerySpec::new("query-prometheus").with_arg("query", "up");
        assert!(add_time_params_at(&mut query, "30m", None, fixed_now()));
        assert_eq!(query.args["start_time"], json!("2024-05-13T11:30:00Z"));
        assert_eq!(query.args["end_time"], json!("2024-05-13T12:00:00Z"));
    }

    #[test]
    fn event_tools_get_unix_start_only() {
        let mut query = QuerySpec::new("get-events-from-ops");
        assert!(add_time_params_at(&mut query, "1h", Some("from,to"), fixed_now()));
        let expected = (fixed_now().timestamp() - 3_600).to_string();
        assert_eq!(query.args["start_time"], json!(expected));
        assert!(!query.args.contains_key("end_time"));
        assert!(!query.args.contains_key("from"));
    }

    #[test]
    fn configured_names_are_honoured() {
        let mut pair = QuerySpec::new("search-logs");
        add_time_params_at(&mut pair, "1h", Some("begin, finish"), fixed_now());
        assert_eq!(pair.args["begin"], json!("2024-05-13T11:00:00Z"));
        assert_eq!(pair.args["finish"], json!("2024-05-13T12:00:00Z"));

        let mut range_only = QuerySpec::new("search-logs");
        add_time_params_at(&mut range_only, "6h", Some("duration"), fixed_now());
        assert_eq!(range_only.args["duration"], json!("6h"));

        let mut start_only = QuerySpec::new("search-logs");
        add_time_params_at(&mut start_only, "1h", Some("after"), fixed_now());
        assert_eq!(start_only.args["after"], json!("2024-05-13T11:00:00Z"));
    }

    #[test]
    fn oversized_range_falls_back_to_one_hour() {
        let mut query = QuerySpec::new("search-logs");
        assert!(add_time_params_at(&mut query, "100000000000000s", None, fixed_now()));
        assert_eq!(query.args["start_time"], json!("2024-05-13T11:00:00Z"));
        assert_eq!(query.args["end_time"], json!("2024-05-13T12:00:00Z"));

        let mut events = QuerySpec::new("get-events-from-ops");
        assert!(add_time_params_at(&mut events, "300000000000d", None, fixed_now()));
        let expected = (fixed_now().timestamp() - 3_600).to_string();
        assert_eq!(events.args["start_time"], json!(expected));
    }

    #[test]
    fn event_tool_match_ignores_case() {
        let mut query = QuerySpec::new("Get-Events-From-Ops");
        assert!(add_time_params_at(&mut query, "2h", None, fixed_now()));
        let expected = (fixed_now().timestamp() - 7_200).to_string();
        assert_eq!(query.args["start_time"], json!(expected));
        assert!(!query.args.contains_key("end_time"));
    }

    #[test]
    fn three_or_more_names_use_default_pair() {
        let mut query = QuerySpec::new("search-logs");
        add_time_params_at(&mut query, "1h", Some("a, b, c"), fixed_now());
        assert_eq!(query.args["start_time"], json!("2024-05-13T11:00:00Z"));
        assert_eq!(query.args["end_time"], json!("2024-05-13T12:00:00Z"));
        assert!(!query.args.contains_key("a"));
        assert!(!query.args.contains_key("b"));
    }

    #[test]
    fn query_without_tool_is_untouched() {
        let mut query = QuerySpec::default();
        assert!(!add_time_params_at(&mut query, "1h", None, fixed_now()));
        assert!(query.args.is_empty());
    }
}
