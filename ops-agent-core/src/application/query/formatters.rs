//! Render MCP tool results as compact text for reports and LLM prompts.

use serde_json::{Map, Value};
use tracing::warn;

const INTERNAL_LABELS: [&str; 5] = ["__name__", "job", "instance", "prometheus", "replica"];
const NODE_LABELS: [&str; 4] = ["node", "instance", "host", "hostname"];
const PRIORITY_LABELS: [&str; 4] = [
    "request_uri",
    "code",
    "destination_app",
    "destination_workload_namespace",
];
const OBJECT_PREVIEW_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatter {
    /// Prometheus vectors as `- label, label: value`.
    Metrics,
    /// Aggregation buckets, top five per aggregation.
    AtmsLogs,
    /// Top five ingress nodes by hit count.
    IngressLogs,
    /// Log entries with cluster/namespace/pod plus top-ten statistics.
    GeneralLogs,
    /// Pretty-printed JSON.
    Default,
}

impl Formatter {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "metrics-formatter" => Some(Self::Metrics),
            "atms-logs-formatter" => Some(Self::AtmsLogs),
            "ingress-logs-formatter" => Some(Self::IngressLogs),
            "general-logs-formatter" => Some(Self::GeneralLogs),
            "default" => Some(Self::Default),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Metrics => "metrics-formatter",
            Self::AtmsLogs => "atms-logs-formatter",
            Self::IngressLogs => "ingress-logs-formatter",
            Self::GeneralLogs => "general-logs-formatter",
            Self::Default => "default",
        }
    }

    /// Explicit name first, otherwise inferred from the tool name.
    pub fn select(explicit: Option<&str>, tool_name: Option<&str>) -> Self {
        if let Some(name) = explicit {
            match Self::from_name(name) {
                Some(formatter) => return formatter,
                None => warn!(formatter = name, "Unknown formatter, inferring from tool"),
            }
        }
        let tool = tool_name.unwrap_or_default().to_lowercase();
        if tool.contains("metric") || tool.contains("prometheus") {
            Self::Metrics
        } else if tool.contains("log") || tool.contains("elasticsearch") {
            Self::GeneralLogs
        } else {
            Self::Default
        }
    }

    /// Format decoded content items (see `ToolCallResult::json_items`).
    pub fn format(&self, items: &[Value]) -> String {
        match self {
            Self::Metrics => format_metrics(items),
            Self::AtmsLogs => format_aggregations(items),
            Self::IngressLogs => format_ingress(items),
            Self::GeneralLogs => format_general_logs(items),
            Self::Default => format_default(items),
        }
    }
}

fn single_or_array(items: &[Value]) -> Value {
    match items {
        [single] => single.clone(),
        many => Value::Array(many.to_vec()),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}...")
    }
}

/// Occurrence counter that keeps first-seen order for ties.
#[derive(Default)]
struct Tally(Vec<(String, usize)>);

impl Tally {
    fn add(&mut self, key: &str) {
        match self.0.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, count)) => *count += 1,
            None => self.0.push((key.to_string(), 1)),
        }
    }

    fn top(&self, limit: usize) -> Vec<(String, usize)> {
        let mut sorted = self.0.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted.truncate(limit);
        sorted
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// metrics

fn collect_samples(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_samples(item, out)),
        Value::Object(map) => {
            if let Some(result) = map.get("data").and_then(|data| data.get("result")) {
                collect_samples(result, out);
            } else if map.contains_key("resultType") {
                if let Some(result) = map.get("result") {
                    collect_samples(result, out);
                }
            } else {
                out.push(value.clone());
            }
        }
        Value::Null => {}
        other => out.push(other.clone()),
    }
}

fn last_number(text: &str) -> Option<f64> {
    if let Ok(value) = text.trim().parse::<f64>() {
        return Some(value);
    }
    text.split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .filter_map(|token| token.parse::<f64>().ok())
        .last()
}

fn sample_value(value: &Value) -> Option<i64> {
    let raw = match value {
        Value::Array(pair) if pair.len() >= 2 => &pair[1],
        other => other,
    };
    match raw {
        Value::Number(number) => number.as_f64().map(|v| v as i64),
        Value::String(text) => last_number(text).map(|v| v as i64),
        _ => None,
    }
}

fn metric_labels(metric: &Map<String, Value>) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    let mut used: Vec<&str> = Vec::new();
    for key in PRIORITY_LABELS {
        if let Some(value) = metric.get(key) {
            labels.push(display(value));
            used.push(key);
        }
    }
    for (key, value) in metric {
        let key = key.as_str();
        if !INTERNAL_LABELS.contains(&key) && !NODE_LABELS.contains(&key) && !used.contains(&key) {
            labels.push(display(value));
        }
    }
    if labels.is_empty() {
        if let Some(value) = NODE_LABELS.iter().find_map(|key| metric.get(*key)) {
            labels.push(display(value));
        }
    }
    if labels.is_empty() {
        if let Some((_, value)) = metric
            .iter()
            .find(|(key, _)| !INTERNAL_LABELS.contains(&key.as_str()))
        {
            labels.push(display(value));
        }
    }
    labels
}

fn format_metrics(items: &[Value]) -> String {
    let mut samples = Vec::new();
    for item in items {
        collect_samples(item, &mut samples);
    }

    let mut lines = Vec::new();
    for sample in &samples {
        match sample {
            Value::Object(map) => {
                let Some(value) = map.get("value").and_then(sample_value) else {
                    continue;
                };
                let labels = map
                    .get("metric")
                    .and_then(Value::as_object)
                    .map(metric_labels)
                    .unwrap_or_default();
                if labels.is_empty() {
                    lines.push(format!("- {value}"));
                } else {
                    lines.push(format!("- {}: {value}", labels.join(", ")));
                }
            }
            Value::Number(number) => {
                if let Some(value) = number.as_f64() {
                    lines.push(format!("- {}", value as i64));
                }
            }
            other => lines.push(format!("- {}", truncate(&display(other), 200))),
        }
    }

    if lines.is_empty() {
        return match single_or_array(items) {
            Value::Array(values) if values.is_empty() => String::new(),
            value @ Value::Object(_) => truncate(&pretty(&value), OBJECT_PREVIEW_LIMIT),
            _ => String::new(),
        };
    }
    lines.join("\n")
}

// aggregations

fn find_aggregations(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) => {
            if let Some(aggregations) = map.get("aggregations").and_then(Value::as_object) {
                return Some(aggregations);
            }
            ["hits", "data", "result"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(find_aggregations)
        }
        Value::Array(items) => items.iter().find_map(find_aggregations),
        _ => None,
    }
}

fn bucket_key(bucket: &Map<String, Value>) -> Option<String> {
    if let Some(key) = bucket.get("key").or_else(|| bucket.get("key_as_string")) {
        return Some(display(key));
    }
    if bucket.len() == 2 {
        return bucket
            .iter()
            .find(|(key, _)| key.as_str() != "doc_count")
            .map(|(_, value)| display(value));
    }
    None
}

fn format_aggregations(items: &[Value]) -> String {
    let content = Value::Array(items.to_vec());
    let Some(aggregations) = find_aggregations(&content) else {
        return String::new();
    };
    let mut lines = Vec::new();
    for aggregation in aggregations.values() {
        let Some(buckets) = aggregation.get("buckets").and_then(Value::as_array) else {
            continue;
        };
        for bucket in buckets.iter().take(5).filter_map(Value::as_object) {
            let (Some(key), Some(count)) = (bucket_key(bucket), bucket.get("doc_count")) else {
                continue;
            };
            lines.push(format!("  - {key}: {}", display(count)));
        }
    }
    lines.join("\n")
}

// ingress

fn find_hits(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Object(map) => {
            match map.get("hits") {
                Some(Value::Object(hits)) => {
                    if let Some(inner) = hits.get("hits").and_then(Value::as_array) {
                        return Some(inner);
                    }
                }
                Some(Value::Array(hits)) => return Some(hits),
                _ => {}
            }
            ["data", "result"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(find_hits)
        }
        Value::Array(items) => items.iter().find_map(find_hits),
        _ => None,
    }
}

fn hit_source(hit: &Value) -> &Value {
    hit.get("_source").unwrap_or(hit)
}

fn ingress_node(source: &Value) -> Option<String> {
    source
        .get("k8s")
        .and_then(|k8s| k8s.get("node"))
        .or_else(|| source.get("node"))
        .map(display)
        .filter(|node| node != "-")
}

fn format_ingress(items: &[Value]) -> String {
    let content = single_or_array(items);
    let mut nodes = Tally::default();
    let entries: Vec<&Value> = match find_hits(&content) {
        Some(hits) => hits.iter().map(hit_source).collect(),
        None => match &content {
            Value::Array(values) => values.iter().collect(),
            other => vec![other],
        },
    };
    for entry in entries {
        if let Some(node) = ingress_node(entry) {
            nodes.add(&node);
        }
    }
    nodes
        .top(5)
        .into_iter()
        .map(|(node, count)| format!("  - {node}: {count}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// general logs

struct LogEntry {
    cluster: String,
    namespace: String,
    pod: String,
    node: String,
    message: String,
}

fn first_text(candidates: &[Option<&Value>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|value| display(value))
        .find(|text| !text.is_empty())
}

fn nested<'a>(parent: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    parent.and_then(|value| value.get(key))
}

fn log_entry(item: &Value) -> LogEntry {
    let source = hit_source(item);
    let kubernetes = source.get("kubernetes");
    let metadata = source.get("@metadata");
    let fields = source.get("fields");
    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    LogEntry {
        cluster: or_dash(first_text(&[
            source.get("cluster"),
            nested(kubernetes, "cluster_name"),
            nested(metadata, "cluster"),
            nested(fields, "cluster"),
        ])),
        namespace: or_dash(first_text(&[
            nested(kubernetes, "namespace_name"),
            nested(kubernetes, "namespace"),
            source.get("namespace"),
            nested(metadata, "namespace"),
            nested(fields, "namespace"),
        ])),
        pod: or_dash(first_text(&[
            nested(kubernetes, "pod_name"),
            nested(kubernetes, "pod"),
            source.get("pod"),
            nested(metadata, "pod"),
            nested(fields, "pod"),
        ])),
        node: or_dash(first_text(&[
            nested(kubernetes, "host"),
            nested(kubernetes, "node"),
            source.get("node"),
            nested(metadata, "node"),
            nested(fields, "node"),
        ])),
        message: first_text(&[source.get("message"), source.get("log"), source.get("msg")])
            .unwrap_or_else(|| truncate(&source.to_string(), 200)),
    }
}

fn format_general_logs(items: &[Value]) -> String {
    let content = single_or_array(items);
    let mut lines = Vec::new();
    let hits = find_hits(&content).cloned();
    let raw: Vec<Value> = match hits {
        Some(hits) => hits,
        None => match content {
            Value::Array(values) => values,
            Value::Null => Vec::new(),
            other => vec![other],
        },
    };

    let mut clusters = Tally::default();
    let mut nodes = Tally::default();
    let mut apps = Tally::default();
    for item in &raw {
        if let Value::String(text) = item {
            lines.push(format!("- {text}"));
            continue;
        }
        let entry = log_entry(item);
        lines.push(format!(
            "Cluster: {}, Namespace: {}, Pod: {}",
            entry.cluster, entry.namespace, entry.pod
        ));
        lines.push(format!("  Message: {}", entry.message));
        lines.push(String::new());
        if entry.cluster != "-" {
            clusters.add(&entry.cluster);
        }
        if entry.node != "-" {
            nodes.add(&entry.node);
        }
        if entry.namespace != "-" && entry.pod != "-" {
            apps.add(&format!("{}/{}", entry.namespace, entry.pod));
        }
    }

    if !(clusters.is_empty() && nodes.is_empty() && apps.is_empty()) {
        lines.push("=== Error statistics ===".to_string());
        lines.push(String::new());
        for (title, tally) in [
            ("Clusters with most errors:", &clusters),
            ("Nodes with most errors:", &nodes),
            ("Applications with most errors:", &apps),
        ] {
            if tally.is_empty() {
                continue;
            }
            lines.push(title.to_string());
            for (key, count) in tally.top(10) {
                lines.push(format!("  - {key}: {count} errors"));
            }
            lines.push(String::new());
        }
    }
    lines.join("\n").trim_end().to_string()
}

// default

fn format_default(items: &[Value]) -> String {
    match items {
        [] => String::new(),
        [Value::String(text)] => text.clone(),
        [single] => pretty(single),
        many => many
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::String(text) => format!("Item {}: {text}", index + 1),
                other => format!("Item {}:\n{}", index + 1, pretty(other)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selection_prefers_explicit_name_then_tool() {
        assert_eq!(Formatter::select(Some("ATMS-LOGS-FORMATTER"), None), Formatter::AtmsLogs);
        assert_eq!(Formatter::select(Some("nope"), Some("query-prometheus")), Formatter::Metrics);
        assert_eq!(
            Formatter::select(None, Some("search-logs-from-elasticsearch")),
            Formatter::GeneralLogs
        );
        assert_eq!(Formatter::select(None, Some("get-events-from-ops")), Formatter::Default);
    }

    #[test]
    fn metrics_put_priority_labels_first_and_drop_internal_ones() {
        let items = vec![json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {
                        "metric": {"__name__": "x", "code": "500", "instance": "10.0.0.1", "request_uri": "/pay", "zone": "a"},
                        "value": [1715601600, "42.7"]
                    },
                    {"metric": {"node": "node-3"}, "value": [1715601600, "3"]}
                ]
            }
        })];
        let output = Formatter::Metrics.format(&items);
        assert_eq!(output, "- /pay, 500, a: 42\n- node-3: 3");
    }

    #[test]
    fn aggregations_show_top_five_buckets() {
        let buckets: Vec<Value> = (1..=7)
            .map(|i| json!({"key": format!("svc-{i}"), "doc_count": 10 - i}))
            .collect();
        let items = vec![json!({"aggregations": {"by_service": {"buckets": buckets}}})];
        let output = Formatter::AtmsLogs.format(&items);
        assert_eq!(output.lines().count(), 5);
        assert!(output.starts_with("  - svc-1: 9"));
    }

    #[test]
    fn ingress_counts_nodes() {
        let items = vec![json!({"hits": {"hits": [
            {"_source": {"k8s": {"node": "n1"}}},
            {"_source": {"k8s": {"node": "n2"}}},
            {"_source": {"k8s": {"node": "n2"}}},
            {"_source": {"message": "no node"}}
        ]}})];
        assert_eq!(Formatter::IngressLogs.format(&items), "  - n2: 2\n  - n1: 1");
    }

    #[test]
    fn general_logs_render_entries_and_statistics() {
        let items = vec![json!([
            {"kubernetes": {"cluster_name": "c1", "namespace_name": "pay", "pod_name": "pay-1", "host": "n1"}, "message": "boom"},
            {"kubernetes": {"cluster_name": "c1", "namespace_name": "pay", "pod_name": "pay-1"}, "log": "again"}
        ])];
        let output = Formatter::GeneralLogs.format(&items);
        assert!(output.contains("Cluster: c1, Namespace: pay, Pod: pay-1"));
        assert!(output.contains("  Message: boom"));
        assert!(output.contains("  - c1: 2 errors"));
        assert!(output.contains("  - pay/pay-1: 2 errors"));
        assert!(output.contains("  - n1: 1 errors"));
    }

    #[test]
    fn default_pretty_prints_and_enumerates() {
        assert_eq!(Formatter::Default.format(&[json!({"a": 1})]), "{\n  \"a\": 1\n}");
        let output = Formatter::Default.format(&[json!("plain"), json!({"b": 2})]);
        assert!(output.starts_with("Item 1: plain\nItem 2:\n"));
        assert_eq!(Formatter::Default.format(&[]), "");
    }
}
