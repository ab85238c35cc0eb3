//! Evidence, confidence and remediation for candidate entities.

use super::entities::{ROLE_PRIMARY, role_of};
use super::models::{
    AlarmEvent, AnomalyKind, AnomalyType, CandidatePoint, DiscoveredPoint, Indicator, ScoredPoint,
};
use chrono::Utc;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::debug;

/// Weight applied to entities that only share the alarm with the primary one.
const RELATED_WEIGHT: f64 = 0.6;
const THRESHOLD_BONUS: f64 = 0.05;
const INTERVAL_SPREAD: f64 = 0.2;

fn severity_factor(severity: &str) -> f64 {
    match severity.trim().to_lowercase().as_str() {
        "critical" | "fatal" | "p0" | "p1" => 1.0,
        "high" | "error" | "major" | "p2" => 0.95,
        "medium" | "warning" | "warn" | "minor" | "p3" => 0.85,
        "low" | "info" | "p4" => 0.7,
        _ => 0.8,
    }
}

/// Attach indicators and a confidence interval to every candidate.
pub fn score(candidates: Vec<CandidatePoint>, alarm: &AlarmEvent, anomaly: &AnomalyType) -> Vec<ScoredPoint> {
    let severity = severity_factor(&alarm.severity);
    candidates
        .into_iter()
        .map(|candidate| {
            let primary = role_of(&candidate) == Some(ROLE_PRIMARY);
            let mut indicators = Vec::new();
            let mut confidence = anomaly.confidence * severity;
            if primary {
                indicators.push(Indicator {
                    source: "alarm".into(),
                    name: anomaly.kind.type_id().into(),
                    value: None,
                    threshold: None,
                    detail: crate::summarise(&alarm.message),
                });
                if let Some(metric) = metric_indicator(alarm) {
                    if matches!((metric.value, metric.threshold), (Some(v), Some(t)) if v >= t) {
                        confidence += THRESHOLD_BONUS;
                    }
                    indicators.push(metric);
                }
            } else {
                confidence *= RELATED_WEIGHT;
                indicators.push(Indicator {
                    source: "topology".into(),
                    name: "co_located".into(),
                    value: None,
                    threshold: None,
                    detail: format!(
                        "{} {} is named by the same alarm",
                        candidate.entity_type.as_str(),
                        candidate.entity_name
                    ),
                });
            }
            let confidence = confidence.clamp(0.0, 1.0);
            let margin = INTERVAL_SPREAD / (indicators.len().max(1) as f64).sqrt();
            debug!(entity = %candidate.entity_id, confidence, "Candidate scored");
            ScoredPoint {
                candidate,
                confidence,
                confidence_interval: ((confidence - margin).max(0.0), (confidence + margin).min(1.0)),
                indicators,
            }
        })
        .collect()
}

/// `value`/`threshold` pairs, at the top level or under `annotations`.
fn metric_indicator(alarm: &AlarmEvent) -> Option<Indicator> {
    let sources = [
        Some(&alarm.metadata),
        alarm.metadata.get("annotations").and_then(Value::as_object),
    ];
    sources.into_iter().flatten().find_map(|source| {
        let value = number(source.get("value")?)?;
        let threshold = source.get("threshold").and_then(number);
        let name = source
            .get("metric")
            .and_then(Value::as_str)
            .unwrap_or("value")
            .to_string();
        let detail = match threshold {
            Some(limit) if value >= limit => format!("{name} = {value} breaches threshold {limit}"),
            Some(limit) => format!("{name} = {value} within threshold {limit}"),
            None => format!("{name} = {value}"),
        };
        Some(Indicator {
            source: "metrics".into(),
            name,
            value: Some(value),
            threshold,
            detail,
        })
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

/// Keep points at or above `min_confidence`, most confident first, with advice attached.
pub fn discover(
    points: Vec<ScoredPoint>,
    alarm: &AlarmEvent,
    anomaly: &AnomalyType,
    min_confidence: f64,
) -> Vec<DiscoveredPoint> {
    let timestamp = if alarm.timestamp.trim().is_empty() {
        Utc::now().to_rfc3339()
    } else {
        alarm.timestamp.clone()
    };
    let mut kept: Vec<ScoredPoint> = points
        .into_iter()
        .filter(|point| point.confidence >= min_confidence)
        .collect();
    kept.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));

    kept.into_iter()
        .map(|point| {
            let recommendations = if role_of(&point.candidate) == Some(ROLE_PRIMARY) {
                recommendations(anomaly.kind).iter().map(|r| r.to_string()).collect()
            } else {
                vec![format!(
                    "Check whether {} {} is affected by or causing the {}",
                    point.candidate.entity_type.as_str(),
                    point.candidate.entity_name,
                    anomaly.type_name.to_lowercase()
                )]
            };
            DiscoveredPoint {
                entity_id: point.candidate.entity_id,
                entity_type: point.candidate.entity_type,
                entity_name: point.candidate.entity_name,
                confidence: point.confidence,
                confidence_interval: point.confidence_interval,
                anomaly_type: anomaly.type_name.clone(),
                timestamp: timestamp.clone(),
                indicators: point.indicators,
                recommendations,
            }
        })
        .collect()
}

pub fn recommendations(kind: AnomalyKind) -> &'static [&'static str] {
    use AnomalyKind::*;
    match kind {
        NodeCpu | PodCpu => &[
            "Identify the top CPU consumers on the host",
            "Check for runaway loops or traffic spikes",
            "Raise CPU limits or scale out",
        ],
        NodeMemory | PodMemory => &[
            "Inspect memory usage per process and look for leaks",
            "Review memory limits and OOM kill events",
            "Scale out or raise memory limits",
        ],
        NodeDisk | StorageDisk | StorageCapacity => &[
            "Find the largest directories and clean old logs or images",
            "Check log rotation and retention",
            "Expand the volume or move data off the disk",
        ],
        NodeDiskio | PodDiskio | StorageIo => &[
            "Identify processes with the highest IO wait",
            "Check for heavy batch jobs or compactions",
            "Move hot data to faster storage",
        ],
        NodeNetwork | NetworkNetwork | NetworkLatency | NetworkConnectionfailure => &[
            "Check interface errors, drops and bandwidth usage",
            "Trace the path between the affected endpoints",
            "Review recent firewall or routing changes",
        ],
        PodCrash | PodRestart | PodError => &[
            "Read the previous container logs and exit code",
            "Review health check settings and resource limits",
            "Roll back the latest image if the failures started after a deploy",
        ],
        ServiceDown | ServiceTimeout => &[
            "Check instance health and load balancer targets",
            "Verify downstream dependencies are reachable",
            "Restart or fail over unhealthy instances",
        ],
        ServiceSlow | ServiceLatency | ApplicationSlow => &[
            "Compare latency with traffic volume for the same window",
            "Trace slow requests to the responsible dependency",
            "Scale out or add caching on the hot path",
        ],
        ServiceError | ServiceHttp5xx | ApplicationError | ApplicationException => &[
            "Search error logs for the dominant exception",
            "Correlate the error onset with recent deploys",
            "Roll back or hotfix the failing change",
        ],
        ServiceHttp4xx => &[
            "Break down 4xx responses by route and client",
            "Check for expired credentials or changed API contracts",
        ],
        ApplicationDeployment => &[
            "Read the deployment events and rollout status",
            "Roll back to the last healthy revision",
        ],
        DatabaseConnectionfailure => &[
            "Check connection pool saturation and max connections",
            "Verify database availability and credentials",
        ],
        DatabaseSlow => &[
            "Review the slow query log for new offenders",
            "Check locks and missing indexes",
        ],
        DatabaseError | DatabaseDatacorruption => &[
            "Inspect the database error log",
            "Verify replication and backups before any repair",
        ],
        Unknown => &["Review the alarm manually and refine its labels"],
    }
}
