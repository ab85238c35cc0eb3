//! Candidate entities named by the alarm's metadata and labels.

use super::models::{AlarmEvent, AnomalyType, CandidatePoint, EntityType};
use serde_json::{Map, Value, json};
use tracing::debug;

pub const ROLE_PRIMARY: &str = "primary";
pub const ROLE_RELATED: &str = "related";

const ENTITY_KEYS: &[(EntityType, &[&str])] = &[
    (EntityType::Pod, &["pod", "pod_name"]),
    (EntityType::Node, &["node", "node_name", "nodename", "host", "hostname", "instance"]),
    (EntityType::Service, &["service", "service_name", "job"]),
    (EntityType::Application, &["app", "application", "app_name"]),
    (EntityType::Database, &["database", "db", "db_instance"]),
    (EntityType::Network, &["interface", "device", "network"]),
    (EntityType::Storage, &["persistentvolumeclaim", "pvc", "volume", "pv"]),
];

/// Entities of the detected type come first as primary candidates; entities of
/// other types in the same alarm follow as related ones. A known anomaly with
/// no named entity still yields one unidentified primary candidate.
pub fn candidates(alarm: &AlarmEvent, anomaly: &AnomalyType) -> Vec<CandidatePoint> {
    let sources = label_sources(alarm);
    let namespace = lookup(&sources, &["namespace"]);

    let mut points: Vec<CandidatePoint> = Vec::new();
    let ordered = ENTITY_KEYS
        .iter()
        .filter(|(entity, _)| *entity == anomaly.entity_type)
        .chain(ENTITY_KEYS.iter().filter(|(entity, _)| *entity != anomaly.entity_type));
    for (entity, keys) in ordered {
        let Some((key, name)) = find_named(&sources, keys) else {
            continue;
        };
        let role = if *entity == anomaly.entity_type {
            ROLE_PRIMARY
        } else {
            ROLE_RELATED
        };
        let entity_id = match (&namespace, entity) {
            (Some(ns), EntityType::Pod | EntityType::Service) => format!("{}/{ns}/{name}", entity.as_str()),
            _ => format!("{}/{name}", entity.as_str()),
        };
        if points.iter().any(|p| p.entity_id == entity_id) {
            continue;
        }
        points.push(candidate(alarm, entity_id, *entity, name, role, Some(key)));
    }

    let has_primary = points.iter().any(|p| role_of(p) == Some(ROLE_PRIMARY));
    if !has_primary && anomaly.entity_type != EntityType::Unknown {
        let entity_id = format!("{}/unidentified", anomaly.entity_type.as_str());
        points.insert(
            0,
            candidate(alarm, entity_id, anomaly.entity_type, "unidentified".into(), ROLE_PRIMARY, None),
        );
    }
    debug!(event_id = %alarm.event_id, candidates = points.len(), "Candidate entities collected");
    points
}

pub fn role_of(point: &CandidatePoint) -> Option<&str> {
    point.metadata.get("role").and_then(Value::as_str)
}

fn candidate(
    alarm: &AlarmEvent,
    entity_id: String,
    entity_type: EntityType,
    entity_name: String,
    role: &str,
    matched_key: Option<&str>,
) -> CandidatePoint {
    let mut metadata = Map::new();
    metadata.insert("role".into(), json!(role));
    if let Some(key) = matched_key {
        metadata.insert("matched_key".into(), json!(key));
    }
    CandidatePoint {
        entity_id,
        entity_type,
        entity_name,
        related_alarms: vec![alarm.event_id.clone()],
        metadata,
    }
}

/// Top-level metadata, then nested `labels`, the shape Prometheus alerts use.
fn label_sources(alarm: &AlarmEvent) -> Vec<&Map<String, Value>> {
    let mut sources = vec![&alarm.metadata];
    if let Some(Value::Object(labels)) = alarm.metadata.get("labels") {
        sources.push(labels);
    }
    sources
}

fn find_named<'a>(sources: &[&Map<String, Value>], keys: &[&'a str]) -> Option<(&'a str, String)> {
    keys.iter()
        .find_map(|key| lookup(sources, &[*key]).map(|name| (*key, name)))
}

fn lookup(sources: &[&Map<String, Value>], keys: &[&str]) -> Option<String> {
    sources.iter().find_map(|source| {
        keys.iter().find_map(|key| match source.get(*key) {
            Some(Value::String(name)) if !name.trim().is_empty() => Some(name.trim().to_string()),
            Some(Value::Number(number)) => Some(number.to_string()),
            _ => None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::anomaly::models::AnomalyKind;

    fn anomaly(kind: AnomalyKind) -> AnomalyType {
        AnomalyType {
            entity_type: kind.entity_type(),
            kind,
            type_name: kind.description().into(),
            confidence: 1.0,
            reasoning: String::new(),
        }
    }

    fn alarm(metadata: Value) -> AlarmEvent {
        AlarmEvent {
            event_id: "evt-9".into(),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
            ..AlarmEvent::default()
        }
    }

    #[test]
    fn detected_type_leads_and_other_labels_follow() {
        let event = alarm(json!({
            "labels": {"namespace": "shop", "pod": "checkout-7d9", "node": "worker-3"}
        }));
        let points = candidates(&event, &anomaly(AnomalyKind::PodMemory));

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].entity_id, "pod/shop/checkout-7d9");
        assert_eq!(role_of(&points[0]), Some(ROLE_PRIMARY));
        assert_eq!(points[1].entity_id, "node/worker-3");
        assert_eq!(role_of(&points[1]), Some(ROLE_RELATED));
        assert_eq!(points[1].related_alarms, vec!["evt-9".to_string()]);
    }

    #[test]
    fn top_level_metadata_wins_over_labels() {
        let event = alarm(json!({"host": "db-1", "labels": {"instance": "10.0.0.1:9100"}}));
        let points = candidates(&event, &anomaly(AnomalyKind::NodeCpu));
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].entity_name, "db-1");
        assert_eq!(points[0].metadata["matched_key"], "host");
    }

    #[test]
    fn unnamed_entity_gets_placeholder() {
        let points = candidates(&alarm(json!({})), &anomaly(AnomalyKind::ServiceHttp5xx));
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].entity_id, "service/unidentified");

        let unknown = candidates(&alarm(json!({})), &anomaly(AnomalyKind::Unknown));
        assert!(unknown.is_empty());
    }
}
