use super::errors::AnomalyError;
use super::models::AlarmEvent;
use serde_json::{Map, Value, json};
use std::fs;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io;
use std::path::Path;
use tracing::{info, warn};

const MESSAGE_LIMIT: usize = 200;

/// Read an alarm file. Content starting with `{` is parsed as JSON; anything
/// else, or JSON that fails to parse, becomes a text alarm.
pub fn load_alarm(path: &Path) -> Result<AlarmEvent, AnomalyError> {
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => AnomalyError::NotFound {
            path: path.to_path_buf(),
        },
        _ => AnomalyError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let alarm = parse_alarm(&content, &path.display().to_string())?;
    info!(
        event_id = %alarm.event_id,
        source = %alarm.source,
        severity = %alarm.severity,
        "Alarm loaded"
    );
    Ok(alarm)
}

/// Parse alarm content; `origin` is recorded in the metadata of text alarms.
pub fn parse_alarm(content: &str, origin: &str) -> Result<AlarmEvent, AnomalyError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AnomalyError::EmptyAlarm);
    }
    if trimmed.starts_with('{') {
        match serde_json::from_str::<AlarmEvent>(trimmed) {
            Ok(alarm) => return Ok(alarm),
            Err(err) => warn!(%err, "Alarm is not valid JSON, treating it as text"),
        }
    }
    Ok(text_alarm(content, origin))
}

fn text_alarm(content: &str, origin: &str) -> AlarmEvent {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let digest = hasher.finish();

    let mut metadata = Map::new();
    metadata.insert("raw_content".into(), json!(content));
    metadata.insert("file_path".into(), Value::String(origin.to_string()));
    AlarmEvent {
        event_id: format!("text-alarm-{:08x}", digest >> 32),
        timestamp: String::new(),
        source: "text".to_string(),
        severity: "high".to_string(),
        message: content.chars().take(MESSAGE_LIMIT).collect(),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn json_alarm_keeps_its_fields() {
        let alarm = parse_alarm(
            r#"{"event_id": "a-1", "severity": "critical", "message": "pod OOMKilled",
                "metadata": {"pod": "checkout-1"}}"#,
            "inline",
        )
        .unwrap();
        assert_eq!(alarm.event_id, "a-1");
        assert_eq!(alarm.severity, "critical");
        assert_eq!(alarm.metadata["pod"], "checkout-1");
    }

    #[test]
    fn plain_text_and_broken_json_become_text_alarms() {
        let long = "x".repeat(500);
        let alarm = parse_alarm(&long, "alarm.txt").unwrap();
        assert_eq!(alarm.source, "text");
        assert_eq!(alarm.severity, "high");
        assert!(alarm.event_id.starts_with("text-alarm-"));
        assert_eq!(alarm.message.chars().count(), MESSAGE_LIMIT);
        assert_eq!(alarm.metadata["raw_content"].as_str().map(str::len), Some(500));
        assert_eq!(alarm.metadata["file_path"], "alarm.txt");

        let broken = parse_alarm("{not json", "alarm.txt").unwrap();
        assert_eq!(broken.message, "{not json");
        assert_eq!(
            parse_alarm("{not json", "elsewhere").unwrap().event_id,
            broken.event_id
        );
    }

    #[test]
    fn empty_and_missing_files_are_errors() {
        assert!(matches!(parse_alarm("  \n", "x"), Err(AnomalyError::EmptyAlarm)));

        let dir = tempdir().unwrap();
        let missing = dir.path().join("input.txt");
        assert!(matches!(load_alarm(&missing), Err(AnomalyError::NotFound { .. })));

        fs::write(&missing, "service checkout 502").unwrap();
        assert_eq!(load_alarm(&missing).unwrap().message, "service checkout 502");
    }
}
