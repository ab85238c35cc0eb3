//! Alarm analysis: classify an alarm, collect the entities it names, score them
//! and report the likely anomaly points with remediation advice.

mod alarm;
mod detector;
mod entities;
mod errors;
mod models;
mod scoring;

pub use alarm::{load_alarm, parse_alarm};
pub use detector::{alarm_text, detect};
pub use entities::candidates;
pub use errors::AnomalyError;
pub use models::{
    AlarmEvent, AnomalyKind, AnomalyReport, AnomalyType, CandidatePoint, DiscoveredPoint,
    EntityType, Indicator, ScoredPoint,
};
pub use scoring::{discover, recommendations, score};

use chrono::Utc;
use tracing::info;

/// Points below this confidence are dropped from the report.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy)]
pub struct AnomalyAnalyzer {
    min_confidence: f64,
}

impl Default for AnomalyAnalyzer {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl AnomalyAnalyzer {
    pub fn with_min_confidence(min_confidence: f64) -> Self {
        Self {
            min_confidence: min_confidence.clamp(0.0, 1.0),
        }
    }

    pub fn analyse(&self, alarm: &AlarmEvent) -> AnomalyReport {
        info!(event_id = %alarm.event_id, source = %alarm.source, "Starting alarm analysis");
        let anomaly_type = detect(alarm);
        let candidate_points = candidates(alarm, &anomaly_type);
        let candidate_count = candidate_points.len();
        let scored = score(candidate_points, alarm, &anomaly_type);
        let scored_count = scored.len();
        let points = discover(scored, alarm, &anomaly_type, self.min_confidence);
        info!(
            event_id = %alarm.event_id,
            anomaly = anomaly_type.kind.type_id(),
            candidates = candidate_count,
            discovered = points.len(),
            "Alarm analysis finished"
        );
        AnomalyReport {
            alarm: alarm.clone(),
            anomaly_type,
            candidates: candidate_count,
            scored: scored_count,
            points,
            analysed_at: Utc::now(),
        }
    }
}

/// Markdown rendering used as the run output.
pub fn render_report(report: &AnomalyReport) -> String {
    let anomaly = &report.anomaly_type;
    let mut lines = vec![
        format!("# Alarm analysis ({})", report.alarm.event_id),
        String::new(),
        format!(
            "- Anomaly: [{}] {} ({:.0}% confidence)",
            anomaly.entity_type.as_str(),
            anomaly.type_name,
            anomaly.confidence * 100.0
        ),
        format!("- Reasoning: {}", anomaly.reasoning),
        format!("- Candidates: {}", report.candidates),
        format!("- Anomaly points: {}", report.points.len()),
    ];
    if report.points.is_empty() {
        lines.push(String::new());
        lines.push("No anomaly points found.".to_string());
    }
    for (index, point) in report.points.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!(
            "## {}. {} ({:.0}%, interval {:.0}%-{:.0}%)",
            index + 1,
            point.entity_id,
            point.confidence * 100.0,
            point.confidence_interval.0 * 100.0,
            point.confidence_interval.1 * 100.0
        ));
        for indicator in point.indicators.iter().take(5) {
            lines.push(format!("- [{}] {}", indicator.source, indicator.detail));
        }
        for (step, advice) in point.recommendations.iter().take(3).enumerate() {
            lines.push(format!("{}. {advice}", step + 1));
        }
    }
    lines.join("\n")
}
