use super::models::{Plan, Verdict};
use serde_json::Value;

/// Parse a planner reply into a [`Plan`].
///
/// Accepts `{"steps": [...]}`, a bare array of calls, or either wrapped in prose or a
/// fenced block.
pub fn parse_plan(content: &str) -> Result<Plan, String> {
    let value = extract_json(content).ok_or_else(|| "planner reply contained no JSON plan".to_string())?;
    let value = match value {
        Value::Array(steps) => serde_json::json!({ "steps": steps }),
        other => other,
    };
    let plan: Plan =
        serde_json::from_value(value).map_err(|err| format!("planner reply is not a valid plan: {err}"))?;
    if plan.steps.iter().any(|step| step.tool.trim().is_empty()) {
        return Err("planner proposed a step without a tool name".to_string());
    }
    Ok(plan)
}

/// Satisfied iff the reply says SATISFIED and never NOT_SATISFIED.
pub fn parse_verdict(content: &str) -> Verdict {
    let upper = content.to_uppercase();
    let satisfied = upper.contains("SATISFIED") && !upper.contains("NOT_SATISFIED");
    let reason = content
        .lines()
        .find_map(|line| {
            let trimmed = line.trim();
            trimmed
                .strip_prefix("Reason:")
                .or_else(|| trimmed.strip_prefix("reason:"))
                .map(|reason| reason.trim().to_string())
        })
        .unwrap_or_else(|| content.trim().to_string());
    Verdict { satisfied, reason }
}

pub(crate) fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(start) = trimmed.find("```") {
        let fenced = &trimmed[start + 3..];
        let fenced = fenced
            .strip_prefix("json")
            .or_else(|| fenced.strip_prefix("JSON"))
            .unwrap_or(fenced);
        if let Some(end) = fenced.find("```") {
            if let Ok(value) = serde_json::from_str::<Value>(fenced[..end].trim()) {
                return Some(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            let candidate = &trimmed[start..=end];
            if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                return Some(value);
            }
        }
    }

    None
}

/// Strip a ```markdown fence the model sometimes wraps its report in.
pub(crate) fn strip_markdown_fence(content: &str) -> String {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = rest
        .strip_prefix("markdown")
        .or_else(|| rest.strip_prefix("md"))
        .unwrap_or(rest);
    rest.trim_end_matches('`').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_from_fenced_block_inside_prose() {
        let reply = "Here is the plan:\n```json\n{\"steps\":[{\"tool\":\"list-pods\",\"arguments\":{\"ns\":\"prod\"}}]}\n```\nDone.";
        let plan = parse_plan(reply).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].arguments, json!({"ns": "prod"}));
        assert_eq!(plan.steps[0].server, None);
    }

    #[test]
    fn plan_from_outer_braces_and_bare_array() {
        let plan = parse_plan("I will call {\"steps\":[{\"tool\":\"a\",\"server\":\"ops\"}]} now").unwrap();
        assert_eq!(plan.steps[0].server.as_deref(), Some("ops"));
        assert_eq!(plan.steps[0].arguments, json!({}));

        let plan = parse_plan("[{\"tool\":\"a\"},{\"tool\":\"b\"}]").unwrap();
        assert_eq!(plan.steps.len(), 2);
    }

    #[test]
    fn plan_rejects_prose_and_blank_tools() {
        assert!(parse_plan("no idea").is_err());
        assert!(parse_plan("{\"steps\":[{\"tool\":\" \"}]}").is_err());
    }

    #[test]
    fn verdict_detection() {
        let yes = parse_verdict("Status: SATISFIED\nReason: all pods healthy");
        assert!(yes.satisfied);
        assert_eq!(yes.reason, "all pods healthy");

        assert!(!parse_verdict("Status: NOT_SATISFIED\nReason: missing logs").satisfied);
        assert!(!parse_verdict("I cannot tell").satisfied);
        assert!(parse_verdict("status: satisfied").satisfied);
    }

    #[test]
    fn strips_markdown_fence() {
        assert_eq!(strip_markdown_fence("```markdown\n# Report\n```"), "# Report");
        assert_eq!(strip_markdown_fence("# Plain"), "# Plain");
    }
}
