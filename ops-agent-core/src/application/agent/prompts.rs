use super::models::{Attempt, Observation};
use crate::config::TaskSpec;
use crate::infrastructure::mcp::ToolDescriptor;
use serde_json::{Map, Value};

const OUTPUT_PREVIEW: usize = 1_500;
const CONTEXT_PREVIEW: usize = 2_000;
const REPLAN_WINDOW: usize = 2;

pub(crate) const PLANNER_SYSTEM: &str = "You are an operations agent that plans calls to MCP tools. \
Reply with JSON only, shaped as {\"steps\":[{\"tool\":\"<name>\",\"arguments\":{...},\"server\":\"<optional>\"}]}. \
Use only the listed tools and fill every required parameter.";

pub(crate) const EVALUATOR_SYSTEM: &str =
    "You judge whether tool results satisfy an operational goal. Be strict but fair.";

pub(crate) const SUMMARY_SYSTEM: &str = "You write concise markdown task reports for operators. \
Output only markdown.";

pub(crate) fn planning_prompt(
    task: &TaskSpec,
    tools: &[ToolDescriptor],
    task_context: &Map<String, Value>,
    attempts: &[Attempt],
) -> String {
    let mut prompt = format!(
        "Task: {}\nIntent: {}\n\nAVAILABLE MCP TOOLS:\n{}",
        task.description,
        task.intent,
        describe_tools(tools)
    );
    if !task_context.is_empty() {
        let context = Value::Object(task_context.clone()).to_string();
        prompt.push_str(&format!(
            "\n\nResults of earlier tasks:\n{}",
            truncate(&context, CONTEXT_PREVIEW)
        ));
    }
    let recent = &attempts[attempts.len().saturating_sub(REPLAN_WINDOW)..];
    if !recent.is_empty() {
        prompt.push_str("\n\nPrevious attempts did not satisfy the intent:");
        for attempt in recent {
            prompt.push_str(&format!(
                "\n\n--- Attempt {} ---\n{}",
                attempt.iteration,
                describe_observations(&attempt.observations)
            ));
            if let Some(evaluation) = &attempt.evaluation {
                prompt.push_str(&format!("\nEvaluation: {evaluation}"));
            }
        }
        prompt.push_str("\n\nPlan the next calls needed to close the gap.");
    }
    prompt.push_str("\n\nReturn the JSON plan now.");
    prompt
}

pub(crate) fn evaluation_prompt(task: &TaskSpec, attempt: &Attempt) -> String {
    format!(
        "Evaluate if the following result satisfies the intended goal.\n\n\
Intent/Goal: {intent}\n\nCurrent Result:\n{result}\n\nIteration: {iteration}\n\n\
Answer with:\n1. SATISFIED or NOT_SATISFIED\n2. Brief explanation of your evaluation\n\n\
Format:\nStatus: [SATISFIED/NOT_SATISFIED]\nReason: [Your explanation]",
        intent = task.intent,
        result = describe_observations(&attempt.observations),
        iteration = attempt.iteration,
    )
}

pub(crate) fn summary_prompt(name: &str, task: &TaskSpec, status: &str, attempts: &[Attempt]) -> String {
    let last = attempts
        .last()
        .map(|attempt| describe_observations(&attempt.observations))
        .unwrap_or_else(|| "No result".to_string());
    format!(
        "Generate a task execution report in Markdown.\n\nTask Name: {name}\nDescription: {}\n\
Intent: {}\nStatus: {status}\nIterations: {}\nTools Used: {}\n\nFinal Result:\n{}\n\n\
Sections: ## Task Overview, ## Objective, ## Execution Process, ## Key Findings, ## Summary.",
        task.description,
        task.intent,
        attempts.len(),
        tools_used(attempts),
        truncate(&last, OUTPUT_PREVIEW),
    )
}

/// Report built locally when the summary call fails.
pub(crate) fn basic_summary(name: &str, task: &TaskSpec, status: &str, attempts: &[Attempt]) -> String {
    let result = attempts
        .last()
        .map(|attempt| describe_observations(&attempt.observations))
        .unwrap_or_else(|| "No result".to_string());
    format!(
        "# Task Report: {name}\n\n## Objective\n{}\n\n## Status\n- **Status**: {status}\n\
- **Iterations**: {}\n- **Tools Used**: {}\n\n## Result\n```\n{}\n```",
        task.intent,
        attempts.len(),
        tools_used(attempts),
        truncate(&result, OUTPUT_PREVIEW),
    )
}

fn describe_tools(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "(no tools available)".to_string();
    }
    tools
        .iter()
        .map(|tool| {
            let mut line = format!(
                "- {}: {}",
                tool.name,
                tool.description.as_deref().unwrap_or("no description")
            );
            let required = tool.required_params();
            if !required.is_empty() {
                line.push_str(&format!(" (required: {})", required.join(", ")));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_observations(observations: &[Observation]) -> String {
    if observations.is_empty() {
        return "(no tool calls were made)".to_string();
    }
    observations
        .iter()
        .map(|observation| {
            let body = if observation.success {
                match &observation.output {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                }
            } else {
                format!("ERROR: {}", observation.error.as_deref().unwrap_or("unknown error"))
            };
            format!(
                "[{}@{}] args={}\n{}",
                observation.tool,
                observation.server,
                observation.arguments,
                truncate(&body, OUTPUT_PREVIEW)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn tools_used(attempts: &[Attempt]) -> String {
    let mut names: Vec<&str> = attempts
        .iter()
        .flat_map(|attempt| attempt.observations.iter().map(|o| o.tool.as_str()))
        .collect();
    names.sort_unstable();
    names.dedup();
    if names.is_empty() {
        "N/A".to_string()
    } else {
        names.join(", ")
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{cut}... (truncated)")
}
