use super::errors::AgentError;
use super::models::{
    AgentOptions, Attempt, Observation, Plan, TaskReport, TaskStatus, Verdict,
};
use super::parser::{parse_plan, parse_verdict, strip_markdown_fence};
use super::prompts;
use crate::config::{TaskFile, TaskSpec, task_slug};
use crate::infrastructure::llm::{ChatModel, ChatRequest};
use crate::infrastructure::mcp::{ToolDescriptor, ToolServerInterface};
use crate::summarise;
use serde_json::{Map, Value, json};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a task's loop currently stands.
#[derive(Debug)]
enum LoopState {
    Plan,
    Act(Plan),
    Observe(Plan, Vec<Observation>),
    Evaluate,
    Done,
    Exhausted,
}

impl LoopState {
    fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Done | LoopState::Exhausted)
    }
}

/// Runs tasks through the bounded plan, act, observe, evaluate loop.
pub struct AgentRunner {
    llm: Arc<dyn ChatModel>,
    tools: Arc<dyn ToolServerInterface>,
    options: AgentOptions,
}

impl AgentRunner {
    pub fn new(
        llm: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolServerInterface>,
        options: AgentOptions,
    ) -> Self {
        Self { llm, tools, options }
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub async fn run_task_file(&self, path: &Path) -> Result<Vec<TaskReport>, AgentError> {
        let file = TaskFile::load(path).map_err(AgentError::TaskFile)?;
        if file.tasks.is_empty() {
            return Err(AgentError::NoTasks);
        }
        Ok(self.run_tasks(&file.tasks).await)
    }

    /// Run tasks in order; each task sees the outcomes of the ones before it.
    pub async fn run_tasks(&self, tasks: &[TaskSpec]) -> Vec<TaskReport> {
        let mut task_context = Map::new();
        let mut reports = Vec::with_capacity(tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            let name = task_slug(&task.description, index + 1);
            info!(task = %name, intent = %summarise(&task.intent), "Starting task");
            let report = self.run_task(&name, task, &task_context).await;
            info!(
                task = %name,
                status = report.status.as_str(),
                iterations = report.iterations,
                "Task finished"
            );
            task_context.insert(
                name,
                json!({
                    "status": report.status,
                    "summary": report.summary,
                    "observations": report.last_observations(),
                }),
            );
            reports.push(report);
        }
        reports
    }

    pub async fn run_task(
        &self,
        name: &str,
        task: &TaskSpec,
        task_context: &Map<String, Value>,
    ) -> TaskReport {
        let tools = match self.tools.list_tools(&self.options.server).await {
            Ok(tools) => tools,
            Err(err) => {
                warn!(task = %name, error = %err, "Tool discovery failed");
                return TaskReport::failed(name, task, err.user_message());
            }
        };

        let max_iterations = self.options.max_iterations.max(1);
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut iteration = 0;
        let mut last_reason = None;
        let mut state = LoopState::Plan;

        while !state.is_terminal() {
            state = match state {
                LoopState::Plan => {
                    iteration += 1;
                    info!(task = %name, iteration, max_iterations, "Planning");
                    LoopState::Act(self.plan(task, &tools, task_context, &attempts).await)
                }
                LoopState::Act(plan) => {
                    let observations = self.act(&plan).await;
                    LoopState::Observe(plan, observations)
                }
                LoopState::Observe(plan, observations) => {
                    attempts.push(Attempt {
                        iteration,
                        plan,
                        observations,
                        evaluation: None,
                    });
                    LoopState::Evaluate
                }
                LoopState::Evaluate => {
                    let verdict = match attempts.last_mut() {
                        Some(attempt) => {
                            let verdict = self.evaluate(task, attempt).await;
                            attempt.evaluation = Some(verdict.reason.clone());
                            verdict
                        }
                        None => Verdict {
                            satisfied: false,
                            reason: "nothing to evaluate".to_string(),
                        },
                    };
                    info!(task = %name, iteration, satisfied = verdict.satisfied, reason = %summarise(&verdict.reason), "Evaluated");
                    last_reason = Some(verdict.reason);
                    if verdict.satisfied {
                        LoopState::Done
                    } else if iteration >= max_iterations {
                        warn!(task = %name, max_iterations, "Iteration cap reached");
                        LoopState::Exhausted
                    } else {
                        LoopState::Plan
                    }
                }
                terminal => terminal,
            };
        }

        let status = match state {
            LoopState::Done => TaskStatus::Completed,
            _ => TaskStatus::Exhausted,
        };
        let summary = self.summarize(name, task, status, &attempts).await;
        TaskReport {
            task_name: name.to_string(),
            description: task.description.clone(),
            intent: task.intent.clone(),
            status,
            iterations: iteration,
            summary,
            evaluation: last_reason,
            error: None,
            attempts,
        }
    }

    async fn plan(
        &self,
        task: &TaskSpec,
        tools: &[ToolDescriptor],
        task_context: &Map<String, Value>,
        attempts: &[Attempt],
    ) -> Plan {
        let prompt = prompts::planning_prompt(task, tools, task_context, attempts);
        let request = ChatRequest::prompt(Some(prompts::PLANNER_SYSTEM), prompt);
        match self.llm.chat(request).await {
            Ok(response) => parse_plan(&response.content).unwrap_or_else(|reason| {
                warn!(%reason, reply = %summarise(&response.content), "Unusable plan");
                Plan::empty(reason)
            }),
            Err(err) => {
                warn!(error = %err, "Planner call failed");
                Plan::empty(format!("planner call failed: {err}"))
            }
        }
    }

    /// Invoke every planned call in order; failures are recorded and the batch continues.
    async fn act(&self, plan: &Plan) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            let server = step
                .server
                .clone()
                .unwrap_or_else(|| self.options.server.clone());
            let arguments = match &step.arguments {
                Value::Null => Value::Object(Map::new()),
                other => other.clone(),
            };
            info!(tool = %step.tool, server = %server, "Invoking planned tool");
            let observation = match self
                .tools
                .invoke_tool(&server, &step.tool, arguments.clone())
                .await
            {
                Ok(result) if result.is_error => Observation {
                    tool: step.tool.clone(),
                    server,
                    arguments,
                    success: false,
                    output: result.to_value(),
                    error: result.error_message(),
                },
                Ok(result) => {
                    let mut items = result.json_items();
                    let output = if items.len() == 1 {
                        items.remove(0)
                    } else {
                        Value::Array(items)
                    };
                    Observation {
                        tool: step.tool.clone(),
                        server,
                        arguments,
                        success: true,
                        output,
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(tool = %step.tool, error = %err, "Planned tool call failed");
                    Observation {
                        tool: step.tool.clone(),
                        server,
                        arguments,
                        success: false,
                        output: Value::Null,
                        error: Some(err.to_string()),
                    }
                }
            };
            observations.push(observation);
        }
        observations
    }

    /// An evaluator failure counts as satisfied so the loop cannot spin on a broken model.
    async fn evaluate(&self, task: &TaskSpec, attempt: &Attempt) -> Verdict {
        let request = ChatRequest::prompt(
            Some(prompts::EVALUATOR_SYSTEM),
            prompts::evaluation_prompt(task, attempt),
        );
        match self.llm.chat(request).await {
            Ok(response) => parse_verdict(&response.content),
            Err(err) => {
                warn!(error = %err, "Evaluation failed, treating result as satisfied");
                Verdict {
                    satisfied: true,
                    reason: format!("evaluation error: {err}"),
                }
            }
        }
    }

    async fn summarize(
        &self,
        name: &str,
        task: &TaskSpec,
        status: TaskStatus,
        attempts: &[Attempt],
    ) -> String {
        let request = ChatRequest::prompt(
            Some(prompts::SUMMARY_SYSTEM),
            prompts::summary_prompt(name, task, status.as_str(), attempts),
        );
        match self.llm.chat(request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                strip_markdown_fence(&response.content)
            }
            Ok(_) => prompts::basic_summary(name, task, status.as_str(), attempts),
            Err(err) => {
                warn!(task = %name, error = %err, "Summary call failed, building basic report");
                prompts::basic_summary(name, task, status.as_str(), attempts)
            }
        }
    }
}
