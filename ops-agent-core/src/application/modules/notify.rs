use super::ops_summary::OPS_SUMMARY;
use super::params::str_param;
use crate::application::orchestrator::{CheckModule, ModuleError};
use crate::domain::{ModuleResult, Params, SharedContext};
use crate::infrastructure::notify::WebhookNotifier;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

pub const NOTIFY: &str = "notify";

/// Context key holding a webhook key supplied by the trigger request.
pub const NOTIFY_KEY_CONTEXT: &str = "notify_key";

/// Posts markdown to the group-chat webhook.
pub struct NotifyModule {
    notifier: WebhookNotifier,
}

impl NotifyModule {
    pub fn new(notifier: WebhookNotifier) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl CheckModule for NotifyModule {
    fn name(&self) -> &str {
        NOTIFY
    }

    fn description(&self) -> &str {
        "Send markdown to the notification webhook (content or ops_summary)"
    }

    fn validate_params(&self, params: &Params, context: &SharedContext) -> Result<(), String> {
        if str_param(params, "content").is_some() || context_summary(context).is_some() {
            Ok(())
        } else {
            Err("content parameter is required when no ops_summary is available".into())
        }
    }

    async fn execute(
        &self,
        params: Params,
        context: &mut SharedContext,
    ) -> Result<ModuleResult, ModuleError> {
        let content = match str_param(&params, "content") {
            Some(content) => content.to_string(),
            None => context_summary(context)
                .ok_or_else(|| ModuleError::InvalidParams("content parameter is required".into()))?,
        };
        let key = str_param(&params, "key")
            .map(str::to_string)
            .or_else(|| context.get_str(NOTIFY_KEY_CONTEXT).map(str::to_string));

        let response = self.notifier.send_markdown(&content, key.as_deref()).await?;
        info!(chars = content.chars().count(), "Notification sent");

        let mut data = Params::new();
        data.insert("message".into(), json!("Notification sent successfully"));
        data.insert("content_length".into(), json!(content.chars().count()));
        data.insert("response".into(), response);
        Ok(ModuleResult::success(NOTIFY, data))
    }
}

fn context_summary(context: &SharedContext) -> Option<String> {
    context
        .get(OPS_SUMMARY)
        .and_then(|data| data.get("summary"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
