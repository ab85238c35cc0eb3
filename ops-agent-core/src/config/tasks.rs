use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// A goal for the planning loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub description: String,
    pub intent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

impl TaskFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Reading task file");
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        serde_yaml_bw::from_str(&content).map_err(|source| ConfigError::TaskFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Derive a stable task name from its description.
///
/// Lowercase, drop non-word characters, join words with `-`, at most 50 characters.
pub fn task_slug(description: &str, index: usize) -> String {
    let cleaned: String = description
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let mut slug = String::new();
    for word in cleaned.split(|c: char| c.is_whitespace() || c == '-') {
        if word.is_empty() {
            continue;
        }
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.push_str(word);
    }
    let mut truncated: String = slug.chars().take(50).collect();
    while truncated.ends_with('-') {
        truncated.pop();
    }
    if truncated.is_empty() {
        format!("task-{index}")
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_normalizes_description() {
        assert_eq!(
            task_slug("Check  upstream health -- for Checkout!", 1),
            "check-upstream-health-for-checkout"
        );
    }

    #[test]
    fn slug_is_capped_and_falls_back() {
        let long = "word ".repeat(30);
        let slug = task_slug(&long, 3);
        assert!(slug.chars().count() <= 50);
        assert!(!slug.ends_with('-'));
        assert_eq!(task_slug("???", 4), "task-4");
    }
}
