use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnomalyError {
    #[error("alarm file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read alarm file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("alarm is empty")]
    EmptyAlarm,
}

impl AnomalyError {
    pub fn user_message(&self) -> String {
        match self {
            AnomalyError::NotFound { path } => {
                format!("Alarm file {} does not exist. Pass a JSON or text alarm file.", path.display())
            }
            AnomalyError::EmptyAlarm => "The alarm file is empty.".to_string(),
            AnomalyError::Io { .. } => self.to_string(),
        }
    }
}
