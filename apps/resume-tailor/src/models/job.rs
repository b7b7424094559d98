use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Company and role pulled out of a posting. Either may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetails {
    pub company: Option<String>,
    pub role: Option<String>,
}

/// A job posting, created once per tailoring run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    pub text: String,
    pub company: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

impl JobDescription {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub async fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("Job description not found: {}", path.display()))
            } else {
                AppError::Io(e)
            }
        })?;

        if text.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "Job description is empty: {}",
                path.display()
            )));
        }

        Ok(Self::new(text))
    }

    pub fn with_details(self, details: JobDetails) -> Self {
        Self {
            company: details.company,
            role: details.role,
            ..self
        }
    }

    /// Label for log lines: role if known, else a generic placeholder.
    pub fn display_role(&self) -> &str {
        self.role.as_deref().unwrap_or("position")
    }
}
