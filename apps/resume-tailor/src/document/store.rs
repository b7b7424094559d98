//! Document Store and Writer: YAML files on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::errors::AppError;

/// Source of the two input documents for a tailoring run.
///
/// Carried by the pipeline as `Arc<dyn DocumentStore>`; loaded fresh per run.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Static personal sections. A missing source is not fatal.
    async fn load_static_sections(&self) -> Result<Mapping, AppError>;

    /// Full base résumé. Missing ⇒ `AppError::NotFound`.
    async fn load_base_resume(&self) -> Result<Mapping, AppError>;
}

pub struct FileDocumentStore {
    static_sections_path: Option<PathBuf>,
    base_resume_path: PathBuf,
}

impl FileDocumentStore {
    pub fn new(static_sections_path: Option<PathBuf>, base_resume_path: PathBuf) -> Self {
        Self {
            static_sections_path,
            base_resume_path,
        }
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn load_static_sections(&self) -> Result<Mapping, AppError> {
        let Some(path) = self.static_sections_path.as_deref().filter(|p| p.exists()) else {
            warn!("Static sections file not found, using empty document");
            return Ok(Mapping::new());
        };

        let document = read_yaml(path).await?.unwrap_or_default();
        info!("Loaded static sections from {}", path.display());
        Ok(document)
    }

    async fn load_base_resume(&self) -> Result<Mapping, AppError> {
        let path = &self.base_resume_path;
        if !path.exists() {
            return Err(AppError::NotFound(format!(
                "Base resume not found: {}",
                path.display()
            )));
        }

        let document = read_yaml(path).await?.ok_or_else(|| {
            AppError::Validation(format!("Base resume is empty: {}", path.display()))
        })?;
        info!("Loaded base resume from {}", path.display());
        Ok(document)
    }
}

/// Reads a YAML file whose root must be a mapping. An empty file yields `None`.
async fn read_yaml(path: &Path) -> Result<Option<Mapping>, AppError> {
    let text = tokio::fs::read_to_string(path).await?;
    match serde_yaml::from_str::<Value>(&text)? {
        Value::Null => Ok(None),
        Value::Mapping(mapping) => Ok(Some(mapping)),
        _ => Err(AppError::Validation(format!(
            "{} must contain a YAML mapping at the top level",
            path.display()
        ))),
    }
}

/// Writes a document as insertion-ordered YAML, creating parent directories.
pub async fn save_yaml(document: &Mapping, output_path: &Path) -> Result<(), AppError> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let yaml = serde_yaml::to_string(document)?;
    tokio::fs::write(output_path, yaml).await?;

    info!("Saved resume YAML to {}", output_path.display());
    Ok(())
}
