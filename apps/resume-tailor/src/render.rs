//! RenderCV wrapper. Runs the external `rendercv` CLI as a subprocess.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::errors::AppError;

pub const RENDERCV_COMMAND: &str = "rendercv";

/// Turns a finished résumé document into presentational output.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders `yaml_path` and returns the directory the output landed in.
    async fn render(
        &self,
        yaml_path: &Path,
        output_folder: Option<&Path>,
        pdf_only: bool,
    ) -> Result<PathBuf, AppError>;
}

pub struct RenderCvRenderer {
    command: String,
}

impl Default for RenderCvRenderer {
    fn default() -> Self {
        Self::new(RENDERCV_COMMAND)
    }
}

impl RenderCvRenderer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Returns the installed version string, or a `Render` error when the
    /// CLI is missing or broken.
    pub async fn check_installation(&self) -> Result<String, AppError> {
        let output = self.exec([OsString::from("--version")], None).await?;
        if !output.status.success() {
            return Err(AppError::Render(format!("{} not found in PATH", self.command)));
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("RenderCV available: {version}");
        Ok(version)
    }

    /// `rendercv new <name>`, run in `working_dir`.
    pub async fn new_resume(&self, name: &str, working_dir: &Path) -> Result<(), AppError> {
        let output = self
            .exec(
                [OsString::from("new"), OsString::from(name)],
                Some(working_dir),
            )
            .await?;
        ensure_success(&output, "rendercv new")
    }

    async fn exec<I>(&self, args: I, working_dir: Option<&Path>) -> Result<Output, AppError>
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut cmd = Command::new(&self.command);
        cmd.args(args);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::Render(format!(
                    "{} not installed. Install with: pip install 'rendercv[full]'",
                    self.command
                ))
            } else {
                AppError::Io(e)
            }
        })
    }
}

#[async_trait]
impl Renderer for RenderCvRenderer {
    async fn render(
        &self,
        yaml_path: &Path,
        output_folder: Option<&Path>,
        pdf_only: bool,
    ) -> Result<PathBuf, AppError> {
        if !yaml_path.exists() {
            return Err(AppError::NotFound(format!(
                "Resume YAML not found: {}",
                yaml_path.display()
            )));
        }

        info!("Rendering {} with RenderCV", yaml_path.display());
        let output = self
            .exec(render_args(yaml_path, output_folder, pdf_only), None)
            .await?;
        debug!("RenderCV stdout: {}", String::from_utf8_lossy(&output.stdout));
        ensure_success(&output, "RenderCV")?;

        let out_path = match output_folder {
            Some(folder) => folder.to_path_buf(),
            // RenderCV's default location
            None => yaml_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("rendercv_output"),
        };
        info!("Resume rendered to {}", out_path.display());
        Ok(out_path)
    }
}

fn render_args(yaml_path: &Path, output_folder: Option<&Path>, pdf_only: bool) -> Vec<OsString> {
    let mut args = vec![OsString::from("render"), yaml_path.as_os_str().to_owned()];
    if let Some(folder) = output_folder {
        args.push(OsString::from("--output-folder-name"));
        args.push(folder.as_os_str().to_owned());
    }
    if pdf_only {
        for flag in [
            "--dont-generate-html",
            "--dont-generate-markdown",
            "--dont-generate-png",
        ] {
            args.push(OsString::from(flag));
        }
    }
    args
}

fn ensure_success(output: &Output, what: &str) -> Result<(), AppError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    error!("{what} failed: {stderr}");
    Err(AppError::Render(format!("{what} failed: {stderr}")))
}
