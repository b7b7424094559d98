//! Command implementations behind the CLI. Each builds its collaborators from
//! the `Config` plus per-command overrides.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::cli::{BatchArgs, GenerateArgs, InitArgs, OriginalArgs};
use crate::config::Config;
use crate::document::{save_yaml, DocumentStore, FileDocumentStore};
use crate::llm_client::build_client;
use crate::models::{JobDescription, RendererConfig, StaticSections};
use crate::render::{RenderCvRenderer, Renderer};
use crate::tailoring::keywords::KeywordSource;
use crate::tailoring::pipeline::untailored_document;
use crate::tailoring::{RetryPolicy, TailoringPipeline};

pub const ORIGINAL_FILE_NAME: &str = "original_resume.yaml";
const ORIGINAL_DIR_NAME: &str = "original";

pub async fn generate(config: &Config, args: GenerateArgs) -> Result<()> {
    let model = args.model.as_deref().unwrap_or(&config.llm_model);
    let llm = build_client(config, model)?;

    let store = Arc::new(FileDocumentStore::new(
        Some(args.static_sections.unwrap_or_else(|| config.static_sections_path.clone())),
        args.base_resume.unwrap_or_else(|| config.base_resume_path.clone()),
    ));
    let renderer_config = RendererConfig {
        theme: args.theme.unwrap_or_else(|| config.rendercv_theme.clone()),
        output_folder: config.output_dir.display().to_string(),
        ..RendererConfig::default()
    };
    let keyword_source = if args.llm_keywords {
        KeywordSource::Llm
    } else {
        config.keyword_source
    };

    let pipeline = TailoringPipeline::new(llm, store.clone(), renderer_config)
        .with_retry_policy(RetryPolicy::new(config.max_retries))
        .with_keyword_source(keyword_source);

    let job = JobDescription::from_file(&args.job_file).await?;
    let job = pipeline.prepare_job(job).await?;

    let output_dir = match args.output {
        Some(dir) => dir,
        None => {
            let name = candidate_name(store.as_ref()).await;
            default_output_dir(&config.output_dir, &name, job.company.as_deref(), Local::now())
        }
    };

    let result = pipeline.tailor_prepared(job, &output_dir).await?;
    println!(
        "Tailored resume for {} at {} saved to {}",
        result.job.display_role(),
        result.job.company.as_deref().unwrap_or("unknown company"),
        result.yaml_path.display()
    );
    if !result.bold_keywords.is_empty() {
        println!("Bold keywords: {}", result.bold_keywords.join(", "));
    }

    if args.no_render {
        return Ok(());
    }
    let rendered = RenderCvRenderer::default()
        .render(&result.yaml_path, Some(&output_dir), false)
        .await?;
    println!("Rendered output in {}", rendered.display());
    Ok(())
}

pub async fn batch(config: &Config, args: BatchArgs) -> Result<()> {
    let model = args.model.as_deref().unwrap_or(&config.llm_model);
    let llm = build_client(config, model)?;

    let store = Arc::new(FileDocumentStore::new(
        Some(config.static_sections_path.clone()),
        args.base_resume.unwrap_or_else(|| config.base_resume_path.clone()),
    ));
    let renderer_config = RendererConfig {
        theme: config.rendercv_theme.clone(),
        output_folder: args.output.display().to_string(),
        ..RendererConfig::default()
    };
    let pipeline = TailoringPipeline::new(llm, store, renderer_config)
        .with_retry_policy(RetryPolicy::new(config.max_retries))
        .with_keyword_source(config.keyword_source);

    let renderer = RenderCvRenderer::default();
    let renderer: Option<&dyn Renderer> = match renderer.check_installation().await {
        Ok(_) => Some(&renderer),
        Err(e) => {
            warn!("Skipping PDF rendering: {e}");
            None
        }
    };

    let report = pipeline.run_batch(&args.jobs_dir, &args.output, renderer).await?;

    println!(
        "Processed {} job descriptions: {} succeeded, {} failed",
        report.total(),
        report.succeeded.len(),
        report.failed.len()
    );
    for (job, yaml) in &report.succeeded {
        println!("  ok    {} -> {}", job.display(), yaml.display());
    }
    for (job, reason) in &report.failed {
        println!("  FAIL  {}: {reason}", job.display());
    }
    Ok(())
}

pub async fn original(config: &Config, args: OriginalArgs) -> Result<()> {
    let store = FileDocumentStore::new(
        Some(args.static_sections.unwrap_or_else(|| config.static_sections_path.clone())),
        args.base_resume.unwrap_or_else(|| config.base_resume_path.clone()),
    );
    let output_dir = args
        .output
        .unwrap_or_else(|| config.output_dir.join(ORIGINAL_DIR_NAME));

    let static_doc = store.load_static_sections().await?;
    let base_doc = store.load_base_resume().await?;
    let renderer_config = RendererConfig {
        theme: config.rendercv_theme.clone(),
        output_folder: output_dir.display().to_string(),
        ..RendererConfig::default()
    };
    let document = untailored_document(&static_doc, &base_doc, &renderer_config)?;

    let yaml_path = output_dir.join(ORIGINAL_FILE_NAME);
    save_yaml(document.as_mapping(), &yaml_path).await?;
    println!("Original resume saved to {}", yaml_path.display());

    let rendered = RenderCvRenderer::default()
        .render(&yaml_path, Some(&output_dir), false)
        .await?;
    println!("Rendered output in {}", rendered.display());
    Ok(())
}

pub async fn init(config: &Config, args: InitArgs) -> Result<()> {
    let renderer = RenderCvRenderer::default();
    let cwd = std::env::current_dir().context("Cannot determine the current directory")?;

    if renderer.check_installation().await.is_ok() {
        renderer.new_resume(&args.name, &cwd).await?;
        println!("Created a new RenderCV resume for {}", args.name);
        return Ok(());
    }

    let path = cwd.join(starter_file_name(&args.name));
    if path.exists() {
        println!("{} already exists, leaving it untouched", path.display());
        return Ok(());
    }
    tokio::fs::write(&path, starter_resume(&args.name, &config.rendercv_theme))
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("RenderCV is not installed; wrote a starter file to {}", path.display());
    Ok(())
}

pub async fn info(config: &Config) -> Result<()> {
    println!("LLM provider:     {}", config.llm_provider.as_str());
    println!("LLM model:        {}", config.llm_model);
    if let Some(url) = &config.llm_base_url {
        println!("LLM base URL:     {url}");
    }
    println!("Temperature:      {}", config.llm_temperature);
    println!("Max tokens:       {}", config.llm_max_tokens);
    println!(
        "Gemini API key:   {}",
        if config.gemini_api_key.is_some() { "set" } else { "not set" }
    );
    println!("Base resume:      {}", config.base_resume_path.display());
    println!("Static sections:  {}", config.static_sections_path.display());
    println!("Output dir:       {}", config.output_dir.display());
    println!("RenderCV theme:   {}", config.rendercv_theme);
    println!("Max retries:      {}", config.max_retries);
    println!("Keyword source:   {}", config.keyword_source);

    match RenderCvRenderer::default().check_installation().await {
        Ok(version) => println!("RenderCV:         {version}"),
        Err(e) => println!("RenderCV:         not available ({e})"),
    }
    Ok(())
}

/// Candidate name for directory naming. Falls back to "Resume".
async fn candidate_name(store: &dyn DocumentStore) -> String {
    let name = match store.load_static_sections().await {
        Ok(document) => StaticSections::from_document(&document)
            .map(|s| s.name)
            .unwrap_or_default(),
        Err(e) => {
            warn!("Could not read static sections for naming: {e}");
            String::new()
        }
    };
    if name.trim().is_empty() {
        "Resume".to_string()
    } else {
        name
    }
}

/// `<base>/<Name>_<Company>_<YYYYmmdd_HHMMSS>`, always a single directory
/// below `base`. The company comes from model output over third-party text.
pub fn default_output_dir(
    base: &Path,
    name: &str,
    company: Option<&str>,
    now: DateTime<Local>,
) -> PathBuf {
    let dir = format!(
        "{}_{}_{}",
        path_segment(name, "Resume"),
        path_segment(company.unwrap_or_default(), "unknown"),
        now.format("%Y%m%d_%H%M%S")
    );
    info!("Output directory: {dir}");
    base.join(dir)
}

/// Keeps letters, digits, `.`, `_` and `-`; everything else (separators
/// included) becomes `_`. Leading dots are dropped.
fn path_segment(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

fn starter_file_name(name: &str) -> String {
    format!("{}_CV.yaml", path_segment(name, "Resume"))
}

fn starter_resume(name: &str, theme: &str) -> String {
    format!(
        "cv:\n  name: {name}\n\ndesign:\n  theme: {theme}\n\ncv_template:\n  sections:\n    - experience: []\n    - skills: []\n    - education: []\n"
    )
}
