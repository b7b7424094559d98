//! Tailoring Orchestrator and Batch Processor.
//!
//! One run: job details → load documents → tailor summary, experience and
//! skills (sequentially) → merge → keywords → re-merge → write YAML.
//! A section that cannot be tailored keeps its original content; only
//! transport and document-loading failures abort a run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::Mapping;
use tracing::{debug, error, info, warn};

use crate::document::merge::DESIGN_KEY;
use crate::document::{merge_sections, save_yaml, DocumentStore, MergedDocument};
use crate::errors::AppError;
use crate::llm_client::CompletionClient;
use crate::models::{DynamicSections, JobDescription, RendererConfig};
use crate::render::Renderer;
use crate::tailoring::jd_parser::extract_job_details;
use crate::tailoring::keywords::{extract_keywords_with_llm, extract_technical_terms, KeywordSource};
use crate::tailoring::retry::RetryPolicy;
use crate::tailoring::sections::SectionTailor;

pub const TAILORED_FILE_NAME: &str = "tailored_resume.yaml";
const JOB_FILE_EXTENSION: &str = "txt";

/// Result of one successful run.
#[derive(Debug, Clone)]
pub struct TailoredResume {
    pub job: JobDescription,
    pub yaml_path: PathBuf,
    pub bold_keywords: Vec<String>,
}

/// Per-file outcome of a batch. Failures are recorded, never raised.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// (job file, written YAML)
    pub succeeded: Vec<(PathBuf, PathBuf)>,
    /// (job file, error message)
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

pub struct TailoringPipeline {
    llm: Arc<dyn CompletionClient>,
    store: Arc<dyn DocumentStore>,
    renderer_config: RendererConfig,
    retry: RetryPolicy,
    keyword_source: KeywordSource,
}

impl TailoringPipeline {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        store: Arc<dyn DocumentStore>,
        renderer_config: RendererConfig,
    ) -> Self {
        Self {
            llm,
            store,
            renderer_config,
            retry: RetryPolicy::default(),
            keyword_source: KeywordSource::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_keyword_source(mut self, keyword_source: KeywordSource) -> Self {
        self.keyword_source = keyword_source;
        self
    }

    /// Fills in company and role unless the job already names its company.
    pub async fn prepare_job(&self, job: JobDescription) -> Result<JobDescription, AppError> {
        if job.company.is_some() {
            return Ok(job);
        }
        let details = extract_job_details(self.llm.as_ref(), &job.text, self.retry).await?;
        Ok(job.with_details(details))
    }

    /// Tailors the base résumé to `job` and writes
    /// `<output_dir>/tailored_resume.yaml`.
    pub async fn tailor(
        &self,
        job: JobDescription,
        output_dir: &Path,
    ) -> Result<TailoredResume, AppError> {
        let job = self.prepare_job(job).await?;
        self.tailor_prepared(job, output_dir).await
    }

    /// Same as [`tailor`](Self::tailor) for a job whose details were already
    /// extracted with [`prepare_job`](Self::prepare_job).
    pub async fn tailor_prepared(
        &self,
        job: JobDescription,
        output_dir: &Path,
    ) -> Result<TailoredResume, AppError> {
        info!(
            "Tailoring resume for {} at {}",
            job.display_role(),
            job.company.as_deref().unwrap_or("unknown company")
        );

        let static_doc = self.store.load_static_sections().await?;
        let base_doc = self.store.load_base_resume().await?;
        let current = DynamicSections::from_document(&base_doc)?;

        let mut tailored = self.tailor_sections(&job, &current).await?;

        let renderer_config = RendererConfig {
            output_folder: output_dir.display().to_string(),
            ..self.renderer_config.clone()
        };
        let base_design = base_doc.get(DESIGN_KEY);

        let draft = merge_sections(&static_doc, &tailored, &[], Some(&renderer_config), base_design)?;
        let bold_keywords = self.extract_keywords(&job, &draft).await?;
        info!("Bolding {} keywords", bold_keywords.len());

        tailored.bold_keywords = bold_keywords;
        let document = merge_sections(
            &static_doc,
            &tailored,
            &tailored.bold_keywords,
            Some(&renderer_config),
            base_design,
        )?;

        debug!("Section order: {:?}", document.section_names());

        let yaml_path = output_dir.join(TAILORED_FILE_NAME);
        save_yaml(document.as_mapping(), &yaml_path).await?;

        Ok(TailoredResume {
            job,
            yaml_path,
            bold_keywords: document.bold_keywords(),
        })
    }

    /// Reads the job file, then [`tailor`](Self::tailor).
    pub async fn run(&self, job_path: &Path, output_dir: &Path) -> Result<TailoredResume, AppError> {
        let job = JobDescription::from_file(job_path).await?;
        self.tailor(job, output_dir).await
    }

    /// Tailors every `*.txt` job in `jobs_dir` (sorted by name) into
    /// `<output_base>/<file stem>/`. With a renderer, each result is also
    /// rendered to PDF. One job failing does not stop the others.
    pub async fn run_batch(
        &self,
        jobs_dir: &Path,
        output_base: &Path,
        renderer: Option<&dyn Renderer>,
    ) -> Result<BatchReport, AppError> {
        let job_files = collect_job_files(jobs_dir).await?;
        info!("Processing {} job descriptions", job_files.len());

        let mut report = BatchReport::default();
        for (index, job_path) in job_files.into_iter().enumerate() {
            let stem = job_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("job_{}", index + 1));
            let output_dir = output_base.join(&stem);
            info!("[{}] {}", index + 1, job_path.display());

            match self.run_one(&job_path, &output_dir, renderer).await {
                Ok(yaml_path) => report.succeeded.push((job_path, yaml_path)),
                Err(e) => {
                    error!("Failed to process {} [{}]: {e}", job_path.display(), e.code());
                    report.failed.push((job_path, e.to_string()));
                }
            }
        }

        info!(
            "Batch complete: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn run_one(
        &self,
        job_path: &Path,
        output_dir: &Path,
        renderer: Option<&dyn Renderer>,
    ) -> Result<PathBuf, AppError> {
        let result = self.run(job_path, output_dir).await?;
        if let Some(renderer) = renderer {
            renderer.render(&result.yaml_path, Some(output_dir), true).await?;
        }
        Ok(result.yaml_path)
    }

    async fn tailor_sections(
        &self,
        job: &JobDescription,
        current: &DynamicSections,
    ) -> Result<DynamicSections, AppError> {
        let tailor = SectionTailor::new(self.llm.as_ref(), job, self.retry);

        let summary = match &current.summary {
            Some(_) => Some(vec![tailor.tailor_summary(current.current_summary()).await?]),
            None => None,
        };
        let experience = match &current.experience {
            Some(entries) => Some(tailor.tailor_experience(entries).await?),
            None => None,
        };
        let skills = match &current.skills {
            Some(skills) => Some(tailor.tailor_skills(skills).await?),
            None => None,
        };

        if summary.is_none() && experience.is_none() && skills.is_none() {
            warn!("Base resume has no summary, experience or skills to tailor");
        }

        Ok(DynamicSections {
            summary,
            experience,
            skills,
            bold_keywords: Vec::new(),
        })
    }

    async fn extract_keywords(
        &self,
        job: &JobDescription,
        draft: &MergedDocument,
    ) -> Result<Vec<String>, AppError> {
        let body = draft.sections_yaml()?;
        match self.keyword_source {
            KeywordSource::Catalog => Ok(extract_technical_terms(&body)),
            KeywordSource::Llm => {
                extract_keywords_with_llm(self.llm.as_ref(), &body, &job.text, self.retry)
                    .await
            }
        }
    }
}

/// Merges the base résumé with static sections without any model call.
pub fn untailored_document(
    static_doc: &Mapping,
    base_doc: &Mapping,
    renderer_config: &RendererConfig,
) -> Result<MergedDocument, AppError> {
    let current = DynamicSections::from_document(base_doc)?;
    merge_sections(
        static_doc,
        &current,
        &[],
        Some(renderer_config),
        base_doc.get(DESIGN_KEY),
    )
}

async fn collect_job_files(jobs_dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !jobs_dir.is_dir() {
        return Err(AppError::NotFound(format!(
            "Jobs directory not found: {}",
            jobs_dir.display()
        )));
    }

    let mut entries = tokio::fs::read_dir(jobs_dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == JOB_FILE_EXTENSION) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(AppError::Validation(format!(
            "No .{JOB_FILE_EXTENSION} job descriptions found in {}",
            jobs_dir.display()
        )));
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_yaml::Value;

    use super::*;
    use crate::document::merge::{BOLD_KEYWORDS_KEY, SETTINGS_KEY};
    use crate::document::store::testing::InMemoryStore;
    use crate::llm_client::mock::MockClient;
    use crate::llm_client::testing::ScriptedClient;
    use crate::models::resume::cv_block;

    const STATIC_YAML: &str = r#"
cv:
  name: Jane Doe
  email: jane@x.com
  sections:
    education:
      - institution: State U
"#;

    const BASE_YAML: &str = r#"
cv:
  name: Jane Doe
  sections:
    summary:
      - Engineer.
    skills:
      - label: Languages
        details: Python
    experience:
      - company: Acme
        position: Dev
        start_date: "2020-01"
        highlights:
          - Did X
"#;

    const RICH_BASE_YAML: &str = r#"
cv:
  sections:
    experience:
      - company: Acme
        position: Staff Engineer
        summary: Led the platform team
        url: https://acme.example
        start_date: "2021-03"
        highlights:
          - Did X
      - company: Globex
        position: Intern
        date: Summer 2019
        highlights:
          - Did Y
"#;

    /// Answers each prompt kind with valid structured text.
    fn tailoring_stub() -> ScriptedClient {
        ScriptedClient::new(|prompt| {
            let response = if prompt.contains("extract the company name and the job title") {
                "company: Initech\nrole: Backend Engineer\n"
            } else if prompt.contains("Rewrite the highlights") {
                "highlights:\n  - Built Python services handling 1M requests/day\n"
            } else if prompt.contains("Reorder the skill categories") {
                "skills:\n  - label: Languages\n    details: Python\n"
            } else {
                "```yaml\nsummary:\n  - Backend engineer with 5+ years of Python.\n```"
            };
            Ok(response.to_string())
        })
    }

    fn pipeline(llm: Arc<dyn CompletionClient>, store: InMemoryStore) -> TailoringPipeline {
        TailoringPipeline::new(llm, Arc::new(store), RendererConfig::default())
    }

    fn read_yaml(path: &Path) -> Mapping {
        serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    fn section_names(document: &Mapping) -> Vec<String> {
        cv_block(document)
            .and_then(|cv| cv.get("sections"))
            .and_then(Value::as_mapping)
            .map(|s| s.keys().filter_map(|k| k.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_end_to_end_tailoring() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(tailoring_stub());
        let pipeline = pipeline(llm.clone(), InMemoryStore::new(STATIC_YAML, BASE_YAML));

        let result = pipeline
            .tailor(JobDescription::new("Python backend role at Initech"), dir.path())
            .await
            .unwrap();

        assert_eq!(result.yaml_path, dir.path().join(TAILORED_FILE_NAME));
        assert_eq!(result.job.company.as_deref(), Some("Initech"));
        assert!(result.bold_keywords.contains(&"Python".to_string()));

        let document = read_yaml(&result.yaml_path);
        assert_eq!(
            section_names(&document),
            ["summary", "skills", "experience", "education"]
        );

        let cv = cv_block(&document).unwrap();
        assert_eq!(cv.get("email").and_then(Value::as_str), Some("jane@x.com"));

        let bold: Vec<&str> = document[SETTINGS_KEY][BOLD_KEYWORDS_KEY]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(bold.contains(&"Python"));

        let highlights = &cv["sections"]["experience"][0]["highlights"][0];
        assert_eq!(
            highlights.as_str(),
            Some("Built Python services handling 1M requests/day")
        );
        // details + summary + one entry + skills
        assert_eq!(llm.calls(), 4);
    }

    #[tokio::test]
    async fn test_known_company_skips_detail_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(tailoring_stub());
        let pipeline = pipeline(llm.clone(), InMemoryStore::new(STATIC_YAML, BASE_YAML));

        let mut job = JobDescription::new("Python backend role");
        job.company = Some("Globex".to_string());
        let result = pipeline.tailor(job, dir.path()).await.unwrap();

        assert_eq!(result.job.company.as_deref(), Some("Globex"));
        assert!(llm
            .prompts()
            .iter()
            .all(|p| !p.contains("extract the company name")));
    }

    #[tokio::test]
    async fn test_untailorable_run_keeps_original_content() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::fixed("Sorry, I can't produce YAML today: ["));
        let pipeline = pipeline(llm, InMemoryStore::new(STATIC_YAML, BASE_YAML))
            .with_retry_policy(RetryPolicy::new(0));

        let result = pipeline
            .tailor(JobDescription::new("Rust role"), dir.path())
            .await
            .unwrap();
        assert!(result.job.company.is_none());

        let document = read_yaml(&result.yaml_path);
        let sections = &document["cv"]["sections"];
        assert_eq!(sections["summary"][0].as_str(), Some("Engineer."));
        assert_eq!(sections["experience"][0]["highlights"][0].as_str(), Some("Did X"));
        assert_eq!(sections["skills"][0]["details"].as_str(), Some("Python"));
    }

    #[tokio::test]
    async fn test_absent_sections_are_not_tailored() {
        let dir = tempfile::tempdir().unwrap();
        let base = "cv:\n  sections:\n    skills:\n      - label: Languages\n        details: Python\n";
        let llm = Arc::new(tailoring_stub());
        let pipeline = pipeline(llm.clone(), InMemoryStore::new(STATIC_YAML, base));

        let mut job = JobDescription::new("Python role");
        job.company = Some("Acme".to_string());
        let result = pipeline.tailor(job, dir.path()).await.unwrap();

        let document = read_yaml(&result.yaml_path);
        assert_eq!(section_names(&document), ["skills", "education"]);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_settings_point_at_output_dir_and_base_design_wins() {
        let dir = tempfile::tempdir().unwrap();
        let base = format!("{BASE_YAML}design:\n  theme: sb2nov\n");
        let pipeline = pipeline(Arc::new(tailoring_stub()), InMemoryStore::new(STATIC_YAML, &base));

        let result = pipeline
            .tailor(JobDescription::new("Python role"), dir.path())
            .await
            .unwrap();
        let document = read_yaml(&result.yaml_path);

        assert_eq!(document["design"]["theme"].as_str(), Some("sb2nov"));
        assert_eq!(
            document[SETTINGS_KEY]["render_command"]["output_folder_name"].as_str(),
            Some(dir.path().display().to_string().as_str())
        );
    }

    #[tokio::test]
    async fn test_llm_keyword_source_with_mock_backend() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            Arc::new(MockClient::new("mock")),
            InMemoryStore::new(STATIC_YAML, BASE_YAML),
        )
        .with_keyword_source(KeywordSource::Llm);

        let result = pipeline
            .tailor(JobDescription::new("Kubernetes platform role"), dir.path())
            .await
            .unwrap();
        assert_eq!(result.job.company.as_deref(), Some("Tech Corp"));
        assert!(result.bold_keywords.contains(&"Kubernetes".to_string()));
    }

    #[tokio::test]
    async fn test_missing_base_resume_is_a_hard_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryStore::new(STATIC_YAML, BASE_YAML).failing_base_on(1);
        let pipeline = pipeline(Arc::new(tailoring_stub()), store);

        let err = pipeline
            .tailor(JobDescription::new("Python role"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(!dir.path().join(TAILORED_FILE_NAME).exists());
    }

    #[derive(Default)]
    struct RecordingRenderer {
        rendered: Mutex<Vec<(PathBuf, bool)>>,
    }

    #[async_trait]
    impl Renderer for RecordingRenderer {
        async fn render(
            &self,
            yaml_path: &Path,
            output_folder: Option<&Path>,
            pdf_only: bool,
        ) -> Result<PathBuf, AppError> {
            self.rendered
                .lock()
                .unwrap()
                .push((yaml_path.to_path_buf(), pdf_only));
            Ok(output_folder.unwrap().to_path_buf())
        }
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let jobs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for name in ["a_first.txt", "b_second.txt", "c_third.txt"] {
            std::fs::write(jobs.path().join(name), "Python backend role").unwrap();
        }
        std::fs::write(jobs.path().join("notes.md"), "ignored").unwrap();

        let store = InMemoryStore::new(STATIC_YAML, BASE_YAML).failing_base_on(2);
        let pipeline = pipeline(Arc::new(tailoring_stub()), store);
        let renderer = RecordingRenderer::default();

        let report = pipeline
            .run_batch(jobs.path(), out.path(), Some(&renderer))
            .await
            .unwrap();

        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, jobs.path().join("b_second.txt"));
        assert!(report.failed[0].1.contains("not found"));

        assert!(out.path().join("a_first").join(TAILORED_FILE_NAME).exists());
        assert!(!out.path().join("b_second").join(TAILORED_FILE_NAME).exists());
        assert!(out.path().join("c_third").join(TAILORED_FILE_NAME).exists());

        let rendered = renderer.rendered.lock().unwrap();
        assert_eq!(rendered.len(), 2);
        assert!(rendered.iter().all(|(_, pdf_only)| *pdf_only));
    }

    #[tokio::test]
    async fn test_batch_without_job_files_is_an_error() {
        let jobs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            Arc::new(tailoring_stub()),
            InMemoryStore::new(STATIC_YAML, BASE_YAML),
        );

        let err = pipeline.run_batch(jobs.path(), out.path(), None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    fn base_experience(base: &str) -> Value {
        let base_doc: Mapping = serde_yaml::from_str(base).unwrap();
        base_doc["cv"]["sections"]["experience"].clone()
    }

    #[test]
    fn test_untailored_document_keeps_every_entry_field() {
        let static_doc: Mapping = serde_yaml::from_str(STATIC_YAML).unwrap();
        let base_doc: Mapping = serde_yaml::from_str(RICH_BASE_YAML).unwrap();
        let merged = untailored_document(&static_doc, &base_doc, &RendererConfig::default()).unwrap();

        let experience = &merged.as_mapping()["cv"]["sections"]["experience"];
        assert_eq!(experience, &base_experience(RICH_BASE_YAML));
        assert_eq!(experience[0]["summary"].as_str(), Some("Led the platform team"));
        assert_eq!(experience[1]["date"].as_str(), Some("Summer 2019"));
    }

    #[tokio::test]
    async fn test_untailorable_entries_equal_the_originals() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::fixed("garbage: ["));
        let pipeline = pipeline(llm, InMemoryStore::new(STATIC_YAML, RICH_BASE_YAML))
            .with_retry_policy(RetryPolicy::new(0));

        let mut job = JobDescription::new("Platform role");
        job.company = Some("Initech".to_string());
        let result = pipeline.tailor(job, dir.path()).await.unwrap();

        let document = read_yaml(&result.yaml_path);
        assert_eq!(
            document["cv"]["sections"]["experience"],
            base_experience(RICH_BASE_YAML)
        );
    }

    #[tokio::test]
    async fn test_tailored_entries_keep_fields_beyond_highlights() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            Arc::new(tailoring_stub()),
            InMemoryStore::new(STATIC_YAML, RICH_BASE_YAML),
        );

        let result = pipeline
            .tailor(JobDescription::new("Python platform role"), dir.path())
            .await
            .unwrap();

        let document = read_yaml(&result.yaml_path);
        let entry = &document["cv"]["sections"]["experience"][1];
        assert_eq!(entry["date"].as_str(), Some("Summer 2019"));
        assert_eq!(
            entry["highlights"][0].as_str(),
            Some("Built Python services handling 1M requests/day")
        );
        let first = &document["cv"]["sections"]["experience"][0];
        assert_eq!(first["url"].as_str(), Some("https://acme.example"));
    }

    #[tokio::test]
    async fn test_keywords_come_from_resume_body_only() {
        let root = tempfile::tempdir().unwrap();
        let output_dir = root.path().join("react-role");
        let static_yaml = "cv:\n  name: Jane Doe\n  email: jane@x.net\n  website: https://jane.dev/react\n";
        let pipeline = pipeline(
            Arc::new(tailoring_stub()),
            InMemoryStore::new(static_yaml, BASE_YAML),
        );

        let result = pipeline
            .tailor(JobDescription::new("Python role"), &output_dir)
            .await
            .unwrap();
        assert_eq!(result.bold_keywords, ["Python"]);
    }

    #[test]
    fn test_untailored_document_keeps_base_sections() {
        let static_doc: Mapping = serde_yaml::from_str(STATIC_YAML).unwrap();
        let base_doc: Mapping = serde_yaml::from_str(BASE_YAML).unwrap();
        let merged = untailored_document(&static_doc, &base_doc, &RendererConfig::default()).unwrap();
        assert_eq!(
            merged.section_names(),
            ["summary", "skills", "experience", "education"]
        );
        assert!(merged.bold_keywords().is_empty());
    }
}
