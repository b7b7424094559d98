//! Section Tailoring Operations: thin adapters over the retry primitive.
//!
//! Each operation builds its prompt, names the field it expects back, and
//! converts the validated mapping into its section type. When the model
//! never produces a usable answer the original content is returned.

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::CompletionClient;
use crate::models::resume::{clean_highlights, SKILLS_SECTION, SUMMARY_SECTION};
use crate::models::{ExperienceEntry, JobDescription, SkillCategory};
use crate::tailoring::prompts::{highlights_prompt, skills_prompt, summary_prompt};
use crate::tailoring::retry::{attempt_with, RetryPolicy, StructuredRequest};

const HIGHLIGHTS_FIELD: &str = "highlights";

/// Tailors the dynamic sections of one résumé against one job.
pub struct SectionTailor<'a> {
    llm: &'a dyn CompletionClient,
    job: &'a JobDescription,
    policy: RetryPolicy,
}

impl<'a> SectionTailor<'a> {
    pub fn new(llm: &'a dyn CompletionClient, job: &'a JobDescription, policy: RetryPolicy) -> Self {
        Self { llm, job, policy }
    }

    /// Rewrites the summary paragraph. Falls back to `current`.
    pub async fn tailor_summary(&self, current: &str) -> Result<String, AppError> {
        info!("Tailoring summary for {}", self.job.display_role());

        let request = StructuredRequest::new(
            SUMMARY_SECTION,
            summary_prompt(&self.job.text, current),
            &[SUMMARY_SECTION],
        );
        let outcome = attempt_with(self.llm, &request, self.policy, summary_from).await?;
        Ok(outcome.or_fallback("summary", current.to_string()))
    }

    /// Rewrites the highlights of a single entry. Every other field is kept.
    pub async fn tailor_highlights(
        &self,
        entry: &ExperienceEntry,
    ) -> Result<ExperienceEntry, AppError> {
        if entry.highlights().is_empty() {
            debug!("{} has no highlights, skipping", entry.company());
            return Ok(entry.clone());
        }

        let mut current = Mapping::new();
        current.insert(
            Value::from(HIGHLIGHTS_FIELD),
            serde_yaml::to_value(entry.highlights())?,
        );
        let highlights_yaml = serde_yaml::to_string(&current)?;

        let label = format!("highlights ({})", entry.company());
        let request = StructuredRequest::new(
            label.clone(),
            highlights_prompt(&self.job.text, entry.company(), entry.position(), &highlights_yaml),
            &[HIGHLIGHTS_FIELD],
        );
        let outcome = attempt_with(self.llm, &request, self.policy, highlights_from).await?;
        let highlights = outcome.or_fallback(&label, entry.highlights().to_vec());

        Ok(entry.with_highlights(highlights))
    }

    /// Tailors every entry in order, one call at a time. A failed entry keeps
    /// its original highlights without affecting its siblings.
    pub async fn tailor_experience(
        &self,
        entries: &[ExperienceEntry],
    ) -> Result<Vec<ExperienceEntry>, AppError> {
        info!("Tailoring {} experience entries", entries.len());

        let mut tailored = Vec::with_capacity(entries.len());
        for entry in entries {
            tailored.push(self.tailor_highlights(entry).await?);
        }
        Ok(tailored)
    }

    /// Reorders skill categories and their details. Falls back to `current`.
    pub async fn tailor_skills(
        &self,
        current: &[SkillCategory],
    ) -> Result<Vec<SkillCategory>, AppError> {
        if current.is_empty() {
            return Ok(Vec::new());
        }
        info!("Tailoring {} skill categories", current.len());

        let mut skills = Mapping::new();
        skills.insert(Value::from(SKILLS_SECTION), serde_yaml::to_value(current)?);
        let skills_yaml = serde_yaml::to_string(&skills)?;

        let request = StructuredRequest::new(
            SKILLS_SECTION,
            skills_prompt(&self.job.text, &skills_yaml),
            &[SKILLS_SECTION],
        );
        let outcome = attempt_with(self.llm, &request, self.policy, skills_from).await?;
        Ok(outcome.or_fallback(SKILLS_SECTION, current.to_vec()))
    }
}

/// `summary` may be a one-element list or a bare string.
fn summary_from(mut response: Mapping) -> Result<String, String> {
    let summary = match response.remove(SUMMARY_SECTION) {
        Some(Value::String(text)) => text,
        Some(Value::Sequence(items)) => match items.into_iter().next() {
            Some(Value::String(text)) => text,
            other => return Err(format!("summary list does not start with text: {other:?}")),
        },
        other => return Err(format!("summary is neither text nor a list: {other:?}")),
    };

    let summary = summary.trim();
    if summary.is_empty() {
        return Err("summary is empty".to_string());
    }
    Ok(summary.to_string())
}

/// `highlights` must be a list of strings; a single string is wrapped.
fn highlights_from(mut response: Mapping) -> Result<Vec<String>, String> {
    let raw = match response.remove(HIGHLIGHTS_FIELD) {
        Some(Value::String(text)) => vec![text],
        Some(value @ Value::Sequence(_)) => serde_yaml::from_value::<Vec<String>>(value)
            .map_err(|e| format!("highlights is not a list of strings: {e}"))?,
        other => return Err(format!("highlights is not a list: {other:?}")),
    };

    let highlights = clean_highlights(raw);
    if highlights.is_empty() {
        return Err("every highlight was blank".to_string());
    }
    Ok(highlights)
}

fn skills_from(mut response: Mapping) -> Result<Vec<SkillCategory>, String> {
    let value = response.remove(SKILLS_SECTION).unwrap_or(Value::Null);
    let skills: Vec<SkillCategory> = serde_yaml::from_value(value)
        .map_err(|e| format!("skills are not label/details pairs: {e}"))?;
    if skills.is_empty() {
        return Err("skills list is empty".to_string());
    }
    Ok(skills)
}
