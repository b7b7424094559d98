//! Résumé sections: the static personal block, the per-job dynamic block, and
//! the renderer settings passed through to document assembly.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::errors::AppError;

/// Top-level key holding identity fields and `sections` in a RenderCV document.
pub const CV_KEY: &str = "cv";
pub const SECTIONS_KEY: &str = "sections";
pub const SUMMARY_SECTION: &str = "summary";
pub const SKILLS_SECTION: &str = "skills";
pub const EXPERIENCE_SECTION: &str = "experience";

const COMPANY_FIELD: &str = "company";
const POSITION_FIELD: &str = "position";
const HIGHLIGHTS_FIELD: &str = "highlights";

/// A single work experience entry.
///
/// Backed by the entry's own mapping so keys this tool does not interpret
/// (`date`, `summary`, `url`, ...) survive untouched and in their original
/// order. Only `company` and `position` are required.
///
/// Invariant: every stored highlight is non-empty after trimming. Enforced on
/// deserialization and by every constructor/mutator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Mapping", into = "Mapping")]
pub struct ExperienceEntry {
    fields: Mapping,
    highlights: Vec<String>,
}

impl ExperienceEntry {
    #[cfg(test)]
    pub fn new(
        company: impl Into<String>,
        position: impl Into<String>,
        start_date: impl Into<String>,
        highlights: Vec<String>,
    ) -> Self {
        let mut fields = Mapping::new();
        fields.insert(Value::from(COMPANY_FIELD), Value::from(company.into()));
        fields.insert(Value::from(POSITION_FIELD), Value::from(position.into()));
        fields.insert(Value::from("start_date"), Value::from(start_date.into()));
        fields.insert(Value::from(HIGHLIGHTS_FIELD), Value::Sequence(Vec::new()));
        Self {
            fields,
            highlights: clean_highlights(highlights),
        }
    }

    pub fn company(&self) -> &str {
        self.text(COMPANY_FIELD)
    }

    pub fn position(&self) -> &str {
        self.text(POSITION_FIELD)
    }

    /// Any field of the entry as written in the base document.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn highlights(&self) -> &[String] {
        &self.highlights
    }

    /// Returns a copy of this entry with its highlights replaced (and cleaned).
    /// Every other field is carried over unchanged.
    pub fn with_highlights(&self, highlights: Vec<String>) -> Self {
        Self {
            fields: self.fields.clone(),
            highlights: clean_highlights(highlights),
        }
    }

    fn text(&self, key: &str) -> &str {
        self.field(key).and_then(Value::as_str).unwrap_or_default()
    }
}

impl TryFrom<Mapping> for ExperienceEntry {
    type Error = String;

    fn try_from(fields: Mapping) -> Result<Self, Self::Error> {
        for key in [COMPANY_FIELD, POSITION_FIELD] {
            if !fields.get(key).is_some_and(Value::is_string) {
                return Err(format!("experience entry is missing text field '{key}'"));
            }
        }
        let highlights = match fields.get(HIGHLIGHTS_FIELD) {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_yaml::from_value::<Vec<String>>(value.clone())
                .map_err(|e| format!("invalid highlights: {e}"))?,
        };
        Ok(Self {
            fields,
            highlights: clean_highlights(highlights),
        })
    }
}

impl From<ExperienceEntry> for Mapping {
    /// Highlights go back into their original slot; an entry that had no
    /// `highlights` key keeps having none.
    fn from(entry: ExperienceEntry) -> Self {
        let mut fields = entry.fields;
        if fields.contains_key(HIGHLIGHTS_FIELD) || !entry.highlights.is_empty() {
            let highlights = entry.highlights.into_iter().map(Value::from).collect();
            fields.insert(Value::from(HIGHLIGHTS_FIELD), Value::Sequence(highlights));
        }
        fields
    }
}

/// Trims every highlight and drops the ones that end up empty.
pub fn clean_highlights(highlights: Vec<String>) -> Vec<String> {
    highlights
        .into_iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect()
}

/// Skills grouped by category. `label` is a stable identifier; tailoring may
/// only reorder categories and the contents of `details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub label: String,
    pub details: String,
}

/// Static personal data that never changes between tailoring runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticSections {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub social_networks: Vec<Mapping>,
    #[serde(default, skip_deserializing)]
    pub education: Vec<Value>,
}

impl StaticSections {
    /// Reads the typed identity view out of a static document's `cv` block.
    /// Education lives under `cv.sections.education` in RenderCV documents.
    pub fn from_document(document: &Mapping) -> Result<Self, AppError> {
        let cv = cv_block(document).ok_or_else(|| {
            AppError::Validation("Static sections document has no 'cv' block".to_string())
        })?;

        let mut sections: StaticSections = serde_yaml::from_value(Value::Mapping(cv.clone()))?;
        sections.education = section(cv, "education")
            .and_then(Value::as_sequence)
            .cloned()
            .unwrap_or_default();
        Ok(sections)
    }
}

/// Content rewritten per job. A section that is `None` was absent from the
/// base document and stays absent from the output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicSections {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<Vec<ExperienceEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<SkillCategory>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bold_keywords: Vec<String>,
}

impl DynamicSections {
    /// Extracts summary, experience and skills from a base document's
    /// `cv.sections` block. Other sections are ignored.
    pub fn from_document(document: &Mapping) -> Result<Self, AppError> {
        let Some(cv) = cv_block(document) else {
            return Ok(Self::default());
        };

        let summary = section(cv, SUMMARY_SECTION)
            .map(summary_lines)
            .transpose()?;
        let experience = section(cv, EXPERIENCE_SECTION)
            .map(|v| serde_yaml::from_value::<Vec<ExperienceEntry>>(v.clone()))
            .transpose()?;
        let skills = section(cv, SKILLS_SECTION)
            .map(|v| serde_yaml::from_value::<Vec<SkillCategory>>(v.clone()))
            .transpose()?;

        Ok(Self {
            summary,
            experience,
            skills,
            bold_keywords: Vec::new(),
        })
    }

    /// The summary paragraph (first element), or an empty string.
    pub fn current_summary(&self) -> &str {
        self.summary
            .as_ref()
            .and_then(|s| s.first())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// RenderCV summaries are a one-element list, but a bare string is common in
/// hand-written files.
fn summary_lines(value: &Value) -> Result<Vec<String>, AppError> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        other => Ok(serde_yaml::from_value(other.clone())?),
    }
}

/// RenderCV rendering configuration, passed through untouched to assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    pub theme: String,
    pub output_folder: String,
    #[serde(default)]
    pub design_overrides: Mapping,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            theme: "engineeringresumes".to_string(),
            output_folder: "./output".to_string(),
            design_overrides: Mapping::new(),
        }
    }
}

pub fn cv_block(document: &Mapping) -> Option<&Mapping> {
    document.get(CV_KEY).and_then(Value::as_mapping)
}

fn section<'a>(cv: &'a Mapping, name: &str) -> Option<&'a Value> {
    cv.get(SECTIONS_KEY)
        .and_then(Value::as_mapping)
        .and_then(|s| s.get(name))
        .filter(|v| !v.is_null())
}
