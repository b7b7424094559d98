//! Document Merger: assembles the RenderCV document from static and tailored
//! sections.
//!
//! # Section order
//! `cv.sections` is always: summary, skills, experience (each only if present
//! in the dynamic sections), then every static-only section in its original
//! order. Rendering is order-sensitive, so this is a hard invariant.
//!
//! No I/O, no model calls; identical inputs give identical output.

use serde_yaml::{Mapping, Value};

use crate::errors::AppError;
use crate::models::resume::{
    cv_block, CV_KEY, EXPERIENCE_SECTION, SECTIONS_KEY, SKILLS_SECTION, SUMMARY_SECTION,
};
use crate::models::{DynamicSections, RendererConfig};

pub const SETTINGS_KEY: &str = "rendercv_settings";
pub const BOLD_KEYWORDS_KEY: &str = "bold_keywords";
pub const RENDER_COMMAND_KEY: &str = "render_command";
pub const DESIGN_KEY: &str = "design";

/// A complete, insertion-ordered document ready to be written and rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDocument(Mapping);

impl MergedDocument {
    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    /// Serializes in insertion order (never alphabetized).
    #[cfg(test)]
    pub fn to_yaml(&self) -> Result<String, AppError> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Serializes `cv.sections` only: the résumé body without identity
    /// fields or renderer settings.
    pub fn sections_yaml(&self) -> Result<String, AppError> {
        match self.sections() {
            Some(sections) => Ok(serde_yaml::to_string(sections)?),
            None => Ok(String::new()),
        }
    }

    /// Names of the `cv.sections` entries, in document order.
    pub fn section_names(&self) -> Vec<String> {
        self.sections()
            .map(|sections| {
                sections
                    .keys()
                    .filter_map(|k| k.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn sections(&self) -> Option<&Mapping> {
        cv_block(&self.0)
            .and_then(|cv| cv.get(SECTIONS_KEY))
            .and_then(Value::as_mapping)
    }

    pub fn bold_keywords(&self) -> Vec<String> {
        self.0
            .get(SETTINGS_KEY)
            .and_then(|s| s.get(BOLD_KEYWORDS_KEY))
            .and_then(Value::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Merges static and dynamic sections into a complete document.
///
/// - `cv` starts as a shallow copy of the static `cv` block; its `sections`
///   value is replaced in place (appended if the static block had none).
/// - `rendercv_settings` exists when there are keywords or a renderer config.
/// - `design`: a non-empty `base_design` wins; otherwise theme + overrides
///   from the renderer config; otherwise no design block.
pub fn merge_sections(
    static_doc: &Mapping,
    dynamic: &DynamicSections,
    bold_keywords: &[String],
    renderer_config: Option<&RendererConfig>,
    base_design: Option<&Value>,
) -> Result<MergedDocument, AppError> {
    let mut cv = cv_block(static_doc).cloned().unwrap_or_default();
    let sections = ordered_sections(&cv, dynamic)?;
    cv.insert(key(SECTIONS_KEY), Value::Mapping(sections));

    let mut document = Mapping::new();
    document.insert(key(CV_KEY), Value::Mapping(cv));

    if !bold_keywords.is_empty() || renderer_config.is_some() {
        let mut settings = Mapping::new();
        if !bold_keywords.is_empty() {
            settings.insert(key(BOLD_KEYWORDS_KEY), serde_yaml::to_value(bold_keywords)?);
        }
        if let Some(config) = renderer_config {
            let mut render_command = Mapping::new();
            render_command.insert(
                key("output_folder_name"),
                Value::String(config.output_folder.clone()),
            );
            settings.insert(key(RENDER_COMMAND_KEY), Value::Mapping(render_command));
        }
        document.insert(key(SETTINGS_KEY), Value::Mapping(settings));
    }

    if let Some(design) = base_design.filter(|d| !is_blank(d)) {
        document.insert(key(DESIGN_KEY), design.clone());
    } else if let Some(config) = renderer_config {
        let mut design = Mapping::new();
        design.insert(key("theme"), Value::String(config.theme.clone()));
        for (k, v) in &config.design_overrides {
            design.insert(k.clone(), v.clone());
        }
        document.insert(key(DESIGN_KEY), Value::Mapping(design));
    }

    Ok(MergedDocument(document))
}

fn ordered_sections(static_cv: &Mapping, dynamic: &DynamicSections) -> Result<Mapping, AppError> {
    let mut sections = Mapping::new();

    if let Some(summary) = &dynamic.summary {
        sections.insert(key(SUMMARY_SECTION), serde_yaml::to_value(summary)?);
    }
    if let Some(skills) = &dynamic.skills {
        sections.insert(key(SKILLS_SECTION), serde_yaml::to_value(skills)?);
    }
    if let Some(experience) = &dynamic.experience {
        sections.insert(key(EXPERIENCE_SECTION), serde_yaml::to_value(experience)?);
    }

    if let Some(static_sections) = static_cv.get(SECTIONS_KEY).and_then(Value::as_mapping) {
        for (name, value) in static_sections {
            if !sections.contains_key(name) {
                sections.insert(name.clone(), value.clone());
            }
        }
    }

    Ok(sections)
}

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

/// Null, empty mapping, empty list and empty string all count as "not supplied".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Mapping(m) => m.is_empty(),
        Value::Sequence(s) => s.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExperienceEntry, SkillCategory};

    fn static_doc() -> Mapping {
        serde_yaml::from_str(
            r#"
cv:
  name: Jane Doe
  email: jane@x.com
  sections:
    education:
      - institution: State U
    publications:
      - title: Paper
    skills:
      - label: Stale
        details: Static skills never win
"#,
        )
        .unwrap()
    }

    fn dynamic() -> DynamicSections {
        DynamicSections {
            summary: Some(vec!["Engineer.".to_string()]),
            experience: Some(vec![ExperienceEntry::new(
                "Acme",
                "Dev",
                "2020-01",
                vec!["Did X".to_string()],
            )]),
            skills: Some(vec![SkillCategory {
                label: "Languages".to_string(),
                details: "Python".to_string(),
            }]),
            bold_keywords: vec![],
        }
    }

    fn renderer() -> RendererConfig {
        let mut overrides = Mapping::new();
        overrides.insert(key("page_size"), key("letterpaper"));
        RendererConfig {
            theme: "classic".to_string(),
            output_folder: "out/jane".to_string(),
            design_overrides: overrides,
        }
    }

    #[test]
    fn test_section_order_dynamic_first_then_static_extras() {
        let merged = merge_sections(&static_doc(), &dynamic(), &[], None, None).unwrap();
        assert_eq!(
            merged.section_names(),
            ["summary", "skills", "experience", "education", "publications"]
        );
    }

    #[test]
    fn test_dynamic_skills_override_static_skills() {
        let merged = merge_sections(&static_doc(), &dynamic(), &[], None, None).unwrap();
        let yaml = merged.to_yaml().unwrap();
        assert!(yaml.contains("Languages"));
        assert!(!yaml.contains("Static skills never win"));
    }

    #[test]
    fn test_absent_dynamic_sections_are_skipped() {
        let partial = DynamicSections {
            summary: None,
            ..dynamic()
        };
        let merged = merge_sections(&static_doc(), &partial, &[], None, None).unwrap();
        assert_eq!(
            merged.section_names(),
            ["skills", "experience", "education", "publications"]
        );
    }

    #[test]
    fn test_static_identity_fields_are_preserved() {
        let merged = merge_sections(&static_doc(), &dynamic(), &[], None, None).unwrap();
        let cv = cv_block(merged.as_mapping()).unwrap();
        assert_eq!(cv.get("email").and_then(Value::as_str), Some("jane@x.com"));
        let keys: Vec<&str> = cv.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, ["name", "email", "sections"]);
    }

    #[test]
    fn test_sections_appended_when_static_has_none() {
        let static_doc: Mapping = serde_yaml::from_str("cv:\n  name: Jane\n").unwrap();
        let merged = merge_sections(&static_doc, &dynamic(), &[], None, None).unwrap();
        let cv = cv_block(merged.as_mapping()).unwrap();
        let keys: Vec<&str> = cv.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, ["name", "sections"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let keywords = vec!["Python".to_string()];
        let config = renderer();
        let a = merge_sections(&static_doc(), &dynamic(), &keywords, Some(&config), None).unwrap();
        let b = merge_sections(&static_doc(), &dynamic(), &keywords, Some(&config), None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_yaml().unwrap(), b.to_yaml().unwrap());
    }

    #[test]
    fn test_no_settings_or_design_without_keywords_or_config() {
        let merged = merge_sections(&static_doc(), &dynamic(), &[], None, None).unwrap();
        let keys: Vec<&str> = merged.as_mapping().keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, ["cv"]);
    }

    #[test]
    fn test_settings_block_layout() {
        let keywords = vec!["Python".to_string(), "Rust".to_string()];
        let config = renderer();
        let merged =
            merge_sections(&static_doc(), &dynamic(), &keywords, Some(&config), None).unwrap();

        let keys: Vec<&str> = merged.as_mapping().keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, ["cv", "rendercv_settings", "design"]);

        let settings = merged.as_mapping().get(SETTINGS_KEY).unwrap();
        let settings_keys: Vec<&str> = settings
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(settings_keys, ["bold_keywords", "render_command"]);
        assert_eq!(
            settings["render_command"]["output_folder_name"].as_str(),
            Some("out/jane")
        );
        assert_eq!(merged.bold_keywords(), ["Python", "Rust"]);
    }

    #[test]
    fn test_keywords_only_settings_block() {
        let keywords = vec!["Python".to_string()];
        let merged = merge_sections(&static_doc(), &dynamic(), &keywords, None, None).unwrap();
        let settings = merged.as_mapping().get(SETTINGS_KEY).unwrap();
        assert!(settings.get(RENDER_COMMAND_KEY).is_none());
        assert!(merged.as_mapping().get(DESIGN_KEY).is_none());
    }

    #[test]
    fn test_design_from_renderer_config() {
        let config = renderer();
        let merged = merge_sections(&static_doc(), &dynamic(), &[], Some(&config), None).unwrap();
        let design = merged.as_mapping().get(DESIGN_KEY).unwrap();
        assert_eq!(design["theme"].as_str(), Some("classic"));
        assert_eq!(design["page_size"].as_str(), Some("letterpaper"));
    }

    #[test]
    fn test_base_design_wins_over_renderer_config() {
        let config = renderer();
        let base_design: Value = serde_yaml::from_str("theme: sb2nov\ncolor: blue\n").unwrap();
        let merged = merge_sections(
            &static_doc(),
            &dynamic(),
            &[],
            Some(&config),
            Some(&base_design),
        )
        .unwrap();
        assert_eq!(merged.as_mapping().get(DESIGN_KEY), Some(&base_design));
    }

    #[test]
    fn test_empty_base_design_falls_back_to_config() {
        let config = renderer();
        let empty = Value::Mapping(Mapping::new());
        let merged =
            merge_sections(&static_doc(), &dynamic(), &[], Some(&config), Some(&empty)).unwrap();
        let design = merged.as_mapping().get(DESIGN_KEY).unwrap();
        assert_eq!(design["theme"].as_str(), Some("classic"));
    }

    #[test]
    fn test_override_theme_replaces_config_theme_in_place() {
        let mut config = renderer();
        config
            .design_overrides
            .insert(key("theme"), key("moderncv"));
        let merged = merge_sections(&static_doc(), &dynamic(), &[], Some(&config), None).unwrap();
        let design = merged.as_mapping().get(DESIGN_KEY).unwrap().as_mapping().unwrap();
        let keys: Vec<&str> = design.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, ["theme", "page_size"]);
        assert_eq!(design.get("theme").and_then(Value::as_str), Some("moderncv"));
    }

    #[test]
    fn test_yaml_output_preserves_insertion_order() {
        let merged = merge_sections(&static_doc(), &dynamic(), &[], None, None).unwrap();
        let yaml = merged.to_yaml().unwrap();
        let summary = yaml.find("summary:").unwrap();
        let skills = yaml.find("skills:").unwrap();
        let experience = yaml.find("experience:").unwrap();
        let education = yaml.find("education:").unwrap();
        assert!(summary < skills && skills < experience && experience < education);
    }

    #[test]
    fn test_empty_static_document() {
        let merged = merge_sections(&Mapping::new(), &dynamic(), &[], None, None).unwrap();
        assert_eq!(merged.section_names(), ["summary", "skills", "experience"]);
    }

    #[test]
    fn test_sections_yaml_excludes_identity_and_settings() {
        let static_doc: Mapping =
            serde_yaml::from_str("cv:\n  name: Jane\n  email: jane@x.net\n").unwrap();
        let dynamic = DynamicSections {
            summary: Some(vec!["Rust engineer.".to_string()]),
            ..DynamicSections::default()
        };
        let config = RendererConfig {
            output_folder: "out/react-role".to_string(),
            ..RendererConfig::default()
        };
        let merged = merge_sections(&static_doc, &dynamic, &[], Some(&config), None).unwrap();

        let body = merged.sections_yaml().unwrap();
        assert!(body.contains("Rust engineer."));
        assert!(!body.contains("jane@x.net"));
        assert!(!body.contains("react-role"));
    }
}
