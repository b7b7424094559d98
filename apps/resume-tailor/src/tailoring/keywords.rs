//! Keyword Extractor: technical terms to bold in the rendered résumé.
//!
//! The default path is a pure catalog scan over the serialized document. The
//! optional model path goes through the retry primitive and falls back to an
//! empty list.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::CompletionClient;
use crate::tailoring::prompts::resume_keywords_prompt;
use crate::tailoring::retry::{attempt_with, Outcome, RetryPolicy, StructuredRequest};

const KEYWORDS_FIELD: &str = "keywords";

/// Where bold keywords come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeywordSource {
    /// Deterministic scan against the built-in term catalog.
    #[default]
    Catalog,
    /// Ask the model for job-relevant terms.
    Llm,
}

impl KeywordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordSource::Catalog => "catalog",
            KeywordSource::Llm => "llm",
        }
    }
}

impl fmt::Display for KeywordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeywordSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "catalog" => Ok(KeywordSource::Catalog),
            "llm" => Ok(KeywordSource::Llm),
            other => anyhow::bail!("Unknown keyword source '{other}' (expected catalog or llm)"),
        }
    }
}

/// One named family of terms. Matching is case-insensitive.
struct TermGroup {
    name: &'static str,
    terms: &'static [&'static str],
}

// Bare "Go" is left out: it collides with the English verb.
const CATALOG: &[TermGroup] = &[
    TermGroup {
        name: "languages",
        terms: &[
            "Python", "Java", "JavaScript", "TypeScript", "Golang", "Rust", "C++", "C#",
            "Ruby", "PHP", "Kotlin", "Swift", "Scala", "Elixir", "Haskell", "SQL", "Bash",
            "Perl", "Lua", "Dart", "Objective-C",
        ],
    },
    TermGroup {
        name: "frameworks",
        terms: &[
            "React", "Angular", "Vue.js", "Vue", "Next.js", "Node.js", "Express.js", "Django",
            "Flask", "FastAPI", "Spring Boot", "Ruby on Rails", "Rails", "Laravel", "Symfony",
            ".NET", "ASP.NET", "Tokio", "Actix", "Axum", "TensorFlow", "PyTorch", "Pandas",
            "NumPy", "scikit-learn", "Celery",
        ],
    },
    TermGroup {
        name: "databases",
        terms: &[
            "PostgreSQL", "Postgres", "MySQL", "MongoDB", "SQLite", "Redis", "Elasticsearch",
            "DynamoDB", "Cassandra", "Snowflake", "BigQuery", "Kafka", "RabbitMQ", "NoSQL",
        ],
    },
    TermGroup {
        name: "cloud and devops",
        terms: &[
            "AWS", "Azure", "GCP", "Google Cloud", "Docker", "Kubernetes", "Helm", "Terraform",
            "Ansible", "Jenkins", "GitHub Actions", "GitLab CI", "CircleCI", "CI/CD",
            "ArgoCD", "CloudFormation", "Prometheus", "Grafana", "Datadog", "Linux", "Nginx",
            "EC2", "S3",
        ],
    },
    TermGroup {
        name: "collaboration",
        terms: &["Git", "GitHub", "GitLab", "Bitbucket", "Jira", "Confluence", "Slack", "Figma"],
    },
    TermGroup {
        name: "methodologies",
        terms: &[
            "Agile", "Scrum", "Kanban", "TDD", "BDD", "DevOps", "Microservices", "Microservice",
            "REST API", "RESTful", "GraphQL", "gRPC", "Event-Driven", "Domain-Driven Design",
            "Distributed Systems", "Machine Learning", "Serverless", "OOP",
        ],
    },
];

static CATALOG_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    CATALOG
        .iter()
        .map(|group| (group.name, compile_group(group.terms)))
        .collect()
});

/// One alternation per group, longest term first so "JavaScript" wins over
/// "Java". Word boundaries are only placed next to word characters, so terms
/// like "C++" and ".NET" still match.
fn compile_group(terms: &[&str]) -> Regex {
    let mut sorted = terms.to_vec();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let alternatives: Vec<String> = sorted.iter().map(|term| term_pattern(term)).collect();
    Regex::new(&format!("(?i)(?:{})", alternatives.join("|"))).expect("valid keyword catalog regex")
}

fn term_pattern(term: &str) -> String {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let lead = if is_word(term.chars().next()) { r"\b" } else { "" };
    let trail = if is_word(term.chars().last()) { r"\b" } else { "" };
    format!("{lead}{}{trail}", regex::escape(term))
}

/// Scans `text` for catalog terms.
///
/// Matches from every group are ordered by position; the first casing seen
/// for a term is kept, later duplicates (case-insensitive) are dropped, and
/// the result is sorted case-insensitively. Same input, same output.
pub fn extract_technical_terms(text: &str) -> Vec<String> {
    let mut matches: Vec<(usize, &str)> = CATALOG_PATTERNS
        .iter()
        .flat_map(|(_, pattern)| pattern.find_iter(text))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    matches.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.len().cmp(&a.1.len())));

    let mut seen = HashSet::new();
    let mut terms: Vec<String> = Vec::new();
    for (_, term) in matches {
        if seen.insert(term.to_lowercase()) {
            terms.push(term.to_string());
        }
    }

    terms.sort_by_key(|term| term.to_lowercase());
    terms
}

/// Asks the model which résumé terms matter for this job. Exhausted retries
/// give an empty list.
pub async fn extract_keywords_with_llm(
    llm: &dyn CompletionClient,
    resume_content: &str,
    jd_text: &str,
    policy: RetryPolicy,
) -> Result<Vec<String>, AppError> {
    let request = StructuredRequest::new(
        KEYWORDS_FIELD,
        resume_keywords_prompt(resume_content, jd_text),
        &[KEYWORDS_FIELD],
    );

    match attempt_with(llm, &request, policy, keywords_from).await? {
        Outcome::Valid(keywords) => {
            info!("Extracted {} keywords", keywords.len());
            Ok(keywords)
        }
        Outcome::Unavailable => {
            warn!("Keyword extraction failed, continuing without bold keywords");
            Ok(Vec::new())
        }
    }
}

fn keywords_from(mut response: Mapping) -> Result<Vec<String>, String> {
    let items = match response.remove(KEYWORDS_FIELD) {
        Some(Value::Sequence(items)) => items,
        Some(Value::Null) => Vec::new(),
        other => return Err(format!("keywords is not a list: {other:?}")),
    };

    let mut seen = HashSet::new();
    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|k| !k.is_empty() && seen.insert(k.to_lowercase()))
        .map(str::to_string)
        .collect())
}
