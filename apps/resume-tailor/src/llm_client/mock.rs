//! Mock backend: canned structured text chosen by prompt shape.
//!
//! Lets the full pipeline run offline (`RESUME_TAILOR_LLM_PROVIDER=mock`).
//! It is an ordinary `CompletionClient` variant, not a special case.

use async_trait::async_trait;
use tracing::debug;

use super::{CompletionClient, LlmError};

const DETAILS_RESPONSE: &str = r#"```yaml
company: "Tech Corp"
role: "Senior Software Engineer"
```"#;

const KEYWORDS_RESPONSE: &str = r#"keywords:
  - Python
  - Kubernetes
  - Docker
  - Microservices
  - AWS
  - PostgreSQL
  - Redis
  - CI/CD
  - Terraform"#;

const HIGHLIGHTS_RESPONSE: &str = r#"highlights:
  - "Led team of 5 engineers building a microservices platform on Kubernetes serving 10M+ users"
  - "Reduced API response time by 40% through Redis caching and PostgreSQL query optimization"
  - "Designed a CI/CD pipeline with GitHub Actions and Terraform, cutting deployment time from hours to minutes""#;

const SKILLS_RESPONSE: &str = r#"skills:
  - label: Languages & Core
    details: "Python, Go, JavaScript, TypeScript, SQL"
  - label: Cloud & Infrastructure
    details: "Kubernetes, Docker, AWS, Terraform, GitHub Actions"
  - label: Databases & Caching
    details: "PostgreSQL, Redis, MongoDB, Elasticsearch""#;

const SUMMARY_RESPONSE: &str = r#"summary:
  - "Senior Backend Engineer with 5+ years of experience building Python microservices on Kubernetes and AWS. Reduced API latency by 40% and led a team of 5 engineers delivering a platform serving 10M+ users.""#;

#[derive(Debug, Clone)]
pub struct MockClient {
    model: String,
}

impl MockClient {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }

    fn respond(prompt: &str) -> &'static str {
        let lower = prompt.to_lowercase();
        if lower.contains("company name and the job title") {
            DETAILS_RESPONSE
        } else if lower.contains("technical terms") {
            KEYWORDS_RESPONSE
        } else if lower.contains("rewrite the highlights") {
            HIGHLIGHTS_RESPONSE
        } else if lower.contains("skill categor") {
            SKILLS_RESPONSE
        } else {
            SUMMARY_RESPONSE
        }
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn complete(&self, prompt: &str, _system: Option<&str>) -> Result<String, LlmError> {
        let response = Self::respond(prompt);
        debug!("Mock completion ({} chars)", response.len());
        Ok(response.to_string())
    }

    fn model(&self) -> &str {
        &self.model
    }
}
