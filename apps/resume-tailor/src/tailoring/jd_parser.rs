//! Job-Detail Extractor: company name and role title from a raw posting.

use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::CompletionClient;
use crate::models::JobDetails;
use crate::tailoring::prompts::job_details_prompt;
use crate::tailoring::retry::{attempt, Outcome, RetryPolicy, StructuredRequest};

const DETAIL_FIELDS: &[&str] = &["company", "role"];

/// Asks the model for `{company, role}`. Exhausted retries yield empty details;
/// the run continues without them.
pub async fn extract_job_details(
    llm: &dyn CompletionClient,
    jd_text: &str,
    policy: RetryPolicy,
) -> Result<JobDetails, AppError> {
    let request = StructuredRequest::new("job details", job_details_prompt(jd_text), DETAIL_FIELDS);

    match attempt(llm, &request, policy).await? {
        Outcome::Valid(response) => {
            let details = details_from(&response);
            info!(
                "Job details: {} / {}",
                details.company.as_deref().unwrap_or("unknown company"),
                details.role.as_deref().unwrap_or("unknown role"),
            );
            Ok(details)
        }
        Outcome::Unavailable => {
            warn!("Could not extract job details, continuing without them");
            Ok(JobDetails::default())
        }
    }
}

fn details_from(response: &Mapping) -> JobDetails {
    JobDetails {
        company: text_field(response, "company"),
        role: text_field(response, "role"),
    }
}

/// Null, non-text and blank values all count as absent.
fn text_field(response: &Mapping, field: &str) -> Option<String> {
    response
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
