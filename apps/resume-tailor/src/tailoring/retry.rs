//! Retry Orchestrator: the single "call → strip fence → parse → validate →
//! retry" primitive every tailoring step goes through.
//!
//! # Failure classes
//! - transport (`LlmError`): returned immediately, never retried here
//! - parse: the cleaned text is not valid YAML
//! - structure: parsed, but not a mapping or missing expected top-level keys
//! - shape: the caller's adapter rejected the validated mapping
//!
//! Parse, structure and shape failures are retried immediately (no backoff)
//! up to `max_retries` extra attempts, then the result is `Unavailable`.

use std::collections::BTreeSet;
use std::fmt;

use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::prompts::YAML_ONLY_SYSTEM;
use crate::llm_client::{strip_code_fences, CompletionClient, LlmError};

/// Extra attempts after the first one. `2` ⇒ at most 3 calls.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Result of a bounded structured call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Valid(T),
    /// Every attempt failed parsing or validation.
    Unavailable,
}

impl<T> Outcome<T> {
    #[cfg(test)]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Outcome::Unavailable)
    }

    /// Resolves to the valid value, or logs and returns `fallback`.
    pub fn or_fallback(self, label: &str, fallback: T) -> T {
        match self {
            Outcome::Valid(value) => value,
            Outcome::Unavailable => {
                warn!("{label}: retries exhausted, keeping original content");
                fallback
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// One structured request: the prompt plus the keys a valid answer must hold.
#[derive(Debug, Clone)]
pub struct StructuredRequest<'a> {
    /// Short name for logs ("summary", "highlights (Acme)", ...).
    pub label: String,
    pub prompt: String,
    pub system: Option<&'a str>,
    pub expected_fields: &'a [&'a str],
}

impl<'a> StructuredRequest<'a> {
    /// A request using the shared YAML-only system prompt.
    pub fn new(label: impl Into<String>, prompt: String, expected_fields: &'a [&'a str]) -> Self {
        Self {
            label: label.into(),
            prompt,
            system: Some(YAML_ONLY_SYSTEM),
            expected_fields,
        }
    }
}

/// Structural-validation failure: the response parsed but has the wrong outline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("response is not a mapping (got {found})")]
    NotAMapping { found: &'static str },

    #[error("missing keys {missing:?}: expected {expected:?}, got {actual:?}")]
    MissingKeys {
        expected: BTreeSet<String>,
        actual: BTreeSet<String>,
        missing: BTreeSet<String>,
    },
}

/// Why one attempt was rejected. Logged, never returned to callers.
#[derive(Debug)]
enum AttemptFailure {
    Parse(serde_yaml::Error),
    Structure(ValidationError),
    Shape(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Parse(e) => write!(f, "parse error: {e}"),
            AttemptFailure::Structure(e) => write!(f, "structural validation failed: {e}"),
            AttemptFailure::Shape(reason) => write!(f, "unexpected field shape: {reason}"),
        }
    }
}

/// Checks that `value` is a mapping holding every name in `expected` as a
/// top-level key. Pure.
pub fn validate_fields(value: Value, expected: &[&str]) -> Result<Mapping, ValidationError> {
    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(ValidationError::NotAMapping {
                found: value_kind(&other),
            })
        }
    };

    let missing: BTreeSet<String> = expected
        .iter()
        .filter(|field| !mapping.contains_key(**field))
        .map(|field| field.to_string())
        .collect();

    if missing.is_empty() {
        return Ok(mapping);
    }

    Err(ValidationError::MissingKeys {
        expected: expected.iter().map(|f| f.to_string()).collect(),
        actual: mapping
            .keys()
            .map(|k| match k.as_str() {
                Some(s) => s.to_string(),
                None => format!("{k:?}"),
            })
            .collect(),
        missing,
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Calls the model until it returns a mapping with every expected key.
pub async fn attempt(
    llm: &dyn CompletionClient,
    request: &StructuredRequest<'_>,
    policy: RetryPolicy,
) -> Result<Outcome<Mapping>, LlmError> {
    attempt_with(llm, request, policy, Ok).await
}

/// Like [`attempt`], but also runs `adapt` on the validated mapping. An
/// adapter error counts as a retryable shape failure.
pub async fn attempt_with<T, F>(
    llm: &dyn CompletionClient,
    request: &StructuredRequest<'_>,
    policy: RetryPolicy,
    adapt: F,
) -> Result<Outcome<T>, LlmError>
where
    F: Fn(Mapping) -> Result<T, String>,
{
    let total = policy.total_attempts();

    for attempt in 1..=total {
        // Transport errors propagate; only content failures are retried.
        let response = llm.complete(&request.prompt, request.system).await?;

        match parse_and_validate(&response, request.expected_fields, &adapt) {
            Ok(value) => {
                debug!("{}: valid response on attempt {attempt}/{total}", request.label);
                return Ok(Outcome::Valid(value));
            }
            Err(failure) => {
                warn!(
                    "{}: attempt {attempt}/{total} rejected: {failure}",
                    request.label
                );
                debug!("{}: raw response: {response}", request.label);
            }
        }
    }

    Ok(Outcome::Unavailable)
}

fn parse_and_validate<T, F>(
    response: &str,
    expected: &[&str],
    adapt: &F,
) -> Result<T, AttemptFailure>
where
    F: Fn(Mapping) -> Result<T, String>,
{
    let cleaned = strip_code_fences(response);
    let value: Value = serde_yaml::from_str(cleaned).map_err(AttemptFailure::Parse)?;
    let mapping = validate_fields(value, expected).map_err(AttemptFailure::Structure)?;
    adapt(mapping).map_err(AttemptFailure::Shape)
}
