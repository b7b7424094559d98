// Résumé tailoring: per-section model calls behind one retry/validate primitive,
// deterministic keyword extraction, and the orchestrator that ties them together.
//
// Every model call goes through retry::attempt / attempt_with. Nothing in this
// module retries on its own.

pub mod jd_parser;
pub mod keywords;
pub mod pipeline;
pub mod prompts;
pub mod retry;
pub mod sections;

pub use pipeline::TailoringPipeline;
pub use retry::RetryPolicy;
