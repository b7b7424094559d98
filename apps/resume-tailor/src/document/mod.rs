// Document assembly: loading the input YAML, merging sections, writing output.
// Pure merge logic lives in merge.rs; all filesystem access lives in store.rs.

pub mod merge;
pub mod store;

pub use merge::{merge_sections, MergedDocument};
pub use store::{save_yaml, DocumentStore, FileDocumentStore};
