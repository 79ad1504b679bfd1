// Extraction: uploaded documents and free text → structured `Analysis`.
// All text-model calls go through llm_client; failures recover via the fallback matcher.

pub mod adapter;
pub mod document;
pub mod fallback;
pub mod models;
pub mod prompts;

pub use adapter::ExtractionAdapter;
pub use document::{FileType, UploadedFile};
pub use models::{Analysis, Extraction};
