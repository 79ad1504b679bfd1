// Records: the owned `EmissionRecord`, its stores, and the pipeline that
// turns uploads and manual entries into records.

pub mod archive;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod store;

pub use pipeline::RecordPipeline;
pub use store::{MemoryRecordStore, PgRecordStore, RecordStore};
