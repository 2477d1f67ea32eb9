pub mod dataset;
pub mod export;
pub mod ingest;
pub mod reference;
pub mod snapshot;

pub use dataset::{AtomRecord, Dataset};
pub use export::export_dataset;
pub use ingest::{IngestStats, Ingestor};
pub use reference::reference_dataset;
pub use snapshot::{SnapshotData, SnapshotDescription, SnapshotManager};
