//! Identification and reorganization of ROM files.
//!
//! - `resolver`: console aliases and collection directory lookup
//! - `transform`: move/extract/repack with no window where the payload is lost
//! - `engine`: per-file pipeline over a bounded worker pool
//! - `missing`: collection completeness reports

pub mod engine;
pub mod missing;
pub mod resolver;
pub mod transform;

pub use engine::{
    BatchSummary, EngineOptions, FileOutcome, FileStatus, Mode, ReorganizationEngine, SkipReason,
};
pub use missing::{missing_in_collection, MissingReport};
pub use resolver::{resolve_console, AliasTable, DestinationResolver};
pub use transform::{ArchiveTransform, Strategy, TransformError, TransformResult};
