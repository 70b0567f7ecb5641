use crate::config::ConfigError;
use crate::grid::error::GridError;
use crate::ingest::error::IngestError;
use crate::snapshots::SnapshotError;
use crate::table::error::TableError;
use thiserror::Error;

/// Top-level error for the pipeline binary. Every stage failure funnels here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Table(#[from] TableError),
}
