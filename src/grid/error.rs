use crate::snapshots::SnapshotError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("Failed to read boundary file '{0}'")]
    BoundaryRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse boundary GeoJSON '{0}'")]
    BoundaryParse(PathBuf, #[source] geojson::Error),

    #[error("Boundary file '{0}' contains no polygonal geometry")]
    BoundaryNotPolygonal(PathBuf),

    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to write grid file '{0}'")]
    GridWrite(PathBuf, #[source] std::io::Error),
}
