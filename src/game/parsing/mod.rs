pub mod notes;
pub mod simfile;
pub mod tags;

use std::path::PathBuf;
use thiserror::Error;

/// The chart text could not be turned into a playable chart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("no NOTES section found in simfile")]
    MissingNotes,
    #[error("invalid bpm: {bpm} (must be between 1 and {max})", max = crate::game::chart::MAX_SUPPORTED_BPM)]
    InvalidBpm { bpm: i32 },
    #[error("undecodable note grid in measure {measure}: {reason}")]
    InvalidGrid { measure: usize, reason: String },
}

/// Failure to load a chart from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read simfile {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Format(#[from] FormatError),
}
