//! Error types for render passes.

use std::path::PathBuf;

use crate::fonts::FontError;
use crate::video::VideoError;

/// Errors that can occur while rendering an image or a video frame.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Invalid column count, worker count, scale and similar settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to decode '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// `color_variance` was asked to measure a region without pixels.
    #[error("Empty sampling region at ({x}, {y}) with size {width}x{height}")]
    EmptyRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("Worker failed while sampling cell (row {row}, column {column}): {detail}")]
    WorkerFault {
        row: u32,
        column: u32,
        detail: String,
    },

    #[error("Pass incomplete: expected {expected} cell results, received {received}")]
    IncompleteAssembly { expected: usize, received: usize },

    #[error("Failed to write output '{}': {source}", path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode output '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Render pass aborted")]
    Aborted,

    #[error("Worker pool is not accepting jobs")]
    PoolClosed,

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Font(#[from] FontError),
}

impl RenderError {
    /// Whether the pass failed because the output could not be written.
    pub fn is_sink_error(&self) -> bool {
        matches!(self, RenderError::Sink { .. } | RenderError::Encode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_fault_names_the_cell() {
        let err = RenderError::WorkerFault {
            row: 3,
            column: 7,
            detail: "boom".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("row 3"));
        assert!(msg.contains("column 7"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_incomplete_assembly_display() {
        let err = RenderError::IncompleteAssembly {
            expected: 50,
            received: 49,
        };
        assert_eq!(
            err.to_string(),
            "Pass incomplete: expected 50 cell results, received 49"
        );
    }

    #[test]
    fn test_sink_error_classification() {
        let err = RenderError::Sink {
            path: PathBuf::from("out.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.is_sink_error());
        assert!(!RenderError::Aborted.is_sink_error());
    }
}
