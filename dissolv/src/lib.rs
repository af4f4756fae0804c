//! Dissolv - KiCad board to solid-model placement library
//!
//! This library reads KiCad 8 board files (.kicad_pcb) and turns the copper
//! traces, vias, pads, board outline and package models into placement
//! requests for a solid-modeling backend.
//!
//! # Quick Start
//!
//! ```no_run
//! use dissolv::{BuildConfig, DissolvCore};
//! use std::path::Path;
//!
//! let config = BuildConfig::default();
//! let result = DissolvCore::build(Path::new("board.kicad_pcb"), &config).unwrap();
//!
//! for trace in &result.batch.traces {
//!     println!("{} {} {:.3}mm", trace.name, trace.compass, trace.length);
//! }
//! ```
//!
//! # Pipeline
//!
//! - **Scanner**: footprints, pads, segments, vias, outline, package models
//! - **Placement**: footprint-relative positions to board coordinates
//! - **Orientation**: compass direction and length of each trace
//! - **Outline**: unordered edge primitives to a connected boundary

pub mod backend;
pub mod config;
pub mod core;
pub mod geometry;
pub mod parser;
pub mod requests;

// Re-export main types
pub use backend::{BackendError, ModelingBackend, RecordingBackend};
pub use config::{BuildConfig, LayerStack};
pub use crate::core::{BuildEvent, BuildResult, BuildStats, DissolvCore, DissolvError};
pub use geometry::{Compass, Euler, OutlineError, PlacementError, Point3, QuarterTurn};
pub use parser::board::{BoardScanner, ScanError};
pub use parser::board_schema::BoardData;
pub use requests::PlacementBatch;

/// Parse a board file with the default outline layer (convenience wrapper).
pub fn parse_board(path: &std::path::Path) -> Result<BoardData, DissolvError> {
    Ok(BoardScanner::new().scan_path(path)?)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BoardData, BuildConfig, BuildEvent, BuildResult, DissolvCore, DissolvError,
        ModelingBackend, PlacementBatch, RecordingBackend,
    };
}
