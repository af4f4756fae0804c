//! Geometric resolution of scanned board entities.
//!
//! - `placement`: footprint-relative pad and package-model positions to
//!   absolute board coordinates
//! - `orientation`: discrete trace direction from segment endpoints
//! - `outline`: unordered outline primitives to a connected boundary

pub mod orientation;
pub mod outline;
pub mod placement;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use orientation::{classify, classify_segment, segment_length, Compass, TraceClass};
pub use outline::{
    is_connected_loop, sequence_outline, sequence_outline_lenient, BoundaryShape, OutlineError,
    SequencedOutline,
};
pub use placement::{
    footprint_turn, normalize_degrees, resolve_model, resolve_model_path, resolve_pad,
    PadPlacement, PlacementError, QuarterTurn,
};

/// Point in board space; z is the layer-stack height
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Rotation in degrees about the x (roll), y (pitch) and z (yaw) axes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Euler {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Euler {
    pub fn yaw(yaw: f64) -> Self {
        Self {
            yaw,
            ..Default::default()
        }
    }

    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }
}
