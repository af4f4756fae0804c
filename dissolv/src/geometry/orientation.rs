//! Orientation Classifier
//!
//! Buckets a trace segment into one of eight compass directions. Diagonals
//! are not measured: any run that changes both x and y lands in one of the
//! four 45-degree buckets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parser::board_schema::{Point, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compass {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Compass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compass::N => "N",
            Compass::S => "S",
            Compass::E => "E",
            Compass::W => "W",
            Compass::NE => "NE",
            Compass::NW => "NW",
            Compass::SE => "SE",
            Compass::SW => "SW",
        }
    }

    /// Rotation of a trace prism laid along this direction.
    pub fn yaw(&self) -> f64 {
        match self {
            Compass::E => 0.0,
            Compass::NE => 45.0,
            Compass::N => 90.0,
            Compass::NW => 135.0,
            Compass::W => 180.0,
            Compass::SW => 225.0,
            Compass::S => -90.0,
            Compass::SE => 315.0,
        }
    }

    /// Origin shift that centres a prism of the given width on the segment.
    pub fn shift(&self, width: f64) -> (f64, f64) {
        let half = width / 2.0;
        let d = half / std::f64::consts::SQRT_2;
        match self {
            Compass::N => (half, 0.0),
            Compass::S => (-half, 0.0),
            Compass::E => (0.0, -half),
            Compass::W => (0.0, half),
            Compass::NE => (d, -d),
            Compass::NW => (d, d),
            Compass::SW => (-d, d),
            Compass::SE => (-d, -d),
        }
    }
}

impl fmt::Display for Compass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

pub fn classify(start: Point, end: Point) -> Compass {
    if start.x == end.x {
        if start.y < end.y {
            Compass::N
        } else {
            Compass::S
        }
    } else if start.y == end.y {
        if start.x < end.x {
            Compass::E
        } else {
            Compass::W
        }
    } else {
        match (start.x < end.x, start.y < end.y) {
            (true, true) => Compass::NE,
            (true, false) => Compass::SE,
            (false, true) => Compass::NW,
            (false, false) => Compass::SW,
        }
    }
}

/// Euclidean length rounded to 4 decimals.
pub fn segment_length(start: Point, end: Point) -> f64 {
    let len = (end.x - start.x).hypot(end.y - start.y);
    (len * 10_000.0).round() / 10_000.0
}

/// Outcome of classifying one segment against the minimum trace length
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum TraceClass {
    Included { compass: Compass, length: f64 },
    Excluded { length: f64 },
}

pub fn classify_segment(segment: &Segment, min_length: f64) -> TraceClass {
    let length = segment_length(segment.start, segment.end);
    if length < min_length {
        TraceClass::Excluded { length }
    } else {
        TraceClass::Included {
            compass: classify(segment.start, segment.end),
            length,
        }
    }
}
