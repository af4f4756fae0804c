//! Board Schema Definitions
//!
//! Flat record types extracted from KiCad PCB files (.kicad_pcb) by the
//! positional scanner. All positions are in millimetres, all rotations in
//! degrees. Records are immutable once a scan pass has produced them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 2D point in board coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Copper side of a two-layer board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardSide {
    Top,    // F.Cu
    Bottom, // B.Cu
}

impl BoardSide {
    /// Map a canonical copper layer name to a board side.
    ///
    /// Inner layers (`In1.Cu` ...) return `None`: only two-layer boards are
    /// supported.
    pub fn from_layer(layer: &str) -> Option<Self> {
        match layer {
            "F.Cu" => Some(BoardSide::Top),
            "B.Cu" => Some(BoardSide::Bottom),
            _ => None,
        }
    }
}

/// Inclusive line range of one record in the source, plus the byte offset
/// of its first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSpan {
    pub start_line: usize,
    pub end_line: usize,
    pub offset: usize,
}

impl RecordSpan {
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Index of a footprint in scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FootprintId(pub usize);

/// Footprint (placed component) on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub id: FootprintId,
    pub reference: String,  // e.g. "R1"
    pub package: String,    // e.g. "Resistor_SMD:R_0603_1608Metric"
    pub side: BoardSide,
    pub position: Point,
    pub rotation: f64,      // as authored, validated by the placement resolver
    pub span: RecordSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountKind {
    Smd,
    ThroughHole,
}

impl MountKind {
    /// Parse the mount token of a pad record (`smd`, `thru_hole`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "smd" => Some(MountKind::Smd),
            "thru_hole" => Some(MountKind::ThroughHole),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadShape {
    Rect,
    RoundRect,
    Circle,
    Oval,
}

impl PadShape {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "rect" => Some(PadShape::Rect),
            "roundrect" => Some(PadShape::RoundRect),
            "circle" => Some(PadShape::Circle),
            "oval" => Some(PadShape::Oval),
            _ => None,
        }
    }
}

/// Copper shape around a through-hole bore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoleShape {
    Rect,
    Circle,
    Oval,
}

/// Pad geometry, one variant per supported mount/shape combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PadGeometry {
    SmdRect {
        width: f64,
        height: f64,
    },
    SmdRoundRect {
        width: f64,
        height: f64,
        corner_ratio: f64,
    },
    ThroughHole {
        shape: HoleShape,
        width: f64,
        height: f64,
        drill: f64,
    },
}

impl PadGeometry {
    pub fn mount(&self) -> MountKind {
        match self {
            PadGeometry::SmdRect { .. } | PadGeometry::SmdRoundRect { .. } => MountKind::Smd,
            PadGeometry::ThroughHole { .. } => MountKind::ThroughHole,
        }
    }

    pub fn shape(&self) -> PadShape {
        match self {
            PadGeometry::SmdRect { .. } => PadShape::Rect,
            PadGeometry::SmdRoundRect { .. } => PadShape::RoundRect,
            PadGeometry::ThroughHole { shape, .. } => match shape {
                HoleShape::Rect => PadShape::Rect,
                HoleShape::Circle => PadShape::Circle,
                HoleShape::Oval => PadShape::Oval,
            },
        }
    }

    /// Authored copper size (width, height)
    pub fn size(&self) -> (f64, f64) {
        match *self {
            PadGeometry::SmdRect { width, height }
            | PadGeometry::SmdRoundRect { width, height, .. }
            | PadGeometry::ThroughHole { width, height, .. } => (width, height),
        }
    }

    /// Whether the pad is modelled as a box whose placement origin is a corner
    /// rather than its centre.
    pub fn is_smd_box(&self) -> bool {
        self.mount() == MountKind::Smd
    }
}

/// Pad belonging to a footprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub footprint: FootprintId,
    pub reference: String,  // owning footprint's designator
    pub number: String,
    pub position: Point,    // relative to the footprint origin
    pub rotation: f64,
    pub geometry: PadGeometry,
    pub offset: usize,
}

impl Pad {
    pub fn mount(&self) -> MountKind {
        self.geometry.mount()
    }

    pub fn shape(&self) -> PadShape {
        self.geometry.shape()
    }
}

/// Copper trace segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
    pub width: f64,
    pub side: BoardSide,
    pub net: String,        // "net_<id>"
    pub offset: usize,
}

/// Plated hole joining the two copper layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub position: Point,
    pub size: f64,          // outer diameter
    pub drill: f64,
    pub net: String,
    pub offset: usize,
}

/// One fragment of the board's physical boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutlinePrimitive {
    /// Two opposite corners; a complete boundary on its own
    Rect { start: Point, end: Point },
    Line { start: Point, end: Point },
    Arc { start: Point, mid: Point, end: Point },
}

impl OutlinePrimitive {
    pub fn start_point(&self) -> Point {
        match *self {
            OutlinePrimitive::Rect { start, .. }
            | OutlinePrimitive::Line { start, .. }
            | OutlinePrimitive::Arc { start, .. } => start,
        }
    }

    pub fn end_point(&self) -> Point {
        match *self {
            OutlinePrimitive::Rect { end, .. }
            | OutlinePrimitive::Line { end, .. }
            | OutlinePrimitive::Arc { end, .. } => end,
        }
    }

    /// True when the two primitives have a start or end point in common.
    pub fn shares_endpoint(&self, other: &OutlinePrimitive) -> bool {
        let (a0, a1) = (self.start_point(), self.end_point());
        let (b0, b1) = (other.start_point(), other.end_point());
        a0 == b0 || a0 == b1 || a1 == b0 || a1 == b1
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            OutlinePrimitive::Rect { .. } => "rect",
            OutlinePrimitive::Line { .. } => "line",
            OutlinePrimitive::Arc { .. } => "arc",
        }
    }
}

impl fmt::Display for OutlinePrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlinePrimitive::Arc { start, mid, end } => {
                write!(f, "arc {} -> {} -> {}", start, mid, end)
            }
            other => write!(
                f,
                "{} {} -> {}",
                other.kind_name(),
                other.start_point(),
                other.end_point()
            ),
        }
    }
}

/// 3D package model referenced from a footprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageModel {
    pub footprint: FootprintId,
    pub reference: String,
    pub index: usize,       // 1-based within the footprint
    pub path: String,       // as authored, may contain ${KICAD8_3DMODEL_DIR}
    pub offset: [f64; 3],
    pub scale: [f64; 3],
    pub rotate: [f64; 3],
}

/// Everything the scanner extracts from one board file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardData {
    pub filename: String,
    pub footprints: Vec<Footprint>,
    pub pads: Vec<Pad>,
    pub segments: Vec<Segment>,
    pub vias: Vec<Via>,
    pub outline: Vec<OutlinePrimitive>,
    pub models: Vec<PackageModel>,
}

impl BoardData {
    pub fn footprint(&self, id: FootprintId) -> Option<&Footprint> {
        self.footprints.get(id.0)
    }

    pub fn pads_of(&self, id: FootprintId) -> impl Iterator<Item = &Pad> {
        self.pads.iter().filter(move |p| p.footprint == id)
    }
}
