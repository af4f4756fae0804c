//! Placement requests handed to a solid-modeling backend.
//!
//! Each request is a complete description of one solid: name, dimensions,
//! origin in board space and rotation. Builders here turn resolved entities
//! into requests; they never touch the board file.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{BuildConfig, LayerStack};
use crate::geometry::outline::{BoundaryShape, OutlineError};
use crate::geometry::placement::PadPlacement;
use crate::geometry::{Compass, Euler, Point3};
use crate::parser::board_schema::*;

/// Rectangular prism laid along one trace segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracePrism {
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub origin: Point3,
    pub yaw: f64,
    pub compass: Compass,
    pub side: BoardSide,
    pub net: String,
}

/// Cylindrical end cap joining consecutive trace prisms
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Joint {
    pub name: String,
    pub radius: f64,
    pub height: f64,
    pub origin: Point3,
    pub side: BoardSide,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViaBore {
    pub name: String,
    pub radius: f64,
    pub height: f64,
    pub origin: Point3,
    pub net: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PadSolid {
    Box { length: f64, width: f64, height: f64 },
    Bore { radius: f64, height: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PadRequest {
    pub name: String,
    pub reference: String,
    pub number: String,
    pub kind: PadSolid,
    pub origin: Point3,
    pub rotation: Euler,
    pub side: BoardSide,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardBoundary {
    pub kind: BoundaryShape,
    pub z: f64,
    pub height: f64,
}

impl BoardBoundary {
    /// Boundary from the outline primitives; the first rectangle wins,
    /// otherwise the primitives must chain together.
    pub fn from_outline(primitives: &[OutlinePrimitive], stack: &LayerStack) -> Result<Self, OutlineError> {
        Ok(Self::with_shape(BoundaryShape::from_outline(primitives)?, stack))
    }

    pub fn with_shape(kind: BoundaryShape, stack: &LayerStack) -> Self {
        Self {
            kind,
            z: stack.body_fcu_z,
            height: stack.body_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPlacement {
    pub name: String,
    pub reference: String,
    pub path: PathBuf,
    pub origin: Point3,
    pub rotation: Euler,
}

/// Every request produced by one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacementBatch {
    pub traces: Vec<TracePrism>,
    pub joints: Vec<Joint>,
    pub vias: Vec<ViaBore>,
    pub pads: Vec<PadRequest>,
    pub boundary: Option<BoardBoundary>,
    pub models: Vec<ModelPlacement>,
}

impl PlacementBatch {
    pub fn request_count(&self) -> usize {
        self.traces.len()
            + self.joints.len()
            + self.vias.len()
            + self.pads.len()
            + self.boundary.iter().count()
            + self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.request_count() == 0
    }
}

fn copper_z(side: BoardSide, stack: &LayerStack) -> f64 {
    match side {
        BoardSide::Top => stack.fcu_z,
        BoardSide::Bottom => stack.bcu_z,
    }
}

/// Prism and its two end caps for an included segment. `seq` is the
/// segment's position among traces and vias in file order.
pub fn trace_requests(
    seq: usize,
    segment: &Segment,
    compass: Compass,
    length: f64,
    config: &BuildConfig,
) -> (TracePrism, [Joint; 2]) {
    let stack = config.layer_stack();
    let width = if config.use_authored_trace_width {
        segment.width
    } else {
        config.trace_width
    };
    let z = copper_z(segment.side, &stack);
    let (dx, dy) = compass.shift(width);

    let prism = TracePrism {
        name: format!("trace_seg{}", seq),
        length,
        width,
        height: config.trace_height,
        origin: Point3::new(segment.start.x + dx, segment.start.y + dy, z),
        yaw: compass.yaw(),
        compass,
        side: segment.side,
        net: segment.net.clone(),
    };

    let joint = |suffix: &str, at: Point| Joint {
        name: format!("joint_seg{}{}", seq, suffix),
        radius: width / 2.0,
        height: width,
        origin: Point3::new(at.x, at.y, z),
        side: segment.side,
    };

    (prism, [joint("A", segment.start), joint("B", segment.end)])
}

pub fn via_request(seq: usize, via: &Via, stack: &LayerStack, trace_height: f64) -> ViaBore {
    ViaBore {
        name: format!("via_net_{}", seq),
        radius: via.size / 2.0,
        height: stack.fcu_z.abs() + stack.bcu_z.abs() + trace_height,
        origin: Point3::new(via.position.x, via.position.y, stack.fcu_z),
        net: via.net.clone(),
    }
}

/// Solid for a resolved pad. `seq` counts pads across the whole board.
pub fn pad_request(seq: usize, pad: &Pad, placed: &PadPlacement, config: &BuildConfig) -> PadRequest {
    let stack = config.layer_stack();
    let (x, y) = (placed.position.x, placed.position.y);

    let (name, kind, origin, rotation) = match pad.geometry {
        PadGeometry::SmdRect { .. } | PadGeometry::SmdRoundRect { .. } => {
            let (w, h) = if config.use_authored_pad_size {
                pad.geometry.size()
            } else {
                (config.trace_width, config.trace_height)
            };
            let z = match placed.side {
                BoardSide::Top => stack.fcu_z - stack.pad_height,
                BoardSide::Bottom => stack.bcu_z + config.trace_height,
            };
            (
                format!("{}_smdpad_{}", pad.reference, seq),
                PadSolid::Box {
                    length: w * config.pad_oversize,
                    width: h * config.pad_oversize,
                    height: stack.pad_height,
                },
                Point3::new(x, y, z),
                Euler::yaw(placed.rotation),
            )
        }
        PadGeometry::ThroughHole { drill, .. } => {
            let (z, rotation) = match placed.side {
                BoardSide::Top => (stack.bcu_z + config.trace_height, Euler::new(180.0, 0.0, 0.0)),
                BoardSide::Bottom => (stack.fcu_z, Euler::yaw(placed.rotation)),
            };
            (
                format!("{}_thrupad_{}", pad.reference, seq),
                PadSolid::Bore {
                    radius: drill / 2.0 * config.drill_oversize,
                    height: stack.thruhole_height,
                },
                Point3::new(x, y, z),
                rotation,
            )
        }
    };

    PadRequest {
        name,
        reference: pad.reference.clone(),
        number: pad.number.clone(),
        kind,
        origin,
        rotation,
        side: placed.side,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn segment(side: BoardSide) -> Segment {
        Segment {
            start: Point::new(10.0, 10.0),
            end: Point::new(10.0, 15.0),
            width: 0.25,
            side,
            net: "net_2".to_string(),
            offset: 0,
        }
    }

    #[test]
    fn test_trace_requests_top() {
        let config = BuildConfig::default();
        let (prism, joints) = trace_requests(3, &segment(BoardSide::Top), Compass::N, 5.0, &config);
        assert_eq!(prism.name, "trace_seg3");
        assert_eq!(prism.yaw, 90.0);
        assert!(close(prism.origin.x, 10.375));
        assert!(close(prism.origin.y, 10.0));
        assert!(close(prism.origin.z, -0.5));
        assert_eq!(prism.width, 0.75);

        assert_eq!(joints[0].name, "joint_seg3A");
        assert_eq!(joints[1].name, "joint_seg3B");
        assert_eq!(joints[1].origin.y, 15.0);
        assert_eq!(joints[0].radius, 0.375);
        assert_eq!(joints[0].height, 0.75);
    }

    #[test]
    fn test_trace_requests_authored_width_bottom() {
        let config = BuildConfig {
            use_authored_trace_width: true,
            ..Default::default()
        };
        let (prism, joints) = trace_requests(1, &segment(BoardSide::Bottom), Compass::N, 5.0, &config);
        assert_eq!(prism.width, 0.25);
        assert!(close(prism.origin.z, 0.5));
        assert_eq!(joints[0].radius, 0.125);
    }

    #[test]
    fn test_via_request() {
        let config = BuildConfig::default();
        let via = Via {
            position: Point::new(1.0, 2.0),
            size: 0.6,
            drill: 0.3,
            net: "net_4".to_string(),
            offset: 0,
        };
        let bore = via_request(7, &via, &config.layer_stack(), config.trace_height);
        assert_eq!(bore.name, "via_net_7");
        assert!(close(bore.radius, 0.3));
        assert!(close(bore.height, 1.75));
        assert!(close(bore.origin.z, -0.5));
    }

    fn placement(side: BoardSide) -> PadPlacement {
        PadPlacement {
            reference: "J1".to_string(),
            number: "1".to_string(),
            position: Point::new(5.0, 5.0),
            rotation: 90.0,
            side,
        }
    }

    fn pad(geometry: PadGeometry) -> Pad {
        Pad {
            footprint: FootprintId(0),
            reference: "J1".to_string(),
            number: "1".to_string(),
            position: Point::new(0.0, 0.0),
            rotation: 90.0,
            geometry,
            offset: 0,
        }
    }

    #[test]
    fn test_smd_pad_request() {
        let config = BuildConfig::default();
        let p = pad(PadGeometry::SmdRect { width: 1.0, height: 2.0 });
        let request = pad_request(2, &p, &placement(BoardSide::Top), &config);
        assert_eq!(request.name, "J1_smdpad_2");
        match request.kind {
            PadSolid::Box { length, width, height } => {
                assert!(close(length, 0.7875));
                assert!(close(width, 0.7875));
                assert!(close(height, 0.315));
            }
            ref other => panic!("unexpected solid {:?}", other),
        }
        assert!(close(request.origin.z, -0.815));
        assert_eq!(request.rotation, Euler::yaw(90.0));

        let bottom = pad_request(2, &p, &placement(BoardSide::Bottom), &config);
        assert!(close(bottom.origin.z, 1.25));
    }

    #[test]
    fn test_through_hole_pad_request() {
        let config = BuildConfig::default();
        let p = pad(PadGeometry::ThroughHole {
            shape: HoleShape::Circle,
            width: 1.7,
            height: 1.7,
            drill: 1.0,
        });
        let top = pad_request(1, &p, &placement(BoardSide::Top), &config);
        assert_eq!(top.name, "J1_thrupad_1");
        assert_eq!(top.kind, PadSolid::Bore { radius: 0.6, height: config.layer_stack().thruhole_height });
        assert!(close(top.origin.z, 1.25));
        assert_eq!(top.rotation.roll, 180.0);

        let bottom = pad_request(1, &p, &placement(BoardSide::Bottom), &config);
        assert!(close(bottom.origin.z, -0.5));
        assert_eq!(bottom.rotation, Euler::yaw(90.0));
    }

    #[test]
    fn test_boundary_uses_body_stack() {
        let stack = BuildConfig::default().layer_stack();
        let rect = OutlinePrimitive::Rect {
            start: Point::new(0.0, 0.0),
            end: Point::new(20.0, 10.0),
        };
        let boundary = BoardBoundary::from_outline(&[rect], &stack).unwrap();
        assert_eq!(boundary.z, stack.body_fcu_z);
        assert_eq!(boundary.height, stack.body_height);
        assert!(matches!(boundary.kind, BoundaryShape::Rect { .. }));
    }

    #[test]
    fn test_batch_counts() {
        let mut batch = PlacementBatch::default();
        assert!(batch.is_empty());
        batch.boundary = Some(BoardBoundary::with_shape(
            BoundaryShape::Chain(Vec::new()),
            &BuildConfig::default().layer_stack(),
        ));
        assert_eq!(batch.request_count(), 1);
    }
}
