//! Placement Resolver
//!
//! Converts footprint-relative pad and package-model positions into absolute
//! board coordinates. Footprint rotations are restricted to quarter turns;
//! anything else is rejected before a position is produced.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BuildConfig;
use crate::geometry::{Euler, Point3};
use crate::parser::board_schema::*;
use crate::requests::ModelPlacement;

const ANGLE_TOLERANCE: f64 = 1e-6;
const MODEL_DIR_MARKER: &str = "3DMODEL_DIR}";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    #[error("{subject} has rotation {degrees}, expected one of 0, 90, 180, 270 or -90")]
    UnresolvedRotation { subject: String, degrees: f64 },
}

/// Canonical footprint rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuarterTurn {
    R0,
    R90,
    R180,
    R270,
}

impl QuarterTurn {
    /// Accepts exactly 0, 90, 180, 270 and -90 degrees.
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        let candidates = [
            (0.0, QuarterTurn::R0),
            (90.0, QuarterTurn::R90),
            (180.0, QuarterTurn::R180),
            (270.0, QuarterTurn::R270),
            (-90.0, QuarterTurn::R270),
        ];
        candidates
            .iter()
            .find(|(angle, _)| (degrees - angle).abs() <= ANGLE_TOLERANCE)
            .map(|(_, turn)| *turn)
    }

    /// Apply the board-file rotation to a footprint-relative offset.
    ///
    /// KiCad's y axis points down, so a positive rotation maps (x, y) to
    /// (y, -x).
    pub fn rotate(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            QuarterTurn::R0 => (x, y),
            QuarterTurn::R90 => (y, -x),
            QuarterTurn::R180 => (-x, -y),
            QuarterTurn::R270 => (-y, x),
        }
    }

    /// Shift from a box's centre to the corner the backend places it by.
    pub fn box_correction(&self, width: f64, height: f64) -> (f64, f64) {
        let (hw, hh) = (width / 2.0, height / 2.0);
        match self {
            QuarterTurn::R0 => (-hw, -hh),
            QuarterTurn::R90 => (hh, -hw),
            QuarterTurn::R180 => (hw, hh),
            QuarterTurn::R270 => (-hh, hw),
        }
    }
}

/// Map any angle into [0, 360).
pub fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    if (d - 360.0).abs() <= ANGLE_TOLERANCE || d.abs() <= ANGLE_TOLERANCE {
        0.0
    } else {
        d
    }
}

fn quarter_turn(subject: impl Into<String>, degrees: f64) -> Result<QuarterTurn, PlacementError> {
    QuarterTurn::from_degrees(degrees).ok_or_else(|| PlacementError::UnresolvedRotation {
        subject: subject.into(),
        degrees,
    })
}

pub fn footprint_turn(footprint: &Footprint) -> Result<QuarterTurn, PlacementError> {
    quarter_turn(format!("footprint {}", footprint.reference), footprint.rotation)
}

/// Absolute in-plane placement of one pad
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PadPlacement {
    pub reference: String,
    pub number: String,
    pub position: Point,    // corner for SMD boxes, bore centre otherwise
    pub rotation: f64,      // pad rotation, normalized
    pub side: BoardSide,
}

/// Resolve a pad against its footprint.
///
/// Top and bottom footprints share the in-plane transform; bottom footprints
/// are already mirrored in the board file.
pub fn resolve_pad(
    footprint: &Footprint,
    pad: &Pad,
    config: &BuildConfig,
) -> Result<PadPlacement, PlacementError> {
    let turn = footprint_turn(footprint)?;
    if pad.mount() == MountKind::ThroughHole {
        quarter_turn(format!("{} pad {}", pad.reference, pad.number), pad.rotation)?;
    }

    let (dx, dy) = turn.rotate(pad.position.x, pad.position.y);
    let mut x = footprint.position.x + dx;
    let mut y = footprint.position.y + dy;

    if pad.geometry.is_smd_box() {
        let (w, h) = if config.use_authored_pad_size {
            pad.geometry.size()
        } else {
            (config.trace_width, config.trace_height)
        };
        let (cx, cy) = turn.box_correction(w, h);
        x += cx;
        y += cy;
    }

    Ok(PadPlacement {
        reference: pad.reference.clone(),
        number: pad.number.clone(),
        position: Point::new(x, y),
        rotation: normalize_degrees(pad.rotation),
        side: footprint.side,
    })
}

/// Re-root library paths (`${KICAD8_3DMODEL_DIR}/...`) under `model_root`.
pub fn resolve_model_path(authored: &str, model_root: &Path) -> PathBuf {
    match authored.find(MODEL_DIR_MARKER) {
        Some(pos) => {
            let rest = &authored[pos + MODEL_DIR_MARKER.len()..];
            model_root.join(rest.trim_start_matches(['/', '\\']))
        }
        None => PathBuf::from(authored),
    }
}

/// Place a footprint's package model.
pub fn resolve_model(
    footprint: &Footprint,
    model: &PackageModel,
    config: &BuildConfig,
) -> Result<ModelPlacement, PlacementError> {
    let turn = footprint_turn(footprint)?;
    let stack = config.layer_stack();
    let [ox, oy, oz] = model.offset;
    let rz = model.rotate[2];
    let fr = footprint.rotation;

    let (dx, dy) = turn.rotate(ox, oy);
    let x = footprint.position.x + dx;
    let y = footprint.position.y + dy;

    let (z, rotation) = match footprint.side {
        BoardSide::Top => (
            stack.body_fcu_z + config.socket_height - oz,
            Euler::new(180.0, 0.0, rz - fr),
        ),
        BoardSide::Bottom => {
            let yaw = rz + fr;
            let yaw = match QuarterTurn::from_degrees(normalize_degrees(yaw)) {
                Some(QuarterTurn::R90) => -90.0,
                Some(QuarterTurn::R270) => 90.0,
                _ => yaw,
            };
            (
                stack.body_bcu_z - config.socket_height + oz,
                Euler::new(0.0, 0.0, yaw),
            )
        }
    };

    Ok(ModelPlacement {
        name: format!("housing_{}_{}", model.reference, model.index),
        reference: model.reference.clone(),
        path: resolve_model_path(&model.path, &config.model_root),
        origin: Point3::new(x, y, z),
        rotation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn footprint(rotation: f64, side: BoardSide) -> Footprint {
        Footprint {
            id: FootprintId(0),
            reference: "U1".to_string(),
            package: "Package_SO:SOIC-8".to_string(),
            side,
            position: Point::new(100.0, 50.0),
            rotation,
            span: RecordSpan {
                start_line: 0,
                end_line: 0,
                offset: 0,
            },
        }
    }

    fn pad(x: f64, y: f64, geometry: PadGeometry) -> Pad {
        Pad {
            footprint: FootprintId(0),
            reference: "U1".to_string(),
            number: "1".to_string(),
            position: Point::new(x, y),
            rotation: 0.0,
            geometry,
            offset: 0,
        }
    }

    fn through_hole() -> PadGeometry {
        PadGeometry::ThroughHole {
            shape: HoleShape::Circle,
            width: 1.7,
            height: 1.7,
            drill: 1.0,
        }
    }

    fn close(a: Point, x: f64, y: f64) -> bool {
        (a.x - x).abs() < 1e-9 && (a.y - y).abs() < 1e-9
    }

    #[test]
    fn test_quarter_turn_from_degrees() {
        assert_eq!(QuarterTurn::from_degrees(0.0), Some(QuarterTurn::R0));
        assert_eq!(QuarterTurn::from_degrees(90.0), Some(QuarterTurn::R90));
        assert_eq!(QuarterTurn::from_degrees(180.0000001), Some(QuarterTurn::R180));
        assert_eq!(QuarterTurn::from_degrees(-90.0), Some(QuarterTurn::R270));
        assert_eq!(QuarterTurn::from_degrees(270.0), Some(QuarterTurn::R270));
        assert_eq!(QuarterTurn::from_degrees(45.0), None);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(450.0), 90.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(
            QuarterTurn::from_degrees(normalize_degrees(90.0 + 360.0)),
            QuarterTurn::from_degrees(90.0)
        );
    }

    #[test]
    fn test_through_hole_pad_transform_table() {
        let config = BuildConfig::default();
        let cases = [
            (0.0, 101.0, 52.0),
            (90.0, 102.0, 49.0),
            (180.0, 99.0, 48.0),
            (270.0, 98.0, 51.0),
            (-90.0, 98.0, 51.0),
        ];
        for (rotation, x, y) in cases {
            let placed = resolve_pad(
                &footprint(rotation, BoardSide::Top),
                &pad(1.0, 2.0, through_hole()),
                &config,
            )
            .unwrap();
            assert!(close(placed.position, x, y), "rotation {}: {}", rotation, placed.position);
        }
    }

    #[test]
    fn test_smd_box_centering() {
        let config = BuildConfig::default();
        let geometry = PadGeometry::SmdRect { width: 0.8, height: 0.95 };
        let cases = [
            (0.0, 101.0 - 0.375, 52.0 - 0.375),
            (90.0, 102.0 + 0.375, 49.0 - 0.375),
            (180.0, 99.0 + 0.375, 48.0 + 0.375),
            (270.0, 98.0 - 0.375, 51.0 + 0.375),
            (-90.0, 98.0 - 0.375, 51.0 + 0.375),
        ];
        for (rotation, x, y) in cases {
            let placed = resolve_pad(
                &footprint(rotation, BoardSide::Top),
                &pad(1.0, 2.0, geometry.clone()),
                &config,
            )
            .unwrap();
            assert!(close(placed.position, x, y), "rotation {}: {}", rotation, placed.position);
        }
    }

    #[test]
    fn test_smd_box_centering_swaps_axes_on_quarter_turns() {
        let config = BuildConfig {
            trace_width: 1.0,
            trace_height: 0.5,
            ..Default::default()
        };
        let geometry = PadGeometry::SmdRoundRect {
            width: 0.8,
            height: 0.95,
            corner_ratio: 0.25,
        };
        let cases = [
            (0.0, 100.5, 51.75),
            (90.0, 102.25, 48.5),
            (180.0, 99.5, 48.25),
            (270.0, 97.75, 51.5),
            (-90.0, 97.75, 51.5),
        ];
        for (rotation, x, y) in cases {
            let placed = resolve_pad(
                &footprint(rotation, BoardSide::Top),
                &pad(1.0, 2.0, geometry.clone()),
                &config,
            )
            .unwrap();
            assert!(close(placed.position, x, y), "rotation {}: {}", rotation, placed.position);
        }
    }

    #[test]
    fn test_authored_pad_size_centering() {
        let config = BuildConfig {
            use_authored_pad_size: true,
            ..Default::default()
        };
        let geometry = PadGeometry::SmdRect { width: 2.0, height: 1.0 };
        let placed = resolve_pad(&footprint(180.0, BoardSide::Bottom), &pad(0.0, 0.0, geometry), &config).unwrap();
        assert!(close(placed.position, 101.0, 50.5));
        assert_eq!(placed.side, BoardSide::Bottom);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let config = BuildConfig::default();
        let fp = footprint(270.0, BoardSide::Top);
        let p = pad(-0.825, 0.3, PadGeometry::SmdRect { width: 0.8, height: 0.95 });
        assert_eq!(resolve_pad(&fp, &p, &config), resolve_pad(&fp, &p, &config));
    }

    #[test]
    fn test_normalized_rotation_resolves_like_canonical() {
        let config = BuildConfig::default();
        let p = pad(1.0, 2.0, PadGeometry::SmdRect { width: 0.8, height: 0.95 });

        let canonical = resolve_pad(&footprint(90.0, BoardSide::Top), &p, &config).unwrap();
        let wrapped = resolve_pad(&footprint(normalize_degrees(450.0), BoardSide::Top), &p, &config).unwrap();
        assert_eq!(canonical, wrapped);

        let negative = resolve_pad(&footprint(normalize_degrees(-270.0), BoardSide::Top), &p, &config).unwrap();
        assert_eq!(canonical, negative);

        assert!(resolve_pad(&footprint(450.0, BoardSide::Top), &p, &config).is_err());
    }

    #[test]
    fn test_unresolved_footprint_rotation() {
        let err = resolve_pad(&footprint(45.0, BoardSide::Top), &pad(0.0, 0.0, through_hole()), &BuildConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            PlacementError::UnresolvedRotation {
                subject: "footprint U1".to_string(),
                degrees: 45.0
            }
        );
    }

    #[test]
    fn test_unresolved_through_hole_pad_rotation() {
        let mut p = pad(0.0, 0.0, through_hole());
        p.rotation = 30.0;
        assert!(resolve_pad(&footprint(0.0, BoardSide::Top), &p, &BuildConfig::default()).is_err());
    }

    #[test]
    fn test_resolve_model_path() {
        let root = Path::new("/opt/kicad/3dmodels");
        assert_eq!(
            resolve_model_path("${KICAD8_3DMODEL_DIR}/Resistor_SMD.3dshapes/R_0603.step", root),
            PathBuf::from("/opt/kicad/3dmodels/Resistor_SMD.3dshapes/R_0603.step")
        );
        assert_eq!(
            resolve_model_path("/home/me/parts/custom.step", root),
            PathBuf::from("/home/me/parts/custom.step")
        );
    }

    fn model(offset: [f64; 3], rz: f64) -> PackageModel {
        PackageModel {
            footprint: FootprintId(0),
            reference: "U1".to_string(),
            index: 1,
            path: "${KICAD8_3DMODEL_DIR}/Package_SO.3dshapes/SOIC-8.step".to_string(),
            offset,
            scale: [1.0, 1.0, 1.0],
            rotate: [0.0, 0.0, rz],
        }
    }

    #[test]
    fn test_resolve_model_top() {
        let config = BuildConfig::default();
        let placed = resolve_model(&footprint(90.0, BoardSide::Top), &model([1.0, 0.0, 0.2], 0.0), &config).unwrap();
        assert_eq!(placed.name, "housing_U1_1");
        assert!((placed.origin.x - 100.0).abs() < 1e-9);
        assert!((placed.origin.y - 49.0).abs() < 1e-9);
        assert!((placed.origin.z - (-0.8 + 0.05 - 0.2)).abs() < 1e-9);
        assert_eq!(placed.rotation, Euler::new(180.0, 0.0, -90.0));
        assert!(placed.path.starts_with("/usr/share/kicad/3dmodels"));
    }

    #[test]
    fn test_resolve_model_bottom_yaw_flip() {
        let config = BuildConfig::default();
        let placed = resolve_model(&footprint(90.0, BoardSide::Bottom), &model([0.0, 0.0, 0.0], 0.0), &config).unwrap();
        assert_eq!(placed.rotation.yaw, -90.0);
        assert_eq!(placed.rotation.roll, 0.0);
        assert!((placed.origin.z - (1.55 - 0.05)).abs() < 1e-9);

        let placed = resolve_model(&footprint(180.0, BoardSide::Bottom), &model([0.0, 0.0, 0.0], 90.0), &config).unwrap();
        assert_eq!(placed.rotation.yaw, 90.0);

        let placed = resolve_model(&footprint(0.0, BoardSide::Bottom), &model([0.0, 0.0, 0.0], 180.0), &config).unwrap();
        assert_eq!(placed.rotation.yaw, 180.0);
    }

    #[test]
    fn test_bottom_yaw_flip_uses_wrapped_angle() {
        let config = BuildConfig::default();
        let placed = resolve_model(&footprint(180.0, BoardSide::Bottom), &model([0.0, 0.0, 0.0], 270.0), &config).unwrap();
        assert_eq!(placed.rotation.yaw, -90.0);

        let placed = resolve_model(&footprint(-90.0, BoardSide::Bottom), &model([0.0, 0.0, 0.0], -180.0), &config).unwrap();
        assert_eq!(placed.rotation.yaw, -90.0);

        let placed = resolve_model(&footprint(180.0, BoardSide::Bottom), &model([0.0, 0.0, 0.0], 0.0), &config).unwrap();
        assert_eq!(placed.rotation.yaw, 180.0);
    }
}
