//! Scanner tests against fixture boards

use dissolv::parser::{BoardScanner, BoardSide, MountKind, OutlinePrimitive, PadShape, Point, RecordKind, ScanError};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_scan_two_footprint_board() {
    let board = dissolv::parse_board(&fixture_path("two_footprints.kicad_pcb"))
        .expect("fixture should scan");

    assert_eq!(board.filename, "two_footprints.kicad_pcb");
    assert_eq!(board.footprints.len(), 2);
    assert_eq!(board.pads.len(), 4);
    assert_eq!(board.segments.len(), 2);
    assert_eq!(board.vias.len(), 1);
    assert_eq!(board.outline.len(), 1, "silkscreen graphics must not reach the outline");
    assert_eq!(board.models.len(), 2);

    let r1 = &board.footprints[0];
    assert_eq!(r1.reference, "R1");
    assert_eq!(r1.side, BoardSide::Top);
    assert_eq!(r1.position, Point::new(120.0, 80.0));
    assert_eq!(r1.rotation, 0.0);

    let j1 = &board.footprints[1];
    assert_eq!(j1.reference, "J1");
    assert_eq!(j1.side, BoardSide::Bottom);
    assert_eq!(j1.rotation, 90.0);
    assert!(j1.span.start_line > r1.span.end_line);
}

#[test]
fn test_pads_belong_to_their_footprint() {
    let board = dissolv::parse_board(&fixture_path("two_footprints.kicad_pcb")).unwrap();

    let r1_pads: Vec<_> = board.pads_of(board.footprints[0].id).collect();
    assert_eq!(r1_pads.len(), 2);
    assert!(r1_pads.iter().all(|p| p.mount() == MountKind::Smd));
    assert_eq!(r1_pads[0].shape(), PadShape::RoundRect);
    assert_eq!(r1_pads[1].shape(), PadShape::Rect);

    let j1_pads: Vec<_> = board.pads_of(board.footprints[1].id).collect();
    assert_eq!(j1_pads.len(), 2);
    assert!(j1_pads.iter().all(|p| p.reference == "J1"));
    assert_eq!(j1_pads[1].position, Point::new(0.0, -2.54));
    assert_eq!(j1_pads[1].shape(), PadShape::Oval);
}

#[test]
fn test_segments_vias_and_nets() {
    let board = dissolv::parse_board(&fixture_path("two_footprints.kicad_pcb")).unwrap();

    let seg = &board.segments[0];
    assert_eq!(seg.start, Point::new(120.9125, 80.0));
    assert_eq!(seg.end, Point::new(125.9125, 80.0));
    assert_eq!(seg.width, 0.25);
    assert_eq!(seg.net, "net_1");

    let via = &board.vias[0];
    assert_eq!(via.position, Point::new(125.9125, 80.0));
    assert_eq!(via.drill, 0.3);
    assert!(via.offset > board.segments[1].offset);
}

#[test]
fn test_model_records() {
    let board = dissolv::parse_board(&fixture_path("two_footprints.kicad_pcb")).unwrap();
    let j1_model = &board.models[1];
    assert_eq!(j1_model.reference, "J1");
    assert_eq!(j1_model.index, 1);
    assert_eq!(j1_model.rotate, [0.0, 0.0, 90.0]);
    assert!(j1_model.path.starts_with("${KICAD8_3DMODEL_DIR}/Connector_PinHeader_2.54mm.3dshapes/"));
}

#[test]
fn test_outline_of_lines_and_arc() {
    let board = dissolv::parse_board(&fixture_path("arc_outline.kicad_pcb")).unwrap();
    assert_eq!(board.outline.len(), 4);
    assert!(matches!(board.outline[3], OutlinePrimitive::Arc { .. }));
    assert_eq!(board.segments.len(), 2);
    assert!(board.segments.iter().all(|s| s.side == BoardSide::Bottom));
    assert!(board.footprints.is_empty());
}

#[test]
fn test_custom_outline_layer() {
    let text = std::fs::read_to_string(fixture_path("two_footprints.kicad_pcb")).unwrap();
    let board = BoardScanner::new()
        .with_outline_layer("F.SilkS")
        .scan_str(&text, "silk")
        .unwrap();
    assert_eq!(board.outline.len(), 1);
    assert!(matches!(board.outline[0], OutlinePrimitive::Line { .. }));
}

#[test]
fn test_unsupported_pad_is_fatal() {
    let err = dissolv::parse_board(&fixture_path("unsupported_pad.kicad_pcb")).unwrap_err();
    match err {
        dissolv::DissolvError::Scan(ScanError::UnsupportedGeometry { kind, subject, .. }) => {
            assert_eq!(kind, RecordKind::Pad);
            assert_eq!(subject, "TP1 pad 1");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_file() {
    let result = dissolv::parse_board(&fixture_path("does_not_exist.kicad_pcb"));
    assert!(matches!(
        result,
        Err(dissolv::DissolvError::Scan(ScanError::Io(_)))
    ));
}

#[test]
fn test_truncated_footprint_reports_line() {
    let text = "(kicad_pcb\n\t(footprint \"R\"\n\t\t(layer \"F.Cu\")\n\t\t(uuid \"u\")\n";
    let err = BoardScanner::new().scan_str(text, "cut").unwrap_err();
    match err {
        ScanError::MalformedRecord { kind, line, detail, .. } => {
            assert_eq!(kind, RecordKind::Footprint);
            assert_eq!(line, 5);
            assert!(detail.contains("at"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
