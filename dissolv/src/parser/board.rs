//! KiCad 8 Board Scanner
//!
//! Positional scanner over `.kicad_pcb` files. Instead of building a full
//! S-expression tree, each pass walks the line index looking for record
//! markers and reads the known field lines of that record kind (see
//! [`crate::parser::record`]).
//!
//! Passes, in order:
//! - footprints: package, side, position, rotation, reference, span
//! - pads: per footprint, using the footprint's stored span
//! - board items: segments, vias and board-outline graphics
//! - package models: per footprint, using the footprint's stored span

use std::path::Path;

use thiserror::Error;

use crate::parser::board_schema::*;
use crate::parser::cursor::{ScanCursor, Source};
use crate::parser::record::*;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("malformed {kind} record at line {line} (byte {offset}): {detail}")]
    MalformedRecord {
        kind: RecordKind,
        line: usize,
        offset: usize,
        detail: String,
    },
    #[error("unsupported {kind} geometry for {subject}: {detail}")]
    UnsupportedGeometry {
        kind: RecordKind,
        subject: String,
        detail: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Segments, vias and outline primitives found in the board-item pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardItems {
    pub segments: Vec<Segment>,
    pub vias: Vec<Via>,
    pub outline: Vec<OutlinePrimitive>,
}

/// Scanner for KiCad 8 board files
#[derive(Debug, Clone)]
pub struct BoardScanner {
    outline_layer: String,
}

impl Default for BoardScanner {
    fn default() -> Self {
        Self {
            outline_layer: "Edge.Cuts".to_string(),
        }
    }
}

impl BoardScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer whose graphics make up the board outline.
    pub fn with_outline_layer(mut self, layer: impl Into<String>) -> Self {
        self.outline_layer = layer.into();
        self
    }

    pub fn scan_path(&self, path: &Path) -> Result<BoardData, ScanError> {
        let source = Source::from_path(path)?;
        self.scan(&source)
    }

    pub fn scan_str(&self, content: &str, filename: &str) -> Result<BoardData, ScanError> {
        let source = Source::new(content, filename);
        self.scan(&source)
    }

    /// Run every pass over the source.
    pub fn scan(&self, source: &Source) -> Result<BoardData, ScanError> {
        let footprints = self.scan_footprints(source)?;
        let pads = self.scan_pads(source, &footprints)?;
        let items = self.scan_board_items(source)?;
        let models = self.scan_models(source, &footprints)?;

        tracing::info!(
            "Scanned {}: {} footprints, {} pads, {} segments, {} vias, {} outline primitives, {} models",
            source.name(),
            footprints.len(),
            pads.len(),
            items.segments.len(),
            items.vias.len(),
            items.outline.len(),
            models.len()
        );

        Ok(BoardData {
            filename: source.name().to_string(),
            footprints,
            pads,
            segments: items.segments,
            vias: items.vias,
            outline: items.outline,
            models,
        })
    }

    // ========================================================================
    // Footprint pass
    // ========================================================================

    pub fn scan_footprints(&self, source: &Source) -> Result<Vec<Footprint>, ScanError> {
        let mut footprints = Vec::new();
        let mut cursor = source.cursor();

        while let Some((idx, line)) = cursor.next_line() {
            if !is_marker(line, FOOTPRINT_MARKER) {
                continue;
            }
            let id = FootprintId(footprints.len());
            let footprint = Self::parse_footprint(source, idx, line, id)?;
            cursor.skip_past(&footprint.span);
            footprints.push(footprint);
        }

        tracing::debug!("Footprint pass found {} footprints", footprints.len());
        Ok(footprints)
    }

    fn parse_footprint(
        source: &Source,
        idx: usize,
        line: &str,
        id: FootprintId,
    ) -> Result<Footprint, ScanError> {
        let package = quoted_strings(line).into_iter().next().ok_or_else(|| {
            ScanError::MalformedRecord {
                kind: RecordKind::Footprint,
                line: idx + 1,
                offset: source.offset_of(idx),
                detail: "footprint has no package name".to_string(),
            }
        })?;

        let record = FOOTPRINT_SCHEMA.read(source, idx)?;
        let layer = record.text("layer")?;
        let side = BoardSide::from_layer(layer).ok_or_else(|| ScanError::UnsupportedGeometry {
            kind: RecordKind::Footprint,
            subject: package.clone(),
            detail: format!("footprint on layer {}, only F.Cu and B.Cu are supported", layer),
        })?;

        let at = record.numbers("at", 2, 3)?;
        let rotation = at.get(2).copied().unwrap_or(0.0);

        let span = source.record_span(idx);
        let reference = Self::find_reference(source, idx, &span).ok_or_else(|| {
            ScanError::MalformedRecord {
                kind: RecordKind::Footprint,
                line: idx + 1,
                offset: span.offset,
                detail: format!("footprint {} has no Reference property", package),
            }
        })?;

        Ok(Footprint {
            id,
            reference,
            package,
            side,
            position: Point::new(at[0], at[1]),
            rotation,
            span,
        })
    }

    /// Search the footprint's own block for its reference designator; the
    /// search never crosses into the next footprint.
    fn find_reference(source: &Source, start: usize, span: &RecordSpan) -> Option<String> {
        for idx in (start + 1)..=span.end_line {
            let line = source.line(idx)?;
            if is_marker(line, FOOTPRINT_MARKER) {
                return None;
            }
            if line.trim_start().starts_with(REFERENCE_MARKER) {
                return quoted_strings(line).into_iter().nth(1);
            }
        }
        None
    }

    // ========================================================================
    // Pad pass
    // ========================================================================

    pub fn scan_pads(&self, source: &Source, footprints: &[Footprint]) -> Result<Vec<Pad>, ScanError> {
        let mut pads = Vec::new();
        for footprint in footprints {
            let mut cursor = source.cursor();
            cursor.seek_offset(footprint.span.offset);
            pads.extend(Self::scan_footprint_pads(&mut cursor, footprint)?);
        }
        tracing::debug!("Pad pass found {} pads", pads.len());
        Ok(pads)
    }

    fn scan_footprint_pads(cursor: &mut ScanCursor<'_>, footprint: &Footprint) -> Result<Vec<Pad>, ScanError> {
        let source = cursor.source();
        let mut pads = Vec::new();

        // Footprint marker line itself
        cursor.next_line();

        while let Some((idx, line)) = cursor.next_line() {
            if idx > footprint.span.end_line || is_marker(line, FOOTPRINT_MARKER) {
                break;
            }
            if is_marker(line, PAD_MARKER) {
                let pad = Self::parse_pad(source, idx, line, footprint)?;
                cursor.skip_past(&source.record_span(idx));
                pads.push(pad);
            }
        }
        Ok(pads)
    }

    fn parse_pad(
        source: &Source,
        idx: usize,
        line: &str,
        footprint: &Footprint,
    ) -> Result<Pad, ScanError> {
        let header = FieldLine::parse(line)
            .filter(|f| f.args.len() >= 3)
            .ok_or_else(|| ScanError::MalformedRecord {
                kind: RecordKind::Pad,
                line: idx + 1,
                offset: source.offset_of(idx),
                detail: "pad header needs number, mount and shape".to_string(),
            })?;
        let number = header.args[0].clone();
        let mount_token = header.args[1].as_str();
        let shape_token = header.args[2].as_str();

        let unsupported = || ScanError::UnsupportedGeometry {
            kind: RecordKind::Pad,
            subject: format!("{} pad {}", footprint.reference, number),
            detail: format!("{} {} pads are not supported", mount_token, shape_token),
        };

        let mount = MountKind::from_token(mount_token).ok_or_else(unsupported)?;
        let shape = PadShape::from_token(shape_token).ok_or_else(unsupported)?;

        let schema = match (mount, shape) {
            (MountKind::Smd, PadShape::Rect) => PAD_SMD_RECT_SCHEMA,
            (MountKind::Smd, PadShape::RoundRect) => PAD_SMD_ROUNDRECT_SCHEMA,
            (MountKind::ThroughHole, PadShape::Rect | PadShape::Circle | PadShape::Oval) => {
                PAD_THROUGH_HOLE_SCHEMA
            }
            _ => return Err(unsupported()),
        };

        let record = schema.read(source, idx)?;
        let at = record.numbers("at", 2, 3)?;
        let size = record.numbers("size", 2, 2)?;
        let (width, height) = (size[0], size[1]);

        let geometry = match (mount, shape) {
            (MountKind::Smd, PadShape::Rect) => PadGeometry::SmdRect { width, height },
            (MountKind::Smd, _) => PadGeometry::SmdRoundRect {
                width,
                height,
                corner_ratio: record.number("rratio")?,
            },
            (MountKind::ThroughHole, _) => PadGeometry::ThroughHole {
                shape: match shape {
                    PadShape::Circle => HoleShape::Circle,
                    PadShape::Oval => HoleShape::Oval,
                    _ => HoleShape::Rect,
                },
                width,
                height,
                drill: Self::drill_diameter(&record)?,
            },
        };

        Ok(Pad {
            footprint: footprint.id,
            reference: footprint.reference.clone(),
            number,
            position: Point::new(at[0], at[1]),
            rotation: at.get(2).copied().unwrap_or(0.0),
            geometry,
            offset: source.offset_of(idx),
        })
    }

    /// `(drill 1.0)`, `(drill oval 1.0 1.5)` or `(drill 1.0 (offset ...))`
    fn drill_diameter(record: &Record<'_>) -> Result<f64, ScanError> {
        let args = record.args("drill")?;
        let value = args
            .iter()
            .find(|a| a.as_str() != "oval")
            .ok_or_else(|| record.error_at("drill", "drill has no diameter"))?;
        value
            .parse::<f64>()
            .map_err(|_| record.error_at("drill", format!("invalid drill diameter `{}`", value)))
    }

    // ========================================================================
    // Segment / via / outline pass
    // ========================================================================

    pub fn scan_board_items(&self, source: &Source) -> Result<BoardItems, ScanError> {
        let mut items = BoardItems::default();
        let mut cursor = source.cursor();

        while let Some((idx, line)) = cursor.next_line() {
            let Some(token) = first_token(line) else {
                continue;
            };

            if token == FOOTPRINT_MARKER {
                cursor.skip_past(&source.record_span(idx));
            } else if token == SEGMENT_MARKER {
                items.segments.push(Self::parse_segment(source, idx)?);
                cursor.skip_past(&source.record_span(idx));
            } else if token == VIA_MARKER {
                items.vias.push(Self::parse_via(source, idx)?);
                cursor.skip_past(&source.record_span(idx));
            } else if token.starts_with(GRAPHIC_PREFIX) {
                let span = source.record_span(idx);
                if let Some(primitive) = self.parse_graphic(source, idx, &token[1..], &span)? {
                    items.outline.push(primitive);
                }
                cursor.skip_past(&span);
            }
        }

        tracing::debug!(
            "Board-item pass found {} segments, {} vias, {} outline primitives",
            items.segments.len(),
            items.vias.len(),
            items.outline.len()
        );
        Ok(items)
    }

    fn parse_segment(source: &Source, idx: usize) -> Result<Segment, ScanError> {
        let record = SEGMENT_SCHEMA.read(source, idx)?;
        let start = record.numbers("start", 2, 2)?;
        let end = record.numbers("end", 2, 2)?;
        let layer = record.text("layer")?;
        let side = BoardSide::from_layer(layer).ok_or_else(|| ScanError::UnsupportedGeometry {
            kind: RecordKind::Segment,
            subject: format!("segment at line {}", idx + 1),
            detail: format!("copper layer {} is not supported on a two-layer board", layer),
        })?;

        Ok(Segment {
            start: Point::new(start[0], start[1]),
            end: Point::new(end[0], end[1]),
            width: record.number("width")?,
            side,
            net: net_name(record.text("net")?),
            offset: record.offset(),
        })
    }

    fn parse_via(source: &Source, idx: usize) -> Result<Via, ScanError> {
        let record = VIA_SCHEMA.read(source, idx)?;
        let at = record.numbers("at", 2, 2)?;
        Ok(Via {
            position: Point::new(at[0], at[1]),
            size: record.number("size")?,
            drill: record.number("drill")?,
            net: net_name(record.text("net")?),
            offset: record.offset(),
        })
    }

    fn parse_graphic(
        &self,
        source: &Source,
        idx: usize,
        kind: &str,
        span: &RecordSpan,
    ) -> Result<Option<OutlinePrimitive>, ScanError> {
        if let Some(layer) = Self::record_layer(source, span) {
            if layer != self.outline_layer {
                tracing::debug!("Skipping {} on layer {} at line {}", kind, layer, idx + 1);
                return Ok(None);
            }
        }

        let primitive = match kind {
            "gr_rect" => {
                let record = GR_RECT_SCHEMA.read(source, idx)?;
                OutlinePrimitive::Rect {
                    start: point(&record, "start")?,
                    end: point(&record, "end")?,
                }
            }
            "gr_line" => {
                let record = GR_LINE_SCHEMA.read(source, idx)?;
                OutlinePrimitive::Line {
                    start: point(&record, "start")?,
                    end: point(&record, "end")?,
                }
            }
            "gr_arc" => {
                let record = GR_ARC_SCHEMA.read(source, idx)?;
                OutlinePrimitive::Arc {
                    start: point(&record, "start")?,
                    mid: point(&record, "mid")?,
                    end: point(&record, "end")?,
                }
            }
            "gr_text" | "gr_text_box" => {
                tracing::debug!("Skipping {} at line {}", kind, idx + 1);
                return Ok(None);
            }
            other => {
                return Err(ScanError::UnsupportedGeometry {
                    kind: RecordKind::Graphic,
                    subject: format!("{} at line {}", other, idx + 1),
                    detail: "board outline primitives must be gr_rect, gr_line or gr_arc".to_string(),
                })
            }
        };
        Ok(Some(primitive))
    }

    /// `(layer "...")` line directly inside a record, if any
    fn record_layer(source: &Source, span: &RecordSpan) -> Option<String> {
        ((span.start_line + 1)..=span.end_line)
            .filter_map(|idx| source.line(idx))
            .filter_map(FieldLine::parse)
            .find(|f| f.keyword == "layer")
            .and_then(|f| f.args.into_iter().next())
    }

    // ========================================================================
    // Package model pass
    // ========================================================================

    pub fn scan_models(&self, source: &Source, footprints: &[Footprint]) -> Result<Vec<PackageModel>, ScanError> {
        let mut models = Vec::new();

        for footprint in footprints {
            let mut cursor = source.cursor();
            cursor.seek_line(footprint.span.start_line + 1);
            let mut index = 0;

            while let Some((idx, line)) = cursor.next_line() {
                if idx > footprint.span.end_line {
                    break;
                }
                if !is_marker(line, MODEL_MARKER) {
                    continue;
                }
                index += 1;
                let model = Self::parse_model(source, idx, line, footprint, index)?;
                cursor.skip_past(&source.record_span(idx));
                models.push(model);
            }
        }

        tracing::debug!("Model pass found {} package models", models.len());
        Ok(models)
    }

    fn parse_model(
        source: &Source,
        idx: usize,
        line: &str,
        footprint: &Footprint,
        index: usize,
    ) -> Result<PackageModel, ScanError> {
        let path = quoted_strings(line).into_iter().next().ok_or_else(|| {
            ScanError::MalformedRecord {
                kind: RecordKind::Model,
                line: idx + 1,
                offset: source.offset_of(idx),
                detail: "model has no file path".to_string(),
            }
        })?;
        let record = MODEL_SCHEMA.read(source, idx)?;
        let xyz = |name: &str| -> Result<[f64; 3], ScanError> {
            let v = record.numbers(name, 3, 3)?;
            Ok([v[0], v[1], v[2]])
        };

        Ok(PackageModel {
            footprint: footprint.id,
            reference: footprint.reference.clone(),
            index,
            path,
            offset: xyz("offset")?,
            scale: xyz("scale")?,
            rotate: xyz("rotate")?,
        })
    }
}

fn point(record: &Record<'_>, name: &str) -> Result<Point, ScanError> {
    let v = record.numbers(name, 2, 2)?;
    Ok(Point::new(v[0], v[1]))
}

/// Namespaced net identifier, e.g. `net_3`.
pub fn net_name(id: &str) -> String {
    format!("net_{}", id)
}
