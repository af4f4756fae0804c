//! Pipeline core shared by library callers and the CLI.
//! Scans a board, resolves every entity and collects the placement batch.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::backend::{BackendError, ModelingBackend};
use crate::config::BuildConfig;
use crate::geometry::outline::{BoundaryShape, OutlineError};
use crate::geometry::placement::{footprint_turn, resolve_model, resolve_pad, PlacementError};
use crate::geometry::{classify_segment, TraceClass};
use crate::parser::board::{BoardScanner, ScanError};
use crate::parser::board_schema::*;
use crate::parser::cursor::Source;
use crate::requests::*;

#[derive(Debug, thiserror::Error)]
pub enum DissolvError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Placement error: {0}")]
    Placement(#[from] PlacementError),
    #[error("Outline error: {0}")]
    Outline(#[from] OutlineError),
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Non-fatal conditions recorded during a build
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BuildEvent {
    /// Segment shorter than the minimum trace length
    TraceExcluded { name: String, length: f64, net: String },
    /// Outline primitive that touches no other (open outlines only)
    OutlineDisconnected { primitive: OutlinePrimitive },
    /// Footprint left out because it could not be resolved
    FootprintSkipped { reference: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildStats {
    pub footprints: usize,
    pub pads: usize,
    pub traces: usize,
    pub excluded_traces: usize,
    pub vias: usize,
    pub models: usize,
    pub skipped_footprints: usize,
    pub outline_primitives: usize,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub file: PathBuf,
    pub batch: PlacementBatch,
    pub events: Vec<BuildEvent>,
    pub stats: BuildStats,
}

impl BuildResult {
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn excluded_traces(&self) -> impl Iterator<Item = &BuildEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, BuildEvent::TraceExcluded { .. }))
    }
}

/// Pads and model placements of one footprint, resolved together so a
/// failure leaves nothing behind.
struct ResolvedFootprint {
    pads: Vec<(Pad, crate::geometry::PadPlacement)>,
    models: Vec<ModelPlacement>,
}

/// Core pipeline API used by both library callers and the CLI.
pub struct DissolvCore;

impl DissolvCore {
    fn scanner(config: &BuildConfig) -> BoardScanner {
        BoardScanner::new().with_outline_layer(config.outline_layer.clone())
    }

    /// Scan a board file without resolving anything.
    pub fn scan(path: &Path, config: &BuildConfig) -> Result<BoardData, DissolvError> {
        let source = Source::from_path(path)?;
        Ok(Self::scanner(config).scan(&source)?)
    }

    pub fn scan_str(content: &str, filename: &str, config: &BuildConfig) -> Result<BoardData, DissolvError> {
        Ok(Self::scanner(config).scan_str(content, filename)?)
    }

    /// Scan and build a single board file.
    pub fn build(path: &Path, config: &BuildConfig) -> Result<BuildResult, DissolvError> {
        config.validate()?;
        let board = Self::scan(path, config)?;
        let mut result = Self::build_board(&board, config)?;
        result.file = path.to_path_buf();
        Ok(result)
    }

    pub fn build_str(content: &str, filename: &str, config: &BuildConfig) -> Result<BuildResult, DissolvError> {
        config.validate()?;
        let board = Self::scan_str(content, filename, config)?;
        Self::build_board(&board, config)
    }

    /// Build a board and hand the batch to a backend.
    pub fn build_and_apply(
        path: &Path,
        config: &BuildConfig,
        backend: &mut dyn ModelingBackend,
    ) -> Result<BuildResult, DissolvError> {
        let result = Self::build(path, config)?;
        tracing::info!(
            "Applying {} requests to {} backend",
            result.batch.request_count(),
            backend.name()
        );
        backend.apply(&result.batch)?;
        Ok(result)
    }

    /// Resolve an already scanned board into a placement batch.
    pub fn build_board(board: &BoardData, config: &BuildConfig) -> Result<BuildResult, DissolvError> {
        config.validate()?;
        let stack = config.layer_stack();
        let mut batch = PlacementBatch::default();
        let mut events = Vec::new();
        let mut stats = BuildStats {
            footprints: board.footprints.len(),
            outline_primitives: board.outline.len(),
            ..Default::default()
        };

        // Footprints: pads and package models
        let mut skipped = 0;
        let mut pad_seq = 0;
        for footprint in &board.footprints {
            let resolved = match Self::resolve_footprint(board, footprint, config) {
                Ok(resolved) => resolved,
                Err(e) if config.skip_unresolved_footprints => {
                    tracing::warn!("Skipping footprint {}: {}", footprint.reference, e);
                    skipped += 1;
                    events.push(BuildEvent::FootprintSkipped {
                        reference: footprint.reference.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            for (pad, placed) in &resolved.pads {
                pad_seq += 1;
                batch.pads.push(pad_request(pad_seq, pad, placed, config));
            }
            batch.models.extend(resolved.models);
        }
        stats.skipped_footprints = skipped;
        stats.pads = batch.pads.len();
        stats.models = batch.models.len();

        // Traces and vias share one counter in file order
        let mut items: Vec<(usize, TraceItem<'_>)> = board
            .segments
            .iter()
            .map(|s| (s.offset, TraceItem::Segment(s)))
            .chain(board.vias.iter().map(|v| (v.offset, TraceItem::Via(v))))
            .collect();
        items.sort_by_key(|(offset, _)| *offset);

        for (idx, (_, item)) in items.into_iter().enumerate() {
            let seq = idx + 1;
            match item {
                TraceItem::Segment(segment) => match classify_segment(segment, config.min_trace_length) {
                    TraceClass::Included { compass, length } => {
                        let (prism, joints) = trace_requests(seq, segment, compass, length, config);
                        batch.traces.push(prism);
                        batch.joints.extend(joints);
                    }
                    TraceClass::Excluded { length } => {
                        let name = format!("trace_seg{}", seq);
                        tracing::warn!(
                            "Trace {} length {} is below the minimum {}, excluded",
                            name,
                            length,
                            config.min_trace_length
                        );
                        events.push(BuildEvent::TraceExcluded {
                            name,
                            length,
                            net: segment.net.clone(),
                        });
                        stats.excluded_traces += 1;
                    }
                },
                TraceItem::Via(via) => {
                    batch.vias.push(via_request(seq, via, &stack, config.trace_height));
                }
            }
        }
        stats.traces = batch.traces.len();
        stats.vias = batch.vias.len();

        // Board outline
        if config.allow_open_outline {
            match BoundaryShape::from_outline_lenient(&board.outline) {
                Ok((shape, unplaced)) => {
                    for primitive in unplaced {
                        tracing::warn!("Outline primitive {} is disconnected", primitive);
                        events.push(BuildEvent::OutlineDisconnected { primitive });
                    }
                    batch.boundary = Some(BoardBoundary::with_shape(shape, &stack));
                }
                Err(OutlineError::MissingOutline) => {
                    tracing::warn!("Board {} has no outline, boundary omitted", board.filename);
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            batch.boundary = Some(BoardBoundary::from_outline(&board.outline, &stack)?);
        }

        tracing::info!(
            "Built {}: {} traces ({} excluded), {} vias, {} pads, {} models",
            board.filename,
            stats.traces,
            stats.excluded_traces,
            stats.vias,
            stats.pads,
            stats.models
        );

        Ok(BuildResult {
            file: PathBuf::from(&board.filename),
            batch,
            events,
            stats,
        })
    }

    fn resolve_footprint(
        board: &BoardData,
        footprint: &Footprint,
        config: &BuildConfig,
    ) -> Result<ResolvedFootprint, PlacementError> {
        footprint_turn(footprint)?;
        let pads = board
            .pads_of(footprint.id)
            .map(|pad| resolve_pad(footprint, pad, config).map(|placed| (pad.clone(), placed)))
            .collect::<Result<Vec<_>, _>>()?;
        let models = board
            .models
            .iter()
            .filter(|m| m.footprint == footprint.id)
            .map(|model| resolve_model(footprint, model, config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResolvedFootprint { pads, models })
    }
}

enum TraceItem<'a> {
    Segment(&'a Segment),
    Via(&'a Via),
}
