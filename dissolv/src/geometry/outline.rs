//! Outline Sequencer
//!
//! Board-outline primitives arrive in file order. The sequencer reorders
//! them into a chain where neighbours share an endpoint, using greedy
//! insertion: each primitive goes right after the first element of the
//! current chain it touches.

use serde::Serialize;
use thiserror::Error;

use crate::parser::board_schema::{OutlinePrimitive, Point};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutlineError {
    #[error("outline primitive {primitive} does not touch the rest of the outline")]
    Disconnected { primitive: OutlinePrimitive },
    #[error("board has no outline primitives")]
    MissingOutline,
}

/// Result of lenient sequencing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SequencedOutline {
    pub chain: Vec<OutlinePrimitive>,
    pub unplaced: Vec<OutlinePrimitive>,
}

fn insert_connected(chain: &mut Vec<OutlinePrimitive>, primitive: OutlinePrimitive) -> bool {
    match chain.iter().position(|p| p.shares_endpoint(&primitive)) {
        Some(idx) => {
            chain.insert(idx + 1, primitive);
            true
        }
        None => false,
    }
}

pub fn sequence_outline(primitives: &[OutlinePrimitive]) -> Result<Vec<OutlinePrimitive>, OutlineError> {
    let Some((first, rest)) = primitives.split_first() else {
        return Ok(Vec::new());
    };
    let mut chain = vec![*first];
    for primitive in rest {
        if !insert_connected(&mut chain, *primitive) {
            return Err(OutlineError::Disconnected {
                primitive: *primitive,
            });
        }
    }
    Ok(chain)
}

/// Like `sequence_outline`, but primitives that touch nothing are collected
/// instead of failing the run.
pub fn sequence_outline_lenient(primitives: &[OutlinePrimitive]) -> SequencedOutline {
    let mut out = SequencedOutline::default();
    let Some((first, rest)) = primitives.split_first() else {
        return out;
    };
    out.chain.push(*first);
    for primitive in rest {
        if !insert_connected(&mut out.chain, *primitive) {
            out.unplaced.push(*primitive);
        }
    }
    out
}

/// Every consecutive pair, including last to first, shares an endpoint.
pub fn is_connected_loop(chain: &[OutlinePrimitive]) -> bool {
    match chain {
        [] => false,
        [only] => matches!(only, OutlinePrimitive::Rect { .. }),
        _ => chain
            .iter()
            .zip(chain.iter().cycle().skip(1))
            .all(|(a, b)| a.shares_endpoint(b)),
    }
}

/// Board boundary shape handed to the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "primitives", rename_all = "snake_case")]
pub enum BoundaryShape {
    /// First rectangle on the outline layer, taken as the whole boundary
    Rect { start: Point, end: Point },
    Chain(Vec<OutlinePrimitive>),
}

impl BoundaryShape {
    fn first_rect(primitives: &[OutlinePrimitive]) -> Option<Self> {
        primitives.iter().find_map(|p| match *p {
            OutlinePrimitive::Rect { start, end } => Some(BoundaryShape::Rect { start, end }),
            _ => None,
        })
    }

    pub fn from_outline(primitives: &[OutlinePrimitive]) -> Result<Self, OutlineError> {
        if primitives.is_empty() {
            return Err(OutlineError::MissingOutline);
        }
        if let Some(rect) = Self::first_rect(primitives) {
            return Ok(rect);
        }
        Ok(BoundaryShape::Chain(sequence_outline(primitives)?))
    }

    /// Boundary plus the primitives that could not be attached.
    pub fn from_outline_lenient(
        primitives: &[OutlinePrimitive],
    ) -> Result<(Self, Vec<OutlinePrimitive>), OutlineError> {
        if primitives.is_empty() {
            return Err(OutlineError::MissingOutline);
        }
        if let Some(rect) = Self::first_rect(primitives) {
            return Ok((rect, Vec::new()));
        }
        let sequenced = sequence_outline_lenient(primitives);
        Ok((BoundaryShape::Chain(sequenced.chain), sequenced.unplaced))
    }
}
