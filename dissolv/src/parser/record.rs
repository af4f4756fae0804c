//! Record schemas for the positional scanner.
//!
//! KiCad 8 writes each nested record one field per line. The scanner does not
//! parse the S-expression grammar; it knows, for every record kind, which
//! relative line carries which field. Each kind's layout is a `RecordSchema`,
//! so a reordered or truncated record fails loudly as `MalformedRecord`
//! instead of being misread.

use std::fmt;

use serde::Serialize;

use crate::parser::board::ScanError;
use crate::parser::cursor::Source;

pub const FOOTPRINT_MARKER: &str = "(footprint";
pub const PAD_MARKER: &str = "(pad";
pub const SEGMENT_MARKER: &str = "(segment";
pub const VIA_MARKER: &str = "(via";
pub const MODEL_MARKER: &str = "(model";
pub const GRAPHIC_PREFIX: &str = "(gr_";
pub const REFERENCE_MARKER: &str = "(property \"Reference\"";

/// Kind of record being scanned, used in error reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Footprint,
    Pad,
    Segment,
    Via,
    GrRect,
    GrLine,
    GrArc,
    Graphic,
    Model,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Footprint => "footprint",
            RecordKind::Pad => "pad",
            RecordKind::Segment => "segment",
            RecordKind::Via => "via",
            RecordKind::GrRect => "gr_rect",
            RecordKind::GrLine => "gr_line",
            RecordKind::GrArc => "gr_arc",
            RecordKind::Graphic => "graphic",
            RecordKind::Model => "model",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First whitespace-separated token of a line, e.g. `(segment`.
pub fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// True when the line opens a record with exactly this marker token.
pub fn is_marker(line: &str, marker: &str) -> bool {
    first_token(line) == Some(marker)
}

/// All double-quoted strings on a line, unescaped.
pub fn quoted_strings(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut escaped = false;
    for ch in line.chars() {
        if !in_string {
            if ch == '"' {
                in_string = true;
                current.clear();
            }
            continue;
        }
        if escaped {
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            in_string = false;
            out.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    out
}

/// One `(keyword arg arg ...)` line, with quotes removed from the arguments
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLine {
    pub keyword: String,
    pub args: Vec<String>,
}

impl FieldLine {
    pub fn parse(line: &str) -> Option<Self> {
        let body = line.trim().strip_prefix('(')?;
        let body = body.trim_end_matches(')');
        let mut tokens = tokenize(body).into_iter();
        let keyword = tokens.next()?;
        Some(Self {
            keyword,
            args: tokens.collect(),
        })
    }
}

fn tokenize(body: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut quoted = false;

    for ch in body.chars() {
        if in_string {
            if escaped {
                current.push(ch);
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            } else {
                current.push(ch);
            }
        } else if ch == '"' {
            in_string = true;
            quoted = true;
        } else if ch.is_whitespace() {
            if !current.is_empty() || quoted {
                tokens.push(std::mem::take(&mut current));
                quoted = false;
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }
    tokens
}

/// Expected field at a fixed line distance from the record marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub line: usize,
    pub keyword: &'static str,
}

const fn field(name: &'static str, line: usize, keyword: &'static str) -> FieldSpec {
    FieldSpec { name, line, keyword }
}

/// Ordered list of field lines for one record kind
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    pub kind: RecordKind,
    pub fields: &'static [FieldSpec],
}

pub const FOOTPRINT_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::Footprint,
    fields: &[field("layer", 1, "layer"), field("at", 3, "at")],
};

pub const PAD_SMD_RECT_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::Pad,
    fields: &[field("at", 1, "at"), field("size", 2, "size")],
};

pub const PAD_SMD_ROUNDRECT_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::Pad,
    fields: &[
        field("at", 1, "at"),
        field("size", 2, "size"),
        field("rratio", 4, "roundrect_rratio"),
    ],
};

pub const PAD_THROUGH_HOLE_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::Pad,
    fields: &[
        field("at", 1, "at"),
        field("size", 2, "size"),
        field("drill", 3, "drill"),
    ],
};

pub const SEGMENT_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::Segment,
    fields: &[
        field("start", 1, "start"),
        field("end", 2, "end"),
        field("width", 3, "width"),
        field("layer", 4, "layer"),
        field("net", 5, "net"),
    ],
};

pub const VIA_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::Via,
    fields: &[
        field("at", 1, "at"),
        field("size", 2, "size"),
        field("drill", 3, "drill"),
        field("net", 5, "net"),
    ],
};

pub const GR_RECT_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::GrRect,
    fields: &[field("start", 1, "start"), field("end", 2, "end")],
};

pub const GR_LINE_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::GrLine,
    fields: &[field("start", 1, "start"), field("end", 2, "end")],
};

pub const GR_ARC_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::GrArc,
    fields: &[
        field("start", 1, "start"),
        field("mid", 2, "mid"),
        field("end", 3, "end"),
    ],
};

pub const MODEL_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::Model,
    fields: &[
        field("offset_open", 1, "offset"),
        field("offset", 2, "xyz"),
        field("scale_open", 4, "scale"),
        field("scale", 5, "xyz"),
        field("rotate_open", 7, "rotate"),
        field("rotate", 8, "xyz"),
    ],
};

impl RecordSchema {
    /// Read every field line of the record whose marker is on `marker_line`.
    pub fn read<'s>(&self, source: &'s Source, marker_line: usize) -> Result<Record<'s>, ScanError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for spec in self.fields {
            let idx = marker_line + spec.line;
            let text = source.line(idx).ok_or_else(|| ScanError::MalformedRecord {
                kind: self.kind,
                line: idx + 1,
                offset: source.offset_of(idx),
                detail: format!("record truncated, expected ({} ...)", spec.keyword),
            })?;
            let parsed = FieldLine::parse(text)
                .filter(|f| f.keyword == spec.keyword)
                .ok_or_else(|| ScanError::MalformedRecord {
                    kind: self.kind,
                    line: idx + 1,
                    offset: source.offset_of(idx),
                    detail: format!("expected ({} ...), found `{}`", spec.keyword, text.trim()),
                })?;
            fields.push(RecordField {
                name: spec.name,
                line: idx,
                value: parsed,
            });
        }
        Ok(Record {
            kind: self.kind,
            source,
            marker_line,
            fields,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RecordField {
    pub name: &'static str,
    pub line: usize,
    pub value: FieldLine,
}

/// Field lines of one record, looked up by schema name
#[derive(Debug, Clone)]
pub struct Record<'s> {
    pub kind: RecordKind,
    source: &'s Source,
    pub marker_line: usize,
    fields: Vec<RecordField>,
}

impl<'s> Record<'s> {
    fn get(&self, name: &str) -> Result<&RecordField, ScanError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| self.malformed(self.marker_line, format!("no field named {}", name)))
    }

    fn malformed(&self, line: usize, detail: String) -> ScanError {
        ScanError::MalformedRecord {
            kind: self.kind,
            line: line + 1,
            offset: self.source.offset_of(line),
            detail,
        }
    }

    pub fn offset(&self) -> usize {
        self.source.offset_of(self.marker_line)
    }

    /// Between `min` and `max` leading numeric arguments of a field.
    pub fn numbers(&self, name: &str, min: usize, max: usize) -> Result<Vec<f64>, ScanError> {
        let field = self.get(name)?;
        let args = &field.value.args;
        if args.len() < min || args.len() > max {
            return Err(self.malformed(
                field.line,
                format!(
                    "({} ...) expects {} to {} values, found {}",
                    field.value.keyword,
                    min,
                    max,
                    args.len()
                ),
            ));
        }
        args.iter()
            .map(|a| {
                a.parse::<f64>().map_err(|_| {
                    self.malformed(
                        field.line,
                        format!("invalid number `{}` in ({} ...)", a, field.value.keyword),
                    )
                })
            })
            .collect()
    }

    pub fn number(&self, name: &str) -> Result<f64, ScanError> {
        Ok(self.numbers(name, 1, 1)?[0])
    }

    /// First argument of a field, as text.
    pub fn text(&self, name: &str) -> Result<&str, ScanError> {
        let field = self.get(name)?;
        field.value.args.first().map(String::as_str).ok_or_else(|| {
            self.malformed(
                field.line,
                format!("({} ...) has no value", field.value.keyword),
            )
        })
    }

    /// All arguments of a field, as text.
    pub fn args(&self, name: &str) -> Result<&[String], ScanError> {
        Ok(&self.get(name)?.value.args)
    }

    /// Error positioned on the line of the named field.
    pub fn error_at(&self, name: &str, detail: impl Into<String>) -> ScanError {
        let line = self
            .fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.line)
            .unwrap_or(self.marker_line);
        self.malformed(line, detail.into())
    }
}
