//! Build configuration and the derived layer stack.
//!
//! Every field has a default, so a JSON config file only needs to name the
//! values it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::DissolvError;

/// Options for one pipeline run (CLI or library caller).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Root of the local package-model library
    pub model_root: PathBuf,
    /// Traces shorter than this are excluded (mm)
    pub min_trace_length: f64,
    pub trace_width: f64,
    pub trace_height: f64,
    pub layer_gap: f64,
    pub body_offset: f64,
    /// Clearance between a package model and the board body
    pub socket_height: f64,
    pub pad_oversize: f64,
    pub drill_oversize: f64,
    /// Use each segment's own width instead of `trace_width`
    pub use_authored_trace_width: bool,
    /// Use each pad's own size instead of the trace dimensions
    pub use_authored_pad_size: bool,
    pub outline_layer: String,
    /// Record a disconnected outline as an event instead of failing
    pub allow_open_outline: bool,
    /// Drop footprints with a non-canonical rotation instead of failing
    pub skip_unresolved_footprints: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            model_root: PathBuf::from("/usr/share/kicad/3dmodels"),
            min_trace_length: 0.5,
            trace_width: 0.75,
            trace_height: 0.75,
            layer_gap: 0.25,
            body_offset: 0.3,
            socket_height: 0.05,
            pad_oversize: 1.05,
            drill_oversize: 1.2,
            use_authored_trace_width: false,
            use_authored_pad_size: false,
            outline_layer: "Edge.Cuts".to_string(),
            allow_open_outline: false,
            skip_unresolved_footprints: false,
        }
    }
}

impl BuildConfig {
    /// Load a config from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, DissolvError> {
        let content = std::fs::read_to_string(path)?;
        let config: BuildConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DissolvError> {
        let positive = [
            ("trace_width", self.trace_width),
            ("trace_height", self.trace_height),
            ("min_trace_length", self.min_trace_length),
            ("pad_oversize", self.pad_oversize),
            ("drill_oversize", self.drill_oversize),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(DissolvError::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("layer_gap", self.layer_gap),
            ("body_offset", self.body_offset),
            ("socket_height", self.socket_height),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(DissolvError::InvalidConfig(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }
        if self.outline_layer.is_empty() {
            return Err(DissolvError::InvalidConfig(
                "outline_layer must name a layer".to_string(),
            ));
        }
        Ok(())
    }

    pub fn layer_stack(&self) -> LayerStack {
        LayerStack::from_config(self)
    }
}

/// Z heights derived from the trace and body dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerStack {
    pub fcu_z: f64,
    pub bcu_z: f64,
    pub body_fcu_z: f64,
    pub body_bcu_z: f64,
    pub body_height: f64,
    pub thruhole_height: f64,
    pub pad_height: f64,
}

impl LayerStack {
    pub fn from_config(config: &BuildConfig) -> Self {
        let h = config.trace_height;
        let fcu_z = config.layer_gap - h;
        let bcu_z = h - config.layer_gap;
        let body_fcu_z = fcu_z - config.body_offset;
        let body_bcu_z = bcu_z + h + config.body_offset;
        Self {
            fcu_z,
            bcu_z,
            body_fcu_z,
            body_bcu_z,
            body_height: body_bcu_z.abs() + body_fcu_z.abs(),
            thruhole_height: 2.0 * h + config.body_offset + config.layer_gap,
            pad_height: config.body_offset * 1.05,
        }
    }
}
