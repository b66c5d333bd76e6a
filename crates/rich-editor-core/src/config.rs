//! Editor configuration.
//!
//! [`EditorOptions`] is what a host passes in (optionally as JSON). [`EditorEnvironment`] is what
//! the editor learns about the platform once, at construction, so later operations never
//! re-probe the surface.

use crate::error::EditorError;
use crate::model::SegmentFormat;
use crate::surface::SurfaceCapabilities;
use serde::{Deserialize, Serialize};

/// Class name (and highlight name) reserved for the persisted-selection marker.
pub const PERSISTED_SELECTION_MARKER: &str = "__persistedSelection";

const DEFAULT_PERSISTED_SELECTION_COLOR: &str = "#C7D2FE";
const DEFAULT_MIN_IMAGE_MAX_WIDTH: f64 = 10.0;

/// Host-supplied editor options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOptions {
    /// Format applied to content that does not carry its own.
    pub default_segment_format: SegmentFormat,
    /// Whether the editor starts in dark mode.
    pub in_dark_mode: bool,
    /// Background colour used to keep a selection visible across structural rewrites.
    pub persisted_selection_color: String,
    /// Lower bound for the `max_width` given to newly inserted images.
    pub min_image_max_width: f64,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            default_segment_format: SegmentFormat::default(),
            in_dark_mode: false,
            persisted_selection_color: DEFAULT_PERSISTED_SELECTION_COLOR.to_string(),
            min_image_max_width: DEFAULT_MIN_IMAGE_MAX_WIDTH,
        }
    }
}

impl EditorOptions {
    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// How the persisted selection is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistedSelectionMode {
    /// Named highlight over the selected range.
    Highlight,
    /// Marker class on wrapper nodes around the selected content.
    Class,
}

/// Platform facts resolved once at editor construction.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorEnvironment {
    /// Capabilities reported by the surface.
    pub capabilities: SurfaceCapabilities,
    /// Colour for the persisted selection.
    pub persisted_selection_color: String,
    /// Lower bound for new image `max_width`.
    pub min_image_max_width: f64,
}

impl EditorEnvironment {
    /// Resolve the environment from options and probed capabilities.
    pub fn new(options: &EditorOptions, capabilities: SurfaceCapabilities) -> Self {
        Self {
            capabilities,
            persisted_selection_color: options.persisted_selection_color.clone(),
            min_image_max_width: options.min_image_max_width,
        }
    }

    /// Painting mode for the persisted selection.
    pub fn persisted_selection_mode(&self) -> PersistedSelectionMode {
        if self.capabilities.supports_highlight {
            PersistedSelectionMode::Highlight
        } else {
            PersistedSelectionMode::Class
        }
    }

    /// Style rule that paints the persisted selection.
    pub fn persisted_selection_rule(&self) -> String {
        let selector = match self.persisted_selection_mode() {
            PersistedSelectionMode::Highlight => format!("::highlight({PERSISTED_SELECTION_MARKER})"),
            PersistedSelectionMode::Class => format!(".{PERSISTED_SELECTION_MARKER}"),
        };
        format!(
            "{selector} {{ background-color: {}; }}",
            self.persisted_selection_color
        )
    }
}
