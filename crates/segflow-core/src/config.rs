//! Segmentation representation configuration and its resolution.
//!
//! Configuration exists at two layers: a global layer and an optional
//! override per tool group. Every field is optional. Resolving a
//! representation type for a group merges the override onto the global
//! layer leaf by leaf:
//!
//! - a leaf set in the override wins, otherwise the global leaf is kept;
//! - nested structs merge recursively;
//! - `Vec` leaves (dash patterns) are replaced wholesale, never concatenated.

use crate::error::{Result, SegmentationError};
use crate::state::{RepresentationType, SegmentationStateStore};
use serde::{Deserialize, Serialize};

/// Leaf-wise merge of two configuration values.
pub trait Merge: Sized {
    /// Merge `over` onto `self`; leaves set in `over` win.
    fn merge(&self, over: &Self) -> Self;
}

pub(crate) fn leaf<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
    over.clone().or_else(|| base.clone())
}

pub(crate) fn nested<T: Merge + Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
    match (base, over) {
        (Some(b), Some(o)) => Some(b.merge(o)),
        (None, Some(o)) => Some(o.clone()),
        (b, None) => b.clone(),
    }
}

/// Visual parameters of labelmap representations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelmapConfig {
    pub render_outline: Option<bool>,
    pub outline_width_active: Option<f64>,
    pub outline_width_inactive: Option<f64>,
    /// Dash pattern for outlines, in canvas pixels.
    pub outline_dash: Option<Vec<f64>>,
    pub render_fill: Option<bool>,
    pub render_fill_inactive: Option<bool>,
    pub fill_alpha: Option<f64>,
    pub fill_alpha_inactive: Option<f64>,
}

/// Labelmap parameters with every leaf filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveLabelmapConfig {
    pub render_outline: bool,
    pub outline_width_active: f64,
    pub outline_width_inactive: f64,
    pub outline_dash: Vec<f64>,
    pub render_fill: bool,
    pub render_fill_inactive: bool,
    pub fill_alpha: f64,
    pub fill_alpha_inactive: f64,
}

impl LabelmapConfig {
    /// Default values installed into the global layer when a labelmap
    /// segmentation is first added.
    pub fn defaults() -> Self {
        let e = Self::default().effective();
        Self {
            render_outline: Some(e.render_outline),
            outline_width_active: Some(e.outline_width_active),
            outline_width_inactive: Some(e.outline_width_inactive),
            outline_dash: None,
            render_fill: Some(e.render_fill),
            render_fill_inactive: Some(e.render_fill_inactive),
            fill_alpha: Some(e.fill_alpha),
            fill_alpha_inactive: Some(e.fill_alpha_inactive),
        }
    }

    /// Fill unset leaves with the built-in defaults.
    pub fn effective(&self) -> EffectiveLabelmapConfig {
        EffectiveLabelmapConfig {
            render_outline: self.render_outline.unwrap_or(true),
            outline_width_active: self.outline_width_active.unwrap_or(3.0),
            outline_width_inactive: self.outline_width_inactive.unwrap_or(2.0),
            outline_dash: self.outline_dash.clone().unwrap_or_default(),
            render_fill: self.render_fill.unwrap_or(true),
            render_fill_inactive: self.render_fill_inactive.unwrap_or(true),
            fill_alpha: self.fill_alpha.unwrap_or(0.9),
            fill_alpha_inactive: self.fill_alpha_inactive.unwrap_or(0.85),
        }
    }
}

impl Merge for LabelmapConfig {
    fn merge(&self, over: &Self) -> Self {
        Self {
            render_outline: leaf(&self.render_outline, &over.render_outline),
            outline_width_active: leaf(&self.outline_width_active, &over.outline_width_active),
            outline_width_inactive: leaf(
                &self.outline_width_inactive,
                &over.outline_width_inactive,
            ),
            outline_dash: leaf(&self.outline_dash, &over.outline_dash),
            render_fill: leaf(&self.render_fill, &over.render_fill),
            render_fill_inactive: leaf(&self.render_fill_inactive, &over.render_fill_inactive),
            fill_alpha: leaf(&self.fill_alpha, &over.fill_alpha),
            fill_alpha_inactive: leaf(&self.fill_alpha_inactive, &over.fill_alpha_inactive),
        }
    }
}

/// Visual parameters of contour representations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContourConfig {
    pub render_outline: Option<bool>,
    pub outline_width_active: Option<f64>,
    pub outline_width_inactive: Option<f64>,
    pub outline_opacity: Option<f64>,
    pub outline_opacity_inactive: Option<f64>,
}

impl ContourConfig {
    pub fn defaults() -> Self {
        Self {
            render_outline: Some(true),
            outline_width_active: Some(2.0),
            outline_width_inactive: Some(1.0),
            outline_opacity: Some(1.0),
            outline_opacity_inactive: Some(0.85),
        }
    }
}

impl Merge for ContourConfig {
    fn merge(&self, over: &Self) -> Self {
        Self {
            render_outline: leaf(&self.render_outline, &over.render_outline),
            outline_width_active: leaf(&self.outline_width_active, &over.outline_width_active),
            outline_width_inactive: leaf(
                &self.outline_width_inactive,
                &over.outline_width_inactive,
            ),
            outline_opacity: leaf(&self.outline_opacity, &over.outline_opacity),
            outline_opacity_inactive: leaf(
                &self.outline_opacity_inactive,
                &over.outline_opacity_inactive,
            ),
        }
    }
}

/// Per-type parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepresentationsConfig {
    #[serde(rename = "Labelmap")]
    pub labelmap: Option<LabelmapConfig>,
    #[serde(rename = "Contour")]
    pub contour: Option<ContourConfig>,
}

impl Merge for RepresentationsConfig {
    fn merge(&self, over: &Self) -> Self {
        Self {
            labelmap: nested(&self.labelmap, &over.labelmap),
            contour: nested(&self.contour, &over.contour),
        }
    }
}

/// One configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SegmentationRepresentationConfig {
    pub render_inactive_segmentations: Option<bool>,
    pub representations: RepresentationsConfig,
}

impl Merge for SegmentationRepresentationConfig {
    fn merge(&self, over: &Self) -> Self {
        Self {
            render_inactive_segmentations: leaf(
                &self.render_inactive_segmentations,
                &over.render_inactive_segmentations,
            ),
            representations: self.representations.merge(&over.representations),
        }
    }
}

impl SegmentationRepresentationConfig {
    /// The layer installed for a representation type on first use.
    pub fn default_for(representation_type: RepresentationType) -> Self {
        let mut representations = RepresentationsConfig::default();
        match representation_type {
            RepresentationType::Labelmap => representations.labelmap = Some(LabelmapConfig::defaults()),
            RepresentationType::Contour => representations.contour = Some(ContourConfig::defaults()),
        }
        Self {
            render_inactive_segmentations: Some(true),
            representations,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SegmentationError::Configuration(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SegmentationError::Configuration(e.to_string()))
    }
}

/// Parameters for one representation type after resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RepresentationConfig {
    Labelmap(LabelmapConfig),
    Contour(ContourConfig),
}

/// Result of [`resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Unset at both layers resolves to `true`.
    pub render_inactive_segmentations: bool,
    pub representation: RepresentationConfig,
}

/// Merge two layers for one representation type. Pure.
pub fn resolve_layers(
    global: &SegmentationRepresentationConfig,
    group: Option<&SegmentationRepresentationConfig>,
    representation_type: RepresentationType,
) -> ResolvedConfig {
    let merged = match group {
        Some(over) => global.merge(over),
        None => global.clone(),
    };
    let representation = match representation_type {
        RepresentationType::Labelmap => {
            RepresentationConfig::Labelmap(merged.representations.labelmap.unwrap_or_default())
        }
        RepresentationType::Contour => {
            RepresentationConfig::Contour(merged.representations.contour.unwrap_or_default())
        }
    };
    ResolvedConfig {
        render_inactive_segmentations: merged.render_inactive_segmentations.unwrap_or(true),
        representation,
    }
}

/// Resolve the configuration of a representation type for a tool group.
pub fn resolve(
    store: &SegmentationStateStore,
    representation_type: RepresentationType,
    tool_group_id: &str,
) -> ResolvedConfig {
    resolve_layers(
        store.global_config(),
        store.tool_group_specific_config(tool_group_id),
        representation_type,
    )
}
