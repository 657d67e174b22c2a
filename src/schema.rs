//! C8 — declarative parameter schema.
//!
//! A static table of every parameter the pipeline understands: its kind,
//! valid range, step, default, an optional visibility predicate, and a
//! label tag a UI layer could use. The engine (C4) is the only consumer
//! inside this crate; everything here is read-only data, never mutated.

use crate::params::{ParameterStore, Value};
use std::sync::OnceLock;

/// The six pipeline stages, in the fixed order they always run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    WhiteBalance,
    Udcp,
    BeerLambert,
    ColorRebalance,
    Clahe,
    Fusion,
}

pub const PIPELINE_ORDER: [StageId; 6] = [
    StageId::WhiteBalance,
    StageId::Udcp,
    StageId::BeerLambert,
    StageId::ColorRebalance,
    StageId::Clahe,
    StageId::Fusion,
];

impl StageId {
    /// Stable ASCII wire id, per the progress event contract.
    pub fn wire_id(self) -> &'static str {
        match self {
            StageId::WhiteBalance => "white_balance",
            StageId::Udcp => "udcp",
            StageId::BeerLambert => "beer_lambert",
            StageId::ColorRebalance => "color_rebalance",
            StageId::Clahe => "clahe",
            StageId::Fusion => "fusion",
        }
    }

    pub fn enable_key(self) -> &'static str {
        match self {
            StageId::WhiteBalance => "white_balance_enabled",
            StageId::Udcp => "udcp_enabled",
            StageId::BeerLambert => "beer_lambert_enabled",
            StageId::ColorRebalance => "color_rebalance_enabled",
            StageId::Clahe => "clahe_enabled",
            StageId::Fusion => "fusion_enabled",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            StageId::WhiteBalance => "White Balance",
            StageId::Udcp => "Underwater Dark Channel Prior",
            StageId::BeerLambert => "Beer-Lambert Depth Compensation",
            StageId::ColorRebalance => "Color Rebalance",
            StageId::Clahe => "Adaptive Histogram Equalization",
            StageId::Fusion => "Multi-Scale Fusion",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StageId::WhiteBalance => {
                "Corrects the dominant color cast using one of five illuminant estimators."
            }
            StageId::Udcp => {
                "Removes haze using a dark-channel prior adapted for underwater scattering."
            }
            StageId::BeerLambert => {
                "Compensates wavelength-dependent attenuation using an exponential depth model."
            }
            StageId::ColorRebalance => {
                "Applies a fine-tuning 3x3 color matrix with a saturation guard against magenta halos."
            }
            StageId::Clahe => "Contrast-limited adaptive histogram equalization on the L channel.",
            StageId::Fusion => {
                "Fuses contrast/sharpness variants of the running result using Laplacian pyramids."
            }
        }
    }

    /// Parameter keys that `reset_stage_defaults` resets for this stage.
    pub fn parameter_keys(self) -> &'static [&'static str] {
        match self {
            StageId::WhiteBalance => &[
                "white_balance_enabled",
                "white_balance_method",
                "gray_world_percentile",
                "gray_world_max_adjustment",
                "white_patch_percentile",
                "white_patch_max_adjustment",
                "shades_of_gray_norm",
                "shades_of_gray_percentile",
                "shades_of_gray_max_adjustment",
                "grey_edge_norm",
                "grey_edge_sigma",
                "grey_edge_max_adjustment",
                "lake_green_reduction",
                "lake_magenta_strength",
                "lake_gray_world_influence",
            ],
            StageId::Udcp => &[
                "udcp_enabled",
                "udcp_omega",
                "udcp_t0",
                "udcp_window_size",
                "udcp_guided_radius",
                "udcp_guided_eps",
                "udcp_enhance_contrast",
            ],
            StageId::BeerLambert => &[
                "beer_lambert_enabled",
                "beer_lambert_depth_factor",
                "beer_lambert_red_coeff",
                "beer_lambert_green_coeff",
                "beer_lambert_blue_coeff",
                "beer_lambert_enhance_factor",
            ],
            StageId::ColorRebalance => &[
                "color_rebalance_enabled",
                "color_rebalance_rr",
                "color_rebalance_rg",
                "color_rebalance_rb",
                "color_rebalance_gr",
                "color_rebalance_gg",
                "color_rebalance_gb",
                "color_rebalance_br",
                "color_rebalance_bg",
                "color_rebalance_bb",
                "color_rebalance_saturation_limit",
                "color_rebalance_preserve_luminance",
            ],
            StageId::Clahe => &["clahe_enabled", "clahe_clip_limit", "clahe_tile_size"],
            StageId::Fusion => &[
                "fusion_enabled",
                "fusion_laplacian_levels",
                "fusion_contrast_weight",
                "fusion_saturation_weight",
                "fusion_exposedness_weight",
                "fusion_sigma_contrast",
                "fusion_sigma_saturation",
                "fusion_sigma_exposedness",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Choice,
}

pub struct ParamDescriptor {
    pub key: &'static str,
    pub kind: ParamKind,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: fn() -> Value,
    pub choices: &'static [&'static str],
    pub label: &'static str,
    /// Visible only when this predicate (if present) evaluates to true
    /// against the *current* store; e.g. percentile rows that only make
    /// sense for one `white_balance_method`.
    pub visibility: Option<fn(&ParameterStore) -> bool>,
}

fn is_gray_world(store: &ParameterStore) -> bool {
    matches!(store.get("white_balance_method"), Ok(Value::Choice(m)) if m == "gray_world")
}
fn is_white_patch(store: &ParameterStore) -> bool {
    matches!(store.get("white_balance_method"), Ok(Value::Choice(m)) if m == "white_patch")
}
fn is_shades_of_gray(store: &ParameterStore) -> bool {
    matches!(store.get("white_balance_method"), Ok(Value::Choice(m)) if m == "shades_of_gray")
}
fn is_grey_edge(store: &ParameterStore) -> bool {
    matches!(store.get("white_balance_method"), Ok(Value::Choice(m)) if m == "grey_edge")
}
fn is_lake_green_water(store: &ParameterStore) -> bool {
    matches!(store.get("white_balance_method"), Ok(Value::Choice(m)) if m == "lake_green_water")
}
fn saturation_guard_active(store: &ParameterStore) -> bool {
    matches!(store.get("color_rebalance_saturation_limit"), Ok(Value::Float(v)) if v < 1.0)
}

macro_rules! desc {
    ($key:literal, $kind:expr, $min:expr, $max:expr, $step:expr, $default:expr, $label:literal) => {
        ParamDescriptor {
            key: $key,
            kind: $kind,
            min: $min,
            max: $max,
            step: $step,
            default: $default,
            choices: &[],
            label: $label,
            visibility: None,
        }
    };
    ($key:literal, $kind:expr, $min:expr, $max:expr, $step:expr, $default:expr, $label:literal, $vis:expr) => {
        ParamDescriptor {
            key: $key,
            kind: $kind,
            min: $min,
            max: $max,
            step: $step,
            default: $default,
            choices: &[],
            label: $label,
            visibility: Some($vis),
        }
    };
}

const WB_METHODS: &[&str] = &[
    "gray_world",
    "white_patch",
    "shades_of_gray",
    "grey_edge",
    "lake_green_water",
];

fn build_schema() -> Vec<ParamDescriptor> {
    vec![
        desc!(
            "white_balance_enabled",
            ParamKind::Bool,
            0.0,
            1.0,
            1.0,
            || Value::Bool(true),
            "Enable white balance"
        ),
        ParamDescriptor {
            key: "white_balance_method",
            kind: ParamKind::Choice,
            min: 0.0,
            max: 0.0,
            step: 0.0,
            default: || Value::Choice("gray_world".to_string()),
            choices: WB_METHODS,
            label: "White balance method",
            visibility: None,
        },
        desc!(
            "gray_world_percentile",
            ParamKind::Float,
            0.0,
            100.0,
            1.0,
            || Value::Float(15.0),
            "Gray-world percentile",
            is_gray_world
        ),
        desc!(
            "gray_world_max_adjustment",
            ParamKind::Float,
            1.0,
            5.0,
            0.1,
            || Value::Float(2.0),
            "Gray-world max adjustment",
            is_gray_world
        ),
        desc!(
            "white_patch_percentile",
            ParamKind::Float,
            50.0,
            100.0,
            0.5,
            || Value::Float(99.0),
            "White-patch percentile",
            is_white_patch
        ),
        desc!(
            "white_patch_max_adjustment",
            ParamKind::Float,
            1.0,
            5.0,
            0.1,
            || Value::Float(2.0),
            "White-patch max adjustment",
            is_white_patch
        ),
        desc!(
            "shades_of_gray_norm",
            ParamKind::Float,
            1.0,
            20.0,
            1.0,
            || Value::Float(6.0),
            "Shades-of-gray Minkowski norm",
            is_shades_of_gray
        ),
        desc!(
            "shades_of_gray_percentile",
            ParamKind::Float,
            0.0,
            100.0,
            1.0,
            || Value::Float(50.0),
            "Shades-of-gray percentile",
            is_shades_of_gray
        ),
        desc!(
            "shades_of_gray_max_adjustment",
            ParamKind::Float,
            1.0,
            5.0,
            0.1,
            || Value::Float(2.0),
            "Shades-of-gray max adjustment",
            is_shades_of_gray
        ),
        desc!(
            "grey_edge_norm",
            ParamKind::Float,
            1.0,
            20.0,
            1.0,
            || Value::Float(1.0),
            "Grey-edge Minkowski norm",
            is_grey_edge
        ),
        desc!(
            "grey_edge_sigma",
            ParamKind::Float,
            0.0,
            5.0,
            0.1,
            || Value::Float(1.0),
            "Grey-edge prefilter sigma",
            is_grey_edge
        ),
        desc!(
            "grey_edge_max_adjustment",
            ParamKind::Float,
            1.0,
            5.0,
            0.1,
            || Value::Float(2.0),
            "Grey-edge max adjustment",
            is_grey_edge
        ),
        desc!(
            "lake_green_reduction",
            ParamKind::Float,
            0.0,
            1.0,
            0.01,
            || Value::Float(0.4),
            "Lake green reduction",
            is_lake_green_water
        ),
        desc!(
            "lake_magenta_strength",
            ParamKind::Float,
            0.0,
            0.5,
            0.01,
            || Value::Float(0.15),
            "Lake magenta compensation strength",
            is_lake_green_water
        ),
        desc!(
            "lake_gray_world_influence",
            ParamKind::Float,
            0.0,
            1.0,
            0.01,
            || Value::Float(0.7),
            "Lake gray-world blend influence",
            is_lake_green_water
        ),
        desc!(
            "udcp_enabled",
            ParamKind::Bool,
            0.0,
            1.0,
            1.0,
            || Value::Bool(true),
            "Enable UDCP dehazing"
        ),
        desc!(
            "udcp_omega",
            ParamKind::Float,
            0.0,
            1.0,
            0.01,
            || Value::Float(0.95),
            "UDCP omega (haze removal strength)"
        ),
        desc!(
            "udcp_t0",
            ParamKind::Float,
            0.01,
            0.9,
            0.01,
            || Value::Float(0.1),
            "UDCP transmission floor"
        ),
        desc!(
            "udcp_window_size",
            ParamKind::Int,
            3.0,
            51.0,
            2.0,
            || Value::Int(11),
            "UDCP dark-channel window size"
        ),
        desc!(
            "udcp_guided_radius",
            ParamKind::Int,
            1.0,
            200.0,
            1.0,
            || Value::Int(60),
            "UDCP guided-filter radius"
        ),
        desc!(
            "udcp_guided_eps",
            ParamKind::Float,
            0.0001,
            1.0,
            0.0001,
            || Value::Float(0.001),
            "UDCP guided-filter epsilon"
        ),
        desc!(
            "udcp_enhance_contrast",
            ParamKind::Float,
            0.1,
            3.0,
            0.05,
            || Value::Float(1.2),
            "UDCP post-contrast factor"
        ),
        desc!(
            "beer_lambert_enabled",
            ParamKind::Bool,
            0.0,
            1.0,
            1.0,
            || Value::Bool(true),
            "Enable Beer-Lambert correction"
        ),
        desc!(
            "beer_lambert_depth_factor",
            ParamKind::Float,
            0.0,
            2.0,
            0.01,
            || Value::Float(0.15),
            "Beer-Lambert depth factor"
        ),
        desc!(
            "beer_lambert_red_coeff",
            ParamKind::Float,
            0.1,
            2.0,
            0.01,
            || Value::Float(0.6),
            "Beer-Lambert red attenuation coefficient"
        ),
        desc!(
            "beer_lambert_green_coeff",
            ParamKind::Float,
            0.1,
            1.5,
            0.01,
            || Value::Float(0.3),
            "Beer-Lambert green attenuation coefficient"
        ),
        desc!(
            "beer_lambert_blue_coeff",
            ParamKind::Float,
            0.05,
            1.0,
            0.01,
            || Value::Float(0.1),
            "Beer-Lambert blue attenuation coefficient"
        ),
        desc!(
            "beer_lambert_enhance_factor",
            ParamKind::Float,
            1.0,
            3.0,
            0.05,
            || Value::Float(1.5),
            "Beer-Lambert global enhancement factor"
        ),
        desc!(
            "color_rebalance_enabled",
            ParamKind::Bool,
            0.0,
            1.0,
            1.0,
            || Value::Bool(true),
            "Enable color rebalance"
        ),
        desc!(
            "color_rebalance_rr",
            ParamKind::Float,
            0.5,
            2.0,
            0.01,
            || Value::Float(1.0),
            "Red <- Red"
        ),
        desc!(
            "color_rebalance_rg",
            ParamKind::Float,
            -0.5,
            0.5,
            0.01,
            || Value::Float(0.0),
            "Red <- Green"
        ),
        desc!(
            "color_rebalance_rb",
            ParamKind::Float,
            -0.5,
            0.5,
            0.01,
            || Value::Float(0.0),
            "Red <- Blue"
        ),
        desc!(
            "color_rebalance_gr",
            ParamKind::Float,
            -0.5,
            0.5,
            0.01,
            || Value::Float(0.0),
            "Green <- Red"
        ),
        desc!(
            "color_rebalance_gg",
            ParamKind::Float,
            0.5,
            2.0,
            0.01,
            || Value::Float(1.0),
            "Green <- Green"
        ),
        desc!(
            "color_rebalance_gb",
            ParamKind::Float,
            -0.5,
            0.5,
            0.01,
            || Value::Float(0.0),
            "Green <- Blue"
        ),
        desc!(
            "color_rebalance_br",
            ParamKind::Float,
            -0.5,
            0.5,
            0.01,
            || Value::Float(0.0),
            "Blue <- Red"
        ),
        desc!(
            "color_rebalance_bg",
            ParamKind::Float,
            -0.5,
            0.5,
            0.01,
            || Value::Float(0.0),
            "Blue <- Green"
        ),
        desc!(
            "color_rebalance_bb",
            ParamKind::Float,
            0.5,
            2.0,
            0.01,
            || Value::Float(1.0),
            "Blue <- Blue"
        ),
        desc!(
            "color_rebalance_saturation_limit",
            ParamKind::Float,
            0.0,
            1.0,
            0.01,
            || Value::Float(0.8),
            "Saturation guard limit"
        ),
        desc!(
            "color_rebalance_preserve_luminance",
            ParamKind::Bool,
            0.0,
            1.0,
            1.0,
            || Value::Bool(false),
            "Preserve original luminance",
            saturation_guard_active
        ),
        desc!(
            "clahe_enabled",
            ParamKind::Bool,
            0.0,
            1.0,
            1.0,
            || Value::Bool(true),
            "Enable CLAHE"
        ),
        desc!(
            "clahe_clip_limit",
            ParamKind::Float,
            0.1,
            10.0,
            0.1,
            || Value::Float(2.0),
            "CLAHE clip limit"
        ),
        desc!(
            "clahe_tile_size",
            ParamKind::Int,
            2.0,
            32.0,
            1.0,
            || Value::Int(8),
            "CLAHE tile grid size"
        ),
        desc!(
            "fusion_enabled",
            ParamKind::Bool,
            0.0,
            1.0,
            1.0,
            || Value::Bool(true),
            "Enable multi-scale fusion"
        ),
        desc!(
            "fusion_laplacian_levels",
            ParamKind::Int,
            2.0,
            8.0,
            1.0,
            || Value::Int(5),
            "Fusion Laplacian pyramid levels"
        ),
        desc!(
            "fusion_contrast_weight",
            ParamKind::Float,
            0.0,
            2.0,
            0.05,
            || Value::Float(1.0),
            "Fusion contrast weight exponent"
        ),
        desc!(
            "fusion_saturation_weight",
            ParamKind::Float,
            0.0,
            2.0,
            0.05,
            || Value::Float(1.0),
            "Fusion saturation weight exponent"
        ),
        desc!(
            "fusion_exposedness_weight",
            ParamKind::Float,
            0.0,
            2.0,
            0.05,
            || Value::Float(1.0),
            "Fusion well-exposedness weight exponent"
        ),
        desc!(
            "fusion_sigma_contrast",
            ParamKind::Float,
            0.05,
            1.0,
            0.01,
            || Value::Float(0.2),
            "Fusion contrast map smoothing sigma"
        ),
        desc!(
            "fusion_sigma_saturation",
            ParamKind::Float,
            0.05,
            1.0,
            0.01,
            || Value::Float(0.3),
            "Fusion saturation map smoothing sigma"
        ),
        desc!(
            "fusion_sigma_exposedness",
            ParamKind::Float,
            0.05,
            1.0,
            0.01,
            || Value::Float(0.2),
            "Fusion well-exposedness map smoothing sigma"
        ),
    ]
}

pub fn schema() -> &'static [ParamDescriptor] {
    static SCHEMA: OnceLock<Vec<ParamDescriptor>> = OnceLock::new();
    SCHEMA.get_or_init(build_schema)
}

pub fn descriptor(key: &str) -> Option<&'static ParamDescriptor> {
    schema().iter().find(|d| d.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_key_exists_in_schema() {
        for stage in PIPELINE_ORDER {
            for key in stage.parameter_keys() {
                assert!(
                    descriptor(key).is_some(),
                    "missing schema entry for {key}"
                );
            }
        }
    }

    #[test]
    fn schema_has_no_duplicate_keys() {
        let keys: Vec<&str> = schema().iter().map(|d| d.key).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(keys.len(), sorted.len());
    }
}
