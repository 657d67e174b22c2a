//! White balance auto-tuning: pick a method and seed its parameters from
//! the color-cast statistics of the original image.

use super::stats::{channel_stats, cool_cast_strength};
use crate::image_buffer::ImageF32;
use crate::params::Value;
use crate::water_type::{detect_water_type, WaterType};

pub fn standard(original: &ImageF32) -> Result<Vec<(&'static str, Value)>, String> {
    let stats = channel_stats(original);
    let cool = cool_cast_strength(&stats);
    let water = detect_water_type(original);

    let method = match water {
        WaterType::GreenLake => "lake_green_water",
        WaterType::DeepBlueLoss => "shades_of_gray",
        WaterType::ShallowRedLoss => "gray_world",
        WaterType::Balanced => "gray_world",
    };

    let max_adjustment = (1.5 + cool.abs() * 2.0).clamp(1.2, 4.0);

    let mut overrides = vec![
        ("white_balance_method", Value::Choice(method.to_string())),
        ("gray_world_max_adjustment", Value::Float(max_adjustment)),
        ("white_patch_max_adjustment", Value::Float(max_adjustment)),
        ("shades_of_gray_max_adjustment", Value::Float(max_adjustment)),
        ("grey_edge_max_adjustment", Value::Float(max_adjustment)),
    ];

    if water == WaterType::GreenLake {
        // Scale the lake-correction strength with how far green exceeds
        // the red/blue average: a mild excess only needs a gentle nudge,
        // a strong one needs the full correction.
        let green_excess = (stats.g_mean - (stats.r_mean + stats.b_mean) / 2.0).max(0.0);
        let green_reduction = (0.3 + green_excess * 1.5).clamp(0.2, 0.8);
        let magenta_strength = (0.1 + green_excess).clamp(0.05, 0.3);
        let gray_world_influence = (0.6 + green_excess).clamp(0.4, 0.9);
        overrides.push(("lake_green_reduction", Value::Float(green_reduction)));
        overrides.push(("lake_magenta_strength", Value::Float(magenta_strength)));
        overrides.push(("lake_gray_world_influence", Value::Float(gray_world_influence)));
    }

    Ok(overrides)
}

/// Enhanced estimator: additionally widens the Minkowski norm used by
/// shades-of-gray/grey-edge as the cast gets more extreme, since a high
/// norm is more robust against a dominant colored region (literature:
/// Finlayson & Trezzi, "Shades of Gray and Colour Constancy").
pub fn enhanced(original: &ImageF32) -> Result<Vec<(&'static str, Value)>, String> {
    let mut overrides = standard(original)?;
    let stats = channel_stats(original);
    let cool = cool_cast_strength(&stats).abs();

    let norm = if cool > 0.5 {
        8.0
    } else if cool > 0.25 {
        6.0
    } else {
        4.0
    };
    overrides.push(("shades_of_gray_norm", Value::Float(norm)));
    overrides.push(("grey_edge_sigma", Value::Float((1.0 + cool).clamp(0.5, 3.0))));
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn strong_green_cast_selects_lake_green_water() {
        let img = Image::filled(8, 8, [60, 180, 60]).to_f32();
        let overrides = standard(&img).unwrap();
        let method = overrides
            .iter()
            .find(|(k, _)| *k == "white_balance_method")
            .unwrap();
        assert_eq!(method.1, Value::Choice("lake_green_water".to_string()));
    }

    #[test]
    fn neutral_image_selects_gray_world() {
        let img = Image::filled(8, 8, [120, 120, 120]).to_f32();
        let overrides = standard(&img).unwrap();
        let method = overrides
            .iter()
            .find(|(k, _)| *k == "white_balance_method")
            .unwrap();
        assert_eq!(method.1, Value::Choice("gray_world".to_string()));
    }
}
