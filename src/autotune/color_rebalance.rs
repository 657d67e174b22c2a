//! Color rebalance auto-tuning: nudge the diagonal of the 3x3 matrix back
//! toward gray using the same channel means the white balance estimators
//! use, scaled down since this stage is meant as a light touch-up after
//! white balance and dehazing have already done the heavy lifting.

use super::stats::channel_stats;
use crate::image_buffer::ImageF32;
use crate::params::{ParameterStore, Value};

pub fn standard(
    original: &ImageF32,
    params: &ParameterStore,
) -> Result<Vec<(&'static str, Value)>, String> {
    let stats = channel_stats(original);
    let gray = (stats.r_mean + stats.g_mean + stats.b_mean) / 3.0;

    // Half-strength gain toward gray on each diagonal entry; the
    // saturation guard (left untouched here) does the rest of the work.
    let gain = |mean: f32| (1.0 + 0.5 * crate::image_buffer::safe_div(gray - mean, mean.max(1e-3)))
        .clamp(0.6, 1.6);

    let white_balance_already_ran = params.get_bool("white_balance_enabled").unwrap_or(false);
    let strength = if white_balance_already_ran { 0.3 } else { 1.0 };

    Ok(vec![
        (
            "color_rebalance_rr",
            Value::Float(1.0 + (gain(stats.r_mean) - 1.0) * strength),
        ),
        (
            "color_rebalance_gg",
            Value::Float(1.0 + (gain(stats.g_mean) - 1.0) * strength),
        ),
        (
            "color_rebalance_bb",
            Value::Float(1.0 + (gain(stats.b_mean) - 1.0) * strength),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn weaker_gain_when_white_balance_already_ran() {
        let img = Image::filled(8, 8, [200, 100, 50]).to_f32();
        let params = ParameterStore::with_defaults();
        let overrides = standard(&img, &params).unwrap();
        let rr = overrides
            .iter()
            .find(|(k, _)| *k == "color_rebalance_rr")
            .unwrap()
            .1
            .as_f32()
            .unwrap();
        assert!(rr < 1.0);
        assert!(rr > 0.7);
    }
}
