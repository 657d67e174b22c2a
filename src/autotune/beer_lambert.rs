//! Beer-Lambert auto-tuning: derive the depth factor and per-channel
//! attenuation coefficients from how much the original image's color
//! balance already looks wavelength-attenuated (red loss relative to
//! blue/green, the hallmark of water depth).

use super::stats::channel_stats;
use crate::filters::box_filter;
use crate::image_buffer::ImageF32;
use crate::params::Value;

/// Fixed spectral absorption coefficients, red/green/blue, per the
/// wavelength-dependent attenuation literature this estimator targets.
const SPECTRAL_TABLE: [f32; 3] = [0.45, 0.12, 0.05];

pub fn standard(original: &ImageF32) -> Result<Vec<(&'static str, Value)>, String> {
    let stats = channel_stats(original);
    let bg_avg = (stats.b_mean + stats.g_mean) / 2.0;
    let red_loss = crate::image_buffer::safe_div(bg_avg - stats.r_mean, bg_avg.max(1e-3)).clamp(0.0, 1.0);

    let depth_factor = (0.08 + red_loss * 0.3).clamp(0.05, 0.6);
    let red_coeff = (0.4 + red_loss * 0.8).clamp(0.3, 1.5);

    Ok(vec![
        ("beer_lambert_depth_factor", Value::Float(depth_factor)),
        ("beer_lambert_red_coeff", Value::Float(red_coeff)),
    ])
}

/// Enhanced estimator: the fixed spectral table `{R:0.45, G:0.12, B:0.05}`
/// (Akkaynak & Treibitz, "A Revised Underwater Image Formation Model")
/// scaled by the scene's overall darkness and by a local scattering
/// estimate — the mean absolute deviation of luma from its own 15x15 box
/// mean, which is large in hazy/scattering-heavy regions and near zero
/// in clean, uniformly lit ones. `depth_factor` is kept from the
/// standard estimator's red-loss reading, since the table only replaces
/// the per-channel coefficients.
pub fn enhanced(original: &ImageF32) -> Result<Vec<(&'static str, Value)>, String> {
    let depth_factor = standard(original)?
        .into_iter()
        .find(|(k, _)| *k == "beer_lambert_depth_factor")
        .map(|(_, v)| v)
        .unwrap_or(Value::Float(0.15));

    let stats = channel_stats(original);
    let darkness = (1.0 - stats.luma_mean).clamp(0.0, 1.0);

    let luma = original.luma();
    let local_mean = box_filter(&luma, 7);
    let scattering = luma.zip_map(&local_mean, |v, m| (v - m).abs()).mean();

    let darkness_factor = 1.0 + darkness;
    let scattering_factor = (1.0 + scattering * 4.0).clamp(0.8, 1.5);
    let scale = darkness_factor * scattering_factor;

    let red_coeff = (SPECTRAL_TABLE[0] * scale).clamp(0.1, 2.0);
    let green_coeff = (SPECTRAL_TABLE[1] * scale).clamp(0.1, 1.5);
    let blue_coeff = (SPECTRAL_TABLE[2] * scale).clamp(0.05, 1.0);
    let enhance_factor = (1.2 + darkness * 0.8).clamp(1.0, 2.5);

    Ok(vec![
        ("beer_lambert_depth_factor", depth_factor),
        ("beer_lambert_red_coeff", Value::Float(red_coeff)),
        ("beer_lambert_green_coeff", Value::Float(green_coeff)),
        ("beer_lambert_blue_coeff", Value::Float(blue_coeff)),
        ("beer_lambert_enhance_factor", Value::Float(enhance_factor)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn red_loss_increases_red_coefficient() {
        let balanced = Image::filled(8, 8, [120, 120, 120]).to_f32();
        let red_starved = Image::filled(8, 8, [30, 150, 150]).to_f32();
        let get = |ov: &[(&str, Value)]| {
            ov.iter()
                .find(|(k, _)| *k == "beer_lambert_red_coeff")
                .unwrap()
                .1
                .as_f32()
                .unwrap()
        };
        assert!(get(&standard(&red_starved).unwrap()) > get(&standard(&balanced).unwrap()));
    }
}
