//! Fusion auto-tuning: lean the blend weights toward whichever cue
//! (contrast, saturation, exposedness) the original image is weakest on,
//! since that is the cue the fused result will most visibly improve.

use super::stats::channel_stats;
use crate::filters::sobel;
use crate::image_buffer::ImageF32;
use crate::params::Value;

/// Fraction of pixels whose Sobel gradient magnitude clears a fixed
/// threshold — a coarse proxy for how much edge detail the scene carries.
fn edge_density(original: &ImageF32) -> f32 {
    let luma = original.luma();
    let (gx, gy) = sobel(&luma);
    let mag = gx.zip_map(&gy, |x, y| (x * x + y * y).sqrt());
    let edge_count = mag.data.iter().filter(|&&v| v > 0.1).count();
    edge_count as f32 / mag.data.len().max(1) as f32
}

/// Mean per-pixel channel spread (how far R/G/B diverge from each other),
/// the same saturation proxy the fusion stage's own weight maps use.
fn mean_saturation(original: &ImageF32) -> f32 {
    let mut total = 0f32;
    let n = (original.width * original.height).max(1) as f32;
    for y in 0..original.height {
        for x in 0..original.width {
            let [r, g, b] = original.pixel(x, y);
            let mean = (r + g + b) / 3.0;
            let var = ((r - mean).powi(2) + (g - mean).powi(2) + (b - mean).powi(2)) / 3.0;
            total += var.sqrt();
        }
    }
    total / n
}

/// Mean closeness to mid-gray (0.5), the well-exposedness cue: near 1 for
/// a well-exposed scene, near 0 for one dominated by shadows or blowouts.
fn mean_exposedness(original: &ImageF32) -> f32 {
    original
        .luma()
        .map(|l| (-0.5 * ((l - 0.5) / 0.25f32).powi(2)).exp())
        .mean()
}

pub fn standard(original: &ImageF32) -> Result<Vec<(&'static str, Value)>, String> {
    let stats = channel_stats(original);
    let low_contrast = (0.15 - stats.luma_std).max(0.0) / 0.15;
    let contrast_weight = (1.0 + low_contrast * 0.6).clamp(0.8, 1.8);

    let density = edge_density(original);
    let saturation = mean_saturation(original);
    let exposedness = mean_exposedness(original);

    // Whichever cue the scene is weakest on gets the larger exponent, so
    // fusion leans harder on the variant that scores well on that cue.
    let saturation_weight = (1.0 + (0.2 - saturation).max(0.0) * 4.0).clamp(0.8, 1.8);
    let exposedness_weight = (1.0 + (0.6 - exposedness).max(0.0) * 1.5).clamp(0.8, 1.8);

    let longest_side = original.width.max(original.height);
    let levels = if longest_side > 1600 {
        6
    } else if density < 0.05 {
        // Little edge detail to preserve; a shallower pyramid avoids
        // fusing noise at the finest bands.
        4
    } else {
        5
    };

    Ok(vec![
        ("fusion_contrast_weight", Value::Float(contrast_weight)),
        ("fusion_saturation_weight", Value::Float(saturation_weight)),
        ("fusion_exposedness_weight", Value::Float(exposedness_weight)),
        ("fusion_laplacian_levels", Value::Int(levels)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn low_contrast_image_raises_contrast_weight() {
        let flat = Image::filled(16, 16, [110, 110, 110]).to_f32();
        let overrides = standard(&flat).unwrap();
        let w = overrides
            .iter()
            .find(|(k, _)| *k == "fusion_contrast_weight")
            .unwrap()
            .1
            .as_f32()
            .unwrap();
        assert!(w > 1.0);
    }

    #[test]
    fn desaturated_image_raises_saturation_weight() {
        let gray = Image::filled(16, 16, [120, 120, 120]).to_f32();
        let overrides = standard(&gray).unwrap();
        let w = overrides
            .iter()
            .find(|(k, _)| *k == "fusion_saturation_weight")
            .unwrap()
            .1
            .as_f32()
            .unwrap();
        assert!(w > 1.0);
    }

    #[test]
    fn dark_image_raises_exposedness_weight() {
        let dark = Image::filled(16, 16, [10, 12, 8]).to_f32();
        let overrides = standard(&dark).unwrap();
        let w = overrides
            .iter()
            .find(|(k, _)| *k == "fusion_exposedness_weight")
            .unwrap()
            .1
            .as_f32()
            .unwrap();
        assert!(w > 1.0);
    }
}
