//! CLAHE auto-tuning: pick a clip limit from how flat the original
//! image's luma histogram already is — low-contrast scenes can tolerate
//! (and need) a higher clip limit before noise amplification shows.

use super::stats::channel_stats;
use crate::image_buffer::ImageF32;
use crate::params::Value;

pub fn standard(original: &ImageF32) -> Result<Vec<(&'static str, Value)>, String> {
    let stats = channel_stats(original);
    let low_contrast = (0.12 - stats.luma_std).max(0.0) / 0.12;

    let clip_limit = (1.5 + low_contrast * 2.5).clamp(1.0, 4.0);
    let tile_size = if original.width.max(original.height) > 1600 {
        10
    } else {
        8
    };

    Ok(vec![
        ("clahe_clip_limit", Value::Float(clip_limit)),
        ("clahe_tile_size", Value::Int(tile_size)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn flat_image_gets_higher_clip_limit() {
        let flat = Image::filled(16, 16, [100, 100, 100]).to_f32();
        let overrides = standard(&flat).unwrap();
        let clip = overrides
            .iter()
            .find(|(k, _)| *k == "clahe_clip_limit")
            .unwrap()
            .1
            .as_f32()
            .unwrap();
        assert!(clip > 3.0);
    }
}
