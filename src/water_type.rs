//! Water-type classification, used by auto-tune's white-balance
//! estimator to pick a method and exposed directly on the engine as
//! `detect_water_type`.

use crate::image_buffer::ImageF32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterType {
    GreenLake,
    DeepBlueLoss,
    ShallowRedLoss,
    Balanced,
}

/// Classify by each channel's share of total brightness.
pub fn detect_water_type(img: &ImageF32) -> WaterType {
    let r = img.r.mean().max(0.0);
    let g = img.g.mean().max(0.0);
    let b = img.b.mean().max(0.0);
    let total = (r + g + b).max(1e-6);

    let green_share = g / total;
    let blue_share = b / total;
    let red_share = r / total;

    if green_share > 0.40 {
        WaterType::GreenLake
    } else if blue_share < 0.25 {
        WaterType::DeepBlueLoss
    } else if red_share < 0.20 {
        WaterType::ShallowRedLoss
    } else {
        WaterType::Balanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn strong_green_cast_is_green_lake() {
        let img = Image::filled(8, 8, [60, 150, 80]).to_f32();
        assert_eq!(detect_water_type(&img), WaterType::GreenLake);
    }

    #[test]
    fn neutral_gray_is_balanced() {
        let img = Image::filled(8, 8, [120, 120, 120]).to_f32();
        assert_eq!(detect_water_type(&img), WaterType::Balanced);
    }

    #[test]
    fn low_blue_is_deep_blue_loss() {
        let img = Image::filled(8, 8, [140, 140, 20]).to_f32();
        assert_eq!(detect_water_type(&img), WaterType::DeepBlueLoss);
    }
}
