//! Auto-tuning: per-stage parameter estimators driven by statistics of
//! the *original*, pre-pipeline image — never the progressively processed
//! buffer. Every estimator returns a list of parameter overrides rather
//! than mutating the store directly, so a failed estimate never leaves
//! the store half-written; the caller applies them with
//! [`ParameterStore::apply_overrides`].

pub mod beer_lambert;
pub mod clahe;
pub mod color_rebalance;
pub mod fusion;
pub mod udcp;
pub mod white_balance;

use crate::error::{Error, Result};
use crate::image_buffer::ImageF32;
use crate::params::{ParameterStore, Value};
use crate::schema::StageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoTuneMode {
    Standard,
    Enhanced,
}

/// Estimate and apply overrides for one stage. `Enhanced` falls back to
/// `Standard` for stages that have no literature-grounded enhanced
/// estimator of their own (color rebalance, CLAHE, fusion).
pub fn auto_tune(
    stage: StageId,
    mode: AutoTuneMode,
    original: &ImageF32,
    params: &mut ParameterStore,
) -> Result<()> {
    let overrides = estimate(stage, mode, original, params)?;
    params.apply_overrides(&overrides.iter().map(|(k, v)| (*k, v.clone())).collect::<Vec<_>>());
    Ok(())
}

fn estimate(
    stage: StageId,
    mode: AutoTuneMode,
    original: &ImageF32,
    params: &ParameterStore,
) -> Result<Vec<(&'static str, Value)>> {
    if stats::is_degenerate(original) {
        return Ok(Vec::new());
    }
    let result = match (stage, mode) {
        (StageId::WhiteBalance, AutoTuneMode::Standard) => white_balance::standard(original),
        (StageId::WhiteBalance, AutoTuneMode::Enhanced) => white_balance::enhanced(original),
        (StageId::Udcp, AutoTuneMode::Standard) => udcp::standard(original),
        (StageId::Udcp, AutoTuneMode::Enhanced) => udcp::enhanced(original),
        (StageId::BeerLambert, AutoTuneMode::Standard) => beer_lambert::standard(original),
        (StageId::BeerLambert, AutoTuneMode::Enhanced) => beer_lambert::enhanced(original),
        (StageId::ColorRebalance, _) => color_rebalance::standard(original, params),
        (StageId::Clahe, _) => clahe::standard(original),
        (StageId::Fusion, _) => fusion::standard(original),
    };
    result.map_err(|cause| Error::AutoTuneFailed {
        stage,
        cause: cause.to_string(),
    })
}

/// Shared image-statistics helpers every estimator draws from.
pub(crate) mod stats {
    use crate::image_buffer::ImageF32;

    pub struct ChannelStats {
        pub r_mean: f32,
        pub g_mean: f32,
        pub b_mean: f32,
        pub luma_mean: f32,
        pub luma_std: f32,
    }

    pub fn channel_stats(img: &ImageF32) -> ChannelStats {
        let luma = img.luma();
        ChannelStats {
            r_mean: img.r.mean(),
            g_mean: img.g.mean(),
            b_mean: img.b.mean(),
            luma_mean: luma.mean(),
            luma_std: luma.std_dev(),
        }
    }

    /// How strongly blue/green dominates red: > 0 means a cool/underwater
    /// cast, the usual case this whole crate exists for.
    pub fn cool_cast_strength(stats: &ChannelStats) -> f32 {
        let bg = (stats.b_mean + stats.g_mean) / 2.0;
        crate::image_buffer::safe_div(bg - stats.r_mean, bg.max(stats.r_mean))
    }

    /// An image too small or too flat to carry any usable color-cast
    /// signal; estimators would just be fitting noise, so auto-tune skips
    /// them entirely rather than emit a spurious override.
    pub fn is_degenerate(img: &ImageF32) -> bool {
        if img.width < 4 || img.height < 4 {
            return true;
        }
        let luma = img.luma();
        luma.std_dev() < 1e-4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    fn checkerboard(w: u32, h: u32) -> Image {
        let mut data = Vec::with_capacity(w as usize * h as usize * 3);
        for y in 0..h {
            for x in 0..w {
                if (x + y) % 2 == 0 {
                    data.extend_from_slice(&[30, 90, 120]);
                } else {
                    data.extend_from_slice(&[60, 150, 200]);
                }
            }
        }
        Image::new(w, h, data).unwrap()
    }

    #[test]
    fn unsupported_enhanced_falls_back_to_standard_result_shape() {
        let img = checkerboard(8, 8).to_f32();
        let params = ParameterStore::with_defaults();
        let std_result = estimate(StageId::Clahe, AutoTuneMode::Standard, &img, &params).unwrap();
        let enh_result = estimate(StageId::Clahe, AutoTuneMode::Enhanced, &img, &params).unwrap();
        assert_eq!(
            std_result.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            enh_result.iter().map(|(k, _)| *k).collect::<Vec<_>>()
        );
    }

    #[test]
    fn auto_tune_applies_without_error_for_every_stage() {
        let img = checkerboard(16, 16).to_f32();
        let mut params = ParameterStore::with_defaults();
        for stage in crate::schema::PIPELINE_ORDER {
            auto_tune(stage, AutoTuneMode::Standard, &img, &mut params).unwrap();
            auto_tune(stage, AutoTuneMode::Enhanced, &img, &mut params).unwrap();
        }
    }

    #[test]
    fn degenerate_uniform_image_yields_no_overrides() {
        let img = Image::filled(8, 8, [80, 80, 80]).to_f32();
        let params = ParameterStore::with_defaults();
        let overrides =
            estimate(StageId::WhiteBalance, AutoTuneMode::Standard, &img, &params).unwrap();
        assert!(overrides.is_empty());
    }

    #[test]
    fn degenerate_tiny_image_yields_no_overrides() {
        let img = Image::filled(2, 2, [10, 200, 30]).to_f32();
        let params = ParameterStore::with_defaults();
        let overrides = estimate(StageId::Udcp, AutoTuneMode::Standard, &img, &params).unwrap();
        assert!(overrides.is_empty());
    }
}
