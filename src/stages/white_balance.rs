//! White balance — five illuminant estimators, selected by
//! `white_balance_method`. Every method reduces to a per-channel gain
//! applied uniformly to the image; only how the gain is estimated
//! differs.

use super::Stage;
use crate::error::{Error, Result};
use crate::filters::{gaussian_blur, gradient_magnitude_l1};
use crate::image_buffer::{safe_div, ImageF32, Plane};
use crate::params::ParameterStore;
use crate::schema::StageId;

pub struct WhiteBalanceStage;

impl Stage for WhiteBalanceStage {
    fn id(&self) -> StageId {
        StageId::WhiteBalance
    }

    fn apply(&self, img: &ImageF32, params: &ParameterStore) -> Result<ImageF32> {
        if !params.get_bool("white_balance_enabled")? {
            return Ok(img.clone());
        }
        let method = params.get_choice("white_balance_method")?;
        let gains = match method.as_str() {
            "gray_world" => gray_world(img, params)?,
            "white_patch" => white_patch(img, params)?,
            "shades_of_gray" => shades_of_gray(img, params)?,
            "grey_edge" => grey_edge(img, params)?,
            "lake_green_water" => return lake_green_water(img, params),
            other => {
                return Err(Error::StageFailed {
                    stage: StageId::WhiteBalance,
                    cause: format!("unknown white balance method {other}"),
                })
            }
        };
        Ok(apply_gains(img, gains))
    }
}

fn apply_gains(img: &ImageF32, gains: [f32; 3]) -> ImageF32 {
    ImageF32::from_channels(
        img.r.map(|v| (v * gains[0]).clamp(0.0, 1.0)),
        img.g.map(|v| (v * gains[1]).clamp(0.0, 1.0)),
        img.b.map(|v| (v * gains[2]).clamp(0.0, 1.0)),
    )
}

fn gray_world(img: &ImageF32, params: &ParameterStore) -> Result<[f32; 3]> {
    let percentile = params.get_f32("gray_world_percentile")?;
    let max_adjust = params.get_f32("gray_world_max_adjustment")?;

    let estimators = [
        img.r.percentile(percentile),
        img.g.percentile(percentile),
        img.b.percentile(percentile),
    ];
    let gray = (estimators[0] + estimators[1] + estimators[2]) / 3.0;
    Ok(clamp_gains(estimators.map(|e| safe_div(gray, e)), max_adjust))
}

fn white_patch(img: &ImageF32, params: &ParameterStore) -> Result<[f32; 3]> {
    let percentile = params.get_f32("white_patch_percentile")?;
    let max_adjust = params.get_f32("white_patch_max_adjustment")?;

    let refs = [
        img.r.percentile(percentile),
        img.g.percentile(percentile),
        img.b.percentile(percentile),
    ];
    Ok(clamp_gains(refs.map(|r| safe_div(1.0, r)), max_adjust))
}

fn minkowski_norm(plane: &Plane, p: f32) -> f32 {
    let sum: f32 = plane.data.iter().map(|v| v.abs().powf(p)).sum();
    (sum / plane.data.len().max(1) as f32).powf(1.0 / p)
}

fn shades_of_gray(img: &ImageF32, params: &ParameterStore) -> Result<[f32; 3]> {
    let norm_p = params.get_f32("shades_of_gray_norm")?;
    let max_adjust = params.get_f32("shades_of_gray_max_adjustment")?;

    let norms = [
        minkowski_norm(&img.r, norm_p),
        minkowski_norm(&img.g, norm_p),
        minkowski_norm(&img.b, norm_p),
    ];
    let gray = (norms[0] + norms[1] + norms[2]) / 3.0;
    Ok(clamp_gains(norms.map(|n| safe_div(gray, n)), max_adjust))
}

fn grey_edge(img: &ImageF32, params: &ParameterStore) -> Result<[f32; 3]> {
    let norm_p = params.get_f32("grey_edge_norm")?;
    let sigma = params.get_f32("grey_edge_sigma")?;
    let max_adjust = params.get_f32("grey_edge_max_adjustment")?;

    let grad = |plane: &Plane| -> f32 {
        let smoothed = gaussian_blur(plane, sigma);
        minkowski_norm(&gradient_magnitude_l1(&smoothed), norm_p)
    };
    let norms = [grad(&img.r), grad(&img.g), grad(&img.b)];
    let gray = (norms[0] + norms[1] + norms[2]) / 3.0;
    Ok(clamp_gains(norms.map(|n| safe_div(gray, n)), max_adjust))
}

fn clamp_gains(gains: [f32; 3], max_adjust: f32) -> [f32; 3] {
    gains.map(|g| g.clamp(1.0 / max_adjust.max(1e-3), max_adjust.max(1e-3)))
}

/// Lake/green-water variant: dedicated three-step correction for scenes
/// dominated by green water rather than the usual blue-green cast.
/// 1. Reduce the green channel toward the red/blue average.
/// 2. Push a small magenta (red+blue) compensation to counter the
///    residual green dominance.
/// 3. Blend the result with a standard gray-world correction.
fn lake_green_water(img: &ImageF32, params: &ParameterStore) -> Result<ImageF32> {
    let green_reduction = params.get_f32("lake_green_reduction")?;
    let magenta_strength = params.get_f32("lake_magenta_strength")?;
    let gray_world_influence = params.get_f32("lake_gray_world_influence")?;

    // Per-pixel green-dominance weight: large where green is much
    // brighter than both red and blue at that pixel.
    let dominance = img
        .r
        .zip_map(&img.g, |r, g| (r, g))
        .zip_map(&img.b, |(r, g), b| safe_div(1.0, 1.0 + safe_div(r, g) + safe_div(b, g)));

    let g_reduced = img
        .g
        .zip_map(&dominance, |g, d| g * (1.0 - d * green_reduction));
    let r_boosted = img
        .r
        .zip_map(&dominance, |r, d| r * (1.0 + d * magenta_strength));
    let b_boosted = img
        .b
        .zip_map(&dominance, |b, d| b * (1.0 + d * magenta_strength));

    let step = ImageF32::from_channels(r_boosted, g_reduced, b_boosted);

    // Gray-world on the result, fixed M=2, blended toward identity.
    let gray_gains = gray_world(&step, &gray_world_for_lake(params))?;
    let final_gains = [
        1.0 + gray_world_influence * (gray_gains[0] - 1.0),
        1.0 + gray_world_influence * (gray_gains[1] - 1.0),
        1.0 + gray_world_influence * (gray_gains[2] - 1.0),
    ];
    Ok(apply_gains(&step, final_gains))
}

/// A throwaway store carrying gray-world's own parameters pinned to
/// `M=2` with the caller's percentile, as step 4 of the lake/green-water
/// correction specifies a fixed max-adjustment independent of whatever
/// `gray_world_max_adjustment` the user has set elsewhere.
fn gray_world_for_lake(params: &ParameterStore) -> ParameterStore {
    let mut store = params.clone();
    let _ = store.set(
        "gray_world_max_adjustment",
        crate::params::Value::Float(2.0),
    );
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn gray_world_balances_uniform_color_cast() {
        let img = Image::filled(8, 8, [200, 100, 50]).to_f32();
        let mut store = ParameterStore::with_defaults();
        store
            .set("white_balance_method", crate::params::Value::Choice("gray_world".into()))
            .unwrap();
        let stage = WhiteBalanceStage;
        let out = stage.apply(&img, &store).unwrap();
        let r = out.r.mean();
        let g = out.g.mean();
        let b = out.b.mean();
        assert!((r - g).abs() < 0.02, "r={r} g={g}");
        assert!((g - b).abs() < 0.02, "g={g} b={b}");
    }

    #[test]
    fn disabled_stage_is_identity() {
        let img = Image::filled(4, 4, [10, 20, 30]).to_f32();
        let mut store = ParameterStore::with_defaults();
        store
            .set("white_balance_enabled", crate::params::Value::Bool(false))
            .unwrap();
        let stage = WhiteBalanceStage;
        let out = stage.apply(&img, &store).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn white_patch_normalizes_brightest_reference() {
        let img = Image::filled(6, 6, [180, 180, 90]).to_f32();
        let mut store = ParameterStore::with_defaults();
        store
            .set("white_balance_method", crate::params::Value::Choice("white_patch".into()))
            .unwrap();
        let stage = WhiteBalanceStage;
        let out = stage.apply(&img, &store).unwrap();
        assert!(out.b.mean() > img.b.mean());
    }
}
