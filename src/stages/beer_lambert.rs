//! Beer-Lambert depth compensation: estimate a per-pixel depth proxy from
//! luma, then apply a per-channel exponential attenuation compensation
//! `exp(k_channel * depth * depth_factor)`, followed by a soft
//! per-channel 99th-percentile normalization so the compensation can't
//! blow out highlights.

use super::Stage;
use crate::error::Result;
use crate::image_buffer::{safe_div, ImageF32, Plane};
use crate::params::ParameterStore;
use crate::schema::StageId;

pub struct BeerLambertStage;

impl Stage for BeerLambertStage {
    fn id(&self) -> StageId {
        StageId::BeerLambert
    }

    fn apply(&self, img: &ImageF32, params: &ParameterStore) -> Result<ImageF32> {
        if !params.get_bool("beer_lambert_enabled")? {
            return Ok(img.clone());
        }
        let depth_factor = params.get_f32("beer_lambert_depth_factor")?;
        let coeffs = [
            params.get_f32("beer_lambert_red_coeff")?,
            params.get_f32("beer_lambert_green_coeff")?,
            params.get_f32("beer_lambert_blue_coeff")?,
        ];
        let enhance = params.get_f32("beer_lambert_enhance_factor")?;

        let depth = depth_proxy(img);
        let compensated = ImageF32::from_channels(
            compensate(&img.r, &depth, coeffs[0], depth_factor, enhance),
            compensate(&img.g, &depth, coeffs[1], depth_factor, enhance),
            compensate(&img.b, &depth, coeffs[2], depth_factor, enhance),
        );
        Ok(normalize_channels(&compensated))
    }
}

/// Depth proxy: darker (lower-luma) pixels are assumed farther from the
/// light source, so depth increases as luma decreases.
fn depth_proxy(img: &ImageF32) -> Plane {
    img.luma().map(|l| 1.0 - l)
}

fn compensate(channel: &Plane, depth: &Plane, coeff: f32, depth_factor: f32, enhance: f32) -> Plane {
    channel
        .zip_map(depth, |c, d| (c, d))
        .map(|(c, d)| c * (coeff * d * depth_factor).exp() * enhance)
}

/// Soft per-channel normalization: only kicks in when a channel's 99th
/// percentile actually overshoots 1.0, in which case the whole channel is
/// rescaled so that percentile lands back at 1.0.
fn normalize_channels(img: &ImageF32) -> ImageF32 {
    let normalize = |plane: &Plane| -> Plane {
        let p99 = plane.percentile(99.0);
        if p99 > 1.0 {
            plane.map(|v| safe_div(v, p99).clamp(0.0, 1.0))
        } else {
            plane.map(|v| v.clamp(0.0, 1.0))
        }
    };
    ImageF32::from_channels(normalize(&img.r), normalize(&img.g), normalize(&img.b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn disabled_stage_is_identity() {
        let img = Image::filled(5, 5, [40, 60, 90]).to_f32();
        let mut store = ParameterStore::with_defaults();
        store
            .set("beer_lambert_enabled", crate::params::Value::Bool(false))
            .unwrap();
        let stage = BeerLambertStage;
        let out = stage.apply(&img, &store).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn output_stays_within_unit_range() {
        let img = Image::filled(10, 10, [20, 60, 140]).to_f32();
        let store = ParameterStore::with_defaults();
        let stage = BeerLambertStage;
        let out = stage.apply(&img, &store).unwrap();
        for v in out
            .r
            .data
            .iter()
            .chain(out.g.data.iter())
            .chain(out.b.data.iter())
        {
            assert!((0.0..=1.0).contains(v), "{v}");
        }
    }

    #[test]
    fn red_attenuates_more_than_blue_at_depth() {
        // Red has the largest coefficient by default, so a deep pixel's
        // red channel should get boosted more than blue relative to its
        // own starting value.
        let depth = Plane::new(1, 1, 0.9);
        let red_in = Plane::new(1, 1, 0.2);
        let blue_in = Plane::new(1, 1, 0.2);
        let red_out = compensate(&red_in, &depth, 0.6, 0.15, 1.5);
        let blue_out = compensate(&blue_in, &depth, 0.1, 0.15, 1.5);
        assert!(red_out.get(0, 0) > blue_out.get(0, 0));
    }
}
