//! Underwater dark channel prior (UDCP) dehazing: dark-channel estimate,
//! atmospheric light from the brightest dark-channel pixels, transmission
//! via the haze model, guided-filter refinement, and scene recovery.

use super::Stage;
use crate::error::Result;
use crate::filters::{box_filter, erode_rect};
use crate::image_buffer::{safe_div, ImageF32, Plane};
use crate::params::ParameterStore;
use crate::schema::StageId;

pub struct UdcpStage;

impl Stage for UdcpStage {
    fn id(&self) -> StageId {
        StageId::Udcp
    }

    fn apply(&self, img: &ImageF32, params: &ParameterStore) -> Result<ImageF32> {
        if !params.get_bool("udcp_enabled")? {
            return Ok(img.clone());
        }
        let omega = params.get_f32("udcp_omega")?;
        let t0 = params.get_f32("udcp_t0")?;
        let window_size = params.get_i32("udcp_window_size")?.max(1) as u32;
        let guided_radius = params.get_i32("udcp_guided_radius")?.max(1) as u32;
        let guided_eps = params.get_f32("udcp_guided_eps")?;
        let enhance = params.get_f32("udcp_enhance_contrast")?;

        let dark = dark_channel(img, window_size);
        let atmospheric = estimate_atmospheric_light(img, &dark);

        let transmission_raw = estimate_transmission(img, &atmospheric, omega, window_size);
        let guide = img.luma();
        let transmission = guided_filter(&guide, &transmission_raw, guided_radius, guided_eps);

        let recovered = recover(img, &atmospheric, &transmission, t0);
        Ok(enhance_contrast(&recovered, enhance))
    }
}

pub(crate) fn dark_channel(img: &ImageF32, window_size: u32) -> Plane {
    let min_rgb = img
        .r
        .zip_map(&img.g, |r, g| r.min(g))
        .zip_map(&img.b, |rg, b| rg.min(b));
    erode_rect(&min_rgb, window_size)
}

/// Atmospheric light: among the brightest 0.1% of dark-channel pixels,
/// take the per-channel average of the corresponding original pixels.
fn estimate_atmospheric_light(img: &ImageF32, dark: &Plane) -> [f32; 3] {
    let threshold = dark.percentile(99.9);
    let mut r_sum = 0f32;
    let mut g_sum = 0f32;
    let mut b_sum = 0f32;
    let mut count = 0usize;
    for y in 0..dark.height {
        for x in 0..dark.width {
            if dark.get(x, y) >= threshold {
                r_sum += img.r.get(x, y);
                g_sum += img.g.get(x, y);
                b_sum += img.b.get(x, y);
                count += 1;
            }
        }
    }
    if count == 0 {
        return [img.r.mean(), img.g.mean(), img.b.mean()];
    }
    let n = count as f32;
    [r_sum / n, g_sum / n, b_sum / n]
}

fn estimate_transmission(img: &ImageF32, atmospheric: &[f32; 3], omega: f32, window_size: u32) -> Plane {
    let norm_r = img.r.map(|v| safe_div(v, atmospheric[0]));
    let norm_g = img.g.map(|v| safe_div(v, atmospheric[1]));
    let norm_b = img.b.map(|v| safe_div(v, atmospheric[2]));
    let min_norm = norm_r.zip_map(&norm_g, |r, g| r.min(g)).zip_map(&norm_b, |rg, b| rg.min(b));
    let dark_norm = erode_rect(&min_norm, window_size);
    dark_norm.map(|d| 1.0 - omega * d)
}

/// Guided filter: refine a noisy map `p` using edge information from a
/// guidance image `guide`, via local linear regression in windows of
/// `radius`.
fn guided_filter(guide: &Plane, p: &Plane, radius: u32, eps: f32) -> Plane {
    let mean_guide = box_filter(guide, radius);
    let mean_p = box_filter(p, radius);
    let corr_guide = box_filter(&guide.zip_map(guide, |a, b| a * b), radius);
    let corr_gp = box_filter(&guide.zip_map(p, |a, b| a * b), radius);

    let var_guide = corr_guide.zip_map(&mean_guide, |c, m| c - m * m);
    let cov_gp = corr_gp
        .zip_map(&mean_guide, |c, m| (c, m))
        .zip_map(&mean_p, |(c, m), mp| c - m * mp);

    let a = cov_gp.zip_map(&var_guide, |cov, var| safe_div(cov, var + eps));
    let b = mean_p.zip_map(&a, |mp, av| (mp, av)).zip_map(&mean_guide, |(mp, av), mg| mp - av * mg);

    let mean_a = box_filter(&a, radius);
    let mean_b = box_filter(&b, radius);
    mean_a.zip_map(guide, |av, g| (av, g)).zip_map(&mean_b, |(av, g), bv| av * g + bv)
}

fn recover(img: &ImageF32, atmospheric: &[f32; 3], transmission: &Plane, t0: f32) -> ImageF32 {
    let t_clamped = transmission.map(|t| t.max(t0));
    let recover_channel = |plane: &Plane, a: f32| -> Plane {
        plane
            .zip_map(&t_clamped, |i, t| (i, t))
            .map(|(i, t)| (safe_div(i - a, t) + a).clamp(0.0, 1.0))
    };
    ImageF32::from_channels(
        recover_channel(&img.r, atmospheric[0]),
        recover_channel(&img.g, atmospheric[1]),
        recover_channel(&img.b, atmospheric[2]),
    )
}

fn enhance_contrast(img: &ImageF32, factor: f32) -> ImageF32 {
    let stretch = |plane: &Plane| -> Plane { plane.map(|v| ((v - 0.5) * factor + 0.5).clamp(0.0, 1.0)) };
    ImageF32::from_channels(stretch(&img.r), stretch(&img.g), stretch(&img.b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn disabled_stage_is_identity() {
        let img = Image::filled(6, 6, [50, 80, 120]).to_f32();
        let mut store = ParameterStore::with_defaults();
        store
            .set("udcp_enabled", crate::params::Value::Bool(false))
            .unwrap();
        let stage = UdcpStage;
        let out = stage.apply(&img, &store).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn dark_channel_of_uniform_gray_matches_value() {
        let img = Image::filled(12, 12, [100, 100, 100]).to_f32();
        let dark = dark_channel(&img, 5);
        let expected = 100.0 / 255.0;
        for v in &dark.data {
            assert!((v - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn stage_output_stays_in_range() {
        let img = Image::filled(20, 20, [30, 90, 140]).to_f32();
        let store = ParameterStore::with_defaults();
        let stage = UdcpStage;
        let out = stage.apply(&img, &store).unwrap();
        for p in out.r.data.iter().chain(out.g.data.iter()).chain(out.b.data.iter()) {
            assert!(p.is_finite());
        }
    }
}
