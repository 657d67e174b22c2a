//! Multi-scale Laplacian-pyramid fusion (Ancuti-style): build three
//! variants of the running pipeline result, score each pixel of each
//! variant on contrast/saturation/well-exposedness, then blend the
//! variants per Laplacian-pyramid level using Gaussian pyramids of the
//! (normalized) weight maps.

use super::clahe;
use super::Stage;
use crate::error::Result;
use crate::filters::{gaussian_blur, laplacian};
use crate::image_buffer::{safe_div, ImageF32, Plane};
use crate::params::ParameterStore;
use crate::pyramid::{build_gaussian_pyramid, build_laplacian_pyramid, collapse_laplacian_pyramid};
use crate::schema::StageId;

pub struct FusionStage;

impl Stage for FusionStage {
    fn id(&self) -> StageId {
        StageId::Fusion
    }

    fn apply(&self, img: &ImageF32, params: &ParameterStore) -> Result<ImageF32> {
        if !params.get_bool("fusion_enabled")? {
            return Ok(img.clone());
        }
        let levels = params.get_i32("fusion_laplacian_levels")?.max(1) as usize;
        let wc = params.get_f32("fusion_contrast_weight")?;
        let ws = params.get_f32("fusion_saturation_weight")?;
        let we = params.get_f32("fusion_exposedness_weight")?;
        let sigma_c = params.get_f32("fusion_sigma_contrast")?;
        let sigma_s = params.get_f32("fusion_sigma_saturation")?;
        let sigma_e = params.get_f32("fusion_sigma_exposedness")?;

        let v1 = img.clone();
        let v2 = clahe::apply_to_image(img, 1.5, 16);
        let v3 = unsharp_mask(img, 0.8, 0.2);
        let variants = [v1, v2, v3];

        let max_levels = max_pyramid_levels(img.width, img.height, levels);

        let mut weight_maps: Vec<Plane> = variants
            .iter()
            .map(|v| weight_map(v, wc, ws, we, sigma_c, sigma_s, sigma_e))
            .collect();
        normalize_weights(&mut weight_maps);

        let weight_pyramids: Vec<Vec<Plane>> = weight_maps
            .iter()
            .map(|w| build_gaussian_pyramid(w, max_levels))
            .collect();

        let mut fused_channels = [
            Plane::new(img.width, img.height, 0.0),
            Plane::new(img.width, img.height, 0.0),
            Plane::new(img.width, img.height, 0.0),
        ];
        for c in 0..3 {
            let laplacian_pyramids: Vec<Vec<Plane>> = variants
                .iter()
                .map(|v| build_laplacian_pyramid(v.channel(c), max_levels))
                .collect();
            let fused_levels = fuse_levels(&laplacian_pyramids, &weight_pyramids, max_levels);
            fused_channels[c] = collapse_laplacian_pyramid(&fused_levels);
        }

        Ok(ImageF32::from_channels(
            fused_channels[0].clone(),
            fused_channels[1].clone(),
            fused_channels[2].clone(),
        )
        .clamp01())
    }
}

fn max_pyramid_levels(width: u32, height: u32, requested: usize) -> usize {
    let smallest_dim = width.min(height).max(1);
    let mut levels = 1usize;
    let mut dim = smallest_dim;
    while dim > 4 && levels < requested {
        dim /= 2;
        levels += 1;
    }
    levels.max(1)
}

fn unsharp_mask(img: &ImageF32, sigma: f32, amount: f32) -> ImageF32 {
    let sharpen = |plane: &Plane| -> Plane {
        let blurred = gaussian_blur(plane, sigma);
        plane
            .zip_map(&blurred, |v, b| v + amount * (v - b))
            .map(|v| v.clamp(0.0, 1.0))
    };
    ImageF32::from_channels(sharpen(&img.r), sharpen(&img.g), sharpen(&img.b))
}

fn weight_map(
    img: &ImageF32,
    wc: f32,
    ws: f32,
    we: f32,
    sigma_c: f32,
    sigma_s: f32,
    sigma_e: f32,
) -> Plane {
    let gray = img.luma();
    let contrast = gaussian_blur(&laplacian(&gray).map(|v| v.abs()), sigma_c);

    let saturation = gaussian_blur(&per_pixel_channel_std(img), sigma_s);

    let well_exposed = well_exposedness(img, sigma_e);

    contrast
        .map(|c| c.max(1e-6).powf(wc))
        .zip_map(&saturation.map(|s| s.max(1e-6).powf(ws)), |c, s| c * s)
        .zip_map(&well_exposed.map(|e| e.max(1e-6).powf(we)), |cs, e| cs * e)
}

fn per_pixel_channel_std(img: &ImageF32) -> Plane {
    let w = img.width;
    let h = img.height;
    let mut out = Plane::new(w, h, 0.0);
    for y in 0..h {
        for x in 0..w {
            let [r, g, b] = img.pixel(x, y);
            let mean = (r + g + b) / 3.0;
            let var = ((r - mean).powi(2) + (g - mean).powi(2) + (b - mean).powi(2)) / 3.0;
            out.set(x, y, var.sqrt());
        }
    }
    out
}

fn well_exposedness(img: &ImageF32, sigma: f32) -> Plane {
    let sigma = sigma.max(1e-3);
    img.luma()
        .map(|l| (-0.5 * ((l - 0.5) / sigma).powi(2)).exp())
}

fn normalize_weights(maps: &mut [Plane]) {
    let w = maps[0].width;
    let h = maps[0].height;
    for y in 0..h {
        for x in 0..w {
            let sum: f32 = maps.iter().map(|m| m.get(x, y)).sum();
            if sum > 1e-6 {
                for m in maps.iter_mut() {
                    let v = m.get(x, y);
                    m.set(x, y, safe_div(v, sum));
                }
            } else {
                let equal = 1.0 / maps.len() as f32;
                for m in maps.iter_mut() {
                    m.set(x, y, equal);
                }
            }
        }
    }
}

fn fuse_levels(
    laplacian_pyramids: &[Vec<Plane>],
    weight_pyramids: &[Vec<Plane>],
    levels: usize,
) -> Vec<Plane> {
    let mut fused = Vec::with_capacity(levels);
    for l in 0..levels {
        let w = laplacian_pyramids[0][l].width;
        let h = laplacian_pyramids[0][l].height;
        let mut acc = Plane::new(w, h, 0.0);
        for (lap, wp) in laplacian_pyramids.iter().zip(weight_pyramids.iter()) {
            let weighted = lap[l].zip_map(&wp[l], |v, wv| v * wv);
            acc = acc.zip_map(&weighted, |a, b| a + b);
        }
        fused.push(acc);
    }
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;
    use crate::params::Value;

    #[test]
    fn disabled_stage_is_identity() {
        let img = Image::filled(16, 16, [90, 100, 110]).to_f32();
        let mut store = ParameterStore::with_defaults();
        store.set("fusion_enabled", Value::Bool(false)).unwrap();
        let stage = FusionStage;
        let out = stage.apply(&img, &store).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn fusion_of_uniform_image_stays_uniform() {
        let img = Image::filled(32, 32, [128, 128, 128]).to_f32();
        let store = ParameterStore::with_defaults();
        let stage = FusionStage;
        let out = stage.apply(&img, &store).unwrap();
        let expected = 128.0 / 255.0;
        for v in out.r.data.iter() {
            assert!((v - expected).abs() < 0.05, "{v}");
        }
    }

    #[test]
    fn output_stays_in_unit_range() {
        let img = Image::filled(24, 24, [10, 200, 60]).to_f32();
        let store = ParameterStore::with_defaults();
        let stage = FusionStage;
        let out = stage.apply(&img, &store).unwrap();
        for v in out.r.data.iter().chain(out.g.data.iter()).chain(out.b.data.iter()) {
            assert!((0.0..=1.0).contains(v));
        }
    }
}
