//! Contrast-limited adaptive histogram equalization, run on the L channel
//! of CIE LAB so color is left alone. The image is split into a
//! `tile_size x tile_size` grid; each tile gets its own clipped histogram
//! equalization mapping, and per-pixel output is bilinearly interpolated
//! between the four nearest tile mappings to avoid hard tile boundaries.

use super::Stage;
use crate::color::{image_to_lab, lab_to_image};
use crate::error::Result;
use crate::image_buffer::{ImageF32, Plane};
use crate::params::ParameterStore;
use crate::schema::StageId;

const BINS: usize = 256;

pub struct ClaheStage;

impl Stage for ClaheStage {
    fn id(&self) -> StageId {
        StageId::Clahe
    }

    fn apply(&self, img: &ImageF32, params: &ParameterStore) -> Result<ImageF32> {
        if !params.get_bool("clahe_enabled")? {
            return Ok(img.clone());
        }
        let clip_limit = params.get_f32("clahe_clip_limit")?;
        let grid_size = params.get_i32("clahe_tile_size")?.max(1) as u32;

        let (l, a, b) = image_to_lab(img);
        let l_eq = clahe_plane(&l, clip_limit, grid_size);
        Ok(lab_to_image(&l_eq, &a, &b))
    }
}

/// Run CLAHE on an arbitrary image with explicit parameters; used by the
/// fusion stage to build its contrast-enhanced variant without going
/// through the parameter store.
pub(crate) fn apply_to_image(img: &ImageF32, clip_limit: f32, grid_size: u32) -> ImageF32 {
    let (l, a, b) = image_to_lab(img);
    let l_eq = clahe_plane(&l, clip_limit, grid_size);
    lab_to_image(&l_eq, &a, &b)
}

fn clahe_plane(l: &Plane, clip_limit: f32, grid_size: u32) -> Plane {
    let w = l.width;
    let h = l.height;
    let grid_w = grid_size.min(w.max(1));
    let grid_h = grid_size.min(h.max(1));
    let tile_w = (w + grid_w - 1) / grid_w;
    let tile_h = (h + grid_h - 1) / grid_h;

    let mut mappings: Vec<Vec<[f32; BINS]>> = Vec::with_capacity(grid_h as usize);
    for ty in 0..grid_h {
        let mut row = Vec::with_capacity(grid_w as usize);
        for tx in 0..grid_w {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            row.push(tile_mapping(l, x0, y0, x1, y1, clip_limit));
        }
        mappings.push(row);
    }

    let tile_center = |tx: u32, ty: u32| -> (f32, f32) {
        (
            (tx as f32 + 0.5) * tile_w as f32,
            (ty as f32 + 0.5) * tile_h as f32,
        )
    };

    let mut out = Plane::new(w, h, 0.0);
    for y in 0..h {
        for x in 0..w {
            let l_val = l.get(x, y);
            let bin = ((l_val / 100.0 * 255.0).clamp(0.0, 255.0)) as usize;

            let tx = (x / tile_w).min(grid_w - 1);
            let ty = (y / tile_h).min(grid_h - 1);
            let (cx, cy) = tile_center(tx, ty);

            let tx2 = if (x as f32) < cx {
                tx.saturating_sub(1)
            } else {
                (tx + 1).min(grid_w - 1)
            };
            let ty2 = if (y as f32) < cy {
                ty.saturating_sub(1)
            } else {
                (ty + 1).min(grid_h - 1)
            };

            let (cx2, _) = tile_center(tx2, ty);
            let (_, cy2) = tile_center(tx, ty2);

            let wx = if cx2 != cx {
                ((x as f32 - cx) / (cx2 - cx)).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let wy = if cy2 != cy {
                ((y as f32 - cy) / (cy2 - cy)).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let m00 = mappings[ty as usize][tx as usize][bin];
            let m10 = mappings[ty as usize][tx2 as usize][bin];
            let m01 = mappings[ty2 as usize][tx as usize][bin];
            let m11 = mappings[ty2 as usize][tx2 as usize][bin];

            let top = m00 * (1.0 - wx) + m10 * wx;
            let bottom = m01 * (1.0 - wx) + m11 * wx;
            let mapped = top * (1.0 - wy) + bottom * wy;

            out.set(x, y, mapped / 255.0 * 100.0);
        }
    }
    out
}

/// Build the 256-entry clipped-histogram-equalization mapping for one
/// tile's pixel range.
fn tile_mapping(l: &Plane, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [f32; BINS] {
    let mut hist = [0u32; BINS];
    let mut count = 0u32;
    for y in y0..y1 {
        for x in x0..x1 {
            let bin = ((l.get(x, y) / 100.0 * 255.0).clamp(0.0, 255.0)) as usize;
            hist[bin] += 1;
            count += 1;
        }
    }
    if count == 0 {
        let mut identity = [0f32; BINS];
        for (i, v) in identity.iter_mut().enumerate() {
            *v = i as f32;
        }
        return identity;
    }

    let clip = ((clip_limit * count as f32 / BINS as f32).max(1.0)) as u32;
    let mut excess = 0u32;
    for h in hist.iter_mut() {
        if *h > clip {
            excess += *h - clip;
            *h = clip;
        }
    }
    let redistribute = excess / BINS as u32;
    let remainder = excess % BINS as u32;
    for (i, h) in hist.iter_mut().enumerate() {
        *h += redistribute;
        if (i as u32) < remainder {
            *h += 1;
        }
    }

    let mut cdf = [0f32; BINS];
    let mut running = 0u32;
    for (i, &h) in hist.iter().enumerate() {
        running += h;
        cdf[i] = running as f32;
    }
    let scale = 255.0 / count as f32;
    for v in cdf.iter_mut() {
        *v *= scale;
    }
    cdf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;
    use crate::params::Value;

    #[test]
    fn disabled_stage_is_identity() {
        let img = Image::filled(16, 16, [70, 90, 110]).to_f32();
        let mut store = ParameterStore::with_defaults();
        store.set("clahe_enabled", Value::Bool(false)).unwrap();
        let stage = ClaheStage;
        let out = stage.apply(&img, &store).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn flat_tile_mapping_is_monotonic() {
        let l = Plane::new(32, 32, 50.0);
        let mapping = tile_mapping(&l, 0, 0, 32, 32, 2.0);
        for i in 1..BINS {
            assert!(mapping[i] >= mapping[i - 1] - 1e-3);
        }
    }

    #[test]
    fn equalized_output_stays_in_lab_l_range() {
        let img = Image::filled(24, 24, [10, 200, 40]).to_f32();
        let store = ParameterStore::with_defaults();
        let stage = ClaheStage;
        let out = stage.apply(&img, &store).unwrap();
        for v in out.r.data.iter().chain(out.g.data.iter()).chain(out.b.data.iter()) {
            assert!((0.0..=1.0).contains(v));
        }
    }
}
