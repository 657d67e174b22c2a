//! C2 — preview downsampling. The UI/CLI can run the pipeline on a
//! downsized proxy for interactive tuning, then re-run at full resolution
//! once parameters are settled. `downsample` reports the scale factor
//! applied so callers can decide whether to upscale results back.

use crate::image_buffer::Image;
use image::{imageops::FilterType, ImageBuffer, Rgb};

/// Downsample so the longer side is at most `max_side`, preserving aspect
/// ratio. Returns the resized image and the scale factor applied
/// (`1.0` if no resize was necessary).
pub fn downsample(img: &Image, max_side: u32) -> (Image, f32) {
    let longest = img.width.max(img.height);
    if longest <= max_side || max_side == 0 {
        return (img.clone(), 1.0);
    }
    let scale = max_side as f32 / longest as f32;
    let new_w = ((img.width as f32 * scale).round() as u32).max(1);
    let new_h = ((img.height as f32 * scale).round() as u32).max(1);

    let buf: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(img.width, img.height, img.data.clone())
            .expect("Image invariant guarantees width*height*3 == data.len()");
    let resized = image::imageops::resize(&buf, new_w, new_h, FilterType::Triangle);

    (
        Image {
            width: new_w,
            height: new_h,
            data: resized.into_raw(),
        },
        scale,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsample_preserves_aspect_ratio() {
        let img = Image::filled(800, 400, [10, 20, 30]);
        let (out, scale) = downsample(&img, 400);
        assert_eq!(out.width, 400);
        assert_eq!(out.height, 200);
        assert!((scale - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downsample_is_noop_when_already_small() {
        let img = Image::filled(100, 50, [1, 2, 3]);
        let (out, scale) = downsample(&img, 400);
        assert_eq!(out.width, 100);
        assert_eq!(out.height, 50);
        assert_eq!(scale, 1.0);
    }
}
