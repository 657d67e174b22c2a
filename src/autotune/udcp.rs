//! UDCP auto-tuning: derive omega/t0/window size from the haze density
//! implied by the original image's dark channel.

use crate::filters::{laplacian, sobel};
use crate::image_buffer::{safe_div, ImageF32};
use crate::params::Value;
use crate::stages::udcp::dark_channel;

pub fn standard(original: &ImageF32) -> Result<Vec<(&'static str, Value)>, String> {
    let dark = dark_channel(original, 11);
    let haze_density = dark.mean();

    // Denser haze (a brighter dark channel) needs stronger removal and a
    // higher transmission floor to avoid over-darkening the recovered
    // scene.
    let omega = (0.8 + haze_density * 0.2).clamp(0.7, 0.98);
    let t0 = (0.05 + haze_density * 0.15).clamp(0.05, 0.3);

    let longest_side = original.width.max(original.height);
    let window_size = if longest_side > 2000 {
        15
    } else if longest_side > 800 {
        11
    } else {
        7
    };

    Ok(vec![
        ("udcp_omega", Value::Float(omega)),
        ("udcp_t0", Value::Float(t0)),
        ("udcp_window_size", Value::Int(window_size)),
    ])
}

/// Enhanced estimator: dark-channel mean, Sobel-gradient mean, blue/red
/// mean ratio, and Laplacian variance (a noise proxy) drive `omega`,
/// `t0`, `window`, and `guided_eps` directly, plus a guided-filter radius
/// scaled with image size (Kaiming He et al., "Guided Image Filtering"
/// recommends a radius proportional to the feature scale being
/// preserved).
pub fn enhanced(original: &ImageF32) -> Result<Vec<(&'static str, Value)>, String> {
    let luma = original.luma();
    let dark_mean = dark_channel(original, 11).mean();

    let (gx, gy) = sobel(&luma);
    let grad_mean = gx.zip_map(&gy, |x, y| (x * x + y * y).sqrt()).mean();

    let blue_red_ratio = safe_div(original.b.mean(), original.r.mean());
    let noise_proxy = laplacian(&luma).std_dev().powi(2);

    let omega = if blue_red_ratio > 1.4 {
        (0.85f32 + 0.10).min(0.95)
    } else if blue_red_ratio < 0.8 {
        (0.85f32 - 0.15).max(0.70)
    } else {
        0.85
    };

    // depth_proxy: denser haze (brighter dark channel) pushes t0 up when
    // the cast reads blue-heavy (genuinely deeper water), down when it
    // reads red-heavy (shallow, turbid water needs a lower floor).
    let depth_proxy = (dark_mean - 0.5) * 0.3;
    let signed_depth = if blue_red_ratio >= 1.0 { depth_proxy } else { -depth_proxy };
    let t0 = (0.15 + signed_depth).clamp(0.08, 0.25);

    let longest_side = original.width.max(original.height) as f32;
    let base_window = longest_side / 40.0;
    let gradient_scale = (1.5 - grad_mean).clamp(0.5, 1.5);
    let window = (base_window * gradient_scale).clamp(9.0, 25.0).round() as i32;

    let guided_radius = (longest_side * 0.03).clamp(20.0, 120.0) as i32;
    let guided_eps = (0.0001 + noise_proxy * 0.05).clamp(0.0001, 0.01);

    Ok(vec![
        ("udcp_omega", Value::Float(omega)),
        ("udcp_t0", Value::Float(t0)),
        ("udcp_window_size", Value::Int(window)),
        ("udcp_guided_radius", Value::Int(guided_radius)),
        ("udcp_guided_eps", Value::Float(guided_eps)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn dense_haze_increases_omega() {
        let clear = Image::filled(8, 8, [10, 20, 30]).to_f32();
        let hazy = Image::filled(8, 8, [200, 210, 220]).to_f32();
        let clear_overrides = standard(&clear).unwrap();
        let hazy_overrides = standard(&hazy).unwrap();
        let get = |ov: &[(&str, Value)]| {
            ov.iter()
                .find(|(k, _)| *k == "udcp_omega")
                .unwrap()
                .1
                .as_f32()
                .unwrap()
        };
        assert!(get(&hazy_overrides) >= get(&clear_overrides));
    }

    #[test]
    fn large_image_picks_larger_window() {
        let img = Image::filled(3000, 2000, [50, 60, 70]).to_f32();
        let overrides = standard(&img).unwrap();
        let window = overrides
            .iter()
            .find(|(k, _)| *k == "udcp_window_size")
            .unwrap()
            .1
            .as_i32()
            .unwrap();
        assert_eq!(window, 15);
    }
}
