//! C1 — color-space conversions: RGB↔LAB (CIE L*a*b*, D65, the OpenCV
//! convention so CLAHE can equalize the L channel) and RGB↔HSV.
//!
//! Every function here operates on a single pixel in `[0, 1]` RGB; the
//! per-image helpers at the bottom thread these over a full [`ImageF32`].

use crate::image_buffer::{ImageF32, Plane};

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA.powi(3) {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA {
        t.powi(3)
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

// D65 reference white, CIE 1931 2-degree observer.
const XN: f32 = 0.95047;
const YN: f32 = 1.0;
const ZN: f32 = 1.08883;

pub fn rgb_to_lab(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let (rl, gl, bl) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));

    let x = 0.4124564 * rl + 0.3575761 * gl + 0.1804375 * bl;
    let y = 0.2126729 * rl + 0.7151522 * gl + 0.0721750 * bl;
    let z = 0.0193339 * rl + 0.1191920 * gl + 0.9503041 * bl;

    let fx = lab_f(x / XN);
    let fy = lab_f(y / YN);
    let fz = lab_f(z / ZN);

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let bb = 200.0 * (fy - fz);
    (l, a, bb)
}

pub fn lab_to_rgb(l: f32, a: f32, b: f32) -> (f32, f32, f32) {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = XN * lab_f_inv(fx);
    let y = YN * lab_f_inv(fy);
    let z = ZN * lab_f_inv(fz);

    let rl = 3.2404542 * x - 1.5371385 * y - 0.4985314 * z;
    let gl = -0.9692660 * x + 1.8760108 * y + 0.0415560 * z;
    let bl = 0.0556434 * x - 0.2040259 * y + 1.0572252 * z;

    (
        linear_to_srgb(rl).clamp(0.0, 1.0),
        linear_to_srgb(gl).clamp(0.0, 1.0),
        linear_to_srgb(bl).clamp(0.0, 1.0),
    )
}

/// Hue in `[0, 360)`, saturation and value in `[0, 1]`.
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta < 1e-6 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let s = if max < 1e-6 { 0.0 } else { delta / max };
    (h, s, max)
}

pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r1, g1, b1) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    (r1 + m, g1 + m, b1 + m)
}

/// Convert a full image to three LAB planes (L in `[0, 100]`).
pub fn image_to_lab(img: &ImageF32) -> (Plane, Plane, Plane) {
    let w = img.width;
    let h = img.height;
    let mut l = Plane::new(w, h, 0.0);
    let mut a = Plane::new(w, h, 0.0);
    let mut b = Plane::new(w, h, 0.0);
    for y in 0..h {
        for x in 0..w {
            let [r, g, bl] = img.pixel(x, y);
            let (ll, aa, bb) = rgb_to_lab(r, g, bl);
            l.set(x, y, ll);
            a.set(x, y, aa);
            b.set(x, y, bb);
        }
    }
    (l, a, b)
}

pub fn lab_to_image(l: &Plane, a: &Plane, b: &Plane) -> ImageF32 {
    let w = l.width;
    let h = l.height;
    let mut out = ImageF32::new(w, h, [0.0, 0.0, 0.0]);
    for y in 0..h {
        for x in 0..w {
            let (r, g, bl) = lab_to_rgb(l.get(x, y), a.get(x, y), b.get(x, y));
            out.r.set(x, y, r);
            out.g.set(x, y, g);
            out.b.set(x, y, bl);
        }
    }
    out
}

pub fn image_to_hsv(img: &ImageF32) -> (Plane, Plane, Plane) {
    let w = img.width;
    let h = img.height;
    let mut hh = Plane::new(w, h, 0.0);
    let mut ss = Plane::new(w, h, 0.0);
    let mut vv = Plane::new(w, h, 0.0);
    for y in 0..h {
        for x in 0..w {
            let [r, g, b] = img.pixel(x, y);
            let (hv, sv, val) = rgb_to_hsv(r, g, b);
            hh.set(x, y, hv);
            ss.set(x, y, sv);
            vv.set(x, y, val);
        }
    }
    (hh, ss, vv)
}

pub fn hsv_to_image(h: &Plane, s: &Plane, v: &Plane) -> ImageF32 {
    let w = h.width;
    let ht = h.height;
    let mut out = ImageF32::new(w, ht, [0.0, 0.0, 0.0]);
    for y in 0..ht {
        for x in 0..w {
            let (r, g, b) = hsv_to_rgb(h.get(x, y), s.get(x, y), v.get(x, y));
            out.r.set(x, y, r);
            out.g.set(x, y, g);
            out.b.set(x, y, b);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lab_round_trip_is_close() {
        for &(r, g, b) in &[(0.2, 0.5, 0.8), (1.0, 0.0, 0.0), (0.1, 0.1, 0.1)] {
            let (l, a, bb) = rgb_to_lab(r, g, b);
            let (r2, g2, b2) = lab_to_rgb(l, a, bb);
            assert!((r - r2).abs() < 1e-3, "{r} vs {r2}");
            assert!((g - g2).abs() < 1e-3, "{g} vs {g2}");
            assert!((b - b2).abs() < 1e-3, "{b} vs {b2}");
        }
    }

    #[test]
    fn hsv_round_trip_is_close() {
        for &(r, g, b) in &[(0.2, 0.5, 0.8), (1.0, 0.0, 0.0), (0.3, 0.3, 0.3)] {
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let (r2, g2, b2) = hsv_to_rgb(h, s, v);
            assert!((r - r2).abs() < 1e-4);
            assert!((g - g2).abs() < 1e-4);
            assert!((b - b2).abs() < 1e-4);
        }
    }

    #[test]
    fn gray_has_zero_saturation() {
        let (_, s, _) = rgb_to_hsv(0.5, 0.5, 0.5);
        assert!(s.abs() < 1e-6);
    }
}
