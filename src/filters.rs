//! C1 — separable filters: box blur, Gaussian blur, rectangular erosion,
//! Sobel gradients, and Laplacian-of-Gaussian. All operate on a single
//! [`Plane`] and are implemented as two 1-D passes (row then column),
//! which keeps every one of them `O(w*h*k)` instead of `O(w*h*k^2)`.

use crate::image_buffer::Plane;
use rayon::prelude::*;

/// Horizontal then vertical box filter with the same odd window side
/// `2*radius + 1` in both directions.
pub fn box_filter(plane: &Plane, radius: u32) -> Plane {
    let h = box_filter_horizontal(plane, radius);
    box_filter_vertical(&h, radius)
}

fn box_filter_horizontal(plane: &Plane, radius: u32) -> Plane {
    let w = plane.width as i64;
    let h = plane.height as i64;
    let r = radius as i64;
    let mut out = Plane::new(plane.width, plane.height, 0.0);
    out.data
        .par_chunks_mut(plane.width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let mut acc = 0f32;
            for dx in -r..=r {
                acc += plane.get_signed(dx, y as i64);
            }
            row[0] = acc / (2 * r + 1) as f32;
            for x in 1..w {
                acc -= plane.get_signed(x - r - 1, y as i64);
                acc += plane.get_signed(x + r, y as i64);
                row[x as usize] = acc / (2 * r + 1) as f32;
            }
        });
    let _ = h;
    out
}

fn box_filter_vertical(plane: &Plane, radius: u32) -> Plane {
    let w = plane.width as i64;
    let h = plane.height as i64;
    let r = radius as i64;
    let mut out = Plane::new(plane.width, plane.height, 0.0);
    for x in 0..w {
        let mut acc = 0f32;
        for dy in -r..=r {
            acc += plane.get_signed(x, dy);
        }
        out.set(x as u32, 0, acc / (2 * r + 1) as f32);
        for y in 1..h {
            acc -= plane.get_signed(x, y - r - 1);
            acc += plane.get_signed(x, y + r);
            out.set(x as u32, y as u32, acc / (2 * r + 1) as f32);
        }
    }
    out
}

/// Gaussian blur via a separable 1-D kernel with radius `ceil(3*sigma)`.
/// `sigma <= 0` is a no-op copy.
pub fn gaussian_blur(plane: &Plane, sigma: f32) -> Plane {
    if sigma <= 0.0 {
        return plane.clone();
    }
    let radius = (3.0 * sigma).ceil().max(1.0) as i64;
    let mut kernel = Vec::with_capacity((2 * radius + 1) as usize);
    let mut sum = 0f32;
    for i in -radius..=radius {
        let v = (-((i * i) as f32) / (2.0 * sigma * sigma)).exp();
        kernel.push(v);
        sum += v;
    }
    for v in &mut kernel {
        *v /= sum;
    }
    let h = convolve_horizontal(plane, &kernel, radius);
    convolve_vertical(&h, &kernel, radius)
}

fn convolve_horizontal(plane: &Plane, kernel: &[f32], radius: i64) -> Plane {
    let w = plane.width as i64;
    let mut out = Plane::new(plane.width, plane.height, 0.0);
    out.data
        .par_chunks_mut(plane.width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w {
                let mut acc = 0f32;
                for (k, &coeff) in kernel.iter().enumerate() {
                    let dx = k as i64 - radius;
                    acc += coeff * plane.get_signed(x + dx, y as i64);
                }
                row[x as usize] = acc;
            }
        });
    out
}

fn convolve_vertical(plane: &Plane, kernel: &[f32], radius: i64) -> Plane {
    let w = plane.width as i64;
    let h = plane.height as i64;
    let mut out = Plane::new(plane.width, plane.height, 0.0);
    for x in 0..w {
        for y in 0..h {
            let mut acc = 0f32;
            for (k, &coeff) in kernel.iter().enumerate() {
                let dy = k as i64 - radius;
                acc += coeff * plane.get_signed(x, y + dy);
            }
            out.set(x as u32, y as u32, acc);
        }
    }
    out
}

/// Grayscale morphological erosion with a `w x w` rectangular
/// structuring element (`w` odd), via separable row-min / column-min.
pub fn erode_rect(plane: &Plane, window_size: u32) -> Plane {
    let radius = (window_size / 2) as i64;
    let row_min = min_filter_horizontal(plane, radius);
    min_filter_vertical(&row_min, radius)
}

fn min_filter_horizontal(plane: &Plane, radius: i64) -> Plane {
    let w = plane.width as i64;
    let mut out = Plane::new(plane.width, plane.height, 0.0);
    for y in 0..plane.height as i64 {
        for x in 0..w {
            let mut m = f32::INFINITY;
            for dx in -radius..=radius {
                m = m.min(plane.get_signed(x + dx, y));
            }
            out.set(x as u32, y as u32, m);
        }
    }
    out
}

fn min_filter_vertical(plane: &Plane, radius: i64) -> Plane {
    let h = plane.height as i64;
    let mut out = Plane::new(plane.width, plane.height, 0.0);
    for x in 0..plane.width as i64 {
        for y in 0..h {
            let mut m = f32::INFINITY;
            for dy in -radius..=radius {
                m = m.min(plane.get_signed(x, y + dy));
            }
            out.set(x as u32, y as u32, m);
        }
    }
    out
}

/// 3-tap Sobel gradients, returned as `(gx, gy)`.
pub fn sobel(plane: &Plane) -> (Plane, Plane) {
    let w = plane.width as i64;
    let h = plane.height as i64;
    let mut gx = Plane::new(plane.width, plane.height, 0.0);
    let mut gy = Plane::new(plane.width, plane.height, 0.0);
    for y in 0..h {
        for x in 0..w {
            let p = |dx: i64, dy: i64| plane.get_signed(x + dx, y + dy);
            let sx = -p(-1, -1) + p(1, -1) - 2.0 * p(-1, 0) + 2.0 * p(1, 0) - p(-1, 1) + p(1, 1);
            let sy = -p(-1, -1) - 2.0 * p(0, -1) - p(1, -1) + p(-1, 1) + 2.0 * p(0, 1) + p(1, 1);
            gx.set(x as u32, y as u32, sx);
            gy.set(x as u32, y as u32, sy);
        }
    }
    (gx, gy)
}

/// Gradient magnitude `|gx| + |gy|`, the convention the grey-edge white
/// balance variant uses.
pub fn gradient_magnitude_l1(plane: &Plane) -> Plane {
    let w = plane.width as i64;
    let h = plane.height as i64;
    let mut out = Plane::new(plane.width, plane.height, 0.0);
    for y in 0..h {
        for x in 0..w {
            let dx = (plane.get_signed(x + 1, y) - plane.get_signed(x - 1, y)).abs() / 2.0;
            let dy = (plane.get_signed(x, y + 1) - plane.get_signed(x, y - 1)).abs() / 2.0;
            out.set(x as u32, y as u32, dx + dy);
        }
    }
    out
}

/// Discrete Laplacian (4-neighbor stencil).
pub fn laplacian(plane: &Plane) -> Plane {
    let w = plane.width as i64;
    let h = plane.height as i64;
    let mut out = Plane::new(plane.width, plane.height, 0.0);
    for y in 0..h {
        for x in 0..w {
            let center = plane.get_signed(x, y);
            let sum = plane.get_signed(x - 1, y)
                + plane.get_signed(x + 1, y)
                + plane.get_signed(x, y - 1)
                + plane.get_signed(x, y + 1);
            out.set(x as u32, y as u32, sum - 4.0 * center);
        }
    }
    out
}

/// Laplacian of Gaussian: Gaussian-smooth at `sigma` then take the
/// discrete Laplacian.
pub fn laplacian_of_gaussian(plane: &Plane, sigma: f32) -> Plane {
    laplacian(&gaussian_blur(plane, sigma))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_filter_on_uniform_plane_is_identity() {
        let plane = Plane::new(10, 10, 0.5);
        let out = box_filter(&plane, 2);
        for v in &out.data {
            assert!((v - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn gaussian_blur_zero_sigma_is_identity() {
        let mut plane = Plane::new(4, 4, 0.0);
        plane.set(1, 1, 1.0);
        let out = gaussian_blur(&plane, 0.0);
        assert_eq!(plane, out);
    }

    #[test]
    fn erode_rect_reduces_isolated_spike() {
        let mut plane = Plane::new(7, 7, 0.0);
        plane.set(3, 3, 1.0);
        let out = erode_rect(&plane, 3);
        assert_eq!(out.get(3, 3), 0.0);
    }

    #[test]
    fn laplacian_of_uniform_is_zero() {
        let plane = Plane::new(8, 8, 0.3);
        let out = laplacian(&plane);
        for v in &out.data {
            assert!(v.abs() < 1e-5);
        }
    }
}
