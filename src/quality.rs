//! Quality analyzer (C6): scores an `(original, processed)` pair across
//! six independent metric families and turns the scores into symbolic
//! recommendations. Never touches the parameter store or the pipeline
//! engine — pure function of two images.

use crate::color::rgb_to_hsv;
use crate::filters::sobel;
use crate::image_buffer::{safe_div, ImageF32, Plane};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub action: String,
    pub delta: f32,
}

impl Recommendation {
    fn new(action: &str, delta: f32) -> Self {
        Recommendation {
            action: action.to_string(),
            delta,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Family {
    pub metrics: BTreeMap<String, f32>,
    pub score: f32,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub families: BTreeMap<String, Family>,
    pub overall: f32,
}

const WEIGHTS: [(&str, f32); 6] = [
    ("unrealistic_colors", 0.25),
    ("saturation_analysis", 0.20),
    ("color_noise_analysis", 0.15),
    ("halo_artifacts", 0.15),
    ("midtone_balance", 0.15),
    ("quality_improvements", 0.10),
];

pub fn analyze_quality(original: &ImageF32, processed: &ImageF32) -> QualityReport {
    let mut families = BTreeMap::new();
    families.insert("unrealistic_colors".to_string(), unrealistic_colors(processed));
    families.insert("saturation_analysis".to_string(), saturation_analysis(processed));
    families.insert(
        "color_noise_analysis".to_string(),
        color_noise_analysis(original, processed),
    );
    families.insert("halo_artifacts".to_string(), halo_artifacts(processed));
    families.insert("midtone_balance".to_string(), midtone_balance(processed));
    families.insert(
        "quality_improvements".to_string(),
        quality_improvements(original, processed),
    );

    let overall = WEIGHTS
        .iter()
        .map(|(name, w)| w * families[*name].score)
        .sum();

    QualityReport { families, overall }
}

fn unrealistic_colors(img: &ImageF32) -> Family {
    let w = img.width;
    let h = img.height;
    let n = (w * h).max(1) as f32;

    let mut extreme_red_count = 0f32;
    let mut magenta_count = 0f32;
    for y in 0..h {
        for x in 0..w {
            let [r, g, b] = img.pixel(x, y);
            if r > 0.95 && g < 0.3 && b < 0.3 {
                extreme_red_count += 1.0;
            }
            if r > 0.7 && b > 0.6 && g < 0.4 {
                magenta_count += 1.0;
            }
        }
    }
    let extreme_red = extreme_red_count / n;
    let magenta = magenta_count / n;
    let dom = safe_div(img.r.mean(), img.b.mean());

    let score = (10.0 - 20.0 * extreme_red - 15.0 * magenta - 5.0 * (dom - 1.5).max(0.0))
        .clamp(0.0, 10.0);

    let mut metrics = BTreeMap::new();
    metrics.insert("extreme_red".to_string(), extreme_red);
    metrics.insert("magenta".to_string(), magenta);
    metrics.insert("dominance_ratio".to_string(), dom);

    let mut recommendations = Vec::new();
    if extreme_red > 0.02 {
        recommendations.push(Recommendation::new("reduce_beer_lambert_red", -0.2));
    }

    Family {
        metrics,
        score,
        recommendations,
    }
}

fn saturation_analysis(img: &ImageF32) -> Family {
    let w = img.width;
    let h = img.height;
    let n = (w * h).max(1) as f32;

    let mut sat = Plane::new(w, h, 0.0);
    let mut highly_sat_count = 0f32;
    let mut clipped_count = 0f32;
    let mut s_sum = 0f32;
    for y in 0..h {
        for x in 0..w {
            let [r, g, b] = img.pixel(x, y);
            let (_, s, _) = rgb_to_hsv(r, g, b);
            sat.set(x, y, s);
            s_sum += s;
            if s > 0.9 {
                highly_sat_count += 1.0;
            }
            if s >= 0.999 {
                clipped_count += 1.0;
            }
        }
    }
    let highly_sat = highly_sat_count / n;
    let clipped = clipped_count / n;
    let mean_s = s_sum / n;
    let mask = sat.map(|v| if v > 0.85 { 1.0 } else { 0.0 });
    let large_patches = safe_div(largest_connected_component(&mask) as f32, n);

    let score = (10.0 - 10.0 * highly_sat - 15.0 * clipped - 10.0 * large_patches).clamp(0.0, 10.0);

    let mut metrics = BTreeMap::new();
    metrics.insert("highly_saturated_fraction".to_string(), highly_sat);
    metrics.insert("clipped_fraction".to_string(), clipped);
    metrics.insert("large_patch_fraction".to_string(), large_patches);
    metrics.insert("mean_saturation".to_string(), mean_s);

    let mut recommendations = Vec::new();
    if clipped > 0.02 {
        recommendations.push(Recommendation::new("reduce_saturation_limit", -0.2));
    }

    Family {
        metrics,
        score,
        recommendations,
    }
}

/// Flood-fill over a binary mask, returning the size of the largest
/// 4-connected component.
fn largest_connected_component(mask: &Plane) -> usize {
    let w = mask.width as usize;
    let h = mask.height as usize;
    let mut visited = vec![false; w * h];
    let mut best = 0usize;
    let mut stack = Vec::new();

    for start in 0..(w * h) {
        if visited[start] || mask.data[start] <= 0.5 {
            continue;
        }
        let mut size = 0usize;
        stack.clear();
        stack.push(start);
        visited[start] = true;
        while let Some(idx) = stack.pop() {
            size += 1;
            let x = idx % w;
            let y = idx / w;
            let neighbors = [
                (x.checked_sub(1), Some(y)),
                (Some(x + 1).filter(|&v| v < w), Some(y)),
                (Some(x), y.checked_sub(1)),
                (Some(x), Some(y + 1).filter(|&v| v < h)),
            ];
            for (nx, ny) in neighbors {
                if let (Some(nx), Some(ny)) = (nx, ny) {
                    let nidx = ny * w + nx;
                    if !visited[nidx] && mask.data[nidx] > 0.5 {
                        visited[nidx] = true;
                        stack.push(nidx);
                    }
                }
            }
        }
        best = best.max(size);
    }
    best
}

/// High-pass proxy: subtract a heavily blurred copy from the plane,
/// isolating the texture/noise band.
fn high_pass(plane: &Plane) -> Plane {
    let smoothed = crate::filters::gaussian_blur(plane, 3.0);
    plane.zip_map(&smoothed, |v, s| v - s)
}

fn color_noise_analysis(original: &ImageF32, processed: &ImageF32) -> Family {
    let ratio = |o: &Plane, p: &Plane| -> f32 {
        let o_std = high_pass(o).std_dev();
        let p_std = high_pass(p).std_dev();
        safe_div(p_std, o_std.max(1e-4))
    };
    let red_noise_ratio = ratio(&original.r, &processed.r);
    let green_noise_ratio = ratio(&original.g, &processed.g);
    let blue_noise_ratio = ratio(&original.b, &processed.b);
    let mean_noise = (red_noise_ratio + green_noise_ratio + blue_noise_ratio) / 3.0;

    let score = (10.0 - 10.0 * red_noise_ratio - 5.0 * (mean_noise - 1.2).max(0.0)).clamp(0.0, 10.0);

    let mut metrics = BTreeMap::new();
    metrics.insert("red_noise_ratio".to_string(), red_noise_ratio);
    metrics.insert("green_noise_ratio".to_string(), green_noise_ratio);
    metrics.insert("blue_noise_ratio".to_string(), blue_noise_ratio);
    metrics.insert("mean_noise_ratio".to_string(), mean_noise);

    Family {
        metrics,
        score,
        recommendations: Vec::new(),
    }
}

/// Cheap edge mask: gradient magnitude above its own 90th percentile.
fn edge_mask(luma: &Plane) -> (Plane, Plane) {
    let (gx, gy) = sobel(luma);
    let magnitude = gx.zip_map(&gy, |x, y| (x * x + y * y).sqrt());
    let threshold = magnitude.percentile(90.0);
    let mask = magnitude.map(|v| if v > threshold { 1.0 } else { 0.0 });
    (mask, magnitude)
}

fn dilate3(mask: &Plane) -> Plane {
    crate::filters::erode_rect(&mask.map(|v| 1.0 - v), 3).map(|v| 1.0 - v)
}

fn halo_artifacts(img: &ImageF32) -> Family {
    let luma = img.luma();
    let (edges, magnitude) = edge_mask(&luma);
    let dilated = dilate3(&edges);

    let mut edge_vals = Vec::new();
    let mut edge_grad_sum = 0f32;
    let mut edge_count = 0f32;
    let mut dilated_only_grad_sum = 0f32;
    let mut dilated_only_count = 0f32;

    for i in 0..edges.data.len() {
        if edges.data[i] > 0.5 {
            edge_vals.push(luma.data[i]);
            edge_grad_sum += magnitude.data[i];
            edge_count += 1.0;
        } else if dilated.data[i] > 0.5 {
            dilated_only_grad_sum += magnitude.data[i];
            dilated_only_count += 1.0;
        }
    }

    let edge_mean = if edge_vals.is_empty() {
        0.0
    } else {
        edge_vals.iter().sum::<f32>() / edge_vals.len() as f32
    };
    let edge_var = if edge_vals.is_empty() {
        0.0
    } else {
        edge_vals.iter().map(|v| (v - edge_mean).powi(2)).sum::<f32>() / edge_vals.len() as f32
    };

    let mean_edge_grad = safe_div(edge_grad_sum, edge_count.max(1.0));
    let mean_dilated_grad = safe_div(dilated_only_grad_sum, dilated_only_count.max(1.0));
    let halo_indicator = safe_div(mean_dilated_grad, mean_edge_grad.max(1e-4));

    let score = (10.0 - 15.0 * halo_indicator - 5.0 * edge_var).clamp(0.0, 10.0);

    let mut metrics = BTreeMap::new();
    metrics.insert("edge_intensity_variance".to_string(), edge_var);
    metrics.insert("halo_indicator".to_string(), halo_indicator);

    let mut recommendations = Vec::new();
    if halo_indicator > 0.15 {
        recommendations.push(Recommendation::new("reduce_clahe_clip_limit", -1.5));
    }

    Family {
        metrics,
        score,
        recommendations,
    }
}

fn histogram_entropy(values: &[f32], bins: usize) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut counts = vec![0u32; bins];
    for &v in values {
        let idx = ((v.clamp(0.0, 1.0) * (bins - 1) as f32).round()) as usize;
        counts[idx.min(bins - 1)] += 1;
    }
    let n = values.len() as f32;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f32 / n;
            -p * p.log2()
        })
        .sum()
}

fn midtone_balance(img: &ImageF32) -> Family {
    let luma = img.luma();
    let n = luma.data.len().max(1) as f32;

    let midtone_fraction = luma.data.iter().filter(|&&v| (0.2..=0.8).contains(&v)).count() as f32 / n;
    let shadow_fraction = luma.data.iter().filter(|&&v| v < 0.1).count() as f32 / n;
    let highlight_fraction = luma.data.iter().filter(|&&v| v > 0.9).count() as f32 / n;
    let mean_l = luma.mean();

    let shadow_values: Vec<f32> = luma.data.iter().copied().filter(|&v| v < 0.2).collect();
    let shadow_entropy = histogram_entropy(&shadow_values, 32);
    let shadow_ok = shadow_entropy > 2.0;

    let score = ((if shadow_ok { 8.0 } else { 4.0 }) + (5.0 * midtone_fraction).min(2.0)).clamp(0.0, 10.0);

    let mut metrics = BTreeMap::new();
    metrics.insert("midtone_fraction".to_string(), midtone_fraction);
    metrics.insert("shadow_fraction".to_string(), shadow_fraction);
    metrics.insert("highlight_fraction".to_string(), highlight_fraction);
    metrics.insert("mean_luma".to_string(), mean_l);
    metrics.insert("shadow_entropy".to_string(), shadow_entropy);
    metrics.insert("shadow_ok".to_string(), if shadow_ok { 1.0 } else { 0.0 });

    Family {
        metrics,
        score,
        recommendations: Vec::new(),
    }
}

fn quality_improvements(original: &ImageF32, processed: &ImageF32) -> Family {
    let contrast_before = original.luma().std_dev();
    let contrast_after = processed.luma().std_dev();
    let delta_contrast = safe_div(contrast_after - contrast_before, contrast_before.max(1e-4));

    let entropy_before = histogram_entropy(&original.luma().data, 256);
    let entropy_after = histogram_entropy(&processed.luma().data, 256);
    let delta_entropy = safe_div(entropy_after - entropy_before, entropy_before.max(1e-4));

    let mean_sat = |img: &ImageF32| -> f32 {
        let w = img.width;
        let h = img.height;
        let n = (w * h).max(1) as f32;
        let mut sum = 0f32;
        for y in 0..h {
            for x in 0..w {
                let [r, g, b] = img.pixel(x, y);
                sum += rgb_to_hsv(r, g, b).1;
            }
        }
        sum / n
    };
    let sat_before = mean_sat(original);
    let sat_after = mean_sat(processed);
    let delta_sat = safe_div(sat_after - sat_before, sat_before.max(1e-4));

    let score = (2.0 * (delta_contrast + delta_entropy + delta_sat)).clamp(0.0, 10.0);

    let mut metrics = BTreeMap::new();
    metrics.insert("delta_contrast".to_string(), delta_contrast);
    metrics.insert("delta_entropy".to_string(), delta_entropy);
    metrics.insert("delta_saturation".to_string(), delta_sat);

    Family {
        metrics,
        score,
        recommendations: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    fn checkerboard(w: u32, h: u32) -> ImageF32 {
        let mut data = Vec::with_capacity(w as usize * h as usize * 3);
        for y in 0..h {
            for x in 0..w {
                if (x + y) % 2 == 0 {
                    data.extend_from_slice(&[40, 90, 140]);
                } else {
                    data.extend_from_slice(&[90, 140, 40]);
                }
            }
        }
        Image::new(w, h, data).unwrap().to_f32()
    }

    #[test]
    fn identical_images_score_higher_than_noise() {
        let img = checkerboard(32, 32);
        let noise = Image::new(
            32,
            32,
            (0..32 * 32 * 3).map(|i| ((i * 37 + 11) % 256) as u8).collect(),
        )
        .unwrap()
        .to_f32();
        let self_report = analyze_quality(&img, &img);
        let noise_report = analyze_quality(&img, &noise);
        assert!(self_report.overall > noise_report.overall);
    }

    #[test]
    fn overall_and_family_scores_stay_in_range() {
        let img = checkerboard(24, 24);
        let report = analyze_quality(&img, &img);
        assert!((0.0..=10.0).contains(&report.overall));
        for family in report.families.values() {
            assert!((0.0..=10.0).contains(&family.score), "{}", family.score);
        }
    }

    #[test]
    fn uniform_image_has_no_recommendations() {
        let img = Image::filled(16, 16, [120, 120, 120]).to_f32();
        let report = analyze_quality(&img, &img);
        let total: usize = report
            .families
            .values()
            .map(|f| f.recommendations.len())
            .sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn extreme_red_cast_triggers_recommendation() {
        let img = Image::filled(16, 16, [250, 5, 5]).to_f32();
        let report = analyze_quality(&img, &img);
        let family = &report.families["unrealistic_colors"];
        assert!(!family.recommendations.is_empty());
    }
}
