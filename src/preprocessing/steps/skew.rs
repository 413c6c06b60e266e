use crate::config::SkewConfig;
use crate::error::OcrError;
use image::{GrayImage, Luma};
use imageproc::edges::canny;

/// A straight line in polar form: `distance = x·cos(θ) + y·sin(θ)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineCandidate {
    /// Signed distance from the image origin, in pixels
    pub distance: f64,
    /// Angle of the line normal, in degrees within [0, 180)
    pub angle_deg: f64,
    pub votes: u32,
}

/// Outcome of skew estimation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewEstimate {
    /// Positive when text descends to the right
    pub angle_deg: f64,
    pub candidates: usize,
    /// Non-zero pixels in the edge map the candidates were voted from
    pub edge_pixels: usize,
}

/// Detect skew and rotate the image upright on an expanded canvas
pub fn apply(
    image: &GrayImage,
    config: &SkewConfig,
) -> Result<(GrayImage, SkewEstimate), OcrError> {
    super::ensure_not_empty(image.width(), image.height())?;

    let estimate = estimate_skew(image, config);
    if estimate.angle_deg == 0.0 {
        return Ok((image.clone(), estimate));
    }

    Ok((rotate(image, -estimate.angle_deg), estimate))
}

/// Estimate skew from the median angle of accumulator line candidates
pub fn estimate_skew(image: &GrayImage, config: &SkewConfig) -> SkewEstimate {
    let edges = canny(image, config.canny_low, config.canny_high);
    let lines = detect_lines(&edges, config);
    let edge_pixels = edges.pixels().filter(|p| p.0[0] != 0).count();

    if lines.is_empty() && edge_pixels > 0 {
        tracing::warn!(
            "No straight lines among {} edge pixels; skipping skew correction",
            edge_pixels
        );
    }

    let angles: Vec<f64> = lines.iter().map(|line| line.angle_deg).collect();
    let angle_deg = match median(&angles) {
        Some(median_deg) => median_deg - 90.0,
        None => 0.0,
    };

    tracing::debug!(
        "Skew estimate: {:.2} degrees from {} line candidates",
        angle_deg,
        lines.len()
    );

    SkewEstimate {
        angle_deg,
        candidates: lines.len(),
        edge_pixels,
    }
}

/// Vote every non-zero edge pixel into a polar line accumulator and
/// report the local maxima exceeding the vote threshold
pub fn detect_lines(edges: &GrayImage, config: &SkewConfig) -> Vec<LineCandidate> {
    let (width, height) = edges.dimensions();
    let rho_step = config.rho_resolution;
    let angle_step = config.angle_resolution_deg;

    let num_angles = ((180.0 / angle_step).round() as usize).max(1);
    let num_rho = ((((width + height) * 2 + 1) as f64 / rho_step).round() as usize).max(1);
    let rho_offset = (num_rho as i64 - 1) / 2;

    // One cell of zero padding on every side keeps the neighbour checks branch-free
    let stride = num_rho + 2;
    let mut acc = vec![0u32; (num_angles + 2) * stride];

    let trig: Vec<(f64, f64)> = (0..num_angles)
        .map(|n| (n as f64 * angle_step).to_radians().sin_cos())
        .collect();

    for (x, y, pixel) in edges.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        let (xf, yf) = (x as f64, y as f64);
        for (n, (sin, cos)) in trig.iter().enumerate() {
            let r = ((xf * cos + yf * sin) / rho_step).round() as i64 + rho_offset;
            if r < 0 || r >= num_rho as i64 {
                continue;
            }
            acc[(n + 1) * stride + r as usize + 1] += 1;
        }
    }

    let mut lines = Vec::new();
    for n in 0..num_angles {
        for r in 0..num_rho {
            let base = (n + 1) * stride + r + 1;
            let votes = acc[base];
            if votes > config.vote_threshold
                && votes > acc[base - 1]
                && votes >= acc[base + 1]
                && votes > acc[base - stride]
                && votes >= acc[base + stride]
            {
                lines.push(LineCandidate {
                    distance: (r as i64 - rho_offset) as f64 * rho_step,
                    angle_deg: n as f64 * angle_step,
                    votes,
                });
            }
        }
    }

    lines
}

/// Median of an unordered sample; mean of the two middle values for even sizes
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Rotate clockwise (y axis pointing down) by `angle_deg` about the image centre.
///
/// The canvas grows to the bounding box of the rotated image. Samples are
/// bilinear and coordinates outside the source replicate the nearest edge
/// pixel, so no dark border is introduced.
pub fn rotate(image: &GrayImage, angle_deg: f64) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let (sin, cos) = angle_deg.to_radians().sin_cos();

    let new_width = ((height as f64 * sin.abs() + width as f64 * cos.abs()) as u32).max(1);
    let new_height = ((height as f64 * cos.abs() + width as f64 * sin.abs()) as u32).max(1);

    let (cx, cy) = ((width / 2) as f64, (height / 2) as f64);
    let (new_cx, new_cy) = (new_width as f64 / 2.0, new_height as f64 / 2.0);

    GrayImage::from_fn(new_width, new_height, |x, y| {
        let dx = x as f64 - new_cx;
        let dy = y as f64 - new_cy;
        let src_x = dx * cos + dy * sin + cx;
        let src_y = -dx * sin + dy * cos + cy;
        Luma([sample_bilinear(image, src_x, src_y)])
    })
}

fn sample_bilinear(image: &GrayImage, x: f64, y: f64) -> u8 {
    let (width, height) = image.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let clamp_x = |v: f64| v.clamp(0.0, (width - 1) as f64) as u32;
    let clamp_y = |v: f64| v.clamp(0.0, (height - 1) as f64) as u32;
    let (xa, xb) = (clamp_x(x0), clamp_x(x0 + 1.0));
    let (ya, yb) = (clamp_y(y0), clamp_y(y0 + 1.0));

    let px = |px: u32, py: u32| image.get_pixel(px, py).0[0] as f64;
    let top = px(xa, ya) * (1.0 - fx) + px(xb, ya) * fx;
    let bottom = px(xa, yb) * (1.0 - fx) + px(xb, yb) * fx;

    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}
