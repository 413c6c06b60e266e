use crate::error::OcrError;
use image::GrayImage;
use imageproc::filter::filter3x3;

/// Laplacian-based sharpening kernel
/// Center weight 5, neighbors -1 each; weights sum to 1
const KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

/// Sharpen strokes with a fixed 3x3 kernel
/// Border pixels are sampled by clamping to the nearest edge pixel
pub fn apply(image: &GrayImage) -> Result<GrayImage, OcrError> {
    super::ensure_not_empty(image.width(), image.height())?;

    let sharpened: GrayImage = filter3x3(image, &KERNEL);
    Ok(sharpened)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_sharpen_enhances_edges() {
        // Create image with an edge (left half dark, right half light)
        let img = GrayImage::from_fn(20, 10, |x, _| {
            if x < 10 {
                Luma([50])
            } else {
                Luma([200])
            }
        });

        let result = apply(&img).unwrap();

        let edge_left = result.get_pixel(9, 5).0[0];
        let edge_right = result.get_pixel(10, 5).0[0];

        let original_diff = 200i32 - 50;
        let result_diff = (edge_right as i32 - edge_left as i32).abs();

        assert!(
            result_diff >= original_diff,
            "Edge should be enhanced: {} >= {}",
            result_diff,
            original_diff
        );
    }

    #[test]
    fn test_sharpen_keeps_uniform_image() {
        for value in [0u8, 37, 255] {
            let img = GrayImage::from_pixel(9, 7, Luma([value]));
            let result = apply(&img).unwrap();
            // Includes the border: no artificial dark frame
            assert_eq!(result, img);
        }
    }

    #[test]
    fn test_sharpen_clamps_to_byte_range() {
        let mut img = GrayImage::from_pixel(5, 5, Luma([250]));
        img.put_pixel(2, 2, Luma([10]));

        let result = apply(&img).unwrap();
        // 5 * 10 - 4 * 250 is far below zero
        assert_eq!(result.get_pixel(2, 2).0[0], 0);
        // 5 * 250 - 10 - 3 * 250 overshoots 255
        assert_eq!(result.get_pixel(2, 1).0[0], 255);
    }

    #[test]
    fn test_rejects_empty_image() {
        assert!(apply(&GrayImage::new(0, 3)).is_err());
    }
}
