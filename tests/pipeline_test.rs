use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use std::sync::Arc;
use weighbridge_ocr::config::SkewConfig;
use weighbridge_ocr::engine::OcrEngine;
use weighbridge_ocr::preprocessing::steps::{skew, threshold};
use weighbridge_ocr::{OcrError, OcrProcessor, Pipeline};

const INK: [u8; 3] = [30, 30, 30];
const PAPER: [u8; 3] = [230, 230, 230];

/// One line of block "glyphs": a vertical stem with a cap bar
fn text_line() -> RgbImage {
    RgbImage::from_fn(320, 96, |x, y| {
        let glyph = x.checked_sub(20).map(|dx| (dx / 24, dx % 24));
        let inked = match glyph {
            Some((index, col)) if index < 12 => {
                let stem = col < 4 && (33..63).contains(&y);
                let cap = col < 10 && (33..37).contains(&y);
                stem || cap
            }
            _ => false,
        };
        if inked {
            Rgb(INK)
        } else {
            Rgb(PAPER)
        }
    })
}

/// Long dark rules tilted clockwise by `tilt_deg`
fn tilted_rules(tilt_deg: f64) -> RgbImage {
    let (width, height) = (600u32, 300u32);
    let (sin, cos) = tilt_deg.to_radians().sin_cos();
    RgbImage::from_fn(width, height, |x, y| {
        let dx = x as f64 - 300.0;
        let dy = y as f64 - 150.0;
        let along = dx * cos + dy * sin;
        let across = -dx * sin + dy * cos;
        let on_rule = along.abs() < 250.0
            && [-60.0, 0.0, 60.0]
                .iter()
                .any(|offset| (across - offset).abs() < 1.5);
        if on_rule {
            Rgb(INK)
        } else {
            Rgb(PAPER)
        }
    })
}

fn ink_fraction(image: &GrayImage) -> f64 {
    let ink = image.pixels().filter(|p| p.0[0] == 0).count();
    ink as f64 / (image.width() * image.height()) as f64
}

#[test]
fn test_clean_text_line_end_to_end() {
    let result = Pipeline::default()
        .process(&DynamicImage::ImageRgb8(text_line()))
        .unwrap();

    assert_eq!(result.skew_angle_deg, 0.0);
    assert_eq!(result.image.dimensions(), (320, 96));
    assert!(result.image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));

    let fraction = ink_fraction(&result.image);
    assert!(
        (0.02..=0.40).contains(&fraction),
        "foreground fraction {} out of range",
        fraction
    );
}

#[test]
fn test_tilted_page_is_straightened() {
    let page = DynamicImage::ImageRgb8(tilted_rules(5.0));
    let result = Pipeline::default().process(&page).unwrap();

    assert!(
        (result.skew_angle_deg - 5.0).abs() <= 2.0,
        "estimated {}",
        result.skew_angle_deg
    );
    // Canvas grew to hold the rotated page
    assert!(result.image.width() > 600);
    assert!(result.image.height() > 300);

    // Dark rules in the binarized output run horizontally again
    let residual = skew::estimate_skew(&result.image, &SkewConfig::default());
    assert!(residual.candidates > 0);
    assert!(residual.angle_deg.abs() <= 2.0, "residual {}", residual.angle_deg);
}

#[test]
fn test_binarization_is_idempotent() {
    let result = Pipeline::default()
        .process(&DynamicImage::ImageRgb8(text_line()))
        .unwrap();

    let (again, _) = threshold::apply(&result.image).unwrap();
    assert_eq!(again, result.image);
}

struct FixedEngine(Result<Option<String>, fn() -> OcrError>);

impl OcrEngine for FixedEngine {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn description(&self) -> &'static str {
        "returns a canned answer"
    }

    fn recognize(&self, image: &GrayImage) -> Result<Option<String>, OcrError> {
        assert!(image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        match &self.0 {
            Ok(text) => Ok(text.clone()),
            Err(make_err) => Err(make_err()),
        }
    }
}

#[test]
fn test_processor_returns_recognized_text() {
    let engine = Arc::new(FixedEngine(Ok(Some("B 1234 XY".to_string()))));
    let processor = OcrProcessor::new(Pipeline::default(), engine);

    let outcome = processor
        .process(&DynamicImage::ImageRgb8(text_line()))
        .unwrap();
    assert_eq!(outcome.text.as_deref(), Some("B 1234 XY"));
    assert!(outcome.found);
    assert_eq!(outcome.engine, "fixed");
    assert_eq!(outcome.preprocessing.steps.len(), 5);
}

#[test]
fn test_processor_reports_no_text() {
    let processor = OcrProcessor::new(Pipeline::default(), Arc::new(FixedEngine(Ok(None))));
    let outcome = processor
        .process(&DynamicImage::ImageRgb8(text_line()))
        .unwrap();
    assert!(outcome.text.is_none());
    assert!(!outcome.found);
}

#[test]
fn test_processor_surfaces_transport_errors() {
    let engine = FixedEngine(Err(|| OcrError::TransportError("timed out".to_string())));
    let processor = OcrProcessor::new(Pipeline::default(), Arc::new(engine));

    let err = processor
        .process(&DynamicImage::ImageRgb8(text_line()))
        .unwrap_err();
    assert!(matches!(err, OcrError::TransportError(_)));
}

#[test]
fn test_processor_rejects_invalid_input_before_recognition() {
    let processor = OcrProcessor::new(Pipeline::default(), Arc::new(FixedEngine(Ok(None))));
    let err = processor
        .process(&DynamicImage::ImageLuma8(GrayImage::new(8, 8)))
        .unwrap_err();
    assert!(matches!(err, OcrError::InvalidInput(_)));
}
