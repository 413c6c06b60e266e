use crate::config::ContrastConfig;
use crate::error::OcrError;
use image::GrayImage;
use rayon::prelude::*;

const BINS: usize = 256;

/// A contiguous run of rows or columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub len: u32,
}

/// Rectangular region of the image processed with its own lookup table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileBounds {
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }
}

/// Partition of an image into near-equal tiles; the last row and column
/// absorb the remainder pixels
#[derive(Debug, Clone)]
pub struct TileGrid {
    pub rows: Vec<Span>,
    pub cols: Vec<Span>,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, rows: u32, cols: u32) -> Self {
        Self {
            rows: split_extent(height, rows),
            cols: split_extent(width, cols),
        }
    }

    /// All tiles in row-major order
    pub fn tiles(&self) -> Vec<TileBounds> {
        self.rows
            .iter()
            .flat_map(|row| self.cols.iter().map(move |col| tile_at(*row, *col)))
            .collect()
    }
}

fn tile_at(row: Span, col: Span) -> TileBounds {
    TileBounds {
        x: col.start,
        y: row.start,
        width: col.len,
        height: row.len,
    }
}

fn split_extent(extent: u32, parts: u32) -> Vec<Span> {
    // Never more parts than pixels, so every tile is non-empty
    let parts = parts.clamp(1, extent.max(1));
    let step = extent / parts;
    (0..parts)
        .map(|i| {
            let start = i * step;
            let len = if i + 1 == parts { extent - start } else { step };
            Span { start, len }
        })
        .collect()
}

/// Contrast-limited histogram equalization, applied independently per tile.
///
/// Tiles are not blended, so seams between neighbouring tiles are expected.
pub fn apply(image: &GrayImage, config: &ContrastConfig) -> Result<GrayImage, OcrError> {
    super::ensure_not_empty(image.width(), image.height())?;

    let (width, height) = image.dimensions();
    let grid = TileGrid::new(width, height, config.tile_rows, config.tile_cols);
    let mut output = vec![0u8; width as usize * height as usize];

    // Each tile row owns a disjoint horizontal band of the output buffer
    let mut bands = Vec::with_capacity(grid.rows.len());
    let mut rest = output.as_mut_slice();
    for row in &grid.rows {
        let band_len = row.len as usize * width as usize;
        let (band, tail) = std::mem::take(&mut rest).split_at_mut(band_len);
        bands.push(band);
        rest = tail;
    }

    let tiles = grid.tiles();
    bands
        .into_par_iter()
        .zip(tiles.par_chunks(grid.cols.len()))
        .for_each(|(band, row_tiles)| {
            for &tile in row_tiles {
                let lut = tile_lut(image, tile, config.clip_limit);
                for y in 0..tile.height {
                    let band_offset = (y * width) as usize;
                    for x in tile.x..tile.x + tile.width {
                        let value = image.get_pixel(x, tile.y + y).0[0];
                        band[band_offset + x as usize] = lut[value as usize];
                    }
                }
            }
        });

    GrayImage::from_raw(width, height, output)
        .ok_or_else(|| OcrError::Internal("contrast output buffer size mismatch".to_string()))
}

/// Build the equalization lookup table for one tile
pub fn tile_lut(image: &GrayImage, tile: TileBounds, clip_limit: f64) -> [u8; BINS] {
    let mut hist = histogram(image, tile);
    let (lo, hi) = occupied_range(&hist);

    let limit = ((clip_limit * tile.pixel_count() as f64 / BINS as f64) as u32).max(1);
    clip_and_redistribute(&mut hist, limit);

    let mut cdf = [0u64; BINS];
    let mut running = 0u64;
    for (i, count) in hist.iter().enumerate() {
        running += *count as u64;
        cdf[i] = running;
    }

    let mut lut = [0u8; BINS];
    let (cdf_lo, cdf_hi) = (cdf[lo], cdf[hi]);
    if cdf_hi == cdf_lo {
        // Flat tile: keep the original intensities
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = i as u8;
        }
        return lut;
    }

    let range = (cdf_hi - cdf_lo) as f64;
    for (entry, value) in lut.iter_mut().zip(cdf.iter()) {
        let scaled = value.saturating_sub(cdf_lo) as f64 * 255.0 / range;
        *entry = scaled.round().clamp(0.0, 255.0) as u8;
    }
    lut
}

pub fn histogram(image: &GrayImage, tile: TileBounds) -> [u32; BINS] {
    let mut hist = [0u32; BINS];
    for y in tile.y..tile.y + tile.height {
        for x in tile.x..tile.x + tile.width {
            hist[image.get_pixel(x, y).0[0] as usize] += 1;
        }
    }
    hist
}

/// Clip every bin at `limit` and spread the excess evenly over all bins.
/// The division remainder is dropped. Returns the clipped excess.
pub fn clip_and_redistribute(hist: &mut [u32; BINS], limit: u32) -> u32 {
    let mut excess = 0u32;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }

    let increment = excess / BINS as u32;
    if increment > 0 {
        for count in hist.iter_mut() {
            *count += increment;
        }
    }
    excess
}

/// Lowest and highest intensities present in the histogram
fn occupied_range(hist: &[u32; BINS]) -> (usize, usize) {
    let lo = hist.iter().position(|&c| c > 0).unwrap_or(0);
    let hi = hist.iter().rposition(|&c| c > 0).unwrap_or(0);
    (lo, hi)
}
