use ::image::imageops::{self, FilterType};
use ::image::RgbImage;

use super::color::{average_color, average_color_of_region, RgbColor};
use super::error::{MosaicError, Result};
use super::grid::ColorGrid;

/// Bounds `[start, end)` of the `index`-th of `parts` equal slices of `dimension`.
///
/// Slices are never empty: when `parts` exceeds `dimension` a slice is widened
/// to one pixel, so neighbouring cells may share a pixel.
fn cell_span(index: u32, parts: u32, dimension: u32) -> (u32, u32) {
    let start = (u64::from(index) * u64::from(dimension) / u64::from(parts)) as u32;
    let end = (u64::from(index + 1) * u64::from(dimension) / u64::from(parts)) as u32;
    (start, end.max(start + 1))
}

/// Number of cells in a `grid_size`x`grid_size` grid.
fn cell_count(grid_size: u32) -> usize {
    grid_size as usize * grid_size as usize
}

/// Abstract an image into a `grid_size`x`grid_size` grid of average colors.
///
/// # Errors
/// * [`MosaicError::InvalidGridSize`] if `grid_size` is zero
/// * [`MosaicError::EmptyRegion`] if the image has no pixels
pub fn sample_grid(img: &RgbImage, grid_size: u32) -> Result<ColorGrid> {
    if grid_size == 0 {
        return Err(MosaicError::InvalidGridSize { grid_size });
    }
    if img.width() == 0 || img.height() == 0 {
        return Err(MosaicError::EmptyRegion {
            x: 0,
            y: 0,
            width: img.width(),
            height: img.height(),
        });
    }

    let mut colors = Vec::with_capacity(cell_count(grid_size));
    for row in 0..grid_size {
        let (top, bottom) = cell_span(row, grid_size, img.height());
        for col in 0..grid_size {
            let (left, right) = cell_span(col, grid_size, img.width());
            let rect = (left, top, right - left, bottom - top);
            colors.push(average_color_of_region(img, rect)?);
        }
    }

    ColorGrid::from_cells(grid_size as usize, grid_size as usize, colors)
}

/// Reduce a tile image to its single average color.
///
/// The tile is first downsampled to `sample_size`x`sample_size` to bound the
/// cost of analysing large photos.
pub fn sample_tile(img: &RgbImage, sample_size: u32) -> Result<RgbColor> {
    if img.width() == 0 || img.height() == 0 {
        return Err(MosaicError::EmptyRegion {
            x: 0,
            y: 0,
            width: img.width(),
            height: img.height(),
        });
    }
    if sample_size == 0 {
        return average_color(img.pixels());
    }
    let small = imageops::resize(img, sample_size, sample_size, FilterType::Triangle);
    average_color(small.pixels())
}
