use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ::image::codecs::jpeg::JpegEncoder;
use ::image::imageops::{self, FilterType};
use ::image::{DynamicImage, ImageFormat, ImageResult, RgbImage, Rgba, RgbaImage};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use super::error::{MosaicError, Result};
use super::grid::MosaicLayout;

/// Smallest and largest edge accepted when exporting a mosaic.
pub const EXPORT_SIZE_RANGE: (u32, u32) = (128, 16000);

/// Largest composed mosaic, in pixels.
pub const MAX_CANVAS_PIXELS: u64 = 1 << 30;

/// Opacity of the main image laid over the mosaic unless configured otherwise.
pub const DEFAULT_TINT_OPACITY: f64 = 0.65;

/// Quality of exported JPEG files.
pub const JPEG_QUALITY: u8 = 90;

/// Configuration for rendering operations
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Edge length of a tile in the composed image
    pub tile_size: u32,
    /// Opacity of the main image laid over the composed tiles, between 0 and 1
    pub tint_opacity: f64,
    /// Show a progress bar while composing
    pub show_progress: bool,
    /// Progress bar template
    pub progress_template: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tile_size: 32,
            tint_opacity: DEFAULT_TINT_OPACITY,
            show_progress: false,
            progress_template: "{msg} {wide_bar} {pos}/{len} ({per_sec})".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(MosaicError::InvalidParameter {
                parameter: "tile_size",
                reason: "must be greater than 0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.tint_opacity) {
            return Err(MosaicError::InvalidParameter {
                parameter: "tint_opacity",
                reason: format!("must be between 0 and 1, got {}", self.tint_opacity),
            });
        }
        Ok(())
    }

    fn progress_bar(&self, len: u64, message: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::default_bar()
            .template(&self.progress_template)
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(len).with_message(message).with_style(style)
    }
}

/// Width and height of the image composed from `layout` with `tile_size` tiles.
fn canvas_size(layout: &MosaicLayout, tile_size: u32) -> Result<(u32, u32)> {
    let edge = |cells: usize| {
        u32::try_from(cells)
            .ok()
            .and_then(|cells| cells.checked_mul(tile_size))
    };
    match (edge(layout.cols()), edge(layout.rows())) {
        (Some(width), Some(height))
            if u64::from(tile_size).pow(2) <= MAX_CANVAS_PIXELS
                && u64::from(width) * u64::from(height) <= MAX_CANVAS_PIXELS =>
        {
            Ok((width, height))
        }
        _ => Err(MosaicError::InvalidParameter {
            parameter: "tile_size",
            reason: format!(
                "{}x{} tiles of {}px exceed the {} pixel limit",
                layout.cols(),
                layout.rows(),
                tile_size,
                MAX_CANVAS_PIXELS
            ),
        }),
    }
}

/// Crop a tile to its centered square and resize it to `tile_size`.
pub fn prepare_tile(tile: &DynamicImage, tile_size: u32) -> RgbImage {
    tile.resize_to_fill(tile_size, tile_size, FilterType::Lanczos3)
        .to_rgb8()
}

/// Compose the mosaic described by `layout` out of `tiles`.
///
/// Rows are composed in parallel, then stacked.
///
/// # Errors
/// * [`MosaicError::InvalidParameter`] if the configuration is invalid or the
///   composed image would exceed [`MAX_CANVAS_PIXELS`]
/// * [`MosaicError::TileOutOfRange`] if the layout refers to a missing tile
pub fn render_layout(
    layout: &MosaicLayout,
    tiles: &[DynamicImage],
    config: &RenderConfig,
) -> Result<RgbImage> {
    config.validate()?;
    layout.validate(tiles.len())?;
    let tile_size = config.tile_size;
    let (width, height) = canvas_size(layout, tile_size)?;

    let prepared: Vec<RgbImage> = tiles
        .par_iter()
        .map(|tile| prepare_tile(tile, tile_size))
        .collect();

    debug!(
        "Composing {}x{} tiles into a {}x{} image",
        layout.cols(),
        layout.rows(),
        width,
        height
    );

    let pb = config.progress_bar(layout.rows() as u64, "Rendering");
    let rows: Vec<Vec<usize>> = layout.to_rows();
    let segments: Vec<RgbImage> = rows
        .par_iter()
        .map(|row| {
            let mut segment = RgbImage::new(width, tile_size);
            for (col, &tile) in row.iter().enumerate() {
                let tile_x = col as i64 * i64::from(tile_size);
                imageops::replace(&mut segment, &prepared[tile], tile_x, 0);
            }
            pb.inc(1);
            segment
        })
        .collect();
    pb.finish_and_clear();

    let mut output = RgbImage::new(width, height);
    for (i, segment) in segments.iter().enumerate() {
        imageops::replace(&mut output, segment, 0, i as i64 * i64::from(tile_size));
    }

    Ok(output)
}

/// Overlay `main` on `mosaic` with the given opacity, stretching it to cover the
/// whole mosaic.
pub fn apply_tint(mosaic: &RgbImage, main: &RgbImage, tint_opacity: f64) -> RgbImage {
    if tint_opacity <= 0.0 || main.width() == 0 || main.height() == 0 {
        return mosaic.clone();
    }
    let alpha_value = (255.0 * tint_opacity.min(1.0)).round() as u8;
    let overlay = RgbaImage::from_fn(main.width(), main.height(), |x, y| {
        let p = main.get_pixel(x, y);
        Rgba([p[0], p[1], p[2], alpha_value])
    });

    // Scale up to match the output size
    let overlay = imageops::resize(&overlay, mosaic.width(), mosaic.height(), FilterType::Nearest);

    let mut output = DynamicImage::ImageRgb8(mosaic.clone()).to_rgba8();
    imageops::overlay(&mut output, &overlay, 0, 0);
    DynamicImage::ImageRgba8(output).to_rgb8()
}

/// Resize `image` to a square of `size` (clamped to [`EXPORT_SIZE_RANGE`]) if
/// given, then save it. The format follows the extension of `path`; JPEG files
/// are written at [`JPEG_QUALITY`].
pub fn export(image: &RgbImage, path: &Path, size: Option<u32>) -> Result<()> {
    let resized;
    let image = match size {
        Some(size) => {
            let (min, max) = EXPORT_SIZE_RANGE;
            let size = size.clamp(min, max);
            debug!("Resizing mosaic to {}x{}", size, size);
            resized = imageops::resize(image, size, size, FilterType::Lanczos3);
            &resized
        }
        None => image,
    };
    save(image, path).map_err(|error| MosaicError::ImageExport {
        path: path.to_owned(),
        error,
    })
}

fn save(image: &RgbImage, path: &Path) -> ImageResult<()> {
    match ImageFormat::from_path(path)? {
        ImageFormat::Jpeg => {
            let writer = BufWriter::new(File::create(path)?);
            image.write_with_encoder(JpegEncoder::new_with_quality(writer, JPEG_QUALITY))
        }
        _ => image.save(path),
    }
}
