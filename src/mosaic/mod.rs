pub mod algorithms;
pub mod analysis;
pub mod color;
pub mod config;
pub mod error;
pub mod grid;
pub mod image;
pub mod rendering;
pub mod stats;

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

pub use algorithms::assign;
pub use analysis::{sample_grid, sample_tile};
pub use color::{average_color, average_color_of_region, distance, RgbColor};
pub use config::LayoutConfig;
pub use error::{MosaicError, Result};
pub use grid::{ColorGrid, Grid, MosaicLayout};
pub use self::image::{find_images, load_image, PixelSource};
pub use stats::LayoutStats;

/// A layout together with the colors it was computed from.
#[derive(Clone, Debug)]
pub struct GeneratedLayout {
    pub layout: MosaicLayout,
    pub grid: ColorGrid,
    pub tile_colors: Vec<RgbColor>,
}

impl GeneratedLayout {
    pub fn stats(&self) -> LayoutStats {
        LayoutStats::new(&self.layout, &self.grid, &self.tile_colors)
    }
}

/// Produce a `grid_size`x`grid_size` layout of `tiles` approximating `main`.
///
/// See [`generate_with_colors`].
pub fn generate<M, T>(
    main: &M,
    tiles: &[T],
    grid_size: u32,
    config: &LayoutConfig,
) -> Result<MosaicLayout>
where
    M: PixelSource + ?Sized,
    T: PixelSource,
{
    generate_with_colors(main, tiles, grid_size, config).map(|generated| generated.layout)
}

/// Sample the main image and every tile, then assign tiles to cells.
///
/// The main image and the tiles are sampled concurrently; tile colors keep
/// the order of `tiles`. Any failure while reading or sampling a single image
/// fails the whole request.
///
/// # Errors
/// * [`MosaicError::InvalidGridSize`] if `grid_size` is zero
/// * [`MosaicError::NoTilesAvailable`] if `tiles` is empty
/// * [`MosaicError::InvalidParameter`] if `config` is invalid
/// * [`MosaicError::DecodingFailure`] / [`MosaicError::EmptyRegion`] from sampling
pub fn generate_with_colors<M, T>(
    main: &M,
    tiles: &[T],
    grid_size: u32,
    config: &LayoutConfig,
) -> Result<GeneratedLayout>
where
    M: PixelSource + ?Sized,
    T: PixelSource,
{
    config.validate()?;
    if grid_size == 0 {
        return Err(MosaicError::InvalidGridSize { grid_size });
    }
    if tiles.is_empty() {
        return Err(MosaicError::NoTilesAvailable);
    }

    let start = Instant::now();
    let pb = if config.show_progress {
        let style = ProgressStyle::default_bar()
            .template(&config.progress_template)
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(tiles.len() as u64)
            .with_message("Analysing tiles")
            .with_style(style)
    } else {
        ProgressBar::hidden()
    };

    let (grid, tile_colors) = rayon::join(
        || {
            main.rgb_pixels()
                .and_then(|img| sample_grid(&img, grid_size))
        },
        || {
            tiles
                .par_iter()
                .map(|tile| {
                    let color = tile
                        .rgb_pixels()
                        .and_then(|img| sample_tile(&img, config.tile_sample_size));
                    pb.inc(1);
                    color
                })
                .collect::<Result<Vec<RgbColor>>>()
        },
    );
    pb.finish_and_clear();
    let grid = grid?;
    let tile_colors = tile_colors?;
    debug!(
        "Sampled a {}x{} grid and {} tiles in {:?}",
        grid.rows(),
        grid.cols(),
        tile_colors.len(),
        start.elapsed()
    );

    let start = Instant::now();
    let layout = assign(&grid, &tile_colors, config.penalty)?;
    debug!("Assigned tiles in {:?}", start.elapsed());

    Ok(GeneratedLayout {
        layout,
        grid,
        tile_colors,
    })
}
