use image::{ImageBuffer, Rgb, RgbImage};
use itertools::Itertools;
use log::info;

use super::color::{distance, RgbColor};
use super::grid::{ColorGrid, Grid, MosaicLayout};

/// A single placement, as seen by the statistics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub row: usize,
    pub col: usize,
    pub tile: usize,
    /// Distance between the cell color and the tile color
    pub distance: f64,
}

/// Statistics about how well a layout matches the main image.
///
/// Tracks tile placement positions, distances and usage to give some insight
/// into the generated layout.
#[derive(Clone, Debug)]
pub struct LayoutStats {
    placements: Grid<Placement>,
    usage: Vec<usize>,
}

impl LayoutStats {
    /// Score every cell of `layout` against the colors it was built from.
    ///
    /// Cells referring to unknown tiles are ignored in usage counts and scored
    /// with a distance of zero; validate the layout first if that matters.
    pub fn new(layout: &MosaicLayout, grid: &ColorGrid, tile_colors: &[RgbColor]) -> Self {
        let placements = layout.map_indexed(|(row, col), &tile| {
            let distance = match (grid.get(row, col), tile_colors.get(tile)) {
                (Some(cell), Some(tile_color)) => distance(cell, tile_color),
                _ => 0.0,
            };
            Placement {
                row,
                col,
                tile,
                distance,
            }
        });
        Self {
            placements,
            usage: layout.usage_counts(tile_colors.len()),
        }
    }

    /// Get the number of tiles recorded in these statistics.
    pub fn tile_count(&self) -> usize {
        self.placements.len()
    }

    /// Number of distinct tiles placed at least once
    pub fn unique_tiles(&self) -> usize {
        self.usage.iter().filter(|&&count| count > 0).count()
    }

    /// Tiles that were never placed.
    pub fn unused_tiles(&self) -> Vec<usize> {
        self.usage.iter().positions(|&count| count == 0).collect()
    }

    pub fn usage(&self) -> &[usize] {
        &self.usage
    }

    pub fn average_distance(&self) -> f64 {
        if self.placements.is_empty() {
            return 0.0;
        }
        self.placements.cells().iter().map(|p| p.distance).sum::<f64>()
            / self.placements.len() as f64
    }

    /// The `n` most used tiles as (tile, count), most used first, lowest index
    /// first among equals.
    pub fn most_used(&self, n: usize) -> Vec<(usize, usize)> {
        self.usage
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, count)| count > 0)
            .sorted_by(|(a_tile, a), (b_tile, b)| b.cmp(a).then(a_tile.cmp(b_tile)))
            .take(n)
            .collect()
    }

    /// The `n` placements with the largest color distance, worst first.
    pub fn worst_matches(&self, n: usize) -> Vec<Placement> {
        self.placements
            .cells()
            .iter()
            .copied()
            .sorted_by(|a, b| b.distance.total_cmp(&a.distance))
            .take(n)
            .collect()
    }

    /// Log a summary of the layout.
    ///
    /// Displays the number of unique tiles used, the average color distance,
    /// the 10 most frequently used tiles and the 10 worst color matches.
    pub fn summarise(&self, tile_name: impl Fn(usize) -> String) {
        if self.placements.is_empty() {
            info!("No tiles recorded in statistics");
            return;
        }

        info!("Layout statistics:");
        info!("  Total tiles placed: {}", self.tile_count());
        info!(
            "  Unique tiles used: {} of {}",
            self.unique_tiles(),
            self.usage.len()
        );
        info!("  Average color distance: {:.3}", self.average_distance());

        info!("Top 10 most used tiles:");
        for (i, (tile, count)) in self.most_used(10).into_iter().enumerate() {
            info!("  {}. {} ({} times)", i + 1, tile_name(tile), count);
        }

        info!("Worst 10 color matches:");
        for (i, placement) in self.worst_matches(10).into_iter().enumerate() {
            info!(
                "  {}. {} at ({}, {}) (distance: {:.3})",
                i + 1,
                tile_name(placement.tile),
                placement.row,
                placement.col,
                placement.distance
            );
        }
    }

    /// Render a grayscale visualization of color distances, one pixel per cell.
    ///
    /// Darker pixels indicate better matches.
    pub fn render(&self) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
        let max_distance = self
            .placements
            .cells()
            .iter()
            .map(|p| p.distance)
            .fold(0.0, f64::max);

        let mut image = RgbImage::new(self.placements.cols() as u32, self.placements.rows() as u32);
        for placement in self.placements.cells() {
            let normalized_distance = if max_distance > 0.0 {
                placement.distance / max_distance
            } else {
                0.0
            };
            let brightness = (normalized_distance * 255.0) as u8;
            image.put_pixel(
                placement.col as u32,
                placement.row as u32,
                Rgb([brightness, brightness, brightness]),
            );
        }
        image
    }
}
