//! Assignment of tiles to grid cells

use itertools::Itertools;
use log::debug;

use super::color::{distance, RgbColor};
use super::config::validate_penalty;
use super::error::{MosaicError, Result};
use super::grid::{ColorGrid, MosaicLayout};

/// A possible placement of `tile` in the cell at row-major position `cell`.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    distance: f64,
    cell: usize,
    tile: usize,
}

/// Assign a tile index to every cell of `grid`.
///
/// First every tile gets its single best-fitting free cell, taking the closest
/// (cell, tile) pairs first, so no tile repeats until all of them have been
/// placed. Cells still empty afterwards are visited in row-major order and get
/// the tile with the lowest `distance + uses * penalty`.
///
/// Ties are broken by enumeration order (cell, then tile) in the first pass
/// and by the lowest tile index in the second, so the result is deterministic.
///
/// # Errors
/// * [`MosaicError::InvalidParameter`] if `penalty` is negative or not finite
/// * [`MosaicError::NoTilesAvailable`] if `tiles` is empty
pub fn assign(grid: &ColorGrid, tiles: &[RgbColor], penalty: f64) -> Result<MosaicLayout> {
    validate_penalty(penalty)?;
    if tiles.is_empty() {
        return Err(MosaicError::NoTilesAvailable);
    }

    let cells = grid.cells();
    let mut layout: Vec<Option<usize>> = vec![None; cells.len()];
    let mut usage = vec![0usize; tiles.len()];

    let placed = place_best_fits(cells, tiles, &mut layout, &mut usage);
    debug!(
        "Placed {} of {} tiles on {} cells in the best-fit pass",
        placed,
        tiles.len(),
        cells.len()
    );

    let mut assignment = Vec::with_capacity(cells.len());
    for (cell, color) in cells.iter().enumerate() {
        let tile = match layout[cell] {
            Some(tile) => tile,
            None => {
                let tile = least_penalised(color, tiles, &usage, penalty)
                    .ok_or(MosaicError::NoTilesAvailable)?;
                usage[tile] += 1;
                tile
            }
        };
        assignment.push(tile);
    }

    MosaicLayout::from_cells(grid.rows(), grid.cols(), assignment)
}

/// Give each tile its best free cell, best pairs first. Returns the number of
/// tiles placed.
fn place_best_fits(
    cells: &[RgbColor],
    tiles: &[RgbColor],
    layout: &mut [Option<usize>],
    usage: &mut [usize],
) -> usize {
    let target = tiles.len().min(cells.len());

    let mut candidates: Vec<Candidate> = cells
        .iter()
        .enumerate()
        .cartesian_product(tiles.iter().enumerate())
        .map(|((cell, cell_color), (tile, tile_color))| Candidate {
            distance: distance(cell_color, tile_color),
            cell,
            tile,
        })
        .collect();
    // stable: equal distances keep (cell, tile) enumeration order
    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let mut placed = 0;
    for candidate in candidates {
        if placed >= target {
            break;
        }
        if layout[candidate.cell].is_none() && usage[candidate.tile] == 0 {
            layout[candidate.cell] = Some(candidate.tile);
            usage[candidate.tile] += 1;
            placed += 1;
        }
    }
    placed
}

/// Tile with the lowest penalised score for `color`, lowest index on ties.
fn least_penalised(
    color: &RgbColor,
    tiles: &[RgbColor],
    usage: &[usize],
    penalty: f64,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (tile, tile_color) in tiles.iter().enumerate() {
        let score = distance(color, tile_color) + usage[tile] as f64 * penalty;
        if best.map_or(true, |(_, best_score)| score < best_score) {
            best = Some((tile, score));
        }
    }
    best.map(|(tile, _)| tile)
}
