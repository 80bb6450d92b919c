use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::color::RgbColor;
use super::error::{MosaicError, Result};

/// A rectangular, row-major table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

/// Average color of every cell of the main image.
pub type ColorGrid = Grid<RgbColor>;

/// Tile index assigned to every cell of the main image.
pub type MosaicLayout = Grid<usize>;

impl<T> Grid<T> {
    /// Build a grid from its row-major cells.
    ///
    /// # Errors
    /// Returns [`MosaicError::RaggedGrid`] if `cells.len() != rows * cols`,
    /// including when `rows * cols` overflows.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<T>) -> Result<Self> {
        match rows.checked_mul(cols) {
            Some(expected) if expected == cells.len() => Ok(Grid { rows, cols, cells }),
            expected => Err(MosaicError::RaggedGrid {
                row: cells.len() / cols.max(1),
                expected: expected.unwrap_or(usize::MAX),
                found: cells.len(),
            }),
        }
    }

    /// Build a grid from nested rows, rejecting rows of different lengths.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let num_rows = rows.len();
        let mut cells = Vec::with_capacity(num_rows * cols);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != cols {
                return Err(MosaicError::RaggedGrid {
                    row,
                    expected: cols,
                    found: values.len(),
                });
            }
            cells.extend(values);
        }
        Ok(Grid {
            rows: num_rows,
            cols,
            cells,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cells, `rows * cols`.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row < self.rows {
            Some(&self.cells[row * self.cols..(row + 1) * self.cols])
        } else {
            None
        }
    }

    /// Iterate over rows, top to bottom.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks() panics on 0, an empty grid has no rows anyway
        self.cells.chunks(self.cols.max(1)).take(self.rows)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Row-major cells paired with their (row, col) position.
    pub fn indexed_cells(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let cols = self.cols.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| ((i / cols, i % cols), cell))
    }

    /// Transform every cell, keeping the shape.
    pub fn map_indexed<U>(&self, mut f: impl FnMut((usize, usize), &T) -> U) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self.indexed_cells().map(|(pos, cell)| f(pos, cell)).collect(),
        }
    }

    pub fn to_rows(&self) -> Vec<Vec<T>>
    where
        T: Clone,
    {
        self.iter_rows().map(<[T]>::to_vec).collect()
    }
}

impl MosaicLayout {
    /// Check that every cell refers to one of `num_tiles` tiles.
    ///
    /// Rectangularity holds by construction.
    pub fn validate(&self, num_tiles: usize) -> Result<()> {
        match self.indexed_cells().find(|(_, tile)| **tile >= num_tiles) {
            Some(((row, col), tile)) => Err(MosaicError::TileOutOfRange {
                row,
                col,
                tile: *tile,
                num_tiles,
            }),
            None => Ok(()),
        }
    }

    /// How many cells each tile occupies, indexed by tile.
    pub fn usage_counts(&self, num_tiles: usize) -> Vec<usize> {
        let mut counts = vec![0; num_tiles];
        for &tile in self.cells.iter().filter(|&&tile| tile < num_tiles) {
            counts[tile] += 1;
        }
        counts
    }

    /// Write the layout with bincode.
    pub fn save(&self, path: &Path) -> Result<()> {
        let encoded = bincode::serialize(self).map_err(|error| MosaicError::LayoutIo {
            path: path.to_owned(),
            error,
        })?;
        fs::write(path, encoded).map_err(|e| MosaicError::LayoutIo {
            path: path.to_owned(),
            error: Box::new(bincode::ErrorKind::Io(e)),
        })
    }

    /// Read a layout written by [`MosaicLayout::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| MosaicError::LayoutIo {
            path: path.to_owned(),
            error: Box::new(bincode::ErrorKind::Io(e)),
        })?;
        let layout: MosaicLayout =
            bincode::deserialize(&bytes).map_err(|error| MosaicError::LayoutIo {
                path: path.to_owned(),
                error,
            })?;
        // a hand-edited file may disagree with its own dimensions
        Grid::from_cells(layout.rows, layout.cols, layout.cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_from_rows() {
        let grid = Grid::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.get(1, 0), Some(&4));
        assert_eq!(grid.get(0, 3), None);
        assert_eq!(grid.row(1), Some(&[4, 5, 6][..]));
        assert_eq!(grid.to_rows(), vec![vec![1, 2, 3], vec![4, 5, 6]]);
    }

    #[test]
    fn test_from_rows_ragged() {
        let result = Grid::from_rows(vec![vec![Rgb([0u8, 0, 0]); 2], vec![Rgb([0, 0, 0]); 1]]);
        assert!(matches!(
            result,
            Err(MosaicError::RaggedGrid {
                row: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_from_cells_length_mismatch() {
        assert!(Grid::from_cells(2, 2, vec![0usize; 3]).is_err());
        assert!(Grid::from_cells(2, 2, vec![0usize; 4]).is_ok());
    }

    #[test]
    fn test_indexed_cells() {
        let grid = Grid::from_cells(2, 2, vec!['a', 'b', 'c', 'd']).unwrap();
        let positions: Vec<_> = grid.indexed_cells().map(|(pos, c)| (pos, *c)).collect();
        assert_eq!(
            positions,
            vec![((0, 0), 'a'), ((0, 1), 'b'), ((1, 0), 'c'), ((1, 1), 'd')]
        );
    }

    #[test]
    fn test_validate() {
        let layout = MosaicLayout::from_rows(vec![vec![0, 1], vec![1, 2]]).unwrap();
        assert!(layout.validate(3).is_ok());
        assert!(matches!(
            layout.validate(2),
            Err(MosaicError::TileOutOfRange {
                row: 1,
                col: 1,
                tile: 2,
                num_tiles: 2
            })
        ));
    }

    #[test]
    fn test_usage_counts() {
        let layout = MosaicLayout::from_rows(vec![vec![0, 1], vec![1, 1]]).unwrap();
        assert_eq!(layout.usage_counts(3), vec![1, 3, 0]);
    }

    #[test]
    fn test_save_and_load() {
        let layout = MosaicLayout::from_rows(vec![vec![0, 1, 2], vec![2, 1, 0]]).unwrap();
        let path = std::env::temp_dir().join("mosaic_layout_test_save_and_load.bin");
        layout.save(&path).unwrap();
        let loaded = MosaicLayout::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, layout);
    }

    #[test]
    fn test_load_rejects_overflowing_dimensions() {
        let bogus: MosaicLayout = Grid {
            rows: usize::MAX / 2 + 1,
            cols: 2,
            cells: vec![],
        };
        let path = std::env::temp_dir().join("mosaic_layout_test_overflowing_dimensions.bin");
        fs::write(&path, bincode::serialize(&bogus).unwrap()).unwrap();
        let loaded = MosaicLayout::load(&path);
        let _ = fs::remove_file(&path);
        assert!(matches!(
            loaded,
            Err(MosaicError::RaggedGrid {
                expected: usize::MAX,
                found: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("mosaic_layout_test_missing.bin");
        let _ = fs::remove_file(&path);
        assert!(matches!(
            MosaicLayout::load(&path),
            Err(MosaicError::LayoutIo { .. })
        ));
    }
}
