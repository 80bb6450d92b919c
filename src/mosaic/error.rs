use std::io;
use std::path::PathBuf;

use derive_more::Display;

/// Everything that can abort a layout request.
#[derive(Debug, Display)]
pub enum MosaicError {
    /// A sampled region contained no pixels.
    #[display(
        fmt = "empty region at ({}, {}) with size {}x{}",
        x,
        y,
        width,
        height
    )]
    EmptyRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// An input image could not be opened or decoded.
    #[display(fmt = "{:?}: {}", path, error)]
    DecodingFailure {
        path: PathBuf,
        error: ::image::ImageError,
    },

    /// The tile collection was empty.
    #[display(fmt = "no tiles available")]
    NoTilesAvailable,

    #[display(fmt = "grid size must be positive, got {}", grid_size)]
    InvalidGridSize { grid_size: u32 },

    /// Rows of a color grid had different lengths.
    #[display(
        fmt = "ragged grid: row {} has {} cells, expected {}",
        row,
        found,
        expected
    )]
    RaggedGrid {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[display(fmt = "invalid parameter '{}': {}", parameter, reason)]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    /// A layout cell refers to a tile outside the tile collection.
    #[display(
        fmt = "cell ({}, {}) holds tile {} but only {} tiles exist",
        row,
        col,
        tile,
        num_tiles
    )]
    TileOutOfRange {
        row: usize,
        col: usize,
        tile: usize,
        num_tiles: usize,
    },

    #[display(fmt = "layout file {:?}: {}", path, error)]
    LayoutIo {
        path: PathBuf,
        error: bincode::Error,
    },

    #[display(fmt = "failed to export image to {:?}: {}", path, error)]
    ImageExport {
        path: PathBuf,
        error: ::image::ImageError,
    },

    #[display(fmt = "failed to read tiles from {:?}: {}", path, error)]
    TileDiscovery { path: PathBuf, error: io::Error },
}

impl std::error::Error for MosaicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MosaicError::DecodingFailure { error, .. } => Some(error),
            MosaicError::ImageExport { error, .. } => Some(error),
            MosaicError::LayoutIo { error, .. } => Some(error.as_ref()),
            MosaicError::TileDiscovery { error, .. } => Some(error),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MosaicError>;
