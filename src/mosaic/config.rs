use super::error::{MosaicError, Result};

/// Usage penalty applied per previous placement of a tile, in RGB distance units.
pub const DEFAULT_PENALTY: f64 = 50.0;

/// Edge length tiles are downsampled to before averaging.
pub const DEFAULT_TILE_SAMPLE_SIZE: u32 = 20;

/// Tunables of a layout request.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Added to a tile's score once per cell it already occupies when filling
    /// the cells left over by the best-fit pass.
    pub penalty: f64,
    /// Tiles are resized to `tile_sample_size`x`tile_sample_size` before
    /// averaging. Zero averages the full-resolution tile.
    pub tile_sample_size: u32,
    /// Show a progress bar while analysing tiles
    pub show_progress: bool,
    /// Progress bar template
    pub progress_template: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            penalty: DEFAULT_PENALTY,
            tile_sample_size: DEFAULT_TILE_SAMPLE_SIZE,
            show_progress: false,
            progress_template: "{msg} {wide_bar} {pos}/{len} ({per_sec})".to_string(),
        }
    }
}

impl LayoutConfig {
    pub fn with_penalty(self, penalty: f64) -> Self {
        Self { penalty, ..self }
    }

    pub fn with_tile_sample_size(self, tile_sample_size: u32) -> Self {
        Self {
            tile_sample_size,
            ..self
        }
    }

    pub fn with_progress(self, show_progress: bool) -> Self {
        Self {
            show_progress,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_penalty(self.penalty)
    }
}

/// A usage penalty must be finite and non-negative.
pub fn validate_penalty(penalty: f64) -> Result<()> {
    if !penalty.is_finite() || penalty < 0.0 {
        return Err(MosaicError::InvalidParameter {
            parameter: "penalty",
            reason: format!("must be a finite value >= 0, got {}", penalty),
        });
    }
    Ok(())
}
