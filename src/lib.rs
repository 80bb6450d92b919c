//! Mosaic layout generation: assigns one tile image to every cell of a grid laid
//! over a main image, so that the tiles' average colors approximate it.

pub mod mosaic;

pub use mosaic::{generate, generate_with_colors, MosaicError, MosaicLayout, Result};
