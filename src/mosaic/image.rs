use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

use ::image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};

use super::error::{MosaicError, Result};

/// Anything the generator can pull RGB pixels from.
///
/// Sources are read from sampling tasks running in parallel, hence `Sync`.
pub trait PixelSource: Sync {
    fn rgb_pixels(&self) -> Result<Cow<'_, RgbImage>>;
}

impl PixelSource for RgbImage {
    fn rgb_pixels(&self) -> Result<Cow<'_, RgbImage>> {
        Ok(Cow::Borrowed(self))
    }
}

impl PixelSource for DynamicImage {
    fn rgb_pixels(&self) -> Result<Cow<'_, RgbImage>> {
        Ok(Cow::Owned(self.to_rgb8()))
    }
}

/// Decoded on demand, inside whichever task samples it.
impl PixelSource for Path {
    fn rgb_pixels(&self) -> Result<Cow<'_, RgbImage>> {
        load_image(self).map(|img| Cow::Owned(img.to_rgb8()))
    }
}

impl PixelSource for PathBuf {
    fn rgb_pixels(&self) -> Result<Cow<'_, RgbImage>> {
        self.as_path().rgb_pixels()
    }
}

impl<T: PixelSource + ?Sized> PixelSource for &T {
    fn rgb_pixels(&self) -> Result<Cow<'_, RgbImage>> {
        (**self).rgb_pixels()
    }
}

/// Decode an image, applying its EXIF orientation if present.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let decoding_failure = |error| MosaicError::DecodingFailure {
        path: path.to_owned(),
        error,
    };
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| decoding_failure(e.into()))?;
    let mut decoder = reader.into_decoder().map_err(decoding_failure)?;
    let orientation = decoder.orientation().map_err(decoding_failure)?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(decoding_failure)?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Recursively collect files under `path` whose extension satisfies `extension`,
/// sorted so tile indices are stable between runs.
pub fn find_images(path: &Path, extension: impl Fn(&OsStr) -> bool) -> Result<Vec<PathBuf>> {
    let discovery_failure = |path: &Path| {
        let path = path.to_owned();
        move |error| MosaicError::TileDiscovery { path, error }
    };
    let mut stack: Vec<PathBuf> = vec![path.to_owned()];
    let mut images_paths = vec![];
    while let Some(p) = stack.pop() {
        let entries = read_dir(&p).map_err(discovery_failure(&p))?;
        for entry in entries {
            let entry = entry.map_err(discovery_failure(&p))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().map_or(false, |ext| extension(ext)) {
                images_paths.push(path);
            }
        }
    }
    images_paths.sort();
    Ok(images_paths)
}
