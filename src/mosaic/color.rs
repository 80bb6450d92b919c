use image::{Rgb, RgbImage};

use super::error::{MosaicError, Result};

/// A single averaged color. Alpha never reaches this type: every input is
/// converted to 8-bit RGB before sampling.
pub type RgbColor = Rgb<u8>;

/// Calculate the average color of a sequence of pixels.
///
/// Each channel is the floored arithmetic mean of that channel over all pixels,
/// accumulated in 64 bits.
///
/// # Errors
/// Returns [`MosaicError::EmptyRegion`] when `pixels` yields nothing.
pub fn average_color<'a>(pixels: impl IntoIterator<Item = &'a RgbColor>) -> Result<RgbColor> {
    let mut r_sum = 0u64;
    let mut g_sum = 0u64;
    let mut b_sum = 0u64;
    let mut pixel_count = 0u64;

    for pixel in pixels {
        r_sum += u64::from(pixel[0]);
        g_sum += u64::from(pixel[1]);
        b_sum += u64::from(pixel[2]);
        pixel_count += 1;
    }

    if pixel_count == 0 {
        return Err(MosaicError::EmptyRegion {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        });
    }

    Ok(Rgb([
        (r_sum / pixel_count) as u8,
        (g_sum / pixel_count) as u8,
        (b_sum / pixel_count) as u8,
    ]))
}

/// Calculate the average color of a rectangular region in an RGB image.
///
/// # Arguments
/// * `img` - The source image
/// * `rect` - Rectangle as (left, top, width, height)
///
/// The rectangle is clipped to the image bounds before averaging.
///
/// # Errors
/// Returns [`MosaicError::EmptyRegion`] if the clipped rectangle has no pixels.
pub fn average_color_of_region(img: &RgbImage, rect: (u32, u32, u32, u32)) -> Result<RgbColor> {
    let (left, top, width, height) = rect;
    let right = left.saturating_add(width).min(img.width());
    let bottom = top.saturating_add(height).min(img.height());

    if left >= right || top >= bottom {
        return Err(MosaicError::EmptyRegion {
            x: left,
            y: top,
            width,
            height,
        });
    }

    let pixels = (top..bottom).flat_map(|y| (left..right).map(move |x| img.get_pixel(x, y)));
    average_color(pixels)
}

/// Euclidean distance between two colors in RGB space.
pub fn distance(a: &RgbColor, b: &RgbColor) -> f64 {
    let dr = f64::from(a[0]) - f64::from(b[0]);
    let dg = f64::from(a[1]) - f64::from(b[1]);
    let db = f64::from(a[2]) - f64::from(b[2]);
    (dr * dr + dg * dg + db * db).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_color_basic() {
        // Create a 2x2 image with known colors
        let img = RgbImage::from_fn(2, 2, |x, y| match (x, y) {
            (0, 0) => Rgb([100, 150, 200]),
            (1, 0) => Rgb([200, 100, 50]),
            (0, 1) => Rgb([50, 200, 100]),
            (1, 1) => Rgb([150, 50, 150]),
            _ => unreachable!(),
        });

        let avg = average_color_of_region(&img, (0, 0, 2, 2)).unwrap();
        assert_eq!(avg, Rgb([125, 125, 125]));
    }

    #[test]
    fn test_average_color_truncates() {
        let pixels = [Rgb([0, 0, 1]), Rgb([1, 2, 2])];
        let avg = average_color(pixels.iter()).unwrap();
        // (0+1)/2 = 0, (0+2)/2 = 1, (1+2)/2 = 1
        assert_eq!(avg, Rgb([0, 1, 1]));
    }

    #[test]
    fn test_average_color_uniform_region() {
        for size in [1, 3, 17, 64] {
            let img = RgbImage::from_pixel(size, size, Rgb([42, 84, 126]));
            let avg = average_color_of_region(&img, (0, 0, size, size)).unwrap();
            assert_eq!(avg, Rgb([42, 84, 126]));
        }
    }

    #[test]
    fn test_average_color_single_pixel() {
        let img = RgbImage::from_fn(3, 3, |x, y| Rgb([x as u8, y as u8, 7]));
        let avg = average_color_of_region(&img, (1, 2, 1, 1)).unwrap();
        assert_eq!(avg, Rgb([1, 2, 7]));
    }

    #[test]
    fn test_average_color_empty() {
        let pixels: Vec<RgbColor> = vec![];
        assert!(matches!(
            average_color(pixels.iter()),
            Err(MosaicError::EmptyRegion { .. })
        ));
    }

    #[test]
    fn test_zero_width_region() {
        let img = RgbImage::new(10, 10);
        let result = average_color_of_region(&img, (0, 0, 0, 5));
        assert!(matches!(
            result,
            Err(MosaicError::EmptyRegion { width: 0, height: 5, .. })
        ));
    }

    #[test]
    fn test_region_outside_image() {
        let img = RgbImage::new(5, 5);
        let result = average_color_of_region(&img, (5, 0, 2, 2));
        assert!(matches!(result, Err(MosaicError::EmptyRegion { .. })));
    }

    #[test]
    fn test_region_is_clipped() {
        let img = RgbImage::from_fn(4, 1, |x, _| if x < 2 { Rgb([0, 0, 0]) } else { Rgb([90, 90, 90]) });
        // Only the last two pixels are inside the image.
        let avg = average_color_of_region(&img, (2, 0, 10, 10)).unwrap();
        assert_eq!(avg, Rgb([90, 90, 90]));
    }

    #[test]
    fn test_distance_identity() {
        for c in [Rgb([0, 0, 0]), Rgb([255, 255, 255]), Rgb([12, 200, 99])] {
            assert_eq!(distance(&c, &c), 0.0);
        }
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Rgb([10, 20, 30]);
        let b = Rgb([200, 5, 77]);
        assert_eq!(distance(&a, &b), distance(&b, &a));
    }

    #[test]
    fn test_distance_value() {
        let a = Rgb([0, 0, 0]);
        let b = Rgb([3, 4, 0]);
        assert_eq!(distance(&a, &b), 5.0);
        assert!(distance(&Rgb([255, 0, 0]), &Rgb([0, 0, 255])) > 360.0);
    }
}
