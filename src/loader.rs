//! Image decoding from disk, delegated to the `image` crate. The harness
//! owns orientation normalization (top-to-bottom rows) and the
//! grayscale/RGB channel contract; everything else is the crate's job.

use std::path::Path;

use image::GenericImageView;

use crate::error::HarnessError;
use crate::types::Image;

/// Decode one image file, flip it to top-to-bottom row order, and convert
/// to grayscale (`depth=8`) or RGB (`depth=24`) per `gray_flag`.
pub fn load_image(path: &Path, gray_flag: bool) -> Result<Image, HarnessError> {
    let decoded = image::open(path)
        .map_err(|e| HarnessError::Data(format!("failed to open image {}: {e}", path.display())))?;

    let (width, height) = decoded.dimensions();
    let flipped = decoded.flipv();

    let (depth, data) = if gray_flag {
        (8u8, flipped.to_luma8().into_raw())
    } else {
        (24u8, flipped.to_rgb8().into_raw())
    };

    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(HarnessError::Data(format!(
            "image {} exceeds the supported {}x{} dimensions",
            path.display(),
            u16::MAX,
            u16::MAX
        )));
    }

    Ok(Image::new(width as u16, height as u16, depth, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::tempdir;

    #[test]
    fn loads_and_flips_rgb_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.png");

        // top row red, bottom row blue; after vertical flip the harness
        // sees blue first.
        let mut buffer: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(2, 2);
        buffer.put_pixel(0, 0, Rgb([255, 0, 0]));
        buffer.put_pixel(1, 0, Rgb([255, 0, 0]));
        buffer.put_pixel(0, 1, Rgb([0, 0, 255]));
        buffer.put_pixel(1, 1, Rgb([0, 0, 255]));
        buffer.save(&path).unwrap();

        let image = load_image(&path, false).unwrap();
        assert_eq!(image.width, 2);
        assert_eq!(image.height, 2);
        assert_eq!(image.depth, 24);
        assert_eq!(&image.data[0..3], &[0, 0, 255]);
    }

    #[test]
    fn grayscale_flag_forces_depth_eight() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(2, 2, Rgb([10, 20, 30]));
        buffer.save(&path).unwrap();

        let image = load_image(&path, true).unwrap();
        assert_eq!(image.depth, 8);
        assert_eq!(image.data.len(), 4);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = load_image(Path::new("/nonexistent/path.png"), false);
        assert!(result.is_err());
    }
}
