//! Decode, resize and normalize.
//!
//! Training-time ingestion and inference share this one code path so both
//! see bit-identical tensors for the same source pixels.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use tumor_types::{ImageTensor, TargetSize};

use crate::error::{DatasetError, Result};

/// Image extensions accepted by ingestion (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Returns `true` if the path has a recognized image extension.
#[must_use]
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| e.eq_ignore_ascii_case(known))
        })
}

/// Converts raw images into normalized fixed-size tensors.
///
/// # Example
///
/// ```
/// use tumor_dataset::Preprocessor;
/// use tumor_types::TargetSize;
///
/// let pre = Preprocessor::new(TargetSize::new(8, 8));
/// let tensor = pre.preprocess_rgb(&image::RgbImage::new(20, 10));
/// assert!(tensor.is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
    target: TargetSize,
    filter: FilterType,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(TargetSize::default())
    }
}

impl Preprocessor {
    /// Creates a preprocessor with a bicubic resize filter.
    #[must_use]
    pub const fn new(target: TargetSize) -> Self {
        Self {
            target,
            filter: FilterType::CatmullRom,
        }
    }

    /// Overrides the resize filter.
    #[must_use]
    pub const fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Returns the target size.
    #[must_use]
    pub const fn target(&self) -> TargetSize {
        self.target
    }

    /// Decodes an image file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Decode`] if the file cannot be opened or decoded
    /// and [`DatasetError::ShapeMismatch`] if the result is not the target shape.
    pub fn load_path(&self, path: &Path) -> Result<ImageTensor> {
        let decoded = image::open(path).map_err(|e| DatasetError::decode(path, e.to_string()))?;
        let tensor = self.preprocess(&decoded)?;
        self.check(path, tensor)
    }

    /// Decodes an in-memory image (format guessed from content).
    ///
    /// # Errors
    ///
    /// Same as [`Preprocessor::load_path`], reported against `<memory>`.
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<ImageTensor> {
        let source = Path::new("<memory>");
        let decoded =
            image::load_from_memory(bytes).map_err(|e| DatasetError::decode(source, e.to_string()))?;
        let tensor = self.preprocess(&decoded)?;
        self.check(source, tensor)
    }

    /// Converts an already-decoded image of any color type.
    ///
    /// # Errors
    ///
    /// Returns a type error if the resized buffer is inconsistent.
    pub fn preprocess(&self, image: &DynamicImage) -> Result<ImageTensor> {
        self.preprocess_rgb(&image.to_rgb8())
    }

    /// Resizes an RGB image to the target size and scales to `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns a type error if the resized buffer is inconsistent.
    pub fn preprocess_rgb(&self, rgb: &RgbImage) -> Result<ImageTensor> {
        let resized = if rgb.dimensions() == (self.target.width, self.target.height) {
            rgb.clone()
        } else {
            image::imageops::resize(rgb, self.target.width, self.target.height, self.filter)
        };
        let (width, height) = resized.dimensions();
        Ok(ImageTensor::from_rgb8(
            height as usize,
            width as usize,
            resized.as_raw(),
        )?)
    }

    fn check(&self, path: &Path, tensor: ImageTensor) -> Result<ImageTensor> {
        if tensor.validate_shape(self.target).is_err() {
            return Err(DatasetError::shape_mismatch(
                path,
                self.target.shape(),
                tensor.shape(),
            ));
        }
        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb};

    use super::*;

    fn encode_png(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn extension_filter() {
        assert!(is_image_file(Path::new("scan.png")));
        assert!(is_image_file(Path::new("scan.JPG")));
        assert!(is_image_file(Path::new("/a/b/scan.Jpeg")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("scan.bmp")));
        assert!(!is_image_file(Path::new("png")));
    }

    #[test]
    fn resize_to_target() {
        let pre = Preprocessor::new(TargetSize::new(16, 12));
        let tensor = pre.preprocess_rgb(&RgbImage::new(50, 30)).unwrap();
        assert_eq!(tensor.shape(), [12, 16, 3]);
    }

    #[test]
    fn normalizes_pixels() {
        let pre = Preprocessor::new(TargetSize::new(2, 2));
        let image = RgbImage::from_pixel(2, 2, Rgb([255, 0, 51]));
        let tensor = pre.preprocess_rgb(&image).unwrap();
        assert_eq!(&tensor.as_slice()[..3], &[1.0, 0.0, 0.2]);
        assert!(tensor.is_normalized());
    }

    #[test]
    fn grayscale_becomes_three_channels() {
        let pre = Preprocessor::new(TargetSize::new(4, 4));
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(9, 9, image::Luma([128])));
        let tensor = pre.preprocess(&gray).unwrap();
        assert_eq!(tensor.shape(), [4, 4, 3]);
        let first = &tensor.as_slice()[..3];
        assert_eq!(first[0], first[1]);
        assert_eq!(first[1], first[2]);
    }

    #[test]
    fn decode_bytes_matches_from_rgb() {
        let pre = Preprocessor::new(TargetSize::new(8, 8));
        let mut image = RgbImage::new(13, 7);
        for (x, y, px) in image.enumerate_pixels_mut() {
            *px = Rgb([(x * 17) as u8, (y * 31) as u8, ((x + y) * 5) as u8]);
        }

        let direct = pre.preprocess_rgb(&image).unwrap();
        let decoded = pre.decode_bytes(&encode_png(&image)).unwrap();
        assert_eq!(direct, decoded);
    }

    #[test]
    fn check_rejects_wrong_shape() {
        let pre = Preprocessor::new(TargetSize::new(16, 12));
        let err = pre
            .check(Path::new("scan.png"), ImageTensor::zeros(TargetSize::new(8, 8)))
            .unwrap_err();
        match err {
            DatasetError::ShapeMismatch {
                path,
                expected,
                actual,
            } => {
                assert_eq!(path, Path::new("scan.png"));
                assert_eq!(expected, [12, 16, 3]);
                assert_eq!(actual, [8, 8, 3]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let fits = ImageTensor::zeros(TargetSize::new(16, 12));
        assert!(pre.check(Path::new("scan.png"), fits).is_ok());
    }

    #[test]
    fn decode_bytes_rejects_garbage() {
        let pre = Preprocessor::default();
        let err = pre.decode_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, DatasetError::Decode { .. }));
    }

    #[test]
    fn load_path_missing_file() {
        let pre = Preprocessor::default();
        let err = pre.load_path(Path::new("/nonexistent/scan.png")).unwrap_err();
        assert!(matches!(err, DatasetError::Decode { .. }));
    }
}
