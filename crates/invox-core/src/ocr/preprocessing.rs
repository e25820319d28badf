//! Image preprocessing for OCR.

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageError, ImageFormat, ImageReader, Luma};
use tracing::debug;

use crate::error::PreprocessError;
use crate::models::config::PreprocessConfig;

/// Turns a source image into a derived image better suited for OCR.
pub trait ImageTransform: Send + Sync {
    /// Write a derived image for `source` and return its path.
    ///
    /// The source is never modified. On success the returned file exists and
    /// the caller owns it.
    fn preprocess(&self, source: &Path) -> Result<PathBuf, PreprocessError>;
}

/// Grayscale conversion followed by a percentile contrast stretch.
#[derive(Debug, Clone)]
pub struct GrayscaleNormalizer {
    /// Prefix of the derived file name.
    prefix: String,
    /// Percent of pixels clipped at each end of the histogram.
    clip_percent: f32,
}

impl GrayscaleNormalizer {
    /// Create a normalizer with default settings.
    pub fn new() -> Self {
        Self::from_config(&PreprocessConfig::default())
    }

    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            prefix: config.derived_prefix.clone(),
            clip_percent: config.clip_percent,
        }
    }

    /// Set the derived file name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the clipped percentage. [`normalize`](Self::normalize) clamps it
    /// to `0.0..=49.0`.
    pub fn with_clip_percent(mut self, percent: f32) -> Self {
        self.clip_percent = percent;
        self
    }

    /// Stretch contrast so the clipped black and white points map to 0 and 255.
    pub fn normalize(&self, image: &GrayImage) -> GrayImage {
        let mut histogram = [0u64; 256];
        for pixel in image.pixels() {
            histogram[pixel[0] as usize] += 1;
        }

        let total: u64 = histogram.iter().sum();
        if total == 0 {
            return image.clone();
        }

        let clip = (total as f64 * self.clip_percent.clamp(0.0, 49.0) as f64 / 100.0) as u64;
        let low = percentile_level(histogram.iter().enumerate(), clip);
        let high = percentile_level(histogram.iter().enumerate().rev(), clip);

        if high <= low {
            debug!("Flat histogram (low={}, high={}), skipping stretch", low, high);
            return image.clone();
        }

        debug!("Contrast stretch: {}..{} -> 0..255", low, high);

        let range = (high - low) as f32;
        let mut lut = [0u8; 256];
        for (value, out) in lut.iter_mut().enumerate() {
            let scaled = (value as f32 - low as f32) * 255.0 / range;
            *out = scaled.round().clamp(0.0, 255.0) as u8;
        }

        let mut result = image.clone();
        for pixel in result.pixels_mut() {
            *pixel = Luma([lut[pixel[0] as usize]]);
        }
        result
    }

    fn load(&self, source: &Path) -> Result<GrayImage, PreprocessError> {
        if !source.is_file() {
            return Err(PreprocessError::SourceNotFound(source.to_path_buf()));
        }

        let reader = ImageReader::open(source)
            .map_err(|_| PreprocessError::SourceNotFound(source.to_path_buf()))?;

        let unsupported = |reason: String| PreprocessError::UnsupportedFormat {
            path: source.to_path_buf(),
            reason,
        };

        let image = reader
            .with_guessed_format()
            .map_err(|e| unsupported(e.to_string()))?
            .decode()
            .map_err(|e| unsupported(e.to_string()))?;

        Ok(image.to_luma8())
    }
}

impl Default for GrayscaleNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageTransform for GrayscaleNormalizer {
    fn preprocess(&self, source: &Path) -> Result<PathBuf, PreprocessError> {
        let gray = self.load(source)?;
        let (width, height) = gray.dimensions();
        debug!("Loaded {} ({}x{})", source.display(), width, height);

        let normalized = self.normalize(&gray);

        let dir = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let prefix = derived_prefix(source, &self.prefix);

        // Created exclusively, so an existing file is never reused. Until
        // `keep` succeeds the file is removed when `file` is dropped.
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".png")
            .tempfile_in(dir)
            .map_err(|e| PreprocessError::Write {
                path: dir.join(&prefix),
                source: ImageError::IoError(e),
            })?;

        normalized
            .write_to(&mut file, ImageFormat::Png)
            .map_err(|e| PreprocessError::Write {
                path: file.path().to_path_buf(),
                source: e,
            })?;

        let (_, derived) = file.keep().map_err(|e| PreprocessError::Write {
            path: e.file.path().to_path_buf(),
            source: ImageError::IoError(e.error),
        })?;

        debug!("Wrote derived image {}", derived.display());
        Ok(derived)
    }
}

/// File name prefix for the derived image of `source`:
/// `<prefix><source stem>-`. A random suffix and `.png` are appended on
/// creation.
pub fn derived_prefix(source: &Path, prefix: &str) -> String {
    let stem = source
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{prefix}{stem}-")
}

/// Gray level at which the running pixel count first exceeds `clip`.
fn percentile_level<'a>(levels: impl Iterator<Item = (usize, &'a u64)>, clip: u64) -> u8 {
    let mut seen = 0u64;
    for (level, &count) in levels {
        seen += count;
        if seen > clip {
            return level as u8;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_gradient(path: &Path) {
        let image = RgbImage::from_fn(40, 10, |x, _| {
            let v = 100 + x as u8;
            Rgb([v, v / 2, v])
        });
        image.save(path).unwrap();
    }

    /// Files in `dir` other than `keep`.
    fn other_files(dir: &Path, keep: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p != keep)
            .collect()
    }

    #[test]
    fn test_derived_prefix() {
        assert_eq!(
            derived_prefix(Path::new("uploads/file-123.jpg"), "processed-"),
            "processed-file-123-"
        );
        assert_eq!(derived_prefix(Path::new("scan"), ""), "scan-");
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("missing.png");

        let err = GrayscaleNormalizer::new().preprocess(&source).unwrap_err();
        assert!(matches!(err, PreprocessError::SourceNotFound(p) if p == source));
        assert!(other_files(dir.path(), &source).is_empty());
    }

    #[test]
    fn test_directory_is_not_a_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = GrayscaleNormalizer::new().preprocess(dir.path()).unwrap_err();
        assert!(matches!(err, PreprocessError::SourceNotFound(_)));
    }

    #[test]
    fn test_undecodable_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.png");
        std::fs::write(&source, b"definitely not an image").unwrap();

        let err = GrayscaleNormalizer::new().preprocess(&source).unwrap_err();
        assert!(matches!(err, PreprocessError::UnsupportedFormat { .. }));
        assert!(other_files(dir.path(), &source).is_empty());
    }

    #[test]
    fn test_writes_grayscale_stretched_copy() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("invoice.png");
        write_gradient(&source);
        let original = std::fs::read(&source).unwrap();

        let derived = GrayscaleNormalizer::new().preprocess(&source).unwrap();

        assert_eq!(derived.parent(), Some(dir.path()));
        let name = derived.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("processed-invoice-"), "{name}");
        assert!(name.ends_with(".png"), "{name}");
        assert_eq!(std::fs::read(&source).unwrap(), original);

        let output = image::open(&derived).unwrap();
        assert!(matches!(output, image::DynamicImage::ImageLuma8(_)));
        let gray = output.to_luma8();
        assert_eq!(gray.dimensions(), (40, 10));
        let min = gray.pixels().map(|p| p[0]).min().unwrap();
        let max = gray.pixels().map(|p| p[0]).max().unwrap();
        assert_eq!((min, max), (0, 255));
    }

    #[test]
    fn test_empty_prefix_leaves_source_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.png");
        write_gradient(&source);
        let original = std::fs::read(&source).unwrap();

        let derived = GrayscaleNormalizer::new()
            .with_prefix("")
            .preprocess(&source)
            .unwrap();

        assert_ne!(derived, source);
        assert_eq!(std::fs::read(&source).unwrap(), original);
    }

    #[test]
    fn test_existing_file_with_derived_name_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("x.png");
        write_gradient(&source);
        let user_file = dir.path().join("processed-x.png");
        std::fs::write(&user_file, b"user data").unwrap();

        let first = GrayscaleNormalizer::new().preprocess(&source).unwrap();
        let second = GrayscaleNormalizer::new().preprocess(&source).unwrap();

        assert_ne!(first, user_file);
        assert_ne!(first, second);
        assert_eq!(std::fs::read(&user_file).unwrap(), b"user data");
    }

    #[test]
    fn test_gif_source_is_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.gif");
        write_gradient(&source);

        let derived = GrayscaleNormalizer::new().preprocess(&source).unwrap();

        assert_eq!(derived.extension().and_then(|e| e.to_str()), Some("png"));
        assert_eq!(ImageFormat::from_path(&derived).unwrap(), ImageFormat::Png);
        let output = image::open(&derived).unwrap().to_luma8();
        assert_eq!(output.dimensions(), (40, 10));
    }

    #[test]
    fn test_flat_image_unchanged() {
        let image = GrayImage::from_pixel(8, 8, Luma([90]));
        let normalized = GrayscaleNormalizer::new().normalize(&image);
        assert_eq!(normalized, image);
    }

    #[test]
    fn test_clip_percent_saturates_outliers() {
        // 98 mid-gray pixels with one black and one white outlier.
        let mut image = GrayImage::from_pixel(10, 10, Luma([128]));
        image.put_pixel(0, 0, Luma([0]));
        image.put_pixel(1, 0, Luma([255]));
        image.put_pixel(2, 0, Luma([100]));
        image.put_pixel(3, 0, Luma([150]));

        let normalized = GrayscaleNormalizer::new()
            .with_clip_percent(1.0)
            .normalize(&image);

        assert_eq!(normalized.get_pixel(2, 0)[0], 0);
        assert_eq!(normalized.get_pixel(3, 0)[0], 255);
    }
}
