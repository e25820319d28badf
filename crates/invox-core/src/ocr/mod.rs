//! Image preprocessing and OCR engine adapters.

mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;
mod tesseract;

pub use preprocessing::{derived_prefix, GrayscaleNormalizer, ImageTransform};
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;
pub use tesseract::TesseractEngine;

use std::path::Path;

use tracing::info;

use crate::error::OcrError;
use crate::models::config::{OcrBackend, OcrConfig};

/// Text recognition over an image file.
///
/// Implementations block until recognition finishes. An image without text
/// is `Ok` with an empty string; only engine failures are errors.
pub trait OcrEngine: Send + Sync {
    /// Recognize the text in `image_path` using the `language` hint.
    fn recognize(&self, image_path: &Path, language: &str) -> Result<String, OcrError>;

    /// Short engine name for logs.
    fn name(&self) -> &str;
}

/// Create the engine selected by `config.backend`.
pub fn create_engine(config: &OcrConfig) -> Result<Box<dyn OcrEngine>, OcrError> {
    let engine: Box<dyn OcrEngine> = match config.backend {
        OcrBackend::Tesseract => Box::new(TesseractEngine::new(config.tesseract.clone())),
        OcrBackend::Onnx => create_onnx_engine(config)?,
    };

    info!("Using OCR engine: {}", engine.name());
    Ok(engine)
}

#[cfg(feature = "native")]
fn create_onnx_engine(config: &OcrConfig) -> Result<Box<dyn OcrEngine>, OcrError> {
    Ok(Box::new(PureOcrEngine::from_dir(&config.model_dir)?))
}

#[cfg(not(feature = "native"))]
fn create_onnx_engine(_config: &OcrConfig) -> Result<Box<dyn OcrEngine>, OcrError> {
    Err(OcrError::EngineUnavailable(
        "onnx backend requires the `native` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_is_tesseract() {
        let engine = create_engine(&OcrConfig::default()).unwrap();
        assert_eq!(engine.name(), "tesseract");
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_onnx_backend_without_models_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig {
            backend: OcrBackend::Onnx,
            model_dir: dir.path().to_path_buf(),
            ..OcrConfig::default()
        };

        assert!(matches!(create_engine(&config), Err(OcrError::ModelLoad(_))));
    }
}
