//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the invox pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoxConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Image preprocessing configuration.
    pub preprocessing: PreprocessConfig,
}

/// OCR backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    /// The `tesseract` command-line engine.
    #[default]
    Tesseract,
    /// PaddleOCR ONNX models through `pure-onnx-ocr`.
    Onnx,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Which engine to run.
    pub backend: OcrBackend,

    /// Language hint used when the caller passes none.
    pub language: String,

    /// Tesseract settings.
    pub tesseract: TesseractConfig,

    /// Directory containing ONNX model files (`onnx` backend).
    pub model_dir: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Tesseract,
            language: "eng".to_string(),
            tesseract: TesseractConfig::default(),
            model_dir: PathBuf::from("models"),
        }
    }
}

/// Tesseract command-line settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Binary name or path.
    pub binary: String,

    /// Overrides `TESSDATA_PREFIX` when set.
    pub tessdata_dir: Option<PathBuf>,

    /// Page segmentation mode.
    pub psm: u8,

    /// OCR engine mode.
    pub oem: u8,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            tessdata_dir: None,
            psm: 3,
            oem: 3,
        }
    }
}

/// Image preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// File name prefix of the derived image, written next to the source.
    pub derived_prefix: String,

    /// Percent of darkest and brightest pixels clipped by contrast stretching.
    pub clip_percent: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            derived_prefix: "processed-".to_string(),
            clip_percent: 1.0,
        }
    }
}

impl InvoxConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
