//! Core library for invoice OCR processing.
//!
//! This crate provides:
//! - Image preprocessing (grayscale + contrast normalization)
//! - OCR adapters (tesseract CLI, pure-Rust PaddleOCR models)
//! - Rule-based invoice field and line-item extraction
//! - The extraction pipeline tying them together with guaranteed cleanup

pub mod error;
pub mod invoice;
pub mod models;
pub mod ocr;
pub mod pipeline;

pub use error::{ErrorKind, InvoxError, OcrError, PreprocessError, Result};
pub use invoice::{InvoiceParser, RuleBasedParser};
pub use models::config::InvoxConfig;
pub use models::invoice::{ExtractionResult, ParsedInvoice, ProductLine};
pub use ocr::{create_engine, GrayscaleNormalizer, ImageTransform, OcrEngine, TesseractEngine};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pipeline::{DerivedImage, InvoicePipeline, PipelineStage};
