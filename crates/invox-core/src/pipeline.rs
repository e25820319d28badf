//! Document-to-invoice extraction pipeline.
//!
//! One run takes a source image through
//! `Preprocessing -> Recognizing -> Cleanup -> Extracting -> Done`.
//! The derived image written during preprocessing is owned by a
//! [`DerivedImage`] guard, so it is deleted on every exit path, including
//! errors and panics in the OCR engine.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{InvoxError, Result};
use crate::invoice::{InvoiceParser, RuleBasedParser};
use crate::models::config::InvoxConfig;
use crate::models::invoice::ExtractionResult;
use crate::ocr::{create_engine, GrayscaleNormalizer, ImageTransform, OcrEngine};

/// Stage of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    Preprocessing,
    Recognizing,
    Cleanup,
    Extracting,
    Done,
    Errored,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Preprocessing => "preprocessing",
            Self::Recognizing => "recognizing",
            Self::Cleanup => "cleanup",
            Self::Extracting => "extracting",
            Self::Done => "done",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Owns a derived image file and deletes it when released or dropped.
#[derive(Debug)]
pub struct DerivedImage {
    path: Option<PathBuf>,
}

impl DerivedImage {
    /// Take ownership of an existing derived file.
    pub fn adopt(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Delete the file now. A file that is already gone counts as released.
    pub fn release(mut self) -> io::Result<()> {
        match self.path.take() {
            Some(path) => remove_if_present(&path),
            None => Ok(()),
        }
    }
}

impl Drop for DerivedImage {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            match remove_if_present(&path) {
                Ok(()) => debug!("Removed derived image {}", path.display()),
                Err(e) => warn!("Failed to remove derived image {}: {}", path.display(), e),
            }
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Preprocess, recognize, clean up, then extract.
///
/// Holds no per-run state, so one pipeline can serve many concurrent runs.
#[derive(Clone)]
pub struct InvoicePipeline {
    transform: Arc<dyn ImageTransform>,
    engine: Arc<dyn OcrEngine>,
    parser: Arc<dyn InvoiceParser>,
    default_language: String,
}

impl InvoicePipeline {
    /// Create a pipeline from explicit collaborators.
    pub fn new(transform: Arc<dyn ImageTransform>, engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            transform,
            engine,
            parser: Arc::new(RuleBasedParser::new()),
            default_language: "eng".to_string(),
        }
    }

    /// Build the default pipeline from configuration.
    pub fn from_config(config: &InvoxConfig) -> Result<Self> {
        if config.ocr.language.trim().is_empty() {
            return Err(InvoxError::Config("ocr.language must not be empty".to_string()));
        }

        let prefix = &config.preprocessing.derived_prefix;
        if prefix.contains(['/', '\\']) {
            return Err(InvoxError::Config(format!(
                "preprocessing.derived_prefix must be a plain file name prefix, got {prefix:?}"
            )));
        }

        let transform = GrayscaleNormalizer::from_config(&config.preprocessing);
        let engine: Arc<dyn OcrEngine> = Arc::from(create_engine(&config.ocr)?);

        Ok(Self::new(Arc::new(transform), engine).with_default_language(&config.ocr.language))
    }

    /// Replace the text parser.
    pub fn with_parser(mut self, parser: Arc<dyn InvoiceParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Language used when a run is given an empty hint.
    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    /// Parse already recognized text.
    pub fn parse_text(&self, text: &str) -> ExtractionResult {
        ExtractionResult {
            raw_text: text.to_string(),
            invoice: self.parser.parse(text),
        }
    }

    /// Run the full pipeline on one image.
    pub fn extract_invoice(&self, image_path: &Path, language: &str) -> Result<ExtractionResult> {
        self.extract_invoice_observed(image_path, language, |_| {})
    }

    /// Run the full pipeline, reporting each stage transition to `observer`.
    pub fn extract_invoice_observed(
        &self,
        image_path: &Path,
        language: &str,
        mut observer: impl FnMut(PipelineStage),
    ) -> Result<ExtractionResult> {
        let start = Instant::now();
        let mut enter = |stage: PipelineStage| {
            debug!("{}: {}", image_path.display(), stage);
            observer(stage);
        };

        enter(PipelineStage::Start);
        let result = self.run(image_path, language, &mut enter);
        match &result {
            Ok(extraction) => {
                enter(PipelineStage::Done);
                info!(
                    "Extracted {} in {}ms ({} products)",
                    image_path.display(),
                    start.elapsed().as_millis(),
                    extraction.invoice.products.len()
                );
            }
            Err(e) => {
                enter(PipelineStage::Errored);
                warn!("Extraction failed for {}: {}", image_path.display(), e);
            }
        }
        result
    }

    fn run(
        &self,
        image_path: &Path,
        language: &str,
        enter: &mut impl FnMut(PipelineStage),
    ) -> Result<ExtractionResult> {
        let language = if language.trim().is_empty() {
            self.default_language.as_str()
        } else {
            language
        };

        enter(PipelineStage::Preprocessing);
        let derived = DerivedImage::adopt(self.transform.preprocess(image_path)?);
        debug!("Derived image: {}", derived.path().display());

        enter(PipelineStage::Recognizing);
        // On error `derived` is dropped here, which deletes the file.
        let raw_text = self.engine.recognize(derived.path(), language)?;

        enter(PipelineStage::Cleanup);
        derived.release()?;

        enter(PipelineStage::Extracting);
        let invoice = self.parser.parse(&raw_text);

        Ok(ExtractionResult { raw_text, invoice })
    }
}

impl fmt::Debug for InvoicePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvoicePipeline")
            .field("engine", &self.engine.name())
            .field("default_language", &self.default_language)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, OcrError, PreprocessError};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const SAMPLE: &str = "Invoice Number: INV-2045\nInvoice Date: March 3, 2023\nBill To: Acme Corp\nWidget A  $10.00  $20.00\nSubtotal: $20.00\nTotal: $20.00";

    /// Copies the source to `processed-<name>` without decoding it.
    ///
    /// Refuses to overwrite an existing file.
    struct CopyTransform;

    impl ImageTransform for CopyTransform {
        fn preprocess(&self, source: &Path) -> std::result::Result<PathBuf, PreprocessError> {
            if !source.is_file() {
                return Err(PreprocessError::SourceNotFound(source.to_path_buf()));
            }
            let name = source.file_name().unwrap().to_string_lossy();
            let derived = source.with_file_name(format!("processed-{name}"));
            assert!(!derived.exists(), "derived file already exists");
            std::fs::copy(source, &derived).unwrap();
            Ok(derived)
        }
    }

    /// Returns the derived file's contents as text, or fails on demand.
    #[derive(Default)]
    struct FileTextEngine {
        fail: bool,
        calls: AtomicUsize,
        seen: Mutex<Vec<(PathBuf, String, bool)>>,
    }

    impl OcrEngine for FileTextEngine {
        fn recognize(
            &self,
            image_path: &Path,
            language: &str,
        ) -> std::result::Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((
                image_path.to_path_buf(),
                language.to_string(),
                image_path.exists(),
            ));
            if self.fail {
                return Err(OcrError::RecognitionFailed("corrupt image".to_string()));
            }
            Ok(std::fs::read_to_string(image_path).unwrap())
        }

        fn name(&self) -> &str {
            "file-text"
        }
    }

    fn pipeline(engine: Arc<FileTextEngine>) -> InvoicePipeline {
        InvoicePipeline::new(Arc::new(CopyTransform), engine)
    }

    #[test]
    fn test_successful_run_removes_derived_image() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("file-1.png");
        std::fs::write(&source, SAMPLE).unwrap();
        let engine = Arc::new(FileTextEngine::default());

        let result = pipeline(engine.clone()).extract_invoice(&source, "eng").unwrap();

        assert_eq!(result.raw_text, SAMPLE);
        assert_eq!(result.invoice.invoice_number.as_deref(), Some("2045"));
        assert_eq!(result.invoice.client.as_deref(), Some("Acme Corp"));

        let seen = engine.seen.lock().unwrap();
        let (derived, language, existed) = &seen[0];
        assert_eq!(derived, &dir.path().join("processed-file-1.png"));
        assert_eq!(language, "eng");
        assert!(existed);
        assert!(!derived.exists());
        assert!(source.exists());
    }

    #[test]
    fn test_recognition_failure_removes_derived_image() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("file-2.png");
        std::fs::write(&source, SAMPLE).unwrap();
        let engine = Arc::new(FileTextEngine {
            fail: true,
            ..Default::default()
        });

        let err = pipeline(engine.clone())
            .extract_invoice(&source, "eng")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RecognitionFailed);
        assert!(!dir.path().join("processed-file-2.png").exists());
        assert!(source.exists());
    }

    #[test]
    fn test_missing_source_skips_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FileTextEngine::default());

        let err = pipeline(engine.clone())
            .extract_invoice(&dir.path().join("nope.png"), "eng")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SourceNotFound);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_text_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("blank.png");
        std::fs::write(&source, "").unwrap();

        let result = pipeline(Arc::new(FileTextEngine::default()))
            .extract_invoice(&source, "eng")
            .unwrap();

        assert_eq!(result.raw_text, "");
        assert!(result.invoice.is_empty());
    }

    #[test]
    fn test_empty_language_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lang.png");
        std::fs::write(&source, SAMPLE).unwrap();
        let engine = Arc::new(FileTextEngine::default());

        pipeline(engine.clone())
            .with_default_language("por")
            .extract_invoice(&source, "  ")
            .unwrap();

        assert_eq!(engine.seen.lock().unwrap()[0].1, "por");
    }

    #[test]
    fn test_stage_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("stages.png");
        std::fs::write(&source, SAMPLE).unwrap();

        let mut stages = Vec::new();
        pipeline(Arc::new(FileTextEngine::default()))
            .extract_invoice_observed(&source, "eng", |s| stages.push(s))
            .unwrap();

        assert_eq!(
            stages,
            vec![
                PipelineStage::Start,
                PipelineStage::Preprocessing,
                PipelineStage::Recognizing,
                PipelineStage::Cleanup,
                PipelineStage::Extracting,
                PipelineStage::Done,
            ]
        );

        let mut stages = Vec::new();
        let _ = pipeline(Arc::new(FileTextEngine::default())).extract_invoice_observed(
            &dir.path().join("missing.png"),
            "eng",
            |s| stages.push(s),
        );
        assert_eq!(
            stages,
            vec![
                PipelineStage::Start,
                PipelineStage::Preprocessing,
                PipelineStage::Errored,
            ]
        );
    }

    #[test]
    fn test_guard_removes_on_drop_and_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed-x.png");
        std::fs::write(&path, b"x").unwrap();

        drop(DerivedImage::adopt(path.clone()));
        assert!(!path.exists());

        assert!(DerivedImage::adopt(path.clone()).release().is_ok());
    }

    #[test]
    fn test_with_real_normalizer_on_undecodable_input() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.jpg");
        std::fs::write(&source, b"not a jpeg").unwrap();
        let engine = Arc::new(FileTextEngine::default());

        let err = InvoicePipeline::new(Arc::new(GrayscaleNormalizer::new()), engine.clone())
            .extract_invoice(&source, "eng")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    /// Returns a fixed text for any image and records the paths it saw.
    #[derive(Default)]
    struct FixedTextEngine {
        seen: Mutex<Vec<PathBuf>>,
    }

    impl OcrEngine for FixedTextEngine {
        fn recognize(
            &self,
            image_path: &Path,
            _language: &str,
        ) -> std::result::Result<String, OcrError> {
            self.seen.lock().unwrap().push(image_path.to_path_buf());
            Ok(SAMPLE.to_string())
        }

        fn name(&self) -> &str {
            "fixed-text"
        }
    }

    fn write_scan(path: &Path) -> Vec<u8> {
        image::GrayImage::from_fn(16, 16, |x, y| image::Luma([(x * 8 + y * 4) as u8]))
            .save(path)
            .unwrap();
        std::fs::read(path).unwrap()
    }

    fn dir_entries(dir: &Path) -> Vec<PathBuf> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_empty_prefix_never_touches_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.png");
        let original = write_scan(&source);
        let engine = Arc::new(FixedTextEngine::default());
        let normalizer = GrayscaleNormalizer::new().with_prefix("");

        let result = InvoicePipeline::new(Arc::new(normalizer), engine.clone())
            .extract_invoice(&source, "eng")
            .unwrap();

        assert_eq!(result.invoice.invoice_number.as_deref(), Some("2045"));
        assert_ne!(engine.seen.lock().unwrap()[0], source);
        assert_eq!(std::fs::read(&source).unwrap(), original);
        assert_eq!(dir_entries(dir.path()), vec![source]);
    }

    #[test]
    fn test_existing_file_with_derived_name_survives_run() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("x.png");
        write_scan(&source);
        let user_file = dir.path().join("processed-x.png");
        std::fs::write(&user_file, b"keep me").unwrap();
        let engine = Arc::new(FixedTextEngine::default());

        InvoicePipeline::new(Arc::new(GrayscaleNormalizer::new()), engine.clone())
            .extract_invoice(&source, "eng")
            .unwrap();

        let derived = engine.seen.lock().unwrap()[0].clone();
        assert_ne!(derived, user_file);
        assert!(!derived.exists());
        assert_eq!(std::fs::read(&user_file).unwrap(), b"keep me");
        assert_eq!(dir_entries(dir.path()), vec![user_file, source]);
    }

    #[test]
    fn test_from_config_rejects_prefix_with_separator() {
        let mut config = InvoxConfig::default();
        config.preprocessing.derived_prefix = "../out-".to_string();

        let err = InvoicePipeline::from_config(&config).unwrap_err();
        assert!(matches!(err, InvoxError::Config(_)));
    }

    #[tokio::test]
    async fn test_concurrent_runs_use_distinct_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FileTextEngine::default());
        let pipeline = pipeline(engine.clone());

        let mut handles = Vec::new();
        for i in 0..8 {
            let source = dir.path().join(format!("file-{i}.png"));
            std::fs::write(&source, format!("Invoice #{}\nBill To: Client {i}", 1000 + i))
                .unwrap();
            let pipeline = pipeline.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                pipeline.extract_invoice(&source, "eng")
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.invoice.invoice_number, Some((1000 + i).to_string()));
            assert_eq!(result.invoice.client, Some(format!("Client {i}")));
        }

        let seen = engine.seen.lock().unwrap();
        let mut derived: Vec<_> = seen.iter().map(|(p, _, _)| p.clone()).collect();
        derived.sort();
        derived.dedup();
        assert_eq!(derived.len(), 8);
        assert!(derived.iter().all(|p| !p.exists()));
    }
}
