//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use image::GenericImageView;
use tracing::{debug, info};

use crate::error::OcrError;

use super::OcrEngine;

const DET_MODEL: &str = "det.onnx";
const REC_MODEL: &str = "latin_rec.onnx";
const DICTIONARY: &str = "latin_dict.txt";

/// Rows closer than this many pixels are read as one line.
const ROW_BUCKET: f64 = 20.0;

/// OCR engine backed by `pure-onnx-ocr` PaddleOCR models.
///
/// Runs are serialized through a mutex; use one engine per worker for
/// parallel recognition.
pub struct PureOcrEngine {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
}

impl PureOcrEngine {
    /// Create an engine from model files in a directory.
    pub fn from_dir(model_dir: &Path) -> Result<Self, OcrError> {
        let det_path = model_dir.join(DET_MODEL);
        let rec_path = model_dir.join(REC_MODEL);
        let dict_path = model_dir.join(DICTIONARY);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.is_file() {
                return Err(OcrError::ModelLoad(format!(
                    "missing model file {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
        })
    }
}

impl OcrEngine for PureOcrEngine {
    fn recognize(&self, image_path: &Path, language: &str) -> Result<String, OcrError> {
        let start = Instant::now();
        debug!("Language hint {:?} ignored by latin models", language);

        let image = image::open(image_path)
            .map_err(|e| OcrError::RecognitionFailed(format!("cannot read image: {}", e)))?;
        let (width, height) = image.dimensions();

        let engine = self
            .engine
            .lock()
            .map_err(|_| OcrError::RecognitionFailed("engine lock poisoned".to_string()))?;
        let results = engine
            .run_from_image(&image)
            .map_err(|e| OcrError::RecognitionFailed(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let mut regions: Vec<((i64, f64), String)> = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                (((y / ROW_BUCKET) as i64, x), r.text.replace("[UNK]", " "))
            })
            .collect();

        // Reading order: row bucket, then x.
        regions.sort_by(|(a, _), (b, _)| {
            a.0.cmp(&b.0)
                .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        });

        let text = regions
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n");

        info!(
            "OCR complete: {}x{} image, {} characters in {}ms",
            width,
            height,
            text.len(),
            start.elapsed().as_millis()
        );

        Ok(text)
    }

    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }
}

/// Minimum x and y over the polygon's exterior.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .fold((f64::INFINITY, f64::INFINITY), |(x, y), c| {
            (x.min(c.x), y.min(c.y))
        })
}
