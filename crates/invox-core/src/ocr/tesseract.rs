//! Tesseract OCR engine (command-line wrapper).

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::TesseractConfig;

use super::OcrEngine;

/// Runs the `tesseract` binary and reads plain text from stdout.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    /// Version line reported by the binary, e.g. "tesseract 5.3.0".
    pub fn version(&self) -> Result<String, OcrError> {
        let output = self
            .command()
            .arg("--version")
            .output()
            .map_err(|e| self.spawn_error(e))?;

        // Older releases print the version on stderr.
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };

        text.lines()
            .next()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| OcrError::EngineUnavailable("empty version output".to_string()))
    }

    /// Arguments passed for a recognition run.
    pub fn recognition_args(&self, image_path: &Path, language: &str) -> Vec<String> {
        vec![
            image_path.to_string_lossy().into_owned(),
            "stdout".to_string(),
            "-l".to_string(),
            language.to_string(),
            "--psm".to_string(),
            self.config.psm.to_string(),
            "--oem".to_string(),
            self.config.oem.to_string(),
        ]
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        if let Some(tessdata) = &self.config.tessdata_dir {
            cmd.env("TESSDATA_PREFIX", tessdata);
        }
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> OcrError {
        match e.kind() {
            ErrorKind::NotFound => OcrError::EngineUnavailable(format!(
                "`{}` not found on PATH",
                self.config.binary
            )),
            _ => OcrError::EngineUnavailable(format!(
                "failed to run `{}`: {}",
                self.config.binary, e
            )),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(TesseractConfig::default())
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image_path: &Path, language: &str) -> Result<String, OcrError> {
        let start = Instant::now();
        let args = self.recognition_args(image_path, language);
        debug!("Running {} {}", self.config.binary, args.join(" "));

        let output = self
            .command()
            .args(&args)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::RecognitionFailed(format!(
                "{} exited with {}: {}",
                self.config.binary,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();

        info!(
            "OCR complete: {} characters in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );

        Ok(text)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
