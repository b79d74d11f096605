//! Async wrapper over [`OcrEngine`]
//!
//! Native calls block for the whole inference, so each one is moved onto
//! tokio's blocking pool. Calls on the same engine still run one at a time.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::{OcrError, OcrResult};
use crate::marshal::{Channels, ImageInput};
use crate::ocr::OcrEngine;
use crate::params::OcrParams;
use crate::result::DetectionResult;

/// Cloneable async handle to a shared [`OcrEngine`]
#[derive(Clone)]
pub struct AsyncOcrEngine {
    inner: Arc<OcrEngine>,
}

impl AsyncOcrEngine {
    pub fn new(engine: OcrEngine) -> Self {
        AsyncOcrEngine {
            inner: Arc::new(engine),
        }
    }

    pub fn engine(&self) -> &OcrEngine {
        &self.inner
    }

    /// Async version of [`OcrEngine::detect`]
    pub async fn detect(&self, image_path: impl Into<PathBuf>) -> OcrResult<String> {
        let path = image_path.into();
        self.run(move |engine| engine.detect(path)).await
    }

    /// Async version of [`OcrEngine::detect_from_bytes`]
    pub async fn detect_from_bytes(&self, image_bytes: Vec<u8>) -> OcrResult<DetectionResult> {
        self.run(move |engine| engine.detect_from_bytes(&image_bytes))
            .await
    }

    /// Async version of [`OcrEngine::detect_from_bytes_with`]
    pub async fn detect_from_bytes_with(
        &self,
        image_bytes: Vec<u8>,
        channels: Channels,
        params: OcrParams,
        recognize: bool,
    ) -> OcrResult<DetectionResult> {
        self.run(move |engine| {
            engine.detect_from_bytes_with(&image_bytes, channels, &params, recognize)
        })
        .await
    }

    /// Async version of [`OcrEngine::detect_input`]
    pub async fn detect_input(
        &self,
        input: ImageInput,
        params: OcrParams,
        recognize: bool,
    ) -> OcrResult<DetectionResult> {
        self.run(move |engine| engine.detect_input(&input, &params, recognize))
            .await
    }

    async fn run<R, F>(&self, f: F) -> OcrResult<R>
    where
        F: FnOnce(&OcrEngine) -> OcrResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let engine = Arc::clone(&self.inner);
        join(tokio::task::spawn_blocking(move || f(&engine))).await
    }
}

/// Await a blocking OCR task. A panic inside the task is resumed on the
/// caller; a task cancelled by runtime shutdown becomes `DetectionFailed`.
async fn join<R>(task: JoinHandle<OcrResult<R>>) -> OcrResult<R> {
    match task.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(OcrError::DetectionFailed(format!("OCR task cancelled: {e}"))),
    }
}

impl From<OcrEngine> for AsyncOcrEngine {
    fn from(engine: OcrEngine) -> Self {
        Self::new(engine)
    }
}
