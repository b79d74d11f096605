//! OCR Engine
//!
//! Caller-facing API over one native engine instance.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;

use crate::config::EngineConfig;
use crate::engine::EngineHandle;
use crate::error::OcrResult;
use crate::loader::{library_file_name, NativeLibrary};
use crate::marshal::{self, Channels, ImageInput};
use crate::params::OcrParams;
use crate::result::DetectionResult;

/// OCR engine
///
/// Owns one native engine. Calls are blocking and serialized per engine; the
/// native engine is destroyed by [`release`](Self::release) or on drop,
/// whichever comes first.
///
/// # Example
///
/// ```ignore
/// use rapidocr_ffi::{EngineConfig, OcrEngine};
///
/// let engine = OcrEngine::new(
///     EngineConfig::new("det.onnx", "cls.onnx", "rec.onnx").with_keys("keys.txt"),
/// )?;
///
/// println!("{}", engine.detect("test.jpg")?);
///
/// let bytes = std::fs::read("test.jpg")?;
/// for block in engine.detect_from_bytes(&bytes)? {
///     println!("{:.2} {:?}", block.box_score(), block.box_points());
/// }
/// ```
pub struct OcrEngine {
    handle: EngineHandle,
    config: EngineConfig,
}

impl OcrEngine {
    /// Load the native library and create an engine.
    ///
    /// The library comes from `config.library_path` if set, otherwise from
    /// `config.search_dirs` if any, otherwise from the process-wide library.
    pub fn new(config: EngineConfig) -> OcrResult<Self> {
        let library = if let Some(path) = config.library_path.as_ref() {
            Arc::new(NativeLibrary::open(path)?)
        } else if !config.search_dirs.is_empty() {
            let file_name = library_file_name()?;
            let candidates: Vec<_> = config
                .search_dirs
                .iter()
                .map(|dir| dir.join(file_name))
                .collect();
            Arc::new(NativeLibrary::load(&candidates)?)
        } else {
            NativeLibrary::global()?
        };
        Self::with_library(library, config)
    }

    /// Create an engine on an already-loaded library.
    pub fn with_library(library: Arc<NativeLibrary>, config: EngineConfig) -> OcrResult<Self> {
        let handle = EngineHandle::initialize(
            library,
            &config.det_model,
            &config.cls_model,
            &config.rec_model,
            config.keys.as_deref(),
            config.thread_count,
        )?;
        Ok(OcrEngine { handle, config })
    }

    /// Detect text in an image file with the path defaults.
    ///
    /// Returns the recognized lines joined by newlines; an image without text
    /// gives an empty string.
    pub fn detect(&self, image_path: impl AsRef<Path>) -> OcrResult<String> {
        self.detect_with(image_path, "", &OcrParams::path_defaults())
    }

    /// Detect text in an image file with explicit parameters.
    pub fn detect_with(
        &self,
        image_path: impl AsRef<Path>,
        image_name: &str,
        params: &OcrParams,
    ) -> OcrResult<String> {
        params.validate()?;
        let bytes =
            marshal::detect_from_path(&self.handle, image_path.as_ref(), image_name, params)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Detect text boxes in an encoded color image with the in-memory defaults
    /// (no recognition).
    pub fn detect_from_bytes(&self, image_bytes: &[u8]) -> OcrResult<DetectionResult> {
        self.detect_from_bytes_with(
            image_bytes,
            Channels::Color,
            &OcrParams::bytes_defaults(),
            false,
        )
    }

    /// Detect in an encoded image with explicit parameters.
    pub fn detect_from_bytes_with(
        &self,
        image_bytes: &[u8],
        channels: Channels,
        params: &OcrParams,
        recognize: bool,
    ) -> OcrResult<DetectionResult> {
        params.validate()?;
        marshal::detect_from_bytes(&self.handle, image_bytes, channels, params, recognize)
    }

    /// Detect in any supported input.
    pub fn detect_input(
        &self,
        input: &ImageInput,
        params: &OcrParams,
        recognize: bool,
    ) -> OcrResult<DetectionResult> {
        params.validate()?;
        marshal::detect_input(&self.handle, input, params, recognize)
    }

    /// Detect in an already-decoded image, passed as an RGB bitmap.
    pub fn detect_image(
        &self,
        image: &DynamicImage,
        params: &OcrParams,
        recognize: bool,
    ) -> OcrResult<DetectionResult> {
        self.detect_input(&ImageInput::from_image(image), params, recognize)
    }

    /// Destroy the native engine now. Later calls are no-ops; later detects
    /// fail with `UseAfterTeardown`.
    pub fn release(&self) {
        self.handle.release();
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }

    /// Get configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Library this engine runs on
    pub fn library(&self) -> &Arc<NativeLibrary> {
        self.handle.library()
    }
}
