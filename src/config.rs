//! Engine configuration

use std::path::{Path, PathBuf};

use crate::error::{OcrError, OcrResult};

/// Default inference thread count
pub const DEFAULT_THREADS: i32 = 4;

/// Model files and runtime settings for one [`OcrEngine`](crate::OcrEngine)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Text detection model
    pub det_model: PathBuf,
    /// Angle classification model
    pub cls_model: PathBuf,
    /// Text recognition model
    pub rec_model: PathBuf,
    /// Character dictionary; `None` lets the engine use the one embedded in
    /// the recognition model
    pub keys: Option<PathBuf>,
    /// Inference thread count
    pub thread_count: i32,
    /// Load the native library from exactly this file
    pub library_path: Option<PathBuf>,
    /// Directories searched for the native library, in order
    pub search_dirs: Vec<PathBuf>,
}

impl EngineConfig {
    /// Create configuration from the three required models
    pub fn new(
        det_model: impl AsRef<Path>,
        cls_model: impl AsRef<Path>,
        rec_model: impl AsRef<Path>,
    ) -> Self {
        EngineConfig {
            det_model: det_model.as_ref().to_path_buf(),
            cls_model: cls_model.as_ref().to_path_buf(),
            rec_model: rec_model.as_ref().to_path_buf(),
            keys: None,
            thread_count: DEFAULT_THREADS,
            library_path: None,
            search_dirs: Vec::new(),
        }
    }

    /// Set character dictionary path
    pub fn with_keys(mut self, keys: impl AsRef<Path>) -> Self {
        self.keys = Some(keys.as_ref().to_path_buf());
        self
    }

    /// Set thread count
    pub fn with_threads(mut self, threads: i32) -> Self {
        self.thread_count = threads;
        self
    }

    /// Load the native library from a fixed file
    pub fn with_library_path(mut self, path: impl AsRef<Path>) -> Self {
        self.library_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add a directory to search for the native library
    pub fn with_search_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.search_dirs.push(dir.as_ref().to_path_buf());
        self
    }

    /// Read configuration from `RAPIDOCR_*` environment variables.
    ///
    /// `RAPIDOCR_DET_MODEL`, `RAPIDOCR_CLS_MODEL` and `RAPIDOCR_REC_MODEL` are
    /// required; `RAPIDOCR_KEYS`, `RAPIDOCR_THREADS` and `RAPIDOCR_LIBRARY` are
    /// optional.
    pub fn from_env() -> OcrResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OcrResult<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| OcrError::InvalidParameter(format!("{key} is not set")))
        };

        let mut config = EngineConfig::new(
            required("RAPIDOCR_DET_MODEL")?,
            required("RAPIDOCR_CLS_MODEL")?,
            required("RAPIDOCR_REC_MODEL")?,
        );
        config.keys = lookup("RAPIDOCR_KEYS").map(PathBuf::from);
        config.library_path = lookup("RAPIDOCR_LIBRARY").map(PathBuf::from);
        if let Some(threads) = lookup("RAPIDOCR_THREADS") {
            config.thread_count = threads.parse().map_err(|_| {
                OcrError::InvalidParameter(format!("RAPIDOCR_THREADS is not a number: {threads}"))
            })?;
        }
        Ok(config)
    }
}
