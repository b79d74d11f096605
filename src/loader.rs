//! Native library discovery and symbol resolution
//!
//! The shared library is opened at runtime with `libloading`. All entry points
//! are resolved eagerly into an [`OcrApi`] table, so a library missing any of
//! them is rejected before an engine can be created.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use parking_lot::Mutex;

use crate::error::{OcrError, OcrResult};
use crate::ffi::{self, OcrApi};

/// Environment variable naming an explicit library file, tried first.
pub const LIBRARY_ENV: &str = "RAPIDOCR_LIBRARY";

/// File name of the native library for a `std::env::consts::OS` value.
pub fn library_file_name_for(os: &str) -> Option<&'static str> {
    match os {
        "windows" => Some("OcrLiteOnnx.dll"),
        "linux" => Some("libRapidOcrOnnx.so"),
        "macos" => Some("libOcrLiteOnnx.dylib"),
        _ => None,
    }
}

/// File name of the native library on the current platform.
pub fn library_file_name() -> OcrResult<&'static str> {
    library_file_name_for(std::env::consts::OS).ok_or_else(|| OcrError::LibraryNotFound {
        name: format!("<no RapidOcrOnnx build for {}>", std::env::consts::OS),
        searched: Vec::new(),
    })
}

/// Candidate locations relative to `base_dir`, in probing order.
pub fn default_candidates(base_dir: &Path, file_name: &str) -> Vec<PathBuf> {
    vec![
        base_dir.join(file_name),
        base_dir.join("build").join("Release").join(file_name),
        base_dir.join("build").join("Debug").join(file_name),
        base_dir.join("build").join(file_name),
        base_dir.join("lib").join(file_name),
        Path::new("/usr/local/lib").join(file_name),
        PathBuf::from(file_name),
    ]
}

/// Default candidates for this process: the `RAPIDOCR_LIBRARY` override, then
/// the locations around the running executable.
pub fn process_candidates() -> OcrResult<Vec<PathBuf>> {
    let file_name = library_file_name()?;
    let mut candidates = Vec::new();
    if let Some(path) = std::env::var_os(LIBRARY_ENV) {
        candidates.push(PathBuf::from(path));
    }
    let base_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    candidates.extend(default_candidates(&base_dir, file_name));
    Ok(candidates)
}

/// Probe `candidates` in order and return the first one that exists and that
/// `open` accepts.
///
/// Paths that do not exist are skipped without calling `open`; existing ones are
/// opened by their absolute path. If none exist
/// the error is `LibraryNotFound`; if some existed but every `open` failed, the
/// last failure is reported as `LibraryLoad`.
pub fn locate_with<T, E, F>(candidates: &[PathBuf], mut open: F) -> OcrResult<(PathBuf, T)>
where
    F: FnMut(&Path) -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut last_failure: Option<(PathBuf, String)> = None;

    for path in candidates {
        if !path.exists() {
            log::debug!("library candidate {} does not exist", path.display());
            continue;
        }
        // A bare file name would go through the dynamic loader's own search;
        // open the file that was just checked instead.
        let path = std::path::absolute(path).unwrap_or_else(|_| path.clone());
        match open(&path) {
            Ok(value) => return Ok((path, value)),
            Err(e) => {
                log::warn!("Failed to load library from {}: {}", path.display(), e);
                last_failure = Some((path.clone(), e.to_string()));
            }
        }
    }

    match last_failure {
        Some((path, reason)) => Err(OcrError::LibraryLoad { path, reason }),
        None => Err(OcrError::LibraryNotFound {
            name: candidates
                .first()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            searched: candidates.to_vec(),
        }),
    }
}

/// An opened RapidOcrOnnx library with every entry point resolved.
///
/// Read-only after construction and shared between engines through `Arc`.
pub struct NativeLibrary {
    api: OcrApi,
    path: Option<PathBuf>,
    // Keeps the code behind `api` mapped; must outlive every use of it.
    _library: Option<Library>,
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

static GLOBAL: Mutex<Option<Arc<NativeLibrary>>> = parking_lot::const_mutex(None);

impl NativeLibrary {
    /// Open the first usable library among `candidates`.
    pub fn load(candidates: &[PathBuf]) -> OcrResult<Self> {
        let (path, library) = locate_with(candidates, |path| {
            // SAFETY: loading runs the library's initializers; RapidOcrOnnx has
            // none with preconditions beyond being the library it claims to be.
            unsafe { Library::new(path) }
        })?;
        let api = unsafe { resolve(&library)? };
        log::info!("Loaded RapidOcrOnnx from {}", path.display());
        Ok(NativeLibrary {
            api,
            path: Some(path),
            _library: Some(library),
        })
    }

    /// Open the library at exactly `path`.
    pub fn open(path: impl AsRef<Path>) -> OcrResult<Self> {
        Self::load(&[path.as_ref().to_path_buf()])
    }

    /// Process-wide library, loaded on first use from [`process_candidates`].
    ///
    /// A successful load is kept for the life of the process. A failed load is
    /// returned to the caller and not remembered, so a later call retries.
    pub fn global() -> OcrResult<Arc<NativeLibrary>> {
        let mut slot = GLOBAL.lock();
        if let Some(lib) = slot.as_ref() {
            return Ok(Arc::clone(lib));
        }
        let lib = Arc::new(Self::load(&process_candidates()?)?);
        *slot = Some(Arc::clone(&lib));
        Ok(lib)
    }

    /// Wrap an already-resolved entry point table, e.g. functions linked into
    /// the current binary.
    ///
    /// # Safety
    ///
    /// Every pointer in `api` must implement the RapidOcrOnnx C ABI and stay
    /// callable for the lifetime of the returned value.
    pub unsafe fn from_api(api: OcrApi) -> Self {
        NativeLibrary {
            api,
            path: None,
            _library: None,
        }
    }

    /// Resolved entry points
    pub fn api(&self) -> &OcrApi {
        &self.api
    }

    /// File the library was loaded from, if it came from disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

unsafe fn resolve(library: &Library) -> OcrResult<OcrApi> {
    unsafe fn sym<T: Copy>(library: &Library, name: &'static str) -> OcrResult<T> {
        let mut symbol = Vec::with_capacity(name.len() + 1);
        symbol.extend_from_slice(name.as_bytes());
        symbol.push(0);
        library
            .get::<T>(&symbol)
            .map(|s| *s)
            .map_err(|e| OcrError::MissingSymbol {
                symbol: name,
                reason: e.to_string(),
            })
    }

    let [init, detect, detect_input, free_result, get_len, get_result, destroy] = ffi::SYMBOLS;
    Ok(OcrApi {
        OcrInit: sym(library, init)?,
        OcrDetect: sym(library, detect)?,
        OcrDetectInput: sym(library, detect_input)?,
        OcrFreeResult: sym(library, free_result)?,
        OcrGetLen: sym(library, get_len)?,
        OcrGetResult: sym(library, get_result)?,
        OcrDestroy: sym(library, destroy)?,
    })
}
