//! Native engine handle
//!
//! Owns the opaque pointer returned by `OcrInit`. Every native call that uses
//! the pointer, and the final `OcrDestroy`, runs under the same lock, so a
//! teardown can never overlap an in-flight detect.

use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;

use libc::c_void;
use parking_lot::Mutex;

use crate::error::{OcrError, OcrResult};
use crate::loader::NativeLibrary;

/// Exclusive owner of one native engine instance
pub struct EngineHandle {
    library: Arc<NativeLibrary>,
    // `None` once released.
    raw: Mutex<Option<NonNull<c_void>>>,
}

impl EngineHandle {
    /// Create a native engine from model files.
    ///
    /// # Parameters
    /// - `det_model`, `cls_model`, `rec_model`: detection, angle and recognition models
    /// - `keys`: character dictionary; `None` passes a null pointer, an empty
    ///   path passes an empty string, anything else is made absolute
    /// - `thread_count`: inference threads, must be positive
    pub fn initialize(
        library: Arc<NativeLibrary>,
        det_model: &Path,
        cls_model: &Path,
        rec_model: &Path,
        keys: Option<&Path>,
        thread_count: i32,
    ) -> OcrResult<Self> {
        if thread_count <= 0 {
            return Err(OcrError::InvalidParameter(format!(
                "thread_count must be positive, got {thread_count}"
            )));
        }

        let det = path_to_cstring(&absolute(det_model)?)?;
        let cls = path_to_cstring(&absolute(cls_model)?)?;
        let rec = path_to_cstring(&absolute(rec_model)?)?;
        let keys = match keys {
            None => None,
            Some(p) if p.as_os_str().is_empty() => Some(CString::default()),
            Some(p) => Some(path_to_cstring(&absolute(p)?)?),
        };

        let raw = unsafe {
            (library.api().OcrInit)(
                det.as_ptr(),
                cls.as_ptr(),
                rec.as_ptr(),
                keys.as_ref().map_or(std::ptr::null(), |k| k.as_ptr()),
                thread_count,
            )
        };

        let raw = NonNull::new(raw).ok_or_else(|| {
            OcrError::EngineInit(format!(
                "OcrInit returned null (det={}, cls={}, rec={})",
                det_model.display(),
                cls_model.display(),
                rec_model.display()
            ))
        })?;

        log::info!("OCR engine initialized with {thread_count} threads");
        Ok(EngineHandle {
            library,
            raw: Mutex::new(Some(raw)),
        })
    }

    /// Run `f` with the native pointer while holding the handle lock.
    pub(crate) fn with_raw<R>(
        &self,
        f: impl FnOnce(&NativeLibrary, *mut c_void) -> OcrResult<R>,
    ) -> OcrResult<R> {
        let guard = self.raw.lock();
        match *guard {
            Some(raw) => f(&self.library, raw.as_ptr()),
            None => {
                log::error!("OCR engine used after teardown");
                Err(OcrError::UseAfterTeardown)
            }
        }
    }

    /// Destroy the native engine.
    ///
    /// Returns `true` for the call that performed the teardown and `false`
    /// for every later one.
    pub fn release(&self) -> bool {
        let mut guard = self.raw.lock();
        match guard.take() {
            Some(raw) => {
                unsafe { (self.library.api().OcrDestroy)(raw.as_ptr()) };
                log::debug!("OCR engine destroyed");
                true
            }
            None => false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.raw.lock().is_none()
    }

    pub fn library(&self) -> &Arc<NativeLibrary> {
        &self.library
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.release();
    }
}

// The pointer is only dereferenced by native code, always under `raw`'s lock.
unsafe impl Send for EngineHandle {}
unsafe impl Sync for EngineHandle {}

pub(crate) fn absolute(path: &Path) -> OcrResult<PathBuf> {
    Ok(std::path::absolute(path)?)
}

pub(crate) fn path_to_cstring(path: &Path) -> OcrResult<CString> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = path
        .to_str()
        .ok_or_else(|| {
            OcrError::InvalidParameter(format!("path is not valid UTF-8: {}", path.display()))
        })?
        .as_bytes()
        .to_vec();

    CString::new(bytes).map_err(|_| {
        OcrError::InvalidParameter(format!("path contains a NUL byte: {}", path.display()))
    })
}
