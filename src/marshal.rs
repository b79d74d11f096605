//! Request marshaling
//!
//! Turns Rust-side inputs into the structures the native detect calls expect.
//! Any buffer handed to native code by address is owned here for the whole
//! call.

use std::path::{Path, PathBuf};

use libc::{c_char, c_int, c_long};

use crate::engine::{absolute, path_to_cstring, EngineHandle};
use crate::error::{OcrError, OcrResult};
use crate::ffi::{self, OcrInput, OcrResultRaw, INPUT_TYPE_BITMAP, INPUT_TYPE_ENCODED};
use crate::params::OcrParams;
use crate::result::DetectionResult;
use crate::unmarshal::{unmarshal, NativeResult};

/// Color layout of an encoded image, used by the native decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channels {
    /// Decode as single-channel grayscale
    Gray,
    /// Decode as three-channel color
    #[default]
    Color,
}

impl Channels {
    pub fn count(self) -> i32 {
        match self {
            Channels::Gray => 1,
            Channels::Color => 3,
        }
    }
}

/// Image handed to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum ImageInput {
    /// Image file on disk
    File(PathBuf),
    /// Encoded image file (PNG, JPEG, ...) held in memory
    Encoded { data: Vec<u8>, channels: Channels },
    /// Raw interleaved pixels, row-major, RGB or RGBA order
    Bitmap {
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
    },
}

impl ImageInput {
    pub fn file(path: impl AsRef<Path>) -> Self {
        ImageInput::File(path.as_ref().to_path_buf())
    }

    pub fn encoded(data: impl Into<Vec<u8>>) -> Self {
        ImageInput::Encoded {
            data: data.into(),
            channels: Channels::Color,
        }
    }

    /// RGB8 copy of a decoded image
    pub fn from_image(image: &image::DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        ImageInput::Bitmap {
            data: rgb.into_raw(),
            width,
            height,
            channels: 3,
        }
    }
}

/// Input buffer staged for one `OcrDetectInput` call.
///
/// The bytes live in a boxed slice whose heap address does not change when the
/// `StagedInput` is moved; `raw.data` is pointed at it right before the call.
pub(crate) struct StagedInput {
    buffer: Box<[u8]>,
    raw: OcrInput,
}

impl StagedInput {
    pub(crate) fn new(input: &ImageInput) -> OcrResult<Self> {
        match input {
            ImageInput::File(path) => {
                let data = std::fs::read(path)?;
                Self::stage(data, INPUT_TYPE_ENCODED, Channels::Color.count(), 0, 0)
            }
            ImageInput::Encoded { data, channels } => Self::encoded(data, *channels),
            ImageInput::Bitmap {
                data,
                width,
                height,
                channels,
            } => {
                if !matches!(*channels, 1 | 3 | 4) {
                    return Err(OcrError::InvalidParameter(format!(
                        "bitmap must have 1, 3 or 4 channels, got {channels}"
                    )));
                }
                let expected = (*width as u64) * (*height as u64) * (*channels as u64);
                if data.len() as u64 != expected {
                    return Err(OcrError::InvalidParameter(format!(
                        "bitmap {width}x{height}x{channels} needs {expected} bytes, got {}",
                        data.len()
                    )));
                }
                let width = c_int::try_from(*width)
                    .map_err(|_| OcrError::InvalidParameter(format!("width {width} too large")))?;
                let height = c_int::try_from(*height).map_err(|_| {
                    OcrError::InvalidParameter(format!("height {height} too large"))
                })?;
                Self::stage(
                    data.clone(),
                    INPUT_TYPE_BITMAP,
                    *channels as c_int,
                    width,
                    height,
                )
            }
        }
    }

    pub(crate) fn encoded(data: &[u8], channels: Channels) -> OcrResult<Self> {
        Self::stage(data.to_vec(), INPUT_TYPE_ENCODED, channels.count(), 0, 0)
    }

    fn stage(
        data: Vec<u8>,
        kind: c_int,
        channels: c_int,
        width: c_int,
        height: c_int,
    ) -> OcrResult<Self> {
        if data.is_empty() {
            return Err(OcrError::InvalidParameter("image data is empty".to_string()));
        }
        let data_length = c_long::try_from(data.len()).map_err(|_| {
            OcrError::InvalidParameter(format!("image of {} bytes is too large", data.len()))
        })?;

        let raw = OcrInput {
            data: std::ptr::null_mut(),
            kind,
            channels,
            width,
            height,
            data_length,
        };
        Ok(StagedInput {
            buffer: data.into_boxed_slice(),
            raw,
        })
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut OcrInput {
        self.raw.data = self.buffer.as_mut_ptr();
        &mut self.raw
    }

    #[cfg(test)]
    pub(crate) fn raw(&mut self) -> &OcrInput {
        self.as_mut_ptr();
        &self.raw
    }
}

/// Path-based detection; returns the engine's aggregate text bytes.
///
/// The text is read back with `OcrGetLen` + `OcrGetResult` while the engine
/// lock is still held. A reported length of 0 or 1 (terminator only) yields an
/// empty buffer. The returned bytes stop before the first NUL.
pub fn detect_from_path(
    engine: &EngineHandle,
    image_path: &Path,
    image_name: &str,
    params: &OcrParams,
) -> OcrResult<Vec<u8>> {
    let path = path_to_cstring(&absolute(image_path)?)?;
    let name = std::ffi::CString::new(image_name).map_err(|_| {
        OcrError::InvalidParameter(format!("image name contains a NUL byte: {image_name:?}"))
    })?;
    let mut param = params.to_ffi();

    engine.with_raw(|lib, raw| {
        let api = lib.api();
        let ok = unsafe { (api.OcrDetect)(raw, path.as_ptr(), name.as_ptr(), &mut param) };
        if !ffi::succeeded(ok) {
            return Err(OcrError::DetectionFailed(format!(
                "OcrDetect failed for {}",
                image_path.display()
            )));
        }

        let len = unsafe { (api.OcrGetLen)(raw) };
        log::debug!("OcrDetect({}) produced {len} bytes", image_path.display());
        if len <= 1 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; len as usize];
        let ok = unsafe { (api.OcrGetResult)(raw, buffer.as_mut_ptr() as *mut c_char, len) };
        if !ffi::succeeded(ok) {
            return Err(OcrError::DetectionFailed(
                "OcrGetResult could not copy the result text".to_string(),
            ));
        }
        if let Some(end) = buffer.iter().position(|&b| b == 0) {
            buffer.truncate(end);
        }
        Ok(buffer)
    })
}

/// Detection on an encoded image held in memory.
///
/// Width and height are sent as 0 so the engine takes them from the decoded
/// image.
pub fn detect_from_bytes(
    engine: &EngineHandle,
    image_bytes: &[u8],
    channels: Channels,
    params: &OcrParams,
    recognize: bool,
) -> OcrResult<DetectionResult> {
    detect_staged(engine, StagedInput::encoded(image_bytes, channels)?, params, recognize)
}

/// Detection on any [`ImageInput`]; files are read and sent as encoded bytes.
pub fn detect_input(
    engine: &EngineHandle,
    input: &ImageInput,
    params: &OcrParams,
    recognize: bool,
) -> OcrResult<DetectionResult> {
    detect_staged(engine, StagedInput::new(input)?, params, recognize)
}

/// A failed native call returns `DetectionFailed` and the result structure is
/// left untouched; a successful one is always freed exactly once.
fn detect_staged(
    engine: &EngineHandle,
    mut staged: StagedInput,
    params: &OcrParams,
    recognize: bool,
) -> OcrResult<DetectionResult> {
    let mut param = params.to_ffi();

    engine.with_raw(|lib, raw| {
        let api = lib.api();
        let mut result = OcrResultRaw::default();
        let ok = unsafe {
            (api.OcrDetectInput)(raw, staged.as_mut_ptr(), &mut param, &mut result, recognize)
        };
        if !ffi::succeeded(ok) {
            return Err(OcrError::DetectionFailed(
                "OcrDetectInput reported failure".to_string(),
            ));
        }

        let native = unsafe { NativeResult::new(api, &mut result) };
        let detection = unmarshal(native)?;
        log::debug!(
            "OcrDetectInput found {} blocks in {:.1}ms",
            detection.len(),
            detection.detect_time()
        );
        Ok(detection)
    })
}
