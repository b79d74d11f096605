//! Native result unmarshaling
//!
//! `OcrDetectInput` fills an `OCR_RESULT` with memory owned by the native
//! library. [`NativeResult`] is the only place that memory is released: the
//! guard is created right after a successful detect call and calls
//! `OcrFreeResult` when dropped, after every copy has been taken and on every
//! error path.

use std::mem::size_of;

use libc::c_ulonglong;

use crate::error::{OcrError, OcrResult};
use crate::ffi::{self, OcrApi, OcrResultRaw, TextBlockRaw};
use crate::result::{DetectionResult, Point, TextBlock};

/// Scoped ownership of a native `OCR_RESULT`
pub(crate) struct NativeResult<'a> {
    api: OcrApi,
    raw: &'a mut OcrResultRaw,
}

impl<'a> NativeResult<'a> {
    /// # Safety
    ///
    /// `raw` must have been filled by a successful `OcrDetectInput` from the
    /// library behind `api`, and must not be freed by anyone else.
    pub(crate) unsafe fn new(api: &OcrApi, raw: &'a mut OcrResultRaw) -> Self {
        NativeResult { api: *api, raw }
    }
}

impl Drop for NativeResult<'_> {
    fn drop(&mut self) {
        let ok = unsafe { (self.api.OcrFreeResult)(&mut *self.raw) };
        if !ffi::succeeded(ok) {
            log::warn!("OcrFreeResult reported failure");
        }
    }
}

/// Copy everything out of `native` and release it.
pub(crate) fn unmarshal(native: NativeResult<'_>) -> OcrResult<DetectionResult> {
    let raw = &*native.raw;
    let raw_blocks =
        unsafe { borrow_slice(raw.text_blocks, raw.text_blocks_length, "text_blocks")? };

    let mut blocks = Vec::with_capacity(raw_blocks.len());
    for (i, block) in raw_blocks.iter().enumerate() {
        let block = unsafe { copy_block(block) }.map_err(|e| match e {
            OcrError::ResultDecode(msg) => OcrError::ResultDecode(format!("text block {i}: {msg}")),
            other => other,
        })?;
        blocks.push(block);
    }

    Ok(DetectionResult {
        blocks,
        db_net_time: raw.db_net_time,
        detect_time: raw.detect_time,
    })
    // `native` drops here and frees the result.
}

unsafe fn copy_block(raw: &TextBlockRaw) -> OcrResult<TextBlock> {
    let points = borrow_slice(raw.box_point, raw.box_point_length, "box_point")?;
    let text = borrow_slice(raw.text, raw.text_length, "text")?;
    let char_scores = borrow_slice(raw.char_scores, raw.char_scores_length, "char_scores")?;

    Ok(TextBlock {
        box_points: points.iter().map(|p| Point::new(p.x, p.y)).collect(),
        box_score: raw.box_score,
        angle_index: raw.angle_index,
        angle_score: raw.angle_score,
        angle_time: raw.angle_time,
        text: decode_text(text),
        char_scores: char_scores.to_vec(),
        crnn_time: raw.crnn_time,
        block_time: raw.block_time,
    })
}

/// View `len` native elements starting at `ptr`.
///
/// A zero length is always empty, whatever the pointer. A null pointer with a
/// non-zero length, or a length that cannot be addressed, is a decode error.
unsafe fn borrow_slice<'a, T>(
    ptr: *const T,
    len: c_ulonglong,
    field: &str,
) -> OcrResult<&'a [T]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(OcrError::ResultDecode(format!(
            "{field} is null but has length {len}"
        )));
    }
    let len = usize::try_from(len)
        .ok()
        .filter(|n| n.checked_mul(size_of::<T>()).is_some_and(|b| b <= isize::MAX as usize))
        .ok_or_else(|| OcrError::ResultDecode(format!("{field} length {len} is out of range")))?;
    Ok(std::slice::from_raw_parts(ptr, len))
}

/// Native text is UTF-8 that may carry trailing terminators. Those are
/// trimmed, interior NULs are dropped and invalid sequences substituted.
fn decode_text(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let text: Vec<u8> = bytes[..end].iter().copied().filter(|&b| b != 0).collect();
    String::from_utf8_lossy(&text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{OcrInput, OcrParam, OcrPoint};
    use libc::{c_char, c_int, c_void};
    use std::cell::Cell;
    use std::ptr;

    thread_local! {
        static FREES: Cell<usize> = const { Cell::new(0) };
    }

    unsafe extern "C" fn init(
        _: *const c_char,
        _: *const c_char,
        _: *const c_char,
        _: *const c_char,
        _: c_int,
    ) -> *mut c_void {
        ptr::null_mut()
    }
    unsafe extern "C" fn detect(
        _: *mut c_void,
        _: *const c_char,
        _: *const c_char,
        _: *mut OcrParam,
    ) -> c_char {
        0
    }
    unsafe extern "C" fn detect_input(
        _: *mut c_void,
        _: *mut OcrInput,
        _: *mut OcrParam,
        _: *mut OcrResultRaw,
        _: bool,
    ) -> c_char {
        0
    }
    unsafe extern "C" fn free_result(_: *mut OcrResultRaw) -> c_char {
        FREES.with(|f| f.set(f.get() + 1));
        1
    }
    unsafe extern "C" fn get_len(_: *mut c_void) -> c_int {
        0
    }
    unsafe extern "C" fn get_result(_: *mut c_void, _: *mut c_char, _: c_int) -> c_char {
        0
    }
    unsafe extern "C" fn destroy(_: *mut c_void) {}

    fn api() -> OcrApi {
        OcrApi {
            OcrInit: init,
            OcrDetect: detect,
            OcrDetectInput: detect_input,
            OcrFreeResult: free_result,
            OcrGetLen: get_len,
            OcrGetResult: get_result,
            OcrDestroy: destroy,
        }
    }

    fn frees() -> usize {
        FREES.with(|f| f.get())
    }

    struct OwnedBlock {
        points: Vec<OcrPoint>,
        text: Vec<u8>,
        scores: Vec<f32>,
    }

    impl OwnedBlock {
        fn raw(&mut self) -> TextBlockRaw {
            TextBlockRaw {
                box_point: self.points.as_mut_ptr(),
                box_score: 0.75,
                angle_index: 1,
                angle_score: 0.5,
                angle_time: 0.25,
                text: self.text.as_mut_ptr(),
                char_scores: self.scores.as_mut_ptr(),
                char_scores_length: self.scores.len() as c_ulonglong,
                box_point_length: self.points.len() as c_ulonglong,
                text_length: self.text.len() as c_ulonglong,
                crnn_time: 2.0,
                block_time: 2.25,
            }
        }
    }

    #[test]
    fn test_copies_block_and_frees_once() {
        let mut owned = OwnedBlock {
            points: (0..4).map(|i| OcrPoint { x: i as f64, y: 1.0 }).collect(),
            text: "héllo\0".as_bytes().to_vec(),
            scores: vec![0.9; 5],
        };
        let mut blocks = vec![owned.raw()];
        let mut raw = OcrResultRaw {
            db_net_time: 3.0,
            text_blocks: blocks.as_mut_ptr(),
            text_blocks_length: 1,
            detect_time: 7.5,
        };

        let before = frees();
        let api = api();
        let result = unmarshal(unsafe { NativeResult::new(&api, &mut raw) }).unwrap();
        assert_eq!(frees() - before, 1);

        assert_eq!(result.len(), 1);
        assert_eq!(result.db_net_time(), 3.0);
        assert_eq!(result.detect_time(), 7.5);
        let block = &result.blocks()[0];
        assert_eq!(block.text(), "héllo");
        assert_eq!(block.box_points().len(), 4);
        assert_eq!(block.box_points()[3], Point::new(3.0, 1.0));
        assert_eq!(block.char_scores().len(), 5);
        assert_eq!(block.angle_index(), 1);
        assert_eq!(block.block_time(), 2.25);
    }

    #[test]
    fn test_empty_result_still_frees() {
        let mut raw = OcrResultRaw::default();
        let before = frees();
        let api = api();
        let result = unmarshal(unsafe { NativeResult::new(&api, &mut raw) }).unwrap();
        assert!(result.is_empty());
        assert_eq!(frees() - before, 1);
    }

    #[test]
    fn test_null_blocks_with_length_is_decode_error() {
        let mut raw = OcrResultRaw {
            text_blocks_length: 2,
            ..OcrResultRaw::default()
        };
        let before = frees();
        let api = api();
        let err = unmarshal(unsafe { NativeResult::new(&api, &mut raw) }).unwrap_err();
        assert!(matches!(err, OcrError::ResultDecode(_)));
        assert_eq!(frees() - before, 1);
    }

    #[test]
    fn test_null_text_with_length_is_decode_error() {
        let mut owned = OwnedBlock {
            points: vec![OcrPoint::default(); 4],
            text: Vec::new(),
            scores: Vec::new(),
        };
        let mut block = owned.raw();
        block.text = ptr::null_mut();
        block.text_length = 3;
        let mut blocks = vec![block];
        let mut raw = OcrResultRaw {
            text_blocks: blocks.as_mut_ptr(),
            text_blocks_length: 1,
            ..OcrResultRaw::default()
        };

        let before = frees();
        let api = api();
        let err = unmarshal(unsafe { NativeResult::new(&api, &mut raw) }).unwrap_err();
        assert!(err.to_string().contains("text block 0"));
        assert_eq!(frees() - before, 1);
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text(b"abc\0\0"), "abc");
        assert_eq!(decode_text(b"ab\0cd"), "abcd");
        assert_eq!(decode_text(b"ab\0cd\0\0"), "abcd");
        assert_eq!(decode_text(b"\0\0"), "");
        assert_eq!(decode_text(b"a\xffb"), "a\u{FFFD}b");
        assert_eq!(decode_text(b""), "");
    }
}
