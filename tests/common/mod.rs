//! In-process stand-in for the RapidOcrOnnx library
//!
//! Every entry point counts its calls and records its arguments in process
//! globals. Tests take [`lock`] first, which serializes them and resets the
//! state.

#![allow(dead_code)]

use std::ffi::CStr;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use libc::{c_char, c_int, c_ulonglong, c_void};
use parking_lot::{Mutex, MutexGuard};

use rapidocr_ffi::ffi::{OcrApi, OcrInput, OcrParam, OcrPoint, OcrResultRaw, TextBlockRaw};
use rapidocr_ffi::{EngineConfig, NativeLibrary, OcrEngine};

/// Handle value returned by the stub `OcrInit`
pub const STUB_HANDLE: usize = 0x1;

pub static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);
pub static DETECT_CALLS: AtomicUsize = AtomicUsize::new(0);
pub static DETECT_INPUT_CALLS: AtomicUsize = AtomicUsize::new(0);
pub static GET_RESULT_CALLS: AtomicUsize = AtomicUsize::new(0);
pub static FREE_CALLS: AtomicUsize = AtomicUsize::new(0);
pub static DESTROY_CALLS: AtomicUsize = AtomicUsize::new(0);

pub static INIT_FAILS: AtomicBool = AtomicBool::new(false);
pub static DETECT_OK: AtomicBool = AtomicBool::new(true);
pub static DETECT_INPUT_OK: AtomicBool = AtomicBool::new(true);
/// Value reported by `OcrGetLen`, terminator included
pub static RESULT_LEN: AtomicI32 = AtomicI32::new(0);
/// Blocks produced by a successful `OcrDetectInput`
pub static BLOCK_COUNT: AtomicUsize = AtomicUsize::new(0);
/// Character scores per produced block
pub static CHAR_SCORES: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub handle: usize,
    pub models: Vec<String>,
    /// `None` when `OcrInit` received a null keys pointer
    pub keys: Option<String>,
    pub threads: c_int,
    pub param: Option<OcrParam>,
    pub image_path: Option<String>,
    pub image_name: Option<String>,
    pub input: Option<InputSnapshot>,
    pub recognize: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputSnapshot {
    pub kind: c_int,
    pub channels: c_int,
    pub width: c_int,
    pub height: c_int,
    pub data: Vec<u8>,
}

pub static RECORDED: Mutex<Option<Recorded>> = parking_lot::const_mutex(None);

/// One-shot gate for the next `OcrDetect`: the stub waits on the first barrier
/// once it is inside the call, then on the second before returning.
pub static DETECT_GATE: Mutex<Option<Arc<(Barrier, Barrier)>>> = parking_lot::const_mutex(None);

/// Arm [`DETECT_GATE`] and return the pair the test waits on.
pub fn gate_next_detect() -> Arc<(Barrier, Barrier)> {
    let gate = Arc::new((Barrier::new(2), Barrier::new(2)));
    *DETECT_GATE.lock() = Some(Arc::clone(&gate));
    gate
}

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

/// Serialize the calling test against every other stub user and reset state.
pub fn lock() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock();
    for counter in [
        &INIT_CALLS,
        &DETECT_CALLS,
        &DETECT_INPUT_CALLS,
        &GET_RESULT_CALLS,
        &FREE_CALLS,
        &DESTROY_CALLS,
        &BLOCK_COUNT,
        &CHAR_SCORES,
    ] {
        counter.store(0, Ordering::SeqCst);
    }
    INIT_FAILS.store(false, Ordering::SeqCst);
    DETECT_OK.store(true, Ordering::SeqCst);
    DETECT_INPUT_OK.store(true, Ordering::SeqCst);
    RESULT_LEN.store(0, Ordering::SeqCst);
    *DETECT_GATE.lock() = None;
    *RECORDED.lock() = Some(Recorded::default());
    guard
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

pub fn recorded() -> Recorded {
    RECORDED.lock().clone().unwrap_or_default()
}

fn record(f: impl FnOnce(&mut Recorded)) {
    f(RECORDED.lock().get_or_insert_with(Recorded::default))
}

unsafe fn string_at(p: *const c_char) -> Option<String> {
    if p.is_null() {
        None
    } else {
        Some(CStr::from_ptr(p).to_string_lossy().into_owned())
    }
}

unsafe extern "C" fn stub_init(
    det: *const c_char,
    cls: *const c_char,
    rec: *const c_char,
    keys: *const c_char,
    threads: c_int,
) -> *mut c_void {
    INIT_CALLS.fetch_add(1, Ordering::SeqCst);
    let models = [det, cls, rec]
        .into_iter()
        .map(|p| string_at(p).unwrap_or_default())
        .collect();
    let keys = string_at(keys);
    record(|r| {
        r.models = models;
        r.keys = keys;
        r.threads = threads;
    });
    if INIT_FAILS.load(Ordering::SeqCst) {
        ptr::null_mut()
    } else {
        STUB_HANDLE as *mut c_void
    }
}

unsafe extern "C" fn stub_detect(
    handle: *mut c_void,
    img_path: *const c_char,
    img_name: *const c_char,
    param: *mut OcrParam,
) -> c_char {
    DETECT_CALLS.fetch_add(1, Ordering::SeqCst);
    let (path, name, param) = (string_at(img_path), string_at(img_name), *param);
    record(|r| {
        r.handle = handle as usize;
        r.image_path = path;
        r.image_name = name;
        r.param = Some(param);
    });
    let gate = DETECT_GATE.lock().take();
    if let Some(gate) = gate {
        gate.0.wait();
        gate.1.wait();
    }
    DETECT_OK.load(Ordering::SeqCst) as c_char
}

unsafe extern "C" fn stub_get_len(_: *mut c_void) -> c_int {
    RESULT_LEN.load(Ordering::SeqCst)
}

/// Fills `buf_len - 1` letters followed by a terminator.
unsafe extern "C" fn stub_get_result(_: *mut c_void, buf: *mut c_char, buf_len: c_int) -> c_char {
    GET_RESULT_CALLS.fetch_add(1, Ordering::SeqCst);
    if buf.is_null() || buf_len <= 0 {
        return 0;
    }
    let out = std::slice::from_raw_parts_mut(buf as *mut u8, buf_len as usize);
    for (i, b) in out.iter_mut().enumerate() {
        *b = b'a' + (i % 26) as u8;
    }
    out[out.len() - 1] = 0;
    1
}

unsafe extern "C" fn stub_detect_input(
    handle: *mut c_void,
    input: *mut OcrInput,
    param: *mut OcrParam,
    result: *mut OcrResultRaw,
    recognize: bool,
) -> c_char {
    DETECT_INPUT_CALLS.fetch_add(1, Ordering::SeqCst);
    let input = &*input;
    let snapshot = InputSnapshot {
        kind: input.kind,
        channels: input.channels,
        width: input.width,
        height: input.height,
        data: std::slice::from_raw_parts(input.data, input.data_length as usize).to_vec(),
    };
    let param = *param;
    record(|r| {
        r.handle = handle as usize;
        r.input = Some(snapshot);
        r.param = Some(param);
        r.recognize = Some(recognize);
    });
    if !DETECT_INPUT_OK.load(Ordering::SeqCst) {
        return 0;
    }

    let count = BLOCK_COUNT.load(Ordering::SeqCst);
    let scores = CHAR_SCORES.load(Ordering::SeqCst);
    let blocks: Box<[TextBlockRaw]> = (0..count).map(|i| make_block(i, scores)).collect();
    let result = &mut *result;
    result.db_net_time = 12.5;
    result.detect_time = 40.0;
    result.text_blocks_length = blocks.len() as c_ulonglong;
    result.text_blocks = if blocks.is_empty() {
        ptr::null_mut()
    } else {
        Box::into_raw(blocks) as *mut TextBlockRaw
    };
    1
}

fn make_block(index: usize, scores: usize) -> TextBlockRaw {
    let points: Box<[OcrPoint]> = (0..4)
        .map(|k| OcrPoint {
            x: (index * 10 + k) as f64,
            y: index as f64,
        })
        .collect();
    let text = format!("line {index}\0").into_bytes().into_boxed_slice();
    let char_scores: Box<[f32]> = vec![0.5; scores].into_boxed_slice();

    TextBlockRaw {
        box_point_length: points.len() as c_ulonglong,
        box_point: Box::into_raw(points) as *mut OcrPoint,
        box_score: 0.9,
        angle_index: 0,
        angle_score: 0.8,
        angle_time: 0.5,
        text_length: text.len() as c_ulonglong,
        text: Box::into_raw(text) as *mut u8,
        char_scores_length: char_scores.len() as c_ulonglong,
        char_scores: Box::into_raw(char_scores) as *mut f32,
        crnn_time: 1.5,
        block_time: 2.0,
    }
}

unsafe fn reclaim<T>(p: *mut T, len: c_ulonglong) {
    if !p.is_null() {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(p, len as usize)));
    }
}

/// Releases what `stub_detect_input` allocated.
unsafe extern "C" fn stub_free_result(result: *mut OcrResultRaw) -> c_char {
    FREE_CALLS.fetch_add(1, Ordering::SeqCst);
    let result = &mut *result;
    if !result.text_blocks.is_null() {
        let blocks =
            std::slice::from_raw_parts(result.text_blocks, result.text_blocks_length as usize);
        for block in blocks {
            reclaim(block.box_point, block.box_point_length);
            reclaim(block.text, block.text_length);
            reclaim(block.char_scores, block.char_scores_length);
        }
        reclaim(result.text_blocks, result.text_blocks_length);
    }
    result.text_blocks = ptr::null_mut();
    result.text_blocks_length = 0;
    1
}

unsafe extern "C" fn stub_destroy(_: *mut c_void) {
    DESTROY_CALLS.fetch_add(1, Ordering::SeqCst);
}

pub fn stub_api() -> OcrApi {
    OcrApi {
        OcrInit: stub_init,
        OcrDetect: stub_detect,
        OcrDetectInput: stub_detect_input,
        OcrFreeResult: stub_free_result,
        OcrGetLen: stub_get_len,
        OcrGetResult: stub_get_result,
        OcrDestroy: stub_destroy,
    }
}

pub fn stub_library() -> Arc<NativeLibrary> {
    // SAFETY: the stub functions are plain Rust items with 'static lifetime.
    Arc::new(unsafe { NativeLibrary::from_api(stub_api()) })
}

pub fn stub_config() -> EngineConfig {
    EngineConfig::new("det.onnx", "cls.onnx", "rec.onnx")
}

pub fn stub_engine() -> OcrEngine {
    OcrEngine::with_library(stub_library(), stub_config()).unwrap()
}
