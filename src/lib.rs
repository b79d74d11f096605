//! # RapidOCR FFI
//!
//! Safe Rust bindings for the RapidOcrOnnx OCR engine. The engine ships as a
//! shared library with a flat C API (`OcrInit`, `OcrDetect`, `OcrDetectInput`,
//! ...); this crate loads it at runtime, marshals requests into the native
//! structures and copies results back into owned Rust values.
//!
//! ## Quick Start
//!
//! ```ignore
//! use rapidocr_ffi::{EngineConfig, OcrEngine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = OcrEngine::new(
//!         EngineConfig::new(
//!             "models/ch_PP-OCRv4_det_infer.onnx",
//!             "models/ch_ppocr_mobile_v2.0_cls_infer.onnx",
//!             "models/ch_PP-OCRv4_rec_infer.onnx",
//!         )
//!         .with_keys("models/ppocr_keys_v1.txt"),
//!     )?;
//!
//!     // Path based: recognized lines as one string
//!     println!("{}", engine.detect("test.jpg")?);
//!
//!     // In memory: structured blocks
//!     let bytes = std::fs::read("test.jpg")?;
//!     for block in engine.detect_from_bytes(&bytes)? {
//!         println!("{:.2} {:?}", block.box_score(), block.box_points());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`ffi`]: C structure layouts and entry point signatures
//! - [`loader`]: library discovery, loading and symbol resolution ([`NativeLibrary`])
//! - [`engine`]: native engine handle with exactly-once teardown ([`EngineHandle`])
//! - [`marshal`]: request marshaling ([`ImageInput`], detect calls)
//! - [`ocr`]: high-level API ([`OcrEngine`])
//! - [`params`], [`result`], [`config`], [`error`]: data types
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        OcrEngine (High-Level API)       │
//! ├─────────────────────────────────────────┤
//! │   marshal (requests) │ unmarshal (results)│
//! ├─────────────────────────────────────────┤
//! │      EngineHandle (native instance)     │
//! ├─────────────────────────────────────────┤
//! │   NativeLibrary (libloading + OcrApi)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Threading
//!
//! `OcrEngine` is `Send + Sync`. Calls on one engine are serialized by a lock
//! because the native engine is not known to be reentrant; use several
//! engines for parallel work. With the `async` feature, [`AsyncOcrEngine`]
//! runs calls on tokio's blocking pool.

// Core modules
pub mod config;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod loader;
pub mod marshal;
pub mod ocr;
pub mod params;
pub mod result;
mod unmarshal;

#[cfg(feature = "async")]
pub mod nonblocking;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::EngineHandle;
pub use error::{OcrError, OcrResult};
pub use loader::{library_file_name, NativeLibrary};
pub use marshal::{Channels, ImageInput};
#[cfg(feature = "async")]
pub use nonblocking::AsyncOcrEngine;
pub use ocr::OcrEngine;
pub use params::OcrParams;
pub use result::{DetectionResult, Point, TextBlock};

/// Get library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
