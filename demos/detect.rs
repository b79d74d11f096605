//! Detection demo
//!
//! Runs both entry points of the engine on one image: the path-based call that
//! returns recognized text, and the in-memory call that returns boxes.
//!
//! ```text
//! cargo run --example detect -- <image> <det model> <cls model> <rec model> [keys]
//! ```
//!
//! Set `RAPIDOCR_LIBRARY` to point at the native library if it is not next to
//! the executable.

use rapidocr_ffi::{Channels, EngineConfig, OcrEngine, OcrParams};
use std::env;
use std::error::Error;
use std::time::Instant;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 5 {
        eprintln!(
            "Usage: {} <image> <det model> <cls model> <rec model> [keys]",
            args[0]
        );
        std::process::exit(1);
    }

    let image_path = &args[1];
    let mut config = EngineConfig::new(&args[2], &args[3], &args[4]);
    if let Some(keys) = args.get(5) {
        config = config.with_keys(keys);
    }

    println!("=== RapidOcrOnnx demo ===\n");

    let start = Instant::now();
    let engine = OcrEngine::new(config)?;
    if let Some(path) = engine.library().path() {
        println!("Library: {}", path.display());
    }
    println!("Engine ready in {:?}\n", start.elapsed());

    // 1. Path based: aggregate text
    let start = Instant::now();
    let text = engine.detect(image_path)?;
    println!("--- Text ({:?}) ---", start.elapsed());
    if text.is_empty() {
        println!("(no text)");
    } else {
        println!("{text}");
    }

    // 2. In memory: text boxes with recognition
    let bytes = std::fs::read(image_path)?;
    let params = OcrParams::bytes_defaults().with_angle(true, false);
    let start = Instant::now();
    let result = engine.detect_from_bytes_with(&bytes, Channels::Color, &params, true)?;
    println!(
        "\n--- {} blocks ({:?}, native {:.1}ms) ---",
        result.len(),
        start.elapsed(),
        result.detect_time()
    );
    for (i, block) in result.iter().enumerate() {
        let corners: Vec<(f64, f64)> = block.box_points().iter().map(|&p| p.into()).collect();
        println!(
            "[{i}] score={:.3} angle={} {:?} {}",
            block.box_score(),
            block.angle_index(),
            corners,
            block.text()
        );
    }

    engine.release();
    Ok(())
}
