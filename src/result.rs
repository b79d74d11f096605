//! Owned detection results
//!
//! Everything here is a plain copy of native memory; none of it borrows from
//! the engine or from the native result it was read from.

use serde::Serialize;

/// Polygon vertex in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// One recognized text line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub(crate) box_points: Vec<Point>,
    pub(crate) box_score: f32,
    pub(crate) angle_index: i32,
    pub(crate) angle_score: f32,
    pub(crate) angle_time: f64,
    pub(crate) text: String,
    pub(crate) char_scores: Vec<f32>,
    pub(crate) crnn_time: f64,
    pub(crate) block_time: f64,
}

impl TextBlock {
    /// Recognized text; empty when recognition was not requested
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Detection box score
    pub fn box_score(&self) -> f32 {
        self.box_score
    }

    /// Box polygon, in native order
    pub fn box_points(&self) -> &[Point] {
        &self.box_points
    }

    /// Angle class index (1 means the line was rotated 180 degrees)
    pub fn angle_index(&self) -> i32 {
        self.angle_index
    }

    pub fn angle_score(&self) -> f32 {
        self.angle_score
    }

    /// Angle classification time in milliseconds
    pub fn angle_time(&self) -> f64 {
        self.angle_time
    }

    /// Per-glyph confidence; one entry per recognized character, not per byte
    pub fn char_scores(&self) -> &[f32] {
        &self.char_scores
    }

    /// Recognition time in milliseconds
    pub fn crnn_time(&self) -> f64 {
        self.crnn_time
    }

    /// Total time spent on this block in milliseconds
    pub fn block_time(&self) -> f64 {
        self.block_time
    }
}

/// Result of one in-memory detection call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionResult {
    pub(crate) blocks: Vec<TextBlock>,
    pub(crate) db_net_time: f64,
    pub(crate) detect_time: f64,
}

impl DetectionResult {
    /// Text blocks in the order the engine returned them
    pub fn blocks(&self) -> &[TextBlock] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<TextBlock> {
        self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TextBlock> {
        self.blocks.iter()
    }

    /// Detector network time in milliseconds
    pub fn db_net_time(&self) -> f64 {
        self.db_net_time
    }

    /// Whole detect call time in milliseconds
    pub fn detect_time(&self) -> f64 {
        self.detect_time
    }

    /// All block texts, one per line, each followed by a newline.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            out.push_str(&block.text);
            out.push('\n');
        }
        out
    }
}

impl IntoIterator for DetectionResult {
    type Item = TextBlock;
    type IntoIter = std::vec::IntoIter<TextBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

impl<'a> IntoIterator for &'a DetectionResult {
    type Item = &'a TextBlock;
    type IntoIter = std::slice::Iter<'a, TextBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
