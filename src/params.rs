//! Detection tuning parameters

use serde::Serialize;

use crate::error::{OcrError, OcrResult};
use crate::ffi::OcrParam;

/// Detection parameters passed to the native engine on every call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OcrParams {
    /// White border added around the image before detection (pixels)
    pub padding: i32,
    /// Longest side the image is scaled to; 0 or larger than the image keeps its size
    pub max_side_len: i32,
    /// Minimum score for a detected box to be kept
    pub box_score_thresh: f32,
    /// Binarization threshold of the detection map
    pub box_thresh: f32,
    /// Expansion ratio applied to detected boxes
    pub unclip_ratio: f32,
    /// Run the angle classifier
    pub do_angle: bool,
    /// Apply the majority angle to all boxes
    pub most_angle: bool,
}

impl Default for OcrParams {
    fn default() -> Self {
        Self::path_defaults()
    }
}

impl OcrParams {
    /// Create parameters with the path-based defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults used by path-based detection
    pub fn path_defaults() -> Self {
        OcrParams {
            padding: 50,
            max_side_len: 1024,
            box_score_thresh: 0.6,
            box_thresh: 0.3,
            unclip_ratio: 2.0,
            do_angle: true,
            most_angle: true,
        }
    }

    /// Defaults used by in-memory detection
    pub fn bytes_defaults() -> Self {
        OcrParams {
            padding: 0,
            max_side_len: 2000,
            box_score_thresh: 0.3,
            box_thresh: 0.5,
            unclip_ratio: 1.6,
            do_angle: false,
            most_angle: false,
        }
    }

    /// Set padding
    pub fn with_padding(mut self, padding: i32) -> Self {
        self.padding = padding;
        self
    }

    /// Set maximum side length
    pub fn with_max_side_len(mut self, len: i32) -> Self {
        self.max_side_len = len;
        self
    }

    /// Set box score threshold
    pub fn with_box_score_thresh(mut self, thresh: f32) -> Self {
        self.box_score_thresh = thresh;
        self
    }

    /// Set box threshold
    pub fn with_box_thresh(mut self, thresh: f32) -> Self {
        self.box_thresh = thresh;
        self
    }

    /// Set unclip ratio
    pub fn with_unclip_ratio(mut self, ratio: f32) -> Self {
        self.unclip_ratio = ratio;
        self
    }

    /// Enable/disable angle classification
    pub fn with_angle(mut self, do_angle: bool, most_angle: bool) -> Self {
        self.do_angle = do_angle;
        self.most_angle = most_angle;
        self
    }

    /// Check that every field is in the range the native engine accepts
    pub fn validate(&self) -> OcrResult<()> {
        if self.padding < 0 {
            return Err(OcrError::InvalidParameter(format!(
                "padding must not be negative, got {}",
                self.padding
            )));
        }
        for (name, value) in [
            ("box_score_thresh", self.box_score_thresh),
            ("box_thresh", self.box_thresh),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(OcrError::InvalidParameter(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if !(self.unclip_ratio > 0.0) {
            return Err(OcrError::InvalidParameter(format!(
                "unclip_ratio must be positive, got {}",
                self.unclip_ratio
            )));
        }
        Ok(())
    }

    pub(crate) fn to_ffi(&self) -> OcrParam {
        OcrParam {
            padding: self.padding,
            max_side_len: self.max_side_len,
            box_score_thresh: self.box_score_thresh,
            box_thresh: self.box_thresh,
            un_clip_ratio: self.unclip_ratio,
            do_angle: self.do_angle as i32,
            most_angle: self.most_angle as i32,
        }
    }

    /// Read parameters back from their native layout
    pub fn from_ffi(raw: &OcrParam) -> Self {
        OcrParams {
            padding: raw.padding,
            max_side_len: raw.max_side_len,
            box_score_thresh: raw.box_score_thresh,
            box_thresh: raw.box_thresh,
            unclip_ratio: raw.un_clip_ratio,
            do_angle: raw.do_angle != 0,
            most_angle: raw.most_angle != 0,
        }
    }
}
