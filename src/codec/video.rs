//! Video layers store a decoded frame-sequence description, never the
//! literal list of frame filenames. The decoder recovers the pattern
//! by diffing consecutive filenames for a numeric suffix.

use crate::model::layer::{CalculationMode, VideoFrames};

/// Zero-padding used when frame names are regenerated on serialize.
pub(crate) const FRAME_PAD: usize = 4;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FrameSequence {
    pub prefix: String,
    pub extension: String,
    pub start: u32,
    pub pad: usize,
    pub count: u32,
}

/// Split `"bg/frame_0042.png"` into `("bg/frame_", "0042", "png")`.
fn split_name(name: &str) -> Option<(&str, &str, &str)> {
    let (stem, ext) = name.rsplit_once('.')?;
    let digits_at = stem
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let digits = &stem[digits_at..];
    if digits.is_empty() || ext.is_empty() {
        return None;
    }
    Some((&stem[..digits_at], digits, ext))
}

/// Detect a sequential pattern across every filename: shared prefix and
/// extension, indices increasing by exactly one.
pub(crate) fn detect_sequence(names: &[String]) -> Option<FrameSequence> {
    let (first, rest) = names.split_first()?;
    let (prefix, digits, ext) = split_name(first)?;
    let start: u32 = digits.parse().ok()?;

    for (offset, name) in rest.iter().enumerate() {
        let (p, d, e) = split_name(name)?;
        if p != prefix || e != ext {
            return None;
        }
        let idx: u32 = d.parse().ok()?;
        if idx != start.checked_add(offset as u32 + 1)? {
            return None;
        }
    }

    Some(FrameSequence {
        prefix: prefix.to_string(),
        extension: ext.to_string(),
        start,
        pad: digits.len(),
        count: names.len() as u32,
    })
}

/// Decode a `contents` keyframe animation's image references into the
/// stored video description.
pub(crate) fn video_from_contents(
    names: &[String],
    duration_seconds: f64,
    auto_reverses: bool,
    calculation_mode: CalculationMode,
) -> Option<VideoFrames> {
    let seq = detect_sequence(names)?;
    let fps = if duration_seconds > 0.0 {
        f64::from(seq.count) / duration_seconds
    } else {
        30.0
    };
    Some(VideoFrames {
        frame_count: seq.count,
        fps,
        duration_seconds,
        frame_prefix: seq.prefix,
        frame_extension: seq.extension,
        auto_reverses,
        calculation_mode,
    })
}

/// Regenerate the frame filenames for a stored video description.
pub(crate) fn contents_names(video: &VideoFrames) -> Vec<String> {
    (0..video.frame_count)
        .map(|i| video.frame_name(i, FRAME_PAD))
        .collect()
}
