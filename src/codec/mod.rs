pub mod color;
pub mod parse;
pub mod serialize;
pub mod video;

pub use parse::{ParseOptions, parse};
pub use serialize::serialize;

/// CAML namespace emitted on the document root.
pub const CAML_NAMESPACE: &str = "http://www.apple.com/CoreAnimation/1.0";

/// Last path component, lowercased, for image-reference identity.
pub(crate) fn normalize_filename(path: &str) -> String {
    path.rsplit('/')
        .next()
        .unwrap_or(path)
        .to_ascii_lowercase()
}

/// Compact scalar formatting for attribute values: whole numbers drop
/// the fraction, everything else keeps up to six decimals.
pub(crate) fn fmt_scalar(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let s = format!("{v:.6}");
        let s = s.trim_end_matches('0').trim_end_matches('.');
        s.to_string()
    }
}
