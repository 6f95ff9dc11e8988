//! Encoding sinks.
//!
//! Sinks consume composed frames and mixed program audio in output order and produce the encoded
//! artifact bytes.

/// `ffmpeg`-based sink (MP4/WebM output via system `ffmpeg`).
pub mod ffmpeg;
/// Output container and codec selection.
pub mod format;
/// Sink trait and built-in sinks.
pub mod sink;
