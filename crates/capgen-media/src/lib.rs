//! FFmpeg integration for media conversion.
//!
//! The worker uses this crate for exactly one thing: extracting the audio
//! track from an uploaded video before transcription. The command builder
//! and runner are general enough to cover that without growing a full
//! transcoding surface.

pub mod command;
pub mod error;
pub mod extract;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use extract::{extract_audio, DEFAULT_CONVERSION_TIMEOUT_SECS};
