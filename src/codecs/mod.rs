//! Codec-specific configuration record parsers.
//!
//! These recover the container's description boxes (`dac3`, `dec3`,
//! `ddts`, the MPEG-4 `AudioSpecificConfig`) from raw elementary
//! stream bytes. The byte-stream framing loops around them (ADTS,
//! raw AC-3 files, ...) live outside this crate.
pub mod ac3;
pub mod dts;
pub mod mp4a;
