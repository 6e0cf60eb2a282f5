//! Read, write and reorganize ISOBMFF / QTFF containers.
//!
//! The crate parses a file's box tree into typed boxes, exposes
//! per-track sample timelines suitable for reading, editing, and
//! remuxing, and serializes everything back into a conformant file.
//! It also recovers the codec-specific configuration records some
//! audio elementary streams need (`dac3`, `dec3`, `ddts`, the MPEG-4
//! `AudioSpecificConfig`).
//!
//! Reading a file and walking one track's samples:
//!
//! ```no_run
//! use isobmff::{Mp4File, Timeline, MP4};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let path = std::env::args().nth(1).expect("expected filename");
//!
//!     let mut reader = Mp4File::open(&path, false)?;
//!     let mp4 = MP4::read(&mut reader)?;
//!     println!("{:#?}", isobmff::track::track_info(&mp4));
//!
//!     let mut timeline = Timeline::construct(&mp4, 1)?;
//!     for n in 1..=timeline.sample_count() {
//!         let sample = timeline.read_sample(&mut reader, n)?;
//!         println!("{}: dts {} cts {} bytes {}", n, sample.dts, sample.cts, sample.length);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! A `Timeline` borrows nothing from the `MP4` it was built from; the
//! sample data is read on demand through the reader. For concurrency,
//! build one `MP4` per thread; nothing here is shared.
#[macro_use]
mod ioerr;
#[macro_use]
#[doc(hidden)]
pub mod macros;
#[macro_use]
pub mod serialize;
#[macro_use]
pub mod types;
mod bitreader;
pub mod boxes;
pub mod cache;
pub mod codecs;
pub mod error;
pub mod io;
pub mod mp4box;
pub mod summary;
pub mod timeline;
pub mod track;

pub use crate::error::{Error, Result};
pub use crate::io::Mp4File;
pub use crate::mp4box::MP4;
pub use crate::summary::Summary;
pub use crate::timeline::Timeline;
