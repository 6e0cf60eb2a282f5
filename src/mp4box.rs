//! Box header parsing/serialization, plus the `MP4` top-level type.
//!
//! Wire format of a box header:
//!
//! ```text
//! box_header := size:u32be
//!               fourcc:u32be
//!               [ largesize:u64be         if size == 1 ]
//!               [ usertype:16 bytes       if fourcc == 'uuid' ]
//!               [ version:u8, flags:u24be if fullbox ]
//! ```
//!
//! `size == 0` means "extends to the end of the file". Whether a box is
//! a fullbox is decided by a static per-fourcc table (the typed boxes
//! declare it); one well-known contextual exception, `cprt`, is always
//! a fullbox here since we only model it below `udta`.
use std::convert::TryInto;
use std::fmt::Debug;
use std::io;

use crate::boxes::MP4Box;
use crate::serialize::{BoxBytes, FromBytes, ReadBytes, ToBytes, WriteBytes};
use crate::types::{FourCC, Uuid};

/// Implemented by every box.
pub trait BoxInfo {
    /// The primary fourcc of this box type.
    const FOURCC: &'static str = "";

    /// The fourcc of this box value.
    fn fourcc(&self) -> FourCC;

    /// Highest FullBox version we understand. `None` for baseboxes.
    fn max_version() -> Option<u8>
    where
        Self: Sized,
    {
        None
    }
}

/// FullBox version/flags.
///
/// Baseboxes use the default impl (`version()` is `None`).
pub trait FullBox {
    /// Version of the box to be written, `None` for baseboxes.
    fn version(&self) -> Option<u8> {
        None
    }
    /// 24 bit flags value.
    fn flags(&self) -> u32 {
        0
    }
}

/// Decoded box header.
#[derive(Clone, Debug)]
pub struct BoxHeader {
    /// Total on-disk size of the box, header included. 0 if it runs to EOF.
    pub size:        u64,
    pub fourcc:      FourCC,
    /// usertype, present when fourcc is 'uuid'.
    pub uuid:        Option<Uuid>,
    pub version:     Option<u8>,
    pub flags:       u32,
    pub max_version: Option<u8>,
    /// Number of header bytes consumed.
    pub header_len:  u64,
}

impl BoxHeader {
    /// Read a box header. Consumes the header bytes.
    pub fn read(stream: &mut impl ReadBytes) -> io::Result<BoxHeader> {
        let size1 = u32::from_bytes(stream)?;
        let fourcc = FourCC::from_bytes(stream)?;
        let mut header_len = 8u64;
        let size = match size1 {
            // "extends to the end of the file".
            0 => stream.left() + 8,
            1 => {
                header_len += 8;
                u64::from_bytes(stream)?
            },
            x => x as u64,
        };
        let uuid = if fourcc == b"uuid" {
            header_len += 16;
            Some(Uuid::from_bytes(stream)?)
        } else {
            None
        };
        let max_version = if uuid.is_none() {
            MP4Box::max_version_from_fourcc(fourcc)
        } else {
            None
        };
        let (version, flags) = if max_version.is_some() {
            header_len += 4;
            let version = u8::from_bytes(stream)?;
            let b = stream.read(3)?;
            let flags = ((b[0] as u32) << 16) | ((b[1] as u32) << 8) | (b[2] as u32);
            (Some(version), flags)
        } else {
            (None, 0)
        };
        if size < header_len {
            return Err(ioerr!(InvalidData, "{}: header larger than box ({} < {})", fourcc, size, header_len));
        }
        Ok(BoxHeader {
            size,
            fourcc,
            uuid,
            version,
            flags,
            max_version,
            header_len,
        })
    }

    /// Read a box header without advancing the stream.
    ///
    /// Peeks no further than the header itself: the body may not be
    /// readable yet (an mdat payload is not mapped, for one).
    pub fn peek(stream: &mut impl ReadBytes) -> io::Result<BoxHeader> {
        let needed = {
            let first = stream.peek(8)?;
            let size1 = u32::from_be_bytes(first[0..4].try_into().unwrap());
            let fourcc = FourCC::from(&first[4..8]);
            let mut needed = 8u64;
            if size1 == 1 {
                needed += 8;
            }
            if fourcc == b"uuid" {
                needed += 16;
            } else if MP4Box::max_version_from_fourcc(fourcc).is_some() {
                needed += 4;
            }
            needed
        };
        let amount = std::cmp::min(stream.left(), needed);
        let mut peeked = stream.peek(amount)?;
        BoxHeader::read(&mut peeked)
    }
}

/// Is this box type a fullbox (version + flags in the header)?
pub fn is_fullbox(fourcc: FourCC) -> bool {
    MP4Box::max_version_from_fourcc(fourcc).is_some()
}

/// Reads one box: header plus a size-limited view of the body.
///
/// When the reader is dropped, any unread part of the body is skipped,
/// so the stream is positioned at the next box.
pub struct BoxReader<'a> {
    pub header:   BoxHeader,
    maxsize:      u64,
    prev_version: u8,
    inner:        Box<dyn ReadBytes + 'a>,
}

impl<'a> BoxReader<'a> {
    /// Read the box header, then return a size-limited reader.
    pub fn new(stream: &'a mut impl ReadBytes) -> io::Result<BoxReader<'a>> {
        let start = stream.pos();
        let header = BoxHeader::read(stream)?;
        let maxsize = std::cmp::min(stream.size(), start + header.size);
        log::trace!(
            "BoxReader {}: size {} maxsize {} left {}",
            header.fourcc,
            header.size,
            maxsize,
            stream.left()
        );
        Ok(BoxReader {
            prev_version: stream.version(),
            header,
            maxsize,
            inner: Box::new(stream),
        })
    }
}

impl<'a> Drop for BoxReader<'a> {
    fn drop(&mut self) {
        let pos = self.inner.pos();
        if pos < self.maxsize {
            log::trace!("BoxReader {} drop: skipping {}", self.header.fourcc, self.maxsize - pos);
            let _ = self.inner.skip(self.maxsize - pos);
        }
    }
}

impl<'a> ReadBytes for BoxReader<'a> {
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        let amount = if amount == 0 { self.left() } else { amount };
        if amount == 0 {
            return Ok(b"");
        }
        if self.inner.pos() + amount > self.maxsize {
            return Err(ioerr!(UnexpectedEof));
        }
        self.inner.read(amount)
    }
    fn peek(&mut self, amount: u64) -> io::Result<&[u8]> {
        if self.inner.pos() + amount > self.maxsize {
            return Err(ioerr!(UnexpectedEof));
        }
        self.inner.peek(amount)
    }
    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if self.inner.pos() + amount > self.maxsize {
            return Err(ioerr!(UnexpectedEof));
        }
        self.inner.skip(amount)
    }
    fn left(&mut self) -> u64 {
        let pos = self.inner.pos();
        if pos > self.maxsize {
            0
        } else {
            self.maxsize - pos
        }
    }
}

impl<'a> BoxBytes for BoxReader<'a> {
    fn pos(&mut self) -> u64 {
        self.inner.pos()
    }
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.maxsize {
            return Err(ioerr!(UnexpectedEof));
        }
        self.inner.seek(pos)
    }
    fn size(&self) -> u64 {
        self.maxsize
    }
    fn version(&self) -> u8 {
        self.header.version.unwrap_or(self.prev_version)
    }
    fn flags(&self) -> u32 {
        self.header.flags
    }
    fn fourcc(&self) -> FourCC {
        self.header.fourcc
    }
    fn input_filename(&self) -> Option<&str> {
        self.inner.input_filename()
    }
}

/// Writes one box: a provisional header, then the body.
///
/// `finalize` seeks back and patches the size field. It runs from
/// `Drop` if not called explicitly.
pub struct BoxWriter<'a> {
    offset:    u64,
    version:   Option<u8>,
    flags:     u32,
    fourcc:    FourCC,
    inner:     Box<dyn WriteBytes + 'a>,
    finalized: bool,
}

impl<'a> BoxWriter<'a> {
    pub fn new<B>(mut stream: impl WriteBytes + 'a, b: &B) -> io::Result<BoxWriter<'a>>
    where
        B: BoxInfo + FullBox,
    {
        let offset = stream.pos();
        let fourcc = b.fourcc();
        0u32.to_bytes(&mut stream)?;
        fourcc.to_bytes(&mut stream)?;
        let version = b.version();
        let flags = b.flags();
        if let Some(version) = version {
            version.to_bytes(&mut stream)?;
            let b = [(flags >> 16) as u8, (flags >> 8) as u8, flags as u8];
            stream.write(&b[..])?;
        }
        Ok(BoxWriter {
            offset,
            version,
            flags,
            fourcc,
            inner: Box::new(stream),
            finalized: false,
        })
    }

    /// Patch the box size into the provisional header.
    pub fn finalize(&mut self) -> io::Result<()> {
        self.finalized = true;
        let pos = self.inner.pos();
        let sz = pos - self.offset;
        if sz > u32::MAX as u64 {
            return Err(ioerr!(InvalidData, "{}: box too large ({})", self.fourcc, sz));
        }
        self.inner.seek(self.offset)?;
        self.inner.write(&(sz as u32).to_be_bytes()[..])?;
        self.inner.seek(pos)?;
        Ok(())
    }
}

impl<'a> Drop for BoxWriter<'a> {
    fn drop(&mut self) {
        if !self.finalized {
            self.finalize().unwrap();
        }
    }
}

impl<'a> WriteBytes for BoxWriter<'a> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write(data)
    }
    fn skip(&mut self, amount: u64) -> io::Result<()> {
        self.inner.skip(amount)
    }
}

impl<'a> BoxBytes for BoxWriter<'a> {
    fn pos(&mut self) -> u64 {
        self.inner.pos()
    }
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.inner.seek(pos)
    }
    fn version(&self) -> u8 {
        self.version.unwrap_or(0)
    }
    fn flags(&self) -> u32 {
        self.flags
    }
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
}

/// Any box we do not recognize is preserved verbatim in a GenericBox.
///
/// If the unknown box was classified as a fullbox (known fourcc, but a
/// version we don't support), the version/flags that were consumed with
/// the header are kept so the box round-trips byte-exactly.
#[derive(Clone)]
pub struct GenericBox {
    pub fourcc: FourCC,
    pub uuid:   Option<Uuid>,
    version:    Option<u8>,
    flags:      u32,
    pub data:   Vec<u8>,
}

impl FromBytes for GenericBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<GenericBox> {
        let mut reader = BoxReader::new(stream)?;
        let size = reader.left();
        let data = if size > 0 {
            reader.read(size)?.to_vec()
        } else {
            Vec::new()
        };
        Ok(GenericBox {
            fourcc: reader.header.fourcc,
            uuid: reader.header.uuid.clone(),
            version: reader.header.version,
            flags: reader.header.flags,
            data,
        })
    }
    fn min_size() -> usize {
        8
    }
}

impl ToBytes for GenericBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        if let Some(uuid) = self.uuid.as_ref() {
            uuid.to_bytes(&mut writer)?;
        }
        writer.write(&self.data)?;
        writer.finalize()
    }
}

impl BoxInfo for GenericBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
}

impl FullBox for GenericBox {
    fn version(&self) -> Option<u8> {
        self.version
    }
    fn flags(&self) -> u32 {
        self.flags
    }
}

struct U8Array(usize);

impl Debug for U8Array {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[u8; {}]", &self.0)
    }
}

impl Debug for GenericBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("GenericBox");
        dbg.field("fourcc", &self.fourcc);
        if let Some(uuid) = self.uuid.as_ref() {
            dbg.field("uuid", uuid);
        }
        dbg.field("data", &U8Array(self.data.len()));
        dbg.finish()
    }
}

/// Read a collection of boxes from a stream.
pub fn read_boxes<R: ReadBytes>(mut file: R) -> io::Result<Vec<MP4Box>> {
    let mut boxes = Vec::new();
    while file.left() >= 8 {
        boxes.push(MP4Box::from_bytes(&mut file)?);
    }
    Ok(boxes)
}

/// A parsed container file: the top-level boxes.
pub struct MP4 {
    pub boxes:          Vec<MP4Box>,
    pub input_filename: Option<String>,
}

impl MP4 {
    /// Read the entire file.
    pub fn read<R: ReadBytes>(mut reader: R) -> io::Result<MP4> {
        let input_filename = reader.input_filename().map(|s| s.to_string());
        let boxes = read_boxes(&mut reader)?;
        Ok(MP4 {
            boxes,
            input_filename,
        })
    }

    /// Serialize all boxes back to a stream.
    pub fn write<W: WriteBytes>(&self, mut writer: W) -> io::Result<()> {
        for b in &self.boxes {
            b.to_bytes(&mut writer)?;
        }
        Ok(())
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> u64 {
        self.boxes.iter().map(|b| b.size()).sum()
    }

    /// Get a reference to the MovieBox.
    pub fn movie(&self) -> &crate::boxes::MovieBox {
        use crate::boxes::MovieBox;
        first_box!(&self.boxes, MovieBox).unwrap()
    }

    /// Get a mutable reference to the MovieBox.
    pub fn movie_mut(&mut self) -> &mut crate::boxes::MovieBox {
        use crate::boxes::MovieBox;
        first_box_mut!(&mut self.boxes, MovieBox).unwrap()
    }

    /// All movie fragments, in file order.
    pub fn movie_fragments(&self) -> Vec<&crate::boxes::MovieFragmentBox> {
        use crate::boxes::MovieFragmentBox;
        iter_box!(&self.boxes, MovieFragmentBox).collect()
    }

    /// The movie fragment random access index, if present.
    pub fn fragment_random_access(&self) -> Option<&crate::boxes::MovieFragmentRandomAccessBox> {
        use crate::boxes::MovieFragmentRandomAccessBox;
        first_box!(&self.boxes, MovieFragmentRandomAccessBox)
    }
}

impl Debug for MP4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("MP4").field("boxes", &self.boxes).finish()
    }
}
