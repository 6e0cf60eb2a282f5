//! File read/write.
//!
use std::convert::TryInto;
use std::fs;
use std::io::{self, ErrorKind};
use std::os::unix::fs::FileExt;
use std::sync::Arc;

use memmap::{Mmap, MmapOptions};

use crate::serialize::{BoxBytes, FromBytes, ReadBytes, ToBytes, WriteBytes};

struct FileSegment {
    start: u64,
    len:   u64,
    map:   Mmap,
}

/// Reads a container file.
///
/// Implements `ReadBytes`, so can be passed to `MP4::read`.
///
/// The file is `mmap`ed, except for the payload of `mdat` boxes,
/// which is reached through a [`DataRef`] instead. Pass
/// `mmap_all = true` for files with many small `mdat`s (CMAF style).
pub struct Mp4File {
    file:           Arc<fs::File>,
    pos:            u64,
    size:           u64,
    segments:       Vec<FileSegment>,
    input_filename: Option<String>,
}

impl Mp4File {
    /// Open a container file.
    pub fn open(path: impl AsRef<str>, mmap_all: bool) -> io::Result<Mp4File> {
        let path = path.as_ref();
        let file = fs::File::open(path)?;
        let size = file.metadata()?.len();

        let mut segs = Vec::<(u64, u64)>::new();
        if mmap_all {
            segs.push((0, size));
        } else {
            // Build a list of segments that leaves out the payload
            // part of the mdat boxes.
            segs.push((0, 0));
            let mut pos = 0;
            while let Some((boxtype, boxpos, boxsize)) = next_box(&file, &mut pos, size)? {
                if &boxtype == b"mdat" {
                    segs.last_mut().unwrap().1 += 16;
                    segs.push((boxpos + boxsize, 0));
                } else {
                    segs.last_mut().unwrap().1 += boxsize;
                }
            }
        }

        let mut segments = Vec::new();
        for seg in &segs {
            if seg.1 == 0 {
                break;
            }
            let map = unsafe { MmapOptions::new().offset(seg.0).len(seg.1 as usize).map(&file)? };
            segments.push(FileSegment {
                start: seg.0,
                len:   seg.1,
                map,
            });
        }

        Ok(Mp4File {
            segments,
            file: Arc::new(file),
            pos: 0,
            size,
            input_filename: Some(path.to_string()),
        })
    }

    /// Get a reference to the filehandle.
    pub fn file(&self) -> Arc<fs::File> {
        self.file.clone()
    }

    #[inline]
    fn map(&self, amount: u64) -> io::Result<(usize, usize)> {
        for idx in 0..self.segments.len() {
            let seg = &self.segments[idx];
            if self.pos >= seg.start && self.pos < seg.start + seg.len {
                if self.pos + amount > seg.start + seg.len {
                    return Err(ioerr!(InvalidInput, "read over mapped segment boundary"));
                }
                return Ok((idx, (self.pos - seg.start) as usize));
            }
        }
        Err(ioerr!(InvalidInput, "read request outside of any mapped segment"))
    }
}

// Walk the top-level boxes of the file.
fn next_box(file: &fs::File, pos: &mut u64, filesize: u64) -> io::Result<Option<([u8; 4], u64, u64)>> {
    if *pos + 15 >= filesize {
        return Ok(None);
    }
    let mut buf = [0u8; 16];
    file.read_exact_at(&mut buf[..], *pos)?;
    let boxtype = &buf[4..8];
    let mut boxsize = u32::from_be_bytes(buf[0..4].try_into().unwrap()) as u64;
    if boxsize == 0 {
        boxsize = filesize - *pos;
    } else if boxsize == 1 {
        boxsize = u64::from_be_bytes(buf[8..16].try_into().unwrap());
    }
    let xpos = *pos;
    *pos += boxsize;
    Ok(Some((boxtype.try_into().unwrap(), xpos, boxsize)))
}

impl ReadBytes for Mp4File {
    #[inline]
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        let (seg, offset) = self.map(amount)?;
        self.pos += amount;
        Ok(&self.segments[seg].map[offset..offset + amount as usize])
    }

    #[inline]
    fn peek(&mut self, amount: u64) -> io::Result<&[u8]> {
        let (seg, offset) = self.map(amount)?;
        Ok(&self.segments[seg].map[offset..offset + amount as usize])
    }

    #[inline]
    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if self.pos + amount > self.size {
            return Err(ioerr!(UnexpectedEof, "tried to seek past eof"));
        }
        self.pos += amount;
        Ok(())
    }

    #[inline]
    fn left(&mut self) -> u64 {
        if self.pos > self.size {
            0
        } else {
            self.size - self.pos
        }
    }
}

impl BoxBytes for Mp4File {
    #[inline]
    fn pos(&mut self) -> u64 {
        self.pos
    }

    #[inline]
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.size {
            return Err(ioerr!(UnexpectedEof, "tried to seek past eof"));
        }
        self.pos = pos;
        Ok(())
    }

    #[inline]
    fn size(&self) -> u64 {
        self.size
    }

    fn input_filename(&self) -> Option<&str> {
        self.input_filename.as_ref().map(|s| s.as_str())
    }
}

/// Reference to a range of an open file.
///
/// The payload of an `mdat` box is not `mmap`ed; it is referenced by a
/// `DataRef` and read with `read_at` when needed, so that we don't map
/// gigabytes of media data for nothing.
pub struct DataRef {
    pub(crate) file: Arc<fs::File>,
    start:           u64,
    end:             u64,
}

impl DataRef {
    /// Not the `FromBytes` trait method; this one takes the range size.
    pub(crate) fn from_bytes_limit<R: ReadBytes>(stream: &mut R, data_size: u64) -> io::Result<DataRef> {
        let start = stream.pos();
        stream.skip(data_size)?;
        let file = match stream.input_filename() {
            Some(name) => Arc::new(fs::File::open(name)?),
            None => return Err(ioerr!(InvalidInput, "DataRef: no backing file")),
        };
        Ok(DataRef {
            file,
            start,
            end: start + data_size,
        })
    }

    /// Number of bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Does it need a large box.
    pub fn is_large(&self) -> bool {
        self.len() > u32::MAX as u64 - 16
    }

    pub fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        self.file.read_exact_at(buf, offset + self.start)
    }
}

impl ToBytes for DataRef {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        if self.start == self.end {
            return Ok(());
        }
        let mut buf = Vec::new();
        buf.resize(std::cmp::min((self.end - self.start) as usize, 128000), 0);

        let mut pos = self.start;
        while pos < self.end {
            let to_read = std::cmp::min(buf.len() as u64, self.end - pos) as usize;
            let nread = self.file.read_at(&mut buf[..to_read], pos)?;
            if nread == 0 {
                return Err(io::Error::new(ErrorKind::UnexpectedEof, "Unexpected EOF"));
            }
            stream.write(&buf[..nread])?;
            pos += nread as u64;
        }
        Ok(())
    }
}

impl Clone for DataRef {
    fn clone(&self) -> Self {
        DataRef {
            file:  self.file.clone(),
            start: self.start,
            end:   self.end,
        }
    }
}

impl std::fmt::Debug for DataRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "DataRef{{ start: {}, end: {} }}", self.start, self.end)
    }
}

/// Count bytes, don't actually write.
#[derive(Debug, Default)]
pub struct CountBytes {
    pos: usize,
    max: usize,
}

impl CountBytes {
    pub fn new() -> CountBytes {
        CountBytes { pos: 0, max: 0 }
    }
}

impl WriteBytes for CountBytes {
    fn write(&mut self, newdata: &[u8]) -> io::Result<()> {
        self.pos += newdata.len();
        if self.max < self.pos {
            self.max = self.pos;
        }
        Ok(())
    }

    fn skip(&mut self, amount: u64) -> io::Result<()> {
        self.pos += amount as usize;
        if self.max < self.pos {
            self.max = self.pos;
        }
        Ok(())
    }
}

impl BoxBytes for CountBytes {
    fn pos(&mut self) -> u64 {
        self.pos as u64
    }
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = pos as usize;
        Ok(())
    }
    fn size(&self) -> u64 {
        self.max as u64
    }
}

/// Memory buffer that implements WriteBytes.
#[derive(Debug, Default)]
pub struct MemBuffer {
    data: Vec<u8>,
    pos:  usize,
}

impl MemBuffer {
    pub fn new() -> MemBuffer {
        MemBuffer {
            data: Vec::new(),
            pos:  0,
        }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl WriteBytes for MemBuffer {
    fn write(&mut self, newdata: &[u8]) -> io::Result<()> {
        let mut newdata = newdata;
        if self.pos < self.data.len() {
            let len = std::cmp::min(self.data.len() - self.pos, newdata.len());
            self.data[self.pos..self.pos + len].copy_from_slice(&newdata[..len]);
            newdata = &newdata[len..];
            self.pos += len;
        }
        if newdata.len() > 0 {
            self.data.extend_from_slice(newdata);
            self.pos = self.data.len();
        }
        Ok(())
    }

    fn skip(&mut self, amount: u64) -> io::Result<()> {
        self.pos += amount as usize;
        if self.pos > self.data.len() {
            self.data.resize(self.pos, 0);
        }
        Ok(())
    }
}

impl BoxBytes for MemBuffer {
    fn pos(&mut self) -> u64 {
        self.pos as u64
    }
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = pos as usize;
        if self.pos > self.data.len() {
            self.data.resize(self.pos, 0);
        }
        Ok(())
    }
    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// In-memory reader over an owned byte vector, with positions/seeks.
///
/// Used by tests and by callers that already have the file in memory.
pub struct MemReader {
    data: Vec<u8>,
    pos:  usize,
}

impl MemReader {
    pub fn new(data: Vec<u8>) -> MemReader {
        MemReader { data, pos: 0 }
    }
}

impl ReadBytes for MemReader {
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        let amount = amount as usize;
        if self.pos + amount > self.data.len() {
            return Err(ioerr!(UnexpectedEof));
        }
        let res = &self.data[self.pos..self.pos + amount];
        self.pos += amount;
        Ok(res)
    }
    fn peek(&mut self, amount: u64) -> io::Result<&[u8]> {
        let amount = amount as usize;
        if self.pos + amount > self.data.len() {
            return Err(ioerr!(UnexpectedEof));
        }
        Ok(&self.data[self.pos..self.pos + amount])
    }
    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if self.pos as u64 + amount > self.data.len() as u64 {
            return Err(ioerr!(UnexpectedEof));
        }
        self.pos += amount as usize;
        Ok(())
    }
    fn left(&mut self) -> u64 {
        (self.data.len() - self.pos) as u64
    }
}

impl BoxBytes for MemReader {
    fn pos(&mut self) -> u64 {
        self.pos as u64
    }
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.data.len() as u64 {
            return Err(ioerr!(UnexpectedEof));
        }
        self.pos = pos as usize;
        Ok(())
    }
    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl FromBytes for DataRef {
    /// Not implemented; use DataRef::from_bytes_limit.
    fn from_bytes<R: ReadBytes>(_stream: &mut R) -> io::Result<Self> {
        Err(ioerr!(InvalidInput, "DataRef::from_bytes: use from_bytes_limit"))
    }
    fn min_size() -> usize {
        0
    }
}
