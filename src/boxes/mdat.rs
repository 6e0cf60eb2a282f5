use std::fmt;
use std::io;

use crate::boxes::prelude::*;
use crate::io::DataRef;

def_box! {
    /// 8.1.1 Media Data Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    MediaDataBox {
        data:   MediaData,
    },
    fourcc => "mdat",
    version => [],
    impls => [ basebox, boxinfo, debug ],
}

/// Raw media data.
///
/// When the input has a backing file, the payload stays on disk and
/// is referenced through a `DataRef`; otherwise it is held in memory.
#[derive(Clone)]
pub struct MediaData(MediaData_, u64);

#[derive(Clone)]
enum MediaData_ {
    DataRef(DataRef),
    Data(Vec<u8>),
}

impl FromBytes for MediaDataBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<MediaDataBox> {
        let mut reader = BoxReader::new(stream)?;
        let size = reader.left();
        let offset = reader.pos();
        let data = if reader.input_filename().is_some() {
            let data_ref = DataRef::from_bytes_limit(&mut reader, size)?;
            MediaData(MediaData_::DataRef(data_ref), offset)
        } else {
            let mut v = Vec::new();
            v.extend_from_slice(reader.read(size)?);
            MediaData(MediaData_::Data(v), offset)
        };
        Ok(MediaDataBox { data })
    }
    fn min_size() -> usize {
        8
    }
}

impl ToBytes for MediaDataBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        // Write the header by hand: mdat is the one box that can
        // need a largesize.
        let fourcc = FourCC::new("mdat");
        let mut box_size = self.data.len() + 8;
        if self.data.is_large() {
            box_size += 8;
            1u32.to_bytes(stream)?;
            fourcc.to_bytes(stream)?;
            box_size.to_bytes(stream)?;
        } else {
            (box_size as u32).to_bytes(stream)?;
            fourcc.to_bytes(stream)?;
        }
        self.data.to_bytes(stream)
    }
}

impl MediaData {
    fn is_large(&self) -> bool {
        match &self.0 {
            MediaData_::DataRef(d) => d.is_large(),
            MediaData_::Data(d) => d.len() > (u32::MAX - 16) as usize,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> u64 {
        match &self.0 {
            MediaData_::DataRef(d) => d.len(),
            MediaData_::Data(d) => d.len() as u64,
        }
    }

    /// Offset of the payload, relative to the start of the input file.
    pub fn offset(&self) -> u64 {
        self.1
    }

    /// Add data.
    pub fn push(&mut self, data: &[u8]) {
        match &mut self.0 {
            MediaData_::DataRef(_) => panic!("cannot push onto MediaData::DataRef"),
            MediaData_::Data(d) => d.extend_from_slice(data),
        }
    }
}

impl Default for MediaData {
    fn default() -> MediaData {
        MediaData(MediaData_::Data(Vec::new()), 0)
    }
}

impl fmt::Debug for MediaData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0 {
            MediaData_::DataRef(d) => d.fmt(f),
            MediaData_::Data(d) => write!(f, "[u8; {}]", d.len()),
        }
    }
}

impl ToBytes for MediaData {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        match &self.0 {
            MediaData_::DataRef(d) => d.to_bytes(stream),
            MediaData_::Data(d) => stream.write(&d[..]),
        }
    }
}

impl FromBytes for MediaData {
    /// Unused; MediaDataBox has its own FromBytes.
    fn from_bytes<R: ReadBytes>(_stream: &mut R) -> io::Result<Self> {
        Err(ioerr!(InvalidInput, "MediaData::from_bytes"))
    }
    fn min_size() -> usize {
        0
    }
}
