use std::io;

use crate::boxes::prelude::*;

/// 8.7.5 Chunk Offset Box (ISO/IEC 14496-12:2015(E))
///
/// Implements both "stco" and "co64".
#[derive(Clone, Debug, Default)]
pub struct ChunkOffsetBox {
    fourcc:      FourCC,
    pub entries: ArrayUnsized<u64>,
}
pub type ChunkLargeOffsetBox = ChunkOffsetBox;

impl ChunkOffsetBox {
    pub fn new() -> ChunkOffsetBox {
        ChunkOffsetBox {
            fourcc:  FourCC::new("stco"),
            entries: ArrayUnsized::new(),
        }
    }

    /// Check all the offsets and switch to co64 if needed.
    pub fn check_sizes(&mut self) {
        if self.entries.iter().any(|e| *e > 0xffffffff) {
            self.fourcc = FourCC::new("co64");
        }
    }
}

impl FromBytes for ChunkOffsetBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<ChunkOffsetBox> {
        let mut reader = BoxReader::new(stream)?;
        let fourcc = reader.header.fourcc;
        let stream = &mut reader;

        let count = u32::from_bytes(stream)?;
        let mut entries = ArrayUnsized::new();
        while entries.len() < count as usize && stream.left() >= 4 {
            if fourcc == b"co64" {
                entries.push(u64::from_bytes(stream)?);
            } else {
                entries.push(u32::from_bytes(stream)? as u64);
            }
        }

        Ok(ChunkOffsetBox { fourcc, entries })
    }

    fn min_size() -> usize {
        16
    }
}

impl ToBytes for ChunkOffsetBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        (self.entries.len() as u32).to_bytes(stream)?;
        for e in &self.entries {
            if self.fourcc == b"co64" {
                e.to_bytes(stream)?;
            } else {
                ((*e & 0xffffffff) as u32).to_bytes(stream)?;
            }
        }

        writer.finalize()
    }
}

impl BoxInfo for ChunkOffsetBox {
    const FOURCC: &'static str = "stco";

    #[inline]
    fn fourcc(&self) -> FourCC {
        if self.fourcc == FourCC::default() {
            FourCC::new("stco")
        } else {
            self.fourcc
        }
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(0)
    }
}

impl FullBox for ChunkOffsetBox {
    fn version(&self) -> Option<u8> {
        Some(0)
    }
}
