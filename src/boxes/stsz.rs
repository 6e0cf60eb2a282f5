use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.7.3.2 Sample Size Box (ISO/IEC 14496-12:2015(E))
    ///
    /// Either one constant `size` for every sample, or a per-sample
    /// table of `count` entries.
    #[derive(Default)]
    SampleSizeBox {
        size:    u32,
        count:   u32,
        entries: ArrayUnsized<u32>,
    },
    fourcc => "stsz",
    version => [0],
    impls => [ boxinfo, debug, fullbox ],
}

impl FromBytes for SampleSizeBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<SampleSizeBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let size = u32::from_bytes(stream)?;
        let count = u32::from_bytes(stream)?;

        let mut entries = ArrayUnsized::new();
        if size == 0 {
            while entries.len() < count as usize && stream.left() >= 4 {
                entries.push(u32::from_bytes(stream)?);
            }
            if entries.len() < count as usize {
                return Err(ioerr!(InvalidData, "stsz: truncated sample size table"));
            }
        }

        Ok(SampleSizeBox { size, count, entries })
    }

    fn min_size() -> usize {
        8
    }
}

impl ToBytes for SampleSizeBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        self.size.to_bytes(stream)?;
        if self.size != 0 {
            self.count.to_bytes(stream)?;
        } else {
            (self.entries.len() as u32).to_bytes(stream)?;
            for e in &self.entries {
                e.to_bytes(stream)?;
            }
        }

        writer.finalize()
    }
}

impl SampleSizeBox {
    /// Iterate over the size of every sample.
    pub fn iter(&self) -> SampleSizeIterator<'_> {
        SampleSizeIterator {
            size:    self.size,
            count:   self.count,
            entries: &self.entries[..],
            index:   0,
        }
    }

    /// Number of samples in the track.
    pub fn sample_count(&self) -> u32 {
        self.count
    }
}

pub struct SampleSizeIterator<'a> {
    size:    u32,
    count:   u32,
    entries: &'a [u32],
    index:   usize,
}

impl<'a> Iterator for SampleSizeIterator<'a> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.index == self.count as usize {
            return None;
        }
        self.index += 1;
        if self.entries.len() == 0 {
            Some(self.size)
        } else {
            Some(self.entries[self.index - 1])
        }
    }
}

def_box! {
    /// 8.7.3.3 Compact Sample Size Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    CompactSampleSizeBox {
        field_size: u8,
        count:      u32,
        entries:    ArrayUnsized<u32>,
    },
    fourcc => "stz2",
    version => [0],
    impls => [ boxinfo, debug, fullbox ],
}

impl FromBytes for CompactSampleSizeBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<CompactSampleSizeBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        stream.skip(3)?;
        let field_size = u8::from_bytes(stream)?;
        let count = u32::from_bytes(stream)?;

        let mut entries = ArrayUnsized::new();
        match field_size {
            4 => {
                for _ in 0..(count as usize + 1) / 2 {
                    let b = u8::from_bytes(stream)?;
                    entries.push((b >> 4) as u32);
                    if entries.len() < count as usize {
                        entries.push((b & 0x0f) as u32);
                    }
                }
            },
            8 => {
                for _ in 0..count {
                    entries.push(u8::from_bytes(stream)? as u32);
                }
            },
            16 => {
                for _ in 0..count {
                    entries.push(u16::from_bytes(stream)? as u32);
                }
            },
            sz => return Err(ioerr!(InvalidData, "stz2: bad field size {}", sz)),
        }

        Ok(CompactSampleSizeBox {
            field_size,
            count,
            entries,
        })
    }

    fn min_size() -> usize {
        8
    }
}

impl ToBytes for CompactSampleSizeBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        stream.skip(3)?;
        self.field_size.to_bytes(stream)?;
        (self.entries.len() as u32).to_bytes(stream)?;
        match self.field_size {
            4 => {
                let mut iter = self.entries.iter();
                while let Some(hi) = iter.next() {
                    let lo = iter.next().copied().unwrap_or(0);
                    (((*hi << 4) | (lo & 0x0f)) as u8).to_bytes(stream)?;
                }
            },
            8 => {
                for e in &self.entries {
                    (*e as u8).to_bytes(stream)?;
                }
            },
            16 => {
                for e in &self.entries {
                    (*e as u16).to_bytes(stream)?;
                }
            },
            sz => return Err(ioerr!(InvalidData, "stz2: bad field size {}", sz)),
        }

        writer.finalize()
    }
}
