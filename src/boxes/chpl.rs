use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// Chapter List ("Nero" format, QTFF-ish).
    ///
    /// Chapter `start` is in 10_000_000 ticks per second.
    #[derive(Default)]
    ChapterListBox {
        chapters: Vec<Chapter>,
    },
    fourcc => "chpl",
    version => [1],
    impls => [ boxinfo, debug, fullbox ],
}

def_struct! {
    /// Chapter ("Nero" format).
    Chapter,
        start: u64,
        title: PString,
}

impl FromBytes for ChapterListBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;
        stream.skip(1)?;
        let count = u32::from_bytes(stream)?;
        let mut chapters = Vec::new();
        while (chapters.len() as u32) < count && stream.left() > 0 {
            chapters.push(Chapter::from_bytes(stream)?);
        }
        Ok(ChapterListBox { chapters })
    }

    fn min_size() -> usize {
        5
    }
}

impl ToBytes for ChapterListBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;
        stream.skip(1)?;
        (self.chapters.len() as u32).to_bytes(stream)?;
        self.chapters.to_bytes(stream)?;
        writer.finalize()
    }
}
