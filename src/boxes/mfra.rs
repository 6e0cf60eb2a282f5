//
// ISO/IEC 14496-12:2015(E)
// 8.8.9 - 8.8.11 Movie Fragment Random Access
//

use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.8.9 Movie Fragment Random Access Box (ISO/IEC 14496-12:2015(E))
    MovieFragmentRandomAccessBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "mfra",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl MovieFragmentRandomAccessBox {
    /// Find the random access index of one track.
    pub fn track_fragment_random_access(&self, track_id: u32) -> Option<&TrackFragmentRandomAccessBox> {
        iter_box!(&self.boxes, TrackFragmentRandomAccessBox).find(|tfra| tfra.track_id == track_id)
    }
}

/// 8.8.10 Track Fragment Random Access Box (ISO/IEC 14496-12:2015(E))
///
/// An index of sync samples inside movie fragments. There is no
/// guarantee the entries cover every sync sample.
#[derive(Clone, Debug, Default)]
pub struct TrackFragmentRandomAccessBox {
    pub track_id:           u32,
    length_size_of_traf_num:   u8,
    length_size_of_trun_num:   u8,
    length_size_of_sample_num: u8,
    pub entries:            ArrayUnsized<TfraEntry>,
}

/// One random-access point: presentation time and its location.
#[derive(Clone, Debug, Default)]
pub struct TfraEntry {
    pub time:          u64,
    pub moof_offset:   u64,
    pub traf_number:   u32,
    pub trun_number:   u32,
    pub sample_number: u32,
}

fn sized_uint<R: ReadBytes>(stream: &mut R, length_size: u8) -> io::Result<u32> {
    let mut v = 0;
    for _ in 0..=length_size {
        v = (v << 8) | u8::from_bytes(stream)? as u32;
    }
    Ok(v)
}

fn sized_uint_to<W: WriteBytes>(stream: &mut W, length_size: u8, value: u32) -> io::Result<()> {
    for i in (0..=length_size).rev() {
        ((value >> (8 * i as u32)) as u8).to_bytes(stream)?;
    }
    Ok(())
}

impl FromBytes for TrackFragmentRandomAccessBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<TrackFragmentRandomAccessBox> {
        let mut reader = BoxReader::new(stream)?;
        let version = reader.header.version.unwrap_or(0);
        let stream = &mut reader;

        let track_id = u32::from_bytes(stream)?;
        let sizes = u32::from_bytes(stream)?;
        let length_size_of_traf_num = ((sizes >> 4) & 0x3) as u8;
        let length_size_of_trun_num = ((sizes >> 2) & 0x3) as u8;
        let length_size_of_sample_num = (sizes & 0x3) as u8;
        let number_of_entry = u32::from_bytes(stream)?;

        let mut entries = ArrayUnsized::new();
        while entries.len() < number_of_entry as usize && stream.left() > 0 {
            let (time, moof_offset) = if version == 1 {
                (u64::from_bytes(stream)?, u64::from_bytes(stream)?)
            } else {
                (u32::from_bytes(stream)? as u64, u32::from_bytes(stream)? as u64)
            };
            entries.push(TfraEntry {
                time,
                moof_offset,
                traf_number: sized_uint(stream, length_size_of_traf_num)?,
                trun_number: sized_uint(stream, length_size_of_trun_num)?,
                sample_number: sized_uint(stream, length_size_of_sample_num)?,
            });
        }

        Ok(TrackFragmentRandomAccessBox {
            track_id,
            length_size_of_traf_num,
            length_size_of_trun_num,
            length_size_of_sample_num,
            entries,
        })
    }

    fn min_size() -> usize {
        24
    }
}

impl ToBytes for TrackFragmentRandomAccessBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        let version = stream.version();

        self.track_id.to_bytes(stream)?;
        let sizes = ((self.length_size_of_traf_num as u32) << 4)
            | ((self.length_size_of_trun_num as u32) << 2)
            | self.length_size_of_sample_num as u32;
        sizes.to_bytes(stream)?;
        (self.entries.len() as u32).to_bytes(stream)?;
        for e in &self.entries {
            if version == 1 {
                e.time.to_bytes(stream)?;
                e.moof_offset.to_bytes(stream)?;
            } else {
                (e.time as u32).to_bytes(stream)?;
                (e.moof_offset as u32).to_bytes(stream)?;
            }
            sized_uint_to(stream, self.length_size_of_traf_num, e.traf_number)?;
            sized_uint_to(stream, self.length_size_of_trun_num, e.trun_number)?;
            sized_uint_to(stream, self.length_size_of_sample_num, e.sample_number)?;
        }

        writer.finalize()
    }
}

impl FullBox for TrackFragmentRandomAccessBox {
    fn version(&self) -> Option<u8> {
        let large = self
            .entries
            .iter()
            .any(|e| e.time > u32::MAX as u64 || e.moof_offset > u32::MAX as u64);
        Some(large as u8)
    }
}

impl BoxInfo for TrackFragmentRandomAccessBox {
    const FOURCC: &'static str = "tfra";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("tfra")
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(1)
    }
}

def_box! {
    /// 8.8.11 Movie Fragment Random Access Offset Box (ISO/IEC 14496-12:2015(E))
    MovieFragmentRandomAccessOffsetBox {
        mfra_size:  u32,
    },
    fourcc => "mfro",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}
