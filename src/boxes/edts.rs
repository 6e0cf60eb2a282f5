use std::io;

use crate::boxes::prelude::*;

def_box! {
    EditBox {
        boxes:  Vec<MP4Box>,
    },
    fourcc => "edts",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    /// 8.6.6 Edit List Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    EditListBox {
        entries:    ArraySized32<EditListEntry>,
    },
    fourcc => "elst",
    version => [1, entries],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

/// Entry in an edit list.
///
/// `segment_duration` is in movie timescale units, `media_time` in
/// media timescale units. `media_time == -1` is an empty edit.
/// `media_rate` is 16.16 fixed; 0x0001_0000 plays at 1x.
#[derive(Clone, Debug, PartialEq)]
pub struct EditListEntry {
    pub segment_duration: u64,
    pub media_time:       i64,
    pub media_rate:       FixedFloat16_16,
}

/// media_time value for an empty edit.
pub const EDIT_MODE_EMPTY: i64 = -1;

impl FromBytes for EditListEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
        let entry = if stream.version() == 0 {
            EditListEntry {
                segment_duration: u32::from_bytes(stream)? as u64,
                media_time:       i32::from_bytes(stream)? as i64,
                media_rate:       FixedFloat16_16::from_bytes(stream)?,
            }
        } else {
            EditListEntry {
                segment_duration: u64::from_bytes(stream)?,
                media_time:       i64::from_bytes(stream)?,
                media_rate:       FixedFloat16_16::from_bytes(stream)?,
            }
        };
        Ok(entry)
    }

    fn min_size() -> usize {
        12
    }
}

impl ToBytes for EditListEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        if stream.version() == 0 {
            (self.segment_duration as u32).to_bytes(stream)?;
            (self.media_time as i32).to_bytes(stream)?;
        } else {
            self.segment_duration.to_bytes(stream)?;
            self.media_time.to_bytes(stream)?;
        }
        self.media_rate.to_bytes(stream)?;
        Ok(())
    }
}

impl FullBox for EditListEntry {
    fn version(&self) -> Option<u8> {
        if self.segment_duration > 0xffffffff
            || self.media_time < -0x80000000
            || self.media_time > 0x7fffffff
        {
            Some(1)
        } else {
            Some(0)
        }
    }
}
