//
// ETSI TS 102 114: DTSSpecificBox and the DTS sample entries.
//
// The coding name (dtsc / dtsh / dtsl / dtse) is picked from the
// stream construction; all four share one sample entry layout.
//

use std::io;

use crate::bitreader::{BitReader, BitWriter};
use crate::boxes::prelude::*;
use crate::track::AudioTrackInfo;

/// DTS sample entry; used for dtsc, dtsh, dtsl and dtse.
#[derive(Clone, Debug)]
pub struct DtsSampleEntry {
    fourcc:                   FourCC,
    pub data_reference_index: u16,
    pub channel_count:        u16,
    pub sample_size:          u16,
    pub sample_rate_hi:       u16,
    pub sample_rate_lo:       u16,
    // sub boxes, probably only ddts.
    pub boxes:                Vec<MP4Box>,
}

pub type DtscSampleEntry = DtsSampleEntry;
pub type DtshSampleEntry = DtsSampleEntry;
pub type DtslSampleEntry = DtsSampleEntry;
pub type DtseSampleEntry = DtsSampleEntry;

impl Default for DtsSampleEntry {
    fn default() -> DtsSampleEntry {
        DtsSampleEntry {
            fourcc:               FourCC::new("dtsh"),
            data_reference_index: 1,
            channel_count:        2,
            sample_size:          16,
            sample_rate_hi:       0,
            sample_rate_lo:       0,
            boxes:                Vec::new(),
        }
    }
}

impl DtsSampleEntry {
    pub fn new(fourcc: FourCC) -> DtsSampleEntry {
        DtsSampleEntry {
            fourcc,
            ..DtsSampleEntry::default()
        }
    }

    /// Return audio specific track info.
    pub fn track_info(&self) -> AudioTrackInfo {
        let mut ai = AudioTrackInfo {
            codec_id: self.fourcc.to_string(),
            codec_name: Some("DTS".to_string()),
            channel_count: self.channel_count,
            bit_depth: if self.sample_size > 0 { Some(self.sample_size) } else { None },
            sample_rate: if self.sample_rate_hi > 0 { Some(self.sample_rate_hi as u32) } else { None },
            ..AudioTrackInfo::default()
        };
        if let Some(ddts) = first_box!(&self.boxes, DTSSpecificBox) {
            ai.sample_rate = Some(ddts.dts_sampling_frequency);
            ai.bit_depth = Some(ddts.pcm_sample_depth as u16);
            ai.avg_bitrate = match ddts.avg_bitrate {
                0 => None,
                b => Some(b),
            };
            ai.max_bitrate = match ddts.max_bitrate {
                0 => None,
                b => Some(b),
            };
            let channels = crate::codecs::dts::channel_count_from_layout(ddts.channel_layout);
            if channels > 0 {
                ai.channel_count = channels as u16;
            }
            ai.lfe_channel = ddts.channel_layout & 0x1008 > 0;
        }
        ai
    }
}

impl FromBytes for DtsSampleEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<DtsSampleEntry> {
        let mut reader = BoxReader::new(stream)?;
        let fourcc = reader.header.fourcc;
        let stream = &mut reader;

        stream.skip(6)?;
        let data_reference_index = u16::from_bytes(stream)?;
        stream.skip(8)?;
        let channel_count = u16::from_bytes(stream)?;
        let sample_size = u16::from_bytes(stream)?;
        stream.skip(4)?;
        let sample_rate_hi = u16::from_bytes(stream)?;
        let sample_rate_lo = u16::from_bytes(stream)?;
        let boxes = Vec::<MP4Box>::from_bytes(stream)?;

        Ok(DtsSampleEntry {
            fourcc,
            data_reference_index,
            channel_count,
            sample_size,
            sample_rate_hi,
            sample_rate_lo,
            boxes,
        })
    }
    fn min_size() -> usize {
        36
    }
}

impl ToBytes for DtsSampleEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        stream.skip(6)?;
        self.data_reference_index.to_bytes(stream)?;
        stream.skip(8)?;
        self.channel_count.to_bytes(stream)?;
        self.sample_size.to_bytes(stream)?;
        stream.skip(4)?;
        self.sample_rate_hi.to_bytes(stream)?;
        self.sample_rate_lo.to_bytes(stream)?;
        self.boxes.to_bytes(stream)?;

        writer.finalize()
    }
}

impl BoxInfo for DtsSampleEntry {
    const FOURCC: &'static str = "dtsh";

    #[inline]
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
}

impl FullBox for DtsSampleEntry {}

/// DTSSpecificBox ('ddts'), >= 20 bytes of payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DTSSpecificBox {
    pub dts_sampling_frequency: u32,
    pub max_bitrate:            u32,
    pub avg_bitrate:            u32,
    pub pcm_sample_depth:       u8,
    pub frame_duration:         u8,
    pub stream_construction:    u8,
    pub core_lfe_present:       u8,
    pub core_layout:            u8,
    pub core_size:              u16,
    pub stereo_downmix:         u8,
    pub representation_type:    u8,
    pub channel_layout:         u16,
    pub multi_asset_flag:       u8,
    pub lbr_duration_mod:       u8,
    /// Opaque ReservedBox payload, if any.
    pub reserved_box:           Data,
}

impl FromBytes for DTSSpecificBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<DTSSpecificBox> {
        let mut reader = BoxReader::new(stream)?;
        let data = Data::from_bytes(&mut reader)?;
        if data.len() < 20 {
            return Err(ioerr!(InvalidData, "ddts: payload too short"));
        }
        let mut b = BitReader::new(&data.0);

        let dts_sampling_frequency = b.read_bits(32)?;
        let max_bitrate = b.read_bits(32)?;
        let avg_bitrate = b.read_bits(32)?;
        let pcm_sample_depth = b.read_bits(8)? as u8;
        let frame_duration = b.read_bits(2)? as u8;
        let stream_construction = b.read_bits(5)? as u8;
        let core_lfe_present = b.read_bits(1)? as u8;
        let core_layout = b.read_bits(6)? as u8;
        let core_size = b.read_bits(14)? as u16;
        let stereo_downmix = b.read_bits(1)? as u8;
        let representation_type = b.read_bits(3)? as u8;
        let channel_layout = b.read_bits(16)? as u16;
        let multi_asset_flag = b.read_bits(1)? as u8;
        let lbr_duration_mod = b.read_bits(1)? as u8;
        let reserved_box_present = b.read_bits(1)? > 0;
        b.skip(5)?;
        let reserved_box = if reserved_box_present && data.len() > 20 {
            Data(data.0[20..].to_vec())
        } else {
            Data::default()
        };

        Ok(DTSSpecificBox {
            dts_sampling_frequency,
            max_bitrate,
            avg_bitrate,
            pcm_sample_depth,
            frame_duration,
            stream_construction,
            core_lfe_present,
            core_layout,
            core_size,
            stereo_downmix,
            representation_type,
            channel_layout,
            multi_asset_flag,
            lbr_duration_mod,
            reserved_box,
        })
    }
    fn min_size() -> usize {
        20
    }
}

impl ToBytes for DTSSpecificBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let mut b = BitWriter::new();
        b.put_bits(self.dts_sampling_frequency, 32);
        b.put_bits(self.max_bitrate, 32);
        b.put_bits(self.avg_bitrate, 32);
        b.put_bits(self.pcm_sample_depth as u32, 8);
        b.put_bits(self.frame_duration as u32, 2);
        b.put_bits(self.stream_construction as u32, 5);
        b.put_bits(self.core_lfe_present as u32, 1);
        b.put_bits(self.core_layout as u32, 6);
        b.put_bits(self.core_size as u32, 14);
        b.put_bits(self.stereo_downmix as u32, 1);
        b.put_bits(self.representation_type as u32, 3);
        b.put_bits(self.channel_layout as u32, 16);
        b.put_bits(self.multi_asset_flag as u32, 1);
        b.put_bits(self.lbr_duration_mod as u32, 1);
        b.put_bits((self.reserved_box.len() > 0) as u32, 1);
        b.put_bits(0, 5);
        b.put_bytes(&self.reserved_box.0);
        writer.write(&b.into_vec())?;
        writer.finalize()
    }
}

impl BoxInfo for DTSSpecificBox {
    const FOURCC: &'static str = "ddts";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("ddts")
    }
}

impl FullBox for DTSSpecificBox {}
