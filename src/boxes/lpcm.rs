//
// QTFF sound sample description, versions 0, 1 and 2.
//
// Used for the uncompressed / fixed-compression audio codecs
// ('lpcm', 'sowt', 'twos'). The per-packet constants of versions
// 1 and 2 drive the LPCM-bunch path of the timeline builder.
//

use std::io;

use crate::boxes::prelude::*;
use crate::track::AudioTrackInfo;

/// compression_ID value meaning "variable compression".
pub const QT_COMPRESSION_ID_VARIABLE: i16 = -2;

/// QTFF sound sample entry, LPCM flavors.
#[derive(Clone, Debug)]
pub struct LpcmSampleEntry {
    fourcc:                   FourCC,
    pub data_reference_index: u16,
    pub qt_version:           u16,
    pub compression_id:       i16,
    pub channel_count:        u16,
    pub sample_size:          u16,
    pub sample_rate_hi:       u16,
    pub sample_rate_lo:       u16,
    // version 1 fields.
    pub samples_per_packet:   u32,
    pub bytes_per_packet:     u32,
    pub bytes_per_frame:      u32,
    pub bytes_per_sample:     u32,
    // version 2 fields.
    pub sample_rate_f64:      u64,
    pub const_frames_per_audio_packet: u32,
    pub const_bytes_per_audio_packet:  u32,
    pub boxes:                Vec<MP4Box>,
}

pub type SowtSampleEntry = LpcmSampleEntry;
pub type TwosSampleEntry = LpcmSampleEntry;

impl Default for LpcmSampleEntry {
    fn default() -> LpcmSampleEntry {
        LpcmSampleEntry {
            fourcc:               FourCC::new("lpcm"),
            data_reference_index: 1,
            qt_version:           0,
            compression_id:       0,
            channel_count:        2,
            sample_size:          16,
            sample_rate_hi:       0,
            sample_rate_lo:       0,
            samples_per_packet:   0,
            bytes_per_packet:     0,
            bytes_per_frame:      0,
            bytes_per_sample:     0,
            sample_rate_f64:      0,
            const_frames_per_audio_packet: 0,
            const_bytes_per_audio_packet:  0,
            boxes:                Vec::new(),
        }
    }
}

impl LpcmSampleEntry {
    pub fn new(fourcc: FourCC) -> LpcmSampleEntry {
        LpcmSampleEntry {
            fourcc,
            ..LpcmSampleEntry::default()
        }
    }

    /// The per-packet quantities the timeline builder needs:
    /// (samples_per_packet, constant_bytes_per_packet).
    pub fn packet_quants(&self) -> (u32, u32) {
        match self.qt_version {
            1 => (self.samples_per_packet, self.bytes_per_frame),
            2 => (
                self.const_frames_per_audio_packet,
                self.const_bytes_per_audio_packet,
            ),
            _ => (1, (self.sample_size as u32 * self.channel_count as u32) / 8),
        }
    }

    /// Fixed compression: anything but the "variable" compression id.
    pub fn is_fixed_compression(&self) -> bool {
        self.compression_id != QT_COMPRESSION_ID_VARIABLE
    }

    /// Return audio specific track info.
    pub fn track_info(&self) -> AudioTrackInfo {
        AudioTrackInfo {
            codec_id: self.fourcc.to_string(),
            codec_name: Some("Linear PCM".to_string()),
            channel_count: self.channel_count,
            bit_depth: Some(self.sample_size),
            sample_rate: if self.sample_rate_hi > 0 { Some(self.sample_rate_hi as u32) } else { None },
            ..AudioTrackInfo::default()
        }
    }
}

impl FromBytes for LpcmSampleEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<LpcmSampleEntry> {
        let mut reader = BoxReader::new(stream)?;
        let fourcc = reader.header.fourcc;
        let stream = &mut reader;

        stream.skip(6)?;
        let data_reference_index = u16::from_bytes(stream)?;
        let qt_version = u16::from_bytes(stream)?;
        stream.skip(4)?; // revision level, vendor
        let channel_count = u16::from_bytes(stream)?;
        let sample_size = u16::from_bytes(stream)?;
        let compression_id = i16::from_bytes(stream)?;
        stream.skip(2)?; // packet size
        let sample_rate_hi = u16::from_bytes(stream)?;
        let sample_rate_lo = u16::from_bytes(stream)?;

        let mut entry = LpcmSampleEntry {
            fourcc,
            data_reference_index,
            qt_version,
            compression_id,
            channel_count,
            sample_size,
            sample_rate_hi,
            sample_rate_lo,
            ..LpcmSampleEntry::default()
        };

        match qt_version {
            0 => {},
            1 => {
                entry.samples_per_packet = u32::from_bytes(stream)?;
                entry.bytes_per_packet = u32::from_bytes(stream)?;
                entry.bytes_per_frame = u32::from_bytes(stream)?;
                entry.bytes_per_sample = u32::from_bytes(stream)?;
            },
            2 => {
                stream.skip(4)?; // sizeOfStructOnly
                entry.sample_rate_f64 = u64::from_bytes(stream)?;
                stream.skip(4)?; // numAudioChannels (have channel_count)
                stream.skip(4)?; // always 0x7f000000
                stream.skip(4)?; // constBitsPerChannel
                stream.skip(4)?; // formatSpecificFlags
                entry.const_bytes_per_audio_packet = u32::from_bytes(stream)?;
                entry.const_frames_per_audio_packet = u32::from_bytes(stream)?;
            },
            v => {
                return Err(ioerr!(InvalidData, "{}: unknown sound description version {}", fourcc, v));
            },
        }
        entry.boxes = Vec::<MP4Box>::from_bytes(stream)?;

        Ok(entry)
    }
    fn min_size() -> usize {
        28
    }
}

impl ToBytes for LpcmSampleEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;

        stream.skip(6)?;
        self.data_reference_index.to_bytes(stream)?;
        self.qt_version.to_bytes(stream)?;
        stream.skip(4)?;
        self.channel_count.to_bytes(stream)?;
        self.sample_size.to_bytes(stream)?;
        self.compression_id.to_bytes(stream)?;
        stream.skip(2)?;
        self.sample_rate_hi.to_bytes(stream)?;
        self.sample_rate_lo.to_bytes(stream)?;
        match self.qt_version {
            0 => {},
            1 => {
                self.samples_per_packet.to_bytes(stream)?;
                self.bytes_per_packet.to_bytes(stream)?;
                self.bytes_per_frame.to_bytes(stream)?;
                self.bytes_per_sample.to_bytes(stream)?;
            },
            2 => {
                72u32.to_bytes(stream)?; // sizeOfStructOnly
                self.sample_rate_f64.to_bytes(stream)?;
                (self.channel_count as u32).to_bytes(stream)?;
                0x7f000000u32.to_bytes(stream)?;
                (self.sample_size as u32).to_bytes(stream)?;
                0u32.to_bytes(stream)?;
                self.const_bytes_per_audio_packet.to_bytes(stream)?;
                self.const_frames_per_audio_packet.to_bytes(stream)?;
            },
            _ => return Err(ioerr!(InvalidData, "lpcm: unknown sound description version")),
        }
        self.boxes.to_bytes(stream)?;

        writer.finalize()
    }
}

impl BoxInfo for LpcmSampleEntry {
    const FOURCC: &'static str = "lpcm";

    #[inline]
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
}

impl FullBox for LpcmSampleEntry {}
