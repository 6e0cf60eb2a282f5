//
// ETSI TS 102 366 V1.2.1 (2008-08), Annex F:
// AC3SpecificBox and EC3SpecificBox.
//

use std::io;

use crate::bitreader::{BitReader, BitWriter};
use crate::boxes::prelude::*;
use crate::track::AudioTrackInfo;

const AC3_SAMPLE_RATE_TABLE: [u32; 4] = [48000, 44100, 32000, 0];
const AC3_CHANNEL_COUNT_TABLE: [u16; 8] = [2, 1, 2, 3, 3, 4, 4, 5];

def_box! {
    /// AC-3 sample entry.
    Ac3SampleEntry {
        skip:                   6,
        data_reference_index:   u16,
        skip:                   8,
        channel_count:          u16,
        sample_size:            u16,
        skip:                   4,
        sample_rate_hi:         u16,
        sample_rate_lo:         u16,
        // sub boxes, probably only dac3.
        boxes:                  Vec<MP4Box>,
    },
    fourcc => "ac-3",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl Default for Ac3SampleEntry {
    fn default() -> Ac3SampleEntry {
        Ac3SampleEntry {
            data_reference_index: 1,
            channel_count:        2,
            sample_size:          16,
            sample_rate_hi:       0,
            sample_rate_lo:       0,
            boxes:                Vec::new(),
        }
    }
}

impl Ac3SampleEntry {
    /// Return audio specific track info.
    pub fn track_info(&self) -> AudioTrackInfo {
        let mut ai = AudioTrackInfo {
            codec_id: "ac-3".to_string(),
            codec_name: Some("AC-3 Dolby Digital".to_string()),
            channel_count: self.channel_count,
            bit_depth: if self.sample_size > 0 { Some(self.sample_size) } else { None },
            sample_rate: if self.sample_rate_hi > 0 { Some(self.sample_rate_hi as u32) } else { None },
            ..AudioTrackInfo::default()
        };
        if let Some(dac3) = first_box!(&self.boxes, AC3SpecificBox) {
            ai.channel_count = dac3.channel_count();
            ai.lfe_channel = dac3.lfeon > 0;
            if let Some(rate) = dac3.sample_rate() {
                ai.sample_rate = Some(rate);
            }
        }
        ai
    }
}

/// AC3SpecificBox ('dac3'). 3 bytes of bit-packed fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AC3SpecificBox {
    pub fscod:         u8,
    pub bsid:          u8,
    pub bsmod:         u8,
    pub acmod:         u8,
    pub lfeon:         u8,
    pub bit_rate_code: u8,
}

impl AC3SpecificBox {
    /// Number of channels, LFE included.
    pub fn channel_count(&self) -> u16 {
        AC3_CHANNEL_COUNT_TABLE[(self.acmod & 0x7) as usize] + self.lfeon as u16
    }

    /// Sample rate from fscod; `None` when reserved.
    pub fn sample_rate(&self) -> Option<u32> {
        match AC3_SAMPLE_RATE_TABLE[(self.fscod & 0x3) as usize] {
            0 => {
                log::warn!("dac3: reserved sample rate code");
                None
            },
            rate => Some(rate),
        }
    }
}

impl FromBytes for AC3SpecificBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<AC3SpecificBox> {
        let mut reader = BoxReader::new(stream)?;
        let data = Data::from_bytes(&mut reader)?;
        if data.len() < 3 {
            return Err(ioerr!(InvalidData, "dac3: payload too short"));
        }
        let mut b = BitReader::new(&data.0);
        Ok(AC3SpecificBox {
            fscod:         b.read_bits(2)? as u8,
            bsid:          b.read_bits(5)? as u8,
            bsmod:         b.read_bits(3)? as u8,
            acmod:         b.read_bits(3)? as u8,
            lfeon:         b.read_bits(1)? as u8,
            bit_rate_code: b.read_bits(5)? as u8,
        })
    }
    fn min_size() -> usize {
        3
    }
}

impl ToBytes for AC3SpecificBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let mut b = BitWriter::new();
        b.put_bits(self.fscod as u32, 2);
        b.put_bits(self.bsid as u32, 5);
        b.put_bits(self.bsmod as u32, 3);
        b.put_bits(self.acmod as u32, 3);
        b.put_bits(self.lfeon as u32, 1);
        b.put_bits(self.bit_rate_code as u32, 5);
        b.put_bits(0, 5);
        writer.write(&b.into_vec())?;
        writer.finalize()
    }
}

impl BoxInfo for AC3SpecificBox {
    const FOURCC: &'static str = "dac3";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("dac3")
    }
}

impl FullBox for AC3SpecificBox {}

def_box! {
    /// Enhanced AC-3 sample entry.
    Eac3SampleEntry {
        skip:                   6,
        data_reference_index:   u16,
        skip:                   8,
        channel_count:          u16,
        sample_size:            u16,
        skip:                   4,
        sample_rate_hi:         u16,
        sample_rate_lo:         u16,
        // sub boxes, probably only dec3.
        boxes:                  Vec<MP4Box>,
    },
    fourcc => "ec-3",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl Default for Eac3SampleEntry {
    fn default() -> Eac3SampleEntry {
        Eac3SampleEntry {
            data_reference_index: 1,
            channel_count:        2,
            sample_size:          16,
            sample_rate_hi:       0,
            sample_rate_lo:       0,
            boxes:                Vec::new(),
        }
    }
}

impl Eac3SampleEntry {
    /// Return audio specific track info.
    pub fn track_info(&self) -> AudioTrackInfo {
        let mut ai = AudioTrackInfo {
            codec_id: "ec-3".to_string(),
            codec_name: Some("E-AC-3 Dolby Digital Plus".to_string()),
            channel_count: self.channel_count,
            bit_depth: if self.sample_size > 0 { Some(self.sample_size) } else { None },
            sample_rate: if self.sample_rate_hi > 0 { Some(self.sample_rate_hi as u32) } else { None },
            ..AudioTrackInfo::default()
        };
        if let Some(dec3) = first_box!(&self.boxes, EC3SpecificBox) {
            ai.channel_count = dec3.channel_count();
            ai.lfe_channel = dec3.independent.iter().any(|i| i.lfeon > 0);
        }
        ai
    }
}

/// One independent substream description inside a 'dec3'.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ec3SubstreamInfo {
    pub fscod:       u8,
    pub bsid:        u8,
    pub bsmod:       u8,
    pub acmod:       u8,
    pub lfeon:       u8,
    pub num_dep_sub: u8,
    /// Dependent substream channel locations, 9-bit bitmap.
    pub chan_loc:    u16,
}

/// EC3SpecificBox ('dec3').
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EC3SpecificBox {
    pub data_rate:   u16,
    /// One entry per independent substream; num_ind_sub is len - 1.
    pub independent: Vec<Ec3SubstreamInfo>,
}

impl EC3SpecificBox {
    /// Total channels over all independent substreams, LFE included.
    pub fn channel_count(&self) -> u16 {
        self.independent
            .iter()
            .map(|i| AC3_CHANNEL_COUNT_TABLE[(i.acmod & 0x7) as usize] + i.lfeon as u16)
            .sum()
    }
}

impl FromBytes for EC3SpecificBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<EC3SpecificBox> {
        let mut reader = BoxReader::new(stream)?;
        let data = Data::from_bytes(&mut reader)?;
        let mut b = BitReader::new(&data.0);

        let data_rate = b.read_bits(13)? as u16;
        let num_ind_sub = b.read_bits(3)? as usize;
        let mut independent = Vec::new();
        for _ in 0..=num_ind_sub {
            let fscod = b.read_bits(2)? as u8;
            let bsid = b.read_bits(5)? as u8;
            let bsmod = b.read_bits(5)? as u8;
            let acmod = b.read_bits(3)? as u8;
            let lfeon = b.read_bits(1)? as u8;
            b.skip(3)?; // reserved
            let num_dep_sub = b.read_bits(4)? as u8;
            let chan_loc = if num_dep_sub > 0 {
                b.read_bits(9)? as u16
            } else {
                b.skip(1)?; // reserved
                0
            };
            independent.push(Ec3SubstreamInfo {
                fscod,
                bsid,
                bsmod,
                acmod,
                lfeon,
                num_dep_sub,
                chan_loc,
            });
        }

        Ok(EC3SpecificBox {
            data_rate,
            independent,
        })
    }
    fn min_size() -> usize {
        5
    }
}

impl ToBytes for EC3SpecificBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        if self.independent.is_empty() || self.independent.len() > 8 {
            return Err(ioerr!(InvalidData, "dec3: bad number of independent substreams"));
        }
        let mut writer = BoxWriter::new(stream, self)?;
        let mut b = BitWriter::new();
        b.put_bits(self.data_rate as u32, 13);
        b.put_bits(self.independent.len() as u32 - 1, 3);
        for sub in &self.independent {
            b.put_bits(sub.fscod as u32, 2);
            b.put_bits(sub.bsid as u32, 5);
            b.put_bits(sub.bsmod as u32, 5);
            b.put_bits(sub.acmod as u32, 3);
            b.put_bits(sub.lfeon as u32, 1);
            b.put_bits(0, 3); // reserved
            b.put_bits(sub.num_dep_sub as u32, 4);
            if sub.num_dep_sub > 0 {
                b.put_bits(sub.chan_loc as u32, 9);
            } else {
                b.put_bits(0, 1); // reserved
            }
        }
        writer.write(&b.into_vec())?;
        writer.finalize()
    }
}

impl BoxInfo for EC3SpecificBox {
    const FOURCC: &'static str = "dec3";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("dec3")
    }
}

impl FullBox for EC3SpecificBox {}
