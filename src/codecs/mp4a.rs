//! MPEG-4 Audio (ISO/IEC 14496-3) AudioSpecificConfig.
//!
//! Builds and parses the bit-packed decoder specific info carried in
//! the `esds` descriptor chain: base config, GA specific config for
//! the AAC family, MPEG-1/2 specific config for Layer I/II/III, and
//! the ALS specific config payload. HE-AAC can be signaled explicitly
//! (hierarchical), backward-compatibly (0x2b7 extension), or not at
//! all (implicit).
use crate::bitreader::{BitReader, BitWriter};
use crate::error::{Error, Result};

/// ISO/IEC 14496-3 audioObjectType.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioObjectType {
    Null,
    AacMain,
    AacLc,
    AacSsr,
    AacLtp,
    Sbr,
    AacScalable,
    TwinVq,
    Ps,
    Layer1,
    Layer2,
    Layer3,
    Als,
    Other(u8),
}

impl AudioObjectType {
    pub fn from_u8(v: u8) -> AudioObjectType {
        match v {
            0 => AudioObjectType::Null,
            1 => AudioObjectType::AacMain,
            2 => AudioObjectType::AacLc,
            3 => AudioObjectType::AacSsr,
            4 => AudioObjectType::AacLtp,
            5 => AudioObjectType::Sbr,
            6 => AudioObjectType::AacScalable,
            7 => AudioObjectType::TwinVq,
            29 => AudioObjectType::Ps,
            32 => AudioObjectType::Layer1,
            33 => AudioObjectType::Layer2,
            34 => AudioObjectType::Layer3,
            36 => AudioObjectType::Als,
            v => AudioObjectType::Other(v),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            AudioObjectType::Null => 0,
            AudioObjectType::AacMain => 1,
            AudioObjectType::AacLc => 2,
            AudioObjectType::AacSsr => 3,
            AudioObjectType::AacLtp => 4,
            AudioObjectType::Sbr => 5,
            AudioObjectType::AacScalable => 6,
            AudioObjectType::TwinVq => 7,
            AudioObjectType::Ps => 29,
            AudioObjectType::Layer1 => 32,
            AudioObjectType::Layer2 => 33,
            AudioObjectType::Layer3 => 34,
            AudioObjectType::Als => 36,
            AudioObjectType::Other(v) => *v,
        }
    }

    fn is_ga(&self) -> bool {
        matches!(
            self,
            AudioObjectType::AacMain
                | AudioObjectType::AacLc
                | AudioObjectType::AacSsr
                | AudioObjectType::AacLtp
                | AudioObjectType::Sbr
                | AudioObjectType::AacScalable
                | AudioObjectType::TwinVq
        )
    }

    fn is_mpeg_1_2(&self) -> bool {
        matches!(
            self,
            AudioObjectType::Layer1 | AudioObjectType::Layer2 | AudioObjectType::Layer3
        )
    }
}

/// How SBR is signaled in the config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SbrMode {
    /// Implicit signaling: nothing in the config, decoder sniffs.
    NotSpecified,
    /// Backward compatible signaling, explicitly without SBR.
    None,
    /// Backward compatible signaling (0x2b7 extension at the tail).
    BackwardCompatible,
    /// Explicit hierarchical signaling (AOT 5 wraps the base config).
    Hierarchical,
}

/// threshold, exact rate, index for GASpecificConfig, index for SBR, index.
/// SBR is not allowed above 48000.
pub const SAMPLING_FREQUENCY_TABLE: [(u32, u32, u8, u8, u8); 13] = [
    (92017, 96000, 0x0, 0xF, 0x0),
    (75132, 88200, 0x1, 0xF, 0x1),
    (55426, 64000, 0x2, 0xF, 0x2),
    (46009, 48000, 0x3, 0x0, 0x3),
    (37566, 44100, 0x4, 0x1, 0x4),
    (27713, 32000, 0x5, 0x2, 0x5),
    (23004, 24000, 0x6, 0x3, 0x6),
    (18783, 22050, 0x7, 0x4, 0x7),
    (13856, 16000, 0x8, 0x5, 0x8),
    (11502, 12000, 0x9, 0x6, 0x9),
    (9391, 11025, 0xA, 0x7, 0xA),
    (8000, 8000, 0xB, 0x8, 0xB),
    (0, 7350, 0xB, 0xF, 0xC),
];

/// GASpecificConfig (AAC family). PCE-style configs are not supported.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GaSpecificConfig {
    pub frame_length_flag:     bool,
    pub depends_on_core_coder: bool,
    pub extension_flag:        bool,
}

/// MPEG_1_2_SpecificConfig: one extension bit, always zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mpeg12SpecificConfig {
    pub extension: bool,
}

/// ALSSpecificConfig. The raw config bytes are carried verbatim; the
/// fields we care about are also decoded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlsSpecificConfig {
    pub data:         Vec<u8>,
    pub samp_freq:    u32,
    pub channels:     u16,
    pub resolution:   u8,
    pub floating:     bool,
    pub frame_length: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SpecificConfig {
    Ga(GaSpecificConfig),
    Mpeg12(Mpeg12SpecificConfig),
    Als(AlsSpecificConfig),
    None,
}

/// Regularized AudioSpecificConfig.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSpecificConfig {
    pub audio_object_type:                  AudioObjectType,
    pub sampling_frequency_index:           u8,
    pub sampling_frequency:                 u32,
    pub channel_configuration:              u8,
    pub extension_audio_object_type:        AudioObjectType,
    pub extension_sampling_frequency_index: u8,
    pub extension_sampling_frequency:       u32,
    pub sbr_mode:                           SbrMode,
    pub specific:                           SpecificConfig,
}

impl AudioSpecificConfig {
    /// Build a config from stream parameters.
    ///
    /// `aot` must not be `Sbr`; use `sbr_mode` to signal SBR.
    /// `frequency` and `channels` are the base AAC's, even for HE-AAC.
    pub fn new(
        aot: AudioObjectType,
        frequency: u32,
        channels: u32,
        sbr_mode: SbrMode,
        exdata: &[u8],
    ) -> Result<AudioSpecificConfig> {
        if !aot.is_ga() && !aot.is_mpeg_1_2() && aot != AudioObjectType::Als {
            return Err(Error::FunctionParam("AudioSpecificConfig: unsupported object type"));
        }
        if frequency == 0 {
            return Err(Error::FunctionParam("AudioSpecificConfig: zero frequency"));
        }
        let channel_configuration = match channels {
            c @ 1..=6 => c as u8,
            8 => 7,
            _ => return Err(Error::FunctionParam("AudioSpecificConfig: bad channel count")),
        };

        let mut asc = AudioSpecificConfig {
            audio_object_type: aot,
            sampling_frequency_index: 0xF,
            sampling_frequency: frequency,
            channel_configuration,
            extension_audio_object_type: AudioObjectType::Null,
            extension_sampling_frequency_index: 0xF,
            extension_sampling_frequency: frequency,
            sbr_mode,
            specific: SpecificConfig::None,
        };

        if sbr_mode != SbrMode::NotSpecified || aot.is_ga() {
            // Rate-by-threshold lookup, as for GASpecificConfig.
            let mut i = 0;
            while frequency < SAMPLING_FREQUENCY_TABLE[i].0 {
                i += 1;
            }
            asc.sampling_frequency_index = if frequency == SAMPLING_FREQUENCY_TABLE[i].1 {
                SAMPLING_FREQUENCY_TABLE[i].4
            } else {
                0xF
            };
            if sbr_mode != SbrMode::NotSpecified {
                // SBR is only defined at 48 kHz and below.
                if i < 0x3 {
                    return Err(Error::FunctionParam("AudioSpecificConfig: no SBR above 48kHz"));
                }
                asc.extension_audio_object_type = AudioObjectType::Sbr;
                asc.extension_sampling_frequency = frequency * 2;
                asc.extension_sampling_frequency_index = if i == 0xC {
                    0xF
                } else {
                    SAMPLING_FREQUENCY_TABLE[i].3
                };
            } else {
                asc.extension_sampling_frequency_index = asc.sampling_frequency_index;
            }
        } else {
            // Exact-rate lookup.
            let mut i = 0;
            while i < 0xD && frequency != SAMPLING_FREQUENCY_TABLE[i].1 {
                i += 1;
            }
            asc.sampling_frequency_index = if i != 0xD {
                SAMPLING_FREQUENCY_TABLE[i].4
            } else {
                0xF
            };
            asc.extension_sampling_frequency_index = asc.sampling_frequency_index;
        }

        asc.specific = if aot.is_ga() {
            SpecificConfig::Ga(GaSpecificConfig::default())
        } else if aot.is_mpeg_1_2() {
            SpecificConfig::Mpeg12(Mpeg12SpecificConfig::default())
        } else {
            let mut als = AlsSpecificConfig::default();
            als.data = exdata.to_vec();
            if exdata.len() > 0 {
                als = parse_als_config(exdata)?;
            }
            SpecificConfig::Als(als)
        };

        Ok(asc)
    }

    /// Serialize into the DecoderSpecificInfo payload bytes.
    pub fn to_payload(&self) -> Vec<u8> {
        let mut bits = BitWriter::new();

        if self.sbr_mode == SbrMode::Hierarchical {
            put_audio_object_type(&mut bits, self.extension_audio_object_type);
        } else {
            put_audio_object_type(&mut bits, self.audio_object_type);
        }
        put_sampling_frequency_index(&mut bits, self.sampling_frequency_index, self.sampling_frequency);
        bits.put_bits(self.channel_configuration as u32, 4);
        if self.sbr_mode == SbrMode::Hierarchical {
            put_sampling_frequency_index(
                &mut bits,
                self.extension_sampling_frequency_index,
                self.extension_sampling_frequency,
            );
            put_audio_object_type(&mut bits, self.audio_object_type);
        }
        match &self.specific {
            SpecificConfig::Ga(ga) => {
                bits.put_bits(ga.frame_length_flag as u32, 1);
                bits.put_bits(ga.depends_on_core_coder as u32, 1);
                bits.put_bits(ga.extension_flag as u32, 1);
            },
            SpecificConfig::Mpeg12(m) => {
                bits.put_bits(m.extension as u32, 1);
            },
            SpecificConfig::Als(als) => {
                bits.put_bits(0, 5); // fillBits for byte alignment
                bits.put_bytes(&als.data);
            },
            SpecificConfig::None => {},
        }

        if self.sbr_mode == SbrMode::BackwardCompatible || self.sbr_mode == SbrMode::None {
            bits.put_bits(0x2b7, 11);
            put_audio_object_type(&mut bits, self.extension_audio_object_type);
            if self.extension_audio_object_type == AudioObjectType::Sbr {
                if self.sbr_mode == SbrMode::None {
                    bits.put_bits(0, 1); // sbrPresentFlag
                } else {
                    bits.put_bits(1, 1);
                    put_sampling_frequency_index(
                        &mut bits,
                        self.extension_sampling_frequency_index,
                        self.extension_sampling_frequency,
                    );
                }
            }
        }

        bits.into_vec()
    }

    /// Parse a DecoderSpecificInfo payload.
    pub fn parse(payload: &[u8]) -> Result<AudioSpecificConfig> {
        let mut bits = BitReader::new(payload);

        let mut aot = get_audio_object_type(&mut bits)?;
        let sampling_frequency_index = bits.read_bits(4)? as u8;
        let sampling_frequency = if sampling_frequency_index == 0xf {
            bits.read_bits(24)?
        } else {
            SAMPLING_FREQUENCY_TABLE
                .iter()
                .find(|row| row.4 == sampling_frequency_index)
                .map(|row| row.1)
                .unwrap_or(0)
        };
        let channel_configuration = bits.read_bits(4)? as u8;

        let mut asc = AudioSpecificConfig {
            audio_object_type: aot,
            sampling_frequency_index,
            sampling_frequency,
            channel_configuration,
            extension_audio_object_type: AudioObjectType::Null,
            extension_sampling_frequency_index: sampling_frequency_index,
            extension_sampling_frequency: sampling_frequency,
            sbr_mode: SbrMode::NotSpecified,
            specific: SpecificConfig::None,
        };

        // Explicit hierarchical signaling.
        if aot == AudioObjectType::Sbr {
            asc.extension_audio_object_type = AudioObjectType::Sbr;
            asc.sbr_mode = SbrMode::Hierarchical;
            asc.extension_sampling_frequency_index = bits.read_bits(4)? as u8;
            asc.extension_sampling_frequency = if asc.extension_sampling_frequency_index == 0xf {
                bits.read_bits(24)?
            } else {
                SAMPLING_FREQUENCY_TABLE
                    .iter()
                    .find(|row| row.4 == asc.extension_sampling_frequency_index)
                    .map(|row| row.1)
                    .unwrap_or(0)
            };
            aot = get_audio_object_type(&mut bits)?;
            asc.audio_object_type = aot;
        }

        asc.specific = if aot.is_ga() {
            let frame_length_flag = bits.read_bits(1)? > 0;
            let depends_on_core_coder = bits.read_bits(1)? > 0;
            if depends_on_core_coder {
                bits.skip(14)?; // coreCoderDelay
            }
            let extension_flag = bits.read_bits(1)? > 0;
            SpecificConfig::Ga(GaSpecificConfig {
                frame_length_flag,
                depends_on_core_coder,
                extension_flag,
            })
        } else if aot.is_mpeg_1_2() {
            SpecificConfig::Mpeg12(Mpeg12SpecificConfig {
                extension: bits.read_bits(1)? > 0,
            })
        } else if aot == AudioObjectType::Als {
            bits.skip(5)?; // fillBits
            let data = payload[bits.byte_pos()..].to_vec();
            SpecificConfig::Als(parse_als_config(&data)?)
        } else {
            SpecificConfig::None
        };

        // Backward compatible SBR signaling at the tail.
        if asc.sbr_mode == SbrMode::NotSpecified && bits.bytes_left() >= 2 {
            if let Ok(sync) = bits.read_bits(11) {
                if sync == 0x2b7 {
                    let ext_aot = get_audio_object_type(&mut bits)?;
                    if ext_aot == AudioObjectType::Sbr {
                        asc.extension_audio_object_type = ext_aot;
                        if bits.read_bits(1)? > 0 {
                            asc.sbr_mode = SbrMode::BackwardCompatible;
                            asc.extension_sampling_frequency_index = bits.read_bits(4)? as u8;
                            asc.extension_sampling_frequency =
                                if asc.extension_sampling_frequency_index == 0xf {
                                    bits.read_bits(24)?
                                } else {
                                    SAMPLING_FREQUENCY_TABLE
                                        .iter()
                                        .find(|row| row.4 == asc.extension_sampling_frequency_index)
                                        .map(|row| row.1)
                                        .unwrap_or(0)
                                };
                        } else {
                            asc.sbr_mode = SbrMode::None;
                        }
                    }
                }
            }
        }

        Ok(asc)
    }
}

fn put_audio_object_type(bits: &mut BitWriter, aot: AudioObjectType) {
    let v = aot.as_u8();
    if v > 31 {
        bits.put_bits(31, 5);
        bits.put_bits((v - 32) as u32, 6);
    } else {
        bits.put_bits(v as u32, 5);
    }
}

fn get_audio_object_type(bits: &mut BitReader) -> Result<AudioObjectType> {
    let mut v = bits.read_bits(5)? as u8;
    if v == 31 {
        v = 32 + bits.read_bits(6)? as u8;
    }
    Ok(AudioObjectType::from_u8(v))
}

fn put_sampling_frequency_index(bits: &mut BitWriter, index: u8, frequency: u32) {
    bits.put_bits(index as u32, 4);
    if index == 0xF {
        bits.put_bits(frequency, 24);
    }
}

// ISO/IEC 14496-3 ALSSpecificConfig, fixed leading fields.
fn parse_als_config(data: &[u8]) -> Result<AlsSpecificConfig> {
    let mut bits = BitReader::new(data);
    let als_id = bits.read_bits(32)?;
    if als_id != u32::from_be_bytes(*b"ALS\0") {
        return Err(Error::invalid_data("ALSSpecificConfig: bad als_id"));
    }
    let samp_freq = bits.read_bits(32)?;
    bits.skip(32)?; // samples
    let channels = bits.read_bits(16)? as u16 + 1;
    bits.skip(3)?; // file_type
    let resolution = bits.read_bits(3)? as u8;
    let floating = bits.read_bits(1)? > 0;
    bits.skip(1)?; // msb_first
    let frame_length = bits.read_bits(16)? as u16;
    Ok(AlsSpecificConfig {
        data: data.to_vec(),
        samp_freq,
        channels,
        resolution,
        floating,
        frame_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aac_lc_roundtrip() {
        let asc = AudioSpecificConfig::new(
            AudioObjectType::AacLc,
            48000,
            2,
            SbrMode::NotSpecified,
            &[],
        )
        .unwrap();
        assert_eq!(asc.sampling_frequency_index, 0x3);
        let payload = asc.to_payload();
        // AOT 2 (00010), index 3 (0011), channels 2 (0010), GASpecificConfig 000.
        assert_eq!(payload, vec![0b0001_0011, 0b0010_0000]);

        let parsed = AudioSpecificConfig::parse(&payload).unwrap();
        assert_eq!(parsed.audio_object_type, AudioObjectType::AacLc);
        assert_eq!(parsed.sampling_frequency, 48000);
        assert_eq!(parsed.channel_configuration, 2);
        assert_eq!(parsed.sbr_mode, SbrMode::NotSpecified);
    }

    #[test]
    fn he_aac_hierarchical_signaling() {
        let asc = AudioSpecificConfig::new(
            AudioObjectType::AacLc,
            24000,
            2,
            SbrMode::Hierarchical,
            &[],
        )
        .unwrap();
        assert_eq!(asc.extension_audio_object_type, AudioObjectType::Sbr);
        assert_eq!(asc.extension_sampling_frequency, 48000);

        let payload = asc.to_payload();
        let parsed = AudioSpecificConfig::parse(&payload).unwrap();
        assert_eq!(parsed.sbr_mode, SbrMode::Hierarchical);
        assert_eq!(parsed.audio_object_type, AudioObjectType::AacLc);
        assert_eq!(parsed.extension_sampling_frequency, 48000);
    }

    #[test]
    fn he_aac_backward_compatible_signaling() {
        let asc = AudioSpecificConfig::new(
            AudioObjectType::AacLc,
            22050,
            2,
            SbrMode::BackwardCompatible,
            &[],
        )
        .unwrap();
        let payload = asc.to_payload();
        let parsed = AudioSpecificConfig::parse(&payload).unwrap();
        assert_eq!(parsed.sbr_mode, SbrMode::BackwardCompatible);
        assert_eq!(parsed.extension_sampling_frequency, 44100);
    }

    #[test]
    fn sbr_rejected_above_48k() {
        let r = AudioSpecificConfig::new(
            AudioObjectType::AacLc,
            96000,
            2,
            SbrMode::Hierarchical,
            &[],
        );
        assert!(r.is_err());
    }
}
