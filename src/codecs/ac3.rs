//! AC-3 and Enhanced AC-3 configuration recovery.
//!
//! ETSI TS 102 366 V1.2.1 (2008-08). An AC-3 description (`dac3`) is
//! recovered from one sync frame; an E-AC-3 description (`dec3`) needs
//! one access unit's worth of sync frames (six audio blocks, starting
//! with independent substream 0).
use crate::bitreader::BitReader;
use crate::boxes::{AC3SpecificBox, EC3SpecificBox, Ec3SubstreamInfo};
use crate::error::{Error, Result};

pub const AC3_MIN_SYNCFRAME_LENGTH: usize = 128;
pub const AC3_MAX_SYNCFRAME_LENGTH: usize = 3840;
pub const EAC3_MAX_SYNCFRAME_LENGTH: usize = 4096;

pub(crate) const AC3_SAMPLE_RATE_TABLE: [u32; 4] = [48000, 44100, 32000, 0];

/// Samples per AC-3 / E-AC-3 access unit.
pub const A52_SAMPLES_PER_FRAME: u32 = 1536;

const EAC3_AUDIO_BLOCK_TABLE: [u8; 4] = [1, 2, 3, 6];

/// AC-3 nominal bit rates in kbit/s by bit_rate_code.
pub const AC3_BIT_RATE_TABLE: [u32; 20] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 448, 512, 576, 640,
    0, // undefined
];

/// Recover a `dac3` description from a single AC-3 sync frame.
pub fn dac3_from_syncframe(data: &[u8]) -> Result<AC3SpecificBox> {
    if data.len() < AC3_MIN_SYNCFRAME_LENGTH {
        return Err(Error::FunctionParam("dac3_from_syncframe: frame too short"));
    }
    if data[0] != 0x0b || data[1] != 0x77 {
        return Err(Error::invalid_data("AC-3: bad syncword"));
    }
    let mut bits = BitReader::new(data);
    bits.skip(32)?; // syncword + crc1
    let fscod = bits.read_bits(2)? as u8;
    let frmsizecod = bits.read_bits(6)? as u8;
    let bsid = bits.read_bits(5)? as u8;
    let bsmod = bits.read_bits(3)? as u8;
    let acmod = bits.read_bits(3)? as u8;
    if (acmod & 0x01) > 0 && acmod != 0x01 {
        bits.skip(2)?; // cmixlev
    }
    if acmod & 0x04 > 0 {
        bits.skip(2)?; // surmixlev
    }
    if acmod == 0x02 {
        bits.skip(2)?; // dsurmod
    }
    let lfeon = bits.read_bits(1)? as u8;

    if fscod == 0x3 {
        return Err(Error::invalid_data("AC-3: unknown sample rate code"));
    }
    if frmsizecod > 0x25 {
        return Err(Error::invalid_data("AC-3: unknown frame size code"));
    }
    if bsid >= 10 {
        // Would be E-AC-3.
        return Err(Error::invalid_data("AC-3: bsid >= 10"));
    }

    Ok(AC3SpecificBox {
        fscod,
        bsid,
        bsmod,
        acmod,
        lfeon,
        bit_rate_code: frmsizecod >> 1,
    })
}

// Parse state for one E-AC-3 access unit.
#[derive(Default)]
struct Eac3Info {
    // Indexed by independent substream id.
    independent:            [Ec3SubstreamInfo; 8],
    dependent:              Ec3SubstreamInfo,
    n_independent:          usize,
    strmtyp:                u8,
    substreamid:            u8,
    current_independent:    usize,
    fscod2:                 u8,
    numblkscod:             u8,
    number_of_audio_blocks: u8,
    syncframe_count:        u32,
    frame_size:             usize,
}

impl Eac3Info {
    fn substream_mut(&mut self) -> &mut Ec3SubstreamInfo {
        if self.strmtyp != 0x1 {
            &mut self.independent[self.current_independent]
        } else {
            &mut self.dependent
        }
    }
}

/// Recover a `dec3` description from one E-AC-3 access unit.
///
/// Consecutive sync frames are consumed until the next independent
/// substream 0 begins. The access unit must contain exactly six audio
/// blocks, and the first frame must be independent with substream id 0.
pub fn dec3_from_frame(data: &[u8]) -> Result<EC3SpecificBox> {
    if data.len() < 5 {
        return Err(Error::FunctionParam("dec3_from_frame: frame too short"));
    }
    let mut info = Eac3Info::default();
    let mut next_frame_pos = 0usize;
    loop {
        // The length 5 is what we need to read the frame size.
        if next_frame_pos + 5 > data.len() {
            break;
        }
        let frame = &data[next_frame_pos..];
        if frame[0] != 0x0b || frame[1] != 0x77 {
            break;
        }
        info.frame_size = 0;
        if eac3_parse_syncframe(&mut info, frame).is_err() {
            break;
        }
        if frame.len() < info.frame_size {
            break;
        }
        let independent = info.strmtyp != 0x1;
        if independent && info.substreamid == 0x0 {
            if info.number_of_audio_blocks == 6 {
                // First syncframe of the next access unit.
                info.number_of_audio_blocks = 0;
                break;
            } else if info.number_of_audio_blocks > 6 {
                break;
            }
            info.number_of_audio_blocks += EAC3_AUDIO_BLOCK_TABLE[info.numblkscod as usize];
            info.n_independent = 0;
        } else if info.syncframe_count == 0 {
            // The first syncframe in an AU must be independent with id 0.
            return Err(Error::invalid_data("E-AC-3: first frame not independent substream 0"));
        }
        if independent {
            info.independent[info.n_independent].num_dep_sub = 0;
            info.n_independent += 1;
        } else if info.n_independent > 0 {
            info.independent[info.n_independent - 1].num_dep_sub += 1;
        }
        next_frame_pos += info.frame_size;
        info.syncframe_count += 1;
    }
    if info.n_independent == 0 || info.n_independent > 8 {
        return Err(Error::invalid_data("E-AC-3: no independent substreams found"));
    }
    if info.number_of_audio_blocks != 6 {
        return Err(Error::invalid_data("E-AC-3: incomplete access unit"));
    }
    Ok(EC3SpecificBox {
        data_rate:   0, // set up by the bitrate updater
        independent: info.independent[..info.n_independent].to_vec(),
    })
}

/// Sample rate of an E-AC-3 presentation.
pub fn eac3_sample_rate(dec3: &EC3SpecificBox, fscod2: Option<u8>) -> Option<u32> {
    let first = dec3.independent.first()?;
    let mut samplerate = AC3_SAMPLE_RATE_TABLE[(first.fscod & 0x3) as usize];
    if samplerate == 0 {
        if let Some(fscod2) = fscod2 {
            samplerate = AC3_SAMPLE_RATE_TABLE[(fscod2 & 0x3) as usize] / 2;
        }
    }
    if samplerate == 0 {
        log::warn!("E-AC-3: unknown sampling rate");
        None
    } else {
        Some(samplerate)
    }
}

/// chan_loc bitmap from the chanmap field of a dependent substream.
pub fn chan_loc_from_chanmap(chanmap: u16) -> u16 {
    ((chanmap & 0x7f8) >> 2) | ((chanmap & 0x2) >> 1)
}

fn eac3_parse_syncframe(info: &mut Eac3Info, data: &[u8]) -> Result<()> {
    let bits = &mut BitReader::new(data);
    bits.skip(16)?; // syncword
    info.strmtyp = bits.read_bits(2)? as u8;
    info.substreamid = bits.read_bits(3)? as u8;
    if info.strmtyp != 0x1 {
        info.current_independent = info.substreamid as usize;
        info.independent[info.current_independent].chan_loc = 0;
    } else {
        info.dependent = Ec3SubstreamInfo::default();
    }
    info.frame_size = 2 * (bits.read_bits(11)? as usize + 1);
    let fscod = bits.read_bits(2)? as u8;
    if fscod == 0x3 {
        info.fscod2 = bits.read_bits(2)? as u8;
        info.numblkscod = 0x3;
    } else {
        info.numblkscod = bits.read_bits(2)? as u8;
    }
    let acmod = bits.read_bits(3)? as u8;
    let lfeon = bits.read_bits(1)? as u8;
    let bsid = bits.read_bits(5)? as u8;
    {
        let sub = info.substream_mut();
        sub.fscod = fscod;
        sub.acmod = acmod;
        sub.lfeon = lfeon;
        sub.bsid = bsid;
    }
    bits.skip(5)?; // dialnorm
    if bits.read_bits(1)? > 0 {
        bits.skip(8)?; // compr
    }
    if acmod == 0x0 {
        bits.skip(5)?; // dialnorm2
        if bits.read_bits(1)? > 0 {
            bits.skip(8)?; // compr2
        }
    }
    if info.strmtyp == 0x1 && bits.read_bits(1)? > 0 {
        // chanmape: attributed to the current independent substream.
        let chanmap = bits.read_bits(16)? as u16;
        info.independent[info.current_independent].chan_loc |= chan_loc_from_chanmap(chanmap);
    }
    if bits.read_bits(1)? > 0 {
        // mixmdate
        if acmod > 0x2 {
            bits.skip(2)?; // dmixmod
        }
        if ((acmod & 0x1) > 0 && acmod > 0x2) || (acmod & 0x4) > 0 {
            bits.skip(6)?; // ltrt/loro mix levels
        }
        if lfeon > 0 && bits.read_bits(1)? > 0 {
            bits.skip(5)?; // lfemixlevcod
        }
        if info.strmtyp == 0x0 {
            if bits.read_bits(1)? > 0 {
                bits.skip(6)?; // pgmscl
            }
            if acmod == 0x0 && bits.read_bits(1)? > 0 {
                bits.skip(6)?; // pgmscl2
            }
            if bits.read_bits(1)? > 0 {
                bits.skip(6)?; // extpgmscl
            }
            let mixdef = bits.read_bits(2)?;
            if mixdef == 0x1 {
                bits.skip(5)?; // premixcmpsel, drcsrc, premixcmpscl
            } else if mixdef == 0x2 {
                bits.skip(12)?; // mixdata
            } else if mixdef == 0x3 {
                let mixdeflen = bits.read_bits(5)?;
                bits.skip(8 * (mixdeflen + 2))?; // mixdata + fill
            }
            if acmod < 0x2 {
                if bits.read_bits(1)? > 0 {
                    bits.skip(14)?; // panmean, paninfo
                }
                if acmod == 0x0 && bits.read_bits(1)? > 0 {
                    bits.skip(14)?; // panmean2, paninfo2
                }
            }
            if bits.read_bits(1)? > 0 {
                // frmmixcfginfoe
                if info.numblkscod == 0x0 {
                    bits.skip(5)?;
                } else {
                    let blocks = EAC3_AUDIO_BLOCK_TABLE[info.numblkscod as usize];
                    for _ in 0..blocks {
                        if bits.read_bits(1)? > 0 {
                            bits.skip(5)?; // blkmixcfginfo
                        }
                    }
                }
            }
        }
    }
    if bits.read_bits(1)? > 0 {
        // infomdate
        let bsmod = bits.read_bits(3)? as u8;
        info.substream_mut().bsmod = bsmod;
        bits.skip(2)?; // copyrightb, origbs
        if acmod == 0x2 {
            bits.skip(4)?; // dsurmod, dheadphonmod
        } else if acmod >= 0x6 {
            bits.skip(2)?; // dsurexmod
        }
        if bits.read_bits(1)? > 0 {
            bits.skip(8)?; // mixlevel, roomtyp, adconvtyp
        }
        if acmod == 0x0 && bits.read_bits(1)? > 0 {
            bits.skip(8)?; // mixlevel2, roomtyp2, adconvtyp2
        }
        if fscod < 0x3 {
            bits.skip(1)?; // sourcefscod
        }
    } else {
        info.substream_mut().bsmod = 0;
    }
    if info.strmtyp == 0x0 && info.numblkscod != 0x3 {
        bits.skip(1)?; // convsync
    }
    if info.strmtyp == 0x2 {
        let blkid = if info.numblkscod == 0x3 {
            1
        } else {
            bits.read_bits(1)?
        };
        if blkid > 0 {
            bits.skip(6)?; // frmsizecod
        }
    }
    if bits.read_bits(1)? > 0 {
        // addbsie
        let addbsil = bits.read_bits(6)?;
        bits.skip((addbsil + 1) * 8)?; // addbsi
    }
    bits.align();

    // Validate.
    if info.strmtyp == 0x3 {
        return Err(Error::invalid_data("E-AC-3: unknown stream type"));
    }
    let fscod2 = info.fscod2;
    let sub = info.substream_mut();
    if sub.fscod == 0x3 && fscod2 == 0x3 {
        return Err(Error::invalid_data("E-AC-3: unknown sample rate code"));
    }
    if sub.bsid < 10 || sub.bsid > 16 {
        return Err(Error::invalid_data("E-AC-3: not an E-AC-3 bsid"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitreader::BitWriter;

    // Minimal AC-3 syncframe header: just enough fields, zero padding.
    fn syncframe(fscod: u32, frmsizecod: u32, bsid: u32, bsmod: u32, acmod: u32, lfeon: u32) -> Vec<u8> {
        let mut b = BitWriter::new();
        b.put_bits(0x0b77, 16);
        b.put_bits(0, 16); // crc1
        b.put_bits(fscod, 2);
        b.put_bits(frmsizecod, 6);
        b.put_bits(bsid, 5);
        b.put_bits(bsmod, 3);
        b.put_bits(acmod, 3);
        if (acmod & 0x01) > 0 && acmod != 0x01 {
            b.put_bits(0, 2);
        }
        if acmod & 0x04 > 0 {
            b.put_bits(0, 2);
        }
        if acmod == 0x02 {
            b.put_bits(0, 2);
        }
        b.put_bits(lfeon, 1);
        let mut v = b.into_vec();
        v.resize(AC3_MIN_SYNCFRAME_LENGTH, 0);
        v
    }

    #[test]
    fn dac3_from_frame_fields() {
        let frame = syncframe(0, 10, 8, 0, 7, 1);
        let dac3 = dac3_from_syncframe(&frame).unwrap();
        assert_eq!(dac3.fscod, 0);
        assert_eq!(dac3.bsid, 8);
        assert_eq!(dac3.bsmod, 0);
        assert_eq!(dac3.acmod, 7);
        assert_eq!(dac3.lfeon, 1);
        assert_eq!(dac3.bit_rate_code, 5);
        assert_eq!(dac3.channel_count(), 6);
        assert_eq!(dac3.sample_rate(), Some(48000));
    }

    #[test]
    fn dac3_rejects_eac3_bsid() {
        let frame = syncframe(0, 10, 12, 0, 2, 0);
        assert!(dac3_from_syncframe(&frame).is_err());
    }

    #[test]
    fn dac3_rejects_reserved_fscod() {
        let frame = syncframe(3, 10, 8, 0, 2, 0);
        assert!(dac3_from_syncframe(&frame).is_err());
    }

    #[test]
    fn dac3_box_payload_is_bit_exact() {
        use crate::io::MemBuffer;
        use crate::serialize::ToBytes;

        let frame = syncframe(0, 10, 8, 0, 7, 1);
        let dac3 = dac3_from_syncframe(&frame).unwrap();
        let mut buf = MemBuffer::new();
        dac3.to_bytes(&mut buf).unwrap();
        let bytes = buf.into_vec();
        // 8 byte header + 3 byte payload.
        assert_eq!(bytes.len(), 11);
        assert_eq!(&bytes[..8], &[0, 0, 0, 11, b'd', b'a', b'c', b'3']);
        // fscod(2)=0 bsid(5)=8 bsmod(3)=0 acmod(3)=7 lfeon(1)=1
        // bit_rate_code(5)=5 reserved(5)=0
        assert_eq!(&bytes[8..], &[0x10, 0x3c, 0xa0]);
    }
}
