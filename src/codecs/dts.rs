//! DTS audio configuration recovery (ETSI TS 102 114).
//!
//! A `ddts` description is recovered by parsing one access unit: a
//! core substream (sync 0x7FFE8001) and/or extension substreams
//! (sync 0x64582025). The parser scans for the coding components
//! (XCH, XXCH, X96, XBR, XLL, LBR, core-in-extension) and maps the
//! observed composition onto StreamConstruction, which in turn picks
//! the codingname.
use crate::bitreader::BitReader;
use crate::boxes::DTSSpecificBox;
use crate::error::{Error, Result};
use crate::types::FourCC;

pub const DTS_MAX_CORE_SIZE: usize = 16384;
pub const DTS_MAX_EXSS_SIZE: usize = 32768;
/// The maximum number of extension substreams.
pub const DTS_MAX_NUM_EXSS: usize = 4;
pub const DTS_MAX_STREAM_CONSTRUCTION: u8 = 21;

const DTS_MIN_CORE_SIZE: u32 = 96;

const SYNCWORD_CORE: u32 = 0x7FFE8001;
const SYNCWORD_XCH: u32 = 0x5A5A5A5A;
const SYNCWORD_XXCH: u32 = 0x47004A03;
const SYNCWORD_X96K: u32 = 0x1D95F262;
const SYNCWORD_XBR: u32 = 0x655E315E;
const SYNCWORD_LBR: u32 = 0x0A801921;
const SYNCWORD_XLL: u32 = 0x41A29547;
const SYNCWORD_SUBSTREAM: u32 = 0x64582025;
const SYNCWORD_SUBSTREAM_CORE: u32 = 0x02B09261;

// Composition flags, one bit per observed coding component.
pub const CORE_SUBSTREAM_CORE_FLAG: u32 = 0x001;
pub const CORE_SUBSTREAM_XXCH_FLAG: u32 = 0x002;
pub const CORE_SUBSTREAM_X96_FLAG: u32 = 0x004;
pub const CORE_SUBSTREAM_XCH_FLAG: u32 = 0x008;
pub const EXT_SUBSTREAM_CORE_FLAG: u32 = 0x010;
pub const EXT_SUBSTREAM_XBR_FLAG: u32 = 0x020;
pub const EXT_SUBSTREAM_XXCH_FLAG: u32 = 0x040;
pub const EXT_SUBSTREAM_X96_FLAG: u32 = 0x080;
pub const EXT_SUBSTREAM_LBR_FLAG: u32 = 0x100;
pub const EXT_SUBSTREAM_XLL_FLAG: u32 = 0x200;

// StreamConstruction = 1-based index into this table. Unknown
// compositions map to 0 ('dtsh' by default).
const CONSTRUCTION_INFO: [u32; DTS_MAX_STREAM_CONSTRUCTION as usize + 1] = [
    0,
    CORE_SUBSTREAM_CORE_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | CORE_SUBSTREAM_XCH_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | CORE_SUBSTREAM_XXCH_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | CORE_SUBSTREAM_X96_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | EXT_SUBSTREAM_XXCH_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | EXT_SUBSTREAM_XBR_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | CORE_SUBSTREAM_XCH_FLAG | EXT_SUBSTREAM_XBR_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | CORE_SUBSTREAM_XXCH_FLAG | EXT_SUBSTREAM_XBR_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | EXT_SUBSTREAM_XXCH_FLAG | EXT_SUBSTREAM_XBR_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | EXT_SUBSTREAM_X96_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | CORE_SUBSTREAM_XCH_FLAG | EXT_SUBSTREAM_X96_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | CORE_SUBSTREAM_XXCH_FLAG | EXT_SUBSTREAM_X96_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | EXT_SUBSTREAM_XXCH_FLAG | EXT_SUBSTREAM_X96_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | EXT_SUBSTREAM_XLL_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | CORE_SUBSTREAM_XCH_FLAG | EXT_SUBSTREAM_XLL_FLAG,
    CORE_SUBSTREAM_CORE_FLAG | CORE_SUBSTREAM_X96_FLAG | EXT_SUBSTREAM_XLL_FLAG,
    EXT_SUBSTREAM_XLL_FLAG,
    EXT_SUBSTREAM_LBR_FLAG,
    EXT_SUBSTREAM_CORE_FLAG,
    EXT_SUBSTREAM_CORE_FLAG | EXT_SUBSTREAM_XXCH_FLAG,
    EXT_SUBSTREAM_CORE_FLAG | EXT_SUBSTREAM_XLL_FLAG,
];

// ddts ChannelLayout bits.
pub const CHANNEL_LAYOUT_C: u16 = 0x0001;
pub const CHANNEL_LAYOUT_L_R: u16 = 0x0002;
pub const CHANNEL_LAYOUT_LS_RS: u16 = 0x0004;
pub const CHANNEL_LAYOUT_LFE1: u16 = 0x0008;
pub const CHANNEL_LAYOUT_CS: u16 = 0x0010;
pub const CHANNEL_LAYOUT_LH_RH: u16 = 0x0020;
pub const CHANNEL_LAYOUT_LSR_RSR: u16 = 0x0040;
pub const CHANNEL_LAYOUT_CH: u16 = 0x0080;
pub const CHANNEL_LAYOUT_OH: u16 = 0x0100;
pub const CHANNEL_LAYOUT_LC_RC: u16 = 0x0200;
pub const CHANNEL_LAYOUT_LW_RW: u16 = 0x0400;
pub const CHANNEL_LAYOUT_LSS_RSS: u16 = 0x0800;
pub const CHANNEL_LAYOUT_LFE2: u16 = 0x1000;
pub const CHANNEL_LAYOUT_LHS_RHS: u16 = 0x2000;
pub const CHANNEL_LAYOUT_CHR: u16 = 0x4000;
pub const CHANNEL_LAYOUT_LHR_RHR: u16 = 0x8000;

const CHANNEL_PAIR_MASK: u16 = CHANNEL_LAYOUT_L_R
    | CHANNEL_LAYOUT_LS_RS
    | CHANNEL_LAYOUT_LH_RH
    | CHANNEL_LAYOUT_LSR_RSR
    | CHANNEL_LAYOUT_LC_RC
    | CHANNEL_LAYOUT_LW_RW
    | CHANNEL_LAYOUT_LSS_RSS
    | CHANNEL_LAYOUT_LHS_RHS
    | CHANNEL_LAYOUT_LHR_RHR;

/// StreamConstruction from the observed composition flags.
pub fn stream_construction(flags: u32) -> u8 {
    for sc in 1..=DTS_MAX_STREAM_CONSTRUCTION {
        if flags == CONSTRUCTION_INFO[sc as usize] {
            return sc;
        }
    }
    // Unlisted compositions get 0; the codingname defaults to 'dtsh'.
    0
}

/// Composition flags of a StreamConstruction value.
pub fn construction_flags(stream_construction: u8) -> u32 {
    if stream_construction <= DTS_MAX_STREAM_CONSTRUCTION {
        CONSTRUCTION_INFO[stream_construction as usize]
    } else {
        0
    }
}

/// Which sample entry codingname a ddts calls for.
pub fn codingname(ddts: &DTSSpecificBox) -> FourCC {
    // Multiple asset streams shall use the 'dtsh' coding name.
    if ddts.multi_asset_flag > 0 {
        return FourCC::new("dtsh");
    }
    const CODINGNAME_TABLE: [&str; DTS_MAX_STREAM_CONSTRUCTION as usize + 1] = [
        "dtsh", // Undefined stream types default to 'dtsh'.
        "dtsc", "dtsc", "dtsh", "dtsc", "dtsh", "dtsh", "dtsh", "dtsh", "dtsh", "dtsh", "dtsh",
        "dtsh", "dtsh", "dtsl", "dtsl", "dtsl", "dtsl", "dtse", "dtsh", "dtsh", "dtsl",
    ];
    let sc = std::cmp::min(ddts.stream_construction, DTS_MAX_STREAM_CONSTRUCTION) as usize;
    FourCC::new(CODINGNAME_TABLE[sc])
}

/// Channels in a ChannelLayout bitmap (pair bits count double).
pub fn channel_count_from_layout(channel_layout: u16) -> u32 {
    channel_layout.count_ones() + (channel_layout & CHANNEL_PAIR_MASK).count_ones()
}

fn channel_layout_from_ls_mask32(mask: u32) -> u16 {
    let mut layout = 0;
    // Loudspeaker activity mask bits to ChannelLayout bits. CH, OH,
    // LFE1, LFE2, C, CS and CHR are singletons; the rest map as pairs.
    let table: [(u32, u16); 16] = [
        (0x00000001, CHANNEL_LAYOUT_C),                    /* C        */
        (0x00000002 | 0x00000004, CHANNEL_LAYOUT_L_R),     /* L, R     */
        (0x00000008 | 0x00000010, CHANNEL_LAYOUT_LS_RS),   /* LS, RS   */
        (0x00000020, CHANNEL_LAYOUT_LFE1),                 /* LFE1     */
        (0x00000040, CHANNEL_LAYOUT_CS),                   /* CS       */
        (0x00002000 | 0x00008000, CHANNEL_LAYOUT_LH_RH),   /* LH, RH   */
        (0x00000080 | 0x00000100, CHANNEL_LAYOUT_LSR_RSR), /* LSR, RSR */
        (0x00004000, CHANNEL_LAYOUT_CH),                   /* CH       */
        (0x00080000, CHANNEL_LAYOUT_OH),                   /* OH       */
        (0x00000800 | 0x00001000, CHANNEL_LAYOUT_LC_RC),   /* LC, RC   */
        (0x00020000 | 0x00040000, CHANNEL_LAYOUT_LW_RW),   /* LW, RW   */
        (0x00000200 | 0x00000400, CHANNEL_LAYOUT_LSS_RSS), /* LSS, RSS */
        (0x00010000, CHANNEL_LAYOUT_LFE2),                 /* LFE2     */
        (0x00100000 | 0x00200000, CHANNEL_LAYOUT_LHS_RHS), /* LHS, RHS */
        (0x00400000, CHANNEL_LAYOUT_CHR),                  /* CHR      */
        (0x00800000 | 0x01000000, CHANNEL_LAYOUT_LHR_RHR), /* LHR, RHR */
    ];
    for (mask_bits, bit) in table.iter() {
        if mask & mask_bits > 0 {
            layout |= bit;
        }
    }
    layout
}

// Channels which cannot be expressed by ChannelLayout: CL, LL and RL.
fn lower_channels_from_ls_mask32(mask: u32) -> u8 {
    ((mask >> 25) & 0x7) as u8
}

#[derive(Clone, Default)]
struct CoreInfo {
    sampling_frequency:         u32,
    frame_duration:             u32,
    frame_size:                 u32,
    channel_layout:             u16,
    channel_arrangement:        u8,
    extension_audio_descriptor: u8,
    pcm_resolution:             u8,
    xxch_size:                  u32,
    xxch_channel_layout:        u16,
    xxch_lower_planes:          u8,
}

#[derive(Clone, Default)]
struct XllInfo {
    size:               u32,
    channel_layout:     u16,
    sampling_frequency: u32,
    frame_duration:     u32,
    pcm_resolution:     u8,
    stereo_downmix:     u8,
    lower_planes:       u8,
}

#[derive(Clone, Default)]
struct LbrInfo {
    size:               u32,
    channel_layout:     u16,
    sampling_frequency: u32,
    frame_duration:     u32,
    stereo_downmix:     u8,
    lfe_present:        u8,
    duration_modifier:  u8,
    sample_size:        u8,
}

#[derive(Clone, Default)]
struct Asset {
    size:                u32,
    channel_layout:      u16,
    one2one_map:         bool,
    representation_type: u8,
    coding_mode:         u8,
    core_extension_mask: u32,
    core:                CoreInfo,
    xll:                 XllInfo,
    lbr:                 LbrInfo,
    xbr_size:            u32,
    x96_size:            u32,
    aux_size:            u32,
}

#[derive(Clone, Default)]
struct ExtensionInfo {
    sampling_frequency: u32,
    frame_duration:     u32,
    bits4_exss_fsize:   u32,
    static_fields:      bool,
    mix_metadata:       bool,
    num_mix_configs:    usize,
    num_mix_out_ch:     [u8; 4],
    num_audio_present:  usize,
    num_assets:         usize,
    active_exss_mask:   [u8; 8],
    active_asset_mask:  [[u8; 4]; 8],
    bc_core_present:    [bool; 8],
    stereo_downmix:     u8,
    bit_resolution:     u8,
    assets:             Vec<Asset>,
}

/// Parser state over one access unit.
#[derive(Default)]
struct DtsInfo {
    flags:          u32,
    core:           CoreInfo,
    exss:           [ExtensionInfo; DTS_MAX_NUM_EXSS],
    exss_index:     usize,
    frame_duration: u32,
    frame_size:     usize,
}

#[derive(Clone, Copy, PartialEq)]
enum SubstreamType {
    None,
    Core,
    Extension,
}

fn substream_type(data: &[u8]) -> SubstreamType {
    if data.len() < 4 {
        return SubstreamType::None;
    }
    let syncword = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    match syncword {
        SYNCWORD_CORE => SubstreamType::Core,
        SYNCWORD_SUBSTREAM => SubstreamType::Extension,
        _ => SubstreamType::None,
    }
}

/// Recover a `ddts` description from one DTS access unit.
pub fn ddts_from_frame(data: &[u8]) -> Result<DTSSpecificBox> {
    let mut info = DtsInfo::default();
    let mut prev_type = SubstreamType::None;
    let mut next_frame_pos = 0usize;
    loop {
        // The length 10 is what we need to read the substream frame size.
        if next_frame_pos + 10 > data.len() {
            break;
        }
        let frame = &data[next_frame_pos..];
        let this_type = substream_type(frame);
        match this_type {
            SubstreamType::Core => {
                if prev_type != SubstreamType::None {
                    break; // next AU
                }
                parse_core_substream(&mut info, frame)?;
            },
            SubstreamType::Extension => {
                let exss_index = exss_index_of(frame)?;
                if prev_type == SubstreamType::Extension && exss_index <= info.exss_index {
                    break; // next AU
                }
                parse_extension_substream(&mut info, frame)?;
            },
            SubstreamType::None => {
                return Err(Error::nameless("DTS: unknown substream type"));
            },
        }
        prev_type = this_type;
        next_frame_pos += info.frame_size;
    }
    if prev_type == SubstreamType::None {
        return Err(Error::invalid_data("DTS: no substream found"));
    }
    Ok(build_ddts(&info))
}

fn exss_index_of(frame: &[u8]) -> Result<usize> {
    if frame.len() < 6 {
        return Err(Error::invalid_data("DTS: truncated extension substream"));
    }
    // nExtSSIndex is the top 2 bits after SYNC + UserDefinedBits.
    Ok(((frame[5] >> 6) & 0x3) as usize)
}

fn parse_core_substream(info: &mut DtsInfo, frame: &[u8]) -> Result<()> {
    let mut bits = BitReader::new(frame);
    if bits.read_bits(32)? != SYNCWORD_CORE {
        return Err(Error::invalid_data("DTS: bad core syncword"));
    }
    let core = parse_core(&mut bits, info)?;
    info.flags |= CORE_SUBSTREAM_CORE_FLAG;
    info.frame_size = core.frame_size as usize;
    info.core = core;
    Ok(())
}

fn parse_core(bits: &mut BitReader, info: &mut DtsInfo) -> Result<CoreInfo> {
    let mut core = CoreInfo::default();
    let frame_type = bits.read_bits(1)?; /* FTYPE */
    let deficit_sample_count = bits.read_bits(5)?; /* SHORT */
    if frame_type == 1 && deficit_sample_count != 31 {
        return Err(Error::invalid_data("DTS: normal frame must have SHORT == 31"));
    }
    let crc_present = bits.read_bits(1)?; /* CPF */
    let num_pcm_blocks = bits.read_bits(7)? + 1; /* NBLKS */
    if num_pcm_blocks <= 5 {
        return Err(Error::invalid_data("DTS: too few PCM sample blocks"));
    }
    core.frame_duration = 32 * num_pcm_blocks;
    if frame_type == 1 && !matches!(core.frame_duration, 256 | 512 | 1024 | 2048 | 4096) {
        return Err(Error::invalid_data("DTS: invalid frame duration"));
    }
    core.frame_size = bits.read_bits(14)? + 1; /* FSIZE */
    if core.frame_size < DTS_MIN_CORE_SIZE {
        return Err(Error::invalid_data("DTS: core frame too small"));
    }
    core.channel_arrangement = bits.read_bits(6)? as u8; /* AMODE */
    core.channel_layout = channel_layout_from_core(core.channel_arrangement);
    let sfreq = bits.read_bits(4)? as usize; /* SFREQ */
    const SAMPLING_FREQUENCY_TABLE: [u32; 16] = [
        0, 8000, 16000, 32000, 0, 0, 11025, 22050, 44100, 0, 0, 12000, 24000, 48000, 0, 0,
    ];
    core.sampling_frequency = SAMPLING_FREQUENCY_TABLE[sfreq];
    if core.sampling_frequency == 0 {
        return Err(Error::invalid_data("DTS: invalid core sampling frequency"));
    }
    bits.skip(10)?; /* RATE, MIX, DYNF, TIMEF, AUXF, HDCD */
    core.extension_audio_descriptor = bits.read_bits(3)? as u8; /* EXT_AUDIO_ID */
    let extended_coding = bits.read_bits(1)?; /* EXT_AUDIO */
    bits.skip(1)?; /* ASPF */
    let lff = bits.read_bits(2)?; /* LFF */
    if lff == 0x3 {
        return Err(Error::invalid_data("DTS: invalid LFF"));
    }
    if lff > 0 {
        core.channel_layout |= CHANNEL_LAYOUT_LFE1;
    }
    bits.skip(8 + crc_present * 16)?; /* HFLAG, HCRC, FILTS, VERNUM, CHIST */
    let pcmr = bits.read_bits(3)? as usize; /* PCMR */
    const SOURCE_RESOLUTION_TABLE: [u8; 8] = [16, 16, 20, 20, 0, 24, 24, 0];
    core.pcm_resolution = SOURCE_RESOLUTION_TABLE[pcmr];
    if core.pcm_resolution == 0 {
        return Err(Error::invalid_data("DTS: invalid PCM resolution"));
    }
    bits.skip(6)?; /* SUMF, SUMS, DIALNORM */
    if extended_coding > 0 {
        // Scan for extension syncwords inside the core frame.
        let frame_size_bits = core.frame_size as usize * 8;
        let mut syncword = bits.read_bits(24)?;
        while bits.pos + 24 < frame_size_bits {
            syncword = ((syncword << 8) & 0xffffff00) | bits.read_bits(8)?;
            match syncword {
                SYNCWORD_XXCH => {
                    parse_core_xxch(bits, info, &mut core)?;
                    syncword = bits.read_bits(24)?;
                },
                SYNCWORD_X96K => {
                    parse_core_x96(bits, info, &mut core)?;
                    syncword = bits.read_bits(24)?;
                },
                SYNCWORD_XCH => {
                    parse_core_xch(bits, info, &mut core)?;
                },
                _ => continue,
            }
        }
    }
    Ok(core)
}

fn channel_layout_from_core(channel_arrangement: u8) -> u16 {
    const MAP: [u16; 16] = [
        CHANNEL_LAYOUT_C,
        CHANNEL_LAYOUT_L_R, // dual mono
        CHANNEL_LAYOUT_L_R, // stereo
        CHANNEL_LAYOUT_L_R, // sum-difference
        CHANNEL_LAYOUT_L_R, // Lt/Rt
        CHANNEL_LAYOUT_C | CHANNEL_LAYOUT_L_R,
        CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_CS,
        CHANNEL_LAYOUT_C | CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_CS,
        CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_LS_RS,
        CHANNEL_LAYOUT_C | CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_LS_RS,
        CHANNEL_LAYOUT_LC_RC | CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_LS_RS,
        CHANNEL_LAYOUT_C | CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_LSR_RSR | CHANNEL_LAYOUT_OH,
        CHANNEL_LAYOUT_C | CHANNEL_LAYOUT_CS | CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_LSR_RSR,
        CHANNEL_LAYOUT_C | CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_LC_RC | CHANNEL_LAYOUT_LS_RS,
        CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_LC_RC | CHANNEL_LAYOUT_LS_RS | CHANNEL_LAYOUT_LSR_RSR,
        CHANNEL_LAYOUT_C
            | CHANNEL_LAYOUT_CS
            | CHANNEL_LAYOUT_L_R
            | CHANNEL_LAYOUT_LC_RC
            | CHANNEL_LAYOUT_LS_RS,
    ];
    if (channel_arrangement as usize) < 16 {
        MAP[channel_arrangement as usize]
    } else {
        0
    }
}

fn parse_xxch(bits: &mut BitReader, layout: &mut u16, lower_planes: &mut u8) -> Result<()> {
    // XXCH Frame Header; syncword already consumed.
    let xxch_pos = bits.pos - 32;
    let header_size = (bits.read_bits(6)? + 1) as usize; /* nuHeaderSizeXXCh */
    bits.skip(1)?; /* bCRCPresent4ChSetHeaderXXCh */
    let bits4_spkr_mask = bits.read_bits(5)? + 1; /* nuBits4SpkrMaskXXCh */
    let num_ch_sets = bits.read_bits(2)? + 1; /* nuNumChSetsInXXCh */
    for _ in 0..num_ch_sets {
        bits.skip(14)?; /* pnuChSetFsizeXXCh - 1 */
    }
    let xxch_mask = bits.read_bits(bits4_spkr_mask)?; /* nuCoreSpkrActivityMask */
    *layout |= channel_layout_from_ls_mask32(xxch_mask);
    *lower_planes = lower_channels_from_ls_mask32(xxch_mask);
    skip_to(bits, xxch_pos + header_size * 8)?;
    for _ in 0..num_ch_sets {
        // XXCH Channel Set Header
        let chset_pos = bits.pos;
        let chset_header_size = (bits.read_bits(7)? + 1) as usize;
        bits.skip(3)?; /* nuChInChSetXXCh */
        if bits4_spkr_mask > 6 {
            let mask = bits.read_bits(bits4_spkr_mask - 6)? << 6; /* nuXXChSpkrLayoutMask */
            *layout |= channel_layout_from_ls_mask32(mask);
            *lower_planes |= lower_channels_from_ls_mask32(mask);
        }
        skip_to(bits, chset_pos + chset_header_size * 8)?;
    }
    Ok(())
}

fn parse_core_xxch(bits: &mut BitReader, info: &mut DtsInfo, core: &mut CoreInfo) -> Result<()> {
    if core.extension_audio_descriptor == 0 || core.extension_audio_descriptor == 3 {
        return Err(Error::invalid_data("DTS: XXCH without matching EXT_AUDIO_ID"));
    }
    let mut layout = core.xxch_channel_layout;
    let mut lower = core.xxch_lower_planes;
    parse_xxch(bits, &mut layout, &mut lower)?;
    core.xxch_channel_layout = layout;
    core.xxch_lower_planes = lower;
    info.flags |= CORE_SUBSTREAM_XXCH_FLAG;
    Ok(())
}

fn parse_core_x96(bits: &mut BitReader, info: &mut DtsInfo, core: &mut CoreInfo) -> Result<()> {
    if core.extension_audio_descriptor != 2 && core.extension_audio_descriptor != 3 {
        // Probably not an X96 extension; skip.
        return Ok(());
    }
    // The distance to the end of the frame must match FSIZE96, else
    // we hit pseudo sync bytes.
    let b0 = peek_byte(bits, 0)?;
    let b1 = peek_byte(bits, 1)?;
    let fsize96 = (((b0 as usize) << 4) | ((b1 as usize) >> 4)) + 1;
    if core.frame_size as usize * 8 != bits.pos - 32 + fsize96 * 8 {
        return Ok(());
    }
    bits.skip(16)?; /* FSIZE96, REVNO */
    core.sampling_frequency *= 2;
    core.frame_duration *= 2;
    info.flags |= CORE_SUBSTREAM_X96_FLAG;
    Ok(())
}

fn parse_core_xch(bits: &mut BitReader, info: &mut DtsInfo, core: &mut CoreInfo) -> Result<()> {
    if core.extension_audio_descriptor != 0 && core.extension_audio_descriptor != 3 {
        return Ok(());
    }
    // The estimated distance is checked against XChFSIZE+1 as well as
    // XChFSIZE for compatibility with legacy bitstreams.
    let b0 = peek_byte(bits, 0)?;
    let b1 = peek_byte(bits, 1)?;
    let xch_fsize = ((b0 as usize) << 2) | ((b1 as usize) >> 6);
    let here = bits.pos - 32;
    let total = core.frame_size as usize * 8;
    if total != here + (xch_fsize + 1) * 8 && total != here + xch_fsize * 8 {
        return Ok(());
    }
    if (b1 >> 2) & 0xF != 1 {
        // The only known AMODE value is 1; otherwise just skip.
        return Ok(());
    }
    bits.skip(16)?; /* XChFSIZE, AMODE, byte align */
    core.channel_layout |= CHANNEL_LAYOUT_CS;
    info.flags |= CORE_SUBSTREAM_XCH_FLAG;
    Ok(())
}

fn parse_extension_substream(info: &mut DtsInfo, frame: &[u8]) -> Result<()> {
    let mut bits = BitReader::new(frame);
    bits.skip(40)?; /* SYNCEXTSSH, UserDefinedBits */
    let n_ext_ss_index = bits.read_bits(2)? as usize;
    info.exss_index = n_ext_ss_index;
    info.exss[n_ext_ss_index] = ExtensionInfo::default();

    let header_size_type = bits.read_bits(1)?;
    let bits4_header = 8 + header_size_type * 4;
    let bits4_exss_fsize = 16 + header_size_type * 4;
    let header_size = (bits.read_bits(bits4_header)? + 1) as usize;
    let frame_size = (bits.read_bits(bits4_exss_fsize)? + 1) as usize;
    if frame_size < 10 {
        return Err(Error::invalid_data("DTS: extension substream too small"));
    }
    info.frame_size = frame_size;

    let exss = &mut info.exss[n_ext_ss_index];
    exss.bits4_exss_fsize = bits4_exss_fsize;
    exss.static_fields = bits.read_bits(1)? > 0;
    if exss.static_fields {
        bits.skip(2)?; /* nuRefClockCode */
        exss.frame_duration = 512 * (bits.read_bits(3)? + 1);
        if bits.read_bits(1)? > 0 {
            bits.skip(36)?; /* nuTimeStamp, nLSB */
        }
        exss.num_audio_present = bits.read_bits(3)? as usize + 1;
        exss.num_assets = bits.read_bits(3)? as usize + 1;
        for n_au_pr in 0..exss.num_audio_present {
            exss.active_exss_mask[n_au_pr] = bits.read_bits(n_ext_ss_index as u32 + 1)? as u8;
        }
        for n_au_pr in 0..exss.num_audio_present {
            for n_ss in 0..=n_ext_ss_index {
                exss.active_asset_mask[n_au_pr][n_ss] =
                    if (exss.active_exss_mask[n_au_pr] >> n_ss) & 0x1 > 0 {
                        bits.read_bits(8)? as u8
                    } else {
                        0
                    };
            }
        }
        exss.mix_metadata = bits.read_bits(1)? > 0;
        if exss.mix_metadata {
            bits.skip(2)?; /* nuMixMetadataAdjLevel */
            let bits4_mix_out_mask = (bits.read_bits(2)? + 1) << 2;
            exss.num_mix_configs = bits.read_bits(2)? as usize + 1;
            for ns in 0..exss.num_mix_configs {
                let mask = bits.read_bits(bits4_mix_out_mask)?;
                exss.num_mix_out_ch[ns] = channel_count_from_layout(mask as u16) as u8;
            }
        }
    } else {
        exss.num_audio_present = 1;
        exss.num_assets = 1;
    }
    let num_assets = exss.num_assets;
    let num_audio_present = exss.num_audio_present;
    exss.assets = vec![Asset::default(); num_assets];
    for n_ast in 0..num_assets {
        exss.assets[n_ast].size = bits.read_bits(bits4_exss_fsize)? + 1;
    }
    for n_ast in 0..num_assets {
        parse_asset_descriptor(&mut bits, info, n_ext_ss_index, n_ast)?;
    }
    let exss = &mut info.exss[n_ext_ss_index];
    for n_au_pr in 0..num_audio_present {
        exss.bc_core_present[n_au_pr] = bits.read_bits(1)? > 0;
    }
    for n_au_pr in 0..num_audio_present {
        if exss.bc_core_present[n_au_pr] {
            bits.skip(5)?; /* nuBcCoreExtSSIndex, nuBcCoreAssetIndex */
        }
    }
    skip_to(&mut bits, header_size * 8)?;

    // Asset data.
    for n_ast in 0..num_assets {
        let asset_pos = bits.pos;
        let (coding_mode, core_extension_mask, asset_size) = {
            let asset = &info.exss[n_ext_ss_index].assets[n_ast];
            (asset.coding_mode, asset.core_extension_mask, asset.size)
        };
        match coding_mode {
            0 => {
                // DTS-HD coding mode with possibly multiple components.
                if core_extension_mask & EXT_SUBSTREAM_CORE_FLAG > 0 {
                    let core_pos = bits.pos;
                    let core_size = parse_exss_core(&mut bits, info, n_ext_ss_index, n_ast)?;
                    skip_to(&mut bits, core_pos + core_size as usize * 8)?;
                }
                if core_extension_mask & EXT_SUBSTREAM_XBR_FLAG > 0 {
                    let xbr_pos = bits.pos;
                    parse_exss_xbr(&mut bits, info)?;
                    let xbr_size = info.exss[n_ext_ss_index].assets[n_ast].xbr_size;
                    skip_to(&mut bits, xbr_pos + xbr_size as usize * 8)?;
                }
                if core_extension_mask & EXT_SUBSTREAM_XXCH_FLAG > 0 {
                    let xxch_pos = bits.pos;
                    parse_exss_xxch(&mut bits, info, n_ext_ss_index, n_ast)?;
                    let xxch_size = info.exss[n_ext_ss_index].assets[n_ast].core.xxch_size;
                    skip_to(&mut bits, xxch_pos + xxch_size as usize * 8)?;
                }
                if core_extension_mask & EXT_SUBSTREAM_X96_FLAG > 0 {
                    let x96_pos = bits.pos;
                    parse_exss_x96(&mut bits, info, n_ext_ss_index, n_ast)?;
                    let x96_size = info.exss[n_ext_ss_index].assets[n_ast].x96_size;
                    skip_to(&mut bits, x96_pos + x96_size as usize * 8)?;
                }
                if core_extension_mask & EXT_SUBSTREAM_LBR_FLAG > 0 {
                    let lbr_pos = bits.pos;
                    parse_exss_lbr(&mut bits, info, n_ext_ss_index, n_ast)?;
                    let lbr_size = info.exss[n_ext_ss_index].assets[n_ast].lbr.size;
                    skip_to(&mut bits, lbr_pos + lbr_size as usize * 8)?;
                }
                if core_extension_mask & EXT_SUBSTREAM_XLL_FLAG > 0 {
                    let xll_pos = bits.pos;
                    parse_exss_xll(&mut bits, info, n_ext_ss_index, n_ast)?;
                    let xll_size = info.exss[n_ext_ss_index].assets[n_ast].xll.size;
                    skip_to(&mut bits, xll_pos + xll_size as usize * 8)?;
                }
            },
            1 => {
                // Lossless coding mode without CBR component.
                parse_exss_xll(&mut bits, info, n_ext_ss_index, n_ast)?;
            },
            2 => {
                // Low bit-rate mode.
                parse_exss_lbr(&mut bits, info, n_ext_ss_index, n_ast)?;
            },
            _ => {
                // Auxiliary coding mode.
                let aux_size = info.exss[n_ext_ss_index].assets[n_ast].aux_size;
                bits.skip(aux_size * 8)?;
            },
        }
        skip_to(&mut bits, asset_pos + asset_size as usize * 8)?;
    }
    Ok(())
}

fn parse_asset_descriptor(
    bits: &mut BitReader,
    info: &mut DtsInfo,
    exss_index: usize,
    asset_hint: usize,
) -> Result<()> {
    let descriptor_pos = bits.pos;
    let descriptor_size = (bits.read_bits(9)? + 1) as usize; /* nuAssetDescriptFsize */
    let asset_index = (bits.read_bits(3)? as usize).min(7); /* nuAssetIndex */
    let exss = &mut info.exss[exss_index];
    let n_ast = if asset_index < exss.assets.len() {
        asset_index
    } else {
        asset_hint
    };

    let mut embedded_stereo = false;
    let mut embedded_six_ch = false;
    let mut total_channels = 0u32;
    if exss.static_fields {
        if bits.read_bits(1)? > 0 {
            bits.skip(4)?; /* nuAssetTypeDescriptor */
        }
        if bits.read_bits(1)? > 0 {
            bits.skip(24)?; /* LanguageDescriptor */
        }
        if bits.read_bits(1)? > 0 {
            let text_size = bits.read_bits(10)? + 1;
            bits.skip(text_size * 8)?; /* InfoTextString */
        }
        let bit_resolution = bits.read_bits(5)? as u8 + 1; /* nuBitResolution */
        exss.bit_resolution = exss.bit_resolution.max(bit_resolution);
        let max_sample_rate = bits.read_bits(4)? as usize; /* nuMaxSampleRate */
        const SOURCE_SAMPLE_RATE_TABLE: [u32; 16] = [
            8000, 16000, 32000, 64000, 128000, 22050, 44100, 88200, 176400, 352800, 12000, 24000,
            48000, 96000, 192000, 384000,
        ];
        exss.sampling_frequency = exss
            .sampling_frequency
            .max(SOURCE_SAMPLE_RATE_TABLE[max_sample_rate]);
        total_channels = bits.read_bits(8)? + 1; /* nuTotalNumChs */
        let one2one = bits.read_bits(1)? > 0; /* bOne2OneMapChannels2Speakers */
        exss.assets[n_ast].one2one_map = one2one;
        if one2one {
            if total_channels > 2 {
                embedded_stereo = bits.read_bits(1)? > 0;
                exss.stereo_downmix |= embedded_stereo as u8;
            }
            if total_channels > 6 {
                embedded_six_ch = bits.read_bits(1)? > 0;
            }
            let bits4_sa_mask;
            if bits.read_bits(1)? > 0 {
                /* bSpkrMaskEnabled */
                bits4_sa_mask = (bits.read_bits(2)? + 1) << 2;
                let mask = bits.read_bits(bits4_sa_mask)?;
                exss.assets[n_ast].channel_layout |= mask as u16;
            } else {
                // Value unspecified when bSpkrMaskEnabled is 0.
                bits4_sa_mask = 16;
            }
            let remap_sets = bits.read_bits(3)? as usize;
            let mut layout_masks = [0u32; 8];
            for ns in 0..remap_sets {
                layout_masks[ns] = bits.read_bits(bits4_sa_mask)?;
            }
            for ns in 0..remap_sets {
                let speakers = channel_count_from_layout(layout_masks[ns] as u16);
                let dec_ch_for_remap = bits.read_bits(5)? + 1;
                for _ in 0..speakers {
                    let remap_mask = bits.read_bits(dec_ch_for_remap)?;
                    for _ in 0..remap_mask.count_ones() {
                        bits.skip(5)?; /* nuSpkrRemapCodes */
                    }
                }
            }
        } else {
            let representation_type = bits.read_bits(3)? as u8;
            exss.assets[n_ast].representation_type = representation_type;
            if representation_type == 2 || representation_type == 3 {
                total_channels = 2;
            }
        }
    }
    // Dynamic metadata.
    let drc_present = bits.read_bits(1)? > 0;
    if drc_present {
        bits.skip(8)?; /* nuDRCCode */
    }
    if bits.read_bits(1)? > 0 {
        bits.skip(5)?; /* nuDialNormCode */
    }
    if drc_present && embedded_stereo {
        bits.skip(8)?; /* nuDRC2ChDmixCode */
    }
    let mix_metadata_present = if exss.mix_metadata {
        bits.read_bits(1)? > 0
    } else {
        false
    };
    if mix_metadata_present {
        bits.skip(7)?; /* bExternalMixFlag, nuPostMixGainAdjCode */
        if bits.read_bits(2)? < 3 {
            bits.skip(3)?; /* nuLimit4EmbeddedDRC */
        } else {
            bits.skip(8)?; /* nuCustomDRCCode */
        }
        let per_ch_scale = bits.read_bits(1)? > 0;
        for ns in 0..exss.num_mix_configs {
            if per_ch_scale {
                for _ in 0..exss.num_mix_out_ch[ns] {
                    bits.skip(6)?; /* nuMainAudioScaleCode */
                }
            } else {
                bits.skip(6)?;
            }
        }
        let mut dec_ch = [total_channels, 0, 0];
        let mut n_em_dm = 1;
        if embedded_six_ch {
            dec_ch[n_em_dm] = 6;
            n_em_dm += 1;
        }
        if embedded_stereo {
            dec_ch[n_em_dm] = 2;
            n_em_dm += 1;
        }
        for ns in 0..exss.num_mix_configs {
            for ne in 0..n_em_dm {
                for _ in 0..dec_ch[ne] {
                    let mix_map_mask = bits.read_bits(exss.num_mix_out_ch[ns] as u32)?;
                    for _ in 0..mix_map_mask.count_ones() {
                        bits.skip(6)?; /* nuMixCoeffs */
                    }
                }
            }
        }
    }
    // Decoder navigation data.
    let coding_mode = bits.read_bits(2)? as u8;
    exss.assets[n_ast].coding_mode = coding_mode;
    let bits4_exss_fsize = exss.bits4_exss_fsize;
    match coding_mode {
        0 => {
            let mask = bits.read_bits(12)?;
            exss.assets[n_ast].core_extension_mask = mask;
            if mask & EXT_SUBSTREAM_CORE_FLAG > 0 {
                exss.assets[n_ast].core.frame_size = bits.read_bits(14)? + 1;
                if bits.read_bits(1)? > 0 {
                    bits.skip(2)?; /* nuExSSCoreSyncDistInFrames */
                }
            }
            if mask & EXT_SUBSTREAM_XBR_FLAG > 0 {
                exss.assets[n_ast].xbr_size = bits.read_bits(14)? + 1;
            }
            if mask & EXT_SUBSTREAM_XXCH_FLAG > 0 {
                exss.assets[n_ast].core.xxch_size = bits.read_bits(14)? + 1;
            }
            if mask & EXT_SUBSTREAM_X96_FLAG > 0 {
                exss.assets[n_ast].x96_size = bits.read_bits(12)? + 1;
            }
            if mask & EXT_SUBSTREAM_LBR_FLAG > 0 {
                parse_lbr_navigation(bits, &mut exss.assets[n_ast].lbr)?;
            }
            if mask & EXT_SUBSTREAM_XLL_FLAG > 0 {
                parse_xll_navigation(bits, &mut exss.assets[n_ast].xll, bits4_exss_fsize)?;
            }
        },
        1 => parse_xll_navigation(bits, &mut exss.assets[n_ast].xll, bits4_exss_fsize)?,
        2 => parse_lbr_navigation(bits, &mut exss.assets[n_ast].lbr)?,
        _ => {
            exss.assets[n_ast].aux_size = bits.read_bits(14)? + 1;
        },
    }
    skip_to(bits, descriptor_pos + descriptor_size * 8)?;
    Ok(())
}

fn parse_xll_navigation(bits: &mut BitReader, xll: &mut XllInfo, bits4_exss_fsize: u32) -> Result<()> {
    xll.size = bits.read_bits(bits4_exss_fsize)? + 1; /* nuExSSXLLFsize */
    if bits.read_bits(1)? > 0 {
        /* bExSSXLLSyncPresent */
        bits.skip(4)?; /* nuPeakBRCntrlBuffSzkB */
        let bits_init_dec_dly = bits.read_bits(5)? + 1;
        bits.skip(bits_init_dec_dly)?; /* nuInitLLDecDlyFrames */
        bits.skip(bits4_exss_fsize)?; /* nuExSSXLLSyncOffset */
    }
    Ok(())
}

fn parse_lbr_navigation(bits: &mut BitReader, lbr: &mut LbrInfo) -> Result<()> {
    lbr.size = bits.read_bits(14)?; /* nuExSSLBRFsize */
    if bits.read_bits(1)? > 0 {
        /* bExSSLBRSyncPresent */
        bits.skip(2)?; /* nuExSSLBRSyncDistInFrames */
    }
    Ok(())
}

fn parse_exss_core(
    bits: &mut BitReader,
    info: &mut DtsInfo,
    exss_index: usize,
    n_ast: usize,
) -> Result<u32> {
    if bits.read_bits(32)? != SYNCWORD_SUBSTREAM_CORE {
        return Err(Error::invalid_data("DTS: bad substream core syncword"));
    }
    let core = parse_core(bits, info)?;
    let frame_size = core.frame_size;
    info.exss[exss_index].assets[n_ast].core = core;
    info.flags |= EXT_SUBSTREAM_CORE_FLAG;
    Ok(frame_size)
}

fn parse_exss_xbr(bits: &mut BitReader, info: &mut DtsInfo) -> Result<()> {
    let xbr_pos = bits.pos;
    if bits.read_bits(32)? != SYNCWORD_XBR {
        return Err(Error::invalid_data("DTS: bad XBR syncword"));
    }
    let header_size = (bits.read_bits(6)? + 1) as usize;
    skip_to(bits, xbr_pos + header_size * 8)?;
    info.flags |= EXT_SUBSTREAM_XBR_FLAG;
    Ok(())
}

fn parse_exss_xxch(
    bits: &mut BitReader,
    info: &mut DtsInfo,
    exss_index: usize,
    n_ast: usize,
) -> Result<()> {
    if bits.read_bits(32)? != SYNCWORD_XXCH {
        return Err(Error::invalid_data("DTS: bad XXCH syncword"));
    }
    let core = &mut info.exss[exss_index].assets[n_ast].core;
    let mut layout = core.xxch_channel_layout;
    let mut lower = core.xxch_lower_planes;
    parse_xxch(bits, &mut layout, &mut lower)?;
    core.xxch_channel_layout = layout;
    core.xxch_lower_planes = lower;
    info.flags |= EXT_SUBSTREAM_XXCH_FLAG;
    Ok(())
}

fn parse_exss_x96(
    bits: &mut BitReader,
    info: &mut DtsInfo,
    exss_index: usize,
    n_ast: usize,
) -> Result<()> {
    let x96_pos = bits.pos;
    if bits.read_bits(32)? != SYNCWORD_X96K {
        return Err(Error::invalid_data("DTS: bad X96 syncword"));
    }
    let header_size = (bits.read_bits(6)? + 1) as usize;
    skip_to(bits, x96_pos + header_size * 8)?;
    let core = &mut info.exss[exss_index].assets[n_ast].core;
    core.sampling_frequency *= 2;
    core.frame_duration *= 2;
    info.flags |= EXT_SUBSTREAM_X96_FLAG;
    Ok(())
}

fn parse_exss_lbr(
    bits: &mut BitReader,
    info: &mut DtsInfo,
    exss_index: usize,
    n_ast: usize,
) -> Result<()> {
    if bits.read_bits(32)? != SYNCWORD_LBR {
        return Err(Error::invalid_data("DTS: bad LBR syncword"));
    }
    let fmt_info_code = bits.read_bits(8)?;
    if fmt_info_code == 2 {
        // LBR decoder initialization data.
        let sample_rate_code = bits.read_bits(8)? as usize;
        let spkr_mask = bits.read_bits(16)? as u16;
        bits.skip(16)?; /* nLBRversion */
        let compressed_flags = bits.read_bits(8)?;
        bits.skip(40)?; /* bitrate fields */
        const SOURCE_SAMPLE_RATE_TABLE: [u32; 16] = [
            8000, 16000, 32000, 0, 0, 11025, 22050, 44100, 0, 0, 12000, 24000, 48000, 0, 0, 0,
        ];
        const FLAG_24_BIT_SAMPLES: u32 = 0x01;
        const FLAG_USE_LFE: u32 = 0x02;
        const FLAG_BANDLMT_MASK: u32 = 0x1C;
        const FLAG_STEREO_DOWNMIX: u32 = 0x20;
        let lbr = &mut info.exss[exss_index].assets[n_ast].lbr;
        lbr.sampling_frequency = SOURCE_SAMPLE_RATE_TABLE[sample_rate_code];
        lbr.frame_duration = if lbr.sampling_frequency < 16000 {
            1024
        } else if lbr.sampling_frequency < 32000 {
            2048
        } else {
            4096
        };
        // usLBRSpkrMask is little-endian.
        lbr.channel_layout = spkr_mask.swap_bytes();
        lbr.stereo_downmix |= (compressed_flags & FLAG_STEREO_DOWNMIX > 0) as u8;
        lbr.lfe_present |= (compressed_flags & FLAG_USE_LFE > 0) as u8;
        lbr.duration_modifier |= ((compressed_flags & FLAG_BANDLMT_MASK) == 0x04
            || (compressed_flags & FLAG_BANDLMT_MASK) == 0x0C) as u8;
        lbr.sample_size = if compressed_flags & FLAG_24_BIT_SAMPLES > 0 { 24 } else { 16 };
    } else if fmt_info_code != 1 {
        return Err(Error::nameless("DTS: unknown LBR format info code"));
    }
    info.flags |= EXT_SUBSTREAM_LBR_FLAG;
    Ok(())
}

fn parse_exss_xll(
    bits: &mut BitReader,
    info: &mut DtsInfo,
    exss_index: usize,
    n_ast: usize,
) -> Result<()> {
    let one2one = info.exss[exss_index].assets[n_ast].one2one_map;
    let xll_pos = bits.pos;
    if bits.read_bits(32)? != SYNCWORD_XLL {
        return Err(Error::invalid_data("DTS: bad XLL syncword"));
    }
    bits.skip(4)?; /* nVersion */
    let header_size = (bits.read_bits(8)? + 1) as usize;
    let bits4_frame_fsize = bits.read_bits(5)? + 1;
    bits.skip(bits4_frame_fsize)?; /* nLLFrameSize */
    let num_ch_sets = bits.read_bits(4)? as usize + 1;
    let segments_in_frame = 1u32 << bits.read_bits(4)?;
    let smpl_in_seg = 1u32 << bits.read_bits(4)?;
    bits.skip(5)?; /* nBits4SSize */
    bits.skip(3)?; /* nBandDataCRCEn, bScalableLSBs */
    let bits4_ch_mask = bits.read_bits(5)? + 1;
    skip_to(bits, xll_pos + header_size * 8)?;

    const SOURCE_SAMPLE_RATE_TABLE: [u32; 16] = [
        8000, 16000, 32000, 64000, 128000, 22050, 44100, 88200, 176400, 352800, 12000, 24000,
        48000, 96000, 192000, 384000,
    ];
    let mut sum_ch = 0u32;
    let mut fs1 = 0u32;
    let mut num_freq_bands1 = 0u32;
    let mut xll_out = XllInfo::default();
    xll_out.size = info.exss[exss_index].assets[n_ast].xll.size;
    for n_ch_set in 0..num_ch_sets {
        // Channel Set Sub-Header.
        let chset_pos = bits.pos;
        let chset_header_size = (bits.read_bits(10)? + 1) as usize;
        let chset_channels = bits.read_bits(4)? + 1;
        bits.skip(chset_channels)?; /* nResidualChEncode */
        let bit_resolution = bits.read_bits(5)? as u8 + 1;
        bits.skip(5)?; /* nBitWidth */
        xll_out.pcm_resolution = xll_out.pcm_resolution.max(bit_resolution);
        let sfreq_index = bits.read_bits(4)? as usize;
        let fs = SOURCE_SAMPLE_RATE_TABLE[sfreq_index];
        bits.skip(2)?; /* nFsInterpolate */
        let replacement_set = bits.read_bits(2)?;
        if replacement_set > 0 {
            bits.skip(1)?; /* bActiveReplaceSet */
        }
        if one2one {
            let primary_ch_set = bits.read_bits(1)? > 0;
            let downmix_embedded = bits.read_bits(1)? > 0;
            let mut downmix_type = 0x7; /* unused */
            if downmix_embedded {
                bits.skip(1)?; /* bDownmixEmbedded */
                if primary_ch_set {
                    downmix_type = bits.read_bits(3)? as usize;
                }
            }
            let hier_ch_set = bits.read_bits(1)? > 0;
            if downmix_embedded {
                const DOWNMIX_CHANNEL_COUNT_TABLE: [u32; 8] = [1, 2, 2, 3, 3, 4, 4, 0];
                let n = chset_channels + !primary_ch_set as u32;
                let m = if primary_ch_set {
                    DOWNMIX_CHANNEL_COUNT_TABLE[downmix_type]
                } else {
                    sum_ch
                };
                bits.skip(n * m * 9)?; /* DownmixCoeffs */
                if primary_ch_set && DOWNMIX_CHANNEL_COUNT_TABLE[downmix_type] == 2 {
                    xll_out.stereo_downmix |= 1;
                }
            }
            if hier_ch_set {
                sum_ch += chset_channels;
            }
            if bits.read_bits(1)? > 0 {
                /* bChMaskEnabled */
                let ch_mask = bits.read_bits(bits4_ch_mask)?;
                xll_out.channel_layout |= channel_layout_from_ls_mask32(ch_mask);
                xll_out.lower_planes |= lower_channels_from_ls_mask32(ch_mask);
            } else {
                bits.skip(25 * chset_channels)?; /* RadiusDelta, Theta, Phi */
            }
        } else {
            if bits.read_bits(1)? > 0 {
                /* bMappingCoeffsPresent */
                let bits_ch2spkr_coef = 6 + 2 * bits.read_bits(3)?;
                let num_speaker_configs = bits.read_bits(2)? as usize + 1;
                for _ in 0..num_speaker_configs {
                    let active_ch_mask = bits.read_bits(chset_channels)?;
                    let num_speakers = bits.read_bits(6)? + 1;
                    let spkr_mask_enabled = bits.read_bits(1)? > 0;
                    if spkr_mask_enabled {
                        let spkr_mask = bits.read_bits(bits4_ch_mask)?;
                        xll_out.channel_layout |= channel_layout_from_ls_mask32(spkr_mask);
                        xll_out.lower_planes |= lower_channels_from_ls_mask32(spkr_mask);
                    }
                    for _ in 0..num_speakers {
                        if !spkr_mask_enabled {
                            bits.skip(25)?; /* ChSetSpeakerConfiguration */
                        }
                        for n_ch in 0..chset_channels {
                            if active_ch_mask & (1 << n_ch) > 0 {
                                bits.skip(bits_ch2spkr_coef)?;
                            }
                        }
                    }
                }
            }
        }
        let num_freq_bands = if fs > 96000 {
            if bits.read_bits(1)? > 0 {
                if fs > 192000 { 4 } else { 2 }
            } else {
                if fs > 192000 { 2 } else { 1 }
            }
        } else {
            1
        };
        let smpl_in_seg_ch_set = if n_ch_set == 0 {
            fs1 = fs;
            num_freq_bands1 = num_freq_bands;
            smpl_in_seg
        } else {
            (smpl_in_seg * (fs * num_freq_bands1)) / (fs1 * num_freq_bands)
        };
        if xll_out.sampling_frequency < fs {
            xll_out.sampling_frequency = fs;
            xll_out.frame_duration = segments_in_frame * smpl_in_seg_ch_set * num_freq_bands;
        }
        skip_to(bits, chset_pos + chset_header_size * 8)?;
    }
    info.exss[exss_index].assets[n_ast].xll = xll_out;
    info.flags |= EXT_SUBSTREAM_XLL_FLAG;
    Ok(())
}

// Build the ddts description from everything observed in the AU.
fn build_ddts(info: &DtsInfo) -> DTSSpecificBox {
    let mut ddts = DTSSpecificBox::default();
    let exss_start = info
        .exss
        .iter()
        .position(|e| e.num_audio_present > 0 && e.num_assets > 0)
        .unwrap_or(0);

    // DTSSamplingFrequency and FrameDuration.
    let mut frame_duration = info.core.frame_duration;
    ddts.dts_sampling_frequency = info.core.sampling_frequency;
    for exss in &info.exss[exss_start..] {
        if exss.num_audio_present == 0 || exss.num_assets == 0 {
            continue;
        }
        if ddts.dts_sampling_frequency <= exss.sampling_frequency {
            ddts.dts_sampling_frequency = exss.sampling_frequency;
            frame_duration = exss.frame_duration;
        }
        for asset in &exss.assets {
            for &(freq, dur) in &[
                (asset.core.sampling_frequency, asset.core.frame_duration),
                (asset.lbr.sampling_frequency, asset.lbr.frame_duration),
                (asset.xll.sampling_frequency, asset.xll.frame_duration),
            ] {
                if ddts.dts_sampling_frequency <= freq {
                    ddts.dts_sampling_frequency = freq;
                    frame_duration = dur;
                }
            }
        }
    }
    ddts.frame_duration = 0;
    let mut fd = frame_duration >> 10;
    while fd > 0 {
        ddts.frame_duration += 1;
        fd >>= 1;
    }

    // pcmSampleDepth.
    let mut depth = info.core.pcm_resolution;
    for exss in &info.exss[exss_start..] {
        if exss.num_audio_present == 0 || exss.num_assets == 0 {
            continue;
        }
        depth = depth.max(exss.bit_resolution);
        for asset in &exss.assets {
            depth = depth.max(asset.core.pcm_resolution);
            depth = depth.max(asset.lbr.sample_size);
            depth = depth.max(asset.xll.pcm_resolution);
        }
    }
    ddts.pcm_sample_depth = if depth > 16 { 24 } else { 16 };

    // StreamConstruction.
    ddts.stream_construction = stream_construction(info.flags);

    // CoreLFEPresent.
    ddts.core_lfe_present = (info.core.channel_layout & CHANNEL_LAYOUT_LFE1 > 0) as u8;

    // CoreLayout.
    ddts.core_layout = if ddts.stream_construction == 0 || ddts.stream_construction >= 17 {
        31 // Use ChannelLayout.
    } else {
        let ca = info.core.channel_arrangement;
        if ca != 1 && ca != 3 && ca <= 9 {
            ca
        } else {
            31
        }
    };

    // CoreSize is the copy of FSIZE; it saturates at 0x3FFF.
    ddts.core_size = if info.core.frame_size > 0 {
        std::cmp::min(info.core.frame_size - 1, 0x3FFF) as u16
    } else {
        0
    };

    // StereoDownmix.
    for exss in &info.exss[exss_start..] {
        ddts.stereo_downmix |= exss.stereo_downmix;
        for asset in &exss.assets {
            ddts.stereo_downmix |= asset.lbr.stereo_downmix;
            ddts.stereo_downmix |= asset.xll.stereo_downmix;
        }
    }
    ddts.stereo_downmix &= 1;

    // RepresentationType; only meaningful when no asset disagrees.
    let first_representation = info.exss[exss_start]
        .assets
        .first()
        .map(|a| a.representation_type)
        .unwrap_or(0);
    let mut representation_type = first_representation;
    'rep: for (ssi, exss) in info.exss.iter().enumerate().skip(exss_start) {
        if exss.num_audio_present == 0 || exss.num_assets == 0 {
            continue;
        }
        for n_au_pr in 0..exss.num_audio_present {
            let mut asset_count = 0;
            for n_ss in 0..=ssi {
                if (exss.active_exss_mask[n_au_pr] >> n_ss) & 0x1 > 0 {
                    asset_count += exss.active_asset_mask[n_au_pr][n_ss].count_ones();
                }
            }
            if asset_count > 1 {
                // Assets designated for mixing with one another.
                representation_type = 0;
                break 'rep;
            }
            for n_ss in 0..=ssi {
                if (exss.active_exss_mask[n_au_pr] >> n_ss) & 0x1 == 0 {
                    continue;
                }
                for (n_ast, asset) in exss.assets.iter().enumerate() {
                    if (exss.active_asset_mask[n_au_pr][n_ss] >> n_ast) & 0x1 > 0
                        && asset.representation_type != first_representation
                    {
                        representation_type = 0;
                        break 'rep;
                    }
                }
            }
        }
    }
    ddts.representation_type = representation_type;

    // ChannelLayout: all channels coded in core and extensions.
    if representation_type == 0 {
        ddts.channel_layout = info.core.channel_layout | info.core.xxch_channel_layout;
        for exss in &info.exss[exss_start..] {
            if exss.num_audio_present == 0 || exss.num_assets == 0 {
                continue;
            }
            for asset in &exss.assets {
                ddts.channel_layout |= asset.channel_layout;
                ddts.channel_layout |= asset.core.channel_layout;
                ddts.channel_layout |= asset.core.xxch_channel_layout;
                ddts.channel_layout |= asset.lbr.channel_layout;
                ddts.channel_layout |= asset.xll.channel_layout;
            }
        }
    }

    // MultiAssetFlag: the remaining parameters only reflect the first
    // asset when multiple assets exist.
    let total_assets: usize = info.exss.iter().map(|e| e.num_assets).sum();
    ddts.multi_asset_flag = (total_assets > 1) as u8;

    // LBRDurationMod.
    ddts.lbr_duration_mod = info.exss[exss_start]
        .assets
        .first()
        .map(|a| a.lbr.duration_modifier)
        .unwrap_or(0);

    ddts
}

fn peek_byte(bits: &mut BitReader, offset: usize) -> Result<u8> {
    let pos = (bits.pos + 7) / 8 + offset;
    if pos >= bits.data.len() {
        return Err(Error::invalid_data("DTS: truncated stream"));
    }
    Ok(bits.data[pos])
}

fn skip_to(bits: &mut BitReader, target: usize) -> Result<()> {
    if target < bits.pos {
        return Err(Error::invalid_data("DTS: element overran its declared size"));
    }
    bits.skip((target - bits.pos) as u32)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_construction_lookup() {
        assert_eq!(stream_construction(CORE_SUBSTREAM_CORE_FLAG), 1);
        assert_eq!(
            stream_construction(CORE_SUBSTREAM_CORE_FLAG | CORE_SUBSTREAM_XCH_FLAG),
            2
        );
        assert_eq!(stream_construction(EXT_SUBSTREAM_XLL_FLAG), 17);
        assert_eq!(stream_construction(EXT_SUBSTREAM_LBR_FLAG), 18);
        // Unknown composition.
        assert_eq!(stream_construction(CORE_SUBSTREAM_XCH_FLAG), 0);
    }

    #[test]
    fn codingname_selection() {
        let mut ddts = DTSSpecificBox::default();
        ddts.stream_construction = 1;
        assert_eq!(codingname(&ddts), FourCC::new("dtsc"));
        ddts.stream_construction = 18;
        assert_eq!(codingname(&ddts), FourCC::new("dtse"));
        ddts.stream_construction = 14;
        assert_eq!(codingname(&ddts), FourCC::new("dtsl"));
        // Multi-asset always picks dtsh.
        ddts.multi_asset_flag = 1;
        assert_eq!(codingname(&ddts), FourCC::new("dtsh"));
    }

    #[test]
    fn ls_mask_to_channel_layout() {
        // 7.1: C, L, R, LFE1, Lss, Rss plus Lsr, Rsr from XXCH.
        let mask = 0x00000001 | 0x00000002 | 0x00000004 | 0x00000020 | 0x00000200 | 0x00000400
            | 0x00000080 | 0x00000100;
        assert_eq!(
            channel_layout_from_ls_mask32(mask),
            CHANNEL_LAYOUT_C
                | CHANNEL_LAYOUT_L_R
                | CHANNEL_LAYOUT_LFE1
                | CHANNEL_LAYOUT_LSS_RSS
                | CHANNEL_LAYOUT_LSR_RSR
        );
        // The singletons map alone.
        assert_eq!(channel_layout_from_ls_mask32(0x00004000), CHANNEL_LAYOUT_CH);
        assert_eq!(channel_layout_from_ls_mask32(0x00080000), CHANNEL_LAYOUT_OH);
        assert_eq!(channel_layout_from_ls_mask32(0x00010000), CHANNEL_LAYOUT_LFE2);
        // Height and wide pairs.
        assert_eq!(
            channel_layout_from_ls_mask32(0x00002000 | 0x00008000),
            CHANNEL_LAYOUT_LH_RH
        );
        assert_eq!(
            channel_layout_from_ls_mask32(0x00020000 | 0x00040000),
            CHANNEL_LAYOUT_LW_RW
        );
        // LC has no singleton bit of its own; it only maps to the pair.
        assert_eq!(channel_layout_from_ls_mask32(0x00000800), CHANNEL_LAYOUT_LC_RC);
        // The lower plane channels have no ChannelLayout bits.
        assert_eq!(channel_layout_from_ls_mask32(0x02000000), 0);
        assert_eq!(lower_channels_from_ls_mask32(0x02000000), 0x1);
    }

    #[test]
    fn channel_counts() {
        // C + L/R + LFE1 = 4 channels.
        assert_eq!(
            channel_count_from_layout(CHANNEL_LAYOUT_C | CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_LFE1),
            4
        );
        // 5.1: C + L/R + Ls/Rs + LFE1.
        assert_eq!(
            channel_count_from_layout(
                CHANNEL_LAYOUT_C | CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_LS_RS | CHANNEL_LAYOUT_LFE1
            ),
            6
        );
    }

    #[test]
    fn core_substream_parse() {
        use crate::bitreader::BitWriter;
        // Hand-build a minimal core frame header: FTYPE=1, SHORT=31,
        // CPF=0, NBLKS=7 (256 samples), FSIZE=511, AMODE=9 (C L R Ls Rs),
        // SFREQ=13 (48kHz), 10 skip bits, EXT_AUDIO_ID=0, EXT_AUDIO=0,
        // ASPF=0, LFF=1, HFLAG+FILTS+VERNUM+CHIST=8 bits, PCMR=6 (24 bit).
        let mut b = BitWriter::new();
        b.put_bits(SYNCWORD_CORE, 32);
        b.put_bits(1, 1); // FTYPE
        b.put_bits(31, 5); // SHORT
        b.put_bits(0, 1); // CPF
        b.put_bits(7, 7); // NBLKS
        b.put_bits(511, 14); // FSIZE
        b.put_bits(9, 6); // AMODE
        b.put_bits(13, 4); // SFREQ
        b.put_bits(0, 10);
        b.put_bits(0, 3); // EXT_AUDIO_ID
        b.put_bits(0, 1); // EXT_AUDIO
        b.put_bits(0, 1); // ASPF
        b.put_bits(1, 2); // LFF
        b.put_bits(0, 8);
        b.put_bits(6, 3); // PCMR
        b.put_bits(0, 6);
        let mut frame = b.into_vec();
        frame.resize(512, 0);

        let ddts = ddts_from_frame(&frame).unwrap();
        assert_eq!(ddts.dts_sampling_frequency, 48000);
        assert_eq!(ddts.stream_construction, 1);
        assert_eq!(ddts.core_lfe_present, 1);
        assert_eq!(ddts.core_layout, 9);
        assert_eq!(ddts.core_size, 511);
        assert_eq!(ddts.pcm_sample_depth, 24);
        assert_eq!(
            ddts.channel_layout,
            CHANNEL_LAYOUT_C | CHANNEL_LAYOUT_L_R | CHANNEL_LAYOUT_LS_RS | CHANNEL_LAYOUT_LFE1
        );
        assert_eq!(codingname(&ddts), FourCC::new("dtsc"));
    }
}
