//! Per-track media timelines.
//!
//! `Timeline::construct` flattens the sparse, run-length encoded
//! sample tables of one track (and all its movie fragments, if any)
//! into a dense, randomly addressable array of per-sample records:
//! byte position, size, duration, composition offset, description
//! index, and random-access properties.
//!
//! QTFF fixed-compression audio (LPCM and friends) collapses runs of
//! equal samples into bunches instead of one record per sample.
//!
//! Sample numbers are 1-based throughout, as in the sample tables.
use crate::boxes::*;
use crate::error::{Error, Result};
use crate::mp4box::MP4;
use crate::serialize::ReadBytes;
use crate::types::{ArraySized32, FourCC};

const NO_RANDOM_ACCESS_POINT: u32 = 0xffffffff;

/// Random access flags of one sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RaFlags(pub u16);

impl RaFlags {
    pub const NONE: RaFlags = RaFlags(0);
    /// Sync sample ('stss' or fragment flags).
    pub const SYNC: RaFlags = RaFlags(0x01);
    /// Partial sync sample ('stps', QTFF open GOP).
    pub const PARTIAL_SYNC: RaFlags = RaFlags(0x02);
    /// Closed or unknown random access point ('rap ' grouping).
    pub const RAP: RaFlags = RaFlags(0x04);
    /// Open random access point.
    pub const OPEN_RAP: RaFlags = RaFlags(0x08);
    /// Post-roll recovery starts here ('roll' grouping, distance > 0).
    pub const POST_ROLL_START: RaFlags = RaFlags(0x10);
    /// Pre-roll recovery ends here ('roll' grouping, distance < 0).
    pub const PRE_ROLL_END: RaFlags = RaFlags(0x20);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
    pub fn has(&self, other: RaFlags) -> bool {
        self.0 & other.0 != 0
    }
    /// Gradual decoder refresh: recovery only completes later.
    pub fn is_recovery(&self) -> bool {
        self.has(RaFlags::POST_ROLL_START) || self.has(RaFlags::PRE_ROLL_END)
    }
    fn insert(&mut self, other: RaFlags) {
        self.0 |= other.0;
    }
}

/// Decoding/display properties of one sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleProperty {
    pub ra_flags:             RaFlags,
    /// ISO is_leading; 0 under the QTFF dialect.
    pub leading:              u8,
    /// sample_depends_on.
    pub independent:          u8,
    /// sample_is_depended_on.
    pub disposable:           u8,
    /// sample_has_redundancy.
    pub redundant:            u8,
    /// QTFF "earlier display times allowed"; 0 under the ISO dialect.
    pub allow_earlier:        u8,
    /// Number of samples back to the sample that makes this one decodable.
    pub pre_roll_distance:    u32,
    /// Sample number at which post-roll recovery completes.
    pub post_roll_complete:   u32,
    /// Sample number this post-roll info belongs to.
    pub post_roll_identifier: u32,
}

/// One contiguous run of samples in the file.
#[derive(Clone, Debug)]
pub struct PortableChunk {
    pub data_offset: u64,
    pub length:      u64,
    pub number:      u32,
}

/// Everything known about one sample, except its data.
#[derive(Clone, Debug)]
pub struct SampleInfo {
    /// Absolute file position.
    pub pos:      u64,
    /// Duration in media timescale units.
    pub duration: u32,
    /// Composition time offset (cts - dts).
    pub offset:   i32,
    /// Data size in bytes.
    pub length:   u32,
    /// 1-based sample description index.
    pub index:    u32,
    /// Index into the chunk list.
    pub chunk:    u32,
    pub prop:     SampleProperty,
}

/// A run of LPCM samples with identical properties.
#[derive(Clone, Debug)]
pub struct LpcmBunch {
    pub pos:          u64,
    pub duration:     u32,
    pub offset:       i32,
    pub length:       u32,
    pub index:        u32,
    pub chunk:        u32,
    pub prop:         SampleProperty,
    pub sample_count: u32,
}

/// One sample with its data.
#[derive(Debug)]
pub struct Sample {
    pub data:   Vec<u8>,
    pub dts:    u64,
    pub cts:    u64,
    pub pos:    u64,
    pub length: u32,
    pub index:  u32,
    pub prop:   SampleProperty,
}

/// An exported (dts, cts) pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MediaTimestamp {
    pub dts: u64,
    pub cts: u64,
}

// Cache of the last accessed sample, so sequential scans are O(1).
#[derive(Clone, Copy, Default)]
struct SampleCursor {
    number: u32,
    dts:    u64,
}

#[derive(Clone, Copy, Default)]
struct BunchCursor {
    number:              u32,
    duration:            u32,
    sample_count:        u32,
    first_sample_number: u32,
    dts:                 u64,
}

/// A constructed track timeline.
pub struct Timeline {
    pub track_id:        u32,
    pub movie_timescale: u32,
    pub media_timescale: u32,
    sample_count:        u32,
    max_sample_size:     u32,
    ctd_shift:           u32,
    media_duration:      u64,
    track_duration:      u64,
    // True when the file may carry signed composition offsets.
    allow_negative_offset: bool,
    edits:               Vec<EditListEntry>,
    chunks:              Vec<PortableChunk>,
    // Exactly one of `infos` / `bunches` is populated.
    infos:               Vec<SampleInfo>,
    bunches:             Vec<LpcmBunch>,
    cursor:              SampleCursor,
    bunch_cursor:        BunchCursor,
}

// What the ftyp brands let us assume.
struct FileCompat {
    max_isom_version: u8,
    qt_compatible:    bool,
    avc_extensions:   bool,
}

fn file_compat(mp4: &MP4) -> FileCompat {
    let mut compat = FileCompat {
        max_isom_version: 0,
        qt_compatible:    false,
        avc_extensions:   false,
    };
    let mut brands = Vec::new();
    if let Some(ftyp) = first_box!(&mp4.boxes, FileTypeBox) {
        brands.push(ftyp.major_brand);
        brands.extend(ftyp.compatible_brands.iter().copied());
    }
    for brand in brands {
        let b = brand.to_be_bytes();
        match &b {
            b"qt  " => compat.qt_compatible = true,
            b"avc1" => compat.avc_extensions = true,
            [b'i', b's', b'o', v @ b'1'..=b'9'] => {
                compat.max_isom_version = compat.max_isom_version.max(v - b'0');
            },
            b"isom" | b"mp41" | b"mp42" | b"3gp4" => {
                compat.max_isom_version = compat.max_isom_version.max(1);
            },
            _ => {},
        }
    }
    compat
}

// Sample entry classification for the timeline.
fn is_lpcm_audio(entry: Option<&MP4Box>) -> bool {
    matches!(
        entry,
        Some(MP4Box::LpcmSampleEntry(_))
            | Some(MP4Box::SowtSampleEntry(_))
            | Some(MP4Box::TwosSampleEntry(_))
    )
}

fn lpcm_entry(entry: Option<&MP4Box>) -> Option<&LpcmSampleEntry> {
    match entry {
        Some(MP4Box::LpcmSampleEntry(e)) => Some(e),
        Some(MP4Box::SowtSampleEntry(e)) => Some(e),
        Some(MP4Box::TwosSampleEntry(e)) => Some(e),
        _ => None,
    }
}

fn is_qt_fixed_comp_audio(entry: Option<&MP4Box>) -> bool {
    lpcm_entry(entry).map(|e| e.is_fixed_compression()).unwrap_or(false)
}

// (samples_per_packet, constant_sample_size) for fixed-compression audio.
fn qt_fixed_comp_quants(entry: Option<&MP4Box>) -> (u32, u32) {
    match lpcm_entry(entry) {
        Some(e) => {
            let (spp, size) = e.packet_quants();
            if spp == 0 || size == 0 {
                log::warn!("timeline: unsupported implicit sample table");
                (1, (e.sample_size as u32 * e.channel_count as u32) / 8)
            } else {
                (spp, size)
            }
        },
        None => (1, 0),
    }
}

// Run-length walker over (count, value) style tables.
struct RunWalker<T: Copy> {
    runs:      Vec<(u32, T)>,
    index:     usize,
    in_entry:  u32,
    last:      Option<T>,
}

impl<T: Copy> RunWalker<T> {
    fn new(runs: Vec<(u32, T)>) -> RunWalker<T> {
        RunWalker {
            runs,
            index: 0,
            in_entry: 1,
            last: None,
        }
    }

    // The value for the next sample; carries the last value when the
    // table runs out.
    fn next(&mut self) -> Option<T> {
        if self.index >= self.runs.len() {
            return self.last;
        }
        let (count, value) = self.runs[self.index];
        self.last = Some(value);
        if self.in_entry >= count {
            self.index += 1;
            self.in_entry = 1;
        } else {
            self.in_entry += 1;
        }
        Some(value)
    }
}

// Walker over sorted 1-based sample number lists (stss / stps).
struct SyncWalker<'a> {
    entries: &'a [u32],
    index:   usize,
}

impl<'a> SyncWalker<'a> {
    fn matches(&mut self, sample_number: u32) -> bool {
        if self.index < self.entries.len() && self.entries[self.index] == sample_number {
            self.index += 1;
            true
        } else {
            false
        }
    }
}

// Group info applied while walking an sbgp.
struct GroupWalker<'a> {
    sbgp:      Option<&'a SampleToGroupBox>,
    sgpd:      Option<&'a SampleGroupDescriptionBox>,
    sgpd_frag: Option<&'a SampleGroupDescriptionBox>,
    index:     usize,
    in_entry:  u32,
}

impl<'a> GroupWalker<'a> {
    fn new(
        sbgp: Option<&'a SampleToGroupBox>,
        sgpd: Option<&'a SampleGroupDescriptionBox>,
    ) -> GroupWalker<'a> {
        GroupWalker {
            sbgp,
            sgpd,
            sgpd_frag: None,
            index: 0,
            in_entry: 1,
        }
    }

    // Group description for the next sample, or None.
    fn next(&mut self) -> Option<&'a SampleGroupDescriptionEntry> {
        let sbgp = self.sbgp?;
        let entry = sbgp.entries.get(self.index)?;
        let mut group_index = entry.group_description_index;
        if self.in_entry >= entry.sample_count {
            self.index += 1;
            self.in_entry = 1;
        } else {
            self.in_entry += 1;
        }
        if group_index == 0 {
            return None;
        }
        // Indices >= 0x10000 pick the fragment-local description table.
        let sgpd = if group_index >= 0x10000 && self.sgpd_frag.is_some() {
            group_index -= 0x10000;
            self.sgpd_frag?
        } else {
            self.sgpd?
        };
        let found = sgpd.entry(group_index);
        if found.is_none() {
            log::warn!(
                "timeline: no group description {} for grouping type {}",
                group_index,
                sgpd.grouping_type
            );
        }
        found
    }
}

fn apply_roll(
    entry: Option<&SampleGroupDescriptionEntry>,
    info: &mut SampleInfo,
    roll_id: u32,
) {
    if let Some(SampleGroupDescriptionEntry::RollRecoveryEntry(roll)) = entry {
        if roll.roll_distance > 0 {
            // post-roll
            info.prop.post_roll_complete = roll_id.wrapping_add(roll.roll_distance as u32);
            if info.prop.ra_flags.is_none() {
                info.prop.ra_flags.insert(RaFlags::POST_ROLL_START);
            }
        } else if roll.roll_distance < 0 {
            // pre-roll
            info.prop.pre_roll_distance = (-(roll.roll_distance as i32)) as u32;
            if info.prop.ra_flags.is_none() {
                info.prop.ra_flags.insert(RaFlags::PRE_ROLL_END);
            }
        }
    }
}

fn apply_rap(
    entry: Option<&SampleGroupDescriptionEntry>,
    info: &mut SampleInfo,
    distance: &mut u32,
) {
    if !info.prop.ra_flags.is_none() {
        return;
    }
    if let Some(SampleGroupDescriptionEntry::VisualRandomAccessEntry(rap)) = entry {
        // A known non-zero leading count means an open RAP; anything
        // else is treated as an unknown RAP since a non-IDR sample
        // could still make a closed GOP.
        if rap.num_leading_samples_known && rap.num_leading_samples > 0 {
            info.prop.ra_flags.insert(RaFlags::OPEN_RAP);
        } else {
            info.prop.ra_flags.insert(RaFlags::RAP);
        }
        *distance = 0;
    }
}

// Either an stsz or an stz2 table.
enum SizeTable<'a> {
    Stsz(&'a SampleSizeBox),
    Stz2(&'a CompactSampleSizeBox),
}

impl<'a> SizeTable<'a> {
    fn sample_count(&self) -> u32 {
        match self {
            SizeTable::Stsz(b) => b.count,
            SizeTable::Stz2(b) => b.count,
        }
    }
    fn constant_size(&self) -> u32 {
        match self {
            SizeTable::Stsz(b) => b.size,
            SizeTable::Stz2(_) => 0,
        }
    }
    fn get(&self, index: usize) -> Option<u32> {
        match self {
            SizeTable::Stsz(b) => b.entries.get(index).copied(),
            SizeTable::Stz2(b) => b.entries.get(index).copied(),
        }
    }
}

impl Timeline {
    /// Flatten the sample tables (and movie fragments) of one track.
    ///
    /// A structural violation aborts construction; a partial timeline
    /// is never returned.
    pub fn construct(mp4: &MP4, track_id: u32) -> Result<Timeline> {
        if track_id == 0 {
            return Err(Error::FunctionParam("construct: track_id is zero"));
        }
        let movie = first_box!(&mp4.boxes, MovieBox)
            .ok_or_else(|| Error::invalid_data("no moov box"))?;
        let mvhd = first_box!(&movie.boxes, MovieHeaderBox)
            .ok_or_else(|| Error::invalid_data("no mvhd box"))?;
        if mvhd.timescale == 0 {
            return Err(Error::invalid_data("movie timescale is zero"));
        }
        let trak = movie
            .track_by_id(track_id)
            .ok_or_else(|| Error::invalid_data(format!("no track with id {}", track_id)))?;
        let mdia = first_box!(&trak.boxes, MediaBox)
            .ok_or_else(|| Error::invalid_data("track: no mdia box"))?;
        let mdhd = first_box!(&mdia.boxes, MediaHeaderBox)
            .ok_or_else(|| Error::invalid_data("track: no mdhd box"))?;
        if mdhd.timescale == 0 {
            return Err(Error::invalid_data("media timescale is zero"));
        }
        let minf = first_box!(&mdia.boxes, MediaInformationBox)
            .ok_or_else(|| Error::invalid_data("track: no minf box"))?;
        let stbl = first_box!(&minf.boxes, SampleTableBox)
            .ok_or_else(|| Error::invalid_data("track: no stbl box"))?;
        let tkhd = first_box!(&trak.boxes, TrackHeaderBox)
            .ok_or_else(|| Error::invalid_data("track: no tkhd box"))?;

        let compat = file_compat(mp4);

        let mut timeline = Timeline {
            track_id,
            movie_timescale: mvhd.timescale,
            media_timescale: mdhd.timescale,
            sample_count: 0,
            max_sample_size: 0,
            ctd_shift: 0,
            media_duration: 0,
            track_duration: tkhd.duration.0,
            allow_negative_offset: compat.qt_compatible || compat.max_isom_version >= 4,
            edits: Vec::new(),
            chunks: Vec::new(),
            infos: Vec::new(),
            bunches: Vec::new(),
            cursor: SampleCursor::default(),
            bunch_cursor: BunchCursor::default(),
        };

        // Copy edits.
        if let Some(elst) = trak.edit_list() {
            timeline.edits = elst.entries.iter().cloned().collect();
        }

        let stsd = first_box!(&stbl.boxes, SampleDescriptionBox)
            .ok_or_else(|| Error::invalid_data("track: no stsd box"))?;
        let stts = first_box!(&stbl.boxes, TimeToSampleBox);
        let ctts = first_box!(&stbl.boxes, CompositionOffsetBox);
        let stss = first_box!(&stbl.boxes, SyncSampleBox);
        let stps = first_box!(&stbl.boxes, PartialSyncSampleBox);
        let sdtp = first_box!(&stbl.boxes, SampleDependencyTypeBox);
        let stsc = first_box!(&stbl.boxes, SampleToChunkBox);
        let stco = stbl.chunk_offset_opt();
        let sizes = if let Some(stsz) = first_box!(&stbl.boxes, SampleSizeBox) {
            Some(SizeTable::Stsz(stsz))
        } else {
            first_box!(&stbl.boxes, CompactSampleSizeBox).map(SizeTable::Stz2)
        };

        let grouping_rap = FourCC::new("rap ");
        let grouping_roll = FourCC::new("roll");
        let sgpd_rap = stbl.sample_group_description(grouping_rap);
        let sbgp_rap = stbl.sample_to_group(grouping_rap);
        let sgpd_roll = stbl.sample_group_description(grouping_roll);
        let sbgp_roll = stbl.sample_to_group(grouping_roll);

        let moofs = mp4.movie_fragments();
        let movie_fragments_present = movie.movie_extends().is_some() && !moofs.is_empty();

        // Does the moov itself describe any samples?
        let have_moov_samples = stts.map(|b| b.entries.len()).unwrap_or(0) > 0
            && stsc.map(|b| b.entries.len()).unwrap_or(0) > 0
            && stco.map(|b| b.entries.len()).unwrap_or(0) > 0
            && sizes.as_ref().map(|s| s.sample_count()).unwrap_or(0) > 0;
        if !movie_fragments_present && !have_moov_samples {
            return Err(Error::invalid_data("track: missing mandatory sample tables"));
        }

        // Detect the sdtp dialect once, for the whole table.
        let iso_sdtp_default = compat.max_isom_version >= 2 || compat.avc_extensions;
        let iso_sdtp = sdtp
            .map(|s| s.dialect(iso_sdtp_default) == SdtpDialect::Iso)
            .unwrap_or(iso_sdtp_default);

        // ctts with any negative offset needs explicit signing support.
        if let Some(ctts) = ctts {
            let has_negative = ctts.entries.iter().any(|e| e.offset < 0);
            if has_negative && !timeline.allow_negative_offset {
                return Err(Error::invalid_data(
                    "signed composition offsets need iso4+ or qt compatibility",
                ));
            }
        }

        let mut dts: u64 = 0;
        let mut distance = NO_RANDOM_ACCESS_POINT;
        let mut bunch: Option<LpcmBunch> = None;

        if have_moov_samples {
            if let (Some(stts), Some(stsc), Some(stco), Some(sizes)) = (stts, stsc, stco, &sizes) {
                timeline.construct_from_sample_tables(
                    stsd, stts, ctts, stss, stps, sdtp, stsc, stco, sizes, sgpd_rap, sbgp_rap,
                    sgpd_roll, sbgp_roll, iso_sdtp, &mut dts, &mut distance, &mut bunch,
                )?;
            }
        }

        if movie_fragments_present {
            timeline.construct_from_fragments(
                mp4, movie, stsd, sgpd_rap, sgpd_roll, &mut dts, &mut distance, &mut bunch,
            )?;
        } else if timeline.chunks.is_empty() {
            return Err(Error::invalid_data("track has no samples"));
        }

        if let Some(b) = bunch.take() {
            if b.sample_count > 0 {
                timeline.bunches.push(b);
            }
        }
        if !timeline.infos.is_empty() && !timeline.bunches.is_empty() {
            log::error!("LPCM + non-LPCM track is not supported");
            return Err(Error::PatchWelcome("LPCM mixed with non-LPCM in one track"));
        }
        Ok(timeline)
    }

    fn construct_from_sample_tables(
        &mut self,
        stsd: &SampleDescriptionBox,
        stts: &TimeToSampleBox,
        ctts: Option<&CompositionOffsetBox>,
        stss: Option<&SyncSampleBox>,
        stps: Option<&PartialSyncSampleBox>,
        sdtp: Option<&SampleDependencyTypeBox>,
        stsc: &SampleToChunkBox,
        stco: &ChunkOffsetBox,
        sizes: &SizeTable,
        sgpd_rap: Option<&SampleGroupDescriptionBox>,
        sbgp_rap: Option<&SampleToGroupBox>,
        sgpd_roll: Option<&SampleGroupDescriptionBox>,
        sbgp_roll: Option<&SampleToGroupBox>,
        iso_sdtp: bool,
        dts: &mut u64,
        distance: &mut u32,
        bunch: &mut Option<LpcmBunch>,
    ) -> Result<()> {
        if !stsc.is_monotonic() {
            log::warn!("stsc first_chunk values are not ascending; timeline might be corrupted");
        }
        if let Some(stss) = stss {
            if !stss.is_ascending() {
                log::warn!("stss sample numbers are not strictly ascending");
            }
        }
        let sample_count_total = sizes.sample_count();

        let mut stts_walk =
            RunWalker::new(stts.entries.iter().map(|e| (e.count, e.delta)).collect());
        let mut ctts_walk = ctts.map(|c| {
            RunWalker::new(c.entries.iter().map(|e| (e.count, e.offset)).collect())
        });
        let mut stss_walk = stss.map(|s| SyncWalker {
            entries: &s.entries[..],
            index:   0,
        });
        let all_sync = stss.is_none();
        let mut stps_walk = stps.map(|s| SyncWalker {
            entries: &s.entries[..],
            index:   0,
        });
        let mut sdtp_index = 0usize;
        let mut rap_walk = GroupWalker::new(sbgp_rap, sgpd_rap);
        let mut roll_walk = GroupWalker::new(sbgp_roll, sgpd_roll);

        let mut stsc_index = 0usize;
        let mut stsc_data = stsc
            .entries
            .get(0)
            .ok_or_else(|| Error::invalid_data("stsc is empty"))?
            .clone();
        let mut next_stsc_index = 1usize;

        let mut description = stsd.entry(stsc_data.sample_description_index);
        let mut is_lpcm = is_lpcm_audio(description);
        let mut is_fixed_comp = is_qt_fixed_comp_audio(description);
        let (mut samples_per_packet, mut constant_sample_size) = if is_fixed_comp {
            qt_fixed_comp_quants(description)
        } else {
            (1, sizes.constant_size())
        };

        let mut chunk_number: u32 = 1;
        let mut offset_from_chunk: u64 = 0;
        let mut data_offset = *stco
            .entries
            .get(0)
            .ok_or_else(|| Error::invalid_data("stco is empty"))?;
        let mut stco_index = 0usize;

        self.chunks.push(PortableChunk {
            data_offset,
            length: 0,
            number: chunk_number,
        });

        let mut last_duration = u32::MAX;
        let mut sample_number: u32 = samples_per_packet;
        let mut sample_number_in_chunk: u32 = samples_per_packet;
        let mut packet_number: u32 = 1;

        while sample_number <= sample_count_total {
            let mut info = SampleInfo {
                pos:      0,
                duration: 0,
                offset:   0,
                length:   0,
                index:    0,
                chunk:    0,
                prop:     SampleProperty::default(),
            };
            // Duration and composition offset: each output sample
            // consumes samples_per_packet source samples.
            for i in 0..samples_per_packet {
                if let Some(delta) = stts_walk.next() {
                    last_duration = delta;
                }
                info.duration = info.duration.wrapping_add(last_duration);
                *dts += last_duration as u64;
                let sample_offset = ctts_walk.as_mut().and_then(|walk| walk.next()).unwrap_or(0);
                if self.allow_negative_offset && sample_offset < 0 {
                    let cts = *dts as i64 + sample_offset as i64;
                    if (cts + self.ctd_shift as i64) < *dts as i64 {
                        self.ctd_shift = (*dts as i64 - cts) as u32;
                    }
                }
                if i == 0 {
                    info.offset = sample_offset;
                }
            }
            self.media_duration += info.duration as u64;

            if !is_fixed_comp {
                // Sync samples.
                if let Some(walk) = stss_walk.as_mut() {
                    if walk.matches(sample_number) {
                        info.prop.ra_flags.insert(RaFlags::SYNC);
                        *distance = 0;
                    }
                } else if all_sync {
                    // Do not reset distance: MDCT audio still needs
                    // pre-roll even with everything marked sync.
                    info.prop.ra_flags.insert(RaFlags::SYNC);
                }
                // Partial sync samples (QTFF).
                if let Some(walk) = stps_walk.as_mut() {
                    if walk.matches(sample_number) {
                        info.prop.ra_flags.insert(RaFlags::PARTIAL_SYNC);
                        info.prop.ra_flags.insert(RaFlags::RAP);
                        *distance = 0;
                    }
                }
                // Dependency info.
                if let Some(sdtp) = sdtp {
                    if let Some(dep) = sdtp.entries.get(sdtp_index) {
                        if iso_sdtp {
                            info.prop.leading = dep.is_leading;
                        } else {
                            info.prop.allow_earlier = dep.is_leading;
                        }
                        info.prop.independent = dep.sample_depends_on;
                        info.prop.disposable = dep.sample_is_depended_on;
                        info.prop.redundant = dep.sample_has_redundancy;
                        sdtp_index += 1;
                    }
                }
                // Roll recovery grouping.
                apply_roll(roll_walk.next(), &mut info, sample_number);
                info.prop.post_roll_identifier = sample_number;
                // Random access point grouping.
                apply_rap(rap_walk.next(), &mut info, distance);
                // Distance from the previous random access point.
                if *distance != NO_RANDOM_ACCESS_POINT {
                    if info.prop.pre_roll_distance == 0 {
                        info.prop.pre_roll_distance = *distance;
                    }
                    *distance += 1;
                }
            } else {
                // Uncompressed and non-variable compressed audio is
                // all sync samples.
                info.prop.ra_flags = RaFlags::SYNC;
            }

            // Sample size.
            info.length = if is_fixed_comp || sizes.constant_size() != 0 {
                constant_sample_size
            } else {
                sizes
                    .get(packet_number as usize - 1)
                    .ok_or_else(|| Error::invalid_data("stsz: sample size table too short"))?
            };
            self.max_sample_size = self.max_sample_size.max(info.length);

            // Chunk bookkeeping.
            info.pos = data_offset;
            info.index = stsc_data.sample_description_index;
            info.chunk = (self.chunks.len() - 1) as u32;
            offset_from_chunk += info.length as u64;

            if sample_number_in_chunk == stsc_data.samples_per_chunk {
                // Close this chunk and move to the next.
                if let Some(chunk) = self.chunks.last_mut() {
                    chunk.length = offset_from_chunk;
                }
                stco_index += 1;
                if let Some(offset) = stco.entries.get(stco_index) {
                    data_offset = *offset;
                }
                chunk_number += 1;
                offset_from_chunk = 0;
                // Skip broken stsc entries.
                while next_stsc_index < stsc.entries.len()
                    && chunk_number > stsc.entries[next_stsc_index].first_chunk
                {
                    log::warn!("ignoring broken entry in the sample to chunk table");
                    log::warn!("timeline might be corrupted");
                    next_stsc_index += 1;
                }
                // Move to the next run of chunks?
                if next_stsc_index < stsc.entries.len()
                    && chunk_number == stsc.entries[next_stsc_index].first_chunk
                {
                    stsc_index = next_stsc_index;
                    next_stsc_index += 1;
                    stsc_data = stsc.entries[stsc_index].clone();
                    // Description switch: reload LPCM-ness and the
                    // per-packet quantities.
                    description = stsd.entry(stsc_data.sample_description_index);
                    is_lpcm = is_lpcm_audio(description);
                    is_fixed_comp = is_qt_fixed_comp_audio(description);
                    if is_fixed_comp {
                        let quants = qt_fixed_comp_quants(description);
                        samples_per_packet = quants.0;
                        constant_sample_size = quants.1;
                    } else {
                        samples_per_packet = 1;
                        constant_sample_size = sizes.constant_size();
                    }
                }
                sample_number_in_chunk = samples_per_packet;
                self.chunks.push(PortableChunk {
                    data_offset,
                    length: 0,
                    number: chunk_number,
                });
            } else {
                data_offset += info.length as u64;
                sample_number_in_chunk += samples_per_packet;
            }

            // Append.
            if is_lpcm {
                self.push_lpcm(bunch, &info, sample_number == samples_per_packet);
            } else {
                self.infos.push(info);
            }
            if !self.infos.is_empty() && (bunch.is_some() || !self.bunches.is_empty()) {
                log::error!("LPCM + non-LPCM track is not supported");
                return Err(Error::PatchWelcome("LPCM mixed with non-LPCM in one track"));
            }

            sample_number = sample_number.saturating_add(samples_per_packet);
            packet_number += 1;
        }

        // Fix up the last chunk.
        if offset_from_chunk > 0 {
            if let Some(chunk) = self.chunks.last_mut() {
                chunk.length = offset_from_chunk;
            }
        } else {
            // The last chunk was opened but never filled.
            self.chunks.pop();
        }
        self.sample_count = packet_number - 1;
        Ok(())
    }

    fn push_lpcm(&mut self, bunch: &mut Option<LpcmBunch>, info: &SampleInfo, first: bool) {
        let fresh = LpcmBunch {
            pos:          info.pos,
            duration:     info.duration,
            offset:       info.offset,
            length:       info.length,
            index:        info.index,
            chunk:        info.chunk,
            prop:         info.prop.clone(),
            sample_count: 1,
        };
        match bunch.as_mut() {
            None => *bunch = Some(fresh),
            Some(b) if first => {
                *b = fresh;
            },
            Some(b) => {
                let same = b.duration == info.duration
                    && b.offset == info.offset
                    && b.length == info.length
                    && b.index == info.index
                    && b.chunk == info.chunk;
                if same {
                    b.sample_count += 1;
                } else {
                    self.bunches.push(b.clone());
                    *b = fresh;
                }
            },
        }
    }

    fn construct_from_fragments(
        &mut self,
        mp4: &MP4,
        movie: &MovieBox,
        stsd: &SampleDescriptionBox,
        sgpd_rap: Option<&SampleGroupDescriptionBox>,
        sgpd_roll: Option<&SampleGroupDescriptionBox>,
        dts: &mut u64,
        distance: &mut u32,
        bunch: &mut Option<LpcmBunch>,
    ) -> Result<()> {
        let mvex = movie
            .movie_extends()
            .ok_or_else(|| Error::invalid_data("fragments without mvex"))?;
        let tfra = mp4
            .fragment_random_access()
            .and_then(|mfra| mfra.track_fragment_random_access(self.track_id));
        let mut tfra_index = 0usize;

        let mut sample_count = self.sample_count;
        let mut chunk_number = self.chunks.len() as u32;
        let mut data_offset: u64 = 0;

        for moof in mp4.movie_fragments() {
            let mut last_sample_end_pos: u64 = 0;
            for (traf_idx, traf) in moof.track_fragments().into_iter().enumerate() {
                let traf_number = traf_idx as u32 + 1;
                let tfhd = traf
                    .track_fragment_header()
                    .ok_or_else(|| Error::invalid_data("traf without tfhd"))?;
                let trex = mvex
                    .track_extends(tfhd.track_id)
                    .ok_or_else(|| Error::invalid_data("traf without matching trex"))?;
                let truns = traf.track_run_boxes();
                // duration-is-empty fragments carry no runs.
                if truns.is_empty() {
                    continue;
                }
                // Resolve base_data_offset.
                let base_data_offset = if let Some(base) = tfhd.base_data_offset {
                    base
                } else if tfhd.default_base_is_moof || traf_idx == 0 {
                    moof.pos
                } else {
                    last_sample_end_pos
                };

                // Fragment-local sample grouping.
                let grouping_rap = FourCC::new("rap ");
                let grouping_roll = FourCC::new("roll");
                let sgpd_frag_rap = traf.sample_group_description(grouping_rap);
                let sbgp_rap = traf.sample_to_group(grouping_rap);
                let sgpd_frag_roll = traf.sample_group_description(grouping_roll);
                let sbgp_roll = traf.sample_to_group(grouping_roll);
                let mut rap_walk = GroupWalker::new(sbgp_rap, sgpd_rap);
                rap_walk.sgpd_frag = sgpd_frag_rap;
                let mut roll_walk = GroupWalker::new(sbgp_roll, sgpd_roll);
                roll_walk.sgpd_frag = sgpd_frag_roll;

                let need_data_offset_only = tfhd.track_id != self.track_id;

                // Description for this fragment.
                let sample_description_index = tfhd
                    .sample_description_index
                    .unwrap_or(trex.default_sample_description_index);
                let description = stsd.entry(sample_description_index);
                let is_lpcm = is_lpcm_audio(description);

                let mut sdtp_index = 0usize;
                let sdtp = traf.sample_dependencies();

                for (trun_idx, trun) in truns.into_iter().enumerate() {
                    let trun_number = trun_idx as u32 + 1;
                    if trun.entries.len() == 0 {
                        continue;
                    }
                    // Resolve the run's data offset.
                    data_offset = if let Some(off) = trun.data_offset {
                        (base_data_offset as i64 + off as i64) as u64
                    } else if trun_idx == 0 {
                        base_data_offset
                    } else {
                        last_sample_end_pos
                    };

                    if !need_data_offset_only {
                        // Physically consecutive runs merge into one
                        // portable chunk.
                        let extend = self
                            .chunks
                            .last()
                            .map(|c| c.data_offset + c.length == data_offset)
                            .unwrap_or(false);
                        if !extend {
                            chunk_number += 1;
                            self.chunks.push(PortableChunk {
                                data_offset,
                                length: 0,
                                number: chunk_number,
                            });
                        }
                    }

                    let mut sample_number_in_run: u32 = 1;
                    for row in trun.entries.iter() {
                        let mut info = SampleInfo {
                            pos:      0,
                            duration: 0,
                            offset:   0,
                            length:   0,
                            index:    sample_description_index,
                            chunk:    0,
                            prop:     SampleProperty::default(),
                        };
                        info.length = row
                            .sample_size
                            .or(tfhd.default_sample_size)
                            .unwrap_or(trex.default_sample_size);

                        if !need_data_offset_only {
                            info.pos = data_offset;
                            info.chunk = (self.chunks.len() - 1) as u32;
                            if let Some(chunk) = self.chunks.last_mut() {
                                chunk.length += info.length as u64;
                            }
                            info.duration = row
                                .sample_duration
                                .or(tfhd.default_sample_duration)
                                .unwrap_or(trex.default_sample_duration);
                            if let Some(offset) = row.sample_composition_time_offset {
                                info.offset = offset;
                                if offset < 0 && !self.allow_negative_offset {
                                    return Err(Error::invalid_data(
                                        "signed composition offsets need iso4+ or qt compatibility",
                                    ));
                                }
                                let cts = *dts as i64 + offset as i64;
                                if (cts + self.ctd_shift as i64) < *dts as i64 {
                                    self.ctd_shift = (*dts as i64 - cts) as u32;
                                }
                            }
                            *dts += info.duration as u64;
                            self.media_duration += info.duration as u64;
                            self.max_sample_size = self.max_sample_size.max(info.length);

                            if !is_lpcm {
                                // Effective sample flags: first-sample
                                // flags, per-row, tfhd default, trex
                                // default, in that order.
                                let sample_flags = if sample_number_in_run == 1
                                    && trun.first_sample_flags.is_some()
                                {
                                    trun.first_sample_flags.clone().unwrap()
                                } else if let Some(flags) = row.sample_flags.clone() {
                                    flags
                                } else if let Some(flags) = tfhd.default_sample_flags.clone() {
                                    flags
                                } else {
                                    trex.default_sample_flags.clone()
                                };
                                // sdtp, when present, overrides the
                                // dependency information: it lives in
                                // the track layer, sample_flags in the
                                // media layer.
                                if let Some(dep) =
                                    sdtp.and_then(|s| s.entries.get(sdtp_index))
                                {
                                    info.prop.leading = dep.is_leading;
                                    info.prop.independent = dep.sample_depends_on;
                                    info.prop.disposable = dep.sample_is_depended_on;
                                    info.prop.redundant = dep.sample_has_redundancy;
                                    sdtp_index += 1;
                                } else {
                                    info.prop.leading = sample_flags.is_leading;
                                    info.prop.independent = sample_flags.sample_depends_on;
                                    info.prop.disposable = sample_flags.sample_is_depended_on;
                                    info.prop.redundant = sample_flags.sample_has_redundancy;
                                }
                                // All sync samples are independent.
                                if !sample_flags.sample_is_non_sync_sample
                                    && info.prop.independent != 1
                                {
                                    info.prop.ra_flags.insert(RaFlags::SYNC);
                                    *distance = 0;
                                }
                                let roll_id = sample_count + sample_number_in_run;
                                apply_roll(roll_walk.next(), &mut info, roll_id);
                                info.prop.post_roll_identifier = roll_id;
                                apply_rap(rap_walk.next(), &mut info, distance);
                                // Corroborate with tfra, when present.
                                if let Some(tfra) = tfra {
                                    if tfra.entries.len() == 0 && info.prop.ra_flags.is_none() {
                                        info.prop.ra_flags.insert(RaFlags::SYNC);
                                    }
                                    if let Some(rap) = tfra.entries.get(tfra_index) {
                                        if rap.moof_offset == moof.pos
                                            && rap.traf_number == traf_number
                                            && rap.trun_number == trun_number
                                            && rap.sample_number == sample_number_in_run
                                        {
                                            if info.prop.ra_flags.is_none() {
                                                info.prop.ra_flags.insert(RaFlags::SYNC);
                                            }
                                            tfra_index += 1;
                                        }
                                    }
                                }
                                if *distance != NO_RANDOM_ACCESS_POINT {
                                    if info.prop.pre_roll_distance == 0 {
                                        info.prop.pre_roll_distance = *distance;
                                    }
                                    *distance += 1;
                                }
                                self.infos.push(info.clone());
                            } else {
                                info.prop.ra_flags = RaFlags::SYNC;
                                let first = sample_count == 0 && sample_number_in_run == 1;
                                self.push_lpcm(bunch, &info, first);
                            }
                            if !self.infos.is_empty()
                                && (bunch.is_some() || !self.bunches.is_empty())
                            {
                                log::error!("LPCM + non-LPCM track is not supported");
                                return Err(Error::PatchWelcome(
                                    "LPCM mixed with non-LPCM in one track",
                                ));
                            }
                        }
                        data_offset += info.length as u64;
                        last_sample_end_pos = data_offset;
                        sample_number_in_run += 1;
                    }
                    if !need_data_offset_only {
                        sample_count += sample_number_in_run - 1;
                    }
                }
            }
        }
        self.sample_count = sample_count;
        Ok(())
    }

    /// Number of samples in this timeline.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Largest sample size seen.
    pub fn max_sample_size(&self) -> u32 {
        self.max_sample_size
    }

    /// Composition-to-decode timeline shift (>= 0).
    pub fn ctd_shift(&self) -> u32 {
        self.ctd_shift
    }

    /// Sum of all sample durations, in media timescale units.
    pub fn media_duration(&self) -> u64 {
        self.media_duration
    }

    /// Track duration in movie timescale units, from tkhd.
    pub fn track_duration(&self) -> u64 {
        self.track_duration
    }

    /// The portable chunks.
    pub fn chunks(&self) -> &[PortableChunk] {
        &self.chunks
    }

    /// Is this an LPCM (bunch-compressed) timeline?
    pub fn is_lpcm(&self) -> bool {
        !self.bunches.is_empty()
    }

    /// Number of edits copied from the edit list.
    pub fn edit_count(&self) -> u32 {
        self.edits.len() as u32
    }

    /// One edit, 1-based.
    pub fn edit(&self, edit_number: u32) -> Option<&EditListEntry> {
        if edit_number == 0 {
            return None;
        }
        self.edits.get(edit_number as usize - 1)
    }

    pub(crate) fn edits(&self) -> &[EditListEntry] {
        &self.edits
    }

    fn info(&self, sample_number: u32) -> Result<&SampleInfo> {
        if sample_number == 0 || sample_number > self.sample_count {
            return Err(Error::nameless(format!("no sample numbered {}", sample_number)));
        }
        self.infos
            .get(sample_number as usize - 1)
            .ok_or_else(|| Error::nameless(format!("no sample numbered {}", sample_number)))
    }

    // Find the bunch that holds a sample, updating the bunch cursor.
    fn seek_bunch(&mut self, sample_number: u32) -> Result<&LpcmBunch> {
        let cur = self.bunch_cursor;
        if cur.first_sample_number > 0
            && sample_number >= cur.first_sample_number
            && sample_number < cur.first_sample_number + cur.sample_count
        {
            return self
                .bunches
                .get(cur.number as usize - 1)
                .ok_or_else(|| Error::nameless("bunch cursor out of range"));
        }
        // Resume from the cursor when scanning forward, else restart.
        let (mut first_in_next, mut number, mut bunch_dts) =
            if cur.first_sample_number > 0 && cur.first_sample_number <= sample_number {
                (
                    cur.first_sample_number + cur.sample_count,
                    cur.number as usize,
                    cur.dts + cur.duration as u64 * cur.sample_count as u64,
                )
            } else {
                (1, 0, 0)
            };
        let mut bunch = self
            .bunches
            .get(number)
            .ok_or_else(|| Error::nameless(format!("no sample numbered {}", sample_number)))?;
        first_in_next += bunch.sample_count;
        while sample_number >= first_in_next {
            bunch_dts += bunch.duration as u64 * bunch.sample_count as u64;
            number += 1;
            bunch = self
                .bunches
                .get(number)
                .ok_or_else(|| Error::nameless(format!("no sample numbered {}", sample_number)))?;
            first_in_next += bunch.sample_count;
        }
        self.bunch_cursor = BunchCursor {
            number:              number as u32 + 1,
            duration:            bunch.duration,
            sample_count:        bunch.sample_count,
            first_sample_number: first_in_next - bunch.sample_count,
            dts:                 bunch_dts,
        };
        Ok(&self.bunches[number])
    }

    /// Decoding timestamp of a sample.
    pub fn dts(&mut self, sample_number: u32) -> Result<u64> {
        if sample_number == 0 || sample_number > self.sample_count {
            return Err(Error::nameless(format!("no sample numbered {}", sample_number)));
        }
        if self.is_lpcm() {
            let bunch_dur;
            {
                let bunch = self.seek_bunch(sample_number)?;
                bunch_dur = bunch.duration;
            }
            let cur = self.bunch_cursor;
            return Ok(cur.dts + (sample_number - cur.first_sample_number) as u64 * bunch_dur as u64);
        }
        let dts = if sample_number == self.cursor.number {
            self.cursor.dts
        } else if sample_number == 1 {
            0
        } else if sample_number == self.cursor.number + 1 && self.cursor.number > 0 {
            self.cursor.dts + self.info(self.cursor.number)?.duration as u64
        } else if self.cursor.number > 0 && sample_number == self.cursor.number - 1 {
            self.cursor.dts - self.info(sample_number)?.duration as u64
        } else {
            let mut dts = 0u64;
            for info in &self.infos[..sample_number as usize - 1] {
                dts += info.duration as u64;
            }
            dts
        };
        // The cursor number and dts always move together.
        self.cursor = SampleCursor {
            number: sample_number,
            dts,
        };
        Ok(dts)
    }

    /// Composition timestamp of a sample (never negative).
    pub fn cts(&mut self, sample_number: u32) -> Result<u64> {
        let dts = self.dts(sample_number)?;
        let offset = if self.is_lpcm() {
            self.seek_bunch(sample_number)?.offset
        } else {
            self.info(sample_number)?.offset
        };
        let cts = dts as i64 + offset as i64;
        Ok(if cts < 0 { 0 } else { cts as u64 })
    }

    /// Duration of a sample in media timescale units.
    pub fn sample_duration(&mut self, sample_number: u32) -> Result<u32> {
        if self.is_lpcm() {
            return Ok(self.seek_bunch(sample_number)?.duration);
        }
        Ok(self.info(sample_number)?.duration)
    }

    /// Duration of the final sample.
    pub fn last_sample_delta(&mut self) -> Result<u32> {
        self.sample_duration(self.sample_count)
    }

    /// Decoding properties of a sample.
    pub fn sample_property(&mut self, sample_number: u32) -> Result<SampleProperty> {
        if self.is_lpcm() {
            // Every LPCM frame is a sync sample.
            if sample_number == 0 || sample_number > self.sample_count {
                return Err(Error::nameless(format!("no sample numbered {}", sample_number)));
            }
            let mut prop = SampleProperty::default();
            prop.ra_flags = RaFlags::SYNC;
            return Ok(prop);
        }
        Ok(self.info(sample_number)?.prop.clone())
    }

    /// Does this sample exist and point into a chunk?
    pub fn check_sample_existence(&mut self, sample_number: u32) -> bool {
        if sample_number == 0 || sample_number > self.sample_count {
            return false;
        }
        if self.is_lpcm() {
            let num_chunks = self.chunks.len();
            return self
                .seek_bunch(sample_number)
                .map(|b| (b.chunk as usize) < num_chunks)
                .unwrap_or(false);
        }
        self.info(sample_number)
            .map(|i| (i.chunk as usize) < self.chunks.len())
            .unwrap_or(false)
    }

    /// Sample metadata without reading the data bytes.
    pub fn sample_info(&mut self, sample_number: u32) -> Result<Sample> {
        let dts = self.dts(sample_number)?;
        let (pos, length, index, offset, prop) = if self.is_lpcm() {
            let cur_first = {
                let _ = self.seek_bunch(sample_number)?;
                self.bunch_cursor.first_sample_number
            };
            let bunch = self.seek_bunch(sample_number)?;
            let n = (sample_number - cur_first) as u64;
            (
                bunch.pos + n * bunch.length as u64,
                bunch.length,
                bunch.index,
                bunch.offset,
                bunch.prop.clone(),
            )
        } else {
            let info = self.info(sample_number)?;
            (info.pos, info.length, info.index, info.offset, info.prop.clone())
        };
        let cts = dts as i64 + offset as i64;
        Ok(Sample {
            data: Vec::new(),
            dts,
            cts: if cts < 0 { 0 } else { cts as u64 },
            pos,
            length,
            index,
            prop,
        })
    }

    /// Read one sample's data from the stream the timeline was built on.
    ///
    /// The data is read on demand and is not cached here.
    pub fn read_sample<R: ReadBytes>(&mut self, stream: &mut R, sample_number: u32) -> Result<Sample> {
        let mut sample = self.sample_info(sample_number)?;
        stream.seek(sample.pos).map_err(Error::Stream)?;
        let data = stream.read(sample.length as u64).map_err(Error::Stream)?;
        sample.data = data.to_vec();
        Ok(sample)
    }

    /// Closest random access point at or before the given sample.
    fn past_rap(&self, sample_number: u32) -> Result<u32> {
        let mut n = sample_number;
        while n >= 1 {
            let info = self.info(n)?;
            if !info.prop.ra_flags.is_none() {
                return Ok(n);
            }
            n -= 1;
        }
        Err(Error::nameless("no random access point before sample"))
    }

    /// Closest random access point at or after the given sample.
    fn future_rap(&self, sample_number: u32) -> Result<u32> {
        let mut n = sample_number;
        while n <= self.sample_count {
            let info = self.info(n)?;
            if !info.prop.ra_flags.is_none() {
                return Ok(n);
            }
            n += 1;
        }
        Err(Error::nameless("no random access point after sample"))
    }

    /// The nearest random access point: backward first, then forward.
    pub fn nearest_rap(&mut self, sample_number: u32) -> Result<u32> {
        if sample_number == 0 {
            return Err(Error::FunctionParam("nearest_rap: sample number is zero"));
        }
        if self.is_lpcm() {
            // All LPCM samples are sync samples.
            return Ok(sample_number);
        }
        self.past_rap(sample_number)
            .or_else(|_| self.future_rap(sample_number + 1))
    }

    /// Like `nearest_rap`, but also reports the RAP's flags, its
    /// number of leading samples, and the pre-roll distance needed to
    /// decode the given sample correctly.
    pub fn nearest_rap_detail(&mut self, sample_number: u32) -> Result<RapDetail> {
        if sample_number == 0 {
            return Err(Error::FunctionParam("nearest_rap_detail: sample number is zero"));
        }
        if self.is_lpcm() {
            return Ok(RapDetail {
                rap_number: sample_number,
                ra_flags:   RaFlags::SYNC,
                leading:    0,
                distance:   0,
            });
        }
        let rap_number = self.nearest_rap(sample_number)?;
        let info = self.info(rap_number)?.clone();
        let mut detail = RapDetail {
            rap_number,
            ra_flags: info.prop.ra_flags,
            leading:  0,
            distance: 0,
        };
        if sample_number < rap_number {
            // Cannot decode the requested sample correctly anyway.
            return Ok(detail);
        }
        if !info.prop.ra_flags.is_recovery() {
            // Count leading samples after the RAP.
            let rap_dts = self.dts(rap_number)?;
            let rap_cts = rap_dts as i64 + info.offset as i64 + self.ctd_shift as i64;
            let mut dts = rap_dts;
            let mut dur = info.duration;
            let mut n = rap_number + 1;
            loop {
                dts += dur as u64;
                if rap_cts <= dts as i64 {
                    break;
                }
                let next = match self.infos.get(n as usize - 1) {
                    Some(next) => next,
                    None => break,
                };
                let cts = dts as i64 + next.offset as i64 + self.ctd_shift as i64;
                if rap_cts > cts {
                    detail.leading += 1;
                }
                dur = next.duration;
                n += 1;
            }
            if sample_number == rap_number {
                return Ok(detail);
            }
            // Distance between the two closest non-recovery RAPs.
            let mut prev = rap_number;
            loop {
                if prev <= 1 {
                    return Ok(detail);
                }
                prev = match self.past_rap(prev - 1) {
                    Ok(p) => p,
                    Err(_) => return Ok(detail),
                };
                let prev_info = self.info(prev)?;
                if !prev_info.prop.ra_flags.is_recovery() {
                    detail.distance = rap_number - prev;
                    return Ok(detail);
                }
            }
        }
        // Pre-roll recovery.
        if info.prop.pre_roll_distance > 0 {
            let mut prev = rap_number;
            loop {
                let past = if prev > 1 { self.past_rap(prev - 1).ok() } else { None };
                match past {
                    None => {
                        if rap_number < info.prop.pre_roll_distance {
                            // The recovery chain falls off the start;
                            // correct decoding may be impossible.
                            detail.distance = 0;
                            return Ok(detail);
                        }
                        detail.distance = info.prop.pre_roll_distance;
                        return Ok(detail);
                    },
                    Some(p) => {
                        prev = p;
                        if prev + info.prop.pre_roll_distance <= rap_number {
                            detail.distance = info.prop.pre_roll_distance;
                            return Ok(detail);
                        }
                        let prev_info = self.info(prev)?;
                        if !prev_info.prop.ra_flags.is_recovery() {
                            detail.distance = rap_number - prev;
                            return Ok(detail);
                        }
                    },
                }
            }
        }
        // Post-roll recovery.
        if sample_number >= info.prop.post_roll_complete {
            return Ok(detail);
        }
        let mut prev = rap_number;
        loop {
            if prev <= 1 {
                return Ok(detail);
            }
            prev = match self.past_rap(prev - 1) {
                Ok(p) => p,
                Err(_) => return Ok(detail),
            };
            let prev_info = self.info(prev)?;
            if !prev_info.prop.ra_flags.is_recovery()
                || sample_number >= prev_info.prop.post_roll_complete
            {
                detail.distance = rap_number - prev;
                return Ok(detail);
            }
        }
    }

    /// Export the full (dts, cts) table.
    pub fn get_timestamps(&self) -> Result<Vec<MediaTimestamp>> {
        let mut ts = Vec::with_capacity(self.sample_count as usize);
        let mut dts = 0u64;
        if !self.infos.is_empty() {
            for info in &self.infos {
                let cts = dts as i64 + info.offset as i64;
                ts.push(MediaTimestamp {
                    dts,
                    cts: if cts < 0 { 0 } else { cts as u64 },
                });
                dts += info.duration as u64;
            }
        } else {
            for bunch in &self.bunches {
                for _ in 0..bunch.sample_count {
                    let cts = dts as i64 + bunch.offset as i64;
                    ts.push(MediaTimestamp {
                        dts,
                        cts: if cts < 0 { 0 } else { cts as u64 },
                    });
                    dts += bunch.duration as u64;
                }
            }
        }
        Ok(ts)
    }

    /// Import a (dts, cts) table: durations and composition offsets
    /// are recomputed, and `ctd_shift` is derived from scratch.
    ///
    /// The number of timestamps must match the sample count, the
    /// first DTS must be zero, and DTS must not decrease. On error
    /// the timeline is left unchanged.
    pub fn set_timestamps(&mut self, ts: &[MediaTimestamp]) -> Result<()> {
        if self.infos.is_empty() {
            log::error!("changing timestamps of an LPCM track is not supported");
            return Err(Error::PatchWelcome("set_timestamps on an LPCM track"));
        }
        if ts.len() != self.infos.len() {
            return Err(Error::invalid_data("set_timestamps: timestamp count mismatch"));
        }
        if ts[0].dts != 0 {
            return Err(Error::invalid_data("set_timestamps: DTS must start at zero"));
        }
        // Validate and compute everything before touching self.
        let mut durations = Vec::with_capacity(ts.len());
        for i in 1..ts.len() {
            if ts[i].dts < ts[i - 1].dts {
                return Err(Error::invalid_data("set_timestamps: decreasing DTS"));
            }
            durations.push((ts[i].dts - ts[i - 1].dts) as u32);
        }
        // The last sample copies the previous duration; a single
        // still image gets the maximum.
        durations.push(match durations.last() {
            Some(d) => *d,
            None => u32::MAX,
        });
        let mut ctd_shift = 0u32;
        let mut offsets = Vec::with_capacity(ts.len());
        for t in ts {
            if (t.cts + ctd_shift as u64) < t.dts {
                ctd_shift = (t.dts - t.cts) as u32;
            }
            offsets.push(t.cts as i64 - t.dts as i64);
        }
        if ctd_shift > 0 && !self.allow_negative_offset {
            return Err(Error::invalid_data(
                "set_timestamps: composition to decode shift not allowed here",
            ));
        }
        let mut media_duration = 0u64;
        for (info, (duration, offset)) in self
            .infos
            .iter_mut()
            .zip(durations.into_iter().zip(offsets.into_iter()))
        {
            info.duration = duration;
            info.offset = offset as i32;
            media_duration += duration as u64;
        }
        self.ctd_shift = ctd_shift;
        self.media_duration = media_duration;
        self.cursor = SampleCursor::default();
        Ok(())
    }
}

/// What `nearest_rap_detail` reports.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RapDetail {
    pub rap_number: u32,
    pub ra_flags:   RaFlags,
    /// Leading samples after the RAP that display before it.
    pub leading:    u32,
    /// Samples needed before the RAP for complete decoding.
    pub distance:   u32,
}

/// Sort a timestamp table into decoding order.
pub fn sort_timestamps_decoding_order(ts: &mut [MediaTimestamp]) {
    ts.sort_by(|a, b| a.dts.cmp(&b.dts));
}

/// Sort a timestamp table into composition order.
pub fn sort_timestamps_composition_order(ts: &mut [MediaTimestamp]) {
    ts.sort_by(|a, b| a.cts.cmp(&b.cts));
}

/// The largest composition delay in samples: how far a sample's
/// composition-order position lies before its decoding-order position.
/// Zero for tracks without reordering.
pub fn max_sample_delay(ts: &[MediaTimestamp]) -> u32 {
    let mut order: Vec<(u64, u32)> = ts
        .iter()
        .enumerate()
        .map(|(i, t)| (t.cts, i as u32))
        .collect();
    order.sort_by(|a, b| a.0.cmp(&b.0));
    let mut max_delay = 0;
    for (i, &(_, decode_index)) in order.iter().enumerate() {
        if (i as u32) < decode_index {
            max_delay = max_delay.max(decode_index - i as u32);
        }
    }
    max_delay
}

/// Transplant the edit list of a source track onto a destination track.
///
/// `segment_duration` values are rescaled by the movie timescale
/// ratio; `media_time` values by the media timescale ratio, after
/// adding the difference of the composition-to-decode shifts. Call
/// this as late as possible, once both shifts are final.
pub fn copy_timeline_map(
    dst: &mut MP4,
    dst_track_id: u32,
    src: &MP4,
    src_track_id: u32,
    src_timeline: Option<&Timeline>,
) -> Result<()> {
    // Destination parameters.
    let (dst_movie_timescale, dst_media_timescale, dst_ctd_shift) = {
        let movie = first_box!(&dst.boxes, MovieBox)
            .ok_or_else(|| Error::nameless("copy_timeline_map: destination has no moov"))?;
        let mvhd = first_box!(&movie.boxes, MovieHeaderBox)
            .ok_or_else(|| Error::nameless("copy_timeline_map: destination has no mvhd"))?;
        let trak = movie
            .track_by_id(dst_track_id)
            .ok_or_else(|| Error::nameless("copy_timeline_map: no destination track"))?;
        let mdhd = first_box!(&trak.media().boxes, MediaHeaderBox)
            .ok_or_else(|| Error::nameless("copy_timeline_map: destination has no mdhd"))?;
        if mvhd.timescale == 0 || mdhd.timescale == 0 {
            return Err(Error::nameless("copy_timeline_map: destination timescale is zero"));
        }
        let stbl = trak.media().media_info().sample_table();
        let ctd_shift = stbl
            .composition_to_decode()
            .map(|cslg| cslg.composition_to_dts_shift.0)
            .unwrap_or(0);
        (mvhd.timescale, mdhd.timescale, ctd_shift as i64)
    };

    // Source parameters: prefer the constructed timeline.
    struct SrcParams {
        movie_timescale: u32,
        media_timescale: u32,
        track_duration:  u64,
        ctd_shift:       i64,
        edits:           Vec<EditListEntry>,
    }
    let src_params = match src_timeline {
        Some(tl) if tl.movie_timescale > 0 && tl.media_timescale > 0 => SrcParams {
            movie_timescale: tl.movie_timescale,
            media_timescale: tl.media_timescale,
            track_duration:  tl.track_duration,
            ctd_shift:       tl.ctd_shift as i64,
            edits:           tl.edits().to_vec(),
        },
        _ => {
            let movie = first_box!(&src.boxes, MovieBox)
                .ok_or_else(|| Error::nameless("copy_timeline_map: source has no moov"))?;
            let mvhd = first_box!(&movie.boxes, MovieHeaderBox)
                .ok_or_else(|| Error::nameless("copy_timeline_map: source has no mvhd"))?;
            let trak = movie
                .track_by_id(src_track_id)
                .ok_or_else(|| Error::nameless("copy_timeline_map: no source track"))?;
            let mdhd = first_box!(&trak.media().boxes, MediaHeaderBox)
                .ok_or_else(|| Error::nameless("copy_timeline_map: source has no mdhd"))?;
            if mvhd.timescale == 0 || mdhd.timescale == 0 {
                return Err(Error::nameless("copy_timeline_map: source timescale is zero"));
            }
            let tkhd = first_box!(&trak.boxes, TrackHeaderBox)
                .ok_or_else(|| Error::nameless("copy_timeline_map: source has no tkhd"))?;
            let stbl = trak.media().media_info().sample_table();
            let ctd_shift = stbl
                .composition_to_decode()
                .map(|cslg| cslg.composition_to_dts_shift.0)
                .unwrap_or(0);
            let edits = trak
                .edit_list()
                .map(|elst| elst.entries.iter().cloned().collect())
                .unwrap_or_default();
            SrcParams {
                movie_timescale: mvhd.timescale,
                media_timescale: mdhd.timescale,
                track_duration:  tkhd.duration.0,
                ctd_shift:       ctd_shift as i64,
                edits,
            }
        },
    };
    if src_params.edits.is_empty() {
        return Ok(());
    }

    let media_time_shift = src_params.ctd_shift - dst_ctd_shift;
    let mut new_entries = ArraySized32::new();
    for edit in &src_params.edits {
        // An implicit zero duration means "the entire media".
        let segment_duration = if edit.segment_duration == 0 {
            src_params.track_duration
        } else {
            edit.segment_duration
        };
        let segment_duration = (segment_duration as f64
            * (dst_movie_timescale as f64 / src_params.movie_timescale as f64)
            + 0.5) as u64;
        let media_time = if edit.media_time != EDIT_MODE_EMPTY {
            ((edit.media_time + media_time_shift) as f64
                * (dst_media_timescale as f64 / src_params.media_timescale as f64)
                + 0.5) as i64
        } else {
            EDIT_MODE_EMPTY
        };
        new_entries.push(EditListEntry {
            segment_duration,
            media_time,
            media_rate: edit.media_rate,
        });
    }

    // Replace the destination's edit list.
    let movie = first_box_mut!(&mut dst.boxes, MovieBox).unwrap();
    for trak in movie.tracks_mut() {
        let id = first_box!(&trak.boxes, TrackHeaderBox).map(|h| h.track_id);
        if id == Some(dst_track_id) {
            let elst = trak.edit_list_mut();
            elst.entries = new_entries;
            break;
        }
    }
    Ok(())
}
