//! All the boxes we know.
//!
//! This module does not only contain boxes, but also the types that
//! are used in the boxes, and helper types like iterators.
//!
use std::fmt::Debug;
use std::io;

pub(crate) mod misc;
pub(crate) mod prelude;

pub use self::misc::*;
use self::prelude::*;

use crate::mp4box::{BoxHeader, GenericBox};

def_boxes! {
    BaseMediaInformationHeaderBox, b"gmhd";
    CleanApertureBox, b"clap";
    CompositionToDecodeBox, b"cslg";
    CopyrightBox, b"cprt";
    ExtendedLanguageBox, b"elng";
    FileTypeBox, b"ftyp";
    HandlerBox, b"hdlr";
    InitialObjectDescriptionBox, b"iods";
    MediaHeaderBox, b"mdhd";
    MovieExtendsBox, b"mvex";
    MovieExtendsHeaderBox, b"mehd";
    MovieFragmentHeaderBox, b"mfhd";
    MovieHeaderBox, b"mvhd";
    NullMediaHeaderBox, b"nmhd";
    PixelAspectRatioBox, b"pasp";
    SegmentTypeBox, b"styp";
    SoundMediaHeaderBox, b"smhd";
    SubtitleMediaHeaderBox, b"sthd";
    TrackExtendsBox, b"trex";
    TrackFragmentBaseMediaDecodeTimeBox, b"tfdt";
    TrackSelectionBox, b"tsel";
    UserDataBox, b"udta";
    VideoMediaHeaderBox, b"vmhd";

    // Below are boxes that are defined in boxes/ *.rs
    AvcSampleEntry, b"avc1" => avc1;
    AvcConfigurationBox, b"avcC";

    AacSampleEntry, b"mp4a" => mp4a;
    ESDescriptorBox, b"esds";

    Ac3SampleEntry, b"ac-3" => ac_3;
    AC3SpecificBox, b"dac3";
    Eac3SampleEntry, b"ec-3";
    EC3SpecificBox, b"dec3";

    DtscSampleEntry, b"dtsc" => dts;
    DtshSampleEntry, b"dtsh";
    DtslSampleEntry, b"dtsl";
    DtseSampleEntry, b"dtse";
    DTSSpecificBox, b"ddts";

    LpcmSampleEntry, b"lpcm" => lpcm;
    SowtSampleEntry, b"sowt";
    TwosSampleEntry, b"twos";

    AppleItemListBox, b"ilst" => ilst;
    MetaBox, b"meta";
    KeysBox, b"keys";
    MeanBox, b"mean";
    NameBox, b"name";
    ItemDataBox, b"data";

    ChapterListBox, b"chpl" => chpl;

    ChunkOffsetBox, b"stco" => stco;
    ChunkLargeOffsetBox, b"co64";
    CompositionOffsetBox, b"ctts" => ctts;

    DataInformationBox, b"dinf" => dinf;
    DataEntryUrlBox, b"url ";
    DataEntryUrnBox, b"urn ";
    DataReferenceBox, b"dref";

    EditBox, b"edts" => edts;
    EditListBox, b"elst";

    MediaBox, b"mdia" => mdia;
    MediaDataBox, b"mdat" => mdat;
    MediaInformationBox, b"minf" => minf;
    MovieBox, b"moov" => moov;
    MovieFragmentBox, b"moof" => moof;
    TrackFragmentBox, b"traf";
    MovieFragmentRandomAccessBox, b"mfra" => mfra;
    TrackFragmentRandomAccessBox, b"tfra";
    MovieFragmentRandomAccessOffsetBox, b"mfro";

    Free, b"free" => free;
    Skip, b"skip";
    Wide, b"wide";

    SampleDescriptionBox, b"stsd" => stsd;
    SampleGroupDescriptionBox, b"sgpd" => sgpd;
    SampleSizeBox, b"stsz" => stsz;
    CompactSampleSizeBox, b"stz2";
    SampleTableBox, b"stbl" => stbl;
    SampleToChunkBox, b"stsc" => stsc;
    SampleToGroupBox, b"sbgp" => sbgp;
    SampleDependencyTypeBox, b"sdtp" => sdtp;
    SyncSampleBox, b"stss" => stss;
    PartialSyncSampleBox, b"stps" => stps;
    TimeToSampleBox, b"stts" => stts;
    TrackBox, b"trak" => trak;
    TrackHeaderBox, b"tkhd" => tkhd;
    TrackFragmentHeaderBox, b"tfhd" => tfhd;
    TrackRunBox, b"trun" => trun;
}
