use std::io;

use crate::boxes::prelude::*;

def_box! {
    FileTypeBox {
        major_brand:        FourCC,
        minor_version:      u32,
        compatible_brands:  Vec<FourCC>,
    },
    fourcc => "ftyp",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    SegmentTypeBox {
        major_brand:        FourCC,
        minor_version:      u32,
        compatible_brands:  Vec<FourCC>,
    },
    fourcc => "styp",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    MovieHeaderBox {
        cr_time:    Time,
        mod_time:   Time,
        timescale:  u32,
        duration:   Duration_,
        pref_rate:  FixedFloat16_16,
        pref_vol:   FixedFloat8_8,
        skip:       10,
        matrix:     Matrix,
        // The next 6 32-bit values are "pre_defined" in ISO/IEC 14496-12,
        // but QTFF assigns them the following meanings:
        preview_time:       u32,
        preview_duration:   u32,
        poster_time:        u32,
        selection_time:     u32,
        selection_duration: u32,
        current_time:       u32,
        //
        next_track_id: u32,
    },
    fourcc => "mvhd",
    version => [1, cr_time, mod_time, duration],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

impl Default for MovieHeaderBox {
    fn default() -> MovieHeaderBox {
        MovieHeaderBox {
            cr_time:            Time::default(),
            mod_time:           Time::default(),
            timescale:          1000,
            duration:           Duration_::default(),
            pref_rate:          FixedFloat16_16(0x00010000),
            pref_vol:           FixedFloat8_8(0x0100),
            matrix:             Matrix::default(),
            preview_time:       0,
            preview_duration:   0,
            poster_time:        0,
            selection_time:     0,
            selection_duration: 0,
            current_time:       0,
            next_track_id:      1,
        }
    }
}

def_box! {
    MediaHeaderBox {
        cr_time:    Time,
        mod_time:   Time,
        timescale:  u32,
        duration:   Duration_,
        language:   IsoLanguageCode,
        quality:    u16,
    },
    fourcc => "mdhd",
    version => [1, cr_time, mod_time, duration],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    HandlerBox {
        skip:           4,
        handler_type:   FourCC,
        skip:           12,
        name:           ZString,
    },
    fourcc => "hdlr",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    ExtendedLanguageBox {
        language:   ZString,
    },
    fourcc => "elng",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    InitialObjectDescriptionBox {
        audio_profile:  u8,
        video_profile:  u8,
    },
    fourcc => "iods",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    BaseMediaInformationHeaderBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "gmhd",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    SoundMediaHeaderBox {
        balance:    u16,
        skip:       2,
    },
    fourcc => "smhd",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    #[derive(Default)]
    NullMediaHeaderBox {
    },
    fourcc => "nmhd",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    #[derive(Default)]
    SubtitleMediaHeaderBox {
    },
    fourcc => "sthd",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    VideoMediaHeaderBox {
        flags:          VideoMediaHeaderFlags,
        graphics_mode:  u16,
        opcolor_r:      u16,
        opcolor_g:      u16,
        opcolor_b:      u16,
    },
    fourcc => "vmhd",
    version => [0, flags],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

impl_flags!(
    /// vmhd flags: bit 0 ("no lean ahead") is always set.
    VideoMediaHeaderFlags,
    debug
);

impl Default for VideoMediaHeaderFlags {
    fn default() -> Self {
        Self(0x01)
    }
}

impl Default for VideoMediaHeaderBox {
    fn default() -> VideoMediaHeaderBox {
        VideoMediaHeaderBox {
            flags:         VideoMediaHeaderFlags::default(),
            graphics_mode: 0,
            opcolor_r:     0,
            opcolor_g:     0,
            opcolor_b:     0,
        }
    }
}

def_box! {
    UserDataBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "udta",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    /// Only modeled below `udta`, where it is a fullbox.
    CopyrightBox {
        language:   IsoLanguageCode,
        notice:     ZString,
    },
    fourcc => "cprt",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    TrackSelectionBox {
        switch_group:   u32,
        attribute_list: Vec<FourCC>,
    },
    fourcc => "tsel",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    PixelAspectRatioBox {
        h_spacing:  u32,
        v_spacing:  u32,
    },
    fourcc => "pasp",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    #[derive(PartialEq)]
    CleanApertureBox {
        clean_aperture_width_n:  u32,
        clean_aperture_width_d:  u32,
        clean_aperture_height_n: u32,
        clean_aperture_height_d: u32,
        horiz_off_n: u32,
        horiz_off_d: u32,
        vert_off_n:  u32,
        vert_off_d:  u32,
    },
    fourcc => "clap",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    /// 8.6.1.4 Composition to Decode Box (ISO/IEC 14496-12:2015(E))
    ///
    /// compositionToDTSShift is the value that keeps
    /// `cts + shift >= dts` for all samples.
    #[derive(Default)]
    CompositionToDecodeBox {
        composition_to_dts_shift:        VersionSizedInt,
        least_decode_to_display_delta:   VersionSizedInt,
        greatest_decode_to_display_delta: VersionSizedInt,
        composition_start_time:          VersionSizedInt,
        composition_end_time:            VersionSizedInt,
    },
    fourcc => "cslg",
    version => [1, composition_to_dts_shift, least_decode_to_display_delta,
                greatest_decode_to_display_delta, composition_start_time,
                composition_end_time],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    MovieExtendsBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "mvex",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl MovieExtendsBox {
    /// Find the TrackExtendsBox for a track.
    pub fn track_extends(&self, track_id: u32) -> Option<&TrackExtendsBox> {
        iter_box!(&self.boxes, TrackExtendsBox).find(|trex| trex.track_id == track_id)
    }
}

def_box! {
    MovieExtendsHeaderBox {
        fragment_duration:  VersionSizedUint,
    },
    fourcc => "mehd",
    version => [1, fragment_duration],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    #[derive(Default)]
    TrackExtendsBox {
        track_id:                           u32,
        default_sample_description_index:   u32,
        default_sample_duration:            u32,
        default_sample_size:                u32,
        default_sample_flags:               SampleFlags,
    },
    fourcc => "trex",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    MovieFragmentHeaderBox {
        sequence_number:    u32,
    },
    fourcc => "mfhd",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    TrackFragmentBaseMediaDecodeTimeBox {
        base_media_decode_time: VersionSizedUint,
    },
    fourcc => "tfdt",
    version => [1, base_media_decode_time],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}
