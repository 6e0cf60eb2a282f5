//
// ISO/IEC 14496-12:2015(E)
// 12.1.3 Visual Sample Entry / ISO/IEC 14496-15 AVC configuration
//

use std::io;

use crate::boxes::prelude::*;
use crate::track::VideoTrackInfo;

def_box! {
    /// AVC sample entry (VisualSampleEntry).
    AvcSampleEntry {
        skip:                   6,
        data_reference_index:   u16,
        skip:                   16,
        width:                  u16,
        height:                 u16,
        // defaults to 72, 72
        horizontal_dpi:         FixedFloat16_16,
        vertical_dpi:           FixedFloat16_16,
        skip:                   4,
        // defaults to 1
        frame_count:            u16,
        // Compressor name is a fixed 32-byte pascal string.
        skip:                   32,
        // defaults to 0x0018
        depth:                  u16,
        // always -1
        pre_defined:            u16,
        // avcC, and pasp / clap / colr etc.
        boxes:                  Vec<MP4Box>,
    },
    fourcc => "avc1",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl Default for AvcSampleEntry {
    fn default() -> Self {
        AvcSampleEntry {
            data_reference_index: 1,
            width:                1280,
            height:               720,
            horizontal_dpi:       FixedFloat16_16::from(72f64),
            vertical_dpi:         FixedFloat16_16::from(72f64),
            frame_count:          1,
            depth:                24,
            pre_defined:          0xffff,
            boxes:                Vec::new(),
        }
    }
}

impl AvcSampleEntry {
    /// Return video specific track info.
    pub fn track_info(&self) -> VideoTrackInfo {
        let config = first_box!(&self.boxes, AvcConfigurationBox);
        let codec_id = match config {
            Some(a) => a.configuration.codec_id(),
            None => "avc1.unknown".to_string(),
        };
        let codec_name = match config {
            Some(a) => a.configuration.codec_name(),
            None => "AVC",
        };
        VideoTrackInfo {
            codec_id,
            codec_name: Some(codec_name.to_string()),
        }
    }
}

def_box! {
    /// Box that contains an AVC Decoder Configuration Record.
    AvcConfigurationBox {
        configuration: AvcDecoderConfigurationRecord,
    },
    fourcc => "avcC",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_struct! {
    /// AVC Decoder Configuration Record (ISO/IEC 14496-15).
    ///
    /// The parameter sets are carried verbatim in `data`; NAL parsing
    /// is the business of an importer, not this crate.
    #[derive(PartialEq)]
    AvcDecoderConfigurationRecord,
        configuration_version:  u8,
        profile_indication:     u8,
        profile_compatibility:  u8,
        level_indication:       u8,
        data:                   Data,
}

impl AvcDecoderConfigurationRecord {
    /// Return human name of codec, like "Baseline" or "High".
    pub fn codec_name(&self) -> &'static str {
        match self.profile_indication {
            0x2c => "AVC CAVLC 4:4:4",
            0x42 => "AVC Baseline",
            0x4d => "AVC Main",
            0x58 => "AVC Extended",
            0x64 => "AVC High",
            0x6e => "AVC High 10",
            0x7a => "AVC High 4:2:2",
            0xf4 => "AVC High 4:4:4",

            0x53 => "AVC Scalable Baseline",
            0x56 => "AVC Scalable High",

            0x76 => "AVC Multiview High",
            0x80 => "AVC Stereo High",
            0x8a => "AVC Multiview Depth High",
            _ => "AVC",
        }
    }

    /// Return codec id as avc1.4d401f
    pub fn codec_id(&self) -> String {
        format!(
            "avc1.{:02x}{:02x}{:02x}",
            self.profile_indication, self.profile_compatibility, self.level_indication
        )
    }
}

impl std::fmt::Display for AvcDecoderConfigurationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.codec_id())
    }
}
