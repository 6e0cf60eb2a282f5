//! Per-track presentation info.
//!
use std::fmt::{self, Debug, Display};
use std::time::Duration;

use serde::Serialize;

use crate::boxes::*;
use crate::mp4box::{BoxInfo, MP4};
use crate::types::IsoLanguageCode;

/// General track information.
#[derive(Debug, Default, Serialize)]
pub struct TrackInfo {
    pub id:            u32,
    pub track_type:    String,
    pub duration:      Duration,
    pub size:          u64,
    pub language:      IsoLanguageCode,
    pub specific_info: SpecificTrackInfo,
}

/// Track-type specific info.
#[derive(Serialize)]
#[serde(untagged)]
pub enum SpecificTrackInfo {
    AudioTrackInfo(AudioTrackInfo),
    VideoTrackInfo(VideoTrackInfo),
    UnknownTrackInfo(UnknownTrackInfo),
}

impl Default for SpecificTrackInfo {
    fn default() -> SpecificTrackInfo {
        SpecificTrackInfo::UnknownTrackInfo(UnknownTrackInfo {
            codec_id:   "und".to_string(),
            codec_name: None,
        })
    }
}

impl Debug for SpecificTrackInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SpecificTrackInfo::AudioTrackInfo(i) => Debug::fmt(i, f),
            SpecificTrackInfo::VideoTrackInfo(i) => Debug::fmt(i, f),
            SpecificTrackInfo::UnknownTrackInfo(i) => Debug::fmt(i, f),
        }
    }
}

impl Display for SpecificTrackInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SpecificTrackInfo::AudioTrackInfo(i) => Display::fmt(i, f),
            SpecificTrackInfo::VideoTrackInfo(i) => Display::fmt(i, f),
            SpecificTrackInfo::UnknownTrackInfo(i) => Display::fmt(i, f),
        }
    }
}

/// Audio track details.
#[derive(Debug, Default, Serialize)]
pub struct AudioTrackInfo {
    pub codec_id:      String,
    pub codec_name:    Option<String>,
    pub channel_count: u16,
    pub lfe_channel:   bool,
    pub bit_depth:     Option<u16>,
    pub sample_rate:   Option<u32>,
    pub avg_bitrate:   Option<u32>,
    pub max_bitrate:   Option<u32>,
}

impl Display for AudioTrackInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}.{})", self.codec_id, self.channel_count, self.lfe_channel as u8)
    }
}

/// Video track details.
#[derive(Debug, Default, Serialize)]
pub struct VideoTrackInfo {
    pub codec_id:   String,
    pub codec_name: Option<String>,
}

impl Display for VideoTrackInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.codec_id)?;
        if let Some(name) = self.codec_name.as_ref() {
            write!(f, " ({})", name)?;
        }
        Ok(())
    }
}

/// Unknown track type.
#[derive(Debug, Default, Serialize)]
pub struct UnknownTrackInfo {
    pub codec_id:   String,
    pub codec_name: Option<String>,
}

impl Display for UnknownTrackInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown")
    }
}

/// Extract general track information for all tracks in the movie.
pub fn track_info(mp4: &MP4) -> Vec<TrackInfo> {
    let mut v = Vec::new();

    let movie = mp4.movie();

    for track in &movie.tracks() {
        let mut info = TrackInfo::default();

        let tkhd = track.track_header();
        info.id = tkhd.track_id;

        let mdia = track.media();

        let mdhd = mdia.media_header();
        if mdhd.timescale > 0 {
            info.duration = Duration::from_millis((1000 * mdhd.duration.0) / (mdhd.timescale as u64));
        }
        info.language = mdhd.language;

        let hdlr = mdia.handler();
        info.track_type = hdlr.handler_type.to_string();

        let stbl = mdia.media_info().sample_table();
        info.size = stbl.sample_size().iter().fold(0u64, |acc, sz| acc + sz as u64);

        let stsd = stbl.sample_description();
        info.specific_info = sample_entry_info(&stsd.entries);

        v.push(info)
    }

    v
}

fn sample_entry_info(entries: &[MP4Box]) -> SpecificTrackInfo {
    for entry in entries.iter() {
        match entry {
            MP4Box::AvcSampleEntry(e) => {
                return SpecificTrackInfo::VideoTrackInfo(e.track_info());
            },
            MP4Box::AacSampleEntry(e) => {
                return SpecificTrackInfo::AudioTrackInfo(e.track_info());
            },
            MP4Box::Ac3SampleEntry(e) => {
                return SpecificTrackInfo::AudioTrackInfo(e.track_info());
            },
            MP4Box::Eac3SampleEntry(e) => {
                return SpecificTrackInfo::AudioTrackInfo(e.track_info());
            },
            MP4Box::DtscSampleEntry(e)
            | MP4Box::DtshSampleEntry(e)
            | MP4Box::DtslSampleEntry(e)
            | MP4Box::DtseSampleEntry(e) => {
                return SpecificTrackInfo::AudioTrackInfo(e.track_info());
            },
            MP4Box::LpcmSampleEntry(e)
            | MP4Box::SowtSampleEntry(e)
            | MP4Box::TwosSampleEntry(e) => {
                return SpecificTrackInfo::AudioTrackInfo(e.track_info());
            },
            _ => {},
        }
    }
    let id = entries
        .iter()
        .next()
        .map(|e| e.fourcc().to_string())
        .unwrap_or("unkn".to_string());
    SpecificTrackInfo::UnknownTrackInfo(UnknownTrackInfo {
        codec_id:   id,
        codec_name: None,
    })
}
