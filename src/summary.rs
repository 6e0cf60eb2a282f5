//! Codec-agnostic summaries of sample entries.
//!
//! A `Summary` captures everything a muxer needs to re-create a
//! sample entry in another file: the common audio/video parameters
//! plus an ordered list of codec-specific blocks, each either decoded
//! into a structured record or carried as raw bytes.
use crate::boxes::*;
use crate::error::{Error, Result};
use crate::io::MemBuffer;
use crate::mp4box::BoxInfo;
use crate::serialize::ToBytes;
use crate::types::{Data, FourCC};

/// One codec-specific configuration block.
#[derive(Clone, Debug, PartialEq)]
pub enum CodecSpecific {
    /// AC-3 configuration ('dac3').
    Ac3(AC3SpecificBox),
    /// Enhanced AC-3 configuration ('dec3').
    Eac3(EC3SpecificBox),
    /// DTS configuration ('ddts').
    Dts(DTSSpecificBox),
    /// MPEG-4 ES descriptor ('esds').
    Esds(ESDescriptor),
    /// AVC decoder configuration ('avcC').
    Avc(AvcDecoderConfigurationRecord),
    /// Anything else: the serialized box, verbatim.
    Unstructured { fourcc: FourCC, data: Data },
}

impl CodecSpecific {
    /// The fourcc of the box this block serializes to.
    pub fn fourcc(&self) -> FourCC {
        match self {
            CodecSpecific::Ac3(_) => FourCC::new("dac3"),
            CodecSpecific::Eac3(_) => FourCC::new("dec3"),
            CodecSpecific::Dts(_) => FourCC::new("ddts"),
            CodecSpecific::Esds(_) => FourCC::new("esds"),
            CodecSpecific::Avc(_) => FourCC::new("avcC"),
            CodecSpecific::Unstructured { fourcc, .. } => *fourcc,
        }
    }

    /// Convert a structured block to its unstructured (serialized) form.
    pub fn to_unstructured(&self) -> Result<CodecSpecific> {
        let boxed = self.to_box()?;
        let mut buf = MemBuffer::new();
        boxed.to_bytes(&mut buf).map_err(Error::from)?;
        Ok(CodecSpecific::Unstructured {
            fourcc: self.fourcc(),
            data:   Data(buf.into_vec()),
        })
    }

    fn to_box(&self) -> Result<MP4Box> {
        Ok(match self {
            CodecSpecific::Ac3(b) => MP4Box::AC3SpecificBox(b.clone()),
            CodecSpecific::Eac3(b) => MP4Box::EC3SpecificBox(b.clone()),
            CodecSpecific::Dts(b) => MP4Box::DTSSpecificBox(b.clone()),
            CodecSpecific::Esds(e) => MP4Box::ESDescriptorBox(ESDescriptorBox {
                es_descriptor: e.clone(),
            }),
            CodecSpecific::Avc(a) => MP4Box::AvcConfigurationBox(AvcConfigurationBox {
                configuration: a.clone(),
            }),
            CodecSpecific::Unstructured { .. } => {
                return Err(Error::FunctionParam("CodecSpecific: already unstructured"))
            },
        })
    }
}

/// Summary of a video sample entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VideoSummary {
    pub codec:            FourCC,
    pub width:            u32,
    pub height:           u32,
    pub depth:            u32,
    pub display_width:    u32,
    pub display_height:   u32,
    /// Frame rate as timescale / timebase.
    pub timescale:        u32,
    pub timebase:         u32,
    pub par_h:            u32,
    pub par_v:            u32,
    pub clap:             Option<CleanApertureBox>,
    pub compressor_name:  String,
    pub extensions:       Vec<CodecSpecific>,
}

/// Summary of an audio sample entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioSummary {
    pub codec:            FourCC,
    pub frequency:        u32,
    pub channels:         u32,
    pub sample_size:      u32,
    pub samples_in_frame: u32,
    pub extensions:       Vec<CodecSpecific>,
}

/// Codec-agnostic description of one sample entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Summary {
    Video(VideoSummary),
    Audio(AudioSummary),
}

impl Summary {
    /// Build a summary from an stsd sample entry.
    pub fn from_sample_entry(entry: &MP4Box) -> Result<Summary> {
        match entry {
            MP4Box::AvcSampleEntry(e) => Ok(Summary::Video(video_summary(e))),
            MP4Box::AacSampleEntry(e) => {
                let mut summary = audio_summary(
                    e.fourcc(),
                    e.sample_rate_hi as u32,
                    e.channel_count as u32,
                    e.sample_size as u32,
                    1024,
                );
                if let Some(esds) = first_box!(&e.boxes, ESDescriptorBox) {
                    summary.extensions.push(CodecSpecific::Esds(esds.es_descriptor.clone()));
                    if let Some(audio) = esds.es_descriptor.decoder_config.specific_info.audio.as_ref() {
                        if audio.sampling_frequency > 0 {
                            summary.frequency = audio.sampling_frequency;
                        }
                    }
                }
                push_unknown(&e.boxes, &mut summary.extensions);
                Ok(Summary::Audio(summary))
            },
            MP4Box::Ac3SampleEntry(e) => {
                let mut summary = audio_summary(
                    e.fourcc(),
                    e.sample_rate_hi as u32,
                    e.channel_count as u32,
                    e.sample_size as u32,
                    crate::codecs::ac3::A52_SAMPLES_PER_FRAME,
                );
                if let Some(dac3) = first_box!(&e.boxes, AC3SpecificBox) {
                    if let Some(rate) = dac3.sample_rate() {
                        summary.frequency = rate;
                    }
                    summary.channels = dac3.channel_count() as u32;
                    summary.extensions.push(CodecSpecific::Ac3(dac3.clone()));
                }
                push_unknown(&e.boxes, &mut summary.extensions);
                Ok(Summary::Audio(summary))
            },
            MP4Box::Eac3SampleEntry(e) => {
                let mut summary = audio_summary(
                    e.fourcc(),
                    e.sample_rate_hi as u32,
                    e.channel_count as u32,
                    e.sample_size as u32,
                    crate::codecs::ac3::A52_SAMPLES_PER_FRAME,
                );
                if let Some(dec3) = first_box!(&e.boxes, EC3SpecificBox) {
                    if let Some(rate) = crate::codecs::ac3::eac3_sample_rate(dec3, None) {
                        summary.frequency = rate;
                    }
                    summary.channels = dec3.channel_count() as u32;
                    summary.extensions.push(CodecSpecific::Eac3(dec3.clone()));
                }
                push_unknown(&e.boxes, &mut summary.extensions);
                Ok(Summary::Audio(summary))
            },
            MP4Box::DtscSampleEntry(e)
            | MP4Box::DtshSampleEntry(e)
            | MP4Box::DtslSampleEntry(e)
            | MP4Box::DtseSampleEntry(e) => {
                let mut summary = audio_summary(
                    e.fourcc(),
                    e.sample_rate_hi as u32,
                    e.channel_count as u32,
                    e.sample_size as u32,
                    512,
                );
                if let Some(ddts) = first_box!(&e.boxes, DTSSpecificBox) {
                    summary.frequency = ddts.dts_sampling_frequency;
                    summary.sample_size = ddts.pcm_sample_depth as u32;
                    summary.channels =
                        crate::codecs::dts::channel_count_from_layout(ddts.channel_layout);
                    summary.samples_in_frame = 512u32 << ddts.frame_duration;
                    summary.extensions.push(CodecSpecific::Dts(ddts.clone()));
                }
                push_unknown(&e.boxes, &mut summary.extensions);
                Ok(Summary::Audio(summary))
            },
            MP4Box::LpcmSampleEntry(e)
            | MP4Box::SowtSampleEntry(e)
            | MP4Box::TwosSampleEntry(e) => {
                let (spp, _) = e.packet_quants();
                let mut summary = audio_summary(
                    e.fourcc(),
                    e.sample_rate_hi as u32,
                    e.channel_count as u32,
                    e.sample_size as u32,
                    spp.max(1),
                );
                push_unknown(&e.boxes, &mut summary.extensions);
                Ok(Summary::Audio(summary))
            },
            other => Err(Error::nameless(format!(
                "no summary for sample entry {}",
                other.fourcc()
            ))),
        }
    }

    /// Build a new sample entry box from this summary.
    pub fn to_sample_entry(&self) -> Result<MP4Box> {
        match self {
            Summary::Video(v) => {
                let mut entry = AvcSampleEntry::default();
                entry.width = v.width as u16;
                entry.height = v.height as u16;
                entry.depth = v.depth as u16;
                for ext in &v.extensions {
                    entry.boxes.push(ext.to_box().or_else(|_| unstructured_box(ext))?);
                }
                Ok(MP4Box::AvcSampleEntry(entry))
            },
            Summary::Audio(a) => {
                let fourcc = a.codec.to_be_bytes();
                let boxes = {
                    let mut boxes = Vec::new();
                    for ext in &a.extensions {
                        boxes.push(ext.to_box().or_else(|_| unstructured_box(ext))?);
                    }
                    boxes
                };
                let entry = match &fourcc {
                    b"mp4a" => MP4Box::AacSampleEntry(AacSampleEntry {
                        channel_count: a.channels as u16,
                        sample_size: a.sample_size as u16,
                        sample_rate_hi: a.frequency as u16,
                        boxes,
                        ..AacSampleEntry::default()
                    }),
                    b"ac-3" => MP4Box::Ac3SampleEntry(Ac3SampleEntry {
                        channel_count: a.channels as u16,
                        sample_size: a.sample_size as u16,
                        sample_rate_hi: a.frequency as u16,
                        boxes,
                        ..Ac3SampleEntry::default()
                    }),
                    b"ec-3" => MP4Box::Eac3SampleEntry(Eac3SampleEntry {
                        channel_count: a.channels as u16,
                        sample_size: a.sample_size as u16,
                        sample_rate_hi: a.frequency as u16,
                        boxes,
                        ..Eac3SampleEntry::default()
                    }),
                    b"dtsc" | b"dtsh" | b"dtsl" | b"dtse" => {
                        let mut entry = DtsSampleEntry::new(a.codec);
                        entry.channel_count = a.channels as u16;
                        entry.sample_size = a.sample_size as u16;
                        entry.sample_rate_hi = a.frequency as u16;
                        entry.boxes = boxes;
                        match &fourcc {
                            b"dtsc" => MP4Box::DtscSampleEntry(entry),
                            b"dtsl" => MP4Box::DtslSampleEntry(entry),
                            b"dtse" => MP4Box::DtseSampleEntry(entry),
                            _ => MP4Box::DtshSampleEntry(entry),
                        }
                    },
                    _ => {
                        return Err(Error::nameless(format!(
                            "cannot build a sample entry for {}",
                            a.codec
                        )))
                    },
                };
                Ok(entry)
            },
        }
    }
}

fn unstructured_box(ext: &CodecSpecific) -> Result<MP4Box> {
    // Round an unstructured block through the box parser.
    if let CodecSpecific::Unstructured { data, .. } = ext {
        use crate::serialize::FromBytes;
        let mut slice = &data.0[..];
        return MP4Box::from_bytes(&mut slice).map_err(Error::from);
    }
    Err(Error::FunctionParam("unstructured_box: structured input"))
}

fn video_summary(e: &AvcSampleEntry) -> VideoSummary {
    let mut summary = VideoSummary {
        codec:          e.fourcc(),
        width:          e.width as u32,
        height:         e.height as u32,
        depth:          e.depth as u32,
        display_width:  e.width as u32,
        display_height: e.height as u32,
        par_h:          1,
        par_v:          1,
        ..VideoSummary::default()
    };
    if let Some(pasp) = first_box!(&e.boxes, PixelAspectRatioBox) {
        summary.par_h = pasp.h_spacing;
        summary.par_v = pasp.v_spacing;
    }
    if let Some(clap) = first_box!(&e.boxes, CleanApertureBox) {
        summary.clap = Some(clap.clone());
    }
    if let Some(avcc) = first_box!(&e.boxes, AvcConfigurationBox) {
        summary.extensions.push(CodecSpecific::Avc(avcc.configuration.clone()));
    }
    push_unknown(&e.boxes, &mut summary.extensions);
    summary
}

fn audio_summary(
    codec: FourCC,
    frequency: u32,
    channels: u32,
    sample_size: u32,
    samples_in_frame: u32,
) -> AudioSummary {
    AudioSummary {
        codec,
        frequency,
        channels,
        sample_size,
        samples_in_frame,
        extensions: Vec::new(),
    }
}

// Carry any unrecognized child boxes as unstructured blocks.
fn push_unknown(boxes: &[MP4Box], extensions: &mut Vec<CodecSpecific>) {
    for b in boxes {
        if let MP4Box::GenericBox(g) = b {
            let mut buf = MemBuffer::new();
            if g.to_bytes(&mut buf).is_ok() {
                extensions.push(CodecSpecific::Unstructured {
                    fourcc: g.fourcc,
                    data:   Data(buf.into_vec()),
                });
            }
        }
    }
}
