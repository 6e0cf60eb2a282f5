//! Shared helpers: build small synthetic files in memory.
#![allow(dead_code)]
use isobmff::boxes::*;
use isobmff::io::{MemBuffer, MemReader};
use isobmff::mp4box::MP4;
use isobmff::types::*;

pub fn write_mp4(mp4: &MP4) -> Vec<u8> {
    let mut buf = MemBuffer::new();
    mp4.write(&mut buf).unwrap();
    buf.into_vec()
}

pub fn read_mp4(bytes: Vec<u8>) -> MP4 {
    MP4::read(MemReader::new(bytes)).unwrap()
}

pub fn ftyp(major: &str, compatible: &[&str]) -> MP4Box {
    FileTypeBox {
        major_brand:       FourCC::new(major),
        minor_version:     0x200,
        compatible_brands: compatible.iter().map(|b| FourCC::new(b)).collect(),
    }
    .to_mp4box()
}

pub fn avc1_entry() -> MP4Box {
    let mut entry = AvcSampleEntry::default();
    entry.boxes.push(
        AvcConfigurationBox {
            configuration: AvcDecoderConfigurationRecord {
                configuration_version: 1,
                profile_indication:    0x64,
                profile_compatibility: 0,
                level_indication:      31,
                data:                  Data(vec![0xff, 0xe1, 0x00, 0x01, 0x68]),
            },
        }
        .to_mp4box(),
    );
    entry.to_mp4box()
}

pub fn tkhd(track_id: u32, duration: u64) -> MP4Box {
    TrackHeaderBox {
        flags:     TrackFlags(3),
        cr_time:   Time(0),
        mod_time:  Time(0),
        track_id,
        duration:  Duration_(duration),
        layer:     0,
        alt_group: 0,
        volume:    FixedFloat8_8(0),
        matrix:    Matrix::default(),
        width:     FixedFloat16_16(1280 << 16),
        height:    FixedFloat16_16(720 << 16),
    }
    .to_mp4box()
}

pub fn mdhd(timescale: u32, duration: u64) -> MP4Box {
    MediaHeaderBox {
        cr_time:   Time(0),
        mod_time:  Time(0),
        timescale,
        duration:  Duration_(duration),
        language:  IsoLanguageCode::default(),
        quality:   0,
    }
    .to_mp4box()
}

pub fn hdlr(handler_type: &str) -> MP4Box {
    HandlerBox {
        handler_type: FourCC::new(handler_type),
        name:         ZString::from("VideoHandler"),
    }
    .to_mp4box()
}

pub fn stts(entries: &[(u32, u32)]) -> MP4Box {
    TimeToSampleBox {
        entries: entries
            .iter()
            .map(|&(count, delta)| TimeToSampleEntry { count, delta })
            .collect(),
    }
    .to_mp4box()
}

pub fn ctts(entries: &[(u32, i32)]) -> MP4Box {
    CompositionOffsetBox {
        entries: entries
            .iter()
            .map(|&(count, offset)| CompositionOffsetEntry { count, offset })
            .collect(),
    }
    .to_mp4box()
}

pub fn stsc(entries: &[(u32, u32, u32)]) -> MP4Box {
    SampleToChunkBox {
        entries: entries
            .iter()
            .map(|&(first_chunk, samples_per_chunk, sample_description_index)| SampleToChunkEntry {
                first_chunk,
                samples_per_chunk,
                sample_description_index,
            })
            .collect(),
    }
    .to_mp4box()
}

pub fn stsz_constant(size: u32, count: u32) -> MP4Box {
    SampleSizeBox {
        size,
        count,
        entries: ArrayUnsized::new(),
    }
    .to_mp4box()
}

pub fn stco(offsets: &[u64]) -> MP4Box {
    let mut b = ChunkOffsetBox::new();
    for &o in offsets {
        b.entries.push(o);
    }
    b.check_sizes();
    b.to_mp4box()
}

pub fn stss(samples: &[u32]) -> MP4Box {
    SyncSampleBox {
        entries: samples.iter().copied().collect(),
    }
    .to_mp4box()
}

pub fn video_trak(track_id: u32, duration: u64, media_timescale: u32, stbl_boxes: Vec<MP4Box>) -> MP4Box {
    let stbl = SampleTableBox { boxes: stbl_boxes };
    let minf = MediaInformationBox {
        boxes: vec![VideoMediaHeaderBox::default().to_mp4box(), stbl.to_mp4box()],
    };
    let mdia = MediaBox {
        boxes: vec![mdhd(media_timescale, duration), hdlr("vide"), minf.to_mp4box()],
    };
    TrackBox {
        boxes: vec![tkhd(track_id, duration), mdia.to_mp4box()],
    }
    .to_mp4box()
}

pub fn moov(movie_timescale: u32, duration: u64, mut boxes: Vec<MP4Box>) -> MP4Box {
    let mvhd = MovieHeaderBox {
        timescale: movie_timescale,
        duration: Duration_(duration),
        next_track_id: 2,
        ..MovieHeaderBox::default()
    };
    let mut v = vec![mvhd.to_mp4box()];
    v.append(&mut boxes);
    MovieBox { boxes: v }.to_mp4box()
}

/// Pad with a `free` box so the next box starts at `offset`.
pub fn pad_to(mp4: &mut MP4, offset: u64) {
    let len = mp4.size();
    assert!(len + 8 <= offset, "cannot pad: {} + 8 > {}", len, offset);
    mp4.boxes.push(Free { size: offset - len - 8 }.to_mp4box());
}
