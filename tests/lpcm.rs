//! QTFF fixed-compression audio: the LPCM bunch path.
mod common;

use common::*;
use isobmff::boxes::*;
use isobmff::io::MemReader;
use isobmff::mp4box::MP4;
use isobmff::timeline::{RaFlags, Timeline};
use isobmff::types::FourCC;

fn lpcm_movie(sample_count: u32) -> MP4 {
    let mut entry = LpcmSampleEntry::new(FourCC::new("sowt"));
    entry.channel_count = 2;
    entry.sample_size = 16;
    entry.sample_rate_hi = 48000u32 as u16;
    let stbl_boxes = vec![
        SampleDescriptionBox {
            entries: vec![entry.to_mp4box()].into_iter().collect(),
        }
        .to_mp4box(),
        stts(&[(sample_count, 1)]),
        stsc(&[(1, sample_count, 1)]),
        stsz_constant(4, sample_count),
        stco(&[256]),
    ];
    // The track uses the video helper; the timeline keys off the
    // sample entry, not the handler.
    MP4 {
        boxes: vec![
            ftyp("qt  ", &["qt  "]),
            moov(
                600,
                sample_count as u64,
                vec![video_trak(1, sample_count as u64, 48000, stbl_boxes)],
            ),
        ],
        input_filename: None,
    }
}

#[test]
fn lpcm_collapses_into_bunches() {
    let mp4 = read_mp4(write_mp4(&lpcm_movie(8)));
    let mut timeline = Timeline::construct(&mp4, 1).unwrap();

    assert!(timeline.is_lpcm());
    assert_eq!(timeline.sample_count(), 8);
    assert_eq!(timeline.media_duration(), 8);

    // Random access into the bunch.
    assert_eq!(timeline.dts(5).unwrap(), 4);
    assert_eq!(timeline.cts(5).unwrap(), 4);
    assert_eq!(timeline.sample_duration(5).unwrap(), 1);

    let sample = timeline.sample_info(5).unwrap();
    assert_eq!(sample.pos, 256 + 4 * 4);
    assert_eq!(sample.length, 4);
    assert!(sample.prop.ra_flags.has(RaFlags::SYNC));

    // Every LPCM sample is its own random access point.
    assert_eq!(timeline.nearest_rap(7).unwrap(), 7);
    let detail = timeline.nearest_rap_detail(3).unwrap();
    assert_eq!(detail.rap_number, 3);
    assert_eq!(detail.distance, 0);
}

#[test]
fn lpcm_sequential_read() {
    let mp4 = read_mp4(write_mp4(&lpcm_movie(4)));
    let mut timeline = Timeline::construct(&mp4, 1).unwrap();

    let mut file = vec![0u8; 512];
    for i in 0..16 {
        file[256 + i] = i as u8;
    }
    let mut reader = MemReader::new(file);
    for n in 1..=4 {
        let sample = timeline.read_sample(&mut reader, n).unwrap();
        assert_eq!(sample.length, 4);
        assert_eq!(sample.data[0], ((n - 1) * 4) as u8);
    }
}

#[test]
fn lpcm_timestamps_not_editable() {
    let mp4 = read_mp4(write_mp4(&lpcm_movie(4)));
    let mut timeline = Timeline::construct(&mp4, 1).unwrap();
    let ts = timeline.get_timestamps().unwrap();
    assert_eq!(ts.len(), 4);
    assert!(timeline.set_timestamps(&ts).is_err());
}
