//! Timeline construction and query behavior.
mod common;

use common::*;
use isobmff::boxes::*;
use isobmff::io::MemReader;
use isobmff::mp4box::MP4;
use isobmff::timeline::{
    max_sample_delay, sort_timestamps_composition_order, sort_timestamps_decoding_order,
    MediaTimestamp, RaFlags, Timeline,
};

// Three samples of 1000 ticks with a single negative composition
// offset entry that carries over the whole track.
fn negative_offset_movie() -> MP4 {
    let stbl_boxes = vec![
        SampleDescriptionBox {
            entries: vec![avc1_entry()].into_iter().collect(),
        }
        .to_mp4box(),
        stts(&[(3, 1000)]),
        ctts(&[(1, -10)]),
        stss(&[1]),
        stsc(&[(1, 3, 1)]),
        stsz_constant(10, 3),
        stco(&[2000]),
    ];
    // iso4 makes signed composition offsets legal.
    MP4 {
        boxes: vec![
            ftyp("iso4", &["isom"]),
            moov(1000, 3000, vec![video_trak(1, 3000, 30000, stbl_boxes)]),
        ],
        input_filename: None,
    }
}

#[test]
fn negative_composition_offset() {
    let mp4 = read_mp4(write_mp4(&negative_offset_movie()));
    let mut timeline = Timeline::construct(&mp4, 1).unwrap();

    assert_eq!(timeline.ctd_shift(), 10);
    assert_eq!(timeline.dts(1).unwrap(), 0);
    assert_eq!(timeline.cts(1).unwrap(), 0);
    assert_eq!(timeline.dts(2).unwrap(), 1000);
    assert_eq!(timeline.cts(2).unwrap(), 990);
    assert_eq!(timeline.dts(3).unwrap(), 2000);
    assert_eq!(timeline.cts(3).unwrap(), 1990);

    // Reading sample 1 reports the same composition time.
    let file = vec![0u8; 4096];
    let mut reader = MemReader::new(file);
    let sample = timeline.read_sample(&mut reader, 1).unwrap();
    assert_eq!(sample.cts, 0);
}

#[test]
fn negative_offset_rejected_without_iso4() {
    let mut mp4 = negative_offset_movie();
    mp4.boxes[0] = ftyp("isom", &["isom"]);
    let mp4 = read_mp4(write_mp4(&mp4));
    assert!(Timeline::construct(&mp4, 1).is_err());
}

#[test]
fn stsc_run_expansion() {
    // stsc = [(1, 3, 1), (2, 2, 1)], three chunks at a, b, c.
    let (a, b, c) = (1000u64, 2000u64, 3000u64);
    let stbl_boxes = vec![
        SampleDescriptionBox {
            entries: vec![avc1_entry()].into_iter().collect(),
        }
        .to_mp4box(),
        stts(&[(7, 100)]),
        stsc(&[(1, 3, 1), (2, 2, 1)]),
        stsz_constant(10, 7),
        stco(&[a, b, c]),
    ];
    let mp4 = read_mp4(write_mp4(&MP4 {
        boxes: vec![
            ftyp("isom", &["isom"]),
            moov(1000, 700, vec![video_trak(1, 700, 1000, stbl_boxes)]),
        ],
        input_filename: None,
    }));
    let mut timeline = Timeline::construct(&mp4, 1).unwrap();

    assert_eq!(timeline.sample_count(), 7);
    let expected = [a, a + 10, a + 20, b, b + 10, c, c + 10];
    for (n, want) in expected.iter().enumerate() {
        let sample = timeline.sample_info(n as u32 + 1).unwrap();
        assert_eq!(sample.pos, *want, "sample {}", n + 1);
    }
    // Chunk layout: 3 + 2 + 2 samples.
    assert_eq!(timeline.chunks().len(), 3);
    assert_eq!(timeline.chunks()[0].length, 30);
    assert_eq!(timeline.chunks()[1].length, 20);
    assert_eq!(timeline.chunks()[2].length, 20);
}

fn fragmented_movie() -> Vec<u8> {
    let stbl_boxes = vec![SampleDescriptionBox {
        entries: vec![avc1_entry()].into_iter().collect(),
    }
    .to_mp4box()];
    let trex = TrackExtendsBox {
        track_id: 1,
        default_sample_description_index: 1,
        default_sample_duration: 1024,
        default_sample_size: 0,
        default_sample_flags: Default::default(),
    };
    let mvex = MovieExtendsBox {
        boxes: vec![trex.to_mp4box()],
    };
    let mut mp4 = MP4 {
        boxes: vec![
            ftyp("iso6", &["isom"]),
            moov(
                1000,
                0,
                vec![video_trak(1, 0, 30000, stbl_boxes), mvex.to_mp4box()],
            ),
        ],
        input_filename: None,
    };
    pad_to(&mut mp4, 4096);

    let tfhd = TrackFragmentHeaderBox {
        track_id: 1,
        default_base_is_moof: true,
        default_sample_size: Some(100),
        ..Default::default()
    };
    let trun = TrackRunBox {
        data_offset: Some(200),
        first_sample_flags: None,
        entries: (0..3).map(|_| TrackRunEntry::default()).collect(),
    };
    let traf = TrackFragmentBox {
        boxes: vec![tfhd.to_mp4box(), trun.to_mp4box()],
    };
    let moof = MovieFragmentBox {
        pos:   0,
        boxes: vec![
            MovieFragmentHeaderBox { sequence_number: 1 }.to_mp4box(),
            traf.to_mp4box(),
        ],
    };
    mp4.boxes.push(moof.to_mp4box());
    write_mp4(&mp4)
}

#[test]
fn fragmented_track_reassembly() {
    let mp4 = read_mp4(fragmented_movie());
    // The moof parsed back at offset 4096.
    assert_eq!(mp4.movie_fragments()[0].pos, 4096);

    let mut timeline = Timeline::construct(&mp4, 1).unwrap();
    assert_eq!(timeline.sample_count(), 3);

    let expected = [(4296u64, 0u64), (4396, 1024), (4496, 2048)];
    for (i, (pos, dts)) in expected.iter().enumerate() {
        let n = i as u32 + 1;
        let sample = timeline.sample_info(n).unwrap();
        assert_eq!(sample.pos, *pos, "sample {} pos", n);
        assert_eq!(sample.length, 100);
        assert_eq!(timeline.dts(n).unwrap(), *dts, "sample {} dts", n);
        assert!(
            timeline.sample_property(n).unwrap().ra_flags.has(RaFlags::SYNC),
            "sample {} sync",
            n
        );
    }
    // The three runs merge into one portable chunk.
    assert_eq!(timeline.chunks().len(), 1);
    assert_eq!(timeline.chunks()[0].data_offset, 4296);
    assert_eq!(timeline.chunks()[0].length, 300);
}

#[test]
fn nearest_rap_scans_both_ways() {
    let stbl_boxes = vec![
        SampleDescriptionBox {
            entries: vec![avc1_entry()].into_iter().collect(),
        }
        .to_mp4box(),
        stts(&[(6, 100)]),
        stss(&[1, 5]),
        stsc(&[(1, 6, 1)]),
        stsz_constant(10, 6),
        stco(&[512]),
    ];
    let mp4 = read_mp4(write_mp4(&MP4 {
        boxes: vec![
            ftyp("isom", &["isom"]),
            moov(1000, 600, vec![video_trak(1, 600, 1000, stbl_boxes)]),
        ],
        input_filename: None,
    }));
    let mut timeline = Timeline::construct(&mp4, 1).unwrap();

    assert_eq!(timeline.nearest_rap(3).unwrap(), 1);
    assert_eq!(timeline.nearest_rap(5).unwrap(), 5);
    assert_eq!(timeline.nearest_rap(6).unwrap(), 5);

    let detail = timeline.nearest_rap_detail(6).unwrap();
    assert_eq!(detail.rap_number, 5);
    assert!(detail.ra_flags.has(RaFlags::SYNC));
    assert_eq!(detail.distance, 4); // previous RAP is sample 1
}

#[test]
fn timestamps_export_import() {
    let mp4 = read_mp4(write_mp4(&negative_offset_movie()));
    let mut timeline = Timeline::construct(&mp4, 1).unwrap();

    let ts = timeline.get_timestamps().unwrap();
    assert_eq!(ts.len(), 3);
    assert_eq!(ts[0].dts, 0);
    assert_eq!(ts[1], MediaTimestamp { dts: 1000, cts: 990 });

    // Import a stretched table; durations and the shift recompute.
    let new_ts = vec![
        MediaTimestamp { dts: 0, cts: 0 },
        MediaTimestamp { dts: 2000, cts: 1980 },
        MediaTimestamp { dts: 4000, cts: 3980 },
    ];
    timeline.set_timestamps(&new_ts).unwrap();
    assert_eq!(timeline.ctd_shift(), 20);
    assert_eq!(timeline.sample_duration(1).unwrap(), 2000);
    assert_eq!(timeline.sample_duration(3).unwrap(), 2000);
    assert_eq!(timeline.media_duration(), 6000);

    // Decreasing DTS is rejected, and the timeline stays as it was.
    let bad = vec![
        MediaTimestamp { dts: 0, cts: 0 },
        MediaTimestamp { dts: 500, cts: 500 },
        MediaTimestamp { dts: 400, cts: 400 },
    ];
    assert!(timeline.set_timestamps(&bad).is_err());
    assert_eq!(timeline.sample_duration(1).unwrap(), 2000);
}

#[test]
fn timestamp_sorting_and_delay() {
    let mut ts = vec![
        MediaTimestamp { dts: 0, cts: 20 },
        MediaTimestamp { dts: 10, cts: 40 },
        MediaTimestamp { dts: 20, cts: 30 },
        MediaTimestamp { dts: 30, cts: 50 },
    ];
    // One sample displays before an earlier-decoded one.
    assert_eq!(max_sample_delay(&ts), 1);

    sort_timestamps_composition_order(&mut ts);
    assert_eq!(ts[1].cts, 30);
    sort_timestamps_decoding_order(&mut ts);
    assert_eq!(ts[1].dts, 10);
}

#[test]
fn sample_existence_bounds() {
    let mp4 = read_mp4(write_mp4(&negative_offset_movie()));
    let mut timeline = Timeline::construct(&mp4, 1).unwrap();
    assert!(timeline.check_sample_existence(1));
    assert!(timeline.check_sample_existence(3));
    assert!(!timeline.check_sample_existence(0));
    assert!(!timeline.check_sample_existence(4));
}
