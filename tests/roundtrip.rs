//! Parse / serialize round trips and box header behavior.
mod common;

use common::*;
use isobmff::boxes::*;
use isobmff::io::{MemBuffer, MemReader};
use isobmff::mp4box::{is_fullbox, BoxHeader, MP4};
use isobmff::serialize::{FromBytes, ToBytes};
use isobmff::timeline::{RaFlags, Timeline};
use isobmff::types::FourCC;

// A complete single-sample movie: ftyp, moov with one video track of
// one 42-byte sample at file offset 1024, padding, mdat.
fn minimal_movie() -> Vec<u8> {
    let stbl_boxes = vec![
        SampleDescriptionBox {
            entries: vec![avc1_entry()].into_iter().collect(),
        }
        .to_mp4box(),
        stts(&[(1, 3000)]),
        stsc(&[(1, 1, 1)]),
        stsz_constant(42, 1),
        stco(&[1024]),
    ];
    let mut mp4 = MP4 {
        boxes: vec![
            ftyp("isom", &["isom", "mp41"]),
            moov(1000, 3000, vec![video_trak(1, 3000, 30000, stbl_boxes)]),
        ],
        input_filename: None,
    };
    pad_to(&mut mp4, 1016);
    let mut mdat = MediaDataBox::default();
    mdat.data.push(&[0xab; 42]);
    mp4.boxes.push(mdat.to_mp4box());
    write_mp4(&mp4)
}

#[test]
fn minimal_mp4_roundtrip() {
    let bytes = minimal_movie();
    let mp4 = read_mp4(bytes.clone());

    // Timeline over the single sample.
    let mut timeline = Timeline::construct(&mp4, 1).unwrap();
    assert_eq!(timeline.sample_count(), 1);
    assert_eq!(timeline.dts(1).unwrap(), 0);
    assert_eq!(timeline.cts(1).unwrap(), 0);
    let sample = timeline.sample_info(1).unwrap();
    assert_eq!(sample.length, 42);
    assert_eq!(sample.pos, 1024);
    assert!(sample.prop.ra_flags.has(RaFlags::SYNC));

    // Reading the data gets the mdat payload.
    let mut reader = MemReader::new(bytes.clone());
    let sample = timeline.read_sample(&mut reader, 1).unwrap();
    assert_eq!(sample.data, vec![0xab; 42]);

    // Serialize re-emits identical bytes.
    assert_eq!(write_mp4(&mp4), bytes);
}

#[test]
fn timeline_accounting() {
    let bytes = minimal_movie();
    let mp4 = read_mp4(bytes);
    let mut timeline = Timeline::construct(&mp4, 1).unwrap();
    let mut total = 0u64;
    for n in 1..=timeline.sample_count() {
        total += timeline.sample_duration(n).unwrap() as u64;
    }
    assert_eq!(total, timeline.media_duration());
    assert_eq!(timeline.max_sample_size(), 42);
    assert_eq!(timeline.last_sample_delta().unwrap(), 3000);
}

#[test]
fn unknown_boxes_roundtrip_verbatim() {
    // An unknown top-level box is preserved byte for byte.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&16u32.to_be_bytes());
    bytes.extend_from_slice(b"xyz ");
    bytes.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    // And a uuid box, usertype included.
    bytes.extend_from_slice(&28u32.to_be_bytes());
    bytes.extend_from_slice(b"uuid");
    bytes.extend_from_slice(&[0x11; 16]);
    bytes.extend_from_slice(&[9, 10, 11, 12]);

    let mp4 = read_mp4(bytes.clone());
    assert_eq!(mp4.boxes.len(), 2);
    assert!(matches!(mp4.boxes[0], MP4Box::GenericBox(_)));
    assert_eq!(write_mp4(&mp4), bytes);
}

#[test]
fn unknown_box_inside_moov_roundtrips() {
    let mut unknown = Vec::new();
    unknown.extend_from_slice(&12u32.to_be_bytes());
    unknown.extend_from_slice(b"zzzz");
    unknown.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

    let stbl_boxes = vec![
        SampleDescriptionBox {
            entries: vec![avc1_entry()].into_iter().collect(),
        }
        .to_mp4box(),
        stts(&[(1, 100)]),
        stsc(&[(1, 1, 1)]),
        stsz_constant(10, 1),
        stco(&[64]),
    ];
    let mp4 = MP4 {
        boxes: vec![moov(1000, 100, vec![video_trak(1, 100, 1000, stbl_boxes)])],
        input_filename: None,
    };
    let mut bytes = write_mp4(&mp4);
    // Splice the unknown box inside moov: adjust the moov size.
    let moov_size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let new_size = moov_size + unknown.len() as u32;
    bytes.splice(0..4, new_size.to_be_bytes().iter().copied());
    bytes.extend_from_slice(&unknown);

    let reparsed = read_mp4(bytes.clone());
    assert_eq!(write_mp4(&reparsed), bytes);
}

#[test]
fn box_header_invertibility() {
    let mdhd_box = mdhd(30000, 1234);
    let mut buf = MemBuffer::new();
    mdhd_box.to_bytes(&mut buf).unwrap();
    let bytes = buf.into_vec();

    let mut reader = MemReader::new(bytes.clone());
    let header = BoxHeader::peek(&mut reader).unwrap();
    assert_eq!(header.fourcc, FourCC::new("mdhd"));
    assert_eq!(header.size, bytes.len() as u64);
    assert_eq!(header.version, Some(0));
    assert_eq!(header.flags, 0);
    assert_eq!(header.header_len, 12);
}

#[test]
fn fullbox_classification() {
    // Fullboxes carry version + flags.
    for fourcc in &["mvhd", "tkhd", "mdhd", "hdlr", "stts", "ctts", "stsz", "stco", "elst", "tfhd", "trun", "tfra", "cslg", "meta"] {
        assert!(is_fullbox(FourCC::new(fourcc)), "{} should be a fullbox", fourcc);
    }
    // Baseboxes don't.
    for fourcc in &["ftyp", "moov", "trak", "mdia", "minf", "stbl", "moof", "traf", "mdat", "free", "avc1", "mp4a", "dac3", "ddts", "uuid"] {
        assert!(!is_fullbox(FourCC::new(fourcc)), "{} should be a basebox", fourcc);
    }
}

#[test]
fn version1_upgrade_on_large_values() {
    // A duration over 32 bits upgrades mdhd to version 1.
    let big = mdhd(30000, 0x1_0000_0000);
    let mut buf = MemBuffer::new();
    big.to_bytes(&mut buf).unwrap();
    let bytes = buf.into_vec();
    assert_eq!(bytes[8], 1); // version

    let mut reader = MemReader::new(bytes);
    let parsed = MP4Box::from_bytes(&mut reader).unwrap();
    match parsed {
        MP4Box::MediaHeaderBox(m) => assert_eq!(m.duration.0, 0x1_0000_0000),
        _ => panic!("expected mdhd"),
    }
}

#[test]
fn next_track_id_renormalizes() {
    let bytes = minimal_movie();
    let mut mp4 = read_mp4(bytes);
    mp4.movie_mut().movie_header_mut().next_track_id = 1;
    mp4.movie_mut().update_next_track_id();
    assert_eq!(mp4.movie().movie_header().next_track_id, 2);
}

#[test]
fn track_info_is_serializable() {
    let bytes = minimal_movie();
    let mp4 = read_mp4(bytes);
    let info = isobmff::track::track_info(&mp4);
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].id, 1);
    assert_eq!(info[0].track_type, "vide");
    let json = serde_json::to_string(&info).unwrap();
    assert!(json.contains("avc1.640"));
}
