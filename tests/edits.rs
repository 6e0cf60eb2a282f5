//! Edit list transplants and timeline edit bookkeeping.
mod common;

use common::*;
use isobmff::boxes::*;
use isobmff::mp4box::MP4;
use isobmff::timeline::{copy_timeline_map, Timeline};
use isobmff::types::*;

fn movie_with_edit(
    movie_timescale: u32,
    media_timescale: u32,
    ctd_shift: i64,
    edit: Option<EditListEntry>,
) -> MP4 {
    let mut stbl_boxes = vec![
        SampleDescriptionBox {
            entries: vec![avc1_entry()].into_iter().collect(),
        }
        .to_mp4box(),
        stts(&[(1, 100)]),
        stsc(&[(1, 1, 1)]),
        stsz_constant(10, 1),
        stco(&[512]),
    ];
    if ctd_shift != 0 {
        stbl_boxes.push(
            CompositionToDecodeBox {
                composition_to_dts_shift: VersionSizedInt(ctd_shift),
                ..Default::default()
            }
            .to_mp4box(),
        );
    }
    let mut trak_box = video_trak(1, 1200, media_timescale, stbl_boxes);
    if let Some(edit) = edit {
        if let MP4Box::TrackBox(ref mut trak) = trak_box {
            let elst = EditListBox {
                entries: vec![edit].into_iter().collect(),
            };
            trak.boxes.push(
                EditBox {
                    boxes: vec![elst.to_mp4box()],
                }
                .to_mp4box(),
            );
        }
    }
    MP4 {
        boxes: vec![
            ftyp("isom", &["isom"]),
            moov(movie_timescale, 1200, vec![trak_box]),
        ],
        input_filename: None,
    }
}

#[test]
fn edit_list_transplant() {
    let src = movie_with_edit(
        600,
        30000,
        250,
        Some(EditListEntry {
            segment_duration: 1200,
            media_time:       0,
            media_rate:       FixedFloat16_16(0x10000),
        }),
    );
    let mut dst = movie_with_edit(1000, 48000, 100, None);

    copy_timeline_map(&mut dst, 1, &src, 1, None).unwrap();

    let trak = dst.movie().track_by_id(1).unwrap();
    let elst = trak.edit_list().unwrap();
    assert_eq!(elst.entries.len(), 1);
    let edit = &elst.entries[0];
    assert_eq!(edit.segment_duration, 2000);
    assert_eq!(edit.media_time, 240);
    assert_eq!(edit.media_rate, FixedFloat16_16(0x10000));
}

#[test]
fn edit_list_transplant_from_timeline() {
    // When a source timeline is given, its copied edits are used.
    let src = movie_with_edit(
        600,
        30000,
        0,
        Some(EditListEntry {
            segment_duration: 600,
            media_time:       -1,
            media_rate:       FixedFloat16_16(0x10000),
        }),
    );
    let src = read_mp4(write_mp4(&src));
    let timeline = Timeline::construct(&src, 1).unwrap();
    assert_eq!(timeline.edit_count(), 1);
    assert_eq!(timeline.edit(1).unwrap().media_time, -1);

    let mut dst = movie_with_edit(600, 30000, 0, None);
    copy_timeline_map(&mut dst, 1, &src, 1, Some(&timeline)).unwrap();

    let trak = dst.movie().track_by_id(1).unwrap();
    let elst = trak.edit_list().unwrap();
    // Empty edits stay empty; same timescales, same duration.
    assert_eq!(elst.entries[0].media_time, -1);
    assert_eq!(elst.entries[0].segment_duration, 600);
}

#[test]
fn elst_version_upgrade_for_large_media_time() {
    use isobmff::io::{MemBuffer, MemReader};
    use isobmff::serialize::{FromBytes, ToBytes};

    let elst = EditListBox {
        entries: vec![EditListEntry {
            segment_duration: 100,
            media_time:       0x1_0000_0000,
            media_rate:       FixedFloat16_16(0x10000),
        }]
        .into_iter()
        .collect(),
    };
    let mut buf = MemBuffer::new();
    elst.to_bytes(&mut buf).unwrap();
    let bytes = buf.into_vec();
    assert_eq!(bytes[8], 1); // version 1 for 64-bit media_time

    let mut reader = MemReader::new(bytes);
    match MP4Box::from_bytes(&mut reader).unwrap() {
        MP4Box::EditListBox(parsed) => {
            assert_eq!(parsed.entries[0].media_time, 0x1_0000_0000);
        },
        _ => panic!("expected elst"),
    }
}
