//! The process-wide open-file cache.
mod common;

use std::sync::Arc;

use common::*;
use isobmff::boxes::*;
use isobmff::mp4box::MP4;

// A small but complete movie with a trailing mdat, written to disk.
fn movie_file() -> std::path::PathBuf {
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

    let path = std::env::temp_dir().join(format!("isobmff-cache-test-{}.mp4", std::process::id()));
    std::fs::write(&path, write_mp4(&mp4)).unwrap();
    path
}

#[test]
fn open_caches_parsed_files() {
    let path = movie_file();
    let name = path.to_str().unwrap();

    let first = isobmff::cache::open(name).unwrap();
    assert_eq!(first.movie().tracks().len(), 1);
    assert_eq!(first.movie().movie_header().timescale, 1000);

    // The second open comes out of the cache: the very same parse.
    let second = isobmff::cache::open(name).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    std::fs::remove_file(&path).unwrap();
}
