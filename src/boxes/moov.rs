use std::io;

use crate::boxes::prelude::*;
use crate::boxes::{MovieExtendsBox, MovieHeaderBox, TrackBox};

def_box! {
    /// 8.2.1 Movie Box (ISO/IEC 14496-12:2015(E))
    MovieBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "moov",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl MovieBox {
    declare_box_methods!(MovieHeaderBox, movie_header, movie_header_mut);

    /// Get a reference to the list of tracks.
    pub fn tracks(&self) -> Vec<&TrackBox> {
        iter_box!(&self.boxes, TrackBox).collect()
    }

    /// Get a mutable reference to the list of tracks.
    pub fn tracks_mut(&mut self) -> Vec<&mut TrackBox> {
        iter_box_mut!(&mut self.boxes, TrackBox).collect()
    }

    /// Get a track by its track id.
    pub fn track_by_id(&self, track_id: u32) -> Option<&TrackBox> {
        use crate::boxes::TrackHeaderBox;
        iter_box!(&self.boxes, TrackBox).find(|t| {
            first_box!(&t.boxes, TrackHeaderBox)
                .map(|h| h.track_id == track_id)
                .unwrap_or(false)
        })
    }

    /// Get a reference to the MovieExtendsBox, if present.
    pub fn movie_extends(&self) -> Option<&MovieExtendsBox> {
        first_box!(&self.boxes, MovieExtendsBox)
    }

    /// Renormalize next_track_id to max(track_id) + 1.
    pub fn update_next_track_id(&mut self) {
        let max_id = self.tracks().iter().map(|t| t.track_id()).max().unwrap_or(0);
        self.movie_header_mut().next_track_id = max_id + 1;
    }

    pub fn is_valid(&self) -> bool {
        let mut valid = true;
        if self.tracks().is_empty() {
            log::error!("MovieBox: no TrackBoxes present");
            valid = false;
        }
        if first_box!(&self.boxes, MovieHeaderBox).is_none() {
            log::error!("MovieBox: no MovieHeaderBox present");
            valid = false;
        }
        for t in &self.tracks() {
            if !t.is_valid() {
                valid = false;
            }
        }
        valid
    }
}
