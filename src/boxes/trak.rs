use std::io;

use crate::boxes::prelude::*;
use crate::boxes::{EditBox, EditListBox, MediaBox, SampleTableBox, TrackHeaderBox};

def_box! {
    /// 8.3.1 Track Box (ISO/IEC 14496-12:2015(E))
    TrackBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "trak",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl TrackBox {
    declare_box_methods!(TrackHeaderBox, track_header, track_header_mut);
    declare_box_methods!(MediaBox, media, media_mut);

    /// Get the track id.
    pub fn track_id(&self) -> u32 {
        self.track_header().track_id
    }

    /// Get the edit list, if it is present and has at least one entry.
    pub fn edit_list(&self) -> Option<&EditListBox> {
        if let Some(edts) = first_box!(&self.boxes, EditBox) {
            if let Some(elst) = first_box!(&edts.boxes, EditListBox) {
                if elst.entries.len() > 0 {
                    return Some(elst);
                }
            }
        }
        None
    }

    /// Get a mutable edit list, creating `edts`/`elst` when absent.
    pub fn edit_list_mut(&mut self) -> &mut EditListBox {
        if first_box!(&self.boxes, EditBox).is_none() {
            self.boxes.push(EditBox { boxes: Vec::new() }.to_mp4box());
        }
        let edts = first_box_mut!(&mut self.boxes, EditBox).unwrap();
        if first_box!(&edts.boxes, EditListBox).is_none() {
            edts.boxes.push(EditListBox::default().to_mp4box());
        }
        first_box_mut!(&mut edts.boxes, EditListBox).unwrap()
    }

    /// Check if this track is valid (has header and media boxes).
    pub fn is_valid(&self) -> bool {
        let mut valid = true;
        let track_id = match first_box!(&self.boxes, TrackHeaderBox) {
            Some(th) => th.track_id,
            None => {
                log::error!("TrackBox: no TrackHeaderBox present");
                return false;
            },
        };

        match first_box!(&self.boxes, MediaBox) {
            Some(m) => {
                if !m.is_valid() {
                    valid = false;
                }
            },
            None => {
                log::error!("TrackBox(id {}): no MediaBox present", track_id);
                valid = false;
            },
        }

        if let Some(m) = first_box!(&self.boxes, SampleTableBox) {
            if !m.is_valid() {
                valid = false;
            }
        }

        valid
    }
}
