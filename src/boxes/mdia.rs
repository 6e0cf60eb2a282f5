use std::io;

use crate::boxes::prelude::*;
use crate::boxes::{ExtendedLanguageBox, HandlerBox, MediaHeaderBox, MediaInformationBox};

def_box! {
    /// 8.4.1 Media Box (ISO/IEC 14496-12:2015(E))
    MediaBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "mdia",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl MediaBox {
    declare_box_methods!(MediaHeaderBox, media_header, media_header_mut);
    declare_box_methods!(HandlerBox, handler, handler_mut);
    declare_box_methods!(MediaInformationBox, media_info, media_info_mut);

    /// Get an optional reference to the ExtendedLanguageBox.
    pub fn extended_language(&self) -> Option<&ExtendedLanguageBox> {
        first_box!(&self.boxes, ExtendedLanguageBox)
    }

    /// Check if this box is valid (has header, handler, and mediainfo boxes).
    pub fn is_valid(&self) -> bool {
        let mut valid = true;
        if first_box!(&self.boxes, MediaHeaderBox).is_none() {
            log::error!("MediaBox: no MediaHeaderBox present");
            valid = false;
        }
        if first_box!(&self.boxes, HandlerBox).is_none() {
            log::error!("MediaBox: no HandlerBox present");
            valid = false;
        }
        match first_box!(&self.boxes, MediaInformationBox) {
            Some(mi) => {
                if !mi.is_valid() {
                    valid = false;
                }
            },
            None => {
                log::error!("MediaBox: no MediaInformationBox present");
                valid = false;
            },
        }
        valid
    }
}
