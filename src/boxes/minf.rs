use std::io;

use crate::boxes::prelude::*;
use crate::boxes::{DataInformationBox, SampleTableBox};

def_box! {
    /// 8.4.4 Media Information Box (ISO/IEC 14496-12:2015(E))
    MediaInformationBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "minf",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl MediaInformationBox {
    declare_box_methods!(SampleTableBox, sample_table, sample_table_mut);

    /// Get a reference to the DataInformationBox.
    pub fn data_information(&self) -> Option<&DataInformationBox> {
        first_box!(&self.boxes, DataInformationBox)
    }

    /// Check if this box is valid (has a sample table).
    pub fn is_valid(&self) -> bool {
        match first_box!(&self.boxes, SampleTableBox) {
            Some(st) => st.is_valid(),
            None => {
                log::error!("MediaInformationBox: no SampleTableBox present");
                false
            },
        }
    }
}
