//
// ISO/IEC 14496-12:2015(E)
// 8.5.2 Sample Description Box
//

use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.5.2 Sample Description Box (ISO/IEC 14496-12:2015(E))
    ///
    /// The entries are polymorphic: audio / video / other sample
    /// entries, by fourcc. Unrecognized ones are kept opaque.
    #[derive(Default)]
    SampleDescriptionBox {
        entries:    ArraySized32<MP4Box>,
    },
    fourcc => "stsd",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

impl SampleDescriptionBox {
    /// Look up a 1-based sample description index.
    pub fn entry(&self, index: u32) -> Option<&MP4Box> {
        if index == 0 {
            return None;
        }
        self.entries.get(index as usize - 1)
    }
}
