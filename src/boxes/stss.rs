use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.6.2 Sync Sample Box (ISO/IEC 14496-12:2015(E))
    ///
    /// 1-based sample numbers, strictly ascending. A track without a
    /// SyncSampleBox has only sync samples.
    #[derive(Default)]
    SyncSampleBox {
        entries:        ArraySized32<u32>,
    },
    fourcc => "stss",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

impl SyncSampleBox {
    /// Check that the sample numbers are strictly ascending.
    pub fn is_ascending(&self) -> bool {
        self.entries.windows(2).all(|w| w[0] < w[1])
    }
}
