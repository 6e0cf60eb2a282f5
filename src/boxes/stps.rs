use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// Partial Sync Sample Box (QTFF).
    ///
    /// Same shape as `stss`; marks open-GOP random access points.
    #[derive(Default)]
    PartialSyncSampleBox {
        entries:        ArraySized32<u32>,
    },
    fourcc => "stps",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}
