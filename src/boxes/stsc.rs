use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.7.4 Sample To Chunk Box (ISO/IEC 14496-12:2015(E))
    ///
    /// Sparse: each entry applies from its `first_chunk` up to the
    /// next entry's `first_chunk - 1`, inclusive.
    #[derive(Default)]
    SampleToChunkBox {
        entries:        ArraySized32<SampleToChunkEntry>,
    },
    fourcc => "stsc",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_struct! {
    /// Entry in SampleToChunkBox.
    SampleToChunkEntry,
        first_chunk:                u32,
        samples_per_chunk:          u32,
        sample_description_index:   u32,
}

impl SampleToChunkBox {
    /// Check that `first_chunk` is strictly ascending.
    pub fn is_monotonic(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].first_chunk < w[1].first_chunk)
    }
}
