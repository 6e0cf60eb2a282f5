use std::io;

use crate::boxes::prelude::*;
use crate::boxes::{
    ChunkOffsetBox, CompositionOffsetBox, CompositionToDecodeBox, PartialSyncSampleBox,
    SampleDependencyTypeBox, SampleDescriptionBox, SampleGroupDescriptionBox, SampleSizeBox,
    SampleToChunkBox, SampleToGroupBox, SyncSampleBox, TimeToSampleBox,
};

def_box! {
    /// 8.1.1 Sample Table Box (ISO/IEC 14496-12:2015(E))
    ///
    /// It usually contains:
    ///
    /// - TimeToSampleBox, stts
    /// - SampleDescriptionBox, stsd
    /// - SampleSizeBox, stsz, or CompactSampleSizeBox, stz2
    /// - SampleToChunkBox, stsc
    /// - ChunkOffsetBox, stco, or ChunkLargeOffsetBox, co64
    ///
    /// Optionally:
    ///
    /// - CompositionOffsetBox, ctts
    /// - CompositionToDecodeBox, cslg
    /// - SyncSampleBox, stss
    /// - PartialSyncSampleBox, stps (QTFF)
    /// - SampleDependencyTypeBox, sdtp
    /// - SampleToGroupBox, sbgp
    /// - SampleGroupDescriptionBox, sgpd
    ///
    #[derive(Default)]
    SampleTableBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "stbl",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl SampleTableBox {
    declare_box_methods!(SampleDescriptionBox, sample_description, sample_description_mut);
    declare_box_methods!(SampleSizeBox, sample_size, sample_size_mut);
    declare_box_methods!(TimeToSampleBox, time_to_sample, time_to_sample_mut);
    declare_box_methods!(SampleToChunkBox, sample_to_chunk, sample_to_chunk_mut);
    declare_box_methods_opt!(CompositionOffsetBox, composition_time_to_sample, composition_time_to_sample_mut);
    declare_box_methods_opt!(CompositionToDecodeBox, composition_to_decode, composition_to_decode_mut);
    declare_box_methods_opt!(SyncSampleBox, sync_samples, sync_samples_mut);
    declare_box_methods_opt!(PartialSyncSampleBox, partial_sync_samples, partial_sync_samples_mut);
    declare_box_methods_opt!(SampleDependencyTypeBox, sample_dependencies, sample_dependencies_mut);

    /// Get a reference to the chunk offset table (either stco or co64).
    pub fn chunk_offset(&self) -> &ChunkOffsetBox {
        self.chunk_offset_opt().unwrap()
    }

    /// Like `chunk_offset`, but does not panic when absent.
    pub fn chunk_offset_opt(&self) -> Option<&ChunkOffsetBox> {
        self.boxes.iter().find_map(|b| match b {
            MP4Box::ChunkOffsetBox(co) => Some(co),
            MP4Box::ChunkLargeOffsetBox(co) => Some(co),
            _ => None,
        })
    }

    /// Find a sample group description by grouping type.
    pub fn sample_group_description(&self, grouping_type: FourCC) -> Option<&SampleGroupDescriptionBox> {
        iter_box!(&self.boxes, SampleGroupDescriptionBox).find(|sgpd| sgpd.grouping_type == grouping_type)
    }

    /// Find a sample-to-group mapping by grouping type.
    pub fn sample_to_group(&self, grouping_type: FourCC) -> Option<&SampleToGroupBox> {
        iter_box!(&self.boxes, SampleToGroupBox).find(|sbgp| sbgp.grouping_type == grouping_type)
    }

    /// Check if this SampleTableBox has the mandatory boxes.
    pub fn is_valid(&self) -> bool {
        let mut valid = true;
        if first_box!(&self.boxes, SampleDescriptionBox).is_none() {
            log::error!("SampleTableBox: no SampleDescriptionBox present");
            valid = false;
        }
        if first_box!(&self.boxes, TimeToSampleBox).is_none() {
            log::error!("SampleTableBox: no TimeToSampleBox present");
            valid = false;
        }
        if first_box!(&self.boxes, SampleToChunkBox).is_none() {
            log::error!("SampleTableBox: no SampleToChunkBox present");
            valid = false;
        }
        if self.chunk_offset_opt().is_none() {
            log::error!("SampleTableBox: no ChunkOffsetBox present");
            valid = false;
        }
        valid
    }
}
