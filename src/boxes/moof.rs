use std::io;

use crate::boxes::prelude::*;
use crate::boxes::{
    SampleDependencyTypeBox, SampleGroupDescriptionBox, SampleToGroupBox,
    TrackFragmentBaseMediaDecodeTimeBox, TrackFragmentHeaderBox, TrackRunBox,
};

def_box! {
    /// 8.8.4 Movie Fragment Box (ISO/IEC 14496-12:2015(E))
    ///
    /// Contains:
    /// - `1  ` MovieFragmentHeaderBox
    /// - `0+ ` TrackFragmentBox
    ///
    /// `pos` is the file offset of this box; track runs are addressed
    /// relative to it when `default-base-is-moof` is set.
    MovieFragmentBox {
        pos:        u64,
        boxes:      Vec<MP4Box>,
    },
    fourcc => "moof",
    version => [],
    impls => [ basebox, boxinfo, debug ],
}

impl FromBytes for MovieFragmentBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<MovieFragmentBox> {
        let pos = stream.pos();
        let mut reader = BoxReader::new(stream)?;
        let boxes = Vec::<MP4Box>::from_bytes(&mut reader)?;
        Ok(MovieFragmentBox { pos, boxes })
    }
    fn min_size() -> usize {
        8
    }
}

impl ToBytes for MovieFragmentBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        self.boxes.to_bytes(&mut writer)?;
        writer.finalize()
    }
}

impl MovieFragmentBox {
    /// Get a reference to the list of track fragments.
    pub fn track_fragments(&self) -> Vec<&TrackFragmentBox> {
        iter_box!(&self.boxes, TrackFragmentBox).collect()
    }
}

def_box! {
    /// 8.8.6 Track Fragment Box (ISO/IEC 14496-12:2015(E))
    TrackFragmentBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => "traf",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

impl TrackFragmentBox {
    /// Get a reference to the Track Fragment Header.
    pub fn track_fragment_header(&self) -> Option<&TrackFragmentHeaderBox> {
        first_box!(&self.boxes, TrackFragmentHeaderBox)
    }

    /// Get a reference to the Track Fragment Decode Time.
    pub fn track_fragment_decode_time(&self) -> Option<&TrackFragmentBaseMediaDecodeTimeBox> {
        first_box!(&self.boxes, TrackFragmentBaseMediaDecodeTimeBox)
    }

    /// List of Track Run Boxes.
    pub fn track_run_boxes(&self) -> Vec<&TrackRunBox> {
        iter_box!(&self.boxes, TrackRunBox).collect()
    }

    /// Per-fragment sample dependencies, if present.
    pub fn sample_dependencies(&self) -> Option<&SampleDependencyTypeBox> {
        first_box!(&self.boxes, SampleDependencyTypeBox)
    }

    /// Fragment-local sample group description by grouping type.
    pub fn sample_group_description(&self, grouping_type: FourCC) -> Option<&SampleGroupDescriptionBox> {
        iter_box!(&self.boxes, SampleGroupDescriptionBox).find(|sgpd| sgpd.grouping_type == grouping_type)
    }

    /// Fragment-local sample-to-group mapping by grouping type.
    pub fn sample_to_group(&self, grouping_type: FourCC) -> Option<&SampleToGroupBox> {
        iter_box!(&self.boxes, SampleToGroupBox).find(|sbgp| sbgp.grouping_type == grouping_type)
    }
}
