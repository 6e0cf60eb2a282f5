//! iTunes-style metadata: meta / keys / ilst, with mean / name / data
//! children on each item.
use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.11.1 Meta Box (ISO/IEC 14496-12:2015(E))
    MetaBox {
        boxes:  Vec<MP4Box>,
    },
    fourcc => "meta",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    /// Apple item list. Each child box is one tagged item whose fourcc
    /// is the tag, with `mean`/`name`/`data` children.
    AppleItemListBox {
        boxes:  Vec<MP4Box>,
    },
    fourcc => "ilst",
    version => [],
    impls => [ basebox, boxinfo, debug, fromtobytes ],
}

def_box! {
    /// QTFF metadata keys table.
    KeysBox {
        entries: ArraySized32<MetaKey>,
    },
    fourcc => "keys",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

/// One key in the `keys` table: a namespace and a name.
#[derive(Clone, Debug)]
pub struct MetaKey {
    pub namespace: FourCC,
    pub value:     Vec<u8>,
}

impl FromBytes for MetaKey {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<MetaKey> {
        let size = u32::from_bytes(stream)?;
        let namespace = FourCC::from_bytes(stream)?;
        if size < 8 {
            return Err(ioerr!(InvalidData, "keys: bad key size {}", size));
        }
        let value = stream.read((size - 8) as u64)?.to_vec();
        Ok(MetaKey { namespace, value })
    }
    fn min_size() -> usize {
        8
    }
}

impl ToBytes for MetaKey {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        ((self.value.len() + 8) as u32).to_bytes(stream)?;
        self.namespace.to_bytes(stream)?;
        stream.write(&self.value)
    }
}

def_box! {
    /// Reverse-DNS meaning of an ilst item ('mean').
    MeanBox {
        meaning:    ZString,
    },
    fourcc => "mean",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_box! {
    /// Name of an ilst item ('name').
    NameBox {
        name:       ZString,
    },
    fourcc => "name",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

/// Value of an ilst item ('data'): a type indicator, a locale, and the
/// payload bytes.
#[derive(Clone, Debug)]
pub struct ItemDataBox {
    pub data_type: u32,
    pub locale:    u32,
    pub data:      Data,
}

impl FromBytes for ItemDataBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<ItemDataBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;
        let data_type = u32::from_bytes(stream)?;
        let locale = u32::from_bytes(stream)?;
        let data = Data::from_bytes(stream)?;
        Ok(ItemDataBox {
            data_type,
            locale,
            data,
        })
    }
    fn min_size() -> usize {
        8
    }
}

impl ToBytes for ItemDataBox {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let mut writer = BoxWriter::new(stream, self)?;
        let stream = &mut writer;
        self.data_type.to_bytes(stream)?;
        self.locale.to_bytes(stream)?;
        self.data.to_bytes(stream)?;
        writer.finalize()
    }
}

impl BoxInfo for ItemDataBox {
    const FOURCC: &'static str = "data";

    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC::new("data")
    }
}

impl FullBox for ItemDataBox {}
