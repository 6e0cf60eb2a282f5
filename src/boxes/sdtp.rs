use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.6.4 Independent and Disposable Samples Box (ISO/IEC 14496-12:2015(E))
    ///
    /// One byte per sample. The meaning of the top two bits differs
    /// between ISO (`is_leading`) and QTFF ("earlier display allowed");
    /// see `SampleDependencyTypeBox::dialect`.
    #[derive(Default)]
    SampleDependencyTypeBox {
        entries:        ArrayUnsized<SampleDependencyEntry>,
    },
    fourcc => "sdtp",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

/// One sample's dependency byte, unpacked.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleDependencyEntry {
    pub is_leading:            u8,
    pub sample_depends_on:     u8,
    pub sample_is_depended_on: u8,
    pub sample_has_redundancy: u8,
}

impl FromBytes for SampleDependencyEntry {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
        let b = u8::from_bytes(stream)?;
        Ok(SampleDependencyEntry {
            is_leading:            (b >> 6) & 0x3,
            sample_depends_on:     (b >> 4) & 0x3,
            sample_is_depended_on: (b >> 2) & 0x3,
            sample_has_redundancy: b & 0x3,
        })
    }
    fn min_size() -> usize {
        1
    }
}

impl ToBytes for SampleDependencyEntry {
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        let b = ((self.is_leading & 0x3) << 6)
            | ((self.sample_depends_on & 0x3) << 4)
            | ((self.sample_is_depended_on & 0x3) << 2)
            | (self.sample_has_redundancy & 0x3);
        b.to_bytes(stream)
    }
}

/// Which dialect the `is_leading` bits of an `sdtp` box follow.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SdtpDialect {
    Iso,
    QuickTime,
}

impl SampleDependencyTypeBox {
    /// Detect whether the two top bits are ISO `is_leading` or the
    /// QTFF "earlier display allowed" flag.
    ///
    /// A value > 1 only exists under ISO. A value of 1 on a sample
    /// that is independent is meaningless under ISO, so that pattern
    /// indicates QTFF. Anything else keeps `default_iso`.
    pub fn dialect(&self, default_iso: bool) -> SdtpDialect {
        for e in &self.entries {
            if e.is_leading > 1 {
                return SdtpDialect::Iso;
            }
            // 2 == "does not depend on others" (independent).
            if e.is_leading == 1 && e.sample_depends_on == 2 {
                return SdtpDialect::QuickTime;
            }
        }
        if default_iso {
            SdtpDialect::Iso
        } else {
            SdtpDialect::QuickTime
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(is_leading: u8, depends_on: u8) -> SampleDependencyEntry {
        SampleDependencyEntry {
            is_leading,
            sample_depends_on: depends_on,
            sample_is_depended_on: 0,
            sample_has_redundancy: 0,
        }
    }

    #[test]
    fn dialect_detection() {
        // is_leading > 1 only exists under ISO.
        let mut sdtp = SampleDependencyTypeBox::default();
        sdtp.entries.push(entry(2, 1));
        assert_eq!(sdtp.dialect(false), SdtpDialect::Iso);

        // "leading" on an independent sample means QuickTime's
        // earlier-display-allowed bit.
        let mut sdtp = SampleDependencyTypeBox::default();
        sdtp.entries.push(entry(1, 2));
        assert_eq!(sdtp.dialect(true), SdtpDialect::QuickTime);

        // Inconclusive tables keep the file-level default.
        let mut sdtp = SampleDependencyTypeBox::default();
        sdtp.entries.push(entry(0, 1));
        assert_eq!(sdtp.dialect(true), SdtpDialect::Iso);
        assert_eq!(sdtp.dialect(false), SdtpDialect::QuickTime);
    }

    #[test]
    fn dependency_byte_roundtrip() {
        use crate::io::MemBuffer;
        let e = entry(1, 2);
        let mut buf = MemBuffer::new();
        e.to_bytes(&mut buf).unwrap();
        assert_eq!(buf.into_vec(), vec![0b01_10_00_00]);
    }
}
