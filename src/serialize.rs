//! Basic serializer / deserializer.
//!
//! The `FromBytes`/`ToBytes` traits and the `def_struct!` macro live here,
//! together with the implementations for the primitive integer types.
//!
//! Multi-byte integers on the wire are big-endian. The one place the
//! format deviates from that (the WAVE `fmt ` chunk) is out of scope
//! for this crate.
use std::convert::TryInto;
use std::io::{self, ErrorKind::UnexpectedEof};

use auto_impl::auto_impl;

use crate::types::FourCC;

/// Byte reader in a stream.
#[auto_impl(&mut)]
pub trait ReadBytes: BoxBytes {
    /// Read an exact number of bytes, return a reference to the buffer.
    fn read(&mut self, amount: u64) -> io::Result<&[u8]>;

    /// Read an exact number of bytes, but don't advance position.
    fn peek(&mut self, amount: u64) -> io::Result<&[u8]>;

    /// Skip some bytes in the input.
    fn skip(&mut self, amount: u64) -> io::Result<()>;

    /// How much data is left?
    fn left(&mut self) -> u64;
}

/// Byte writer in a stream.
#[auto_impl(&mut)]
pub trait WriteBytes: BoxBytes {
    /// Write an exact number of bytes.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;
    /// Zero-fill some bytes in the output.
    fn skip(&mut self, amount: u64) -> io::Result<()>;
}

/// Optional methods for streams that carry box context.
///
/// The version/flags of the innermost FullBox being read or written are
/// made available to nested field types this way, so that 32/64-bit
/// version-sized values can pick the right width.
#[auto_impl(&mut)]
pub trait BoxBytes {
    /// Get current position in the stream.
    fn pos(&mut self) -> u64 {
        unimplemented!()
    }
    /// Seek to a position in the stream.
    fn seek(&mut self, _pos: u64) -> io::Result<()> {
        unimplemented!()
    }
    /// Size of the stream.
    fn size(&self) -> u64 {
        unimplemented!()
    }
    /// Version of the FullBox being read/written.
    fn version(&self) -> u8 {
        0
    }
    /// Flags of the FullBox being read/written.
    fn flags(&self) -> u32 {
        0
    }
    /// FourCC of the box being read/written.
    fn fourcc(&self) -> FourCC {
        unimplemented!()
    }
    /// Name of the input file, if any.
    fn input_filename(&self) -> Option<&str> {
        None
    }
}

/// Implementation of ReadBytes on a byte slice.
impl ReadBytes for &[u8] {
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        let mut amount = amount as usize;
        if amount == 0 {
            amount = self.len();
        }
        if amount > self.len() {
            return Err(ioerr!(UnexpectedEof));
        }
        let this = std::mem::replace(self, &[]);
        let (res, rest) = this.split_at(amount);
        *self = rest;
        Ok(res)
    }

    fn peek(&mut self, amount: u64) -> io::Result<&[u8]> {
        let amount = amount as usize;
        if amount > self.len() {
            return Err(ioerr!(UnexpectedEof));
        }
        Ok(&self[..amount])
    }

    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if amount > self.len() as u64 {
            return Err(ioerr!(UnexpectedEof));
        }
        let this = std::mem::replace(self, &[]);
        *self = &this[amount as usize..];
        Ok(())
    }

    #[inline]
    fn left(&mut self) -> u64 {
        self.len() as u64
    }
}

impl BoxBytes for &[u8] {
    fn pos(&mut self) -> u64 {
        0
    }
    fn size(&self) -> u64 {
        self.len() as u64
    }
}

/// Trait to deserialize a type.
pub trait FromBytes {
    fn from_bytes<R: ReadBytes>(bytes: &mut R) -> io::Result<Self>
    where
        Self: Sized;
    fn min_size() -> usize;
}

/// Trait to serialize a type.
pub trait ToBytes {
    fn to_bytes<W: WriteBytes>(&self, bytes: &mut W) -> io::Result<()>;
}

// Convenience macro to implement FromBytes/ToBytes for integer types.
macro_rules! def_from_to_bytes {
    ($type:ident) => {
        impl FromBytes for $type {
            #[inline]
            fn from_bytes<R: ReadBytes>(bytes: &mut R) -> io::Result<Self> {
                let sz = std::mem::size_of::<$type>();
                let data = bytes.read(sz as u64)?;
                let data = data.try_into().map_err(|_| ioerr!(UnexpectedEof))?;
                Ok($type::from_be_bytes(data))
            }
            #[inline]
            fn min_size() -> usize {
                std::mem::size_of::<$type>()
            }
        }
        impl ToBytes for $type {
            #[inline]
            fn to_bytes<W: WriteBytes>(&self, bytes: &mut W) -> io::Result<()> {
                bytes.write(&self.to_be_bytes()[..])
            }
        }
    };
}

impl FromBytes for () {
    #[inline]
    fn from_bytes<R: ReadBytes>(_bytes: &mut R) -> io::Result<Self> {
        Ok(())
    }
    #[inline]
    fn min_size() -> usize {
        0
    }
}

impl ToBytes for () {
    #[inline]
    fn to_bytes<W: WriteBytes>(&self, _bytes: &mut W) -> io::Result<()> {
        Ok(())
    }
}

def_from_to_bytes!(u8);
def_from_to_bytes!(i16);
def_from_to_bytes!(u16);
def_from_to_bytes!(i32);
def_from_to_bytes!(u32);
def_from_to_bytes!(i64);
def_from_to_bytes!(u64);
def_from_to_bytes!(u128);

/// Generic implementation for Vec<T>: read as many T's as fit in the box.
impl<T> FromBytes for Vec<T>
where
    T: FromBytes,
{
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
        let mut v = Vec::new();
        let min_size = T::min_size() as u64;
        while stream.left() >= min_size && stream.left() > 0 {
            v.push(T::from_bytes(stream)?);
        }
        Ok(v)
    }
    fn min_size() -> usize {
        0
    }
}

impl<T> ToBytes for Vec<T>
where
    T: ToBytes,
{
    fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
        for elem in self {
            elem.to_bytes(stream)?;
        }
        Ok(())
    }
}

/// A macro to define a struct and implement the FromBytes/ToBytes traits for it.
///
/// Usage:
///
/// ```text
/// def_struct! { Name,
///     field1:     u32,        // primitive type
///     field2:     Time,       // struct that also implements FromBytes/ToBytes
///     skip:       8,          // skip 8 bytes while serializing / deserializing.
///     ....
/// }
/// ```
#[doc(hidden)]
#[macro_export]
macro_rules! def_struct {
    // Minimum on-the-wire size of a type. Hard-coded for the common ones.
    (@min_size u8) => { 1 };
    (@min_size i16) => { 2 };
    (@min_size u16) => { 2 };
    (@min_size i32) => { 4 };
    (@min_size u32) => { 4 };
    (@min_size i64) => { 8 };
    (@min_size u64) => { 8 };
    (@min_size u128) => { 16 };
    (@min_size Vec $(<$gen:tt>)?) => { 0 };
    (@min_size Option $(<$gen:tt>)?) => { 0 };
    (@min_size ArraySized16 <$gen:tt>) => { 2 };
    (@min_size ArraySized32 <$gen:tt>) => { 4 };
    (@min_size ArrayUnsized <$gen:tt>) => { 0 };
    (@min_size $amount:literal) => { $amount };
    (@min_size $type:ty) => { <$type>::min_size() };

    // @def_struct: define the struct, line by line, skipping "skip" fields.
    (@def_struct $(#[$outer:meta])* $name:ident, $( $field:tt: $type:tt $(<$gen:tt>)? ),* $(,)?) => {
        def_struct!(@def_struct_ [$(#[$outer])* $name], [ $( $field: $type $(<$gen>)?, )* ] -> []);
    };
    (@def_struct_ $info:tt, [ skip: $amount:tt, $($tt:tt)*] -> [ $($res:tt)* ]) => {
        def_struct!(@def_struct_ $info, [$($tt)*] -> [ $($res)* ]);
    };
    (@def_struct_ $info:tt, [ $field:ident: $type:tt $(<$gen:tt>)?, $($tt:tt)*] -> [ $($res:tt)* ]) => {
        def_struct!(@def_struct_ $info, [$($tt)*] -> [ $($res)* pub $field: $type $(<$gen>)?, ]);
    };
    (@def_struct_ [$(#[$outer:meta])* $name:ident], [] -> [ $($res:tt)* ]) => {
        $(#[$outer])*
        pub struct $name { $( $res )* }
    };

    // @from_bytes: deserialize the fields in order.
    (@from_bytes $name:ident, $stream:ident, $( $field:tt: $type:tt $(<$gen:tt>)? ),* $(,)?) => {
        def_struct!(@from_bytes_ $name, $stream, [ $( $field: $type $(<$gen>)?, )* ] -> [] [])
    };
    (@from_bytes_ $name:ident, $stream:ident, [ skip: $amount:tt, $($tt:tt)*]
        -> [ $($set:tt)* ] [ $($fields:tt)* ]) => {
        def_struct!(@from_bytes_ $name, $stream, [ $($tt)* ] ->
            [ $($set)* [ $stream.skip($amount)?; ] ] [ $($fields)* ])
    };
    (@from_bytes_ $name:ident, $stream:ident, [ $field:ident: $type:tt $(<$gen:tt>)?, $($tt:tt)*]
        -> [ $($set:tt)* ] [ $($fields:tt)* ]) => {
        def_struct!(@from_bytes_ $name, $stream, [ $($tt)* ] ->
            [ $($set)* [ let $field = <$type $(<$gen>)?>::from_bytes($stream)?; ] ] [ $($fields)* $field ])
    };
    (@from_bytes_ $name:ident, $_stream:ident, [] -> [ $([$($set:tt)*])* ] [ $($field:tt)* ]) => {
        {
            $(
                $($set)*
            )*
            Ok($name {
                $(
                    $field,
                )*
            })
        }
    };

    // @to_bytes: serialize the fields in order.
    (@to_bytes $struct:expr, $stream:ident, $( $field:tt: $type:tt $(<$gen:tt>)? ),* $(,)?) => {
        {
            $(
                def_struct!(@to_bytes_ $struct, $stream, $field: $type $(<$gen>)?);
            )*
            Ok(())
        }
    };
    (@to_bytes_ $struct:expr, $stream:ident, skip: $amount:tt) => {
        $stream.skip($amount)?;
    };
    (@to_bytes_ $struct:expr, $stream:ident, $field:ident: $type:tt $(<$gen:tt>)?) => {
        $struct.$field.to_bytes($stream)?;
    };

    // Helpers to leave out "skip" fields in Debug output.
    (@filter_skip skip, $($tt:tt)*) => {};
    (@filter_skip $field:ident, $($tt:tt)*) => { $($tt)* };

    // Main entry point to define one plain struct.
    ($(#[$outer:meta])* $name:ident, $($field:tt: $type:tt $(<$gen:tt>)?),* $(,)?) => {
        def_struct!(@def_struct $(#[$outer])* #[derive(Clone)] $name,
            $(
                $field: $type $(<$gen>)?,
            )*
        );

        // Debug implementation that leaves out "skip" fields.
        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let mut dbg = f.debug_struct(stringify!($name));
                $(
                    def_struct!(@filter_skip $field, dbg.field(stringify!($field), &self.$field););
                )*
                dbg.finish()
            }
        }

        impl FromBytes for $name {
            fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
                def_struct!(@from_bytes $name, stream, $(
                    $field: $type $(<$gen>)?,
                )*)
            }

            fn min_size() -> usize {
                $( def_struct!(@min_size $type $(<$gen>)?) + )* 0
            }
        }

        impl ToBytes for $name {
            fn to_bytes<W: WriteBytes>(&self, stream: &mut W) -> io::Result<()> {
                def_struct!(@to_bytes self, stream, $(
                    $field: $type $(<$gen>)?,
                )*)
            }
        }
    };
}
