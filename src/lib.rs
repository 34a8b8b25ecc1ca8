//! # mch_lib
//!
//! mch_lib is a library for reading and writing the MCH field model format and the ONE field animation archive.
//! The types mirror the binary layout as closely as possible, so an unmodified file is written back byte for byte.
//! Regions whose meaning is not known yet are stored as raw bytes.
//!
//! For decoded positions, skeletons, animations, and export of edited models, see the mch_data crate.
/*!
```no_run
use mch_lib::Mch;

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mch = Mch::from_file("d000.mch")?;
println!("{} vertices", mch.model.vertices.len());
mch.write_to_file("d000_new.mch")?;
# Ok(())
# }
```
 */
pub mod formats;

mod export;

pub use formats::mch::Mch;
pub use formats::one::One;
pub use mch_write::{self, MchWrite};

use binread::{
    io::{Cursor, Read, Seek, SeekFrom},
    BinRead, BinReaderExt, BinResult, ReadOptions,
};
use std::fs;
use std::io::Write;
use std::path::Path;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

/// The value marking the end of an [OffsetList].
pub const OFFSET_LIST_TERMINATOR: u32 = 0xFFFFFFFF;

/// A list of `u32` values ending with [OFFSET_LIST_TERMINATOR].
/// The terminator is not part of the list and is written automatically.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetList(pub Vec<u32>);

impl BinRead for OffsetList {
    type Args = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        options: &ReadOptions,
        _args: Self::Args,
    ) -> BinResult<Self> {
        let mut values = Vec::new();
        loop {
            let value = u32::read_options(reader, options, ())?;
            if value == OFFSET_LIST_TERMINATOR {
                break;
            }
            values.push(value);
        }
        Ok(Self(values))
    }
}

impl MchWrite for OffsetList {
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.mch_write(writer)?;
        OFFSET_LIST_TERMINATOR.mch_write(writer)?;
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        (self.0.len() as u64 + 1) * 4
    }
}

/// The size of the animation count that starts an animation block.
/// The oldest files use 4 bytes.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountWidth {
    U16,
    U32,
}

impl Default for CountWidth {
    fn default() -> Self {
        CountWidth::U16
    }
}

impl CountWidth {
    pub(crate) fn read_count<R: Read + Seek>(
        self,
        reader: &mut R,
        options: &ReadOptions,
    ) -> BinResult<u32> {
        match self {
            CountWidth::U16 => u16::read_options(reader, options, ()).map(u32::from),
            CountWidth::U32 => u32::read_options(reader, options, ()),
        }
    }

    pub(crate) fn write_count<W: Write + Seek>(
        self,
        writer: &mut W,
        count: usize,
    ) -> std::io::Result<()> {
        let invalid_count = || {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Count {} does not fit in {:?}.", count, self),
            )
        };

        match self {
            CountWidth::U16 => u16::try_from(count)
                .map_err(|_| invalid_count())?
                .mch_write(writer),
            CountWidth::U32 => u32::try_from(count)
                .map_err(|_| invalid_count())?
                .mch_write(writer),
        }
    }

    /// The number of bytes used to store the count.
    pub fn size_in_bytes(self) -> u64 {
        match self {
            CountWidth::U16 => 2,
            CountWidth::U32 => 4,
        }
    }
}

fn read_to_end<R: Read + Seek>(reader: &mut R, _ro: &ReadOptions, _: ()) -> BinResult<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Returns an error if fewer than `len` bytes remain after the current position.
/// Counts and offsets read from a file are checked before allocating.
fn check_remaining<R: Read + Seek>(reader: &mut R, len: u64) -> BinResult<()> {
    let pos = reader.seek(SeekFrom::Current(0))?;
    let stream_len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(pos))?;

    if pos.checked_add(len).map_or(true, |end| end > stream_len) {
        return Err(binread::Error::AssertFail {
            pos,
            message: format!(
                "Region of {:#x} bytes extends past the end of the stream at {:#x}.",
                len, stream_len
            ),
        });
    }
    Ok(())
}

/// Reads `count` bytes after checking that they are present.
fn read_bytes<R: Read + Seek>(
    reader: &mut R,
    _ro: &ReadOptions,
    args: (u64,),
) -> BinResult<Vec<u8>> {
    let (count,) = args;
    check_remaining(reader, count)?;

    let mut buf = vec![0u8; count as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Reads the bytes from the current position up to the absolute position `end`.
fn read_until<R: Read + Seek>(
    reader: &mut R,
    ro: &ReadOptions,
    args: (u64,),
) -> BinResult<Vec<u8>> {
    let (end,) = args;
    let pos = reader.seek(SeekFrom::Current(0))?;
    let len = end.checked_sub(pos).ok_or(binread::Error::AssertFail {
        pos,
        message: format!("Region end {:#x} is before the current position.", end),
    })?;

    read_bytes(reader, ro, (len,))
}

/// Reads `count` elements without reserving space for them up front.
/// A corrupted count fails at the end of the stream instead of allocating.
fn read_vec<R: Read + Seek, T: BinRead<Args = ()>>(
    reader: &mut R,
    options: &ReadOptions,
    args: (u32,),
) -> BinResult<Vec<T>> {
    let (count,) = args;
    let mut values = Vec::new();
    for _ in 0..count {
        values.push(T::read_options(reader, options, ())?);
    }
    Ok(values)
}

/// Seeks to the absolute position `pos` and writes `value`.
/// Seeking past the end of a buffer fills the gap with zeros.
fn write_at<W: Write + Seek, T: MchWrite + ?Sized>(
    writer: &mut W,
    pos: u64,
    value: &T,
) -> std::io::Result<()> {
    writer.seek(SeekFrom::Start(pos))?;
    value.mch_write(writer)
}

macro_rules! read_write_impl {
    ($ty:ident) => {
        impl $ty {
            /// Tries to read the type from `path`.
            /// The entire file is buffered for performance.
            pub fn from_file<P: AsRef<Path>>(path: P) -> BinResult<Self> {
                Self::from_file_with_count_width(path, CountWidth::default())
            }

            /// Tries to read the type from `path` using the given animation count size.
            /// The entire file is buffered for performance.
            pub fn from_file_with_count_width<P: AsRef<Path>>(
                path: P,
                count_width: CountWidth,
            ) -> BinResult<Self> {
                let mut file = Cursor::new(fs::read(path)?);
                let value = file.read_le_args::<$ty>((count_width,))?;
                Ok(value)
            }

            /// Tries to read the type from `reader`.
            /// For best performance when opening from a file, use `from_file` instead.
            pub fn read<R: Read + Seek>(reader: &mut R) -> BinResult<Self> {
                Self::read_with_count_width(reader, CountWidth::default())
            }

            /// Tries to read the type from `reader` using the given animation count size.
            pub fn read_with_count_width<R: Read + Seek>(
                reader: &mut R,
                count_width: CountWidth,
            ) -> BinResult<Self> {
                let value = reader.read_le_args::<$ty>((count_width,))?;
                Ok(value)
            }

            /// Tries to write the type to `writer`.
            /// For best performance when writing to a file, use `write_to_file` instead.
            pub fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
                self.mch_write(writer)
            }

            /// Tries to write the type to `path`.
            /// The entire file is buffered for performance.
            pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
                let mut file = std::fs::File::create(path)?;
                crate::export::write_buffered(&mut file, |c| self.mch_write(c))?;
                Ok(())
            }
        }
    };
}

read_write_impl!(Mch);
read_write_impl!(One);

#[cfg(test)]
pub(crate) fn group_hex(a: &str, words_per_line: usize) -> String {
    use itertools::Itertools;

    // ex: "FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF..."
    let words = a
        .chars()
        .collect::<Vec<char>>()
        .chunks(8)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<String>>();

    words.chunks(words_per_line).map(|c| c.join(" ")).join("\n")
}

#[cfg(test)]
macro_rules! assert_hex_eq {
    ($a:expr, $b:expr) => {
        assert!(
            $a == $b,
            "\n{} !=\n{}",
            crate::group_hex(&hex::encode($a), 8),
            crate::group_hex(&hex::encode($b), 8)
        )
    };
}

#[cfg(test)]
pub(crate) use assert_hex_eq;

#[cfg(test)]
mod tests {
    use super::*;
    use hexlit::hex;

    #[test]
    fn read_offset_list() {
        let mut reader = Cursor::new(hex!("00010000 00020000 FFFFFFFF 12345678"));
        let value = reader.read_le::<OffsetList>().unwrap();

        assert_eq!(OffsetList(vec![0x100, 0x200]), value);
        assert_eq!(12, reader.position());
    }

    #[test]
    fn read_empty_offset_list() {
        let mut reader = Cursor::new(hex!("FFFFFFFF"));
        let value = reader.read_le::<OffsetList>().unwrap();

        assert!(value.0.is_empty());
    }

    #[test]
    fn read_offset_list_missing_terminator() {
        let mut reader = Cursor::new(hex!("00010000 00020000"));
        assert!(reader.read_le::<OffsetList>().is_err());
    }

    #[test]
    fn write_offset_list() {
        let mut writer = Cursor::new(Vec::new());
        OffsetList(vec![0x100]).mch_write(&mut writer).unwrap();

        assert_hex_eq!(writer.get_ref(), &hex!("00010000 FFFFFFFF"));
        assert_eq!(8, OffsetList(vec![0x100]).size_in_bytes());
    }

    #[test]
    fn read_until_past_end() {
        let mut reader = Cursor::new(hex!("01020304"));
        let options = ReadOptions::default();

        assert!(read_until(&mut reader, &options, (0xFFFFFFF0,)).is_err());
        assert_eq!(0, reader.position());

        assert_eq!(
            vec![1, 2, 3],
            read_until(&mut reader, &options, (3,)).unwrap()
        );
    }

    #[test]
    fn read_until_before_position() {
        let mut reader = Cursor::new(hex!("01020304"));
        reader.set_position(2);
        assert!(read_until(&mut reader, &ReadOptions::default(), (1,)).is_err());
    }

    #[test]
    fn read_bytes_large_count() {
        let mut reader = Cursor::new(hex!("01020304"));
        let result = read_bytes(&mut reader, &ReadOptions::default(), (u64::MAX,));
        assert!(result.is_err());
    }

    #[test]
    fn read_vec_large_count() {
        let mut reader = Cursor::new(hex!("01000000 02000000"));
        let result = read_vec::<_, u32>(&mut reader, &ReadOptions::default(), (u32::MAX,));
        assert!(result.is_err());

        reader.set_position(0);
        let values = read_vec::<_, u32>(&mut reader, &ReadOptions::default(), (2,)).unwrap();
        assert_eq!(vec![1, 2], values);
    }

    #[test]
    fn write_count_overflow() {
        let mut writer = Cursor::new(Vec::new());
        assert!(CountWidth::U16.write_count(&mut writer, 0x10000).is_err());
        assert!(CountWidth::U32.write_count(&mut writer, 0x10000).is_ok());
        assert_hex_eq!(writer.get_ref(), &hex!("00000100"));
    }

    #[test]
    fn read_until_position() {
        let mut reader = Cursor::new(hex!("01020304"));
        reader.seek(SeekFrom::Start(1)).unwrap();
        let options = ReadOptions::default();

        assert_eq!(
            vec![2u8, 3u8],
            read_until(&mut reader, &options, (3,)).unwrap()
        );
        assert!(read_until(&mut reader, &options, (1,)).is_err());
    }
}
