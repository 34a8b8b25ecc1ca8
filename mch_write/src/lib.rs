use std::io::{Seek, Write};

pub use mch_write_derive::MchWrite;

/// A trait for writing types that are part of the MCH and ONE formats.
///
/// Types are written in little endian with no implicit alignment.
/// Regions addressed by offsets are handled by the containing type,
/// which seeks to the region before writing it.
pub trait MchWrite {
    /// Writes the byte representation of `self` to `writer`.
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()>;

    /// The number of bytes written by [mch_write](crate::MchWrite::mch_write).
    fn size_in_bytes(&self) -> u64;
}

impl<T: MchWrite> MchWrite for [T] {
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        for element in self.iter() {
            element.mch_write(writer)?;
        }
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        self.iter().map(MchWrite::size_in_bytes).sum()
    }
}

impl<T: MchWrite, const N: usize> MchWrite for [T; N] {
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.as_slice().mch_write(writer)
    }

    fn size_in_bytes(&self) -> u64 {
        self.as_slice().size_in_bytes()
    }
}

impl<T: MchWrite> MchWrite for Vec<T> {
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.as_slice().mch_write(writer)
    }

    fn size_in_bytes(&self) -> u64 {
        self.as_slice().size_in_bytes()
    }
}

impl<T: MchWrite> MchWrite for Option<T> {
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Some(value) => value.mch_write(writer),
            None => Ok(()),
        }
    }

    fn size_in_bytes(&self) -> u64 {
        // None values are skipped entirely.
        match self {
            Some(value) => value.size_in_bytes(),
            None => 0,
        }
    }
}

macro_rules! mch_write_impl {
    ($($id:ident),*) => {
        $(
            impl MchWrite for $id {
                fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
                    writer.write_all(&self.to_le_bytes())?;
                    Ok(())
                }

                fn size_in_bytes(&self) -> u64 {
                    std::mem::size_of::<Self>() as u64
                }
            }
        )*
    }
}

mch_write_impl!(u8, u16, u32, u64, i8, i16, i32, i64, f32);

/// Implements [MchWrite] for a `Copy` type generated with `modular_bitfield` using its byte representation.
#[macro_export]
macro_rules! mch_write_modular_bitfield_impl {
    ($id:ident,$num_bytes:expr) => {
        impl mch_write::MchWrite for $id {
            fn mch_write<W: std::io::Write + std::io::Seek>(
                &self,
                writer: &mut W,
            ) -> std::io::Result<()> {
                // Bitfield bytes are stored in little endian order.
                std::io::Write::write_all(writer, &self.into_bytes())?;
                Ok(())
            }

            fn size_in_bytes(&self) -> u64 {
                $num_bytes
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn write_primitives_little_endian() {
        let mut writer = Cursor::new(Vec::new());
        0x2D010709u32.mch_write(&mut writer).unwrap();
        (-2i16).mch_write(&mut writer).unwrap();

        assert_eq!(
            vec![0x09, 0x07, 0x01, 0x2D, 0xFE, 0xFF],
            writer.into_inner()
        );
    }

    #[test]
    fn write_array_of_arrays() {
        let mut writer = Cursor::new(Vec::new());
        let value = [[1u8, 2u8], [3u8, 4u8]];
        value.mch_write(&mut writer).unwrap();

        assert_eq!(vec![1, 2, 3, 4], writer.into_inner());
        assert_eq!(4, value.size_in_bytes());
    }

    #[test]
    fn write_none() {
        let mut writer = Cursor::new(Vec::new());
        let value: Option<u32> = None;
        value.mch_write(&mut writer).unwrap();

        assert!(writer.into_inner().is_empty());
        assert_eq!(0, value.size_in_bytes());
    }

    #[test]
    fn vec_size_sums_elements() {
        let value = vec![Some(1u16), None, Some(3u16)];
        assert_eq!(4, value.size_in_bytes());
    }
}
