//! The [One] format stores the animations for all characters loaded by a field.
//! These files typically use the name "chara.one".
//!
//! The file starts with a directory of [OneEntry] followed by the data for each character.
//! Non playable characters also store their TIM textures and an embedded model before the animations.
//! The animations use the same layout as the [AnimationBlock] in [Mch](crate::formats::mch::Mch) files.
use binread::{
    io::{Cursor, Read, Seek, SeekFrom},
    BinRead, BinReaderExt, BinResult, ReadOptions,
};
use mch_write::MchWrite;
use std::convert::TryFrom;
use std::io::Write;

use crate::formats::anim::AnimationBlock;
use crate::formats::mch::MchHeader;
use crate::{read_until, CountWidth, OffsetList};

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

/// Entries with [flags](struct.OneEntry.html#structfield.flags) at or below this value have textures and a model.
pub const TEXTURE_FLAG_THRESHOLD: u32 = 0xD0000000;

/// The location and name of a character's data.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, MchWrite, Clone, PartialEq, Eq)]
pub struct OneEntry {
    /// The absolute position of the character data minus 4.
    pub address: u32,
    /// The size in bytes of the character data.
    pub size: u32,
    pub size_copy: u32,
    pub flags: u32,
    #[br(if(flags <= TEXTURE_FLAG_THRESHOLD))]
    pub texture_offsets: Option<OffsetList>,
    /// The offset of the embedded model relative to the character data.
    /// This is `0` for characters without textures.
    pub model_offset: u32,
    pub name: [u8; 4],
    pub end_code: [u8; 8],
}

impl OneEntry {
    /// The character name like "d000".
    /// Names are ASCII in practice.
    pub fn name(&self) -> String {
        self.name.iter().map(|b| char::from(*b)).collect()
    }

    pub fn has_model(&self) -> bool {
        self.flags <= TEXTURE_FLAG_THRESHOLD
    }

    /// The absolute position of the character data.
    pub fn data_start(&self) -> u64 {
        self.address as u64 + 4
    }
}

/// The data for a single character.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct OneCharacter {
    /// The textures and embedded model data before the animations.
    /// This is empty for characters without a model.
    pub model_data: Vec<u8>,
    pub animations: AnimationBlock,
    /// The bytes after the animations included in the entry's size.
    pub trailer: Vec<u8>,
    /// The bytes after the entry's size and before the next character.
    pub padding: Vec<u8>,
}

impl OneCharacter {
    /// Reads the header for the model embedded in [model_data](#structfield.model_data).
    pub fn model_header(&self, entry: &OneEntry) -> BinResult<Option<MchHeader>> {
        if !entry.has_model() {
            return Ok(None);
        }

        let mut reader = Cursor::new(&self.model_data);
        reader.seek(SeekFrom::Start(entry.model_offset as u64))?;
        reader.read_le::<MchHeader>().map(Some)
    }

    /// The size stored in the character's [OneEntry].
    /// This does not include the [padding](#structfield.padding).
    pub fn data_size(&self) -> u64 {
        self.model_data.len() as u64 + self.animations.size_in_bytes() + self.trailer.len() as u64
    }
}

impl MchWrite for OneCharacter {
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.model_data.mch_write(writer)?;
        self.animations.mch_write(writer)?;
        self.trailer.mch_write(writer)?;
        self.padding.mch_write(writer)?;
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        self.data_size() + self.padding.len() as u64
    }
}

/// A field animation archive.
///
/// The [entries](#structfield.entries) and [characters](#structfield.characters) have the same length.
/// Character positions and sizes are recalculated when writing,
/// so animations can be edited without updating the entries.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct One {
    pub entries: Vec<OneEntry>,
    /// The bytes between the entries and the first character.
    pub directory_padding: Vec<u8>,
    pub characters: Vec<OneCharacter>,
}

impl One {
    /// Finds the character with the given name like "d000".
    pub fn character(&self, name: &str) -> Option<(&OneEntry, &OneCharacter)> {
        self.entries
            .iter()
            .zip(self.characters.iter())
            .find(|(entry, _)| entry.name() == name)
    }

    /// Calculates the entries with positions and sizes matching the current character data.
    pub fn updated_entries(&self) -> std::io::Result<Vec<OneEntry>> {
        if self.entries.len() != self.characters.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Entry count {} does not match character count {}.",
                    self.entries.len(),
                    self.characters.len()
                ),
            ));
        }

        let to_u32 = |value: u64| {
            u32::try_from(value).map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Value {:#x} does not fit in 32 bits.", value),
                )
            })
        };

        let mut pos = 4 + self.entries.size_in_bytes() + self.directory_padding.len() as u64;

        let mut entries = self.entries.clone();
        for (entry, character) in entries.iter_mut().zip(self.characters.iter()) {
            let size = to_u32(character.data_size())?;
            entry.address = to_u32(pos - 4)?;
            entry.size = size;
            entry.size_copy = size;
            pos += character.size_in_bytes();
        }
        Ok(entries)
    }
}

impl BinRead for One {
    type Args = (CountWidth,);

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        options: &ReadOptions,
        args: Self::Args,
    ) -> BinResult<Self> {
        let (count_width,) = args;

        let count = u32::read_options(reader, options, ())?;
        let mut entries = Vec::new();
        for _ in 0..count {
            entries.push(OneEntry::read_options(reader, options, ())?);
        }

        let directory_end = reader.seek(SeekFrom::Current(0))?;
        let file_end = reader.seek(SeekFrom::End(0))?;

        let starts: Vec<_> = entries.iter().map(OneEntry::data_start).collect();

        let first_start = starts.iter().copied().min().unwrap_or(file_end);
        reader.seek(SeekFrom::Start(directory_end))?;
        let directory_padding = read_until(reader, options, (first_start,))?;

        let mut characters = Vec::new();
        for (entry, start) in entries.iter().zip(starts.iter().copied()) {
            // Each character ends where the next character in the file starts.
            let next_start = starts
                .iter()
                .copied()
                .filter(|s| *s > start)
                .min()
                .unwrap_or(file_end);

            let anim_start = if entry.has_model() {
                let model_start = start + entry.model_offset as u64;
                reader.seek(SeekFrom::Start(model_start))?;
                let header = MchHeader::read_options(reader, options, ())?;
                model_start + header.anim_offset as u64
            } else {
                start
            };

            reader.seek(SeekFrom::Start(start))?;
            let model_data = read_until(reader, options, (anim_start,))?;

            let animations = AnimationBlock::read_options(reader, options, (count_width,))?;
            let anim_end = reader.seek(SeekFrom::Current(0))?;

            let region_end = next_start.max(anim_end);
            let size_end = (start + entry.size as u64).max(anim_end).min(region_end);

            let trailer = read_until(reader, options, (size_end,))?;
            let padding = read_until(reader, options, (region_end,))?;

            characters.push(OneCharacter {
                model_data,
                animations,
                trailer,
                padding,
            });
        }

        Ok(Self {
            entries,
            directory_padding,
            characters,
        })
    }
}

impl MchWrite for One {
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        let entries = self.updated_entries()?;

        (entries.len() as u32).mch_write(writer)?;
        entries.mch_write(writer)?;
        self.directory_padding.mch_write(writer)?;
        self.characters.mch_write(writer)?;
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        4 + self.entries.size_in_bytes()
            + self.directory_padding.len() as u64
            + self.characters.size_in_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_hex_eq;
    use hexlit::hex;
    use crate::formats::anim::{Animation, Frame, PackedRotation};
    use pretty_assertions::assert_eq;

    fn main_character_entry(name: &[u8; 4]) -> OneEntry {
        OneEntry {
            address: 0,
            size: 0,
            size_copy: 0,
            flags: 0xE0000000,
            texture_offsets: None,
            model_offset: 0,
            name: *name,
            end_code: [0xEE; 8],
        }
    }

    fn single_frame_block(root_offset: [i16; 3]) -> AnimationBlock {
        AnimationBlock {
            count_width: CountWidth::U16,
            animations: vec![Animation {
                frame_count: 1,
                bone_count: 1,
                frames: vec![Frame {
                    root_offset,
                    rotations: vec![PackedRotation::from_bytes([1, 2, 3, 0])],
                }],
            }],
        }
    }

    fn test_one() -> One {
        // An embedded model header with the animations right after the header.
        let mut npc_header = Vec::new();
        MchHeader {
            anim_offset: 0x40,
            unk2_offset: 0x01800140,
            ..Default::default()
        }
        .mch_write(&mut Cursor::new(&mut npc_header))
        .unwrap();

        let mut npc_model_data = vec![0x77; 8];
        npc_model_data.extend_from_slice(&npc_header);

        One {
            entries: vec![
                main_character_entry(b"d000"),
                OneEntry {
                    address: 0,
                    size: 0,
                    size_copy: 0,
                    flags: 0,
                    texture_offsets: Some(OffsetList(vec![0])),
                    model_offset: 8,
                    name: *b"n001",
                    end_code: [0xEE; 8],
                },
            ],
            directory_padding: vec![0; 4],
            characters: vec![
                OneCharacter {
                    model_data: Vec::new(),
                    animations: single_frame_block([1, 2, 3]),
                    trailer: vec![0xAB; 2],
                    padding: vec![0; 3],
                },
                OneCharacter {
                    model_data: npc_model_data,
                    animations: single_frame_block([-1, -2, -3]),
                    trailer: Vec::new(),
                    padding: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn write_updates_addresses_and_sizes() {
        let one = test_one();
        let entries = one.updated_entries().unwrap();

        // count + 28 byte entry + 40 byte entry + 4 bytes padding
        let first_start = 4 + 28 + 40 + 4;
        assert_eq!(first_start - 4, entries[0].address);
        assert_eq!(2 + 4 + 10 + 2, entries[0].size);
        assert_eq!(entries[0].size, entries[0].size_copy);

        let second_start = first_start + 2 + 4 + 10 + 2 + 3;
        assert_eq!(second_start - 4, entries[1].address);
        assert_eq!(8 + 0x40 + 2 + 4 + 10, entries[1].size);
    }

    #[test]
    fn write_read_one() {
        let one = test_one();

        let mut writer = Cursor::new(Vec::new());
        one.write(&mut writer).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(bytes.len() as u64, one.size_in_bytes());
        assert_hex_eq!(&bytes[..4], &[2, 0, 0, 0]);

        let mut reader = Cursor::new(&bytes);
        let value = One::read(&mut reader).unwrap();

        // Reading uses the recalculated entries.
        let mut expected = one.clone();
        expected.entries = one.updated_entries().unwrap();
        assert_eq!(expected, value);

        let mut writer = Cursor::new(Vec::new());
        value.write(&mut writer).unwrap();
        assert_hex_eq!(&bytes, writer.get_ref());
    }

    #[test]
    fn find_character_by_name() {
        let one = test_one();

        let (entry, character) = one.character("d000").unwrap();
        assert_eq!("d000", entry.name());
        assert!(character.model_header(entry).unwrap().is_none());

        let (entry, character) = one.character("n001").unwrap();
        assert_eq!(
            0x40,
            character.model_header(entry).unwrap().unwrap().anim_offset
        );

        assert!(one.character("d001").is_none());
    }

    #[test]
    fn read_entry_without_textures() {
        let mut reader = Cursor::new(hexlit::hex!(
            "FC010000 10000000 10000000 000000E0 00000000 64303030 EEEEEEEE EEEEEEEE"
        ));
        let entry = reader.read_le::<OneEntry>().unwrap();

        assert_eq!(0x200, entry.data_start());
        assert_eq!(None, entry.texture_offsets);
        assert_eq!("d000", entry.name());
        assert!(!entry.has_model());
    }

    #[test]
    fn read_entry_with_textures() {
        let mut reader = Cursor::new(hexlit::hex!(
            "FC010000 10000000 10000000 00000000 00000000 00400000 FFFFFFFF 00500000 6E303031 EEEEEEEE EEEEEEEE"
        ));
        let entry = reader.read_le::<OneEntry>().unwrap();

        assert_eq!(Some(OffsetList(vec![0, 0x4000])), entry.texture_offsets);
        assert_eq!(0x5000, entry.model_offset);
        assert_eq!("n001", entry.name());
        assert!(entry.has_model());
    }

    #[test]
    fn read_character_past_declared_size() {
        let mut one = test_one();
        one.characters[0].trailer.clear();
        one.characters[0].padding = vec![0x11; 5];

        let mut writer = Cursor::new(Vec::new());
        one.write(&mut writer).unwrap();

        let value = One::read(&mut Cursor::new(writer.into_inner())).unwrap();
        assert!(value.characters[0].trailer.is_empty());
        assert_eq!(vec![0x11; 5], value.characters[0].padding);
    }
}
