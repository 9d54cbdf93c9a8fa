//! Encapsulated pixel data fragments and the fragment sequence.
//!
//! A [`Fragment`] is one chunk of an encapsulated pixel data stream.
//! Its bytes may be resident in memory or
//! left behind in the source file and loaded on demand.
//! A [`FragmentSequence`] holds the ordered fragments of a pixel data
//! element together with its Basic Offset Table, when one is known.

use byteorder::{ByteOrder, LittleEndian};
use byteordered::Endianness;
use snafu::{ensure, ResultExt};
use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use crate::transfer_syntax::TransferSyntax;
use crate::{InvalidOffsetTableSnafu, OddLengthFragmentSnafu, ReadReferenceSnafu, Result, C};

/// The byte order of the machine running this program.
pub(crate) fn local_endianness() -> Endianness {
    if cfg!(target_endian = "little") {
        Endianness::Little
    } else {
        Endianness::Big
    }
}

/// A reference to a span of pixel data bytes left behind in a file,
/// to be loaded lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    /// The path to the source file.
    pub path: PathBuf,
    /// The byte offset where the span starts.
    pub offset: u64,
    /// The length of the span in bytes.
    pub length: u32,
    /// The byte order in which the values were written.
    pub endianness: Endianness,
    /// The size in bytes of each encoded value
    /// (1 for OB data, 2 for OW data).
    pub unit_size: usize,
}

impl FileReference {
    /// Create a reference to OB data (single byte values, order agnostic).
    pub fn new(path: impl Into<PathBuf>, offset: u64, length: u32) -> Self {
        FileReference {
            path: path.into(),
            offset,
            length,
            endianness: local_endianness(),
            unit_size: 1,
        }
    }

    /// Read `length` bytes starting at `offset + skip` from the source file.
    ///
    /// The file handle is opened per call and closed on return,
    /// never cached.
    pub(crate) fn read_at(&self, skip: i64, length: usize) -> Result<Vec<u8>> {
        let mut file = File::open(&self.path).context(ReadReferenceSnafu {
            path: self.path.clone(),
        })?;
        let position = if skip < 0 {
            self.offset - (-skip) as u64
        } else {
            self.offset + skip as u64
        };
        file.seek(SeekFrom::Start(position))
            .context(ReadReferenceSnafu {
                path: self.path.clone(),
            })?;
        let mut data = vec![0; length];
        file.read_exact(&mut data).context(ReadReferenceSnafu {
            path: self.path.clone(),
        })?;
        Ok(data)
    }

    /// Load the full referenced span.
    pub fn read(&self) -> Result<Vec<u8>> {
        self.read_at(0, self.length as usize)
    }
}

/// One fragment of encapsulated pixel data:
/// either a resident byte buffer
/// or a reference into the source file.
#[derive(Debug, Clone)]
pub enum Fragment {
    /// The fragment bytes are held in memory.
    Resident(Vec<u8>),
    /// The fragment bytes are left in the source file.
    Referenced(FileReference),
}

impl Fragment {
    /// The fragment length in bytes,
    /// known without loading referenced data.
    pub fn len(&self) -> u32 {
        match self {
            Fragment::Resident(data) => data.len() as u32,
            Fragment::Referenced(reference) => reference.length,
        }
    }

    /// Whether the fragment holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Obtain the fragment bytes,
    /// loading them from the source file if the fragment is a reference.
    ///
    /// Fragments are always OB encoded,
    /// so no byte order correction is applied.
    pub fn data(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Fragment::Resident(data) => Ok(Cow::Borrowed(data)),
            Fragment::Referenced(reference) => reference.read().map(Cow::Owned),
        }
    }
}

impl From<Vec<u8>> for Fragment {
    fn from(data: Vec<u8>) -> Self {
        Fragment::Resident(data)
    }
}

impl PartialEq for Fragment {
    /// Byte-for-byte content comparison,
    /// loading referenced data as needed.
    /// Fragments whose bytes cannot be loaded compare as unequal.
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        match (self.data(), other.data()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// The ordered fragments of one encapsulated pixel data element,
/// with its Basic Offset Table when one is present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentSequence {
    offset_table: Option<C<u32>>,
    fragments: Vec<Fragment>,
}

impl FragmentSequence {
    /// Create an empty fragment sequence with no offset table.
    pub fn new() -> Self {
        FragmentSequence::default()
    }

    /// The fragments in encounter order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// The Basic Offset Table entries, if one is present.
    pub fn offset_table(&self) -> Option<&[u32]> {
        self.offset_table.as_deref()
    }

    /// Whether an offset table has been set or built.
    pub fn has_offset_table(&self) -> bool {
        self.offset_table.is_some()
    }

    /// Replace the offset table with the given entries.
    pub fn set_offset_table(&mut self, table: impl IntoIterator<Item = u32>) {
        self.offset_table = Some(table.into_iter().collect());
    }

    /// Replace the offset table by decoding the raw bytes of
    /// a Basic Offset Table item (4-byte little endian unsigned offsets).
    pub fn set_offset_table_data(&mut self, data: &[u8]) -> Result<()> {
        ensure!(
            data.len() % 4 == 0,
            InvalidOffsetTableSnafu { length: data.len() }
        );
        let mut table = vec![0_u32; data.len() / 4];
        LittleEndian::read_u32_into(data, &mut table);
        self.offset_table = Some(table.into_iter().collect());
        Ok(())
    }

    /// Encode the offset table as the byte payload of
    /// a Basic Offset Table item,
    /// or an empty buffer when no table is present.
    pub fn offset_table_data(&self) -> Vec<u8> {
        match &self.offset_table {
            Some(table) => {
                let mut data = vec![0_u8; table.len() * 4];
                LittleEndian::write_u32_into(table, &mut data);
                data
            }
            None => Vec::new(),
        }
    }

    /// Append a fragment without touching the offset table.
    pub fn add_fragment(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    /// Append the compressed data of one whole frame as a new fragment,
    /// extending the offset table with the frame's position.
    ///
    /// The new offset entry is the sum of `8 + length` over all
    /// fragments appended so far,
    /// which is the byte distance from the start of the first item
    /// to the start of the new one.
    /// Odd-length input is a format error,
    /// since DICOM requires even-length fragments.
    pub fn add_frame_fragment(&mut self, data: impl Into<Vec<u8>>) -> Result<()> {
        let data = data.into();
        ensure!(
            data.len() % 2 == 0,
            OddLengthFragmentSnafu { length: data.len() }
        );

        let offset = self
            .fragments
            .iter()
            .map(|fragment| 8 + fragment.len())
            .sum();
        self.offset_table
            .get_or_insert_with(C::new)
            .push(offset);
        self.fragments.push(Fragment::Resident(data));
        Ok(())
    }

    /// Drop all fragments and the offset table.
    pub fn clear(&mut self) {
        self.fragments.clear();
        self.offset_table = None;
    }

    /// The total number of bytes this sequence takes
    /// when written as an encapsulated pixel data element
    /// under the given transfer syntax:
    /// element header, Basic Offset Table item,
    /// and one item per fragment.
    pub fn calculate_write_length(
        &self,
        transfer_syntax: &TransferSyntax,
        include_offset_table: bool,
    ) -> u32 {
        let mut length = 4; // element tag
        if transfer_syntax.is_explicit_vr() {
            length += 2; // vr
            length += 6; // reserved + length
        } else {
            length += 4; // length
        }
        length += 4 + 4; // offset table item header
        if include_offset_table {
            if let Some(table) = &self.offset_table {
                length += table.len() as u32 * 4;
            }
        }
        for fragment in &self.fragments {
            length += 4; // item tag
            length += 4; // item length
            length += fragment.len();
        }
        length
    }
}
