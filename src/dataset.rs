//! The attribute dataset seam.
//!
//! The pixel data stores do not own a DICOM object model.
//! Instead, they read from and write into any tag-indexed
//! attribute collection through the [`AttributeSource`] and
//! [`AttributeSink`] traits,
//! and [`DicomMessage`] adds the transfer syntax of the enclosing
//! message or file.
//!
//! [`InMemDataset`] and [`InMemMessage`] are minimal in-memory
//! implementations, suitable for tests and for embedding the stores
//! without a full dataset layer.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use crate::fragment::{FileReference, FragmentSequence};
use crate::tags::Tag;
use crate::transfer_syntax::TransferSyntax;

/// A native pixel data payload:
/// bytes resident in memory or a span left behind in the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelPayload {
    /// The payload bytes are held in memory, already in local byte order.
    Resident(Vec<u8>),
    /// The payload bytes are left in the source file,
    /// in the byte order declared by the reference.
    Referenced(FileReference),
}

/// The value of a pixel data element.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelDataValue {
    /// Native (flat) pixel data.
    Native(PixelPayload),
    /// Encapsulated pixel data as a fragment sequence.
    Encapsulated(FragmentSequence),
}

/// Read access to a tag-indexed attribute collection.
///
/// All getters return `None` when the element is absent
/// or its value cannot be read as the requested type.
/// `contains` reports presence of a non-empty element,
/// which is also how sequence attributes
/// (such as _Modality LUT Sequence_) are probed.
pub trait AttributeSource {
    /// Whether the collection holds a non-empty element at `tag`.
    fn contains(&self, tag: Tag) -> bool;

    /// The element value as an unsigned 16-bit integer.
    fn uint16(&self, tag: Tag) -> Option<u16>;

    /// The element values as unsigned 16-bit integers.
    fn uint16s(&self, tag: Tag) -> Option<Vec<u16>>;

    /// The element value as a signed 32-bit integer.
    fn int32(&self, tag: Tag) -> Option<i32>;

    /// The element value as a 32-bit float.
    fn float32(&self, tag: Tag) -> Option<f32>;

    /// The element value as a trimmed string.
    fn string(&self, tag: Tag) -> Option<String>;

    /// The element values as trimmed strings,
    /// one per value multiplicity position.
    fn strings(&self, tag: Tag) -> Option<Vec<String>>;

    /// The element's raw byte payload.
    fn bytes(&self, tag: Tag) -> Option<Vec<u8>>;

    /// A snapshot of the pixel data element value, if present.
    fn pixel_data(&self) -> Option<PixelDataValue>;
}

/// Write access to a tag-indexed attribute collection.
pub trait AttributeSink {
    /// Set the element at `tag` to an unsigned 16-bit integer.
    fn put_uint16(&mut self, tag: Tag, value: u16);

    /// Set the element at `tag` to a signed 32-bit integer.
    fn put_int32(&mut self, tag: Tag, value: i32);

    /// Set the element at `tag` to a 32-bit float.
    fn put_float32(&mut self, tag: Tag, value: f32);

    /// Set the element at `tag` to a string value.
    fn put_string(&mut self, tag: Tag, value: &str);

    /// Set the element at `tag` to a multi-valued string.
    fn put_strings(&mut self, tag: Tag, values: &[String]);

    /// Replace the pixel data element.
    fn put_pixel_data(&mut self, value: PixelDataValue);

    /// Remove the element at `tag`, if present.
    fn remove(&mut self, tag: Tag);
}

/// A readable and writable attribute collection.
pub trait Dataset: AttributeSource + AttributeSink {}

impl<T> Dataset for T where T: AttributeSource + AttributeSink {}

/// A message-like object: an attribute collection
/// together with the transfer syntax it is encoded in.
pub trait DicomMessage: Dataset {
    /// The transfer syntax of the message.
    fn transfer_syntax(&self) -> TransferSyntax;

    /// Replace the transfer syntax of the message.
    fn set_transfer_syntax(&mut self, transfer_syntax: TransferSyntax);
}

/// An attribute value held by [`InMemDataset`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// An unsigned 16-bit integer element, possibly multi-valued.
    U16(Vec<u16>),
    /// A signed 32-bit integer element.
    I32(i32),
    /// A 32-bit float element.
    F32(f32),
    /// A string element, possibly multi-valued.
    Str(Vec<String>),
    /// A raw binary element.
    Bytes(Vec<u8>),
    /// A sequence element carrying the given number of items.
    Sequence { items: usize },
    /// The pixel data element.
    PixelData(PixelDataValue),
}

/// A minimal in-memory attribute collection.
#[derive(Debug, Clone, Default)]
pub struct InMemDataset {
    entries: BTreeMap<Tag, AttributeValue>,
}

impl InMemDataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        InMemDataset::default()
    }

    /// Set the element at `tag` to the given value.
    pub fn put(&mut self, tag: Tag, value: AttributeValue) {
        self.entries.insert(tag, value);
    }

    /// Get the element value at `tag`.
    pub fn get(&self, tag: Tag) -> Option<&AttributeValue> {
        self.entries.get(&tag)
    }
}

impl AttributeSource for InMemDataset {
    fn contains(&self, tag: Tag) -> bool {
        match self.entries.get(&tag) {
            None => false,
            Some(AttributeValue::U16(values)) => !values.is_empty(),
            Some(AttributeValue::Str(values)) => {
                values.iter().any(|value| !value.trim().is_empty())
            }
            Some(AttributeValue::Bytes(data)) => !data.is_empty(),
            Some(AttributeValue::Sequence { items }) => *items > 0,
            Some(_) => true,
        }
    }

    fn uint16(&self, tag: Tag) -> Option<u16> {
        match self.entries.get(&tag)? {
            AttributeValue::U16(values) => values.first().copied(),
            AttributeValue::I32(value) => u16::try_from(*value).ok(),
            AttributeValue::Str(values) => values.first()?.trim().parse().ok(),
            _ => None,
        }
    }

    fn uint16s(&self, tag: Tag) -> Option<Vec<u16>> {
        match self.entries.get(&tag)? {
            AttributeValue::U16(values) => Some(values.clone()),
            _ => None,
        }
    }

    fn int32(&self, tag: Tag) -> Option<i32> {
        match self.entries.get(&tag)? {
            AttributeValue::I32(value) => Some(*value),
            AttributeValue::U16(values) => values.first().map(|v| i32::from(*v)),
            AttributeValue::Str(values) => values.first()?.trim().parse().ok(),
            _ => None,
        }
    }

    fn float32(&self, tag: Tag) -> Option<f32> {
        match self.entries.get(&tag)? {
            AttributeValue::F32(value) => Some(*value),
            AttributeValue::I32(value) => Some(*value as f32),
            AttributeValue::Str(values) => values.first()?.trim().parse().ok(),
            _ => None,
        }
    }

    fn string(&self, tag: Tag) -> Option<String> {
        self.strings(tag)?.into_iter().next()
    }

    fn strings(&self, tag: Tag) -> Option<Vec<String>> {
        match self.entries.get(&tag)? {
            AttributeValue::Str(values) => {
                Some(values.iter().map(|value| value.trim().to_string()).collect())
            }
            AttributeValue::I32(value) => Some(vec![value.to_string()]),
            AttributeValue::F32(value) => Some(vec![value.to_string()]),
            AttributeValue::U16(values) => {
                Some(values.iter().map(|value| value.to_string()).collect())
            }
            _ => None,
        }
    }

    fn bytes(&self, tag: Tag) -> Option<Vec<u8>> {
        match self.entries.get(&tag)? {
            AttributeValue::Bytes(data) => Some(data.clone()),
            _ => None,
        }
    }

    fn pixel_data(&self) -> Option<PixelDataValue> {
        match self.entries.get(&crate::tags::PIXEL_DATA)? {
            AttributeValue::PixelData(value) => Some(value.clone()),
            AttributeValue::Bytes(data) => {
                Some(PixelDataValue::Native(PixelPayload::Resident(data.clone())))
            }
            _ => None,
        }
    }
}

impl AttributeSink for InMemDataset {
    fn put_uint16(&mut self, tag: Tag, value: u16) {
        self.entries.insert(tag, AttributeValue::U16(vec![value]));
    }

    fn put_int32(&mut self, tag: Tag, value: i32) {
        self.entries.insert(tag, AttributeValue::I32(value));
    }

    fn put_float32(&mut self, tag: Tag, value: f32) {
        self.entries.insert(tag, AttributeValue::F32(value));
    }

    fn put_string(&mut self, tag: Tag, value: &str) {
        self.entries
            .insert(tag, AttributeValue::Str(vec![value.to_string()]));
    }

    fn put_strings(&mut self, tag: Tag, values: &[String]) {
        self.entries
            .insert(tag, AttributeValue::Str(values.to_vec()));
    }

    fn put_pixel_data(&mut self, value: PixelDataValue) {
        self.entries
            .insert(crate::tags::PIXEL_DATA, AttributeValue::PixelData(value));
    }

    fn remove(&mut self, tag: Tag) {
        self.entries.remove(&tag);
    }
}

/// A minimal in-memory message:
/// an [`InMemDataset`] with a transfer syntax.
#[derive(Debug, Clone)]
pub struct InMemMessage {
    dataset: InMemDataset,
    transfer_syntax: TransferSyntax,
}

impl InMemMessage {
    /// Create a message with an empty dataset.
    pub fn new(transfer_syntax: TransferSyntax) -> Self {
        InMemMessage {
            dataset: InMemDataset::new(),
            transfer_syntax,
        }
    }

    /// Create a message around an existing dataset.
    pub fn with_dataset(transfer_syntax: TransferSyntax, dataset: InMemDataset) -> Self {
        InMemMessage {
            dataset,
            transfer_syntax,
        }
    }

    /// The dataset of this message.
    pub fn dataset(&self) -> &InMemDataset {
        &self.dataset
    }

    /// Mutable access to the dataset of this message.
    pub fn dataset_mut(&mut self) -> &mut InMemDataset {
        &mut self.dataset
    }
}

impl AttributeSource for InMemMessage {
    fn contains(&self, tag: Tag) -> bool {
        self.dataset.contains(tag)
    }
    fn uint16(&self, tag: Tag) -> Option<u16> {
        self.dataset.uint16(tag)
    }
    fn uint16s(&self, tag: Tag) -> Option<Vec<u16>> {
        self.dataset.uint16s(tag)
    }
    fn int32(&self, tag: Tag) -> Option<i32> {
        self.dataset.int32(tag)
    }
    fn float32(&self, tag: Tag) -> Option<f32> {
        self.dataset.float32(tag)
    }
    fn string(&self, tag: Tag) -> Option<String> {
        self.dataset.string(tag)
    }
    fn strings(&self, tag: Tag) -> Option<Vec<String>> {
        self.dataset.strings(tag)
    }
    fn bytes(&self, tag: Tag) -> Option<Vec<u8>> {
        self.dataset.bytes(tag)
    }
    fn pixel_data(&self) -> Option<PixelDataValue> {
        self.dataset.pixel_data()
    }
}

impl AttributeSink for InMemMessage {
    fn put_uint16(&mut self, tag: Tag, value: u16) {
        self.dataset.put_uint16(tag, value)
    }
    fn put_int32(&mut self, tag: Tag, value: i32) {
        self.dataset.put_int32(tag, value)
    }
    fn put_float32(&mut self, tag: Tag, value: f32) {
        self.dataset.put_float32(tag, value)
    }
    fn put_string(&mut self, tag: Tag, value: &str) {
        self.dataset.put_string(tag, value)
    }
    fn put_strings(&mut self, tag: Tag, values: &[String]) {
        self.dataset.put_strings(tag, values)
    }
    fn put_pixel_data(&mut self, value: PixelDataValue) {
        self.dataset.put_pixel_data(value)
    }
    fn remove(&mut self, tag: Tag) {
        self.dataset.remove(tag)
    }
}

impl DicomMessage for InMemMessage {
    fn transfer_syntax(&self) -> TransferSyntax {
        self.transfer_syntax
    }

    fn set_transfer_syntax(&mut self, transfer_syntax: TransferSyntax) {
        self.transfer_syntax = transfer_syntax;
    }
}
