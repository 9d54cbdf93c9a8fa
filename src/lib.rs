//! This crate provides access to the pixel data payload of DICOM objects,
//! in both its native (uncompressed) and encapsulated (compressed,
//! fragmented) encodings.
//!
//! The main entry point is [`PixelStore::create_from`],
//! which inspects the transfer syntax of a message-like object
//! and builds either an [`UncompressedPixelData`] store
//! or a [`CompressedPixelData`] store over a [`FragmentSequence`].
//! Both expose frame-level access through `get_frame`:
//! compressed stores resolve which fragments make up the requested frame
//! and delegate the actual decoding to a [`PixelDataCodec`]
//! registered for the transfer syntax.
//!
//! The attribute dictionary, the network layer, and the compression codecs
//! themselves are external collaborators,
//! reached through the trait seams in [`dataset`] and [`codec`].
//!
//! # Example
//! ```no_run
//! # use std::error::Error;
//! use dicom_pixel_store::{InMemMessage, PixelStore};
//!
//! # fn run(message: InMemMessage) -> Result<(), Box<dyn Error>> {
//! let store = PixelStore::create_from(&message);
//! let frame = store.get_frame(0)?;
//! # let _ = frame;
//! #   Ok(())
//! # }
//! ```

use snafu::Snafu;
use std::path::PathBuf;

pub mod codec;
pub mod compressed;
pub mod dataset;
pub mod descriptor;
pub mod fragment;
pub mod palette;
pub mod tags;
pub mod transfer_syntax;
pub mod transform;
pub mod uncompressed;

pub use crate::codec::{CodecParameters, CodecRegistry, PixelDataCodec};
pub use crate::compressed::CompressedPixelData;
pub use crate::dataset::{
    AttributeSink, AttributeSource, Dataset, DicomMessage, InMemDataset, InMemMessage,
    PixelDataValue, PixelPayload,
};
pub use crate::descriptor::{sop_supports_modality_lut, PixelDescriptor, RescaleValue, VoiWindow};
pub use crate::fragment::{FileReference, Fragment, FragmentSequence};
pub use crate::palette::PaletteColorLut;
pub use crate::tags::Tag;
pub use crate::transfer_syntax::TransferSyntax;
pub use crate::uncompressed::UncompressedPixelData;

/// Re-exported from `smallvec`, as the container type
/// for small value sequences such as fragment offset tables.
pub use smallvec::SmallVec;

/// The type of a sequence of small values.
pub type C<T> = SmallVec<[T; 2]>;

/// The possible error conditions raised by this crate.
///
/// Users are free to handle errors based on their variant,
/// but should not make decisions based on the display message,
/// since that is not considered part of the API
/// and may change on any new release.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The requested frame index is outside the object's frame range.
    #[snafu(display("Frame index {} out of range (object has {} frames)", frame, frames))]
    FrameOutOfRange { frame: u32, frames: u32 },

    /// Encapsulated pixel data fragments must have an even length.
    #[snafu(display("Fragment has an odd length of {} bytes", length))]
    OddLengthFragment { length: usize },

    /// The raw offset table data cannot be split into 4-byte entries.
    #[snafu(display("Offset table data length {} is not a multiple of 4", length))]
    InvalidOffsetTable { length: usize },

    /// The operation is not defined for this sample size.
    #[snafu(display("BitsAllocated {} is not supported for this operation", bits_allocated))]
    UnsupportedBitsAllocated { bits_allocated: u16 },

    /// BitsAllocated/BitsStored describe an unworkable sample layout.
    #[snafu(display(
        "Invalid bit depth (bits allocated {}, bits stored {})",
        bits_allocated,
        bits_stored
    ))]
    InvalidBitDepth { bits_allocated: u16, bits_stored: u16 },

    /// No codec has been registered for the transfer syntax.
    #[snafu(display("No codec registered for transfer syntax {} ({})", name, uid))]
    CodecNotFound { uid: String, name: String },

    /// The fragment lengths do not line up with the declared number of frames.
    #[snafu(display(
        "Unable to determine frame boundaries from the pixel data ({} fragments over {} frames)",
        fragments,
        frames
    ))]
    InconsistentFragmentLayout { fragments: usize, frames: u32 },

    /// Palette color conversion requires a PALETTE COLOR photometric
    /// interpretation.
    #[snafu(display("Photometric interpretation is `{}`, expected PALETTE COLOR", pi))]
    NotPaletteColor { pi: String },

    /// A pixel transform was given a destination of the wrong size.
    #[snafu(display(
        "Destination buffer size {} does not match the expected size {}",
        actual,
        expected
    ))]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// The pixel data payload is shorter than the frame geometry requires.
    #[snafu(display("Pixel data ends prematurely (needed {} bytes, {} available)", needed, available))]
    InsufficientPixelData { needed: usize, available: usize },

    /// A Palette Color LUT attribute is missing from the dataset.
    #[snafu(display("Palette Color LUT is incomplete: missing {}", name))]
    IncompletePalette { name: &'static str },

    /// The red, green and blue palette channels disagree in size.
    #[snafu(display(
        "Palette Color LUT channel sizes do not match the descriptor (descriptor size {}, channel length {})",
        size,
        length
    ))]
    PaletteChannelMismatch { size: usize, length: usize },

    /// Reading bytes from a file-backed pixel data reference failed.
    #[snafu(display("Could not read pixel data reference `{}`", path.display()))]
    ReadReference {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A codec reported a failure,
    /// as a dynamic error value with a message.
    ///
    /// The [`whatever!`](snafu::whatever) macro can be used
    /// to easily create an error of this kind.
    #[snafu(whatever, display("{}", message))]
    Codec {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync + 'static>, Some)))]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A pixel data store of either encoding,
/// as selected from a message's transfer syntax.
#[derive(Debug)]
pub enum PixelStore {
    /// Native (flat) pixel data.
    Uncompressed(UncompressedPixelData),
    /// Encapsulated pixel data, made of compressed fragments.
    Compressed(CompressedPixelData),
}

impl PixelStore {
    /// Create a pixel data store from a message-like object,
    /// choosing the store kind from the transfer syntax'
    /// compression flags.
    pub fn create_from<M>(message: &M) -> Self
    where
        M: DicomMessage,
    {
        let ts = message.transfer_syntax();
        if ts.is_lossy_compressed() || ts.is_lossless_compressed() {
            PixelStore::Compressed(CompressedPixelData::from_message(message))
        } else {
            PixelStore::Uncompressed(UncompressedPixelData::from_message(message))
        }
    }

    /// Create a pixel data store from a dataset snapshot
    /// and the transfer syntax its pixel data is encoded in.
    pub fn create_from_dataset<S>(source: &S, transfer_syntax: TransferSyntax) -> Self
    where
        S: AttributeSource + ?Sized,
    {
        if transfer_syntax.is_lossy_compressed() || transfer_syntax.is_lossless_compressed() {
            let mut store = CompressedPixelData::from_dataset(source);
            store.descriptor_mut().transfer_syntax = transfer_syntax;
            PixelStore::Compressed(store)
        } else {
            let mut store = UncompressedPixelData::from_dataset(source);
            store.descriptor_mut().transfer_syntax = transfer_syntax;
            PixelStore::Uncompressed(store)
        }
    }

    /// The image metadata snapshot backing this store.
    pub fn descriptor(&self) -> &PixelDescriptor {
        match self {
            PixelStore::Uncompressed(pd) => pd.descriptor(),
            PixelStore::Compressed(pd) => pd.descriptor(),
        }
    }

    /// Mutable access to the image metadata snapshot.
    pub fn descriptor_mut(&mut self) -> &mut PixelDescriptor {
        match self {
            PixelStore::Uncompressed(pd) => pd.descriptor_mut(),
            PixelStore::Compressed(pd) => pd.descriptor_mut(),
        }
    }

    /// Fetch a single frame of native pixel data.
    pub fn get_frame(&self, frame: u32) -> Result<Vec<u8>> {
        self.get_frame_with_photometric_interpretation(frame)
            .map(|(data, _)| data)
    }

    /// Fetch a single frame of native pixel data
    /// along with the photometric interpretation of the output.
    ///
    /// For compressed stores the photometric interpretation
    /// is the one reported by the codec,
    /// which may differ from the stored one.
    pub fn get_frame_with_photometric_interpretation(
        &self,
        frame: u32,
    ) -> Result<(Vec<u8>, String)> {
        match self {
            PixelStore::Uncompressed(pd) => pd.get_frame_with_photometric_interpretation(frame),
            PixelStore::Compressed(pd) => pd.get_frame_with_photometric_interpretation(frame),
        }
    }

    /// Write the pixel data payload and the related attributes
    /// back into the given dataset.
    pub fn update_attribute_collection<D>(&mut self, dataset: &mut D)
    where
        D: Dataset,
    {
        match self {
            PixelStore::Uncompressed(pd) => pd.update_attribute_collection(dataset),
            PixelStore::Compressed(pd) => pd.update_attribute_collection(dataset),
        }
    }

    /// Write the pixel data payload, the related attributes,
    /// and the transfer syntax back into the given message.
    pub fn update_message<M>(&mut self, message: &mut M)
    where
        M: DicomMessage,
    {
        match self {
            PixelStore::Uncompressed(pd) => pd.update_message(message),
            PixelStore::Compressed(pd) => pd.update_message(message),
        }
    }
}
