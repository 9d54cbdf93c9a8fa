//! Transfer syntax descriptors.
//!
//! A [`TransferSyntax`] describes the encoding conventions of a DICOM
//! stream as far as this crate needs them:
//! byte order, value representation explicitness,
//! and whether the pixel data is encapsulated
//! with a lossy or lossless compression scheme.
//! The actual codecs live elsewhere and are reached through
//! the [`codec`](crate::codec) registry, keyed by the syntax UID.

use byteordered::Endianness;
use std::fmt;

/// The pixel data compression category of a transfer syntax.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum Compression {
    /// Native pixel data, no encapsulation.
    None,
    /// Encapsulated pixel data under a lossless compression scheme.
    Lossless,
    /// Encapsulated pixel data under a lossy compression scheme.
    Lossy,
}

/// A DICOM transfer syntax specifier.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransferSyntax {
    /// The unique identifier of the transfer syntax.
    uid: &'static str,
    /// The name of the transfer syntax.
    name: &'static str,
    /// The byte order of data.
    byte_order: Endianness,
    /// Whether the transfer syntax mandates an explicit value representation,
    /// or the VR is implicit.
    explicit_vr: bool,
    /// The pixel data compression category.
    compression: Compression,
}

impl TransferSyntax {
    /// Create a new transfer syntax descriptor.
    pub const fn new(
        uid: &'static str,
        name: &'static str,
        byte_order: Endianness,
        explicit_vr: bool,
        compression: Compression,
    ) -> Self {
        TransferSyntax {
            uid,
            name,
            byte_order,
            explicit_vr,
            compression,
        }
    }

    /// Create a new descriptor for an explicit VR little endian syntax.
    pub const fn new_ele(
        uid: &'static str,
        name: &'static str,
        compression: Compression,
    ) -> Self {
        TransferSyntax::new(uid, name, Endianness::Little, true, compression)
    }

    /// Obtain this transfer syntax' unique identifier.
    pub const fn uid(&self) -> &'static str {
        self.uid
    }

    /// Obtain the name of this transfer syntax.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Obtain this transfer syntax' expected endianness.
    pub const fn byte_order(&self) -> Endianness {
        self.byte_order
    }

    /// Whether this transfer syntax mandates an explicit value representation.
    pub const fn is_explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// Whether the pixel data is encapsulated in compressed fragments.
    pub fn is_encapsulated(&self) -> bool {
        self.compression != Compression::None
    }

    /// Whether the pixel data is compressed with a lossy scheme.
    pub fn is_lossy_compressed(&self) -> bool {
        self.compression == Compression::Lossy
    }

    /// Whether the pixel data is compressed with a lossless scheme.
    pub fn is_lossless_compressed(&self) -> bool {
        self.compression == Compression::Lossless
    }
}

impl fmt::Display for TransferSyntax {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Implicit VR Little Endian: Default Transfer Syntax for DICOM
pub const IMPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2",
    "Implicit VR Little Endian",
    Endianness::Little,
    false,
    Compression::None,
);

/// Explicit VR Little Endian
pub const EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new_ele(
    "1.2.840.10008.1.2.1",
    "Explicit VR Little Endian",
    Compression::None,
);

/// Explicit VR Big Endian
pub const EXPLICIT_VR_BIG_ENDIAN: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2.2",
    "Explicit VR Big Endian",
    Endianness::Big,
    true,
    Compression::None,
);

/// JPEG Baseline (Process 1): lossy 8-bit JPEG
pub const JPEG_BASELINE: TransferSyntax = TransferSyntax::new_ele(
    "1.2.840.10008.1.2.4.50",
    "JPEG Baseline (Process 1)",
    Compression::Lossy,
);

/// JPEG Extended (Process 2 & 4): lossy 12-bit JPEG
pub const JPEG_EXTENDED: TransferSyntax = TransferSyntax::new_ele(
    "1.2.840.10008.1.2.4.51",
    "JPEG Extended (Process 2 & 4)",
    Compression::Lossy,
);

/// JPEG Lossless, Non-Hierarchical, First-Order Prediction
/// (Process 14, Selection Value 1)
pub const JPEG_LOSSLESS_NON_HIERARCHICAL_FIRST_ORDER_PREDICTION: TransferSyntax =
    TransferSyntax::new_ele(
        "1.2.840.10008.1.2.4.70",
        "JPEG Lossless, Non-Hierarchical, First-Order Prediction",
        Compression::Lossless,
    );

/// JPEG-LS Lossless Image Compression
pub const JPEG_LS_LOSSLESS: TransferSyntax = TransferSyntax::new_ele(
    "1.2.840.10008.1.2.4.80",
    "JPEG-LS Lossless Image Compression",
    Compression::Lossless,
);

/// JPEG-LS Lossy (Near-Lossless) Image Compression
pub const JPEG_LS_LOSSY: TransferSyntax = TransferSyntax::new_ele(
    "1.2.840.10008.1.2.4.81",
    "JPEG-LS Lossy (Near-Lossless) Image Compression",
    Compression::Lossy,
);

/// JPEG 2000 Image Compression (Lossless Only)
pub const JPEG_2000_LOSSLESS_ONLY: TransferSyntax = TransferSyntax::new_ele(
    "1.2.840.10008.1.2.4.90",
    "JPEG 2000 Image Compression (Lossless Only)",
    Compression::Lossless,
);

/// JPEG 2000 Image Compression
pub const JPEG_2000: TransferSyntax = TransferSyntax::new_ele(
    "1.2.840.10008.1.2.4.91",
    "JPEG 2000 Image Compression",
    Compression::Lossy,
);

/// RLE Lossless
pub const RLE_LOSSLESS: TransferSyntax = TransferSyntax::new_ele(
    "1.2.840.10008.1.2.5",
    "RLE Lossless",
    Compression::Lossless,
);
