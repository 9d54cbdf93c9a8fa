//! Data element tags used by the pixel data module.

use std::fmt;

/// A DICOM data element tag,
/// as a group number and element number pair.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Tag(pub u16, pub u16);

impl Tag {
    /// Getter for the tag's group value.
    #[inline]
    pub fn group(self) -> u16 {
        self.0
    }

    /// Getter for the tag's element value.
    #[inline]
    pub fn element(self) -> u16 {
        self.1
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

/// SOP Class UID
pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
/// Derivation Description
pub const DERIVATION_DESCRIPTION: Tag = Tag(0x0008, 0x2111);
/// Samples Per Pixel
pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
/// Photometric Interpretation
pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
/// Planar Configuration
pub const PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
/// Number Of Frames
pub const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
/// Rows
pub const ROWS: Tag = Tag(0x0028, 0x0010);
/// Columns
pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
/// Bits Allocated
pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
/// Bits Stored
pub const BITS_STORED: Tag = Tag(0x0028, 0x0101);
/// High Bit
pub const HIGH_BIT: Tag = Tag(0x0028, 0x0102);
/// Pixel Representation
pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
/// Window Center
pub const WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
/// Window Width
pub const WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);
/// Rescale Intercept
pub const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
/// Rescale Slope
pub const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
/// Red Palette Color Lookup Table Descriptor
pub const RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR: Tag = Tag(0x0028, 0x1101);
/// Green Palette Color Lookup Table Descriptor
pub const GREEN_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR: Tag = Tag(0x0028, 0x1102);
/// Blue Palette Color Lookup Table Descriptor
pub const BLUE_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR: Tag = Tag(0x0028, 0x1103);
/// Red Palette Color Lookup Table Data
pub const RED_PALETTE_COLOR_LOOKUP_TABLE_DATA: Tag = Tag(0x0028, 0x1201);
/// Green Palette Color Lookup Table Data
pub const GREEN_PALETTE_COLOR_LOOKUP_TABLE_DATA: Tag = Tag(0x0028, 0x1202);
/// Blue Palette Color Lookup Table Data
pub const BLUE_PALETTE_COLOR_LOOKUP_TABLE_DATA: Tag = Tag(0x0028, 0x1203);
/// Lossy Image Compression
pub const LOSSY_IMAGE_COMPRESSION: Tag = Tag(0x0028, 0x2110);
/// Lossy Image Compression Ratio
pub const LOSSY_IMAGE_COMPRESSION_RATIO: Tag = Tag(0x0028, 0x2112);
/// Lossy Image Compression Method
pub const LOSSY_IMAGE_COMPRESSION_METHOD: Tag = Tag(0x0028, 0x2114);
/// Modality LUT Sequence
pub const MODALITY_LUT_SEQUENCE: Tag = Tag(0x0028, 0x3000);
/// VOI LUT Sequence
pub const VOI_LUT_SEQUENCE: Tag = Tag(0x0028, 0x3010);
/// Pixel Data
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_display() {
        assert_eq!(PIXEL_DATA.to_string(), "(7FE0,0010)");
        assert_eq!(PHOTOMETRIC_INTERPRETATION.to_string(), "(0028,0004)");
    }
}
