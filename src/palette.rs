//! Palette Color lookup tables.

use crate::dataset::AttributeSource;
use crate::{tags, IncompletePaletteSnafu, PaletteChannelMismatchSnafu, Result};
use snafu::ensure;

/// A Palette Color LUT:
/// maps stored pixel sample values to RGB triplets.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteColorLut {
    first_mapped_pixel_value: i32,
    entries: Vec<[u8; 3]>,
}

impl PaletteColorLut {
    /// Build a LUT from the three channel data buffers and
    /// the values of the shared LUT descriptor.
    ///
    /// 16-bit entries keep only the high byte,
    /// since scaling to 8 bits would drop the low byte anyway.
    /// 8-bit entries may come padded to 16 bits per entry,
    /// in which case the low byte of each pair is taken.
    pub fn new(
        size: usize,
        first_mapped_pixel_value: i32,
        bits_per_entry: u16,
        red: &[u8],
        green: &[u8],
        blue: &[u8],
    ) -> Result<Self> {
        ensure!(
            red.len() == green.len() && red.len() == blue.len(),
            PaletteChannelMismatchSnafu {
                size,
                length: green.len().max(blue.len()),
            }
        );
        ensure!(
            red.len() == size || (red.len() == 2 * size),
            PaletteChannelMismatchSnafu {
                size,
                length: red.len(),
            }
        );

        let (start, step) = if red.len() == 2 * size {
            if bits_per_entry > 8 {
                // 16-bit entries, keep the high byte (little endian data)
                (1, 2)
            } else {
                // 8-bit entries padded into 16-bit slots
                (0, 2)
            }
        } else {
            (0, 1)
        };

        let entries = (0..size)
            .map(|i| {
                let at = start + i * step;
                [red[at], green[at], blue[at]]
            })
            .collect();

        Ok(PaletteColorLut {
            first_mapped_pixel_value,
            entries,
        })
    }

    /// Build a LUT from the Palette Color attributes of a dataset.
    pub fn from_dataset<S>(source: &S) -> Result<Self>
    where
        S: AttributeSource + ?Sized,
    {
        let descriptor = source
            .uint16s(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR)
            .unwrap_or_default();
        let size = *descriptor.first().ok_or_else(|| {
            IncompletePaletteSnafu { name: "LUT size" }.build()
        })?;
        let first_mapped = *descriptor.get(1).ok_or_else(|| {
            IncompletePaletteSnafu {
                name: "first mapped pixel value",
            }
            .build()
        })?;
        let bits_per_entry = *descriptor.get(2).ok_or_else(|| {
            IncompletePaletteSnafu {
                name: "bits per LUT entry",
            }
            .build()
        })?;

        let red = source
            .bytes(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA)
            .ok_or_else(|| {
                IncompletePaletteSnafu {
                    name: "Red Palette Color LUT Data",
                }
                .build()
            })?;
        let green = source
            .bytes(tags::GREEN_PALETTE_COLOR_LOOKUP_TABLE_DATA)
            .ok_or_else(|| {
                IncompletePaletteSnafu {
                    name: "Green Palette Color LUT Data",
                }
                .build()
            })?;
        let blue = source
            .bytes(tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DATA)
            .ok_or_else(|| {
                IncompletePaletteSnafu {
                    name: "Blue Palette Color LUT Data",
                }
                .build()
            })?;

        // a descriptor size of 0 means 2^16 entries
        let size = if size == 0 { 65536 } else { size as usize };

        PaletteColorLut::new(
            size,
            i32::from(first_mapped),
            bits_per_entry,
            &red,
            &green,
            &blue,
        )
    }

    /// The stored value mapped to the first LUT entry.
    pub fn first_mapped_pixel_value(&self) -> i32 {
        self.first_mapped_pixel_value
    }

    /// The number of entries in the LUT.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the LUT holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the RGB triplet for a stored sample value.
    /// Values outside the mapped range clamp to the first or last entry.
    /// An empty LUT maps every value to black.
    pub fn get(&self, value: i32) -> [u8; 3] {
        if self.entries.is_empty() {
            return [0; 3];
        }
        let index = value - self.first_mapped_pixel_value;
        if index <= 0 {
            self.entries[0]
        } else if index as usize >= self.entries.len() {
            self.entries[self.entries.len() - 1]
        } else {
            self.entries[index as usize]
        }
    }
}
