//! In-place pixel transforms:
//! planar configuration and pixel representation toggles,
//! palette color expansion,
//! and YBR family color space conversions.
//!
//! Multi-byte samples are taken in the machine's byte order,
//! matching the frame buffers produced by the pixel data stores.

use snafu::ensure;

use crate::palette::PaletteColorLut;
use crate::{
    BufferSizeMismatchSnafu, InvalidBitDepthSnafu, Result, UnsupportedBitsAllocatedSnafu,
};

/// Toggle 8-bit samples between color-by-pixel and color-by-plane
/// layouts.
///
/// `number_of_values` is the total sample count to reorder
/// and `old_planar_configuration` describes the current layout:
/// non-zero for color-by-plane.
/// Only 8-bit samples are supported,
/// multi-byte planar data is rare enough to not warrant the swap.
pub fn toggle_planar_configuration(
    data: &mut [u8],
    number_of_values: usize,
    bits_allocated: u16,
    samples_per_pixel: u16,
    old_planar_configuration: u16,
) -> Result<()> {
    ensure!(
        bits_allocated == 8,
        UnsupportedBitsAllocatedSnafu { bits_allocated }
    );
    ensure!(
        data.len() >= number_of_values,
        BufferSizeMismatchSnafu {
            expected: number_of_values,
            actual: data.len(),
        }
    );

    let samples = samples_per_pixel as usize;
    let pixels = number_of_values / samples;
    let source = data[..number_of_values].to_vec();
    for n in 0..pixels {
        for s in 0..samples {
            if old_planar_configuration != 0 {
                data[n * samples + s] = source[n + pixels * s];
            } else {
                data[n + pixels * s] = source[n * samples + s];
            }
        }
    }
    Ok(())
}

/// Toggle samples between their signed and unsigned representations,
/// in place.
///
/// Each sample is sign-extended from `bits_stored` bits
/// to the full width of its container (8 or 16 bits)
/// and rebiased by half the stored value range,
/// which maps the signed range onto the unsigned one and back.
pub fn toggle_pixel_representation(
    data: &mut [u8],
    bits_stored: u16,
    bits_allocated: u16,
) -> Result<()> {
    ensure!(
        bits_allocated <= 16 && bits_stored > 0 && bits_stored <= bits_allocated,
        InvalidBitDepthSnafu {
            bits_allocated,
            bits_stored,
        }
    );

    let bias = 1_i32 << (bits_stored - 1);
    if bits_allocated <= 8 {
        let shift = 8 - bits_stored as u32;
        for byte in data.iter_mut() {
            let value = (((*byte << shift) as i8) >> shift) as i32;
            *byte = (value + bias) as u8;
        }
    } else {
        let shift = 16 - bits_stored as u32;
        for chunk in data.chunks_exact_mut(2) {
            let raw = u16::from_ne_bytes([chunk[0], chunk[1]]);
            let value = (((raw << shift) as i16) >> shift) as i32;
            chunk.copy_from_slice(&((value + bias) as u16).to_ne_bytes());
        }
    }
    Ok(())
}

/// Expand PALETTE COLOR samples into interleaved 8-bit RGB triplets.
///
/// `source` holds one frame of stored sample values in local byte order
/// and `target` must hold exactly three bytes per pixel.
pub fn palette_color_to_rgb(
    bits_allocated: u16,
    is_signed: bool,
    source: &[u8],
    target: &mut [u8],
    lut: &PaletteColorLut,
) -> Result<()> {
    ensure!(
        bits_allocated == 8 || bits_allocated == 16,
        UnsupportedBitsAllocatedSnafu { bits_allocated }
    );

    let bytes = bits_allocated as usize / 8;
    let pixels = source.len() / bytes;
    ensure!(
        target.len() == pixels * 3,
        BufferSizeMismatchSnafu {
            expected: pixels * 3,
            actual: target.len(),
        }
    );

    if bytes == 1 {
        for (sample, out) in source.iter().zip(target.chunks_exact_mut(3)) {
            let value = if is_signed {
                i32::from(*sample as i8)
            } else {
                i32::from(*sample)
            };
            out.copy_from_slice(&lut.get(value));
        }
    } else {
        for (sample, out) in source.chunks_exact(2).zip(target.chunks_exact_mut(3)) {
            let raw = u16::from_ne_bytes([sample[0], sample[1]]);
            let value = if is_signed {
                i32::from(raw as i16)
            } else {
                i32::from(raw)
            };
            out.copy_from_slice(&lut.get(value));
        }
    }
    Ok(())
}

#[inline]
fn clamp_channel(value: i32) -> u32 {
    value.clamp(0, 255) as u32
}

#[inline]
fn argb(red: i32, green: i32, blue: i32) -> u32 {
    0xFF00_0000 | (clamp_channel(red) << 16) | (clamp_channel(green) << 8) | clamp_channel(blue)
}

/// Convert one YBR_FULL pixel to an ARGB value with an opaque alpha.
pub fn ybr_full_to_rgb(y: i32, cb: i32, cr: i32) -> u32 {
    let y = y as f64;
    let cb = (cb - 128) as f64;
    let cr = (cr - 128) as f64;
    argb(
        (y + 1.402 * cr).round() as i32,
        (y - 0.344_136 * cb - 0.714_136 * cr).round() as i32,
        (y + 1.772 * cb).round() as i32,
    )
}

/// Convert one YBR_FULL_422 pixel to an ARGB value.
///
/// Once the chroma samples have been replicated over the pixel pairs,
/// the conversion is the same as for YBR_FULL.
pub fn ybr_full_422_to_rgb(y: i32, cb: i32, cr: i32) -> u32 {
    ybr_full_to_rgb(y, cb, cr)
}

/// Convert one YBR_PARTIAL_422 pixel to an ARGB value
/// (luminance limited to the 16..=235 range).
pub fn ybr_partial_422_to_rgb(y: i32, cb: i32, cr: i32) -> u32 {
    let y = 1.1644 * (y - 16) as f64;
    let cb = (cb - 128) as f64;
    let cr = (cr - 128) as f64;
    argb(
        (y + 1.596 * cr).round() as i32,
        (y - 0.3917 * cb - 0.813 * cr).round() as i32,
        (y + 2.0172 * cb).round() as i32,
    )
}

/// Convert one pixel from the JPEG 2000 irreversible color transform
/// to an ARGB value. Chroma samples are already signed.
pub fn ybr_ict_to_rgb(y: i32, cb: i32, cr: i32) -> u32 {
    let y = y as f64;
    let cb = cb as f64;
    let cr = cr as f64;
    argb(
        (y + 1.402 * cr).round() as i32,
        (y - 0.344_136 * cb - 0.714_136 * cr).round() as i32,
        (y + 1.772 * cb).round() as i32,
    )
}

/// Convert one pixel from the JPEG 2000 reversible color transform
/// to an ARGB value. Chroma samples are already signed.
pub fn ybr_rct_to_rgb(y: i32, cb: i32, cr: i32) -> u32 {
    let green = y - ((cb + cr) >> 2);
    let red = cr + green;
    let blue = cb + green;
    argb(red, green, blue)
}
