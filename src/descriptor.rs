//! The pixel data descriptor:
//! a snapshot of the image geometry, photometric and rescale metadata
//! that both pixel data stores carry and write back to datasets.

use tracing::warn;

use crate::dataset::{AttributeSink, AttributeSource, DicomMessage};
use crate::palette::PaletteColorLut;
use crate::tags;
use crate::transfer_syntax::{self, TransferSyntax};

/// A linear VOI window: a window center and width pair
/// applied when rendering grayscale pixel data.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VoiWindow {
    /// The _Window Center_.
    pub center: f64,
    /// The _Window Width_.
    pub width: f64,
}

/// A modality rescale coefficient
/// kept both as a decimal value and
/// as the string it is exchanged as.
///
/// The two representations are kept in sync:
/// setting the value re-renders the canonical string
/// (10 significant digits),
/// and setting the string re-parses the value.
#[derive(Debug, Clone, PartialEq)]
pub struct RescaleValue {
    value: f64,
    text: String,
}

impl RescaleValue {
    /// The identity slope.
    pub fn slope_default() -> Self {
        RescaleValue {
            value: 1.0,
            text: "1".to_string(),
        }
    }

    /// The identity intercept.
    pub fn intercept_default() -> Self {
        RescaleValue {
            value: 0.0,
            text: "0".to_string(),
        }
    }

    /// The decimal value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The decimal string form.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Set the coefficient from a decimal string.
    ///
    /// If the string does not parse as a decimal number,
    /// the current value and text are retained unchanged.
    pub fn set_text(&mut self, text: &str) {
        if let Ok(value) = text.trim().parse::<f64>() {
            self.value = value;
            self.text = text.to_string();
        }
    }

    /// Set the coefficient from a decimal value,
    /// re-rendering the canonical string form.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
        self.text = canonical_decimal(value);
    }
}

/// Render a decimal value with at most 10 significant digits,
/// without an exponent, trimming trailing fraction zeros.
fn canonical_decimal(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (9 - magnitude).max(0) as usize;
    let mut text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    text
}

/// Storage SOP Classes whose IODs define a modality LUT
/// (rescale slope and intercept).
pub mod sop_class {
    /// Computed Radiography Image Storage
    pub const COMPUTED_RADIOGRAPHY_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.1";
    /// CT Image Storage
    pub const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";
    /// Secondary Capture Image Storage
    pub const SECONDARY_CAPTURE_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.7";
    /// Multi-frame Single Bit Secondary Capture Image Storage
    pub const MULTI_FRAME_SINGLE_BIT_SECONDARY_CAPTURE_IMAGE_STORAGE: &str =
        "1.2.840.10008.5.1.4.1.1.7.1";
    /// Multi-frame Grayscale Byte Secondary Capture Image Storage
    pub const MULTI_FRAME_GRAYSCALE_BYTE_SECONDARY_CAPTURE_IMAGE_STORAGE: &str =
        "1.2.840.10008.5.1.4.1.1.7.2";
    /// Multi-frame Grayscale Word Secondary Capture Image Storage
    pub const MULTI_FRAME_GRAYSCALE_WORD_SECONDARY_CAPTURE_IMAGE_STORAGE: &str =
        "1.2.840.10008.5.1.4.1.1.7.3";
    /// Multi-frame True Color Secondary Capture Image Storage
    pub const MULTI_FRAME_TRUE_COLOR_SECONDARY_CAPTURE_IMAGE_STORAGE: &str =
        "1.2.840.10008.5.1.4.1.1.7.4";
    /// X-Ray Angiographic Image Storage
    pub const XRAY_ANGIOGRAPHIC_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.12.1";
    /// X-Ray Radiofluoroscopic Image Storage
    pub const XRAY_RADIOFLUOROSCOPIC_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.12.2";
    /// X-Ray Angiographic Bi-Plane Image Storage (retired)
    pub const XRAY_ANGIOGRAPHIC_BI_PLANE_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.12.3";
    /// RT Image Storage
    pub const RT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.481.1";
}

/// Whether the given Storage SOP Class supports a modality LUT.
///
/// This is a static allow-list over SOP Class UIDs.
/// PET is deliberately absent:
/// its IOD pins the rescale intercept to 0,
/// so it is not treated as modality LUT capable here.
pub fn sop_supports_modality_lut(sop_class_uid: &str) -> bool {
    matches!(
        sop_class_uid,
        sop_class::CT_IMAGE_STORAGE
            | sop_class::COMPUTED_RADIOGRAPHY_IMAGE_STORAGE
            | sop_class::SECONDARY_CAPTURE_IMAGE_STORAGE
            | sop_class::XRAY_ANGIOGRAPHIC_IMAGE_STORAGE
            | sop_class::XRAY_RADIOFLUOROSCOPIC_IMAGE_STORAGE
            | sop_class::XRAY_ANGIOGRAPHIC_BI_PLANE_IMAGE_STORAGE
            | sop_class::RT_IMAGE_STORAGE
            | sop_class::MULTI_FRAME_GRAYSCALE_BYTE_SECONDARY_CAPTURE_IMAGE_STORAGE
            | sop_class::MULTI_FRAME_GRAYSCALE_WORD_SECONDARY_CAPTURE_IMAGE_STORAGE
            | sop_class::MULTI_FRAME_SINGLE_BIT_SECONDARY_CAPTURE_IMAGE_STORAGE
            | sop_class::MULTI_FRAME_TRUE_COLOR_SECONDARY_CAPTURE_IMAGE_STORAGE
    )
}

/// A snapshot of the pixel data related attributes of an image object.
#[derive(Debug, Clone)]
pub struct PixelDescriptor {
    /// The number of frames in the pixel data.
    pub number_of_frames: u32,
    /// _Columns_: the image width in pixels.
    pub image_width: u16,
    /// _Rows_: the image height in pixels.
    pub image_height: u16,
    /// _High Bit_.
    pub high_bit: u16,
    /// _Bits Stored_.
    pub bits_stored: u16,
    /// _Bits Allocated_.
    pub bits_allocated: u16,
    /// _Samples Per Pixel_.
    pub samples_per_pixel: u16,
    /// _Pixel Representation_: non-zero means signed samples.
    pub pixel_representation: u16,
    /// _Planar Configuration_: non-zero means per-plane sample layout.
    pub planar_configuration: u16,
    /// _Photometric Interpretation_.
    pub photometric_interpretation: String,
    /// _Rescale Slope_.
    pub rescale_slope: RescaleValue,
    /// _Rescale Intercept_.
    pub rescale_intercept: RescaleValue,
    /// The linear VOI windows declared by the object.
    pub voi_windows: Vec<VoiWindow>,
    /// The Palette Color LUT, when the object declares one
    /// and it has not been converted away.
    pub palette: Option<PaletteColorLut>,
    /// _Lossy Image Compression_ ("00"/"01" flag string).
    pub lossy_image_compression: String,
    /// _Lossy Image Compression Ratio_.
    pub lossy_image_compression_ratio: f32,
    /// _Lossy Image Compression Method_.
    pub lossy_image_compression_method: String,
    /// _Derivation Description_.
    pub derivation_description: String,
    /// Whether the source dataset carried a non-empty Modality LUT Sequence.
    pub has_data_modality_lut: bool,
    /// Whether the source dataset carried a non-empty VOI LUT Sequence.
    pub has_data_voi_luts: bool,
    /// The transfer syntax the pixel data is encoded in.
    pub transfer_syntax: TransferSyntax,
    /// The SOP Class UID of the enclosing object.
    pub sop_class_uid: String,
}

impl Default for PixelDescriptor {
    fn default() -> Self {
        PixelDescriptor {
            number_of_frames: 1,
            image_width: 0,
            image_height: 0,
            high_bit: 0,
            bits_stored: 0,
            bits_allocated: 0,
            samples_per_pixel: 1,
            pixel_representation: 0,
            planar_configuration: 0,
            photometric_interpretation: String::new(),
            rescale_slope: RescaleValue::slope_default(),
            rescale_intercept: RescaleValue::intercept_default(),
            voi_windows: Vec::new(),
            palette: None,
            lossy_image_compression: String::new(),
            lossy_image_compression_ratio: 0.0,
            lossy_image_compression_method: String::new(),
            derivation_description: String::new(),
            has_data_modality_lut: false,
            has_data_voi_luts: false,
            transfer_syntax: transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN,
            sop_class_uid: String::new(),
        }
    }
}

impl PixelDescriptor {
    /// Take a snapshot of the pixel data attributes of a dataset.
    pub fn from_dataset<S>(source: &S) -> Self
    where
        S: AttributeSource + ?Sized,
    {
        let mut descriptor = PixelDescriptor::default();

        descriptor.image_width = source.uint16(tags::COLUMNS).unwrap_or(0);
        descriptor.image_height = source.uint16(tags::ROWS).unwrap_or(0);
        descriptor.high_bit = source.uint16(tags::HIGH_BIT).unwrap_or(0);
        descriptor.bits_stored = source.uint16(tags::BITS_STORED).unwrap_or(0);
        descriptor.bits_allocated = source.uint16(tags::BITS_ALLOCATED).unwrap_or(0);
        descriptor.samples_per_pixel = source.uint16(tags::SAMPLES_PER_PIXEL).unwrap_or(1);
        descriptor.pixel_representation =
            source.uint16(tags::PIXEL_REPRESENTATION).unwrap_or(0);
        descriptor.photometric_interpretation = source
            .string(tags::PHOTOMETRIC_INTERPRETATION)
            .unwrap_or_default();
        descriptor.sop_class_uid = source.string(tags::SOP_CLASS_UID).unwrap_or_default();

        if let Some(frames) = source.int32(tags::NUMBER_OF_FRAMES) {
            descriptor.number_of_frames = frames.max(1) as u32;
        }
        if let Some(planar) = source.uint16(tags::PLANAR_CONFIGURATION) {
            descriptor.planar_configuration = planar;
        }
        if let Some(value) = source.string(tags::LOSSY_IMAGE_COMPRESSION) {
            descriptor.lossy_image_compression = value;
        }
        if let Some(ratio) = source.float32(tags::LOSSY_IMAGE_COMPRESSION_RATIO) {
            descriptor.lossy_image_compression_ratio = ratio;
        }
        if let Some(method) = source.string(tags::LOSSY_IMAGE_COMPRESSION_METHOD) {
            descriptor.lossy_image_compression_method = method;
        }
        if let Some(description) = source.string(tags::DERIVATION_DESCRIPTION) {
            descriptor.derivation_description = description;
        }
        if let Some(slope) = source.string(tags::RESCALE_SLOPE) {
            descriptor.rescale_slope.set_text(&slope);
        }
        if let Some(intercept) = source.string(tags::RESCALE_INTERCEPT) {
            descriptor.rescale_intercept.set_text(&intercept);
        }

        descriptor.has_data_modality_lut = source.contains(tags::MODALITY_LUT_SEQUENCE);
        descriptor.has_data_voi_luts = source.contains(tags::VOI_LUT_SEQUENCE);
        descriptor.voi_windows = read_windows(source);

        if source.contains(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR) {
            match PaletteColorLut::from_dataset(source) {
                Ok(lut) => descriptor.palette = Some(lut),
                Err(e) => warn!("Discarding malformed Palette Color LUT: {}", e),
            }
        }

        descriptor
    }

    /// Take a snapshot of the pixel data attributes of a message,
    /// including its transfer syntax.
    pub fn from_message<M>(message: &M) -> Self
    where
        M: DicomMessage,
    {
        let mut descriptor = PixelDescriptor::from_dataset(message);
        descriptor.transfer_syntax = message.transfer_syntax();
        descriptor
    }

    /// Whether the pixel samples are signed.
    pub fn is_signed(&self) -> bool {
        self.pixel_representation != 0
    }

    /// Whether multi-sample pixels are stored one color plane at a time.
    pub fn is_planar(&self) -> bool {
        self.planar_configuration != 0
    }

    /// The number of bytes taken by one allocated sample.
    pub fn bytes_allocated(&self) -> usize {
        let mut bytes = (self.bits_allocated / 8) as usize;
        if self.bits_allocated % 8 > 0 {
            bytes += 1;
        }
        bytes
    }

    /// The size in bytes of one uncompressed frame.
    ///
    /// YBR_FULL_422 data stores two chroma samples for every
    /// four luminance samples, so only two thirds of the
    /// nominal sample count is present.
    pub fn uncompressed_frame_size(&self) -> usize {
        let pixels = self.image_width as usize * self.image_height as usize;
        if self.photometric_interpretation == "YBR_FULL_422" {
            return pixels * self.bytes_allocated() * 2;
        }
        pixels * self.bytes_allocated() * self.samples_per_pixel as usize
    }

    /// Whether the descriptor declares a Palette Color LUT.
    pub fn has_palette_color_lut(&self) -> bool {
        self.palette.is_some()
    }

    /// Write the descriptor's attributes back into a dataset.
    ///
    /// Image Pixel Module attributes are written unconditionally.
    /// Conditional attributes (frame count, planar configuration,
    /// lossy compression bookkeeping, rescale coefficients,
    /// VOI windows) are written when already present in the dataset
    /// or when their value is meaningful,
    /// following the conventions of the original attributes.
    /// Palette Color LUT attributes are stripped when the pixel data
    /// no longer carries a palette
    /// (after a conversion to RGB).
    pub(crate) fn update_dataset<D>(&self, dataset: &mut D)
    where
        D: AttributeSource + AttributeSink + ?Sized,
    {
        dataset.put_uint16(tags::COLUMNS, self.image_width);
        dataset.put_uint16(tags::ROWS, self.image_height);
        dataset.put_uint16(tags::HIGH_BIT, self.high_bit);
        dataset.put_uint16(tags::BITS_STORED, self.bits_stored);
        dataset.put_uint16(tags::BITS_ALLOCATED, self.bits_allocated);
        dataset.put_uint16(tags::SAMPLES_PER_PIXEL, self.samples_per_pixel);
        dataset.put_uint16(tags::PIXEL_REPRESENTATION, self.pixel_representation);
        dataset.put_string(
            tags::PHOTOMETRIC_INTERPRETATION,
            &self.photometric_interpretation,
        );

        if dataset.contains(tags::NUMBER_OF_FRAMES) || self.number_of_frames > 1 {
            dataset.put_int32(tags::NUMBER_OF_FRAMES, self.number_of_frames as i32);
        }
        if dataset.contains(tags::PLANAR_CONFIGURATION) {
            dataset.put_uint16(tags::PLANAR_CONFIGURATION, self.planar_configuration);
        }
        if dataset.contains(tags::LOSSY_IMAGE_COMPRESSION_RATIO) {
            dataset.put_float32(
                tags::LOSSY_IMAGE_COMPRESSION_RATIO,
                self.lossy_image_compression_ratio,
            );
        }
        if dataset.contains(tags::LOSSY_IMAGE_COMPRESSION_METHOD) {
            dataset.put_string(
                tags::LOSSY_IMAGE_COMPRESSION_METHOD,
                &self.lossy_image_compression_method,
            );
        }

        let identity_rescale =
            self.rescale_slope.value() == 1.0 && self.rescale_intercept.value() == 0.0;
        if dataset.contains(tags::RESCALE_SLOPE) || !identity_rescale {
            dataset.put_string(tags::RESCALE_SLOPE, self.rescale_slope.text());
        }
        if dataset.contains(tags::RESCALE_INTERCEPT) || !identity_rescale {
            dataset.put_string(tags::RESCALE_INTERCEPT, self.rescale_intercept.text());
        }

        if dataset.contains(tags::WINDOW_CENTER) || !self.voi_windows.is_empty() {
            write_windows(dataset, &self.voi_windows);
        }

        // remove the palette if the pixels were translated to RGB
        if dataset.contains(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA)
            && dataset.contains(tags::GREEN_PALETTE_COLOR_LOOKUP_TABLE_DATA)
            && dataset.contains(tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DATA)
            && !self.has_palette_color_lut()
        {
            dataset.remove(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR);
            dataset.remove(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA);
            dataset.remove(tags::GREEN_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR);
            dataset.remove(tags::GREEN_PALETTE_COLOR_LOOKUP_TABLE_DATA);
            dataset.remove(tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR);
            dataset.remove(tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DATA);
        }
    }
}

/// Read the linear VOI windows of a dataset,
/// pairing Window Center and Window Width values positionally.
pub fn read_windows<S>(source: &S) -> Vec<VoiWindow>
where
    S: AttributeSource + ?Sized,
{
    let centers = source.strings(tags::WINDOW_CENTER).unwrap_or_default();
    let widths = source.strings(tags::WINDOW_WIDTH).unwrap_or_default();

    centers
        .iter()
        .zip(widths.iter())
        .filter_map(|(center, width)| {
            let center = center.trim().parse().ok()?;
            let width = width.trim().parse().ok()?;
            Some(VoiWindow { center, width })
        })
        .collect()
}

/// Write linear VOI windows into a dataset as
/// multi-valued Window Center and Window Width elements.
pub fn write_windows<D>(dataset: &mut D, windows: &[VoiWindow])
where
    D: AttributeSink + ?Sized,
{
    let centers: Vec<String> = windows
        .iter()
        .map(|w| canonical_decimal(w.center))
        .collect();
    let widths: Vec<String> = windows
        .iter()
        .map(|w| canonical_decimal(w.width))
        .collect();
    dataset.put_strings(tags::WINDOW_CENTER, &centers);
    dataset.put_strings(tags::WINDOW_WIDTH, &widths);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AttributeValue, InMemDataset};

    fn basic_dataset() -> InMemDataset {
        let mut dataset = InMemDataset::new();
        dataset.put_uint16(tags::COLUMNS, 64);
        dataset.put_uint16(tags::ROWS, 32);
        dataset.put_uint16(tags::BITS_ALLOCATED, 16);
        dataset.put_uint16(tags::BITS_STORED, 12);
        dataset.put_uint16(tags::HIGH_BIT, 11);
        dataset.put_uint16(tags::SAMPLES_PER_PIXEL, 1);
        dataset.put_uint16(tags::PIXEL_REPRESENTATION, 1);
        dataset.put_string(tags::PHOTOMETRIC_INTERPRETATION, "MONOCHROME2");
        dataset
    }

    #[test]
    fn snapshot_from_dataset() {
        let mut dataset = basic_dataset();
        dataset.put_string(tags::NUMBER_OF_FRAMES, "3");
        dataset.put_string(tags::RESCALE_SLOPE, "1.5");
        dataset.put_string(tags::RESCALE_INTERCEPT, "-1024");
        dataset.put(
            tags::MODALITY_LUT_SEQUENCE,
            AttributeValue::Sequence { items: 1 },
        );
        dataset.put_strings(
            tags::WINDOW_CENTER,
            &["40".to_string(), "400".to_string()],
        );
        dataset.put_strings(
            tags::WINDOW_WIDTH,
            &["80".to_string(), "2000".to_string()],
        );

        let descriptor = PixelDescriptor::from_dataset(&dataset);
        assert_eq!(descriptor.image_width, 64);
        assert_eq!(descriptor.image_height, 32);
        assert_eq!(descriptor.number_of_frames, 3);
        assert!(descriptor.is_signed());
        assert_eq!(descriptor.rescale_slope.value(), 1.5);
        assert_eq!(descriptor.rescale_intercept.value(), -1024.0);
        assert!(descriptor.has_data_modality_lut);
        assert!(!descriptor.has_data_voi_luts);
        assert_eq!(
            descriptor.voi_windows,
            vec![
                VoiWindow {
                    center: 40.,
                    width: 80.
                },
                VoiWindow {
                    center: 400.,
                    width: 2000.
                },
            ]
        );
    }

    #[test]
    fn frame_size_accounts_for_chroma_subsampling() {
        let mut descriptor = PixelDescriptor::default();
        descriptor.image_width = 100;
        descriptor.image_height = 50;
        descriptor.bits_allocated = 8;
        descriptor.samples_per_pixel = 3;
        descriptor.photometric_interpretation = "RGB".to_string();
        assert_eq!(descriptor.uncompressed_frame_size(), 100 * 50 * 3);

        descriptor.photometric_interpretation = "YBR_FULL_422".to_string();
        assert_eq!(descriptor.uncompressed_frame_size(), 100 * 50 * 2);
    }

    #[test]
    fn bytes_allocated_rounds_up() {
        let mut descriptor = PixelDescriptor::default();
        descriptor.bits_allocated = 8;
        assert_eq!(descriptor.bytes_allocated(), 1);
        descriptor.bits_allocated = 12;
        assert_eq!(descriptor.bytes_allocated(), 2);
        descriptor.bits_allocated = 16;
        assert_eq!(descriptor.bytes_allocated(), 2);
    }

    #[test]
    fn rescale_setter_ignores_unparsable_text() {
        let mut slope = RescaleValue::slope_default();
        slope.set_text("2.5");
        assert_eq!(slope.value(), 2.5);
        assert_eq!(slope.text(), "2.5");

        // documented silent no-op
        slope.set_text("abc");
        assert_eq!(slope.value(), 2.5);
        assert_eq!(slope.text(), "2.5");
    }

    #[test]
    fn rescale_value_setter_renders_canonical_text() {
        let mut intercept = RescaleValue::intercept_default();
        intercept.set_value(-1024.0);
        assert_eq!(intercept.text(), "-1024");

        intercept.set_value(0.5);
        assert_eq!(intercept.text(), "0.5");

        intercept.set_value(1.0 / 3.0);
        assert_eq!(intercept.text(), "0.3333333333");
    }

    #[test]
    fn modality_lut_allow_list() {
        assert!(sop_supports_modality_lut(sop_class::CT_IMAGE_STORAGE));
        assert!(sop_supports_modality_lut(sop_class::RT_IMAGE_STORAGE));
        // PET is out by design, as is anything unknown
        assert!(!sop_supports_modality_lut("1.2.840.10008.5.1.4.1.1.128"));
        assert!(!sop_supports_modality_lut(""));
    }

    #[test]
    fn update_dataset_writes_conditionals_and_strips_palette() {
        let mut dataset = basic_dataset();
        dataset.put(
            tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR,
            AttributeValue::U16(vec![2, 0, 8]),
        );
        dataset.put(
            tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA,
            AttributeValue::Bytes(vec![1, 2]),
        );
        dataset.put(
            tags::GREEN_PALETTE_COLOR_LOOKUP_TABLE_DATA,
            AttributeValue::Bytes(vec![3, 4]),
        );
        dataset.put(
            tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DATA,
            AttributeValue::Bytes(vec![5, 6]),
        );

        let mut descriptor = PixelDescriptor::from_dataset(&dataset);
        assert!(descriptor.has_palette_color_lut());

        // simulate a conversion to RGB
        descriptor.palette = None;
        descriptor.rescale_intercept.set_value(-100.0);
        descriptor.update_dataset(&mut dataset);

        assert!(!dataset.contains(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA));
        assert!(!dataset.contains(tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR));
        assert_eq!(
            dataset.string(tags::RESCALE_INTERCEPT).as_deref(),
            Some("-100")
        );
        assert_eq!(dataset.string(tags::RESCALE_SLOPE).as_deref(), Some("1"));
        // single frame and no prior element: not written
        assert!(!dataset.contains(tags::NUMBER_OF_FRAMES));
    }
}
