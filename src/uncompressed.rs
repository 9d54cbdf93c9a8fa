//! The native (uncompressed) pixel data store.

use snafu::ensure;

use crate::dataset::{
    AttributeSink, AttributeSource, Dataset, DicomMessage, PixelDataValue, PixelPayload,
};
use crate::descriptor::PixelDescriptor;
use crate::fragment::local_endianness;
use crate::transfer_syntax;
use crate::transform;
use crate::{
    FrameOutOfRangeSnafu, IncompletePaletteSnafu, InsufficientPixelDataSnafu,
    NotPaletteColorSnafu, Result,
};

/// Swap the bytes of each 16-bit value in place.
fn swap_u16_bytes(data: &mut [u8]) {
    for pair in data.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

/// A native pixel data store:
/// flat rows of samples, one frame after another.
///
/// The store starts from the payload found in the source object,
/// which may be resident bytes or a lazy file reference,
/// and accumulates appended frames in memory.
/// File-backed frames are read on demand, one frame per call,
/// with byte order corrected for multi-byte samples.
#[derive(Debug, Clone, Default)]
pub struct UncompressedPixelData {
    descriptor: PixelDescriptor,
    payload: Option<PixelPayload>,
    accumulator: Option<Vec<u8>>,
}

impl UncompressedPixelData {
    /// Create an empty store over the given metadata snapshot.
    pub fn new(descriptor: PixelDescriptor) -> Self {
        UncompressedPixelData {
            descriptor,
            payload: None,
            accumulator: None,
        }
    }

    /// Build a store from the attributes and pixel data of a dataset.
    pub fn from_dataset<S>(source: &S) -> Self
    where
        S: AttributeSource + ?Sized,
    {
        let descriptor = PixelDescriptor::from_dataset(source);
        let payload = match source.pixel_data() {
            Some(PixelDataValue::Native(payload)) => Some(payload),
            _ => None,
        };
        UncompressedPixelData {
            descriptor,
            payload,
            accumulator: None,
        }
    }

    /// Build a store from a message-like object,
    /// taking the transfer syntax from the message.
    pub fn from_message<M>(message: &M) -> Self
    where
        M: DicomMessage,
    {
        let mut store = UncompressedPixelData::from_dataset(message);
        store.descriptor.transfer_syntax = message.transfer_syntax();
        store
    }

    /// Build an empty store carrying the metadata of a compressed store,
    /// to receive the output of a codec.
    pub fn from_compressed(source: &crate::compressed::CompressedPixelData) -> Self {
        UncompressedPixelData::new(source.descriptor().clone())
    }

    /// The image metadata snapshot backing this store.
    pub fn descriptor(&self) -> &PixelDescriptor {
        &self.descriptor
    }

    /// Mutable access to the image metadata snapshot.
    pub fn descriptor_mut(&mut self) -> &mut PixelDescriptor {
        &mut self.descriptor
    }

    /// The pixel data bytes held in memory, if any.
    ///
    /// Appended frames take precedence over the source payload.
    /// A file-backed payload yields `None`,
    /// since its bytes are only read frame by frame.
    pub fn data(&self) -> Option<&[u8]> {
        if let Some(accumulator) = &self.accumulator {
            return Some(accumulator);
        }
        match &self.payload {
            Some(PixelPayload::Resident(data)) => Some(data),
            _ => None,
        }
    }

    /// Append one frame of native pixel data.
    ///
    /// The first append materializes the store in memory:
    /// a resident source payload is carried over into the accumulator,
    /// a file-backed payload is discarded.
    pub fn append_frame(&mut self, frame: &[u8]) {
        let capacity = frame.len() * self.descriptor.number_of_frames as usize;
        let payload = &self.payload;
        let accumulator = self.accumulator.get_or_insert_with(|| match payload {
            Some(PixelPayload::Resident(data)) => data.clone(),
            _ => Vec::with_capacity(capacity),
        });
        accumulator.extend_from_slice(frame);
    }

    /// Fetch one frame of pixel data in local byte order.
    ///
    /// The frame is sliced out of the in-memory bytes when they are
    /// available,
    /// and otherwise read from the source file,
    /// swapping bytes when the file's byte order differs from the
    /// machine's and the samples span more than one byte.
    pub fn get_frame(&self, frame: u32) -> Result<Vec<u8>> {
        ensure!(
            frame < self.descriptor.number_of_frames,
            FrameOutOfRangeSnafu {
                frame,
                frames: self.descriptor.number_of_frames,
            }
        );
        let frame_size = self.descriptor.uncompressed_frame_size();
        let offset = frame as usize * frame_size;

        if let Some(data) = self.data() {
            ensure!(
                data.len() >= offset + frame_size,
                InsufficientPixelDataSnafu {
                    needed: offset + frame_size,
                    available: data.len(),
                }
            );
            return Ok(data[offset..offset + frame_size].to_vec());
        }

        let reference = match &self.payload {
            Some(PixelPayload::Referenced(reference)) => reference,
            _ => {
                return InsufficientPixelDataSnafu {
                    needed: offset + frame_size,
                    available: 0_usize,
                }
                .fail()
            }
        };

        let needs_swap =
            reference.unit_size > 1 && reference.endianness != local_endianness();
        if !needs_swap {
            ensure!(
                reference.length as usize >= offset + frame_size,
                InsufficientPixelDataSnafu {
                    needed: offset + frame_size,
                    available: reference.length as usize,
                }
            );
            return reference.read_at(offset as i64, frame_size);
        }

        if frame_size % 2 == 0 {
            ensure!(
                reference.length as usize >= offset + frame_size,
                InsufficientPixelDataSnafu {
                    needed: offset + frame_size,
                    available: reference.length as usize,
                }
            );
            let mut data = reference.read_at(offset as i64, frame_size)?;
            swap_u16_bytes(&mut data);
            return Ok(data);
        }

        // An odd frame size splits a 16-bit value across the frame
        // boundary. Read one extra byte so the swap operates on whole
        // values: odd frames start one byte early and keep the tail of
        // the swapped buffer, even frames read one byte past the end
        // and keep the head.
        let odd_frame = frame % 2 == 1;
        let skip = if odd_frame {
            offset as i64 - 1
        } else {
            offset as i64
        };
        ensure!(
            reference.length as i64 >= skip + frame_size as i64 + 1,
            InsufficientPixelDataSnafu {
                needed: (skip + frame_size as i64 + 1) as usize,
                available: reference.length as usize,
            }
        );
        let mut data = reference.read_at(skip, frame_size + 1)?;
        swap_u16_bytes(&mut data);
        if odd_frame {
            data.remove(0);
        } else {
            data.truncate(frame_size);
        }
        Ok(data)
    }

    /// Fetch one frame along with the photometric interpretation
    /// of the returned samples.
    pub fn get_frame_with_photometric_interpretation(
        &self,
        frame: u32,
    ) -> Result<(Vec<u8>, String)> {
        let data = self.get_frame(frame)?;
        Ok((data, self.descriptor.photometric_interpretation.clone()))
    }

    /// Translate PALETTE COLOR pixel data to interleaved 8-bit RGB,
    /// frame by frame, through the store's Palette Color LUT.
    ///
    /// The descriptor is updated to describe the new samples
    /// and the palette is dropped,
    /// so a later attribute update strips the LUT elements
    /// from the dataset.
    pub fn convert_palette_color_to_rgb(&mut self) -> Result<()> {
        ensure!(
            self.descriptor.photometric_interpretation == "PALETTE COLOR",
            NotPaletteColorSnafu {
                pi: self.descriptor.photometric_interpretation.clone(),
            }
        );
        let palette = self
            .descriptor
            .palette
            .clone()
            .ok_or_else(|| {
                IncompletePaletteSnafu {
                    name: "Palette Color LUT",
                }
                .build()
            })?;

        let pixels =
            self.descriptor.image_width as usize * self.descriptor.image_height as usize;
        let frames = self.descriptor.number_of_frames;
        let mut converted = Vec::with_capacity(pixels * 3 * frames as usize);
        for frame in 0..frames {
            let source = self.get_frame(frame)?;
            let mut target = vec![0; pixels * 3];
            transform::palette_color_to_rgb(
                self.descriptor.bits_allocated,
                self.descriptor.is_signed(),
                &source,
                &mut target,
                &palette,
            )?;
            converted.extend_from_slice(&target);
        }

        self.payload = None;
        self.accumulator = Some(converted);
        self.descriptor.samples_per_pixel = 3;
        self.descriptor.photometric_interpretation = "RGB".to_string();
        self.descriptor.planar_configuration = 0;
        self.descriptor.bits_allocated = 8;
        self.descriptor.bits_stored = 8;
        self.descriptor.high_bit = 7;
        self.descriptor.pixel_representation = 0;
        self.descriptor.palette = None;
        Ok(())
    }

    /// Write the pixel data and the descriptor's attributes
    /// back into the given dataset.
    ///
    /// In-memory pixel data is committed as the new native payload,
    /// padded with one trailing zero byte when its length is odd.
    pub fn update_attribute_collection<D>(&mut self, dataset: &mut D)
    where
        D: Dataset + ?Sized,
    {
        self.descriptor.update_dataset(dataset);

        if let Some(mut accumulator) = self.accumulator.take() {
            if accumulator.len() % 2 == 1 {
                accumulator.push(0);
            }
            self.payload = Some(PixelPayload::Resident(accumulator));
        }
        if let Some(payload) = &self.payload {
            dataset.put_pixel_data(PixelDataValue::Native(payload.clone()));
        }
    }

    /// Write the pixel data, the descriptor's attributes,
    /// and the transfer syntax back into the given message.
    pub fn update_message<M>(&mut self, message: &mut M)
    where
        M: DicomMessage,
    {
        self.update_attribute_collection(message);
        message.set_transfer_syntax(self.descriptor.transfer_syntax);
    }

    /// Reset the transfer syntax to Explicit VR Little Endian,
    /// the encoding of freshly decoded native pixel data.
    pub(crate) fn reset_transfer_syntax(&mut self) {
        self.descriptor.transfer_syntax = transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AttributeValue, InMemDataset};
    use crate::fragment::FileReference;
    use crate::palette::PaletteColorLut;
    use crate::tags;
    use crate::Error;
    use byteordered::Endianness;
    use std::io::Write;

    fn descriptor(width: u16, height: u16, bits: u16, frames: u32) -> PixelDescriptor {
        let mut descriptor = PixelDescriptor::default();
        descriptor.image_width = width;
        descriptor.image_height = height;
        descriptor.bits_allocated = bits;
        descriptor.bits_stored = bits;
        descriptor.high_bit = bits - 1;
        descriptor.samples_per_pixel = 1;
        descriptor.number_of_frames = frames;
        descriptor.photometric_interpretation = "MONOCHROME2".to_string();
        descriptor
    }

    #[test]
    fn append_and_get_frames() {
        let mut store = UncompressedPixelData::new(descriptor(4, 2, 8, 2));
        let frame0: Vec<u8> = (0..8).collect();
        let frame1: Vec<u8> = (8..16).collect();
        store.append_frame(&frame0);
        store.append_frame(&frame1);

        assert_eq!(store.get_frame(0).unwrap(), frame0);
        assert_eq!(store.get_frame(1).unwrap(), frame1);
        assert!(matches!(
            store.get_frame(2).unwrap_err(),
            Error::FrameOutOfRange { frame: 2, frames: 2 }
        ));
    }

    #[test]
    fn append_extends_resident_payload() {
        let mut dataset = InMemDataset::new();
        dataset.put_uint16(tags::COLUMNS, 2);
        dataset.put_uint16(tags::ROWS, 2);
        dataset.put_uint16(tags::BITS_ALLOCATED, 8);
        dataset.put_string(tags::NUMBER_OF_FRAMES, "2");
        dataset.put(tags::PIXEL_DATA, AttributeValue::Bytes(vec![1, 2, 3, 4]));

        let mut store = UncompressedPixelData::from_dataset(&dataset);
        store.append_frame(&[5, 6, 7, 8]);
        assert_eq!(store.get_frame(0).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(store.get_frame(1).unwrap(), vec![5, 6, 7, 8]);
    }

    #[test]
    fn short_payload_is_an_error() {
        let mut store = UncompressedPixelData::new(descriptor(4, 2, 8, 2));
        store.append_frame(&[0; 8]);
        assert!(matches!(
            store.get_frame(1).unwrap_err(),
            Error::InsufficientPixelData {
                needed: 16,
                available: 8,
            }
        ));
    }

    #[test]
    fn file_reference_big_endian_words_are_swapped() {
        // two 2x2 16-bit frames, big endian
        let bytes: Vec<u8> = vec![
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, // frame 0
            0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, // frame 1
        ];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let mut reference = FileReference::new(file.path(), 0, bytes.len() as u32);
        reference.endianness = Endianness::Big;
        reference.unit_size = 2;

        let mut store = UncompressedPixelData::new(descriptor(2, 2, 16, 2));
        store.payload = Some(PixelPayload::Referenced(reference));

        // little endian machines swap, big endian machines read as is
        if local_endianness() == Endianness::Little {
            assert_eq!(
                store.get_frame(0).unwrap(),
                vec![0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07]
            );
            assert_eq!(
                store.get_frame(1).unwrap(),
                vec![0x12, 0x11, 0x14, 0x13, 0x16, 0x15, 0x18, 0x17]
            );
        } else {
            assert_eq!(store.get_frame(0).unwrap(), bytes[..8].to_vec());
        }
    }

    #[test]
    fn odd_frame_size_swap_straddles_the_boundary() {
        // 3x3 8-bit frames (9 bytes each) stored as OW data,
        // so 16-bit values straddle the frame boundary
        let bytes: Vec<u8> = (1..=18).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let mut reference = FileReference::new(file.path(), 0, bytes.len() as u32);
        reference.endianness = match local_endianness() {
            Endianness::Little => Endianness::Big,
            Endianness::Big => Endianness::Little,
        };
        reference.unit_size = 2;

        let mut store = UncompressedPixelData::new(descriptor(3, 3, 8, 2));
        store.payload = Some(PixelPayload::Referenced(reference));

        // frame 0: swap bytes 1..=10 pairwise, keep the first 9
        assert_eq!(
            store.get_frame(0).unwrap(),
            vec![2, 1, 4, 3, 6, 5, 8, 7, 10]
        );
        // frame 1: swap bytes 9..=18 pairwise, keep the last 9
        assert_eq!(
            store.get_frame(1).unwrap(),
            vec![9, 12, 11, 14, 13, 16, 15, 18, 17]
        );
    }

    #[test]
    fn update_pads_odd_data_to_even_length() {
        let mut store = UncompressedPixelData::new(descriptor(3, 3, 8, 1));
        store.append_frame(&(1..=9).collect::<Vec<u8>>());

        let mut dataset = InMemDataset::new();
        store.update_attribute_collection(&mut dataset);

        match dataset.pixel_data() {
            Some(PixelDataValue::Native(PixelPayload::Resident(data))) => {
                assert_eq!(data.len(), 10);
                assert_eq!(data[9], 0);
            }
            other => panic!("unexpected pixel data: {:?}", other),
        }
        assert_eq!(dataset.uint16(tags::COLUMNS), Some(3));
    }

    #[test]
    fn palette_color_to_rgb_conversion() {
        let mut descriptor = descriptor(2, 2, 8, 1);
        descriptor.photometric_interpretation = "PALETTE COLOR".to_string();
        descriptor.palette = Some(
            PaletteColorLut::new(
                4,
                0,
                8,
                &[10, 20, 30, 40],
                &[11, 21, 31, 41],
                &[12, 22, 32, 42],
            )
            .unwrap(),
        );

        let mut store = UncompressedPixelData::new(descriptor);
        store.append_frame(&[0, 1, 2, 3]);
        store.convert_palette_color_to_rgb().unwrap();

        assert_eq!(
            store.data().unwrap(),
            &[10, 11, 12, 20, 21, 22, 30, 31, 32, 40, 41, 42][..]
        );
        assert_eq!(store.descriptor().samples_per_pixel, 3);
        assert_eq!(store.descriptor().photometric_interpretation, "RGB");
        assert!(store.descriptor().palette.is_none());

        // converting again is rejected
        assert!(matches!(
            store.convert_palette_color_to_rgb().unwrap_err(),
            Error::NotPaletteColor { .. }
        ));
    }

    #[test]
    fn rgb_update_strips_palette_attributes() {
        let mut dataset = InMemDataset::new();
        dataset.put_uint16(tags::COLUMNS, 2);
        dataset.put_uint16(tags::ROWS, 1);
        dataset.put_uint16(tags::BITS_ALLOCATED, 8);
        dataset.put_uint16(tags::BITS_STORED, 8);
        dataset.put_uint16(tags::HIGH_BIT, 7);
        dataset.put_uint16(tags::SAMPLES_PER_PIXEL, 1);
        dataset.put_string(tags::PHOTOMETRIC_INTERPRETATION, "PALETTE COLOR");
        dataset.put(
            tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR,
            AttributeValue::U16(vec![2, 0, 8]),
        );
        dataset.put(
            tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA,
            AttributeValue::Bytes(vec![100, 200]),
        );
        dataset.put(
            tags::GREEN_PALETTE_COLOR_LOOKUP_TABLE_DATA,
            AttributeValue::Bytes(vec![101, 201]),
        );
        dataset.put(
            tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DATA,
            AttributeValue::Bytes(vec![102, 202]),
        );
        dataset.put(tags::PIXEL_DATA, AttributeValue::Bytes(vec![0, 1]));

        let mut store = UncompressedPixelData::from_dataset(&dataset);
        store.convert_palette_color_to_rgb().unwrap();
        store.update_attribute_collection(&mut dataset);

        assert_eq!(
            dataset.string(tags::PHOTOMETRIC_INTERPRETATION).as_deref(),
            Some("RGB")
        );
        assert_eq!(dataset.uint16(tags::SAMPLES_PER_PIXEL), Some(3));
        assert!(!dataset.contains(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA));
        assert!(!dataset.contains(tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR));
    }
}
