//! The encapsulated (compressed) pixel data store.
//!
//! Encapsulated pixel data is a sequence of fragments,
//! with frame boundaries that the encoder may or may not have
//! declared through a Basic Offset Table.
//! [`CompressedPixelData::get_frame_fragments`] resolves the fragments
//! of a single frame through a chain of strategies,
//! from the authoritative table down to layout heuristics.
//! Decoding to native pixel data goes through the codec
//! registered for the transfer syntax.

use snafu::ensure;
use tracing::{error, warn};

use crate::codec::{self, CodecParameters};
use crate::dataset::{AttributeSink, AttributeSource, Dataset, DicomMessage, PixelDataValue};
use crate::descriptor::PixelDescriptor;
use crate::fragment::{Fragment, FragmentSequence};
use crate::tags;
use crate::uncompressed::UncompressedPixelData;
use crate::{
    CodecNotFoundSnafu, FrameOutOfRangeSnafu, InconsistentFragmentLayoutSnafu, Result,
};

/// An encapsulated pixel data store:
/// the fragment sequence of a compressed pixel data element,
/// together with the image metadata needed to interpret it.
#[derive(Debug, Clone, Default)]
pub struct CompressedPixelData {
    descriptor: PixelDescriptor,
    sequence: FragmentSequence,
}

impl CompressedPixelData {
    /// Create an empty store over the given metadata snapshot.
    pub fn new(descriptor: PixelDescriptor) -> Self {
        CompressedPixelData {
            descriptor,
            sequence: FragmentSequence::new(),
        }
    }

    /// Build a store from the attributes and pixel data of a dataset.
    pub fn from_dataset<S>(source: &S) -> Self
    where
        S: AttributeSource + ?Sized,
    {
        let descriptor = PixelDescriptor::from_dataset(source);
        let sequence = match source.pixel_data() {
            Some(PixelDataValue::Encapsulated(sequence)) => sequence,
            _ => FragmentSequence::new(),
        };
        CompressedPixelData {
            descriptor,
            sequence,
        }
    }

    /// Build a store from a message-like object,
    /// taking the transfer syntax from the message.
    pub fn from_message<M>(message: &M) -> Self
    where
        M: DicomMessage,
    {
        let mut store = CompressedPixelData::from_dataset(message);
        store.descriptor.transfer_syntax = message.transfer_syntax();
        store
    }

    /// Build an empty store carrying the metadata of a native store,
    /// to receive the output of an encoder.
    pub fn from_uncompressed(source: &UncompressedPixelData) -> Self {
        CompressedPixelData::new(source.descriptor().clone())
    }

    /// Build a single-frame store from a message's attributes
    /// and one frame of already compressed data.
    pub fn from_frame<M>(message: &M, data: Vec<u8>) -> Result<Self>
    where
        M: DicomMessage,
    {
        let mut store = CompressedPixelData::from_message(message);
        store.descriptor.number_of_frames = 1;
        store.sequence.clear();
        store.sequence.add_frame_fragment(data)?;
        Ok(store)
    }

    /// The image metadata snapshot backing this store.
    pub fn descriptor(&self) -> &PixelDescriptor {
        &self.descriptor
    }

    /// Mutable access to the image metadata snapshot.
    pub fn descriptor_mut(&mut self) -> &mut PixelDescriptor {
        &mut self.descriptor
    }

    /// The fragment sequence of the pixel data element.
    pub fn fragment_sequence(&self) -> &FragmentSequence {
        &self.sequence
    }

    /// Mutable access to the fragment sequence.
    pub fn fragment_sequence_mut(&mut self) -> &mut FragmentSequence {
        &mut self.sequence
    }

    /// Append the compressed data of one whole frame as a new fragment,
    /// extending the offset table.
    pub fn add_frame_fragment(&mut self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.sequence.add_frame_fragment(data)
    }

    /// Resolve the fragments that make up the given frame.
    ///
    /// The strategies are tried in order:
    ///
    /// 1. a single-frame object owns all fragments;
    /// 2. with exactly one fragment per frame,
    ///    the frame index selects the fragment;
    /// 3. a Basic Offset Table with exactly one entry per frame is
    ///    walked, collecting the fragments between the frame's offset
    ///    and the next;
    /// 4. failing all of the above, frame boundaries are guessed
    ///    from the fragment lengths.
    ///
    /// A table of any other length does not describe frames and is
    /// skipped. A table whose start offsets do not land on fragment
    /// boundaries is ignored with a warning and the heuristics take
    /// over.
    pub fn get_frame_fragments(&self, frame: u32) -> Result<Vec<&Fragment>> {
        let frames = self.descriptor.number_of_frames;
        ensure!(frame < frames, FrameOutOfRangeSnafu { frame, frames });

        let fragments = self.sequence.fragments();
        if frames == 1 {
            return Ok(fragments.iter().collect());
        }
        if fragments.len() as u32 == frames {
            return Ok(vec![&fragments[frame as usize]]);
        }

        if let Some(table) = self.sequence.offset_table() {
            if table.len() as u32 == frames {
                if let Some(selected) = walk_offset_table(fragments, table, frame) {
                    return Ok(selected);
                }
                warn!(
                    frame,
                    "Basic Offset Table does not match the fragment layout, \
                     guessing frame boundaries"
                );
            }
        }

        resolve_by_lengths(fragments, frame, frames)
    }

    /// The total compressed size of the given frame in bytes.
    pub fn get_compressed_frame_size(&self, frame: u32) -> Result<u32> {
        let fragments = self.get_frame_fragments(frame)?;
        Ok(fragments.iter().map(|fragment| fragment.len()).sum())
    }

    /// The concatenated compressed bytes of the given frame,
    /// loading file-backed fragments as needed.
    pub fn get_frame_fragment_data(&self, frame: u32) -> Result<Vec<u8>> {
        let fragments = self.get_frame_fragments(frame)?;
        let size = fragments.iter().map(|fragment| fragment.len()).sum::<u32>();
        let mut data = Vec::with_capacity(size as usize);
        for fragment in fragments {
            data.extend_from_slice(&fragment.data()?);
        }
        Ok(data)
    }

    /// Fetch one frame as native pixel data,
    /// decoded through the codec registered for the transfer syntax,
    /// along with the photometric interpretation of the decoded samples.
    pub fn get_frame_with_photometric_interpretation(
        &self,
        frame: u32,
    ) -> Result<(Vec<u8>, String)> {
        let frames = self.descriptor.number_of_frames;
        ensure!(frame < frames, FrameOutOfRangeSnafu { frame, frames });

        let transfer_syntax = &self.descriptor.transfer_syntax;
        let codec = match codec::get_codec(transfer_syntax.uid()) {
            Some(codec) => codec,
            None => {
                error!(
                    uid = transfer_syntax.uid(),
                    "no codec registered for transfer syntax {}", transfer_syntax
                );
                return CodecNotFoundSnafu {
                    uid: transfer_syntax.uid(),
                    name: transfer_syntax.name(),
                }
                .fail();
            }
        };

        let mut target = UncompressedPixelData::from_compressed(self);
        codec.decode_frame(frame, self, &mut target, &CodecParameters::default())?;
        target.reset_transfer_syntax();

        let pi = target.descriptor().photometric_interpretation.clone();
        let data = target.data().map(<[u8]>::to_vec).unwrap_or_default();
        Ok((data, pi))
    }

    /// Fetch one frame as native pixel data.
    pub fn get_frame(&self, frame: u32) -> Result<Vec<u8>> {
        self.get_frame_with_photometric_interpretation(frame)
            .map(|(data, _)| data)
    }

    /// Write the fragment sequence and the descriptor's attributes
    /// back into the given dataset,
    /// marking the object as lossy compressed when the transfer syntax
    /// is a lossy one.
    pub fn update_attribute_collection<D>(&mut self, dataset: &mut D)
    where
        D: Dataset + ?Sized,
    {
        self.descriptor.update_dataset(dataset);

        if self.descriptor.transfer_syntax.is_lossy_compressed() {
            dataset.put_string(tags::LOSSY_IMAGE_COMPRESSION, "01");
            if self.descriptor.lossy_image_compression_ratio > 0.0 {
                dataset.put_float32(
                    tags::LOSSY_IMAGE_COMPRESSION_RATIO,
                    self.descriptor.lossy_image_compression_ratio,
                );
            }
            if !self.descriptor.lossy_image_compression_method.is_empty() {
                dataset.put_string(
                    tags::LOSSY_IMAGE_COMPRESSION_METHOD,
                    &self.descriptor.lossy_image_compression_method,
                );
            }
        }
        if dataset.contains(tags::DERIVATION_DESCRIPTION)
            || !self.descriptor.derivation_description.is_empty()
        {
            dataset.put_string(
                tags::DERIVATION_DESCRIPTION,
                &self.descriptor.derivation_description,
            );
        }

        dataset.put_pixel_data(PixelDataValue::Encapsulated(self.sequence.clone()));
    }

    /// Write the fragment sequence, the descriptor's attributes,
    /// and the transfer syntax back into the given message.
    pub fn update_message<M>(&mut self, message: &mut M)
    where
        M: DicomMessage,
    {
        self.update_attribute_collection(message);
        message.set_transfer_syntax(self.descriptor.transfer_syntax);
    }
}

/// Collect the fragments from `table[frame]` up to `table[frame + 1]`
/// (or the end of the sequence for the last entry).
///
/// Returns `None` when the start offset does not land exactly on a
/// fragment boundary, so the caller can fall back to heuristics.
/// The end offset is taken leniently:
/// fragments are collected while they start before it.
fn walk_offset_table<'a>(
    fragments: &'a [Fragment],
    table: &[u32],
    frame: u32,
) -> Option<Vec<&'a Fragment>> {
    let start = *table.get(frame as usize)?;
    let end = table.get(frame as usize + 1).copied();

    let mut offset = 0_u32;
    let mut found_start = false;
    let mut selected = Vec::new();
    for fragment in fragments {
        if offset == start {
            found_start = true;
        }
        if found_start {
            if let Some(end) = end {
                if offset >= end {
                    break;
                }
            }
            selected.push(fragment);
        }
        offset += 8 + fragment.len();
    }

    if found_start && !selected.is_empty() {
        Some(selected)
    } else {
        None
    }
}

/// Guess the fragments of a frame from the fragment lengths alone.
///
/// When all fragments have the same length,
/// they must divide evenly over the frames
/// and each frame takes a contiguous run of them.
/// Otherwise each frame is assumed to be a run of full-length
/// fragments closed by one shorter terminal fragment.
fn resolve_by_lengths<'a>(
    fragments: &'a [Fragment],
    frame: u32,
    frames: u32,
) -> Result<Vec<&'a Fragment>> {
    let layout_error = || {
        InconsistentFragmentLayoutSnafu {
            fragments: fragments.len(),
            frames,
        }
    };
    ensure!(!fragments.is_empty(), layout_error());

    let max_length = fragments
        .iter()
        .map(|fragment| fragment.len())
        .max()
        .unwrap_or(0);
    let all_equal = fragments
        .iter()
        .all(|fragment| fragment.len() == max_length);

    if all_equal {
        ensure!(fragments.len() % frames as usize == 0, layout_error());
        let per_frame = fragments.len() / frames as usize;
        let start = frame as usize * per_frame;
        return Ok(fragments[start..start + per_frame].iter().collect());
    }

    let mut current_frame = 0_u32;
    let mut group = Vec::new();
    for fragment in fragments {
        group.push(fragment);
        if fragment.len() < max_length {
            if current_frame == frame {
                return Ok(group);
            }
            current_frame += 1;
            group.clear();
        }
    }
    if current_frame == frame && !group.is_empty() {
        return Ok(group);
    }
    layout_error().fail()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{register_codec, PixelDataCodec};
    use crate::dataset::{InMemDataset, InMemMessage};
    use crate::transfer_syntax as ts;
    use crate::Error;
    use std::sync::Arc;

    fn store_with_fragments(frames: u32, lengths: &[usize]) -> CompressedPixelData {
        let mut descriptor = PixelDescriptor::default();
        descriptor.number_of_frames = frames;
        descriptor.image_width = 4;
        descriptor.image_height = 4;
        descriptor.bits_allocated = 8;
        descriptor.transfer_syntax = ts::RLE_LOSSLESS;
        let mut store = CompressedPixelData::new(descriptor);
        for (i, len) in lengths.iter().enumerate() {
            store
                .add_frame_fragment(vec![i as u8; *len])
                .expect("even fragment length");
        }
        store
    }

    #[test]
    fn single_frame_owns_all_fragments() {
        let store = store_with_fragments(1, &[100, 150, 120]);
        let fragments = store.get_frame_fragments(0).unwrap();
        assert_eq!(fragments.len(), 3);
        assert_eq!(store.get_compressed_frame_size(0).unwrap(), 370);
    }

    #[test]
    fn one_fragment_per_frame() {
        let store = store_with_fragments(3, &[100, 150, 120]);
        let fragments = store.get_frame_fragments(1).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].len(), 150);
        assert_eq!(store.get_compressed_frame_size(1).unwrap(), 150);
    }

    #[test]
    fn offset_table_walk_spans_fragments() {
        // 2 frames over 3 fragments, boundaries declared by the table
        let mut store = store_with_fragments(2, &[100, 100, 50]);
        store
            .fragment_sequence_mut()
            .set_offset_table(vec![0, 8 + 100 + 8 + 100]);

        let frame0 = store.get_frame_fragments(0).unwrap();
        assert_eq!(frame0.len(), 2);
        assert_eq!(store.get_compressed_frame_size(0).unwrap(), 200);

        let frame1 = store.get_frame_fragments(1).unwrap();
        assert_eq!(frame1.len(), 1);
        assert_eq!(frame1[0].len(), 50);
    }

    #[test]
    fn per_fragment_offset_table_does_not_override_heuristics() {
        // add_frame_fragment builds a per-fragment table; with more
        // fragments than frames it does not describe frame boundaries
        let store = store_with_fragments(2, &[100, 100, 100, 100, 100, 100]);
        assert!(store.fragment_sequence().has_offset_table());
        let frame1 = store.get_frame_fragments(1).unwrap();
        assert_eq!(frame1.len(), 3);

        let store = store_with_fragments(2, &[100, 100, 40, 100, 60]);
        assert!(store.fragment_sequence().has_offset_table());
        let frame0 = store.get_frame_fragments(0).unwrap();
        assert_eq!(
            frame0.iter().map(|f| f.len()).collect::<Vec<_>>(),
            vec![100, 100, 40]
        );
    }

    #[test]
    fn offset_table_end_inside_a_fragment_is_tolerated() {
        // only start offsets gate the walk, end offsets are lenient
        let mut store = store_with_fragments(2, &[100, 100, 50]);
        store.fragment_sequence_mut().set_offset_table(vec![0, 110]);

        let frame0 = store.get_frame_fragments(0).unwrap();
        assert_eq!(
            frame0.iter().map(|f| f.len()).collect::<Vec<_>>(),
            vec![100, 100]
        );
    }

    #[test]
    fn bogus_offset_table_falls_back_to_heuristics() {
        // offsets that land on no fragment boundary
        let mut store = store_with_fragments(2, &[100, 100, 100, 100]);
        store.fragment_sequence_mut().set_offset_table(vec![0, 5]);

        let frame1 = store.get_frame_fragments(1).unwrap();
        assert_eq!(frame1.len(), 2);
        assert_eq!(frame1[0].len(), 100);
        assert_eq!(store.get_compressed_frame_size(1).unwrap(), 200);
    }

    #[test]
    fn equal_length_fragments_divide_over_frames() {
        let store = store_with_fragments(2, &[100, 100, 100, 100, 100, 100]);
        let frame1 = store.get_frame_fragments(1).unwrap();
        assert_eq!(frame1.len(), 3);

        let store = store_with_fragments(2, &[100, 100, 100]);
        assert!(matches!(
            store.get_frame_fragments(0).unwrap_err(),
            Error::InconsistentFragmentLayout {
                fragments: 3,
                frames: 2,
            }
        ));
    }

    #[test]
    fn irregular_fragments_split_on_short_terminals() {
        // each frame is full-length fragments closed by a shorter one
        let store = store_with_fragments(2, &[100, 100, 40, 100, 60]);

        let frame0 = store.get_frame_fragments(0).unwrap();
        assert_eq!(
            frame0.iter().map(|f| f.len()).collect::<Vec<_>>(),
            vec![100, 100, 40]
        );
        let frame1 = store.get_frame_fragments(1).unwrap();
        assert_eq!(
            frame1.iter().map(|f| f.len()).collect::<Vec<_>>(),
            vec![100, 60]
        );
    }

    #[test]
    fn frame_out_of_range() {
        let store = store_with_fragments(2, &[100, 100]);
        assert!(matches!(
            store.get_frame_fragments(2).unwrap_err(),
            Error::FrameOutOfRange { frame: 2, frames: 2 }
        ));
    }

    #[test]
    fn from_frame_builds_a_single_frame_store() {
        let mut message = InMemMessage::new(ts::JPEG_2000_LOSSLESS_ONLY);
        message.put_uint16(tags::NUMBER_OF_FRAMES, 7);
        let store = CompressedPixelData::from_frame(&message, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(store.descriptor().number_of_frames, 1);
        assert_eq!(store.fragment_sequence().fragments().len(), 1);
        assert_eq!(store.get_frame_fragment_data(0).unwrap(), vec![1, 2, 3, 4]);
    }

    struct FixedFrameCodec;

    impl PixelDataCodec for FixedFrameCodec {
        fn decode_frame(
            &self,
            frame: u32,
            source: &CompressedPixelData,
            target: &mut UncompressedPixelData,
            _parameters: &CodecParameters,
        ) -> Result<()> {
            let data = source.get_frame_fragment_data(frame)?;
            target.append_frame(&data);
            target.descriptor_mut().photometric_interpretation = "MONOCHROME2".to_string();
            Ok(())
        }
    }

    #[test]
    fn decoding_goes_through_the_registered_codec() {
        register_codec(ts::RLE_LOSSLESS.uid(), Arc::new(FixedFrameCodec));

        let store = store_with_fragments(3, &[16, 16, 16]);
        let (data, pi) = store.get_frame_with_photometric_interpretation(1).unwrap();
        assert_eq!(data, vec![1; 16]);
        assert_eq!(pi, "MONOCHROME2");
    }

    #[test]
    fn missing_codec_is_an_error() {
        let mut store = store_with_fragments(1, &[16]);
        store.descriptor_mut().transfer_syntax = ts::JPEG_EXTENDED;

        match store.get_frame(0).unwrap_err() {
            Error::CodecNotFound { uid, .. } => {
                assert_eq!(uid, ts::JPEG_EXTENDED.uid());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn update_writes_lossy_bookkeeping_and_fragments() {
        let mut store = store_with_fragments(1, &[16]);
        store.descriptor_mut().transfer_syntax = ts::JPEG_BASELINE;
        store.descriptor_mut().lossy_image_compression_ratio = 10.0;
        store.descriptor_mut().photometric_interpretation = "YBR_FULL_422".to_string();

        let mut dataset = InMemDataset::new();
        store.update_attribute_collection(&mut dataset);

        assert_eq!(
            dataset.string(tags::LOSSY_IMAGE_COMPRESSION).as_deref(),
            Some("01")
        );
        assert_eq!(
            dataset.float32(tags::LOSSY_IMAGE_COMPRESSION_RATIO),
            Some(10.0)
        );
        match dataset.pixel_data() {
            Some(PixelDataValue::Encapsulated(sequence)) => {
                assert_eq!(sequence.fragments().len(), 1);
            }
            other => panic!("unexpected pixel data: {:?}", other),
        }
    }
}
