//! The pixel data codec seam and its registry.
//!
//! Compression codecs live in external crates.
//! They plug into this crate by implementing [`PixelDataCodec`]
//! and registering under the transfer syntax UID they decode,
//! through [`register_codec`].
//! [`CompressedPixelData`](crate::CompressedPixelData) looks codecs up
//! by UID when a frame of native pixel data is requested.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::compressed::CompressedPixelData;
use crate::uncompressed::UncompressedPixelData;
use crate::Result;

/// Parameters handed to a codec on each operation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CodecParameters {
    /// The desired encoding quality, on the codec's own scale.
    pub quality: Option<u8>,
    /// The desired encoding effort, on the codec's own scale.
    pub effort: Option<u8>,
}

/// A pixel data compression codec.
///
/// Codecs may fail with any error value.
/// The [`whatever!`](snafu::whatever) macro builds a suitable
/// [`Error::Codec`](crate::Error) from a message or a source error.
pub trait PixelDataCodec: Send + Sync {
    /// Decode one frame of the compressed store into native pixel data,
    /// appending the frame to `target` and adjusting its descriptor
    /// to describe the decoded samples.
    fn decode_frame(
        &self,
        frame: u32,
        source: &CompressedPixelData,
        target: &mut UncompressedPixelData,
        parameters: &CodecParameters,
    ) -> Result<()>;
}

/// A registry of codecs, keyed by transfer syntax UID.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn PixelDataCodec>>,
}

impl CodecRegistry {
    /// Register a codec for the given transfer syntax UID,
    /// replacing any codec already registered under it.
    pub fn register(&mut self, uid: &str, codec: Arc<dyn PixelDataCodec>) {
        self.codecs.insert(trim_uid(uid).to_string(), codec);
    }

    /// Obtain the codec registered for the given transfer syntax UID.
    pub fn get(&self, uid: &str) -> Option<Arc<dyn PixelDataCodec>> {
        self.codecs.get(trim_uid(uid)).cloned()
    }
}

// UIDs may come padded with a trailing null byte
fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches('\0')
}

lazy_static! {
    static ref REGISTRY: RwLock<CodecRegistry> = RwLock::new(CodecRegistry::default());
}

/// Register a codec in the global registry
/// for the given transfer syntax UID.
pub fn register_codec(uid: &str, codec: Arc<dyn PixelDataCodec>) {
    REGISTRY
        .write()
        .expect("codec registry poisoned")
        .register(uid, codec);
}

/// Look up the codec registered for the given transfer syntax UID.
pub fn get_codec(uid: &str) -> Option<Arc<dyn PixelDataCodec>> {
    REGISTRY
        .read()
        .expect("codec registry poisoned")
        .get(uid)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NopCodec;

    impl PixelDataCodec for NopCodec {
        fn decode_frame(
            &self,
            _frame: u32,
            _source: &CompressedPixelData,
            _target: &mut UncompressedPixelData,
            _parameters: &CodecParameters,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn registry_lookup_ignores_trailing_null() {
        let mut registry = CodecRegistry::default();
        assert!(registry.get("1.2.840.10008.1.2.5").is_none());

        registry.register("1.2.840.10008.1.2.5", Arc::new(NopCodec));
        assert!(registry.get("1.2.840.10008.1.2.5").is_some());
        assert!(registry.get("1.2.840.10008.1.2.5\0").is_some());
        assert!(registry.get("1.2.840.10008.1.2.4.50").is_none());
    }
}
