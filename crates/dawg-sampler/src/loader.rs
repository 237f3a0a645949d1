//! Decode-from-URL capability.

use crate::{decode_wav, Error, Result};
use dawg_core::AudioBuffer;
use std::path::Path;

/// Loads a sample buffer from a URL.
pub trait SampleLoader: Send + Sync {
    fn load(&self, url: &str) -> Result<AudioBuffer>;
}

/// Loads WAV files from `file://` URLs or plain paths.
#[derive(Debug, Clone, Default)]
pub struct FileSampleLoader;

impl FileSampleLoader {
    pub fn new() -> Self {
        Self
    }
}

impl SampleLoader for FileSampleLoader {
    fn load(&self, url: &str) -> Result<AudioBuffer> {
        let path = match url.split_once("://") {
            Some(("file", rest)) => rest,
            Some((scheme, _)) => {
                return Err(Error::Decode(format!("unsupported URL scheme '{scheme}'")));
            }
            None => url,
        };
        let bytes = std::fs::read(Path::new(path))?;
        tracing::debug!(path, bytes = bytes.len(), "loading sample");
        decode_wav(&bytes)
    }
}
