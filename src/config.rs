use log::LevelFilter;

use crate::error::{Error, Result};

/// Page-level settings, overridable from the URL query string.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `id` of the visible canvas element.
    pub canvas_id: String,
    /// Frames per audio block; `None` lets the browser choose.
    pub buffer_size: Option<u32>,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            canvas_id: "c".to_string(),
            buffer_size: None,
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    /// Applies `canvas`, `bufferSize` and `log` overrides found through `lookup`.
    ///
    /// An unknown log level falls back to the default; a block size the audio
    /// engine cannot use is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(id) = lookup("canvas").filter(|id| !id.is_empty()) {
            config.canvas_id = id;
        }
        if let Some(raw) = lookup("bufferSize") {
            let size = raw
                .trim()
                .parse::<u32>()
                .map_err(|_| Error::UnparsableBufferSize(raw.clone()))?;
            config.buffer_size = Some(validate_buffer_size(size)?);
        }
        if let Some(level) = lookup("log").and_then(|raw| raw.parse().ok()) {
            config.log_level = level;
        }
        Ok(config)
    }
}

/// ScriptProcessor blocks are powers of two from 256 to 16384 frames.
pub fn validate_buffer_size(size: u32) -> Result<u32> {
    if size.is_power_of_two() && (256..=16384).contains(&size) {
        Ok(size)
    } else {
        Err(Error::InvalidBufferSize(size))
    }
}
