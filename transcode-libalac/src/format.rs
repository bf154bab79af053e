//! Stream format descriptions.

use serde::{Deserialize, Serialize};

use crate::DEFAULT_FRAMES_PER_PACKET;

/// PCM stream parameters handed to the backend when a session opens.
///
/// Values are not range checked here. The backend is the authority on which
/// combinations it accepts (bit depths of 16, 20, 24 or 32; 1 to 8 channels
/// for LibALAC) and reports rejections through its init status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Samples per second per channel (e.g. 44100, 48000).
    pub sample_rate: i32,
    /// Number of interleaved channels.
    pub channels: i32,
    /// Bit depth of one sample.
    pub bits_per_sample: i32,
    /// Sample frames carried by one packet (ALAC default 4096, AirPlay 352).
    pub frames_per_packet: i32,
}

impl FormatDescriptor {
    /// Create a descriptor.
    pub fn new(
        sample_rate: i32,
        channels: i32,
        bits_per_sample: i32,
        frames_per_packet: i32,
    ) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
            frames_per_packet,
        }
    }

    /// Create a descriptor with the default ALAC packet length.
    pub fn with_default_packet(sample_rate: i32, channels: i32, bits_per_sample: i32) -> Self {
        Self::new(
            sample_rate,
            channels,
            bits_per_sample,
            DEFAULT_FRAMES_PER_PACKET,
        )
    }
}

/// Encoder session setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Input PCM format.
    pub format: FormatDescriptor,
    /// Trade compression ratio for encoding speed.
    #[serde(default)]
    pub fast_mode: bool,
}

impl EncoderConfig {
    /// Create an encoder config in normal (non-fast) mode.
    pub fn new(format: FormatDescriptor) -> Self {
        Self {
            format,
            fast_mode: false,
        }
    }

    /// Enable or disable fast mode.
    pub fn with_fast_mode(mut self, fast_mode: bool) -> Self {
        self.fast_mode = fast_mode;
        self
    }
}

impl From<FormatDescriptor> for EncoderConfig {
    fn from(format: FormatDescriptor) -> Self {
        Self::new(format)
    }
}
