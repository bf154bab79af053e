//! Packet buffer sizing.
//!
//! 20-bit samples are packed as 2.5 bytes, so the byte count for that depth
//! cannot be derived by whole-byte division. The encode and decode sides use
//! different 20-bit formulas: the decode side scales the 2.5 factor by the bit
//! depth and ignores the channel count, while the encode side scales it by the
//! channel count. Both are reproduced as-is and must not be merged.

use crate::backend::Role;
use crate::FormatDescriptor;

/// Which side of the codec a buffer is sized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// PCM in, ALAC packet out.
    Encode,
    /// ALAC packet in, PCM out.
    Decode,
}

impl From<Role> for Direction {
    fn from(role: Role) -> Self {
        match role {
            Role::Encode => Direction::Encode,
            Role::Decode => Direction::Decode,
        }
    }
}

/// Bytes per sample frame for `format` in `direction`.
pub fn bytes_per_frame(format: &FormatDescriptor, direction: Direction) -> i64 {
    let bits = i64::from(format.bits_per_sample);
    let channels = i64::from(format.channels);

    if format.bits_per_sample != 20 {
        return channels * (bits / 8);
    }

    // Truncating casts, matching the native library's (int)(x + .5).
    match direction {
        Direction::Decode => (bits as f64 * 2.5 + 0.5) as i64,
        Direction::Encode => (channels as f64 * 2.5 + 0.5) as i64,
    }
}

/// Byte capacity of one full packet of PCM for `format` in `direction`.
///
/// Formats the backend would reject can still produce a negative product;
/// those clamp to zero.
pub fn capacity(format: &FormatDescriptor, direction: Direction) -> usize {
    let bytes = bytes_per_frame(format, direction) * i64::from(format.frames_per_packet);
    usize::try_from(bytes).unwrap_or(0)
}
