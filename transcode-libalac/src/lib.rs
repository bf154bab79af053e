//! Session layer over the native LibALAC Apple Lossless codec library.
//!
//! The compression itself happens inside LibALAC, reached through the
//! [`AlacBackend`] calling contract. This crate handles what sits around it:
//!
//! - Packet buffer sizing, including the 20-bit special case
//! - The `initialize -> process -> finish` session lifecycle
//! - Selecting the 32-bit or 64-bit library build for the running process
//! - Magic cookie retrieval and parsing for out-of-band format negotiation
//!
//! ## Example
//!
//! ```ignore
//! use transcode_libalac::{Decoder, Encoder, FormatDescriptor};
//!
//! let format = FormatDescriptor::new(44100, 2, 16, 4096);
//! let mut encoder = Encoder::new(format)?;
//! let cookie = encoder.magic_cookie()?;
//! let packet = encoder.encode(&pcm)?;
//!
//! let remote = Decoder::parse_magic_cookie(cookie.as_bytes())?;
//! let mut decoder = Decoder::new(remote)?;
//! let pcm = decoder.decode(&packet)?;
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod cookie;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;
pub mod global;
pub mod native;
pub mod packet;
pub mod session;

#[cfg(test)]
mod mock;

pub use backend::{AlacBackend, BackendSelector, PointerWidth, RawToken, Role, Status};
pub use config::LibraryConfig;
pub use cookie::MagicCookie;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{LibAlacError, Operation, Result};
pub use format::{EncoderConfig, FormatDescriptor};
pub use global::GlobalSession;
pub use native::NativeBackend;
pub use packet::{capacity, Direction};
pub use session::{Session, SessionState};

/// Extra output bytes allowed beyond the input length when encoding.
pub const ENCODE_HEADER_SLACK: usize = 7;

/// Default frames per packet.
pub const DEFAULT_FRAMES_PER_PACKET: i32 = 4096;

/// Frames per packet used by AirPlay streams.
pub const AIRPLAY_FRAMES_PER_PACKET: i32 = 352;
