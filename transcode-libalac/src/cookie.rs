//! Magic cookie retrieval and parsing.
//!
//! The cookie is the codec's out-of-band format description. Its byte layout
//! belongs to the backend; this layer only sizes, fetches and hands it back.
//! A cookie is plain data and stays valid after the session that produced it
//! is closed.

use crate::backend::{AlacBackend, RawToken};
use crate::error::{LibAlacError, Operation, Result};
use crate::FormatDescriptor;

/// Backend-defined format description blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MagicCookie(Vec<u8>);

impl MagicCookie {
    /// Wrap cookie bytes received out of band.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Cookie bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take the cookie bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the cookie has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Recover the stream format through `backend`.
    pub fn parse(&self, backend: &dyn AlacBackend) -> Result<FormatDescriptor> {
        parse(backend, &self.0)
    }
}

impl AsRef<[u8]> for MagicCookie {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for MagicCookie {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Query the cookie length of the encoder session behind `token`.
pub fn size(backend: &dyn AlacBackend, token: RawToken) -> Result<usize> {
    let size = backend.magic_cookie_size(token);
    if size <= 0 {
        return Err(LibAlacError::from_status(Operation::GetMagicCookieSize, size));
    }
    Ok(size as usize)
}

/// Fetch the cookie of the encoder session behind `token`.
///
/// The backend must fill exactly the length it reported.
pub fn get(backend: &dyn AlacBackend, token: RawToken) -> Result<MagicCookie> {
    let size = size(backend, token)?;
    let mut cookie = vec![0u8; size];

    let written = backend.magic_cookie(token, &mut cookie);
    if usize::try_from(written).ok() != Some(size) {
        tracing::debug!(expected = size, written, "Magic cookie fill length mismatch");
        return Err(LibAlacError::from_status(Operation::GetMagicCookie, written));
    }
    Ok(MagicCookie(cookie))
}

/// Recover the stream format from a cookie. Needs no open session.
pub fn parse(backend: &dyn AlacBackend, cookie: &[u8]) -> Result<FormatDescriptor> {
    backend
        .parse_magic_cookie(cookie)
        .map_err(|status| LibAlacError::from_status(Operation::ParseMagicCookie, status))
}
