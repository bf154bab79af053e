//! ALAC decoder session.

use std::sync::Arc;

use crate::backend::{AlacBackend, BackendSelector, Role};
use crate::cookie;
use crate::error::Result;
use crate::session::{Session, SessionState};
use crate::FormatDescriptor;

/// Decodes ALAC packets into interleaved PCM through one backend session.
#[derive(Debug)]
pub struct Decoder {
    session: Session,
    format: FormatDescriptor,
}

impl Decoder {
    /// Open a decoder on the process-wide backend.
    pub fn new(format: FormatDescriptor) -> Result<Self> {
        Self::with_backend(BackendSelector::global().backend(), format)
    }

    /// Open a decoder on `backend`.
    pub fn with_backend(backend: Arc<dyn AlacBackend>, format: FormatDescriptor) -> Result<Self> {
        let mut session = Session::new(backend, Role::Decode);
        session.initialize(format, false)?;
        Ok(Self { session, format })
    }

    /// Open a decoder for the stream a magic cookie describes.
    pub fn from_magic_cookie(backend: Arc<dyn AlacBackend>, cookie: &[u8]) -> Result<Self> {
        let format = cookie::parse(backend.as_ref(), cookie)?;
        Self::with_backend(backend, format)
    }

    /// Recover the stream format from a magic cookie on the process-wide
    /// backend. No session is opened.
    pub fn parse_magic_cookie(cookie: &[u8]) -> Result<FormatDescriptor> {
        cookie::parse(BackendSelector::global().backend().as_ref(), cookie)
    }

    /// Decode one ALAC packet.
    ///
    /// The result holds exactly the bytes the backend reported, at most
    /// [`Decoder::bytes_per_packet`].
    pub fn decode(&mut self, packet: &[u8]) -> Result<Vec<u8>> {
        self.session.process(packet)
    }

    /// Release the backend session. Further calls are no-ops.
    pub fn finish(&mut self) {
        self.session.finish();
    }

    /// Stream format.
    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    /// Capacity of one decoded PCM packet.
    pub fn bytes_per_packet(&self) -> usize {
        self.session.capacity()
    }

    /// Lifecycle state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PointerWidth;
    use crate::encoder::Encoder;
    use crate::error::LibAlacError;
    use crate::mock::MockBackend;

    #[test]
    fn test_decoder_capacity() {
        let backend = Arc::new(MockBackend::new(PointerWidth::Bits64));
        let format = FormatDescriptor::new(44100, 2, 20, 4096);
        let decoder = Decoder::with_backend(backend, format).unwrap();
        assert_eq!(decoder.bytes_per_packet(), 204_800);
        assert_eq!(decoder.state(), SessionState::Ready);
    }

    #[test]
    fn test_decoder_from_remote_cookie() {
        let backend = Arc::new(MockBackend::new(PointerWidth::Bits64));
        let format = FormatDescriptor::new(44100, 2, 16, 352);
        let cookie = Encoder::with_backend(backend.clone(), format)
            .unwrap()
            .magic_cookie()
            .unwrap();

        let decoder = Decoder::from_magic_cookie(backend.clone(), cookie.as_bytes()).unwrap();
        assert_eq!(decoder.format(), &format);
        assert_eq!(backend.live_sessions(), 1);
    }

    #[test]
    fn test_bad_cookie_opens_nothing() {
        let backend = Arc::new(MockBackend::new(PointerWidth::Bits64));
        let err = Decoder::from_magic_cookie(backend.clone(), &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, LibAlacError::MagicCookie { .. }));
        assert_eq!(backend.live_sessions(), 0);
    }

    #[test]
    fn test_decode_failure_then_recover() {
        let backend = Arc::new(MockBackend::new(PointerWidth::Bits64));
        let format = FormatDescriptor::new(44100, 2, 16, 4096);
        let mut decoder = Decoder::with_backend(backend.clone(), format).unwrap();

        backend.fail_process(-1);
        assert!(decoder.decode(&[5; 8]).is_err());
        backend.fail_process(0);
        assert_eq!(decoder.decode(&[5; 8]).unwrap(), vec![5; 8]);
    }

    #[test]
    fn test_finish_twice() {
        let backend = Arc::new(MockBackend::new(PointerWidth::Bits64));
        let format = FormatDescriptor::new(44100, 2, 16, 4096);
        let mut decoder = Decoder::with_backend(backend.clone(), format).unwrap();
        decoder.finish();
        decoder.finish();
        drop(decoder);
        assert_eq!(backend.finish_calls(), 1);
    }
}
