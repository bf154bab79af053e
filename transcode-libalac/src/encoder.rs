//! ALAC encoder session.

use std::sync::Arc;

use crate::backend::{AlacBackend, BackendSelector, Role};
use crate::cookie::{self, MagicCookie};
use crate::error::{Operation, Result};
use crate::format::EncoderConfig;
use crate::session::{Session, SessionState};

/// Encodes PCM packets into ALAC packets through one backend session.
///
/// The backend session is released by [`Encoder::finish`] or on drop.
#[derive(Debug)]
pub struct Encoder {
    session: Session,
    config: EncoderConfig,
}

impl Encoder {
    /// Open an encoder on the process-wide backend.
    pub fn new(config: impl Into<EncoderConfig>) -> Result<Self> {
        Self::with_backend(BackendSelector::global().backend(), config)
    }

    /// Open an encoder on `backend`.
    pub fn with_backend(
        backend: Arc<dyn AlacBackend>,
        config: impl Into<EncoderConfig>,
    ) -> Result<Self> {
        let config = config.into();
        let mut session = Session::new(backend, Role::Encode);
        session.initialize(config.format, config.fast_mode)?;
        Ok(Self { session, config })
    }

    /// Encode one packet of interleaved PCM.
    pub fn encode(&mut self, pcm: &[u8]) -> Result<Vec<u8>> {
        self.session.process(pcm)
    }

    /// Length of this encoder's magic cookie.
    pub fn magic_cookie_size(&self) -> Result<usize> {
        self.session.ensure_ready(Operation::GetMagicCookieSize)?;
        cookie::size(self.session.backend().as_ref(), self.session.token())
    }

    /// Fetch this encoder's magic cookie.
    pub fn magic_cookie(&self) -> Result<MagicCookie> {
        self.session.ensure_ready(Operation::GetMagicCookie)?;
        cookie::get(self.session.backend().as_ref(), self.session.token())
    }

    /// Release the backend session. Further calls are no-ops.
    pub fn finish(&mut self) {
        self.session.finish();
    }

    /// Configuration the encoder was opened with.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Samples per second.
    pub fn sample_rate(&self) -> i32 {
        self.config.format.sample_rate
    }

    /// Channel count.
    pub fn channels(&self) -> i32 {
        self.config.format.channels
    }

    /// Bit depth.
    pub fn bits_per_sample(&self) -> i32 {
        self.config.format.bits_per_sample
    }

    /// Sample frames per packet.
    pub fn frames_per_packet(&self) -> i32 {
        self.config.format.frames_per_packet
    }

    /// Size in bytes of one full PCM input packet.
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
    use crate::error::LibAlacError;
    use crate::mock::MockBackend;
    use crate::FormatDescriptor;

    fn backend() -> Arc<MockBackend> {
        Arc::new(MockBackend::new(PointerWidth::Bits64))
    }

    fn stereo_16() -> FormatDescriptor {
        FormatDescriptor::new(44100, 2, 16, 4096)
    }

    #[test]
    fn test_accessors_reflect_format() {
        let format = FormatDescriptor::new(48000, 2, 24, 352);
        let encoder = Encoder::with_backend(backend(), format).unwrap();
        assert_eq!(encoder.sample_rate(), 48000);
        assert_eq!(encoder.channels(), 2);
        assert_eq!(encoder.bits_per_sample(), 24);
        assert_eq!(encoder.frames_per_packet(), 352);
        assert_eq!(encoder.bytes_per_packet(), 2 * 3 * 352);
        assert!(!encoder.config().fast_mode);
    }

    #[test]
    fn test_20_bit_bytes_per_packet_scales_with_channels() {
        let format = FormatDescriptor::new(44100, 2, 20, 4096);
        let encoder = Encoder::with_backend(backend(), format).unwrap();
        assert_eq!(encoder.bytes_per_packet(), 20_480);
    }

    #[test]
    fn test_fast_mode_forwarded() {
        let mock = backend();
        let config = EncoderConfig::new(stereo_16()).with_fast_mode(true);
        let _encoder = Encoder::with_backend(mock.clone(), config).unwrap();
        assert_eq!(mock.last_fast_mode(), Some(true));
    }

    #[test]
    fn test_init_failure_surfaces() {
        let mock = backend();
        mock.fail_initialize(-1);
        let err = Encoder::with_backend(mock.clone(), stereo_16()).unwrap_err();
        assert!(matches!(
            err,
            LibAlacError::Initialization { operation: Operation::InitializeEncoder, .. }
        ));
        assert_eq!(mock.live_sessions(), 0);
    }

    #[test]
    fn test_cookie_after_finish_fails() {
        let mut encoder = Encoder::with_backend(backend(), stereo_16()).unwrap();
        assert!(encoder.magic_cookie().is_ok());

        encoder.finish();
        assert_eq!(encoder.state(), SessionState::Finished);
        assert!(matches!(
            encoder.magic_cookie_size(),
            Err(LibAlacError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_cookie_error_keeps_encoder_usable() {
        let mock = backend();
        let mut encoder = Encoder::with_backend(mock.clone(), stereo_16()).unwrap();
        mock.override_cookie_size(Some(0));
        assert!(encoder.magic_cookie().is_err());
        assert_eq!(encoder.encode(&[1, 2, 3, 4]).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_drop_finishes_once() {
        let mock = backend();
        {
            let mut encoder = Encoder::with_backend(mock.clone(), stereo_16()).unwrap();
            encoder.encode(&[0; 16]).unwrap();
            encoder.finish();
        }
        assert_eq!(mock.finish_calls(), 1);
    }
}
