//! Process-wide session slots.
//!
//! [`GlobalSession`] keeps one encoder and one decoder [`Session`] for the
//! whole process, mirroring the native library's own global state. Unlike the
//! instance API it performs no state checks: calls made before the slot is
//! initialized go to the backend with the null token and the backend's status
//! decides the outcome. Closing a slot reports a nonzero backend status as
//! [`LibAlacError::Finalization`].

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::debug;

use crate::backend::{AlacBackend, BackendSelector, RawToken, Role};
use crate::cookie::{self, MagicCookie};
use crate::error::{LibAlacError, Operation, Result};
use crate::format::EncoderConfig;
use crate::session::{run_packet, Session, SessionState};
use crate::FormatDescriptor;

static GLOBAL_SESSION: OnceLock<GlobalSession> = OnceLock::new();

/// One encoder slot and one decoder slot shared by the process.
pub struct GlobalSession {
    backend: Arc<dyn AlacBackend>,
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
}

impl GlobalSession {
    /// Create slots bound to the binding `selector` picks.
    pub fn new(selector: &BackendSelector) -> Self {
        let backend = selector.backend();
        Self {
            encoder: Mutex::new(Session::new(Arc::clone(&backend), Role::Encode)),
            decoder: Mutex::new(Session::new(Arc::clone(&backend), Role::Decode)),
            backend,
        }
    }

    /// The process-wide instance, bound to [`BackendSelector::global`].
    pub fn instance() -> &'static GlobalSession {
        GLOBAL_SESSION.get_or_init(|| Self::new(BackendSelector::global()))
    }

    /// Open the encoder slot.
    ///
    /// A slot that is already open is replaced once the new session is up;
    /// the old one is released.
    pub fn initialize_encoder(&self, config: impl Into<EncoderConfig>) -> Result<()> {
        let config = config.into();
        self.initialize(Role::Encode, config.format, config.fast_mode)
    }

    /// Encode one PCM packet in the encoder slot.
    pub fn encode(&self, pcm: &[u8]) -> Result<Vec<u8>> {
        self.process(Role::Encode, pcm)
    }

    /// Length of the encoder slot's magic cookie.
    pub fn magic_cookie_size(&self) -> Result<usize> {
        let token = self.encoder.lock().token();
        cookie::size(self.backend.as_ref(), token)
    }

    /// Fetch the encoder slot's magic cookie.
    pub fn magic_cookie(&self) -> Result<MagicCookie> {
        let token = self.encoder.lock().token();
        cookie::get(self.backend.as_ref(), token)
    }

    /// Close the encoder slot, reporting the backend's finish status.
    pub fn finish_encoder(&self) -> Result<()> {
        self.finish(Role::Encode)
    }

    /// Open the decoder slot.
    pub fn initialize_decoder(&self, format: FormatDescriptor) -> Result<()> {
        self.initialize(Role::Decode, format, false)
    }

    /// Decode one ALAC packet in the decoder slot.
    pub fn decode(&self, packet: &[u8]) -> Result<Vec<u8>> {
        self.process(Role::Decode, packet)
    }

    /// Close the decoder slot, reporting the backend's finish status.
    pub fn finish_decoder(&self) -> Result<()> {
        self.finish(Role::Decode)
    }

    /// Recover a stream format from a magic cookie.
    pub fn parse_magic_cookie(&self, cookie: &[u8]) -> Result<FormatDescriptor> {
        cookie::parse(self.backend.as_ref(), cookie)
    }

    /// State of the slot for `role`.
    pub fn state(&self, role: Role) -> SessionState {
        self.slot(role).lock().state()
    }

    fn slot(&self, role: Role) -> &Mutex<Session> {
        match role {
            Role::Encode => &self.encoder,
            Role::Decode => &self.decoder,
        }
    }

    fn initialize(&self, role: Role, format: FormatDescriptor, fast_mode: bool) -> Result<()> {
        let mut fresh = Session::new(Arc::clone(&self.backend), role);
        fresh.initialize(format, fast_mode)?;

        let previous = std::mem::replace(&mut *self.slot(role).lock(), fresh);
        drop(previous);
        Ok(())
    }

    fn process(&self, role: Role, input: &[u8]) -> Result<Vec<u8>> {
        let mut slot = self.slot(role).lock();
        if slot.state() == SessionState::Ready {
            return slot.process(input);
        }

        debug!(role = %role, state = ?slot.state(), "Forwarding packet without an open slot");
        run_packet(self.backend.as_ref(), role, RawToken::NULL, 0, input)
    }

    fn finish(&self, role: Role) -> Result<()> {
        let operation = Operation::finish(role);
        let status = match self.slot(role).lock().release() {
            Some(status) => status,
            None => {
                debug!(role = %role, "Forwarding finish without an open slot");
                self.backend.finish(role, RawToken::NULL)
            }
        };

        if status != 0 {
            return Err(LibAlacError::from_status(operation, status));
        }
        Ok(())
    }
}

impl std::fmt::Debug for GlobalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalSession")
            .field("width", &self.backend.pointer_width())
            .field("encoder", &self.encoder.lock().state())
            .field("decoder", &self.decoder.lock().state())
            .finish()
    }
}
