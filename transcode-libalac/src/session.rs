//! Instance-scoped session lifecycle.
//!
//! A [`Session`] owns at most one backend token. It moves
//! `Uninitialized -> Ready -> Finished` and releases the token exactly once,
//! either through [`Session::finish`] or when it is dropped.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{AlacBackend, RawToken, Role, Status};
use crate::error::{LibAlacError, Operation, Result};
use crate::packet;
use crate::{FormatDescriptor, ENCODE_HEADER_SLACK};

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No token held yet, or initialization failed.
    Uninitialized,
    /// Token held; packets may be processed.
    Ready,
    /// Token released. Terminal.
    Finished,
}

/// One backend encode or decode session.
pub struct Session {
    backend: Arc<dyn AlacBackend>,
    role: Role,
    state: SessionState,
    token: RawToken,
    format: Option<FormatDescriptor>,
    capacity: usize,
    init_attempted: bool,
}

impl Session {
    /// Create an uninitialized session bound to `backend`.
    pub fn new(backend: Arc<dyn AlacBackend>, role: Role) -> Self {
        Self {
            backend,
            role,
            state: SessionState::Uninitialized,
            token: RawToken::NULL,
            format: None,
            capacity: 0,
            init_attempted: false,
        }
    }

    /// Open the backend session for `format`.
    ///
    /// Can be attempted once. On failure the session stays
    /// [`SessionState::Uninitialized`] and cannot be initialized again.
    pub fn initialize(&mut self, format: FormatDescriptor, fast_mode: bool) -> Result<()> {
        let operation = Operation::initialize(self.role);
        if self.state != SessionState::Uninitialized || self.init_attempted {
            return Err(LibAlacError::InvalidState {
                operation,
                state: self.state,
            });
        }
        self.init_attempted = true;

        let token = match self.backend.initialize(self.role, &format, fast_mode) {
            Ok(token) if !token.is_null() => token,
            Ok(_) => return Err(LibAlacError::from_status(operation, 0)),
            Err(status) => {
                debug!(role = %self.role, status, "Backend rejected session");
                return Err(LibAlacError::from_status(operation, status));
            }
        };

        self.capacity = packet::capacity(&format, self.role.into());
        self.format = Some(format);
        self.token = token;
        self.state = SessionState::Ready;

        info!(
            role = %self.role,
            token = %token,
            width = %self.backend.pointer_width(),
            capacity = self.capacity,
            "Opened LibALAC session"
        );
        Ok(())
    }

    /// Run one packet through the backend.
    ///
    /// A failed packet leaves the session [`SessionState::Ready`].
    pub fn process(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.ensure_ready(Operation::process(self.role))?;
        run_packet(
            self.backend.as_ref(),
            self.role,
            self.token,
            self.capacity,
            input,
        )
    }

    /// Close the session.
    ///
    /// Idempotent. A nonzero backend finish status is logged and dropped;
    /// closing never fails.
    pub fn finish(&mut self) {
        if let Some(status) = self.release() {
            if status != 0 {
                warn!(role = %self.role, status, "Ignoring nonzero finish status");
            }
        }
    }

    /// Move to [`SessionState::Finished`], calling the backend's finish entry
    /// point only if a token is held. Returns the backend status if it was
    /// called.
    pub(crate) fn release(&mut self) -> Option<Status> {
        let previous = std::mem::replace(&mut self.state, SessionState::Finished);
        if previous != SessionState::Ready {
            return None;
        }

        let token = std::mem::replace(&mut self.token, RawToken::NULL);
        let status = self.backend.finish(self.role, token);
        info!(role = %self.role, token = %token, status, "Closed LibALAC session");
        Some(status)
    }

    pub(crate) fn ensure_ready(&self, operation: Operation) -> Result<()> {
        if self.state == SessionState::Ready {
            Ok(())
        } else {
            Err(LibAlacError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Role this session was created for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Held token, or [`RawToken::NULL`] when not ready.
    pub fn token(&self) -> RawToken {
        self.token
    }

    /// Format the session was opened with.
    pub fn format(&self) -> Option<&FormatDescriptor> {
        self.format.as_ref()
    }

    /// Packet capacity fixed at initialization, zero before.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Backend binding the token belongs to.
    pub fn backend(&self) -> &Arc<dyn AlacBackend> {
        &self.backend
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.finish();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("token", &self.token)
            .field("format", &self.format)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Hand one packet to `backend` and trim the output to the reported length.
///
/// Decode output is sized to `decode_capacity`; encode output to the input
/// length plus [`ENCODE_HEADER_SLACK`].
pub(crate) fn run_packet(
    backend: &dyn AlacBackend,
    role: Role,
    token: RawToken,
    decode_capacity: usize,
    input: &[u8],
) -> Result<Vec<u8>> {
    let operation = Operation::process(role);
    let mut io_len = i32::try_from(input.len()).map_err(|_| LibAlacError::BufferTooLarge {
        operation,
        len: input.len(),
    })?;

    let size = match role {
        Role::Encode => input.len() + ENCODE_HEADER_SLACK,
        Role::Decode => decode_capacity,
    };
    let mut output = vec![0u8; size];

    let status = backend.process(role, token, input, &mut output, &mut io_len);
    if status != 0 {
        debug!(role = %role, token = %token, status, "Packet rejected");
        return Err(LibAlacError::from_status(operation, status));
    }

    let produced = usize::try_from(io_len).unwrap_or(0);
    if produced < output.len() {
        output.truncate(produced);
    }
    Ok(output)
}
