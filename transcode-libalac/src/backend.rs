//! Backend calling contract and pointer-width selection.
//!
//! LibALAC ships as two builds with identical exports, one per process
//! pointer width. Both are reached through [`AlacBackend`]; the
//! [`BackendSelector`] picks one binding when it is built and hands out only
//! that one afterwards, so a token is never passed to the other build.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::config::LibraryConfig;
use crate::error::{LibAlacError, Result};
use crate::native::NativeBackend;
use crate::FormatDescriptor;

/// Backend status code. Zero is success.
pub type Status = i32;

/// Status the native library returns when no session is open or it cannot run.
pub const STATUS_UNAVAILABLE: Status = -1;

/// Which codec side a session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// PCM to ALAC.
    Encode,
    /// ALAC to PCM.
    Decode,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => f.write_str("encode"),
            Self::Decode => f.write_str("decode"),
        }
    }
}

/// Opaque handle for one live backend session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawToken(usize);

impl RawToken {
    /// The invalid token. Passed to the backend when no session is open.
    pub const NULL: RawToken = RawToken(0);

    /// Wrap a backend-issued handle value.
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Handle value as issued by the backend.
    pub const fn as_raw(&self) -> usize {
        self.0
    }

    /// Check if this is the invalid token.
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Process pointer width a native build targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerWidth {
    /// 32-bit build (`LibALAC32`).
    Bits32,
    /// 64-bit build (`LibALAC64`).
    Bits64,
}

impl PointerWidth {
    /// Pointer width of the running process.
    pub const fn host() -> Self {
        if cfg!(target_pointer_width = "64") {
            Self::Bits64
        } else {
            Self::Bits32
        }
    }
}

impl fmt::Display for PointerWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bits32 => f.write_str("32-bit"),
            Self::Bits64 => f.write_str("64-bit"),
        }
    }
}

/// Calling contract of a LibALAC build.
///
/// Every call is blocking and the backend is not assumed re-entrant:
/// callers serialize access per token.
pub trait AlacBackend: Send + Sync {
    /// Pointer width this binding was built for.
    fn pointer_width(&self) -> PointerWidth;

    /// Open a session. `fast_mode` is only meaningful for [`Role::Encode`].
    fn initialize(
        &self,
        role: Role,
        format: &FormatDescriptor,
        fast_mode: bool,
    ) -> std::result::Result<RawToken, Status>;

    /// Run one packet through the session.
    ///
    /// `io_len` carries the input length in and the produced output length
    /// out.
    fn process(
        &self,
        role: Role,
        token: RawToken,
        input: &[u8],
        output: &mut [u8],
        io_len: &mut i32,
    ) -> Status;

    /// Close a session and release the token.
    fn finish(&self, role: Role, token: RawToken) -> Status;

    /// Length of the encoder's magic cookie. Non-positive means failure.
    fn magic_cookie_size(&self, token: RawToken) -> i32;

    /// Fill `out` with the encoder's magic cookie and return the length written.
    fn magic_cookie(&self, token: RawToken, out: &mut [u8]) -> i32;

    /// Recover the stream format from a magic cookie.
    fn parse_magic_cookie(&self, cookie: &[u8]) -> std::result::Result<FormatDescriptor, Status>;
}

static GLOBAL_SELECTOR: OnceLock<BackendSelector> = OnceLock::new();

/// Chooses between the 32-bit and 64-bit bindings.
#[derive(Clone)]
pub struct BackendSelector {
    width: PointerWidth,
    bits32: Arc<dyn AlacBackend>,
    bits64: Arc<dyn AlacBackend>,
}

impl BackendSelector {
    /// Create a selector for the host pointer width.
    pub fn new(bits32: Arc<dyn AlacBackend>, bits64: Arc<dyn AlacBackend>) -> Self {
        Self::with_width(PointerWidth::host(), bits32, bits64)
    }

    /// Create a selector pinned to `width`.
    pub fn with_width(
        width: PointerWidth,
        bits32: Arc<dyn AlacBackend>,
        bits64: Arc<dyn AlacBackend>,
    ) -> Self {
        Self {
            width,
            bits32,
            bits64,
        }
    }

    /// Selector over the two native library builds described by `config`.
    ///
    /// Neither library is opened until the selected binding is first called.
    pub fn native(config: &LibraryConfig) -> Self {
        Self::new(
            Arc::new(NativeBackend::new(
                PointerWidth::Bits32,
                config.library_path(PointerWidth::Bits32),
            )),
            Arc::new(NativeBackend::new(
                PointerWidth::Bits64,
                config.library_path(PointerWidth::Bits64),
            )),
        )
    }

    /// Width the selector dispatches to.
    pub fn width(&self) -> PointerWidth {
        self.width
    }

    /// The selected binding.
    pub fn backend(&self) -> Arc<dyn AlacBackend> {
        match self.width {
            PointerWidth::Bits32 => Arc::clone(&self.bits32),
            PointerWidth::Bits64 => Arc::clone(&self.bits64),
        }
    }

    /// Process-wide selector.
    ///
    /// Built from [`LibraryConfig::from_env`] on first use unless one was
    /// installed before.
    pub fn global() -> &'static BackendSelector {
        GLOBAL_SELECTOR.get_or_init(|| {
            let selector = Self::native(&LibraryConfig::from_env());
            tracing::debug!(width = %selector.width, "Selected native LibALAC binding");
            selector
        })
    }

    /// Install the process-wide selector. Fails once it has been fixed.
    pub fn install(selector: BackendSelector) -> Result<()> {
        GLOBAL_SELECTOR
            .set(selector)
            .map_err(|_| LibAlacError::SelectorInstalled)
    }
}

impl fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelector")
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}
