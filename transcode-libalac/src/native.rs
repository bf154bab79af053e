//! Bindings to the LibALAC shared library.
//!
//! # Safety
//!
//! All exports are raw C entry points. The library keeps one encoder and one
//! decoder in process-global state, so it hands out no handles of its own;
//! this binding issues a fresh token each time a role is opened and refuses
//! calls carrying any other token. The library writes a full packet into the
//! output buffer regardless of its length and reads as many input bytes as
//! the caller declares, so `process` checks both against the open role before
//! entering the library.

#![allow(non_camel_case_types)]

use std::os::raw::{c_int, c_uchar};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::backend::{AlacBackend, PointerWidth, RawToken, Role, Status, STATUS_UNAVAILABLE};
use crate::error::{LibAlacError, Result};
use crate::packet::{capacity, Direction};
use crate::{FormatDescriptor, ENCODE_HEADER_SLACK};

type InitializeEncoder_t = unsafe extern "C" fn(c_int, c_int, c_int, c_int, bool) -> c_int;
type InitializeDecoder_t = unsafe extern "C" fn(c_int, c_int, c_int, c_int) -> c_int;
type Process_t = unsafe extern "C" fn(*mut c_uchar, *mut c_uchar, *mut c_int) -> c_int;
type Finish_t = unsafe extern "C" fn() -> c_int;
type GetMagicCookieSize_t = unsafe extern "C" fn() -> c_int;
type GetMagicCookie_t = unsafe extern "C" fn(*mut c_uchar) -> c_int;
type ParseMagicCookie_t = unsafe extern "C" fn(
    *const c_uchar,
    c_int,
    *mut c_int,
    *mut c_int,
    *mut c_int,
    *mut c_int,
) -> c_int;

/// Resolved exports of one loaded library.
struct NativeLibrary {
    initialize_encoder: InitializeEncoder_t,
    encode: Process_t,
    finish_encoder: Finish_t,
    get_magic_cookie_size: GetMagicCookieSize_t,
    get_magic_cookie: GetMagicCookie_t,
    initialize_decoder: InitializeDecoder_t,
    decode: Process_t,
    finish_decoder: Finish_t,
    // Not exported by every build.
    parse_magic_cookie: Option<ParseMagicCookie_t>,
    _library: Library,
}

impl NativeLibrary {
    fn open(path: &Path) -> Result<Self> {
        let library = unsafe { Library::new(path) }.map_err(|e| load_error(path, e))?;

        unsafe {
            let initialize_encoder = symbol(&library, path, b"InitializeEncoder\0")?;
            let encode = symbol(&library, path, b"Encode\0")?;
            let finish_encoder = symbol(&library, path, b"FinishEncoder\0")?;
            let get_magic_cookie_size = symbol(&library, path, b"GetMagicCookieSize\0")?;
            let get_magic_cookie = symbol(&library, path, b"GetMagicCookie\0")?;
            let initialize_decoder = symbol(&library, path, b"InitializeDecoder\0")?;
            let decode = symbol(&library, path, b"Decode\0")?;
            let finish_decoder = symbol(&library, path, b"FinishDecoder\0")?;
            let parse_magic_cookie = symbol(&library, path, b"ParseMagicCookie\0").ok();

            Ok(Self {
                initialize_encoder,
                encode,
                finish_encoder,
                get_magic_cookie_size,
                get_magic_cookie,
                initialize_decoder,
                decode,
                finish_decoder,
                parse_magic_cookie,
                _library: library,
            })
        }
    }
}

unsafe fn symbol<T: Copy>(library: &Library, path: &Path, name: &[u8]) -> Result<T> {
    library
        .get::<T>(name)
        .map(|sym| *sym)
        .map_err(|e| load_error(path, e))
}

fn load_error(path: &Path, err: libloading::Error) -> LibAlacError {
    LibAlacError::LibraryLoad {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
struct LiveSlot {
    token: RawToken,
    capacity: usize,
}

/// Owners of the library's global encoder and decoder.
#[derive(Debug, Default)]
struct Slots {
    issued: usize,
    encoder: Option<LiveSlot>,
    decoder: Option<LiveSlot>,
}

impl Slots {
    fn slot_mut(&mut self, role: Role) -> &mut Option<LiveSlot> {
        match role {
            Role::Encode => &mut self.encoder,
            Role::Decode => &mut self.decoder,
        }
    }

    fn open(&mut self, role: Role, capacity: usize) -> RawToken {
        self.issued += 1;
        let token = RawToken::from_raw(self.issued);
        *self.slot_mut(role) = Some(LiveSlot { token, capacity });
        token
    }

    fn live(&self, role: Role, token: RawToken) -> Option<LiveSlot> {
        let slot = match role {
            Role::Encode => self.encoder,
            Role::Decode => self.decoder,
        };
        slot.filter(|slot| !token.is_null() && slot.token == token)
    }

    fn close(&mut self, role: Role, token: RawToken) -> bool {
        let open = self.live(role, token).is_some();
        if open {
            *self.slot_mut(role) = None;
        }
        open
    }
}

/// Whether one `Encode`/`Decode` call stays inside the caller's buffers.
///
/// Decode always writes a full packet of `capacity` bytes; encode writes at
/// most the declared input plus a packet header.
fn packet_fits(
    role: Role,
    capacity: usize,
    input_len: usize,
    output_len: usize,
    io_len: i32,
) -> bool {
    let Ok(declared) = usize::try_from(io_len) else {
        return false;
    };
    if declared > input_len {
        return false;
    }
    let needed = match role {
        Role::Encode => declared + ENCODE_HEADER_SLACK,
        Role::Decode => capacity,
    };
    output_len >= needed
}

/// One pointer-width build of LibALAC, opened on first use.
pub struct NativeBackend {
    width: PointerWidth,
    path: PathBuf,
    library: Mutex<Option<Arc<NativeLibrary>>>,
    // Held across every call into the library.
    slots: Mutex<Slots>,
}

impl NativeBackend {
    /// Create a binding for the build at `path`. Nothing is loaded yet.
    pub fn new(width: PointerWidth, path: impl Into<PathBuf>) -> Self {
        Self {
            width,
            path: path.into(),
            library: Mutex::new(None),
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Path of the library this binding opens.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the library now, reporting why it cannot be used.
    pub fn preload(&self) -> Result<()> {
        self.open().map(|_| ())
    }

    fn open(&self) -> Result<Arc<NativeLibrary>> {
        let mut slot = self.library.lock();
        if let Some(library) = slot.as_ref() {
            return Ok(Arc::clone(library));
        }

        let library = Arc::new(NativeLibrary::open(&self.path)?);
        debug!(path = %self.path.display(), width = %self.width, "Loaded LibALAC");
        *slot = Some(Arc::clone(&library));
        Ok(library)
    }

    fn library(&self) -> Option<Arc<NativeLibrary>> {
        match self.open() {
            Ok(library) => Some(library),
            Err(e) => {
                error!(width = %self.width, error = %e, "LibALAC unavailable");
                None
            }
        }
    }
}

impl AlacBackend for NativeBackend {
    fn pointer_width(&self) -> PointerWidth {
        self.width
    }

    fn initialize(
        &self,
        role: Role,
        format: &FormatDescriptor,
        fast_mode: bool,
    ) -> std::result::Result<RawToken, Status> {
        let library = self.library().ok_or(STATUS_UNAVAILABLE)?;
        let mut slots = self.slots.lock();
        let status = unsafe {
            match role {
                Role::Encode => (library.initialize_encoder)(
                    format.sample_rate,
                    format.channels,
                    format.bits_per_sample,
                    format.frames_per_packet,
                    fast_mode,
                ),
                Role::Decode => (library.initialize_decoder)(
                    format.sample_rate,
                    format.channels,
                    format.bits_per_sample,
                    format.frames_per_packet,
                ),
            }
        };

        if status != 0 {
            return Err(status);
        }
        let token = slots.open(role, capacity(format, Direction::from(role)));
        debug!(role = %role, token = %token, "Opened native slot");
        Ok(token)
    }

    fn process(
        &self,
        role: Role,
        token: RawToken,
        input: &[u8],
        output: &mut [u8],
        io_len: &mut i32,
    ) -> Status {
        let slots = self.slots.lock();
        let Some(slot) = slots.live(role, token) else {
            return STATUS_UNAVAILABLE;
        };
        if !packet_fits(role, slot.capacity, input.len(), output.len(), *io_len) {
            debug!(
                role = %role,
                declared = *io_len,
                input = input.len(),
                output = output.len(),
                "Refusing packet that overruns its buffers"
            );
            return STATUS_UNAVAILABLE;
        }
        let Some(library) = self.library() else {
            return STATUS_UNAVAILABLE;
        };
        let entry = match role {
            Role::Encode => library.encode,
            Role::Decode => library.decode,
        };
        // The library reads but never writes the input buffer.
        unsafe { entry(input.as_ptr().cast_mut(), output.as_mut_ptr(), io_len) }
    }

    fn finish(&self, role: Role, token: RawToken) -> Status {
        let mut slots = self.slots.lock();
        if !slots.close(role, token) {
            return STATUS_UNAVAILABLE;
        }
        let Some(library) = self.library() else {
            return STATUS_UNAVAILABLE;
        };
        unsafe {
            match role {
                Role::Encode => (library.finish_encoder)(),
                Role::Decode => (library.finish_decoder)(),
            }
        }
    }

    fn magic_cookie_size(&self, token: RawToken) -> i32 {
        let slots = self.slots.lock();
        if slots.live(Role::Encode, token).is_none() {
            return STATUS_UNAVAILABLE;
        }
        match self.library() {
            Some(library) => unsafe { (library.get_magic_cookie_size)() },
            None => STATUS_UNAVAILABLE,
        }
    }

    fn magic_cookie(&self, token: RawToken, out: &mut [u8]) -> i32 {
        let slots = self.slots.lock();
        if slots.live(Role::Encode, token).is_none() {
            return STATUS_UNAVAILABLE;
        }
        let Some(library) = self.library() else {
            return STATUS_UNAVAILABLE;
        };
        let needed = unsafe { (library.get_magic_cookie_size)() };
        if needed <= 0 || out.len() < needed as usize {
            return STATUS_UNAVAILABLE;
        }
        unsafe { (library.get_magic_cookie)(out.as_mut_ptr()) }
    }

    fn parse_magic_cookie(&self, cookie: &[u8]) -> std::result::Result<FormatDescriptor, Status> {
        let parse = self
            .library()
            .and_then(|library| library.parse_magic_cookie)
            .ok_or(STATUS_UNAVAILABLE)?;
        let len = c_int::try_from(cookie.len()).map_err(|_| STATUS_UNAVAILABLE)?;

        let mut format = FormatDescriptor::new(0, 0, 0, 0);
        let status = unsafe {
            parse(
                cookie.as_ptr(),
                len,
                &mut format.sample_rate,
                &mut format.channels,
                &mut format.bits_per_sample,
                &mut format.frames_per_packet,
            )
        };
        if status != 0 {
            return Err(status);
        }
        Ok(format)
    }
}
