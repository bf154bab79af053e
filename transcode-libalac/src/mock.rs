//! Recording in-memory backend for tests.
//!
//! Encode and decode pass bytes through unchanged. Magic cookies use the
//! 24-byte ALACSpecificConfig layout, followed by a 24-byte channel layout
//! atom for more than two channels.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::backend::{AlacBackend, PointerWidth, RawToken, Role, Status, STATUS_UNAVAILABLE};
use crate::FormatDescriptor;

const CONFIG_LEN: usize = 24;
const CHANNEL_LAYOUT_LEN: usize = 24;

#[derive(Debug, Clone, Copy)]
struct MockSession {
    role: Role,
    format: FormatDescriptor,
}

#[derive(Debug, Default)]
struct MockState {
    next_token: usize,
    sessions: HashMap<RawToken, MockSession>,
    total_calls: usize,
    finish_calls: usize,
    init_status: Status,
    process_status: Status,
    finish_status: Status,
    reported_len: Option<i32>,
    cookie_size: Option<i32>,
    short_cookie: bool,
    last_output_len: Option<usize>,
    last_fast_mode: Option<bool>,
}

pub(crate) struct MockBackend {
    width: PointerWidth,
    state: Mutex<MockState>,
}

impl MockBackend {
    pub(crate) fn new(width: PointerWidth) -> Self {
        Self {
            width,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Make `initialize` fail with `status`; zero restores success.
    pub(crate) fn fail_initialize(&self, status: Status) {
        self.state.lock().init_status = status;
    }

    /// Make `process` fail with `status`; zero restores success.
    pub(crate) fn fail_process(&self, status: Status) {
        self.state.lock().process_status = status;
    }

    pub(crate) fn finish_status(&self, status: Status) {
        self.state.lock().finish_status = status;
    }

    /// Override the output length reported by `process`.
    pub(crate) fn report_len(&self, len: Option<i32>) {
        self.state.lock().reported_len = len;
    }

    pub(crate) fn override_cookie_size(&self, size: Option<i32>) {
        self.state.lock().cookie_size = size;
    }

    /// Fill one byte less than requested.
    pub(crate) fn short_cookie_fill(&self, short: bool) {
        self.state.lock().short_cookie = short;
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.state.lock().total_calls
    }

    pub(crate) fn finish_calls(&self) -> usize {
        self.state.lock().finish_calls
    }

    pub(crate) fn live_sessions(&self) -> usize {
        self.state.lock().sessions.len()
    }

    pub(crate) fn last_output_len(&self) -> Option<usize> {
        self.state.lock().last_output_len
    }

    pub(crate) fn last_fast_mode(&self) -> Option<bool> {
        self.state.lock().last_fast_mode
    }
}

fn owns(state: &MockState, token: RawToken, role: Role) -> bool {
    state
        .sessions
        .get(&token)
        .is_some_and(|session| session.role == role)
}

fn encoder_format(state: &MockState, token: RawToken) -> Option<FormatDescriptor> {
    state
        .sessions
        .get(&token)
        .filter(|session| session.role == Role::Encode)
        .map(|session| session.format)
}

fn cookie_len(format: &FormatDescriptor) -> usize {
    if format.channels > 2 {
        CONFIG_LEN + CHANNEL_LAYOUT_LEN
    } else {
        CONFIG_LEN
    }
}

fn write_cookie(format: &FormatDescriptor) -> Vec<u8> {
    let mut cookie = Vec::with_capacity(cookie_len(format));
    cookie.extend_from_slice(&(format.frames_per_packet as u32).to_be_bytes());
    cookie.push(0); // compatible version
    cookie.push(format.bits_per_sample as u8);
    cookie.push(40); // pb
    cookie.push(10); // mb
    cookie.push(14); // kb
    cookie.push(format.channels as u8);
    cookie.extend_from_slice(&255u16.to_be_bytes()); // max run
    cookie.extend_from_slice(&0u32.to_be_bytes()); // max frame bytes
    cookie.extend_from_slice(&0u32.to_be_bytes()); // avg bit rate
    cookie.extend_from_slice(&(format.sample_rate as u32).to_be_bytes());

    if format.channels > 2 {
        cookie.extend_from_slice(&(CHANNEL_LAYOUT_LEN as u32).to_be_bytes());
        cookie.extend_from_slice(b"chan");
        cookie.extend_from_slice(&0u32.to_be_bytes()); // version and flags
        let layout_tag = (format.channels as u32) | (0x7Bu32 << 16);
        cookie.extend_from_slice(&layout_tag.to_be_bytes());
        cookie.extend_from_slice(&0u32.to_be_bytes()); // channel bitmap
        cookie.extend_from_slice(&0u32.to_be_bytes()); // descriptions
    }
    cookie
}

fn read_cookie(data: &[u8]) -> Option<FormatDescriptor> {
    if data.len() < CONFIG_LEN {
        return None;
    }
    let frame_length = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let bit_depth = data[5];
    let num_channels = data[9];
    let sample_rate = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);

    Some(FormatDescriptor::new(
        sample_rate as i32,
        i32::from(num_channels),
        i32::from(bit_depth),
        frame_length as i32,
    ))
}

impl AlacBackend for MockBackend {
    fn pointer_width(&self) -> PointerWidth {
        self.width
    }

    fn initialize(
        &self,
        role: Role,
        format: &FormatDescriptor,
        fast_mode: bool,
    ) -> std::result::Result<RawToken, Status> {
        let mut state = self.state.lock();
        state.total_calls += 1;
        if state.init_status != 0 {
            return Err(state.init_status);
        }
        if !(1..=8).contains(&format.channels)
            || !matches!(format.bits_per_sample, 16 | 20 | 24 | 32)
        {
            return Err(STATUS_UNAVAILABLE);
        }

        if role == Role::Encode {
            state.last_fast_mode = Some(fast_mode);
        }
        state.next_token += 1;
        let token = RawToken::from_raw(0x1000 + state.next_token);
        state.sessions.insert(token, MockSession { role, format: *format });
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
        let mut state = self.state.lock();
        state.total_calls += 1;
        state.last_output_len = Some(output.len());

        if !owns(&state, token, role) {
            return STATUS_UNAVAILABLE;
        }
        if state.process_status != 0 {
            return state.process_status;
        }

        let declared = usize::try_from(*io_len).unwrap_or(0).min(input.len());
        let produced = declared.min(output.len());
        output[..produced].copy_from_slice(&input[..produced]);
        *io_len = state.reported_len.unwrap_or(produced as i32);
        0
    }

    fn finish(&self, role: Role, token: RawToken) -> Status {
        let mut state = self.state.lock();
        state.total_calls += 1;
        state.finish_calls += 1;

        if !owns(&state, token, role) {
            return STATUS_UNAVAILABLE;
        }
        state.sessions.remove(&token);
        state.finish_status
    }

    fn magic_cookie_size(&self, token: RawToken) -> i32 {
        let mut state = self.state.lock();
        state.total_calls += 1;
        if let Some(size) = state.cookie_size {
            return size;
        }
        match encoder_format(&state, token) {
            Some(format) => cookie_len(&format) as i32,
            None => STATUS_UNAVAILABLE,
        }
    }

    fn magic_cookie(&self, token: RawToken, out: &mut [u8]) -> i32 {
        let mut state = self.state.lock();
        state.total_calls += 1;
        let Some(format) = encoder_format(&state, token) else {
            return STATUS_UNAVAILABLE;
        };

        let cookie = write_cookie(&format);
        let len = cookie.len().min(out.len());
        out[..len].copy_from_slice(&cookie[..len]);
        if state.short_cookie {
            len as i32 - 1
        } else {
            len as i32
        }
    }

    fn parse_magic_cookie(&self, cookie: &[u8]) -> std::result::Result<FormatDescriptor, Status> {
        self.state.lock().total_calls += 1;
        read_cookie(cookie).ok_or(STATUS_UNAVAILABLE)
    }
}
