//! netsort wire format — the only message that crosses a peer connection.
//!
//! Every frame on every connection is exactly 101 bytes:
//!
//!   [1 control byte][10-byte key][90-byte value]
//!
//! There is no handshake and no length prefix. A connection carries frames
//! in one direction only and ends with a single end-of-stream frame.
//! Changing anything here breaks compatibility with running peers.

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::record::{Key, Record, KEY_SIZE, RECORD_SIZE, VALUE_SIZE};

/// Size of one frame on the wire.
pub const FRAME_SIZE: usize = 1 + RECORD_SIZE;

// ── Frame ────────────────────────────────────────────────────────────────────

/// One transfer unit. All fields are byte arrays, so the layout has no
/// padding and the struct can be sent as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct Frame {
    /// See [`Control`].
    pub control: u8,
    pub key: Key,
    pub value: [u8; VALUE_SIZE],
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(Frame, [u8; FRAME_SIZE]);

impl Frame {
    /// The end-of-stream marker. Payload is zero-filled and ignored.
    pub fn end_of_stream() -> Self {
        Self {
            control: Control::EndOfStream.into(),
            key: [0u8; KEY_SIZE],
            value: [0u8; VALUE_SIZE],
        }
    }
}

// ── Control ──────────────────────────────────────────────────────────────────

/// Frame control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Control {
    /// Payload is a real record.
    Data = 0x00,
    /// No further frames follow on this connection.
    EndOfStream = 0x01,
}

impl TryFrom<u8> for Control {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Control::Data),
            0x01 => Ok(Control::EndOfStream),
            other => Err(WireError::UnknownControl(other)),
        }
    }
}

impl From<Control> for u8 {
    fn from(c: Control) -> u8 {
        c as u8
    }
}

// ── Codec ────────────────────────────────────────────────────────────────────

/// Build a frame carrying `record`.
pub fn encode(control: Control, record: &Record) -> Frame {
    Frame {
        control: control.into(),
        key: record.key,
        value: record.value,
    }
}

/// Interpret exactly `FRAME_SIZE` bytes as a frame.
///
/// For an end-of-stream frame the returned record is whatever the payload
/// held; callers must not treat it as data.
pub fn decode(bytes: &[u8]) -> Result<(Control, Record), WireError> {
    let frame = Frame::read_from(bytes).ok_or(WireError::BadLength(bytes.len()))?;
    decode_frame(&frame)
}

/// Validate the control byte of an already-read frame.
pub fn decode_frame(frame: &Frame) -> Result<(Control, Record), WireError> {
    let control = Control::try_from(frame.control)?;
    Ok((control, Record::new(frame.key, frame.value)))
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("unknown control byte: 0x{0:02x}")]
    UnknownControl(u8),

    #[error("frame must be {} bytes, got {0}", FRAME_SIZE)]
    BadLength(usize),
}
