//! Fixed-capacity status for realtime code paths.
//!
//! [`RtStatus`] stores its message inline in a `heapless::String`, so
//! creating, copying and formatting one never touches the heap. Messages
//! longer than [`MAX_RT_MESSAGE_LEN`] are truncated at a character boundary.

use core::fmt::{self, Write};

use static_assertions::const_assert;

/// Maximum length of an [`RtStatus`] message in bytes.
pub const MAX_RT_MESSAGE_LEN: usize = 120;

const_assert!(MAX_RT_MESSAGE_LEN >= 32);

/// Status codes usable from the realtime loop.
///
/// Numbering follows the canonical RPC code numbering so codes survive the
/// realtime boundary without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RtErrorCode {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
}

impl RtErrorCode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Cancelled),
            2 => Some(Self::Unknown),
            3 => Some(Self::InvalidArgument),
            4 => Some(Self::DeadlineExceeded),
            5 => Some(Self::NotFound),
            6 => Some(Self::AlreadyExists),
            7 => Some(Self::PermissionDenied),
            8 => Some(Self::ResourceExhausted),
            9 => Some(Self::FailedPrecondition),
            10 => Some(Self::Aborted),
            11 => Some(Self::OutOfRange),
            12 => Some(Self::Unimplemented),
            13 => Some(Self::Internal),
            14 => Some(Self::Unavailable),
            15 => Some(Self::DataLoss),
            _ => None,
        }
    }
}

/// A status value that is safe to create and pass around on the realtime
/// control thread. Message storage is inline and bounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtStatus {
    code: RtErrorCode,
    message: heapless::String<MAX_RT_MESSAGE_LEN>,
}

/// Realtime variant of a result-or-error.
///
/// `Result` stores either value by value, so with a realtime-safe `T` the
/// whole thing is realtime-safe.
pub type RtResult<T> = Result<T, RtStatus>;

impl RtStatus {
    /// Creates a status with `code` and `message`, truncating the message to
    /// [`MAX_RT_MESSAGE_LEN`] bytes at a character boundary.
    pub fn new(code: RtErrorCode, message: &str) -> Self {
        let mut out = heapless::String::new();
        for ch in message.chars() {
            if out.push(ch).is_err() {
                break;
            }
        }
        Self { code, message: out }
    }

    /// Creates a status from `format_args!`, truncating on overflow.
    ///
    /// This is the bounded-length interpolation entry point for realtime
    /// code: `RtStatus::format(code, format_args!("joint {i} out of range"))`.
    pub fn format(code: RtErrorCode, args: fmt::Arguments<'_>) -> Self {
        let mut writer = TruncatingWriter(heapless::String::new());
        // Overflow is reported as fmt::Error but the prefix is retained.
        let _ = writer.write_fmt(args);
        Self {
            code,
            message: writer.0,
        }
    }

    pub fn ok_status() -> Self {
        Self::new(RtErrorCode::Ok, "")
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::new(RtErrorCode::InvalidArgument, message)
    }

    pub fn failed_precondition(message: &str) -> Self {
        Self::new(RtErrorCode::FailedPrecondition, message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(RtErrorCode::NotFound, message)
    }

    pub fn aborted(message: &str) -> Self {
        Self::new(RtErrorCode::Aborted, message)
    }

    pub fn deadline_exceeded(message: &str) -> Self {
        Self::new(RtErrorCode::DeadlineExceeded, message)
    }

    pub fn resource_exhausted(message: &str) -> Self {
        Self::new(RtErrorCode::ResourceExhausted, message)
    }

    pub fn unimplemented(message: &str) -> Self {
        Self::new(RtErrorCode::Unimplemented, message)
    }

    pub fn internal(message: &str) -> Self {
        Self::new(RtErrorCode::Internal, message)
    }

    #[inline]
    pub const fn code(&self) -> RtErrorCode {
        self.code
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self.code, RtErrorCode::Ok)
    }
}

impl fmt::Display for RtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            write!(f, "OK")
        } else {
            write!(f, "{:?}: {}", self.code, self.message)
        }
    }
}

/// `fmt::Write` adapter that keeps as much of the output as fits.
struct TruncatingWriter(heapless::String<MAX_RT_MESSAGE_LEN>);

impl fmt::Write for TruncatingWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.0.push(ch).is_err() {
                return Err(fmt::Error);
            }
        }
        Ok(())
    }
}
