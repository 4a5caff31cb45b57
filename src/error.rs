//! Error types for S7 communication.
//!
//! This module defines the [`S7Error`] enum and the [`Result`] type alias
//! used throughout the library for error handling.
//!
//! # Error Categories
//!
//! Errors are categorized into several types:
//!
//! - **Transport errors** - TCP connect/send/receive failures and timeouts
//! - **Framing errors** - invalid ISO (TPKT/COTP) frames
//! - **Negotiation errors** - failed ISO connection or PDU length negotiation
//! - **Protocol errors** - non-zero S7 status words and CPU-side error codes
//! - **Client preconditions** - request too large, too many items, buffer
//!   too small
//!
//! Every variant carries a stable numeric code ([`S7Error::code`]) so that
//! callers integrating with external dashboards can keep reporting the same
//! integers the protocol family has always used.
//!
//! # Example
//!
//! ```no_run
//! use s7comm::{Area, Client, ClientConfig, DataType, S7Error};
//!
//! let mut client = Client::new(ClientConfig::new("192.168.0.1"));
//! client.connect()?;
//!
//! let mut buf = [0u8; 10];
//! match client.read_area(Area::DataBlock, 1, 0, 10, DataType::Byte, &mut buf) {
//!     Ok(()) => println!("DB1: {:?}", buf),
//!     Err(S7Error::TcpDataRecvTimeout) => println!("PLC did not answer in time"),
//!     Err(S7Error::Cpu(e)) => println!("CPU refused the request: {}", e),
//!     Err(e) => println!("error {:#06x}: {}", e.code(), e),
//! }
//! # Ok::<(), S7Error>(())
//! ```

use std::io;
use thiserror::Error;

/// Result type alias for S7 operations.
pub type Result<T> = std::result::Result<T, S7Error>;

/// CPU-side error reported inside an S7 reply.
///
/// The PLC reports these as raw status bytes/words; [`cpu_error`] maps them
/// to this enum so callers never have to interpret raw codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    /// The address is past the end of the area (or the DB is optimized).
    AddressOutOfRange,
    /// The transport size is not supported for this access.
    InvalidTransportSize,
    /// Write request length does not match the addressed range.
    WriteDataSizeMismatch,
    /// The item (typically the DB) does not exist in the CPU.
    ItemNotAvailable,
    /// The requested data does not fit into a single PDU.
    DataOverPdu,
    /// The CPU rejected the supplied value.
    InvalidValue,
    /// The function is not available on this CPU.
    FunctionNotAvailable,
    /// The CPU requires a session password for this operation.
    NeedPassword,
    /// The supplied session password is wrong.
    InvalidPassword,
    /// There is no password to set or clear.
    NoPasswordToSetOrClear,
    /// Any other non-zero status; the raw code is preserved.
    Refused(u16),
}

impl CpuError {
    /// Returns a human-readable description of the CPU error.
    pub fn description(self) -> &'static str {
        match self {
            CpuError::AddressOutOfRange => "Address out of range",
            CpuError::InvalidTransportSize => "Invalid transport size",
            CpuError::WriteDataSizeMismatch => "Write data size mismatch",
            CpuError::ItemNotAvailable => "Item not available",
            CpuError::DataOverPdu => "Data size exceeds the PDU",
            CpuError::InvalidValue => "Invalid value supplied",
            CpuError::FunctionNotAvailable => "Function not available",
            CpuError::NeedPassword => "Session password required",
            CpuError::InvalidPassword => "Invalid session password",
            CpuError::NoPasswordToSetOrClear => "No password to set or clear",
            CpuError::Refused(_) => "Function refused by the CPU",
        }
    }

    /// Returns the stable numeric code of this CPU error.
    pub fn code(self) -> u16 {
        match self {
            CpuError::AddressOutOfRange => 0x0101,
            CpuError::InvalidTransportSize => 0x0102,
            CpuError::WriteDataSizeMismatch => 0x0103,
            CpuError::ItemNotAvailable => 0x0104,
            CpuError::DataOverPdu => 0x0105,
            CpuError::InvalidValue => 0x0106,
            CpuError::FunctionNotAvailable => 0x0107,
            CpuError::NeedPassword => 0x0108,
            CpuError::InvalidPassword => 0x0109,
            CpuError::NoPasswordToSetOrClear => 0x010A,
            CpuError::Refused(_) => 0x01FF,
        }
    }
}

impl std::fmt::Display for CpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpuError::Refused(raw) => write!(f, "{} (0x{:04X})", self.description(), raw),
            _ => f.write_str(self.description()),
        }
    }
}

/// Maps a raw S7 status code to a [`CpuError`].
///
/// Returns `None` for 0x0000 (success). Unknown non-zero codes surface as
/// [`CpuError::Refused`] with the raw code preserved.
///
/// # Example
///
/// ```
/// use s7comm::{cpu_error, CpuError};
///
/// assert_eq!(cpu_error(0x0000), None);
/// assert_eq!(cpu_error(0x0005), Some(CpuError::AddressOutOfRange));
/// assert_eq!(cpu_error(0x000A), Some(CpuError::ItemNotAvailable));
/// assert_eq!(cpu_error(0x1234), Some(CpuError::Refused(0x1234)));
/// ```
pub fn cpu_error(code: u16) -> Option<CpuError> {
    match code {
        0x0000 => None,
        0x0005 => Some(CpuError::AddressOutOfRange),
        0x0006 | 0x00DC => Some(CpuError::InvalidTransportSize),
        0x0007 => Some(CpuError::WriteDataSizeMismatch),
        0x000A | 0xD209 => Some(CpuError::ItemNotAvailable),
        0x8500 => Some(CpuError::DataOverPdu),
        0xDC01 => Some(CpuError::InvalidValue),
        0x8104 => Some(CpuError::FunctionNotAvailable),
        0xD241 => Some(CpuError::NeedPassword),
        0xD602 => Some(CpuError::InvalidPassword),
        0xD604 | 0xD605 => Some(CpuError::NoPasswordToSetOrClear),
        other => Some(CpuError::Refused(other)),
    }
}

/// Errors that can occur during S7 communication.
#[derive(Debug, Error)]
pub enum S7Error {
    /// TCP connection to the PLC could not be established.
    #[error("TCP connection failed: {0}")]
    TcpConnectionFailed(#[source] io::Error),

    /// Sending data on the TCP stream failed.
    #[error("TCP send failed: {0}")]
    TcpDataSend(#[source] io::Error),

    /// Receiving data from the TCP stream failed.
    #[error("TCP receive failed: {0}")]
    TcpDataRecv(#[source] io::Error),

    /// No (or not enough) data arrived within the receive timeout.
    #[error("receive timeout expired")]
    TcpDataRecvTimeout,

    /// The peer closed the connection.
    #[error("TCP connection reset by peer")]
    TcpConnectionReset,

    /// An ISO frame with an invalid length or layout was received.
    #[error("invalid ISO PDU received")]
    IsoInvalidPdu,

    /// The ISO connection request was rejected by the peer.
    #[error("ISO connection refused by peer")]
    IsoConnectionFailed,

    /// The S7 PDU length negotiation failed.
    #[error("PDU length negotiation failed")]
    IsoNegotiatingPdu,

    /// A reply did not carry the amount of payload it announced.
    #[error("ISO payload size mismatch")]
    IsoInvalidDataSize,

    /// A read job was rejected by the CPU.
    #[error("data read rejected by the CPU")]
    DataRead,

    /// A write job was rejected by the CPU.
    #[error("data write rejected by the CPU")]
    DataWrite,

    /// The caller-supplied buffer is too small for the result.
    #[error("target buffer too small")]
    BufferTooSmall,

    /// The S7 status word of a reply was non-zero.
    #[error("S7 function error reported by the CPU")]
    FunctionError,

    /// Invalid parameters were supplied to an operation.
    #[error("invalid parameters")]
    InvalidParams,

    /// The operation requires an established session.
    #[error("not connected")]
    NotConnected,

    /// The transport type has no byte length for area transfers.
    #[error("unsupported word length")]
    InvalidWordLen,

    /// The assembled request would exceed the negotiated PDU length.
    #[error("request exceeds the negotiated PDU length")]
    SizeOverPdu,

    /// More multi-var items than the protocol allows (20).
    #[error("too many items in request")]
    TooManyItems,

    /// The PLC answer is inconsistent with the request.
    #[error("inconsistent PLC answer")]
    InvalidPlcAnswer,

    /// A CPU-side error code, mapped through [`cpu_error`].
    #[error("CPU error: {0}")]
    Cpu(CpuError),
}

impl S7Error {
    /// Returns the stable numeric code of this error.
    ///
    /// The codes are fixed integers, kept compatible across versions so
    /// external tooling can rely on them.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::S7Error;
    ///
    /// assert_eq!(S7Error::TcpDataRecvTimeout.code(), 0x0004);
    /// assert_eq!(S7Error::TooManyItems.code(), 0x0012);
    /// ```
    pub fn code(&self) -> u16 {
        match self {
            S7Error::TcpConnectionFailed(_) => 0x0001,
            S7Error::TcpDataSend(_) => 0x0002,
            S7Error::TcpDataRecv(_) => 0x0003,
            S7Error::TcpDataRecvTimeout => 0x0004,
            S7Error::TcpConnectionReset => 0x0005,
            S7Error::IsoInvalidPdu => 0x0006,
            S7Error::IsoConnectionFailed => 0x0007,
            S7Error::IsoNegotiatingPdu => 0x0008,
            S7Error::IsoInvalidDataSize => 0x0009,
            S7Error::DataRead => 0x000A,
            S7Error::DataWrite => 0x000B,
            S7Error::BufferTooSmall => 0x000C,
            S7Error::FunctionError => 0x000D,
            S7Error::InvalidParams => 0x000E,
            S7Error::NotConnected => 0x000F,
            S7Error::InvalidWordLen => 0x0010,
            S7Error::SizeOverPdu => 0x0011,
            S7Error::TooManyItems => 0x0012,
            S7Error::InvalidPlcAnswer => 0x0013,
            S7Error::Cpu(e) => e.code(),
        }
    }

    /// Creates an error from a raw CPU status code.
    ///
    /// Returns `Ok(())` for 0x0000 so reply validation can use `?` directly.
    pub(crate) fn check_cpu(code: u16) -> Result<()> {
        match cpu_error(code) {
            None => Ok(()),
            Some(e) => Err(S7Error::Cpu(e)),
        }
    }
}
