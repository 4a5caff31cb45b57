//! Fixed telegram templates and their patch offsets.
//!
//! Every request the client issues starts from one of these immutable
//! templates. The operation copies the template into the session's working
//! buffer, patches the positional fields it needs (TSAPs, element counts,
//! addresses, sequence numbers) and sends the result. Templates are never
//! mutated in place, so any number of sessions can share this module.
//!
//! Offsets into the working buffer are part of the wire contract; the
//! constants below name the ones that get patched.

/// Default ISO-on-TCP port.
pub const ISO_TCP_PORT: u16 = 102;

/// TPKT + COTP header size of a data TPDU.
pub(crate) const ISO_HEADER_SIZE: usize = 7;

/// PDU size requested during negotiation.
pub(crate) const PDU_SIZE_REQUESTED: u16 = 480;

/// Largest acceptable incoming frame (requested PDU + ISO header).
pub(crate) const MAX_PDU_SIZE: usize = PDU_SIZE_REQUESTED as usize + ISO_HEADER_SIZE;

/// Smallest acceptable incoming frame that is not a bare keep-alive.
pub(crate) const MIN_PDU_SIZE: usize = 16;

/// Size of the session's reusable working buffer.
pub(crate) const PDU_BUFFER_SIZE: usize = 2048;

/// Request length of a read job (TPKT + COTP + S7 header + one var spec).
pub(crate) const SIZE_RD: usize = 31;

/// Request header length of a write job; payload follows.
pub(crate) const SIZE_WR: usize = 35;

/// Maximum number of items in a multi-var request.
pub const MAX_VARS: usize = 20;

/// TPKT + COTP data prefix: `03 00 len_hi len_lo | 02 F0 80`.
pub(crate) const TPKT_COTP_DATA: [u8; 7] = [0x03, 0x00, 0x00, 0x1F, 0x02, 0xF0, 0x80];

/// ISO 8073 connection request (CR).
///
/// Patched: local TSAP at 16..18, remote TSAP at 20..22.
pub(crate) const ISO_CR: [u8; 22] = [
    0x03, 0x00, 0x00, 0x16, // TPKT, length 22
    0x11, 0xE0, // COTP length 17, CR
    0x00, 0x00, // dst reference
    0x00, 0x01, // src reference
    0x00, // class 0, no options
    0xC0, 0x01, 0x0A, // TPDU max length parameter (1024)
    0xC1, 0x02, 0x01, 0x00, // src TSAP parameter
    0xC2, 0x02, 0x01, 0x02, // dst TSAP parameter
];

/// S7 setup-communication job (PDU length negotiation).
///
/// Patched: requested PDU length word at 23.
pub(crate) const PDU_NEGOTIATION: [u8; 25] = [
    0x03, 0x00, 0x00, 0x19, 0x02, 0xF0, 0x80, // TPKT + COTP
    0x32, 0x01, 0x00, 0x00, 0x04, 0x00, // S7 header, job
    0x00, 0x08, 0x00, 0x00, // parameter/data lengths
    0xF0, 0x00, 0x00, 0x01, 0x00, 0x01, // setup communication, AMQ 1/1
    0x01, 0xE0, // PDU length requested
];

/// Read/write job skeleton. Reads send the first [`SIZE_RD`] bytes, writes
/// the full [`SIZE_WR`] plus payload.
///
/// Patched: TPKT length word at 2, data length word at 15, function at 17,
/// transport size at 22, element count word at 23, DB number word at 25,
/// area code at 27, 3-byte start address at 28..31, result transport tag at
/// 32 and payload length word at 33 (writes only).
pub(crate) const READ_WRITE: [u8; 35] = [
    0x03, 0x00, 0x00, 0x1F, // TPKT
    0x02, 0xF0, 0x80, // COTP
    0x32, // S7 protocol id
    0x01, // job
    0x00, 0x00, // redundancy id
    0x05, 0x00, // PDU reference
    0x00, 0x0E, // parameters length
    0x00, 0x00, // data length = payload + 4
    0x04, // function: 4 read, 5 write
    0x01, // item count
    0x12, // var spec
    0x0A, // remaining spec length
    0x10, // syntax id: S7-Any
    0x02, // transport size
    0x00, 0x00, // element count
    0x00, 0x00, // DB number
    0x84, // area code
    0x00, 0x00, 0x00, // start address
    // write trailer
    0x00, // reserved
    0x04, // result transport tag
    0x00, 0x00, // payload length (bits or bytes)
];

/// Cold restart request.
pub(crate) const COLD_START: [u8; 39] = [
    0x03, 0x00, 0x00, 0x27, 0x02, 0xF0, 0x80, 0x32, 0x01, 0x00, 0x00, 0x0F, 0x00, 0x00, 0x16,
    0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFD, 0x00, 0x02, 0x43, 0x20, 0x09,
    0x50, 0x5F, 0x50, 0x52, 0x4F, 0x47, 0x52, 0x41, 0x4D,
];

/// Warm/hot restart request.
pub(crate) const HOT_START: [u8; 37] = [
    0x03, 0x00, 0x00, 0x25, 0x02, 0xF0, 0x80, 0x32, 0x01, 0x00, 0x00, 0x0C, 0x00, 0x00, 0x14,
    0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFD, 0x00, 0x00, 0x09, 0x50, 0x5F,
    0x50, 0x52, 0x4F, 0x47, 0x52, 0x41, 0x4D,
];

/// Stop request.
pub(crate) const STOP: [u8; 33] = [
    0x03, 0x00, 0x00, 0x21, 0x02, 0xF0, 0x80, 0x32, 0x01, 0x00, 0x00, 0x0E, 0x00, 0x00, 0x10,
    0x00, 0x00, 0x29, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09, 0x50, 0x5F, 0x50, 0x52, 0x4F, 0x47,
    0x52, 0x41, 0x4D,
];

/// Get CPU status (SZL 0x0424 shortcut).
pub(crate) const GET_STATUS: [u8; 33] = [
    0x03, 0x00, 0x00, 0x21, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x08,
    0x00, 0x08, 0x00, 0x01, 0x12, 0x04, 0x11, 0x44, 0x01, 0x00, 0xFF, 0x09, 0x00, 0x04, 0x04,
    0x24, 0x00, 0x00,
];

/// Read PLC clock.
pub(crate) const GET_CLOCK: [u8; 29] = [
    0x03, 0x00, 0x00, 0x1D, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x38, 0x00, 0x00, 0x08,
    0x00, 0x04, 0x00, 0x01, 0x12, 0x04, 0x11, 0x47, 0x01, 0x00, 0x0A, 0x00, 0x00, 0x00,
];

/// Set PLC clock.
///
/// Patched: BCD century at 30, 8-byte DATE_AND_TIME at 31..39.
pub(crate) const SET_CLOCK: [u8; 39] = [
    0x03, 0x00, 0x00, 0x27, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x89, 0x03, 0x00, 0x08,
    0x00, 0x0E, 0x00, 0x01, 0x12, 0x04, 0x11, 0x47, 0x02, 0x00, 0xFF, 0x09, 0x00, 0x0A, 0x00,
    0x19, 0x13, 0x12, 0x06, 0x17, 0x37, 0x13, 0x00, 0x01,
];

/// Clear session password.
pub(crate) const CLEAR_PASSWORD: [u8; 29] = [
    0x03, 0x00, 0x00, 0x1D, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x29, 0x00, 0x00, 0x08,
    0x00, 0x04, 0x00, 0x01, 0x12, 0x04, 0x11, 0x45, 0x02, 0x00, 0x0A, 0x00, 0x00, 0x00,
];

/// Set session password.
///
/// Patched: 8 encoded password bytes at 29..37.
pub(crate) const SET_PASSWORD: [u8; 37] = [
    0x03, 0x00, 0x00, 0x25, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x27, 0x00, 0x00, 0x08,
    0x00, 0x0C, 0x00, 0x01, 0x12, 0x04, 0x11, 0x45, 0x01, 0x00, 0xFF, 0x09, 0x00, 0x08, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Block-info request.
///
/// Patched: block type at 30, five ASCII block-number digits at 31..36.
pub(crate) const BLOCK_INFO: [u8; 37] = [
    0x03, 0x00, 0x00, 0x25, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x05, 0x00, 0x00, 0x08,
    0x00, 0x0C, 0x00, 0x01, 0x12, 0x04, 0x11, 0x43, 0x03, 0x00, 0xFF, 0x09, 0x00, 0x08, 0x30,
    0x41, 0x30, 0x30, 0x30, 0x30, 0x30, 0x41,
];

/// First SZL slice request.
///
/// Patched: sequence word at 11, SZL id word at 29, index word at 31.
pub(crate) const SZL_FIRST: [u8; 33] = [
    0x03, 0x00, 0x00, 0x21, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x05, 0x00, 0x00, 0x08,
    0x00, 0x08, 0x00, 0x01, 0x12, 0x04, 0x11, 0x44, 0x01, 0x00, 0xFF, 0x09, 0x00, 0x04, 0x00,
    0x00, 0x00, 0x00,
];

/// Follow-up SZL slice request.
///
/// Patched: sequence word at 11, echoed slice number at 24.
pub(crate) const SZL_NEXT: [u8; 33] = [
    0x03, 0x00, 0x00, 0x21, 0x02, 0xF0, 0x80, 0x32, 0x07, 0x00, 0x00, 0x06, 0x00, 0x00, 0x0C,
    0x00, 0x04, 0x00, 0x01, 0x12, 0x08, 0x12, 0x44, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x0A,
    0x00, 0x00, 0x00,
];

/// Multi-var read header; one [`MULTI_ITEM`] per item follows.
///
/// Patched: TPKT length word at 2, parameters length word at 13, item count
/// at 18.
pub(crate) const MULTI_READ_HEADER: [u8; 19] = [
    0x03, 0x00, 0x00, 0x1F, 0x02, 0xF0, 0x80, 0x32, 0x01, 0x00, 0x00, 0x05, 0x00, 0x00, 0x0E,
    0x00, 0x00, 0x04, 0x01,
];

/// Multi-var write header; item specs and data sections follow.
///
/// Patched: TPKT length word at 2, parameters length word at 13, data
/// length word at 15, item count at 18.
pub(crate) const MULTI_WRITE_HEADER: [u8; 19] = [
    0x03, 0x00, 0x00, 0x1F, 0x02, 0xF0, 0x80, 0x32, 0x01, 0x00, 0x00, 0x05, 0x00, 0x00, 0x0E,
    0x00, 0x00, 0x05, 0x01,
];

/// One multi-var item spec (shared by read and write requests).
///
/// Patched: transport size at 3, element count word at 4, DB number word at
/// 6, area code at 8, 3-byte start address at 9..12.
pub(crate) const MULTI_ITEM: [u8; 12] = [
    0x12, 0x0A, 0x10, 0x02, 0x00, 0x00, 0x00, 0x00, 0x84, 0x00, 0x00, 0x00,
];
