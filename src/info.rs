//! Device introspection records decoded from SZL payloads.
//!
//! These are pure byte-slice parsers over the data the SZL fetch loop
//! accumulates; they carry no protocol state of their own. The [`Client`]
//! helpers bundle the matching SZL query with its decoder.

use chrono::{Duration, NaiveDate};

use crate::codec;
use crate::error::{Result, S7Error};
use crate::Client;

/// Reads a fixed-width Latin-1 field, trimming padding.
fn latin1_field(data: &[u8], pos: usize, len: usize) -> String {
    data[pos..pos + len]
        .iter()
        .map(|&b| b as char)
        .collect::<String>()
        .trim_matches(|c| c == ' ' || c == '\0')
        .to_string()
}

/// Block timestamps count days since 1984-01-01.
fn block_timestamp(days: u16) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1984, 1, 1)?.checked_add_signed(Duration::days(days as i64))
}

/// CPU identification (SZL 0x001C).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuInfo {
    /// Module type name, e.g. "CPU 315-2 DP".
    pub module_type_name: String,
    /// Serial number of the module.
    pub serial_number: String,
    /// Name of the automation system.
    pub as_name: String,
    /// Copyright entry.
    pub copyright: String,
    /// Name of the module.
    pub module_name: String,
}

impl CpuInfo {
    /// Decodes the record from SZL 0x001C data.
    pub fn from_szl(data: &[u8]) -> Option<Self> {
        if data.len() < 204 {
            return None;
        }
        Some(Self {
            module_type_name: latin1_field(data, 172, 32),
            serial_number: latin1_field(data, 138, 24),
            as_name: latin1_field(data, 2, 24),
            copyright: latin1_field(data, 104, 26),
            module_name: latin1_field(data, 36, 24),
        })
    }
}

/// Order code and firmware version (SZL 0x0011).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCode {
    /// Order number, e.g. "6ES7 315-2AG10-0AB0".
    pub code: String,
    /// Firmware version component V1.
    pub v1: u8,
    /// Firmware version component V2.
    pub v2: u8,
    /// Firmware version component V3.
    pub v3: u8,
}

impl OrderCode {
    /// Decodes the record from SZL 0x0011 data of `size` bytes.
    pub fn from_szl(data: &[u8], size: usize) -> Option<Self> {
        if size < 25 || data.len() < size {
            return None;
        }
        Some(Self {
            code: latin1_field(data, 2, 20),
            v1: data[size - 3],
            v2: data[size - 2],
            v3: data[size - 1],
        })
    }

    /// Formats the firmware version as "V1.V2.V3".
    pub fn firmware(&self) -> String {
        format!("{}.{}.{}", self.v1, self.v2, self.v3)
    }
}

/// Communication processor capabilities (SZL 0x0131 index 0x0001).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpInfo {
    /// Largest supported PDU in bytes.
    pub max_pdu_length: u16,
    /// Maximum number of connections.
    pub max_connections: u16,
    /// Maximum MPI rate in bit/s.
    pub max_mpi_rate: u32,
    /// Maximum communication bus rate in bit/s.
    pub max_bus_rate: u32,
}

impl CpInfo {
    /// Decodes the record from SZL 0x0131 data.
    pub fn from_szl(data: &[u8]) -> Option<Self> {
        if data.len() < 14 {
            return None;
        }
        Some(Self {
            max_pdu_length: codec::get_word_at(data, 2),
            max_connections: codec::get_word_at(data, 4),
            max_mpi_rate: codec::get_dword_at(data, 6),
            max_bus_rate: codec::get_dword_at(data, 10),
        })
    }
}

/// CPU protection levels (SZL 0x0232 index 0x0004).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protection {
    /// Protection level set with the mode selector (1..3).
    pub selector_level: u16,
    /// Password protection level (0..3).
    pub password_level: u16,
    /// Valid protection level of the CPU (0..3).
    pub valid_level: u16,
    /// Mode selector setting (1 RUN, 2 RUN-P, 3 STOP, 4 MRES).
    pub mode_selector: u16,
    /// Startup switch setting (1 CRST, 2 WRST, 0 undefined).
    pub startup_switch: u16,
}

impl Protection {
    /// Decodes the record from SZL 0x0232 data.
    pub fn from_szl(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }
        Some(Self {
            selector_level: codec::get_word_at(data, 2),
            password_level: codec::get_word_at(data, 4),
            valid_level: codec::get_word_at(data, 6),
            mode_selector: codec::get_word_at(data, 8),
            startup_switch: codec::get_word_at(data, 10),
        })
    }
}

/// Metadata of one block, as returned by the block-info service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    /// Block flags.
    pub flags: u8,
    /// Block language (1 AWL, 2 KOP, 3 FUP, ...).
    pub language: u8,
    /// Raw subtype code of the block.
    pub block_type: u8,
    /// Block number.
    pub number: u16,
    /// Load memory size in bytes.
    pub load_size: u32,
    /// Code timestamp.
    pub code_date: Option<NaiveDate>,
    /// Interface timestamp.
    pub interface_date: Option<NaiveDate>,
    /// SBB length.
    pub sbb_length: u16,
    /// Local data size in bytes.
    pub local_data: u16,
    /// Work memory size of the block in bytes (the DB payload size).
    pub mc7_size: u16,
    /// Author entry.
    pub author: String,
    /// Family entry.
    pub family: String,
    /// Header name entry.
    pub header: String,
    /// Block version.
    pub version: u8,
    /// Block checksum.
    pub checksum: u16,
}

impl BlockInfo {
    /// Decodes the block record starting at `pos`.
    pub fn parse(data: &[u8], pos: usize) -> Option<Self> {
        if data.len() < pos + 61 {
            return None;
        }
        Some(Self {
            flags: data[pos],
            language: data[pos + 1],
            block_type: data[pos + 2],
            number: codec::get_word_at(data, pos + 3),
            load_size: codec::get_dword_at(data, pos + 5),
            code_date: block_timestamp(codec::get_word_at(data, pos + 17)),
            interface_date: block_timestamp(codec::get_word_at(data, pos + 23)),
            sbb_length: codec::get_word_at(data, pos + 25),
            local_data: codec::get_word_at(data, pos + 29),
            mc7_size: codec::get_word_at(data, pos + 31),
            author: latin1_field(data, pos + 33, 8),
            family: latin1_field(data, pos + 41, 8),
            header: latin1_field(data, pos + 49, 8),
            version: data[pos + 57],
            checksum: codec::get_word_at(data, pos + 59),
        })
    }
}

impl Client {
    /// Reads the CPU identification (SZL 0x001C).
    pub fn cpu_info(&mut self) -> Result<CpuInfo> {
        let szl = self.read_szl(0x001C, 0x0000)?;
        CpuInfo::from_szl(&szl.data).ok_or(S7Error::InvalidPlcAnswer)
    }

    /// Reads the order code and firmware version (SZL 0x0011).
    pub fn order_code(&mut self) -> Result<OrderCode> {
        let szl = self.read_szl(0x0011, 0x0000)?;
        OrderCode::from_szl(&szl.data, szl.size()).ok_or(S7Error::InvalidPlcAnswer)
    }

    /// Reads the communication processor capabilities (SZL 0x0131/0x0001).
    pub fn cp_info(&mut self) -> Result<CpInfo> {
        let szl = self.read_szl(0x0131, 0x0001)?;
        CpInfo::from_szl(&szl.data).ok_or(S7Error::InvalidPlcAnswer)
    }

    /// Reads the CPU protection levels (SZL 0x0232/0x0004).
    pub fn protection(&mut self) -> Result<Protection> {
        let szl = self.read_szl(0x0232, 0x0004)?;
        Protection::from_szl(&szl.data).ok_or(S7Error::InvalidPlcAnswer)
    }
}
