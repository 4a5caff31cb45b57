//! Area read/write: addressing, fragmentation and payload copy.
//!
//! Transfers larger than the negotiated PDU are split into a sequence of
//! telegrams. All multi-byte transport types are flattened to byte-wise
//! transfers on the wire (the element width only decides how many bytes one
//! element occupies); bit, counter and timer transfers keep their native
//! addressing.

use crate::codec;
use crate::error::{cpu_error, CpuError, Result, S7Error};
use crate::telegram;
use crate::types::{result_tag, Area, DataType};

use super::Client;

/// Reply header length of a read job; payload follows it in every fragment.
const READ_REPLY_HEADER: usize = 18;

/// Request header length of a write job.
const WRITE_REPLY_HEADER: usize = 35;

/// Maps a non-success item header byte to an error.
///
/// A zero byte is not success either (success is 0xFF), so it degrades to
/// the generic function error.
pub(crate) fn item_error(code: u8) -> S7Error {
    match cpu_error(code as u16) {
        Some(e) => S7Error::Cpu(e),
        None => S7Error::FunctionError,
    }
}

/// Maps a non-success item header byte to a per-item CPU error.
pub(crate) fn item_cpu_error(code: u8) -> CpuError {
    cpu_error(code as u16).unwrap_or(CpuError::Refused(0))
}

/// Addressing parameters after the transport-type normalization.
struct Plan {
    effective: DataType,
    word_size: usize,
    amount: usize,
}

/// Applies the preprocessing shared by reads and writes: counters and
/// timers force their transport type, bits transfer one element at a time,
/// everything else flattens to bytes.
fn plan_transfer(area: Area, data_type: DataType, amount: u16) -> Plan {
    let effective = area.transport_override().unwrap_or(data_type);
    let mut word_size = effective.byte_length();
    let mut amount = amount as usize;
    let effective = match effective {
        DataType::Bit => {
            // only single-bit transfers
            amount = 1;
            DataType::Bit
        }
        DataType::Counter | DataType::Timer => effective,
        _ => {
            amount *= word_size;
            word_size = 1;
            DataType::Byte
        }
    };
    Plan {
        effective,
        word_size,
        amount,
    }
}

impl Client {
    /// Reads `amount` elements of `data_type` from a PLC area into `buffer`.
    ///
    /// `start` is in the area's native unit: a byte index for byte-addressed
    /// types, a bit address (`byte * 8 + bit`) for [`DataType::Bit`], and an
    /// element index for counters and timers. `db` is only used for
    /// [`Area::DataBlock`].
    ///
    /// Transfers exceeding the negotiated PDU length are fragmented; on the
    /// first error the operation aborts and only the bytes already copied
    /// into `buffer` are defined.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7comm::{Area, Client, DataType};
    ///
    /// let mut client = Client::connect_to("192.168.0.1", 0, 2)?;
    ///
    /// // DB5.DBW10..DBW18: five words
    /// let mut buf = [0u8; 10];
    /// client.read_area(Area::DataBlock, 5, 10, 5, DataType::Word, &mut buf)?;
    /// # Ok::<(), s7comm::S7Error>(())
    /// ```
    pub fn read_area(
        &mut self,
        area: Area,
        db: u16,
        start: u32,
        amount: u16,
        data_type: DataType,
        buffer: &mut [u8],
    ) -> Result<()> {
        self.ensure_connected()?;
        let plan = plan_transfer(area, data_type, amount);
        if buffer.len() < plan.amount * plan.word_size {
            return Err(S7Error::BufferTooSmall);
        }
        let max_elements = self.pdu_length.saturating_sub(READ_REPLY_HEADER) / plan.word_size;
        if max_elements == 0 {
            return Err(S7Error::SizeOverPdu);
        }

        let mut remaining = plan.amount;
        let mut start = start as usize;
        let mut offset = 0usize;
        while remaining > 0 {
            let elements = remaining.min(max_elements);
            let size = elements * plan.word_size;

            self.load_template(&telegram::READ_WRITE[..telegram::SIZE_RD]);
            self.pdu[27] = area.code();
            if area == Area::DataBlock {
                codec::set_word_at(&mut self.pdu, 25, db);
            }
            let address = match plan.effective {
                DataType::Bit | DataType::Counter | DataType::Timer => {
                    self.pdu[22] = plan.effective.code();
                    start
                }
                _ => start << 3,
            };
            codec::set_word_at(&mut self.pdu, 23, elements as u16);
            self.pdu[28] = (address >> 16) as u8;
            self.pdu[29] = (address >> 8) as u8;
            self.pdu[30] = address as u8;

            let length = self.request(telegram::SIZE_RD)?;
            if length < 25 {
                return Err(S7Error::IsoInvalidDataSize);
            }
            if self.pdu[21] != 0xFF {
                return Err(item_error(self.pdu[21]));
            }
            if length < 25 + size {
                return Err(S7Error::IsoInvalidDataSize);
            }
            buffer[offset..offset + size].copy_from_slice(&self.pdu[25..25 + size]);

            offset += size;
            remaining -= elements;
            start += elements * plan.word_size;
        }
        Ok(())
    }

    /// Writes `amount` elements of `data_type` from `data` into a PLC area.
    ///
    /// Addressing follows [`Client::read_area`]. The payload length field of
    /// the telegram is expressed in bits for byte-addressed types and in
    /// bytes for bit, counter and timer transfers.
    pub fn write_area(
        &mut self,
        area: Area,
        db: u16,
        start: u32,
        amount: u16,
        data_type: DataType,
        data: &[u8],
    ) -> Result<()> {
        self.ensure_connected()?;
        let plan = plan_transfer(area, data_type, amount);
        if data.len() < plan.amount * plan.word_size {
            return Err(S7Error::InvalidParams);
        }
        let max_elements = self.pdu_length.saturating_sub(WRITE_REPLY_HEADER) / plan.word_size;
        if max_elements == 0 {
            return Err(S7Error::SizeOverPdu);
        }

        let mut remaining = plan.amount;
        let mut start = start as usize;
        let mut offset = 0usize;
        while remaining > 0 {
            let elements = remaining.min(max_elements);
            let size = elements * plan.word_size;
            let iso_size = telegram::SIZE_WR + size;

            self.load_template(&telegram::READ_WRITE);
            codec::set_word_at(&mut self.pdu, 2, iso_size as u16);
            codec::set_word_at(&mut self.pdu, 15, (size + 4) as u16);
            self.pdu[17] = 0x05;
            self.pdu[27] = area.code();
            if area == Area::DataBlock {
                codec::set_word_at(&mut self.pdu, 25, db);
            }
            let (address, length_field) = match plan.effective {
                DataType::Bit | DataType::Counter | DataType::Timer => {
                    self.pdu[22] = plan.effective.code();
                    (start, size)
                }
                _ => (start << 3, size << 3),
            };
            codec::set_word_at(&mut self.pdu, 23, elements as u16);
            self.pdu[28] = (address >> 16) as u8;
            self.pdu[29] = (address >> 8) as u8;
            self.pdu[30] = address as u8;
            self.pdu[32] = match plan.effective {
                DataType::Bit => result_tag::RES_BIT,
                DataType::Counter | DataType::Timer => result_tag::RES_OCTET,
                _ => result_tag::RES_BYTE,
            };
            codec::set_word_at(&mut self.pdu, 33, length_field as u16);
            self.pdu[telegram::SIZE_WR..iso_size].copy_from_slice(&data[offset..offset + size]);

            let length = self.request(iso_size)?;
            if length != 22 {
                return Err(S7Error::IsoInvalidPdu);
            }
            if self.pdu[21] != 0xFF {
                return Err(item_error(self.pdu[21]));
            }

            offset += size;
            remaining -= elements;
            start += elements * plan.word_size;
        }
        Ok(())
    }

    /// Reads a single bit, addressed as byte index plus bit number (0-7).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7comm::{Area, Client};
    ///
    /// let mut client = Client::connect_to("192.168.0.1", 0, 2)?;
    /// let flag = client.read_bit(Area::Merker, 0, 10, 3)?; // M10.3
    /// # Ok::<(), s7comm::S7Error>(())
    /// ```
    pub fn read_bit(&mut self, area: Area, db: u16, byte_index: u32, bit: u8) -> Result<bool> {
        if bit > 7 {
            return Err(S7Error::InvalidParams);
        }
        let mut buf = [0u8; 1];
        self.read_area(
            area,
            db,
            byte_index * 8 + bit as u32,
            1,
            DataType::Bit,
            &mut buf,
        )?;
        Ok(buf[0] & 0x01 != 0)
    }

    /// Writes a single bit, addressed as byte index plus bit number (0-7).
    pub fn write_bit(
        &mut self,
        area: Area,
        db: u16,
        byte_index: u32,
        bit: u8,
        value: bool,
    ) -> Result<()> {
        if bit > 7 {
            return Err(S7Error::InvalidParams);
        }
        let buf = [u8::from(value)];
        self.write_area(
            area,
            db,
            byte_index * 8 + bit as u32,
            1,
            DataType::Bit,
            &buf,
        )
    }

    /// Reads `buffer.len()` bytes from a data block starting at `start`.
    pub fn db_read(&mut self, db: u16, start: u32, buffer: &mut [u8]) -> Result<()> {
        let amount = u16::try_from(buffer.len()).map_err(|_| S7Error::InvalidParams)?;
        self.read_area(Area::DataBlock, db, start, amount, DataType::Byte, buffer)
    }

    /// Writes `data` into a data block starting at `start`.
    pub fn db_write(&mut self, db: u16, start: u32, data: &[u8]) -> Result<()> {
        let amount = u16::try_from(data.len()).map_err(|_| S7Error::InvalidParams)?;
        self.write_area(Area::DataBlock, db, start, amount, DataType::Byte, data)
    }

    /// Fetches a whole data block into `buffer` using its block info to
    /// discover the size. Returns the number of bytes read.
    pub fn db_get(&mut self, db: u16, buffer: &mut [u8]) -> Result<usize> {
        let info = self.block_info(crate::BlockType::Db, db)?;
        let size = info.mc7_size as usize;
        if size > buffer.len() {
            return Err(S7Error::BufferTooSmall);
        }
        self.read_area(
            Area::DataBlock,
            db,
            0,
            info.mc7_size,
            DataType::Byte,
            &mut buffer[..size],
        )?;
        Ok(size)
    }
}
