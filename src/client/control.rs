//! PLC control services: run state, clock, session password, block info
//! and the raw ISO exchange.

use chrono::{Datelike, NaiveDateTime};

use crate::codec;
use crate::error::{Result, S7Error};
use crate::info::BlockInfo;
use crate::telegram;
use crate::types::{BlockType, CpuStatus};

use super::Client;

/// Encodes a session password: pad/truncate to 8 bytes, then chain-XOR.
pub(crate) fn encode_password(password: &str) -> [u8; 8] {
    let mut pwd = [0x20u8; 8];
    for (dst, src) in pwd.iter_mut().zip(password.bytes()) {
        *dst = src;
    }
    pwd[0] ^= 0x55;
    pwd[1] ^= 0x55;
    for c in 2..8 {
        pwd[c] ^= 0x55 ^ pwd[c - 2];
    }
    pwd
}

impl Client {
    /// Fires a fixed control telegram and validates the S7 status word at
    /// offset 17.
    fn control_request(&mut self, template: &[u8]) -> Result<()> {
        self.ensure_connected()?;
        self.load_template(template);
        let length = self.request(template.len())?;
        if length <= 18 {
            return Err(S7Error::IsoInvalidPdu);
        }
        if self.reply_word(17) != 0 {
            return Err(S7Error::FunctionError);
        }
        Ok(())
    }

    /// Performs a cold restart (memory reset, then RUN).
    pub fn plc_cold_start(&mut self) -> Result<()> {
        self.control_request(&telegram::COLD_START)
    }

    /// Performs a warm restart.
    pub fn plc_hot_start(&mut self) -> Result<()> {
        self.control_request(&telegram::HOT_START)
    }

    /// Puts the CPU into STOP.
    pub fn plc_stop(&mut self) -> Result<()> {
        self.control_request(&telegram::STOP)
    }

    /// Queries the CPU run state.
    ///
    /// Unrecognized status bytes map to [`CpuStatus::Unknown`].
    pub fn plc_status(&mut self) -> Result<CpuStatus> {
        self.ensure_connected()?;
        self.load_template(&telegram::GET_STATUS);
        let length = self.request(telegram::GET_STATUS.len())?;
        if length <= 30 {
            return Err(S7Error::IsoInvalidPdu);
        }
        if self.reply_word(27) != 0 {
            return Err(S7Error::FunctionError);
        }
        Ok(CpuStatus::from_code(self.pdu[44]))
    }

    /// Reads the PLC real-time clock.
    pub fn get_plc_date_time(&mut self) -> Result<NaiveDateTime> {
        self.ensure_connected()?;
        self.load_template(&telegram::GET_CLOCK);
        let length = self.request(telegram::GET_CLOCK.len())?;
        if length <= 30 {
            return Err(S7Error::IsoInvalidPdu);
        }
        if self.reply_word(27) != 0 || self.pdu[29] != 0xFF {
            return Err(S7Error::FunctionError);
        }
        codec::get_date_time_at(&self.pdu, 34).ok_or(S7Error::InvalidPlcAnswer)
    }

    /// Sets the PLC real-time clock.
    pub fn set_plc_date_time(&mut self, date_time: &NaiveDateTime) -> Result<()> {
        self.ensure_connected()?;
        self.load_template(&telegram::SET_CLOCK);
        self.pdu[30] = codec::byte_to_bcd((date_time.year() / 100 % 100) as u8);
        codec::set_date_time_at(&mut self.pdu, 31, date_time);
        let length = self.request(telegram::SET_CLOCK.len())?;
        if length <= 30 {
            return Err(S7Error::IsoInvalidPdu);
        }
        if self.reply_word(27) != 0 {
            return Err(S7Error::FunctionError);
        }
        Ok(())
    }

    /// Sets the PLC clock to the local system time.
    pub fn set_plc_system_date_time(&mut self) -> Result<()> {
        let now = chrono::Local::now().naive_local();
        self.set_plc_date_time(&now)
    }

    /// Sends a session password, unlocking protected operations.
    ///
    /// The password is padded (or truncated) to 8 characters.
    pub fn set_session_password(&mut self, password: &str) -> Result<()> {
        self.ensure_connected()?;
        let encoded = encode_password(password);
        self.load_template(&telegram::SET_PASSWORD);
        self.pdu[29..37].copy_from_slice(&encoded);
        let length = self.request(telegram::SET_PASSWORD.len())?;
        if length <= 32 {
            return Err(S7Error::IsoInvalidPdu);
        }
        if self.reply_word(27) != 0 {
            return Err(S7Error::FunctionError);
        }
        Ok(())
    }

    /// Clears the session password.
    pub fn clear_session_password(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.load_template(&telegram::CLEAR_PASSWORD);
        let length = self.request(telegram::CLEAR_PASSWORD.len())?;
        if length <= 30 {
            return Err(S7Error::IsoInvalidPdu);
        }
        if self.reply_word(27) != 0 {
            return Err(S7Error::FunctionError);
        }
        Ok(())
    }

    /// Queries metadata of one block (size, language, timestamps, author).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7comm::{BlockType, Client};
    ///
    /// let mut client = Client::connect_to("192.168.0.1", 0, 2)?;
    /// let info = client.block_info(BlockType::Db, 100)?;
    /// println!("DB100 is {} bytes", info.mc7_size);
    /// # Ok::<(), s7comm::S7Error>(())
    /// ```
    pub fn block_info(&mut self, block_type: BlockType, number: u16) -> Result<BlockInfo> {
        self.ensure_connected()?;
        self.load_template(&telegram::BLOCK_INFO);
        self.pdu[30] = block_type.code();
        let mut n = number;
        self.pdu[31] = b'0' + (n / 10000) as u8;
        n %= 10000;
        self.pdu[32] = b'0' + (n / 1000) as u8;
        n %= 1000;
        self.pdu[33] = b'0' + (n / 100) as u8;
        n %= 100;
        self.pdu[34] = b'0' + (n / 10) as u8;
        self.pdu[35] = b'0' + (n % 10) as u8;

        let length = self.request(telegram::BLOCK_INFO.len())?;
        if length <= 32 {
            return Err(S7Error::IsoInvalidPdu);
        }
        if self.reply_word(27) != 0 || self.pdu[29] != 0xFF {
            return Err(S7Error::FunctionError);
        }
        BlockInfo::parse(&self.pdu[..length], 42).ok_or(S7Error::InvalidPlcAnswer)
    }

    /// Sends raw bytes wrapped in a TPKT + COTP data prefix and returns the
    /// reply with the prefix stripped. Opaque passthrough for services the
    /// library does not model.
    pub fn iso_exchange_buffer(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.ensure_connected()?;
        let total = telegram::ISO_HEADER_SIZE + data.len();
        if total > telegram::PDU_BUFFER_SIZE {
            return Err(S7Error::SizeOverPdu);
        }
        self.load_template(&telegram::TPKT_COTP_DATA);
        codec::set_word_at(&mut self.pdu, 2, total as u16);
        self.pdu[telegram::ISO_HEADER_SIZE..total].copy_from_slice(data);
        let length = self.request(total)?;
        Ok(self.pdu[telegram::ISO_HEADER_SIZE..length].to_vec())
    }
}
