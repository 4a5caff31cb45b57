//! System State List (SZL) paginated reads.
//!
//! An SZL entry can exceed one PDU; the CPU then delivers it in slices.
//! The first request carries the SZL id and index, follow-ups echo the
//! slice sequence number until the CPU signals the final slice.

use crate::codec;
use crate::error::{Result, S7Error};
use crate::telegram;

use super::Client;

/// Accumulated result of an SZL query.
///
/// `data` holds the concatenated partial-list records of every slice;
/// the header fields come from the first slice.
#[derive(Debug, Clone, Default)]
pub struct Szl {
    /// Length of one record in bytes.
    pub header_len: u16,
    /// Number of records in the list.
    pub record_count: u16,
    /// Concatenated record data.
    pub data: Vec<u8>,
}

impl Szl {
    /// Returns the accumulated data size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl Client {
    /// Reads a System State List entry, following slice pagination until
    /// the CPU reports the list complete.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7comm::Client;
    ///
    /// let mut client = Client::connect_to("192.168.0.1", 0, 2)?;
    /// // Module identification
    /// let szl = client.read_szl(0x0011, 0x0000)?;
    /// println!("{} records of {} bytes", szl.record_count, szl.header_len);
    /// # Ok::<(), s7comm::S7Error>(())
    /// ```
    pub fn read_szl(&mut self, id: u16, index: u16) -> Result<Szl> {
        self.ensure_connected()?;
        let mut szl = Szl::default();
        let mut seq_out: u16 = 0;
        let mut seq_in: u8 = 0;
        let mut first = true;
        loop {
            if first {
                self.load_template(&telegram::SZL_FIRST);
                codec::set_word_at(&mut self.pdu, 29, id);
                codec::set_word_at(&mut self.pdu, 31, index);
            } else {
                self.load_template(&telegram::SZL_NEXT);
                self.pdu[24] = seq_in;
            }
            seq_out += 1;
            codec::set_word_at(&mut self.pdu, 11, seq_out);

            let length = self.request(telegram::SZL_FIRST.len())?;
            if length <= 32 {
                return Err(S7Error::IsoInvalidPdu);
            }
            if self.reply_word(27) != 0 || self.pdu[29] != 0xFF {
                return Err(S7Error::FunctionError);
            }
            let done = self.pdu[26] == 0x00;
            seq_in = self.pdu[24];

            let (data_len, data_start) = if first {
                // the first slice repeats id/index before the records
                let data_len = self.reply_word(31).saturating_sub(8) as usize;
                szl.header_len = self.reply_word(37);
                szl.record_count = self.reply_word(39);
                (data_len, 41)
            } else {
                (self.reply_word(31) as usize, 37)
            };
            if data_start + data_len > length {
                return Err(S7Error::InvalidPlcAnswer);
            }
            szl.data.extend_from_slice(&self.pdu[data_start..data_start + data_len]);

            first = false;
            if done {
                return Ok(szl);
            }
        }
    }
}
