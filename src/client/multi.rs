//! Multi-variable batch read/write.
//!
//! One request can carry up to [`MAX_VARS`](crate::MAX_VARS) items touching
//! different areas and data blocks. The whole request must fit into the
//! negotiated PDU; the protocol does not fragment multi-var jobs. The
//! transport-level outcome is the function result, while each item carries
//! its own CPU verdict in [`DataItem::result`].

use crate::codec;
use crate::error::{CpuError, Result, S7Error};
use crate::telegram;
use crate::types::{result_tag, Area, DataType};

use super::area::item_cpu_error;
use super::Client;

/// One variable of a multi-var request.
///
/// The caller owns the payload buffer: reads copy into it (up to its
/// length), writes send from it. After a batch call, [`DataItem::result`]
/// holds the per-item CPU verdict (`None` means the item succeeded).
#[derive(Debug, Clone)]
pub struct DataItem {
    /// Data area this item addresses.
    pub area: Area,
    /// Transport type of the item.
    pub data_type: DataType,
    /// DB number; ignored for non-DB areas.
    pub db: u16,
    /// Start address, written to the wire as-is (callers bit-shift byte
    /// addresses themselves, unlike [`Client::read_area`]).
    pub start: u32,
    /// Element count.
    pub amount: u16,
    /// Payload buffer (read target / write source).
    pub data: Vec<u8>,
    /// Per-item CPU verdict of the last batch call.
    pub result: Option<CpuError>,
}

impl DataItem {
    /// Creates a read item with a payload buffer sized for `amount`
    /// elements of `data_type`.
    pub fn read(area: Area, data_type: DataType, db: u16, start: u32, amount: u16) -> Self {
        Self {
            area,
            data_type,
            db,
            start,
            amount,
            data: vec![0; amount as usize * data_type.byte_length()],
            result: None,
        }
    }

    /// Creates a write item carrying `data`.
    ///
    /// For counters and timers the payload is `amount * 2` bytes; for all
    /// other types `amount` counts payload bytes directly.
    pub fn write(
        area: Area,
        data_type: DataType,
        db: u16,
        start: u32,
        amount: u16,
        data: Vec<u8>,
    ) -> Self {
        Self {
            area,
            data_type,
            db,
            start,
            amount,
            data,
            result: None,
        }
    }

    /// Returns whether the last batch call succeeded for this item.
    pub fn is_ok(&self) -> bool {
        self.result.is_none()
    }

    /// Payload byte count of a write item.
    fn write_len(&self) -> usize {
        match self.data_type {
            DataType::Counter | DataType::Timer => self.amount as usize * 2,
            _ => self.amount as usize,
        }
    }

    /// Fills a 12-byte item spec.
    fn fill_spec(&self, spec: &mut [u8; 12]) {
        spec.copy_from_slice(&telegram::MULTI_ITEM);
        spec[3] = self.data_type.code();
        codec::set_word_at(spec, 4, self.amount);
        codec::set_word_at(spec, 6, self.db);
        spec[8] = self.area.code();
        spec[9] = (self.start >> 16) as u8;
        spec[10] = (self.start >> 8) as u8;
        spec[11] = self.start as u8;
    }
}

impl Client {
    /// Reads up to 20 variables in one round trip.
    ///
    /// Returns an error for transport-level failures; per-item CPU verdicts
    /// land in each item's [`DataItem::result`]. Reply payloads are copied
    /// into each item's buffer, truncated to the buffer length.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7comm::{Area, Client, DataItem, DataType};
    ///
    /// let mut client = Client::connect_to("192.168.0.1", 0, 2)?;
    /// let mut items = [
    ///     DataItem::read(Area::DataBlock, DataType::Byte, 1, 0, 4),
    ///     DataItem::read(Area::Merker, DataType::Byte, 0, 16, 2),
    /// ];
    /// client.read_multi_vars(&mut items)?;
    /// for item in &items {
    ///     if item.is_ok() {
    ///         println!("{}{}: {:?}", item.area, item.db, item.data);
    ///     }
    /// }
    /// # Ok::<(), s7comm::S7Error>(())
    /// ```
    pub fn read_multi_vars(&mut self, items: &mut [DataItem]) -> Result<()> {
        if items.len() > telegram::MAX_VARS {
            return Err(S7Error::TooManyItems);
        }
        if items.is_empty() {
            return Ok(());
        }
        self.ensure_connected()?;

        let request_len = telegram::MULTI_READ_HEADER.len() + items.len() * 12;
        if request_len > self.pdu_length {
            return Err(S7Error::SizeOverPdu);
        }

        self.load_template(&telegram::MULTI_READ_HEADER);
        codec::set_word_at(&mut self.pdu, 13, (items.len() * 12 + 2) as u16);
        self.pdu[18] = items.len() as u8;
        let mut offset = telegram::MULTI_READ_HEADER.len();
        let mut spec = [0u8; 12];
        for item in items.iter() {
            item.fill_spec(&mut spec);
            if item.area != Area::DataBlock {
                codec::set_word_at(&mut spec, 6, 0);
            }
            self.pdu[offset..offset + 12].copy_from_slice(&spec);
            offset += 12;
        }
        codec::set_word_at(&mut self.pdu, 2, offset as u16);

        let length = self.request(offset)?;
        if length < 22 {
            return Err(S7Error::IsoInvalidPdu);
        }
        S7Error::check_cpu(self.reply_word(17))?;
        let items_read = self.pdu[20] as usize;
        if items_read != items.len() || items_read > telegram::MAX_VARS {
            return Err(S7Error::InvalidPlcAnswer);
        }

        let mut pos = 21;
        for item in items.iter_mut() {
            if pos + 4 > length {
                return Err(S7Error::InvalidPlcAnswer);
            }
            if self.pdu[pos] != 0xFF {
                item.result = Some(item_cpu_error(self.pdu[pos]));
                pos += 4;
                continue;
            }
            let tag = self.pdu[pos + 1];
            let mut item_size = codec::get_word_at(&self.pdu, pos + 2) as usize;
            // length is in bits unless the tag says bytes
            if tag != result_tag::RES_OCTET && tag != result_tag::RES_REAL && tag != result_tag::RES_BIT
            {
                item_size >>= 3;
            }
            let copy = item.data.len().min(item_size).min(length - pos - 4);
            item.data[..copy].copy_from_slice(&self.pdu[pos + 4..pos + 4 + copy]);
            item.result = None;
            if item_size % 2 != 0 {
                item_size += 1; // odd sizes are padded
            }
            pos += 4 + item_size;
        }
        Ok(())
    }

    /// Writes up to 20 variables in one round trip.
    ///
    /// Returns an error for transport-level failures; per-item CPU verdicts
    /// land in each item's [`DataItem::result`].
    pub fn write_multi_vars(&mut self, items: &mut [DataItem]) -> Result<()> {
        if items.len() > telegram::MAX_VARS {
            return Err(S7Error::TooManyItems);
        }
        if items.is_empty() {
            return Ok(());
        }
        self.ensure_connected()?;

        // params + per-item data sections, odd payloads padded to even
        let mut request_len = telegram::MULTI_WRITE_HEADER.len() + items.len() * 12;
        for item in items.iter() {
            let size = item.write_len();
            if item.data.len() < size {
                return Err(S7Error::InvalidParams);
            }
            request_len += 4 + size + (size % 2);
        }
        if request_len > self.pdu_length {
            return Err(S7Error::SizeOverPdu);
        }

        self.load_template(&telegram::MULTI_WRITE_HEADER);
        codec::set_word_at(&mut self.pdu, 13, (items.len() * 12 + 2) as u16);
        self.pdu[18] = items.len() as u8;
        let mut offset = telegram::MULTI_WRITE_HEADER.len();
        let mut spec = [0u8; 12];
        for item in items.iter() {
            item.fill_spec(&mut spec);
            self.pdu[offset..offset + 12].copy_from_slice(&spec);
            offset += 12;
        }

        let mut data_length = 0usize;
        for item in items.iter() {
            let size = item.write_len();
            let tag = match item.data_type {
                DataType::Bit => result_tag::RES_BIT,
                DataType::Counter | DataType::Timer => result_tag::RES_OCTET,
                _ => result_tag::RES_BYTE,
            };
            self.pdu[offset] = 0x00;
            self.pdu[offset + 1] = tag;
            let length_field = if tag != result_tag::RES_OCTET && tag != result_tag::RES_BIT {
                size * 8
            } else {
                size
            };
            codec::set_word_at(&mut self.pdu, offset + 2, length_field as u16);
            self.pdu[offset + 4..offset + 4 + size].copy_from_slice(&item.data[..size]);
            let mut advance = size;
            if size % 2 != 0 {
                self.pdu[offset + 4 + size] = 0x00;
                advance += 1;
            }
            offset += 4 + advance;
            data_length += 4 + advance;
        }

        codec::set_word_at(&mut self.pdu, 2, offset as u16);
        codec::set_word_at(&mut self.pdu, 15, data_length as u16);

        let length = self.request(offset)?;
        if length < 21 + items.len() {
            return Err(S7Error::IsoInvalidPdu);
        }
        S7Error::check_cpu(self.reply_word(17))?;
        let items_written = self.pdu[20] as usize;
        if items_written != items.len() || items_written > telegram::MAX_VARS {
            return Err(S7Error::InvalidPlcAnswer);
        }
        for (i, item) in items.iter_mut().enumerate() {
            let code = self.pdu[21 + i];
            item.result = if code == 0xFF {
                None
            } else {
                Some(item_cpu_error(code))
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock::*;
    use super::*;
    use crate::client::{Client, ClientConfig};

    /// Builds a multi-read reply from (result code, tag, payload) triples.
    fn multi_read_reply(items: &[(u8, u8, Vec<u8>)]) -> Vec<u8> {
        let mut reply = vec![0u8; 21];
        reply[0] = 0x03;
        reply[4] = 0x02;
        reply[5] = 0xF0;
        reply[6] = 0x80;
        reply[7] = 0x32;
        reply[8] = 0x03;
        reply[19] = 0x04;
        reply[20] = items.len() as u8;
        for (code, tag, payload) in items {
            let mut header = [0u8; 4];
            header[0] = *code;
            header[1] = *tag;
            let bits = if *tag == 0x04 || *tag == 0x05 {
                payload.len() * 8
            } else {
                payload.len()
            };
            codec::set_word_at(&mut header, 2, bits as u16);
            reply.extend_from_slice(&header);
            if *code == 0xFF {
                reply.extend_from_slice(payload);
                if payload.len() % 2 != 0 {
                    reply.push(0);
                }
            }
        }
        let total = reply.len() as u16;
        codec::set_word_at(&mut reply, 2, total);
        reply
    }

    /// Builds a multi-write reply with one result byte per item.
    fn multi_write_reply(results: &[u8]) -> Vec<u8> {
        let mut reply = vec![0u8; 21 + results.len()];
        reply[0] = 0x03;
        let len = reply.len() as u16;
        codec::set_word_at(&mut reply, 2, len);
        reply[4] = 0x02;
        reply[5] = 0xF0;
        reply[6] = 0x80;
        reply[7] = 0x32;
        reply[8] = 0x03;
        reply[19] = 0x05;
        reply[20] = results.len() as u8;
        reply[21..].copy_from_slice(results);
        reply
    }

    #[test]
    fn test_too_many_items_without_io() {
        // Not connected: the item-count check must fire before any I/O.
        let mut client = Client::new(ClientConfig::new("127.0.0.1"));
        let mut items: Vec<DataItem> = (0..21)
            .map(|i| DataItem::read(Area::DataBlock, DataType::Byte, 1, i * 4, 4))
            .collect();
        match client.read_multi_vars(&mut items) {
            Err(S7Error::TooManyItems) => {}
            other => panic!("expected TooManyItems, got {other:?}"),
        }
        match client.write_multi_vars(&mut items) {
            Err(S7Error::TooManyItems) => {}
            other => panic!("expected TooManyItems, got {other:?}"),
        }
    }

    #[test]
    fn test_read_two_items() {
        let reply = multi_read_reply(&[
            (0xFF, 0x04, vec![0x11, 0x22, 0x33, 0x44]),
            (0xFF, 0x04, vec![0xAA, 0xBB]),
        ]);
        let request_len = 19 + 2 * 12;
        let (mut client, handle) =
            connected_client(240, vec![Exchange::new(request_len, reply)]);

        let mut items = [
            DataItem::read(Area::DataBlock, DataType::Byte, 5, 0, 4),
            DataItem::read(Area::Merker, DataType::Byte, 0, 16, 2),
        ];
        client.read_multi_vars(&mut items).unwrap();

        assert!(items[0].is_ok());
        assert_eq!(items[0].data, vec![0x11, 0x22, 0x33, 0x44]);
        assert!(items[1].is_ok());
        assert_eq!(items[1].data, vec![0xAA, 0xBB]);

        let requests = handle.join().unwrap();
        let req = &requests[2];
        assert_eq!(codec::get_word_at(req, 2), request_len as u16);
        assert_eq!(codec::get_word_at(req, 13), (2 * 12 + 2) as u16);
        assert_eq!(req[18], 2);
        // first item spec at 19: type, count, db, area, address
        assert_eq!(req[19 + 3], 0x02);
        assert_eq!(codec::get_word_at(req, 19 + 4), 4);
        assert_eq!(codec::get_word_at(req, 19 + 6), 5);
        assert_eq!(req[19 + 8], 0x84);
        // second item: non-DB area carries db 0
        assert_eq!(codec::get_word_at(req, 31 + 6), 0);
        assert_eq!(req[31 + 8], 0x83);
        assert_eq!(&req[31 + 9..31 + 12], &[0x00, 0x00, 0x10]);
    }

    #[test]
    fn test_read_odd_item_size_is_padded() {
        let reply = multi_read_reply(&[
            (0xFF, 0x04, vec![0x01, 0x02, 0x03]),
            (0xFF, 0x04, vec![0x04]),
        ]);
        let (mut client, handle) =
            connected_client(240, vec![Exchange::new(19 + 2 * 12, reply)]);

        let mut items = [
            DataItem::read(Area::DataBlock, DataType::Byte, 1, 0, 3),
            DataItem::read(Area::DataBlock, DataType::Byte, 1, 8, 1),
        ];
        client.read_multi_vars(&mut items).unwrap();
        assert_eq!(items[0].data, vec![0x01, 0x02, 0x03]);
        assert_eq!(items[1].data, vec![0x04]);
        handle.join().unwrap();
    }

    #[test]
    fn test_read_per_item_cpu_error() {
        let reply = multi_read_reply(&[
            (0x0A, 0x00, Vec::new()),
            (0xFF, 0x04, vec![0x55, 0x66]),
        ]);
        let (mut client, handle) =
            connected_client(240, vec![Exchange::new(19 + 2 * 12, reply)]);

        let mut items = [
            DataItem::read(Area::DataBlock, DataType::Byte, 99, 0, 2),
            DataItem::read(Area::DataBlock, DataType::Byte, 1, 0, 2),
        ];
        client.read_multi_vars(&mut items).unwrap();

        assert_eq!(items[0].result, Some(CpuError::ItemNotAvailable));
        assert!(items[1].is_ok());
        assert_eq!(items[1].data, vec![0x55, 0x66]);
        handle.join().unwrap();
    }

    #[test]
    fn test_read_item_count_mismatch() {
        let reply = multi_read_reply(&[(0xFF, 0x04, vec![0x01, 0x02])]);
        let (mut client, handle) =
            connected_client(240, vec![Exchange::new(19 + 2 * 12, reply)]);

        let mut items = [
            DataItem::read(Area::DataBlock, DataType::Byte, 1, 0, 2),
            DataItem::read(Area::DataBlock, DataType::Byte, 2, 0, 2),
        ];
        match client.read_multi_vars(&mut items) {
            Err(S7Error::InvalidPlcAnswer) => {}
            other => panic!("expected InvalidPlcAnswer, got {other:?}"),
        }
        handle.join().unwrap();
    }

    #[test]
    fn test_write_two_items() {
        let reply = multi_write_reply(&[0xFF, 0xFF]);
        // header 19 + 2 specs + (4 + 2) + (4 + 1 + 1 pad)
        let request_len = 19 + 24 + 6 + 6;
        let (mut client, handle) =
            connected_client(240, vec![Exchange::new(request_len, reply)]);

        let mut items = [
            DataItem::write(Area::DataBlock, DataType::Byte, 1, 0, 2, vec![0xDE, 0xAD]),
            DataItem::write(Area::Merker, DataType::Byte, 0, 8, 1, vec![0x7F]),
        ];
        client.write_multi_vars(&mut items).unwrap();
        assert!(items[0].is_ok());
        assert!(items[1].is_ok());

        let requests = handle.join().unwrap();
        let req = &requests[2];
        assert_eq!(codec::get_word_at(req, 2), request_len as u16);
        assert_eq!(codec::get_word_at(req, 15), 12); // both data sections
        // first data section after the two specs
        let data0 = 19 + 24;
        assert_eq!(req[data0 + 1], 0x04); // RESBYTE
        assert_eq!(codec::get_word_at(req, data0 + 2), 16); // 2 bytes in bits
        assert_eq!(&req[data0 + 4..data0 + 6], &[0xDE, 0xAD]);
        // second item payload padded to even length
        let data1 = data0 + 6;
        assert_eq!(codec::get_word_at(req, data1 + 2), 8);
        assert_eq!(req[data1 + 4], 0x7F);
        assert_eq!(req[data1 + 5], 0x00);
    }

    #[test]
    fn test_write_per_item_cpu_error() {
        let reply = multi_write_reply(&[0x05, 0xFF]);
        let request_len = 19 + 24 + 6 + 6;
        let (mut client, handle) =
            connected_client(240, vec![Exchange::new(request_len, reply)]);

        let mut items = [
            DataItem::write(Area::DataBlock, DataType::Byte, 1, 0, 2, vec![1, 2]),
            DataItem::write(Area::Merker, DataType::Byte, 0, 0, 1, vec![3]),
        ];
        client.write_multi_vars(&mut items).unwrap();
        assert_eq!(items[0].result, Some(CpuError::AddressOutOfRange));
        assert!(items[1].is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn test_size_over_pdu() {
        let (mut client, handle) = connected_client(240, Vec::new());
        // 20 items of 12 bytes each never fit a 240-byte PDU next to the header
        let mut items: Vec<DataItem> = (0..20)
            .map(|i| DataItem::read(Area::DataBlock, DataType::Byte, 1, i * 4, 4))
            .collect();
        match client.read_multi_vars(&mut items) {
            Err(S7Error::SizeOverPdu) => {}
            other => panic!("expected SizeOverPdu, got {other:?}"),
        }
        drop(client);
        handle.join().unwrap();
    }

    #[test]
    fn test_counter_item_sizing() {
        let item = DataItem::read(Area::Counter, DataType::Counter, 0, 0, 3);
        assert_eq!(item.data.len(), 6);
        let item = DataItem::write(
            Area::Counter,
            DataType::Counter,
            0,
            0,
            2,
            vec![0, 1, 0, 2],
        );
        assert_eq!(item.write_len(), 4);
    }
}
