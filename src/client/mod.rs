//! S7 client session: handshake, framing and the request engine.
//!
//! A [`Client`] owns one TCP connection to a PLC and drives it with a
//! strictly alternating send/receive discipline: at most one request is in
//! flight, enforced at compile time by the `&mut self` receivers. Callers
//! wanting parallelism create separate clients.
//!
//! Connecting performs the three-stage handshake:
//!
//! 1. TCP connection (port 102, `TCP_NODELAY`)
//! 2. ISO 8073 connection request/confirm carrying the local and remote TSAP
//! 3. S7 PDU length negotiation
//!
//! After stage 3 the negotiated PDU length caps every transfer; larger
//! reads and writes are fragmented transparently (see
//! [`Client::read_area`]).
//!
//! # Example
//!
//! ```no_run
//! use s7comm::{Area, Client, ClientConfig, DataType};
//!
//! // Rack 0, slot 2 — the usual spot for an S7-300 CPU
//! let mut client = Client::new(ClientConfig::new("192.168.0.1").with_rack_slot(0, 2));
//! client.connect()?;
//!
//! let mut buf = [0u8; 10];
//! client.read_area(Area::DataBlock, 1, 0, 10, DataType::Byte, &mut buf)?;
//! println!("DB1.DBB0..9 = {:?}", buf);
//!
//! client.disconnect();
//! # Ok::<(), s7comm::S7Error>(())
//! ```

mod area;
mod control;
mod multi;
mod szl;

pub use multi::DataItem;
pub use szl::Szl;

use std::time::Duration;

use tracing::debug;

use crate::codec;
use crate::error::{Result, S7Error};
use crate::telegram;
use crate::transport::{TcpTransport, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECV_TIMEOUT};
use crate::types::ConnectionType;

/// Connection confirm TPDU code expected in the ISO handshake reply.
const COTP_CC: u8 = 0xD0;

/// Configuration for creating an S7 client.
///
/// # Example
///
/// ```
/// use s7comm::{ClientConfig, ConnectionType};
/// use std::time::Duration;
///
/// let config = ClientConfig::new("192.168.0.1")
///     .with_rack_slot(0, 2)
///     .with_connection_type(ConnectionType::Op)
///     .with_recv_timeout(Duration::from_secs(5));
/// assert_eq!(config.port, 102);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// PLC host name or IP address.
    pub host: String,
    /// ISO-on-TCP port (default 102).
    pub port: u16,
    /// Connection role announced in the remote TSAP (default PG).
    pub connection_type: ConnectionType,
    /// CPU rack number (default 0).
    pub rack: u16,
    /// CPU slot number (default 2).
    pub slot: u16,
    /// Local TSAP (default 0x0100).
    pub local_tsap: u16,
    /// Remote TSAP override. When `None` the TSAP is derived from the
    /// connection type, rack and slot.
    pub remote_tsap: Option<u16>,
    /// Receive timeout (default 2 s).
    pub recv_timeout: Duration,
    /// Connect timeout (default 5 s).
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Creates a configuration for the given host with protocol defaults.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: telegram::ISO_TCP_PORT,
            connection_type: ConnectionType::default(),
            rack: 0,
            slot: 2,
            local_tsap: 0x0100,
            remote_tsap: None,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets a custom ISO-TCP port (default is 102).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connection role (default is PG).
    pub fn with_connection_type(mut self, connection_type: ConnectionType) -> Self {
        self.connection_type = connection_type;
        self
    }

    /// Sets the CPU rack and slot used for TSAP derivation.
    pub fn with_rack_slot(mut self, rack: u16, slot: u16) -> Self {
        self.rack = rack;
        self.slot = slot;
        self
    }

    /// Overrides both TSAPs explicitly, bypassing rack/slot derivation.
    pub fn with_tsaps(mut self, local: u16, remote: u16) -> Self {
        self.local_tsap = local;
        self.remote_tsap = Some(remote);
        self
    }

    /// Sets the receive timeout (default is 2 seconds).
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Sets the connect timeout (default is 5 seconds).
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the remote TSAP: the explicit override if set, otherwise
    /// `(connection_type << 8) | (rack * 0x20 + slot)`.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::ClientConfig;
    ///
    /// let config = ClientConfig::new("plc").with_rack_slot(0, 2);
    /// assert_eq!(config.remote_tsap(), 0x0102);
    /// ```
    pub fn remote_tsap(&self) -> u16 {
        self.remote_tsap
            .unwrap_or_else(|| (self.connection_type.code() << 8) | (self.rack * 0x20 + self.slot))
    }
}

/// S7 client for communicating with SIMATIC PLCs over ISO-on-TCP.
///
/// Each operation produces exactly one request/response pair per fragment.
/// No automatic retries, caching or reconnection; callers decide how to
/// react to errors. The session is single-use in the sense that one
/// operation is in flight at a time, but `connect` may be called again
/// after `disconnect` or a fatal transport error.
pub struct Client {
    config: ClientConfig,
    transport: Option<TcpTransport>,
    /// Reusable working buffer; every operation overwrites it.
    pdu: [u8; telegram::PDU_BUFFER_SIZE],
    /// Negotiated PDU length; 0 until the handshake completes.
    pdu_length: usize,
    /// COTP TPDU code of the last received frame.
    last_pdu_type: u8,
    connected: bool,
}

impl Client {
    /// Creates an idle (not yet connected) client.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            pdu: [0; telegram::PDU_BUFFER_SIZE],
            pdu_length: 0,
            last_pdu_type: 0,
            connected: false,
        }
    }

    /// Creates a client for `host` at the given rack/slot and connects it.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7comm::Client;
    ///
    /// let mut client = Client::connect_to("192.168.0.1", 0, 2)?;
    /// # Ok::<(), s7comm::S7Error>(())
    /// ```
    pub fn connect_to(host: impl Into<String>, rack: u16, slot: u16) -> Result<Self> {
        let mut client = Client::new(ClientConfig::new(host).with_rack_slot(rack, slot));
        client.connect()?;
        Ok(client)
    }

    /// Performs the three-stage handshake.
    ///
    /// On any failure the socket is closed and the client reverts to its
    /// pre-connect state; calling `connect` again is permitted.
    pub fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        debug!(host = %self.config.host, port = self.config.port, "connecting");
        let result = self.try_connect();
        match result {
            Ok(()) => self.connected = true,
            Err(_) => self.teardown(),
        }
        result
    }

    fn try_connect(&mut self) -> Result<()> {
        let transport = TcpTransport::open(
            &self.config.host,
            self.config.port,
            self.config.connect_timeout,
            self.config.recv_timeout,
        )?;
        self.transport = Some(transport);
        self.iso_connect()?;
        self.negotiate_pdu_length()
    }

    /// Stage 2: ISO 8073 connection request carrying both TSAPs.
    fn iso_connect(&mut self) -> Result<()> {
        self.load_template(&telegram::ISO_CR);
        codec::set_word_at(&mut self.pdu, 16, self.config.local_tsap);
        codec::set_word_at(&mut self.pdu, 20, self.config.remote_tsap());
        let length = self.request(telegram::ISO_CR.len())?;
        if length != telegram::ISO_CR.len() {
            return Err(S7Error::IsoInvalidPdu);
        }
        if self.last_pdu_type != COTP_CC {
            return Err(S7Error::IsoConnectionFailed);
        }
        Ok(())
    }

    /// Stage 3: S7 setup-communication, capturing the negotiated length.
    fn negotiate_pdu_length(&mut self) -> Result<()> {
        self.load_template(&telegram::PDU_NEGOTIATION);
        codec::set_word_at(&mut self.pdu, 23, telegram::PDU_SIZE_REQUESTED);
        let length = self.request(telegram::PDU_NEGOTIATION.len())?;
        if length != 27 || self.pdu[17] != 0 || self.pdu[18] != 0 {
            return Err(S7Error::IsoNegotiatingPdu);
        }
        let negotiated = codec::get_word_at(&self.pdu, 25) as usize;
        if negotiated == 0 {
            return Err(S7Error::IsoNegotiatingPdu);
        }
        self.pdu_length = negotiated;
        debug!(pdu_length = negotiated, "PDU length negotiated");
        Ok(())
    }

    /// Closes the session. Idempotent; `connect` may be called again.
    pub fn disconnect(&mut self) {
        self.teardown();
    }

    /// Returns whether the handshake completed and no fatal transport error
    /// occurred since.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns the negotiated PDU length (0 before `connect`).
    pub fn pdu_length(&self) -> usize {
        self.pdu_length
    }

    /// Returns the COTP TPDU code of the last received frame.
    pub fn last_pdu_type(&self) -> u8 {
        self.last_pdu_type
    }

    fn teardown(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.pdu_length = 0;
        self.connected = false;
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.transport.is_some() {
            Ok(())
        } else {
            Err(S7Error::NotConnected)
        }
    }

    /// Copies a template into the working buffer.
    pub(crate) fn load_template(&mut self, template: &[u8]) {
        self.pdu[..template.len()].copy_from_slice(template);
    }

    /// Drops the socket on errors that leave it unusable; timeouts keep the
    /// session open.
    fn register_failure(&mut self, e: S7Error) -> S7Error {
        match &e {
            S7Error::TcpDataSend(_) | S7Error::TcpDataRecv(_) | S7Error::TcpConnectionReset => {
                self.teardown()
            }
            _ => {}
        }
        e
    }

    /// Sends the first `len` bytes of the working buffer.
    pub(crate) fn send_pdu(&mut self, len: usize) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(S7Error::NotConnected)?;
        match transport.send(&self.pdu[..len]) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.register_failure(e)),
        }
    }

    fn recv_into(&mut self, offset: usize, len: usize) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(S7Error::NotConnected)?;
        match transport.recv_exact(&mut self.pdu[offset..offset + len]) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.register_failure(e)),
        }
    }

    /// Receives one ISO packet into the working buffer and returns its total
    /// length.
    ///
    /// Empty frames (TPKT + COTP only, 7 bytes) are keep-alives and skipped.
    /// Frames outside `[16, 487]` are rejected as invalid.
    pub(crate) fn recv_iso_packet(&mut self) -> Result<usize> {
        let size = loop {
            self.recv_into(0, 4)?;
            let size = codec::get_word_at(&self.pdu, 2) as usize;
            if size == telegram::ISO_HEADER_SIZE {
                // keep-alive: consume the COTP bytes and wait for a real frame
                self.recv_into(4, 3)?;
                continue;
            }
            if !(telegram::MIN_PDU_SIZE..=telegram::MAX_PDU_SIZE).contains(&size) {
                return Err(S7Error::IsoInvalidPdu);
            }
            break size;
        };
        self.recv_into(4, 3)?;
        self.last_pdu_type = self.pdu[5];
        self.recv_into(telegram::ISO_HEADER_SIZE, size - telegram::ISO_HEADER_SIZE)?;
        Ok(size)
    }

    /// Sends the first `len` working-buffer bytes and receives the reply.
    pub(crate) fn request(&mut self, len: usize) -> Result<usize> {
        self.send_pdu(len)?;
        self.recv_iso_packet()
    }

    /// Reads a word out of the last received reply.
    pub(crate) fn reply_word(&self, pos: usize) -> u16 {
        codec::get_word_at(&self.pdu, pos)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("connected", &self.connected)
            .field("pdu_length", &self.pdu_length)
            .finish()
    }
}

/// Scripted PLC peer serving canned TPKT frames for the client tests.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// One request/reply pair: the peer reads exactly `expect` bytes, then
    /// writes `reply` (which may span several frames).
    pub(crate) struct Exchange {
        pub expect: usize,
        pub reply: Vec<u8>,
    }

    impl Exchange {
        pub(crate) fn new(expect: usize, reply: Vec<u8>) -> Self {
            Self { expect, reply }
        }
    }

    /// Spawns a one-connection PLC peer. Returns the port and a handle
    /// yielding the captured request bytes.
    pub(crate) fn spawn_plc(exchanges: Vec<Exchange>) -> (u16, JoinHandle<Vec<Vec<u8>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut requests = Vec::new();
            for exchange in exchanges {
                let mut buf = vec![0u8; exchange.expect];
                conn.read_exact(&mut buf).unwrap();
                requests.push(buf);
                if !exchange.reply.is_empty() {
                    conn.write_all(&exchange.reply).unwrap();
                }
            }
            requests
        });
        (port, handle)
    }

    /// ISO CC + PDU negotiation replies for a successful handshake.
    pub(crate) fn handshake_exchanges(pdu_length: u16) -> Vec<Exchange> {
        let cc = vec![
            0x03, 0x00, 0x00, 0x16, 0x11, 0xD0, 0x00, 0x01, 0x00, 0x01, 0x00, 0xC0, 0x01, 0x0A,
            0xC1, 0x02, 0x01, 0x00, 0xC2, 0x02, 0x01, 0x02,
        ];
        let mut pn = vec![
            0x03, 0x00, 0x00, 0x1B, 0x02, 0xF0, 0x80, 0x32, 0x03, 0x00, 0x00, 0x04, 0x00, 0x00,
            0x08, 0x00, 0x00, 0x00, 0x00, 0xF0, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
        ];
        codec::set_word_at(&mut pn, 25, pdu_length);
        vec![
            Exchange::new(telegram::ISO_CR.len(), cc),
            Exchange::new(telegram::PDU_NEGOTIATION.len(), pn),
        ]
    }

    /// Builds a read-job reply carrying `payload` at offset 25.
    pub(crate) fn read_reply(payload: &[u8]) -> Vec<u8> {
        let total = 25 + payload.len();
        let mut reply = vec![0u8; total];
        reply[0] = 0x03;
        codec::set_word_at(&mut reply, 2, total as u16);
        reply[4] = 0x02;
        reply[5] = 0xF0;
        reply[6] = 0x80;
        reply[7] = 0x32;
        reply[8] = 0x03; // ack-data
        codec::set_word_at(&mut reply, 13, 2);
        codec::set_word_at(&mut reply, 15, (payload.len() + 4) as u16);
        reply[19] = 0x04;
        reply[20] = 0x01;
        reply[21] = 0xFF;
        reply[22] = 0x04;
        codec::set_word_at(&mut reply, 23, (payload.len() * 8) as u16);
        reply[25..].copy_from_slice(payload);
        reply
    }

    /// Builds the fixed 22-byte write-job acknowledge.
    pub(crate) fn write_reply(result: u8) -> Vec<u8> {
        let mut reply = vec![0u8; 22];
        reply[0] = 0x03;
        codec::set_word_at(&mut reply, 2, 22);
        reply[4] = 0x02;
        reply[5] = 0xF0;
        reply[6] = 0x80;
        reply[7] = 0x32;
        reply[8] = 0x03;
        codec::set_word_at(&mut reply, 13, 2);
        codec::set_word_at(&mut reply, 15, 1);
        reply[19] = 0x05;
        reply[20] = 0x01;
        reply[21] = result;
        reply
    }

    /// Spawns a peer that completes the handshake (PDU length `pdu_length`)
    /// and then serves `exchanges`, and returns a connected client.
    pub(crate) fn connected_client(
        pdu_length: u16,
        exchanges: Vec<Exchange>,
    ) -> (Client, JoinHandle<Vec<Vec<u8>>>) {
        let mut all = handshake_exchanges(pdu_length);
        all.extend(exchanges);
        let (port, handle) = spawn_plc(all);
        let mut client = Client::new(
            ClientConfig::new("127.0.0.1")
                .with_port(port)
                .with_recv_timeout(Duration::from_millis(1000)),
        );
        client.connect().unwrap();
        (client, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("192.168.0.1");
        assert_eq!(config.port, 102);
        assert_eq!(config.connection_type, ConnectionType::Pg);
        assert_eq!(config.local_tsap, 0x0100);
        assert_eq!(config.recv_timeout, Duration::from_millis(2000));
        assert_eq!(config.connect_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_remote_tsap_derivation() {
        // PG, rack 0, slot 2
        let config = ClientConfig::new("plc").with_rack_slot(0, 2);
        assert_eq!(config.remote_tsap(), 0x0102);

        // OP, rack 1, slot 3: 0x02 << 8 | (0x20 + 3)
        let config = ClientConfig::new("plc")
            .with_connection_type(ConnectionType::Op)
            .with_rack_slot(1, 3);
        assert_eq!(config.remote_tsap(), 0x0223);

        for rack in 0..16u16 {
            for slot in 0..32u16 {
                let config = ClientConfig::new("plc").with_rack_slot(rack, slot);
                assert_eq!(config.remote_tsap(), 0x0100 | (rack * 0x20 + slot));
            }
        }

        // explicit override wins
        let config = ClientConfig::new("plc").with_tsaps(0x0200, 0x0301);
        assert_eq!(config.remote_tsap(), 0x0301);
        assert_eq!(config.local_tsap, 0x0200);
    }

    #[test]
    fn test_connect_negotiates_pdu_length() {
        let (port, handle) = spawn_plc(handshake_exchanges(240));
        let mut client = Client::new(
            ClientConfig::new("127.0.0.1")
                .with_port(port)
                .with_rack_slot(0, 2)
                .with_recv_timeout(Duration::from_millis(1000)),
        );
        client.connect().unwrap();

        assert!(client.is_connected());
        assert_eq!(client.pdu_length(), 240);
        assert_eq!(client.last_pdu_type(), 0xD0);

        let requests = handle.join().unwrap();
        // CR carries local TSAP 01 00 at 16..18 and remote TSAP 01 02 at 20..22
        assert_eq!(&requests[0][16..18], &[0x01, 0x00]);
        assert_eq!(&requests[0][20..22], &[0x01, 0x02]);
        // PN requests 480 bytes
        assert_eq!(codec::get_word_at(&requests[1], 23), 480);
    }

    #[test]
    fn test_connect_rejects_non_cc_reply() {
        let mut exchanges = handshake_exchanges(240);
        exchanges.truncate(1);
        // Turn the CC into a disconnect request
        exchanges[0].reply[5] = 0x80;
        let (port, _handle) = spawn_plc(exchanges);
        let mut client = Client::new(
            ClientConfig::new("127.0.0.1")
                .with_port(port)
                .with_recv_timeout(Duration::from_millis(1000)),
        );
        match client.connect() {
            Err(S7Error::IsoConnectionFailed) => {}
            other => panic!("expected IsoConnectionFailed, got {other:?}"),
        }
        assert!(!client.is_connected());
        assert_eq!(client.pdu_length(), 0);
    }

    #[test]
    fn test_connect_rejects_zero_negotiated_length() {
        let (port, _handle) = spawn_plc(handshake_exchanges(0));
        let mut client = Client::new(
            ClientConfig::new("127.0.0.1")
                .with_port(port)
                .with_recv_timeout(Duration::from_millis(1000)),
        );
        match client.connect() {
            Err(S7Error::IsoNegotiatingPdu) => {}
            other => panic!("expected IsoNegotiatingPdu, got {other:?}"),
        }
        assert!(!client.is_connected());
    }

    #[test]
    fn test_keep_alive_frames_are_skipped() {
        let mut exchanges = handshake_exchanges(240);
        // Prepend an empty TPKT+COTP frame to the CC reply
        let mut reply = vec![0x03, 0x00, 0x00, 0x07, 0x02, 0xF0, 0x80];
        reply.extend_from_slice(&exchanges[0].reply);
        exchanges[0].reply = reply;
        let (port, handle) = spawn_plc(exchanges);
        let mut client = Client::new(
            ClientConfig::new("127.0.0.1")
                .with_port(port)
                .with_recv_timeout(Duration::from_millis(1000)),
        );
        client.connect().unwrap();
        assert_eq!(client.pdu_length(), 240);
        handle.join().unwrap();
    }

    #[test]
    fn test_oversized_frame_is_rejected() {
        let mut exchanges = handshake_exchanges(240);
        exchanges.truncate(1);
        codec::set_word_at(&mut exchanges[0].reply, 2, 600);
        let (port, _handle) = spawn_plc(exchanges);
        let mut client = Client::new(
            ClientConfig::new("127.0.0.1")
                .with_port(port)
                .with_recv_timeout(Duration::from_millis(1000)),
        );
        match client.connect() {
            Err(S7Error::IsoInvalidPdu) => {}
            other => panic!("expected IsoInvalidPdu, got {other:?}"),
        }
    }

    #[test]
    fn test_operations_require_connection() {
        let mut client = Client::new(ClientConfig::new("127.0.0.1"));
        let mut buf = [0u8; 4];
        match client.read_area(
            crate::Area::DataBlock,
            1,
            0,
            4,
            crate::DataType::Byte,
            &mut buf,
        ) {
            Err(S7Error::NotConnected) => {}
            other => panic!("expected NotConnected, got {other:?}"),
        }
    }

    #[test]
    fn test_disconnect_resets_state() {
        let (mut client, handle) = connected_client(240, Vec::new());
        assert!(client.is_connected());
        client.disconnect();
        assert!(!client.is_connected());
        assert_eq!(client.pdu_length(), 0);
        handle.join().unwrap();
    }

    #[test]
    fn test_debug() {
        let client = Client::new(ClientConfig::new("10.0.0.1"));
        let debug_str = format!("{:?}", client);
        assert!(debug_str.contains("Client"));
        assert!(debug_str.contains("10.0.0.1"));
    }
}
