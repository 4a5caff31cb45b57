//! # Siemens S7 Protocol Library
//!
//! A Rust library for communicating with Siemens SIMATIC PLCs over
//! ISO-on-TCP (RFC 1006, port 102).
//!
//! This is a **protocol-only** library—no business logic, polling,
//! schedulers, or application-level features. Each operation produces
//! exactly one request and one response per telegram fragment. No automatic
//! retries, caching, or reconnection.
//!
//! ## Features
//!
//! - **Protocol-only** — focuses solely on the S7 request/response engine
//! - **Deterministic** — strictly alternating send/receive, one operation
//!   in flight
//! - **Type-safe** — areas, transport types and block types as enums
//! - **No panics** — all errors returned as `Result<T, S7Error>` with
//!   stable numeric codes
//! - **Complete API** — area read/write with fragmentation, multi-variable
//!   batches, SZL introspection, run-state control, clock, session password
//!
//! ## Quick Start
//!
//! ```no_run
//! use s7comm::{Area, Client, ClientConfig, DataType};
//!
//! fn main() -> s7comm::Result<()> {
//!     // Connect to an S7-300 at rack 0, slot 2
//!     let mut client = Client::connect_to("192.168.0.1", 0, 2)?;
//!     println!("negotiated PDU length: {}", client.pdu_length());
//!
//!     // Read 10 bytes from DB1
//!     let mut buf = [0u8; 10];
//!     client.read_area(Area::DataBlock, 1, 0, 10, DataType::Byte, &mut buf)?;
//!     println!("DB1.DBB0..9 = {:?}", buf);
//!
//!     // Set the flag M10.3
//!     client.write_bit(Area::Merker, 0, 10, 3, true)?;
//!
//!     client.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! ## Data Areas
//!
//! | Area | Description | Addressing |
//! |------|-------------|------------|
//! | [`Area::Input`] | Process inputs (I) | byte, bit-capable |
//! | [`Area::Output`] | Process outputs (Q) | byte, bit-capable |
//! | [`Area::Merker`] | Flag memory (M) | byte, bit-capable |
//! | [`Area::DataBlock`] | Data blocks (DB) | byte, bit-capable, DB number |
//! | [`Area::Counter`] | Counters (C) | one element = 2 bytes |
//! | [`Area::Timer`] | Timers (T) | one element = 2 bytes |
//!
//! Transfers larger than the PDU length negotiated during [`Client::connect`]
//! are fragmented into consecutive telegrams transparently.
//!
//! ## Batch Operations
//!
//! Up to 20 unrelated variables travel in one round trip:
//!
//! ```no_run
//! # use s7comm::{Area, Client, DataItem, DataType};
//! # let mut client = Client::connect_to("192.168.0.1", 0, 2)?;
//! let mut items = [
//!     DataItem::read(Area::DataBlock, DataType::Byte, 1, 0, 8),
//!     DataItem::read(Area::Input, DataType::Byte, 0, 0, 2),
//! ];
//! client.read_multi_vars(&mut items)?;
//! for item in &items {
//!     match item.result {
//!         None => println!("{} -> {:?}", item.area, item.data),
//!         Some(e) => println!("{} failed: {}", item.area, e),
//!     }
//! }
//! # Ok::<(), s7comm::S7Error>(())
//! ```
//!
//! ## Introspection and Control
//!
//! ```no_run
//! # use s7comm::Client;
//! # let mut client = Client::connect_to("192.168.0.1", 0, 2)?;
//! let cpu = client.cpu_info()?;
//! println!("{} ({})", cpu.module_type_name, client.order_code()?.code);
//! println!("state: {}", client.plc_status()?);
//! println!("clock: {}", client.get_plc_date_time()?);
//! # Ok::<(), s7comm::S7Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, S7Error>`]. The library never panics
//! in public code. CPU-side status bytes are mapped to [`CpuError`] so
//! callers never interpret raw codes; every error exposes a stable integer
//! tag through [`S7Error::code`] for dashboards that track the classic code
//! table.
//!
//! ## Concurrency Contract
//!
//! A client owns one socket and one scratch buffer; every operation
//! overwrites the buffer, and `&mut self` receivers enforce one in-flight
//! operation at compile time. For parallelism, open several clients.
//!
//! ## Design Philosophy
//!
//! 1. Each operation does exactly what it says
//! 2. No magic or implicit behavior
//! 3. The application has full control over retry and reconnection
//! 4. Errors are always explicit, with the numeric contract preserved

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod client;
pub mod codec;
mod error;
mod info;
mod telegram;
mod transport;
mod types;
mod watchdog;

// Public re-exports
pub use client::{Client, ClientConfig, DataItem, Szl};
pub use error::{cpu_error, CpuError, Result, S7Error};
pub use info::{BlockInfo, CpInfo, CpuInfo, OrderCode, Protection};
pub use telegram::{ISO_TCP_PORT, MAX_VARS};
pub use transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECV_TIMEOUT};
pub use types::{Area, BlockType, ConnectionType, CpuStatus, DataType};
pub use watchdog::PingWatchdog;
