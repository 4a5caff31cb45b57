//! Reads a chunk of a data block and prints it as hex.
//!
//! Usage: `cargo run --example read_db -- <host> [db] [bytes]`

use s7comm::{Area, Client, DataType};

fn main() -> s7comm::Result<()> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "192.168.0.1".to_string());
    let db: u16 = args.next().and_then(|a| a.parse().ok()).unwrap_or(1);
    let amount: u16 = args.next().and_then(|a| a.parse().ok()).unwrap_or(16);

    let mut client = Client::connect_to(host, 0, 2)?;
    println!("connected, PDU length {}", client.pdu_length());

    let mut buf = vec![0u8; amount as usize];
    client.read_area(Area::DataBlock, db, 0, amount, DataType::Byte, &mut buf)?;

    for (i, chunk) in buf.chunks(16).enumerate() {
        print!("DB{}.DBB{:<4}", db, i * 16);
        for byte in chunk {
            print!(" {:02X}", byte);
        }
        println!();
    }

    client.disconnect();
    Ok(())
}
