//! Prints CPU identification, run state and clock of a PLC.
//!
//! Usage: `cargo run --example plc_info -- <host> [rack] [slot]`

use s7comm::Client;

fn main() -> s7comm::Result<()> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "192.168.0.1".to_string());
    let rack: u16 = args.next().and_then(|a| a.parse().ok()).unwrap_or(0);
    let slot: u16 = args.next().and_then(|a| a.parse().ok()).unwrap_or(2);

    let mut client = Client::connect_to(host, rack, slot)?;

    let order = client.order_code()?;
    println!("order code : {} (fw {})", order.code, order.firmware());

    let cpu = client.cpu_info()?;
    println!("module     : {}", cpu.module_type_name);
    println!("name       : {}", cpu.module_name);
    println!("serial     : {}", cpu.serial_number);

    println!("state      : {}", client.plc_status()?);
    println!("clock      : {}", client.get_plc_date_time()?);

    client.disconnect();
    Ok(())
}
