// Link diagnostic: checks the serial link to the Tetrix board
//
// Sends the controller handshake and zero drive frames only; the base
// should not move.
//
// Usage: cargo run --example link_diagnostic -- [port]
// Without a port the board is looked up by its USB id.

use std::thread::sleep;
use std::time::Duration;

use mecanum_drive_runtime::config::init_logging;
use mecanum_drive_runtime::motor::tetrix::{Frame, TetrixLink};
use mecanum_drive_runtime::motor::ControlInput;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("debug");

    println!("Tetrix link diagnostic (zero drive only)");
    println!();

    println!("Step 1: Opening serial port...");
    let mut link = match std::env::args().nth(1) {
        Some(port) => TetrixLink::open(&port),
        None => TetrixLink::discover(),
    }
    .map_err(|e| {
        println!("  ✗ {}", e);
        println!("  - Check the USB cable and that the board is powered");
        println!("  - Pass the port path explicitly if discovery fails");
        e
    })?;
    println!("  ✓ Port open");
    println!();

    println!("Step 2: Controller handshake...");
    link.send(Frame::WaitingForController)?;
    sleep(Duration::from_millis(100));
    link.send(Frame::ControllerConnected)?;
    println!("  ✓ Sent 0x05, 0x06");
    println!();

    println!("Step 3: Zero drive frames for 2 seconds...");
    let mut lines = 0;
    for _ in 0..40 {
        link.send_drive(ControlInput::zero())?;
        for line in link.drain_lines()? {
            println!("  board: {}", line);
            lines += 1;
        }
        sleep(Duration::from_millis(50));
    }
    println!();

    if lines == 0 {
        println!("No output from the board. Did you press the green start button?");
    } else {
        println!("✓ Board answered with {} lines", lines);
    }

    Ok(())
}
