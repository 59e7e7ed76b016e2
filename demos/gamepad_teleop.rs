// Gamepad teleop straight to the Tetrix board, no zenoh in between
//
// Left stick drives, right stick X rotates. Short gaps in the gamepad
// stream reuse the last report; longer ones center the sticks.
//
// Usage: cargo run --example gamepad_teleop -- [hidraw] [port]
// Defaults to /dev/hidraw0 and USB-id discovery of the board.

use std::thread::sleep;
use std::time::Duration;

use tracing::{info, warn};

use mecanum_drive_runtime::config::{init_logging, LOOP_HZ};
use mecanum_drive_runtime::input::{GamepadPoller, HidrawSource};
use mecanum_drive_runtime::motor::tetrix::{Frame, TetrixLink};
use mecanum_drive_runtime::motor::ControlInput;

const DEFAULT_HIDRAW: &str = "/dev/hidraw0";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info");

    let mut args = std::env::args().skip(1);
    let hidraw = args.next().unwrap_or_else(|| DEFAULT_HIDRAW.to_string());
    let mut link = match args.next() {
        Some(port) => TetrixLink::open(&port)?,
        None => TetrixLink::discover()?,
    };

    link.send(Frame::WaitingForController)?;
    let source = HidrawSource::open(&hidraw)?;
    link.send(Frame::ControllerConnected)?;
    info!("Gamepad {} connected, driving", hidraw);

    let mut poller = GamepadPoller::new(source);
    let period = Duration::from_millis(1000 / LOOP_HZ);
    let result = drive(&mut link, &mut poller, period);

    if let Err(e) = link.send_drive(ControlInput::zero()) {
        warn!("Failed to stop base: {}", e);
    }
    result
}

fn drive(
    link: &mut TetrixLink,
    poller: &mut GamepadPoller<HidrawSource>,
    period: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        link.send_drive(poller.poll_input())?;
        for line in link.drain_lines()? {
            println!("{}", line);
        }
        sleep(period);
    }
}
