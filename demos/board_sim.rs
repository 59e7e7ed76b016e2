// Board simulator: plays the Tetrix side of the serial link
//
// Reads drive frames from a serial port (e.g. one end of a virtual null
// modem), mixes them and logs the four channel powers. Echoes a line per
// frame so the host's diagnostics have something to print.
//
// Usage: cargo run --example board_sim -- <port>

use tracing::{info, warn};

use mecanum_drive_runtime::config::init_logging;
use mecanum_drive_runtime::motor::tetrix::{Frame, FrameDecoder, TetrixLink};
use mecanum_drive_runtime::motor::{LogActuator, WheelDriver};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info");

    let port = std::env::args()
        .nth(1)
        .ok_or("usage: board_sim <port>")?;

    let mut link = TetrixLink::open(&port)?;
    let mut decoder = FrameDecoder::new();
    let mut driver = WheelDriver::with_defaults(LogActuator::new());
    let mut connected = false;

    info!("Board simulator listening on {}", port);

    loop {
        for frame in decoder.extend(&link.read_available()?) {
            match frame {
                Frame::WaitingForController => {
                    info!("Host is waiting for its controller");
                    connected = false;
                    driver.stop()?;
                }
                Frame::ControllerConnected => {
                    info!("Controller connected");
                    connected = true;
                }
                Frame::SetDrive(input) if connected => {
                    let wheels = driver.set_drive_speed(input)?;
                    driver.actuator_mut().clear();
                    link.write_line(&format!(
                        "{:.0}\t{:.0}\t{:.0}\t{:.1}\t{:.1}\t{:.1}\t{:.1}",
                        input.x,
                        input.y,
                        input.rotation,
                        wheels.front_right,
                        wheels.rear_right,
                        wheels.front_left,
                        wheels.rear_left
                    ))?;
                }
                Frame::SetDrive(_) => warn!("Drive frame before controller connected, ignoring"),
            }
        }
    }
}
