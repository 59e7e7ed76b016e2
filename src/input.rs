// Operator input helpers
//
// Range translation, joystick zone adjustment, decoding of the gamepad HID
// report and a poller that rides out short gaps in the report stream.
// Sticks report signed 16-bit values; the drive expects each axis in
// [-100, 100].

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::motor::mixer::ControlInput;

/// Raw stick range (signed short)
pub const JOYSTICK_RANGE: (i32, i32) = (-32768, 32767);

/// Readings with a magnitude below this are treated as centered
pub const DEAD_ZONE: i16 = 500;

/// Readings with a magnitude above this are treated as full deflection
pub const MAX_ZONE: i16 = 30000;

/// Range the drive axes are expressed in
pub const DRIVE_RANGE: (i32, i32) = (-100, 100);

// Byte offsets inside the gamepad report (low byte, high byte)
const LEFT_X: (usize, usize) = (6, 7);
const LEFT_Y: (usize, usize) = (8, 9);
const RIGHT_X: (usize, usize) = (10, 11);
const RIGHT_Y: (usize, usize) = (12, 13);

/// Minimum report length that contains every stick
pub const REPORT_MIN_LEN: usize = 14;

/// Report used once the pad has been silent for too long: sticks centered
pub const NO_DATA_REPORT: [u8; 20] = [0, 20, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// How long one read waits for a report
pub const READ_TIMEOUT: Duration = Duration::from_millis(60);

/// Failed reads tolerated before falling back to [`NO_DATA_REPORT`]
///
/// The pad only sends a report when something changes, so a few empty reads
/// in a row are normal while a stick is held still.
pub const MAX_FAILURES: u32 = 3;

/// Linearly map `value` from `from` onto `to`
pub fn translate(value: f64, from: (i32, i32), to: (i32, i32)) -> f64 {
    let from_span = (from.1 - from.0) as f64;
    let to_span = (to.1 - to.0) as f64;

    let fraction = (value - from.0 as f64) / from_span;
    to.0 as f64 + fraction * to_span
}

/// Apply the dead zone and max zone to a raw stick reading
pub fn apply_zones(value: i16) -> i16 {
    let magnitude = value.unsigned_abs();
    if magnitude < DEAD_ZONE as u16 {
        0
    } else if magnitude > MAX_ZONE as u16 {
        if value < 0 {
            -(JOYSTICK_RANGE.1 as i16)
        } else {
            JOYSTICK_RANGE.1 as i16
        }
    } else {
        value
    }
}

/// Combine two report bytes into a signed short
pub fn decode_short(low: u8, high: u8) -> i16 {
    i16::from_le_bytes([low, high])
}

/// Stick positions from one gamepad report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamepadReport {
    pub left_x: i16,
    pub left_y: i16,
    pub right_x: i16,
    pub right_y: i16,
}

impl GamepadReport {
    /// Parse a raw HID report; `None` if it is too short
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < REPORT_MIN_LEN {
            return None;
        }
        let read = |(lo, hi): (usize, usize)| decode_short(data[lo], data[hi]);

        Some(Self {
            left_x: read(LEFT_X),
            left_y: read(LEFT_Y),
            right_x: read(RIGHT_X),
            right_y: read(RIGHT_Y),
        })
    }

    /// Left stick (x, y) with zone adjustment, mapped onto `range`
    pub fn left_stick(&self, range: (i32, i32)) -> (i32, i32) {
        let x = apply_zones(self.left_x) as f64;
        let y = apply_zones(self.left_y) as f64;
        (
            translate(x, JOYSTICK_RANGE, range).round() as i32,
            translate(y, JOYSTICK_RANGE, range).round() as i32,
        )
    }

    /// Right stick (x, y) mapped onto `range`, no zone adjustment
    pub fn right_stick(&self, range: (i32, i32)) -> (i32, i32) {
        (
            translate(self.right_x as f64, JOYSTICK_RANGE, range).round() as i32,
            translate(self.right_y as f64, JOYSTICK_RANGE, range).round() as i32,
        )
    }
}

impl ControlInput {
    /// Left stick drives translation, right stick x drives rotation
    pub fn from_report(report: &GamepadReport) -> Self {
        let (x, y) = report.left_stick(DRIVE_RANGE);
        let (rotation, _) = report.right_stick(DRIVE_RANGE);
        Self::new(x as f64, y as f64, rotation as f64)
    }
}

/// Something that hands out raw gamepad reports
pub trait ReportSource {
    /// Next report, or an error if none arrived in time
    fn read_report(&mut self) -> io::Result<Vec<u8>>;
}

/// Reports from a Linux hidraw device node (e.g. `/dev/hidraw0`)
///
/// A background thread does the blocking reads; `read_report` waits at
/// most [`READ_TIMEOUT`] for the next one.
pub struct HidrawSource {
    reports: Receiver<Vec<u8>>,
    timeout: Duration,
}

impl HidrawSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        info!("Reading gamepad reports from {}", path.display());

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = [0u8; 64];
            loop {
                match file.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Gamepad read failed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            reports: rx,
            timeout: READ_TIMEOUT,
        })
    }
}

impl ReportSource for HidrawSource {
    fn read_report(&mut self) -> io::Result<Vec<u8>> {
        self.reports.recv_timeout(self.timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => io::Error::from(io::ErrorKind::TimedOut),
            RecvTimeoutError::Disconnected => io::Error::from(io::ErrorKind::NotConnected),
        })
    }
}

/// Polls a [`ReportSource`], reusing the last good report across short gaps
pub struct GamepadPoller<S: ReportSource> {
    source: S,
    last_data: Vec<u8>,
    failures: u32,
}

impl<S: ReportSource> GamepadPoller<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_data: NO_DATA_REPORT.to_vec(),
            failures: 0,
        }
    }

    /// Raw bytes for this poll
    ///
    /// A good read replaces the stored report and resets the failure count.
    /// A failed or short read returns the stored report up to
    /// [`MAX_FAILURES`] times in a row, then [`NO_DATA_REPORT`] until the pad
    /// speaks again.
    pub fn poll_bytes(&mut self) -> &[u8] {
        match self.source.read_report() {
            Ok(data) if data.len() >= REPORT_MIN_LEN => {
                self.last_data = data;
                self.failures = 0;
                self.last_data.as_slice()
            }
            result => {
                if let Err(e) = result {
                    debug!("No gamepad report: {}", e);
                }
                if self.failures >= MAX_FAILURES {
                    &NO_DATA_REPORT[..]
                } else {
                    self.failures += 1;
                    self.last_data.as_slice()
                }
            }
        }
    }

    pub fn poll(&mut self) -> GamepadReport {
        GamepadReport::parse(self.poll_bytes()).unwrap_or_default()
    }

    /// Poll and convert straight to a drive input
    pub fn poll_input(&mut self) -> ControlInput {
        ControlInput::from_report(&self.poll())
    }
}
