// Tetrix board serial protocol
//
// The host streams drive frames to the board, which runs the mixer and the
// motor shields:
//   SetDrive:              [0x10, x, y, rotation]   each axis encoded 0..=200
//   WaitingForController:  [0x05]                    sent standalone
//   ControllerConnected:   [0x06]                    sent standalone
// The board answers with newline-terminated text for diagnostics.

use serialport::{self, SerialPort, SerialPortType};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info};

use crate::input::{translate, DRIVE_RANGE};
use crate::motor::mixer::ControlInput;

/// Default serial configuration for the Tetrix board
pub const DEFAULT_BAUDRATE: u32 = 9600;
pub const DEFAULT_TIMEOUT_MS: u64 = 10;

/// USB IDs of the board's FTDI serial bridge
pub const TETRIX_USB_VID: u16 = 0x0403;
pub const TETRIX_USB_PID: u16 = 0x6001;

/// Range each axis is encoded into on the wire
pub const WIRE_RANGE: (i32, i32) = (0, 200);

/// Frame identifiers
pub const SET_DRIVE: u8 = 0x10;
pub const WAITING_FOR_CONTROLLER: u8 = 0x05;
pub const CONTROLLER_CONNECTED: u8 = 0x06;

const SET_DRIVE_LEN: usize = 4;

/// Error types for Tetrix communication
#[derive(Debug, thiserror::Error)]
pub enum TetrixError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No serial port with USB id {vid:04x}:{pid:04x} found")]
    NoPortFound { vid: u16, pid: u16 },
}

pub type Result<T> = std::result::Result<T, TetrixError>;

/// Encode a drive axis in [-100, 100] to its wire byte
pub fn encode_axis(value: f64) -> u8 {
    let clamped = value.clamp(DRIVE_RANGE.0 as f64, DRIVE_RANGE.1 as f64);
    translate(clamped, DRIVE_RANGE, WIRE_RANGE).round() as u8
}

/// Decode a wire byte back to a drive axis in [-100, 100]
pub fn decode_axis(raw: u8) -> i8 {
    let value = translate(raw as f64, WIRE_RANGE, DRIVE_RANGE).round();
    value.clamp(DRIVE_RANGE.0 as f64, DRIVE_RANGE.1 as f64) as i8
}

/// A message from host to board
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    SetDrive(ControlInput),
    WaitingForController,
    ControllerConnected,
}

impl Frame {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Frame::SetDrive(input) => vec![
                SET_DRIVE,
                encode_axis(input.x),
                encode_axis(input.y),
                encode_axis(input.rotation),
            ],
            Frame::WaitingForController => vec![WAITING_FOR_CONTROLLER],
            Frame::ControllerConnected => vec![CONTROLLER_CONNECTED],
        }
    }
}

/// Byte-at-a-time frame parser for the board side
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns a frame once one is complete
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        if !self.pending.is_empty() {
            self.pending.push(byte);
            if self.pending.len() < SET_DRIVE_LEN {
                return None;
            }
            let input = ControlInput::new(
                decode_axis(self.pending[1]) as f64,
                decode_axis(self.pending[2]) as f64,
                decode_axis(self.pending[3]) as f64,
            );
            self.pending.clear();
            return Some(Frame::SetDrive(input));
        }

        match byte {
            SET_DRIVE => {
                self.pending.push(byte);
                None
            }
            WAITING_FOR_CONTROLLER => Some(Frame::WaitingForController),
            CONTROLLER_CONNECTED => Some(Frame::ControllerConnected),
            other => {
                debug!("Skipping stray byte 0x{:02X}", other);
                None
            }
        }
    }

    /// Feed a buffer, collecting every completed frame
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }
}

/// Serial link to the Tetrix board
pub struct TetrixLink {
    port: Box<dyn SerialPort>,
    line_buf: Vec<u8>,
}

impl TetrixLink {
    /// Open a new connection to the board
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    /// Open with custom baudrate
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        info!("Opening Tetrix link on {} at {} baud", port_name, baudrate);
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self {
            port,
            line_buf: Vec::new(),
        })
    }

    /// Find the board's serial port by its USB ids
    pub fn find_port() -> Result<String> {
        serialport::available_ports()?
            .into_iter()
            .find(|p| match &p.port_type {
                SerialPortType::UsbPort(usb) => {
                    usb.vid == TETRIX_USB_VID && usb.pid == TETRIX_USB_PID
                }
                _ => false,
            })
            .map(|p| p.port_name)
            .ok_or(TetrixError::NoPortFound {
                vid: TETRIX_USB_VID,
                pid: TETRIX_USB_PID,
            })
    }

    /// Open the first port that looks like a Tetrix board
    pub fn discover() -> Result<Self> {
        let port_name = Self::find_port()?;
        Self::open(&port_name)
    }

    pub fn send(&mut self, frame: Frame) -> Result<()> {
        let bytes = frame.encode();
        self.port.write_all(&bytes)?;
        self.port.flush()?;
        Ok(())
    }

    /// Send a drive frame
    pub fn send_drive(&mut self, input: ControlInput) -> Result<()> {
        debug!(
            "Drive frame: x={:.0}, y={:.0}, rotation={:.0}",
            input.x, input.y, input.rotation
        );
        self.send(Frame::SetDrive(input))
    }

    /// Read whatever the board has printed and return complete lines
    pub fn drain_lines(&mut self) -> Result<Vec<String>> {
        let available = self.port.bytes_to_read()? as usize;
        if available > 0 {
            let mut chunk = vec![0u8; available];
            let n = self.port.read(&mut chunk)?;
            self.line_buf.extend_from_slice(&chunk[..n]);
        }
        Ok(split_lines(&mut self.line_buf))
    }

    /// Read raw bytes (board side); returns an empty buffer on timeout
    pub fn read_available(&mut self) -> Result<Vec<u8>> {
        let mut chunk = [0u8; 64];
        match self.port.read(&mut chunk) {
            Ok(n) => Ok(chunk[..n].to_vec()),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(TetrixError::Io(e)),
        }
    }

    /// Write a text line back to the host (board side)
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\r\n")?;
        self.port.flush()?;
        Ok(())
    }
}

/// Host side of a drive link: frames out, status lines back
pub trait DriveLink: Send {
    fn send(&mut self, frame: Frame) -> Result<()>;

    fn drain_lines(&mut self) -> Result<Vec<String>>;

    fn send_drive(&mut self, input: ControlInput) -> Result<()> {
        self.send(Frame::SetDrive(input))
    }
}

impl DriveLink for TetrixLink {
    fn send(&mut self, frame: Frame) -> Result<()> {
        TetrixLink::send(self, frame)
    }

    fn drain_lines(&mut self) -> Result<Vec<String>> {
        TetrixLink::drain_lines(self)
    }

    fn send_drive(&mut self, input: ControlInput) -> Result<()> {
        TetrixLink::send_drive(self, input)
    }
}

/// Take every complete line out of `buf`, leaving any partial tail
fn split_lines(buf: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buf.drain(..=pos).collect();
        lines.push(String::from_utf8_lossy(&line).trim_end().to_string());
    }
    lines
}
