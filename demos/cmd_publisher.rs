// Keyboard teleop for the drive topic
//
// W/S forward/back, A/D strafe, Z/X rotate, 1-3 speed step, Q or Esc quit.
// An axis falls back to zero when its key has not repeated for a while,
// so releasing every key stops the base.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::{Duration, Instant};
use tracing::info;

use mecanum_drive_runtime::config::{init_logging, LOOP_HZ, TOPIC_CMD_DRIVE};
use mecanum_drive_runtime::messages::DriveCommand;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const SPEED_STEPS: [f64; 3] = [40.0, 70.0, 100.0];
const KEY_HOLD: Duration = Duration::from_millis(100);

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
    Rotation,
}

fn key_axis(c: char) -> Option<(Axis, f64)> {
    match c {
        'w' => Some((Axis::Y, 1.0)),
        's' => Some((Axis::Y, -1.0)),
        'd' => Some((Axis::X, 1.0)),
        'a' => Some((Axis::X, -1.0)),
        'x' => Some((Axis::Rotation, 1.0)),
        'z' => Some((Axis::Rotation, -1.0)),
        _ => None,
    }
}

/// Axis values plus when each was last pressed
#[derive(Default)]
struct Held {
    values: [f64; 3],
    since: [Option<Instant>; 3],
}

impl Held {
    fn press(&mut self, axis: Axis, value: f64) {
        self.values[axis as usize] = value;
        self.since[axis as usize] = Some(Instant::now());
    }

    fn command(&mut self) -> DriveCommand {
        for (value, since) in self.values.iter_mut().zip(self.since.iter_mut()) {
            if since.is_some_and(|t| t.elapsed() > KEY_HOLD) {
                *value = 0.0;
                *since = None;
            }
        }
        DriveCommand {
            x: self.values[Axis::X as usize],
            y: self.values[Axis::Y as usize],
            rotation: self.values[Axis::Rotation as usize],
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    init_logging("info");

    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_DRIVE).await?;
    info!("Publishing to {}; W/S A/D Z/X move, 1-3 speed, Q quit", TOPIC_CMD_DRIVE);

    enable_raw_mode()?;
    let result = teleop(&publisher).await;
    disable_raw_mode()?;
    result
}

async fn teleop(publisher: &zenoh::pubsub::Publisher<'_>) -> Result<(), BoxError> {
    let period = Duration::from_millis(1000 / LOOP_HZ);
    let mut speed = SPEED_STEPS[0];
    let mut held = Held::default();

    loop {
        while event::poll(period)? {
            let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
                continue;
            };
            if kind == KeyEventKind::Release {
                continue;
            }
            match code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char(c @ '1'..='3') => {
                    speed = SPEED_STEPS[(c as usize) - ('1' as usize)];
                    info!("Speed: {}", speed);
                }
                KeyCode::Char(c) => {
                    if let Some((axis, sign)) = key_axis(c) {
                        held.press(axis, sign * speed);
                    }
                }
                _ => {}
            }
        }

        publisher.put(serde_json::to_string(&held.command())?).await?;
    }
}
