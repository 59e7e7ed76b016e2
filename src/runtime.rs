// 50 Hz loop with watchdog
// If teleop stops sending commands, the base is driven to zero instead of
// repeating the last command forever.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{CMD_TIMEOUT, LOOP_HZ, Options, TOPIC_CMD_DRIVE, TOPIC_HEALTH, TOPIC_RT_WHEELS};
use crate::messages::{DriveCommand, RuntimeHealth, WheelActuation};
use crate::motor::tetrix::Frame;
use crate::motor::{
    ControlInput, DriveLink, LogActuator, MecanumMixer, TetrixLink, WheelCommand, WheelDriver,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct Runtime {
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    /// Process incoming command
    pub fn on_command(&mut self, cmd: DriveCommand) {
        debug!("Received command: {:?}", &cmd);
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = Instant::now();
    }

    /// Input for this tick based on watchdog state
    pub fn compute_input(&mut self) -> ControlInput {
        let cmd_age = self.cmd_received_at.elapsed();

        if cmd_age > CMD_TIMEOUT {
            if self.health != RuntimeHealth::CmdStale {
                warn!("Command stale ({:?} old), stopping base", cmd_age);
            }
            self.health = RuntimeHealth::CmdStale;
            ControlInput::zero()
        } else if let Some(ref cmd) = self.latest_cmd {
            if self.health != RuntimeHealth::Ok {
                info!("Receiving commands");
            }
            self.health = RuntimeHealth::Ok;
            ControlInput::from(cmd)
        } else {
            // No command ever received
            self.health = RuntimeHealth::CmdStale;
            ControlInput::zero()
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }
}

/// Where mixed commands go
pub enum Backend {
    /// No hardware; wheel powers are logged
    Sim(WheelDriver<LogActuator>),
    /// Tetrix board over serial; the board runs its own mixer
    Tetrix {
        link: Box<dyn DriveLink>,
        mixer: MecanumMixer,
    },
}

impl Backend {
    pub fn from_options(opts: &Options) -> Result<Self, BoxError> {
        let mixer = MecanumMixer::new(opts.mixer_config());

        let link = if let Some(port) = &opts.port {
            TetrixLink::open(port)?
        } else if opts.discover {
            TetrixLink::discover()?
        } else {
            info!("No serial port given, running in simulation");
            let driver = WheelDriver::new(LogActuator::new(), mixer, Default::default());
            return Ok(Backend::Sim(driver));
        };

        Ok(Backend::Tetrix {
            link: Box::new(link),
            mixer,
        })
    }

    /// Drive one tick, returning the mixed wheel command
    pub fn apply(&mut self, input: ControlInput) -> Result<WheelCommand, BoxError> {
        match self {
            Backend::Sim(driver) => {
                let wheels = driver.set_drive_speed(input)?;
                driver.actuator_mut().clear();
                Ok(wheels)
            }
            Backend::Tetrix { link, mixer } => {
                link.send_drive(input)?;
                for line in link.drain_lines()? {
                    debug!("Board says: {}", line);
                }
                Ok(mixer.mix_input(input))
            }
        }
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        // Sim stops through the driver's own drop
        if let Backend::Tetrix { link, .. } = self {
            info!("Sending zero drive frame");
            if let Err(e) = link.send_drive(ControlInput::zero()) {
                warn!("Failed to stop base on drop: {}", e);
            }
        }
    }
}

pub async fn run(opts: Options) -> Result<(), BoxError> {
    let mut backend = Backend::from_options(&opts)?;
    if let Backend::Tetrix { link, .. } = &mut backend {
        // Board waits for these before it starts accepting drive frames
        link.send(Frame::WaitingForController)?;
        link.send(Frame::ControllerConnected)?;
    }

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let pub_wheels = session.declare_publisher(TOPIC_RT_WHEELS).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new();
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD_DRIVE);
    info!("Publishing to: {}, {}", TOPIC_RT_WHEELS, TOPIC_HEALTH);

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut shutdown => {
                info!("Ctrl+C received, shutting down");
                return Ok(());
            }
        }

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => runtime.on_command(cmd),
                Err(e) => warn!("Failed to parse command: {}", e),
            }
        }

        // 2. Watchdog, then drive
        let input = runtime.compute_input();
        let wheels = backend.apply(input)?;

        // 3. Publish wheel telemetry
        let wheels_json = serde_json::to_string(&WheelActuation::from(&wheels))?;
        pub_wheels.put(wheels_json).await?;

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::tetrix::Result as LinkResult;
    use crate::motor::TetrixError;
    use std::sync::{Arc, Mutex};

    /// Link that records every frame and can be told to fail
    #[derive(Clone, Default)]
    struct RecordingLink {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        broken: bool,
    }

    impl DriveLink for RecordingLink {
        fn send(&mut self, frame: Frame) -> LinkResult<()> {
            if self.broken {
                return Err(TetrixError::Io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )));
            }
            self.sent.lock().unwrap().push(frame.encode());
            Ok(())
        }

        fn drain_lines(&mut self) -> LinkResult<Vec<String>> {
            Ok(vec!["Controller connected".to_string()])
        }
    }

    fn tetrix_backend(link: &RecordingLink) -> Backend {
        Backend::Tetrix {
            link: Box::new(link.clone()),
            mixer: MecanumMixer::default(),
        }
    }

    fn cmd(x: f64, y: f64, rotation: f64) -> DriveCommand {
        DriveCommand { x, y, rotation }
    }

    #[test]
    fn test_stale_until_first_command() {
        let mut runtime = Runtime::new();
        assert_eq!(runtime.compute_input(), ControlInput::zero());
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
    }

    #[test]
    fn test_fresh_command_passes_through() {
        let mut runtime = Runtime::new();
        runtime.on_command(cmd(10.0, 20.0, -30.0));
        assert_eq!(runtime.compute_input(), ControlInput::new(10.0, 20.0, -30.0));
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
    }

    #[test]
    fn test_watchdog_zeroes_old_command() {
        let mut runtime = Runtime::new();
        runtime.on_command(cmd(0.0, 100.0, 0.0));
        runtime.cmd_received_at = Instant::now() - (CMD_TIMEOUT + Duration::from_millis(50));
        assert_eq!(runtime.compute_input(), ControlInput::zero());
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
    }

    #[test]
    fn test_sim_backend_mixes() {
        let opts = Options {
            port: None,
            discover: false,
            legacy_speed: false,
            no_input_clamp: false,
        };
        let mut backend = Backend::from_options(&opts).unwrap();
        let wheels = backend.apply(ControlInput::new(0.0, 0.0, 100.0)).unwrap();
        assert_eq!(wheels, MecanumMixer::default().mix(0.0, 0.0, 100.0));
    }

    #[test]
    fn test_tetrix_backend_sends_axes_and_mixes_locally() {
        let link = RecordingLink::default();
        let mut backend = tetrix_backend(&link);
        let wheels = backend.apply(ControlInput::new(0.0, 100.0, 0.0)).unwrap();
        assert_eq!(wheels, MecanumMixer::default().mix(0.0, 100.0, 0.0));
        assert_eq!(link.sent.lock().unwrap()[0], vec![0x10, 100, 200, 100]);
    }

    #[test]
    fn test_tetrix_backend_sends_zero_frame_on_drop() {
        let link = RecordingLink::default();
        {
            let mut backend = tetrix_backend(&link);
            backend.apply(ControlInput::new(50.0, 100.0, -100.0)).unwrap();
        }

        let sent = link.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent.last().unwrap(), &vec![0x10, 100, 100, 100]);
    }

    #[test]
    fn test_tetrix_drop_survives_dead_link() {
        let link = RecordingLink {
            broken: true,
            ..Default::default()
        };
        let mut backend = tetrix_backend(&link);
        assert!(backend.apply(ControlInput::zero()).is_err());
        // Drop only logs the failure
        drop(backend);
        assert!(link.sent.lock().unwrap().is_empty());
    }
}
