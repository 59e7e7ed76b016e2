// Motor control module for the mecanum base
//
// Provides:
// - Mecanum mixing (operator axes -> wheel powers)
// - Actuator boundary with channel wiring and polarity
// - Wheel driver tying the two together
// - Tetrix board serial protocol

pub mod actuator;
mod driver;
pub mod mixer;
pub mod tetrix;

pub use actuator::{
    ActuatorError, Channel, ChannelBinding, ChannelMap, LogActuator, MotorActuator, Wheel,
};
pub use driver::WheelDriver;
pub use mixer::{
    ControlInput, MecanumMixer, MixerConfig, MixerConfigError, MixerTrace, SpeedFormula,
    WheelCommand, MAX_INTERIM_VALUE, MAX_MOTOR_VALUE, SPEED_EXPONENT,
};
pub use tetrix::{DriveLink, Frame, FrameDecoder, TetrixError, TetrixLink};
