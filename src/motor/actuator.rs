// Actuator boundary: channel addressing, polarity and the set-power capability
//
// The mixer never sees hardware. Everything about which driver channel a
// wheel is wired to, and whether that motor is mounted mirrored, lives here.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

/// Power range accepted by every actuator channel
pub const ACTUATOR_MAX_POWER: i8 = 100;

/// The four wheels of the base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wheel {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl fmt::Display for Wheel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Wheel::FrontLeft => "front-left",
            Wheel::FrontRight => "front-right",
            Wheel::RearLeft => "rear-left",
            Wheel::RearRight => "rear-right",
        };
        f.write_str(name)
    }
}

/// Hardware-addressed motor output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Motor port on the main controller board
    Prizm { index: u8 },
    /// Motor port on a daisy-chained expansion board
    Expansion { address: u8, index: u8 },
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Prizm { index } => write!(f, "prizm:{}", index),
            Channel::Expansion { address, index } => write!(f, "expansion{}:{}", address, index),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("Channel {channel} is not available")]
    ChannelUnavailable { channel: Channel },
}

/// Capability to drive a single motor channel
pub trait MotorActuator {
    /// Set power for one channel, `power` in `[-100, 100]`
    fn set_motor_power(&mut self, channel: Channel, power: i8) -> Result<(), ActuatorError>;
}

impl<A: MotorActuator + ?Sized> MotorActuator for &mut A {
    fn set_motor_power(&mut self, channel: Channel, power: i8) -> Result<(), ActuatorError> {
        (**self).set_motor_power(channel, power)
    }
}

impl<A: MotorActuator + ?Sized> MotorActuator for Box<A> {
    fn set_motor_power(&mut self, channel: Channel, power: i8) -> Result<(), ActuatorError> {
        (**self).set_motor_power(channel, power)
    }
}

/// Where a wheel is wired and how its direction maps to the motor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBinding {
    pub channel: Channel,
    /// +1.0 or -1.0; -1.0 for motors mounted mirrored
    pub polarity: f64,
}

impl ChannelBinding {
    pub fn new(channel: Channel, polarity: f64) -> Self {
        Self { channel, polarity }
    }
}

/// Wheel to channel mapping for the base
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMap {
    pub front_left: ChannelBinding,
    pub front_right: ChannelBinding,
    pub rear_left: ChannelBinding,
    pub rear_right: ChannelBinding,
}

/// Expansion board address the left-side motors hang off
pub const WHEEL_EXPANSION: u8 = 1;

/// Left motors are mounted mirrored relative to the right side
pub const LEFT_WHEEL_POLARITY: f64 = -1.0;

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            front_right: ChannelBinding::new(Channel::Prizm { index: 1 }, 1.0),
            rear_right: ChannelBinding::new(Channel::Prizm { index: 2 }, 1.0),
            front_left: ChannelBinding::new(
                Channel::Expansion {
                    address: WHEEL_EXPANSION,
                    index: 1,
                },
                LEFT_WHEEL_POLARITY,
            ),
            rear_left: ChannelBinding::new(
                Channel::Expansion {
                    address: WHEEL_EXPANSION,
                    index: 2,
                },
                LEFT_WHEEL_POLARITY,
            ),
        }
    }
}

impl ChannelMap {
    pub fn binding(&self, wheel: Wheel) -> ChannelBinding {
        match wheel {
            Wheel::FrontLeft => self.front_left,
            Wheel::FrontRight => self.front_right,
            Wheel::RearLeft => self.rear_left,
            Wheel::RearRight => self.rear_right,
        }
    }

    /// Convert a mixed wheel value into the channel's actuator power
    ///
    /// Clamps to `[-max, max]`, applies the channel polarity, then rescales
    /// from `max` to the actuator's ±100 and rounds half away from zero
    /// (12.5 becomes 13, -12.5 becomes -13).
    pub fn power_for(&self, wheel: Wheel, value: f64, max: f64) -> (Channel, i8) {
        let binding = self.binding(wheel);
        let clamped = if value.is_nan() {
            0.0
        } else {
            value.clamp(-max, max)
        };
        let scaled = clamped * binding.polarity * (ACTUATOR_MAX_POWER as f64 / max);
        let power = scaled
            .round()
            .clamp(-(ACTUATOR_MAX_POWER as f64), ACTUATOR_MAX_POWER as f64) as i8;
        (binding.channel, power)
    }
}

/// Actuator that only logs and remembers what it was told
///
/// Used when no hardware is attached.
#[derive(Debug, Default)]
pub struct LogActuator {
    powers: HashMap<Channel, i8>,
    calls: Vec<(Channel, i8)>,
    offline: Option<Channel>,
}

impl LogActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a channel whose driver does not answer
    pub fn with_offline(channel: Channel) -> Self {
        Self {
            offline: Some(channel),
            ..Self::default()
        }
    }

    /// Take a channel offline (or bring it back with `None`)
    pub fn set_offline(&mut self, channel: Option<Channel>) {
        self.offline = channel;
    }

    /// Last power sent to a channel
    pub fn power(&self, channel: Channel) -> Option<i8> {
        self.powers.get(&channel).copied()
    }

    /// Every call in order
    pub fn calls(&self) -> &[(Channel, i8)] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl MotorActuator for LogActuator {
    fn set_motor_power(&mut self, channel: Channel, power: i8) -> Result<(), ActuatorError> {
        if self.offline == Some(channel) {
            return Err(ActuatorError::ChannelUnavailable { channel });
        }
        debug!("Set {} power to {}", channel, power);
        self.powers.insert(channel, power);
        self.calls.push((channel, power));
        Ok(())
    }
}
