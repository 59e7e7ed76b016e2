// High-level wheel driver for the mecanum base
//
// Combines the mixer with an actuator to turn one operator input into
// four channel writes per control tick.

use tracing::{debug, info, trace, warn};

use super::actuator::{ActuatorError, ChannelMap, MotorActuator, Wheel};
use super::mixer::{ControlInput, MecanumMixer, WheelCommand};

/// Order the channels are written in each tick (right side first)
const WRITE_ORDER: [Wheel; 4] = [
    Wheel::FrontRight,
    Wheel::RearRight,
    Wheel::FrontLeft,
    Wheel::RearLeft,
];

/// Drives four mecanum wheels through a [`MotorActuator`]
pub struct WheelDriver<A: MotorActuator> {
    actuator: A,
    mixer: MecanumMixer,
    channels: ChannelMap,
}

impl<A: MotorActuator> WheelDriver<A> {
    pub fn new(actuator: A, mixer: MecanumMixer, channels: ChannelMap) -> Self {
        info!(
            "Wheel driver ready: fl={} fr={} rl={} rr={}",
            channels.front_left.channel,
            channels.front_right.channel,
            channels.rear_left.channel,
            channels.rear_right.channel
        );
        Self {
            actuator,
            mixer,
            channels,
        }
    }

    /// Driver with the default mixer and the stock wiring
    pub fn with_defaults(actuator: A) -> Self {
        Self::new(actuator, MecanumMixer::default(), ChannelMap::default())
    }

    /// Mix an operator input and send it to all four channels
    ///
    /// Returns the mixed (unclamped) command that was sent.
    pub fn set_drive_speed(&mut self, input: ControlInput) -> Result<WheelCommand, ActuatorError> {
        let (wheels, t) = self.mixer.mix_traced(input.x, input.y, input.rotation);
        trace!(
            x = input.x,
            y = input.y,
            rotation = input.rotation,
            curved_x = t.curved_x,
            curved_y = t.curved_y,
            curved_rotation = t.curved_rotation,
            speed = t.speed,
            direction = t.direction,
            front_left = t.wheels.front_left,
            front_right = t.wheels.front_right,
            rear_left = t.wheels.rear_left,
            rear_right = t.wheels.rear_right,
            "mixed"
        );

        self.set_wheel_powers(wheels)?;
        Ok(wheels)
    }

    /// Send already-mixed wheel powers
    ///
    /// Every channel is written even if an earlier one fails, so a dead
    /// channel never leaves the others at a stale power. The first error is
    /// returned once all four writes were attempted.
    pub fn set_wheel_powers(&mut self, wheels: WheelCommand) -> Result<(), ActuatorError> {
        debug!(
            "Setting wheel powers: fl={:.1}, fr={:.1}, rl={:.1}, rr={:.1}",
            wheels.front_left, wheels.front_right, wheels.rear_left, wheels.rear_right
        );

        let max = self.mixer.config().max_motor_value();
        let mut first_err = None;
        for wheel in WRITE_ORDER {
            let value = match wheel {
                Wheel::FrontLeft => wheels.front_left,
                Wheel::FrontRight => wheels.front_right,
                Wheel::RearLeft => wheels.rear_left,
                Wheel::RearRight => wheels.rear_right,
            };
            let (channel, power) = self.channels.power_for(wheel, value, max);
            trace!("{} -> {}: {}", wheel, channel, power);
            if let Err(e) = self.actuator.set_motor_power(channel, power) {
                warn!("Write to {} ({}) failed: {}", wheel, channel, e);
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stop all wheels
    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        info!("Stopping all wheels");
        self.set_wheel_powers(WheelCommand::zero())
    }

    pub fn mixer(&self) -> &MecanumMixer {
        &self.mixer
    }

    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }
}

impl<A: MotorActuator> Drop for WheelDriver<A> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop wheels on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::actuator::{Channel, LogActuator};

    fn prizm(index: u8) -> Channel {
        Channel::Prizm { index }
    }

    fn expansion(index: u8) -> Channel {
        Channel::Expansion { address: 1, index }
    }

    #[test]
    fn test_write_order_and_polarity() {
        let mut actuator = LogActuator::new();
        {
            let mut driver = WheelDriver::with_defaults(&mut actuator);
            driver.set_drive_speed(ControlInput::new(0.0, 0.0, 50.0)).unwrap();
        }

        // First four calls are the drive command; the rest come from drop
        let calls = &actuator.calls()[..4];
        assert_eq!(
            calls,
            &[
                (prizm(1), -13),
                (prizm(2), -13),
                (expansion(1), -13),
                (expansion(2), -13),
            ]
        );
    }

    #[test]
    fn test_forward_drives_sides_opposite_on_the_wire() {
        let mut actuator = LogActuator::new();
        let mut driver = WheelDriver::with_defaults(&mut actuator);
        let wheels = driver
            .set_drive_speed(ControlInput::new(0.0, 100.0, 0.0))
            .unwrap();
        assert!((wheels.front_left - wheels.front_right).abs() < 1e-9);

        let a = driver.actuator();
        assert_eq!(a.power(prizm(1)), Some(71));
        assert_eq!(a.power(prizm(2)), Some(71));
        assert_eq!(a.power(expansion(1)), Some(-71));
        assert_eq!(a.power(expansion(2)), Some(-71));
    }

    #[test]
    fn test_saturated_wheels_clamped() {
        let mut actuator = LogActuator::new();
        let mut driver = WheelDriver::with_defaults(&mut actuator);
        let wheels = driver
            .set_drive_speed(ControlInput::new(0.0, 100.0, 100.0))
            .unwrap();
        assert!(wheels.front_left > 100.0);

        let a = driver.actuator();
        assert_eq!(a.power(expansion(1)), Some(-100));
        assert_eq!(a.power(expansion(2)), Some(-100));
    }

    #[test]
    fn test_offline_channel_reports_error() {
        let mut actuator = LogActuator::with_offline(prizm(2));
        let mut driver = WheelDriver::with_defaults(&mut actuator);
        let err = driver
            .set_drive_speed(ControlInput::new(0.0, 50.0, 0.0))
            .unwrap_err();
        assert!(matches!(
            err,
            ActuatorError::ChannelUnavailable { channel } if channel == prizm(2)
        ));

        // Channels after the dead one are still written
        let a = driver.actuator();
        assert!(a.power(prizm(1)).is_some());
        assert!(a.power(expansion(1)).is_some());
        assert!(a.power(expansion(2)).is_some());
    }

    #[test]
    fn test_stop_reaches_every_live_channel() {
        let mut actuator = LogActuator::new();
        {
            let mut driver = WheelDriver::with_defaults(&mut actuator);
            driver
                .set_drive_speed(ControlInput::new(0.0, 100.0, 0.0))
                .unwrap();
            assert_eq!(driver.actuator().power(expansion(1)), Some(-71));

            driver.actuator_mut().set_offline(Some(prizm(2)));
            let err = driver.stop().unwrap_err();
            assert!(matches!(
                err,
                ActuatorError::ChannelUnavailable { channel } if channel == prizm(2)
            ));
        }

        assert_eq!(actuator.power(prizm(1)), Some(0));
        assert_eq!(actuator.power(expansion(1)), Some(0));
        assert_eq!(actuator.power(expansion(2)), Some(0));
        // The dead channel keeps whatever it had before it went offline
        assert_eq!(actuator.power(prizm(2)), Some(71));
    }

    #[test]
    fn test_stop_on_drop() {
        let mut actuator = LogActuator::new();
        {
            let mut driver = WheelDriver::with_defaults(&mut actuator);
            driver
                .set_drive_speed(ControlInput::new(30.0, 80.0, -20.0))
                .unwrap();
        }
        for channel in [prizm(1), prizm(2), expansion(1), expansion(2)] {
            assert_eq!(actuator.power(channel), Some(0));
        }
    }
}
