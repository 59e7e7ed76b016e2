// Mecanum mixing for the four-wheel base
// Converts operator axes (x, y, rotation) into four signed wheel powers.
//
// Based on the roller-geometry mixing popularized by Roboteq and the FTC
// community: the translation vector is reduced to a speed and a direction,
// rotated by 45° onto the roller axes, and the rotation term is added on the
// left side and subtracted on the right side.

use std::f64::consts::FRAC_PI_4;

/// Full-scale value of every input axis and every wheel output
pub const MAX_MOTOR_VALUE: f64 = 100.0;

/// Upper bound of the intermediate speed magnitude
pub const MAX_INTERIM_VALUE: f64 = 1.0;

/// Response curve exponent (must be odd to keep the sign)
pub const SPEED_EXPONENT: i32 = 3;

/// Operator input for one control tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlInput {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

impl ControlInput {
    pub fn new(x: f64, y: f64, rotation: f64) -> Self {
        Self { x, y, rotation }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Clamp every axis into `[-max, max]`
    pub fn clamped(&self, max: f64) -> Self {
        Self {
            x: self.x.clamp(-max, max),
            y: self.y.clamp(-max, max),
            rotation: self.rotation.clamp(-max, max),
        }
    }
}

/// Per-wheel power commands, in the same units as [`ControlInput`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelCommand {
    pub front_left: f64,
    pub front_right: f64,
    pub rear_left: f64,
    pub rear_right: f64,
}

impl WheelCommand {
    pub fn new(front_left: f64, front_right: f64, rear_left: f64, rear_right: f64) -> Self {
        Self {
            front_left,
            front_right,
            rear_left,
            rear_right,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns powers as array [front_left, front_right, rear_left, rear_right]
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.front_left,
            self.front_right,
            self.rear_left,
            self.rear_right,
        ]
    }

    /// Clamp every wheel into the actuator range `[-max, max]`
    pub fn clamped(&self, max: f64) -> Self {
        Self {
            front_left: self.front_left.clamp(-max, max),
            front_right: self.front_right.clamp(-max, max),
            rear_left: self.rear_left.clamp(-max, max),
            rear_right: self.rear_right.clamp(-max, max),
        }
    }
}

/// Intermediate values of one mixing pass, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MixerTrace {
    pub curved_x: f64,
    pub curved_y: f64,
    pub curved_rotation: f64,
    pub speed: f64,
    pub direction: f64,
    pub wheels: WheelCommand,
}

/// How the translation speed is derived from the curved x/y pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpeedFormula {
    /// `sqrt(x² + y²)`
    #[default]
    Euclidean,
    /// `sqrt(x² + 2y)`, the legacy board firmware's formula.
    ///
    /// Known bug kept for compatibility with existing chassis tuning: the y
    /// term is doubled instead of squared. A negative radicand gives NaN,
    /// which the min/max clamp turns into `+max_interim_value`.
    LegacyDoubledY,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MixerConfigError {
    #[error("max motor value must be positive, got {0}")]
    InvalidMaxMotorValue(f64),

    #[error("max interim value must be positive, got {0}")]
    InvalidMaxInterimValue(f64),

    #[error("speed exponent must be a positive odd integer, got {0}")]
    InvalidSpeedExponent(i32),
}

/// Tunable constants of the mixer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixerConfig {
    max_motor_value: f64,
    max_interim_value: f64,
    speed_exponent: i32,
    speed_formula: SpeedFormula,
    clamp_inputs: bool,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            max_motor_value: MAX_MOTOR_VALUE,
            max_interim_value: MAX_INTERIM_VALUE,
            speed_exponent: SPEED_EXPONENT,
            speed_formula: SpeedFormula::Euclidean,
            clamp_inputs: true,
        }
    }
}

impl MixerConfig {
    pub fn new(
        max_motor_value: f64,
        max_interim_value: f64,
        speed_exponent: i32,
    ) -> Result<Self, MixerConfigError> {
        // `!(v > 0.0)` also rejects NaN
        if !(max_motor_value > 0.0) {
            return Err(MixerConfigError::InvalidMaxMotorValue(max_motor_value));
        }
        if !(max_interim_value > 0.0) {
            return Err(MixerConfigError::InvalidMaxInterimValue(max_interim_value));
        }
        if speed_exponent <= 0 || speed_exponent % 2 == 0 {
            return Err(MixerConfigError::InvalidSpeedExponent(speed_exponent));
        }

        Ok(Self {
            max_motor_value,
            max_interim_value,
            speed_exponent,
            ..Self::default()
        })
    }

    pub fn with_speed_formula(mut self, speed_formula: SpeedFormula) -> Self {
        self.speed_formula = speed_formula;
        self
    }

    /// Disable input clamping; out-of-range inputs then extrapolate
    pub fn with_input_clamp(mut self, clamp_inputs: bool) -> Self {
        self.clamp_inputs = clamp_inputs;
        self
    }

    pub fn max_motor_value(&self) -> f64 {
        self.max_motor_value
    }

    pub fn max_interim_value(&self) -> f64 {
        self.max_interim_value
    }

    pub fn speed_exponent(&self) -> i32 {
        self.speed_exponent
    }

    pub fn speed_formula(&self) -> SpeedFormula {
        self.speed_formula
    }

    pub fn clamp_inputs(&self) -> bool {
        self.clamp_inputs
    }
}

/// Stateless mecanum mixer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MecanumMixer {
    config: MixerConfig,
}

impl MecanumMixer {
    pub fn new(config: MixerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Mix operator axes into wheel powers
    ///
    /// # Arguments
    /// * `x` - Lateral (strafe) axis in `[-max, max]`
    /// * `y` - Longitudinal axis in `[-max, max]` (positive = forward)
    /// * `rotation` - Rotation axis in `[-max, max]` (added on the left side)
    ///
    /// # Returns
    /// Unclamped wheel powers; rotation can push a wheel past `max`.
    pub fn mix(&self, x: f64, y: f64, rotation: f64) -> WheelCommand {
        self.mix_traced(x, y, rotation).0
    }

    pub fn mix_input(&self, input: ControlInput) -> WheelCommand {
        self.mix(input.x, input.y, input.rotation)
    }

    /// Mix and also return every intermediate value
    pub fn mix_traced(&self, x: f64, y: f64, rotation: f64) -> (WheelCommand, MixerTrace) {
        let max = self.config.max_motor_value;
        let input = ControlInput::new(x, y, rotation);
        let input = if self.config.clamp_inputs {
            input.clamped(max)
        } else {
            input
        };

        let curved_x = self.curve(input.x);
        let curved_y = self.curve(input.y);
        let curved_rotation = self.curve(input.rotation);

        let speed = self.speed(curved_x, curved_y);
        // Swapped on purpose: measures the heading from the y (forward) axis
        let direction = curved_x.atan2(curved_y);

        let angle = direction + FRAC_PI_4;
        let (sin_a, cos_a) = angle.sin_cos();

        let wheels = WheelCommand {
            front_left: (speed * cos_a + curved_rotation) * max,
            front_right: (speed * sin_a - curved_rotation) * max,
            rear_left: (speed * sin_a + curved_rotation) * max,
            rear_right: (speed * cos_a - curved_rotation) * max,
        };

        let trace = MixerTrace {
            curved_x,
            curved_y,
            curved_rotation,
            speed,
            direction,
            wheels,
        };

        (wheels, trace)
    }

    /// Normalize to `[-1, 1]` and apply the response curve
    fn curve(&self, value: f64) -> f64 {
        (value / self.config.max_motor_value).powi(self.config.speed_exponent)
    }

    fn speed(&self, curved_x: f64, curved_y: f64) -> f64 {
        let limit = self.config.max_interim_value;
        let radicand = match self.config.speed_formula {
            SpeedFormula::Euclidean => curved_x * curved_x + curved_y * curved_y,
            SpeedFormula::LegacyDoubledY => curved_x * curved_x + (curved_y + curved_y),
        };

        // min/max rather than clamp: NaN collapses to the limit instead of propagating
        radicand.sqrt().min(limit).max(-limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn mixer() -> MecanumMixer {
        MecanumMixer::default()
    }

    #[test]
    fn test_zero_input() {
        let wheels = mixer().mix(0.0, 0.0, 0.0);
        for value in wheels.as_array() {
            assert_close(value, 0.0);
        }
    }

    #[test]
    fn test_forward_motion() {
        // y is the forward axis: every wheel turns the same way
        let wheels = mixer().mix(0.0, MAX_MOTOR_VALUE, 0.0);
        let expected = MAX_MOTOR_VALUE * FRAC_PI_4.cos();
        for value in wheels.as_array() {
            assert_close(value, expected);
        }
    }

    #[test]
    fn test_full_x_axis() {
        // x alone: equal magnitudes, diagonal pairs opposed
        let wheels = mixer().mix(MAX_MOTOR_VALUE, 0.0, 0.0);
        let magnitude = MAX_MOTOR_VALUE * FRAC_PI_4.cos();
        for value in wheels.as_array() {
            assert_close(value.abs(), magnitude);
        }
        assert_close(wheels.front_left, -magnitude);
        assert_close(wheels.rear_right, -magnitude);
        assert_close(wheels.front_right, magnitude);
        assert_close(wheels.rear_left, magnitude);
    }

    #[test]
    fn test_rotation_only() {
        let wheels = mixer().mix(0.0, 0.0, MAX_MOTOR_VALUE);
        assert_close(wheels.front_left, MAX_MOTOR_VALUE);
        assert_close(wheels.rear_left, MAX_MOTOR_VALUE);
        assert_close(wheels.front_right, -MAX_MOTOR_VALUE);
        assert_close(wheels.rear_right, -MAX_MOTOR_VALUE);

        // Half stick: magnitude comes from the cubic curve alone
        let wheels = mixer().mix(0.0, 0.0, 50.0);
        assert_close(wheels.front_left, 12.5);
        assert_close(wheels.front_right, -12.5);
    }

    #[test]
    fn test_cubic_response() {
        let (_, trace) = mixer().mix_traced(50.0, -50.0, 20.0);
        assert_close(trace.curved_x, 0.125);
        assert_close(trace.curved_y, -0.125);
        assert_close(trace.curved_rotation, 0.008);
    }

    #[test]
    fn test_sign_antisymmetry() {
        let m = mixer();
        let samples = [
            (10.0, 20.0, 30.0),
            (-75.0, 40.0, 5.0),
            (100.0, 100.0, -100.0),
            (0.0, -60.0, 90.0),
            (33.0, 0.0, 0.0),
        ];

        for (x, y, r) in samples {
            let positive = m.mix(x, y, r).as_array();
            let negative = m.mix(-x, -y, -r).as_array();
            for (p, n) in positive.iter().zip(negative.iter()) {
                assert_close(*p, -*n);
            }
        }
    }

    #[test]
    fn test_monotonic_along_x() {
        let m = mixer();
        let mut previous = [0.0f64; 4];
        for step in 0..=100 {
            let wheels = m.mix(step as f64, 0.0, 0.0).as_array();
            for (i, value) in wheels.iter().enumerate() {
                assert!(
                    value.abs() + EPS >= previous[i],
                    "wheel {} dropped at x={}",
                    i,
                    step
                );
                previous[i] = value.abs();
            }
        }
    }

    #[test]
    fn test_speed_is_bounded() {
        let m = mixer();
        for x in (-100..=100).step_by(10) {
            for y in (-100..=100).step_by(10) {
                let (_, trace) = m.mix_traced(x as f64, y as f64, 0.0);
                assert!(trace.speed.abs() <= MAX_INTERIM_VALUE);
            }
        }

        // Both axes at full scale would give sqrt(2) without the clamp
        let (_, trace) = m.mix_traced(100.0, 100.0, 0.0);
        assert_close(trace.speed, MAX_INTERIM_VALUE);
    }

    #[test]
    fn test_deterministic() {
        let m = mixer();
        let first = m.mix(37.0, -12.0, 64.0);
        for _ in 0..10 {
            assert_eq!(m.mix(37.0, -12.0, 64.0), first);
        }
    }

    #[test]
    fn test_rotation_exceeds_range_until_clamped() {
        let wheels = mixer().mix(0.0, 100.0, 100.0);
        assert!(wheels.front_left > MAX_MOTOR_VALUE);
        assert!(wheels.front_right < 0.0);

        let clamped = wheels.clamped(MAX_MOTOR_VALUE);
        assert_close(clamped.front_left, MAX_MOTOR_VALUE);
        assert_close(clamped.rear_left, MAX_MOTOR_VALUE);
        for value in clamped.as_array() {
            assert!(value.abs() <= MAX_MOTOR_VALUE);
        }
    }

    #[test]
    fn test_inputs_clamped_by_default() {
        let m = mixer();
        assert_eq!(m.mix(0.0, 0.0, 250.0), m.mix(0.0, 0.0, 100.0));

        let unclamped = MecanumMixer::new(MixerConfig::default().with_input_clamp(false));
        let wheels = unclamped.mix(0.0, 0.0, 200.0);
        // (200 / 100)^3 = 8
        assert_close(wheels.front_left, 800.0);
    }

    #[test]
    fn test_legacy_speed_formula() {
        let legacy = MecanumMixer::new(
            MixerConfig::default().with_speed_formula(SpeedFormula::LegacyDoubledY),
        );

        // sqrt(0.125^2 + 2 * 0.125)
        let (_, trace) = legacy.mix_traced(50.0, 50.0, 0.0);
        assert_close(trace.speed, (0.125f64 * 0.125 + 0.25).sqrt());

        // Negative radicand collapses to full speed instead of NaN
        let (wheels, trace) = legacy.mix_traced(0.0, -50.0, 0.0);
        assert_close(trace.speed, MAX_INTERIM_VALUE);
        assert!(wheels.as_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_config_validation() {
        assert!(MixerConfig::new(100.0, 1.0, 3).is_ok());
        assert!(MixerConfig::new(127.0, 1.0, 5).is_ok());
        assert_eq!(
            MixerConfig::new(0.0, 1.0, 3),
            Err(MixerConfigError::InvalidMaxMotorValue(0.0))
        );
        assert_eq!(
            MixerConfig::new(100.0, -1.0, 3),
            Err(MixerConfigError::InvalidMaxInterimValue(-1.0))
        );
        assert_eq!(
            MixerConfig::new(100.0, 1.0, 2),
            Err(MixerConfigError::InvalidSpeedExponent(2))
        );
        assert!(MixerConfig::new(f64::NAN, 1.0, 3).is_err());
    }

    #[test]
    fn test_custom_scale() {
        let config = MixerConfig::new(127.0, 1.0, 1).unwrap();
        let wheels = MecanumMixer::new(config).mix(0.0, 0.0, 63.5);
        assert_close(wheels.front_left, 63.5);
        assert_close(wheels.rear_right, -63.5);
    }
}
