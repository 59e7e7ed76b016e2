// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::motor::mixer::{ControlInput, WheelCommand};

// Command from teleop/scripts -> runtime
// Each axis in [-100, 100]; values outside are clamped by the mixer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DriveCommand {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

impl From<&DriveCommand> for ControlInput {
    fn from(cmd: &DriveCommand) -> Self {
        ControlInput::new(cmd.x, cmd.y, cmd.rotation)
    }
}

// Wheel telemetry from runtime -> observers
// Zero by default, which is also what a stale command produces
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct WheelActuation {
    pub front_left: f64,
    pub front_right: f64,
    pub rear_left: f64,
    pub rear_right: f64,
}

impl From<&WheelCommand> for WheelActuation {
    fn from(cmd: &WheelCommand) -> Self {
        Self {
            front_left: cmd.front_left,
            front_right: cmd.front_right,
            rear_left: cmd.rear_left,
            rear_right: cmd.rear_right,
        }
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}
