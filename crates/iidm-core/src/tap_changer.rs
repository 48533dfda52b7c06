//! Ratio and phase tap changers of transformers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{IidmError, IidmResult, TerminalRef};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioTapChangerStep {
    pub rho: f64,
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
}

impl RatioTapChangerStep {
    pub fn new(rho: f64) -> Self {
        Self {
            rho,
            r: 0.0,
            x: 0.0,
            g: 0.0,
            b: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTapChangerStep {
    pub alpha: f64,
    pub rho: f64,
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
}

impl PhaseTapChangerStep {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            rho: 1.0,
            r: 0.0,
            x: 0.0,
            g: 0.0,
            b: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseRegulationMode {
    CurrentLimiter,
    ActivePowerControl,
    FixedTap,
}

impl PhaseRegulationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseRegulationMode::CurrentLimiter => "CURRENT_LIMITER",
            PhaseRegulationMode::ActivePowerControl => "ACTIVE_POWER_CONTROL",
            PhaseRegulationMode::FixedTap => "FIXED_TAP",
        }
    }
}

impl FromStr for PhaseRegulationMode {
    type Err = IidmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CURRENT_LIMITER" => Ok(PhaseRegulationMode::CurrentLimiter),
            "ACTIVE_POWER_CONTROL" => Ok(PhaseRegulationMode::ActivePowerControl),
            "FIXED_TAP" => Ok(PhaseRegulationMode::FixedTap),
            other => Err(IidmError::Parse(format!("invalid regulation mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioTapChanger {
    pub low_tap_position: i32,
    pub tap_position: i32,
    pub steps: Vec<RatioTapChangerStep>,
    pub load_tap_changing_capabilities: bool,
    pub regulating: bool,
    pub target_v: f64,
    pub target_deadband: f64,
    pub regulation_terminal: Option<TerminalRef>,
}

impl RatioTapChanger {
    pub fn new(low_tap_position: i32, tap_position: i32, steps: Vec<RatioTapChangerStep>) -> Self {
        Self {
            low_tap_position,
            tap_position,
            steps,
            load_tap_changing_capabilities: false,
            regulating: false,
            target_v: f64::NAN,
            target_deadband: f64::NAN,
            regulation_terminal: None,
        }
    }

    /// `None` without steps or when the range passes `i32::MAX`.
    pub fn high_tap_position(&self) -> Option<i32> {
        high_position(self.low_tap_position, self.steps.len())
    }

    pub fn check(&self, owner: &str) -> IidmResult<()> {
        check_tap_position(owner, "ratio", self.low_tap_position, self.tap_position, self.steps.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTapChanger {
    pub low_tap_position: i32,
    pub tap_position: i32,
    pub steps: Vec<PhaseTapChangerStep>,
    pub regulation_mode: PhaseRegulationMode,
    pub regulation_value: f64,
    pub regulating: bool,
    pub target_deadband: f64,
    pub regulation_terminal: Option<TerminalRef>,
}

impl PhaseTapChanger {
    pub fn new(low_tap_position: i32, tap_position: i32, steps: Vec<PhaseTapChangerStep>) -> Self {
        Self {
            low_tap_position,
            tap_position,
            steps,
            regulation_mode: PhaseRegulationMode::FixedTap,
            regulation_value: f64::NAN,
            regulating: false,
            target_deadband: f64::NAN,
            regulation_terminal: None,
        }
    }

    pub fn high_tap_position(&self) -> Option<i32> {
        high_position(self.low_tap_position, self.steps.len())
    }

    pub fn check(&self, owner: &str) -> IidmResult<()> {
        check_tap_position(owner, "phase", self.low_tap_position, self.tap_position, self.steps.len())
    }
}

fn high_position(low: i32, step_count: usize) -> Option<i32> {
    let span = i32::try_from(step_count.checked_sub(1)?).ok()?;
    low.checked_add(span)
}

fn check_tap_position(owner: &str, kind: &str, low: i32, position: i32, step_count: usize) -> IidmResult<()> {
    if step_count == 0 {
        return Err(IidmError::Validation(format!(
            "'{owner}': {kind} tap changer should have at least one step"
        )));
    }
    let high = high_position(low, step_count).ok_or_else(|| {
        IidmError::Validation(format!(
            "'{owner}': {kind} tap positions from {low} with {step_count} steps exceed the integer range"
        ))
    })?;
    if position < low || position > high {
        return Err(IidmError::Validation(format!(
            "'{owner}': incorrect {kind} tap position {position} [{low}, {high}]"
        )));
    }
    Ok(())
}
