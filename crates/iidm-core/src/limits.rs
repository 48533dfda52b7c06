//! Operational limits
//!
//! A branch side (or dangling line, or transformer leg) owns a set of named
//! [`OperationalLimitsGroup`]s, one of which may be selected. Each group holds up to three
//! [`LoadingLimits`] (current, active power, apparent power).

use serde::{Deserialize, Serialize};

use crate::{IidmError, IidmResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporaryLimit {
    pub name: String,
    /// Seconds; `i32::MAX` means infinite
    pub acceptable_duration: i32,
    pub value: f64,
    pub fictitious: bool,
}

impl TemporaryLimit {
    pub fn new(name: impl Into<String>, acceptable_duration: i32, value: f64) -> Self {
        Self {
            name: name.into(),
            acceptable_duration,
            value,
            fictitious: false,
        }
    }
}

/// Permanent limit plus temporary limits kept in descending acceptable duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingLimits {
    pub permanent_limit: f64,
    temporary_limits: Vec<TemporaryLimit>,
}

impl Default for LoadingLimits {
    fn default() -> Self {
        Self::new(f64::NAN)
    }
}

impl LoadingLimits {
    pub fn new(permanent_limit: f64) -> Self {
        Self {
            permanent_limit,
            temporary_limits: Vec::new(),
        }
    }

    pub fn add_temporary_limit(&mut self, limit: TemporaryLimit) -> IidmResult<()> {
        if self
            .temporary_limits
            .iter()
            .any(|l| l.acceptable_duration == limit.acceptable_duration)
        {
            return Err(IidmError::Validation(format!(
                "2 temporary limits have the same acceptable duration ({})",
                limit.acceptable_duration
            )));
        }
        let pos = self
            .temporary_limits
            .iter()
            .position(|l| l.acceptable_duration < limit.acceptable_duration)
            .unwrap_or(self.temporary_limits.len());
        self.temporary_limits.insert(pos, limit);
        Ok(())
    }

    pub fn with_temporary_limit(mut self, limit: TemporaryLimit) -> IidmResult<Self> {
        self.add_temporary_limit(limit)?;
        Ok(self)
    }

    pub fn temporary_limits(&self) -> &[TemporaryLimit] {
        &self.temporary_limits
    }

    pub fn temporary_limit(&self, acceptable_duration: i32) -> Option<&TemporaryLimit> {
        self.temporary_limits
            .iter()
            .find(|l| l.acceptable_duration == acceptable_duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitType {
    Current,
    ActivePower,
    ApparentPower,
}

impl LimitType {
    pub const ALL: [LimitType; 3] = [
        LimitType::ActivePower,
        LimitType::ApparentPower,
        LimitType::Current,
    ];

    /// Element name without side suffix
    pub fn element(&self) -> &'static str {
        match self {
            LimitType::Current => "currentLimits",
            LimitType::ActivePower => "activePowerLimits",
            LimitType::ApparentPower => "apparentPowerLimits",
        }
    }

    pub fn from_element(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.element() == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationalLimitsGroup {
    pub id: String,
    pub current: Option<LoadingLimits>,
    pub active_power: Option<LoadingLimits>,
    pub apparent_power: Option<LoadingLimits>,
}

impl OperationalLimitsGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn limits(&self, kind: LimitType) -> Option<&LoadingLimits> {
        match kind {
            LimitType::Current => self.current.as_ref(),
            LimitType::ActivePower => self.active_power.as_ref(),
            LimitType::ApparentPower => self.apparent_power.as_ref(),
        }
    }

    pub fn set_limits(&mut self, kind: LimitType, limits: LoadingLimits) {
        let slot = match kind {
            LimitType::Current => &mut self.current,
            LimitType::ActivePower => &mut self.active_power,
            LimitType::ApparentPower => &mut self.apparent_power,
        };
        *slot = Some(limits);
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.active_power.is_none() && self.apparent_power.is_none()
    }
}

/// Limits groups of one side, with an optional selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub groups: Vec<OperationalLimitsGroup>,
    pub selected: Option<String>,
}

impl Limits {
    /// Group created when limits are set without naming a group.
    pub const DEFAULT_GROUP: &'static str = "DEFAULT";

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(OperationalLimitsGroup::is_empty)
    }

    pub fn group(&self, id: &str) -> Option<&OperationalLimitsGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_or_create(&mut self, id: &str) -> &mut OperationalLimitsGroup {
        let pos = match self.groups.iter().position(|g| g.id == id) {
            Some(pos) => pos,
            None => {
                self.groups.push(OperationalLimitsGroup::new(id));
                self.groups.len() - 1
            }
        };
        &mut self.groups[pos]
    }

    pub fn selected_group(&self) -> Option<&OperationalLimitsGroup> {
        self.selected.as_deref().and_then(|id| self.group(id))
    }

    /// Selected group, creating and selecting the default group when none is selected.
    pub fn selected_group_or_default(&mut self) -> &mut OperationalLimitsGroup {
        let id = match &self.selected {
            Some(id) => id.clone(),
            None => {
                self.selected = Some(Self::DEFAULT_GROUP.to_string());
                Self::DEFAULT_GROUP.to_string()
            }
        };
        self.group_or_create(&id)
    }

    /// Groups other than the selected one that hold limits.
    pub fn has_unselected_limits(&self) -> bool {
        self.groups
            .iter()
            .any(|g| Some(&g.id) != self.selected.as_ref() && !g.is_empty())
    }

    pub fn select(&mut self, id: &str) -> IidmResult<()> {
        if self.group(id).is_none() {
            return Err(IidmError::DanglingReference(id.to_string()));
        }
        self.selected = Some(id.to_string());
        Ok(())
    }
}
