//! Domain models for guest stays and their meter readings.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::common::{Displayable, UsageId};

/// One guest stay's meter record.
///
/// `kwh_used` and `is_completed` travel over the wire but are derived from the
/// readings; see [`Usage::refresh_derived`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub id: UsageId,
    pub home_number: String,
    pub user_name: String,
    pub initial_reading: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_reading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwh_used: Option<f64>,
    pub cost_per_kwh: f64,
    pub date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
}

impl Usage {
    /// Materializes a create payload under the identifier assigned by the store.
    pub fn from_draft(id: UsageId, draft: NewUsage) -> Self {
        let mut usage = Self {
            id,
            home_number: draft.home_number,
            user_name: draft.user_name,
            initial_reading: draft.initial_reading,
            final_reading: draft.final_reading,
            kwh_used: None,
            cost_per_kwh: draft.cost_per_kwh,
            date: draft.date,
            start_date: draft.start_date,
            end_date: draft.end_date,
            is_completed: false,
        };
        usage.refresh_derived();
        usage
    }

    /// Consumption implied by the readings, if a final reading exists.
    pub fn derived_kwh(&self) -> Option<f64> {
        self.final_reading
            .map(|final_reading| final_reading - self.initial_reading)
    }

    /// Recomputes `kwh_used` and `is_completed` from the readings.
    pub fn refresh_derived(&mut self) {
        self.kwh_used = self.derived_kwh();
        self.is_completed = self.final_reading.is_some();
    }

    pub fn state(&self) -> UsageState {
        if self.final_reading.is_some() {
            UsageState::Completed
        } else {
            UsageState::Open
        }
    }
}

impl Displayable for Usage {
    fn display_label(&self) -> String {
        format!(
            "usage #{} home {} [{}] {}",
            self.id,
            self.home_number,
            self.state(),
            self.user_name
        )
    }
}

/// Lifecycle state of a usage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsageState {
    /// Only the initial reading is known; billing not yet finalized.
    Open,
    /// Both readings are known; consumption and cost are defined.
    Completed,
}

impl fmt::Display for UsageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UsageState::Open => "Open",
            UsageState::Completed => "Completed",
        };
        f.pad(label)
    }
}

/// Create payload for a usage record; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUsage {
    pub home_number: String,
    pub user_name: String,
    pub initial_reading: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_reading: Option<f64>,
    pub cost_per_kwh: f64,
    pub date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewUsage {
    /// Builds an open stay whose reading date defaults to the stay start.
    pub fn open(
        home_number: impl Into<String>,
        user_name: impl Into<String>,
        initial_reading: f64,
        cost_per_kwh: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            home_number: home_number.into(),
            user_name: user_name.into(),
            initial_reading,
            final_reading: None,
            cost_per_kwh,
            date: start_date,
            start_date,
            end_date,
        }
    }

    pub fn with_final_reading(mut self, final_reading: f64) -> Self {
        self.final_reading = Some(final_reading);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }
}

/// Update payload completing an existing usage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCompletion {
    pub id: UsageId,
    pub final_reading: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}
