//! Orchestrates the persistence collaborator and the pure ledger/statistics core.

use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use cabin_domain::{Home, LedgerScope, NewUsage, Usage, UsageCompletion, UsageId};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::{
    error::{ConflictError, CoreError, ValidationError},
    ledger::{ScopedLedger, UsageLedger},
    stats::{StatsAggregator, UsageSummary},
    storage::UsageStore,
    time::Clock,
};

/// Whether a home may hold more than one open stay at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenStayPolicy {
    /// Additional open stays are accepted; the newest one is routed first.
    #[default]
    Permit,
    /// Creating an open stay while another one is outstanding is a conflict.
    Reject,
}

impl FromStr for OpenStayPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "permit" | "allow" => Ok(OpenStayPolicy::Permit),
            "reject" | "single" => Ok(OpenStayPolicy::Reject),
            other => Err(format!("unknown open stay policy `{other}`")),
        }
    }
}

impl fmt::Display for OpenStayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OpenStayPolicy::Permit => "permit",
            OpenStayPolicy::Reject => "reject",
        };
        f.write_str(label)
    }
}

/// What a guest arriving at a home should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum StayAction {
    /// An open stay is outstanding and should be completed first.
    CompleteOpen(Usage),
    /// No stay is open; a new one starts from the last known meter value.
    StartNew { initial_reading: f64 },
}

/// Per-home dashboard figures.
#[derive(Debug, Clone)]
pub struct HomeOverview {
    pub home: Home,
    pub summary: UsageSummary,
    pub active_count: usize,
    /// Final reading of the most recent completed stay.
    pub current_reading: Option<f64>,
    pub latest_open: Option<Usage>,
    /// Records newest first.
    pub usages: Vec<Usage>,
}

/// Property-wide dashboard figures.
#[derive(Debug, Clone)]
pub struct PropertyOverview {
    pub home_count: usize,
    pub summary: UsageSummary,
    pub active_count: usize,
    pub recent: Vec<Usage>,
    pub by_home: BTreeMap<String, UsageSummary>,
}

/// Validated home and usage operations backed by a [`UsageStore`].
pub struct UsageService {
    store: Box<dyn UsageStore>,
    clock: Arc<dyn Clock>,
    policy: OpenStayPolicy,
}

impl UsageService {
    pub fn new(store: Box<dyn UsageStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policy: OpenStayPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: OpenStayPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_policy(&mut self, policy: OpenStayPolicy) {
        info!(%policy, "open stay policy changed");
        self.policy = policy;
    }

    pub fn policy(&self) -> OpenStayPolicy {
        self.policy
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn homes(&self) -> Result<Vec<Home>, CoreError> {
        self.store.list_homes()
    }

    /// Registers a new home; numbers must be unique and non-empty.
    pub fn add_home(&self, number: &str) -> Result<Home, CoreError> {
        let home = Home::new(number);
        if home.number.is_empty() {
            return Err(ValidationError::MissingField("number").into());
        }
        let created = self.store.create_home(home)?;
        info!(home = %created.number, "home added");
        Ok(created)
    }

    /// Removes a home; the store drops its usage records along with it.
    pub fn remove_home(&self, number: &str) -> Result<(), CoreError> {
        self.store.delete_home(number.trim())?;
        info!(home = %number.trim(), "home removed");
        Ok(())
    }

    /// Records inside `scope` with derived fields revalidated, newest first.
    pub fn usages(&self, scope: &LedgerScope) -> Result<Vec<Usage>, CoreError> {
        if let Some(number) = scope.home_number() {
            self.store.get_home(number)?;
        }
        let records = self.store.list_usages(scope)?;
        for warning in UsageLedger::drift_warnings(&records) {
            warn!("{warning}");
        }
        Ok(UsageLedger::normalize_all(&records))
    }

    pub fn ledger(&self, scope: LedgerScope) -> Result<ScopedLedger, CoreError> {
        let records = self.usages(&scope)?;
        Ok(ScopedLedger::new(scope, &records))
    }

    pub fn usage(&self, id: UsageId) -> Result<Usage, CoreError> {
        self.store
            .get_usage(id)
            .map(|usage| UsageLedger::normalize(&usage))
    }

    /// Creates a usage record, open or already completed depending on the draft.
    pub fn record_usage(&self, draft: NewUsage) -> Result<Usage, CoreError> {
        let draft = NewUsage {
            home_number: draft.home_number.trim().to_string(),
            user_name: draft.user_name.trim().to_string(),
            ..draft
        };
        UsageLedger::validate_new(&draft)?;
        let home = self.store.get_home(&draft.home_number)?;
        if self.policy == OpenStayPolicy::Reject && draft.final_reading.is_none() {
            let records = self.store.list_usages(&LedgerScope::home(&home.number))?;
            if let Some(open) = UsageLedger::latest_open_for(&home.number, &records) {
                return Err(ConflictError::OpenStayExists {
                    home: home.number,
                    open: open.id,
                }
                .into());
            }
        }
        let created = self.store.insert_usage(draft)?;
        info!(
            usage = %created.id,
            home = %created.home_number,
            state = %UsageLedger::classify(&created),
            "usage recorded"
        );
        Ok(UsageLedger::normalize(&created))
    }

    /// Completes an open record; `date` defaults to today.
    pub fn complete_usage(
        &self,
        id: UsageId,
        final_reading: f64,
        date: Option<NaiveDate>,
    ) -> Result<Usage, CoreError> {
        let current = UsageLedger::normalize(&self.store.get_usage(id)?);
        let completion_date = date.unwrap_or_else(|| self.clock.today());
        let completed = UsageLedger::complete(&current, final_reading, completion_date)?;
        let stored = self.store.save_completion(&completed)?;
        debug!(usage = %id, "completion persisted");
        Ok(UsageLedger::normalize(&stored))
    }

    pub fn apply_completion(&self, completion: UsageCompletion) -> Result<Usage, CoreError> {
        self.complete_usage(completion.id, completion.final_reading, completion.date)
    }

    pub fn remove_usage(&self, id: UsageId) -> Result<(), CoreError> {
        self.store.delete_usage(id)?;
        info!(usage = %id, "usage removed");
        Ok(())
    }

    /// Meter value a new stay at `home_number` should start from.
    pub fn last_meter_reading(&self, home_number: &str) -> Result<f64, CoreError> {
        let records = self.usages(&LedgerScope::home(home_number.trim()))?;
        Ok(UsageLedger::last_meter_reading(home_number.trim(), &records))
    }

    /// Routes a guest to the outstanding open stay, or to a fresh one.
    pub fn stay_action(&self, home_number: &str) -> Result<StayAction, CoreError> {
        let number = home_number.trim();
        let records = self.usages(&LedgerScope::home(number))?;
        match UsageLedger::latest_open_for(number, &records) {
            Some(open) => Ok(StayAction::CompleteOpen(open.clone())),
            None => Ok(StayAction::StartNew {
                initial_reading: UsageLedger::last_meter_reading(number, &records),
            }),
        }
    }

    /// Draft for a new open stay seeded with the home's last meter reading.
    pub fn draft_stay(
        &self,
        home_number: &str,
        user_name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        cost_per_kwh: f64,
    ) -> Result<NewUsage, CoreError> {
        let initial_reading = self.last_meter_reading(home_number)?;
        Ok(NewUsage::open(
            home_number.trim(),
            user_name.trim(),
            initial_reading,
            cost_per_kwh,
            start_date,
            end_date,
        )
        .with_date(self.clock.today()))
    }

    pub fn home_overview(&self, home_number: &str) -> Result<HomeOverview, CoreError> {
        let home = self.store.get_home(home_number.trim())?;
        let usages = self.usages(&LedgerScope::home(&home.number))?;
        let summary = StatsAggregator::summarize(&usages);
        let active_count = StatsAggregator::active_count(&usages);
        let current_reading = UsageLedger::most_recent_completed(&home.number, &usages)
            .and_then(|usage| usage.final_reading);
        let latest_open = UsageLedger::latest_open_for(&home.number, &usages).cloned();
        Ok(HomeOverview {
            home,
            summary,
            active_count,
            current_reading,
            latest_open,
            usages,
        })
    }

    pub fn property_overview(&self, recent_limit: usize) -> Result<PropertyOverview, CoreError> {
        let homes = self.store.list_homes()?;
        let usages = self.usages(&LedgerScope::Property)?;
        Ok(PropertyOverview {
            home_count: homes.len(),
            summary: StatsAggregator::summarize(&usages),
            active_count: StatsAggregator::active_count(&usages),
            recent: StatsAggregator::latest_n(&usages, recent_limit)
                .into_iter()
                .cloned()
                .collect(),
            by_home: StatsAggregator::summarize_by_home(&usages),
        })
    }

    /// The `limit` most recent records across all homes.
    pub fn recent(&self, limit: usize) -> Result<Vec<Usage>, CoreError> {
        let usages = self.usages(&LedgerScope::Property)?;
        Ok(StatsAggregator::latest_n(&usages, limit)
            .into_iter()
            .cloned()
            .collect())
    }
}
