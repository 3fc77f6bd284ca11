use chrono::{DateTime, Local, NaiveDate, Utc};

use cabin_core::Clock;

/// Wall clock for the shell. Stay dates are local calendar days.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
