//! Exchange session and holiday calendar

use super::types::{CalendarError, ClosedReason, MarketStatus};
use crate::config::{MarketConfig, SessionWindow};
use crate::execution::Segment;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};
use std::collections::{BTreeSet, HashMap};

/// How far ahead to look for the next opening
const MAX_LOOKAHEAD_DAYS: u32 = 366;

/// Session calendar per segment, evaluated in exchange-local time
#[derive(Debug, Clone)]
pub struct MarketCalendar {
    offset: FixedOffset,
    holidays: BTreeSet<NaiveDate>,
    sessions: HashMap<Segment, Vec<SessionWindow>>,
}

impl MarketCalendar {
    /// Build a calendar; windows are sorted by start time
    pub fn from_config(config: &MarketConfig) -> Result<Self, CalendarError> {
        let offset = config
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(CalendarError::InvalidOffset(config.utc_offset_minutes))?;

        let mut sessions = HashMap::new();
        for (segment, windows) in &config.sessions {
            let mut windows = windows.clone();
            if let Some(bad) = windows.iter().find(|w| w.start >= w.end) {
                return Err(CalendarError::InvalidWindow {
                    name: format!("{segment}/{}", bad.name),
                    start: bad.start.to_string(),
                    end: bad.end.to_string(),
                });
            }
            windows.sort_by_key(|w| w.start);
            sessions.insert(*segment, windows);
        }

        Ok(Self {
            offset,
            holidays: config.holidays.iter().copied().collect(),
            sessions,
        })
    }

    /// Whether `date` is neither a weekend nor a holiday
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.holidays.contains(&date)
    }

    /// Market status for `segment` at `now`
    pub fn is_open(&self, segment: Segment, now: DateTime<Utc>) -> MarketStatus {
        let local = now.with_timezone(&self.offset);
        let date = local.date_naive();
        let time = local.time();

        let windows = match self.sessions.get(&segment) {
            Some(w) if !w.is_empty() => w,
            _ => return MarketStatus::closed(ClosedReason::NoSessions, None),
        };

        if is_weekend(date) {
            return MarketStatus::closed(ClosedReason::Weekend, self.next_opening(windows, date, None));
        }
        if self.holidays.contains(&date) {
            return MarketStatus::closed(ClosedReason::Holiday, self.next_opening(windows, date, None));
        }

        match windows.iter().find(|w| w.contains(time)) {
            Some(window) => MarketStatus::open(&window.name),
            None => MarketStatus::closed(
                ClosedReason::OutsideSession,
                self.next_opening(windows, date, Some(time)),
            ),
        }
    }

    /// Next window start after `time` on `date` (when given and `date` trades),
    /// otherwise the first window on the next trading day
    fn next_opening(
        &self,
        windows: &[SessionWindow],
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> Option<DateTime<Utc>> {
        if let Some(time) = time {
            if let Some(window) = windows.iter().find(|w| w.start > time) {
                return self.to_utc(date, window.start);
            }
        }

        let first = windows.first()?;
        let mut day = date;
        for _ in 0..MAX_LOOKAHEAD_DAYS {
            day = day.succ_opt()?;
            if self.is_trading_day(day) {
                return self.to_utc(day, first.start);
            }
        }
        None
    }

    fn to_utc(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        date.and_time(time)
            .and_local_timezone(self.offset)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
