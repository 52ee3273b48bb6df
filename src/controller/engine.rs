//! Order validation pipeline and portfolio monitoring

use super::types::{
    CheckKind, ConcentrationWarning, DenyReason, HealthRating, PortfolioHealth, RiskError,
    RiskWarning, ValidationResult,
};
use super::velocity::OrderVelocity;
use crate::alerts::{Alert, AlertKind, AlertSink, Severity};
use crate::breaker::{BreakerStatus, CircuitBreaker};
use crate::config::{Config, ControllerConfig};
use crate::execution::{Fill, InstrumentKey, Order};
use crate::ledger::{AccountBook, BookHandle, ExposureScope, FillResult, Position, PositionLedger};
use crate::limits::{LimitCatalog, LimitValidator, ProfileSource};
use crate::market::{CalendarError, ClosedReason, MarketCalendar, MarketStatus};
use crate::store::{AccountSnapshot, StateStore, StoreError};
use crate::telemetry::{self, Decision};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Runs every pre-trade check for an order and keeps the books the checks
/// read from.
///
/// All work for one account happens under that account's book lock, so a
/// validation never observes a half-applied fill.
pub struct RiskController {
    config: ControllerConfig,
    ledger: PositionLedger,
    catalog: LimitCatalog,
    validator: LimitValidator,
    breaker: CircuitBreaker,
    calendar: MarketCalendar,
    velocity: OrderVelocity,
    /// Latest broadcast mark per instrument
    marks: DashMap<InstrumentKey, (Decimal, DateTime<Utc>)>,
    profiles: Arc<dyn ProfileSource>,
    alerts: Arc<dyn AlertSink>,
    store: Option<Arc<dyn StateStore>>,
}

impl RiskController {
    /// Create a controller from configuration and collaborators
    pub fn new(
        config: &Config,
        profiles: Arc<dyn ProfileSource>,
        alerts: Arc<dyn AlertSink>,
    ) -> Result<Self, CalendarError> {
        Ok(Self {
            config: config.controller.clone(),
            ledger: PositionLedger::new(),
            catalog: LimitCatalog::new(config.limits.clone()),
            validator: LimitValidator::new(config.limits.warning_ratio),
            breaker: CircuitBreaker::new(config.breaker.clone()),
            calendar: MarketCalendar::from_config(&config.market)?,
            velocity: OrderVelocity::new(Duration::seconds(config.controller.rapid_window_secs)),
            marks: DashMap::new(),
            profiles,
            alerts,
            store: None,
        })
    }

    /// Persist account state through `store` and hydrate accounts from it
    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Position ledger
    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Circuit breaker
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Limit catalog
    pub fn catalog(&self) -> &LimitCatalog {
        &self.catalog
    }

    /// Market calendar
    pub fn calendar(&self) -> &MarketCalendar {
        &self.calendar
    }

    /// Validate an order at the current time
    pub fn validate_order(&self, order: &Order) -> ValidationResult {
        self.validate_order_at(order, Utc::now())
    }

    /// Validate an order at `now`.
    ///
    /// Stages run in order: sanity, account state, market timing, circuit
    /// breaker, position limits, large order, rapid trading. Blocking stages
    /// stop the pipeline on denial.
    pub fn validate_order_at(&self, order: &Order, now: DateTime<Utc>) -> ValidationResult {
        let started = Instant::now();
        let mut result = ValidationResult::new(order, now);
        self.run_pipeline(order, now, &mut result);

        let decision = if result.allowed {
            Decision::Allowed
        } else {
            Decision::Denied
        };
        if let Some(reason) = result.primary_reason() {
            telemetry::record_denial(reason.code());
            tracing::info!(
                account = %order.account_id,
                instrument = %order.instrument,
                reason = %reason,
                "Order denied"
            );
        } else {
            tracing::debug!(
                account = %order.account_id,
                instrument = %order.instrument,
                warnings = result.warnings.len(),
                "Order allowed"
            );
        }
        telemetry::record_validation(decision, started.elapsed());
        result
    }

    fn run_pipeline(&self, order: &Order, now: DateTime<Utc>, result: &mut ValidationResult) {
        let account = order.account_id.as_str();

        if let Err(reason) = order.check() {
            self.emit(
                Alert::new(AlertKind::InvalidOrder, Severity::Warning, account, &reason, now)
                    .with_details(json!({ "instrument": order.instrument })),
            );
            result.deny(CheckKind::OrderSanity, DenyReason::InvalidOrder { reason });
            return;
        }
        result.pass(CheckKind::OrderSanity, "ok");

        let handle = match self.account_handle(account) {
            Ok(handle) => handle,
            Err(e) => {
                self.emit(Alert::new(
                    AlertKind::DependencyUnavailable,
                    Severity::Critical,
                    account,
                    format!("State store unavailable: {e}"),
                    now,
                ));
                result.deny(
                    CheckKind::AccountState,
                    DenyReason::StateUnavailable {
                        reason: e.to_string(),
                    },
                );
                return;
            }
        };
        let book = handle.lock();

        // 1. Market timing
        let status: MarketStatus = self.calendar.is_open(order.segment, now);
        if !status.open {
            let reason = DenyReason::MarketClosed {
                segment: order.segment,
                reason: status.reason.unwrap_or(ClosedReason::OutsideSession),
                next_opening: status.next_opening,
            };
            self.emit(
                Alert::new(AlertKind::MarketClosed, Severity::Warning, account, reason.to_string(), now)
                    .with_details(json!({ "segment": order.segment, "status": status })),
            );
            result.deny(CheckKind::MarketTiming, reason);
            return;
        }
        result.pass(
            CheckKind::MarketTiming,
            format!("session {}", status.session.unwrap_or_default()),
        );

        // 2. Circuit breaker
        match self.breaker.is_trading_allowed(account, now) {
            BreakerStatus::CoolingOff {
                level,
                cooloff_until,
                remaining_minutes,
            } => {
                let reason = DenyReason::CircuitBreaker {
                    level,
                    cooloff_until,
                    remaining_minutes,
                };
                self.emit(
                    Alert::new(
                        AlertKind::CircuitBreakerActive,
                        Severity::Warning,
                        account,
                        reason.to_string(),
                        now,
                    )
                    .with_details(json!({ "level": level, "cooloff_until": cooloff_until })),
                );
                result.deny(CheckKind::CircuitBreaker, reason);
                return;
            }
            BreakerStatus::Allowed { cleared } => {
                if let Some(level) = cleared {
                    self.emit(
                        Alert::new(
                            AlertKind::CircuitBreakerReset,
                            Severity::Info,
                            account,
                            format!("Circuit breaker {level} cool-off elapsed"),
                            now,
                        )
                        .with_details(json!({ "level": level })),
                    );
                    self.persist(&book);
                }
                result.pass(CheckKind::CircuitBreaker, "not tripped");
            }
        }

        // 3. Position limits
        let order_value = match order.value(book.last_price(&order.instrument)) {
            Some(value) => value,
            None => {
                let reason = DenyReason::MissingPrice {
                    instrument: order.instrument.clone(),
                };
                self.emit(
                    Alert::new(AlertKind::MissingPrice, Severity::Warning, account, reason.to_string(), now)
                        .with_details(json!({ "instrument": order.instrument, "order_type": order.order_type })),
                );
                result.deny(CheckKind::PositionLimits, reason);
                return;
            }
        };
        result.order_value = Some(order_value);

        let limits = match self.catalog.limits_for(account, self.profiles.as_ref()) {
            Ok(limits) => limits,
            Err(e) => {
                self.emit(Alert::new(
                    AlertKind::DependencyUnavailable,
                    Severity::Critical,
                    account,
                    e.to_string(),
                    now,
                ));
                result.deny(
                    CheckKind::PositionLimits,
                    DenyReason::ProfileUnavailable {
                        reason: e.to_string(),
                    },
                );
                return;
            }
        };
        if limits.fallback {
            self.emit(Alert::new(
                AlertKind::ProfileFallback,
                Severity::Warning,
                account,
                "Conservative fallback limits applied",
                now,
            ));
            result.warnings.push(RiskWarning::FallbackLimits);
        }

        let snapshot = book.exposure_snapshot(&order.instrument);
        let check = self.validator.validate(&snapshot, &limits, order, order_value);
        for warning in check.warnings {
            let finding = RiskWarning::LimitApproaching(warning);
            self.emit(
                Alert::new(AlertKind::LimitWarning, Severity::Warning, account, finding.to_string(), now)
                    .with_details(json!({ "warning": finding })),
            );
            result.warnings.push(finding);
        }
        if !check.allowed {
            let reason = DenyReason::LimitBreached {
                breaches: check.breaches,
            };
            self.emit(
                Alert::new(AlertKind::LimitBreached, Severity::Warning, account, reason.to_string(), now)
                    .with_details(json!({ "deny": reason, "exposure": snapshot })),
            );
            result.deny(CheckKind::PositionLimits, reason);
            return;
        }
        result.pass(CheckKind::PositionLimits, format!("value {order_value} within caps"));

        // 4. Large order
        if order_value > self.config.large_order_threshold {
            let finding = RiskWarning::LargeOrder {
                order_value,
                threshold: self.config.large_order_threshold,
            };
            self.emit(
                Alert::new(AlertKind::LargeOrder, Severity::Warning, account, finding.to_string(), now)
                    .with_details(json!({ "warning": finding })),
            );
            result.pass(CheckKind::LargeOrder, finding.to_string());
            result.warnings.push(finding);
        } else {
            result.pass(CheckKind::LargeOrder, "below threshold");
        }

        // 5. Rapid trading
        let orders = self.velocity.record(account, now);
        if orders >= self.config.rapid_order_count {
            let finding = RiskWarning::RapidTrading {
                orders,
                window_secs: self.velocity.window().num_seconds(),
            };
            self.emit(
                Alert::new(AlertKind::RapidTrading, Severity::Warning, account, finding.to_string(), now)
                    .with_details(json!({ "warning": finding })),
            );
            result.pass(CheckKind::RapidTrading, finding.to_string());
            result.warnings.push(finding);
        } else {
            result.pass(CheckKind::RapidTrading, format!("{orders} orders in window"));
        }
    }

    /// Apply an executed fill to the ledger and persist the account
    pub fn apply_fill(&self, fill: &Fill) -> Result<FillResult, RiskError> {
        let handle = self.account_handle(&fill.account_id)?;
        let mut book = handle.lock();
        let outcome = book.apply_fill(fill)?;
        telemetry::record_fill(outcome.duplicate);
        if !outcome.duplicate {
            self.persist(&book);
            telemetry::set_exposure(&fill.account_id, book.exposure(&ExposureScope::Total));
        }
        Ok(outcome)
    }

    /// Accept an externally supplied last price for one account's position.
    ///
    /// The account is hydrated from the store first, so a mark is never
    /// dropped for an account that is persisted but not yet loaded.
    pub fn update_mark(
        &self,
        account_id: &str,
        instrument: &InstrumentKey,
        price: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Option<Position>, RiskError> {
        self.account_handle(account_id)?;
        Ok(self.ledger.update_mark(account_id, instrument, price, at))
    }

    /// Accept an externally supplied last price for every holder of `instrument`.
    ///
    /// Loaded books are marked now. The mark is also kept and applied to
    /// accounts hydrated later whose position is older than it.
    pub fn update_mark_all(&self, instrument: &InstrumentKey, price: Decimal, at: DateTime<Utc>) -> usize {
        if price > Decimal::ZERO {
            self.marks
                .entry(instrument.clone())
                .and_modify(|mark| {
                    if at >= mark.1 {
                        *mark = (price, at);
                    }
                })
                .or_insert((price, at));
        }
        self.ledger.update_mark_all(instrument, price, at)
    }

    /// Drop an account's cached limits after its profile changed
    pub fn invalidate_profile(&self, account_id: &str) -> bool {
        self.catalog.invalidate(account_id)
    }

    /// Recompute P&L, re-evaluate the breaker against today's loss and rate
    /// the account's health
    pub fn monitor_portfolio(&self, account_id: &str, now: DateTime<Utc>) -> Result<PortfolioHealth, RiskError> {
        let handle = self.account_handle(account_id)?;
        let mut book = handle.lock();
        book.roll_day(now.date_naive());

        let pnl = book.pnl();
        let limits = self.catalog.limits_for(account_id, self.profiles.as_ref())?;
        let daily_loss = (-pnl.daily).max(Decimal::ZERO);
        let loss_ratio = CircuitBreaker::loss_ratio(daily_loss, limits.daily_loss_cap).round_dp(4);

        if let Some(state) = self
            .breaker
            .check_and_trip(account_id, daily_loss, limits.daily_loss_cap, now)
        {
            telemetry::record_breaker_trip(&state.level.to_string());
            self.emit(
                Alert::new(
                    AlertKind::CircuitBreakerTripped,
                    Severity::Critical,
                    account_id,
                    format!(
                        "Circuit breaker {} tripped at loss ratio {}",
                        state.level, state.loss_ratio
                    ),
                    now,
                )
                .with_details(json!({
                    "level": state.level,
                    "daily_loss": daily_loss,
                    "daily_loss_cap": limits.daily_loss_cap,
                    "cooloff_until": state.cooloff_until,
                })),
            );
        }
        let breaker = self.breaker.state(account_id).filter(|s| s.cooloff_until > now);
        self.persist(&book);

        let total_exposure = book.exposure(&ExposureScope::Total);
        let concentration = self.concentration(&book, total_exposure);
        if let Some(c) = &concentration {
            self.emit(
                Alert::new(
                    AlertKind::Concentration,
                    Severity::Warning,
                    account_id,
                    format!(
                        "{} is {}% of total exposure",
                        c.instrument,
                        (c.share * Decimal::ONE_HUNDRED).round_dp(2)
                    ),
                    now,
                )
                .with_details(json!({ "concentration": c })),
            );
        }

        let rating = if breaker.is_some() {
            HealthRating::Critical
        } else if loss_ratio >= self.config.at_risk_loss_ratio
            || (limits.aggregate_cap > Decimal::ZERO
                && total_exposure >= limits.aggregate_cap * self.catalog.config().warning_ratio)
        {
            HealthRating::AtRisk
        } else {
            HealthRating::Healthy
        };

        telemetry::set_exposure(account_id, total_exposure);
        tracing::info!(
            account = account_id,
            ?rating,
            daily_pnl = %pnl.daily,
            %loss_ratio,
            exposure = %total_exposure,
            "Portfolio monitored"
        );

        Ok(PortfolioHealth {
            account_id: account_id.to_string(),
            rating,
            pnl,
            total_exposure,
            loss_ratio,
            limits,
            breaker,
            concentration,
            evaluated_at: now,
        })
    }

    /// Clear expired breaker states and idle velocity windows
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cleared = self.breaker.sweep(now);
        let idle = self.velocity.sweep(now);
        tracing::debug!(cleared, idle, "Swept expired state");
        cleared
    }

    fn concentration(&self, book: &AccountBook, total: Decimal) -> Option<ConcentrationWarning> {
        if total <= Decimal::ZERO {
            return None;
        }
        book.positions()
            .map(|p| (p, p.exposure() / total))
            .filter(|(_, share)| *share > self.config.max_concentration)
            .max_by(|a, b| a.1.cmp(&b.1))
            .map(|(p, share)| ConcentrationWarning {
                instrument: p.instrument.clone(),
                exposure: p.exposure(),
                share: share.round_dp(4),
            })
    }

    /// Book handle, hydrating from the store on first touch
    fn account_handle(&self, account_id: &str) -> Result<BookHandle, StoreError> {
        if let Some(handle) = self.ledger.existing(account_id) {
            return Ok(handle);
        }
        let Some(store) = &self.store else {
            return Ok(self.ledger.account(account_id));
        };

        let (mut book, breaker) = match store.load(account_id)? {
            Some(snapshot) => (
                AccountBook::from_snapshot(account_id, snapshot.ledger),
                snapshot.breaker,
            ),
            None => (AccountBook::new(account_id), None),
        };
        self.apply_buffered_marks(&mut book);

        let positions = book.positions().count();
        // A concurrent first touch may win; only the installed book brings
        // its stored breaker state along
        Ok(self.ledger.insert_if_absent(book, || {
            if let Some(state) = breaker {
                self.breaker.restore(state);
            }
            tracing::info!(account = account_id, positions, "Hydrated account from store");
        }))
    }

    /// Apply marks received while the account was not loaded
    fn apply_buffered_marks(&self, book: &mut AccountBook) {
        let stale: Vec<(InstrumentKey, Decimal, DateTime<Utc>)> = book
            .positions()
            .filter_map(|p| {
                let mark = self.marks.get(&p.instrument)?;
                let (price, at) = *mark.value();
                (at > p.updated_at).then(|| (p.instrument.clone(), price, at))
            })
            .collect();
        for (instrument, price, at) in stale {
            book.update_mark(&instrument, price, at);
        }
    }

    /// Save an account's state; failures are logged, never propagated
    fn persist(&self, book: &AccountBook) {
        let Some(store) = &self.store else {
            return;
        };
        let account_id = book.account_id();
        let snapshot = AccountSnapshot {
            ledger: book.snapshot(),
            breaker: self.breaker.state(account_id),
        };
        if let Err(e) = store.save(account_id, &snapshot) {
            tracing::warn!(account = account_id, error = %e, "Failed to persist account state");
        }
    }

    /// Best-effort alert delivery
    fn emit(&self, alert: Alert) {
        let kind = alert.kind;
        let account = alert.account_id.clone();
        match self.alerts.emit(alert) {
            Ok(()) => telemetry::record_alert(true),
            Err(e) => {
                telemetry::record_alert(false);
                tracing::warn!(%account, ?kind, error = %e, "Alert delivery failed");
            }
        }
    }
}
