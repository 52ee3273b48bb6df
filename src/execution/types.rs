//! Inbound order and fill types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account identifier
pub type AccountId = String;

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy (adds to longs, covers shorts)
    Buy,
    /// Sell (reduces longs, opens shorts)
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

/// Product type an instrument is traded under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Product {
    /// Cash delivery
    Delivery,
    /// Intraday cash
    Intraday,
    /// Futures contract
    Futures,
    /// Options contract
    Options,
}

impl Product {
    /// Whether the product counts toward F&O exposure
    pub fn is_derivative(&self) -> bool {
        matches!(self, Product::Futures | Product::Options)
    }
}

/// Market segment an order is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Segment {
    /// Cash equity
    Equity,
    /// Futures and options
    Fno,
    /// Commodity derivatives
    Commodity,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Segment::Equity => "EQUITY",
            Segment::Fno => "FNO",
            Segment::Commodity => "COMMODITY",
        };
        f.write_str(s)
    }
}

impl FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EQUITY" => Ok(Segment::Equity),
            "FNO" | "F&O" => Ok(Segment::Fno),
            "COMMODITY" => Ok(Segment::Commodity),
            other => Err(format!("unknown segment: {other}")),
        }
    }
}

/// Identifies a position bucket: (symbol, exchange, product)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentKey {
    /// Trading symbol
    pub symbol: String,
    /// Exchange code
    pub exchange: String,
    /// Product type
    pub product: Product,
}

impl InstrumentKey {
    /// Create a new instrument key
    pub fn new(symbol: impl Into<String>, exchange: impl Into<String>, product: Product) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: exchange.into(),
            product,
        }
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{:?}", self.exchange, self.symbol, self.product)
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Market order (immediate execution)
    Market,
    /// Limit order (price specified)
    Limit,
}

/// A prospective order, checked before broker dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Caller-assigned order reference
    #[serde(default)]
    pub client_order_id: Option<String>,
    /// Owning account
    pub account_id: AccountId,
    /// Instrument being traded
    pub instrument: InstrumentKey,
    /// Trade side
    pub side: Side,
    /// Order quantity
    pub quantity: Decimal,
    /// Order price (zero for market orders without a reference price)
    #[serde(default)]
    pub price: Decimal,
    /// Order type
    pub order_type: OrderType,
    /// Segment the order is routed to
    pub segment: Segment,
}

impl Order {
    /// Basic shape checks; returns the reason on failure
    pub fn check(&self) -> Result<(), String> {
        if self.account_id.is_empty() {
            return Err("empty account id".to_string());
        }
        if self.quantity <= Decimal::ZERO {
            return Err(format!("quantity must be positive, got {}", self.quantity));
        }
        if self.price < Decimal::ZERO {
            return Err(format!("price must not be negative, got {}", self.price));
        }
        if self.order_type == OrderType::Limit && self.price.is_zero() {
            return Err("limit order without a price".to_string());
        }
        Ok(())
    }

    /// Notional value of the order.
    ///
    /// Market orders without a price are valued at `mark`; `None` when
    /// neither is available.
    pub fn value(&self, mark: Option<Decimal>) -> Option<Decimal> {
        if self.price > Decimal::ZERO {
            return Some(self.quantity * self.price);
        }
        mark.filter(|p| *p > Decimal::ZERO)
            .map(|p| self.quantity * p)
    }
}

/// A fill (executed quantity of an order)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// Unique fill identifier, used for idempotent replay
    pub fill_id: String,
    /// Owning account
    pub account_id: AccountId,
    /// Instrument filled
    pub instrument: InstrumentKey,
    /// Trade side
    pub side: Side,
    /// Fill quantity (always positive)
    pub quantity: Decimal,
    /// Fill price
    pub price: Decimal,
    /// Fill timestamp
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    /// Quantity signed by side
    pub fn signed_quantity(&self) -> Decimal {
        self.quantity * self.side.sign()
    }
}
