//! Exposure limits module
//!
//! Limit catalog (profile -> caps) and the pre-trade limit validator

mod catalog;
mod types;
mod validator;

pub use catalog::{LimitCatalog, StaticProfileSource};
pub use types::{
    AccountProfile, Classification, LimitCategory, LimitProfile, ProfileError, ProfileSource,
    RiskTier,
};
pub use validator::{LimitBreach, LimitCheck, LimitKind, LimitValidator, LimitWarning};
