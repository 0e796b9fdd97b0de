//! Fill Model — turns a desired trade into an executed fill.

pub mod fill_model;

pub use fill_model::{Fill, FillModel, FillOutcome, Liquidity, RejectReason};
