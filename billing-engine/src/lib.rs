//! Bill computation and earnings aggregation for clinic reception
//!
//! Provides the financial core behind a clinic front desk:
//! - Bill construction for test panels and doctor visits
//! - Discount and due arithmetic with fixed-point currency semantics
//! - Referral fee tracking per doctor and primary care party
//! - Daily and monthly earnings rollups for reporting

pub mod calculator;
pub mod dto;
pub mod error;
pub mod models;
pub mod reporting;
pub mod service;

pub use calculator::*;
pub use dto::*;
pub use error::*;
pub use models::*;
pub use reporting::*;
pub use service::*;
