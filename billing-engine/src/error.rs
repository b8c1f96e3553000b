use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::ReferralKind;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("invalid bill type: {0}")]
    InvalidBillType(String),

    #[error("a test bill requires at least one line item")]
    EmptyLineItems,

    #[error("negative or out-of-range amount for {field}")]
    NegativeAmount { field: &'static str },

    #[error("extra discount {extra} exceeds gross amount {gross}")]
    ExtraDiscountExceedsGross { extra: Decimal, gross: Decimal },

    #[error("discount percent must be between 0 and 100, got {0}")]
    InvalidDiscountPercent(Decimal),

    #[error("more than one {0} referral on a single bill")]
    DuplicateReferralKind(ReferralKind),

    #[error("malformed bills payload: {0}")]
    MalformedPayload(String),
}

pub type BillingResult<T> = Result<T, BillingError>;
