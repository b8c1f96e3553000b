use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::BillingError;

/// One test charge on a Test bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub code: String,
    pub description: String,
    pub unit_rate: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// Line subtotal before any bill-level discount
    pub fn subtotal(&self) -> Decimal {
        self.unit_rate * Decimal::from(self.quantity)
    }
}

/// What a bill charges for; a bill is either a test panel or a single
/// doctor visit, never both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChargeSource {
    Test { items: Vec<LineItem> },
    DoctorVisit { doctor_id: Option<Uuid>, fee: Decimal },
}

impl ChargeSource {
    pub fn bill_type(&self) -> BillType {
        match self {
            ChargeSource::Test { .. } => BillType::Test,
            ChargeSource::DoctorVisit { .. } => BillType::DoctorVisit,
        }
    }

    /// Pre-discount charge total
    pub fn gross_amount(&self) -> Decimal {
        match self {
            ChargeSource::Test { items } => items.iter().map(LineItem::subtotal).sum(),
            ChargeSource::DoctorVisit { fee, .. } => *fee,
        }
    }
}

/// Bill category, used as the key for per-type reporting rollups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BillType {
    Test,
    #[serde(rename = "Doctor Visit")]
    DoctorVisit,
}

impl fmt::Display for BillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillType::Test => f.write_str("Test"),
            BillType::DoctorVisit => f.write_str("Doctor Visit"),
        }
    }
}

impl FromStr for BillType {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Test" => Ok(BillType::Test),
            "Doctor Visit" => Ok(BillType::DoctorVisit),
            other => Err(BillingError::InvalidBillType(other.to_string())),
        }
    }
}

/// Referral party category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralKind {
    Doctor,
    PrimaryCare,
}

impl fmt::Display for ReferralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferralKind::Doctor => f.write_str("Doctor"),
            ReferralKind::PrimaryCare => f.write_str("Primary Care"),
        }
    }
}

/// Fee owed to a referral party for sending the patient in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralFee {
    pub party_id: Uuid,
    pub party_name: String,
    pub kind: ReferralKind,
    pub fee: Decimal,
}

/// Patient details captured at reception
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub name: String,
    pub age: Option<u32>,
    pub age_months: Option<u32>,
    pub gender: String,
    pub phone: String,
}

/// Everything the caller supplies to compute a bill.
///
/// Identity and timestamps come from the caller; the engine never reads
/// ambient state and never generates ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillInput {
    pub id_no: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub receptionist_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub patient: Patient,
    pub charge: ChargeSource,
    pub referrals: Vec<ReferralFee>,
    pub discount_percent: Decimal,
    pub extra_discount: Decimal,
    pub received_amount: Decimal,
}

/// A computed bill, ready for the persistence collaborator.
///
/// `id` stays `None` until persistence assigns one. `archived` is false at
/// computation time; archive and restore transitions are owned by the
/// external store, never by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: Option<Uuid>,
    pub id_no: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub receptionist_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub patient: Patient,
    pub charge: ChargeSource,
    pub referrals: Vec<ReferralFee>,
    pub gross_amount: Decimal,
    pub discount_amount: Decimal,
    pub extra_discount: Decimal,
    pub total_amount: Decimal,
    pub received_amount: Decimal,
    pub due: Decimal,
    pub archived: bool,
}

impl Bill {
    pub fn bill_type(&self) -> BillType {
        self.charge.bill_type()
    }

    /// Fee entry for the given referral kind, if this bill carries one
    pub fn referral(&self, kind: ReferralKind) -> Option<&ReferralFee> {
        self.referrals.iter().find(|r| r.kind == kind)
    }
}
