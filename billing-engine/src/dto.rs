//! Single deserialization boundary for upstream bill records.
//!
//! Deployed APIs disagree on envelope depth (`data` vs `data.data`) and on
//! field strictness, so everything lenient lives here. The rest of the
//! crate only ever sees fully-typed [`Bill`] values.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::models::{Bill, BillType, ChargeSource, LineItem, Patient, ReferralFee, ReferralKind};
use crate::reporting::AggregationWarning;

/// Strip nested `data` envelopes down to the payload itself.
pub fn extract_payload(value: &Value) -> &Value {
    let mut payload = value;
    while let Some(inner) = payload.get("data") {
        payload = inner;
    }
    payload
}

/// One selected test as it appears on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItemDto {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub rate: Option<Decimal>,
    pub quantity: Option<u32>,
}

impl LineItemDto {
    fn into_line_item(self) -> LineItem {
        LineItem {
            code: self.code.unwrap_or_default(),
            description: self.description.or(self.name).unwrap_or_default(),
            unit_rate: self.rate.unwrap_or(Decimal::ZERO),
            quantity: self.quantity.unwrap_or(1).max(1),
        }
    }
}

/// The canonical wire record for one persisted bill.
///
/// Every field is optional; [`BillDto::into_bill`] decides which are
/// required. Upstream sends ages as either numbers or strings, handled
/// once here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillDto {
    pub id: Option<Uuid>,
    pub id_no: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub receptionist_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub bill_type: Option<String>,
    pub gross_amount: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub extra_discount: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub received_amount: Option<Decimal>,
    pub due: Option<Decimal>,
    pub doctor_referral_id: Option<Uuid>,
    pub doctor_referral_fee: Option<Decimal>,
    pub referral_doctor_name: Option<String>,
    pub pc_referral_id: Option<Uuid>,
    pub pc_referral_fee: Option<Decimal>,
    pub referral_pc_name: Option<String>,
    pub selected_tests: Option<Vec<LineItemDto>>,
    pub visited_doctor_id: Option<Uuid>,
    pub doctor_fee: Option<Decimal>,
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_opt_u32")]
    pub age: Option<u32>,
    #[serde(deserialize_with = "lenient_opt_u32")]
    pub age_months: Option<u32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub archived: Option<bool>,
}

impl BillDto {
    /// Convert to a typed [`Bill`]. Returns the failure detail when a
    /// required field (`date`, `billType`, `totalAmount`) is missing or
    /// unrecognized.
    pub fn into_bill(self) -> Result<Bill, String> {
        let date = self.date.ok_or_else(|| "missing date".to_string())?;
        let total_amount = self
            .total_amount
            .ok_or_else(|| "missing totalAmount".to_string())?;
        let bill_type: BillType = self
            .bill_type
            .as_deref()
            .ok_or_else(|| "missing billType".to_string())?
            .parse()
            .map_err(|err: BillingError| err.to_string())?;

        let charge = match bill_type {
            BillType::Test => ChargeSource::Test {
                items: self
                    .selected_tests
                    .unwrap_or_default()
                    .into_iter()
                    .map(LineItemDto::into_line_item)
                    .collect(),
            },
            BillType::DoctorVisit => ChargeSource::DoctorVisit {
                doctor_id: self.visited_doctor_id,
                fee: self.doctor_fee.or(self.gross_amount).unwrap_or(Decimal::ZERO),
            },
        };

        let mut referrals = Vec::new();
        if let Some(party_id) = self.doctor_referral_id {
            referrals.push(ReferralFee {
                party_id,
                party_name: self.referral_doctor_name.unwrap_or_default(),
                kind: ReferralKind::Doctor,
                fee: self.doctor_referral_fee.unwrap_or(Decimal::ZERO),
            });
        }
        if let Some(party_id) = self.pc_referral_id {
            referrals.push(ReferralFee {
                party_id,
                party_name: self.referral_pc_name.unwrap_or_default(),
                kind: ReferralKind::PrimaryCare,
                fee: self.pc_referral_fee.unwrap_or(Decimal::ZERO),
            });
        }

        Ok(Bill {
            id: self.id,
            id_no: self.id_no.unwrap_or_default(),
            date,
            time: self.time.unwrap_or(NaiveTime::MIN),
            receptionist_id: self.receptionist_id,
            patient_id: self.patient_id,
            patient: Patient {
                name: self.name.unwrap_or_default(),
                age: self.age,
                age_months: self.age_months,
                gender: self.gender.unwrap_or_default(),
                phone: self.phone.unwrap_or_default(),
            },
            charge,
            referrals,
            gross_amount: self.gross_amount.unwrap_or(total_amount),
            discount_amount: self.discount.unwrap_or(Decimal::ZERO),
            extra_discount: self.extra_discount.unwrap_or(Decimal::ZERO),
            total_amount,
            received_amount: self.received_amount.unwrap_or(Decimal::ZERO),
            due: self.due.unwrap_or(Decimal::ZERO),
            archived: self.archived.unwrap_or(false),
        })
    }
}

/// Decode a raw API payload into typed bills plus one warning per record
/// that had to be skipped. A payload that is not a list of records at all
/// is an error; a bad record within the list is not.
pub fn decode_bills(payload: &Value) -> BillingResult<(Vec<Bill>, Vec<AggregationWarning>)> {
    let records = extract_payload(payload).as_array().ok_or_else(|| {
        BillingError::MalformedPayload("expected an array of bill records".to_string())
    })?;

    let mut bills = Vec::with_capacity(records.len());
    let mut warnings = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let label = record
            .get("idNo")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{index}"));

        let dto: BillDto = match serde_json::from_value(record.clone()) {
            Ok(dto) => dto,
            Err(err) => {
                tracing::warn!(record = %label, error = %err, "skipping undecodable bill record");
                warnings.push(AggregationWarning::malformed(label, err.to_string()));
                continue;
            }
        };

        match dto.into_bill() {
            Ok(bill) => bills.push(bill),
            Err(detail) => {
                tracing::warn!(record = %label, detail = %detail, "skipping malformed bill record");
                warnings.push(AggregationWarning::malformed(label, detail));
            }
        }
    }

    Ok((bills, warnings))
}

fn lenient_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_u64().map(|n| n as u32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}
