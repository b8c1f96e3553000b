//! Bill arithmetic: gross, discount, total and due.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{BillingError, BillingResult};
use crate::models::{Bill, BillInput, ChargeSource, ReferralKind};

/// Round a currency value to 2 decimal places, half-up.
pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute a bill from caller-supplied inputs.
///
/// All validation runs before any arithmetic. On success the derived fields
/// satisfy the invariants: gross is the sum of line subtotals (or the visit
/// fee), discount is gross times percent over 100, total is gross minus
/// discount minus extra discount floored at zero, due is total minus
/// received floored at zero. Every derived field is rounded to 2 decimal
/// places so recomputation on the same input is stable. Overpayment is
/// permitted; due simply floors at zero.
pub fn compute_bill(input: BillInput) -> BillingResult<Bill> {
    validate(&input)?;

    let gross_amount = round_money(input.charge.gross_amount());
    if input.extra_discount > gross_amount {
        return Err(BillingError::ExtraDiscountExceedsGross {
            extra: input.extra_discount,
            gross: gross_amount,
        });
    }

    let discount_amount =
        round_money(gross_amount * input.discount_percent / Decimal::ONE_HUNDRED);
    let total_amount =
        round_money((gross_amount - discount_amount - input.extra_discount).max(Decimal::ZERO));
    let due = round_money((total_amount - input.received_amount).max(Decimal::ZERO));

    Ok(Bill {
        id: None,
        id_no: input.id_no,
        date: input.date,
        time: input.time,
        receptionist_id: input.receptionist_id,
        patient_id: input.patient_id,
        patient: input.patient,
        charge: input.charge,
        referrals: input.referrals,
        gross_amount,
        discount_amount,
        extra_discount: input.extra_discount,
        total_amount,
        received_amount: input.received_amount,
        due,
        archived: false,
    })
}

/// Settle the outstanding balance on a bill: received becomes the total,
/// due becomes zero, everything else is unchanged.
///
/// Idempotent; clearing an already-settled bill is a no-op.
pub fn clear_due(bill: &Bill) -> Bill {
    let mut settled = bill.clone();
    settled.received_amount = settled.total_amount;
    settled.due = Decimal::ZERO;
    settled
}

fn validate(input: &BillInput) -> BillingResult<()> {
    match &input.charge {
        ChargeSource::Test { items } => {
            if items.is_empty() {
                return Err(BillingError::EmptyLineItems);
            }
            for item in items {
                if item.unit_rate < Decimal::ZERO {
                    return Err(BillingError::NegativeAmount { field: "unit rate" });
                }
                if item.quantity < 1 {
                    return Err(BillingError::NegativeAmount { field: "quantity" });
                }
            }
        }
        ChargeSource::DoctorVisit { fee, .. } => {
            if *fee < Decimal::ZERO {
                return Err(BillingError::NegativeAmount { field: "doctor fee" });
            }
        }
    }

    if input.discount_percent < Decimal::ZERO || input.discount_percent > Decimal::ONE_HUNDRED {
        return Err(BillingError::InvalidDiscountPercent(input.discount_percent));
    }
    if input.extra_discount < Decimal::ZERO {
        return Err(BillingError::NegativeAmount { field: "extra discount" });
    }
    if input.received_amount < Decimal::ZERO {
        return Err(BillingError::NegativeAmount { field: "received amount" });
    }

    let mut seen: Vec<ReferralKind> = Vec::with_capacity(input.referrals.len());
    for referral in &input.referrals {
        if referral.fee < Decimal::ZERO {
            return Err(BillingError::NegativeAmount { field: "referral fee" });
        }
        if seen.contains(&referral.kind) {
            return Err(BillingError::DuplicateReferralKind(referral.kind));
        }
        seen.push(referral.kind);
    }

    Ok(())
}
