//! Earnings rollups over persisted bills.
//!
//! Summaries are recomputed fresh on every query and never mutated in
//! place; a new summary replaces the prior one.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Bill, BillType, ReferralKind};

/// Inclusive date range for a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportingWindow {
    /// Single-day window, as used by the reception dashboard
    pub fn day(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    /// Calendar-month window; `None` for an invalid month number
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            start,
            end: next_month.pred_opt()?,
        })
    }

    /// Arbitrary range; bounds are reordered if given backwards
    pub fn range(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Why a record was left out of a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationWarningKind {
    MalformedBillRecord,
}

/// A record excluded from a summary, with the reason.
///
/// Warnings are collected per record; the aggregation itself always
/// completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationWarning {
    pub record: String,
    pub kind: AggregationWarningKind,
    pub detail: String,
}

impl AggregationWarning {
    pub fn malformed(record: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            kind: AggregationWarningKind::MalformedBillRecord,
            detail: detail.into(),
        }
    }
}

/// Earnings accrued to one referral party within a window
#[derive(Debug, Clone, Serialize)]
pub struct PartyEarnings {
    pub name: String,
    pub kind: ReferralKind,
    pub total_earnings: Decimal,
    /// Contributing bills, in encounter order
    pub bills: Vec<Bill>,
}

/// Aggregated earnings for one reporting window
#[derive(Debug, Clone, Serialize)]
pub struct EarningsSummary {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// Referral earnings keyed by party id; display ordering and search
    /// filtering are left to callers
    pub per_party: HashMap<Uuid, PartyEarnings>,
    pub per_day: BTreeMap<NaiveDate, Decimal>,
    pub per_day_per_type: BTreeMap<NaiveDate, BTreeMap<BillType, Decimal>>,
    pub per_bill_type: BTreeMap<BillType, Decimal>,
    /// Sum of `total_amount` over every included bill
    pub total_amount: Decimal,
    /// Sum of outstanding dues over every included bill
    pub total_due: Decimal,
    /// Sum of referral fees owed out across all parties
    pub total_distributed: Decimal,
    pub skipped: Vec<AggregationWarning>,
}

impl EarningsSummary {
    fn empty(window: ReportingWindow) -> Self {
        Self {
            window_start: window.start,
            window_end: window.end,
            per_party: HashMap::new(),
            per_day: BTreeMap::new(),
            per_day_per_type: BTreeMap::new(),
            per_bill_type: BTreeMap::new(),
            total_amount: Decimal::ZERO,
            total_due: Decimal::ZERO,
            total_distributed: Decimal::ZERO,
            skipped: Vec::new(),
        }
    }

    /// Parties credited through a doctor referral
    pub fn doctor_parties(&self) -> impl Iterator<Item = (&Uuid, &PartyEarnings)> {
        self.parties_of(ReferralKind::Doctor)
    }

    /// Parties credited through a primary care referral
    pub fn primary_care_parties(&self) -> impl Iterator<Item = (&Uuid, &PartyEarnings)> {
        self.parties_of(ReferralKind::PrimaryCare)
    }

    fn parties_of(&self, kind: ReferralKind) -> impl Iterator<Item = (&Uuid, &PartyEarnings)> {
        self.per_party.iter().filter(move |(_, party)| party.kind == kind)
    }
}

/// Rolls persisted bills up into an [`EarningsSummary`].
///
/// Bills are filtered to the window here, by `date`; callers hand over
/// whatever they fetched and the window decides what counts. Archived
/// bills are excluded unless `include_archived` is set.
#[derive(Debug, Clone)]
pub struct EarningsAggregator {
    window: ReportingWindow,
    include_archived: bool,
}

impl EarningsAggregator {
    pub fn new(window: ReportingWindow) -> Self {
        Self {
            window,
            include_archived: false,
        }
    }

    pub fn include_archived(mut self, include: bool) -> Self {
        self.include_archived = include;
        self
    }

    pub fn aggregate(&self, bills: &[Bill]) -> EarningsSummary {
        let mut summary = EarningsSummary::empty(self.window);

        for bill in bills {
            if !self.window.contains(bill.date) {
                continue;
            }
            if bill.archived && !self.include_archived {
                continue;
            }

            let bill_type = bill.bill_type();
            summary.total_amount += bill.total_amount;
            summary.total_due += bill.due;
            *summary.per_day.entry(bill.date).or_insert(Decimal::ZERO) += bill.total_amount;
            *summary
                .per_day_per_type
                .entry(bill.date)
                .or_default()
                .entry(bill_type)
                .or_insert(Decimal::ZERO) += bill.total_amount;
            *summary
                .per_bill_type
                .entry(bill_type)
                .or_insert(Decimal::ZERO) += bill.total_amount;

            // A bill carrying both referral kinds contributes to both
            // parties independently.
            for referral in &bill.referrals {
                let party = summary
                    .per_party
                    .entry(referral.party_id)
                    .or_insert_with(|| PartyEarnings {
                        name: referral.party_name.clone(),
                        kind: referral.kind,
                        total_earnings: Decimal::ZERO,
                        bills: Vec::new(),
                    });
                party.total_earnings += referral.fee;
                party.bills.push(bill.clone());
            }
        }

        summary.total_distributed = summary
            .per_party
            .values()
            .map(|party| party.total_earnings)
            .sum();

        summary
    }
}
