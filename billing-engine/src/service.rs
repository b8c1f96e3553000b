use serde_json::Value;

use crate::calculator;
use crate::dto;
use crate::error::BillingResult;
use crate::models::{Bill, BillInput};
use crate::reporting::{EarningsAggregator, EarningsSummary, ReportingWindow};

/// Facade over bill computation and earnings reporting
pub struct BillingService;

impl BillingService {
    /// Create a new billing service
    pub fn new() -> Self {
        Self
    }

    /// Compute a bill ready for the persistence collaborator
    pub fn create_bill(&self, input: BillInput) -> BillingResult<Bill> {
        let bill = calculator::compute_bill(input)?;
        tracing::debug!(
            id_no = %bill.id_no,
            bill_type = %bill.bill_type(),
            total = %bill.total_amount,
            due = %bill.due,
            "bill computed"
        );
        Ok(bill)
    }

    /// Settle the outstanding balance on a bill
    pub fn clear_due(&self, bill: &Bill) -> Bill {
        calculator::clear_due(bill)
    }

    /// Aggregate typed bills for a reporting window
    pub fn earnings_summary(
        &self,
        bills: &[Bill],
        window: ReportingWindow,
        include_archived: bool,
    ) -> EarningsSummary {
        EarningsAggregator::new(window)
            .include_archived(include_archived)
            .aggregate(bills)
    }

    /// Decode a raw API payload and aggregate it. Warnings from skipped
    /// records are carried in the summary's `skipped` list.
    pub fn earnings_from_payload(
        &self,
        payload: &Value,
        window: ReportingWindow,
        include_archived: bool,
    ) -> BillingResult<EarningsSummary> {
        let (bills, warnings) = dto::decode_bills(payload)?;
        let mut summary = self.earnings_summary(&bills, window, include_archived);
        summary.skipped.extend(warnings);
        Ok(summary)
    }
}

impl Default for BillingService {
    fn default() -> Self {
        Self::new()
    }
}
