//! Dashboard aggregates.

use std::fmt;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};
use db::{Operator, Query};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::models::{from_rows, DashboardStats, InvoiceDetail, InvoiceStatus};
use crate::repository::invoices::detail_query;
use crate::schema::INVOICES;
use crate::{GatewayError, InvoicingGateway};

/// The `total,status` projection the stats are computed from.
#[derive(Debug, Deserialize)]
struct StatusTotal {
    total: Decimal,
    status: InvoiceStatus,
}

fn tally(rows: &[StatusTotal]) -> DashboardStats {
    rows.iter().fold(DashboardStats::default(), |mut stats, row| {
        stats.total_invoices += 1;
        match row.status {
            InvoiceStatus::Paid => {
                stats.paid_invoices += 1;
                stats.total_revenue += row.total;
            }
            InvoiceStatus::Sent => stats.pending_invoices += 1,
            InvoiceStatus::Other(_) => {}
        }
        stats
    })
}

impl InvoicingGateway {
    /// Invoice counters and paid revenue, optionally for one agent.
    ///
    /// Statuses other than `sent` and `paid` only count toward the total.
    #[instrument(skip(self))]
    pub async fn get_stats(&self, agent_id: Option<Uuid>) -> Result<DashboardStats, GatewayError> {
        let mut query = Query::select(INVOICES).columns(&["total", "status"]);
        if let Some(agent_id) = agent_id {
            query = query.eq("agent_id", agent_id.to_string());
        }

        let rows = self.store().fetch_all(query).await?;
        let rows: Vec<StatusTotal> = from_rows(rows)?;
        Ok(tally(&rows))
    }

    /// Invoices created today on the local clock.
    #[instrument(skip(self))]
    pub async fn get_todays_invoices(&self, agent_id: Option<Uuid>) -> Result<Vec<InvoiceDetail>, GatewayError> {
        let today = Local::now().date_naive();
        self.invoices_created_on(today, &Local, agent_id).await
    }

    /// Invoices whose `created_at` falls on the calendar day `date` in `tz`.
    ///
    /// Bounds are `00:00:00` and `23:59:59` inclusive, at whole-second
    /// precision: anything stamped in the final fraction of a second
    /// (23:59:59.5, say) is not returned.  Each bound takes the offset `tz`
    /// has at that moment, so days with a clock change are covered whole.
    #[instrument(skip(self, tz))]
    pub async fn invoices_created_on<Tz>(
        &self,
        date: NaiveDate,
        tz: &Tz,
        agent_id: Option<Uuid>,
    ) -> Result<Vec<InvoiceDetail>, GatewayError>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let (start, end) = day_bounds(date, tz)?;

        let query = detail_query(agent_id)
            .filter("created_at", Operator::Gte, start.to_rfc3339())
            .filter("created_at", Operator::Lte, end.to_rfc3339());

        let rows = self.store().fetch_all(query).await?;
        from_rows(rows)
    }
}

/// How far past a skipped local time to look for the first one that exists.
const GAP_SEARCH_MINUTES: i64 = 180;

/// First and last whole-second instants of `date` in `tz`.
///
/// When midnight falls in a clock-change gap the day starts at the first
/// local minute that exists; an ambiguous 23:59:59 resolves to the later
/// instant.
fn day_bounds<Tz: TimeZone>(
    date: NaiveDate,
    tz: &Tz,
) -> Result<(DateTime<Tz>, DateTime<Tz>), GatewayError> {
    let start = date.and_hms_opt(0, 0, 0).and_then(|midnight| {
        (0..=GAP_SEARCH_MINUTES)
            .find_map(|m| tz.from_local_datetime(&(midnight + Duration::minutes(m))).earliest())
    });
    let end = date.and_hms_opt(23, 59, 59).and_then(|last| {
        (0..=GAP_SEARCH_MINUTES)
            .find_map(|m| tz.from_local_datetime(&(last - Duration::minutes(m))).latest())
    });

    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(GatewayError::LocalDay(date)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;
    use rust_decimal_macros::dec;

    use super::*;

    fn row(status: &str, total: Decimal) -> StatusTotal {
        StatusTotal {
            total,
            status: status.parse().unwrap(),
        }
    }

    #[test]
    fn tally_buckets_by_status() {
        let stats = tally(&[
            row("paid", dec!(100.00)),
            row("paid", dec!(25.50)),
            row("sent", dec!(999)),
            row("draft", dec!(40)),
        ]);

        assert_eq!(stats.total_invoices, 4);
        assert_eq!(stats.paid_invoices, 2);
        assert_eq!(stats.pending_invoices, 1);
        assert_eq!(stats.total_revenue, dec!(125.50));
    }

    #[test]
    fn tally_of_nothing_is_zero() {
        assert_eq!(tally(&[]), DashboardStats::default());
    }

    #[test]
    fn day_bounds_carry_the_offset() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let (start, end) = day_bounds(date, &offset).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-10T00:00:00+02:00");
        assert_eq!(end.to_rfc3339(), "2026-03-10T23:59:59+02:00");
    }
}
