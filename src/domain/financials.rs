//! Dashboard figures over quotes and shipments.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use super::entities::ShipmentSnapshot;
use super::options::is_realized;
use crate::util::number::round2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_shipments: usize,
    pub realized_revenue: f64,
    pub realized_cost: f64,
    pub gross_profit: f64,
    pub average_margin: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub label: String,
    pub revenue: f64,
    pub profit: f64,
}

fn revenue_of(shipment: &ShipmentSnapshot) -> f64 {
    shipment.customer_rate.unwrap_or(0.0)
}

fn cost_of(shipment: &ShipmentSnapshot) -> f64 {
    shipment.carrier_cost_total.unwrap_or(0.0)
}

/// Revenue and cost only count once a shipment is delivered, invoiced or paid.
pub fn compute_kpis(shipments: &[ShipmentSnapshot]) -> Kpis {
    let (revenue, cost) = shipments
        .iter()
        .filter(|s| is_realized(&s.status))
        .fold((0.0, 0.0), |(revenue, cost), s| {
            (revenue + revenue_of(s), cost + cost_of(s))
        });
    let profit = revenue - cost;
    let average_margin = if revenue > 0.0 {
        round2(profit / revenue * 100.0)
    } else {
        0.0
    };

    Kpis {
        total_shipments: shipments.len(),
        realized_revenue: revenue,
        realized_cost: cost,
        gross_profit: profit,
        average_margin,
    }
}

pub fn status_distribution(shipments: &[ShipmentSnapshot]) -> Vec<StatusCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for shipment in shipments {
        *counts.entry(shipment.status.as_str()).or_default() += 1;
    }

    let mut out: Vec<StatusCount> = counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
    out
}

/// Realized revenue/profit per calendar month, oldest first, for the
/// `months` months ending with the month of `today`. Shipments without a
/// scheduled delivery date are left out.
pub fn revenue_profit_trends(
    shipments: &[ShipmentSnapshot],
    today: Date,
    months: u8,
) -> Vec<MonthlyTrend> {
    let mut buckets: Vec<(i32, Month)> = Vec::with_capacity(months as usize);
    let (mut year, mut month) = (today.year(), today.month());
    for _ in 0..months {
        buckets.push((year, month));
        if month == Month::January {
            year -= 1;
        }
        month = month.previous();
    }
    buckets.reverse();

    buckets
        .into_iter()
        .map(|(year, month)| {
            let (revenue, profit) = shipments
                .iter()
                .filter(|s| is_realized(&s.status))
                .filter(|s| {
                    s.scheduled_delivery_date
                        .is_some_and(|at| at.year() == year && at.month() == month)
                })
                .fold((0.0, 0.0), |(revenue, profit), s| {
                    (revenue + revenue_of(s), profit + revenue_of(s) - cost_of(s))
                });
            MonthlyTrend {
                label: month_label(year, month),
                revenue,
                profit,
            }
        })
        .collect()
}

/// `"Mar '24"`
fn month_label(year: i32, month: Month) -> String {
    let name = month.to_string();
    format!("{} '{:02}", &name[..3], year.rem_euclid(100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};
    use time::OffsetDateTime;

    fn shipment(status: &str, rate: f64, cost: f64, delivery: Option<OffsetDateTime>) -> ShipmentSnapshot {
        ShipmentSnapshot {
            id: format!("{status}-{rate}"),
            status: status.to_string(),
            customer_rate: Some(rate),
            carrier_cost_total: Some(cost),
            scheduled_delivery_date: delivery,
            ..Default::default()
        }
    }

    #[test]
    fn kpis_only_realize_finished_shipments() {
        let shipments = vec![
            shipment("delivered", 1000.0, 800.0, None),
            shipment("paid", 2000.0, 1500.0, None),
            shipment("booked", 5000.0, 100.0, None),
        ];
        let kpis = compute_kpis(&shipments);
        assert_eq!(kpis.total_shipments, 3);
        assert_eq!(kpis.realized_revenue, 3000.0);
        assert_eq!(kpis.realized_cost, 2300.0);
        assert_eq!(kpis.gross_profit, 700.0);
        assert_eq!(kpis.average_margin, 23.33);
    }

    #[test]
    fn kpis_without_revenue_have_zero_margin() {
        let kpis = compute_kpis(&[shipment("quote", 100.0, 50.0, None)]);
        assert_eq!(kpis.realized_revenue, 0.0);
        assert_eq!(kpis.average_margin, 0.0);
    }

    #[test]
    fn distribution_orders_by_count_then_name() {
        let shipments = vec![
            shipment("paid", 1.0, 0.0, None),
            shipment("booked", 2.0, 0.0, None),
            shipment("paid", 3.0, 0.0, None),
            shipment("at_pickup", 4.0, 0.0, None),
        ];
        let counts = status_distribution(&shipments);
        let order: Vec<_> = counts.iter().map(|c| (c.status.as_str(), c.count)).collect();
        assert_eq!(order, vec![("paid", 2), ("at_pickup", 1), ("booked", 1)]);
    }

    #[test]
    fn trends_span_year_boundaries() {
        let shipments = vec![
            shipment("invoiced", 1200.0, 1000.0, Some(datetime!(2023-12-14 10:00 UTC))),
            shipment("paid", 800.0, 500.0, Some(datetime!(2024-02-01 00:00 UTC))),
            shipment("booked", 999.0, 1.0, Some(datetime!(2024-02-02 00:00 UTC))),
            shipment("paid", 400.0, 100.0, Some(datetime!(2023-06-01 00:00 UTC))),
        ];
        let trends = revenue_profit_trends(&shipments, date!(2024 - 02 - 20), 3);
        let labels: Vec<_> = trends.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Dec '23", "Jan '24", "Feb '24"]);
        assert_eq!(trends[0].revenue, 1200.0);
        assert_eq!(trends[0].profit, 200.0);
        assert_eq!(trends[1].revenue, 0.0);
        assert_eq!(trends[2].profit, 300.0);
    }
}
