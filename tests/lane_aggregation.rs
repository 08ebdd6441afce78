//! Lane grouping, statistics and detail listings over lane-rate entries.

use lane_rate_scanner::domain::{
    detail_for_lane, summarize_lanes, CarrierRef, LaneDetailQuery, LaneFilter, LaneRateEntry,
    Location, SortSpec, SourceType,
};
use time::macros::datetime;
use time::OffsetDateTime;

fn entry(
    id: &str,
    origin: (&str, &str),
    destination: (&str, &str),
    cost: f64,
    rate_date: OffsetDateTime,
) -> LaneRateEntry {
    LaneRateEntry {
        id: id.to_string(),
        origin: Location::new(origin.0, origin.1),
        destination: Location::new(destination.0, destination.1),
        carrier: Some(CarrierRef::new("c-1")),
        line_haul_rate: None,
        line_haul_cost: cost,
        fsc_percentage: None,
        carrier_fsc_percentage: None,
        chassis_cost_customer: None,
        chassis_cost_carrier: None,
        manual_accessorials: Vec::new(),
        shipment_accessorials: Vec::new(),
        source_type: SourceType::ManualEntry,
        source_shipment_id: None,
        source_shipment_number: None,
        rate_date,
        rate_valid_until: None,
        mode_of_transport: "drayage-import".to_string(),
        equipment_type: None,
        notes: None,
        is_active: true,
    }
}

const LA: (&str, &str) = ("Los Angeles", "CA");
const PHX: (&str, &str) = ("Phoenix", "AZ");

#[test]
fn grouping_ignores_case_and_whitespace() {
    let entries = vec![
        entry("a", LA, PHX, 1000.0, datetime!(2024-01-01 0:00 UTC)),
        entry("b", (" los angeles ", "ca"), PHX, 1200.0, datetime!(2024-02-01 0:00 UTC)),
    ];
    let summary = summarize_lanes(&entries, &LaneFilter::default());
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].entry_count, 2);
    assert_eq!(summary[0].origin_city, "Los Angeles");
    assert_eq!(summary[0].min_line_haul_cost, Some(1000.0));
    assert_eq!(summary[0].max_line_haul_cost, Some(1200.0));
    assert_eq!(summary[0].avg_line_haul_cost, Some(1100.0));
    assert_eq!(summary[0].last_quoted_date, Some(datetime!(2024-02-01 0:00 UTC)));
}

#[test]
fn averages_skip_missing_values_but_keep_zeros() {
    let mut zero_fsc = entry("a", LA, PHX, 1000.0, datetime!(2024-01-01 0:00 UTC));
    zero_fsc.fsc_percentage = Some(0.0);
    zero_fsc.chassis_cost_carrier = Some(40.0);
    let missing_fsc = entry("b", LA, PHX, 1000.0, datetime!(2024-01-02 0:00 UTC));

    let summary = summarize_lanes(&[zero_fsc, missing_fsc], &LaneFilter::default());
    assert_eq!(summary[0].avg_fsc_percentage, Some(0.0));
    assert_eq!(summary[0].avg_chassis_cost_carrier, Some(40.0));
    assert_eq!(summary[0].min_chassis_cost_carrier, Some(40.0));

    let none_defined = summarize_lanes(
        &[entry("c", LA, PHX, 1.0, datetime!(2024-01-01 0:00 UTC))],
        &LaneFilter::default(),
    );
    assert_eq!(none_defined[0].avg_fsc_percentage, None);
}

#[test]
fn inactive_entries_never_count() {
    let mut inactive = entry("x", LA, PHX, 9999.0, datetime!(2025-01-01 0:00 UTC));
    inactive.is_active = false;
    let mut inactive_only = entry("y", ("Reno", "NV"), PHX, 5.0, datetime!(2025-01-01 0:00 UTC));
    inactive_only.is_active = false;
    let entries = vec![
        entry("a", LA, PHX, 1000.0, datetime!(2024-01-01 0:00 UTC)),
        inactive,
        inactive_only,
    ];

    let summary = summarize_lanes(&entries, &LaneFilter::default());
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].entry_count, 1);
    assert_eq!(summary[0].max_line_haul_cost, Some(1000.0));
    assert_eq!(summary[0].last_quoted_date, Some(datetime!(2024-01-01 0:00 UTC)));
}

#[test]
fn summarizing_twice_gives_the_same_answer() {
    let entries = vec![
        entry("a", LA, PHX, 1000.0, datetime!(2024-01-01 0:00 UTC)),
        entry("b", ("Austin", "TX"), ("Dallas", "TX"), 500.0, datetime!(2024-01-03 0:00 UTC)),
        entry("c", LA, ("Las Vegas", "NV"), 800.0, datetime!(2024-01-02 0:00 UTC)),
    ];
    let filter = LaneFilter::default();
    assert_eq!(summarize_lanes(&entries, &filter), summarize_lanes(&entries, &filter));
}

#[test]
fn mode_filter_is_exact() {
    let mut ftl = entry("a", LA, PHX, 1000.0, datetime!(2024-01-01 0:00 UTC));
    ftl.mode_of_transport = "truckload-ftl".to_string();
    let dray = entry("b", LA, PHX, 700.0, datetime!(2024-01-01 0:00 UTC));

    let filter = LaneFilter {
        mode_of_transport: Some("truckload-ftl".to_string()),
        ..Default::default()
    };
    let summary = summarize_lanes(&[ftl, dray], &filter);
    assert_eq!(summary[0].entry_count, 1);
    assert_eq!(summary[0].avg_line_haul_cost, Some(1000.0));
}

#[test]
fn detail_pages_newest_first() {
    let entries: Vec<_> = (1..=5)
        .map(|day| {
            entry(
                &format!("e{day}"),
                LA,
                PHX,
                1000.0 + day as f64,
                datetime!(2024-03-01 0:00 UTC) + time::Duration::days(day),
            )
        })
        .chain(std::iter::once(entry(
            "other-lane",
            LA,
            ("Tucson", "AZ"),
            1.0,
            datetime!(2024-04-01 0:00 UTC),
        )))
        .collect();

    let query = LaneDetailQuery::new("Los Angeles", "CA", "Phoenix", "AZ").page(2, 2);
    let page = detail_for_lane(&entries, &query);
    let ids: Vec<_> = page.lane_rates.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["e3", "e2"]);
    assert_eq!(page.pagination.total, 5);
    assert_eq!(page.pagination.pages, 3);

    let mut cheapest = query.clone().page(1, 10);
    cheapest.sort = SortSpec::parse("lineHaulCost");
    let page = detail_for_lane(&entries, &cheapest);
    assert_eq!(page.lane_rates[0].id, "e1");
    assert_eq!(page.pagination.pages, 1);
}
