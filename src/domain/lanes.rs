//! Lane grouping, statistics and paged lane listings over lane-rate entries.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::entities::LaneRateEntry;
use super::options::DEFAULT_PAGE_SIZE;
use crate::util::number::round2;

/// Narrowing applied before grouping. Blank strings mean "no filter".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaneFilter {
    /// Exact match on the entry's mode.
    pub mode_of_transport: Option<String>,
    /// Case-insensitive substring over origin/destination city and state,
    /// mode and equipment type.
    pub search_term: Option<String>,
    /// Case-insensitive substring on equipment type.
    pub equipment_type: Option<String>,
    /// Exact carrier id.
    pub carrier_id: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl LaneFilter {
    pub fn matches(&self, entry: &LaneRateEntry) -> bool {
        if !entry.is_active {
            return false;
        }
        if let Some(mode) = non_blank(&self.mode_of_transport) {
            if entry.mode_of_transport != mode {
                return false;
            }
        }
        if let Some(equipment) = non_blank(&self.equipment_type) {
            let needle = equipment.trim().to_lowercase();
            let hit = entry
                .equipment_type
                .as_deref()
                .map(|value| contains_ci(value, &needle))
                .unwrap_or(false);
            if !hit {
                return false;
            }
        }
        if let Some(carrier) = non_blank(&self.carrier_id) {
            if entry.carrier_id() != Some(carrier) {
                return false;
            }
        }
        if let Some(term) = non_blank(&self.search_term) {
            let needle = term.trim().to_lowercase();
            let fields = [
                Some(entry.origin.city.as_str()),
                Some(entry.origin.state.as_str()),
                Some(entry.destination.city.as_str()),
                Some(entry.destination.state.as_str()),
                Some(entry.mode_of_transport.as_str()),
                entry.equipment_type.as_deref(),
            ];
            if !fields.into_iter().flatten().any(|field| contains_ci(field, &needle)) {
                return false;
            }
        }
        true
    }
}

/// Grouping key: trimmed, lower-cased city and state of both ends.
///
/// Field order gives the output order of summaries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneKey {
    pub origin_state: String,
    pub origin_city: String,
    pub destination_state: String,
    pub destination_city: String,
}

impl LaneKey {
    pub fn of(entry: &LaneRateEntry) -> Self {
        Self {
            origin_state: normalize(&entry.origin.state),
            origin_city: normalize(&entry.origin.city),
            destination_state: normalize(&entry.destination.state),
            destination_city: normalize(&entry.destination.city),
        }
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Statistics for one lane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneSummary {
    pub origin_city: String,
    pub origin_state: String,
    pub destination_city: String,
    pub destination_state: String,
    pub entry_count: usize,
    pub min_line_haul_cost: Option<f64>,
    pub max_line_haul_cost: Option<f64>,
    pub avg_line_haul_cost: Option<f64>,
    pub avg_fsc_percentage: Option<f64>,
    pub min_chassis_cost_carrier: Option<f64>,
    pub max_chassis_cost_carrier: Option<f64>,
    pub avg_chassis_cost_carrier: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_quoted_date: Option<OffsetDateTime>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Stats {
    min: Option<f64>,
    max: Option<f64>,
    avg: Option<f64>,
}

fn stats(values: impl Iterator<Item = f64>) -> Stats {
    let (count, sum, min, max) = values.fold(
        (0_usize, 0.0, f64::INFINITY, f64::NEG_INFINITY),
        |(count, sum, min, max), value| (count + 1, sum + value, min.min(value), max.max(value)),
    );
    if count == 0 {
        return Stats::default();
    }
    Stats {
        min: Some(min),
        max: Some(max),
        avg: Some(round2(sum / count as f64)),
    }
}

/// Groups active, filter-matching entries into lanes and summarizes each.
///
/// Lanes come back ordered by origin state, origin city, destination
/// state, destination city (case-insensitive). The displayed city/state
/// of a lane is the trimmed spelling of its first entry.
pub fn summarize_lanes(entries: &[LaneRateEntry], filter: &LaneFilter) -> Vec<LaneSummary> {
    let mut index: HashMap<LaneKey, usize> = HashMap::new();
    let mut groups: Vec<(LaneKey, Vec<&LaneRateEntry>)> = Vec::new();

    for entry in entries.iter().filter(|entry| filter.matches(entry)) {
        let key = LaneKey::of(entry);
        match index.get(&key) {
            Some(&slot) => groups[slot].1.push(entry),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![entry]));
            }
        }
    }

    groups.sort_by(|a, b| a.0.cmp(&b.0));
    groups
        .into_iter()
        .map(|(_, group)| summarize_group(&group))
        .collect()
}

fn summarize_group(group: &[&LaneRateEntry]) -> LaneSummary {
    let first = group[0];
    let line_haul = stats(group.iter().map(|entry| entry.line_haul_cost));
    let fsc = stats(group.iter().filter_map(|entry| entry.fsc_percentage));
    let chassis = stats(group.iter().filter_map(|entry| entry.chassis_cost_carrier));

    LaneSummary {
        origin_city: first.origin.city.trim().to_string(),
        origin_state: first.origin.state.trim().to_string(),
        destination_city: first.destination.city.trim().to_string(),
        destination_state: first.destination.state.trim().to_string(),
        entry_count: group.len(),
        min_line_haul_cost: line_haul.min,
        max_line_haul_cost: line_haul.max,
        avg_line_haul_cost: line_haul.avg,
        avg_fsc_percentage: fsc.avg,
        min_chassis_cost_carrier: chassis.min,
        max_chassis_cost_carrier: chassis.max,
        avg_chassis_cost_carrier: chassis.avg,
        last_quoted_date: group.iter().map(|entry| entry.rate_date).max(),
    }
}

/// Sortable fields of a lane listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    RateDate,
    LineHaulCost,
    LineHaulRate,
    FscPercentage,
    ChassisCostCarrier,
    ModeOfTransport,
    EquipmentType,
}

impl SortField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "rateDate" => Some(Self::RateDate),
            "lineHaulCost" => Some(Self::LineHaulCost),
            "lineHaulRate" => Some(Self::LineHaulRate),
            "fscPercentage" => Some(Self::FscPercentage),
            "chassisCostCarrier" => Some(Self::ChassisCostCarrier),
            "modeOfTransport" => Some(Self::ModeOfTransport),
            "equipmentType" => Some(Self::EquipmentType),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::RateDate => "rateDate",
            Self::LineHaulCost => "lineHaulCost",
            Self::LineHaulRate => "lineHaulRate",
            Self::FscPercentage => "fscPercentage",
            Self::ChassisCostCarrier => "chassisCostCarrier",
            Self::ModeOfTransport => "modeOfTransport",
            Self::EquipmentType => "equipmentType",
        }
    }

    fn compare(&self, a: &LaneRateEntry, b: &LaneRateEntry) -> Ordering {
        match self {
            Self::RateDate => a.rate_date.cmp(&b.rate_date),
            Self::LineHaulCost => cmp_f64(a.line_haul_cost, b.line_haul_cost),
            Self::LineHaulRate => cmp_opt_f64(a.line_haul_rate, b.line_haul_rate),
            Self::FscPercentage => cmp_opt_f64(a.fsc_percentage, b.fsc_percentage),
            Self::ChassisCostCarrier => {
                cmp_opt_f64(a.chassis_cost_carrier, b.chassis_cost_carrier)
            }
            Self::ModeOfTransport => a.mode_of_transport.cmp(&b.mode_of_transport),
            Self::EquipmentType => a.equipment_type.cmp(&b.equipment_type),
        }
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Missing values sort before present ones.
fn cmp_opt_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp_f64(a, b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Ordered list of `(field, descending)` sort keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<(SortField, bool)>,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            keys: vec![(SortField::RateDate, true)],
        }
    }
}

impl SortSpec {
    /// Parses `"-rateDate,lineHaulCost"`. Unknown fields are skipped; an
    /// empty result falls back to newest first.
    pub fn parse(raw: &str) -> Self {
        let keys: Vec<_> = raw
            .split(',')
            .map(str::trim)
            .filter_map(|part| match part.strip_prefix('-') {
                Some(name) => SortField::from_name(name.trim()).map(|field| (field, true)),
                None => SortField::from_name(part).map(|field| (field, false)),
            })
            .collect();

        if keys.is_empty() {
            Self::default()
        } else {
            Self { keys }
        }
    }

    pub fn to_query_value(&self) -> String {
        self.keys
            .iter()
            .map(|(field, descending)| {
                if *descending {
                    format!("-{}", field.name())
                } else {
                    field.name().to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Stable: entries equal on every key keep their input order.
    pub fn sort(&self, entries: &mut [&LaneRateEntry]) {
        entries.sort_by(|a, b| {
            self.keys
                .iter()
                .map(|(field, descending)| {
                    let ord = field.compare(a, b);
                    if *descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanePage {
    pub lane_rates: Vec<LaneRateEntry>,
    pub pagination: Pagination,
}

/// Selects a single lane for a detail listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneDetailQuery {
    pub origin_city: String,
    pub origin_state: String,
    pub destination_city: String,
    pub destination_state: String,
    pub origin_zip: Option<String>,
    pub destination_zip: Option<String>,
    pub carrier_id: Option<String>,
    pub mode_of_transport: Option<String>,
    pub equipment_type: Option<String>,
    /// 1-based.
    pub page: usize,
    pub limit: usize,
    pub sort: SortSpec,
}

impl LaneDetailQuery {
    pub fn new(
        origin_city: impl Into<String>,
        origin_state: impl Into<String>,
        destination_city: impl Into<String>,
        destination_state: impl Into<String>,
    ) -> Self {
        Self {
            origin_city: origin_city.into(),
            origin_state: origin_state.into(),
            destination_city: destination_city.into(),
            destination_state: destination_state.into(),
            origin_zip: None,
            destination_zip: None,
            carrier_id: None,
            mode_of_transport: None,
            equipment_type: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            sort: SortSpec::default(),
        }
    }

    pub fn page(mut self, page: usize, limit: usize) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    fn matches(&self, entry: &LaneRateEntry) -> bool {
        let exact = |value: &str, wanted: &str| value.trim() == wanted.trim();
        let zip_ok = |zip: &Option<String>, wanted: &Option<String>| match non_blank(wanted) {
            Some(wanted) => zip.as_deref().map(|z| exact(z, wanted)).unwrap_or(false),
            None => true,
        };

        entry.is_active
            && exact(&entry.origin.city, &self.origin_city)
            && exact(&entry.origin.state, &self.origin_state)
            && exact(&entry.destination.city, &self.destination_city)
            && exact(&entry.destination.state, &self.destination_state)
            && zip_ok(&entry.origin.zip, &self.origin_zip)
            && zip_ok(&entry.destination.zip, &self.destination_zip)
            && LaneFilter {
                mode_of_transport: self.mode_of_transport.clone(),
                search_term: None,
                equipment_type: self.equipment_type.clone(),
                carrier_id: self.carrier_id.clone(),
            }
            .matches(entry)
    }
}

/// Active entries of exactly one lane, sorted (newest first by default)
/// and sliced to the requested page.
pub fn detail_for_lane(entries: &[LaneRateEntry], query: &LaneDetailQuery) -> LanePage {
    let mut matched: Vec<&LaneRateEntry> =
        entries.iter().filter(|entry| query.matches(entry)).collect();
    query.sort.sort(&mut matched);
    paginate(&matched, query.page, query.limit)
}

/// Active entries of one carrier, across all lanes.
pub fn lanes_for_carrier(
    entries: &[LaneRateEntry],
    carrier_id: &str,
    page: usize,
    limit: usize,
    sort: &SortSpec,
) -> LanePage {
    let mut matched: Vec<&LaneRateEntry> = entries
        .iter()
        .filter(|entry| entry.is_active && entry.carrier_id() == Some(carrier_id))
        .collect();
    sort.sort(&mut matched);
    paginate(&matched, page, limit)
}

fn paginate(matched: &[&LaneRateEntry], page: usize, limit: usize) -> LanePage {
    let page = page.max(1);
    let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };
    let total = matched.len();

    let lane_rates = matched
        .iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .map(|entry| (*entry).clone())
        .collect();

    LanePage {
        lane_rates,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: total.div_ceil(limit),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CarrierRef, Location, SourceType};
    use time::macros::datetime;

    fn entry(id: &str, origin: (&str, &str), destination: (&str, &str), cost: f64) -> LaneRateEntry {
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
            rate_date: datetime!(2024-01-01 00:00 UTC),
            rate_valid_until: None,
            mode_of_transport: "truckload-ftl".to_string(),
            equipment_type: Some("53' Dry Van".to_string()),
            notes: None,
            is_active: true,
        }
    }

    #[test]
    fn statistics_cover_the_whole_group() {
        let entries = vec![
            entry("a", ("Dallas", "TX"), ("Denver", "CO"), 1000.0),
            entry("b", ("Dallas", "TX"), ("Denver", "CO"), 1500.0),
            entry("c", ("Dallas", "TX"), ("Denver", "CO"), 1250.0),
        ];
        let lanes = summarize_lanes(&entries, &LaneFilter::default());
        assert_eq!(lanes.len(), 1);
        assert_eq!(lanes[0].entry_count, 3);
        assert_eq!(lanes[0].min_line_haul_cost, Some(1000.0));
        assert_eq!(lanes[0].max_line_haul_cost, Some(1500.0));
        assert_eq!(lanes[0].avg_line_haul_cost, Some(1250.0));
        assert_eq!(lanes[0].avg_fsc_percentage, None);
        assert_eq!(lanes[0].avg_chassis_cost_carrier, None);
    }

    #[test]
    fn averages_are_rounded_to_cents() {
        let entries = vec![
            entry("a", ("Dallas", "TX"), ("Denver", "CO"), 100.0),
            entry("b", ("Dallas", "TX"), ("Denver", "CO"), 100.0),
            entry("c", ("Dallas", "TX"), ("Denver", "CO"), 101.0),
        ];
        let lanes = summarize_lanes(&entries, &LaneFilter::default());
        assert_eq!(lanes[0].avg_line_haul_cost, Some(100.33));
    }

    #[test]
    fn lanes_are_ordered_by_origin_state_then_city() {
        let entries = vec![
            entry("a", ("Houston", "TX"), ("Denver", "CO"), 1.0),
            entry("b", ("Reno", "NV"), ("Denver", "CO"), 1.0),
            entry("c", ("Austin", "TX"), ("Denver", "CO"), 1.0),
        ];
        let order: Vec<_> = summarize_lanes(&entries, &LaneFilter::default())
            .into_iter()
            .map(|lane| lane.origin_city)
            .collect();
        assert_eq!(order, vec!["Reno", "Austin", "Houston"]);
    }

    #[test]
    fn filters_narrow_by_mode_equipment_carrier_and_search() {
        let mut reefer = entry("a", ("Fresno", "CA"), ("Boise", "ID"), 900.0);
        reefer.equipment_type = Some("Reefer".to_string());
        reefer.carrier = Some(CarrierRef::new("c-2"));
        let mut dray = entry("b", ("Long Beach", "CA"), ("Ontario", "CA"), 450.0);
        dray.mode_of_transport = "drayage-import".to_string();
        let entries = vec![reefer, dray];

        let by_mode = LaneFilter {
            mode_of_transport: Some("drayage-import".to_string()),
            ..Default::default()
        };
        assert_eq!(summarize_lanes(&entries, &by_mode)[0].origin_city, "Long Beach");

        let by_equipment = LaneFilter {
            equipment_type: Some("reef".to_string()),
            ..Default::default()
        };
        assert_eq!(summarize_lanes(&entries, &by_equipment)[0].origin_city, "Fresno");

        let by_carrier = LaneFilter {
            carrier_id: Some("c-2".to_string()),
            ..Default::default()
        };
        assert_eq!(summarize_lanes(&entries, &by_carrier).len(), 1);

        let by_search = LaneFilter {
            search_term: Some("  ONTARIO ".to_string()),
            ..Default::default()
        };
        let found = summarize_lanes(&entries, &by_search);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].destination_city, "Ontario");

        let blank = LaneFilter {
            mode_of_transport: Some("  ".to_string()),
            search_term: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(summarize_lanes(&entries, &blank).len(), 2);
    }

    #[test]
    fn empty_input_yields_no_lanes() {
        assert!(summarize_lanes(&[], &LaneFilter::default()).is_empty());
    }

    #[test]
    fn sort_spec_parses_and_falls_back() {
        assert_eq!(SortSpec::parse(""), SortSpec::default());
        assert_eq!(SortSpec::parse("bogus"), SortSpec::default());
        let spec = SortSpec::parse("lineHaulCost, -rateDate, nope");
        assert_eq!(spec.to_query_value(), "lineHaulCost,-rateDate");
    }

    #[test]
    fn missing_optional_values_sort_first_ascending() {
        let mut with_fsc = entry("a", ("A", "AA"), ("B", "BB"), 1.0);
        with_fsc.fsc_percentage = Some(12.0);
        let without = entry("b", ("A", "AA"), ("B", "BB"), 1.0);
        let mut refs = vec![&with_fsc, &without];
        SortSpec::parse("fscPercentage").sort(&mut refs);
        assert_eq!(refs[0].id, "b");
    }

    #[test]
    fn paging_clamps_zero_page_and_limit() {
        let entries: Vec<_> = (0..30)
            .map(|i| entry(&format!("e{i}"), ("A", "AA"), ("B", "BB"), i as f64))
            .collect();
        let query = LaneDetailQuery::new("A", "AA", "B", "BB").page(0, 0);
        let page = detail_for_lane(&entries, &query);
        assert_eq!(page.pagination.page, 1);
        assert_eq!(page.pagination.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(page.pagination.pages, 2);
        assert_eq!(page.lane_rates.len(), 25);
    }

    #[test]
    fn carrier_listing_skips_other_carriers_and_inactive() {
        let mut other = entry("x", ("A", "AA"), ("B", "BB"), 1.0);
        other.carrier = Some(CarrierRef::new("c-9"));
        let mut inactive = entry("y", ("A", "AA"), ("B", "BB"), 1.0);
        inactive.is_active = false;
        let kept = entry("z", ("C", "CC"), ("D", "DD"), 1.0);
        let entries = vec![other, inactive, kept];

        let page = lanes_for_carrier(&entries, "c-1", 1, 10, &SortSpec::default());
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.lane_rates[0].id, "z");
    }
}
