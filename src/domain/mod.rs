//! Rate, lane and KPI logic for the freight TMS lives here.

pub mod charges;
pub mod entities;
pub mod financials;
pub mod lane_recorder;
pub mod lanes;
pub mod options;

#[allow(unused_imports)]
pub use charges::{
    compute_breakdown, compute_charges, ChargeBreakdown, ChargeComputationInput,
    ChargeComputationResult, ChargeDisplay, ChargeForm, ChargeFormRow, ChargeSides,
};
#[allow(unused_imports)]
pub use entities::{
    AccessorialType, CarrierRef, ChargeLineItem, DisplayAccessorial, FscType, FuelSurchargeSpec,
    LaneRateEntry, Location, ManualAccessorial, ShipmentSnapshot, ShipmentStop, SourceType,
};
#[allow(unused_imports)]
pub use financials::{
    compute_kpis, revenue_profit_trends, status_distribution, Kpis, MonthlyTrend, StatusCount,
};
#[allow(unused_imports)]
pub use lane_recorder::{
    record_from_shipment, LaneRateValidationError, ManualAccessorialDraft, ManualLaneRateDraft,
    RecordOutcome, SkipReason,
};
#[allow(unused_imports)]
pub use lanes::{
    detail_for_lane, lanes_for_carrier, summarize_lanes, LaneDetailQuery, LaneFilter, LaneKey,
    LanePage, LaneSummary, Pagination, SortField, SortSpec,
};
