//! Turning quotes/shipments and manual submissions into lane-rate entries.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::entities::{
    CarrierRef, FscType, LaneRateEntry, Location, ManualAccessorial, ShipmentSnapshot, SourceType,
};
use super::options::is_lane_recordable;
use crate::util::number::parse_number;

/// Why a shipment did not produce a lane rate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    IneligibleStatus(String),
    MissingLocation,
    InvalidCarrierCost,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IneligibleStatus(status) => {
                write!(f, "status \"{status}\" is not eligible for rate recording")
            }
            Self::MissingLocation => write!(f, "missing origin/destination city or state"),
            Self::InvalidCarrierCost => write!(f, "carrier cost total is not a number"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecordOutcome {
    Created(LaneRateEntry),
    Updated(LaneRateEntry),
    Skipped(SkipReason),
}

impl RecordOutcome {
    pub fn entry(&self) -> Option<&LaneRateEntry> {
        match self {
            Self::Created(entry) | Self::Updated(entry) => Some(entry),
            Self::Skipped(_) => None,
        }
    }
}

/// Builds the lane-rate entry a quote or shipment contributes.
///
/// `existing` is the entry previously recorded for the same shipment, if
/// any; its id and inactive flag are kept and the outcome is `Updated`.
pub fn record_from_shipment(
    shipment: &ShipmentSnapshot,
    existing: Option<&LaneRateEntry>,
    now: OffsetDateTime,
) -> RecordOutcome {
    if !is_lane_recordable(&shipment.status) {
        return RecordOutcome::Skipped(SkipReason::IneligibleStatus(shipment.status.clone()));
    }

    let (Some((origin_city, origin_state)), Some((dest_city, dest_state))) = (
        shipment.origin.city_state(),
        shipment.destination.city_state(),
    ) else {
        return RecordOutcome::Skipped(SkipReason::MissingLocation);
    };

    let Some(line_haul_cost) = shipment.carrier_cost_total else {
        return RecordOutcome::Skipped(SkipReason::InvalidCarrierCost);
    };
    let line_haul_rate = shipment.customer_rate;

    let fsc_percentage = shipment
        .fsc_customer_amount
        .and_then(|amount| as_percentage(shipment.fsc_type, amount, line_haul_rate));
    let carrier_fsc_percentage = shipment
        .fsc_carrier_amount
        .and_then(|amount| as_percentage(shipment.fsc_type, amount, Some(line_haul_cost)));

    let notes = if shipment.status == "quote" {
        shipment.quote_notes.clone()
    } else {
        shipment.internal_notes.clone()
    }
    .filter(|notes| !notes.trim().is_empty())
    .or_else(|| existing.and_then(|entry| entry.notes.clone()));

    let mut origin = Location::new(origin_city, origin_state);
    origin.zip = non_blank(shipment.origin.zip.as_deref());
    let mut destination = Location::new(dest_city, dest_state);
    destination.zip = non_blank(shipment.destination.zip.as_deref());

    let entry = LaneRateEntry {
        id: existing
            .map(|entry| entry.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        origin,
        destination,
        carrier: shipment.carrier_id.clone().map(CarrierRef::new),
        line_haul_rate,
        line_haul_cost,
        fsc_percentage,
        carrier_fsc_percentage,
        chassis_cost_customer: shipment.chassis_customer_cost,
        chassis_cost_carrier: shipment.chassis_carrier_cost,
        manual_accessorials: Vec::new(),
        shipment_accessorials: shipment.accessorials.clone(),
        source_type: SourceType::TmsShipment,
        source_shipment_id: Some(shipment.id.clone()),
        source_shipment_number: Some(shipment.shipment_number.clone())
            .filter(|number| !number.is_empty()),
        rate_date: shipment.created_at.unwrap_or(now),
        rate_valid_until: existing.and_then(|entry| entry.rate_valid_until),
        mode_of_transport: shipment.mode_of_transport.clone(),
        equipment_type: non_blank(shipment.equipment_type.as_deref()),
        notes,
        is_active: true,
    };

    if existing.is_some() {
        RecordOutcome::Updated(entry)
    } else {
        RecordOutcome::Created(entry)
    }
}

/// Percentage FSC is stored as entered; fixed FSC is expressed relative
/// to the line haul, which must be positive.
fn as_percentage(fsc_type: FscType, amount: f64, line_haul: Option<f64>) -> Option<f64> {
    match fsc_type {
        FscType::Percentage => Some(amount),
        FscType::Fixed => line_haul
            .filter(|base| *base > 0.0)
            .map(|base| amount * 100.0 / base),
        FscType::None => None,
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LaneRateValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("line haul cost must be a number, got \"{0}\"")]
    InvalidLineHaulCost(String),
    #[error("line haul cost cannot be negative")]
    NegativeLineHaulCost,
    #[error("invalid date \"{0}\"")]
    InvalidDate(String),
}

/// Manual accessorial row as submitted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualAccessorialDraft {
    pub name: String,
    pub cost: String,
    pub notes: String,
}

/// A manual lane-rate submission, every field as typed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManualLaneRateDraft {
    pub origin_city: String,
    pub origin_state: String,
    pub origin_zip: String,
    pub destination_city: String,
    pub destination_state: String,
    pub destination_zip: String,
    pub carrier: String,
    pub line_haul_cost: String,
    pub line_haul_rate: String,
    pub fsc_percentage: String,
    pub chassis_cost_carrier: String,
    pub chassis_cost_customer: String,
    pub mode_of_transport: String,
    pub equipment_type: String,
    pub rate_date: String,
    pub rate_valid_until: String,
    pub notes: String,
    pub manual_accessorials: Vec<ManualAccessorialDraft>,
}

impl ManualLaneRateDraft {
    pub fn validate(&self, now: OffsetDateTime) -> Result<LaneRateEntry, LaneRateValidationError> {
        let required = [
            ("originCity", &self.origin_city),
            ("originState", &self.origin_state),
            ("destinationCity", &self.destination_city),
            ("destinationState", &self.destination_state),
            ("carrier", &self.carrier),
            ("lineHaulCost", &self.line_haul_cost),
            ("modeOfTransport", &self.mode_of_transport),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(LaneRateValidationError::MissingFields(missing));
        }

        let line_haul_cost = parse_number(&self.line_haul_cost)
            .ok_or_else(|| LaneRateValidationError::InvalidLineHaulCost(self.line_haul_cost.clone()))?;
        if line_haul_cost < 0.0 {
            return Err(LaneRateValidationError::NegativeLineHaulCost);
        }

        let manual_accessorials = self
            .manual_accessorials
            .iter()
            .filter(|acc| !acc.name.trim().is_empty())
            .filter_map(|acc| {
                parse_number(&acc.cost).map(|cost| ManualAccessorial {
                    name: acc.name.trim().to_string(),
                    cost,
                    notes: non_blank(Some(&acc.notes)),
                })
            })
            .collect();

        let mut origin = Location::new(self.origin_city.trim(), self.origin_state.trim());
        origin.zip = non_blank(Some(&self.origin_zip));
        let mut destination =
            Location::new(self.destination_city.trim(), self.destination_state.trim());
        destination.zip = non_blank(Some(&self.destination_zip));

        Ok(LaneRateEntry {
            id: Uuid::new_v4().to_string(),
            origin,
            destination,
            carrier: Some(CarrierRef::new(self.carrier.trim())),
            line_haul_rate: parse_number(&self.line_haul_rate),
            line_haul_cost,
            fsc_percentage: parse_number(&self.fsc_percentage),
            carrier_fsc_percentage: None,
            chassis_cost_customer: parse_number(&self.chassis_cost_customer),
            chassis_cost_carrier: parse_number(&self.chassis_cost_carrier),
            manual_accessorials,
            shipment_accessorials: Vec::new(),
            source_type: SourceType::ManualEntry,
            source_shipment_id: None,
            source_shipment_number: None,
            rate_date: parse_date(&self.rate_date)?.unwrap_or(now),
            rate_valid_until: parse_date(&self.rate_valid_until)?,
            mode_of_transport: self.mode_of_transport.trim().to_string(),
            equipment_type: non_blank(Some(&self.equipment_type)),
            notes: non_blank(Some(&self.notes)),
            is_active: true,
        })
    }
}

/// Blank means absent. Accepts RFC 3339 timestamps or plain `YYYY-MM-DD`
/// dates (midnight UTC).
fn parse_date(raw: &str) -> Result<Option<OffsetDateTime>, LaneRateValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(parsed) = OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339) {
        return Ok(Some(parsed));
    }

    let format = time::macros::format_description!("[year]-[month]-[day]");
    time::Date::parse(raw, &format)
        .map(|date| Some(date.midnight().assume_utc()))
        .map_err(|_| LaneRateValidationError::InvalidDate(raw.to_string()))
}
