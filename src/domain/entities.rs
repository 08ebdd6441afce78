use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::util::number::{lenient_f64, or_zero};

/// A city/state(/zip) endpoint of a lane.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

impl Location {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            zip: None,
        }
    }

    pub fn with_zip(mut self, zip: impl Into<String>) -> Self {
        self.zip = Some(zip.into());
        self
    }

    /// `"Los Angeles, CA"`
    pub fn label(&self) -> String {
        format!("{}, {}", self.city.trim(), self.state.trim())
    }
}

/// Reference to a carrier record. Only the id is guaranteed; name and MC
/// number are present when the backend populated the reference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mc_number: Option<String>,
}

impl CarrierRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            mc_number: None,
        }
    }
}

/// Where a lane-rate entry came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "TMS_SHIPMENT")]
    TmsShipment,
    #[default]
    #[serde(rename = "MANUAL_ENTRY")]
    ManualEntry,
    #[serde(rename = "RATE_IMPORT")]
    RateImport,
}

impl SourceType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TmsShipment => "TMS_SHIPMENT",
            Self::ManualEntry => "MANUAL_ENTRY",
            Self::RateImport => "RATE_IMPORT",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TmsShipment => "TMS Shipment",
            Self::ManualEntry => "Manual Entry",
            Self::RateImport => "Rate Import",
        }
    }
}

/// Carrier-side accessorial typed in by hand on a manual lane rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManualAccessorial {
    pub name: String,
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Accessorial shown on a lane detail row, regardless of its origin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayAccessorial {
    pub name: String,
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One billable extra on a quote or shipment.
///
/// Contribution to totals is `rate * quantity`; a zero quantity counts as 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeLineItem {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessorial_type_id: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub customer_rate: f64,
    #[serde(default)]
    pub carrier_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_quantity() -> f64 {
    1.0
}

impl ChargeLineItem {
    pub fn new(name: impl Into<String>, quantity: f64, customer_rate: f64, carrier_cost: f64) -> Self {
        Self {
            name: name.into(),
            accessorial_type_id: None,
            quantity,
            customer_rate,
            carrier_cost,
            notes: None,
        }
    }

    /// Pre-fills a row from the accessorial catalogue defaults.
    pub fn from_accessorial_type(kind: &AccessorialType) -> Self {
        Self {
            name: kind.name.clone(),
            accessorial_type_id: Some(kind.id.clone()),
            quantity: 1.0,
            customer_rate: kind.default_customer_rate.unwrap_or(0.0),
            carrier_cost: kind.default_carrier_cost.unwrap_or(0.0),
            notes: None,
        }
    }

    /// Quantity used for totals: zero or NaN counts as one unit.
    pub fn effective_quantity(&self) -> f64 {
        if self.quantity == 0.0 || self.quantity.is_nan() {
            1.0
        } else {
            self.quantity
        }
    }

    pub fn customer_total(&self) -> f64 {
        or_zero(self.customer_rate) * self.effective_quantity()
    }

    pub fn carrier_total(&self) -> f64 {
        or_zero(self.carrier_cost) * self.effective_quantity()
    }
}

/// How the fuel surcharge amounts are interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FscType {
    Fixed,
    Percentage,
    /// No type selected. FSC contributes nothing, whatever the amounts say.
    #[default]
    #[serde(rename = "", alias = "none")]
    None,
}

impl FscType {
    /// Parses a form value; anything unrecognised means no FSC.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fixed" => Self::Fixed,
            "percentage" => Self::Percentage,
            _ => Self::None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Percentage => "percentage",
            Self::None => "",
        }
    }
}

/// Fuel surcharge as entered on a quote: either flat dollars or a
/// percentage (0-100) of the respective line haul.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelSurchargeSpec {
    #[serde(default, rename = "type")]
    pub fsc_type: FscType,
    #[serde(default)]
    pub customer_amount: f64,
    #[serde(default)]
    pub carrier_amount: f64,
}

/// Catalogue entry for an accessorial service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorialType {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub default_customer_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub default_carrier_cost: Option<f64>,
    #[serde(default)]
    pub applies_to_modes: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// A historical or manual rate observed on a lane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneRateEntry {
    pub id: String,
    pub origin: Location,
    pub destination: Location,
    #[serde(default)]
    pub carrier: Option<CarrierRef>,
    /// Customer-facing line haul, when known.
    #[serde(default)]
    pub line_haul_rate: Option<f64>,
    /// Carrier line haul cost.
    pub line_haul_cost: f64,
    #[serde(default)]
    pub fsc_percentage: Option<f64>,
    #[serde(default)]
    pub carrier_fsc_percentage: Option<f64>,
    #[serde(default)]
    pub chassis_cost_customer: Option<f64>,
    #[serde(default)]
    pub chassis_cost_carrier: Option<f64>,
    #[serde(default)]
    pub manual_accessorials: Vec<ManualAccessorial>,
    /// Accessorials of the source shipment, for TMS-derived entries.
    #[serde(default)]
    pub shipment_accessorials: Vec<ChargeLineItem>,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub source_shipment_id: Option<String>,
    #[serde(default)]
    pub source_shipment_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub rate_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub rate_valid_until: Option<OffsetDateTime>,
    pub mode_of_transport: String,
    #[serde(default)]
    pub equipment_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl LaneRateEntry {
    pub fn carrier_id(&self) -> Option<&str> {
        self.carrier.as_ref().map(|carrier| carrier.id.as_str())
    }

    /// Accessorials to show next to this entry in a lane detail listing.
    pub fn display_accessorials(&self) -> Vec<DisplayAccessorial> {
        match self.source_type {
            SourceType::ManualEntry => self
                .manual_accessorials
                .iter()
                .map(|acc| DisplayAccessorial {
                    name: acc.name.clone(),
                    cost: acc.cost,
                    notes: acc.notes.clone(),
                })
                .collect(),
            SourceType::TmsShipment => self
                .shipment_accessorials
                .iter()
                .map(|acc| DisplayAccessorial {
                    name: if acc.name.trim().is_empty() {
                        "Unknown Accessorial".to_string()
                    } else {
                        acc.name.clone()
                    },
                    cost: acc.carrier_total(),
                    notes: acc.notes.clone(),
                })
                .collect(),
            SourceType::RateImport => Vec::new(),
        }
    }
}

/// Pickup or delivery stop of a shipment; every field may be blank on quotes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentStop {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

impl ShipmentStop {
    pub fn city_state(&self) -> Option<(&str, &str)> {
        let city = self.city.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
        let state = self.state.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((city, state))
    }
}

/// The parts of a quote or shipment record that rate logic reads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentSnapshot {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub shipment_number: String,
    pub status: String,
    #[serde(default)]
    pub origin: ShipmentStop,
    #[serde(default)]
    pub destination: ShipmentStop,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub customer_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carrier_cost_total: Option<f64>,
    #[serde(default)]
    pub fsc_type: FscType,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fsc_customer_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fsc_carrier_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub chassis_customer_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub chassis_carrier_cost: Option<f64>,
    #[serde(default)]
    pub accessorials: Vec<ChargeLineItem>,
    #[serde(default, rename = "carrier", deserialize_with = "reference_id")]
    pub carrier_id: Option<String>,
    #[serde(default)]
    pub mode_of_transport: String,
    #[serde(default)]
    pub equipment_type: Option<String>,
    #[serde(default)]
    pub quote_notes: Option<String>,
    #[serde(default)]
    pub internal_notes: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_delivery_date: Option<OffsetDateTime>,
}

/// Accepts either a bare id string or a populated object carrying `_id`/`id`.
pub fn reference_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(id)) if !id.trim().is_empty() => Some(id),
        Some(serde_json::Value::Object(map)) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(|id| id.as_str())
            .map(str::to_string),
        _ => None,
    })
}
