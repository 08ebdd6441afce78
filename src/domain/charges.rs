//! Customer/carrier totals, profit and margin for a quote or shipment.
//!
//! One implementation serves the quote form, the shipment form and the
//! quick calculator. It never fails: unusable numbers count as zero.

use serde::{Deserialize, Serialize};

use super::entities::{ChargeLineItem, FscType, FuelSurchargeSpec};
use crate::util::number::{format_currency, format_percent, or_zero, parse_number_or_zero};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeComputationInput {
    pub line_haul_customer_rate: f64,
    pub line_haul_carrier_cost: f64,
    #[serde(default)]
    pub fsc: Option<FuelSurchargeSpec>,
    #[serde(default)]
    pub chassis_customer_cost: f64,
    #[serde(default)]
    pub chassis_carrier_cost: f64,
    #[serde(default)]
    pub accessorials: Vec<ChargeLineItem>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeComputationResult {
    pub total_customer: f64,
    pub total_carrier: f64,
    pub profit: f64,
    pub margin_percent: f64,
}

/// Currency/percentage strings for showing a result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeDisplay {
    pub total_customer: String,
    pub total_carrier: String,
    pub profit: String,
    pub margin_percent: String,
}

impl ChargeComputationResult {
    pub fn display(&self) -> ChargeDisplay {
        ChargeDisplay {
            total_customer: format_currency(self.total_customer),
            total_carrier: format_currency(self.total_carrier),
            profit: format_currency(self.profit),
            margin_percent: format_percent(self.margin_percent),
        }
    }

    pub fn is_profitable(&self) -> bool {
        self.profit >= 0.0
    }
}

/// A customer/carrier pair of amounts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargeSides {
    pub customer: f64,
    pub carrier: f64,
}

/// Every component of the totals, as the quote form lists them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeBreakdown {
    pub line_haul: ChargeSides,
    pub fuel_surcharge: ChargeSides,
    pub chassis: ChargeSides,
    pub accessorials: ChargeSides,
    pub result: ChargeComputationResult,
}

pub fn compute_charges(input: &ChargeComputationInput) -> ChargeComputationResult {
    compute_breakdown(input).result
}

pub fn compute_breakdown(input: &ChargeComputationInput) -> ChargeBreakdown {
    let line_haul = ChargeSides {
        customer: or_zero(input.line_haul_customer_rate),
        carrier: or_zero(input.line_haul_carrier_cost),
    };
    let fuel_surcharge = input
        .fsc
        .as_ref()
        .map(|fsc| fuel_surcharge(fsc, &line_haul))
        .unwrap_or_default();
    let chassis = ChargeSides {
        customer: or_zero(input.chassis_customer_cost),
        carrier: or_zero(input.chassis_carrier_cost),
    };
    let accessorials = input
        .accessorials
        .iter()
        .fold(ChargeSides::default(), |sum, item| ChargeSides {
            customer: sum.customer + item.customer_total(),
            carrier: sum.carrier + item.carrier_total(),
        });

    let total_customer =
        line_haul.customer + fuel_surcharge.customer + chassis.customer + accessorials.customer;
    let total_carrier =
        line_haul.carrier + fuel_surcharge.carrier + chassis.carrier + accessorials.carrier;
    let profit = total_customer - total_carrier;
    let margin_percent = if total_customer > 0.0 {
        (profit / total_customer) * 100.0
    } else {
        0.0
    };

    ChargeBreakdown {
        line_haul,
        fuel_surcharge,
        chassis,
        accessorials,
        result: ChargeComputationResult {
            total_customer,
            total_carrier,
            profit,
            margin_percent,
        },
    }
}

/// FSC in dollars. Without a type the amounts are ignored entirely.
fn fuel_surcharge(fsc: &FuelSurchargeSpec, line_haul: &ChargeSides) -> ChargeSides {
    let customer_amount = or_zero(fsc.customer_amount);
    let carrier_amount = or_zero(fsc.carrier_amount);
    match fsc.fsc_type {
        FscType::Percentage => ChargeSides {
            customer: line_haul.customer * (customer_amount / 100.0),
            carrier: line_haul.carrier * (carrier_amount / 100.0),
        },
        FscType::Fixed => ChargeSides {
            customer: customer_amount,
            carrier: carrier_amount,
        },
        FscType::None => ChargeSides::default(),
    }
}

/// Accessorial row as typed into a form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChargeFormRow {
    pub name: String,
    pub quantity: String,
    pub customer_rate: String,
    pub carrier_cost: String,
}

impl ChargeFormRow {
    /// Parses `name:qty:rate:cost`; missing trailing parts are blank.
    pub fn parse_compact(raw: &str) -> Self {
        let mut parts = raw.splitn(4, ':').map(str::trim);
        Self {
            name: parts.next().unwrap_or_default().to_string(),
            quantity: parts.next().unwrap_or_default().to_string(),
            customer_rate: parts.next().unwrap_or_default().to_string(),
            carrier_cost: parts.next().unwrap_or_default().to_string(),
        }
    }

    fn to_line_item(&self) -> ChargeLineItem {
        ChargeLineItem::new(
            self.name.trim(),
            parse_number_or_zero(&self.quantity),
            parse_number_or_zero(&self.customer_rate),
            parse_number_or_zero(&self.carrier_cost),
        )
    }
}

/// String-typed rate fields of the quote form, shipment form or quick
/// calculator. Conversion coerces every field, so it cannot fail.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChargeForm {
    pub customer_rate: String,
    pub carrier_cost: String,
    pub fsc_type: String,
    pub fsc_customer_amount: String,
    pub fsc_carrier_amount: String,
    pub chassis_customer_cost: String,
    pub chassis_carrier_cost: String,
    pub accessorials: Vec<ChargeFormRow>,
}

impl ChargeForm {
    pub fn to_input(&self) -> ChargeComputationInput {
        let fsc_type = FscType::parse(&self.fsc_type);
        let fsc = (fsc_type != FscType::None).then(|| FuelSurchargeSpec {
            fsc_type,
            customer_amount: parse_number_or_zero(&self.fsc_customer_amount),
            carrier_amount: parse_number_or_zero(&self.fsc_carrier_amount),
        });

        ChargeComputationInput {
            line_haul_customer_rate: parse_number_or_zero(&self.customer_rate),
            line_haul_carrier_cost: parse_number_or_zero(&self.carrier_cost),
            fsc,
            chassis_customer_cost: parse_number_or_zero(&self.chassis_customer_cost),
            chassis_carrier_cost: parse_number_or_zero(&self.chassis_carrier_cost),
            accessorials: self.accessorials.iter().map(ChargeFormRow::to_line_item).collect(),
        }
    }

    pub fn compute(&self) -> ChargeBreakdown {
        compute_breakdown(&self.to_input())
    }
}
