//! Behaviour of the shared quote/shipment charge calculator.

use lane_rate_scanner::domain::{
    compute_breakdown, compute_charges, ChargeComputationInput, ChargeForm, ChargeLineItem,
    FscType, FuelSurchargeSpec,
};
use lane_rate_scanner::domain::AccessorialType;

fn with_fsc(customer_rate: f64, fsc: FuelSurchargeSpec) -> ChargeComputationInput {
    ChargeComputationInput {
        line_haul_customer_rate: customer_rate,
        line_haul_carrier_cost: 700.0,
        fsc: Some(fsc),
        ..Default::default()
    }
}

#[test]
fn untyped_fsc_amounts_never_change_the_result() {
    let baseline = compute_charges(&ChargeComputationInput {
        line_haul_customer_rate: 900.0,
        line_haul_carrier_cost: 700.0,
        ..Default::default()
    });

    for (customer, carrier) in [(0.0, 0.0), (50.0, 10.0), (1e6, -3.0), (f64::NAN, 12.0)] {
        let result = compute_charges(&with_fsc(
            900.0,
            FuelSurchargeSpec {
                fsc_type: FscType::None,
                customer_amount: customer,
                carrier_amount: carrier,
            },
        ));
        assert_eq!(result, baseline);
    }
}

#[test]
fn percentage_fsc_scales_with_line_haul() {
    let breakdown = compute_breakdown(&with_fsc(
        1000.0,
        FuelSurchargeSpec {
            fsc_type: FscType::Percentage,
            customer_amount: 10.0,
            carrier_amount: 0.0,
        },
    ));
    assert_eq!(breakdown.fuel_surcharge.customer, 100.0);
}

#[test]
fn fixed_fsc_ignores_line_haul() {
    for rate in [0.0, 1.0, 850.0, 12_345.0] {
        let breakdown = compute_breakdown(&with_fsc(
            rate,
            FuelSurchargeSpec {
                fsc_type: FscType::Fixed,
                customer_amount: 50.0,
                carrier_amount: 0.0,
            },
        ));
        assert_eq!(breakdown.fuel_surcharge.customer, 50.0);
    }
}

#[test]
fn accessorial_quantity_multiplies() {
    let result = compute_charges(&ChargeComputationInput {
        accessorials: vec![ChargeLineItem::new("Detention", 3.0, 25.0, 15.0)],
        ..Default::default()
    });
    assert_eq!(result.total_customer, 75.0);
    assert_eq!(result.total_carrier, 45.0);
    assert_eq!(result.profit, 30.0);
    assert_eq!(result.margin_percent, 40.0);
}

#[test]
fn all_zero_input_has_zero_margin() {
    let result = compute_charges(&ChargeComputationInput::default());
    assert_eq!(result.total_customer, 0.0);
    assert_eq!(result.total_carrier, 0.0);
    assert_eq!(result.profit, 0.0);
    assert_eq!(result.margin_percent, 0.0);
    assert!(!result.margin_percent.is_nan());
}

#[test]
fn catalogue_defaults_prefill_a_row() {
    let kind: AccessorialType = serde_json::from_str(
        r#"{"_id": "at-4", "name": "Chassis Split", "defaultCustomerRate": "95", "defaultCarrierCost": 70}"#,
    )
    .unwrap();
    let row = ChargeLineItem::from_accessorial_type(&kind);
    assert_eq!(row.accessorial_type_id.as_deref(), Some("at-4"));

    let result = compute_charges(&ChargeComputationInput {
        accessorials: vec![row],
        ..Default::default()
    });
    assert_eq!(result.total_customer, 95.0);
    assert_eq!(result.total_carrier, 70.0);
}

#[test]
fn quote_form_json_computes_like_the_typed_input() {
    let form: ChargeForm = serde_json::from_str(
        r#"{
            "customerRate": "2000",
            "carrierCost": "1600",
            "fscType": "percentage",
            "fscCustomerAmount": "20",
            "fscCarrierAmount": "15",
            "chassisCustomerCost": "",
            "accessorials": [{"name": "Pre-pull", "quantity": "", "customerRate": "150", "carrierCost": "100"}]
        }"#,
    )
    .unwrap();

    let result = form.compute().result;
    assert_eq!(result.total_customer, 2550.0);
    assert_eq!(result.total_carrier, 1940.0);
    assert_eq!(result.profit, 610.0);
    assert_eq!(result.display().total_customer, "$2,550.00");
}
