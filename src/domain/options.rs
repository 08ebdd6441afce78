//! Allowed values for the enumerations shared across quotes, shipments and
//! lane rates. Every caller reads them from here.

/// `(value, label)` pairs for mode of transport.
pub const MODES_OF_TRANSPORT: &[(&str, &str)] = &[
    ("truckload-ftl", "Truckload (FTL)"),
    ("truckload-ltl", "Truckload (LTL)"),
    ("drayage-import", "Drayage Import"),
    ("drayage-export", "Drayage Export"),
    ("intermodal-rail", "Intermodal Rail"),
    ("ocean-fcl", "Ocean FCL"),
    ("ocean-lcl", "Ocean LCL"),
    ("air-freight", "Air Freight"),
    ("expedited-ground", "Expedited Ground"),
    ("final-mile", "Final Mile"),
    ("other", "Other"),
];

pub const QUOTE_STATUSES: &[&str] = &[
    "quote",
    "quote_sent",
    "waiting",
    "approved",
    "rejected",
    "expired",
];

pub const SHIPMENT_STATUSES: &[&str] = &[
    "booked",
    "dispatched",
    "at_pickup",
    "picked_up",
    "in_transit",
    "at_delivery",
    "delivered",
    "pod_received",
    "invoiced",
    "paid",
    "cancelled",
    "on_hold",
    "problem",
];

/// Statuses whose quote/shipment data is recorded as a lane rate.
pub const LANE_RECORDABLE_STATUSES: &[&str] = &["quote", "booked", "delivered", "invoiced", "paid"];

/// Statuses that count towards realized revenue.
pub const REALIZED_STATUSES: &[&str] = &["delivered", "invoiced", "paid"];

pub const FSC_TYPES: &[(&str, &str)] = &[("", "None"), ("fixed", "Fixed"), ("percentage", "%")];

pub const DEFAULT_PAGE_SIZE: usize = 25;

pub fn is_known_mode(mode: &str) -> bool {
    MODES_OF_TRANSPORT.iter().any(|(value, _)| *value == mode)
}

pub fn mode_label(mode: &str) -> &str {
    MODES_OF_TRANSPORT
        .iter()
        .find(|(value, _)| *value == mode)
        .map(|(_, label)| *label)
        .unwrap_or(mode)
}

pub fn is_lane_recordable(status: &str) -> bool {
    LANE_RECORDABLE_STATUSES.contains(&status)
}

pub fn is_realized(status: &str) -> bool {
    REALIZED_STATUSES.contains(&status)
}
