//! Asynchronous client for the TMS backend REST API.
//!
//! - Typed accessors for lane summaries, lane details, per-carrier lane
//!   pages, accessorial types and shipments.
//! - Keeps an in-memory cache per resource with stale fallbacks when a
//!   refresh fails.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{
    AccessorialType, CarrierRef, ChargeLineItem, LaneDetailQuery, LaneFilter, LanePage,
    LaneRateEntry, LaneSummary, Location, ManualAccessorial, Pagination, ShipmentSnapshot,
    SortSpec, SourceType,
};
use crate::util::number::lenient_f64;
use crate::util::version;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001/api/";
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);
/// Page size used when walking the shipment list.
pub const SHIPMENT_PAGE_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum TmsClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Cached,
    Stale,
}

#[derive(Clone, Debug)]
pub struct CachedPayload<T> {
    pub data: T,
    pub fetched_at: SystemTime,
    pub status: CacheStatus,
}

impl<T> CachedPayload<T> {
    fn new(data: T, fetched_at: SystemTime, status: CacheStatus) -> Self {
        Self {
            data,
            fetched_at,
            status,
        }
    }
}

#[derive(Default)]
struct TmsCache {
    accessorial_types: Option<Cached<Vec<AccessorialType>>>,
    summaries: HashMap<String, Cached<Vec<LaneSummary>>>,
}

impl TmsCache {
    fn clear(&mut self) {
        self.accessorial_types = None;
        self.summaries.clear();
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct TmsClient {
    http: Client,
    base_url: Url,
    cache: Arc<Mutex<TmsCache>>,
    ttl: Duration,
}

impl TmsClient {
    pub fn new() -> Result<Self, TmsClientError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// A missing trailing slash is added so relative paths join below the
    /// base instead of replacing its last segment.
    pub fn with_base_url(base: &str) -> Result<Self, TmsClientError> {
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base_url = Url::parse(&base)?;
        let http = Client::builder().user_agent(version::user_agent()).build()?;
        Ok(Self {
            http,
            base_url,
            cache: Arc::new(Mutex::new(TmsCache::default())),
            ttl: DEFAULT_TTL,
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Lane statistics computed by the backend for `filter`.
    pub async fn get_lane_summary(
        &self,
        filter: &LaneFilter,
    ) -> Result<CachedPayload<Vec<LaneSummary>>, TmsClientError> {
        let mut url = self.url("lanerates/summary")?;
        {
            let mut query = url.query_pairs_mut();
            let pairs = [
                ("modeOfTransport", &filter.mode_of_transport),
                ("searchTerm", &filter.search_term),
                ("equipmentType", &filter.equipment_type),
                ("carrierId", &filter.carrier_id),
            ];
            for (key, value) in pairs {
                if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                    query.append_pair(key, value);
                }
            }
        }
        let cache_key = url.query().unwrap_or_default().to_string();

        {
            let cache = self.cache.lock().await;
            if let Some(payload) = cache
                .summaries
                .get(&cache_key)
                .and_then(|entry| entry.if_fresh(self.ttl))
            {
                debug!(query = %cache_key, "serving cached lane summary");
                return Ok(payload);
            }
        }

        debug!(%url, "requesting lane summary");
        match self.fetch_data::<Vec<LaneSummary>>(self.http.get(url)).await {
            Ok(data) => {
                let fetched_at = SystemTime::now();
                self.cache
                    .lock()
                    .await
                    .summaries
                    .insert(cache_key, Cached::new(data.clone(), fetched_at));
                Ok(CachedPayload::new(data, fetched_at, CacheStatus::Fresh))
            }
            Err(error) => {
                let stale = self
                    .cache
                    .lock()
                    .await
                    .summaries
                    .get(&cache_key)
                    .map(Cached::stale);
                match stale {
                    Some(stale) => {
                        warn!(%error, "lane summary refresh failed, serving stale copy");
                        Ok(stale)
                    }
                    None => Err(error),
                }
            }
        }
    }

    /// One page of a lane's entries. Always fetched, never cached.
    pub async fn get_lane_detail(
        &self,
        query: &LaneDetailQuery,
    ) -> Result<LanePage, TmsClientError> {
        let mut url = self.url("lanerates/detail")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("originCity", &query.origin_city)
                .append_pair("originState", &query.origin_state)
                .append_pair("destinationCity", &query.destination_city)
                .append_pair("destinationState", &query.destination_state);
            let optional = [
                ("originZip", &query.origin_zip),
                ("destinationZip", &query.destination_zip),
                ("carrierId", &query.carrier_id),
                ("modeOfTransport", &query.mode_of_transport),
                ("equipmentType", &query.equipment_type),
            ];
            for (key, value) in optional {
                if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                    pairs.append_pair(key, value);
                }
            }
            pairs
                .append_pair("page", &query.page.to_string())
                .append_pair("limit", &query.limit.to_string())
                .append_pair("sort", &query.sort.to_query_value());
        }

        debug!(%url, "requesting lane detail");
        let page: LanePageDto = self.fetch_data(self.http.get(url)).await?;
        Ok(page.into())
    }

    pub async fn get_lanes_for_carrier(
        &self,
        carrier_id: &str,
        page: usize,
        limit: usize,
        sort: &SortSpec,
    ) -> Result<LanePage, TmsClientError> {
        let mut url = self.url(&format!("lanerates/carrier/{carrier_id}"))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("sort", &sort.to_query_value());

        let page: LanePageDto = self.fetch_data(self.http.get(url)).await?;
        Ok(page.into())
    }

    pub async fn get_accessorial_types(
        &self,
    ) -> Result<CachedPayload<Vec<AccessorialType>>, TmsClientError> {
        if let Some(payload) = self.cache_lookup(|c| c.accessorial_types.as_ref()).await {
            return Ok(payload);
        }

        let url = self.url("accessorial-types")?;
        match self
            .fetch_data::<Vec<AccessorialType>>(self.http.get(url))
            .await
        {
            Ok(data) => {
                let fetched_at = SystemTime::now();
                self.cache.lock().await.accessorial_types =
                    Some(Cached::new(data.clone(), fetched_at));
                Ok(CachedPayload::new(data, fetched_at, CacheStatus::Fresh))
            }
            Err(error) => {
                let stale = self
                    .cache
                    .lock()
                    .await
                    .accessorial_types
                    .as_ref()
                    .map(Cached::stale);
                stale.ok_or(error)
            }
        }
    }

    /// All shipments and quotes visible to the client, read page by page
    /// until the backend's `pagination.pages` is reached. Uncached.
    pub async fn get_shipments(&self) -> Result<Vec<ShipmentSnapshot>, TmsClientError> {
        let mut shipments = Vec::new();
        let mut page = 1usize;
        loop {
            let mut url = self.url("shipments")?;
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("limit", &SHIPMENT_PAGE_LIMIT.to_string());
            let raw: Value = self.fetch_data(self.http.get(url)).await?;
            let (items, pagination) = match raw {
                Value::Object(mut map) => {
                    let pagination = map
                        .remove("pagination")
                        .and_then(|value| serde_json::from_value::<Pagination>(value).ok());
                    (map.remove("shipments").unwrap_or(Value::Null), pagination)
                }
                other => (other, None),
            };
            shipments.extend(parse_shipments(items));

            match pagination {
                Some(pagination) if page < pagination.pages => page += 1,
                _ => break,
            }
        }
        debug!(count = shipments.len(), pages = page, "fetched shipments");
        Ok(shipments)
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    async fn cache_lookup<T, F>(&self, select: F) -> Option<CachedPayload<T>>
    where
        T: Clone,
        F: FnOnce(&TmsCache) -> Option<&Cached<T>>,
    {
        let cache = self.cache.lock().await;
        select(&cache).and_then(|entry| entry.if_fresh(self.ttl))
    }

    async fn fetch_data<T>(&self, builder: reqwest::RequestBuilder) -> Result<T, TmsClientError>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        let envelope: ApiEnvelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(error) if !status.is_success() => {
                return Err(TmsClientError::Api(format!("HTTP {status}: {error}")));
            }
            Err(error) => return Err(error.into()),
        };

        if envelope.success && status.is_success() {
            envelope
                .data
                .ok_or_else(|| TmsClientError::Api("response missing data".into()))
        } else {
            Err(TmsClientError::Api(
                envelope
                    .message
                    .unwrap_or_else(|| format!("request failed with HTTP {status}")),
            ))
        }
    }

    fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

struct Cached<T> {
    value: T,
    fetched_at: SystemTime,
}

impl<T: Clone> Cached<T> {
    fn new(value: T, fetched_at: SystemTime) -> Self {
        Self { value, fetched_at }
    }

    fn if_fresh(&self, ttl: Duration) -> Option<CachedPayload<T>> {
        if self
            .fetched_at
            .elapsed()
            .map(|elapsed| elapsed <= ttl)
            .unwrap_or(false)
        {
            Some(CachedPayload::new(
                self.value.clone(),
                self.fetched_at,
                CacheStatus::Cached,
            ))
        } else {
            None
        }
    }

    fn stale(&self) -> CachedPayload<T> {
        CachedPayload::new(self.value.clone(), self.fetched_at, CacheStatus::Stale)
    }
}

/// Reads lane rates from any of the shapes the backend answers with: a bare
/// array, `{ "laneRates": [...] }`, or either of those wrapped in `data`.
/// Rows may be flat backend documents or entries this crate wrote itself.
/// Entries that cannot be read are skipped.
pub fn parse_lane_rates(raw: Value) -> Vec<LaneRateEntry> {
    let items = match raw {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            if let Some(inner) = map.remove("data") {
                return parse_lane_rates(inner);
            }
            match map.remove("laneRates") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<LaneRateRow>(item) {
            Ok(LaneRateRow::Backend(dto)) => Some(LaneRateEntry::from(dto)),
            Ok(LaneRateRow::Entry(entry)) => Some(entry),
            Err(error) => {
                warn!(%error, "skipping malformed lane rate");
                None
            }
        })
        .collect()
}

fn parse_shipments(items: Value) -> Vec<ShipmentSnapshot> {
    match items {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<ShipmentSnapshot>(item) {
                Ok(shipment) => Some(shipment),
                Err(error) => {
                    warn!(%error, "skipping malformed shipment");
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Flat rows carry `originCity`; nested `origin` rows are entries as
/// `LaneRateEntry` serializes them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LaneRateRow {
    Backend(LaneRateDto),
    Entry(LaneRateEntry),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LanePageDto {
    #[serde(default)]
    lane_rates: Vec<Value>,
    pagination: Pagination,
}

impl From<LanePageDto> for LanePage {
    fn from(dto: LanePageDto) -> Self {
        Self {
            lane_rates: parse_lane_rates(Value::Array(dto.lane_rates)),
            pagination: dto.pagination,
        }
    }
}

/// Lane rate as stored by the backend: flat city/state columns and
/// references that may or may not be populated.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LaneRateDto {
    #[serde(alias = "_id")]
    id: String,
    origin_city: String,
    origin_state: String,
    #[serde(default)]
    origin_zip: Option<String>,
    destination_city: String,
    destination_state: String,
    #[serde(default)]
    destination_zip: Option<String>,
    #[serde(default)]
    carrier: Option<Value>,
    #[serde(default, deserialize_with = "lenient_f64")]
    line_haul_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    line_haul_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    fsc_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    carrier_fsc_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    chassis_cost_customer: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    chassis_cost_carrier: Option<f64>,
    #[serde(default)]
    manual_accessorials: Vec<ManualAccessorial>,
    #[serde(default)]
    source_type: SourceType,
    #[serde(default)]
    source_shipment_id: Option<Value>,
    #[serde(default)]
    source_quote_shipment_number: Option<String>,
    #[serde(default)]
    rate_date: Option<String>,
    #[serde(default)]
    rate_valid_until: Option<String>,
    #[serde(default)]
    mode_of_transport: String,
    #[serde(default)]
    equipment_type: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

impl From<LaneRateDto> for LaneRateEntry {
    fn from(dto: LaneRateDto) -> Self {
        let mut origin = Location::new(dto.origin_city, dto.origin_state);
        origin.zip = dto.origin_zip.filter(|zip| !zip.is_empty());
        let mut destination = Location::new(dto.destination_city, dto.destination_state);
        destination.zip = dto.destination_zip.filter(|zip| !zip.is_empty());

        let source = dto.source_shipment_id.map(SourceShipment::from_value);
        let rate_date = dto
            .rate_date
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(OffsetDateTime::now_utc);

        Self {
            id: dto.id,
            origin,
            destination,
            carrier: dto.carrier.and_then(carrier_from_value),
            line_haul_rate: dto.line_haul_rate,
            line_haul_cost: dto.line_haul_cost.unwrap_or(0.0),
            fsc_percentage: dto.fsc_percentage,
            carrier_fsc_percentage: dto.carrier_fsc_percentage,
            chassis_cost_customer: dto.chassis_cost_customer,
            chassis_cost_carrier: dto.chassis_cost_carrier,
            manual_accessorials: dto.manual_accessorials,
            shipment_accessorials: source
                .as_ref()
                .map(|s| s.accessorials.clone())
                .unwrap_or_default(),
            source_type: dto.source_type,
            source_shipment_id: source.as_ref().and_then(|s| s.id.clone()),
            source_shipment_number: dto
                .source_quote_shipment_number
                .or_else(|| source.and_then(|s| s.number)),
            rate_date,
            rate_valid_until: dto.rate_valid_until.as_deref().and_then(parse_timestamp),
            mode_of_transport: dto.mode_of_transport,
            equipment_type: dto.equipment_type.filter(|e| !e.is_empty()),
            notes: dto.notes.filter(|n| !n.is_empty()),
            is_active: dto.is_active,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok()
}

fn carrier_from_value(value: Value) -> Option<CarrierRef> {
    match value {
        Value::String(id) if !id.is_empty() => Some(CarrierRef::new(id)),
        Value::Object(map) => {
            let id = map
                .get("_id")
                .or_else(|| map.get("id"))
                .and_then(Value::as_str)?;
            let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
            Some(CarrierRef {
                id: id.to_string(),
                name: text("name"),
                mc_number: text("mcNumber"),
            })
        }
        _ => None,
    }
}

/// The source shipment reference, either a bare id or the populated
/// shipment with its accessorials.
struct SourceShipment {
    id: Option<String>,
    number: Option<String>,
    accessorials: Vec<ChargeLineItem>,
}

impl SourceShipment {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let accessorials = map
                    .get("accessorials")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().map(accessorial_from_value).collect())
                    .unwrap_or_default();
                Self {
                    id: map
                        .get("_id")
                        .or_else(|| map.get("id"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    number: map
                        .get("shipmentNumber")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    accessorials,
                }
            }
            Value::String(id) => Self {
                id: Some(id),
                number: None,
                accessorials: Vec::new(),
            },
            _ => Self {
                id: None,
                number: None,
                accessorials: Vec::new(),
            },
        }
    }
}

/// Populated accessorial type names win over the row's own name.
fn accessorial_from_value(value: &Value) -> ChargeLineItem {
    let number = |key: &str| {
        value.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => crate::util::number::parse_number(s),
            _ => None,
        })
    };
    let type_ref = value.get("accessorialTypeId");
    let type_name = type_ref
        .and_then(|t| t.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let type_id = type_ref.and_then(|t| match t {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("_id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    });
    let own_name = value.get("name").and_then(Value::as_str).map(str::to_string);

    ChargeLineItem {
        name: type_name.or(own_name).unwrap_or_default(),
        accessorial_type_id: type_id,
        quantity: number("quantity").unwrap_or(1.0),
        customer_rate: number("customerRate").unwrap_or(0.0),
        carrier_cost: number("carrierCost").unwrap_or(0.0),
        notes: value.get("notes").and_then(Value::as_str).map(str::to_string),
    }
}
