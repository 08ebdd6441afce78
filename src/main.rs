use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};

use lane_rate_scanner::domain::options::is_known_mode;
use lane_rate_scanner::domain::{
    compute_kpis, detail_for_lane, lanes_for_carrier, record_from_shipment, revenue_profit_trends,
    status_distribution, summarize_lanes, ChargeForm, ChargeFormRow, Kpis, LaneDetailQuery,
    LaneFilter, LaneRateEntry, ManualLaneRateDraft, MonthlyTrend, RecordOutcome, ShipmentSnapshot,
    SortSpec, StatusCount,
};
use lane_rate_scanner::infra::cache::{
    load_default_snapshot, save_default_snapshot, LaneRateSnapshot,
};
use lane_rate_scanner::infra::tms::parse_lane_rates;
use lane_rate_scanner::infra::{TmsClient, TmsClientError};
use lane_rate_scanner::util::number::format_currency;
use lane_rate_scanner::util::persistence::{
    load_settings, load_settings_from, save_settings, settings_file, Settings,
};
use lane_rate_scanner::util::logging;
use lane_rate_scanner::util::version::{version_label, APP_NAME};

#[derive(Parser)]
#[command(name = "lane_rate_scanner", version)]
#[command(about = "Quote calculator and lane-rate analytics for the TMS")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    /// Backend base URL for this run.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Totals, profit and margin for a set of charges.
    Calc(CalcArgs),
    Lanes {
        #[command(subcommand)]
        command: LanesCommand,
    },
    /// Revenue, profit and status figures over shipments.
    Kpis {
        #[command(flatten)]
        source: ShipmentSource,
        #[arg(long, default_value_t = 6)]
        months: u8,
    },
    /// Accessorial catalogue from the backend.
    Accessorials,
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Args)]
struct CalcArgs {
    #[arg(long, default_value = "")]
    customer_rate: String,
    #[arg(long, default_value = "")]
    carrier_cost: String,
    /// `fixed`, `percentage`, or empty for none.
    #[arg(long, default_value = "")]
    fsc_type: String,
    #[arg(long, default_value = "")]
    fsc_customer: String,
    #[arg(long, default_value = "")]
    fsc_carrier: String,
    #[arg(long, default_value = "")]
    chassis_customer: String,
    #[arg(long, default_value = "")]
    chassis_carrier: String,
    /// `name:qty:rate:cost`, repeatable.
    #[arg(long = "accessorial")]
    accessorials: Vec<String>,
    #[arg(long, default_value_t = false)]
    json: bool,
}

/// Where lane results come from. Without `--input` the backend answers;
/// when it is unreachable the local snapshot of lane rates from earlier
/// backend pages is used instead.
#[derive(Args)]
struct EntrySource {
    /// JSON file of lane-rate entries, computed locally.
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(Args)]
struct ShipmentSource {
    /// JSON file of shipments; fetched from the backend when omitted.
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long)]
    limit: Option<usize>,
    /// e.g. `-rateDate,lineHaulCost`
    #[arg(long, default_value = "-rateDate")]
    sort: String,
}

#[derive(Subcommand)]
enum LanesCommand {
    /// One row of statistics per lane.
    Summary {
        #[command(flatten)]
        source: EntrySource,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        equipment: Option<String>,
        #[arg(long)]
        carrier: Option<String>,
    },
    /// Individual entries of one lane.
    Detail {
        #[command(flatten)]
        source: EntrySource,
        #[arg(long)]
        origin_city: String,
        #[arg(long)]
        origin_state: String,
        #[arg(long)]
        destination_city: String,
        #[arg(long)]
        destination_state: String,
        #[arg(long)]
        origin_zip: Option<String>,
        #[arg(long)]
        destination_zip: Option<String>,
        #[arg(long)]
        carrier: Option<String>,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        equipment: Option<String>,
        #[command(flatten)]
        paging: PageArgs,
    },
    /// Entries of one carrier across all lanes.
    Carrier {
        carrier_id: String,
        #[command(flatten)]
        source: EntrySource,
        #[command(flatten)]
        paging: PageArgs,
    },
    /// Lane-rate entry a quote or shipment produces.
    Record {
        #[arg(long)]
        shipment: PathBuf,
        /// Entry previously recorded for the same shipment.
        #[arg(long)]
        existing: Option<PathBuf>,
    },
    /// Validate a manual lane-rate submission.
    Manual {
        #[arg(long)]
        draft: PathBuf,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    SetApiUrl { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    let mut settings = load_settings();
    if let Some(url) = cli.api_url.as_deref() {
        settings.api_base_url = url.to_string();
    }

    match cli.command {
        Commands::Calc(args) => run_calc(args),
        Commands::Lanes { command } => run_lanes(command, &settings).await,
        Commands::Kpis { source, months } => run_kpis(source, months, &settings).await,
        Commands::Accessorials => {
            let types = client(&settings)?.get_accessorial_types().await?;
            print_json(&types.data)
        }
        Commands::Settings { command } => run_settings(command, settings),
    }
}

fn client(settings: &Settings) -> Result<TmsClient> {
    let client = TmsClient::with_base_url(&settings.api_base_url)
        .with_context(|| format!("invalid API URL {}", settings.api_base_url))?
        .with_ttl(Duration::from_secs(settings.cache_ttl_secs));
    Ok(client)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

fn run_calc(args: CalcArgs) -> Result<()> {
    let form = ChargeForm {
        customer_rate: args.customer_rate,
        carrier_cost: args.carrier_cost,
        fsc_type: args.fsc_type,
        fsc_customer_amount: args.fsc_customer,
        fsc_carrier_amount: args.fsc_carrier,
        chassis_customer_cost: args.chassis_customer,
        chassis_carrier_cost: args.chassis_carrier,
        accessorials: args
            .accessorials
            .iter()
            .map(|raw| ChargeFormRow::parse_compact(raw))
            .collect(),
    };
    let breakdown = form.compute();

    if args.json {
        return print_json(&breakdown);
    }

    let rows = [
        ("Line haul", breakdown.line_haul),
        ("Fuel surcharge", breakdown.fuel_surcharge),
        ("Chassis", breakdown.chassis),
        ("Accessorials", breakdown.accessorials),
    ];
    println!("{:<16}{:>14}{:>14}", "", "Customer", "Carrier");
    for (label, sides) in rows {
        println!(
            "{:<16}{:>14}{:>14}",
            label,
            format_currency(sides.customer),
            format_currency(sides.carrier)
        );
    }
    let shown = breakdown.result.display();
    println!("{:<16}{:>14}{:>14}", "Total", shown.total_customer, shown.total_carrier);
    println!("Profit: {}  Margin: {}", shown.profit, shown.margin_percent);
    Ok(())
}

fn read_entries(path: &Path) -> Result<Vec<LaneRateEntry>> {
    let raw: serde_json::Value = read_json(path)?;
    Ok(parse_lane_rates(raw))
}

/// Entries kept from earlier backend pages, when the backend itself failed.
fn snapshot_entries(error: TmsClientError, settings: &Settings) -> Result<Vec<LaneRateEntry>> {
    match load_default_snapshot() {
        Some(snapshot) => {
            warn!(%error, age = %snapshot.age_string(), "backend unavailable, using snapshot");
            if snapshot.is_expired(Duration::from_secs(settings.cache_ttl_secs)) {
                warn!("snapshot is older than the cache TTL");
            }
            Ok(snapshot.entries)
        }
        None => Err(error).context("backend unavailable and no local snapshot"),
    }
}

/// Folds a backend page into the local snapshot.
fn remember(entries: &[LaneRateEntry]) {
    if entries.is_empty() {
        return;
    }
    let mut snapshot =
        load_default_snapshot().unwrap_or_else(|| LaneRateSnapshot::new(Vec::new()));
    snapshot.merge(entries);
    if let Err(error) = save_default_snapshot(&snapshot) {
        warn!(%error, "could not save lane rate snapshot");
    }
}

async fn run_lanes(command: LanesCommand, settings: &Settings) -> Result<()> {
    match command {
        LanesCommand::Summary {
            source,
            mode,
            search,
            equipment,
            carrier,
        } => {
            let filter = LaneFilter {
                mode_of_transport: mode.or_else(|| settings.default_mode_of_transport.clone()),
                search_term: search,
                equipment_type: equipment,
                carrier_id: carrier,
            };
            if let Some(mode) = filter.mode_of_transport.as_deref() {
                if !is_known_mode(mode) {
                    warn!(mode, "unknown mode of transport, filter will likely match nothing");
                }
            }
            let entries = match source.input {
                Some(path) => read_entries(&path)?,
                None => match client(settings)?.get_lane_summary(&filter).await {
                    Ok(summary) => return print_json(&summary.data),
                    Err(error) => snapshot_entries(error, settings)?,
                },
            };
            let summary = summarize_lanes(&entries, &filter);
            info!(lanes = summary.len(), entries = entries.len(), "summarized lanes");
            print_json(&summary)
        }
        LanesCommand::Detail {
            source,
            origin_city,
            origin_state,
            destination_city,
            destination_state,
            origin_zip,
            destination_zip,
            carrier,
            mode,
            equipment,
            paging,
        } => {
            let mut query =
                LaneDetailQuery::new(origin_city, origin_state, destination_city, destination_state)
                    .page(paging.page, paging.limit.unwrap_or(settings.default_page_size));
            query.origin_zip = origin_zip;
            query.destination_zip = destination_zip;
            query.carrier_id = carrier;
            query.mode_of_transport = mode;
            query.equipment_type = equipment;
            query.sort = SortSpec::parse(&paging.sort);

            let page = match source.input {
                Some(path) => detail_for_lane(&read_entries(&path)?, &query),
                None => match client(settings)?.get_lane_detail(&query).await {
                    Ok(page) => {
                        remember(&page.lane_rates);
                        page
                    }
                    Err(error) => detail_for_lane(&snapshot_entries(error, settings)?, &query),
                },
            };
            print_json(&page)
        }
        LanesCommand::Carrier {
            carrier_id,
            source,
            paging,
        } => {
            let limit = paging.limit.unwrap_or(settings.default_page_size);
            let sort = SortSpec::parse(&paging.sort);
            let page = match source.input {
                Some(path) => {
                    let entries = read_entries(&path)?;
                    lanes_for_carrier(&entries, &carrier_id, paging.page, limit, &sort)
                }
                None => match client(settings)?
                    .get_lanes_for_carrier(&carrier_id, paging.page, limit, &sort)
                    .await
                {
                    Ok(page) => {
                        remember(&page.lane_rates);
                        page
                    }
                    Err(error) => {
                        let entries = snapshot_entries(error, settings)?;
                        lanes_for_carrier(&entries, &carrier_id, paging.page, limit, &sort)
                    }
                },
            };
            print_json(&page)
        }
        LanesCommand::Record { shipment, existing } => {
            let shipment: ShipmentSnapshot = read_json(&shipment)?;
            let existing: Option<LaneRateEntry> = match existing {
                Some(path) => Some(read_json(&path)?),
                None => None,
            };
            match record_from_shipment(&shipment, existing.as_ref(), OffsetDateTime::now_utc()) {
                RecordOutcome::Skipped(reason) => {
                    info!(shipment = %shipment.id, %reason, "no lane rate recorded");
                    Ok(())
                }
                outcome => {
                    if let RecordOutcome::Updated(entry) = &outcome {
                        info!(id = %entry.id, "updated existing lane rate");
                    }
                    print_json(&outcome.entry())
                }
            }
        }
        LanesCommand::Manual { draft } => {
            let draft: ManualLaneRateDraft = read_json(&draft)?;
            let entry = draft.validate(OffsetDateTime::now_utc())?;
            print_json(&entry)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KpiReport {
    kpis: Kpis,
    status_distribution: Vec<StatusCount>,
    trends: Vec<MonthlyTrend>,
}

async fn run_kpis(source: ShipmentSource, months: u8, settings: &Settings) -> Result<()> {
    let shipments: Vec<ShipmentSnapshot> = match source.input {
        Some(path) => read_json(&path)?,
        None => client(settings)?.get_shipments().await?,
    };
    if months == 0 {
        bail!("--months must be at least 1");
    }

    let report = KpiReport {
        kpis: compute_kpis(&shipments),
        status_distribution: status_distribution(&shipments),
        trends: revenue_profit_trends(&shipments, OffsetDateTime::now_utc().date(), months),
    };
    print_json(&report)
}

fn run_settings(command: SettingsCommand, settings: Settings) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            println!("{APP_NAME} {}", version_label());
            if let Some(path) = settings_file() {
                println!("settings file: {}", path.display());
            }
            print_json(&settings)
        }
        SettingsCommand::SetApiUrl { url } => {
            url::Url::parse(&url).with_context(|| format!("invalid URL {url}"))?;
            // Start from the file so env/CLI overrides are not persisted.
            let stored = settings_file()
                .map(|path| load_settings_from(&path))
                .unwrap_or_default();
            let settings = Settings {
                api_base_url: url,
                ..stored
            };
            save_settings(&settings)?;
            info!(url = %settings.api_base_url, "saved API URL");
            Ok(())
        }
    }
}
