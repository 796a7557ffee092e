use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use courier_dispatch::{
    engine::{DispatchEngine, DispatchReport},
    orchestrator::unit::{ComputationUnit, UnitStatus},
    params::{DispatchParams, Threads},
    problem::route_candidate::RouteCandidate,
    providers::depth_policy::SubsetBudgetPolicy,
};
use courier_geo::{
    cache::{FileMatricesCache, MatricesCache},
    travel_matrix_client::TravelMatrixClient,
};
use jiff::Timestamp;
use serde::Serialize;
use tracing::{info, warn};

use crate::{dataset::Dataset, file_utils::read_datasets, parsers};

#[derive(Args)]
pub struct DispatchArgs {
    /// A dataset file, or a folder of datasets
    #[arg(short, long)]
    dataset: PathBuf,

    /// JSON file with the dispatch parameters
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Overrides the dataset's reference time (RFC 3339 or "now")
    #[arg(long, value_parser = parsers::parse_timestamp)]
    as_of: Option<Timestamp>,

    /// Timeout of each search and extension phase (e.g., "30s", "PT1M")
    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<jiff::SignedDuration>,

    /// Computation units processed concurrently
    #[arg(long)]
    unit_threads: Option<usize>,

    /// Subsets one search may enumerate
    #[arg(long)]
    budget: Option<u64>,

    /// Output folder for the candidates, one JSON file per dataset
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct UnitOutput<'a> {
    shop_id: u64,
    vehicle_type: u32,
    vehicle_id: u64,
    error: Option<String>,
    candidates: &'a [RouteCandidate],
}

impl<'a> From<&'a ComputationUnit> for UnitOutput<'a> {
    fn from(unit: &'a ComputationUnit) -> Self {
        UnitOutput {
            shop_id: unit.shop_id().get(),
            vehicle_type: unit.vehicle_type().get(),
            vehicle_id: unit.courier().vehicle_id().get(),
            error: unit.status().error().map(ToString::to_string),
            candidates: unit.candidates(),
        }
    }
}

pub fn run(args: DispatchArgs) -> Result<(), anyhow::Error> {
    let params = load_params(&args)?;
    let policy = args
        .budget
        .map(SubsetBudgetPolicy::new)
        .unwrap_or_default();

    let paths = if args.dataset.is_file() {
        vec![args.dataset.clone()]
    } else {
        read_datasets(&args.dataset)?
    };

    if let Some(output) = &args.output {
        std::fs::create_dir_all(output)
            .with_context(|| format!("Cannot create output folder {}", output.display()))?;
    }

    for path in paths {
        info!("Dispatching dataset {:?}", path);
        let dataset = Dataset::from_file(&path)?;

        let report = match FileMatricesCache::from_env() {
            Ok(cache) => {
                info!("Caching matrices in {:?}", cache.folder());
                dispatch_dataset(&dataset, &args, &params, &policy, TravelMatrixClient::new(cache))?
            }
            Err(_) => dispatch_dataset(
                &dataset,
                &args,
                &params,
                &policy,
                TravelMatrixClient::default(),
            )?,
        };

        println!("{}", summary_table(&report));

        if let Some(output) = &args.output {
            write_candidates(&report, output, &path)?;
        }
    }

    Ok(())
}

fn load_params(args: &DispatchArgs) -> Result<DispatchParams, anyhow::Error> {
    let mut params = match &args.params {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Cannot open parameters {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("Invalid parameters {}", path.display()))?
        }
        None => DispatchParams::default(),
    };

    if let Some(timeout) = args.timeout {
        params.search.timeout = Some(timeout);
        params.extension.timeout = Some(timeout);
    }

    if let Some(unit_threads) = args.unit_threads {
        params.unit_threads = match unit_threads {
            0 => Threads::Auto,
            1 => Threads::Single,
            n => Threads::Multi(n),
        };
    }

    Ok(params)
}

fn dispatch_dataset<C>(
    dataset: &Dataset,
    args: &DispatchArgs,
    params: &DispatchParams,
    policy: &SubsetBudgetPolicy,
    client: TravelMatrixClient<C>,
) -> Result<DispatchReport, anyhow::Error>
where
    C: MatricesCache + Send + Sync,
{
    let orders = dataset.order_store()?;
    let couriers = dataset.courier_store()?;
    let geo = dataset.geo_provider(client);

    let engine = DispatchEngine::new(params.clone(), &orders, &couriers, &geo, policy)?;
    let report = engine.dispatch(&dataset.shops(), args.as_of.unwrap_or(dataset.as_of))?;

    for unit in report.failed_units() {
        if let UnitStatus::Failed(err) = unit.status() {
            warn!(shop = %unit.shop_id(), vehicle_type = %unit.vehicle_type(), "{err}");
        }
    }

    Ok(report)
}

fn summary_table(report: &DispatchReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Shop",
        "Vehicle type",
        "Courier",
        "Orders",
        "Status",
        "Candidates",
        "Longest",
        "Cheapest",
    ]);

    for unit in report.units() {
        let status = match unit.status() {
            UnitStatus::Pending => "pending".to_owned(),
            UnitStatus::Done => "done".to_owned(),
            UnitStatus::Failed(err) => format!("failed ({})", err.root_cause()),
        };
        let longest = unit.candidates().iter().map(RouteCandidate::len).max();
        let cheapest = unit
            .candidates()
            .iter()
            .map(RouteCandidate::cost)
            .min_by(f64::total_cmp);

        table.add_row(vec![
            unit.shop_id().to_string(),
            unit.vehicle_type().to_string(),
            unit.courier().vehicle_id().to_string(),
            unit.orders().len().to_string(),
            status,
            unit.candidates().len().to_string(),
            longest.map_or_else(|| "-".to_owned(), |len| len.to_string()),
            cheapest.map_or_else(|| "-".to_owned(), |cost| format!("{cost:.2}")),
        ]);
    }

    table
}

fn write_candidates(
    report: &DispatchReport,
    output: &Path,
    dataset_path: &Path,
) -> Result<(), anyhow::Error> {
    let file_name = dataset_path
        .file_stem()
        .map(|stem| format!("{}.candidates.json", stem.to_string_lossy()))
        .unwrap_or_else(|| "candidates.json".to_owned());
    let path = output.join(file_name);

    let units = report.units().iter().map(UnitOutput::from).collect::<Vec<_>>();
    let writer = BufWriter::new(
        File::create(&path).with_context(|| format!("Cannot create {}", path.display()))?,
    );
    serde_json::to_writer_pretty(writer, &units)?;

    info!("Wrote {} candidates to {:?}", report.total_candidates(), path);

    Ok(())
}
