use clap::{Args, Parser, Subcommand};

use crmdash::{
    AnalyticsReport, CrmDash, FacetKind, Filters, PeriodSelector, ReportRequest, Selection,
    Settings,
};

#[derive(Parser)]
#[command(name = "crmdash", about = "Manager analytics over a local CRM store")]
struct Cli {
    /// Database path (default: ~/.crmdash/crmdash.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a JSON snapshot into the store
    Import {
        /// Snapshot file ({employees, clients, tasks, orders})
        file: String,
    },
    /// Build the analytics report
    Report(ReportArgs),
    /// List the option values available for a filter
    Options {
        /// Facet key, e.g. region, productCategory, delivery-method
        facet: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show store status
    Status,
}

#[derive(Args)]
struct ReportArgs {
    /// Period: day, week, month, 7d, 30d or FROM..TO (default: config default_period)
    #[arg(long)]
    period: Option<String>,
    #[arg(long)]
    activity_type: Option<String>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    city: Option<String>,
    /// Matches clients whose category list contains this value
    #[arg(long)]
    product_category: Option<String>,
    #[arg(long)]
    client_type: Option<String>,
    /// Client status tag
    #[arg(long)]
    tag: Option<String>,
    /// Latest failed communication reason
    #[arg(long)]
    refusal_reason: Option<String>,
    #[arg(long)]
    delivery_method: Option<String>,
    #[arg(long)]
    order_status: Option<String>,
    /// Limit to a manager (repeatable)
    #[arg(long = "manager", value_name = "ID")]
    managers: Vec<String>,
    /// Employee whose report access gates the sections
    #[arg(long, value_name = "ID")]
    viewer: Option<String>,
    /// Pin the clock (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
    #[arg(long, value_name = "DATETIME")]
    as_of: Option<String>,
    /// Report on a snapshot file instead of the store
    #[arg(long, value_name = "FILE")]
    snapshot: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl ReportArgs {
    fn filters(&self) -> Filters {
        let mut filters = Filters::new();
        let facets = [
            (FacetKind::ActivityType, &self.activity_type),
            (FacetKind::Region, &self.region),
            (FacetKind::City, &self.city),
            (FacetKind::ProductCategory, &self.product_category),
            (FacetKind::ClientType, &self.client_type),
            (FacetKind::Tag, &self.tag),
            (FacetKind::RefusalReason, &self.refusal_reason),
            (FacetKind::DeliveryMethod, &self.delivery_method),
            (FacetKind::OrderStatus, &self.order_status),
        ];
        for (kind, value) in facets {
            if let Some(v) = value {
                filters.set(kind, Selection::parse(v));
            }
        }
        filters
    }

    fn request(&self) -> anyhow::Result<ReportRequest> {
        let period = self
            .period
            .as_deref()
            .map(PeriodSelector::parse)
            .transpose()?;
        let now = match &self.as_of {
            Some(s) => Some(
                crmdash::date_util::parse_instant(s)
                    .ok_or_else(|| anyhow::anyhow!("invalid --as-of value: {s}"))?,
            ),
            None => None,
        };
        Ok(ReportRequest {
            period,
            filters: self.filters(),
            managers: self.managers.clone(),
            viewer: self.viewer.clone(),
            now,
        })
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // A report over a snapshot file needs no store unless one is named.
    if let Commands::Report(args) = &cli.command {
        if let Some(path) = &args.snapshot {
            let settings = match &cli.db {
                Some(db) => CrmDash::new(crmdash::Database::open_at(db).await?).settings().await?,
                None => Settings::default(),
            };
            let report = crmdash::report_snapshot_file(path, args.request()?, &settings)?;
            print_or_json(&report, args.json)?;
            return Ok(());
        }
    }

    let db = match &cli.db {
        Some(path) => crmdash::Database::open_at(path).await?,
        None => crmdash::Database::open().await?,
    };
    let dash = CrmDash::new(db);

    match cli.command {
        Commands::Import { file } => {
            let written = dash.import_file(&file).await?;
            println!("Imported {written} records from {file}.");
        }
        Commands::Report(args) => {
            let report = dash.report(args.request()?).await?;
            print_or_json(&report, args.json)?;
        }
        Commands::Options { facet } => {
            let kind = FacetKind::parse(&facet)?;
            let options = dash.facet_options(kind).await?;
            if options.is_empty() {
                println!("No values for {}.", kind.key());
            } else {
                for value in options {
                    println!("{value}");
                }
            }
        }
        Commands::Config { action } => {
            handle_config(&dash, action).await?;
        }
        Commands::Status => {
            let counts = dash.status().await?;
            println!("Store Status");
            println!("  Employees:      {}", counts.employees);
            println!("  Clients:        {}", counts.clients);
            println!("  Communications: {}", counts.communications);
            println!("  Tasks:          {}", counts.tasks);
            println!("  Orders:         {}", counts.orders);
        }
    }

    Ok(())
}

async fn handle_config(dash: &CrmDash, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match dash.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            dash.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = dash.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

fn print_or_json(report: &AnalyticsReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_report(report);
    }
    Ok(())
}

fn print_report(report: &AnalyticsReport) {
    let range = match (report.range.from(), report.range.to()) {
        (Some(from), Some(to)) => format!("{from} .. {to}"),
        _ => "empty".to_string(),
    };
    println!("Period: {} ({range})", report.period_key);
    if !report.selected_managers.is_empty() {
        println!("Managers: {}", report.selected_managers.join(", "));
    }

    let s = &report.summary;
    println!();
    println!("Summary ({} managers)", s.manager_count);
    println!("  Clients added:  {}", s.clients_added);
    println!("  Communications: {}", s.communications);
    println!("  Orders:         {}", s.orders_count);
    println!("  Deals:          {} success, {} refused", s.deals_success, s.deals_refused);
    println!(
        "  Tasks:          {} done, {} in work{}",
        s.tasks_done,
        s.tasks_in_work,
        if s.unassigned_tasks_included {
            " (incl. unassigned)"
        } else {
            ""
        }
    );

    let charts = &report.charts;
    if let Some(rows) = &charts.tasks {
        println!();
        println!("{:<24} {:>9} {:>9}", "Tasks", "Done", "In work");
        for r in rows {
            println!("{:<24} {:>9} {:>9}", r.name, r.completed, r.in_work);
        }
    }
    if let Some(rows) = &charts.clients {
        println!();
        println!("{:<24} {:>9} {:>9}", "Clients", "Added", "Comms");
        for r in rows {
            println!("{:<24} {:>9} {:>9}", r.name, r.clients, r.communications);
        }
    }
    if let Some(rows) = &charts.orders {
        println!();
        println!("{:<24} {:>9}", "Sales", "Orders");
        for r in rows {
            println!("{:<24} {:>9}", r.name, r.orders);
        }
    }
    if let Some(rows) = &charts.refusal_reasons {
        println!();
        println!("{:<24} {:>9}", "Refusal reason", "Clients");
        for r in rows {
            println!("{:<24} {:>9}", r.reason, r.count);
        }
    }
    if let Some(rows) = &charts.efficiency {
        println!();
        println!("{:<24} {:>9} {:>9}", "Efficiency", "Calls", "Orders");
        for r in rows {
            println!("{:<24} {:>9} {:>9}", r.name, r.calls, r.orders);
        }
    }
    if let Some(rows) = &charts.comparison {
        println!();
        println!(
            "{:<24} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
            "Comparison", "Clients", "Comms", "Orders", "Won", "Lost", "Tasks"
        );
        for m in rows {
            println!(
                "{:<24} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
                m.name,
                m.clients_added,
                m.communications,
                m.orders_count,
                m.deals_success,
                m.deals_refused,
                m.tasks_done + m.tasks_in_work
            );
        }
    }
}
