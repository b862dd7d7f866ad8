use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use fleet_core::drafts::{
    AdminCredential, DocumentDraft, MaintenanceDraft, VehicleDraft, WriteRequest,
};
use fleet_core::feed::{group_by_plate, upcoming};
use fleet_core::logs::{Damage, DamageRecord, Expense, ExpenseRecord, total_expense};
use fleet_core::odometer::last_known_odometer;
use fleet_core::reminders::{SentReminder, plan_reminders};
use fleet_core::rollup::{filter_vehicles, summarize_fleet};
use fleet_core::schema::Vehicle;
use fleet_core::{FleetConfig, classify, parse_date};
use obsidian::vault::format_days_label;
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "fleet")]
#[command(about = "Fleet document expiry tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunContext {
    /// Reference date (YYYY-MM-DD); defaults to the local date
    #[arg(long)]
    today: Option<String>,
    /// Directory holding dashboard.toml / doc_types.yaml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single expiry date
    Status {
        /// Expiry date (YYYY-MM-DD)
        valid_to: String,
        #[command(flatten)]
        ctx: RunContext,
    },
    /// Per-vehicle rollup of a /api/vehicles snapshot ("-" for stdin)
    Vehicles {
        snapshot: PathBuf,
        /// Keep vehicles whose plate, make or model contains this text
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        ctx: RunContext,
    },
    /// Documents expiring within the window, grouped by plate
    Upcoming {
        snapshot: PathBuf,
        /// Window in days (1-365); defaults to the configured window
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        ctx: RunContext,
    },
    /// Last known odometer per vehicle, from maintenance notes
    Odometer {
        snapshot: PathBuf,
        #[command(flatten)]
        ctx: RunContext,
    },
    /// Expiry reminders due today
    Reminders {
        snapshot: PathBuf,
        /// JSON list of already sent {document_id, threshold_days} pairs
        #[arg(long)]
        sent: Option<PathBuf>,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        ctx: RunContext,
    },
    /// Damage log from a /api/damages snapshot ("-" for stdin)
    Damages {
        snapshot: PathBuf,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        ctx: RunContext,
    },
    /// Expense log and total from a /api/expenses snapshot ("-" for stdin)
    Expenses {
        snapshot: PathBuf,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        ctx: RunContext,
    },
    /// Markdown vault export
    Vault {
        #[command(subcommand)]
        command: VaultCommands,
    },
    /// Build normalized write payloads for the fleet API
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Export canonical JSON Schemas to the ./schemas directory
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
}

#[derive(Subcommand)]
enum VaultCommands {
    /// Write vehicle notes and indexes into a vault directory
    Build {
        snapshot: PathBuf,
        #[arg(long, default_value = "vault")]
        out: PathBuf,
        #[command(flatten)]
        ctx: RunContext,
    },
}

#[derive(Args)]
struct Credential {
    /// Admin credential forwarded to the API
    #[arg(long, env = "FLEET_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: String,
}

#[derive(Subcommand)]
enum DraftCommands {
    Vehicle {
        #[arg(long)]
        plate: String,
        #[arg(long)]
        make: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        email: Option<String>,
        #[command(flatten)]
        credential: Credential,
    },
    Document {
        #[arg(long)]
        vehicle_id: i64,
        #[arg(long)]
        doc_type: String,
        #[arg(long)]
        valid_from: Option<String>,
        #[arg(long)]
        valid_to: String,
        #[arg(long)]
        note: Option<String>,
        #[command(flatten)]
        credential: Credential,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    Maintenance {
        #[arg(long)]
        vehicle_id: i64,
        #[arg(long, default_value = "service_oil")]
        kind: String,
        /// Service date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        #[arg(long)]
        km: Option<u64>,
        #[arg(long)]
        remark: Option<String>,
        #[command(flatten)]
        credential: Credential,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for the wire types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status { valid_to, ctx } => status(&valid_to, &ctx),
        Commands::Vehicles {
            snapshot,
            search,
            json,
            ctx,
        } => vehicles(&snapshot, search.as_deref(), json, &ctx),
        Commands::Upcoming {
            snapshot,
            days,
            json,
            ctx,
        } => upcoming_feed(&snapshot, days, json, &ctx),
        Commands::Odometer { snapshot, ctx } => odometer(&snapshot, &ctx),
        Commands::Reminders {
            snapshot,
            sent,
            json,
            ctx,
        } => reminders(&snapshot, sent.as_deref(), json, &ctx),
        Commands::Damages {
            snapshot,
            json,
            ctx,
        } => damages(&snapshot, json, &ctx),
        Commands::Expenses {
            snapshot,
            json,
            ctx,
        } => expenses(&snapshot, json, &ctx),
        Commands::Vault { command } => match command {
            VaultCommands::Build { snapshot, out, ctx } => vault_build(&snapshot, &out, &ctx),
        },
        Commands::Draft { command } => draft(command),
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        },
    }
}

impl RunContext {
    fn today(&self) -> Result<Date> {
        match &self.today {
            Some(raw) => parse_date(raw).ok_or_else(|| anyhow!("invalid --today date: {raw}")),
            None => Ok(OffsetDateTime::now_local()
                .unwrap_or_else(|_| OffsetDateTime::now_utc())
                .date()),
        }
    }

    fn config(&self) -> Result<FleetConfig> {
        load_config(self.config.as_deref())
    }
}

fn load_config(dir: Option<&Path>) -> Result<FleetConfig> {
    match dir {
        Some(dir) => FleetConfig::load_from_dir(dir),
        None => Ok(FleetConfig::default()),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    List(Vec<Vehicle>),
    Wrapped { vehicles: Vec<Vehicle> },
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn load_snapshot(path: &Path) -> Result<Vec<Vehicle>> {
    let raw = read_input(path)?;
    let vehicles = parse_snapshot(&raw)
        .with_context(|| format!("parsing vehicle snapshot {}", path.display()))?;
    debug!("loaded {} vehicles from {}", vehicles.len(), path.display());
    Ok(vehicles)
}

fn parse_snapshot(raw: &str) -> Result<Vec<Vehicle>> {
    let snapshot: Snapshot = serde_json::from_str(raw)?;
    Ok(match snapshot {
        Snapshot::List(vehicles) => vehicles,
        Snapshot::Wrapped { vehicles } => vehicles,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status(valid_to: &str, ctx: &RunContext) -> Result<()> {
    let today = ctx.today()?;
    let config = ctx.config()?;
    let classification = classify(parse_date(valid_to), today, &config.thresholds);
    println!(
        "{} ({})",
        classification.status,
        format_days_label(classification.days_left)
    );
    Ok(())
}

fn vehicles(snapshot: &Path, search: Option<&str>, json: bool, ctx: &RunContext) -> Result<()> {
    let today = ctx.today()?;
    let config = ctx.config()?;
    let mut fleet = load_snapshot(snapshot)?;
    if let Some(term) = search {
        fleet = filter_vehicles(&fleet, term).into_iter().cloned().collect();
        debug!("{} vehicles match {term:?}", fleet.len());
    }
    let summaries = summarize_fleet(&fleet, today, &config.thresholds, &config.doc_types);

    if json {
        return print_json(&summaries);
    }
    println!(
        "{:<14} {:>5} {:<10} {:<12} {}",
        "PLATE", "DOCS", "STATUS", "NEXT DUE", "DAYS"
    );
    for s in &summaries {
        println!(
            "{:<14} {:>5} {:<10} {:<12} {}",
            s.plate,
            s.document_count,
            s.next_status.map(|st| st.as_str()).unwrap_or("-"),
            s.next_valid_to.as_deref().unwrap_or("-"),
            format_days_label(s.days_left)
        );
    }
    Ok(())
}

fn upcoming_feed(snapshot: &Path, days: Option<i64>, json: bool, ctx: &RunContext) -> Result<()> {
    let today = ctx.today()?;
    let config = ctx.config()?;
    let fleet = load_snapshot(snapshot)?;
    let window = days.unwrap_or(config.feed.window_days);
    let feed = upcoming(&fleet, today, window, &config.thresholds, &config.doc_types);

    if json {
        return print_json(&feed);
    }
    let groups = group_by_plate(&feed);
    if groups.is_empty() {
        println!("No documents expire in the next {window} days.");
    }
    for group in groups {
        println!("{} [{}]", group.plate, group.worst_status);
        for doc in &group.documents {
            println!(
                "  {:<20} {:<12} {:<10} {}",
                doc.doc_label,
                doc.valid_to,
                doc.status,
                format_days_label(Some(doc.days_left))
            );
        }
    }
    Ok(())
}

fn odometer(snapshot: &Path, ctx: &RunContext) -> Result<()> {
    let config = ctx.config()?;
    let mut fleet = load_snapshot(snapshot)?;
    fleet.sort_by(|a, b| a.plate.cmp(&b.plate));
    for vehicle in &fleet {
        match last_known_odometer(&vehicle.documents, &config.doc_types) {
            Some(km) => println!("{:<14} {km} km", vehicle.plate),
            None => println!("{:<14} -", vehicle.plate),
        }
    }
    Ok(())
}

fn reminders(snapshot: &Path, sent: Option<&Path>, json: bool, ctx: &RunContext) -> Result<()> {
    let today = ctx.today()?;
    let config = ctx.config()?;
    let fleet = load_snapshot(snapshot)?;
    let already_sent: Vec<SentReminder> = match sent {
        Some(path) => {
            let raw =
                fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Vec::new(),
    };

    if config.reminders.days.is_empty() {
        info!("no reminder days configured");
    }
    let due = plan_reminders(
        &fleet,
        today,
        &config.reminders.days,
        &already_sent,
        &config.thresholds,
        &config.doc_types,
    );

    if json {
        return print_json(&due);
    }
    if due.is_empty() {
        println!("No reminders due on {today}.");
    }
    for reminder in &due {
        println!("{} -> {}", reminder.subject(), reminder.recipient);
    }
    Ok(())
}

fn damages(snapshot: &Path, json: bool, ctx: &RunContext) -> Result<()> {
    let today = ctx.today()?;
    let raw = read_input(snapshot)?;
    let records: Vec<DamageRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing damage log {}", snapshot.display()))?;
    let mut log: Vec<Damage> = records
        .into_iter()
        .map(|record| record.into_damage(today))
        .collect();
    log.sort_by(|a, b| b.occurred_on.cmp(&a.occurred_on).then(a.id.cmp(&b.id)));

    if json {
        return print_json(&log);
    }
    if log.is_empty() {
        println!("No damage records.");
    }
    for damage in &log {
        println!(
            "{:<12} {:<14} {:<6} {}",
            damage.occurred_on,
            damage.plate,
            damage.severity.as_str(),
            damage.title
        );
    }
    Ok(())
}

fn expenses(snapshot: &Path, json: bool, ctx: &RunContext) -> Result<()> {
    let today = ctx.today()?;
    let raw = read_input(snapshot)?;
    let records: Vec<ExpenseRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing expense log {}", snapshot.display()))?;
    let mut log: Vec<Expense> = records
        .into_iter()
        .map(|record| record.into_expense(today))
        .collect();
    log.sort_by(|a, b| b.expense_date.cmp(&a.expense_date).then(a.id.cmp(&b.id)));
    let total = total_expense(&log);

    if json {
        return print_json(&serde_json::json!({ "expenses": log, "total": total }));
    }
    for expense in &log {
        println!(
            "{:<12} {:<14} {:<12} {:>12.2}",
            expense.expense_date, expense.plate, expense.category, expense.amount
        );
    }
    println!("Total: {total:.2}");
    Ok(())
}

fn vault_build(snapshot: &Path, out: &Path, ctx: &RunContext) -> Result<()> {
    let today = ctx.today()?;
    let config = ctx.config()?;
    let fleet = load_snapshot(snapshot)?;
    let summaries = summarize_fleet(&fleet, today, &config.thresholds, &config.doc_types);
    let feed = upcoming(
        &fleet,
        today,
        config.feed.window_days,
        &config.thresholds,
        &config.doc_types,
    );
    let stats = obsidian::build_vault(&summaries, &feed, today, out)?;
    println!(
        "Wrote {} vehicle notes ({} upcoming documents) to {}",
        stats.vehicle_notes,
        stats.upcoming_documents,
        out.display()
    );
    Ok(())
}

fn draft(command: DraftCommands) -> Result<()> {
    match command {
        DraftCommands::Vehicle {
            plate,
            make,
            model,
            year,
            email,
            credential,
        } => {
            let payload = VehicleDraft {
                plate,
                make,
                model,
                year,
                responsible_email: email,
            }
            .normalize()?;
            print_json(&WriteRequest {
                payload,
                admin_password: AdminCredential::new(credential.admin_password),
            })
        }
        DraftCommands::Document {
            vehicle_id,
            doc_type,
            valid_from,
            valid_to,
            note,
            credential,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let payload = DocumentDraft {
                vehicle_id,
                doc_type,
                valid_from,
                valid_to,
                note,
            }
            .normalize(&config.doc_types)?;
            print_json(&WriteRequest {
                payload,
                admin_password: AdminCredential::new(credential.admin_password),
            })
        }
        DraftCommands::Maintenance {
            vehicle_id,
            kind,
            date,
            km,
            remark,
            credential,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let payload = MaintenanceDraft {
                vehicle_id,
                kind,
                service_date: date,
                km,
                remark,
            }
            .normalize(&config.doc_types)?;
            print_json(&WriteRequest {
                payload,
                admin_password: AdminCredential::new(credential.admin_password),
            })
        }
    }
}

fn schema_export(out_dir: PathBuf) -> Result<()> {
    fs::create_dir_all(&out_dir)?;

    let vehicle_schema = schema_for!(fleet_core::schema::Vehicle);
    fs::write(
        out_dir.join("Vehicle.schema.json"),
        serde_json::to_string_pretty(&vehicle_schema)?,
    )?;

    let summary_schema = schema_for!(fleet_core::schema::VehicleSummary);
    fs::write(
        out_dir.join("VehicleSummary.schema.json"),
        serde_json::to_string_pretty(&summary_schema)?,
    )?;

    let upcoming_schema = schema_for!(fleet_core::schema::UpcomingDocument);
    fs::write(
        out_dir.join("UpcomingDocument.schema.json"),
        serde_json::to_string_pretty(&upcoming_schema)?,
    )?;

    let reminder_schema = schema_for!(fleet_core::reminders::Reminder);
    fs::write(
        out_dir.join("Reminder.schema.json"),
        serde_json::to_string_pretty(&reminder_schema)?,
    )?;

    let vehicle_write_schema = schema_for!(WriteRequest<fleet_core::drafts::NewVehicle>);
    fs::write(
        out_dir.join("VehicleWrite.schema.json"),
        serde_json::to_string_pretty(&vehicle_write_schema)?,
    )?;

    let document_write_schema = schema_for!(WriteRequest<fleet_core::drafts::NewDocument>);
    fs::write(
        out_dir.join("DocumentWrite.schema.json"),
        serde_json::to_string_pretty(&document_write_schema)?,
    )?;

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}
