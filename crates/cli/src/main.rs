use clap::{Parser, Subcommand};
use cohort_core::config::{
    data_dir_from_env_value, export_dir_from_env_value, initial_row_count_from_env_value,
};
use cohort_core::{
    CoreConfig, FileStore, FormField, JsonExporter, MockRowSource, Session, StatisticsSummary,
    TimestampId, WorkspaceRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cohort")]
#[command(about = "Research cohort workspaces over patient-encounter data")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved workspaces
    List,
    /// Create a workspace
    Create(CreateArgs),
    /// Load a workspace from the mock source and print its filtered view
    Show {
        /// Workspace id
        id: String,
        /// Number of filtered rows to print
        #[arg(long, default_value_t = 10)]
        rows: usize,
        /// Seed for reproducible mock data
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Delete a workspace
    Delete {
        /// Workspace id
        id: String,
    },
    /// Load a workspace and export its filtered view as JSON
    Export {
        /// Workspace id
        id: String,
        /// Seed for reproducible mock data
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(clap::Args)]
struct CreateArgs {
    /// Workspace name
    #[arg(long)]
    name: Option<String>,
    /// Age range, e.g. 18-65
    #[arg(long)]
    age_range: Option<String>,
    /// Gender, or "All"
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    start_year: Option<String>,
    #[arg(long)]
    end_year: Option<String>,
    /// Diagnosis substring, matched case-insensitively
    #[arg(long)]
    condition: Option<String>,
    /// icd10, icd9, snomed, ...
    #[arg(long)]
    condition_code_type: Option<String>,
    /// Comma-separated condition codes
    #[arg(long)]
    condition_codes: Option<String>,
    #[arg(long)]
    treatment: Option<String>,
    /// ndc, rxnorm, hcpcs, ...
    #[arg(long)]
    treatment_code_type: Option<String>,
    /// Comma-separated treatment codes
    #[arg(long)]
    treatment_codes: Option<String>,
}

impl CreateArgs {
    fn fields(self) -> Vec<(FormField, Option<String>)> {
        vec![
            (FormField::WorkspaceName, self.name),
            (FormField::AgeRanges, self.age_range),
            (FormField::Gender, self.gender),
            (FormField::StartYear, self.start_year),
            (FormField::EndYear, self.end_year),
            (FormField::NamedCondition, self.condition),
            (FormField::ConditionCodeType, self.condition_code_type),
            (FormField::ConditionCodes, self.condition_codes),
            (FormField::NamedTreatment, self.treatment),
            (FormField::TreatmentCodeType, self.treatment_code_type),
            (FormField::TreatmentCodes, self.treatment_codes),
        ]
    }
}

/// Resolve configuration once at startup.
fn load_config() -> anyhow::Result<CoreConfig> {
    let data_dir = data_dir_from_env_value(std::env::var("COHORT_DATA_DIR").ok());
    let export_dir = export_dir_from_env_value(std::env::var("COHORT_EXPORT_DIR").ok(), &data_dir);
    let initial_rows = initial_row_count_from_env_value(std::env::var("COHORT_INITIAL_ROWS").ok())?;
    Ok(CoreConfig::new(data_dir, export_dir, initial_rows)?)
}

/// Print and clear any notices the session raised.
fn report(session: &mut Session<FileStore>) -> bool {
    let notices = session.take_notices();
    for notice in &notices {
        eprintln!("{}", notice);
    }
    notices.is_empty()
}

/// Activate `id` and fill the Record Store from the mock source.
async fn open_workspace(
    session: &mut Session<FileStore>,
    id: &str,
    seed: Option<u64>,
) -> anyhow::Result<bool> {
    let id: TimestampId = id.parse()?;
    let Some(request) = session.select_workspace(&id) else {
        return Ok(report(session));
    };

    let source = match seed {
        Some(seed) => MockRowSource::seeded(seed),
        None => MockRowSource::new(),
    };
    session.ingest(&source, request).await;
    Ok(report(session))
}

fn print_summary(summary: &StatisticsSummary) {
    println!("Total records: {}", summary.total_records);
    println!(
        "Age: min {}, max {}, avg {}",
        summary.age_stats.min, summary.age_stats.max, summary.age_stats.avg
    );
    println!("Avg BMI: {}", summary.avg_bmi);
    println!("Avg BP: {}", summary.blood_pressure());

    let shares: Vec<String> = summary
        .gender_shares()
        .iter()
        .map(|(gender, pct)| format!("{} {}%", gender, pct))
        .collect();
    println!("Gender: {}", shares.join(", "));

    println!("Top conditions:");
    for (condition, count) in summary.top_conditions(5) {
        println!("  {:<28} {}", condition, count);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("cohort=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cfg = load_config()?;
    let repository = WorkspaceRepository::open(FileStore::new(cfg.data_dir()));
    let mut session = Session::new(repository, &cfg);
    tracing::debug!("using data directory {}", cfg.data_dir().display());

    match cli.command {
        Some(Commands::List) => {
            let workspaces = session.list_workspaces();
            if workspaces.is_empty() {
                println!("No workspaces found.");
            } else {
                for ws in workspaces {
                    println!(
                        "ID: {}, Name: {}, Filters: {}, Created: {}",
                        ws.id,
                        ws.name,
                        ws.filters.summary_line(),
                        ws.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        Some(Commands::Create(args)) => {
            session.begin_create();
            for (field, value) in args.fields() {
                if let Some(value) = value {
                    session.set_form_field(field, value);
                }
            }
            if session.submit_form().is_some() {
                if let Some(ws) = session.active_workspace() {
                    println!("Created workspace with ID: {}", ws.id);
                }
            }
            report(&mut session);
        }
        Some(Commands::Show { id, rows, seed }) => {
            if open_workspace(&mut session, &id, seed).await? {
                match session.summary() {
                    Some(summary) => print_summary(summary),
                    None => println!("No records match this workspace's filters."),
                }
                for row in session.filtered_rows().iter().take(rows) {
                    println!(
                        "{} {} {:>3} {:<6} {:<24} {:<12} {} BMI {}",
                        row.id,
                        row.mrn,
                        row.age,
                        row.gender,
                        row.diagnosis,
                        row.treatment,
                        row.encounter_date,
                        row.bmi
                    );
                }
            }
        }
        Some(Commands::Delete { id }) => {
            let id: TimestampId = id.parse()?;
            if session.delete_workspace(&id) {
                println!("Deleted workspace {}", id);
            }
            report(&mut session);
        }
        Some(Commands::Export { id, seed }) => {
            if open_workspace(&mut session, &id, seed).await? {
                let exporter = JsonExporter::new(cfg.export_dir());
                let today = chrono::Local::now().date_naive();
                if let Some(path) = session.export(&exporter, today) {
                    println!("Exported to {}", path.display());
                }
                report(&mut session);
            }
        }
        None => {
            println!("No command given. Run with --help for usage.");
        }
    }

    Ok(())
}
