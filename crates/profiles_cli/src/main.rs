//! Command-line driver for the profile core.
//!
//! # Responsibility
//! - Load `AppConfig`, initialize logging and open the profile database.
//! - Expose list/get/create/update/delete/count over `ProfileService`.
//! - Print results as JSON on stdout; errors go to stderr with a status code.

use clap::{Args, Parser, Subcommand};
use profiles_core::config::ENV_DB_PATH;
use profiles_core::db::open_db_with_options;
use profiles_core::{
    enrich_draft, init_logging, AgeComparison, AppConfig, DeletionRequest, Enrichment,
    FilterCriteria, LogHandle, ProfileDraft, ProfileService, ProfileStore, RequestContext,
    ServiceError, SqliteProfileStore, StaticEnricher, UpdateCriteria,
};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_INVALID: u8 = 2;
const EXIT_CONFLICT: u8 = 3;

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(name = "profiles")]
struct Cli {
    /// Database file; overrides `PROFILES_DB_PATH`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List profiles matching optional filters.
    List(ListArgs),
    /// Show one profile.
    Get { guid: String },
    /// Create a profile from names plus enrichment attributes.
    Create(CreateArgs),
    /// Patch the given fields of one profile.
    Update(UpdateArgs),
    /// Delete one profile.
    Delete { guid: String },
    /// Print the number of stored profiles.
    Count,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Get { .. } => "get",
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Delete { .. } => "delete",
            Self::Count => "count",
        }
    }
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    surname: Option<String>,
    #[arg(long)]
    patronymic: Option<String>,
    #[arg(long)]
    age: Option<u32>,
    /// Match ages greater than `--age` instead of less.
    #[arg(long)]
    older: bool,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    nationality: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 10)]
    page_size: u32,
}

/// Enrichment attributes are given explicitly; no lookup service is called.
#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    surname: String,
    #[arg(long)]
    patronymic: Option<String>,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    nationality: Option<String>,
}

#[derive(Args)]
struct UpdateArgs {
    guid: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    surname: Option<String>,
    #[arg(long)]
    patronymic: Option<String>,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    nationality: Option<String>,
}

#[derive(Serialize)]
struct GuidOutput<'a> {
    guid: &'a str,
}

#[derive(Serialize)]
struct CountOutput {
    count: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_code_for(err.as_ref()))
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let db_override = cli.db.map(|path| path.to_string_lossy().into_owned());
    let config = AppConfig::from_lookup(|key| {
        if key == ENV_DB_PATH && db_override.is_some() {
            return db_override.clone();
        }
        std::env::var(key).ok()
    })?;
    init_logging(config.log_level, config.log_dir.as_deref())?;

    let mut conn = open_db_with_options(&config.db_path, config.db_options())?;
    let store = SqliteProfileStore::new(&mut conn, LogHandle::new("store"));
    let mut service = ProfileService::new(store, LogHandle::new("service"));
    let ctx = match config.request_timeout {
        Some(timeout) => RequestContext::with_timeout(timeout),
        None => RequestContext::background(),
    };

    let log = LogHandle::new("cli");
    log.info("cli_command", "start", format_args!("command={}", cli.command.name()));
    execute(&mut service, &ctx, cli.command)
}

fn execute<S: ProfileStore>(
    service: &mut ProfileService<S>,
    ctx: &RequestContext,
    command: Commands,
) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::List(args) => {
            let mut criteria = FilterCriteria::page(args.page, args.page_size);
            criteria.name = args.name;
            criteria.surname = args.surname;
            criteria.patronymic = args.patronymic;
            criteria.age = args.age;
            criteria.age_comparison = AgeComparison::from_greater_flag(args.older);
            criteria.gender = args.gender;
            criteria.nationality = args.nationality;
            print_json(&service.list_profiles(ctx, &criteria)?)
        }
        Commands::Get { guid } => print_json(&service.get_profile(ctx, &guid)?),
        Commands::Create(args) => {
            let enricher = StaticEnricher::new(Enrichment {
                age: args.age,
                gender: args.gender,
                nationality: args.nationality,
            });
            let mut draft = ProfileDraft::new(args.name, args.surname);
            draft.patronymic = args.patronymic;
            draft.validate()?;
            let profile = enrich_draft(&enricher, draft)?;
            let guid = service.create_profile(ctx, profile)?;
            print_json(&GuidOutput { guid: &guid })
        }
        Commands::Update(args) => {
            let criteria = UpdateCriteria {
                guid: args.guid,
                name: args.name,
                surname: args.surname,
                patronymic: args.patronymic,
                age: args.age,
                gender: args.gender,
                nationality: args.nationality,
            };
            let guid = service.update_profile(ctx, &criteria)?;
            print_json(&GuidOutput { guid: &guid })
        }
        Commands::Delete { guid } => {
            let guid = service.delete_profile(ctx, &DeletionRequest::new(guid))?;
            print_json(&GuidOutput { guid: &guid })
        }
        Commands::Count => print_json(&CountOutput {
            count: service.count_profiles(ctx)?,
        }),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code_for(err: &(dyn Error + 'static)) -> u8 {
    match err.downcast_ref::<ServiceError>() {
        Some(ServiceError::InvalidRequest(_)) => EXIT_INVALID,
        Some(service_err) if service_err.is_conflict() => EXIT_CONFLICT,
        _ if err.is::<profiles_core::ProfileValidationError>() => EXIT_INVALID,
        _ => 1,
    }
}
