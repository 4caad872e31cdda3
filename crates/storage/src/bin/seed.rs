use std::fmt;

use practice_core::model::{ItemDraft, ItemId, SubjectId};
use storage::repository::Storage;
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DB_URL: &str = "sqlite:practice.sqlite3";

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    first_id: u64,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidFirstId { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidFirstId { raw } => write!(f, "invalid --first-id value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("PRACTICE_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into());
        let mut first_id = 1;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--first-id" => {
                    let value = require_value(&mut args, "--first-id")?;
                    first_id = value
                        .parse::<u64>()
                        .map_err(|_| ArgsError::InvalidFirstId { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, first_id })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: {DEFAULT_DB_URL})");
    eprintln!("  --first-id <id>           ID assigned to the first sample item (default: 1)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PRACTICE_DB_URL           same as --db");
    eprintln!("  RUST_LOG                  log filter (default: info)");
    eprintln!("  PRACTICE_LOG_FORMAT=json  structured log output");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("PRACTICE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(log_fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(log_fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

const PHYSICS: SubjectId = SubjectId::new(1);
const CHEMISTRY: SubjectId = SubjectId::new(2);

fn sample_items() -> Vec<ItemDraft> {
    let physics = [
        (
            "Kinematics",
            0.6,
            "A particle moves as s = t^3 - 6t^2 + 3t + 4 m. Its velocity when the acceleration is zero is:",
            ["-9 m/s", "3 m/s", "-12 m/s", "42 m/s"],
        ),
        (
            "Thermodynamics",
            0.7,
            "In an adiabatic process of a monoatomic gas, P is proportional to V^(-c). The value of c is:",
            ["5/3", "3/5", "2/5", "7/5"],
        ),
        (
            "Optics",
            0.5,
            "Light strikes a surface at 60 degrees and the reflected and refracted rays are perpendicular. The refractive index is:",
            ["1.732", "1.5", "1.414", "1.33"],
        ),
        (
            "Optics",
            0.2,
            "The image formed by a plane mirror is:",
            ["Virtual and erect", "Real and inverted", "Real and erect", "Virtual and inverted"],
        ),
        (
            "Modern Physics",
            0.4,
            "Accelerated through V volts, an electron has a de Broglie wavelength of about:",
            ["12.27 / sqrt(V) angstrom", "1.227 / V nm", "h / mV", "12.27 V angstrom"],
        ),
    ];
    let chemistry = [
        (
            "Chemical Bonding",
            0.6,
            "Which of the following molecules has a T-shaped geometry?",
            ["ClF3", "PCl5", "NH3", "BF3"],
        ),
        (
            "Organic Chemistry",
            0.3,
            "Alkyl halide with sodium in dry ether giving higher alkanes is the:",
            ["Wurtz reaction", "Friedel-Crafts reaction", "Kolbe electrolysis", "Reimer-Tiemann reaction"],
        ),
        (
            "Atomic Structure",
            0.5,
            "Which set of quantum numbers is NOT possible?",
            ["n=3, l=2, m=-3", "n=4, l=0, m=0", "n=3, l=2, m=-2", "n=5, l=3, m=0"],
        ),
        (
            "Coordination Compounds",
            0.6,
            "Coordination number and oxidation state of Co in [Co(en)3]3+ are:",
            ["6 and +3", "3 and +3", "6 and +2", "4 and +3"],
        ),
    ];

    let tag = |subject: SubjectId| {
        move |(topic, difficulty, content, options): (&str, f64, &str, [&str; 4])| {
            ItemDraft::multiple_choice(topic, difficulty, content, &options).with_subject(subject)
        }
    };

    physics
        .into_iter()
        .map(tag(PHYSICS))
        .chain(chemistry.into_iter().map(tag(CHEMISTRY)))
        .collect()
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    let drafts = sample_items();
    let count = drafts.len();
    for (offset, draft) in (0_u64..).zip(drafts) {
        let item = draft.validate(ItemId::new(args.first_id + offset))?;
        storage.items.upsert_item(&item).await?;
        tracing::debug!(item_id = %item.id(), topic = %item.topic(), "seeded item");
    }

    tracing::info!(count, db_url = %args.db_url, "seeded sample item bank");
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        tracing::error!(error = %err, "seeding failed");
        std::process::exit(2);
    }
}
