//! rattrap CLI: command-line front-end for G300 profile configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rattrap_core::error::{Error, PERMISSION_HINT};
use rattrap_core::profile::{Field, ProfileId, ProfileSettings};
use rattrap_core::session::{self, Session};
use rattrap_core::store::{self, SettingsStore};
use rattrap_core::tool::{Ratslap, ResetTarget};

#[derive(Parser)]
#[command(
    name = "rattrap",
    version,
    about = "Configure Logitech G300 profiles through ratslap"
)]
struct Cli {
    /// Settings database (defaults to the user data directory).
    #[arg(long, global = true, env = store::DB_ENV_VAR)]
    db: Option<PathBuf>,

    /// ratslap executable to use instead of the stored one.
    #[arg(long, global = true)]
    tool: Option<PathBuf>,

    /// Print profiles as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remember where the ratslap executable lives.
    Locate {
        /// Path to ratslap.
        path: PathBuf,
    },
    /// Show settings of one profile, or all three, without switching profiles.
    Show {
        /// Profile: f3, f4 or f5.
        profile: Option<ProfileId>,
    },
    /// Print a profile exactly as ratslap reports it from the device.
    Print {
        /// Profile: f3, f4 or f5.
        profile: ProfileId,
    },
    /// Change a setting in the local store (use `apply` to send it).
    Set {
        /// Profile: f3, f4 or f5.
        profile: ProfileId,
        /// Field: color, rate, left, right, middle, g4..g9.
        field: Field,
        /// New value, e.g. red, 1000, "LeftCtrl + C".
        value: String,
    },
    /// Send every stored profile to the mouse.
    Apply,
    /// Restore factory settings: f3, f4, f5 or all.
    Reset {
        target: ResetTarget,
    },
    /// List accepted values for an option (colour, rate, keys, ...).
    Values {
        option: String,
    },
    /// List options ratslap advertises.
    Options,
    /// Write stored profiles to a JSON file.
    Export {
        file: PathBuf,
    },
    /// Load profiles from a JSON file into the store.
    Import {
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if let Some(Error::PermissionDenied(_)) = err.downcast_ref::<Error>() {
                eprintln!("\n{PERMISSION_HINT}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let db_path = match cli.db {
        Some(path) => path,
        None => store::default_db_path()?,
    };
    let store = SettingsStore::open(&db_path)
        .with_context(|| format!("opening settings store {}", db_path.display()))?;

    let command = match cli.command {
        Commands::Locate { path } => {
            let tool = Ratslap::open(path.clone())?;
            tool.probe()?;
            Session::new(store, tool).remember_tool_path()?;
            println!("Using ratslap at {}", path.display());
            return Ok(());
        }
        other => other,
    };

    let tool_path = match cli.tool {
        Some(path) => path,
        None => session::locate_tool(&store)?.ok_or_else(|| {
            anyhow::anyhow!("ratslap location unknown; run `rattrap locate <path>` first")
        })?,
    };
    let tool = Ratslap::open(tool_path)?;
    tool.probe().with_context(|| {
        format!(
            "make sure `{} -p f3` works in a terminal",
            tool.path().display()
        )
    })?;
    let mut session = Session::new(store, tool);

    match command {
        // Handled before the tool is opened.
        Commands::Locate { .. } => {}
        Commands::Show { profile } => {
            let ids = match profile {
                Some(id) => vec![id],
                None => ProfileId::ALL.to_vec(),
            };
            let mut profiles = Vec::with_capacity(ids.len());
            for id in ids {
                profiles.push(session.view_profile(id)?);
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            } else {
                for profile in &profiles {
                    print_profile(profile);
                }
            }
        }
        Commands::Print { profile } => {
            print!("{}", session.tool().print(profile)?);
        }
        Commands::Set {
            profile,
            field,
            value,
        } => {
            session.set_field(profile, field, &value)?;
            println!("{profile} {field} set to '{value}' (run `rattrap apply` to send it)");
        }
        Commands::Apply => {
            for (id, fields) in session.apply()? {
                if fields.is_empty() {
                    println!("{id}: already up to date");
                } else {
                    let names: Vec<&str> = fields.iter().map(|f| f.column()).collect();
                    println!("{id}: updated {}", names.join(", "));
                }
            }
        }
        Commands::Reset { target } => {
            session.reset(target)?;
            match target {
                ResetTarget::All => println!("All profiles reset to factory settings"),
                ResetTarget::One(id) => println!("{id} reset to factory settings"),
            }
            if cli.json {
                let mut profiles = Vec::new();
                for id in target.profiles() {
                    profiles.push(session.view_profile(id)?);
                }
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            }
        }
        Commands::Values { option } => {
            for value in session.tool().valid_values(&option)? {
                println!("{value}");
            }
        }
        Commands::Options => {
            for option in session.tool().options()? {
                println!("{option}");
            }
        }
        Commands::Export { file } => {
            let count = session.export_profiles(&file)?;
            println!("Exported {count} profile(s) to {}", file.display());
        }
        Commands::Import { file } => {
            let count = session.import_profiles(&file)?;
            println!("Imported {count} profile(s) from {}", file.display());
        }
    }

    Ok(())
}

fn print_profile(profile: &ProfileSettings) {
    println!("Profile {}", profile.name);
    for field in &Field::ALL[1..] {
        let label = field.label().unwrap_or(field.column());
        println!("  {label:<20} {}", profile.get(*field));
    }
}
