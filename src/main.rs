use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use release_pipeline::cli::{self, PackageArgs, PublishArgs, Session, SessionArgs};
use release_pipeline::publish::{ChannelRequest, PublishResult};
use release_pipeline::ui;

/// Environment variable holding the log filter, e.g. `release_pipeline=debug`
const LOG_ENV: &str = "RELEASE_PIPELINE_LOG";

#[derive(Parser)]
#[command(
    name = "release-pipeline",
    version,
    about = "Derive versions from git history, build matrix artifacts and publish them"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, global = true, default_value = ".", help = "Repository directory")]
    repo: PathBuf,

    #[arg(short, long, global = true, help = "Log debug details to stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the version derived from the repository history
    DeriveVersion,

    /// Print the resolved build matrix
    ResolveMatrix {
        #[arg(long, value_enum, default_value_t = MatrixFormat::Text)]
        format: MatrixFormat,
    },

    /// Build artifacts for every matrix cell
    Package {
        #[arg(long, help = "Rebuild even when artifacts already exist")]
        force: bool,

        #[arg(long, help = "Build only the cell with this slug")]
        cell: Option<String>,
    },

    /// Upload built artifacts to the distribution index
    Publish {
        #[arg(long, value_enum, default_value_t = Channel::Auto)]
        channel: Channel,

        #[arg(short, long, help = "Skip confirmation prompt")]
        yes: bool,

        #[arg(long, help = "Continue an interrupted publish of the same version")]
        resume: bool,
    },

    /// Exit 0 if the derived version is a prerelease, 1 if not, 2 on error
    IsPrerelease,

    /// Print the changelog section of a version
    ExtractReleaseNotes {
        #[arg(long, help = "Version to look up (default: derived base version)")]
        version: Option<String>,
    },

    /// Derive, package and publish in one go
    Release {
        #[arg(long, help = "Rebuild even when artifacts already exist")]
        force: bool,

        #[arg(long, value_enum, default_value_t = Channel::Auto)]
        channel: Channel,

        #[arg(short, long, help = "Skip confirmation prompt")]
        yes: bool,

        #[arg(long, help = "Continue an interrupted publish of the same version")]
        resume: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MatrixFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Channel {
    /// Stable for releases, the prerelease channel otherwise
    Auto,
    /// Stable only; prerelease versions are refused
    Stable,
}

impl From<Channel> for ChannelRequest {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Auto => ChannelRequest::Auto,
            Channel::Stable => ChannelRequest::Stable,
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("release_pipeline=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let session_args = SessionArgs {
        config_path: args.config,
        repo: args.repo,
    };

    let session = match Session::open(&session_args) {
        Ok(session) => session,
        Err(e) => {
            let code = match args.command {
                Command::IsPrerelease => cli::EXIT_UNDECIDED,
                _ => cli::EXIT_FAILURE,
            };
            ui::display_error(&e);
            std::process::exit(code);
        }
    };

    let code = run(&session, args.command);
    std::process::exit(code);
}

fn run(session: &Session, command: Command) -> i32 {
    let outcome = match command {
        Command::DeriveVersion => cli::derive_version(session).map(|version| {
            println!("{}", version);
        }),

        Command::ResolveMatrix { format } => cli::resolve_matrix(session).and_then(|cells| {
            let rendered = match format {
                MatrixFormat::Text => ui::format_cells_text(&cells),
                MatrixFormat::Json => ui::format_cells_json(&cells)?,
            };
            if !rendered.is_empty() {
                println!("{}", rendered);
            }
            Ok(())
        }),

        Command::Package { force, cell } => {
            cli::package(session, &PackageArgs { force, cell }).map(|(version, outcomes)| {
                let artifacts: Vec<_> = outcomes.into_iter().flat_map(|o| o.artifacts).collect();
                ui::display_success(&format!(
                    "Built {} artifact(s) for {}",
                    artifacts.len(),
                    version
                ));
                if !artifacts.is_empty() {
                    println!("{}", ui::format_artifacts(&artifacts));
                }
            })
        }

        Command::Publish {
            channel,
            yes,
            resume,
        } => {
            let args = PublishArgs {
                channel: channel.into(),
                yes,
                resume,
            };
            cli::publish(session, &args).map(show_publish)
        }

        Command::IsPrerelease => {
            let answer = cli::check_prerelease(session);
            if let Err(e) = &answer {
                ui::display_error(e);
            }
            return cli::prerelease_exit_code(&answer);
        }

        Command::ExtractReleaseNotes { version } => {
            cli::release_notes(session, version.as_deref()).map(|notes| println!("{}", notes))
        }

        Command::Release {
            force,
            channel,
            yes,
            resume,
        } => {
            let package_args = PackageArgs { force, cell: None };
            let publish_args = PublishArgs {
                channel: channel.into(),
                yes,
                resume,
            };
            cli::release(session, &package_args, &publish_args).map(show_publish)
        }
    };

    match outcome {
        Ok(()) => cli::EXIT_OK,
        Err(e) => cli::report(&e),
    }
}

fn show_publish(result: Option<PublishResult>) {
    match result {
        Some(result) => {
            ui::display_publish_result(&result);
            println!("{}", result.channel);
        }
        None => ui::display_status("Publish cancelled."),
    }
}
