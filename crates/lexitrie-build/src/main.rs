//! Command-line front end for building and inspecting dictionary tries.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use lexitrie::{load_build_config, BuildConfig, CancellationToken, LexitrieError, Result};

#[derive(Parser, Debug)]
#[clap(name = "lexitrie-build", version, about = "Builds prefix-trie dictionary indexes")]
struct Cli {
    #[clap(flatten)]
    paths: PathArgs,

    #[clap(subcommand)]
    command: Command,
}

/// Overrides applied on top of the config file.
#[derive(Args, Debug)]
struct PathArgs {
    /// JSON build config; missing fields take their defaults
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding one sub-directory per language pair
    #[clap(long, global = true)]
    source_root: Option<PathBuf>,

    /// Directory the compressed tries are written to
    #[clap(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Catalog file listing every built dictionary
    #[clap(long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuilds every stale language pair and updates the catalog
    Build(commands::BuildArgs),

    /// Deletes generated tries and the catalog
    Clean,

    /// Prints catalog entries and lemma totals
    List(commands::ListArgs),

    /// Prints the lemmas of a built trie that start with a prefix
    Lookup(commands::LookupArgs),

    /// Prints the grouped lemmas of a source directory
    Dump(commands::DumpArgs),
}

impl PathArgs {
    fn resolve(&self) -> Result<BuildConfig> {
        let mut config = match &self.config {
            Some(path) => load_build_config(path)?,
            None => BuildConfig::default(),
        };
        if let Some(path) = &self.source_root {
            config.source_root = path.clone();
        }
        if let Some(path) = &self.output_dir {
            config.output_dir = path.clone();
        }
        if let Some(path) = &self.catalog {
            config.catalog_path = path.clone();
        }
        Ok(config)
    }
}

/// Exit status after a second interrupt, as a shell reports SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

/// Cancels `token` on the first Ctrl-C and exits on the second. The listener
/// lives on its own thread so the build itself stays synchronous.
fn install_ctrl_c(token: CancellationToken) {
    let spawned = std::thread::Builder::new()
        .name("lexitrie-ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(error) => {
                    log::warn!("Ctrl-C handling unavailable: {error}");
                    return;
                }
            };
            runtime.block_on(async {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if interrupt(&token) {
                        eprintln!("interrupted again, exiting");
                        std::process::exit(EXIT_INTERRUPTED);
                    }
                }
            });
        });
    if let Err(error) = spawned {
        log::warn!("failed to spawn Ctrl-C listener: {error}");
    }
}

/// Handles one interrupt. Returns true when the run was already cancelled and
/// the process should exit.
fn interrupt(token: &CancellationToken) -> bool {
    if token.is_cancelled() {
        return true;
    }
    log::warn!("interrupt received, finishing running tasks (Ctrl-C again to abort)");
    token.cancel();
    false
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = cli.paths.resolve()?;
    match cli.command {
        Command::Build(args) => {
            let cancel = CancellationToken::new();
            install_ctrl_c(cancel.clone());
            args.apply(&mut config);
            commands::build(config, cancel)
        }
        Command::Clean => commands::clean(&config),
        Command::List(args) => commands::list(&config, &args),
        Command::Lookup(args) => commands::lookup(&config, &args),
        Command::Dump(args) => commands::dump(&args),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(LexitrieError::Cancelled) => {
            eprintln!("build cancelled; catalog left unchanged");
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
