// src/main.rs
use std::ffi::OsStr;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};

use kubesel::config::Settings;
use kubesel::kubeconfig::{find_auth_info, find_cluster, find_context};
use kubesel::session::{find_kubesel_data_dir, GarbageCollectOptions, Kubesel, Overlay};
use kubesel::utils::logging::init_logging;

/// Exit code for a failed `__init`. The shell hook keeps its old
/// `KUBECONFIG` when it sees this.
const EXIT_INIT_FAILED: u8 = 2;

#[derive(Parser)]
#[command(name = "kubesel", version, about = "Switch kubectl clusters, users and namespaces per shell")]
pub struct Args {
    #[arg(short, long, global = true)]
    pub debug: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create this shell's overlay and print the new KUBECONFIG
    #[command(name = "__init", hide = true)]
    Init {
        /// PID of the shell that owns the overlay
        #[arg(long)]
        pid: u32,
    },
    /// Show or change the current cluster
    Cluster { name: Option<String> },
    /// Show or change the current user
    User { name: Option<String> },
    /// Show or change the current namespace
    #[command(alias = "ns")]
    Namespace { name: Option<String> },
    /// Use the cluster, user and namespace of an existing context
    Context { name: String },
    /// List known clusters, users or contexts
    List {
        #[arg(value_enum)]
        kind: ListKind,
    },
    /// Show the current cluster, user and namespace
    Status,
    /// Delete overlay files of shells that have exited
    GarbageCollect,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ListKind {
    Clusters,
    Users,
    Contexts,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let settings = load_settings();

    if let Err(e) = init_logging(args.debug, settings.log_file.as_deref()) {
        eprintln!("kubesel: failed to set up logging: {}", e);
    }

    let failure_code = match args.command {
        Command::Init { .. } => ExitCode::from(EXIT_INIT_FAILED),
        _ => ExitCode::FAILURE,
    };

    let kubesel = match Kubesel::new().await {
        Ok(kubesel) => kubesel,
        Err(e) => {
            eprintln!("kubesel: {}", e);
            return failure_code;
        }
    };

    let run_background_gc = !matches!(args.command, Command::Init { .. } | Command::GarbageCollect);
    let result = run(&kubesel, args.command);

    if run_background_gc && settings.background_gc.should_run(&mut rand::thread_rng()) {
        match kubesel.garbage_collect(&settings.background_gc.options()) {
            Ok(gc) => debug!(deleted = gc.files_deleted.len(), "Background garbage collection finished"),
            Err(e) => warn!(error = %e, "Background garbage collection failed"),
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("kubesel: {:#}", e);
            failure_code
        }
    }
}

fn load_settings() -> Settings {
    let Some(data_dir) = find_kubesel_data_dir() else {
        return Settings::default();
    };

    let settings = Settings::load_or_default(&Settings::path_in(&data_dir))
        .and_then(|settings| settings.validate().map(|()| settings));

    match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("kubesel: ignoring settings file: {}", e);
            Settings::default()
        }
    }
}

fn run(kubesel: &Kubesel, command: Command) -> Result<()> {
    match command {
        Command::Init { pid } => {
            let overlay = match kubesel.find_overlay() {
                Ok(overlay) if overlay.owner().process == pid => overlay,
                Ok(overlay) => {
                    debug!(parent = %overlay.path().display(), "Starting from a parent shell's overlay");
                    kubesel.init_overlay(pid)?
                }
                Err(e) => {
                    debug!(error = %e, "No usable overlay in KUBECONFIG");
                    kubesel.init_overlay(pid)?
                }
            };

            let value = kubesel.kubeconfig_env_value(&overlay)?;
            write_path_list(&mut io::stdout().lock(), &value)?;
        }

        Command::Cluster { name: None } => println!("{}", current_overlay(kubesel)?.cluster_name()),
        Command::Cluster { name: Some(name) } => {
            if find_cluster(&name, kubesel.merged()).is_none() {
                bail!("unknown cluster: {}", name);
            }
            let mut overlay = current_overlay(kubesel)?;
            overlay.set_cluster_name(name);
            overlay.save()?;
        }

        Command::User { name: None } => println!("{}", current_overlay(kubesel)?.auth_info_name()),
        Command::User { name: Some(name) } => {
            if find_auth_info(&name, kubesel.merged()).is_none() {
                bail!("unknown user: {}", name);
            }
            let mut overlay = current_overlay(kubesel)?;
            overlay.set_auth_info_name(name);
            overlay.save()?;
        }

        Command::Namespace { name: None } => println!("{}", current_overlay(kubesel)?.namespace()),
        Command::Namespace { name: Some(name) } => {
            let mut overlay = current_overlay(kubesel)?;
            overlay.set_namespace(name);
            overlay.save()?;
        }

        Command::Context { name } => {
            if !kubesel.list_context_names().contains(&name) {
                bail!("unknown context: {}", name);
            }
            let Some(context) = find_context(&name, kubesel.merged()) else {
                bail!("context {} has no cluster or user", name);
            };
            let mut overlay = current_overlay(kubesel)?;
            overlay.apply_context(context);
            overlay.save()?;
        }

        Command::List { kind } => {
            let names = match kind {
                ListKind::Clusters => kubesel.list_cluster_names(),
                ListKind::Users => kubesel.list_auth_info_names(),
                ListKind::Contexts => kubesel.list_context_names(),
            };
            for name in names {
                println!("{}", name);
            }
        }

        Command::Status => {
            let overlay = current_overlay(kubesel)?;
            println!("Cluster:   {}", overlay.cluster_name());
            println!("User:      {}", overlay.auth_info_name());
            println!("Namespace: {}", overlay.namespace());
            println!("Overlay:   {}", overlay.path().display());
        }

        Command::GarbageCollect => {
            let result = kubesel.garbage_collect(&GarbageCollectOptions::exhaustive())?;
            for path in &result.files_deleted {
                println!("deleted {}", path.display());
            }
            for error in &result.errors {
                warn!("{}", error);
            }
        }
    }

    Ok(())
}

/// Writes a `KUBECONFIG` value followed by a newline. On unix the raw bytes
/// are written so that non-UTF-8 paths survive.
fn write_path_list(out: &mut impl Write, value: &OsStr) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        out.write_all(value.as_bytes())?;
    }
    #[cfg(not(unix))]
    out.write_all(value.to_string_lossy().as_bytes())?;

    out.write_all(b"\n")?;
    out.flush()
}

fn current_overlay(kubesel: &Kubesel) -> Result<Overlay> {
    match kubesel.find_overlay() {
        Ok(overlay) => Ok(overlay),
        Err(e) if e.is_unmanaged() => bail!(
            "this shell has no kubesel session; start one with: export KUBECONFIG=\"$(kubesel __init --pid $$)\""
        ),
        Err(e) => Err(e.into()),
    }
}
