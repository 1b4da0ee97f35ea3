/*!

This is the command line interface to the conformance harness. It exposes the poll based checks
and the `oc` helpers the suites are built on so they can be used from scripts and by hand.

!*/

mod check;
mod get;
mod query;
mod remove;
mod version;

use anyhow::Result;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use octest_model::{Oc, OcConfig};
use std::path::PathBuf;

/// Poll based checks against an OpenShift cluster.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to the kubeconfig file used for regular user operations.
    #[clap(long = "kubeconfig")]
    kubeconfig: Option<PathBuf>,
    /// Path to the kubeconfig file used for cluster-admin operations. Defaults to `--kubeconfig`.
    #[clap(long = "admin-kubeconfig")]
    admin_kubeconfig: Option<PathBuf>,
    /// The path or name of the `oc` binary.
    #[clap(long = "oc", default_value = "oc")]
    oc_path: String,
    /// The project passed to namespaced operations.
    #[clap(long = "namespace", short = 'n')]
    namespace: Option<String>,
    /// The directory processed templates and fetched definitions are written to.
    #[clap(long = "output-dir")]
    output_dir: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Poll until a resource is present, absent, or matches the expected content.
    Check(check::CheckArgs),
    /// Poll `oc get` until it succeeds and print its output.
    Get(get::Get),
    /// Delete a resource and wait until it is gone.
    Remove(remove::Remove),
    /// Print the Kubernetes version of the cluster.
    Version(version::Version),
    /// Evaluate a PromQL query through the Prometheus route of the cluster.
    Query(query::Query),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = OcConfig {
        oc_path: args.oc_path,
        kubeconfig: args.kubeconfig,
        admin_kubeconfig: args.admin_kubeconfig,
        output_dir: args.output_dir.unwrap_or_else(std::env::temp_dir),
    };
    let mut oc = Oc::new(config);
    if let Some(namespace) = args.namespace {
        oc.set_namespace(namespace);
    }
    match args.command {
        Command::Check(check) => check.run(&oc).await,
        Command::Get(get) => get.run(&oc).await,
        Command::Remove(remove) => remove.run(&oc).await,
        Command::Version(version) => version.run(&oc).await,
        Command::Query(query) => query.run(&oc).await,
    }
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate and the library.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("octest_model"), level)
                .init();
        }
    }
}
