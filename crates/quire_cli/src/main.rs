//! `quire` - builds, serves and publishes documentation sites.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use quire::config::{ConfigOverrides, CONFIG_FILENAME};
use quire::publish::publish;
use quire::serve::{serve_dev, serve_preview};
use quire::Site;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quire", version, about)]
struct Cli {
    /// Root directory of the site.
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Configuration file, relative to the root.
    #[arg(short, long, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Log what is being built.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the site with live reload.
    Dev(ServerArgs),
    /// Build the site into the output directory.
    Build(BuildArgs),
    /// Serve the built site.
    Preview(ServerArgs),
    /// Build the site and publish it to a directory.
    Deploy(DeployArgs),
}

#[derive(Args)]
struct ServerArgs {
    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Args)]
struct BuildArgs {
    /// Base path the site is served under (overrides config).
    #[arg(long)]
    base: Option<String>,

    /// Output directory, relative to the root (overrides config).
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args)]
struct DeployArgs {
    /// Directory to publish the built site to.
    #[arg(short, long)]
    target: PathBuf,

    /// Publish the existing build instead of building first.
    #[arg(long)]
    skip_build: bool,

    #[command(flatten)]
    build: BuildArgs,
}

impl From<ServerArgs> for ConfigOverrides {
    fn from(args: ServerArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            ..Default::default()
        }
    }
}

impl From<BuildArgs> for ConfigOverrides {
    fn from(args: BuildArgs) -> Self {
        Self {
            base: args.base,
            out_dir: args.out_dir,
            ..Default::default()
        }
    }
}

fn load_site(root: &Path, config: &Path, overrides: ConfigOverrides) -> Result<Site> {
    Site::load(root, config, overrides)
        .with_context(|| format!("failed to load site from '{}'", root.display()))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to create tokio runtime")
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        root,
        config,
        command,
        ..
    } = cli;

    match command {
        Commands::Dev(args) => runtime()?
            .block_on(serve_dev(root, config, args.into()))
            .context("dev server failed"),
        Commands::Build(args) => {
            let site = load_site(&root, &config, args.into())?;

            let output_path = site.build().context("failed to build site")?;
            println!(
                "built {} pages into {}",
                site.content().pages().len(),
                output_path.display()
            );

            Ok(())
        }
        Commands::Preview(args) => {
            let site = load_site(&root, &config, args.into())?;

            runtime()?
                .block_on(serve_preview(&site))
                .context("preview server failed")
        }
        Commands::Deploy(args) => {
            let site = load_site(&root, &config, args.build.into())?;

            let bundle_path = if args.skip_build {
                site.output_path()
            } else {
                site.build().context("failed to build site")?
            };

            let report = publish(&bundle_path, &args.target)
                .with_context(|| format!("failed to publish to '{}'", args.target.display()))?;
            println!(
                "published {} files to {}",
                report.files,
                report.target.display()
            );

            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // `-v` shows build progress, otherwise `RUST_LOG` decides (default: warnings).
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run(cli)
}
