//! Command-line interface for the `dmuncle` binary.
//!
//! ```bash
//! # After a build, record the resolved dependencies of every module
//! dmuncle watch
//!
//! # Or harvest a log captured by CI
//! dmuncle watch --from-log build.log
//!
//! # Ship the accumulated document to the collector
//! dmuncle send --server-address http://collector:8080
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::HarvestConfig;
use crate::executor::HarvesterExecutor;
use crate::harvest::traits::ModuleBoundary;
use crate::runner::{LogFileRunner, MavenRunner};
use crate::traits::HarvestError;
use crate::transmit::HttpTransmitter;

#[derive(Parser, Debug)]
#[command(name = "dmuncle", version, about = "Track third-party Maven dependencies across modules")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root, where the build runs and artifacts are written
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Project name reported to the collector (defaults to the directory name)
    #[arg(long, global = true, env = "DMUNCLE_PROJECT_NAME")]
    pub project_name: Option<String>,

    /// Enable debug logging, including the build tool's own output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the build tool and merge its resolved dependencies into the document
    Watch(WatchArgs),

    /// Send the document to the collector and remove it locally
    Send(SendArgs),
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Parse an existing build log instead of invoking the build tool
    #[arg(long, value_name = "FILE")]
    pub from_log: Option<PathBuf>,

    /// Build tool executable
    #[arg(long, default_value = "mvn", env = "DMUNCLE_BUILD_COMMAND")]
    pub build_command: String,

    /// How module boundaries are recognised in the output
    #[arg(long, value_enum, default_value_t = BoundaryArg::Plugin)]
    pub module_boundary: BoundaryArg,

    /// Abort the build after this many seconds
    #[arg(long, value_name = "SECS")]
    pub build_timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Collector base address; `/import` is appended
    #[arg(long, env = "DMUNCLE_SERVER_ADDRESS")]
    pub server_address: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryArg {
    /// `--- maven-dependency-plugin:...:list @ module ---`
    Plugin,
    /// `Building module 1.0`
    Banner,
}

impl From<BoundaryArg> for ModuleBoundary {
    fn from(arg: BoundaryArg) -> Self {
        match arg {
            BoundaryArg::Plugin => ModuleBoundary::PluginInvocation,
            BoundaryArg::Banner => ModuleBoundary::BuildingBanner,
        }
    }
}

impl Cli {
    /// Log filter implied by `--verbose` / `--quiet`; `RUST_LOG` wins when set.
    pub fn log_filter(&self) -> EnvFilter {
        let level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }

    pub fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_target(false)
            .try_init();
    }

    /// Translates arguments into a [`HarvestConfig`].
    pub fn build_config(&self) -> HarvestConfig {
        let mut config = HarvestConfig::new(&self.project_dir);
        config.project_name = self.project_name.clone();

        match &self.command {
            Commands::Watch(args) => {
                config.build_command = args.build_command.clone();
                config.module_boundary = args.module_boundary.into();
                config.build_timeout = args.build_timeout.map(Duration::from_secs);
            }
            Commands::Send(args) => {
                config.server_address = Some(args.server_address.clone());
            }
        }
        config
    }

    pub async fn execute(self) -> Result<(), HarvestError> {
        let config = self.build_config();
        let executor = HarvesterExecutor::new(config);

        match self.command {
            Commands::Watch(args) => {
                let result = match args.from_log {
                    Some(log) => executor.watch(LogFileRunner::new(log)).await?,
                    None => {
                        let runner = MavenRunner::new(&executor.config().build_command);
                        executor.watch(runner).await?
                    }
                };
                info!(
                    stored = result.stats.stored,
                    total = result.document.len(),
                    failed_modules = result.stats.failed_modules,
                    duration_ms = result.stats.total_duration_ms,
                    "Dependency harvest finished"
                );
            }
            Commands::Send(_) => {
                let report = executor.send(&HttpTransmitter::new()).await?;
                info!(
                    project = %report.project_name,
                    entries = report.entries,
                    "Dependency report delivered"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_config() {
        let cli = Cli::parse_from([
            "dmuncle",
            "-C",
            "/work/shop",
            "watch",
            "--module-boundary",
            "banner",
            "--build-timeout",
            "90",
        ]);
        let config = cli.build_config();

        assert_eq!(config.project_dir, PathBuf::from("/work/shop"));
        assert_eq!(config.module_boundary, ModuleBoundary::BuildingBanner);
        assert_eq!(config.build_timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.build_command, "mvn");
        assert!(config.server_address.is_none());
    }

    #[test]
    fn test_send_config() {
        let cli = Cli::parse_from([
            "dmuncle",
            "send",
            "--server-address",
            "http://collector:8080",
            "--project-name",
            "Shop",
        ]);
        let config = cli.build_config();

        assert_eq!(config.import_url().unwrap(), "http://collector:8080/import");
        assert_eq!(config.resolved_project_name(), "Shop");
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["dmuncle", "-v", "-q", "watch"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
