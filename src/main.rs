/*!
 * Warden CLI - Command Line Interface
 *
 * Inspect policies, report health and run failure drills against an
 * in-process fault-tolerance manager. Reports are written to stdout as
 * JSON; logs go to stderr or the configured log file.
 */

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use warden::{
    cli_style,
    config::{LogLevel, WardenConfig},
    drill::{self, Scenario, ScenarioReport},
    error::{Result, WardenError, EXIT_SUCCESS},
    health::{Diagnosis, HealthStatus},
    logging,
    recovery::parse_strategy_or_restart,
    simulation::{Severity, SimulationReport},
    ExecutionOutcome, FaultToleranceManager,
};
use warden_core_resilience::FailureKind;

#[derive(Parser)]
#[command(name = "warden")]
#[command(version, about = "Fault-tolerance and recovery engine", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides the configuration file)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Log file path (JSON lines)
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective recovery policy table
    Policies,

    /// Report system health
    ///
    /// Nothing persists between runs; use --simulate or --trip to inject
    /// failures before the report.
    Health {
        /// Trailing window in minutes
        #[arg(long)]
        window: Option<u32>,

        #[command(flatten)]
        scenario: ScenarioArgs,
    },

    /// Report health with recommendations and trends
    ///
    /// Nothing persists between runs; use --simulate or --trip to inject
    /// failures before the diagnosis.
    Diagnose {
        /// Trailing window in minutes
        #[arg(long)]
        window: Option<u32>,

        #[command(flatten)]
        scenario: ScenarioArgs,
    },

    /// Inject synthetic failures and apply the default recovery strategy
    Simulate {
        /// Failure kind (timeout, api_error, network_error, ...)
        #[arg(long)]
        kind: String,

        /// Affected component
        #[arg(long)]
        component: String,

        #[arg(long, value_enum, default_value = "medium")]
        severity: SeverityArg,

        /// Number of failures to inject
        #[arg(long, default_value = "1")]
        count: u32,
    },

    /// Run the recovery hook for a component
    ///
    /// With --trip the component's breaker is opened first, so the report
    /// shows it being cleared.
    Recover {
        #[arg(long)]
        component: String,

        /// Recovery strategy; unknown names fall back to restart
        #[arg(long, default_value = "restart")]
        strategy: String,

        /// Open the component's breaker before recovering
        #[arg(long)]
        trip: bool,

        /// Policy whose breaker threshold --trip uses
        #[arg(long, default_value = "network")]
        policy: String,
    },

    /// Run an operation that fails a number of times under a policy
    ///
    /// Backoff delays are real, so long policies take a while.
    Drill {
        #[arg(long)]
        component: String,

        /// Policy name; unknown names resolve to default
        #[arg(long, default_value = "default")]
        policy: String,

        /// Failures before the operation starts succeeding
        #[arg(long, default_value = "2")]
        failures: u32,

        /// Failure kind used for the error message
        #[arg(long, default_value = "agent_failure")]
        kind: String,
    },

    /// Write a sample configuration file
    InitConfig {
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
}

/// Failures injected before a health report
#[derive(Args)]
struct ScenarioArgs {
    /// Inject a simulated failure of this kind (repeatable)
    #[arg(long = "simulate", value_name = "KIND")]
    simulate: Vec<String>,

    /// Open the component's breaker before reporting
    #[arg(long)]
    trip: bool,

    /// Policy whose breaker threshold --trip uses
    #[arg(long, default_value = "network")]
    policy: String,

    /// Component the injected failures are attributed to
    #[arg(long, default_value = "cli")]
    component: String,

    #[arg(long, value_enum, default_value = "medium")]
    severity: SeverityArg,
}

impl ScenarioArgs {
    fn into_scenario(self) -> Result<Scenario> {
        let simulate = self
            .simulate
            .iter()
            .map(|kind| kind.parse::<FailureKind>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Scenario {
            component: self.component,
            simulate,
            severity: self.severity.into(),
            trip_policy: self.trip.then_some(self.policy),
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum SeverityArg {
    Low,
    Medium,
    High,
    Critical,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Low => Severity::Low,
            SeverityArg::Medium => Severity::Medium,
            SeverityArg::High => Severity::High,
            SeverityArg::Critical => Severity::Critical,
        }
    }
}

#[derive(Serialize)]
struct HealthRun {
    scenario: ScenarioReport,
    health: HealthStatus,
}

#[derive(Serialize)]
struct DiagnosisRun {
    scenario: ScenarioReport,
    diagnosis: Diagnosis,
}

#[derive(Serialize)]
struct SimulationRun {
    simulations: Vec<SimulationReport>,
    health: HealthStatus,
}

#[derive(Serialize)]
struct DrillRun {
    execution: ExecutionOutcome<String>,
    health: HealthStatus,
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => WardenConfig::from_file(path)?,
        None => WardenConfig::default(),
    };

    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    config.verbose |= cli.verbose;

    if let Commands::InitConfig { ref output } = cli.command {
        WardenConfig::sample().to_file(output)?;
        eprintln!("Sample configuration written to {}", output.display());
        return Ok(());
    }

    logging::init_logging(&config)?;
    let manager = FaultToleranceManager::from_config(&config)?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| WardenError::Config(format!("Failed to start async runtime: {}", e)))?;

    runtime.block_on(dispatch(cli.command, &manager))
}

async fn dispatch(command: Commands, manager: &FaultToleranceManager) -> Result<()> {
    match command {
        Commands::Policies => {
            println!("{}", cli_style::policy_table(manager.policies()));
            Ok(())
        }
        Commands::Health { window, scenario } => {
            let scenario = scenario.into_scenario()?.apply(manager).await;
            let window = window.unwrap_or(manager.health_window_minutes());
            cli_style::print_json(&HealthRun {
                scenario,
                health: manager.get_system_health(window),
            })
        }
        Commands::Diagnose { window, scenario } => {
            let scenario = scenario.into_scenario()?.apply(manager).await;
            let window = window.unwrap_or(manager.health_window_minutes());
            cli_style::print_json(&DiagnosisRun {
                scenario,
                diagnosis: manager.diagnose(window),
            })
        }
        Commands::Simulate {
            kind,
            component,
            severity,
            count,
        } => {
            let kind: FailureKind = kind.parse()?;
            let simulations = (0..count)
                .map(|_| manager.simulate_failure(kind, &component, severity.into()))
                .collect();

            cli_style::print_json(&SimulationRun {
                simulations,
                health: manager.health(),
            })
        }
        Commands::Recover {
            component,
            strategy,
            trip,
            policy,
        } => {
            let strategy = parse_strategy_or_restart(&strategy);
            let trip_policy = trip.then_some(policy.as_str());
            let run = drill::recover_component(manager, &component, strategy, trip_policy).await;
            cli_style::print_json(&run)
        }
        Commands::Drill {
            component,
            policy,
            failures,
            kind,
        } => {
            let kind: FailureKind = kind.parse()?;
            let execution = drill::run_drill(manager, &component, &policy, failures, kind).await;
            let escalated = execution.requires_manual_intervention();

            cli_style::print_json(&DrillRun {
                execution: execution.clone(),
                health: manager.health(),
            })?;

            if escalated {
                execution.into_result()?;
            }
            Ok(())
        }
        Commands::InitConfig { .. } => Ok(()),
    }
}
