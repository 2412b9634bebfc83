use std::collections::BTreeSet;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use sonarctl::commands::{config_cmd::ConfigOptions, sonar::SonarOptions};
use sonarctl::commands::{execute_config, execute_sonar};
use sonarctl::error::AppError;
use sonarctl::model::{Credentials, ScannerMode, Stage, parse_projects};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("sonarctl=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::Sonar(args) => {
            let stages = args.stages();
            if stages.is_empty() {
                let mut command = Cli::command();
                if let Some(sonar) = command.find_subcommand_mut("sonar") {
                    sonar.print_help()?;
                }
                return Ok(());
            }
            let options = SonarOptions {
                stages,
                credentials: args.user,
                organization: args.organization,
                projects: args.project.as_deref().map(parse_projects).unwrap_or_default(),
                scanner: args.scanner,
                assume_yes: args.yes,
                debug: cli.debug,
            };
            execute_sonar(options)?;
        }
        Commands::Config(args) => {
            let options = ConfigOptions { show_path: args.path, edit: args.edit };
            execute_config(options)?;
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "sonarctl",
    version,
    about = "Run a local SonarQube with Docker, provision projects and scan them."
)]
struct Cli {
    /// Stream the output of every external command and enable debug logs.
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install, start, provision, scan and stop a local SonarQube.
    ///
    /// Stages always run in the order install, start, create, scan, status, stop.
    #[command(visible_alias = "sq")]
    Sonar(SonarArgs),
    /// Show or edit the sonarctl configuration file.
    #[command(visible_alias = "cfg")]
    Config(ConfigArgs),
}

#[derive(Args)]
struct SonarArgs {
    /// Install docker, docker-compose and sonar-scanner.
    #[arg(short = 'i', long, action = ArgAction::SetTrue)]
    install: bool,

    /// Start the SonarQube and Postgres containers.
    #[arg(short = 's', long, visible_alias = "run", action = ArgAction::SetTrue)]
    start: bool,

    /// Create the projects and their tokens.
    #[arg(short = 'c', long, action = ArgAction::SetTrue)]
    create: bool,

    /// Scan every project, creating missing tokens first.
    #[arg(long, action = ArgAction::SetTrue)]
    scan: bool,

    /// Show the docker container status.
    #[arg(long, action = ArgAction::SetTrue)]
    status: bool,

    /// Stop the SonarQube containers.
    #[arg(long, action = ArgAction::SetTrue)]
    stop: bool,

    /// SonarQube credentials as user:password (default admin:admin123.).
    #[arg(short = 'u', long, value_name = "USER:PASSWORD")]
    user: Option<Credentials>,

    /// Organization the projects belong to.
    #[arg(short = 'o', long, value_name = "ORGANIZATION")]
    organization: Option<String>,

    /// One project name or several separated by commas.
    #[arg(short = 'p', long, value_name = "NAMES")]
    project: Option<String>,

    /// Scanner to use: container or native (defaults to the config file value).
    #[arg(long, value_name = "MODE")]
    scanner: Option<ScannerMode>,

    /// Do not wait for confirmation after the containers start.
    #[arg(short = 'y', long = "yes", action = ArgAction::SetTrue)]
    yes: bool,
}

impl SonarArgs {
    fn stages(&self) -> BTreeSet<Stage> {
        [
            (self.install, Stage::Install),
            (self.start, Stage::Start),
            (self.create, Stage::Create),
            (self.scan, Stage::Scan),
            (self.status, Stage::Status),
            (self.stop, Stage::Stop),
        ]
        .into_iter()
        .filter_map(|(requested, stage)| requested.then_some(stage))
        .collect()
    }
}

#[derive(Args)]
struct ConfigArgs {
    /// Show the configuration file path.
    #[arg(long = "path", action = ArgAction::SetTrue)]
    path: bool,

    /// Open the configuration file in $EDITOR.
    #[arg(long = "edit", action = ArgAction::SetTrue)]
    edit: bool,
}
