use std::collections::BTreeSet;
use std::io;
use std::sync::atomic::AtomicBool;

use dirs_next as dirs;
use tracing::debug;

use crate::config::{Config, ensure_config_file, tokens_dir};
use crate::error::AppError;
use crate::model::{Credentials, ScannerMode, Stage};
use crate::orchestrator::Orchestrator;
use crate::runner::SystemRunner;
use crate::settings::Settings;
use crate::sonar::SonarClient;
use crate::utils::current_username;

pub struct SonarOptions {
    pub stages: BTreeSet<Stage>,
    pub credentials: Option<Credentials>,
    pub organization: Option<String>,
    pub projects: Vec<String>,
    pub scanner: Option<ScannerMode>,
    pub assume_yes: bool,
    pub debug: bool,
}

pub fn execute_sonar(options: SonarOptions) -> Result<(), AppError> {
    ensure_config_file()?;
    let config = Config::load()?;
    let settings = resolve_settings(&config, options)?;
    debug!(?settings, "resolved settings");

    let api = SonarClient::new(&settings.sonar_url, settings.credentials.clone(), settings.http_timeout)?;
    let runner = SystemRunner;
    let cancel = AtomicBool::new(false);
    let stdin = io::stdin();
    let mut input = stdin.lock();

    Orchestrator::new(&settings, &runner, &api, &mut input, &cancel).run()
}

fn resolve_settings(config: &Config, options: SonarOptions) -> Result<Settings, AppError> {
    let home =
        dirs::home_dir().ok_or_else(|| AppError::config("Unable to determine the home directory"))?;
    let source_dir = std::env::current_dir()?;

    let mut settings = Settings::from_config(config, tokens_dir()?, source_dir, home);
    settings.stages = options.stages;
    if let Some(credentials) = options.credentials {
        println!("ℹ️ Using credentials for user: {}", credentials.username);
        settings.credentials = credentials;
    }
    settings.organization = options.organization;
    settings.projects = options.projects;
    if let Some(scanner) = options.scanner {
        settings.scanner = scanner;
    }
    settings.assume_yes = options.assume_yes;
    settings.debug = options.debug;
    settings.username = current_username();
    Ok(settings)
}
