use std::io::{self, BufRead};
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use tracing::info;

use crate::compose::ComposeLauncher;
use crate::error::AppError;
use crate::install;
use crate::model::{Stage, Token};
use crate::platform::{OsFamily, prepare_host};
use crate::prompt;
use crate::readiness::wait_until_ready;
use crate::runner::{CommandRunner, args};
use crate::scanner::{ScanTarget, invocation};
use crate::settings::Settings;
use crate::sonar::{ProjectOutcome, SonarApi};
use crate::token_store::{TokenError, TokenStore};
use crate::utils::display_path;

const RULE: &str = "--------------------------------------------------------";

/// Runs the requested stages in their fixed order.
///
/// There is no rollback: the first failing stage aborts the run and leaves
/// whatever was already started (containers included) in place.
pub struct Orchestrator<'a> {
    settings: &'a Settings,
    runner: &'a dyn CommandRunner,
    api: &'a dyn SonarApi,
    tokens: TokenStore,
    input: &'a mut dyn BufRead,
    cancel: &'a AtomicBool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        settings: &'a Settings,
        runner: &'a dyn CommandRunner,
        api: &'a dyn SonarApi,
        input: &'a mut dyn BufRead,
        cancel: &'a AtomicBool,
    ) -> Self {
        let tokens = TokenStore::new(settings.tokens_dir.clone());
        Self { settings, runner, api, tokens, input, cancel }
    }

    pub fn run(&mut self) -> Result<(), AppError> {
        self.settings.validate()?;
        for stage in Stage::ALL {
            if !self.settings.wants(stage) {
                continue;
            }
            info!(%stage, "running stage");
            match stage {
                Stage::Install => self.install()?,
                Stage::Start => self.start()?,
                Stage::Create => self.create()?,
                Stage::Scan => self.scan()?,
                Stage::Status => self.status()?,
                Stage::Stop => self.stop()?,
            }
        }
        Ok(())
    }

    fn launcher(&self) -> ComposeLauncher<'a> {
        ComposeLauncher::new(
            self.runner,
            self.settings.compose_file.clone(),
            self.settings.compose_project.clone(),
            self.settings.os,
            true,
        )
    }

    fn install(&mut self) -> Result<(), AppError> {
        if self.settings.os == OsFamily::MacOs {
            println!("ℹ️ Package installation is not supported on this platform yet.");
            return Ok(());
        }
        let username = self
            .settings
            .username
            .as_deref()
            .ok_or_else(|| AppError::config("Unable to determine the current user name"))?;
        let steps = install::plan(self.settings.os, &self.settings.home, username);
        install::run_plan(self.runner, &steps, self.settings.debug)?;
        println!("✅ All packages have been installed successfully!");
        println!("🔄 Log out and back in (or reboot) so the docker group and sonar-scanner take effect.");
        Ok(())
    }

    fn start(&mut self) -> Result<(), AppError> {
        println!("🚢 Starting the setup process, this can take a while...");
        prepare_host(self.settings.os, self.runner, true)?;

        let launcher = self.launcher();
        launcher.start()?;
        info!(file = %launcher.file().display(), "compose stack started");

        println!("🚢 SonarQube is starting...");
        let status = wait_until_ready(self.api, &self.settings.readiness, self.cancel)?;
        info!(version = ?status.version, "SonarQube reported UP");

        if !self.settings.assume_yes {
            let username = &self.settings.credentials.username;
            println!("🚧 Open {}/ and change the default password", self.settings.sonar_url);
            println!("👤 Default user [{username}:admin]");
            println!(
                "🚨 Recommended password: [{}], otherwise pass -u/--user with your own credentials",
                self.settings.credentials.password
            );
            let mut stdout = io::stdout();
            prompt::confirm(
                &mut *self.input,
                &mut stdout,
                "⚠️ Press enter once you have changed the password...",
            )?;
        }
        println!("🙉 SonarQube is up and running!");
        Ok(())
    }

    fn create(&mut self) -> Result<(), AppError> {
        let organization = self.settings.organization.as_deref().unwrap_or_default();
        println!("{RULE}");
        println!("💡 Organization: {organization}");
        println!("{RULE}");

        for project in &self.settings.projects {
            println!("📚 Creating project: {project}");
            match self.api.create_project(project, organization)? {
                ProjectOutcome::Created => println!("✅ Project {project} created"),
                ProjectOutcome::AlreadyExists => println!("📜 Project {project} already exists"),
            }
        }

        for project in &self.settings.projects {
            self.ensure_token(project)?;
            println!("{RULE}");
        }
        Ok(())
    }

    fn scan(&mut self) -> Result<(), AppError> {
        let started = Instant::now();
        let network = self.settings.network();
        let target = ScanTarget {
            mode: self.settings.scanner,
            source_dir: &self.settings.source_dir,
            sonar_url: &self.settings.sonar_url,
            network: &network,
        };

        println!("🔭 Scanning projects...");
        for project in &self.settings.projects {
            let token = self.ensure_token(project)?;
            println!("🔭 Scanning project: {project}");
            let call = invocation(&target, project, &token);
            self.runner.run(&call.program, &call.args, true)?;
        }

        println!("{RULE}");
        println!("Elapsed: {:.2?}", started.elapsed());
        println!("{RULE}");
        Ok(())
    }

    fn status(&mut self) -> Result<(), AppError> {
        self.runner.run("docker", &args(["ps", "-a"]), true)?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AppError> {
        println!("Stopping SonarQube...");
        self.launcher().stop()?;
        println!("👋 SonarQube is stopped!");
        Ok(())
    }

    /// Return the cached token for `project`, requesting and storing one if absent.
    pub fn ensure_token(&self, project: &str) -> Result<Token, AppError> {
        match self.tokens.get(project) {
            Ok(token) => {
                println!("📜 Using existing token for project: {project}");
                return Ok(token);
            }
            Err(TokenError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        println!("✔️ Creating new token for project: {project}");
        let response = match self.api.create_token(project) {
            Ok(response) => response,
            Err(err) => {
                eprintln!(
                    "[ERROR] 🔥 Token creation failed; SonarQube may already hold a token named '{project}'."
                );
                eprintln!("[ERROR] 🔥 Check {}", self.tokens.root().display());
                eprintln!("[ERROR] 🔥 or revoke it at {}/account/security", self.settings.sonar_url);
                return Err(err.into());
            }
        };

        let token = Token::from(response);
        let path = self.tokens.put(project, &token)?;
        println!("🔑 Token for {project} stored in {}", display_path(&path));
        Ok(token)
    }
}
