use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::compose::network_name;
use crate::config::Config;
use crate::error::AppError;
use crate::model::{Credentials, ScannerMode, Stage};
use crate::platform::OsFamily;
use crate::readiness::Backoff;

/// Longest readiness wait accepted from the config file.
pub const MAX_READINESS_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Everything one run needs, resolved up front from flags and the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub stages: BTreeSet<Stage>,
    pub credentials: Credentials,
    pub organization: Option<String>,
    pub projects: Vec<String>,
    pub debug: bool,
    pub assume_yes: bool,
    pub scanner: ScannerMode,
    pub sonar_url: String,
    pub compose_file: PathBuf,
    pub compose_project: String,
    pub http_timeout: Duration,
    pub readiness: Backoff,
    pub os: OsFamily,
    pub tokens_dir: PathBuf,
    /// Directory holding one sub-directory of sources per project.
    pub source_dir: PathBuf,
    pub home: PathBuf,
    pub username: Option<String>,
}

impl Settings {
    /// Defaults for every field not driven by flags.
    pub fn from_config(config: &Config, tokens_dir: PathBuf, source_dir: PathBuf, home: PathBuf) -> Self {
        Self {
            stages: BTreeSet::new(),
            credentials: Credentials::default(),
            organization: None,
            projects: Vec::new(),
            debug: false,
            assume_yes: false,
            scanner: config.scanner,
            sonar_url: config.sonar_url.clone(),
            compose_file: config.compose_file.clone(),
            compose_project: config.compose_project.clone(),
            http_timeout: Duration::from_secs(config.http_timeout_secs),
            readiness: Backoff::with_timeout(Duration::from_secs(config.readiness_timeout_secs)),
            os: OsFamily::detect(),
            tokens_dir,
            source_dir,
            home,
            username: None,
        }
    }

    pub fn wants(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn network(&self) -> String {
        network_name(&self.compose_project)
    }

    /// Reject flag combinations that cannot succeed before anything runs.
    pub fn validate(&self) -> Result<(), AppError> {
        if (self.wants(Stage::Create) || self.wants(Stage::Scan)) && self.projects.is_empty() {
            return Err(AppError::config("At least one project is required, use -p/--project"));
        }
        if self.wants(Stage::Create)
            && self.organization.as_deref().is_none_or(|org| org.trim().is_empty())
        {
            return Err(AppError::config("Organization needs to be set, use -o/--organization"));
        }
        if self.wants(Stage::Install) && self.os == OsFamily::Linux && self.username.is_none() {
            return Err(AppError::config("Unable to determine the current user name"));
        }
        if self.http_timeout.is_zero() {
            return Err(AppError::config("http_timeout_secs must be greater than zero"));
        }
        if self.readiness.timeout > MAX_READINESS_TIMEOUT {
            return Err(AppError::config(format!(
                "readiness_timeout_secs must be at most {}",
                MAX_READINESS_TIMEOUT.as_secs()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(stages: &[Stage]) -> Settings {
        let mut settings = Settings::from_config(
            &Config::default(),
            PathBuf::from("/tmp/tokens"),
            PathBuf::from("/work"),
            PathBuf::from("/home/dev"),
        );
        settings.stages = stages.iter().copied().collect();
        settings
    }

    #[test]
    fn create_requires_projects_and_organization() {
        let mut settings = settings(&[Stage::Create]);
        assert!(settings.validate().is_err());

        settings.projects = vec!["a".to_string()];
        assert!(settings.validate().is_err());

        settings.organization = Some("acme".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn scan_requires_projects_only() {
        let mut settings = settings(&[Stage::Scan]);
        assert!(settings.validate().is_err());
        settings.projects = vec!["a".to_string()];
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn status_and_stop_need_nothing() {
        assert!(settings(&[Stage::Status, Stage::Stop]).validate().is_ok());
    }

    #[test]
    fn install_needs_a_username_only_on_linux() {
        let mut settings = settings(&[Stage::Install]);
        settings.username = None;

        settings.os = OsFamily::MacOs;
        assert!(settings.validate().is_ok());

        settings.os = OsFamily::Linux;
        assert!(matches!(settings.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn readiness_timeout_is_capped() {
        let mut settings = settings(&[Stage::Start]);
        settings.readiness = Backoff::with_timeout(MAX_READINESS_TIMEOUT);
        assert!(settings.validate().is_ok());

        settings.readiness = Backoff::with_timeout(Duration::from_secs(u64::MAX));
        assert!(matches!(settings.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn network_follows_compose_project() {
        assert_eq!(settings(&[]).network(), "sonarctl_sonar");
    }
}
