use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin123.";

/// Basic-auth credentials used for every SonarQube call in a run.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self { username: DEFAULT_USERNAME.to_string(), password: DEFAULT_PASSWORD.to_string() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl FromStr for Credentials {
    type Err = String;

    /// Parses `user:pass`. Only the first colon separates, so passwords may contain colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((user, pass)) if !user.is_empty() && !pass.is_empty() => {
                Ok(Credentials { username: user.to_string(), password: pass.to_string() })
            }
            _ => Err(format!("expected 'user:password', got '{s}'")),
        }
    }
}

/// A per-project token. `name` is always the project name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub name: String,
    pub value: String,
}

/// Split a comma separated project list, dropping blanks and repeats.
pub fn parse_projects(raw: &str) -> Vec<String> {
    let mut projects: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim) {
        if !name.is_empty() && !projects.iter().any(|existing| existing == name) {
            projects.push(name.to_string());
        }
    }
    projects
}

/// How scan jobs are submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerMode {
    /// `sonarsource/sonar-scanner-cli` on the compose network.
    #[default]
    Container,
    /// The `sonar-scanner` binary found on `PATH`.
    Native,
}

impl ScannerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerMode::Container => "container",
            ScannerMode::Native => "native",
        }
    }
}

impl FromStr for ScannerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "container" | "docker" => Ok(ScannerMode::Container),
            "native" => Ok(ScannerMode::Native),
            _ => Err(format!("Unknown scanner mode '{s}'")),
        }
    }
}

impl fmt::Display for ScannerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stages the orchestrator can run. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Install,
    Start,
    Create,
    Scan,
    Status,
    Stop,
}

impl Stage {
    pub const ALL: [Stage; 6] =
        [Stage::Install, Stage::Start, Stage::Create, Stage::Scan, Stage::Status, Stage::Stop];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Install => "install",
            Stage::Start => "start",
            Stage::Create => "create",
            Stage::Scan => "scan",
            Stage::Status => "status",
            Stage::Stop => "stop",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
