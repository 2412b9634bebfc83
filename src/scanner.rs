use std::path::Path;

use crate::compose::APP_SERVICE;
use crate::model::{ScannerMode, Token};

pub const SCANNER_IMAGE: &str = "sonarsource/sonar-scanner-cli";
pub const NATIVE_PROGRAM: &str = "sonar-scanner";
const CONTAINER_SOURCE_DIR: &str = "/usr/src";

/// A fully resolved scanner command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

/// Where the scanner runs and how it reaches SonarQube.
#[derive(Debug, Clone)]
pub struct ScanTarget<'a> {
    pub mode: ScannerMode,
    pub source_dir: &'a Path,
    /// URL used by the native scanner.
    pub sonar_url: &'a str,
    /// Compose network the container joins.
    pub network: &'a str,
}

/// Build the scanner call for `project`, whose sources live in `<source_dir>/<project>`.
pub fn invocation(target: &ScanTarget<'_>, project: &str, token: &Token) -> Invocation {
    match target.mode {
        ScannerMode::Container => {
            let host = format!("http://{APP_SERVICE}:9000");
            let mut args = vec![
                "run".to_string(),
                "--rm".to_string(),
                format!("--network={}", target.network),
                "-e".to_string(),
                format!("SONAR_HOST_URL={host}"),
                "-v".to_string(),
                format!("{}:{CONTAINER_SOURCE_DIR}", target.source_dir.display()),
                SCANNER_IMAGE.to_string(),
            ];
            args.extend(properties(project, &host, token));
            Invocation { program: "docker".to_string(), args }
        }
        ScannerMode::Native => {
            let mut args = vec![format!("-Dsonar.projectBaseDir={}", target.source_dir.display())];
            args.extend(properties(project, target.sonar_url, token));
            Invocation { program: NATIVE_PROGRAM.to_string(), args }
        }
    }
}

fn properties(project: &str, host: &str, token: &Token) -> Vec<String> {
    vec![
        format!("-Dsonar.projectKey={project}"),
        format!("-Dsonar.projectName={project}"),
        "-Dsonar.projectVersion=1.0".to_string(),
        format!("-Dsonar.sources=./{project}"),
        "-Dsonar.scm.disabled=true".to_string(),
        format!("-Dsonar.host.url={host}"),
        format!("-Dsonar.login={}", token.value.trim()),
    ]
}
