use std::path::Path;

use crate::platform::OsFamily;
use crate::runner::{CommandRunner, ExecutionError, args};

pub const SCANNER_VERSION: &str = "4.6.2.2472";
pub const PACKAGES: [&str; 2] = ["docker", "docker-compose"];

/// One announced command of the installation plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub message: String,
    pub program: String,
    pub args: Vec<String>,
}

impl Step {
    fn new(message: impl Into<String>, program: &str, args: Vec<String>) -> Self {
        Self { message: message.into(), program: program.to_string(), args }
    }
}

/// Commands needed to run SonarQube and the scanner on `os`.
///
/// macOS has no plan yet; an empty list is returned.
pub fn plan(os: OsFamily, home: &Path, username: &str) -> Vec<Step> {
    match os {
        OsFamily::MacOs => Vec::new(),
        OsFamily::Linux => linux_plan(home, username),
    }
}

fn linux_plan(home: &Path, username: &str) -> Vec<Step> {
    let home = home.display().to_string();
    let dist = format!("sonar-scanner-{SCANNER_VERSION}-linux");
    let zip = "/tmp/sonar-scanner.zip";
    let unpacked = format!("/tmp/{dist}");
    let hidden = format!("{home}/.{dist}");

    let mut steps = vec![Step::new("📦 Updating package list", "sudo", args(["apt", "update"]))];
    for package in PACKAGES {
        steps.push(Step::new(
            format!("📦 Installing package: {package}"),
            "sudo",
            args(["apt", "install", "-y", package]),
        ));
    }
    steps.extend([
        Step::new(
            "📦 Downloading Sonar Scanner",
            "wget",
            args([
                format!(
                    "https://binaries.sonarsource.com/Distribution/sonar-scanner-cli/sonar-scanner-cli-{SCANNER_VERSION}-linux.zip"
                ),
                "-O".to_string(),
                zip.to_string(),
            ]),
        ),
        Step::new("📦 Unpacking Sonar Scanner", "unzip", args(["-o", zip, "-d", "/tmp/"])),
        Step::new(format!("📦 Removing previous copy in {hidden}"), "rm", args(["-rf", hidden.as_str()])),
        Step::new(
            format!("📦 Moving Sonar Scanner to {hidden}"),
            "mv",
            args([unpacked.as_str(), hidden.as_str()]),
        ),
        Step::new(
            "📦 Copying sonar-scanner to /usr/local/bin",
            "sudo",
            args(["cp".to_string(), format!("{hidden}/bin/sonar-scanner"), "/usr/local/bin/".to_string()]),
        ),
        Step::new(
            "📦 Copying the scanner library to /usr/local/lib",
            "sudo",
            args([
                "cp".to_string(),
                format!("{hidden}/lib/sonar-scanner-cli-{SCANNER_VERSION}.jar"),
                "/usr/local/lib/".to_string(),
            ]),
        ),
        Step::new(
            "📦 Removing the bundled java",
            "rm",
            args(["-f".to_string(), format!("{hidden}/jre/bin/java")]),
        ),
        Step::new(
            "📦 Linking the system java",
            "ln",
            args(["-s".to_string(), "/usr/bin/java".to_string(), format!("{hidden}/jre/bin/java")]),
        ),
        Step::new(
            format!("📦 Adding {username} to the docker group"),
            "sudo",
            args(["usermod", "-aG", "docker", username]),
        ),
        Step::new("📦 Cleaning temporary files", "rm", args(["-rf", unpacked.as_str(), zip])),
    ]);
    steps
}

/// Run every step in order, stopping at the first failure.
pub fn run_plan(
    runner: &dyn CommandRunner,
    steps: &[Step],
    stream_output: bool,
) -> Result<(), ExecutionError> {
    for step in steps {
        println!("{}", step.message);
        runner.run(&step.program, &step.args, stream_output)?;
    }
    Ok(())
}
