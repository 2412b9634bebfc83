use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::platform::OsFamily;
use crate::runner::{CommandRunner, ExecutionError};

pub const COMPOSE_PROGRAM: &str = "docker-compose";
pub const APP_SERVICE: &str = "sonarqube";
pub const DATABASE_SERVICE: &str = "psql";
pub const NETWORK: &str = "sonar";
pub const SONARQUBE_IMAGE: &str = "sonarqube:9.2-community";
pub const POSTGRES_IMAGE: &str = "postgres:9.5";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to write compose file {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "docker-compose failed; make sure your user may run docker (sudo usermod -aG docker $USER, then log in again): {0}"
    )]
    Compose(#[source] ExecutionError),
}

/// Render the two-service topology. Output depends only on `os`.
pub fn render(os: OsFamily) -> String {
    let platform = match os {
        OsFamily::MacOs => "    platform: linux/amd64\n",
        OsFamily::Linux => "",
    };
    format!(
        r#"version: "3"
services:
  {APP_SERVICE}:
    image: {SONARQUBE_IMAGE}
{platform}    expose:
      - 9000
    ports:
      - "9000:9000"
    networks:
      - {NETWORK}
    environment:
      - sonar.jdbc.username=sonar
      - sonar.jdbc.password=sonar
      - sonar.jdbc.url=jdbc:postgresql://{DATABASE_SERVICE}:5432/sonar
    depends_on:
      - {DATABASE_SERVICE}
  {DATABASE_SERVICE}:
    image: {POSTGRES_IMAGE}
    networks:
      - {NETWORK}
    ports:
      - "5432:5432"
    environment:
      - POSTGRES_USER=sonar
      - POSTGRES_PASSWORD=sonar
      - POSTGRES_DB=sonar
    volumes:
      - postgresql:/var/lib/postgresql
      - postgresql_data:/var/lib/postgresql/data
networks:
  {NETWORK}:
volumes:
  postgresql_data:
  postgresql:
"#
    )
}

/// Network the compose project attaches its services to.
pub fn network_name(project: &str) -> String {
    format!("{project}_{NETWORK}")
}

/// Writes the compose file and drives `docker-compose` against it.
///
/// The file path and project name are fixed per configuration, so two
/// concurrent runs would overwrite each other's file and share containers.
pub struct ComposeLauncher<'a> {
    runner: &'a dyn CommandRunner,
    file: PathBuf,
    project: String,
    os: OsFamily,
    stream_output: bool,
}

impl<'a> ComposeLauncher<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        file: impl Into<PathBuf>,
        project: impl Into<String>,
        os: OsFamily,
        stream_output: bool,
    ) -> Self {
        Self { runner, file: file.into(), project: project.into(), os, stream_output }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn start(&self) -> Result<(), LaunchError> {
        let document = render(self.os);
        if let Some(dir) = self.file.parent() {
            fs::create_dir_all(dir)
                .map_err(|source| LaunchError::File { path: dir.to_path_buf(), source })?;
        }
        fs::write(&self.file, document)
            .map_err(|source| LaunchError::File { path: self.file.clone(), source })?;
        debug!(file = %self.file.display(), "wrote compose file");

        self.compose(&["up", "-d"])
    }

    pub fn stop(&self) -> Result<(), LaunchError> {
        self.compose(&["stop"])
    }

    fn compose(&self, action: &[&str]) -> Result<(), LaunchError> {
        let mut args = vec![
            "-p".to_string(),
            self.project.clone(),
            "-f".to_string(),
            self.file.display().to_string(),
        ];
        args.extend(action.iter().map(|part| part.to_string()));
        self.runner.run(COMPOSE_PROGRAM, &args, self.stream_output).map_err(LaunchError::Compose)
    }
}
