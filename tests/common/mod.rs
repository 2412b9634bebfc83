#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sonarctl::config::Config;
use sonarctl::model::Stage;
use sonarctl::platform::OsFamily;
use sonarctl::readiness::Backoff;
use sonarctl::runner::{CommandRunner, ExecutionError};
use sonarctl::settings::Settings;
use sonarctl::sonar::{ApiError, ProjectOutcome, SonarApi, SystemStatus, TokenResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
}

impl Call {
    pub fn line(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

/// Records every command instead of running it.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: RefCell<Vec<Call>>,
    pub fail_program: Option<&'static str>,
}

impl RecordingRunner {
    pub fn failing(program: &'static str) -> Self {
        Self { fail_program: Some(program), ..Self::default() }
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Call::line).collect()
    }

    pub fn count_starting_with(&self, prefix: &str) -> usize {
        self.lines().iter().filter(|line| line.starts_with(prefix)).count()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String], _stream_output: bool) -> Result<(), ExecutionError> {
        self.calls.borrow_mut().push(Call { program: program.to_string(), args: args.to_vec() });
        if self.fail_program == Some(program) {
            return Err(ExecutionError::Failed {
                program: program.to_string(),
                code: Some(1),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory SonarQube that always reports UP.
#[derive(Default)]
pub struct FakeSonar {
    pub projects: RefCell<Vec<(String, String)>>,
    pub token_requests: RefCell<Vec<String>>,
    pub status_calls: Cell<u32>,
    pub reject_tokens: bool,
}

impl SonarApi for FakeSonar {
    fn create_project(&self, name: &str, organization: &str) -> Result<ProjectOutcome, ApiError> {
        self.projects.borrow_mut().push((name.to_string(), organization.to_string()));
        Ok(ProjectOutcome::Created)
    }

    fn create_token(&self, name: &str) -> Result<TokenResponse, ApiError> {
        self.token_requests.borrow_mut().push(name.to_string());
        if self.reject_tokens {
            return Err(ApiError::Status {
                endpoint: "/api/user_tokens/generate".to_string(),
                status: 400,
                message: format!("A user token for login 'admin' and name '{name}' already exists"),
            });
        }
        Ok(TokenResponse {
            login: "admin".to_string(),
            name: name.to_string(),
            token: format!("squ_{name}"),
            created_at: "2021-04-08T16:26:40+0000".to_string(),
        })
    }

    fn system_status(&self, _timeout: Duration) -> Result<SystemStatus, ApiError> {
        self.status_calls.set(self.status_calls.get() + 1);
        Ok(SystemStatus { id: None, version: Some("9.2".to_string()), status: "UP".to_string() })
    }
}

/// Settings rooted in `dir`, Linux host, fast readiness polling.
pub fn settings(dir: &Path, stages: &[Stage]) -> Settings {
    let mut config = Config::default();
    config.compose_file = dir.join("docker-compose.sonarctl.yml");
    let mut settings = Settings::from_config(
        &config,
        dir.join("sonar/tokens"),
        dir.join("work"),
        dir.join("home"),
    );
    settings.stages = stages.iter().copied().collect();
    settings.os = OsFamily::Linux;
    settings.username = Some("dev".to_string());
    settings.readiness = Backoff {
        initial: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        timeout: Duration::from_secs(2),
    };
    settings
}

/// Serve `responses` in order, one per connection, returning the raw requests.
pub fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            requests.push(read_request(&mut stream));
            let response = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                reason(status),
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
        }
        requests
    });
    (url, handle)
}

fn read_request(stream: &mut std::net::TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut head = String::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap();
        }
        let end = line == "\r\n" || line.is_empty();
        head.push_str(&line);
        if end {
            break;
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).unwrap();
    head.push_str(&String::from_utf8_lossy(&body));
    head
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        _ => "Status",
    }
}
