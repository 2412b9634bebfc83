pub mod config_cmd;
pub mod sonar;

pub use config_cmd::execute_config;
pub use sonar::execute_sonar;
