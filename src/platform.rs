use crate::runner::{CommandRunner, ExecutionError, args};

pub const MAX_MAP_COUNT: &str = "vm.max_map_count=262144";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    MacOs,
}

impl OsFamily {
    /// Anything that is not macOS is treated as Linux.
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") { OsFamily::MacOs } else { OsFamily::Linux }
    }
}

/// SonarQube's embedded Elasticsearch refuses to boot with the default mmap limit.
pub fn prepare_host(
    os: OsFamily,
    runner: &dyn CommandRunner,
    stream_output: bool,
) -> Result<(), ExecutionError> {
    match os {
        OsFamily::Linux => {
            println!("🔧 Raising {MAX_MAP_COUNT} (requires sudo)");
            runner.run("sudo", &args(["sysctl", "-w", MAX_MAP_COUNT]), stream_output)
        }
        OsFamily::MacOs => {
            println!("ℹ️ Skipping host tuning on macOS; Docker Desktop manages the VM limits.");
            Ok(())
        }
    }
}
