use std::path::Path;
use std::process::Command;

use crate::config::{config_file_path, ensure_config_file};
use crate::error::AppError;
use crate::utils::display_path;

pub struct ConfigOptions {
    pub show_path: bool,
    pub edit: bool,
}

pub fn execute_config(options: ConfigOptions) -> Result<(), AppError> {
    if options.edit {
        let path = ensure_config_file()?;
        open_editor(&path)?;
        return Ok(());
    }

    let path = if options.show_path { config_file_path()? } else { ensure_config_file()? };
    println!("Configuration file: {}", display_path(&path));
    Ok(())
}

fn open_editor(path: &Path) -> Result<(), AppError> {
    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| "nano".to_string());

    let status = Command::new(&editor)
        .arg(path)
        .status()
        .map_err(|err| AppError::Editor(err.to_string()))?;

    if status.success() {
        Ok(())
    } else {
        Err(AppError::Editor(format!("Editor exited with status {}", status)))
    }
}
