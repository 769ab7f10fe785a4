use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Native,
    Act,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplaySettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<LogFormat>,
    pub network_delta: i32,
    pub write_summary: bool,
}

pub fn load_settings(settings_path: &Path) -> Result<ReplaySettings, String> {
    let raw_json = match std::fs::read_to_string(settings_path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::debug!(
                settings_path = %settings_path.display(),
                "No settings file, using defaults"
            );
            return Ok(ReplaySettings::default());
        }
        Err(error) => {
            return Err(format!(
                "Failed to read replay settings '{}': {error}",
                settings_path.display()
            ));
        }
    };

    serde_json::from_str::<ReplaySettings>(&raw_json).map_err(|error| {
        format!(
            "Failed to parse replay settings '{}': {error}",
            settings_path.display()
        )
    })
}
