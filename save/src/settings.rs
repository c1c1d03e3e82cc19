//! Save pipeline configuration, loadable from `savebox.toml`.
//!
//! ```toml
//! pretty_print = true
//! emit_type_tags = true
//! enable_logs = true
//! min_frame_rate = 30.0
//! include_inactive = false
//! file_prefix = "save_"
//! file_extension = "json"
//! ```
//!
//! Every key is optional; missing keys take the [`Default`] values.

use std::path::Path;

use savebox_tree::{FrameBudget, RenderOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSettings {
    /// Indented output instead of compact.
    pub pretty_print: bool,
    /// Write `StbTypeAssembly` type tags.
    pub emit_type_tags: bool,
    /// Emit warnings for skipped records and failed entities.
    pub enable_logs: bool,
    /// Lowest frame rate async rendering may cause. Zero or less disables
    /// suspension.
    pub min_frame_rate: f32,
    /// Scan inactive scene objects too.
    pub include_inactive: bool,
    pub file_prefix: String,
    pub file_extension: String,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            pretty_print: true,
            emit_type_tags: true,
            enable_logs: true,
            min_frame_rate: 30.0,
            include_inactive: false,
            file_prefix: "save_".into(),
            file_extension: "json".into(),
        }
    }
}

impl SaveSettings {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            pretty_print: self.pretty_print,
            emit_type_tags: self.emit_type_tags,
        }
    }

    /// Budget for async rendering, derived from `min_frame_rate`.
    pub fn frame_budget(&self) -> FrameBudget {
        FrameBudget::from_min_frame_rate(self.min_frame_rate)
    }

    /// File name for a save slot, e.g. `save_quick.json`.
    pub fn slot_file_name(&self, slot: &str) -> String {
        if self.file_extension.is_empty() {
            format!("{}{slot}", self.file_prefix)
        } else {
            format!("{}{slot}.{}", self.file_prefix, self.file_extension)
        }
    }

    /// Inverse of [`slot_file_name`](Self::slot_file_name).
    pub fn slot_from_file_name<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let stem = file_name.strip_prefix(self.file_prefix.as_str())?;
        let slot = if self.file_extension.is_empty() {
            stem
        } else {
            stem.strip_suffix(self.file_extension.as_str())?
                .strip_suffix('.')?
        };
        (!slot.is_empty()).then_some(slot)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load settings from a TOML file.
    ///
    /// Returns `Err` with a human-readable message if the file cannot be read
    /// or parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Self::from_toml_str(&content)
            .map_err(|e| format!("failed to parse {}: {e}", path.display()))
    }

    /// Like [`load`](Self::load), falling back to defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded save settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("No save settings ({e}), using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = SaveSettings::from_toml_str("pretty_print = false\nmin_frame_rate = 60.0").unwrap();
        assert!(!settings.pretty_print);
        assert_eq!(settings.min_frame_rate, 60.0);
        assert!(settings.emit_type_tags);
        assert_eq!(settings.file_extension, "json");
    }

    #[test]
    fn slot_names_roundtrip() {
        let settings = SaveSettings::default();
        let name = settings.slot_file_name("quick");
        assert_eq!(name, "save_quick.json");
        assert_eq!(settings.slot_from_file_name(&name), Some("quick"));
        assert_eq!(settings.slot_from_file_name("save_.json"), None);
        assert_eq!(settings.slot_from_file_name("other.json"), None);
        assert_eq!(settings.slot_from_file_name("save_quick.json.tmp"), None);
    }

    #[test]
    fn frame_budget_follows_frame_rate() {
        let settings = SaveSettings {
            min_frame_rate: 0.0,
            ..SaveSettings::default()
        };
        assert!(settings.frame_budget().interval().is_none());
        assert!(SaveSettings::default().frame_budget().interval().is_some());
    }

    #[test]
    fn missing_file_falls_back() {
        let settings = SaveSettings::load_or_default(Path::new("/definitely/not/here.toml"));
        assert_eq!(settings, SaveSettings::default());
    }
}
