//! # Settings
//!
//! Engine tunables, read from `settings.toml` in the user's preferences. Anything missing or unreadable falls back
//! to defaults.

const DOCUMENTATION: &str = r#"# Celforge engine settings. You may edit this file, but be aware that formatting and comments will not
# be preserved. Missing values take their defaults.

# [history]
# Number of undo steps to keep, oldest forgotten first. 0 keeps everything.
# max_undo_steps = 0
#
# [loader]
# Name given to background loading threads.
# thread_name = "Document loader"
# Number of unread progress reports kept before new ones are dropped.
# progress_capacity = 16

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(default)]
pub struct HistorySettings {
    /// Zero for unlimited.
    pub max_undo_steps: usize,
}
impl Default for HistorySettings {
    fn default() -> Self {
        Self { max_undo_steps: 0 }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(default)]
pub struct LoaderSettings {
    pub thread_name: String,
    pub progress_capacity: usize,
}
impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            thread_name: "Document loader".to_owned(),
            progress_capacity: 16,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Default, PartialEq, Eq, Debug)]
#[serde(default)]
pub struct Settings {
    #[serde(skip)]
    failed_to_load: bool,
    pub history: HistorySettings,
    pub loader: LoaderSettings,
}
impl Settings {
    const FILENAME: &'static str = "settings.toml";
    /// Shared global settings, loaded from user preferences.
    /// (Or defaulted, if unavailable for some reason)
    #[must_use]
    pub fn get() -> &'static Self {
        static GLOBAL_SETTINGS: std::sync::OnceLock<Settings> = std::sync::OnceLock::new();

        GLOBAL_SETTINGS.get_or_init(|| {
            let mut dir = preferences_dir();
            match dir.as_mut() {
                None => Self::no_path(),
                Some(dir) => {
                    dir.push(Self::FILENAME);
                    Self::load_or_default(dir)
                }
            }
        })
    }
    #[must_use]
    pub fn no_path() -> Self {
        log::warn!("Settings weren't available, defaulting.");
        Self {
            failed_to_load: true,
            ..Self::default()
        }
    }
    pub fn from_toml_str(string: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(string)?)
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        let settings: anyhow::Result<Self> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            Self::from_toml_str(&string)
        };

        match settings {
            Ok(settings) => settings,
            Err(err) => {
                log::debug!("Reading {}: {err:#}", path.display());
                Self::no_path()
            }
        }
    }
    /// Return true if loading user's settings failed. This can be useful for
    /// displaying a warning.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        let string = toml::ser::to_string_pretty(self)?;
        Ok(DOCUMENTATION.to_owned() + &string)
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Not recursive. A missing parent is left for the user to sort out.
        // Already existing is fine, and any other error shows up writing the file below.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        std::fs::write(preferences, self.to_toml_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_file_defaults_the_rest() {
        let settings = Settings::from_toml_str("[history]\nmax_undo_steps = 50\n").unwrap();
        assert_eq!(settings.history.max_undo_steps, 50);
        assert_eq!(settings.loader, LoaderSettings::default());
        assert!(!settings.did_fail_to_load());
    }
    #[test]
    fn empty_is_default() {
        assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
    }
    #[test]
    fn bad_types_error() {
        assert!(Settings::from_toml_str("[history]\nmax_undo_steps = \"lots\"\n").is_err());
    }
    #[test]
    fn saved_text_reads_back() {
        let mut settings = Settings::default();
        settings.loader.thread_name = "elsewhere".to_owned();
        settings.loader.progress_capacity = 2;
        let text = settings.to_toml_string().unwrap();
        assert!(text.starts_with("# Celforge"));
        assert_eq!(Settings::from_toml_str(&text).unwrap(), settings);
    }
    #[test]
    fn missing_file_falls_back() {
        let settings =
            Settings::load_or_default(std::path::Path::new("/definitely/not/here/settings.toml"));
        assert!(settings.did_fail_to_load());
        assert_eq!(settings.history, HistorySettings::default());
    }
    #[test]
    fn feeds_history() {
        let settings = Settings::from_toml_str("[history]\nmax_undo_steps = 3\n").unwrap();
        let history = crate::queue::UndoHistory::from_settings(&settings.history);
        assert!(history.is_empty());
    }
}
