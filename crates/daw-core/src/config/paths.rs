//! Default configuration location

use std::path::PathBuf;

/// Config file name inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// `<platform config dir>/daw`, or `./daw` if the platform has none
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("daw")
}

/// `<platform config dir>/daw/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_layout() {
        let path = default_config_path();
        assert!(path.ends_with("daw/config.yaml"));
        assert!(path.starts_with(default_config_dir()));
    }
}
