use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "dsa-tutor";

#[cfg(target_os = "macos")]
const PLATFORM: &str = "macos";

#[cfg(target_os = "windows")]
const PLATFORM: &str = "windows";

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PLATFORM: &str = "linux";

/// 应用数据目录，取不到系统目录时退回到 ~/.local/share
pub fn get_app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| {
            let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(".local/share");
            path.push(APP_DIR_NAME);
            path
        })
}

pub fn get_session_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("session.db")
}

pub fn get_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

pub fn get_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("dsa-tutor.log")
}

pub fn get_platform() -> &'static str {
    PLATFORM
}
