use std::path::{Path, PathBuf};

pub const DAEMON_LABEL: &str = "dev.expo.daemon";

pub const DAEMON_SOCKET: &str = "expo.sock";

pub fn expo_root(home: &Path) -> PathBuf {
    home.join(".expo")
}

pub fn run_dir(home: &Path) -> PathBuf {
    expo_root(home).join("run")
}

pub fn logs_dir(home: &Path) -> PathBuf {
    expo_root(home).join("logs")
}

pub fn socket_path(home: &Path) -> PathBuf {
    expo_root(home).join(DAEMON_SOCKET)
}
