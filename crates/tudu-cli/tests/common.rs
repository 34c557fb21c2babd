#![allow(dead_code)]
use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    _dir: TempDir,
    pub cfg: PathBuf,
    pub state: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = dir.path().join("config");
        let state = dir.path().join("state");
        std::fs::create_dir_all(&cfg).expect("cfg dir");
        Self {
            _dir: dir,
            cfg,
            state,
        }
    }

    /// Binary isolated from the user's settings and log file.
    pub fn raw_bin(&self) -> Command {
        let mut cmd = Command::cargo_bin("tudu").unwrap();
        cmd.env("XDG_CONFIG_HOME", &self.cfg)
            .env("XDG_STATE_HOME", &self.state)
            .env_remove("TUDU_LOG");
        cmd
    }

    /// Same, pinned to the in-process store regardless of settings.
    pub fn bin(&self) -> Command {
        let mut cmd = self.raw_bin();
        cmd.arg("--store").arg("mem");
        cmd
    }

    pub fn write_settings(&self, toml: &str) {
        let dir = self.cfg.join("tudu");
        std::fs::create_dir_all(&dir).expect("tudu cfg dir");
        std::fs::write(dir.join("settings.toml"), toml).expect("settings");
    }

    pub fn log_file(&self) -> PathBuf {
        self.state.join("tudu").join("tudu.log")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
