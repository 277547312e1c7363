use std::io;
use std::path::PathBuf;
use std::time::Duration;
use crate::config::config::{ConcurrencyPolicy, Platform, RuntimeMode};

// 應用配置結構體，封裝執行環境與轉換策略
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub runtime_mode: RuntimeMode,
    pub platform: Platform,
    pub project_root: PathBuf,
    pub resources_dir: PathBuf,
    pub concurrency: ConcurrencyPolicy,
    pub job_timeout: Option<Duration>,
    pub no_progress: bool,
}

// 配置來源的 Port
pub trait ConfigPort {
    fn get_config(&self) -> io::Result<AppConfig>;
}
