use std::io;
use crate::config::config::{default_project_root, default_resources_dir, ConcurrencyPolicy, ModeSelection, Platform};
use crate::config::ports::{AppConfig, ConfigPort};

// 配置服務，負責選擇適當的配置適配器
pub struct ConfigService {
    config_port: Box<dyn ConfigPort>,
}

impl ConfigService {
    pub fn new(config_port: Box<dyn ConfigPort>) -> Self {
        ConfigService { config_port }
    }

    pub fn get_config(&self) -> io::Result<AppConfig> {
        self.config_port.get_config()
    }
}

// 預設配置適配器：自動判斷模式，單一工作，不設逾時
pub struct DefaultConfigAdapter;

impl DefaultConfigAdapter {
    pub fn new() -> Self {
        DefaultConfigAdapter
    }
}

impl Default for DefaultConfigAdapter {
    fn default() -> Self {
        DefaultConfigAdapter::new()
    }
}

impl ConfigPort for DefaultConfigAdapter {
    fn get_config(&self) -> io::Result<AppConfig> {
        Ok(AppConfig {
            runtime_mode: ModeSelection::Auto.resolve(),
            platform: Platform::current(),
            project_root: default_project_root(),
            resources_dir: default_resources_dir()?,
            concurrency: ConcurrencyPolicy::SingleFlight,
            job_timeout: None,
            no_progress: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_single_flight_without_timeout() {
        let config = ConfigService::new(Box::new(DefaultConfigAdapter::new())).get_config().unwrap();
        assert_eq!(config.concurrency, ConcurrencyPolicy::SingleFlight);
        assert!(config.job_timeout.is_none());
        assert_eq!(config.platform, Platform::current());
        assert!(config.resources_dir.ends_with("resources"));
    }
}
