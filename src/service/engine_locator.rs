use std::ffi::OsString;
use std::path::PathBuf;
use log::debug;
use crate::config::config::{Platform, RuntimeMode};
use crate::models::engine::EngineInvocation;

/// 開發模式下由 uv 管理的 Python 環境執行引擎腳本
pub const INTERPRETER: &str = "uv";
pub const ENGINE_SCRIPT: &str = "py/src/ttf2woff2.py";
/// 打包後各平台引擎執行檔的主檔名
pub const ENGINE_STEM: &str = "ttf2woff2";
const ENGINE_DIR: &str = "engine";

/// 決定如何啟動轉換引擎；只讀取固定路徑，不檢查檔案是否存在
pub struct EngineLocator {
    project_root: PathBuf,
    resources_dir: PathBuf,
}

impl EngineLocator {
    pub fn new(project_root: PathBuf, resources_dir: PathBuf) -> Self {
        EngineLocator { project_root, resources_dir }
    }

    pub fn resolve(&self, mode: RuntimeMode, platform: &Platform) -> EngineInvocation {
        let invocation = match mode {
            RuntimeMode::Development => EngineInvocation {
                command: PathBuf::from(INTERPRETER),
                args_prefix: vec![
                    OsString::from("run"),
                    OsString::from("python"),
                    self.project_root.join(ENGINE_SCRIPT).into_os_string(),
                ],
                working_directory: Some(self.project_root.clone()),
            },
            RuntimeMode::Packaged => {
                let engine_dir = self.resources_dir.join(ENGINE_DIR).join(platform.os_id());
                EngineInvocation {
                    command: engine_dir.join(platform.executable_name(ENGINE_STEM)),
                    args_prefix: Vec::new(),
                    working_directory: None,
                }
            }
        };
        debug!("引擎啟動方式（{:?}，{}）：{:?}", mode, platform.os_id(), invocation);
        invocation
    }
}
