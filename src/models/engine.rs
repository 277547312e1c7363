use std::ffi::OsString;
use std::path::PathBuf;

/// 啟動轉換引擎所需的資訊，由 EngineLocator 決定一次後不再變動
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    pub command: PathBuf,
    pub args_prefix: Vec<OsString>,
    pub working_directory: Option<PathBuf>,
}
