use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser, Clone, Debug)]
#[command(
    name = "font_to_woff2",
    about = "將 TTF/OTF 字型轉換為 WOFF2 網頁字型，可選擇依常用字表子集化",
    long_about = "透過外部轉換引擎將字型轉換為 WOFF2，轉換過程的輸出會即時轉送到終端。\n不帶任何參數執行時進入互動模式；`serve` 子命令提供給前端介面使用的 JSON-lines IPC。\n使用 `--help` 查看詳細用法。"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
    #[arg(long, global = true, default_value = "auto")]
    pub runtime_mode: ModeSelection,
    #[arg(long, global = true)]
    pub project_root: Option<PathBuf>,
    #[arg(long, global = true)]
    pub resources_dir: Option<PathBuf>,
    #[arg(long, global = true, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,
    #[arg(long, global = true, default_value_t = false)]
    pub allow_concurrent: bool,
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
    #[arg(long, global = true, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// 轉換單一字型檔
    Convert(ConvertArgs),
    /// 列出目前可用的常用字預設
    Presets,
    /// 以 JSON-lines 在 stdin/stdout 上提供 IPC 服務
    Serve,
}

#[derive(Args, Clone, Debug)]
pub struct ConvertArgs {
    #[arg(short, long)]
    pub input: PathBuf,
    /// 預設為輸入檔名改為 .woff2
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long, conflicts_with = "common_chars")]
    pub preset: Option<String>,
    #[arg(long)]
    pub common_chars: Option<PathBuf>,
    #[arg(long, default_value = "utf-8")]
    pub encoding: String,
    #[arg(long)]
    pub common_text: Option<String>,
    #[arg(long, default_value_t = false)]
    pub no_basic_ascii: bool,
    #[arg(long, default_value_t = false)]
    pub no_basic_cjk_punct: bool,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq, Debug)]
pub enum ModeSelection {
    Auto,
    Development,
    Packaged,
}

impl ModeSelection {
    /// `Auto` 在 debug 建置視為開發模式，release 建置視為打包模式
    pub fn resolve(self) -> RuntimeMode {
        match self {
            ModeSelection::Development => RuntimeMode::Development,
            ModeSelection::Packaged => RuntimeMode::Packaged,
            ModeSelection::Auto if cfg!(debug_assertions) => RuntimeMode::Development,
            ModeSelection::Auto => RuntimeMode::Packaged,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Development,
    Packaged,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Other(String),
}

impl Platform {
    pub fn current() -> Self {
        Platform::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "macos" => Platform::MacOs,
            "linux" => Platform::Linux,
            other => Platform::Other(other.to_string()),
        }
    }

    /// 打包資源目錄下以此識別碼區分各平台的引擎
    pub fn os_id(&self) -> &str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
            Platform::Other(os) => os,
        }
    }

    pub fn executable_name(&self, stem: &str) -> String {
        match self {
            Platform::Windows => format!("{}.exe", stem),
            _ => stem.to_string(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConcurrencyPolicy {
    /// 同一時間只允許一個轉換，其餘請求立即失敗
    SingleFlight,
    Unbounded,
}

pub fn default_project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn default_resources_dir() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("無法取得執行檔所在目錄：{}", exe.display()))
    })?;
    Ok(dir.join("resources"))
}

pub fn validate_input_path(input: &Path) -> io::Result<&Path> {
    if !input.is_file() {
        log::error!("輸入字型不存在：{}", input.display());
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("輸入字型 '{}' 不存在", input.display())
        ));
    }
    Ok(input)
}

pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("woff2")
}

pub fn validate_encoding(encoding: &str) -> io::Result<()> {
    let valid = !encoding.is_empty()
        && encoding.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("無效的編碼名稱: {}", encoding)));
    }
    Ok(())
}
