use std::io;
use std::sync::Arc;
use std::time::Duration;
use clap::Parser;
use tokio::io::BufReader;
use crate::action::interactive::process_interactive_mode;
use crate::action::ipc::{serve, HeadlessPathPicker};
use crate::config::config::{
    default_output_path, default_project_root, default_resources_dir, validate_encoding, validate_input_path, Cli,
    Command, ConcurrencyPolicy, ConvertArgs, Platform,
};
use crate::config::ports::{AppConfig, ConfigPort};
use crate::facade::request_gateway::RequestGateway;
use crate::facade::traits::i_gateway::RequestGatewayTrait;
use crate::models::conversion::{ConversionRequest, ConversionResult};
use crate::service::config_service::ConfigService;
use crate::utils::utils::{format_file_size, setup_logging, LogPrinter};

/// 沒有參數時進入互動模式；回傳轉換輸出的路徑（若有）
pub fn process_args(args: Vec<String>) -> io::Result<Option<String>> {
    if args.len() == 1 {
        process_interactive_mode().map(Some)
    } else {
        process_cli_mode()
    }
}

pub fn process_cli_mode() -> io::Result<Option<String>> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level)?;

    let config_service = ConfigService::new(Box::new(CliConfigAdapter::new(cli.clone())));
    let config = config_service.get_config()?;

    match cli.command {
        Some(Command::Convert(args)) => run_convert(&config, args).map(Some),
        Some(Command::Presets) => {
            print_presets(&config);
            Ok(None)
        }
        Some(Command::Serve) => {
            run_serve(&config)?;
            Ok(None)
        }
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "請指定子命令（convert、presets 或 serve），或不帶參數執行以進入互動模式"
        )),
    }
}

pub fn build_runtime() -> io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread().enable_all().build()
}

fn run_convert(config: &AppConfig, args: ConvertArgs) -> io::Result<String> {
    let input = validate_input_path(&args.input)?.to_path_buf();
    validate_encoding(&args.encoding)?;
    let output = args.output.clone().unwrap_or_else(|| default_output_path(&input));
    let gateway = RequestGateway::new(config, Box::new(HeadlessPathPicker));

    let common_chars = match (&args.preset, &args.common_chars) {
        (Some(id), _) => {
            let preset = gateway
                .list_presets()
                .into_iter()
                .find(|preset| &preset.id == id)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("找不到常用字預設 '{}'", id)))?;
            log::info!("使用常用字預設：{}（{}）", preset.label, preset.path.display());
            Some(preset.path)
        }
        (None, Some(path)) => Some(validate_input_path(path)?.to_path_buf()),
        (None, None) => None,
    };

    let request = ConversionRequest {
        input_path: input,
        output_path: output,
        common_chars_path: common_chars,
        encoding: args.encoding,
        common_text: args.common_text,
        include_basic_ascii: !args.no_basic_ascii,
        include_basic_cjk_punct: !args.no_basic_cjk_punct,
    };
    execute_with_logs(&gateway, request, config.no_progress)
}

/// 轉換並把引擎輸出即時轉送到終端；失敗時回傳錯誤
pub fn execute_with_logs(gateway: &RequestGateway, request: ConversionRequest, no_progress: bool) -> io::Result<String> {
    let output = request.output_path.clone();
    let runtime = build_runtime()?;
    let result = runtime.block_on(async {
        let mut subscription = gateway.log_channel().subscribe();
        let mut printer = LogPrinter::new(no_progress);
        let convert = gateway.convert(request);
        tokio::pin!(convert);
        let result = loop {
            tokio::select! {
                biased;
                Some(event) = subscription.recv() => printer.print(&event),
                result = &mut convert => break result,
            }
        };
        while let Some(event) = subscription.try_recv() {
            printer.print(&event);
        }
        subscription.unsubscribe();
        printer.finish(&result);
        result
    });

    match result {
        ConversionResult::Success => {
            if let Ok(metadata) = std::fs::metadata(&output) {
                log::info!("輸出檔案大小：{}", format_file_size(metadata.len()));
            }
            Ok(output.display().to_string())
        }
        ConversionResult::Failure { message } => Err(io::Error::new(io::ErrorKind::Other, message)),
    }
}

fn print_presets(config: &AppConfig) {
    let gateway = RequestGateway::new(config, Box::new(HeadlessPathPicker));
    let presets = gateway.list_presets();
    if presets.is_empty() {
        println!("目前沒有可用的常用字預設");
        return;
    }
    let cwd = std::env::current_dir().ok();
    for preset in presets {
        let shown = cwd
            .as_deref()
            .and_then(|dir| pathdiff::diff_paths(&preset.path, dir))
            .unwrap_or_else(|| preset.path.clone());
        println!("{:<14} {:<12} {}", preset.id, preset.label, shown.display());
    }
}

fn run_serve(config: &AppConfig) -> io::Result<()> {
    let gateway = Arc::new(RequestGateway::new(config, Box::new(HeadlessPathPicker)));
    let runtime = build_runtime()?;
    runtime.block_on(async {
        log::info!("IPC 服務啟動，等待 stdin 上的請求");
        serve(gateway, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
        Ok(())
    })
}

// CLI 配置適配器
pub struct CliConfigAdapter {
    cli: Cli,
}

impl CliConfigAdapter {
    pub fn new(cli: Cli) -> Self {
        CliConfigAdapter { cli }
    }
}

impl ConfigPort for CliConfigAdapter {
    fn get_config(&self) -> io::Result<AppConfig> {
        let resources_dir = match &self.cli.resources_dir {
            Some(dir) => dir.clone(),
            None => default_resources_dir()?,
        };
        let project_root = self.cli.project_root.clone().unwrap_or_else(default_project_root);
        if let Some(0) = self.cli.timeout_secs {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "--timeout-secs 必須大於 0"));
        }
        if !project_root.is_dir() {
            log::warn!("專案根目錄不存在：{}", project_root.display());
        }

        Ok(AppConfig {
            runtime_mode: self.cli.runtime_mode.resolve(),
            platform: Platform::current(),
            project_root,
            resources_dir,
            concurrency: if self.cli.allow_concurrent {
                ConcurrencyPolicy::Unbounded
            } else {
                ConcurrencyPolicy::SingleFlight
            },
            job_timeout: self.cli.timeout_secs.map(Duration::from_secs),
            no_progress: self.cli.no_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config::RuntimeMode;
    use std::path::PathBuf;

    fn config_from(args: &[&str]) -> io::Result<AppConfig> {
        let cli = Cli::parse_from(args);
        CliConfigAdapter::new(cli).get_config()
    }

    #[test]
    fn flags_shape_the_config() {
        let config = config_from(&[
            "font_to_woff2",
            "--runtime-mode", "packaged",
            "--resources-dir", "/opt/app/resources",
            "--project-root", "/src/app",
            "--allow-concurrent",
            "--timeout-secs", "30",
            "presets",
        ])
        .unwrap();
        assert_eq!(config.runtime_mode, RuntimeMode::Packaged);
        assert_eq!(config.resources_dir, PathBuf::from("/opt/app/resources"));
        assert_eq!(config.project_root, PathBuf::from("/src/app"));
        assert_eq!(config.concurrency, ConcurrencyPolicy::Unbounded);
        assert_eq!(config.job_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn defaults_are_single_flight_without_timeout() {
        let config = config_from(&["font_to_woff2", "presets"]).unwrap();
        assert_eq!(config.concurrency, ConcurrencyPolicy::SingleFlight);
        assert!(config.job_timeout.is_none());
        assert_eq!(config.project_root, default_project_root());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = config_from(&["font_to_woff2", "--timeout-secs", "0", "presets"]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn unknown_preset_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("a.ttf");
        std::fs::write(&font, b"\0\x01\0\0").unwrap();
        let config = config_from(&[
            "font_to_woff2",
            "--resources-dir", dir.path().to_str().unwrap(),
            "--runtime-mode", "packaged",
            "presets",
        ])
        .unwrap();
        let args = ConvertArgs {
            input: font,
            output: None,
            preset: Some("common-9999".into()),
            common_chars: None,
            encoding: "utf-8".into(),
            common_text: None,
            no_basic_ascii: false,
            no_basic_cjk_punct: false,
        };
        let err = run_convert(&config, args).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn missing_packaged_engine_fails_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("a.ttf");
        std::fs::write(&font, b"\0\x01\0\0").unwrap();
        let mut config = config_from(&["font_to_woff2", "--runtime-mode", "packaged", "presets"]).unwrap();
        config.resources_dir = dir.path().join("resources");
        config.no_progress = true;
        let args = ConvertArgs {
            input: font,
            output: None,
            preset: None,
            common_chars: None,
            encoding: "utf-8".into(),
            common_text: None,
            no_basic_ascii: false,
            no_basic_cjk_punct: false,
        };
        let err = run_convert(&config, args).unwrap_err();
        assert!(err.to_string().contains("failed to start"), "{}", err);
    }
}
