use dialoguer::{Input, Select};
use std::io;
use std::path::{Path, PathBuf};

use crate::action::cli::execute_with_logs;
use crate::config::config::{default_output_path, validate_encoding};
use crate::config::ports::AppConfig;
use crate::facade::request_gateway::RequestGateway;
use crate::facade::traits::i_gateway::RequestGatewayTrait;
use crate::models::conversion::ConversionRequest;
use crate::models::preset::Preset;
use crate::service::config_service::{ConfigService, DefaultConfigAdapter};
use crate::service::traits::i_service::PathPickerTrait;
use crate::utils::utils::setup_logging;

pub fn process_interactive_mode() -> io::Result<String> {
    setup_logging("info")?;
    println!("=== 歡迎使用互動模式 ===");

    let config = ConfigService::new(Box::new(DefaultConfigAdapter::new())).get_config()?;
    let gateway = RequestGateway::new(&config, Box::new(DialoguerPathPicker));

    let input = gateway
        .pick_input_path()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Interrupted, "未選擇輸入字型"))?;
    let suggested = default_output_path(&input);
    let output = gateway
        .pick_output_path(Some(&suggested))
        .ok_or_else(|| io::Error::new(io::ErrorKind::Interrupted, "未選擇輸出位置"))?;

    let mut request = ConversionRequest::new(input, output);
    if let Some(common_chars) = get_common_chars_option(&gateway.list_presets())? {
        let encoding = get_encoding_option()?;
        request = request.with_common_chars(common_chars, encoding);
    }

    print_summary(&config, &request);
    execute_with_logs(&gateway, request, config.no_progress)
}

fn print_summary(config: &AppConfig, request: &ConversionRequest) {
    println!("輸入字型：{}", request.input_path.display());
    println!("輸出檔案：{}", request.output_path.display());
    match &request.common_chars_path {
        Some(path) => println!("常用字檔：{}（{}）", path.display(), request.encoding),
        None => println!("常用字檔：無，完整轉換"),
    }
    log::debug!("執行模式：{:?}，平台：{}", config.runtime_mode, config.platform.os_id());
}

/// 回傳選擇的常用字檔；選擇完整轉換時為 None
pub fn get_common_chars_option(presets: &[Preset]) -> io::Result<Option<PathBuf>> {
    let mut items = vec!["不子集化（完整轉換）".to_string()];
    items.extend(presets.iter().map(|preset| preset.label.clone()));
    items.push("自訂常用字檔…".to_string());

    let choice = Select::new()
        .with_prompt("選擇常用字子集（使用方向鍵選擇，按 Enter 確認）")
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("常用字選擇失敗: {}", e)))?;

    Ok(match choice {
        0 => None,
        n if n <= presets.len() => Some(presets[n - 1].path.clone()),
        _ => Some(get_custom_common_chars_path()?),
    })
}

pub fn get_custom_common_chars_path() -> io::Result<PathBuf> {
    Input::<String>::new()
        .with_prompt("請輸入常用字檔路徑（每行或連續的文字皆可）")
        .validate_with(|input: &String| -> Result<(), String> {
            if Path::new(input).is_file() { Ok(()) } else { Err(format!("檔案 '{}' 不存在", input)) }
        })
        .interact_text()
        .map(PathBuf::from)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

pub fn get_encoding_option() -> io::Result<String> {
    Input::new()
        .with_prompt("輸入常用字檔編碼（預設為 utf-8）")
        .default("utf-8".to_string())
        .validate_with(|input: &String| -> Result<(), String> {
            validate_encoding(input).map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("編碼輸入失敗: {}", e)))
}

// 以終端提示代替檔案對話框；空白輸入視為取消
pub struct DialoguerPathPicker;

impl PathPickerTrait for DialoguerPathPicker {
    fn pick_input_path(&self) -> io::Result<Option<PathBuf>> {
        let input: String = Input::new()
            .with_prompt("請輸入字型檔路徑（.ttf 或 .otf，留空取消）")
            .allow_empty(true)
            .validate_with(|input: &String| -> Result<(), String> {
                if input.is_empty() || Path::new(input).is_file() {
                    Ok(())
                } else {
                    Err(format!("路徑 '{}' 不存在", input))
                }
            })
            .interact_text()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Ok(non_empty_path(&input))
    }

    fn pick_output_path(&self, suggested: Option<&Path>) -> io::Result<Option<PathBuf>> {
        let mut prompt = Input::<String>::new()
            .with_prompt("輸入輸出檔案路徑（.woff2）")
            .allow_empty(true);
        if let Some(path) = suggested {
            prompt = prompt.default(path.display().to_string());
        }
        let output = prompt
            .interact_text()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Ok(non_empty_path(&output))
    }
}

fn non_empty_path(input: &str) -> Option<PathBuf> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}
