use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn enabled() -> bool {
    true
}

/// 一次轉換請求，送出後不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default)]
    pub common_chars_path: Option<PathBuf>,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default)]
    pub common_text: Option<String>,
    #[serde(default = "enabled")]
    pub include_basic_ascii: bool,
    #[serde(default = "enabled")]
    pub include_basic_cjk_punct: bool,
}

impl ConversionRequest {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        ConversionRequest {
            input_path: input_path.into(),
            output_path: output_path.into(),
            common_chars_path: None,
            encoding: default_encoding(),
            common_text: None,
            include_basic_ascii: true,
            include_basic_cjk_punct: true,
        }
    }

    pub fn with_common_chars(mut self, path: impl Into<PathBuf>, encoding: impl Into<String>) -> Self {
        self.common_chars_path = Some(path.into());
        self.encoding = encoding.into();
        self
    }
}

/// 每個被接受的請求恰好產生一個結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConversionResult {
    Success,
    Failure { message: String },
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success)
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            ConversionResult::Success => None,
            ConversionResult::Failure { message } => Some(message),
        }
    }
}
