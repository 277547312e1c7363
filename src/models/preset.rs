use serde::Serialize;
use std::path::PathBuf;

/// 內建常用字表的宣告
#[derive(Debug, Clone, Copy)]
pub struct PresetSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub filename: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub id: String,
    pub label: String,
    pub path: PathBuf,
}
