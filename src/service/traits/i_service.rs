use std::io;
use std::path::{Path, PathBuf};
use crate::models::preset::Preset;

// 常用字預設服務接口
pub trait PresetCatalogTrait: Send + Sync {
    /// 列出目前磁碟上實際存在的預設
    /// # 回傳
    /// - 依宣告順序排列，每次呼叫都重新檢查檔案
    fn list_presets(&self) -> Vec<Preset>;
}

// 路徑選擇接口，對核心而言是不透明的對話框能力
pub trait PathPickerTrait: Send + Sync {
    /// 選擇要轉換的字型檔
    /// # 回傳
    /// - 使用者取消時為 None
    fn pick_input_path(&self) -> io::Result<Option<PathBuf>>;

    /// 選擇輸出位置，`suggested` 為建議的預設路徑
    fn pick_output_path(&self, suggested: Option<&Path>) -> io::Result<Option<PathBuf>>;
}
