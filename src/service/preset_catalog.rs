use std::path::{Path, PathBuf};
use log::debug;
use crate::config::config::RuntimeMode;
use crate::models::preset::{Preset, PresetSpec};
use crate::service::traits::i_service::PresetCatalogTrait;

/// 內建常用字表，依宣告順序列出
pub const BUILTIN_PRESETS: &[PresetSpec] = &[
    PresetSpec { id: "common-3500", label: "常用字 3500", filename: "common_chars_3500.txt" },
    PresetSpec { id: "common-7000", label: "常用字 7000", filename: "common_chars_7000.txt" },
];

const PRESET_DIR: &str = "presets";

/// 常用字預設目錄：打包後在資源目錄下，開發時在原始碼樹的 resources 下
pub fn preset_base_dir(mode: RuntimeMode, project_root: &Path, resources_dir: &Path) -> PathBuf {
    match mode {
        RuntimeMode::Packaged => resources_dir.join(PRESET_DIR),
        RuntimeMode::Development => project_root.join("resources").join(PRESET_DIR),
    }
}

pub struct PresetCatalog {
    base_dir: PathBuf,
    specs: &'static [PresetSpec],
}

impl PresetCatalog {
    pub fn new(base_dir: PathBuf) -> Self {
        PresetCatalog { base_dir, specs: BUILTIN_PRESETS }
    }

    pub fn with_specs(base_dir: PathBuf, specs: &'static [PresetSpec]) -> Self {
        PresetCatalog { base_dir, specs }
    }
}

impl PresetCatalogTrait for PresetCatalog {
    fn list_presets(&self) -> Vec<Preset> {
        let presets: Vec<Preset> = self
            .specs
            .iter()
            .map(|spec| (spec, self.base_dir.join(spec.filename)))
            .filter(|(_, path)| path.is_file())
            .map(|(spec, path)| Preset {
                id: spec.id.to_string(),
                label: spec.label.to_string(),
                path,
            })
            .collect();
        debug!("{} 下可用的常用字預設：{} 個", self.base_dir.display(), presets.len());
        presets
    }
}
