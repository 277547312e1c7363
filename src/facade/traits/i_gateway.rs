use std::future::Future;
use std::path::{Path, PathBuf};
use crate::models::conversion::{ConversionRequest, ConversionResult};
use crate::models::preset::Preset;
use crate::service::log_channel::LogChannel;

// Gateway 接口，介面層唯一可以呼叫的操作集合
pub trait RequestGatewayTrait: Send + Sync + 'static {
    /// 執行一次轉換
    /// # 回傳
    /// - 恰好一個結果；所有失敗都收斂為 `ConversionResult::Failure`
    fn convert(&self, request: ConversionRequest) -> impl Future<Output = ConversionResult> + Send;

    fn list_presets(&self) -> Vec<Preset>;

    /// 委派給路徑選擇器，取消或失敗時為 None
    fn pick_input_path(&self) -> Option<PathBuf>;

    fn pick_output_path(&self, suggested: Option<&Path>) -> Option<PathBuf>;

    /// 轉換輸出的廣播通道，訂閱與取消訂閱都經由它
    fn log_channel(&self) -> &LogChannel;
}
