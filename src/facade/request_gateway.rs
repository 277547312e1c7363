use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use log::{info, warn};
use tokio::sync::Semaphore;
use crate::config::config::ConcurrencyPolicy;
use crate::config::ports::AppConfig;
use crate::facade::traits::i_gateway::RequestGatewayTrait;
use crate::models::conversion::{ConversionRequest, ConversionResult};
use crate::models::engine::EngineInvocation;
use crate::models::log::JobId;
use crate::models::preset::Preset;
use crate::service::engine_locator::EngineLocator;
use crate::service::job_runner::{JobError, JobRunner};
use crate::service::log_channel::LogChannel;
use crate::service::preset_catalog::{preset_base_dir, PresetCatalog};
use crate::service::traits::i_service::{PathPickerTrait, PresetCatalogTrait};

/// Gateway，組合引擎定位、常用字預設、轉換工作與日誌通道
pub struct RequestGateway {
    invocation: EngineInvocation,
    catalog: Box<dyn PresetCatalogTrait>,
    picker: Box<dyn PathPickerTrait>,
    runner: JobRunner,
    channel: LogChannel,
    slot: Option<Semaphore>,
    next_job: AtomicU64,
}

impl RequestGateway {
    /// 依配置建立 Gateway；引擎啟動方式在此決定一次
    pub fn new(config: &AppConfig, picker: Box<dyn PathPickerTrait>) -> Self {
        let locator = EngineLocator::new(config.project_root.clone(), config.resources_dir.clone());
        let invocation = locator.resolve(config.runtime_mode, &config.platform);
        let catalog = PresetCatalog::new(preset_base_dir(
            config.runtime_mode,
            &config.project_root,
            &config.resources_dir,
        ));
        info!(
            "Gateway 就緒：模式 {:?}，平台 {}，引擎 {}",
            config.runtime_mode,
            config.platform.os_id(),
            invocation.command.display()
        );
        RequestGateway::from_parts(
            invocation,
            Box::new(catalog),
            picker,
            config.concurrency,
            config.job_timeout,
        )
    }

    pub fn from_parts(
        invocation: EngineInvocation,
        catalog: Box<dyn PresetCatalogTrait>,
        picker: Box<dyn PathPickerTrait>,
        concurrency: ConcurrencyPolicy,
        job_timeout: Option<Duration>,
    ) -> Self {
        let channel = LogChannel::new();
        let slot = match concurrency {
            ConcurrencyPolicy::SingleFlight => Some(Semaphore::new(1)),
            ConcurrencyPolicy::Unbounded => None,
        };
        RequestGateway {
            invocation,
            catalog,
            picker,
            runner: JobRunner::new(channel.clone(), job_timeout),
            channel,
            slot,
            next_job: AtomicU64::new(0),
        }
    }

    pub fn invocation(&self) -> &EngineInvocation {
        &self.invocation
    }
}

impl RequestGatewayTrait for RequestGateway {
    async fn convert(&self, request: ConversionRequest) -> ConversionResult {
        let job = JobId(self.next_job.fetch_add(1, Ordering::Relaxed) + 1);
        let _permit = match &self.slot {
            Some(slot) => match slot.try_acquire() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    warn!("[{}] 已有轉換進行中，拒絕請求：{}", job, request.input_path.display());
                    return JobError::Busy.into();
                }
            },
            None => None,
        };
        info!("[{}] 開始轉換：{} → {}", job, request.input_path.display(), request.output_path.display());
        self.runner.run(job, &request, &self.invocation).await
    }

    fn list_presets(&self) -> Vec<Preset> {
        self.catalog.list_presets()
    }

    fn pick_input_path(&self) -> Option<PathBuf> {
        self.picker.pick_input_path().unwrap_or_else(|e| {
            warn!("選擇輸入檔失敗：{}", e);
            None
        })
    }

    fn pick_output_path(&self, suggested: Option<&Path>) -> Option<PathBuf> {
        self.picker.pick_output_path(suggested).unwrap_or_else(|e| {
            warn!("選擇輸出位置失敗：{}", e);
            None
        })
    }

    fn log_channel(&self) -> &LogChannel {
        &self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::ffi::OsString;
    use std::io;
    use crate::config::config::{Platform, RuntimeMode};
    use crate::models::log::{LogEvent, LogSource};

    struct FixedPicker;

    impl PathPickerTrait for FixedPicker {
        fn pick_input_path(&self) -> io::Result<Option<PathBuf>> {
            Ok(Some(PathBuf::from("/fonts/a.ttf")))
        }

        fn pick_output_path(&self, _suggested: Option<&Path>) -> io::Result<Option<PathBuf>> {
            Err(io::Error::new(io::ErrorKind::Other, "dialog crashed"))
        }
    }

    struct OnePreset;

    impl PresetCatalogTrait for OnePreset {
        fn list_presets(&self) -> Vec<Preset> {
            vec![Preset { id: "common-3500".into(), label: "常用字 3500".into(), path: PathBuf::from("/p/3500.txt") }]
        }
    }

    fn gateway(invocation: EngineInvocation, concurrency: ConcurrencyPolicy) -> RequestGateway {
        RequestGateway::from_parts(invocation, Box::new(OnePreset), Box::new(FixedPicker), concurrency, None)
    }

    fn request() -> ConversionRequest {
        ConversionRequest::new("a.ttf", "a.woff2")
    }

    #[cfg(unix)]
    fn sh(script: &str) -> EngineInvocation {
        EngineInvocation {
            command: PathBuf::from("sh"),
            args_prefix: vec![OsString::from("-c"), OsString::from(script), OsString::from("engine")],
            working_directory: None,
        }
    }

    fn drain(subscription: &mut crate::service::log_channel::Subscription) -> Vec<LogEvent> {
        let mut events = Vec::new();
        while let Some(event) = subscription.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn new_resolves_the_engine_once_from_config() {
        let config = AppConfig {
            runtime_mode: RuntimeMode::Packaged,
            platform: Platform::Windows,
            project_root: PathBuf::from("/src/app"),
            resources_dir: PathBuf::from("/opt/app/resources"),
            concurrency: ConcurrencyPolicy::SingleFlight,
            job_timeout: None,
            no_progress: true,
        };
        let gateway = RequestGateway::new(&config, Box::new(FixedPicker));
        assert_eq!(
            gateway.invocation().command,
            PathBuf::from("/opt/app/resources/engine/windows/ttf2woff2.exe")
        );
        assert!(gateway.invocation().args_prefix.is_empty());
    }

    #[test]
    fn presets_and_pickers_are_delegated() {
        let gateway = gateway(missing_engine(), ConcurrencyPolicy::SingleFlight);
        assert_eq!(gateway.list_presets()[0].id, "common-3500");
        assert_eq!(gateway.pick_input_path(), Some(PathBuf::from("/fonts/a.ttf")));
        assert_eq!(gateway.pick_output_path(None), None);
    }

    fn missing_engine() -> EngineInvocation {
        EngineInvocation {
            command: PathBuf::from("/definitely/not/installed/ttf2woff2"),
            args_prefix: Vec::new(),
            working_directory: None,
        }
    }

    #[tokio::test]
    async fn missing_engine_resolves_to_failure_without_logs() {
        let gateway = gateway(missing_engine(), ConcurrencyPolicy::SingleFlight);
        let mut subscription = gateway.log_channel().subscribe();
        let result = gateway.convert(request()).await;
        assert!(result.failure_message().unwrap_or_default().contains("failed to start"));
        assert!(drain(&mut subscription).is_empty());

        // 失敗後工作槽已釋放
        let again = gateway.convert(request()).await;
        assert!(again.failure_message().unwrap_or_default().contains("failed to start"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn logs_arrive_before_success() {
        let gateway = gateway(sh("printf done"), ConcurrencyPolicy::SingleFlight);
        let mut subscription = gateway.log_channel().subscribe();
        let result = gateway.convert(request()).await;
        assert_eq!(result, ConversionResult::Success);
        let events = drain(&mut subscription);
        let stdout: String = events.iter().filter(|e| e.source == LogSource::Stdout).map(|e| e.text.as_str()).collect();
        assert_eq!(stdout, "done");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_code_failure_is_reported() {
        let gateway = gateway(sh("exit 2"), ConcurrencyPolicy::SingleFlight);
        let result = gateway.convert(request()).await;
        assert!(result.failure_message().unwrap_or_default().contains("code=2"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn single_flight_rejects_a_second_job() {
        let gateway = gateway(sh("sleep 0.3; printf done"), ConcurrencyPolicy::SingleFlight);
        let (first, second) = tokio::join!(gateway.convert(request()), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            gateway.convert(request()).await
        });
        assert_eq!(first, ConversionResult::Success);
        assert!(second.failure_message().unwrap_or_default().contains("already running"));

        // 第一個完成後可以再次轉換
        assert_eq!(gateway.convert(request()).await, ConversionResult::Success);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unbounded_jobs_run_together_with_labelled_logs() {
        let gateway = gateway(sh("printf start; sleep 0.2; printf end"), ConcurrencyPolicy::Unbounded);
        let mut subscription = gateway.log_channel().subscribe();
        let (first, second) = tokio::join!(gateway.convert(request()), gateway.convert(request()));
        assert_eq!(first, ConversionResult::Success);
        assert_eq!(second, ConversionResult::Success);

        let events = drain(&mut subscription);
        let jobs: BTreeSet<JobId> = events.iter().map(|e| e.job).collect();
        assert_eq!(jobs.len(), 2);
        for job in jobs {
            let text: String = events.iter().filter(|e| e.job == job).map(|e| e.text.as_str()).collect();
            assert_eq!(text, "startend");
        }
    }
}
