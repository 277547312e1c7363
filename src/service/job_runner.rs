//! 單一轉換工作的生命週期：組參數、啟動引擎、轉送輸出、判定結果。
//!
//! stdout 與 stderr 各由一個 task 讀取，每讀到一段就立即發佈到
//! [`LogChannel`]；兩個描述符之間不保證順序。結果只在兩條管線都讀完之後
//! 才回傳，因此所有輸出事件都會早於結果被發佈。
//!
//! Unix 上引擎在自己的 process group 中啟動；設定逾時時，等待結束與讀完管線
//! 都算在時限內，逾時後整個 group 一起終止，連同引擎啟動的子行程。

use std::ffi::OsString;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use log::{error, info, warn};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use crate::models::conversion::{ConversionRequest, ConversionResult};
use crate::models::engine::EngineInvocation;
use crate::models::log::{JobId, LogEvent, LogSource};
use crate::service::log_channel::LogChannel;
use crate::utils::utf8::Utf8Chunker;

const READ_CHUNK_SIZE: usize = 8 * 1024;
/// 逾時終止引擎後，等待管線收尾的時間
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// 轉換失敗的分類；`Display` 的文字即回傳給介面的失敗訊息
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to start conversion process: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed to wait for conversion process: {0}")]
    Wait(#[source] io::Error),
    #[error("conversion process exited with code={0}")]
    ExitCode(i32),
    #[error("conversion process terminated by signal={0}")]
    Signal(String),
    #[error("conversion process timed out after {} seconds", format_seconds(.0))]
    Timeout(Duration),
    #[error("another conversion is already running")]
    Busy,
}

fn format_seconds(limit: &Duration) -> String {
    if limit.subsec_nanos() == 0 {
        limit.as_secs().to_string()
    } else {
        format!("{}", limit.as_secs_f64())
    }
}

impl From<JobError> for ConversionResult {
    fn from(err: JobError) -> Self {
        ConversionResult::Failure { message: err.to_string() }
    }
}

/// 組出引擎參數，每個值都是獨立元素，路徑含空白或特殊字元也不需轉義
pub fn build_args(invocation: &EngineInvocation, request: &ConversionRequest) -> Vec<OsString> {
    let mut args = invocation.args_prefix.clone();
    args.push("--input".into());
    args.push(request.input_path.clone().into_os_string());
    args.push("--output".into());
    args.push(request.output_path.clone().into_os_string());
    if let Some(path) = &request.common_chars_path {
        args.push("--common-chars".into());
        args.push(path.clone().into_os_string());
    }
    if !request.encoding.is_empty() {
        args.push("--encoding".into());
        args.push(request.encoding.clone().into());
    }
    if let Some(text) = &request.common_text {
        args.push("--common-text".into());
        args.push(text.into());
    }
    if !request.include_basic_ascii {
        args.push("--no-basic-ascii".into());
    }
    if !request.include_basic_cjk_punct {
        args.push("--no-basic-cjk-punct".into());
    }
    args
}

pub struct JobRunner {
    channel: LogChannel,
    timeout: Option<Duration>,
}

impl JobRunner {
    pub fn new(channel: LogChannel, timeout: Option<Duration>) -> Self {
        JobRunner { channel, timeout }
    }

    /// 執行一次轉換，恰好回傳一個結果
    pub async fn run(&self, job: JobId, request: &ConversionRequest, invocation: &EngineInvocation) -> ConversionResult {
        match self.execute(job, request, invocation).await {
            Ok(()) => {
                info!("[{}] 轉換完成：{}", job, request.output_path.display());
                ConversionResult::Success
            }
            Err(e) => {
                error!("[{}] 轉換失敗：{}", job, e);
                e.into()
            }
        }
    }

    async fn execute(&self, job: JobId, request: &ConversionRequest, invocation: &EngineInvocation) -> Result<(), JobError> {
        let args = build_args(invocation, request);
        info!("[{}] 啟動轉換引擎：{} {:?}", job, invocation.command.display(), args);

        let mut command = Command::new(&invocation.command);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_directory {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(JobError::Spawn)?;
        let pid = child.id();
        let mut readers: Vec<JoinHandle<()>> = [
            child.stdout.take().map(|out| self.forward(job, LogSource::Stdout, out)),
            child.stderr.take().map(|err| self.forward(job, LogSource::Stderr, err)),
        ]
        .into_iter()
        .flatten()
        .collect();

        let finished = async {
            let status = child.wait().await;
            for reader in readers.iter_mut() {
                let _ = reader.await;
            }
            status
        };
        let status = match self.timeout {
            None => finished.await,
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, finished).await;
                match outcome {
                    Ok(status) => status,
                    Err(_) => {
                        warn!("[{}] 轉換超過 {} 秒，終止引擎", job, format_seconds(&limit));
                        terminate(job, pid, &mut child).await;
                        drain(readers, DRAIN_GRACE).await;
                        return Err(JobError::Timeout(limit));
                    }
                }
            }
        };
        classify(status.map_err(JobError::Wait)?)
    }

    fn forward<R>(&self, job: JobId, source: LogSource, reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let channel = self.channel.clone();
        tokio::spawn(async move {
            if let Err(e) = forward_stream(job, source, reader, &channel).await {
                warn!("[{}] 讀取 {:?} 失敗：{}", job, source, e);
            }
        })
    }
}

/// 終止整個引擎行程樹；引擎本身可能已結束，只剩子行程還握著管線
async fn terminate(job: JobId, pid: Option<u32>, child: &mut Child) {
    kill_process_group(job, pid);
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.kill().await {
        warn!("[{}] 終止引擎失敗：{}", job, e);
    }
}

#[cfg(unix)]
fn kill_process_group(job: JobId, pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // group id 即引擎的 pid
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!("[{}] 終止引擎 process group 失敗：{}", job, err);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_job: JobId, _pid: Option<u32>) {}

async fn forward_stream<R>(job: JobId, source: LogSource, mut reader: R, channel: &LogChannel) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];
    let mut chunker = Utf8Chunker::new();
    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        let text = chunker.push(&buffer[..read]);
        if !text.is_empty() {
            channel.publish(LogEvent { job, source, text });
        }
    }
    if let Some(text) = chunker.finish() {
        channel.publish(LogEvent { job, source, text });
    }
    Ok(())
}

/// 給讀取 task 一段時間收尾，仍未結束就中止
async fn drain(readers: Vec<JoinHandle<()>>, grace: Duration) {
    for reader in readers {
        if reader.is_finished() {
            continue;
        }
        let abort = reader.abort_handle();
        if tokio::time::timeout(grace, reader).await.is_err() {
            abort.abort();
        }
    }
}

fn classify(status: ExitStatus) -> Result<(), JobError> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(JobError::ExitCode(code)),
        None => Err(JobError::Signal(signal_name(status))),
    }
}

#[cfg(unix)]
const SIGNAL_NAMES: &[(libc::c_int, &str)] = &[
    (libc::SIGHUP, "SIGHUP"),
    (libc::SIGINT, "SIGINT"),
    (libc::SIGQUIT, "SIGQUIT"),
    (libc::SIGILL, "SIGILL"),
    (libc::SIGTRAP, "SIGTRAP"),
    (libc::SIGABRT, "SIGABRT"),
    (libc::SIGBUS, "SIGBUS"),
    (libc::SIGFPE, "SIGFPE"),
    (libc::SIGKILL, "SIGKILL"),
    (libc::SIGUSR1, "SIGUSR1"),
    (libc::SIGSEGV, "SIGSEGV"),
    (libc::SIGUSR2, "SIGUSR2"),
    (libc::SIGPIPE, "SIGPIPE"),
    (libc::SIGALRM, "SIGALRM"),
    (libc::SIGTERM, "SIGTERM"),
    (libc::SIGCHLD, "SIGCHLD"),
    (libc::SIGCONT, "SIGCONT"),
    (libc::SIGSTOP, "SIGSTOP"),
    (libc::SIGTSTP, "SIGTSTP"),
    (libc::SIGTTIN, "SIGTTIN"),
    (libc::SIGTTOU, "SIGTTOU"),
    (libc::SIGURG, "SIGURG"),
    (libc::SIGXCPU, "SIGXCPU"),
    (libc::SIGXFSZ, "SIGXFSZ"),
    (libc::SIGVTALRM, "SIGVTALRM"),
    (libc::SIGPROF, "SIGPROF"),
    (libc::SIGWINCH, "SIGWINCH"),
    (libc::SIGIO, "SIGIO"),
    (libc::SIGSYS, "SIGSYS"),
];

/// 訊號編號依平台而異，表中沒有的以 `SIG<n>` 表示
#[cfg(unix)]
fn signal_label(signal: libc::c_int) -> String {
    SIGNAL_NAMES
        .iter()
        .find(|(number, _)| *number == signal)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("SIG{}", signal))
}

#[cfg(unix)]
fn signal_name(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => signal_label(signal),
        None => "unknown".to_string(),
    }
}

#[cfg(not(unix))]
fn signal_name(_status: ExitStatus) -> String {
    "unknown".to_string()
}
