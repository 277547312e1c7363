use std::io::{self, Write};
use std::time::Duration;
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use crate::models::conversion::ConversionResult;
use crate::models::log::{LogEvent, LogSource};

pub fn setup_logging(log_level: &str) -> io::Result<()> {
    let log_level_filter = match log_level {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };
    // stdout 保留給引擎輸出與 IPC，日誌一律寫到 stderr
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("日誌初始化失敗: {}", e)))
}

/// 在終端顯示引擎輸出，並以 spinner 表示轉換仍在進行
pub struct LogPrinter {
    pb: ProgressBar,
    chunks: u64,
}

impl LogPrinter {
    pub fn new(no_progress: bool) -> Self {
        let pb = if no_progress {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} {msg} [{elapsed}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb.set_message("轉換中");
            pb
        };
        LogPrinter { pb, chunks: 0 }
    }

    pub fn print(&mut self, event: &LogEvent) {
        self.chunks += 1;
        self.pb.suspend(|| {
            let written = match event.source {
                LogSource::Stdout => {
                    let mut out = io::stdout().lock();
                    out.write_all(event.text.as_bytes()).and_then(|_| out.flush())
                }
                LogSource::Stderr => {
                    let mut err = io::stderr().lock();
                    err.write_all(event.text.as_bytes()).and_then(|_| err.flush())
                }
            };
            if let Err(e) = written {
                log::warn!("寫出引擎輸出失敗：{}", e);
            }
        });
        self.pb.set_message(format!("轉換中，已接收 {} 段輸出", self.chunks));
    }

    pub fn finish(&self, result: &ConversionResult) {
        match result {
            ConversionResult::Success => self.pb.finish_with_message("轉換完成"),
            ConversionResult::Failure { message } => self.pb.abandon_with_message(format!("轉換失敗：{}", message)),
        }
    }
}

pub fn format_file_size(size: u64) -> String {
    if size < 1024 * 1024 {
        format!("{:.2} KB", size as f64 / 1024.0)
    } else {
        format!("{:.2} MB", size as f64 / (1024.0 * 1024.0))
    }
}
