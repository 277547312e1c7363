//! JSON-lines IPC 宿主，讓前端介面透過 stdin/stdout 呼叫 Gateway。
//!
//! 每行一個請求 `{"id", "method", "params"}`，回應為 `{"id", "result"}` 或
//! `{"id", "error"}`；訂閱後的引擎輸出以 `{"event": "log", ...}` 推送。
//! `ready` 與 `windowClosed` 是視窗生命週期訊息，其餘方法必須先經由
//! `ready` 註冊才能呼叫。

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use crate::facade::error::GatewayError;
use crate::facade::ipc_registry::{IpcRegistry, Operation};
use crate::facade::session::{Session, WindowId};
use crate::facade::traits::i_gateway::RequestGatewayTrait;
use crate::models::conversion::ConversionRequest;
use crate::service::log_channel::Unsubscribe;
use crate::service::traits::i_service::PathPickerTrait;

const READY: &str = "ready";
const WINDOW_CLOSED: &str = "windowClosed";

#[derive(Debug, Deserialize)]
struct IpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct WindowParams {
    #[serde(default)]
    window: Option<WindowId>,
}

#[derive(Debug, Deserialize)]
struct PickOutputParams {
    #[serde(default)]
    suggested: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct UnsubscribeParams {
    subscription: u64,
}

/// 無介面時沒有檔案對話框，一律視為使用者取消
pub struct HeadlessPathPicker;

impl PathPickerTrait for HeadlessPathPicker {
    fn pick_input_path(&self) -> io::Result<Option<PathBuf>> {
        debug!("IPC 模式不提供檔案對話框");
        Ok(None)
    }

    fn pick_output_path(&self, _suggested: Option<&Path>) -> io::Result<Option<PathBuf>> {
        debug!("IPC 模式不提供檔案對話框");
        Ok(None)
    }
}

/// 處理一條 IPC 連線直到輸入結束，回傳輸出端
pub async fn serve<G, R, W>(gateway: Arc<G>, input: R, output: W) -> io::Result<W>
where
    G: RequestGatewayTrait,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out, messages) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_lines(output, messages));
    let mut connection = Connection::new(gateway, out);

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        connection.handle_line(&line);
    }
    connection.shutdown().await;
    drop(connection);

    writer
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("IPC 輸出工作異常結束: {}", e)))?
}

async fn write_lines<W>(mut output: W, mut messages: mpsc::UnboundedReceiver<Value>) -> io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = messages.recv().await {
        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
    }
    Ok(output)
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, GatewayError> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| GatewayError::InvalidParams(e.to_string()))
}

struct Connection<G> {
    gateway: Arc<G>,
    out: mpsc::UnboundedSender<Value>,
    session: Session,
    registry: IpcRegistry,
    subscriptions: HashMap<u64, Unsubscribe>,
    next_subscription: u64,
    next_window: u64,
    jobs: JoinSet<()>,
}

impl<G: RequestGatewayTrait> Connection<G> {
    fn new(gateway: Arc<G>, out: mpsc::UnboundedSender<Value>) -> Self {
        Connection {
            gateway,
            out,
            session: Session::new(),
            registry: IpcRegistry::new(),
            subscriptions: HashMap::new(),
            next_subscription: 0,
            next_window: 0,
            jobs: JoinSet::new(),
        }
    }

    fn handle_line(&mut self, line: &str) {
        // 回收已完成的轉換 task
        while self.jobs.try_join_next().is_some() {}

        let request: IpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("無法解析 IPC 請求：{}", e);
                self.reply_error(Value::Null, GatewayError::InvalidParams(e.to_string()));
                return;
            }
        };
        debug!("IPC 請求：{} (id={})", request.method, request.id);

        let IpcRequest { id, method, params } = request;
        let outcome = match method.as_str() {
            READY => self.window_ready(params),
            WINDOW_CLOSED => self.window_closed(params),
            _ => self
                .registry
                .resolve(&method)
                .and_then(|operation| self.dispatch(operation, id.clone(), params)),
        };
        match outcome {
            Ok(Some(result)) => self.reply(id, result),
            Ok(None) => {}
            Err(e) => {
                warn!("IPC 請求 {} 失敗：{}", method, e);
                self.reply_error(id, e);
            }
        }
    }

    fn window_ready(&mut self, params: Value) -> Result<Option<Value>, GatewayError> {
        let params: WindowParams = parse_params(params)?;
        let window = match params.window {
            Some(window) => window,
            None => {
                self.next_window += 1;
                WindowId(self.next_window)
            }
        };
        self.session.window_ready(window, &mut self.registry)?;
        Ok(Some(json!({ "window": window, "operations": self.registry.len() })))
    }

    fn window_closed(&mut self, params: Value) -> Result<Option<Value>, GatewayError> {
        let params: WindowParams = parse_params(params)?;
        if let Some(window) = params.window {
            self.session.window_closed(window);
        }
        Ok(Some(json!({ "activeWindow": self.session.active_window() })))
    }

    /// 轉換在背景執行並於完成時回覆，其餘操作立即回覆
    fn dispatch(&mut self, operation: Operation, id: Value, params: Value) -> Result<Option<Value>, GatewayError> {
        match operation {
            Operation::Convert => {
                let request: ConversionRequest = parse_params(params)?;
                let gateway = self.gateway.clone();
                let out = self.out.clone();
                self.jobs.spawn(async move {
                    let result = gateway.convert(request).await;
                    let _ = out.send(json!({ "id": id, "result": result }));
                });
                Ok(None)
            }
            Operation::ListPresets => Ok(Some(json!(self.gateway.list_presets()))),
            Operation::PickInputPath => Ok(Some(json!(self.gateway.pick_input_path()))),
            Operation::PickOutputPath => {
                let params: PickOutputParams = parse_params(params)?;
                Ok(Some(json!(self.gateway.pick_output_path(params.suggested.as_deref()))))
            }
            Operation::SubscribeLogs => {
                self.next_subscription += 1;
                let subscription = self.next_subscription;
                let out = self.out.clone();
                let handle = self.gateway.log_channel().subscribe_with(move |event| {
                    out.send(json!({
                        "event": "log",
                        "subscription": subscription,
                        "job": event.job,
                        "source": event.source,
                        "text": event.text,
                    }))
                    .is_ok()
                });
                self.subscriptions.insert(subscription, handle);
                Ok(Some(json!({ "subscription": subscription })))
            }
            Operation::UnsubscribeLogs => {
                let params: UnsubscribeParams = parse_params(params)?;
                let removed = self
                    .subscriptions
                    .remove(&params.subscription)
                    .map(|handle| handle.unsubscribe())
                    .unwrap_or(false);
                Ok(Some(json!({ "removed": removed })))
            }
        }
    }

    fn reply(&self, id: Value, result: Value) {
        let _ = self.out.send(json!({ "id": id, "result": result }));
    }

    fn reply_error(&self, id: Value, error: GatewayError) {
        let _ = self.out.send(json!({ "id": id, "error": error.to_string() }));
    }

    /// 等候進行中的轉換回覆完畢，再取消所有訂閱
    async fn shutdown(&mut self) {
        while self.jobs.join_next().await.is_some() {}
        for (_, handle) in self.subscriptions.drain() {
            handle.unsubscribe();
        }
        info!("IPC 連線結束");
    }
}
