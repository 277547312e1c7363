//! 轉換輸出的廣播通道。
//!
//! 每個訂閱者登記一個 listener，`publish` 依登記順序同步呼叫；listener 回傳
//! `false` 代表對端已關閉，會在該次發佈後移除。呼叫 listener 時不持有登記表的鎖，
//! listener 內可以訂閱或取消訂閱。不保留歷史，晚加入的訂閱者只會看到之後的事件。

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use crate::models::log::LogEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

type Listener = Arc<Mutex<Box<dyn FnMut(&LogEvent) -> bool + Send>>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<SubscriptionId, Listener>,
}

#[derive(Clone, Default)]
pub struct LogChannel {
    registry: Arc<Mutex<Registry>>,
}

impl LogChannel {
    pub fn new() -> Self {
        LogChannel::default()
    }

    /// 登記 listener，回傳可重複呼叫的取消訂閱能力
    pub fn subscribe_with<L>(&self, listener: L) -> Unsubscribe
    where
        L: FnMut(&LogEvent) -> bool + Send + 'static,
    {
        let mut registry = self.registry.lock();
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        registry.listeners.insert(id, Arc::new(Mutex::new(Box::new(listener))));
        debug!("新增日誌訂閱 {:?}，目前共 {} 個", id, registry.listeners.len());
        Unsubscribe {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// 以佇列形式訂閱，由呼叫端自行取出事件
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = self.subscribe_with(move |event| sender.send(event.clone()).is_ok());
        Subscription { receiver, handle }
    }

    pub fn publish(&self, event: LogEvent) {
        let listeners: Vec<(SubscriptionId, Listener)> = self
            .registry
            .lock()
            .listeners
            .iter()
            .map(|(id, listener)| (*id, listener.clone()))
            .collect();

        let closed: Vec<SubscriptionId> = listeners
            .into_iter()
            .filter_map(|(id, listener)| {
                let mut call = listener.lock();
                if (*call)(&event) { None } else { Some(id) }
            })
            .collect();
        if closed.is_empty() {
            return;
        }

        let mut registry = self.registry.lock();
        for id in closed {
            if registry.listeners.remove(&id).is_some() {
                debug!("日誌訂閱 {:?} 已關閉，移除", id);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }
}

/// 取消訂閱的能力；可複製，重複呼叫或通道已不存在時皆安全
#[derive(Clone)]
pub struct Unsubscribe {
    id: SubscriptionId,
    registry: Weak<Mutex<Registry>>,
}

impl Unsubscribe {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// 回傳這次呼叫是否真的移除了訂閱
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let removed = registry.lock().listeners.remove(&self.id).is_some();
        if removed {
            debug!("取消日誌訂閱 {:?}", self.id);
        }
        removed
    }
}

/// 佇列式訂閱；drop 時自動取消訂閱
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<LogEvent>,
    handle: Unsubscribe,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.handle.id
    }

    pub fn handle(&self) -> Unsubscribe {
        self.handle.clone()
    }

    /// 取消訂閱後仍可取出已排入佇列的事件，取完回傳 None
    pub async fn recv(&mut self) -> Option<LogEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<LogEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(&self) -> bool {
        self.handle.unsubscribe()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}
