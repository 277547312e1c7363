use log::{debug, info};
use serde::{Deserialize, Serialize};
use crate::facade::error::GatewayError;
use crate::facade::ipc_registry::{IpcRegistry, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

/// 宿主行程的工作階段：啟動時建立一次，記錄 IPC 是否已註冊與目前作用中的視窗
#[derive(Debug, Default)]
pub struct Session {
    registered: bool,
    active_window: Option<WindowId>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// 視窗就緒時呼叫；重建視窗或重複進入就緒狀態只會切換作用中視窗，不會重複註冊
    pub fn window_ready(&mut self, window: WindowId, registry: &mut IpcRegistry) -> Result<(), GatewayError> {
        self.active_window = Some(window);
        if self.registered {
            debug!("視窗 {:?} 就緒，IPC 操作已註冊，略過", window);
            return Ok(());
        }
        for operation in Operation::ALL {
            registry.register(operation)?;
        }
        self.registered = true;
        info!("視窗 {:?} 就緒，已註冊 {} 個 IPC 操作", window, registry.len());
        Ok(())
    }

    pub fn window_closed(&mut self, window: WindowId) {
        if self.active_window == Some(window) {
            self.active_window = None;
        }
    }

    pub fn active_window(&self) -> Option<WindowId> {
        self.active_window
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_ready_registers_everything() {
        let mut session = Session::new();
        let mut registry = IpcRegistry::new();
        session.window_ready(WindowId(1), &mut registry).unwrap();
        assert!(session.is_registered());
        assert_eq!(registry.len(), Operation::ALL.len());
        assert_eq!(session.active_window(), Some(WindowId(1)));
    }

    #[test]
    fn recreated_window_does_not_register_twice() {
        let mut session = Session::new();
        let mut registry = IpcRegistry::new();
        session.window_ready(WindowId(1), &mut registry).unwrap();
        session.window_closed(WindowId(1));
        assert_eq!(session.active_window(), None);

        session.window_ready(WindowId(2), &mut registry).unwrap();
        session.window_ready(WindowId(2), &mut registry).unwrap();
        assert_eq!(registry.len(), Operation::ALL.len());
        assert_eq!(session.active_window(), Some(WindowId(2)));
    }

    #[test]
    fn closing_another_window_keeps_the_active_one() {
        let mut session = Session::new();
        let mut registry = IpcRegistry::new();
        session.window_ready(WindowId(3), &mut registry).unwrap();
        session.window_closed(WindowId(9));
        assert_eq!(session.active_window(), Some(WindowId(3)));
    }

    #[test]
    fn registration_conflict_surfaces_as_error() {
        let mut registry = IpcRegistry::new();
        registry.register(Operation::Convert).unwrap();
        let mut session = Session::new();
        let err = session.window_ready(WindowId(1), &mut registry).unwrap_err();
        assert!(matches!(err, GatewayError::DuplicateRegistration("convert")));
        assert!(!session.is_registered());
    }
}
