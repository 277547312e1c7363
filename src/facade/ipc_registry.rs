use std::collections::HashMap;
use log::debug;
use crate::facade::error::GatewayError;

/// Gateway 對外公開的 IPC 操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Convert,
    ListPresets,
    PickInputPath,
    PickOutputPath,
    SubscribeLogs,
    UnsubscribeLogs,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Convert,
        Operation::ListPresets,
        Operation::PickInputPath,
        Operation::PickOutputPath,
        Operation::SubscribeLogs,
        Operation::UnsubscribeLogs,
    ];

    pub fn method(self) -> &'static str {
        match self {
            Operation::Convert => "convert",
            Operation::ListPresets => "listPresets",
            Operation::PickInputPath => "pickInputPath",
            Operation::PickOutputPath => "pickOutputPath",
            Operation::SubscribeLogs => "subscribeLogs",
            Operation::UnsubscribeLogs => "unsubscribeLogs",
        }
    }
}

/// 宿主端的方法表；同一方法註冊兩次會直接失敗
#[derive(Debug, Default)]
pub struct IpcRegistry {
    handlers: HashMap<&'static str, Operation>,
}

impl IpcRegistry {
    pub fn new() -> Self {
        IpcRegistry::default()
    }

    pub fn register(&mut self, operation: Operation) -> Result<(), GatewayError> {
        let method = operation.method();
        if self.handlers.contains_key(method) {
            return Err(GatewayError::DuplicateRegistration(method));
        }
        self.handlers.insert(method, operation);
        debug!("註冊 IPC 操作：{}", method);
        Ok(())
    }

    pub fn resolve(&self, method: &str) -> Result<Operation, GatewayError> {
        self.handlers
            .get(method)
            .copied()
            .ok_or_else(|| GatewayError::UnknownOperation(method.to_string()))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_methods_resolve() {
        let mut registry = IpcRegistry::new();
        registry.register(Operation::Convert).unwrap();
        assert_eq!(registry.resolve("convert").unwrap(), Operation::Convert);
        assert!(matches!(registry.resolve("listPresets"), Err(GatewayError::UnknownOperation(m)) if m == "listPresets"));
    }

    #[test]
    fn duplicate_registration_fails_loudly() {
        let mut registry = IpcRegistry::new();
        registry.register(Operation::ListPresets).unwrap();
        let err = registry.register(Operation::ListPresets).unwrap_err();
        assert!(matches!(err, GatewayError::DuplicateRegistration("listPresets")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn method_names_are_unique() {
        let mut registry = IpcRegistry::new();
        for operation in Operation::ALL {
            registry.register(operation).unwrap();
        }
        assert_eq!(registry.len(), Operation::ALL.len());
    }
}
