
pub mod config {
    pub mod config;
    pub mod ports;
}

pub mod models {
    pub mod conversion;
    pub mod engine;
    pub mod log;
    pub mod preset;
}

pub mod service {
    pub mod config_service;
    pub mod engine_locator;
    pub mod job_runner;
    pub mod log_channel;
    pub mod preset_catalog;
    pub mod traits {
        pub mod i_service;
    }
}

pub mod facade {
    pub mod error;
    pub mod ipc_registry;
    pub mod request_gateway;
    pub mod session;
    pub mod traits {
        pub mod i_gateway;
    }
}

pub mod action {
    pub mod cli;
    pub mod interactive;
    pub mod ipc;
}

pub mod utils {
    pub mod utf8;
    pub mod utils;
}
