pub mod aggregate;
pub mod charts;
pub mod history_service;
