pub mod audit;
pub mod email_configs;
pub mod email_logs;
pub mod integrations;
pub mod suppressions;
