pub mod report;
pub mod traffic_monitoring_system;
