mod fs_alert_store;

pub use fs_alert_store::*;
