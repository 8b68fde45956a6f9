//! Small helpers shared by every crate

/// Current UTC timestamp (milliseconds)
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Random identifier for ledger rows and order items
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
