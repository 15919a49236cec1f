use std::time::{SystemTime, UNIX_EPOCH};

pub const DAY_SECS: u64 = 24 * 60 * 60;

pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

pub fn expiry_after(secs: u64) -> u64 {
    now_secs().saturating_add(secs)
}
