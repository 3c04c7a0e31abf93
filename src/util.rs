use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};


pub fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_time(value: &str) -> Option<SystemTime> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(SystemTime::from)
}
