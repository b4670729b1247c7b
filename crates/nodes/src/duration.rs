//! Human duration parsing shared by every node that takes a `duration`,
//! `timeout`, or `ttl` field: `"100ms"`, `"5s"`, `"10m"`, `"1h"`, or a bare
//! integer string of milliseconds (`"250"`).

use std::time::Duration;

use crate::NodeError;

pub fn parse_duration(raw: &str) -> Result<Duration, NodeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(NodeError::BadConfig("empty duration".into()));
    }

    if let Ok(ms) = raw.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }

    let (num_part, unit) = raw.split_at(
        raw.find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| NodeError::BadConfig(format!("invalid duration: '{raw}'")))?,
    );

    let value: f64 = num_part
        .parse()
        .map_err(|_| NodeError::BadConfig(format!("invalid duration: '{raw}'")))?;

    let millis = match unit {
        "ms" => value,
        "s" => value * 1_000.0,
        "m" => value * 60_000.0,
        "h" => value * 3_600_000.0,
        other => {
            return Err(NodeError::BadConfig(format!(
                "unknown duration unit '{other}' in '{raw}'"
            )))
        }
    };

    if millis < 0.0 || !millis.is_finite() {
        return Err(NodeError::BadConfig(format!("invalid duration: '{raw}'")));
    }

    Ok(Duration::from_millis(millis as u64))
}
