// Small formatting helpers shared by command handlers.

use chrono::Duration;

/// Format a duration as `{d}d, {h}h, {m}m, {s}s`.
pub fn time_to_readable(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (hours, remainder) = (total / 3600, total % 3600);
    let (minutes, seconds) = (remainder / 60, remainder % 60);
    let (days, hours) = (hours / 24, hours % 24);
    format!("{days}d, {hours}h, {minutes}m, {seconds}s")
}

/// Spell out a number of seconds, e.g. `1 hour 2 minutes 5 seconds`.
pub fn duration_in_words(seconds: u64) -> String {
    let units = [
        (86_400, "day"),
        (3_600, "hour"),
        (60, "minute"),
        (1, "second"),
    ];

    let mut remaining = seconds;
    let mut parts = Vec::new();
    for (size, name) in units {
        let count = remaining / size;
        remaining %= size;
        if count > 0 {
            let plural = if count == 1 { "" } else { "s" };
            parts.push(format!("{count} {name}{plural}"));
        }
    }

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(" ")
    }
}
