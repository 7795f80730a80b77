//! Labels derived from timestamps and counters at render time

use crate::{api::Time, locale::Unit, Locale};

const BUCKETS: [(i64, Unit); 5] = [
    (31_536_000, Unit::Year),
    (2_592_000, Unit::Month),
    (86_400, Unit::Day),
    (3_600, Unit::Hour),
    (60, Unit::Minute),
];

/// Label for `seconds` elapsed since an event. Negative values (events in the
/// future) read as "just now".
pub fn format_elapsed(seconds: i64, locale: Locale) -> String {
    let elapsed = seconds.max(0);
    for (unit_secs, unit) in BUCKETS {
        // elapsed / unit_secs > 1 over the reals
        if elapsed > unit_secs {
            return locale.ago(elapsed / unit_secs, unit);
        }
    }
    String::from(locale.just_now())
}

pub fn time_since(then: Time, now: Time, locale: Locale) -> String {
    format_elapsed((now - then).num_seconds(), locale)
}

/// `1234` -> `1.2K`, `2500000` -> `2.5M`
pub fn compact_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
