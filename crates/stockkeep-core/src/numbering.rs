//! Human-facing document numbers

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;

/// `<prefix>-<last 6 digits of epoch millis>-<3 random digits>`
fn stamped(prefix: &str, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().rem_euclid(1_000_000);
    let suffix: u32 = rand::rng().random_range(0..1000);
    format!("{prefix}-{millis:06}-{suffix:03}")
}

/// Sales order number, e.g. `SO-482913-077`
#[must_use]
pub fn sales_order_number(now: DateTime<Utc>) -> String {
    stamped("SO", now)
}

/// Quote number, e.g. `QT-482913-512`
#[must_use]
pub fn quote_number(now: DateTime<Utc>) -> String {
    stamped("QT", now)
}

/// Purchase order number from its id, e.g. `PO-2026-0042`
#[must_use]
pub fn purchase_order_number(now: DateTime<Utc>, id: u32) -> String {
    format!("PO-{}-{id:04}", now.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stamped_numbers_have_fixed_shape() {
        let now = Utc.timestamp_millis_opt(1_760_000_012_345).unwrap();
        let number = sales_order_number(now);
        assert!(number.starts_with("SO-012345-"), "{number}");
        assert_eq!(number.len(), "SO-012345-000".len());
        assert!(quote_number(now).starts_with("QT-012345-"));
    }

    #[test]
    fn purchase_order_number_pads_id() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(purchase_order_number(now, 7), "PO-2026-0007");
        assert_eq!(purchase_order_number(now, 12345), "PO-2026-12345");
    }
}
