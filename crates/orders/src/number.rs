use chrono::NaiveDate;

/// Human-readable order number: `ORD-YYYYMMDD-NNNN` where `NNNN` is the
/// zero-padded per-day sequence. Numbers past 9999 simply widen.
pub fn order_number(date: NaiveDate, sequence: u64) -> String {
    format!("ORD-{}-{:04}", date.format("%Y%m%d"), sequence)
}

/// Sequence key for a given day's order counter.
pub fn sequence_key(date: NaiveDate) -> String {
    format!("orders-{}", date.format("%Y%m%d"))
}
