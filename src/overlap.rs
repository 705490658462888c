use chrono::NaiveDateTime;

/// Returns true when at least two intervals strictly overlap.
///
/// Intervals that merely touch (`next.start == current.end`) do not count.
/// After a stable sort by start, the first overlapping pair is always found
/// by comparing each interval against the furthest end seen so far.
pub fn has_overlap(intervals: &[(NaiveDateTime, NaiveDateTime)]) -> bool {
    if intervals.len() < 2 {
        return false;
    }

    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|(start, _)| *start);

    let mut current_end = sorted[0].1;
    for &(start, end) in &sorted[1..] {
        if start < current_end {
            return true;
        }
        current_end = current_end.max(end);
    }

    false
}
