//! Bounded per-cache result history.

/// Prepend `latest` to `existing` and keep at most `max(1, limit)` entries.
///
/// `existing` is most-recent-first, and so is the returned history. Only
/// the retained entries are copied, so the cost is bounded by `limit`
/// regardless of how long `existing` is.
pub fn prune_history<T: Clone>(latest: T, existing: &[T], limit: usize) -> Vec<T> {
    let limit = limit.max(1);
    let kept = existing.len().min(limit - 1);

    let mut history = Vec::with_capacity(kept + 1);
    history.push(latest);
    history.extend_from_slice(&existing[..kept]);
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_to_empty_history() {
        assert_eq!(prune_history(1, &[], 3), vec![1]);
    }

    #[test]
    fn keeps_most_recent_first() {
        let history = prune_history(3, &[2, 1], 5);
        assert_eq!(history, vec![3, 2, 1]);
    }

    #[test]
    fn truncates_oldest_entries() {
        let history = prune_history(4, &[3, 2, 1], 2);
        assert_eq!(history, vec![4, 3]);
    }

    #[test]
    fn zero_limit_keeps_latest_only() {
        assert_eq!(prune_history(9, &[8, 7], 0), vec![9]);
    }

    #[test]
    fn shrinking_limit_does_not_reorder() {
        let mut history = Vec::new();
        for i in 1..=6 {
            history = prune_history(i, &history, 6);
        }
        assert_eq!(history, vec![6, 5, 4, 3, 2, 1]);

        history = prune_history(7, &history, 3);
        assert_eq!(history, vec![7, 6, 5]);
    }

    #[test]
    fn long_history_is_cut_to_limit() {
        let existing: Vec<u32> = (0..10_000).collect();
        let history = prune_history(42, &existing, 4);
        assert_eq!(history, vec![42, 0, 1, 2]);
    }
}
