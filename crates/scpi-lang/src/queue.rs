//! Bounded per-session error queue.

use std::collections::VecDeque;

use crate::ErrorCode;

/// Hard cap on queued errors.
pub const ERROR_QUEUE_CAPACITY: usize = 100;

/// Real errors kept before the overflow marker takes over the tail.
const REAL_ERROR_LIMIT: usize = ERROR_QUEUE_CAPACITY - 2;

/// FIFO of raised error codes with an overflow marker at the tail.
///
/// The oldest errors are kept. At most 98 real errors are queued; from the
/// 99th add on, [`ErrorCode::QUEUE_OVERFLOW`] is appended until the queue is
/// full and then overwrites the final slot. Whenever the queue holds 99 or
/// more entries its tail is the overflow marker, and it never grows past
/// [`ERROR_QUEUE_CAPACITY`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorQueue {
    entries: VecDeque<ErrorCode>,
}

impl ErrorQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a raised error.
    pub fn add(&mut self, code: ErrorCode) {
        if self.entries.len() < REAL_ERROR_LIMIT {
            self.entries.push_back(code);
        } else if self.entries.len() < ERROR_QUEUE_CAPACITY {
            self.entries.push_back(ErrorCode::QUEUE_OVERFLOW);
        } else if let Some(last) = self.entries.back_mut() {
            *last = ErrorCode::QUEUE_OVERFLOW;
        }
    }

    /// Pops the oldest error. `None` means "no error".
    pub fn next_error(&mut self) -> Option<ErrorCode> {
        self.entries.pop_front()
    }

    /// Pops the newest error and discards everything else.
    pub fn last_error(&mut self) -> Option<ErrorCode> {
        let last = self.entries.pop_back();
        self.entries.clear();
        last
    }

    /// Number of queued errors.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every queued error.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn queue() -> ErrorQueue {
        ErrorQueue::new()
    }

    fn fill(queue: &mut ErrorQueue, count: usize) {
        for _ in 0..count {
            queue.add(ErrorCode::CMD_ERR);
        }
    }

    #[rstest]
    fn empty_queue_reports_no_error(mut queue: ErrorQueue) {
        assert_eq!(queue.next_error(), None);
        assert_eq!(queue.last_error(), None);
        assert_eq!(queue.count(), 0);
    }

    #[rstest]
    fn pops_in_arrival_order(mut queue: ErrorQueue) {
        queue.add(ErrorCode::CMD_ERR);
        queue.add(ErrorCode::MISSING_PARAMETER);
        queue.add(ErrorCode::ADMIN_NOT_LOGGED_IN);
        assert_eq!(queue.next_error(), Some(ErrorCode::CMD_ERR));
        assert_eq!(queue.next_error(), Some(ErrorCode::MISSING_PARAMETER));
        assert_eq!(queue.count(), 1);
    }

    #[rstest]
    fn last_error_drains_the_queue(mut queue: ErrorQueue) {
        queue.add(ErrorCode::CMD_ERR);
        queue.add(ErrorCode::DATA_TYPE_ERR);
        assert_eq!(queue.last_error(), Some(ErrorCode::DATA_TYPE_ERR));
        assert!(queue.is_empty());
    }

    #[rstest]
    fn real_errors_stop_short_of_the_overflow_slots(mut queue: ErrorQueue) {
        fill(&mut queue, REAL_ERROR_LIMIT);
        assert_eq!(queue.count(), 98);
        assert_eq!(queue.entries.back(), Some(&ErrorCode::CMD_ERR));
    }

    #[rstest]
    #[case(99)]
    #[case(100)]
    fn tail_is_the_overflow_marker_from_ninety_nine_entries(
        mut queue: ErrorQueue,
        #[case] adds: usize,
    ) {
        fill(&mut queue, adds);
        assert_eq!(queue.count(), adds);
        assert_eq!(queue.entries.back(), Some(&ErrorCode::QUEUE_OVERFLOW));
        assert_eq!(
            queue.entries.iter().filter(|code| **code == ErrorCode::CMD_ERR).count(),
            REAL_ERROR_LIMIT
        );
    }

    #[rstest]
    #[case(100)]
    #[case(101)]
    #[case(200)]
    fn overflow_marks_the_tail(mut queue: ErrorQueue, #[case] adds: usize) {
        fill(&mut queue, adds);
        assert_eq!(queue.count(), ERROR_QUEUE_CAPACITY);
        assert_eq!(queue.entries.back(), Some(&ErrorCode::QUEUE_OVERFLOW));
        assert_eq!(queue.next_error(), Some(ErrorCode::CMD_ERR));
    }

    #[rstest]
    fn overflow_overwrites_instead_of_growing(mut queue: ErrorQueue) {
        fill(&mut queue, ERROR_QUEUE_CAPACITY);
        queue.add(ErrorCode::DATA_TYPE_ERR);
        assert_eq!(queue.count(), ERROR_QUEUE_CAPACITY);
        assert_eq!(queue.last_error(), Some(ErrorCode::QUEUE_OVERFLOW));
        assert_eq!(queue.count(), 0);
    }
}
