use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Short id tying together the access log line and exchange dumps of one
/// proxied request: an 8-hex-digit process tag and a per-process sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId {
    process: u32,
    seq: u64,
}

impl RequestId {
    #[must_use]
    pub fn seq(self) -> u64 {
        self.seq
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}-{}", self.process, self.seq)
    }
}

pub(crate) struct RequestIds {
    process: u32,
    counter: AtomicU64,
}

impl RequestIds {
    /// Random process tag; the sequence starts at 1.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::with_process_tag(fastrand::u32(..))
    }

    fn with_process_tag(process: u32) -> Self {
        Self {
            process,
            counter: AtomicU64::new(1),
        }
    }

    pub(crate) fn next(&self) -> RequestId {
        RequestId {
            process: self.process,
            seq: self.counter.fetch_add(1, Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_count_up_from_one() {
        let ids = RequestIds::with_process_tag(0xbeef);
        let first = ids.next();
        let second = ids.next();
        assert_eq!(first.seq(), 1);
        assert_eq!(second.seq(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn test_display_is_short_and_padded() {
        let ids = RequestIds::with_process_tag(0xbeef);
        assert_eq!(ids.next().to_string(), "0000beef-1");
    }
}
