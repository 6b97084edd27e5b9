/// Half-open speech interval `[start_ms, end_ms)` in source milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpeechSegment {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl SpeechSegment {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self {
            start_ms,
            end_ms: end_ms.max(start_ms),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        assert_eq!(SpeechSegment::new(1850, 3000).duration_ms(), 1150);
    }

    #[test]
    fn test_inverted_bounds_collapse_to_empty() {
        let seg = SpeechSegment::new(500, 100);
        assert_eq!(seg.duration_ms(), 0);
    }
}
