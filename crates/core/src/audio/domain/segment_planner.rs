use super::speech_segment::SpeechSegment;
use crate::shared::constants::{DEFAULT_MAX_LEN_MS, DEFAULT_MIN_LEN_MS, SHORT_GAP_MS};

/// Turns raw voice-activity intervals into utterances within
/// `[min_len_ms, max_len_ms]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentPlanner {
    pub min_len_ms: u64,
    pub max_len_ms: u64,
    pub short_gap_ms: u64,
}

impl Default for SegmentPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LEN_MS, DEFAULT_MAX_LEN_MS)
    }
}

impl SegmentPlanner {
    pub fn new(min_len_ms: u64, max_len_ms: u64) -> Self {
        Self {
            min_len_ms,
            max_len_ms,
            short_gap_ms: SHORT_GAP_MS,
        }
    }

    /// Merge then constrain.
    pub fn plan(&self, raw: &[SpeechSegment]) -> Vec<SpeechSegment> {
        self.constrain(&self.merge(raw))
    }

    /// Left-to-right merge of raw intervals.
    ///
    /// A merge never produces a segment longer than `max_len_ms`; a candidate
    /// shorter than `min_len_ms` absorbs its successor regardless of the gap;
    /// otherwise only gaps under `short_gap_ms` are bridged.
    pub fn merge(&self, raw: &[SpeechSegment]) -> Vec<SpeechSegment> {
        let mut sorted = raw.to_vec();
        sorted.sort();

        let mut committed = Vec::new();
        let mut iter = sorted.into_iter();
        let Some(mut current) = iter.next() else {
            return committed;
        };

        for next in iter {
            let gap = next.start_ms.saturating_sub(current.end_ms);
            let merged_end = next.end_ms.max(current.end_ms);
            let merged_dur = merged_end - current.start_ms;

            let merge = if merged_dur > self.max_len_ms {
                false
            } else if current.duration_ms() < self.min_len_ms {
                true
            } else {
                gap < self.short_gap_ms
            };

            if merge {
                current.end_ms = merged_end;
            } else {
                committed.push(current);
                current = next;
            }
        }
        committed.push(current);
        committed
    }

    /// Drop segments under `min_len_ms`; cut segments over `max_len_ms` into
    /// `max_len_ms` pieces, dropping a trailing remainder under `min_len_ms`.
    pub fn constrain(&self, merged: &[SpeechSegment]) -> Vec<SpeechSegment> {
        let mut out = Vec::with_capacity(merged.len());
        for seg in merged {
            let duration = seg.duration_ms();
            if duration < self.min_len_ms {
                continue;
            }
            if duration <= self.max_len_ms || self.max_len_ms == 0 {
                out.push(*seg);
                continue;
            }
            let mut start = seg.start_ms;
            while start < seg.end_ms {
                let end = (start + self.max_len_ms).min(seg.end_ms);
                if end - start >= self.min_len_ms {
                    out.push(SpeechSegment::new(start, end));
                }
                start = end;
            }
        }
        out
    }
}
