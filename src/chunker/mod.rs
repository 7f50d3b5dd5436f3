//! Splits file text into bounded, semantically meaningful chunks.
//!
//! The primary strategy asks an external boundary advisor for split offsets
//! and validates the result; degenerate or missing advice falls back to
//! fixed-size chunking with overlap. Chunking never fails outright.
pub mod advisor;

use tracing::debug;

pub use advisor::{AdvisorError, BoundaryAdvisor, HttpBoundaryAdvisor, NoopAdvisor};

use crate::scanner::FileType;

/// Files at or below this many characters are returned as a single chunk.
pub const SINGLE_CHUNK_THRESHOLD: usize = 1000;
/// Chunks smaller than this are merged into a neighbor.
pub const MIN_CHUNK_SIZE: usize = 100;
/// Chunks larger than this are re-split.
pub const MAX_CHUNK_SIZE: usize = 4000;
/// Fallback fixed chunk size.
pub const FIXED_CHUNK_SIZE: usize = 2000;
/// Fallback fixed chunk overlap.
pub const FIXED_CHUNK_OVERLAP: usize = 200;
/// Minimum fraction of the original characters the chunk set must retain.
const QUALITY_FLOOR: f64 = 0.80;

/// A contiguous, trimmed, non-empty slice of a file's text.
/// Offsets are char positions into the original text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub source_file: String,
}

/// Split `text` into chunks, consulting the boundary advisor for code-aware
/// split points and validating the outcome against the quality floor.
pub async fn chunk(
    text: &str,
    file_type: FileType,
    file_name: &str,
    advisor: &dyn BoundaryAdvisor,
) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    if total == 0 {
        return Vec::new();
    }

    if total <= SINGLE_CHUNK_THRESHOLD {
        return spans_to_chunks(&chars, &[(0, total)], file_name);
    }

    let offsets = match advisor.advise(text, file_type, file_name).await {
        Ok(offsets) => offsets,
        Err(e) => {
            debug!("Boundary advice failed for {file_name}: {e}; using fixed chunking");
            return fixed_chunks(&chars, file_name);
        }
    };

    match advised_chunks(&chars, &offsets, file_name) {
        Some(chunks) => chunks,
        None => {
            debug!("Discarding degenerate boundaries for {file_name}; using fixed chunking");
            fixed_chunks(&chars, file_name)
        }
    }
}

/// Build chunks from advisory offsets, or `None` when the boundary set fails
/// the quality floor and must be discarded.
fn advised_chunks(chars: &[char], offsets: &[usize], file_name: &str) -> Option<Vec<Chunk>> {
    let total = chars.len();

    // Clamp, dedupe, sort.
    let mut boundaries: Vec<usize> = offsets.iter().map(|&o| o.min(total)).collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    // Coverage check before forcing sentinels: an advisor whose offsets stop
    // well short of the end has produced a degenerate boundary set.
    let claimed_end = boundaries.last().copied().unwrap_or(0);
    if (claimed_end as f64) < QUALITY_FLOOR * total as f64 {
        return None;
    }

    // Force the set to start at 0 and end at the text length.
    if boundaries.first() != Some(&0) {
        boundaries.insert(0, 0);
    }
    if boundaries.last() != Some(&total) {
        boundaries.push(total);
    }

    let spans: Vec<(usize, usize)> = boundaries
        .windows(2)
        .map(|w| (w[0], w[1]))
        .filter(|(s, e)| e > s)
        .collect();
    if spans.is_empty() {
        return None;
    }

    let merged = merge_small_spans(&spans);
    let sized = resplit_large_spans(&merged);
    let chunks = spans_to_chunks(chars, &sized, file_name);

    // Quality gate on the final set: trimming and merging must not have
    // dropped more than the floor allows.
    let retained: usize = chunks.iter().map(|c| c.text.chars().count()).sum();
    if (retained as f64) < QUALITY_FLOOR * total as f64 {
        return None;
    }

    Some(chunks)
}

/// Merge spans shorter than [`MIN_CHUNK_SIZE`] into the preceding span while
/// the merged span stays within [`MAX_CHUNK_SIZE`].
fn merge_small_spans(spans: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for &(s, e) in spans {
        if let Some(last) = merged.last_mut() {
            let last_len = last.1 - last.0;
            let cur_len = e - s;
            if (cur_len < MIN_CHUNK_SIZE || last_len < MIN_CHUNK_SIZE)
                && e - last.0 <= MAX_CHUNK_SIZE
            {
                last.1 = e;
                continue;
            }
        }
        merged.push((s, e));
    }
    merged
}

/// Re-split spans larger than [`MAX_CHUNK_SIZE`] using fixed-size windows.
fn resplit_large_spans(spans: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(spans.len());
    for &(s, e) in spans {
        if e - s > MAX_CHUNK_SIZE {
            out.extend(fixed_spans(s, e, FIXED_CHUNK_SIZE, FIXED_CHUNK_OVERLAP));
        } else {
            out.push((s, e));
        }
    }
    out
}

/// Fixed-size chunking with overlap over the whole text.
fn fixed_chunks(chars: &[char], file_name: &str) -> Vec<Chunk> {
    let spans = fixed_spans(0, chars.len(), FIXED_CHUNK_SIZE, FIXED_CHUNK_OVERLAP);
    spans_to_chunks(chars, &spans, file_name)
}

fn fixed_spans(start: usize, end: usize, size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    if start >= end {
        return spans;
    }
    let step = if size > overlap { size - overlap } else { 1 };
    let mut pos = start;
    loop {
        let span_end = (pos + size).min(end);
        spans.push((pos, span_end));
        if span_end >= end {
            break;
        }
        pos += step;
    }
    spans
}

/// Materialize spans as trimmed, non-empty chunks with char offsets adjusted
/// to the trimmed slice.
fn spans_to_chunks(chars: &[char], spans: &[(usize, usize)], file_name: &str) -> Vec<Chunk> {
    let mut chunks = Vec::with_capacity(spans.len());
    for &(s, e) in spans {
        let slice = &chars[s..e];
        let leading = slice.iter().take_while(|c| c.is_whitespace()).count();
        if leading == slice.len() {
            continue;
        }
        let trailing = slice.iter().rev().take_while(|c| c.is_whitespace()).count();
        let text: String = slice[leading..slice.len() - trailing].iter().collect();
        chunks.push(Chunk {
            text,
            start_offset: s + leading,
            end_offset: e - trailing,
            source_file: file_name.to_string(),
        });
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Test advisor returning a scripted offset list.
    struct ScriptedAdvisor(Vec<usize>);

    #[async_trait]
    impl BoundaryAdvisor for ScriptedAdvisor {
        async fn advise(
            &self,
            _preview: &str,
            _file_type: FileType,
            _file_name: &str,
        ) -> Result<Vec<usize>, AdvisorError> {
            Ok(self.0.clone())
        }
    }

    fn text_of_len(n: usize) -> String {
        // Lines of 10 chars each so the text has structure but no long
        // whitespace runs.
        let line = "abcdefghi\n";
        line.repeat(n / line.len() + 1)[..n].to_string()
    }

    #[tokio::test]
    async fn test_small_file_single_chunk() {
        let text = "fn main() {}\n";
        let chunks = chunk(text, FileType::Code, "main.rs", &NoopAdvisor).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "fn main() {}");
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].source_file, "main.rs");
    }

    #[tokio::test]
    async fn test_empty_and_whitespace() {
        assert!(chunk("", FileType::Text, "e.txt", &NoopAdvisor).await.is_empty());
        assert!(
            chunk("   \n\n  ", FileType::Text, "w.txt", &NoopAdvisor)
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_advisor_failure_falls_back_to_fixed() {
        let text = text_of_len(5000);
        let chunks = chunk(&text, FileType::Text, "a.txt", &NoopAdvisor).await;
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.chars().count() <= FIXED_CHUNK_SIZE);
        }
        // Overlapping fixed windows cover the full text (minus trimmed
        // trailing whitespace).
        assert!(chunks.last().unwrap().end_offset >= 4999);
    }

    #[tokio::test]
    async fn test_good_boundaries_respected() {
        let text = text_of_len(5000);
        let advisor = ScriptedAdvisor(vec![1500, 3200, 5000]);
        let chunks = chunk(&text, FileType::Code, "a.js", &advisor).await;

        assert_eq!(chunks.len(), 3);
        // Monotone, non-overlapping offsets.
        for pair in chunks.windows(2) {
            assert!(pair[0].end_offset <= pair[1].start_offset);
        }
        let retained: usize = chunks.iter().map(|c| c.text.chars().count()).sum();
        assert!(retained as f64 >= 0.8 * 5000.0);
    }

    #[tokio::test]
    async fn test_degenerate_coverage_triggers_fixed_fallback() {
        // Boundaries cover only the first half of a 5000-char file.
        let text = text_of_len(5000);
        let advisor = ScriptedAdvisor(vec![0, 2500]);
        let chunks = chunk(&text, FileType::Text, "half.txt", &advisor).await;

        for c in &chunks {
            assert!(c.text.chars().count() <= FIXED_CHUNK_SIZE);
        }
        assert!(chunks.last().unwrap().end_offset >= 4999);
        // Fixed 2000/200 over 5000 chars: starts at 0, 1800, 3600.
        let starts: Vec<usize> = chunks.iter().map(|c| c.start_offset).collect();
        assert_eq!(starts, vec![0, 1800, 3600]);
    }

    #[tokio::test]
    async fn test_small_spans_merged() {
        let text = text_of_len(3000);
        // 50-char slivers between 1000 and 1100 must merge away.
        let advisor = ScriptedAdvisor(vec![1000, 1050, 1100, 3000]);
        let chunks = chunk(&text, FileType::Text, "m.txt", &advisor).await;
        for c in &chunks {
            assert!(
                c.text.chars().count() >= MIN_CHUNK_SIZE,
                "sliver survived: {} chars",
                c.text.chars().count()
            );
        }
    }

    #[tokio::test]
    async fn test_oversized_span_resplit() {
        let text = text_of_len(9000);
        let advisor = ScriptedAdvisor(vec![9000]);
        let chunks = chunk(&text, FileType::Text, "big.txt", &advisor).await;
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.chars().count() <= FIXED_CHUNK_SIZE);
        }
    }

    #[tokio::test]
    async fn test_out_of_range_offsets_clamped() {
        let text = text_of_len(2000);
        let advisor = ScriptedAdvisor(vec![500, 999_999]);
        let chunks = chunk(&text, FileType::Text, "c.txt", &advisor).await;
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.end_offset <= 2000));
    }

    #[test]
    fn test_fixed_spans_progress_and_overlap() {
        let spans = fixed_spans(0, 5000, 2000, 200);
        assert_eq!(spans, vec![(0, 2000), (1800, 3800), (3600, 5000)]);

        // Pathological size <= overlap still makes progress.
        let spans = fixed_spans(0, 10, 2, 5);
        assert!(spans.len() <= 10);
        assert_eq!(spans.last().unwrap().1, 10);
    }

    #[test]
    fn test_merge_small_spans() {
        let merged = merge_small_spans(&[(0, 1000), (1000, 1050), (1050, 2000)]);
        assert_eq!(merged, vec![(0, 1050), (1050, 2000)]);

        // No merge when the result would exceed the maximum.
        let merged = merge_small_spans(&[(0, 3990), (3990, 4040)]);
        assert_eq!(merged, vec![(0, 3990), (3990, 4040)]);
    }
}
