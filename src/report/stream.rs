//! Paced delivery of a finished report
//!
//! The report is fully rendered before slicing starts. Slices are counted in
//! characters, so multi-byte text (accents, emoji) is never split mid-codepoint.

use std::time::Duration;

use futures::Stream;
use futures::stream;

/// Fixed-size character slices over a rendered report
#[derive(Debug, Clone)]
pub struct ReportChunks<'a> {
    remaining: &'a str,
    chunk_size: usize,
}

impl<'a> ReportChunks<'a> {
    /// A `chunk_size` of zero is treated as one
    #[must_use]
    pub fn new(text: &'a str, chunk_size: usize) -> Self {
        Self {
            remaining: text,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl<'a> Iterator for ReportChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }
        let (chunk, rest) = self.remaining.split_at(chunk_end(self.remaining, self.chunk_size));
        self.remaining = rest;
        Some(chunk)
    }
}

/// Byte offset just past the first `chunk_size` chars of `text`
fn chunk_end(text: &str, chunk_size: usize) -> usize {
    text.char_indices()
        .nth(chunk_size)
        .map_or(text.len(), |(idx, _)| idx)
}

/// Stream the report in `chunk_size` slices with `pacing` between slices.
/// Each slice is cut only when polled. `Duration::ZERO` disables the delay.
pub fn paced_stream(report: String, chunk_size: usize, pacing: Duration) -> impl Stream<Item = String> {
    let chunk_size = chunk_size.max(1);

    stream::unfold((report, 0usize), move |(report, offset)| async move {
        if offset >= report.len() {
            return None;
        }
        let end = offset + chunk_end(&report[offset..], chunk_size);
        let chunk = report[offset..end].to_string();
        if offset > 0 && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
        Some((chunk, (report, end)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_chunks_cover_text_exactly() {
        let text = "a".repeat(250);
        let chunks: Vec<&str> = ReportChunks::new(&text, 100).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 50);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunks_respect_char_boundaries() {
        let text = "🌊 Riesgo de Inundación: MEDIO";
        let chunks: Vec<&str> = ReportChunks::new(text, 4).collect();
        assert_eq!(chunks[0], "🌊 Ri");
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_empty_report_yields_nothing() {
        assert_eq!(ReportChunks::new("", 100).count(), 0);
    }

    #[test]
    fn test_chunks_restartable() {
        let text = "informe";
        let first: Vec<&str> = ReportChunks::new(text, 3).collect();
        let second: Vec<&str> = ReportChunks::new(text, 3).collect();
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_stream_waits_between_chunks() {
        let started = tokio::time::Instant::now();
        let chunks: Vec<String> = paced_stream("x".repeat(30), 10, Duration::from_millis(10))
            .collect()
            .await;
        assert_eq!(chunks.len(), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_millis(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_chunk_is_not_delayed() {
        let started = tokio::time::Instant::now();
        let mut chunks = Box::pin(paced_stream("y".repeat(10_000), 100, Duration::from_secs(1)));
        assert_eq!(chunks.next().await.map(|c| c.len()), Some(100));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_stream_slices_match_iterator() {
        let report = "🌊 Inundación: ALTO\n🔥 Incendio: BAJO\n".repeat(3);
        let streamed: Vec<String> = paced_stream(report.clone(), 7, Duration::ZERO).collect().await;
        let iterated: Vec<&str> = ReportChunks::new(&report, 7).collect();
        assert_eq!(streamed, iterated);
    }

    #[tokio::test]
    async fn test_zero_pacing_reassembles_report() {
        let report = "## ⚠️ LIMITACIONES\n\nTexto".to_string();
        let chunks: Vec<String> = paced_stream(report.clone(), 5, Duration::ZERO).collect().await;
        assert_eq!(chunks.concat(), report);
    }
}
