//! Fixed character-window splitter.

use super::{ChunkSplitter, Window};
use crate::chunk::ChunkConfig;

/// Cuts windows of exactly `max_chunk_size` characters (the last may be
/// shorter), each starting `max_chunk_size - overlap` characters after the
/// previous one. Consecutive windows share exactly `overlap` characters.
pub struct WindowSplitter {
    size: usize,
    step: usize,
}

impl WindowSplitter {
    /// `config` must already be validated (`overlap < max_chunk_size`).
    pub fn new(config: &ChunkConfig) -> Self {
        Self {
            size: config.max_chunk_size,
            step: config.max_chunk_size.saturating_sub(config.overlap).max(1),
        }
    }
}

impl ChunkSplitter for WindowSplitter {
    fn name(&self) -> &'static str {
        "window"
    }

    fn split(&self, text: &str) -> Vec<Window> {
        // Byte offset of every char boundary, including the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        let mut windows = Vec::new();
        let mut start = 0;
        while start < char_len {
            let end = (start + self.size).min(char_len);
            let (byte_start, byte_end) = (boundaries[start], boundaries[end]);
            windows.push(Window {
                text: text[byte_start..byte_end].to_string(),
                byte_range: (byte_start, byte_end),
            });
            if end == char_len {
                break;
            }
            start += self.step;
        }

        tracing::trace!(
            "Window splitter created {} windows from {} bytes",
            windows.len(),
            text.len()
        );

        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(max_chunk_size: usize, overlap: usize) -> WindowSplitter {
        WindowSplitter::new(&ChunkConfig {
            max_chunk_size,
            overlap,
        })
    }

    #[test]
    fn test_window_positions() {
        let text = "x".repeat(1200);
        let windows = splitter(500, 50).split(&text);

        let ranges: Vec<_> = windows.iter().map(|w| w.byte_range).collect();
        assert_eq!(ranges, vec![(0, 500), (450, 950), (900, 1200)]);
    }

    #[test]
    fn test_exact_overlap() {
        let text: String = ('a'..='z').cycle().take(1337).collect();
        let windows = splitter(100, 20).split(&text);

        for pair in windows.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            assert_eq!(prev[prev.len() - 20..], next[..20]);
        }
    }

    #[test]
    fn test_multibyte_chars_counted_as_chars() {
        let text = "é".repeat(30);
        let windows = splitter(10, 2).split(&text);

        for window in &windows {
            assert!(window.text.chars().count() <= 10);
        }
        assert_eq!(windows[0].text, "é".repeat(10));
    }

    #[test]
    fn test_empty_text() {
        assert!(splitter(10, 2).split("").is_empty());
    }

    #[test]
    fn test_short_text_single_window() {
        let windows = splitter(500, 50).split("short");
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].text, "short");
    }
}
