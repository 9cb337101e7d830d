//! Overlapping fixed-size text splitting.
//!
//! The text is cut into units that end just after each separator (the
//! separator stays attached to the unit before it) and units are merged
//! greedily up to `chunk_size` characters. Every chunk is a contiguous span
//! of the input, so the input can be rebuilt from the chunks by dropping the
//! overlapped prefix of each one.

use std::collections::VecDeque;

use super::store::Passage;
use crate::core::errors::BotError;

#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
    separator: String,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize, separator: impl Into<String>) -> Result<Self, BotError> {
        if chunk_size == 0 {
            return Err(BotError::InvalidConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(BotError::InvalidConfig(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
            separator: separator.into(),
        })
    }

    /// Lazily split `text`. Calling this again restarts from the beginning.
    pub fn chunks<'a>(&'a self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            units: Units {
                text,
                offset: 0,
                separator: &self.separator,
                max_chars: self.chunk_size,
            },
            carried: VecDeque::new(),
            pending: None,
            chunk_size: self.chunk_size,
            overlap: self.overlap,
        }
    }

    /// Chunks numbered from zero as passages.
    pub fn passages<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Passage> + 'a {
        self.chunks(text)
            .enumerate()
            .map(|(index, chunk)| chunk.into_passage(index))
    }
}

/// A contiguous byte span `start..end` of the chunked text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl Chunk<'_> {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn into_passage(self, index: usize) -> Passage {
        Passage {
            id: index.to_string(),
            text: self.text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Unit<'a> {
    start: usize,
    text: &'a str,
    chars: usize,
}

impl Unit<'_> {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Separator-terminated pieces of the text, each at most `max_chars` long.
#[derive(Debug, Clone)]
struct Units<'a> {
    text: &'a str,
    offset: usize,
    separator: &'a str,
    max_chars: usize,
}

impl<'a> Iterator for Units<'a> {
    type Item = Unit<'a>;

    fn next(&mut self) -> Option<Unit<'a>> {
        let rest = &self.text[self.offset..];
        let first = rest.chars().next()?;

        let segment_len = if self.separator.is_empty() {
            first.len_utf8()
        } else {
            rest.find(self.separator)
                .map(|idx| idx + self.separator.len())
                .unwrap_or(rest.len())
        };
        let segment = &rest[..segment_len];

        // oversized segments are hard-split on character boundaries
        let cut = segment
            .char_indices()
            .nth(self.max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(segment.len());
        let piece = &segment[..cut];

        let unit = Unit {
            start: self.offset,
            text: piece,
            chars: piece.chars().count(),
        };
        self.offset += cut;
        Some(unit)
    }
}

#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    units: Units<'a>,
    carried: VecDeque<Unit<'a>>,
    pending: Option<Unit<'a>>,
    chunk_size: usize,
    overlap: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Chunk<'a>> {
        let mut window = std::mem::take(&mut self.carried);
        let mut total: usize = window.iter().map(|unit| unit.chars).sum();
        let mut fresh = 0usize;

        while let Some(unit) = self.pending.take().or_else(|| self.units.next()) {
            if total + unit.chars > self.chunk_size {
                if fresh > 0 {
                    self.pending = Some(unit);
                    break;
                }
                // the carried overlap has to make room for new text
                while total + unit.chars > self.chunk_size {
                    let Some(dropped) = window.pop_front() else {
                        break;
                    };
                    total -= dropped.chars;
                }
            }
            total += unit.chars;
            window.push_back(unit);
            fresh += 1;
        }

        if fresh == 0 {
            return None;
        }

        let start = window.front()?.start;
        let end = window.back()?.end();

        let mut carried_chars = 0;
        for unit in window.iter().rev() {
            if carried_chars + unit.chars > self.overlap {
                break;
            }
            carried_chars += unit.chars;
            self.carried.push_front(*unit);
        }

        Some(Chunk {
            text: &self.text[start..end],
            start,
            end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[Chunk<'_>]) -> String {
        let mut out = String::new();
        let mut prev_end: usize = 0;
        for chunk in chunks {
            let skip = prev_end.saturating_sub(chunk.start);
            out.push_str(&chunk.text[skip..]);
            prev_end = chunk.end;
        }
        out
    }

    fn sample_corpus() -> String {
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!(
                "Paragraph {} explains how channel {} messages are delivered.\n",
                i,
                i * 7
            ));
            if i % 9 == 0 {
                text.push('\n');
            }
        }
        text.push_str(&"x".repeat(130));
        text.push_str("\n카카오톡 채널은 비즈니스 메시지를 보냅니다.\n");
        text
    }

    #[test]
    fn chunks_reconstruct_the_original_text() {
        let corpus = sample_corpus();
        for (size, overlap, separator) in [
            (1000, 200, "\n"),
            (120, 40, "\n"),
            (50, 10, "\n"),
            (17, 5, " "),
            (8, 3, ""),
            (64, 0, ". "),
        ] {
            let chunker = Chunker::new(size, overlap, separator).unwrap();
            let chunks: Vec<_> = chunker.chunks(&corpus).collect();
            assert_eq!(
                reconstruct(&chunks),
                corpus,
                "size={} overlap={} separator={:?}",
                size,
                overlap,
                separator
            );
        }
    }

    #[test]
    fn every_chunk_respects_size_and_overlap() {
        let corpus = sample_corpus();
        let chunker = Chunker::new(60, 20, "\n").unwrap();
        let chunks: Vec<_> = chunker.chunks(&corpus).collect();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 60, "chunk too long: {:?}", chunk.text);
        }
        for pair in chunks.windows(2) {
            let shared = &corpus[pair[1].start..pair[0].end.max(pair[1].start)];
            assert!(shared.chars().count() <= 20);
            assert!(pair[1].end > pair[0].end);
        }
    }

    #[test]
    fn splits_prefer_separator_boundaries() {
        let chunker = Chunker::new(10, 0, "\n").unwrap();
        let texts: Vec<_> = chunker
            .chunks("aaaa\nbbbb\ncccc\n")
            .map(|chunk| chunk.text)
            .collect();
        assert_eq!(texts, vec!["aaaa\nbbbb\n", "cccc\n"]);
    }

    #[test]
    fn overlap_carries_trailing_units() {
        let chunker = Chunker::new(10, 5, "\n").unwrap();
        let texts: Vec<_> = chunker
            .chunks("aaaa\nbbbb\ncccc\n")
            .map(|chunk| chunk.text)
            .collect();
        assert_eq!(texts, vec!["aaaa\nbbbb\n", "bbbb\ncccc\n"]);
    }

    #[test]
    fn long_runs_are_hard_split() {
        let chunker = Chunker::new(4, 0, "\n").unwrap();
        let texts: Vec<_> = chunker.chunks("abcdefghij").map(|chunk| chunk.text).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let chunker = Chunker::new(4, 0, "\n").unwrap();
        let texts: Vec<_> = chunker
            .chunks("가나다\n라마바\n사아자차카")
            .map(|chunk| chunk.text)
            .collect();
        assert_eq!(texts, vec!["가나다\n", "라마바\n", "사아자차", "카"]);
    }

    #[test]
    fn short_text_yields_one_passage() {
        let chunker = Chunker::new(1000, 200, "\n").unwrap();
        let passages: Vec<_> = chunker.passages("one line\nanother line").collect();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].id, "0");
        assert_eq!(passages[0].text, "one line\nanother line");
    }

    #[test]
    fn empty_text_yields_nothing() {
        let chunker = Chunker::new(10, 2, "\n").unwrap();
        assert_eq!(chunker.chunks("").count(), 0);
    }

    #[test]
    fn iteration_is_restartable() {
        let corpus = sample_corpus();
        let chunker = Chunker::new(80, 30, "\n").unwrap();
        let mut first = chunker.chunks(&corpus);
        first.next();
        let resumed: Vec<_> = first.clone().collect();
        let again: Vec<_> = first.collect();
        assert_eq!(resumed, again);

        let ids: Vec<_> = chunker.passages(&corpus).map(|p| p.id).collect();
        let expected: Vec<_> = (0..ids.len()).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(Chunker::new(0, 0, "\n").is_err());
        assert!(Chunker::new(10, 10, "\n").is_err());
    }
}
