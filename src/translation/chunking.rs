//! Character-budget chunking for remote translation calls.
//!
//! Text is split on blank lines into paragraphs, which are greedily packed into chunks no longer
//! than the budget. A paragraph that alone exceeds the budget is hard-split into windows that
//! prefer to end on whitespace. All lengths are measured in `char`s, and every cut lands on a
//! `char` boundary.
//!
//! The same paragraph view backs [`bisect`], which the recovery path uses to halve a chunk the
//! content filter rejected.

/// Separator placed between paragraphs, both when splitting input and when joining output.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

const SEPARATOR_CHARS: usize = PARAGRAPH_SEPARATOR.len();

/// Split `text` into chunks of at most `max_chars` characters.
///
/// - Text that already fits is returned unchanged as a single chunk.
/// - Blank text yields no chunks.
/// - Paragraph boundaries are preferred; oversized paragraphs go through [`hard_split`].
pub fn chunk_text(text: &str, max_chars: usize, min_backtrack_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if text.trim().is_empty() {
        return Vec::new();
    }
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let mut packer = ParagraphPacker::new(max_chars);
    for paragraph in paragraphs(text) {
        let length = char_len(paragraph);
        if length > max_chars {
            packer.flush();
            packer
                .chunks
                .extend(hard_split(paragraph, max_chars, min_backtrack_chars));
            continue;
        }
        packer.push(paragraph, length);
    }
    packer.finish()
}

/// Iterate over the trimmed, non-empty paragraphs of `text`.
pub fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split(PARAGRAPH_SEPARATOR)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
}

/// Greedy accumulator that joins consecutive paragraphs while they fit the budget.
struct ParagraphPacker<'a> {
    max_chars: usize,
    current: Vec<&'a str>,
    current_len: usize,
    chunks: Vec<String>,
}

impl<'a> ParagraphPacker<'a> {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            current: Vec::new(),
            current_len: 0,
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, paragraph: &'a str, length: usize) {
        if self.current.is_empty() {
            self.current.push(paragraph);
            self.current_len = length;
            return;
        }

        let projected = self.current_len + SEPARATOR_CHARS + length;
        if projected <= self.max_chars {
            self.current.push(paragraph);
            self.current_len = projected;
        } else {
            self.flush();
            self.current.push(paragraph);
            self.current_len = length;
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.chunks.push(self.current.join(PARAGRAPH_SEPARATOR));
        }
        self.current.clear();
        self.current_len = 0;
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

/// Split `text` into windows of at most `max_chars` characters.
///
/// A window that stops short of the end backtracks to the last whitespace found at least
/// `min_backtrack_chars` into the window; without one it is cut at the window edge. Pieces are
/// trimmed and empty pieces dropped.
pub fn hard_split(text: &str, max_chars: usize, min_backtrack_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let total = chars.len();
    let byte_at = |index: usize| chars.get(index).map_or(text.len(), |(offset, _)| *offset);

    let mut pieces = Vec::new();
    let mut start = 0;
    while start < total {
        let mut end = (start + max_chars).min(total);
        if end < total {
            // Never backtrack to the window start, or the loop would stall.
            let earliest = start + min_backtrack_chars.max(1);
            if let Some(space) = (earliest..end)
                .rev()
                .find(|&index| chars[index].1.is_whitespace())
            {
                end = space;
            }
        }

        let piece = text[byte_at(start)..byte_at(end)].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        start = end;
    }
    pieces
}

/// Split `text` into two non-empty halves, or `None` when it cannot shrink further.
///
/// Multiple paragraphs are divided at the middle paragraph index. A single paragraph is cut at
/// its character midpoint, moved back to the nearest preceding whitespace when there is one.
pub fn bisect(text: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = paragraphs(text).collect();
    match parts.len() {
        0 => None,
        1 => bisect_paragraph(parts[0]),
        count => {
            let middle = count / 2;
            Some((
                parts[..middle].join(PARAGRAPH_SEPARATOR),
                parts[middle..].join(PARAGRAPH_SEPARATOR),
            ))
        }
    }
}

fn bisect_paragraph(paragraph: &str) -> Option<(String, String)> {
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let middle = chars.len() / 2;
    if middle == 0 {
        return None;
    }

    let cut = (1..=middle)
        .rev()
        .find(|&index| chars[index].1.is_whitespace())
        .unwrap_or(middle);
    let offset = chars[cut].0;

    let left = paragraph[..offset].trim();
    let right = paragraph[offset..].trim();
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left.to_string(), right.to_string()))
}

/// Length of `text` in characters.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(fill: char, length: usize) -> String {
        std::iter::repeat_n(fill, length).collect()
    }

    #[test]
    fn text_within_budget_is_returned_unchanged() {
        let text = "  First line.\n\nSecond line.  ";
        assert_eq!(chunk_text(text, 100, 20), vec![text.to_string()]);
    }

    #[test]
    fn blank_text_yields_no_chunks() {
        assert!(chunk_text("", 10, 20).is_empty());
        assert!(chunk_text(" \n\n\t ", 10, 20).is_empty());
    }

    #[test]
    fn packs_paragraphs_until_budget_is_reached() {
        let first = paragraph('a', 40);
        let second = paragraph('b', 40);
        let third = paragraph('c', 40);
        let text = format!("{first}\n\n{second}\n\n{third}");

        // 40 + 2 + 40 fits, a third paragraph would not.
        let chunks = chunk_text(&text, 90, 20);
        assert_eq!(chunks, vec![format!("{first}\n\n{second}"), third]);
    }

    #[test]
    fn equal_paragraphs_near_budget_each_get_their_own_chunk() {
        let parts: Vec<String> = ['x', 'y', 'z'].iter().map(|c| paragraph(*c, 3000)).collect();
        let text = parts.join("\n\n");
        assert!(char_len(&text) > 9000);

        let chunks = chunk_text(&text, 4000, 20);
        assert_eq!(chunks, parts);
    }

    #[test]
    fn empty_paragraphs_are_dropped() {
        let first = paragraph('a', 30);
        let second = paragraph('b', 30);
        let text = format!("{first}\n\n\n\n   \n\n{second}");
        let chunks = chunk_text(&text, 40, 20);
        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn oversized_paragraph_flushes_pending_and_is_hard_split() {
        let short = "short intro".to_string();
        let long = "word ".repeat(30);
        let tail = "closing".to_string();
        let text = format!("{short}\n\n{long}\n\n{tail}");

        let chunks = chunk_text(&text, 50, 5);
        assert_eq!(chunks.first(), Some(&short));
        assert_eq!(chunks.last(), Some(&tail));
        assert!(chunks.len() > 3);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 50, "chunk too long: {chunk:?}");
        }
        let words: usize = chunks[1..chunks.len() - 1]
            .iter()
            .map(|chunk| chunk.split_whitespace().count())
            .sum();
        assert_eq!(words, 30);
    }

    #[test]
    fn hard_split_backtracks_to_whitespace() {
        let text = format!("{} {}", paragraph('a', 30), paragraph('b', 30));
        let pieces = hard_split(&text, 40, 20);
        assert_eq!(pieces, vec![paragraph('a', 30), paragraph('b', 30)]);
    }

    #[test]
    fn hard_split_ignores_whitespace_before_backtrack_guard() {
        // The only space sits 10 characters into the window, below the 20-character guard.
        let text = format!("{} {}", paragraph('a', 10), paragraph('b', 50));
        let pieces = hard_split(&text, 40, 20);
        assert_eq!(pieces.len(), 2);
        assert_eq!(char_len(&text[..]), 61);
        assert_eq!(
            pieces[0],
            format!("{} {}", paragraph('a', 10), paragraph('b', 29))
        );
        assert_eq!(pieces[1], paragraph('b', 21));
    }

    #[test]
    fn hard_split_cuts_atomic_tokens_at_window_edge() {
        let pieces = hard_split(&paragraph('q', 95), 40, 20);
        assert_eq!(
            pieces,
            vec![paragraph('q', 40), paragraph('q', 40), paragraph('q', 15)]
        );
    }

    #[test]
    fn hard_split_respects_multibyte_boundaries() {
        let text = "翻译".repeat(25);
        let pieces = hard_split(&text, 16, 20);
        assert_eq!(pieces.len(), 4);
        assert!(pieces.iter().all(|piece| char_len(piece) <= 16));
        assert_eq!(pieces.concat(), text);
    }

    #[test]
    fn hard_split_with_zero_guard_still_progresses() {
        let pieces = hard_split("a b c d e f g h", 3, 0);
        assert_eq!(pieces, vec!["a", "b", "c", "d", "e", "f", "g", "h"]);
    }

    #[test]
    fn bisect_splits_paragraph_list_at_midpoint() {
        let text = "one\n\ntwo\n\nthree";
        assert_eq!(
            bisect(text),
            Some(("one".to_string(), "two\n\nthree".to_string()))
        );
    }

    #[test]
    fn bisect_single_paragraph_backtracks_to_whitespace() {
        let text = "alpha beta gamma delta";
        // Midpoint is index 11 ('g'); nearest preceding whitespace is index 10.
        assert_eq!(
            bisect(text),
            Some(("alpha beta".to_string(), "gamma delta".to_string()))
        );
    }

    #[test]
    fn bisect_without_whitespace_cuts_at_midpoint() {
        assert_eq!(
            bisect("abcdefgh"),
            Some(("abcd".to_string(), "efgh".to_string()))
        );
    }

    #[test]
    fn bisect_refuses_unsplittable_input() {
        assert_eq!(bisect(""), None);
        assert_eq!(bisect("x"), None);
        assert_eq!(bisect("   "), None);
    }
}
