//! Grapheme and word boundaries over the flat text of a text block.
//!
//! Offsets are char offsets, which equal flat offsets as long as every inline
//! object is written as a single [`OBJECT_CHAR`]. An object is always a unit of
//! its own: no grapheme cluster or word extends across it.

use unicode_segmentation::UnicodeSegmentation;

/// Stand-in char for inline objects in flat text.
pub const OBJECT_CHAR: char = '\u{FFFC}';

#[derive(Debug, Clone, Copy)]
struct Segment<'a> {
  start: usize,
  end:   usize,
  text:  &'a str,
}

impl Segment<'_> {
  fn is_blank(&self) -> bool {
    self.text.chars().all(char::is_whitespace)
  }
}

/// Splits `text` into runs of span text and single object chars.
fn runs(text: &str) -> impl Iterator<Item = &str> {
  let mut rest = text;
  std::iter::from_fn(move || {
    if rest.is_empty() {
      return None;
    }
    let end = match rest.find(OBJECT_CHAR) {
      Some(0) => OBJECT_CHAR.len_utf8(),
      Some(idx) => idx,
      None => rest.len(),
    };
    let (run, tail) = rest.split_at(end);
    rest = tail;
    Some(run)
  })
}

fn segments<'a, I>(text: &'a str, split: impl Fn(&'a str) -> I) -> Vec<Segment<'a>>
where
  I: Iterator<Item = &'a str>,
{
  let mut start = 0;
  let mut segments = Vec::new();
  for run in runs(text) {
    for piece in split(run) {
      let end = start + piece.chars().count();
      segments.push(Segment {
        start,
        end,
        text: piece,
      });
      start = end;
    }
  }
  segments
}

/// Start of the grapheme cluster before `char_idx`, or 0.
pub fn prev_grapheme_boundary(text: &str, char_idx: usize) -> usize {
  segments(text, |run| run.graphemes(true))
    .iter()
    .rev()
    .find(|segment| segment.start < char_idx)
    .map_or(0, |segment| segment.start)
}

/// End of the grapheme cluster after `char_idx`. Returns `char_idx` at the end
/// of the text.
pub fn next_grapheme_boundary(text: &str, char_idx: usize) -> usize {
  segments(text, |run| run.graphemes(true))
    .iter()
    .find(|segment| segment.end > char_idx)
    .map_or(char_idx, |segment| segment.end)
}

/// Start of the word before `char_idx`: whitespace is skipped, then one word
/// bound segment is taken. Returns `char_idx` when nothing precedes it.
pub fn prev_word_boundary(text: &str, char_idx: usize) -> usize {
  let mut idx = char_idx;
  for segment in segments(text, |run| run.split_word_bounds())
    .iter()
    .rev()
    .filter(|segment| segment.start < char_idx)
  {
    idx = segment.start;
    if !segment.is_blank() {
      break;
    }
  }
  idx
}

/// End of the word after `char_idx`, mirroring [`prev_word_boundary`].
pub fn next_word_boundary(text: &str, char_idx: usize) -> usize {
  let mut idx = char_idx;
  for segment in segments(text, |run| run.split_word_bounds())
    .iter()
    .filter(|segment| segment.end > char_idx)
  {
    idx = segment.end;
    if !segment.is_blank() {
      break;
    }
  }
  idx
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn grapheme_boundaries_keep_clusters_whole() {
    // regional indicator pair
    let flag = "a🇺🇸b";
    assert_eq!(prev_grapheme_boundary(flag, 3), 1);
    assert_eq!(next_grapheme_boundary(flag, 1), 3);
    assert_eq!(next_grapheme_boundary(flag, 3), 4);
    assert_eq!(next_grapheme_boundary(flag, 4), 4);

    // combining acute accent
    let accent = "xe\u{301}";
    assert_eq!(prev_grapheme_boundary(accent, 3), 1);
    assert_eq!(next_grapheme_boundary(accent, 1), 3);

    // man, zwj, woman, zwj, girl
    let family = "a👨\u{200d}👩\u{200d}👧";
    assert_eq!(prev_grapheme_boundary(family, 6), 1);
    assert_eq!(next_grapheme_boundary(family, 1), 6);
    assert_eq!(prev_grapheme_boundary(family, 1), 0);
    assert_eq!(prev_grapheme_boundary(family, 0), 0);
  }

  #[test]
  fn objects_split_clusters() {
    // a combining mark right after an object stays with the span text
    let text = "\u{FFFC}\u{301}";
    assert_eq!(prev_grapheme_boundary(text, 2), 1);
    assert_eq!(next_grapheme_boundary(text, 0), 1);
  }

  #[test]
  fn word_boundaries() {
    let text = "foo bar  ";
    assert_eq!(prev_word_boundary(text, 9), 4);
    assert_eq!(prev_word_boundary(text, 3), 0);
    assert_eq!(prev_word_boundary(text, 0), 0);
    assert_eq!(next_word_boundary(text, 3), 7);
    assert_eq!(next_word_boundary(text, 0), 3);
    assert_eq!(next_word_boundary(text, 7), 9);
    assert_eq!(next_word_boundary(text, 9), 9);
  }

  #[test]
  fn objects_bound_words() {
    let text = "foo\u{FFFC}bar";
    assert_eq!(prev_word_boundary(text, 7), 4);
    assert_eq!(prev_word_boundary(text, 4), 3);
    assert_eq!(prev_word_boundary(text, 3), 0);
    assert_eq!(next_word_boundary(text, 0), 3);
    assert_eq!(next_word_boundary(text, 3), 4);
  }

  #[test]
  fn words_keep_emoji_sequences_whole() {
    let text = "hi 👨\u{200d}👩\u{200d}👧";
    assert_eq!(prev_word_boundary(text, 8), 3);
    assert_eq!(next_word_boundary(text, 2), 8);
  }
}
