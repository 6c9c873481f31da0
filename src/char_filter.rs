//! Character sources feeding the segmenter, and the filters that rewrite them.
//!
//! The segmenter pulls characters one at a time from a [`CharSource`]. Filters
//! that change the length of the text (normalization, inserted tseks) record
//! [`Transformation`]s so that token offsets can be mapped back to the
//! original input with [`CharSource::correct_offset`].
//!
//! All offsets are UTF-8 byte offsets.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read};

use regex::Regex;

use crate::error::Result;

/// A change in the text, mapping a range in the original text to a range in
/// the new text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transformation {
    pub original_start: usize,
    pub original_end: usize,
    pub new_start: usize,
    pub new_end: usize,
}

impl Transformation {
    pub fn new(original_start: usize, original_end: usize, new_start: usize, new_end: usize) -> Self {
        Self {
            original_start,
            original_end,
            new_start,
            new_end,
        }
    }
}

/// Ordered list of transformations, mapping offsets of a filtered text back
/// to the text it was produced from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetMap {
    transformations: Vec<Transformation>,
}

impl OffsetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transformation. Transformations must be pushed in text order.
    pub fn push(&mut self, transformation: Transformation) {
        debug_assert!(self
            .transformations
            .last()
            .map_or(true, |last| last.new_end <= transformation.new_start));
        self.transformations.push(transformation);
    }

    pub fn len(&self) -> usize {
        self.transformations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformations.is_empty()
    }

    /// Map an offset of the new text to the original text.
    ///
    /// Offsets after a transformation are shifted by its accumulated length
    /// change; offsets falling inside a replacement map to its start.
    pub fn correct(&self, offset: usize) -> usize {
        let after = self.transformations.partition_point(|t| t.new_start <= offset);
        let Some(t) = after.checked_sub(1).map(|i| &self.transformations[i]) else {
            return offset;
        };
        if offset >= t.new_end {
            offset - t.new_end + t.original_end
        } else {
            t.original_start
        }
    }
}

/// Pull interface over a stream of characters
pub trait CharSource {
    /// Read the next character, `None` at the end of the stream
    fn read(&mut self) -> io::Result<Option<char>>;

    /// Map an offset of this stream to an offset of the original input
    fn correct_offset(&self, offset: usize) -> usize {
        offset
    }
}

impl<S: CharSource + ?Sized> CharSource for Box<S> {
    fn read(&mut self) -> io::Result<Option<char>> {
        (**self).read()
    }

    fn correct_offset(&self, offset: usize) -> usize {
        (**self).correct_offset(offset)
    }
}

/// Source reading from a string slice
#[derive(Debug, Clone)]
pub struct StrSource<'a> {
    chars: std::str::Chars<'a>,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { chars: text.chars() }
    }
}

impl CharSource for StrSource<'_> {
    fn read(&mut self) -> io::Result<Option<char>> {
        Ok(self.chars.next())
    }
}

/// Default number of bytes read from the underlying reader at a time
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Source decoding UTF-8 from any reader, chunk by chunk.
///
/// A character split between two reads is decoded once its last byte
/// arrives; invalid or truncated UTF-8 is an `InvalidData` error.
pub struct ReaderSource<R> {
    reader: R,
    chunk_size: usize,
    bytes: Vec<u8>,
    pos: usize,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Create a source reading `chunk_size` bytes at a time (at least 1)
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            bytes: Vec::new(),
            pos: 0,
        }
    }

    /// Decode the next buffered character, `None` if more bytes are needed
    fn decode_next(&mut self) -> io::Result<Option<char>> {
        let Some(&first) = self.bytes.get(self.pos) else {
            return Ok(None);
        };
        let width = match first {
            0x00..=0x7F => 1,
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Err(invalid_utf8()),
        };
        let Some(encoded) = self.bytes.get(self.pos..self.pos + width) else {
            return Ok(None);
        };
        let c = std::str::from_utf8(encoded)
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or_else(invalid_utf8)?;
        self.pos += width;
        Ok(Some(c))
    }

    /// Append one chunk to the buffer, returning the number of bytes read
    fn fill(&mut self) -> io::Result<usize> {
        self.bytes.drain(..self.pos);
        self.pos = 0;

        let filled = self.bytes.len();
        self.bytes.resize(filled + self.chunk_size, 0);
        loop {
            match self.reader.read(&mut self.bytes[filled..]) {
                Ok(n) => {
                    self.bytes.truncate(filled + n);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.bytes.truncate(filled);
                    return Err(e);
                }
            }
        }
    }
}

fn invalid_utf8() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8")
}

impl<R: Read> CharSource for ReaderSource<R> {
    fn read(&mut self) -> io::Result<Option<char>> {
        loop {
            if let Some(c) = self.decode_next()? {
                return Ok(Some(c));
            }
            if self.fill()? == 0 {
                return if self.pos < self.bytes.len() {
                    Err(invalid_utf8())
                } else {
                    Ok(None)
                };
            }
        }
    }
}

/// Table of single-character replacements
#[derive(Debug, Clone, Default)]
pub struct CharMap {
    map: HashMap<char, String>,
}

impl CharMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `from` to `to`; an empty `to` deletes the character
    pub fn insert(&mut self, from: char, to: impl Into<String>) {
        self.map.insert(from, to.into());
    }

    pub fn get(&self, c: char) -> Option<&str> {
        self.map.get(&c).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The normalization table for Tibetan text.
    ///
    /// - every character of the Tibetan block with a compatibility
    ///   decomposition is decomposed (this turns the non-breaking tsek into a
    ///   regular one and splits precomposed stacks and vowels)
    /// - the marks under selected syllables (༵ ༷) are deleted
    /// - the symbols ༀ ༂ ༃ are spelled out
    pub fn tibetan() -> Self {
        let mut map = CharMap::new();
        for c in ('\u{0F00}'..='\u{0FFF}').filter(|c| !matches!(c, '\u{0F00}' | '\u{0F02}' | '\u{0F03}')) {
            let mut decomposed = String::new();
            unicode_normalization::char::decompose_compatible(c, |d| decomposed.push(d));
            if decomposed.chars().ne(std::iter::once(c)) {
                map.insert(c, decomposed);
            }
        }
        map.insert('\u{0F35}', "");
        map.insert('\u{0F37}', "");
        map.insert('\u{0F00}', "\u{0F68}\u{0F7C}\u{0F7E}");
        map.insert('\u{0F02}', "\u{0F60}\u{0F70}\u{0F82}");
        map.insert('\u{0F03}', "\u{0F60}\u{0F70}\u{0F14}");
        map
    }
}

/// Source applying a [`CharMap`] on the fly to another source
pub struct MappingSource<'m, S> {
    inner: S,
    map: &'m CharMap,
    pending: VecDeque<char>,
    offsets: OffsetMap,
    /// Offset of the next character in the inner stream
    inner_offset: usize,
    /// Offset of the next character in the mapped stream
    offset: usize,
}

impl<'m, S: CharSource> MappingSource<'m, S> {
    pub fn new(inner: S, map: &'m CharMap) -> Self {
        Self {
            inner,
            map,
            pending: VecDeque::new(),
            offsets: OffsetMap::new(),
            inner_offset: 0,
            offset: 0,
        }
    }
}

impl<S: CharSource> CharSource for MappingSource<'_, S> {
    fn read(&mut self) -> io::Result<Option<char>> {
        loop {
            if let Some(c) = self.pending.pop_front() {
                self.offset += c.len_utf8();
                return Ok(Some(c));
            }
            let Some(c) = self.inner.read()? else {
                return Ok(None);
            };
            let inner_start = self.inner_offset;
            self.inner_offset += c.len_utf8();

            match self.map.get(c) {
                None => {
                    self.offset += c.len_utf8();
                    return Ok(Some(c));
                }
                Some(replacement) => {
                    if replacement.len() != c.len_utf8() {
                        self.offsets.push(Transformation::new(
                            inner_start,
                            self.inner_offset,
                            self.offset,
                            self.offset + replacement.len(),
                        ));
                    }
                    self.pending.extend(replacement.chars());
                }
            }
        }
    }

    fn correct_offset(&self, offset: usize) -> usize {
        self.inner.correct_offset(self.offsets.correct(offset))
    }
}

/// A text rewritten by whole-text filters, with the offset maps of every
/// filter applied, first one first
#[derive(Debug, Clone, Default)]
pub struct FilteredText {
    pub text: String,
    pub offsets: Vec<OffsetMap>,
}

impl FilteredText {
    /// Map an offset of the filtered text to the input text
    pub fn correct_offset(&self, offset: usize) -> usize {
        self.offsets.iter().rev().fold(offset, |o, map| map.correct(o))
    }

    /// Source over the filtered text, with offset correction
    pub fn source(&self) -> FilteredSource<'_> {
        FilteredSource {
            chars: StrSource::new(&self.text),
            filtered: self,
        }
    }
}

/// Source over a [`FilteredText`]
pub struct FilteredSource<'a> {
    chars: StrSource<'a>,
    filtered: &'a FilteredText,
}

impl CharSource for FilteredSource<'_> {
    fn read(&mut self) -> io::Result<Option<char>> {
        self.chars.read()
    }

    fn correct_offset(&self, offset: usize) -> usize {
        self.filtered.correct_offset(offset)
    }
}

/// Splitter inserting the tseks missing between merged syllables of Old
/// Tibetan texts (སྟགི → སྟག་གི, དྲངསྟེ → དྲངས་ཏེ).
pub struct MergedSyllableSplitter {
    rules: Vec<(Regex, &'static str)>,
}

impl MergedSyllableSplitter {
    pub fn new() -> Result<Self> {
        const RULES: [(&str, &str); 4] = [
            // དྲངསྟེ → དྲངས་ཏེ
            (r"([\x{0F40}-\x{0FBC}])\x{0F66}\x{0F9F}\x{0F7A}", "${1}\u{0F66}\u{0F0B}\u{0F4F}\u{0F7A}"),
            // གཅལྟོ → གཅལ་ཏོ
            (
                r"([\x{0F40}-\x{0FBC}][\x{0F53}\x{0F63}\x{0F62}])\x{0F9F}([\x{0F7A}\x{0F7C}])",
                "${1}\u{0F0B}\u{0F4F}${2}",
            ),
            // པགི་ → པག་གི་, except after a prefix of ག (ད བ མ འ)
            (
                r"([\x{0F40}-\x{0F50}\x{0F52}-\x{0F55}\x{0F57}\x{0F59}-\x{0F5F}\x{0F61}-\x{0FBC}])\x{0F42}([\x{0F72}\x{0F80}][^\x{0F40}-\x{0FBC}])",
                "${1}\u{0F42}\u{0F0B}\u{0F42}${2}",
            ),
            // བཀུམོ → བཀུམ་མོ
            (
                r"([\x{0F40}-\x{0FBC}][\x{0F40}-\x{0FBC}]+)([\x{0F40}-\x{0F5F}\x{0F61}-\x{0F6C}])([\x{0F7C}\x{0F7A}\x{0F74}\x{0F72}\x{0F80}])",
                "${1}${2}\u{0F0B}${2}${3}",
            ),
        ];
        let rules = RULES
            .iter()
            .map(|&(pattern, replacement)| -> Result<(Regex, &'static str)> {
                Ok((Regex::new(pattern)?, replacement))
            })
            .collect::<Result<_>>()?;
        Ok(Self { rules })
    }

    /// Apply every rule in order to the whole text
    pub fn split(&self, input: &str) -> FilteredText {
        let mut filtered = FilteredText {
            text: input.to_string(),
            offsets: Vec::with_capacity(self.rules.len()),
        };
        for (re, replacement) in &self.rules {
            let (text, offsets) = replace_all(re, replacement, &filtered.text);
            filtered.text = text;
            filtered.offsets.push(offsets);
        }
        filtered
    }
}

/// Replace every match, recording one transformation per match that covers
/// only the bytes that actually changed
fn replace_all(re: &Regex, replacement: &str, input: &str) -> (String, OffsetMap) {
    let mut output = String::with_capacity(input.len() + input.len() / 8);
    let mut offsets = OffsetMap::new();
    let mut last_match_end = 0;

    for caps in re.captures_iter(input) {
        let Some(m) = caps.get(0) else { continue };
        output.push_str(&input[last_match_end..m.start()]);

        let replacement_start = output.len();
        caps.expand(replacement, &mut output);
        let replaced = &output[replacement_start..];

        let prefix = common_prefix_len(m.as_str(), replaced);
        let suffix = common_suffix_len(&m.as_str()[prefix..], &replaced[prefix..]);
        let t = Transformation::new(
            m.start() + prefix,
            m.end() - suffix,
            replacement_start + prefix,
            output.len() - suffix,
        );
        if t.original_end - t.original_start != t.new_end - t.new_start {
            offsets.push(t);
        }
        last_match_end = m.end();
    }
    output.push_str(&input[last_match_end..]);

    (output, offsets)
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

fn common_suffix_len(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all<S: CharSource>(mut source: S) -> String {
        let mut out = String::new();
        while let Some(c) = source.read().unwrap() {
            out.push(c);
        }
        out
    }

    #[test]
    fn test_offset_map() {
        let mut map = OffsetMap::new();
        assert_eq!(map.correct(7), 7);

        // "abXd" → "abYYYd", then "e" deleted at original 4
        map.push(Transformation::new(2, 3, 2, 5));
        map.push(Transformation::new(4, 5, 6, 6));
        assert_eq!(map.correct(0), 0);
        assert_eq!(map.correct(2), 2);
        assert_eq!(map.correct(3), 2);
        assert_eq!(map.correct(5), 3);
        assert_eq!(map.correct(6), 5);
        assert_eq!(map.correct(8), 7);
    }

    #[test]
    fn test_str_source() {
        assert_eq!(read_all(StrSource::new("བཀྲ་ཤིས")), "བཀྲ་ཤིས");
        assert_eq!(read_all(StrSource::new("")), "");
    }

    #[test]
    fn test_reader_source_split_characters() {
        let text = "༆ བཀྲ་ཤིས་བདེ་ལེགས། abc";
        for chunk_size in [1, 2, 3, 5, 4096] {
            let source = ReaderSource::with_chunk_size(text.as_bytes(), chunk_size);
            assert_eq!(read_all(source), text, "chunk size {chunk_size}");
        }
    }

    #[test]
    fn test_reader_source_invalid_utf8() {
        let mut source = ReaderSource::new(&b"\xE0\xBD"[..]);
        let err = source.read().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let mut source = ReaderSource::new(&b"a\xFFb"[..]);
        assert_eq!(source.read().unwrap(), Some('a'));
        assert_eq!(source.read().unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_tibetan_char_map() {
        let map = CharMap::tibetan();
        assert_eq!(map.get('\u{0F0C}'), Some("\u{0F0B}"));
        assert_eq!(map.get('\u{0F43}'), Some("\u{0F42}\u{0FB7}"));
        assert_eq!(map.get('\u{0F77}'), Some("\u{0FB2}\u{0F71}\u{0F80}"));
        assert_eq!(map.get('\u{0F81}'), Some("\u{0F71}\u{0F80}"));
        assert_eq!(map.get('\u{0FB9}'), Some("\u{0F90}\u{0FB5}"));
        assert_eq!(map.get('\u{0F35}'), Some(""));
        assert_eq!(map.get('\u{0F00}'), Some("\u{0F68}\u{0F7C}\u{0F7E}"));
        assert_eq!(map.get('ཀ'), None);
        assert_eq!(map.get('་'), None);
    }

    #[test]
    fn test_mapping_source_offsets() {
        let map = CharMap::tibetan();
        let input = "\u{0F00}་ཆོ\u{0F37}ས";
        let mut source = MappingSource::new(StrSource::new(input), &map);

        let mut out = String::new();
        while let Some(c) = source.read().unwrap() {
            out.push(c);
        }
        assert_eq!(out, "ཨོཾ་ཆོས");

        // ཨོཾ spans 0..9 in the mapped text, ༀ 0..3 in the input
        assert_eq!(source.correct_offset(0), 0);
        assert_eq!(source.correct_offset(9), 3);
        // ཆོས after the tsek
        assert_eq!(source.correct_offset(12), 6);
        assert_eq!(source.correct_offset(21), input.len());
    }

    #[test]
    fn test_merged_syllables() {
        let splitter = MergedSyllableSplitter::new().unwrap();
        assert_eq!(splitter.split("དྲངསྟེ").text, "དྲངས་ཏེ");
        assert_eq!(splitter.split("གཅལྟོ").text, "གཅལ་ཏོ");
        assert_eq!(splitter.split("པགི་").text, "པག་གི་");
        assert_eq!(splitter.split("དགི་").text, "དགི་");
        assert_eq!(splitter.split("བཀུམོ").text, "བཀུམ་མོ");
        assert_eq!(splitter.split("བཀྲ་ཤིས").text, "བཀྲ་ཤིས");
    }

    #[test]
    fn test_merged_syllable_rules_all_compile() {
        let splitter = MergedSyllableSplitter::new().unwrap();
        assert_eq!(splitter.rules.len(), 4);
    }

    #[test]
    fn test_merged_syllable_offsets() {
        let splitter = MergedSyllableSplitter::new().unwrap();
        let input = "བཀུམོ";
        let filtered = splitter.split(input);
        assert_eq!(filtered.text, "བཀུམ་མོ");

        // བཀུམ is untouched
        assert_eq!(filtered.correct_offset(0), 0);
        assert_eq!(filtered.correct_offset(12), 12);
        // མོ is read back from the merged མོ
        let mo = "བཀུམ་".len();
        assert_eq!(filtered.correct_offset(mo), 12);
        assert_eq!(filtered.correct_offset(filtered.text.len()), input.len());

        let source = filtered.source();
        assert_eq!(source.correct_offset(filtered.text.len()), input.len());
    }
}
