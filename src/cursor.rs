//! Streaming cursor over a character source.
//!
//! Characters are addressed by their absolute index in the stream. The cursor
//! keeps a rolling window of the characters read so far, from the oldest one
//! still needed to the furthest one looked ahead at, so the segmenter can look
//! ahead and roll back without the whole input being in memory.

use std::collections::VecDeque;
use std::io;

use crate::char_filter::CharSource;

/// Pull-based cursor with lookahead, rewind and prefix reclamation
pub struct Cursor<S> {
    source: S,
    /// Characters from index `base` on, with the byte offset each starts at
    window: VecDeque<(char, usize)>,
    /// Absolute index of the first character of the window
    base: usize,
    /// Absolute index of the next character returned by `next`
    pos: usize,
    /// Byte offset right after the last character read from the source
    end_offset: usize,
    exhausted: bool,
}

impl<S: CharSource> Cursor<S> {
    pub fn new(source: S) -> Self {
        Cursor {
            source,
            window: VecDeque::new(),
            base: 0,
            pos: 0,
            end_offset: 0,
            exhausted: false,
        }
    }

    /// Read from the source until index `idx` is in the window, or the
    /// source is exhausted
    fn fill_to(&mut self, idx: usize) -> io::Result<()> {
        while !self.exhausted && self.base + self.window.len() <= idx {
            match self.source.read()? {
                Some(c) => {
                    self.window.push_back((c, self.end_offset));
                    self.end_offset += c.len_utf8();
                }
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    /// Return the character at the current position and advance past it
    pub fn next(&mut self) -> io::Result<Option<char>> {
        let c = self.peek_at(self.pos)?;
        if c.is_some() {
            self.pos += 1;
        }
        Ok(c)
    }

    /// Character at the current position, without advancing
    pub fn peek(&mut self) -> io::Result<Option<char>> {
        self.peek_at(self.pos)
    }

    /// Character at an absolute index, reading ahead as needed.
    ///
    /// `None` past the end of the stream.
    pub fn peek_at(&mut self, idx: usize) -> io::Result<Option<char>> {
        debug_assert!(idx >= self.base, "index {idx} was freed (window starts at {})", self.base);
        self.fill_to(idx)?;
        Ok(self.get(idx))
    }

    /// Character at an absolute index if it is in the window
    pub fn get(&self, idx: usize) -> Option<char> {
        let i = idx.checked_sub(self.base)?;
        self.window.get(i).map(|&(c, _)| c)
    }

    /// Absolute index of the next character
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the position back (or forward, within what was read) to `idx`
    pub fn rewind(&mut self, idx: usize) {
        debug_assert!(idx >= self.base, "cannot rewind into freed index {idx}");
        debug_assert!(idx <= self.base + self.window.len());
        self.pos = idx;
    }

    /// Byte offset, in the source stream, at which character `idx` starts.
    ///
    /// Indexes at or past the end of what was read map to the end offset.
    pub fn offset_of(&self, idx: usize) -> usize {
        match idx.checked_sub(self.base) {
            Some(i) => self.window.get(i).map_or(self.end_offset, |&(_, offset)| offset),
            None => self.window.front().map_or(self.end_offset, |&(_, offset)| offset),
        }
    }

    /// Characters from `start` to `end` (exclusive), as a string
    pub fn text(&self, start: usize, end: usize) -> String {
        (start..end).filter_map(|i| self.get(i)).collect()
    }

    /// Drop every character before `idx`. Indexes at or after `idx` stay valid.
    pub fn free_before(&mut self, idx: usize) {
        debug_assert!(idx <= self.pos, "freeing {idx} past the position {}", self.pos);
        let n = idx.saturating_sub(self.base).min(self.window.len());
        self.window.drain(..n);
        self.base += n;
    }

    /// Number of characters held in the window
    pub fn buffered(&self) -> usize {
        self.window.len()
    }

    /// Byte offset right after the last character read from the source
    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    /// Map a stream offset to an offset of the original input
    pub fn correct_offset(&self, offset: usize) -> usize {
        self.source.correct_offset(offset)
    }

    /// Start over on a new source
    pub fn reset(&mut self, source: S) {
        *self = Cursor::new(source);
    }
}
