//! The segmenter implementing the maximal-matching algorithm.
//!
//! Text is read one character at a time from a [`CharSource`] through a
//! [`Cursor`]. In word mode the segmenter walks the dictionary automaton
//! syllable after syllable and remembers the last position where a dictionary
//! entry ended right before a tsek (the confirmed end). When the automaton
//! has no transition left, the token is rolled back to that position and
//! everything read past it is read again for the next token. Syllables with
//! no dictionary entry at all come out as fallback tokens.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::char_categories::{is_boundary, is_well_formed_stack, is_word_char, VISARGA};
use crate::char_filter::{CharSource, StrSource};
use crate::config::{SegmentMode, SegmenterConfig};
use crate::cursor::Cursor;
use crate::error::Result;
use crate::stack::split_stacks;
use crate::token::{Confidence, Token};
use crate::trie::{CommandIndex, RowRef, Trie};

/// What the walk does after a character was fed to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The character belongs to the token, read the next one
    Continue,
    /// The token is over; the character was not consumed
    Stop,
}

/// How a token ends once its walk is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Cursor index right after the last character of the token
    pub end: usize,
    /// Command of the dictionary entry the token matched
    pub command: Option<CommandIndex>,
    pub confidence: Confidence,
}

/// Walk state of the token being read.
///
/// Indexes are absolute cursor indexes. The state is rebuilt by
/// [`SegmenterState::begin`] for every token and never looks at the input
/// by itself, so it can be driven character by character in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmenterState {
    start: usize,
    /// Right after the last word character consumed
    end: usize,
    /// Characters consumed, tseks included
    len: usize,
    /// Automaton row the next character is looked up in
    row: Option<RowRef>,
    /// Entry ending on the last character consumed, not yet followed by a tsek
    pending: Option<(usize, CommandIndex)>,
    /// Last entry followed by a tsek
    confirmed: Option<(usize, CommandIndex)>,
    passed_first_syllable: bool,
    first_syllable_end: usize,
}

impl SegmenterState {
    /// Start a token on its first character
    pub fn begin(&mut self, trie: &Trie, idx: usize, c: char) {
        let root = trie.row(trie.root());
        *self = SegmenterState {
            start: idx,
            end: idx + 1,
            len: 1,
            row: root.next(c),
            pending: root.command(c).map(|cmd| (idx + 1, cmd)),
            ..SegmenterState::default()
        };
    }

    /// Feed the character at `idx`, a word character or a tsek
    pub fn step(&mut self, trie: &Trie, idx: usize, c: char) -> Step {
        let boundary = is_boundary(c);
        let in_first_syllable = !self.passed_first_syllable;

        if boundary {
            // entries only count when they end right before a tsek
            if let Some(pending) = self.pending.take() {
                self.confirm(pending);
            }
            if in_first_syllable {
                self.passed_first_syllable = true;
                self.first_syllable_end = idx;
            }
        }

        let Some(row) = self.row else {
            // fell off the automaton: an unknown first syllable is read to
            // its end, anything later is left for the next token
            self.pending = None;
            if in_first_syllable && !boundary {
                self.len += 1;
                self.end = idx + 1;
                return Step::Continue;
            }
            return Step::Stop;
        };

        let row = trie.row(row);
        self.pending = if boundary {
            None
        } else {
            row.command(c).map(|cmd| (idx + 1, cmd))
        };
        self.row = row.next(c);
        self.len += 1;
        if !boundary {
            self.end = idx + 1;
        }
        Step::Continue
    }

    fn confirm(&mut self, (end, cmd): (usize, CommandIndex)) {
        debug_assert!(
            self.confirmed.map_or(true, |(previous, _)| previous <= end),
            "confirmed end moved back from {:?} to {end}",
            self.confirmed
        );
        self.confirmed = Some((end, cmd));
    }

    /// Index of the character that decides on the pending entry
    pub fn pending_end(&self) -> Option<usize> {
        self.pending.map(|(end, _)| end)
    }

    /// Close the walk. `lookahead` is the character at
    /// [`SegmenterState::pending_end`], `None` at the end of the stream.
    ///
    /// A pending entry is kept if no word character follows it. The token
    /// then ends at the last confirmed entry, or after its first syllable,
    /// or after everything read when no tsek was crossed.
    pub fn finish(&mut self, lookahead: Option<char>) -> Outcome {
        if let Some(pending) = self.pending.take() {
            if !lookahead.is_some_and(is_word_char) {
                self.confirm(pending);
            }
        }
        match self.confirmed {
            Some((end, cmd)) => Outcome {
                end,
                command: Some(cmd),
                confidence: Confidence::Dictionary,
            },
            None if self.passed_first_syllable => Outcome {
                end: self.first_syllable_end,
                command: None,
                confidence: Confidence::Fallback,
            },
            None => Outcome {
                end: self.end,
                command: None,
                confidence: Confidence::Fallback,
            },
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Characters consumed so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn passed_first_syllable(&self) -> bool {
        self.passed_first_syllable
    }

    pub fn confirmed_end(&self) -> Option<usize> {
        self.confirmed.map(|(end, _)| end)
    }
}

/// Stream of tokens read from a character source
pub struct Segmenter<S> {
    trie: Arc<Trie>,
    config: SegmenterConfig,
    cursor: Cursor<S>,
    state: SegmenterState,
    /// Stacks of a split syllable, not handed out yet
    queue: VecDeque<Token>,
    failed: bool,
}

impl<S: CharSource> Segmenter<S> {
    pub fn new(trie: Arc<Trie>, config: SegmenterConfig, source: S) -> Self {
        Segmenter {
            trie,
            config,
            cursor: Cursor::new(source),
            state: SegmenterState::default(),
            queue: VecDeque::new(),
            failed: false,
        }
    }

    /// Read the next token, `None` once the source is exhausted
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        if let Some(token) = self.queue.pop_front() {
            return Ok(Some(token));
        }
        // nothing before the position can be rolled back into anymore
        let position = self.cursor.position();
        self.cursor.free_before(position);

        match self.config.mode {
            SegmentMode::Word => self.next_word(),
            SegmentMode::Syllable | SegmentMode::Stack => self.next_syllable(),
        }
    }

    /// Skip to the first word character and consume it
    fn skip_to_word(&mut self) -> Result<Option<(usize, char)>> {
        loop {
            let idx = self.cursor.position();
            match self.cursor.next()? {
                None => return Ok(None),
                Some(c) if is_word_char(c) => return Ok(Some((idx, c))),
                Some(_) => self.cursor.free_before(idx + 1),
            }
        }
    }

    fn next_word(&mut self) -> Result<Option<Token>> {
        let Some((start, first)) = self.skip_to_word()? else {
            return Ok(None);
        };
        let cap = self.config.token_cap();

        self.state.begin(&self.trie, start, first);
        while self.state.len() < cap {
            let idx = self.cursor.position();
            let Some(c) = self.cursor.next()? else {
                break;
            };
            if !is_word_char(c) && !is_boundary(c) {
                break;
            }
            if self.state.step(&self.trie, idx, c) == Step::Stop {
                break;
            }
        }

        let lookahead = match self.state.pending_end() {
            Some(idx) => self.cursor.peek_at(idx)?,
            None => None,
        };
        let outcome = self.state.finish(lookahead);
        if self.cursor.position() > outcome.end {
            log::trace!(
                "backtrack from {} to {}",
                self.cursor.position(),
                outcome.end
            );
        }
        self.cursor.rewind(outcome.end);

        let mut text = self.cursor.text(start, outcome.end);
        if let Some(cmd) = outcome.command {
            text = self.lemmatize(text, cmd);
        }
        Ok(Some(self.make_token(text, start, outcome.end, outcome.confidence)))
    }

    fn next_syllable(&mut self) -> Result<Option<Token>> {
        let Some((start, first)) = self.skip_to_word()? else {
            return Ok(None);
        };
        let cap = self.config.token_cap();

        let mut end = start + 1;
        if first != VISARGA {
            while end - start < cap {
                match self.cursor.peek()? {
                    Some(c) if is_word_char(c) => {
                        self.cursor.next()?;
                        end += 1;
                        if c == VISARGA {
                            break;
                        }
                    }
                    _ => break,
                }
            }
        }

        let text = self.cursor.text(start, end);
        if let Some(cmd) = self.trie.lookup(&text) {
            let text = self.lemmatize(text, cmd);
            return Ok(Some(self.make_token(text, start, end, Confidence::Dictionary)));
        }

        if self.config.mode == SegmentMode::Stack {
            let run: Vec<char> = text.chars().collect();
            if !is_well_formed_stack(&run, 0, run.len()) {
                let mut from = 0;
                for to in split_stacks(&run) {
                    let stack: String = run[from..to].iter().collect();
                    let token = self.make_token(stack, start + from, start + to, Confidence::Fallback);
                    self.queue.push_back(token);
                    from = to;
                }
                return Ok(self.queue.pop_front());
            }
        }

        Ok(Some(self.make_token(text, start, end, Confidence::Fallback)))
    }

    fn lemmatize(&self, text: String, cmd: CommandIndex) -> String {
        if !self.config.lemmatize {
            return text;
        }
        let lemma = match self.trie.command(cmd).apply(&text) {
            Cow::Borrowed(kept) if kept.len() == text.len() => None,
            lemma => Some(lemma.into_owned()),
        };
        lemma.unwrap_or(text)
    }

    fn make_token(&self, text: String, start: usize, end: usize, confidence: Confidence) -> Token {
        let token = Token::new(
            text,
            self.cursor.correct_offset(self.cursor.offset_of(start)),
            self.cursor.correct_offset(self.cursor.offset_of(end)),
            confidence,
        );
        log::trace!(
            "token {} [{}..{}) {}",
            token.text,
            token.start,
            token.end,
            token.confidence.as_str()
        );
        token
    }

    /// Start over on a new source
    pub fn reset(&mut self, source: S) {
        self.cursor.reset(source);
        self.state = SegmenterState::default();
        self.queue.clear();
        self.failed = false;
    }

    /// Offset in the original input of the end of what was read so far
    pub fn final_offset(&self) -> usize {
        self.cursor.correct_offset(self.cursor.end_offset())
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }
}

impl<S: CharSource> Iterator for Segmenter<S> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// The main tokenizer
pub struct Tokenizer {
    /// The dictionary trie (shared reference)
    trie: Arc<Trie>,
    config: SegmenterConfig,
}

impl Tokenizer {
    /// Create a new tokenizer with the given trie
    pub fn new(trie: Trie) -> Self {
        Tokenizer::with_arc(Arc::new(trie))
    }

    /// Create a new tokenizer with a shared trie reference
    pub fn with_arc(trie: Arc<Trie>) -> Self {
        Tokenizer {
            trie,
            config: SegmenterConfig::default(),
        }
    }

    /// Replace the segmenter settings
    pub fn with_config(mut self, config: SegmenterConfig) -> Self {
        self.config = config;
        self
    }

    /// Get a reference to the trie
    pub fn trie(&self) -> &Trie {
        &self.trie
    }

    /// Get the Arc reference to the trie (for sharing)
    pub fn trie_arc(&self) -> Arc<Trie> {
        Arc::clone(&self.trie)
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Segment a character source, token by token
    pub fn segment<S: CharSource>(&self, source: S) -> Segmenter<S> {
        Segmenter::new(self.trie_arc(), self.config.clone(), source)
    }

    /// Tokenize a string
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        self.segment(StrSource::new(text)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::TrieBuilder;

    fn make_test_trie() -> Trie {
        let mut builder = TrieBuilder::new();
        builder
            .add_lines("བཀྲ་ཤིས X\nབདེ་ལེགས X\nབཀྲ་ཤིས་བདེ་ལེགས X\nཏུ /དུ\nཐོབ་པར >A")
            .unwrap();
        builder.build()
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_longest_match() {
        let tokenizer = Tokenizer::new(make_test_trie());
        let tokens = tokenizer.tokenize("བཀྲ་ཤིས་བདེ་ལེགས།").unwrap();

        assert_eq!(texts(&tokens), vec!["བཀྲ་ཤིས་བདེ་ལེགས"]);
        assert_eq!(tokens[0].confidence, Confidence::Dictionary);
        assert_eq!(tokens[0].start, 0);
        assert_eq!(tokens[0].end, "བཀྲ་ཤིས་བདེ་ལེགས".len());
    }

    #[test]
    fn test_unknown_word() {
        let tokenizer = Tokenizer::new(make_test_trie());
        let tokens = tokenizer.tokenize("ཀཀ་").unwrap();

        assert_eq!(texts(&tokens), vec!["ཀཀ"]);
        assert_eq!(tokens[0].confidence, Confidence::Fallback);
    }

    #[test]
    fn test_mixed_known_unknown() {
        let tokenizer = Tokenizer::new(make_test_trie());
        let tokens = tokenizer.tokenize("བཀྲ་ཤིས་ཀཀ་").unwrap();

        assert_eq!(texts(&tokens), vec!["བཀྲ་ཤིས", "ཀཀ"]);
        assert!(tokens[0].is_known());
        assert!(!tokens[1].is_known());
    }

    #[test]
    fn test_lemmatization_toggle() {
        let tokenizer = Tokenizer::new(make_test_trie());
        let tokens = tokenizer.tokenize("ཏུ་ཐོབ་པར་").unwrap();
        assert_eq!(texts(&tokens), vec!["དུ", "ཐོབ་པ"]);
        // offsets still cover the surface form
        assert_eq!(tokens[1].end - tokens[1].start, "ཐོབ་པར".len());

        let tokenizer = tokenizer.with_config(SegmenterConfig {
            lemmatize: false,
            ..Default::default()
        });
        let tokens = tokenizer.tokenize("ཏུ་ཐོབ་པར་").unwrap();
        assert_eq!(texts(&tokens), vec!["ཏུ", "ཐོབ་པར"]);
    }

    #[test]
    fn test_backtrack_to_first_syllable() {
        let tokenizer = Tokenizer::new(make_test_trie());
        // the walk goes as far as བཀྲ་ཤ before falling off
        let tokens = tokenizer.tokenize("བཀྲ་ཤོག").unwrap();
        assert_eq!(texts(&tokens), vec!["བཀྲ", "ཤོག"]);
        assert_eq!(tokens[1].start, "བཀྲ་".len());
    }

    #[test]
    fn test_syllable_mode() {
        let tokenizer = Tokenizer::new(make_test_trie()).with_config(SegmenterConfig {
            mode: SegmentMode::Syllable,
            ..Default::default()
        });
        let tokens = tokenizer.tokenize("བཀྲ་ཤིས། ཏུ").unwrap();

        assert_eq!(texts(&tokens), vec!["བཀྲ", "ཤིས", "དུ"]);
        assert_eq!(tokens[0].confidence, Confidence::Fallback);
        assert_eq!(tokens[2].confidence, Confidence::Dictionary);
    }

    #[test]
    fn test_syllable_mode_visarga() {
        let tokenizer = Tokenizer::new(Trie::new()).with_config(SegmenterConfig {
            mode: SegmentMode::Syllable,
            ..Default::default()
        });
        let tokens = tokenizer.tokenize("ནཿམཿ").unwrap();
        assert_eq!(texts(&tokens), vec!["ནཿ", "མཿ"]);
    }

    #[test]
    fn test_stack_mode() {
        let tokenizer = Tokenizer::new(make_test_trie()).with_config(SegmenterConfig {
            mode: SegmentMode::Stack,
            ..Default::default()
        });
        let tokens = tokenizer.tokenize("བསྒྲུབས་ཀྲ་ཏུ").unwrap();

        assert_eq!(texts(&tokens), vec!["བ", "སྒྲུ", "བ", "ས", "ཀྲ", "དུ"]);
        assert_eq!(tokens[1].start, "བ".len());
        assert_eq!(tokens[1].end, "བསྒྲུ".len());
        assert_eq!(tokens[5].confidence, Confidence::Dictionary);
    }

    #[test]
    fn test_token_cap() {
        let tokenizer = Tokenizer::new(Trie::new()).with_config(SegmenterConfig {
            max_token_len: 3,
            ..Default::default()
        });
        let tokens = tokenizer.tokenize("ཀཀཀཀཀ").unwrap();
        assert_eq!(texts(&tokens), vec!["ཀཀཀ", "ཀཀ"]);
        assert_eq!(tokens[1].start, 9);
    }

    #[test]
    fn test_state_step_by_step() {
        let trie = make_test_trie();
        let mut state = SegmenterState::default();
        let input: Vec<char> = "བཀྲ་ཤིས་ཀཀ".chars().collect();

        state.begin(&trie, 0, input[0]);
        let mut steps = Vec::new();
        for (idx, &c) in input.iter().enumerate().skip(1) {
            let step = state.step(&trie, idx, c);
            steps.push(step);
            if step == Step::Stop {
                break;
            }
        }

        // the walk falls off on the first ཀ and stops before the second one
        assert_eq!(steps.last(), Some(&Step::Stop));
        assert_eq!(steps.len(), 9);
        assert!(state.passed_first_syllable());
        assert_eq!(state.confirmed_end(), Some(7));

        let outcome = state.finish(None);
        assert_eq!(outcome.end, 7);
        assert_eq!(outcome.confidence, Confidence::Dictionary);
    }

    #[test]
    fn test_pending_needs_a_boundary() {
        let mut builder = TrieBuilder::new();
        builder.add("ཀ", "X");
        let trie = builder.build();

        let mut state = SegmenterState::default();
        state.begin(&trie, 0, 'ཀ');
        assert_eq!(state.pending_end(), Some(1));
        // followed by a letter: not a match
        let outcome = state.clone().finish(Some('ི'));
        assert_eq!(outcome.confidence, Confidence::Fallback);
        // followed by punctuation: a match
        let outcome = state.finish(Some('།'));
        assert_eq!(outcome.confidence, Confidence::Dictionary);
        assert_eq!(outcome.end, 1);
    }

    #[test]
    fn test_iterator_and_reset() {
        let tokenizer = Tokenizer::new(make_test_trie());
        let mut segmenter = tokenizer.segment(StrSource::new("བཀྲ་ཤིས།"));
        assert_eq!(segmenter.next().unwrap().unwrap().text, "བཀྲ་ཤིས");
        assert!(segmenter.next().is_none());
        assert_eq!(segmenter.final_offset(), "བཀྲ་ཤིས།".len());

        segmenter.reset(StrSource::new("ཏུ"));
        assert_eq!(segmenter.next().unwrap().unwrap().text, "དུ");
        assert!(segmenter.next().is_none());
    }

    #[test]
    fn test_arc_sharing() {
        let tokenizer1 = Tokenizer::new(make_test_trie());
        let tokenizer2 = Tokenizer::with_arc(tokenizer1.trie_arc());

        let tokens1 = tokenizer1.tokenize("བཀྲ་ཤིས།").unwrap();
        let tokens2 = tokenizer2.tokenize("བཀྲ་ཤིས།").unwrap();
        assert_eq!(tokens1, tokens2);
    }

    #[test]
    fn test_concurrent_segmenters() {
        let trie = Arc::new(make_test_trie());
        let texts = [
            "བཀྲ་ཤིས་བདེ་ལེགས། ཏུ་ཐོབ་པར་",
            "ཕུན་སུམ་ཚོགས། བཀྲ་ཤིས",
            "ཀཀཀཀ་བདེ་ལེགས་ཏུ",
            "བཀྲ་ཤིས་བདེ་ཐོབ་པར།",
        ];
        let expected: Vec<Vec<Token>> = texts
            .iter()
            .map(|text| Tokenizer::with_arc(Arc::clone(&trie)).tokenize(text).unwrap())
            .collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let trie = Arc::clone(&trie);
                    let text = texts[i % texts.len()];
                    scope.spawn(move || {
                        let segmenter = Segmenter::new(trie, SegmenterConfig::default(), StrSource::new(text));
                        segmenter.collect::<Result<Vec<Token>>>().unwrap()
                    })
                })
                .collect();
            for (i, handle) in handles.into_iter().enumerate() {
                assert_eq!(handle.join().unwrap(), expected[i % texts.len()]);
            }
        });
    }
}
