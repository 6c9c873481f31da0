//! The analysis pipeline: character filters, segmentation, token modifiers.

use std::sync::Arc;

use crate::char_filter::{CharMap, CharSource, MappingSource, MergedSyllableSplitter, StrSource};
use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::modifiers::{modify_token, StopWords};
use crate::token::Token;
use crate::tokenizer::Tokenizer;
use crate::trie::Trie;

/// Runs the steps enabled in an [`AnalyzerConfig`] in order:
///
/// 1. insertion of the tseks missing between merged syllables
/// 2. character normalization
/// 3. segmentation
/// 4. token modifiers
pub struct Analyzer {
    tokenizer: Tokenizer,
    config: AnalyzerConfig,
    char_map: CharMap,
    splitter: MergedSyllableSplitter,
    stop_words: StopWords,
}

impl Analyzer {
    /// Fails when the merged-syllable rules do not compile
    pub fn new(trie: Arc<Trie>, config: AnalyzerConfig) -> Result<Self> {
        Ok(Analyzer {
            tokenizer: Tokenizer::with_arc(trie).with_config(config.segmenter.clone()),
            char_map: CharMap::tibetan(),
            splitter: MergedSyllableSplitter::new()?,
            stop_words: StopWords::default(),
            config,
        })
    }

    /// Replace the default stop words
    pub fn with_stop_words(mut self, stop_words: StopWords) -> Self {
        self.stop_words = stop_words;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze a whole text
    pub fn analyze(&self, text: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        self.analyze_text(text, |token| {
            tokens.push(token);
            Ok(())
        })?;
        Ok(tokens)
    }

    /// Analyze a whole text, handing tokens out as they are produced
    pub fn analyze_text<F>(&self, text: &str, emit: F) -> Result<()>
    where
        F: FnMut(Token) -> Result<()>,
    {
        if self.config.split_merged_syllables {
            let filtered = self.splitter.split(text);
            self.analyze_source(filtered.source(), emit)
        } else {
            self.analyze_source(StrSource::new(text), emit)
        }
    }

    /// Analyze a stream.
    ///
    /// Merged syllables are not split here: the splitter needs the whole
    /// text, see [`Analyzer::analyze_text`].
    pub fn analyze_source<S, F>(&self, source: S, emit: F) -> Result<()>
    where
        S: CharSource,
        F: FnMut(Token) -> Result<()>,
    {
        if self.config.normalize_chars {
            self.run(MappingSource::new(source, &self.char_map), emit)
        } else {
            self.run(source, emit)
        }
    }

    fn run<S, F>(&self, source: S, mut emit: F) -> Result<()>
    where
        S: CharSource,
        F: FnMut(Token) -> Result<()>,
    {
        for token in self.tokenizer.segment(source) {
            if let Some(token) = modify_token(token?, &self.config.modifiers, &self.stop_words) {
                emit(token)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModifierConfig, SegmentMode, SegmenterConfig};
    use crate::trie::TrieBuilder;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_char_normalization() {
        let config = AnalyzerConfig {
            segmenter: SegmenterConfig {
                mode: SegmentMode::Syllable,
                ..Default::default()
            },
            normalize_chars: true,
            ..Default::default()
        };
        let analyzer = Analyzer::new(Arc::new(Trie::new()), config).unwrap();
        let input = "\u{0F00}་ཆོ\u{0F37}ས";
        let tokens = analyzer.analyze(input).unwrap();

        assert_eq!(texts(&tokens), vec!["\u{0F68}\u{0F7C}\u{0F7E}", "ཆོས"]);
        assert_eq!((tokens[0].start, tokens[0].end), (0, 3));
        assert_eq!((tokens[1].start, tokens[1].end), (6, input.len()));
    }

    #[test]
    fn test_merged_syllables() {
        let mut builder = TrieBuilder::new();
        builder.add("བཀུམ", "X");
        let config = AnalyzerConfig {
            split_merged_syllables: true,
            ..Default::default()
        };
        let analyzer = Analyzer::new(Arc::new(builder.build()), config).unwrap();
        let tokens = analyzer.analyze("བཀུམོ").unwrap();

        assert_eq!(texts(&tokens), vec!["བཀུམ", "མོ"]);
        assert_eq!((tokens[0].start, tokens[0].end), (0, 12));
        assert_eq!((tokens[1].start, tokens[1].end), (12, 15));
    }

    #[test]
    fn test_modifiers() {
        let config = AnalyzerConfig {
            segmenter: SegmenterConfig {
                mode: SegmentMode::Syllable,
                ..Default::default()
            },
            modifiers: ModifierConfig {
                strip_affixes: true,
                normalize_pa_ba: true,
                remove_stop_words: false,
            },
            ..Default::default()
        };
        let analyzer = Analyzer::new(Arc::new(Trie::new()), config).unwrap();
        let tokens = analyzer.analyze("གསལ་བ གསལ་བོ གསལ་བོའི").unwrap();
        assert_eq!(texts(&tokens), vec!["གསལ", "པ", "གསལ", "པོ", "གསལ", "པོ"]);
    }

    #[test]
    fn test_custom_stop_words() {
        let config = AnalyzerConfig {
            modifiers: ModifierConfig {
                remove_stop_words: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let analyzer = Analyzer::new(Arc::new(Trie::new()), config)
            .unwrap()
            .with_stop_words(StopWords::parse("ཀ"));
        let tokens = analyzer.analyze("ཀ་ཁ་ཀྱིས").unwrap();
        assert_eq!(texts(&tokens), vec!["ཁ", "ཀྱིས"]);
    }
}
