use crate::config::TokenizerConfig;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref SEGMENT_RE: Regex = Regex::new(r"(?u)[\p{L}\p{M}\p{N}_']+|\s+|[^\s\p{L}\p{M}\p{N}_']").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Text segmentation capability. Implementations return raw tokens in order,
/// separators included if they like; [`Analyzer`] does the normalization.
pub trait Tokenizer: Send + Sync {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Splits on Unicode letter/number runs, emitting whitespace runs and single
/// punctuation characters as their own tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn segment(&self, text: &str) -> Vec<String> {
        SEGMENT_RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
    }
}

/// Tokenizer plus term normalization. Build and query share one instance so
/// both sides see identical terms.
#[derive(Clone)]
pub struct Analyzer {
    tokenizer: Arc<dyn Tokenizer>,
    config: TokenizerConfig,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}

impl Analyzer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self::with_tokenizer(Arc::new(WordTokenizer), config)
    }

    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>, config: TokenizerConfig) -> Self {
        Self { tokenizer, config }
    }

    pub fn config(&self) -> TokenizerConfig {
        self.config
    }

    /// Segment `text` and return normalized terms in order (duplicates kept).
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.tokenizer
            .segment(text)
            .iter()
            .filter_map(|token| normalize_term(token, self.config))
            .collect()
    }
}

/// NFKC + lowercase a single token. Returns `None` for tokens that carry no
/// letters or digits, and for stopwords when those are filtered.
pub fn normalize_term(token: &str, config: TokenizerConfig) -> Option<String> {
    if !token.chars().any(char::is_alphanumeric) {
        return None;
    }
    let folded = token.trim().nfkc().collect::<String>().to_lowercase();
    if config.stopwords && STOPWORDS.contains(folded.as_str()) {
        return None;
    }
    if config.stem {
        return Some(STEMMER.stem(&folded).into_owned());
    }
    Some(folded)
}
