// Embedded lexicon scorer
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::SentimentScorer;

/// Applied to a word's polarity when a negator appears shortly before it.
const NEGATION_FACTOR: f64 = -0.5;
/// How many tokens before a word are searched for a negator.
const NEGATION_WINDOW: usize = 2;

/// Built-in polarity lexicon. Values are in [-1.0, 1.0].
const BUILTIN_LEXICON: &[(&str, f64)] = &[
    // positive
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("brilliant", 0.9),
    ("cheap", 0.4),
    ("clean", 0.37),
    ("comfortable", 0.4),
    ("cool", 0.35),
    ("delightful", 0.9),
    ("easy", 0.43),
    ("efficient", 0.5),
    ("enjoy", 0.4),
    ("enjoyed", 0.4),
    ("excellent", 1.0),
    ("exceptional", 0.67),
    ("fabulous", 0.4),
    ("fantastic", 0.4),
    ("fast", 0.2),
    ("favorite", 0.5),
    ("favourite", 0.5),
    ("fine", 0.42),
    ("friendly", 0.38),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("gorgeous", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("helpful", 0.5),
    ("impressive", 1.0),
    ("incredible", 0.9),
    ("love", 0.5),
    ("loved", 0.7),
    ("lovely", 0.5),
    ("nice", 0.6),
    ("okay", 0.2),
    ("ok", 0.2),
    ("outstanding", 0.5),
    ("perfect", 1.0),
    ("pleasant", 0.73),
    ("pleased", 0.5),
    ("positive", 0.23),
    ("quality", 0.3),
    ("recommend", 0.4),
    ("reliable", 0.6),
    ("satisfied", 0.5),
    ("smooth", 0.4),
    ("solid", 0.3),
    ("special", 0.36),
    ("splendid", 1.0),
    ("stunning", 0.5),
    ("superb", 1.0),
    ("terrific", 1.0),
    ("thanks", 0.2),
    ("useful", 0.3),
    ("valuable", 0.5),
    ("well", 0.2),
    ("wonderful", 1.0),
    ("worth", 0.3),
    // negative
    ("annoying", -0.8),
    ("angry", -0.5),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("broken", -0.4),
    ("buggy", -0.5),
    ("cheaply", -0.3),
    ("confusing", -0.3),
    ("damaged", -0.5),
    ("dirty", -0.6),
    ("disappointed", -0.75),
    ("disappointing", -0.6),
    ("disgusting", -1.0),
    ("dreadful", -0.8),
    ("expensive", -0.5),
    ("faulty", -0.5),
    ("flimsy", -0.4),
    ("hate", -0.8),
    ("hated", -0.9),
    ("horrible", -1.0),
    ("late", -0.3),
    ("mediocre", -0.3),
    ("negative", -0.3),
    ("overpriced", -0.5),
    ("pathetic", -1.0),
    ("poor", -0.4),
    ("problem", -0.2),
    ("problems", -0.2),
    ("rude", -0.6),
    ("sad", -0.5),
    ("slow", -0.3),
    ("terrible", -1.0),
    ("unhappy", -0.6),
    ("unreliable", -0.5),
    ("useless", -0.5),
    ("waste", -0.2),
    ("wasted", -0.2),
    ("worse", -0.4),
    ("worst", -1.0),
    ("wrong", -0.5),
];

/// Multipliers for the word directly before a lexicon hit.
const INTENSIFIERS: &[(&str, f64)] = &[
    ("absolutely", 1.3),
    ("extremely", 1.5),
    ("highly", 1.3),
    ("incredibly", 1.5),
    ("pretty", 1.1),
    ("quite", 1.1),
    ("really", 1.3),
    ("slightly", 0.5),
    ("so", 1.3),
    ("somewhat", 0.7),
    ("super", 1.3),
    ("totally", 1.3),
    ("truly", 1.3),
    ("very", 1.3),
];

const NEGATORS: &[&str] = &[
    "cannot", "hardly", "neither", "never", "no", "nobody", "none", "nor", "not", "nothing",
    "without",
];

/// Pattern-style scorer: averages lexicon polarities of the words in a text,
/// honouring intensifiers and nearby negation.
pub struct LexiconScorer {
    lexicon: HashMap<String, f64>,
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            lexicon: BUILTIN_LEXICON
                .iter()
                .map(|(word, polarity)| (word.to_string(), *polarity))
                .collect(),
        }
    }

    /// Add or override lexicon entries. Polarities are clamped to [-1.0, 1.0].
    pub fn with_entries<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        for (word, polarity) in entries {
            self.lexicon
                .insert(word.to_lowercase(), polarity.clamp(-1.0, 1.0));
        }
        self
    }

    /// Built-in lexicon extended by a JSON object file mapping word -> polarity.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read lexicon file: {}", path.display()))?;
        let entries: HashMap<String, f64> = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse lexicon file: {}", path.display()))?;

        if let Some((word, _)) = entries.iter().find(|(_, p)| !p.is_finite()) {
            bail!("Lexicon entry '{}' has a non-finite polarity", word);
        }

        info!("Loaded {} custom lexicon entries from {}", entries.len(), path.display());
        Ok(Self::new().with_entries(entries))
    }

    /// Polarity of `text`; 0.0 when no lexicon word occurs.
    pub fn polarity(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut total = 0.0;
        let mut hits = 0usize;

        for (i, token) in tokens.iter().enumerate() {
            let Some(&base) = self.lexicon.get(token.as_str()) else {
                continue;
            };

            let mut polarity = base;
            if let Some(prev) = i.checked_sub(1).map(|j| tokens[j].as_str()) {
                if let Some((_, factor)) = INTENSIFIERS.iter().find(|(w, _)| *w == prev) {
                    polarity *= factor;
                }
            }
            if tokens[i.saturating_sub(NEGATION_WINDOW)..i]
                .iter()
                .any(|t| is_negator(t))
            {
                polarity *= NEGATION_FACTOR;
            }

            total += polarity.clamp(-1.0, 1.0);
            hits += 1;
        }

        if hits == 0 {
            0.0
        } else {
            (total / hits as f64).clamp(-1.0, 1.0)
        }
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SentimentScorer for LexiconScorer {
    async fn score(&self, text: &str) -> Result<f64> {
        Ok(self.polarity(text))
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_negator(token: &str) -> bool {
    NEGATORS.contains(&token) || token.ends_with("n't")
}
