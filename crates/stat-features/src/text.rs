//! Text Corpus Statistics

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::statistics::SummaryStats;

/// Lowercased alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Statistical descriptor for a buffered text corpus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextStatistics {
    /// Number of documents described
    pub sample_count: usize,
    /// Character length distribution over documents
    pub char_length: SummaryStats,
    /// Token count distribution over documents
    pub token_length: SummaryStats,
    /// Distinct token count across the corpus
    pub vocabulary_size: usize,
    /// Shannon entropy of the token frequency distribution, in nats
    pub token_entropy: Option<f64>,
    /// Vocabulary size over total token count
    pub type_token_ratio: Option<f64>,
}

impl TextStatistics {
    /// Compute the descriptor over buffered documents
    pub fn compute(texts: &[String]) -> Self {
        if texts.is_empty() {
            return Self::default();
        }

        let char_lengths: Vec<f64> = texts.iter().map(|t| t.chars().count() as f64).collect();

        let mut token_counts = Vec::with_capacity(texts.len());
        let mut frequencies: HashMap<String, usize> = HashMap::new();
        let mut total_tokens = 0usize;

        for text in texts {
            let tokens = tokenize(text);
            token_counts.push(tokens.len() as f64);
            total_tokens += tokens.len();
            for token in tokens {
                *frequencies.entry(token).or_default() += 1;
            }
        }

        debug!(
            documents = texts.len(),
            tokens = total_tokens,
            vocabulary = frequencies.len(),
            "text statistics computed"
        );

        let token_entropy = if total_tokens == 0 {
            None
        } else {
            let n = total_tokens as f64;
            let entropy = frequencies
                .values()
                .map(|&count| {
                    let p = count as f64 / n;
                    -p * p.ln()
                })
                .sum::<f64>();
            Some(entropy)
        };

        let type_token_ratio = if total_tokens == 0 {
            None
        } else {
            Some(frequencies.len() as f64 / total_tokens as f64)
        };

        Self {
            sample_count: texts.len(),
            char_length: SummaryStats::compute(&char_lengths),
            token_length: SummaryStats::compute(&token_counts),
            vocabulary_size: frequencies.len(),
            token_entropy,
            type_token_ratio,
        }
    }

    /// Fixed key set of the flat descriptor
    pub fn keys() -> &'static [&'static str] {
        &[
            "char_len_mean",
            "char_len_std",
            "char_len_max",
            "seq_len_mean",
            "seq_len_std",
            "seq_len_max",
            "vocabulary_size",
            "token_entropy",
            "type_token_ratio",
        ]
    }

    /// Flatten to the fixed key set; undefined metrics stay `None`
    pub fn flatten(&self) -> BTreeMap<String, Option<f64>> {
        let mut map = BTreeMap::new();
        map.insert("char_len_mean".to_string(), self.char_length.mean);
        map.insert("char_len_std".to_string(), self.char_length.std_dev);
        map.insert("char_len_max".to_string(), self.char_length.max);
        map.insert("seq_len_mean".to_string(), self.token_length.mean);
        map.insert("seq_len_std".to_string(), self.token_length.std_dev);
        map.insert("seq_len_max".to_string(), self.token_length.max);
        map.insert(
            "vocabulary_size".to_string(),
            Some(self.vocabulary_size as f64),
        );
        map.insert("token_entropy".to_string(), self.token_entropy);
        map.insert("type_token_ratio".to_string(), self.type_token_ratio);
        map
    }
}
