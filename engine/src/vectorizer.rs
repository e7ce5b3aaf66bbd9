use crate::tokenizer::{tokenize, TokenizerOptions};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type TermId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// IDF = ln((1 + n) / (1 + df)) + 1 instead of ln(n / df) + 1
    pub smooth_idf: bool,
    /// TF = 1 + ln(count) instead of the raw count
    pub sublinear_tf: bool,
    pub stem: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self { smooth_idf: true, sublinear_tf: false, stem: false }
    }
}

impl VectorizerConfig {
    fn tokenizer(&self) -> TokenizerOptions {
        TokenizerOptions { stem: self.stem }
    }
}

/// Sparse weight vector, entries sorted by term id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub entries: Vec<(TermId, f32)>,
}

impl SparseVector {
    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|(_, w)| *w == 0.0)
    }

    pub fn norm(&self) -> f32 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt()
    }

    pub fn dot_dense(&self, dense: &[f32]) -> f32 {
        self.entries.iter().map(|(t, w)| w * dense.get(*t as usize).copied().unwrap_or(0.0)).sum()
    }

    pub fn to_dense(&self, dims: usize) -> Vec<f32> {
        let mut dense = vec![0.0; dims];
        for (t, w) in &self.entries {
            if let Some(slot) = dense.get_mut(*t as usize) {
                *slot = *w;
            }
        }
        dense
    }
}

/// Vocabulary and IDF weights fit over the catalog's tag text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSpaceModel {
    pub vocabulary: BTreeMap<String, TermId>,
    pub idf: Vec<f32>,
    pub config: VectorizerConfig,
}

/// One L2-normalized row per catalog item, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTermMatrix {
    rows: Vec<SparseVector>,
}

impl DocumentTermMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&SparseVector> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }
}

/// Fit a TF-IDF model over `corpus` and return it with the transformed corpus.
pub fn fit<S: AsRef<str>>(corpus: &[S], config: &VectorizerConfig) -> (VectorSpaceModel, DocumentTermMatrix) {
    let options = config.tokenizer();
    let tokenized: Vec<Vec<String>> = corpus.iter().map(|doc| tokenize(doc.as_ref(), &options)).collect();

    // Columns follow sorted term order so refits are reproducible.
    let terms: BTreeSet<&str> = tokenized.iter().flatten().map(String::as_str).collect();
    let vocabulary: BTreeMap<String, TermId> =
        terms.into_iter().enumerate().map(|(id, term)| (term.to_string(), id as TermId)).collect();

    let mut df = vec![0u32; vocabulary.len()];
    for tokens in &tokenized {
        let unique: BTreeSet<TermId> = tokens.iter().filter_map(|t| vocabulary.get(t).copied()).collect();
        for tid in unique {
            df[tid as usize] += 1;
        }
    }

    let n = corpus.len() as f32;
    let idf = df
        .iter()
        .map(|&df_t| {
            let df_t = df_t as f32;
            if config.smooth_idf { ((1.0 + n) / (1.0 + df_t)).ln() + 1.0 } else { (n / df_t.max(1.0)).ln() + 1.0 }
        })
        .collect();

    let model = VectorSpaceModel { vocabulary, idf, config: *config };
    let rows = tokenized.iter().map(|tokens| model.weigh(tokens)).collect();
    tracing::info!(documents = corpus.len(), terms = model.vocabulary.len(), "vector space fit");
    (model, DocumentTermMatrix { rows })
}

impl VectorSpaceModel {
    pub fn dims(&self) -> usize {
        self.idf.len()
    }

    /// Project arbitrary text into the fitted space. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&tokenize(text, &self.config.tokenizer()))
    }

    /// Terms indexed by column. Columns follow sorted term order, so this is
    /// the vocabulary's key order.
    pub fn terms(&self) -> Vec<&str> {
        self.vocabulary.keys().map(String::as_str).collect()
    }

    /// Weighted terms of `text`, heaviest first.
    pub fn term_weights(&self, text: &str) -> Vec<(&str, f32)> {
        let terms = self.terms();
        let mut weights: Vec<(&str, f32)> = self
            .transform(text)
            .entries
            .into_iter()
            .filter_map(|(tid, w)| terms.get(tid as usize).map(|term| (*term, w)))
            .collect();
        weights.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        weights
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut counts: BTreeMap<TermId, u32> = BTreeMap::new();
        for token in tokens {
            if let Some(&tid) = self.vocabulary.get(token) {
                *counts.entry(tid).or_insert(0) += 1;
            }
        }
        let mut entries: Vec<(TermId, f32)> = counts
            .into_iter()
            .map(|(tid, count)| {
                let tf = if self.config.sublinear_tf { 1.0 + (count as f32).ln() } else { count as f32 };
                (tid, tf * self.idf[tid as usize])
            })
            .collect();

        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in entries.iter_mut() {
                *w /= norm;
            }
        }
        SparseVector { entries }
    }
}
