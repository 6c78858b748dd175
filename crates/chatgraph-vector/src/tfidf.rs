//! TF-IDF statistics over a tokenized message corpus.
//!
//! Each message is one document. Per-term feature vectors are sparse and
//! keyed by document index, so terms used in the same messages end up close
//! to each other.

use std::collections::{BTreeMap, HashMap};

use crate::feature::FeatureVector;

/// TF-IDF weights fitted to a fixed set of tokenized documents.
#[derive(Debug, Clone, Default)]
pub struct TfIdf {
    document_count: usize,
    /// Number of documents containing each term at least once.
    document_frequency: HashMap<String, usize>,
    /// Per document: term -> tf * idf.
    weights: Vec<HashMap<String, f64>>,
}

impl TfIdf {
    /// Fit statistics to `documents`, each given as its token sequence.
    pub fn fit(documents: &[Vec<String>]) -> Self {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut counts: Vec<HashMap<&str, usize>> = Vec::with_capacity(documents.len());

        for tokens in documents {
            let mut doc_counts: HashMap<&str, usize> = HashMap::new();
            for token in tokens {
                *doc_counts.entry(token.as_str()).or_insert(0) += 1;
            }
            for term in doc_counts.keys() {
                *document_frequency.entry((*term).to_string()).or_insert(0) += 1;
            }
            counts.push(doc_counts);
        }

        let document_count = documents.len();
        let weights = documents
            .iter()
            .zip(counts)
            .map(|(tokens, doc_counts)| {
                let total = tokens.len() as f64;
                doc_counts
                    .into_iter()
                    .map(|(term, count)| {
                        let tf = count as f64 / total;
                        let idf = idf_of(document_count, document_frequency[term]);
                        (term.to_string(), tf * idf)
                    })
                    .collect()
            })
            .collect();

        Self {
            document_count,
            document_frequency,
            weights,
        }
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    /// Number of documents containing `term`; 0 for unknown terms.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    /// `ln(N / df(term))`, or `None` for a term absent from the corpus.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.document_frequency
            .get(term)
            .map(|&df| idf_of(self.document_count, df))
    }

    /// TF-IDF weight of `term` in document `doc`; 0 when the term does not occur there.
    pub fn tfidf(&self, term: &str, doc: usize) -> f64 {
        self.weights
            .get(doc)
            .and_then(|w| w.get(term))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sparse vector of `term` keyed by the index of every document containing it.
    pub fn term_vector(&self, term: &str) -> FeatureVector {
        let entries: BTreeMap<usize, f64> = self
            .weights
            .iter()
            .enumerate()
            .filter_map(|(doc, w)| w.get(term).map(|&v| (doc, v)))
            .collect();
        FeatureVector::Sparse(entries)
    }
}

fn idf_of(document_count: usize, document_frequency: usize) -> f64 {
    (document_count as f64 / document_frequency as f64).ln()
}
