use std::collections::{BTreeSet, HashMap, HashSet};

use super::entities::CatalogItem;

/// Splits name and identifier of an item into lower-case word tokens. Any character that isn't a
/// letter or a digit separates tokens, single character tokens are dropped.
pub fn tokenize(item: &CatalogItem) -> Vec<String> {
    format!("{} {}", item.name, item.identifier)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|v| v.chars().count() > 1)
        .map(|v| v.to_lowercase())
        .collect()
}

/// Vectorized catalog. `vectors[i]` belongs to the i-th item and has one component per vocabulary
/// term.
#[derive(Debug, Clone, PartialEq)]
pub struct TfIdf {
    pub vocabulary: Vec<String>,
    pub vectors: Vec<Vec<f64>>,
}

impl TfIdf {
    pub fn build(items: &[CatalogItem]) -> Self {
        let tokens = items.iter().map(tokenize).collect::<Vec<_>>();

        let vocabulary = tokens
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();

        let idf = inverse_document_frequency(&tokens, &vocabulary);

        let vectors = tokens
            .iter()
            .map(|doc| {
                let mut counts = HashMap::<&str, usize>::new();
                for token in doc {
                    *counts.entry(token.as_str()).or_default() += 1;
                }
                vocabulary
                    .iter()
                    .zip(&idf)
                    .map(|(term, idf)| {
                        if doc.is_empty() {
                            return 0.;
                        }
                        let tf = counts.get(term.as_str()).copied().unwrap_or(0) as f64
                            / doc.len() as f64;
                        tf * idf
                    })
                    .collect()
            })
            .collect();

        Self {
            vocabulary,
            vectors,
        }
    }
}

/// `ln(n / (df + 1))`. Terms present in every document end up slightly negative, which is kept
/// as is.
fn inverse_document_frequency(tokens: &[Vec<String>], vocabulary: &[String]) -> Vec<f64> {
    let sets = tokens
        .iter()
        .map(|v| v.iter().map(String::as_str).collect::<HashSet<_>>())
        .collect::<Vec<_>>();
    let n = tokens.len() as f64;

    vocabulary
        .iter()
        .map(|term| {
            let frequency = sets.iter().filter(|v| v.contains(term.as_str())).count();
            (n / (frequency as f64 + 1.)).ln()
        })
        .collect()
}
