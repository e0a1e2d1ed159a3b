//! Weighted score fusion of a vector-ranked list and a keyword-ranked list.
//!
//! Raw vector scores (cosine, roughly `[-1, 1]`) and BM25 scores (unbounded)
//! live on different scales, so each list is normalized with the same
//! [`Normalization`] before blending:
//!
//! ```text
//! fused = alpha * norm(vector_score) + (1 - alpha) * norm(keyword_score)
//! ```
//!
//! A chunk present in only one list contributes 0 for the missing side.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::{SearchResult, assign_ranks};
use crate::error::{RagError, Result};

/// Per-list score normalization applied before fusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// `(s - min) / (max - min)`. A list whose scores are all equal maps every
    /// entry to 1.0.
    #[default]
    MinMax,
    /// `exp(s - max) / Σ exp(s_i - max)`.
    Softmax,
    /// Use raw scores unchanged.
    None,
}

impl Normalization {
    /// Normalize a list of scores, preserving order.
    pub fn apply(self, scores: &[f32]) -> Vec<f32> {
        if scores.is_empty() {
            return Vec::new();
        }
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        match self {
            Self::MinMax => {
                let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
                let range = max - min;
                if range <= f32::EPSILON {
                    return vec![1.0; scores.len()];
                }
                scores.iter().map(|s| (s - min) / range).collect()
            }
            Self::Softmax => {
                let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
                let sum: f32 = exps.iter().sum();
                exps.into_iter().map(|e| e / sum).collect()
            }
            Self::None => scores.to_vec(),
        }
    }
}

/// Check that a blend weight lies in `[0, 1]`.
pub(crate) fn validate_alpha(alpha: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(RagError::ConfigError(format!("alpha ({alpha}) must be within [0, 1]")));
    }
    Ok(())
}

/// Fuse two ranked lists into one.
///
/// `alpha` weights the vector list and `1 - alpha` the keyword list. Results
/// are ordered by descending fused score with ranks reassigned from 1. Equal
/// fused scores keep first-appearance order (vector list, then keyword list).
/// When a chunk appears in both lists, the vector list's copy is returned.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if `alpha` is outside `[0, 1]` or NaN.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit_rag::fusion::{fuse, Normalization};
///
/// let fused = fuse(vector_hits, keyword_hits, 0.7, Normalization::MinMax)?;
/// ```
pub fn fuse(
    vector_results: Vec<SearchResult>,
    keyword_results: Vec<SearchResult>,
    alpha: f32,
    normalization: Normalization,
) -> Result<Vec<SearchResult>> {
    validate_alpha(alpha)?;

    let vector_scores: Vec<f32> = vector_results.iter().map(|r| r.score).collect();
    let keyword_scores: Vec<f32> = keyword_results.iter().map(|r| r.score).collect();
    let vector_norm = normalization.apply(&vector_scores);
    let keyword_norm = normalization.apply(&keyword_scores);

    let mut order: Vec<(SearchResult, f32)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for (result, norm) in vector_results.into_iter().zip(vector_norm) {
        if slots.contains_key(&result.chunk.id) {
            continue;
        }
        slots.insert(result.chunk.id.clone(), order.len());
        order.push((result, alpha * norm));
    }
    for (result, norm) in keyword_results.into_iter().zip(keyword_norm) {
        let contribution = (1.0 - alpha) * norm;
        match slots.get(&result.chunk.id) {
            Some(&slot) => order[slot].1 += contribution,
            None => {
                slots.insert(result.chunk.id.clone(), order.len());
                order.push((result, contribution));
            }
        }
    }

    // sort_by is stable, so ties keep first-appearance order
    order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut fused: Vec<SearchResult> = order
        .into_iter()
        .map(|(mut result, score)| {
            result.score = score;
            result
        })
        .collect();
    assign_ranks(&mut fused);
    Ok(fused)
}
