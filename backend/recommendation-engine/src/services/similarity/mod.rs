use crate::error::{RecommendError, Result};
use crate::models::{SimilarUser, UserId};
use crate::services::interest_matrix::InterestMatrixCache;
use crate::services::store::InteractionStore;
use crate::utils::{round_to, score_desc_then_id, top_k_by};
use tracing::{debug, info, warn};

/// Digits kept on returned similarity values
const SIMILARITY_DIGITS: i32 = 4;

/// Nearest-neighbor search over the cached interest matrix.
///
/// Algorithm:
/// 1. Check the user has operations (against the store, not the matrix)
/// 2. Multiply the matrix by the user's row: one cosine value per user
/// 3. Partially select the k + 1 best, sort only those
/// 4. Drop the user's own row and truncate to k
///
/// Ties are broken by ascending user id so results are reproducible.
pub struct SimilaritySearch<'a> {
    store: &'a InteractionStore,
    cache: &'a InterestMatrixCache,
}

impl<'a> SimilaritySearch<'a> {
    pub fn new(store: &'a InteractionStore, cache: &'a InterestMatrixCache) -> Self {
        Self { store, cache }
    }

    pub fn find_similar(&self, target_user_id: UserId, k: usize) -> Result<Vec<SimilarUser>> {
        if !self.store.contains_user(target_user_id)? {
            return Err(RecommendError::UnknownUser(target_user_id));
        }

        info!(user_id = target_user_id, k, "Finding similar users");

        let matrix = self.cache.get_or_build(self.store)?;

        let Some(target_row) = matrix.row_of(target_user_id) else {
            // every operation of this user points at a video without a tag
            warn!(
                user_id = target_user_id,
                "User has no interest profile, returning no neighbors"
            );
            return Ok(Vec::new());
        };

        let similarities = matrix.similarities(target_row);

        let scored: Vec<(f64, UserId, usize)> = similarities
            .iter()
            .enumerate()
            .filter_map(|(row, &sim)| matrix.user_at(row).map(|user_id| (sim, user_id, row)))
            .collect();

        // one extra slot for the user's own row
        let top = top_k_by(scored, k.saturating_add(1), |a, b| {
            score_desc_then_id((a.0, a.1), (b.0, b.1))
        });

        let neighbors: Vec<SimilarUser> = top
            .into_iter()
            .filter(|&(_, _, row)| row != target_row)
            .take(k)
            .map(|(sim, user_id, _)| SimilarUser {
                user_id,
                similarity: round_to(sim, SIMILARITY_DIGITS),
            })
            .collect();

        debug!(
            user_id = target_user_id,
            neighbors = neighbors.len(),
            top_similarity = neighbors.first().map(|n| n.similarity),
            "Similar users found"
        );

        Ok(neighbors)
    }
}
