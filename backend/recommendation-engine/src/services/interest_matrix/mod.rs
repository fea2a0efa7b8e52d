// ============================================
// Interest Matrix Builder
// ============================================
//
// Builds the user × tag interest matrix from the operations table.
//
// Cell value before normalization:
// score = views_on_tag + like_weight * likes_on_tag
//
// Rows are then L2-normalized, so a dot product between two rows is their
// cosine similarity. Rows and columns follow first-seen order in the
// operations table.

mod cache;

pub use cache::InterestMatrixCache;

use crate::error::{RecommendError, Result};
use crate::models::{UserId, VideoId};
use crate::services::store::InteractionStore;
use ndarray::Array1;
use sprs::{CsMat, TriMat};
use std::collections::HashMap;
use tracing::{info, warn};

/// Default weight of a like relative to a view
pub const DEFAULT_LIKE_WEIGHT: f64 = 2.0;

/// Immutable, row-normalized user × tag matrix with its index maps
#[derive(Debug)]
pub struct InterestMatrix {
    matrix: CsMat<f64>,
    user_ids: Vec<UserId>,
    user_index: HashMap<UserId, usize>,
    tags: Vec<String>,
    tag_index: HashMap<String, usize>,
}

impl InterestMatrix {
    pub fn n_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn n_tags(&self) -> usize {
        self.tags.len()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    pub fn row_of(&self, user_id: UserId) -> Option<usize> {
        self.user_index.get(&user_id).copied()
    }

    pub fn user_at(&self, row: usize) -> Option<UserId> {
        self.user_ids.get(row).copied()
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn column_of(&self, tag: &str) -> Option<usize> {
        self.tag_index.get(tag).copied()
    }

    /// Normalized weight of one (user, tag) cell; 0.0 when absent
    pub fn value(&self, user_id: UserId, tag: &str) -> f64 {
        match (self.row_of(user_id), self.column_of(tag)) {
            (Some(row), Some(col)) => self.matrix.get(row, col).copied().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Dense copy of one row
    pub fn row_vector(&self, row: usize) -> Array1<f64> {
        let mut dense = Array1::<f64>::zeros(self.n_tags());
        if let Some(view) = self.matrix.outer_view(row) {
            for (col, &value) in view.iter() {
                dense[col] = value;
            }
        }
        dense
    }

    pub fn row_norm(&self, row: usize) -> f64 {
        self.matrix
            .outer_view(row)
            .map(|view| view.iter().map(|(_, v)| v * v).sum::<f64>().sqrt())
            .unwrap_or(0.0)
    }

    /// Cosine similarity of `row` against every row, in one sparse product
    pub fn similarities(&self, row: usize) -> Array1<f64> {
        let target = self.row_vector(row);
        &self.matrix * &target
    }
}

#[derive(Debug, Clone)]
pub struct InterestMatrixBuilder {
    like_weight: f64,
}

impl Default for InterestMatrixBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_LIKE_WEIGHT)
    }
}

impl InterestMatrixBuilder {
    pub fn new(like_weight: f64) -> Self {
        Self { like_weight }
    }

    pub fn like_weight(&self) -> f64 {
        self.like_weight
    }

    /// Aggregate operations joined with video tags into the interest matrix
    pub fn build(&self, store: &InteractionStore) -> Result<InterestMatrix> {
        let operations = store.operations()?;
        let videos = store.videos()?;

        let mut user_ids: Vec<UserId> = Vec::new();
        let mut user_index: HashMap<UserId, usize> = HashMap::new();
        let mut tags: Vec<String> = Vec::new();
        let mut tag_index: HashMap<String, usize> = HashMap::new();

        // (row, col) -> position in `cells`, cells hold (views, likes)
        let mut cell_index: HashMap<(usize, usize), usize> = HashMap::new();
        let mut cells: Vec<((usize, usize), u32, u32)> = Vec::new();
        let mut untagged: HashMap<VideoId, usize> = HashMap::new();

        for op in operations.rows() {
            let Some(tag) = videos.tag(op.video_id) else {
                *untagged.entry(op.video_id).or_default() += 1;
                continue;
            };

            let row = *user_index.entry(op.user_id).or_insert_with(|| {
                user_ids.push(op.user_id);
                user_ids.len() - 1
            });
            let col = match tag_index.get(tag) {
                Some(&col) => col,
                None => {
                    tags.push(tag.to_string());
                    tag_index.insert(tag.to_string(), tags.len() - 1);
                    tags.len() - 1
                }
            };

            let pos = *cell_index.entry((row, col)).or_insert_with(|| {
                cells.push(((row, col), 0, 0));
                cells.len() - 1
            });
            let cell = &mut cells[pos];
            cell.1 += 1;
            if op.liked {
                cell.2 += 1;
            }
        }

        if !untagged.is_empty() {
            warn!(
                videos = untagged.len(),
                operations = untagged.values().sum::<usize>(),
                "Skipping operations on videos missing from the videos table"
            );
        }

        let scores: Vec<((usize, usize), f64)> = cells
            .into_iter()
            .map(|(pos, views, likes)| (pos, views as f64 + self.like_weight * likes as f64))
            .collect();

        let mut sum_squares = vec![0.0f64; user_ids.len()];
        for &((row, _), score) in &scores {
            sum_squares[row] += score * score;
        }
        let norms: Vec<f64> = sum_squares
            .into_iter()
            .map(|s| {
                let norm = s.sqrt();
                if norm == 0.0 {
                    1.0
                } else {
                    norm
                }
            })
            .collect();

        let shape = (user_ids.len(), tags.len());
        let mut triplets = TriMat::with_capacity(shape, scores.len());
        for ((row, col), score) in scores {
            triplets.add_triplet(row, col, score / norms[row]);
        }
        let matrix: CsMat<f64> = triplets.to_csr();

        if matrix.rows() != user_ids.len() || matrix.cols() != tags.len() {
            return Err(RecommendError::data_unavailable(format!(
                "interest matrix shape {:?} does not match index maps ({}, {})",
                matrix.shape(),
                user_ids.len(),
                tags.len()
            )));
        }

        info!(
            users = user_ids.len(),
            tags = tags.len(),
            nnz = matrix.nnz(),
            like_weight = self.like_weight,
            "Built user interest matrix"
        );

        Ok(InterestMatrix {
            matrix,
            user_ids,
            user_index,
            tags,
            tag_index,
        })
    }
}

/// Build the interest matrix with the default like weight
pub fn build_interest_matrix(store: &InteractionStore) -> Result<InterestMatrix> {
    InterestMatrixBuilder::default().build(store)
}
