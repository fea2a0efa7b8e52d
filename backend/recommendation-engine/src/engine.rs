//! Recommendation Engine
//!
//! Owns the interaction store and the interest-matrix cache and exposes the
//! outward operations. Failures are logged here, at the public boundary, and
//! returned unchanged.

use crate::config::Config;
use crate::error::{RecommendError, Result};
use crate::models::{SimilarUser, UserId, VideoRecommendation};
use crate::services::{
    CsvDataSource, InteractionStore, InterestMatrix, InterestMatrixBuilder, InterestMatrixCache,
    RecommendationScorer, SimilaritySearch,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct RecommendationEngine {
    store: Arc<InteractionStore>,
    cache: InterestMatrixCache,
    config: Config,
}

impl RecommendationEngine {
    pub fn new(store: Arc<InteractionStore>, config: Config) -> Self {
        let cache = InterestMatrixCache::new(InterestMatrixBuilder::new(
            config.similarity.like_weight,
        ));
        Self {
            store,
            cache,
            config,
        }
    }

    /// Engine reading CSV tables from `config.data.data_dir`
    pub fn from_config(config: Config) -> Self {
        let source = CsvDataSource::new(config.data.data_dir.clone());
        Self::new(Arc::new(InteractionStore::from_source(source)), config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &InteractionStore {
        &self.store
    }

    pub fn matrix_cache(&self) -> &InterestMatrixCache {
        &self.cache
    }

    /// Load every table and build the interest matrix up front
    pub fn preload(&self) -> Result<Arc<InterestMatrix>> {
        self.store
            .preload()
            .and_then(|_| self.cache.get_or_build(&self.store))
            .map_err(|e| {
                error!(error = %e, "Preload failed");
                e
            })
    }

    pub fn find_similar(&self, user_id: UserId) -> Result<Vec<SimilarUser>> {
        self.find_similar_k(user_id, self.config.similarity.default_k)
    }

    pub fn find_similar_k(&self, user_id: UserId, k: usize) -> Result<Vec<SimilarUser>> {
        SimilaritySearch::new(&self.store, &self.cache)
            .find_similar(user_id, k)
            .map_err(|e| log_failure("find_similar", user_id, e))
    }

    pub fn recommend(&self, user_id: UserId) -> Result<Vec<VideoRecommendation>> {
        self.recommend_top_n(user_id, self.config.recommend.default_top_n)
    }

    pub fn recommend_top_n(
        &self,
        user_id: UserId,
        top_n: usize,
    ) -> Result<Vec<VideoRecommendation>> {
        RecommendationScorer::new(&self.store, &self.cache, &self.config.recommend)
            .recommend(user_id, top_n)
            .map_err(|e| log_failure("recommend", user_id, e))
    }

    /// Drop the cached interest matrix; the next query rebuilds it.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Source data was regenerated: drop the tables and the matrix.
    pub fn reload_data(&self) {
        self.cache.invalidate_with_store(&self.store);
        info!("Engine caches cleared, data will be reloaded on next query");
    }
}

fn log_failure(operation: &'static str, user_id: UserId, err: RecommendError) -> RecommendError {
    match &err {
        RecommendError::DataUnavailable(msg) => {
            error!(operation, user_id, error = %msg, "Data unavailable")
        }
        RecommendError::UnknownUser(_) => warn!(operation, user_id, "Unknown user"),
        RecommendError::NoCandidates(_) => info!(operation, user_id, "No candidates"),
    }
    err
}
