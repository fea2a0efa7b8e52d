mod stats;

pub use stats::{collect_candidate_stats, composite_score};

use crate::config::RecommendConfig;
use crate::error::{RecommendError, Result};
use crate::models::{UserId, VideoId, VideoRecommendation};
use crate::services::interest_matrix::InterestMatrixCache;
use crate::services::similarity::SimilaritySearch;
use crate::services::store::InteractionStore;
use crate::utils::{round_to, score_desc_then_id, top_k_by};
use std::collections::HashSet;
use tracing::{debug, info};

/// Digits kept on returned scores
const SCORE_DIGITS: i32 = 2;

/// Neighbor-pool video recommender.
///
/// Algorithm:
/// 1. Exclude every video the target has already interacted with
/// 2. Take the closest neighbors from the similarity search
/// 3. Widen the pool with filler users in operations order
/// 4. Candidates = videos seen by the pool, minus the exclusion set
/// 5. Score each candidate by pool views, like rate and neighbor overlap
/// 6. Return the best `top_n`, ties broken by ascending video id
pub struct RecommendationScorer<'a> {
    store: &'a InteractionStore,
    cache: &'a InterestMatrixCache,
    config: &'a RecommendConfig,
}

impl<'a> RecommendationScorer<'a> {
    pub fn new(
        store: &'a InteractionStore,
        cache: &'a InterestMatrixCache,
        config: &'a RecommendConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    pub fn recommend(
        &self,
        target_user_id: UserId,
        top_n: usize,
    ) -> Result<Vec<VideoRecommendation>> {
        let operations = self.store.operations()?;
        if !operations.contains_user(target_user_id) {
            return Err(RecommendError::UnknownUser(target_user_id));
        }

        info!(user_id = target_user_id, top_n, "Generating video recommendations");

        // Step 1: videos the user has already seen
        let seen = operations.videos_of(target_user_id);
        debug!(user_id = target_user_id, seen = seen.len(), "Exclusion set built");

        // Step 2: closest neighbors
        let core: Vec<UserId> = SimilaritySearch::new(self.store, self.cache)
            .find_similar(target_user_id, self.config.neighbor_count)?
            .into_iter()
            .map(|n| n.user_id)
            .collect();

        // Step 3: deterministic filler
        let pool = self.build_pool(&core, operations.user_ids());
        let pool_set: HashSet<UserId> = pool.iter().copied().collect();

        // Step 4: candidates
        let pool_ops: Vec<_> = operations
            .rows()
            .iter()
            .filter(|op| pool_set.contains(&op.user_id))
            .collect();
        let candidates: HashSet<VideoId> = pool_ops
            .iter()
            .map(|op| op.video_id)
            .filter(|video_id| !seen.contains(video_id))
            .collect();

        if candidates.is_empty() {
            info!(
                user_id = target_user_id,
                pool = pool.len(),
                "Neighbor pool has nothing the user has not seen"
            );
            return Err(RecommendError::NoCandidates(target_user_id));
        }

        // Step 5: statistics and scores
        let core_set: HashSet<UserId> = core.iter().copied().collect();
        let stats = collect_candidate_stats(
            pool_ops.iter().copied(),
            &candidates,
            &core_set,
            self.config.neighbor_count,
        );

        // Step 6: top-n
        let top = top_k_by(stats, top_n, |a, b| {
            score_desc_then_id((a.score, a.video_id), (b.score, b.video_id))
        });

        let videos = self.store.videos()?;
        let recommendations = top
            .into_iter()
            .map(|stat| {
                let tag = videos.tag(stat.video_id).ok_or_else(|| {
                    RecommendError::data_unavailable(format!(
                        "video {} is missing from the videos table",
                        stat.video_id
                    ))
                })?;
                Ok(VideoRecommendation {
                    video_id: stat.video_id,
                    tag: tag.to_string(),
                    score: round_to(stat.score, SCORE_DIGITS),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            user_id = target_user_id,
            neighbors = core.len(),
            pool = pool.len(),
            candidates = candidates.len(),
            returned = recommendations.len(),
            "Recommendations generated"
        );

        Ok(recommendations)
    }

    /// Core neighbors followed by up to `filler_count` other users
    fn build_pool(&self, core: &[UserId], population: &[UserId]) -> Vec<UserId> {
        let core_set: HashSet<UserId> = core.iter().copied().collect();
        let mut pool = Vec::with_capacity(self.config.pool_size());
        pool.extend_from_slice(core);
        pool.extend(
            population
                .iter()
                .copied()
                .filter(|user_id| !core_set.contains(user_id))
                .take(self.config.filler_count),
        );
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{Operation, Video};
    use crate::services::store::InMemoryDataSource;

    fn op(user_id: UserId, video_id: VideoId, liked: bool) -> Operation {
        Operation {
            user_id,
            video_id,
            liked,
            day: 5,
        }
    }

    fn video(id: VideoId, tag: &str) -> Video {
        Video {
            id,
            tag: tag.to_string(),
            views: 0,
            likes: 0,
            viewed_by: Vec::new(),
            liked_by: Vec::new(),
        }
    }

    fn store(operations: Vec<Operation>) -> InteractionStore {
        let videos = (1..=20)
            .map(|id| video(id, if id % 2 == 0 { "music" } else { "movie" }))
            .collect();
        InteractionStore::from_source(InMemoryDataSource::new(Vec::new(), videos, operations))
    }

    #[test]
    fn test_never_recommends_seen_videos() {
        let store = store(vec![
            op(1, 1, true),
            op(1, 2, false),
            op(2, 1, true),
            op(2, 3, true),
            op(2, 4, false),
            op(3, 2, false),
            op(3, 5, false),
            op(4, 6, true),
        ]);
        let cache = InterestMatrixCache::default();
        let config = Config::default().recommend;
        let scorer = RecommendationScorer::new(&store, &cache, &config);

        let recs = scorer.recommend(1, 10).unwrap();

        let ids: HashSet<VideoId> = recs.iter().map(|r| r.video_id).collect();
        assert!(!ids.contains(&1));
        assert!(!ids.contains(&2));
        assert_eq!(ids, [3, 4, 5, 6].into_iter().collect());
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_scores_and_tags() {
        // user 2 is the only neighbor; both its videos are new to user 1
        let store = store(vec![op(1, 1, false), op(2, 1, true), op(2, 3, true), op(2, 4, false)]);
        let cache = InterestMatrixCache::default();
        let config = Config::default().recommend;
        let scorer = RecommendationScorer::new(&store, &cache, &config);

        let recs = scorer.recommend(1, 10).unwrap();

        assert_eq!(recs.len(), 2);
        // video 3: 1 view, like rate 1, overlap 1/5 -> 1 * 2 * 1.2 * 1.2
        assert_eq!(recs[0].video_id, 3);
        assert_eq!(recs[0].tag, "movie");
        assert!((recs[0].score - 2.88).abs() < 1e-9);
        // video 4: 1 view, like rate 0 -> 1.44
        assert_eq!(recs[1].video_id, 4);
        assert_eq!(recs[1].tag, "music");
        assert!((recs[1].score - 1.44).abs() < 1e-9);
    }

    #[test]
    fn test_top_n_limits_output() {
        let mut ops = vec![op(1, 1, false)];
        ops.extend((2..=12).map(|v| op(2, v, v % 3 == 0)));
        let store = store(ops);
        let cache = InterestMatrixCache::default();
        let config = Config::default().recommend;
        let scorer = RecommendationScorer::new(&store, &cache, &config);

        assert_eq!(scorer.recommend(1, 3).unwrap().len(), 3);
        assert_eq!(scorer.recommend(1, 10).unwrap().len(), 10);
    }

    #[test]
    fn test_no_candidates_when_pool_adds_nothing() {
        let store = store(vec![op(1, 1, false), op(1, 2, true), op(2, 1, true), op(3, 2, false)]);
        let cache = InterestMatrixCache::default();
        let config = Config::default().recommend;
        let scorer = RecommendationScorer::new(&store, &cache, &config);

        let err = scorer.recommend(1, 10).unwrap_err();
        assert!(matches!(err, RecommendError::NoCandidates(1)));
    }

    #[test]
    fn test_unknown_user() {
        let store = store(vec![op(1, 1, false)]);
        let cache = InterestMatrixCache::default();
        let config = Config::default().recommend;
        let scorer = RecommendationScorer::new(&store, &cache, &config);

        assert!(matches!(
            scorer.recommend(77, 10).unwrap_err(),
            RecommendError::UnknownUser(77)
        ));
    }

    #[test]
    fn test_pool_fills_in_operations_order() {
        let store = store(Vec::new());
        let cache = InterestMatrixCache::default();
        let mut config = Config::default().recommend;
        config.filler_count = 2;
        let scorer = RecommendationScorer::new(&store, &cache, &config);

        let pool = scorer.build_pool(&[5, 3], &[9, 3, 7, 5, 1]);
        assert_eq!(pool, vec![5, 3, 9, 7]);
    }

    #[test]
    fn test_user_without_profile_uses_fillers_only() {
        // user 1 only touched a video missing from the videos table
        let store = store(vec![op(1, 99, false), op(2, 3, true), op(3, 4, false)]);
        let cache = InterestMatrixCache::default();
        let config = Config::default().recommend;
        let scorer = RecommendationScorer::new(&store, &cache, &config);

        let recs = scorer.recommend(1, 10).unwrap();

        let ids: Vec<VideoId> = recs.iter().map(|r| r.video_id).collect();
        assert_eq!(ids, vec![3, 4]);
        // no core neighbors, so no overlap boost
        assert!((recs[0].score - 2.0).abs() < 1e-9);
        assert!((recs[1].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pool_is_capped_at_neighbors_plus_fillers() {
        // 60 users: 2..=50 land in the pool, 51..=60 do not
        let mut ops = vec![op(1, 1, false)];
        ops.extend((2..=50).map(|user_id| op(user_id, 2, false)));
        ops.extend((51..=60).map(|user_id| op(user_id, 4, true)));
        let store = store(ops);
        let cache = InterestMatrixCache::default();
        let config = Config::default().recommend;
        let scorer = RecommendationScorer::new(&store, &cache, &config);

        let recs = scorer.recommend(1, 10).unwrap();

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].video_id, 2);
        // 49 views, like rate 0, all 5 neighbors watched it -> 49 * 2 * 2
        assert!((recs[0].score - 196.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_video_row_is_data_unavailable() {
        // video 99 has no row in the videos table but shows up as a candidate
        let store = store(vec![op(1, 1, false), op(2, 1, false), op(2, 99, true)]);
        let cache = InterestMatrixCache::default();
        let config = Config::default().recommend;
        let scorer = RecommendationScorer::new(&store, &cache, &config);

        assert!(scorer.recommend(1, 10).unwrap_err().is_fatal());
    }
}
