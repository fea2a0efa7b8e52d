use crate::models::{CandidateVideoStat, Operation, UserId, VideoId};
use crate::utils::standardize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default)]
struct Accumulator {
    views: u32,
    likes: u32,
    viewers: HashSet<UserId>,
}

/// Gather per-candidate statistics from the pool's operations.
///
/// `core` are the closest neighbors; `overlap_divisor` is the configured
/// neighbor count, so a short core still divides by the full count.
/// Output is ordered by video id.
pub fn collect_candidate_stats<'a, I>(
    pool_operations: I,
    candidates: &HashSet<VideoId>,
    core: &HashSet<UserId>,
    overlap_divisor: usize,
) -> Vec<CandidateVideoStat>
where
    I: IntoIterator<Item = &'a Operation>,
{
    let mut per_video: BTreeMap<VideoId, Accumulator> = BTreeMap::new();
    for op in pool_operations {
        if !candidates.contains(&op.video_id) {
            continue;
        }
        let acc = per_video.entry(op.video_id).or_default();
        acc.views += 1;
        if op.liked {
            acc.likes += 1;
        }
        acc.viewers.insert(op.user_id);
    }

    let divisor = overlap_divisor.max(1) as f64;
    let mut stats: Vec<CandidateVideoStat> = per_video
        .into_iter()
        .map(|(video_id, acc)| {
            let overlap = acc.viewers.iter().filter(|u| core.contains(*u)).count();
            CandidateVideoStat {
                video_id,
                view_count: acc.views,
                mean_like_rate: acc.likes as f64 / acc.views as f64,
                overlap_fraction: overlap as f64 / divisor,
                standardized: [0.0; 3],
                score: 0.0,
            }
        })
        .collect();

    apply_standardization(&mut stats);
    for stat in &mut stats {
        stat.score = composite_score(stat);
    }
    stats
}

/// z-score each raw feature across all candidates
fn apply_standardization(stats: &mut [CandidateVideoStat]) {
    let views: Vec<f64> = stats.iter().map(|s| s.view_count as f64).collect();
    let like_rates: Vec<f64> = stats.iter().map(|s| s.mean_like_rate).collect();
    let overlaps: Vec<f64> = stats.iter().map(|s| s.overlap_fraction).collect();

    let columns = [
        standardize(&views),
        standardize(&like_rates),
        standardize(&overlaps),
    ];
    for (idx, stat) in stats.iter_mut().enumerate() {
        stat.standardized = [columns[0][idx], columns[1][idx], columns[2][idx]];
    }
}

/// views × (1 + like rate) × (1 + overlap)²
///
/// The overlap boost is applied twice; downstream rankings depend on it.
pub fn composite_score(stat: &CandidateVideoStat) -> f64 {
    let boost = 1.0 + stat.overlap_fraction;
    stat.view_count as f64 * (1.0 + stat.mean_like_rate) * boost * boost
}
