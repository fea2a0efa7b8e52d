use serde::{Deserialize, Serialize};

pub type UserId = u32;
pub type VideoId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub age: u32,
}

/// (user, day) event recorded on a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEvent {
    pub user_id: UserId,
    pub day: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub tag: String,
    pub views: u64,
    pub likes: u64,
    pub viewed_by: Vec<VideoEvent>,
    pub liked_by: Vec<VideoEvent>,
}

/// One user action. The fact table every aggregate is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub user_id: UserId,
    pub video_id: VideoId,
    pub liked: bool,
    pub day: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Users,
    Videos,
    Operations,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Users => "users",
            TableKind::Videos => "videos",
            TableKind::Operations => "operations",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            TableKind::Users => "users.csv",
            TableKind::Videos => "videos.csv",
            TableKind::Operations => "operations.csv",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarUser {
    pub user_id: UserId,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecommendation {
    pub video_id: VideoId,
    pub tag: String,
    pub score: f64,
}

/// Per-candidate statistics gathered from the neighbor pool
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateVideoStat {
    pub video_id: VideoId,
    /// Views by pool members (one per operation row)
    pub view_count: u32,
    pub mean_like_rate: f64,
    /// Share of the closest neighbors who viewed the video
    pub overlap_fraction: f64,
    /// z-scores of (view_count, mean_like_rate, overlap_fraction) across candidates
    pub standardized: [f64; 3],
    pub score: f64,
}
