use serde::Deserialize;
use std::path::PathBuf;

/// Prefix for every engine environment variable (`RECSYS_DATA_DIR`, ...).
pub const ENV_PREFIX: &str = "RECSYS_";

#[derive(Debug, Clone)]
pub struct Config {
    pub data: DataConfig,
    pub similarity: SimilarityConfig,
    pub recommend: RecommendConfig,
}

#[derive(Debug, Clone)]
pub struct DataConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SimilarityConfig {
    /// Neighbors returned by `find_similar` when no k is given
    pub default_k: usize,
    /// Weight of a like relative to a plain view in the interest matrix
    pub like_weight: f64,
}

#[derive(Debug, Clone)]
pub struct RecommendConfig {
    pub default_top_n: usize,
    /// Closest neighbors used for the overlap boost
    pub neighbor_count: usize,
    /// Extra users appended to the pool to widen the candidate set
    pub filler_count: usize,
}

/// Flat view of the environment, deserialized by envy.
#[derive(Debug, Deserialize)]
struct EnvSettings {
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,
    #[serde(default = "default_similar_k")]
    similar_k: usize,
    #[serde(default = "default_like_weight")]
    like_weight: f64,
    #[serde(default = "default_top_n")]
    top_n: usize,
    #[serde(default = "default_neighbor_count")]
    neighbor_count: usize,
    #[serde(default = "default_filler_count")]
    filler_count: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_similar_k() -> usize {
    5
}

fn default_like_weight() -> f64 {
    2.0
}

fn default_top_n() -> usize {
    10
}

fn default_neighbor_count() -> usize {
    5
}

fn default_filler_count() -> usize {
    45
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                data_dir: default_data_dir(),
            },
            similarity: SimilarityConfig {
                default_k: default_similar_k(),
                like_weight: default_like_weight(),
            },
            recommend: RecommendConfig {
                default_top_n: default_top_n(),
                neighbor_count: default_neighbor_count(),
                filler_count: default_filler_count(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        let settings: EnvSettings = envy::prefixed(ENV_PREFIX).from_env()?;
        Ok(settings.into())
    }
}

impl RecommendConfig {
    /// Maximum size of the neighbor pool used to source candidates.
    pub fn pool_size(&self) -> usize {
        self.neighbor_count + self.filler_count
    }
}

impl From<EnvSettings> for Config {
    fn from(settings: EnvSettings) -> Self {
        Config {
            data: DataConfig {
                data_dir: settings.data_dir,
            },
            similarity: SimilarityConfig {
                default_k: settings.similar_k,
                like_weight: settings.like_weight,
            },
            recommend: RecommendConfig {
                default_top_n: settings.top_n,
                neighbor_count: settings.neighbor_count,
                filler_count: settings.filler_count,
            },
        }
    }
}
