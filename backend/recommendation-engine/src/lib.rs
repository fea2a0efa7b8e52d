pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use engine::RecommendationEngine;
pub use error::{RecommendError, Result};
pub use models::{SimilarUser, VideoRecommendation};
pub use services::{
    build_interest_matrix, CsvDataSource, DataSource, InMemoryDataSource, InteractionStore,
    InterestMatrixCache,
};
