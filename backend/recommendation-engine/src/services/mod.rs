pub mod interest_matrix;
pub mod recommend;
pub mod similarity;
pub mod store;

pub use interest_matrix::{
    build_interest_matrix, InterestMatrix, InterestMatrixBuilder, InterestMatrixCache,
};
pub use recommend::RecommendationScorer;
pub use similarity::SimilaritySearch;
pub use store::{CsvDataSource, DataSource, InMemoryDataSource, InteractionStore, Table};
