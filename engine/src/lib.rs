//! Content-based game recommendations over a TF-IDF space of genre, theme
//! and game mode tags.

pub mod catalog;
pub mod error;
pub mod persist;
pub mod ranker;
pub mod recommender;
pub mod resolver;
pub mod tokenizer;
pub mod vectorizer;

pub use catalog::{Catalog, CatalogOptions, Item, ItemId};
pub use error::{RecommenderError, Result, NO_VALID_ITEMS_MESSAGE};
pub use recommender::{
    EngineConfig, ItemNames, Recommendation, Recommendations, Recommender, SearchHit, DEFAULT_LIST_LIMIT,
    DEFAULT_SEARCH_LIMIT, DEFAULT_TOP_N,
};
pub use vectorizer::{DocumentTermMatrix, SparseVector, TermId, VectorSpaceModel, VectorizerConfig};
