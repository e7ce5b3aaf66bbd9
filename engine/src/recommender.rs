use crate::catalog::{Catalog, CatalogOptions};
use crate::error::{RecommenderError, Result, NO_VALID_ITEMS_MESSAGE};
use crate::ranker::rank;
use crate::resolver::{name_matches, resolve};
use crate::vectorizer::{fit, DocumentTermMatrix, VectorSpaceModel, VectorizerConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub catalog: CatalogOptions,
    pub vectorizer: VectorizerConfig,
}

/// One game name or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemNames {
    One(String),
    Many(Vec<String>),
}

impl ItemNames {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ItemNames::One(name) => vec![name],
            ItemNames::Many(names) => names,
        }
    }
}

impl From<&str> for ItemNames {
    fn from(name: &str) -> Self {
        ItemNames::One(name.to_string())
    }
}

impl From<Vec<String>> for ItemNames {
    fn from(names: Vec<String>) -> Self {
        ItemNames::Many(names)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    pub cover_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    pub cover_url: String,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Recommendation {
    /// Placeholder record returned when no input name could be resolved.
    pub fn no_valid_items() -> Self {
        Self { name: NO_VALID_ITEMS_MESSAGE.to_string(), cover_url: String::new(), genres: Vec::new(), score: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub items: Vec<Recommendation>,
    /// Input names that matched nothing and were ignored.
    pub unresolved: Vec<String>,
}

/// The catalog together with the vector space fit over it. Built once and
/// shared read-only between requests.
#[derive(Debug, Clone)]
pub struct Recommender {
    catalog: Catalog,
    model: VectorSpaceModel,
    matrix: DocumentTermMatrix,
}

impl Recommender {
    pub fn from_catalog(catalog: Catalog, config: &VectorizerConfig) -> Self {
        let (model, matrix) = fit(&catalog.corpus(), config);
        Self { catalog, model, matrix }
    }

    /// Load a CSV catalog and fit the vector space over it.
    pub fn load<P: AsRef<Path>>(path: P, config: &EngineConfig) -> Result<Self> {
        let catalog = Catalog::load(path, &config.catalog)?;
        Ok(Self::from_catalog(catalog, &config.vectorizer))
    }

    /// Load a snapshot directory written by [`crate::persist::save_snapshot`].
    pub fn from_snapshot<P: AsRef<Path>>(dir: P) -> Result<Self> {
        crate::persist::load_snapshot(&crate::persist::IndexPaths::new(dir))
    }

    /// Reassemble from persisted parts, checking that they still line up.
    pub(crate) fn from_parts(catalog: Catalog, model: VectorSpaceModel, matrix: DocumentTermMatrix, source: &Path) -> Result<Self> {
        if catalog.len() != matrix.len() {
            return Err(RecommenderError::data_load(
                source,
                format!("matrix has {} rows for {} items", matrix.len(), catalog.len()),
            ));
        }
        Ok(Self { catalog, model, matrix })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn model(&self) -> &VectorSpaceModel {
        &self.model
    }

    pub fn matrix(&self) -> &DocumentTermMatrix {
        &self.matrix
    }

    /// Catalog entries whose name contains `query`, in catalog order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        self.catalog
            .iter()
            .filter(|item| name_matches(&item.name, query))
            .take(limit)
            .map(|item| SearchHit { name: item.name.clone(), cover_url: item.cover_url.clone() })
            .collect()
    }

    pub fn list(&self, limit: usize) -> Vec<String> {
        self.catalog.iter().take(limit).map(|item| item.name.clone()).collect()
    }

    /// Recommend up to `top_n` games similar to the given ones.
    pub fn recommend(&self, names: impl Into<ItemNames>, top_n: usize) -> Result<Recommendations> {
        let names = names.into().into_vec();
        let resolution = resolve(&names, &self.catalog);
        if resolution.resolved.is_empty() {
            tracing::info!(unresolved = ?resolution.unresolved, "no valid games in request");
            return Err(RecommenderError::NoValidItemsFound { unresolved: resolution.unresolved });
        }

        let indices: Vec<usize> = resolution.resolved.iter().map(|r| r.index).collect();
        let exclude: HashSet<String> = resolution.resolved.into_iter().map(|r| r.matched_name).collect();
        let hits = rank(&indices, &self.matrix, &self.catalog, self.model.dims(), top_n, &exclude);

        let items = hits
            .into_iter()
            .filter_map(|hit| {
                let item = self.catalog.get(hit.index)?;
                Some(Recommendation {
                    name: item.name.clone(),
                    cover_url: item.cover_url.clone(),
                    genres: item.tags.clone(),
                    score: Some(hit.score),
                })
            })
            .collect::<Vec<_>>();
        tracing::debug!(inputs = indices.len(), returned = items.len(), "recommendations generated");
        Ok(Recommendations { items, unresolved: resolution.unresolved })
    }
}
