use crate::catalog::{Catalog, ItemId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub index: ItemId,
    pub matched_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub resolved: Vec<ResolvedItem>,
    pub unresolved: Vec<String>,
}

/// Case-insensitive substring containment. An empty or whitespace-only query
/// matches everything.
pub fn name_matches(name: &str, query: &str) -> bool {
    query.trim().is_empty() || name.to_lowercase().contains(&query.to_lowercase())
}

/// Map each query to the first catalog item whose name contains it.
///
/// Queries are kept in input order and duplicates are not collapsed.
pub fn resolve<S: AsRef<str>>(queries: &[S], catalog: &Catalog) -> Resolution {
    let mut resolution = Resolution::default();
    for query in queries {
        let query = query.as_ref();
        match catalog.iter().position(|item| name_matches(&item.name, query)) {
            Some(index) => resolution.resolved.push(ResolvedItem { index, matched_name: catalog.items()[index].name.clone() }),
            None => {
                tracing::debug!(query, "no catalog match");
                resolution.unresolved.push(query.to_string());
            }
        }
    }
    resolution
}
