use crate::catalog::{Catalog, ItemId};
use crate::vectorizer::{DocumentTermMatrix, SparseVector};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    pub index: ItemId,
    pub score: f32,
}

/// Element-wise mean of the rows at `indices`. Repeated indices count once per
/// occurrence.
pub fn query_vector(indices: &[ItemId], matrix: &DocumentTermMatrix, dims: usize) -> Vec<f32> {
    let mut mean = vec![0.0f32; dims];
    if indices.is_empty() {
        return mean;
    }
    for row in indices.iter().filter_map(|&i| matrix.row(i)) {
        for (tid, w) in &row.entries {
            if let Some(slot) = mean.get_mut(*tid as usize) {
                *slot += w;
            }
        }
    }
    let count = indices.len() as f32;
    for w in mean.iter_mut() {
        *w /= count;
    }
    mean
}

/// Cosine similarity between a dense query and a sparse row; 0 when either is
/// the zero vector.
pub fn cosine(query: &[f32], row: &SparseVector) -> f32 {
    let query_norm = query.iter().map(|w| w * w).sum::<f32>().sqrt();
    let row_norm = row.norm();
    if query_norm == 0.0 || row_norm == 0.0 {
        return 0.0;
    }
    row.dot_dense(query) / (query_norm * row_norm)
}

/// Score every catalog row against the mean of `indices` and return the best
/// `top_n`, skipping excluded names and names already returned.
pub fn rank(
    indices: &[ItemId],
    matrix: &DocumentTermMatrix,
    catalog: &Catalog,
    dims: usize,
    top_n: usize,
    exclude_names: &HashSet<String>,
) -> Vec<ScoredItem> {
    if indices.is_empty() || top_n == 0 {
        return Vec::new();
    }
    let query = query_vector(indices, matrix, dims);

    let mut scored: Vec<ScoredItem> = matrix
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| ScoredItem { index, score: cosine(&query, row) })
        .collect();
    // stable: equal scores keep catalog order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut emitted: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(top_n);
    for hit in scored {
        let Some(item) = catalog.get(hit.index) else { continue };
        if exclude_names.contains(&item.name) || !emitted.insert(item.name.as_str()) {
            continue;
        }
        out.push(hit);
        if out.len() == top_n {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Item;
    use crate::vectorizer::{fit, VectorizerConfig};

    fn tags(t: &[&str]) -> Vec<String> {
        t.iter().map(|s| s.to_string()).collect()
    }

    fn setup(items: Vec<Item>) -> (Catalog, DocumentTermMatrix, usize) {
        let catalog = Catalog::from_items(items);
        let (model, matrix) = fit(&catalog.corpus(), &VectorizerConfig::default());
        (catalog, matrix, model.dims())
    }

    #[test]
    fn self_similarity_is_one_and_zero_vector_is_zero() {
        let (_, matrix, dims) = setup(vec![Item::new("A", tags(&["Puzzle", "Indie"])), Item::new("B", vec![])]);
        let q = matrix.row(0).unwrap().to_dense(dims);
        assert!((cosine(&q, matrix.row(0).unwrap()) - 1.0).abs() < 1e-5);
        assert_eq!(cosine(&q, matrix.row(1).unwrap()), 0.0);
        assert_eq!(cosine(&vec![0.0; dims], matrix.row(0).unwrap()), 0.0);
    }

    #[test]
    fn mean_weights_duplicates() {
        let (_, matrix, dims) = setup(vec![Item::new("A", tags(&["Puzzle"])), Item::new("B", tags(&["Racing"]))]);
        let q = query_vector(&[0, 0, 1], &matrix, dims);
        let a = matrix.row(0).unwrap().dot_dense(&q);
        let b = matrix.row(1).unwrap().dot_dense(&q);
        assert!((a - 2.0 / 3.0).abs() < 1e-6);
        assert!((b - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_catalog_order_and_exclusions_apply() {
        let (catalog, matrix, dims) = setup(vec![
            Item::new("Seed", tags(&["Racing"])),
            Item::new("Zeta", tags(&["Racing"])),
            Item::new("Alpha", tags(&["Racing"])),
            Item::new("Other", tags(&["Horror"])),
        ]);
        let exclude: HashSet<String> = ["Seed".to_string()].into();
        let hits = rank(&[0], &matrix, &catalog, dims, 10, &exclude);
        assert_eq!(hits.iter().map(|h| h.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(hits[2].score, 0.0);
    }

    #[test]
    fn duplicate_names_are_returned_once() {
        let (catalog, matrix, dims) = setup(vec![
            Item::new("Seed", tags(&["Racing"])),
            Item::new("Twin", tags(&["Racing"])),
            Item::new("Twin", tags(&["Racing"])),
            Item::new("Solo", tags(&["Racing"])),
        ]);
        let hits = rank(&[0], &matrix, &catalog, dims, 2, &HashSet::from(["Seed".to_string()]));
        assert_eq!(hits.iter().map(|h| h.index).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn truncates_to_top_n() {
        let (catalog, matrix, dims) = setup((0..10).map(|i| Item::new(format!("G{i}"), tags(&["Arcade"]))).collect());
        assert_eq!(rank(&[0], &matrix, &catalog, dims, 3, &HashSet::new()).len(), 3);
        assert!(rank(&[0], &matrix, &catalog, dims, 0, &HashSet::new()).is_empty());
        assert!(rank(&[], &matrix, &catalog, dims, 3, &HashSet::new()).is_empty());
    }
}
