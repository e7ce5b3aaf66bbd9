use crate::catalog::Catalog;
use crate::error::{RecommenderError, Result};
use crate::recommender::Recommender;
use crate::vectorizer::{DocumentTermMatrix, VectorSpaceModel};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_items: u32,
    pub vocabulary_size: u32,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn model(&self) -> PathBuf { self.root.join("model.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

// Catalog, model and matrix are written and read as one unit; matrix row i
// must describe catalog item i.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    catalog: &'a Catalog,
    model: &'a VectorSpaceModel,
    matrix: &'a DocumentTermMatrix,
}

#[derive(Deserialize)]
struct Snapshot {
    catalog: Catalog,
    model: VectorSpaceModel,
    matrix: DocumentTermMatrix,
}

pub fn save_snapshot(paths: &IndexPaths, recommender: &Recommender) -> Result<MetaFile> {
    let io_err = |path: &Path, e: std::io::Error| RecommenderError::data_load(path, e);
    create_dir_all(&paths.root).map_err(|e| io_err(paths.root.as_path(), e))?;

    let model_path = paths.model();
    let snapshot = SnapshotRef { catalog: recommender.catalog(), model: recommender.model(), matrix: recommender.matrix() };
    let mut f = BufWriter::new(File::create(&model_path).map_err(|e| io_err(model_path.as_path(), e))?);
    bincode::serialize_into(&mut f, &snapshot).map_err(|e| RecommenderError::data_load(&model_path, e))?;
    f.flush().map_err(|e| io_err(model_path.as_path(), e))?;

    let meta = MetaFile {
        num_items: recommender.catalog().len() as u32,
        vocabulary_size: recommender.model().dims() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        version: SNAPSHOT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), items = meta.num_items, "snapshot written");
    Ok(meta)
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<Recommender> {
    let meta = load_meta(paths)?;
    let model_path = paths.model();
    if meta.version != SNAPSHOT_VERSION {
        return Err(RecommenderError::data_load(
            &paths.meta(),
            format!("unsupported snapshot version {} (expected {SNAPSHOT_VERSION})", meta.version),
        ));
    }

    let f = File::open(&model_path).map_err(|e| RecommenderError::data_load(&model_path, e))?;
    let snapshot: Snapshot =
        bincode::deserialize_from(BufReader::new(f)).map_err(|e| RecommenderError::data_load(&model_path, e))?;
    if snapshot.catalog.len() != meta.num_items as usize {
        return Err(RecommenderError::data_load(
            &model_path,
            format!("meta lists {} items, snapshot holds {}", meta.num_items, snapshot.catalog.len()),
        ));
    }
    let recommender = Recommender::from_parts(snapshot.catalog, snapshot.model, snapshot.matrix, &model_path)?;
    tracing::info!(root = %paths.root.display(), items = meta.num_items, created_at = %meta.created_at, "snapshot loaded");
    Ok(recommender)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    let path = paths.meta();
    let json = serde_json::to_string_pretty(meta).map_err(|e| RecommenderError::data_load(&path, e))?;
    let mut f = File::create(&path).map_err(|e| RecommenderError::data_load(&path, e))?;
    f.write_all(json.as_bytes()).map_err(|e| RecommenderError::data_load(&path, e))?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let mut buf = String::new();
    File::open(&path)
        .and_then(|mut f| f.read_to_string(&mut buf))
        .map_err(|e| RecommenderError::data_load(&path, e))?;
    serde_json::from_str(&buf).map_err(|e| RecommenderError::data_load(&path, e))
}
