use crate::Index;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use tempfile::NamedTempFile;
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_entries: usize,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    pub fn describe(index: &Index) -> Self {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Self { num_entries: index.len(), num_terms: index.vocabulary().len(), created_at, version: FORMAT_VERSION }
    }
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Write `bytes` to a temp file beside `target`, then rename it into place so
/// readers never see a partially written file.
fn write_atomic(root: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(root)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).with_context(|| format!("replacing {}", target.display()))?;
    Ok(())
}

/// Write the index and its meta file, creating the directory if needed.
pub fn save_index(paths: &IndexPaths, index: &Index) -> Result<MetaFile> {
    create_dir_all(&paths.root)?;
    let bytes = bincode::serialize(index)?;
    write_atomic(&paths.root, &paths.index(), &bytes)?;
    let meta = MetaFile::describe(index);
    save_meta(paths, &meta)?;
    Ok(meta)
}

pub fn load_index(paths: &IndexPaths) -> Result<Index> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        bail!("index snapshot version {} is not supported (expected {FORMAT_VERSION})", meta.version);
    }
    let mut f = File::open(paths.index()).with_context(|| format!("opening {}", paths.index().display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let index: Index = bincode::deserialize(&buf)?;
    index.validate().with_context(|| format!("checking {}", paths.index().display()))?;
    // a rebuild that swapped index.bin but not yet meta.json
    if meta.num_entries != index.len() || meta.num_terms != index.vocabulary().len() {
        bail!(
            "{} does not match {} ({} entries / {} terms vs {} / {})",
            paths.index().display(),
            paths.meta().display(),
            index.len(),
            index.vocabulary().len(),
            meta.num_entries,
            meta.num_terms
        );
    }
    tracing::info!(root = %paths.root.display(), entries = index.len(), "loaded index snapshot");
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_atomic(&paths.root, &paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}
