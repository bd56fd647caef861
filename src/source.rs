//! Reference data loading from an extracted directory or a tarball

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use walkdir::WalkDir;
use xz2::read::XzDecoder;

use crate::error::{Result, SubsetError};

pub const TYPES_FILE: &str = "types.json";
pub const BLUEPRINTS_FILE: &str = "blueprints.json";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const META_FILE: &str = "meta.json";

/// Where the reference data comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl ReferenceSource {
    /// Exactly one of `directory` or `archive` must be set.
    pub fn from_options(directory: Option<PathBuf>, archive: Option<PathBuf>) -> Result<Self> {
        match (directory, archive) {
            (Some(dir), None) => Ok(ReferenceSource::Directory(dir)),
            (None, Some(tar)) => Ok(ReferenceSource::Archive(tar)),
            _ => Err(SubsetError::ConflictingSource),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ReferenceSource::Directory(path) | ReferenceSource::Archive(path) => path,
        }
    }

    pub fn load(&self) -> Result<ReferenceData> {
        let path = self.path();
        if !path.exists() {
            return Err(SubsetError::SourceNotFound(path.to_path_buf()));
        }
        tracing::info!(source = %path.display(), "loading reference data");
        match self {
            ReferenceSource::Directory(dir) => load_directory(dir),
            ReferenceSource::Archive(tar) => load_archive(tar),
        }
    }
}

/// Raw reference artifacts, keyed by stringified numeric id
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub types: Map<String, Value>,
    pub blueprints: Map<String, Value>,
    pub categories: Map<String, Value>,
    /// Dataset metadata, `Null` when the source has no meta.json
    pub meta: Value,
}

impl ReferenceData {
    fn from_parts(
        types: Option<Map<String, Value>>,
        blueprints: Option<Map<String, Value>>,
        categories: Option<Map<String, Value>>,
        meta: Option<Map<String, Value>>,
        source: &Path,
    ) -> Result<Self> {
        let require = |artifact: Option<Map<String, Value>>, name: &'static str| {
            artifact.ok_or_else(|| SubsetError::MissingArtifact {
                name,
                source_path: source.to_path_buf(),
            })
        };
        Ok(ReferenceData {
            types: require(types, TYPES_FILE)?,
            blueprints: require(blueprints, BLUEPRINTS_FILE)?,
            categories: require(categories, CATEGORIES_FILE)?,
            meta: meta.map(Value::Object).unwrap_or(Value::Null),
        })
    }
}

fn parse_artifact<R: Read>(reader: R, name: &str) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_reader(reader).map_err(|source| SubsetError::Json {
        name: name.to_string(),
        source,
    })?;
    match value {
        Value::Object(map) => {
            tracing::info!(artifact = name, records = map.len(), "parsed artifact");
            Ok(map)
        }
        _ => Err(SubsetError::NotAnObject(name.to_string())),
    }
}

/// Find `name` directly under `dir`, else anywhere below it (first match
/// by sorted file name).
pub fn find_artifact(dir: &Path, name: &str) -> Option<PathBuf> {
    let direct = dir.join(name);
    if direct.is_file() {
        return Some(direct);
    }
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name() == name)
        .map(|e| e.into_path())
}

fn read_from_dir(dir: &Path, name: &str) -> Result<Option<Map<String, Value>>> {
    let Some(path) = find_artifact(dir, name) else {
        return Ok(None);
    };
    let file = File::open(&path).map_err(|e| SubsetError::io(&path, e))?;
    parse_artifact(BufReader::new(file), name).map(Some)
}

fn load_directory(dir: &Path) -> Result<ReferenceData> {
    ReferenceData::from_parts(
        read_from_dir(dir, TYPES_FILE)?,
        read_from_dir(dir, BLUEPRINTS_FILE)?,
        read_from_dir(dir, CATEGORIES_FILE)?,
        read_from_dir(dir, META_FILE)?,
        dir,
    )
}

fn open_archive(path: &Path) -> Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path).map_err(|e| SubsetError::io(path, e))?);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    Ok(if name.ends_with(".xz") || name.ends_with(".txz") {
        Box::new(XzDecoder::new(file))
    } else if name.ends_with(".gz") || name.ends_with(".tgz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    })
}

/// Stream the archive once, parsing each wanted member as it passes.
/// Members are matched on file name so a leading directory is fine.
fn load_archive(path: &Path) -> Result<ReferenceData> {
    let mut archive = tar::Archive::new(open_archive(path)?);
    let (mut types, mut blueprints, mut categories, mut meta) = (None, None, None, None);

    let entries = archive.entries().map_err(|e| SubsetError::io(path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| SubsetError::io(path, e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let file_name = {
            let member = entry.path().map_err(|e| SubsetError::io(path, e))?;
            member.file_name().and_then(|n| n.to_str()).map(str::to_owned)
        };
        let Some(file_name) = file_name else {
            continue;
        };
        let slot = match file_name.as_str() {
            TYPES_FILE => &mut types,
            BLUEPRINTS_FILE => &mut blueprints,
            CATEGORIES_FILE => &mut categories,
            META_FILE => &mut meta,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(parse_artifact(entry, &file_name)?);
        }
    }

    ReferenceData::from_parts(types, blueprints, categories, meta, path)
}
