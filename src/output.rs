//! Minified JSON artifacts for the offline client

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SubsetError};
use crate::extract::Subset;
use crate::filter::Mode;
use crate::models::{BlueprintEntry, TypeEntry, TypeId};

pub const BLUEPRINTS_ARTIFACT: &str = "blueprints.sde.min.json";
pub const TYPES_ARTIFACT: &str = "types.sde.min.json";
pub const NAME_INDEX_ARTIFACT: &str = "name_index.min.json";

pub const DATASET_LABEL: &str = "EVE Ref reference-data";

/// `2024-01-31T12:00:00Z`
pub fn format_generated(generated: DateTime<Utc>) -> String {
    generated.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[derive(Debug, Serialize)]
pub struct SourceInfo<'a> {
    pub dataset: &'static str,
    pub meta: &'a Value,
}

#[derive(Debug, Serialize)]
pub struct BlueprintArtifact<'a> {
    pub generated: &'a str,
    pub mode: Mode,
    pub source: SourceInfo<'a>,
    pub blueprints: &'a BTreeMap<TypeId, BlueprintEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeArtifact<'a> {
    pub generated: &'a str,
    pub mode: Mode,
    pub source: SourceInfo<'a>,
    pub blueprint_category_id: Option<TypeId>,
    pub types: &'a BTreeMap<TypeId, TypeEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameIndexArtifact<'a> {
    pub generated: &'a str,
    pub mode: Mode,
    pub name_index: &'a BTreeMap<String, Vec<TypeId>>,
}

/// The three serialized artifacts, in write order
pub fn render_artifacts(
    subset: &Subset,
    mode: Mode,
    meta: &Value,
    generated: DateTime<Utc>,
) -> Result<Vec<(&'static str, Vec<u8>)>> {
    let generated = format_generated(generated);
    let provenance = || SourceInfo {
        dataset: DATASET_LABEL,
        meta,
    };
    let encode = |name: &'static str, value: serde_json::Result<Vec<u8>>| {
        value
            .map(|bytes| (name, bytes))
            .map_err(|source| SubsetError::Json {
                name: name.to_string(),
                source,
            })
    };

    Ok(vec![
        encode(
            BLUEPRINTS_ARTIFACT,
            serde_json::to_vec(&BlueprintArtifact {
                generated: &generated,
                mode,
                source: provenance(),
                blueprints: &subset.blueprints,
            }),
        )?,
        encode(
            TYPES_ARTIFACT,
            serde_json::to_vec(&TypeArtifact {
                generated: &generated,
                mode,
                source: provenance(),
                blueprint_category_id: subset.blueprint_category_id,
                types: &subset.types,
            }),
        )?,
        encode(
            NAME_INDEX_ARTIFACT,
            serde_json::to_vec(&NameIndexArtifact {
                generated: &generated,
                mode,
                name_index: &subset.name_index,
            }),
        )?,
    ])
}

/// Render all artifacts first, then write them under `out_dir`, creating
/// it if needed. Artifacts are staged under hidden names and renamed into
/// place only after all of them are written. Returns the written paths.
pub fn write_artifacts(
    out_dir: &Path,
    subset: &Subset,
    mode: Mode,
    meta: &Value,
    generated: DateTime<Utc>,
) -> Result<Vec<PathBuf>> {
    let rendered = render_artifacts(subset, mode, meta, generated)?;
    fs::create_dir_all(out_dir).map_err(|e| SubsetError::io(out_dir, e))?;

    let mut staged = Vec::with_capacity(rendered.len());
    for (name, bytes) in &rendered {
        let staging = out_dir.join(format!(".{name}.partial"));
        if let Err(e) = write_file(&staging, bytes) {
            discard(staged.iter().map(|(path, _)| path).chain([&staging]));
            return Err(e);
        }
        staged.push((staging, out_dir.join(name)));
    }

    let mut written = Vec::with_capacity(staged.len());
    for (i, (staging, path)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(staging, path) {
            discard(staged[i..].iter().map(|(path, _)| path));
            return Err(SubsetError::io(path, e));
        }
        tracing::info!(path = %path.display(), "wrote artifact");
        written.push(path.clone());
    }
    Ok(written)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path).map_err(|e| SubsetError::io(path, e))?);
    writer
        .write_all(bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| SubsetError::io(path, e))
}

fn discard<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            tracing::debug!(path = %path.display(), error = %e, "could not remove staging file");
        }
    }
}
