use std::fs::{self, File};
use std::path::Path;

use chrono::Utc;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};
use xz2::write::XzEncoder;

use sde_subset::output::{BLUEPRINTS_ARTIFACT, NAME_INDEX_ARTIFACT, TYPES_ARTIFACT};
use sde_subset::{FilterPolicy, Mode, ReferenceSource, SubsetError, build_subset, write_artifacts};

fn artifacts() -> Vec<(&'static str, Value)> {
    vec![
        (
            "types.json",
            json!({
                "34": {"type_id": 34, "name": {"en": "Tritanium", "de": "Tritanium"}, "volume": 0.01,
                       "group_id": 18, "category_id": 4},
                "1000": {"type_id": 1000, "name": {"en": "Small Armor Repairer I Blueprint"},
                         "group_id": 136, "category_id": 9},
                "1001": {"type_id": 1001, "name": {"en": "Small Armor Repairer I"}, "volume": 5,
                         "group_id": 62, "category_id": 7, "meta_group_id": 1},
            }),
        ),
        (
            "blueprints.json",
            json!({
                "1000": {
                    "blueprint_type_id": 1000,
                    "max_production_limit": 300,
                    "activities": {"manufacturing": {
                        "time": 600,
                        "products": {"0": {"type_id": 1001, "quantity": 1}},
                        "materials": {"0": {"type_id": 34, "quantity": 120}},
                    }},
                },
            }),
        ),
        ("categories.json", json!({"9": {"name": {"en": "Blueprint"}}})),
        ("meta.json", json!({"build_number": 2345678})),
    ]
}

fn write_directory(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    for (name, value) in artifacts() {
        fs::write(dir.join(name), serde_json::to_vec(&value).unwrap()).unwrap();
    }
}

fn append_artifacts<W: std::io::Write>(builder: &mut tar::Builder<W>) {
    for (name, value) in artifacts() {
        let bytes = serde_json::to_vec(&value).unwrap();
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("reference-data/{name}"), bytes.as_slice())
            .unwrap();
    }
}

#[test]
fn test_xz_archive_matches_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let refdir = temp_dir.path().join("refdata");
    write_directory(&refdir);

    let tar_path = temp_dir.path().join("reference-data-latest.tar.xz");
    let mut builder = tar::Builder::new(XzEncoder::new(File::create(&tar_path).unwrap(), 6));
    append_artifacts(&mut builder);
    builder.into_inner().unwrap().finish().unwrap();

    let from_dir = ReferenceSource::Directory(refdir).load().unwrap();
    let from_tar = ReferenceSource::Archive(tar_path).load().unwrap();
    assert_eq!(from_dir.types, from_tar.types);
    assert_eq!(from_dir.blueprints, from_tar.blueprints);
    assert_eq!(from_dir.categories, from_tar.categories);
    assert_eq!(from_tar.meta, json!({"build_number": 2345678}));
}

#[test]
fn test_gzip_archive() {
    let temp_dir = tempfile::tempdir().unwrap();
    let tar_path = temp_dir.path().join("reference-data.tar.gz");
    let mut builder = tar::Builder::new(GzEncoder::new(
        File::create(&tar_path).unwrap(),
        Compression::default(),
    ));
    append_artifacts(&mut builder);
    builder.into_inner().unwrap().finish().unwrap();

    let data = ReferenceSource::Archive(tar_path).load().unwrap();
    assert_eq!(data.types.len(), 3);
    assert_eq!(data.blueprints.len(), 1);
}

#[test]
fn test_missing_required_artifact_is_fatal() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_directory(temp_dir.path());
    fs::remove_file(temp_dir.path().join("types.json")).unwrap();

    let err = ReferenceSource::Directory(temp_dir.path().to_path_buf())
        .load()
        .unwrap_err();
    assert!(matches!(err, SubsetError::MissingArtifact { name: "types.json", .. }));
}

#[test]
fn test_meta_is_optional() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_directory(temp_dir.path());
    fs::remove_file(temp_dir.path().join("meta.json")).unwrap();

    let data = ReferenceSource::Directory(temp_dir.path().to_path_buf())
        .load()
        .unwrap();
    assert_eq!(data.meta, Value::Null);
}

#[test]
fn test_invalid_json_is_fatal() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_directory(temp_dir.path());
    fs::write(temp_dir.path().join("blueprints.json"), "{not json").unwrap();

    let err = ReferenceSource::Directory(temp_dir.path().to_path_buf())
        .load()
        .unwrap_err();
    assert!(matches!(err, SubsetError::Json { .. }));
}

#[test]
fn test_end_to_end_from_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let refdir = temp_dir.path().join("refdata");
    let outdir = temp_dir.path().join("out");
    write_directory(&refdir);

    let data = ReferenceSource::Directory(refdir).load().unwrap();
    let subset = build_subset(&data, &FilterPolicy::for_mode(Mode::T1));
    write_artifacts(&outdir, &subset, Mode::T1, &data.meta, Utc::now()).unwrap();

    let read = |name: &str| -> Value {
        serde_json::from_slice(&fs::read(outdir.join(name)).unwrap()).unwrap()
    };
    let blueprints = read(BLUEPRINTS_ARTIFACT);
    assert_eq!(blueprints["mode"], json!("t1"));
    assert_eq!(blueprints["source"]["meta"]["build_number"], json!(2345678));
    assert_eq!(
        blueprints["blueprints"]["1000"],
        json!({
            "blueprintTypeId": 1000,
            "productTypeId": 1001,
            "productQty": 1,
            "time": 600,
            "materials": [[34, 120]],
            "maxRuns": 300,
        })
    );

    let types = read(TYPES_ARTIFACT);
    assert_eq!(types["blueprintCategoryId"], json!(9));
    assert_eq!(
        types["types"]["1001"],
        json!({"typeId": 1001, "name": "Small Armor Repairer I", "volume": 5.0, "groupId": 62, "categoryId": 7})
    );

    let index = read(NAME_INDEX_ARTIFACT);
    assert_eq!(index["nameIndex"]["small armor repairer i"], json!([1000, 1001]));
    assert_eq!(index["nameIndex"]["tritanium"], json!([34]));
    assert!(index["generated"].as_str().unwrap().ends_with('Z'));
}
