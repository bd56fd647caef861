//! Name normalization and the reverse name index

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{TypeEntry, TypeId};

/// Trailing qualifier that also gets a stripped alias key
pub const BLUEPRINT_SUFFIX: &str = " blueprint";

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Lowercase, trim, collapse whitespace runs, and fold curly single quotes
/// into `'`. Returns an empty string for blank input.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    WHITESPACE
        .replace_all(&lowered, " ")
        .replace(['\u{2019}', '\u{2018}', '\u{201B}'], "'")
}

/// Map normalized display names to the sorted, deduplicated ids carrying
/// them. Names ending in " blueprint" are also indexed without the suffix.
pub fn build_name_index<'a>(
    types: impl IntoIterator<Item = &'a TypeEntry>,
) -> BTreeMap<String, Vec<TypeId>> {
    let mut index: BTreeMap<String, Vec<TypeId>> = BTreeMap::new();
    for entry in types {
        let key = normalize_name(&entry.name);
        if key.is_empty() {
            continue;
        }
        index.entry(key).or_default().push(entry.type_id);
    }

    let aliases: Vec<(String, Vec<TypeId>)> = index
        .iter()
        .filter_map(|(key, ids)| {
            let stripped = key.strip_suffix(BLUEPRINT_SUFFIX)?.trim();
            (!stripped.is_empty()).then(|| (stripped.to_string(), ids.clone()))
        })
        .collect();
    for (alias, ids) in aliases {
        index.entry(alias).or_default().extend(ids);
    }

    for ids in index.values_mut() {
        ids.sort_unstable();
        ids.dedup();
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_entry(type_id: TypeId, name: &str) -> TypeEntry {
        TypeEntry {
            type_id,
            name: name.to_string(),
            volume: 0.0,
            group_id: 0,
            category_id: 0,
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Small   Armor\tRepairer I "), "small armor repairer i");
        assert_eq!(normalize_name("Sansha\u{2019}s Nation"), "sansha's nation");
        assert_eq!(normalize_name("\u{2018}Augmented\u{2019} Hammerhead"), "'augmented' hammerhead");
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name(" \n "), "");
    }

    #[test]
    fn test_index_groups_and_sorts_ids() {
        let types = vec![
            type_entry(30, "Tritanium"),
            type_entry(34, "Tritanium"),
            type_entry(20, "  TRITANIUM "),
            type_entry(5, ""),
        ];
        let index = build_name_index(&types);
        assert_eq!(index.len(), 1);
        assert_eq!(index["tritanium"], vec![20, 30, 34]);
    }

    #[test]
    fn test_blueprint_alias_is_union() {
        let types = vec![
            type_entry(2048, "Damage Control I"),
            type_entry(2049, "Damage Control I Blueprint"),
        ];
        let index = build_name_index(&types);
        assert_eq!(index["damage control i blueprint"], vec![2049]);
        assert_eq!(index["damage control i"], vec![2048, 2049]);
    }

    #[test]
    fn test_bare_blueprint_name_has_no_alias() {
        let types = vec![type_entry(1, "Blueprint")];
        let index = build_name_index(&types);
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["blueprint"]);
    }
}
