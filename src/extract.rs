//! Blueprint and type subset extraction
//!
//! Walks `blueprints.json`, keeps the entries the [`FilterPolicy`] accepts,
//! and projects every type the kept blueprints reference.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::filter::FilterPolicy;
use crate::materials::{project_invention_products, project_materials};
use crate::models::{ActivityBlock, BlueprintEntry, InventionBlock, TypeEntry, TypeId, TypeTable};
use crate::names::build_name_index;
use crate::product::select_product;
use crate::shape::{Collection, int_value, key_order};
use crate::source::ReferenceData;

/// Why a blueprint was left out of the subset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Malformed,
    NoManufacturing,
    UnknownBlueprint,
    NoProduct,
    UnknownProduct,
    Ineligible,
    NoMaterials,
}

#[derive(Debug, Default, Deserialize)]
struct RawActivity {
    #[serde(default)]
    time: Option<Value>,
    #[serde(default)]
    materials: Option<Value>,
    #[serde(default)]
    products: Option<Value>,
}

impl RawActivity {
    /// Read one activity block. Anything that is not an object reads as
    /// absent.
    fn parse(value: &Value) -> Option<Self> {
        value.is_object().then(|| RawActivity::deserialize(value).ok()).flatten()
    }

    fn time(&self) -> i64 {
        self.time.as_ref().and_then(int_value).unwrap_or(0)
    }

    fn materials(&self) -> Collection<'_> {
        Collection::detect(self.materials.as_ref())
    }

    fn products(&self) -> Collection<'_> {
        Collection::detect(self.products.as_ref())
    }

    fn block(&self) -> ActivityBlock {
        ActivityBlock {
            time: self.time(),
            materials: project_materials(self.materials()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawBlueprint {
    #[serde(default)]
    blueprint_type_id: Option<Value>,
    #[serde(default)]
    max_production_limit: Option<Value>,
    #[serde(default)]
    activities: Map<String, Value>,
}

impl RawBlueprint {
    fn activity(&self, name: &str) -> Option<RawActivity> {
        self.activities.get(name).and_then(RawActivity::parse)
    }
}

/// Builds blueprint entries for one run
pub struct BlueprintBuilder<'a> {
    types: &'a TypeTable,
    policy: &'a FilterPolicy,
}

impl<'a> BlueprintBuilder<'a> {
    pub fn new(types: &'a TypeTable, policy: &'a FilterPolicy) -> Self {
        BlueprintBuilder { types, policy }
    }

    /// Build the output entry for one raw blueprint. `key` is its id in
    /// `blueprints.json`, used when the record has no `blueprint_type_id`.
    pub fn build(&self, key: &str, raw: &Value) -> Result<BlueprintEntry, Rejection> {
        let bp = RawBlueprint::deserialize(raw).map_err(|_| Rejection::Malformed)?;
        let manufacturing = bp
            .activity("manufacturing")
            .ok_or(Rejection::NoManufacturing)?;

        let blueprint_type_id = bp
            .blueprint_type_id
            .as_ref()
            .and_then(int_value)
            .or_else(|| key.trim().parse().ok())
            .ok_or(Rejection::Malformed)?;
        self.types
            .published(blueprint_type_id)
            .ok_or(Rejection::UnknownBlueprint)?;

        let product = select_product(manufacturing.products()).ok_or(Rejection::NoProduct)?;
        let product_row = self
            .types
            .published(product.type_id)
            .ok_or(Rejection::UnknownProduct)?;
        if !self.policy.is_eligible(product_row) {
            return Err(Rejection::Ineligible);
        }

        let materials = project_materials(manufacturing.materials());
        if materials.is_empty() {
            return Err(Rejection::NoMaterials);
        }

        let mut entry = BlueprintEntry {
            blueprint_type_id,
            product_type_id: product.type_id,
            product_qty: product.quantity,
            time: manufacturing.time(),
            materials,
            max_runs: bp.max_production_limit.as_ref().and_then(int_value).unwrap_or(0),
            copying: None,
            invention: None,
            research_material: None,
            research_time: None,
        };

        if self.policy.mode.captures_extra_activities() {
            let block = |name: &str| {
                bp.activity(name)
                    .map(|activity| activity.block())
                    .filter(|b| !b.is_trivial())
            };
            entry.copying = block("copying");
            entry.research_material = block("research_material");
            entry.research_time = block("research_time");
            entry.invention = bp
                .activity("invention")
                .map(|inv| InventionBlock {
                    time: inv.time(),
                    materials: project_materials(inv.materials()),
                    products: project_invention_products(inv.products()),
                })
                .filter(|b| !b.is_trivial());
        }

        Ok(entry)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractStats {
    pub blueprints: usize,
    pub types: usize,
    pub name_keys: usize,
    pub rejected: BTreeMap<&'static str, usize>,
}

impl ExtractStats {
    fn reject(&mut self, reason: Rejection) {
        let label = match reason {
            Rejection::Malformed => "malformed",
            Rejection::NoManufacturing => "no manufacturing",
            Rejection::UnknownBlueprint => "unknown blueprint",
            Rejection::NoProduct => "no product",
            Rejection::UnknownProduct => "unknown product",
            Rejection::Ineligible => "filtered",
            Rejection::NoMaterials => "no materials",
        };
        *self.rejected.entry(label).or_default() += 1;
    }

    pub fn skipped(&self) -> usize {
        self.rejected.values().sum()
    }
}

impl fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} blueprints, {} types, {} name index keys. Skipped: {}",
            self.blueprints,
            self.types,
            self.name_keys,
            self.skipped()
        )?;
        if !self.rejected.is_empty() {
            let reasons: Vec<String> = self
                .rejected
                .iter()
                .map(|(reason, count)| format!("{reason}: {count}"))
                .collect();
            write!(f, " ({})", reasons.join(", "))?;
        }
        Ok(())
    }
}

/// Everything one run produces, before timestamps and provenance
#[derive(Debug, Clone)]
pub struct Subset {
    pub blueprints: BTreeMap<TypeId, BlueprintEntry>,
    pub types: BTreeMap<TypeId, TypeEntry>,
    pub name_index: BTreeMap<String, Vec<TypeId>>,
    pub blueprint_category_id: Option<TypeId>,
    pub stats: ExtractStats,
}

/// Run every blueprint through [`BlueprintBuilder`]. When two records
/// share a blueprint type id, the one with the lower key wins.
pub fn build_blueprint_subset(
    blueprints: &Map<String, Value>,
    types: &TypeTable,
    policy: &FilterPolicy,
    stats: &mut ExtractStats,
) -> BTreeMap<TypeId, BlueprintEntry> {
    let builder = BlueprintBuilder::new(types, policy);
    let mut records: Vec<(&String, &Value)> = blueprints.iter().collect();
    records.sort_by(|(a, _), (b, _)| key_order(a, b));

    let mut subset = BTreeMap::new();
    for (key, raw) in records {
        match builder.build(key, raw) {
            Ok(entry) => {
                subset.entry(entry.blueprint_type_id).or_insert(entry);
            }
            Err(reason) => {
                tracing::debug!(blueprint = %key, ?reason, "skipping blueprint");
                stats.reject(reason);
            }
        }
    }
    subset
}

/// Every type id mentioned by the given blueprints
pub fn referenced_type_ids<'a>(
    blueprints: impl IntoIterator<Item = &'a BlueprintEntry>,
) -> BTreeSet<TypeId> {
    blueprints
        .into_iter()
        .flat_map(BlueprintEntry::referenced_ids)
        .collect()
}

/// Project referenced ids onto their type records. Ids with no record are
/// left out.
pub fn project_types(ids: &BTreeSet<TypeId>, types: &TypeTable) -> BTreeMap<TypeId, TypeEntry> {
    ids.iter()
        .filter_map(|&id| {
            let row = types.get(id)?;
            Some((
                id,
                TypeEntry {
                    type_id: id,
                    name: row.name.clone(),
                    volume: row.packed_volume(),
                    group_id: row.group_id.unwrap_or(0),
                    category_id: row.category_id.unwrap_or(0),
                },
            ))
        })
        .collect()
}

/// Id of the category whose English name is "Blueprint". The lowest
/// numeric id wins if several match.
pub fn find_blueprint_category(categories: &Map<String, Value>) -> Option<TypeId> {
    categories
        .iter()
        .filter(|(_, category)| {
            category
                .get("name")
                .and_then(|name| name.get("en").or(Some(name)))
                .and_then(Value::as_str)
                == Some("Blueprint")
        })
        .filter_map(|(key, _)| key.trim().parse::<TypeId>().ok())
        .min()
}

/// Run the whole extraction over loaded reference data
pub fn build_subset(data: &ReferenceData, policy: &FilterPolicy) -> Subset {
    let types = TypeTable::from_raw(&data.types);
    tracing::info!(types = types.len(), blueprints = data.blueprints.len(), mode = %policy.mode, "building subset");

    let mut stats = ExtractStats::default();
    let blueprints = build_blueprint_subset(&data.blueprints, &types, policy, &mut stats);
    let referenced = referenced_type_ids(blueprints.values());
    let subset_types = project_types(&referenced, &types);
    let name_index = build_name_index(subset_types.values());

    let blueprint_category_id = find_blueprint_category(&data.categories);
    if blueprint_category_id.is_none() {
        tracing::warn!("no category named \"Blueprint\" in categories.json");
    }

    stats.blueprints = blueprints.len();
    stats.types = subset_types.len();
    stats.name_keys = name_index.len();

    Subset {
        blueprints,
        types: subset_types,
        name_index,
        blueprint_category_id,
        stats,
    }
}
