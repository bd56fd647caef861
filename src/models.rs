//! Data models for raw reference records and the emitted subset

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::shape::{float_value, int_value};

pub type TypeId = i64;

/// A raw entry from `types.json`, read leniently.
///
/// Numeric fields accept integers, floats and numeric strings; anything
/// else reads as absent instead of failing the whole record.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeRecord {
    /// English display name (`name.en`, or a plain string in flattened datasets)
    #[serde(default, deserialize_with = "english_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_float")]
    pub packaged_volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_float")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub group_id: Option<TypeId>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub category_id: Option<TypeId>,
    #[serde(default, deserialize_with = "meta_group")]
    pub meta_group_id: Option<MetaGroup>,
    #[serde(default = "published_default", deserialize_with = "published_flag")]
    pub published: bool,
}

/// Tier tag of a type. 1 = Tech I, 2+ = advanced tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaGroup {
    Id(TypeId),
    /// Present in the record but not a number
    Unparsable,
}

impl TypeRecord {
    /// Packaged volume, else unpacked volume, else 0
    pub fn packed_volume(&self) -> f64 {
        self.packaged_volume.or(self.volume).unwrap_or(0.0)
    }
}

fn published_default() -> bool {
    true
}

fn english_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Object(localized)) => localized
            .get("en")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(Value::String(flat)) => flat,
        _ => String::new(),
    })
}

fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(int_value))
}

fn meta_group<'de, D: Deserializer<'de>>(d: D) -> Result<Option<MetaGroup>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => None,
        Some(value) => Some(int_value(&value).map_or(MetaGroup::Unparsable, MetaGroup::Id)),
    })
}

fn lenient_float<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(float_value))
}

fn published_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        _ => true,
    })
}

/// Raw type records keyed by numeric type id
#[derive(Debug, Default, Clone)]
pub struct TypeTable {
    records: BTreeMap<TypeId, TypeRecord>,
}

impl TypeTable {
    /// Index `types.json`, dropping entries whose key is not numeric or whose
    /// body is not an object.
    pub fn from_raw(raw: &Map<String, Value>) -> Self {
        let mut records = BTreeMap::new();
        for (key, value) in raw {
            let Ok(id) = key.trim().parse::<TypeId>() else {
                tracing::debug!(key = %key, "skipping type with non-numeric id");
                continue;
            };
            match TypeRecord::deserialize(value) {
                Ok(record) => {
                    records.insert(id, record);
                }
                Err(e) => tracing::debug!(id, error = %e, "skipping malformed type record"),
            }
        }
        TypeTable { records }
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeRecord> {
        self.records.get(&id)
    }

    /// Look up a type that exists and is published
    pub fn published(&self, id: TypeId) -> Option<&TypeRecord> {
        self.get(id).filter(|record| record.published)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Canonical (type id, quantity) pair, serialized as `[typeId, quantity]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Material {
    pub type_id: TypeId,
    pub quantity: i64,
}

impl Material {
    pub fn new(type_id: TypeId, quantity: i64) -> Self {
        Material { type_id, quantity }
    }
}

impl Serialize for Material {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.type_id, self.quantity).serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventionProduct {
    pub type_id: TypeId,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// Time plus optional materials for copying and research activities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityBlock {
    pub time: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
}

impl ActivityBlock {
    pub fn is_trivial(&self) -> bool {
        self.time == 0 && self.materials.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventionBlock {
    pub time: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<InventionProduct>,
}

impl InventionBlock {
    pub fn is_trivial(&self) -> bool {
        self.time == 0 && self.materials.is_empty() && self.products.is_empty()
    }
}

/// One emitted blueprint in `blueprints.sde.min.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintEntry {
    pub blueprint_type_id: TypeId,
    pub product_type_id: TypeId,
    pub product_qty: i64,
    pub time: i64, // manufacturing seconds
    pub materials: Vec<Material>,
    pub max_runs: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copying: Option<ActivityBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invention: Option<InventionBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_material: Option<ActivityBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_time: Option<ActivityBlock>,
}

impl BlueprintEntry {
    /// Every type id this entry mentions, in no particular order
    pub fn referenced_ids(&self) -> Vec<TypeId> {
        let mut ids = vec![self.blueprint_type_id, self.product_type_id];
        ids.extend(self.materials.iter().map(|m| m.type_id));
        for block in [&self.copying, &self.research_material, &self.research_time]
            .into_iter()
            .flatten()
        {
            ids.extend(block.materials.iter().map(|m| m.type_id));
        }
        if let Some(invention) = &self.invention {
            ids.extend(invention.materials.iter().map(|m| m.type_id));
            ids.extend(invention.products.iter().map(|p| p.type_id));
        }
        ids
    }
}

/// One emitted type in `types.sde.min.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeEntry {
    pub type_id: TypeId,
    pub name: String,
    pub volume: f64,
    pub group_id: TypeId,
    pub category_id: TypeId,
}
