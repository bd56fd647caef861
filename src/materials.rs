//! Canonical materials and invention product lists

use std::collections::BTreeMap;

use crate::models::{InventionProduct, Material, TypeId};
use crate::shape::{Collection, RawEntry, Skip};

fn material(entry: RawEntry<'_>) -> Result<Material, Skip> {
    Ok(Material::new(entry.type_id()?, entry.quantity()?))
}

fn invention_product(entry: RawEntry<'_>) -> Result<InventionProduct, Skip> {
    Ok(InventionProduct {
        type_id: entry.type_id()?,
        quantity: entry.quantity()?,
        probability: entry.probability(),
    })
}

/// Project a raw materials collection into a list unique by type id and
/// sorted ascending. The last entry seen for a type id wins.
pub fn project_materials(collection: Collection<'_>) -> Vec<Material> {
    let mut by_type: BTreeMap<TypeId, Material> = BTreeMap::new();
    for entry in collection.entries() {
        match material(entry) {
            Ok(m) => {
                by_type.insert(m.type_id, m);
            }
            Err(skip) => tracing::trace!(?skip, "dropping material entry"),
        }
    }
    by_type.into_values().collect()
}

/// Same as [`project_materials`], keeping each entry's success probability.
pub fn project_invention_products(collection: Collection<'_>) -> Vec<InventionProduct> {
    let mut by_type: BTreeMap<TypeId, InventionProduct> = BTreeMap::new();
    for entry in collection.entries() {
        match invention_product(entry) {
            Ok(p) => {
                by_type.insert(p.type_id, p);
            }
            Err(skip) => tracing::trace!(?skip, "dropping invention product entry"),
        }
    }
    by_type.into_values().collect()
}
