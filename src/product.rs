//! Primary product selection for manufacturing activities

use crate::models::TypeId;
use crate::shape::{Collection, RawEntry};

/// The product a blueprint manufactures, with quantity floored at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryProduct {
    pub type_id: TypeId,
    pub quantity: i64,
}

fn usable(entry: RawEntry<'_>) -> Option<PrimaryProduct> {
    let type_id = entry.type_id().ok()?;
    Some(PrimaryProduct {
        type_id,
        quantity: entry.quantity().unwrap_or(1),
    })
}

/// Pick the first usable product in priority order.
///
/// Mapping keys are ranked numerically, then lexicographically; lists keep
/// their order. Entries without a positive type id are passed over.
pub fn select_product(products: Collection<'_>) -> Option<PrimaryProduct> {
    products.prioritized().into_iter().find_map(usable)
}
