use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{Map, Value, json};

use sde_subset::materials::project_materials;
use sde_subset::shape::Collection;
use sde_subset::{FilterPolicy, Mode, ReferenceData, build_subset};

#[derive(Debug, Clone)]
struct ProductFixture {
    category: i64,
    meta_group: Option<i64>,
    numeral: bool,
    materials: Vec<(i64, i64)>,
}

fn arb_product() -> impl Strategy<Value = ProductFixture> {
    (
        prop_oneof![Just(6i64), Just(7), Just(8), Just(18)],
        prop_oneof![Just(None), Just(Some(1i64)), Just(Some(2))],
        any::<bool>(),
        prop::collection::vec((-3i64..40, -3i64..2000), 0..6),
    )
        .prop_map(|(category, meta_group, numeral, materials)| ProductFixture {
            category,
            meta_group,
            numeral,
            materials,
        })
}

fn reference_data(products: &[ProductFixture]) -> ReferenceData {
    let mut types = Map::new();
    let mut blueprints = Map::new();
    for id in 1..40 {
        types.insert(id.to_string(), json!({"name": {"en": format!("Mineral {id}")}, "category_id": 4}));
    }
    for (i, fixture) in products.iter().enumerate() {
        let blueprint_id = 1000 + 2 * i as i64;
        let product_id = blueprint_id + 1;
        let suffix = if fixture.numeral { " II" } else { "" };
        let mut product = json!({
            "name": {"en": format!("Widget {i}{suffix}")},
            "category_id": fixture.category,
        });
        if let Some(meta_group) = fixture.meta_group {
            product["meta_group_id"] = json!(meta_group);
        }
        types.insert(product_id.to_string(), product);
        types.insert(
            blueprint_id.to_string(),
            json!({"name": {"en": format!("Widget {i}{suffix} Blueprint")}, "category_id": 9}),
        );

        let materials: Vec<Value> = fixture
            .materials
            .iter()
            .map(|(id, qty)| json!({"type_id": id, "quantity": qty}))
            .collect();
        blueprints.insert(
            blueprint_id.to_string(),
            json!({
                "blueprint_type_id": blueprint_id,
                "activities": {"manufacturing": {
                    "time": 60,
                    "products": [{"type_id": product_id, "quantity": 1}],
                    "materials": materials,
                }},
            }),
        );
    }
    ReferenceData {
        types,
        blueprints,
        categories: Map::new(),
        meta: Value::Null,
    }
}

proptest! {
    #[test]
    fn materials_are_positive_unique_and_sorted(
        raw in prop::collection::vec((-5i64..60, -5i64..100), 0..30)
    ) {
        let list = json!(raw.iter().map(|(id, qty)| json!([id, qty])).collect::<Vec<_>>());
        let materials = project_materials(Collection::detect(Some(&list)));
        prop_assert!(materials.windows(2).all(|w| w[0].type_id < w[1].type_id));
        prop_assert!(materials.iter().all(|m| m.type_id > 0 && m.quantity > 0));
    }

    #[test]
    fn list_and_mapping_shapes_agree(
        entries in prop::collection::btree_map(1i64..5000, 1i64..10000, 0..20)
    ) {
        let list: Vec<Value> = entries
            .iter()
            .rev()
            .map(|(id, qty)| json!({"type_id": id, "quantity": qty}))
            .collect();
        let mapping: BTreeMap<String, Value> = list
            .iter()
            .enumerate()
            .map(|(i, entry)| (format!("k{i}"), entry.clone()))
            .collect();
        let list = json!(list);
        let mapping = json!(mapping);
        prop_assert_eq!(
            project_materials(Collection::detect(Some(&list))),
            project_materials(Collection::detect(Some(&mapping)))
        );
    }

    #[test]
    fn t1_is_subset_of_full(products in prop::collection::vec(arb_product(), 0..12)) {
        let data = reference_data(&products);
        let t1 = build_subset(&data, &FilterPolicy::for_mode(Mode::T1));
        let full = build_subset(&data, &FilterPolicy::for_mode(Mode::Full));

        prop_assert!(t1.blueprints.keys().all(|id| full.blueprints.contains_key(id)));
        for entry in full.blueprints.values() {
            prop_assert!(!entry.materials.is_empty());
            prop_assert!(entry.product_qty >= 1);
            prop_assert!(entry.materials.windows(2).all(|w| w[0].type_id < w[1].type_id));
            prop_assert!(entry.materials.iter().all(|m| m.quantity >= 1));
        }
    }

    #[test]
    fn subset_is_deterministic(products in prop::collection::vec(arb_product(), 0..8)) {
        let data = reference_data(&products);
        let policy = FilterPolicy::for_mode(Mode::Full);
        let first = build_subset(&data, &policy);
        let second = build_subset(&data, &policy);
        prop_assert_eq!(first.blueprints, second.blueprints);
        prop_assert_eq!(first.types, second.types);
        prop_assert_eq!(first.name_index, second.name_index);
    }
}
