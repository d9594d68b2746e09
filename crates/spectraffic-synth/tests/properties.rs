//! Property tests for schema composition and label sequences

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde_json::{Map, Value, json};

use spectraffic_core::LabelCatalog;
use spectraffic_synth::datagen::{self, resolve_composite};
use spectraffic_synth::labels::{Directive, LabelKind, LabelResolver};

fn scalar_schema() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({"type": "string"})),
        Just(json!({"type": "integer"})),
        Just(json!({"type": "boolean"})),
        (1u64..20).prop_map(|n| json!({"type": "string", "maxLength": n})),
        Just(json!({"enum": ["a", "b", "c"]})),
    ]
}

/// Nested object/array schemas without composition keywords.
fn plain_schema() -> impl Strategy<Value = Value> {
    scalar_schema().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|items| json!({"type": "array", "items": items})),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(|props| {
                let props: Map<String, Value> = props.into_iter().collect();
                json!({"type": "object", "properties": props})
            }),
        ]
    })
}

fn property_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,8}", 1..5).prop_map(|s| s.into_iter().collect())
}

fn object_with(names: &[String]) -> Value {
    let props: Map<String, Value> = names
        .iter()
        .map(|n| (n.clone(), json!({"type": "string"})))
        .collect();
    json!({"type": "object", "properties": props})
}

proptest! {
    #[test]
    fn schemas_without_composition_are_unchanged(schema in plain_schema(), seed in any::<u64>()) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let once = resolve_composite(&schema, &mut rng);
        prop_assert_eq!(&once, &schema);
        prop_assert_eq!(resolve_composite(&once, &mut rng), once);
    }

    #[test]
    fn all_of_keeps_every_property(left in property_names(), right in property_names(), seed in any::<u64>()) {
        let schema = json!({"allOf": [object_with(&left), object_with(&right)]});
        let merged = resolve_composite(&schema, &mut SmallRng::seed_from_u64(seed));

        let props = merged["properties"].as_object().unwrap();
        for name in left.iter().chain(&right) {
            prop_assert!(props.contains_key(name), "missing {}", name);
        }
        prop_assert_eq!(&merged["type"], "object");
    }

    #[test]
    fn generated_objects_follow_declared_properties(names in property_names(), seed in any::<u64>()) {
        let schema = object_with(&names);
        let value = datagen::generate(
            &schema,
            None,
            &LabelCatalog::builtin(),
            &mut SmallRng::seed_from_u64(seed),
        );
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        prop_assert_eq!(keys, names.iter().collect::<Vec<_>>());
    }

    #[test]
    fn ssn_sequence_counts_up_by_one(seed in any::<u64>(), steps in 2usize..8) {
        let mut resolver = LabelResolver::new(seed);
        let directive = Directive::Sequence(LabelKind::Ssn);
        let serials: Vec<u64> = (0..steps)
            .map(|_| {
                let value = resolver.resolve(&directive).unwrap();
                value.as_str().unwrap().rsplit('-').next().unwrap().parse().unwrap()
            })
            .collect();
        for pair in serials.windows(2) {
            prop_assert!((1..=9999).contains(&pair[1]));
            prop_assert_eq!(pair[1], pair[0] % 9999 + 1);
        }
    }

    #[test]
    fn routing_sequence_counts_up_by_one(seed in any::<u64>()) {
        let mut resolver = LabelResolver::new(seed);
        let directive = Directive::Sequence(LabelKind::UsBankingInfo);
        let a: u64 = resolver.resolve(&directive).unwrap().as_str().unwrap().parse().unwrap();
        let b: u64 = resolver.resolve(&directive).unwrap().as_str().unwrap().parse().unwrap();
        prop_assert_eq!(b, a + 1);
    }
}
