use std::collections::{BTreeMap, BTreeSet, HashSet};

use cvsurface::{export, resolve, Catalog, EmitOptions, EmitTarget, Emitter, Error, NamingRule};
use proptest::prelude::*;

fn type_names() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[A-Z][A-Za-z0-9]{0,12}", 0..24)
}

/// Groups of uniquely named constants; names are globally unique so the
/// resolver never sees a collision.
fn constant_groups() -> impl Strategy<Value = BTreeMap<String, BTreeMap<String, i64>>> {
    let values = prop_oneof![
        any::<i64>(),
        Just(0i64),
        Just(-1i64),
        Just(0xFFFF_FFFFi64),
        Just(i64::MIN),
        Just(i64::MAX),
        Just(i64::from(i32::MIN)),
    ];
    prop::collection::btree_map("[A-Z_]{1,10}", values, 0..24).prop_flat_map(|constants| {
        let len = constants.len();
        (Just(constants), prop::collection::vec(0usize..4, len)).prop_map(|(constants, groups)| {
            let mut grouped: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
            for ((name, value), group) in constants.into_iter().zip(groups) {
                grouped.entry(format!("Group{group}")).or_default().insert(format!("CV_{name}"), value);
            }
            grouped
        })
    })
}

fn build(types: &BTreeSet<String>, groups: &BTreeMap<String, BTreeMap<String, i64>>) -> Catalog {
    let mut builder = Catalog::builder();
    for name in types {
        builder.add_type(name.as_str(), "opencv/cxtypes.h");
    }
    for (group, constants) in groups {
        for (name, value) in constants {
            builder.add_constant(group.as_str(), name.as_str(), *value);
        }
    }
    builder.build().unwrap()
}

fn rule() -> NamingRule {
    NamingRule::new().with_prefix_strip("CV_").with_prefix_add("Cv")
}

proptest! {
    #[test]
    fn surface_is_complete_and_unique(types in type_names(), groups in constant_groups()) {
        let catalog = build(&types, &groups);
        let constant_count: usize = groups.values().map(BTreeMap::len).sum();
        let surface = match resolve(&catalog, &rule()) {
            Ok(surface) => surface,
            // A type like `EVENT` and a constant `CV_EVENT` legitimately collide.
            Err(Error::AliasCollision { .. }) => return Ok(()),
            Err(other) => return Err(TestCaseError::fail(other.to_string())),
        };
        prop_assert_eq!(surface.type_count(), types.len());
        prop_assert_eq!(surface.constant_count(), constant_count);

        let mut seen = HashSet::new();
        for entry in surface.entries() {
            prop_assert!(seen.insert(entry.target.clone()), "duplicate target {}", entry.target);
        }
    }

    #[test]
    fn every_target_declares_each_entry_once(types in type_names(), groups in constant_groups()) {
        let catalog = build(&types, &groups);
        let Ok(surface) = resolve(&catalog, &rule()) else { return Ok(()) };
        prop_assume!(!surface.is_empty());

        let header = Emitter::new(EmitOptions::new(EmitTarget::C)).emit(&surface).unwrap();
        prop_assert_eq!(header.matches("typedef struct ").count(), types.len());

        let module = Emitter::new(EmitOptions::new(EmitTarget::Rust)).emit(&surface).unwrap();
        prop_assert_eq!(module.matches("pub struct ").count(), types.len());
        prop_assert_eq!(module.matches("pub const ").count(), surface.constant_count());
        prop_assert!(syn::parse_file(&module).is_ok());
    }

    #[test]
    fn exported_values_match_native_values(groups in constant_groups()) {
        let catalog = build(&BTreeSet::new(), &groups);
        let surface = resolve(&catalog, &rule()).unwrap();
        for constant in export(&surface) {
            let native = surface.get(&constant.target).and_then(|e| e.as_constant()).unwrap();
            prop_assert_eq!(constant.value, native.value);
            prop_assert_eq!(constant.value, groups[&constant.group][&native.name]);
        }
    }

    #[test]
    fn emission_is_deterministic(types in type_names(), groups in constant_groups()) {
        let catalog = build(&types, &groups);
        let Ok(surface) = resolve(&catalog, &rule()) else { return Ok(()) };
        for target in [EmitTarget::C, EmitTarget::Rust, EmitTarget::Manifest] {
            let emitter = Emitter::new(EmitOptions::new(target).allow_empty(true));
            prop_assert_eq!(emitter.emit(&surface).unwrap(), emitter.emit(&surface).unwrap());
        }
    }

    #[test]
    fn a_duplicated_name_always_collides(name in "[A-Z][A-Za-z0-9]{0,12}") {
        let catalog = Catalog::builder()
            .add_type(name.as_str(), "opencv/cxtypes.h")
            .add_type(name.as_str(), "opencv/cvaux.h")
            .build()
            .unwrap();
        let is_collision = matches!(resolve(&catalog, &rule()), Err(Error::AliasCollision { .. }));
        prop_assert!(is_collision);
    }
}
