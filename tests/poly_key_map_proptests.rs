// PolyKeyMap property tests.
//
// Property 1: links are symmetric and erase cascades.
//  - Model: set of internal ids, each optionally linked to an external id.
//  - Invariant: every key resolves to its value; convert_key round-trips
//    between the two spaces; is_linked matches the model.
//  - Then erase a random subset, each through a random one of its keys.
//  - Invariant: no key of an erased value survives in either space;
//    survivors are untouched; len/len_of match the model.
//
// Property 2: erase during traversal.
//  - Walk a cursor over the map removing values matching a predicate.
//  - Invariant: every value is visited exactly once; the survivors are
//    exactly those not matching; all keys of removed values are gone.
use polykey_map::{Error, PolyKeyMap};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const INTERNAL: usize = 0;
const EXTERNAL: usize = 1;

type Orders = PolyKeyMap<u64, (u32, String)>;

fn ext(k: u32) -> String {
    format!("e{k}")
}

// Property 1: link symmetry and cascade erase.
proptest! {
    #[test]
    fn prop_links_symmetric_and_erase_cascades(
        entries in proptest::collection::btree_map(0u32..1000, any::<bool>(), 1..50),
        erase_how in proptest::collection::vec(0u8..3, 50),
    ) {
        let mut m = Orders::new();
        for (&k, &linked) in &entries {
            m.insert::<INTERNAL>(k, u64::from(k) * 2).unwrap();
            if linked {
                m.link::<EXTERNAL, INTERNAL>(ext(k), k).unwrap();
            }
        }
        prop_assert!(m.validate().is_ok());

        for (&k, &linked) in &entries {
            let v = u64::from(k) * 2;
            prop_assert_eq!(m.at::<INTERNAL>(&k), Ok(&v));
            prop_assert_eq!(m.is_linked::<INTERNAL, EXTERNAL>(&k), Ok(linked));
            if linked {
                let e = ext(k);
                prop_assert_eq!(m.convert_key::<INTERNAL, EXTERNAL>(&k), Ok(&e));
                prop_assert_eq!(m.convert_key::<EXTERNAL, INTERNAL>(e.as_str()), Ok(&k));
                prop_assert_eq!(m.at::<EXTERNAL>(e.as_str()), Ok(&v));
            } else {
                prop_assert_eq!(m.convert_key::<INTERNAL, EXTERNAL>(&k), Err(Error::NotFound));
            }
        }

        // 0 keeps the value, 1 erases it by internal id, 2 by external id
        // when it has one.
        let mut survivors = BTreeMap::new();
        let mut erased = BTreeSet::new();
        for ((&k, &linked), &how) in entries.iter().zip(&erase_how) {
            let removed = match how {
                0 => {
                    survivors.insert(k, linked);
                    continue;
                }
                2 if linked => m.erase::<EXTERNAL>(ext(k).as_str()),
                _ => m.erase::<INTERNAL>(&k),
            };
            prop_assert_eq!(removed, Ok(u64::from(k) * 2));
            erased.insert(k);
        }

        for &k in &erased {
            prop_assert!(!m.contains::<INTERNAL>(&k));
            prop_assert!(!m.contains::<EXTERNAL>(ext(k).as_str()));
            prop_assert_eq!(m.erase::<INTERNAL>(&k), Err(Error::NotFound));
        }
        for (&k, &linked) in &survivors {
            let v = u64::from(k) * 2;
            prop_assert_eq!(m.get::<INTERNAL>(&k), Some(&v));
            prop_assert_eq!(m.contains::<EXTERNAL>(ext(k).as_str()), linked);
        }
        prop_assert_eq!(m.len(), survivors.len());
        prop_assert_eq!(m.len_of::<INTERNAL>(), survivors.len());
        prop_assert_eq!(
            m.len_of::<EXTERNAL>(),
            survivors.values().filter(|&&l| l).count()
        );
        prop_assert!(m.validate().is_ok());
    }
}

// Property 2: cursor removal visits every value once.
proptest! {
    #[test]
    fn prop_cursor_erase_visits_each_once(
        values in proptest::collection::vec(any::<i16>(), 0..60),
        modulus in 2i16..5,
    ) {
        let mut m: PolyKeyMap<i16, (u32, String)> = PolyKeyMap::new();
        for (i, &v) in values.iter().enumerate() {
            let k = i as u32;
            m.insert::<INTERNAL>(k, v).unwrap();
            if i % 2 == 0 {
                m.link::<INTERNAL, EXTERNAL>(k, ext(k)).unwrap();
            }
        }

        let doomed = |v: i16| v % modulus == 0;
        let mut visited = BTreeSet::new();
        let mut cur = m.cursor_mut();
        while let Some(e) = cur.current() {
            let k = *e.key::<INTERNAL>().unwrap();
            prop_assert!(visited.insert(k), "key {} visited twice", k);
            if doomed(*e.value()) {
                prop_assert_eq!(cur.remove_current(), Some(values[k as usize]));
            } else {
                cur.move_next();
            }
        }
        prop_assert!(cur.is_end());
        prop_assert_eq!(visited.len(), values.len());

        for (i, &v) in values.iter().enumerate() {
            let k = i as u32;
            prop_assert_eq!(m.contains::<INTERNAL>(&k), !doomed(v));
            if i % 2 == 0 {
                prop_assert_eq!(m.contains::<EXTERNAL>(ext(k).as_str()), !doomed(v));
            }
        }
        prop_assert_eq!(m.len(), values.iter().filter(|&&v| !doomed(v)).count());
        prop_assert!(m.validate().is_ok());
    }
}
