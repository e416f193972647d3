#![cfg(test)]

// State-machine property test for PolyKeyMap against a plain model.

use crate::{Error, PolyKeyMap};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

type Ks = (u8, String, u16);
type Map = PolyKeyMap<i32, Ks>;

// Every space draws keys from the same small pool of raw numbers so that
// collisions are common; each space renders them as its own key type.
fn k0(n: u8) -> u8 {
    n
}
fn k1(n: u8) -> String {
    format!("s{n}")
}
fn k2(n: u8) -> u16 {
    u16::from(n) * 3
}

trait Raw {
    fn raw(&self) -> u8;
}
impl Raw for u8 {
    fn raw(&self) -> u8 {
        *self
    }
}
impl Raw for String {
    fn raw(&self) -> u8 {
        self[1..].parse().unwrap()
    }
}
impl Raw for u16 {
    fn raw(&self) -> u8 {
        (*self / 3) as u8
    }
}

// Binds the const `$P` to space `$s` and `$key` to the typed key for `$n`.
macro_rules! with_key {
    ($s:expr, $n:expr, |$P:ident, $key:ident| $body:expr) => {
        match $s {
            0 => {
                const $P: usize = 0;
                let $key = k0($n);
                $body
            }
            1 => {
                const $P: usize = 1;
                let $key = k1($n);
                $body
            }
            _ => {
                const $P: usize = 2;
                let $key = k2($n);
                $body
            }
        }
    };
}

macro_rules! with_space {
    ($s:expr, |$P:ident| $body:expr) => {
        match $s {
            0 => {
                const $P: usize = 0;
                $body
            }
            1 => {
                const $P: usize = 1;
                $body
            }
            _ => {
                const $P: usize = 2;
                $body
            }
        }
    };
}

#[derive(Clone, Debug)]
enum Op {
    Insert(usize, u8, i32),
    Link(usize, u8, usize, u8),
    Erase(usize, u8),
    Get(usize, u8),
    Mutate(usize, u8, i32),
    IsLinked(usize, u8, usize),
    Convert(usize, u8, usize),
    RetainEven,
    CursorEraseNegative,
    Clear,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let space = 0usize..3;
    let key = 0u8..6;
    let op = prop_oneof![
        4 => (space.clone(), key.clone(), any::<i32>()).prop_map(|(s, n, v)| Op::Insert(s, n, v)),
        4 => (space.clone(), key.clone(), 1usize..3, key.clone())
            .prop_map(|(s1, n1, off, n2)| Op::Link(s1, n1, (s1 + off) % 3, n2)),
        2 => (space.clone(), key.clone()).prop_map(|(s, n)| Op::Erase(s, n)),
        2 => (space.clone(), key.clone()).prop_map(|(s, n)| Op::Get(s, n)),
        1 => (space.clone(), key.clone(), any::<i32>()).prop_map(|(s, n, d)| Op::Mutate(s, n, d)),
        1 => (space.clone(), key.clone(), space.clone()).prop_map(|(s, n, t)| Op::IsLinked(s, n, t)),
        1 => (space.clone(), key.clone(), space.clone()).prop_map(|(s, n, t)| Op::Convert(s, n, t)),
        1 => Just(Op::RetainEven),
        1 => Just(Op::CursorEraseNegative),
        1 => Just(Op::Clear),
    ];
    proptest::collection::vec(op, 1..80)
}

#[derive(Default)]
struct Model {
    next: u64,
    values: BTreeMap<u64, (i32, [Option<u8>; 3])>,
    index: [HashMap<u8, u64>; 3],
}

impl Model {
    fn insert(&mut self, s: usize, n: u8, v: i32) -> Result<(), Error> {
        if self.index[s].contains_key(&n) {
            return Err(Error::KeyConflict);
        }
        let id = self.next;
        self.next += 1;
        let mut keys = [None; 3];
        keys[s] = Some(n);
        self.values.insert(id, (v, keys));
        self.index[s].insert(n, id);
        Ok(())
    }

    fn link(&mut self, s1: usize, n1: u8, s2: usize, n2: u8) -> Result<(), Error> {
        let (id, s, n) = match (self.index[s1].get(&n1), self.index[s2].get(&n2)) {
            (Some(_), Some(_)) => return Err(Error::KeyConflict),
            (None, None) => return Err(Error::NotFound),
            (Some(&id), None) => (id, s2, n2),
            (None, Some(&id)) => (id, s1, n1),
        };
        let keys = &mut self.values.get_mut(&id).unwrap().1;
        if keys[s].is_some() {
            return Err(Error::KeyConflict);
        }
        keys[s] = Some(n);
        self.index[s].insert(n, id);
        Ok(())
    }

    fn remove(&mut self, id: u64) -> i32 {
        let (v, keys) = self.values.remove(&id).unwrap();
        for (s, k) in keys.iter().enumerate() {
            if let Some(n) = k {
                self.index[s].remove(n);
            }
        }
        v
    }

    fn erase(&mut self, s: usize, n: u8) -> Result<i32, Error> {
        let id = *self.index[s].get(&n).ok_or(Error::NotFound)?;
        Ok(self.remove(id))
    }

    fn record(&self, s: usize, n: u8) -> Result<&(i32, [Option<u8>; 3]), Error> {
        let id = self.index[s].get(&n).ok_or(Error::NotFound)?;
        Ok(&self.values[id])
    }

    fn remove_where(&mut self, pred: impl Fn(i32) -> bool) -> usize {
        let doomed: Vec<u64> = self
            .values
            .iter()
            .filter(|(_, (v, _))| pred(*v))
            .map(|(&id, _)| id)
            .collect();
        for &id in &doomed {
            self.remove(id);
        }
        doomed.len()
    }
}

fn link(sut: &mut Map, s1: usize, n1: u8, s2: usize, n2: u8) -> Result<(), Error> {
    match (s1, s2) {
        (0, 1) => sut.link::<0, 1>(k0(n1), k1(n2)),
        (0, 2) => sut.link::<0, 2>(k0(n1), k2(n2)),
        (1, 0) => sut.link::<1, 0>(k1(n1), k0(n2)),
        (1, 2) => sut.link::<1, 2>(k1(n1), k2(n2)),
        (2, 0) => sut.link::<2, 0>(k2(n1), k0(n2)),
        (2, 1) => sut.link::<2, 1>(k2(n1), k1(n2)),
        _ => unreachable!("link spaces are distinct by construction"),
    }
}

fn assert_matches_model(sut: &Map, model: &Model) -> Result<(), TestCaseError> {
    if let Err(e) = sut.validate() {
        return Err(TestCaseError::fail(format!("invariant broken: {e}")));
    }
    prop_assert_eq!(sut.len(), model.values.len());
    prop_assert_eq!(sut.len_of::<0>(), model.index[0].len());
    prop_assert_eq!(sut.len_of::<1>(), model.index[1].len());
    prop_assert_eq!(sut.len_of::<2>(), model.index[2].len());
    for s in 0..3 {
        for (&n, id) in &model.index[s] {
            let expected = model.values[id].0;
            let got = with_key!(s, n, |P, key| sut.get::<P>(&key).copied());
            prop_assert_eq!(got, Some(expected));
        }
    }
    Ok(())
}

// Property: state-machine equivalence against a plain model.
// Invariants exercised across random operation sequences:
// - Insert conflicts only when the key exists in its own space.
// - Link follows the exactly-one-present rule and never overwrites a slot.
// - Erase, retain and cursor removal cascade every key of the value.
// - Lookups through any key of a value observe the same storage.
// - All cross-structure invariants hold after every operation, failed or not.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(ops in arb_ops()) {
        let mut sut = Map::new();
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Insert(s, n, v) => {
                    let got = with_key!(s, n, |P, key| sut.insert::<P>(key, v));
                    prop_assert_eq!(got, model.insert(s, n, v));
                }
                Op::Link(s1, n1, s2, n2) => {
                    let got = link(&mut sut, s1, n1, s2, n2);
                    prop_assert_eq!(got, model.link(s1, n1, s2, n2));
                }
                Op::Erase(s, n) => {
                    let got = with_key!(s, n, |P, key| sut.erase::<P>(&key));
                    prop_assert_eq!(got, model.erase(s, n));
                    prop_assert!(!with_key!(s, n, |P, key| sut.contains::<P>(&key)));
                }
                Op::Get(s, n) => {
                    let got = with_key!(s, n, |P, key| sut.at::<P>(&key).copied());
                    prop_assert_eq!(got, model.record(s, n).map(|r| r.0));
                }
                Op::Mutate(s, n, d) => {
                    if let Some(v) = with_key!(s, n, |P, key| sut.get_mut::<P>(&key)) {
                        *v = v.wrapping_add(d);
                    }
                    if let Some(&id) = model.index[s].get(&n) {
                        let v = &mut model.values.get_mut(&id).unwrap().0;
                        *v = v.wrapping_add(d);
                    }
                }
                Op::IsLinked(s, n, t) => {
                    let got = with_key!(s, n, |P1, key| with_space!(t, |P2| sut.is_linked::<P1, P2>(&key)));
                    prop_assert_eq!(got, model.record(s, n).map(|r| r.1[t].is_some()));
                }
                Op::Convert(s, n, t) => {
                    let got = with_key!(s, n, |P1, key| with_space!(t, |P2| {
                        sut.convert_key::<P1, P2>(&key).map(|k| k.raw())
                    }));
                    let expected = model
                        .record(s, n)
                        .and_then(|r| r.1[t].ok_or(Error::NotFound));
                    prop_assert_eq!(got, expected);
                }
                Op::RetainEven => {
                    let before = sut.len();
                    sut.retain(|e| e.value() % 2 == 0);
                    let removed = model.remove_where(|v| v % 2 != 0);
                    prop_assert_eq!(before - sut.len(), removed);
                }
                Op::CursorEraseNegative => {
                    let mut visited = BTreeSet::new();
                    let mut c = sut.cursor_mut();
                    while let Some(e) = c.current() {
                        prop_assert!(visited.insert(e.surrogate_id()), "value visited twice");
                        if *e.value() < 0 {
                            c.remove_current();
                        } else {
                            c.move_next();
                        }
                    }
                    prop_assert_eq!(visited.len(), model.values.len());
                    model.remove_where(|v| v < 0);
                }
                Op::Clear => {
                    sut.clear();
                    model.values.clear();
                    model.index.iter_mut().for_each(HashMap::clear);
                }
            }
            assert_matches_model(&sut, &model)?;
        }
    }
}
