//! Set-difference engine.
//!
//! The [`diff()`] function splits two sets into the part common to both and the part that differs. Differences are
//! either *directional*, attributed to the side which introduced them under the keys `"{first}-{second}"` and
//! `"{second}-{first}"`, or *merged* into a single symmetric difference.
//!
//! [`diff()`]: ./fn.diff.html

use error::{ErrorKind, Result};

use std::collections::{BTreeMap, BTreeSet};

/// Names of the two sides of a comparison.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Names {
    first: String,
    second: String,
    forward: String,
    backward: String,
}

impl Names {
    /// Creates a pair of names.
    ///
    /// # Errors
    ///
    /// Returns [`CollidingNames`] if the forward key `"{first}-{second}"` equals the backward key
    /// `"{second}-{first}"`, e.g. when both names are the same.
    ///
    /// [`CollidingNames`]: ../error/enum.ErrorKind.html#variant.CollidingNames
    pub fn new<A: Into<String>, B: Into<String>>(first: A, second: B) -> Result<Names> {
        let first = first.into();
        let second = second.into();
        let forward = format!("{}-{}", first, second);
        let backward = format!("{}-{}", second, first);
        ensure!(forward != backward, ErrorKind::CollidingNames(forward));
        Ok(Names {
            first,
            second,
            forward,
            backward,
        })
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    /// Key of the elements only in the first set.
    pub fn forward(&self) -> &str {
        &self.forward
    }

    /// Key of the elements only in the second set.
    pub fn backward(&self) -> &str {
        &self.backward
    }

    /// The same names with the two sides exchanged.
    pub fn swapped(&self) -> Names {
        Names {
            first: self.second.clone(),
            second: self.first.clone(),
            forward: self.backward.clone(),
            backward: self.forward.clone(),
        }
    }
}

/// How differences are reported.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DiffMode {
    /// Elements only in the first set and elements only in the second set are kept apart.
    Directional,
    /// All differing elements are put into one set.
    Merged,
}

impl DiffMode {
    pub fn from_merge_flag(merge: bool) -> DiffMode {
        if merge {
            DiffMode::Merged
        } else {
            DiffMode::Directional
        }
    }
}

impl Default for DiffMode {
    fn default() -> DiffMode {
        DiffMode::Directional
    }
}

/// The difference between two sets.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(untagged)]
pub enum Difference<T> {
    /// Differences keyed by direction (`"{first}-{second}"` and `"{second}-{first}"`).
    ///
    /// A two-way comparison always produces both keys. At line level, a file present on only one side produces a
    /// single key holding all lines of that file.
    Directional(BTreeMap<String, BTreeSet<T>>),

    /// Symmetric difference without direction.
    Merged(BTreeSet<T>),
}

impl<T: Ord + Clone> Difference<T> {
    /// A directional difference with a single direction.
    pub fn one_sided<K: Into<String>>(key: K, elements: BTreeSet<T>) -> Difference<T> {
        let mut map = BTreeMap::new();
        map.insert(key.into(), elements);
        Difference::Directional(map)
    }

    /// Elements of one direction. Always `None` for a merged difference.
    pub fn get(&self, key: &str) -> Option<&BTreeSet<T>> {
        match *self {
            Difference::Directional(ref map) => map.get(key),
            Difference::Merged(_) => None,
        }
    }

    /// Takes the elements of one direction. Always `None` for a merged difference.
    pub fn into_direction(self, key: &str) -> Option<BTreeSet<T>> {
        match self {
            Difference::Directional(mut map) => map.remove(key),
            Difference::Merged(_) => None,
        }
    }

    /// Elements only in the first set.
    pub fn forward(&self, names: &Names) -> Option<&BTreeSet<T>> {
        self.get(names.forward())
    }

    /// Elements only in the second set.
    pub fn backward(&self, names: &Names) -> Option<&BTreeSet<T>> {
        self.get(names.backward())
    }

    /// All differing elements regardless of direction.
    pub fn all(&self) -> BTreeSet<T> {
        match *self {
            Difference::Directional(ref map) => map.values().flat_map(|set| set.iter().cloned()).collect(),
            Difference::Merged(ref set) => set.clone(),
        }
    }

    /// Number of differing elements.
    pub fn len(&self) -> usize {
        match *self {
            Difference::Directional(ref map) => map.values().map(BTreeSet::len).sum(),
            Difference::Merged(ref set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes the common and different elements of two sets.
///
/// In [`Directional`] mode the difference has exactly two keys, [`forward`] mapping to `first - second` and
/// [`backward`] mapping to `second - first`. In [`Merged`] mode it is the symmetric difference.
///
/// [`Directional`]: ./enum.DiffMode.html#variant.Directional
/// [`Merged`]: ./enum.DiffMode.html#variant.Merged
/// [`forward`]: ./struct.Names.html#method.forward
/// [`backward`]: ./struct.Names.html#method.backward
pub fn diff<T: Ord + Clone>(first: &BTreeSet<T>, second: &BTreeSet<T>, names: &Names, mode: DiffMode) -> (BTreeSet<T>, Difference<T>) {
    let common = first.intersection(second).cloned().collect();
    let different = match mode {
        DiffMode::Directional => {
            let mut map = BTreeMap::new();
            map.insert(names.forward().to_owned(), first.difference(second).cloned().collect());
            map.insert(names.backward().to_owned(), second.difference(first).cloned().collect());
            Difference::Directional(map)
        },
        DiffMode::Merged => Difference::Merged(first.symmetric_difference(second).cloned().collect()),
    };
    (common, different)
}

#[cfg(test)]
fn sample_sets() -> Vec<BTreeSet<u32>> {
    vec![
        BTreeSet::new(),
        [1].iter().cloned().collect(),
        [1, 2, 3].iter().cloned().collect(),
        [2, 3, 4, 5].iter().cloned().collect(),
        [10, 20, 30].iter().cloned().collect(),
    ]
}

#[test]
fn test_names() {
    let names = Names::new("jsdcov", "jsvm").unwrap();
    assert_eq!(names.forward(), "jsdcov-jsvm");
    assert_eq!(names.backward(), "jsvm-jsdcov");
    assert_eq!(names.swapped().forward(), "jsvm-jsdcov");

    assert!(Names::new("x", "x").is_err());
    assert!(Names::new("a", "a-a").is_err());
}

#[test]
fn test_diff_identity() {
    let names = Names::new("x", "y").unwrap();
    for set in sample_sets() {
        let (common, different) = diff(&set, &set, &names, DiffMode::Directional);
        assert_eq!(common, set);
        assert!(different.get("x-y").unwrap().is_empty());
        assert!(different.get("y-x").unwrap().is_empty());
    }
}

#[test]
fn test_diff_symmetry() {
    let names = Names::new("x", "y").unwrap();
    let swapped = names.swapped();
    for a in &sample_sets() {
        for b in &sample_sets() {
            let (common_ab, different_ab) = diff(a, b, &names, DiffMode::Directional);
            let (common_ba, different_ba) = diff(b, a, &swapped, DiffMode::Directional);
            assert_eq!(common_ab, common_ba);
            assert_eq!(different_ab.get("x-y"), different_ba.get("x-y"));
            assert_eq!(different_ab.get("y-x"), different_ba.get("y-x"));
        }
    }
}

#[test]
fn test_diff_partition() {
    let names = Names::new("A", "B").unwrap();
    for a in &sample_sets() {
        for b in &sample_sets() {
            let (common, different) = diff(a, b, &names, DiffMode::Directional);
            let forward = different.forward(&names).unwrap();
            let backward = different.backward(&names).unwrap();
            assert_eq!(&(&common | forward), a);
            assert_eq!(&(&common | backward), b);
            assert!(common.is_disjoint(forward));
            assert!(common.is_disjoint(backward));
        }
    }
}

#[test]
fn test_diff_merged_equals_union_of_directions() {
    let names = Names::new("A", "B").unwrap();
    for a in &sample_sets() {
        for b in &sample_sets() {
            let (_, directional) = diff(a, b, &names, DiffMode::Directional);
            let (common, merged) = diff(a, b, &names, DiffMode::Merged);
            assert_eq!(merged.all(), directional.all());
            assert_eq!(merged.len(), a.len() + b.len() - 2 * common.len());
            assert!(merged.get("A-B").is_none());
        }
    }
}
