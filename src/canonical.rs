//! 按内容去重的集合.
//!
//! 项集, 转移边这类复合值需要按照结构判等, 而不是按照引用判等.
//! 每个值通过 [`CanonicalKey`] 给出一个规范化的键: 与具体的分组方式无关, 嵌套的无序集合使用有序容器表示,
//! 从而插入顺序不同但内容相同的两个值得到相同的键.

use std::{
    collections::{HashMap, hash_map::Entry},
    fmt::Debug,
    hash::Hash,
};

/// 给出值的规范化键, 两个值的键相等当且仅当它们在结构上相等.
pub trait CanonicalKey {
    type Key: Hash + Eq;

    fn canonical_key(&self) -> Self::Key;
}

/// 去重集合, 每个值按第一次插入的顺序获得一个稳定的编号.
pub struct CanonicalSet<T: CanonicalKey> {
    values: Vec<T>,
    indexes: HashMap<T::Key, usize>,
}

impl<T: CanonicalKey + Debug> Debug for CanonicalSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.values).finish()
    }
}

impl<T: CanonicalKey> Default for CanonicalSet<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            indexes: HashMap::new(),
        }
    }
}

impl<T: CanonicalKey> CanonicalSet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入一个值, 返回 (编号, 是否为新值).
    ///
    /// 如果已经存在结构相等的值, 那么集合不变, 返回已有值的编号.
    pub fn add(&mut self, value: T) -> (usize, bool) {
        match self.indexes.entry(value.canonical_key()) {
            Entry::Occupied(e) => (*e.get(), false),
            Entry::Vacant(e) => {
                let idx = self.values.len();
                e.insert(idx);
                self.values.push(value);
                (idx, true)
            }
        }
    }

    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.indexes.contains_key(&value.canonical_key())
    }

    #[must_use]
    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.indexes.get(&value.canonical_key()).copied()
    }

    /// 按规范化键查询.
    #[must_use]
    pub fn get_by_key(&self, key: &T::Key) -> Option<&T> {
        self.indexes.get(key).map(|&idx| &self.values[idx])
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.values.get(idx)
    }

    /// 按编号顺序遍历.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<'s, T: CanonicalKey> IntoIterator for &'s CanonicalSet<T> {
    type Item = &'s T;
    type IntoIter = std::slice::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use std::collections::{BTreeSet, HashMap};

    use super::{CanonicalKey, CanonicalSet};
    use pretty_assertions::assert_eq;

    /// 分组存放的值, 同一个元素放在哪一组不影响判等.
    #[derive(Debug)]
    struct Grouped(HashMap<&'static str, Vec<u32>>);

    impl CanonicalKey for Grouped {
        type Key = BTreeSet<u32>;

        fn canonical_key(&self) -> Self::Key {
            self.0.values().flatten().copied().collect()
        }
    }

    #[test]
    fn structural_dedup() {
        let mut set = CanonicalSet::new();
        assert_eq!(
            set.add(Grouped([("a", vec![1, 2]), ("b", vec![3])].into())),
            (0, true)
        );
        assert_eq!(set.add(Grouped([("x", vec![3, 2, 1])].into())), (0, false));
        assert_eq!(set.len(), 1);
        assert_eq!(set.add(Grouped([("a", vec![1])].into())), (1, true));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Grouped([("b", vec![1])].into())));
        assert_eq!(set.index_of(&Grouped([("c", vec![2, 3, 1])].into())), Some(0));
        assert!(set.get_by_key(&[4].into()).is_none());
        assert_eq!(set.get_by_key(&[1].into()).map(|g| g.0.len()), Some(1));
        assert_eq!(set.iter().count(), 2);
    }
}
