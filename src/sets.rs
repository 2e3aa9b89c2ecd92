//! FIRST 集和 FOLLOW 集, 都通过不动点迭代计算.
//!
//! 文法不含空产生式, 所以 FIRST 只需要看产生式的第一个符号.

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::{Grammar, NonTerminal, Symbol, Terminal};

/// 把 `src` 中的元素并入 `map[dst]`, 返回 `map[dst]` 是否变大.
fn union_into<'a>(
    map: &mut IndexMap<NonTerminal<'a>, IndexSet<Terminal<'a>>>,
    dst: NonTerminal<'a>,
    src: impl IntoIterator<Item = Terminal<'a>>,
) -> bool {
    let set = map.entry(dst).or_default();
    let size = set.len();
    set.extend(src);
    size != set.len()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSets<'a> {
    sets: IndexMap<NonTerminal<'a>, IndexSet<Terminal<'a>>>,
}

impl<'a> FirstSets<'a> {
    #[tracing::instrument(skip_all)]
    pub fn compute(grammar: &Grammar<'a>) -> Self {
        let mut sets: IndexMap<_, IndexSet<_>> = grammar
            .non_terminals()
            .map(|nt| (nt, IndexSet::new()))
            .collect();
        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;
            for prod in grammar.prods() {
                let Some(first) = prod.first_symbol() else {
                    continue;
                };
                changed |= match first {
                    Symbol::Literal(t) => union_into(&mut sets, prod.name(), [t]),
                    Symbol::Reference(nt) => {
                        let src: Vec<_> = sets.get(&nt).into_iter().flatten().copied().collect();
                        union_into(&mut sets, prod.name(), src)
                    }
                };
            }
            if !changed {
                break;
            }
        }
        trace!("first sets converged after {passes} passes");
        Self { sets }
    }

    /// 非终结符的 FIRST 集, 不在文法中的非终结符返回 [`None`].
    #[must_use]
    pub fn get(&self, nt: NonTerminal<'a>) -> Option<&IndexSet<Terminal<'a>>> {
        self.sets.get(&nt)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NonTerminal<'a>, &IndexSet<Terminal<'a>>)> {
        self.sets.iter().map(|(nt, s)| (*nt, s))
    }
}

/// FOLLOW 集.
///
/// 规范 LR(1) 的构造并不使用它, 保留给诊断使用.
/// 所有集合都从空集开始, 不包含输入结束标记.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowSets<'a> {
    sets: IndexMap<NonTerminal<'a>, IndexSet<Terminal<'a>>>,
}

impl<'a> FollowSets<'a> {
    #[tracing::instrument(skip_all)]
    pub fn compute(grammar: &Grammar<'a>, first: &FirstSets<'a>) -> Self {
        let mut sets: IndexMap<_, IndexSet<_>> = grammar
            .non_terminals()
            .map(|nt| (nt, IndexSet::new()))
            .collect();
        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;
            for prod in grammar.prods() {
                let symbols = prod.symbols();
                for (idx, sym) in symbols.iter().enumerate() {
                    let Symbol::Reference(nt) = *sym else {
                        continue;
                    };
                    changed |= match symbols.get(idx + 1) {
                        // 位于产生式末尾, 产生式头部的 FOLLOW 集可以跟在它后面.
                        None => {
                            let src: Vec<_> = sets
                                .get(&prod.name())
                                .into_iter()
                                .flatten()
                                .copied()
                                .collect();
                            union_into(&mut sets, nt, src)
                        }
                        Some(Symbol::Literal(t)) => union_into(&mut sets, nt, [*t]),
                        Some(Symbol::Reference(next)) => union_into(
                            &mut sets,
                            nt,
                            first.get(*next).into_iter().flatten().copied(),
                        ),
                    };
                }
            }
            if !changed {
                break;
            }
        }
        trace!("follow sets converged after {passes} passes");
        Self { sets }
    }

    #[must_use]
    pub fn get(&self, nt: NonTerminal<'a>) -> Option<&IndexSet<Terminal<'a>>> {
        self.sets.get(&nt)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NonTerminal<'a>, &IndexSet<Terminal<'a>>)> {
        self.sets.iter().map(|(nt, s)| (*nt, s))
    }
}
