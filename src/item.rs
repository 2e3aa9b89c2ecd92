use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt::{Debug, Display},
};

use tracing::{debug, trace};

use crate::{
    Grammar, NonTerminal, Production, Symbol, Terminal,
    canonical::{CanonicalKey, CanonicalSet},
    sets::FirstSets,
    symbol::END,
};

// 项集按内容判等, 而 HashSet 的 hash 结果依赖于遍历顺序,
// 所以项都放在 BTreeSet 中始终保持有序, 相等的项集就一定得到相同的规范化键.

/// 规范 LR(1) 项
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item<'a> {
    /// 项对应的产生式, 按值比较.
    prod: &'a Production<'a>,
    /// dot 所处的位置, 在 `0..=prod.len()` 范围中.
    dot: usize,
    /// 前瞻终结符, [`END`] 表示输入结束.
    lookahead: Terminal<'a>,
}

impl Debug for Item<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!("Item({} {:?})", self.body(), self.lookahead))
    }
}

impl Display for Item<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!("{} 〈{}〉", self.body(), self.lookahead))
    }
}

impl<'a> Item<'a> {
    #[must_use]
    pub fn new(prod: &'a Production<'a>, dot: usize, lookahead: Terminal<'a>) -> Self {
        Self {
            prod,
            dot,
            lookahead,
        }
    }

    #[must_use]
    pub fn initial(prod: &'a Production<'a>, lookahead: Terminal<'a>) -> Self {
        Self::new(prod, 0, lookahead)
    }

    fn body(&self) -> String {
        let tail_s: String = self
            .prod
            .symbols()
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}{} ", if i == self.dot { "⋅ " } else { "" }, s))
            .collect();
        format!(
            "{} -> {}{}",
            self.prod.name(),
            tail_s.trim_end(),
            if self.remains() { "" } else { " ⋅" }
        )
    }

    #[must_use]
    pub fn prod(&self) -> &'a Production<'a> {
        self.prod
    }

    #[must_use]
    pub fn dot(&self) -> usize {
        self.dot
    }

    #[must_use]
    pub fn lookahead(&self) -> Terminal<'a> {
        self.lookahead
    }

    /// dot 之后是否还有符号.
    #[must_use]
    pub fn remains(&self) -> bool {
        self.dot < self.prod.len()
    }

    /// dot 之后的符号.
    #[must_use]
    pub fn current_symbol(&self) -> Option<Symbol<'a>> {
        self.prod.symbols().get(self.dot).copied()
    }

    /// 紧跟在 [`Item::current_symbol`] 之后的符号.
    #[must_use]
    fn following_symbol(&self) -> Option<Symbol<'a>> {
        self.prod.symbols().get(self.dot + 1).copied()
    }

    /// 如果 dot 之后是 `symbol`, 那么返回 dot 前进一位的新项.
    #[must_use]
    pub fn goto(&self, symbol: Symbol<'a>) -> Option<Self> {
        if self.current_symbol()? != symbol {
            None?
        }
        Some(Self::new(self.prod, self.dot + 1, self.lookahead))
    }

    /// 展开 dot 之后的非终结符时, 新项使用的前瞻符.
    fn closure_lookaheads(&self, first: &FirstSets<'a>) -> Vec<Terminal<'a>> {
        match self.following_symbol() {
            None => vec![self.lookahead],
            Some(Symbol::Literal(t)) => vec![t],
            Some(Symbol::Reference(nt)) => match first.get(nt) {
                Some(set) if !set.is_empty() => set.iter().copied().collect(),
                _ => vec![self.lookahead],
            },
        }
    }
}

/// 项集, 也就是 LR(1) 自动机的一个状态.
///
/// 项按照所属产生式的名字分组存放, 方便闭包展开时查看.
/// 判等只看所有项组成的集合, 与分组无关.
#[derive(Clone, Default)]
pub struct ItemSet<'a> {
    items: BTreeMap<NonTerminal<'a>, BTreeSet<Item<'a>>>,
}

impl Debug for ItemSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemSet")
            .field("items", &self.items().collect::<Vec<_>>())
            .finish()
    }
}

impl PartialEq for ItemSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.items().eq(other.items())
    }
}

impl Eq for ItemSet<'_> {}

impl<'a> CanonicalKey for ItemSet<'a> {
    type Key = BTreeSet<Item<'a>>;

    fn canonical_key(&self) -> Self::Key {
        self.items().cloned().collect()
    }
}

impl<'a> FromIterator<Item<'a>> for ItemSet<'a> {
    fn from_iter<T: IntoIterator<Item = Item<'a>>>(iter: T) -> Self {
        let mut set = Self::default();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl<'a> ItemSet<'a> {
    /// 获取 I_0 项集: `(__root 产生式, 0, END)` 的闭包.
    #[must_use]
    pub(crate) fn initial(grammar: &Grammar<'a>, first: &FirstSets<'a>) -> Self {
        [Item::initial(grammar.root_production(), END)]
            .into_iter()
            .collect::<Self>()
            .closure(grammar, first)
    }

    /// 插入一个项, 返回是否是新项.
    pub fn insert(&mut self, item: Item<'a>) -> bool {
        self.items.entry(item.prod.name()).or_default().insert(item)
    }

    /// 遍历所有的项, 先按分组再按项排序.
    pub fn items(&self) -> impl Iterator<Item = &Item<'a>> {
        self.items.values().flatten()
    }

    /// 某个非终结符的产生式对应的项.
    pub fn items_of(&self, nt: NonTerminal<'a>) -> impl Iterator<Item = &Item<'a>> {
        self.items.get(&nt).into_iter().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 所有项 dot 之后的符号, 也就是可能的出边.
    #[must_use]
    pub fn pending_symbols(&self) -> BTreeSet<Symbol<'a>> {
        self.items().filter_map(Item::current_symbol).collect()
    }

    /// 获取当前项集的闭包项集
    #[must_use]
    pub fn closure(mut self, grammar: &Grammar<'a>, first: &FirstSets<'a>) -> Self {
        loop {
            let mut new_items = Vec::new();
            for item in self.items() {
                let Some(Symbol::Reference(nt)) = item.current_symbol() else {
                    continue;
                };
                let lookaheads = item.closure_lookaheads(first);
                for &prod in grammar.prods_of(nt) {
                    new_items.extend(lookaheads.iter().map(|&la| Item::initial(prod, la)));
                }
            }
            let size = self.len();
            for item in new_items {
                self.insert(item);
            }
            // 没有新项加入, 收敛.
            if self.len() == size {
                break;
            }
        }
        self
    }

    /// GOTO(self, symbol), 没有项可以移动时返回 [`None`].
    #[must_use]
    pub fn goto(
        &self,
        symbol: Symbol<'a>,
        grammar: &Grammar<'a>,
        first: &FirstSets<'a>,
    ) -> Option<Self> {
        let kernel: Self = self.items().filter_map(|i| i.goto(symbol)).collect();
        if kernel.is_empty() {
            None
        } else {
            Some(kernel.closure(grammar, first))
        }
    }
}

/// 项集之间的一条转移边: GOTO(from, label) = to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<'a> {
    pub from: usize,
    pub label: Symbol<'a>,
    pub to: usize,
}

/// 一个状态在同一个符号上至多有一条出边, 所以以 (from, label) 作为键.
impl<'a> CanonicalKey for Transition<'a> {
    type Key = (usize, Symbol<'a>);

    fn canonical_key(&self) -> Self::Key {
        (self.from, self.label)
    }
}

/// 规范 LR(1) 项集族.
#[derive(Debug)]
pub struct Family<'a> {
    /// 项集的编号就是其被发现的顺序, 也是分析表的行号.
    item_sets: CanonicalSet<ItemSet<'a>>,
    transitions: CanonicalSet<Transition<'a>>,
}

impl<'a> Family<'a> {
    /// 从 `grammar` 构建规范 LR(1) 项集族.
    ///
    /// 从 I_0 开始, 用一个先进先出的工作队列存放 (项集编号, 符号), 逐个计算 GOTO.
    /// 队列的顺序只影响项集的编号, 不影响项集族本身.
    #[tracing::instrument(skip_all)]
    #[must_use]
    pub fn from_grammar(grammar: &Grammar<'a>) -> Self {
        let first = FirstSets::compute(grammar);
        let mut item_sets = CanonicalSet::new();
        let mut transitions = CanonicalSet::new();
        let mut worklist = VecDeque::new();

        let i0 = ItemSet::initial(grammar, &first);
        worklist.extend(i0.pending_symbols().into_iter().map(|s| (0, s)));
        item_sets.add(i0);

        while let Some((from, symbol)) = worklist.pop_front() {
            let Some(next) = item_sets
                .get(from)
                .and_then(|is: &ItemSet<'a>| is.goto(symbol, grammar, &first))
            else {
                continue;
            };
            let pending = next.pending_symbols();
            let (to, is_new) = item_sets.add(next);
            if is_new {
                debug!("new item set I_{to} = GOTO(I_{from}, {symbol})");
                worklist.extend(pending.into_iter().map(|s| (to, s)));
            } else {
                trace!("GOTO(I_{from}, {symbol}) = I_{to}");
            }
            transitions.add(Transition {
                from,
                label: symbol,
                to,
            });
        }
        debug!(
            "family built: {} item sets, {} transitions",
            item_sets.len(),
            transitions.len()
        );
        Self {
            item_sets,
            transitions,
        }
    }

    /// 按照 I_i (i = 0, 1, 2, 3...) 顺序获取项集.
    pub fn item_sets(&self) -> impl Iterator<Item = &ItemSet<'a>> {
        self.item_sets.iter()
    }

    #[must_use]
    pub fn item_set(&self, idx: usize) -> Option<&ItemSet<'a>> {
        self.item_sets.get(idx)
    }

    /// 项集的编号, 项集不在项集族中时返回 [`None`].
    #[must_use]
    pub fn index_of(&self, item_set: &ItemSet<'a>) -> Option<usize> {
        self.item_sets.index_of(item_set)
    }

    /// 遍历所有的转移边.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition<'a>> {
        self.transitions.iter()
    }

    /// GOTO(from, symbol), 没有这条出边时返回 [`None`].
    #[must_use]
    pub fn goto_of(&self, from: usize, symbol: Symbol<'a>) -> Option<usize> {
        self.transitions
            .get_by_key(&(from, symbol))
            .map(|t| t.to)
    }

    /// 获取一个项集的所有出边: (转换符号, 到达项集).
    pub fn gotos_of(&self, from: usize) -> impl Iterator<Item = (Symbol<'a>, usize)> + '_ {
        self.transitions
            .iter()
            .filter(move |t| t.from == from)
            .map(|t| (t.label, t.to))
    }

    /// 获取项集族数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.item_sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
