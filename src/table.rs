use std::fmt::Display;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::{
    Family, Grammar, NonTerminal, Symbol, Terminal, error::GrammarError, symbol::END,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// 移入, 进入项集状态编号.
    Shift(usize),
    /// 归约之后转到的项集状态编号, 只出现在非终结符的列中.
    Goto(usize),
    /// 归约: (产生式名字, 产生式符号数量).
    Reduce(NonTerminal<'a>, usize),
    /// 接受, 携带 `__root` 产生式的符号数量.
    Accept(usize),
}

impl Display for Action<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&match self {
            Self::Shift(s) => format!("s{s}"),
            Self::Goto(s) => format!("g{s}"),
            Self::Reduce(name, count) => format!("r({name}, {count})"),
            Self::Accept(_) => "acc".to_string(),
        })
    }
}

/// 表项冲突时的处理方式.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// 后写入的表项覆盖先写入的表项, 冲突会被记录到 [`ActionTable::conflicts`] 中.
    #[default]
    Overwrite,
    /// 遇到第一个冲突就返回 [`GrammarError::Conflict`].
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableOptions {
    pub conflict_policy: ConflictPolicy,
}

/// 一个表项上被覆盖的动作.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict<'a> {
    pub state: usize,
    pub symbol: Symbol<'a>,
    pub previous: Action<'a>,
    pub replacement: Action<'a>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Row<'a> {
    /// ACTION 表的一行, 以终结符为键.
    actions: IndexMap<Terminal<'a>, Action<'a>>,
    /// GOTO 表的一行, 以非终结符为键.
    gotos: IndexMap<NonTerminal<'a>, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTable<'a> {
    /// [`Family::item_sets`] 中的顺序就是表的状态顺序.
    rows: Vec<Row<'a>>,
    /// ACTION 表的列, 按终结符首次出现的顺序排列, 最后是 [`END`].
    terms: Vec<Terminal<'a>>,
    /// GOTO 表的列, 按非终结符定义的顺序排列.
    non_terms: Vec<NonTerminal<'a>>,
    conflicts: Vec<Conflict<'a>>,
}

impl<'a> ActionTable<'a> {
    /// 遍历项集族生成分析表.
    ///
    /// 对每个项集中的每个项:
    /// - dot 之后是终结符: 移入;
    /// - dot 之后是非终结符: GOTO;
    /// - dot 在末尾, 前瞻符为 [`END`], 产生式属于 `__root`: 接受;
    /// - dot 在末尾: 在前瞻符上归约.
    ///
    /// 同一个表项被写入不同的动作时按照 `options` 中的 [`ConflictPolicy`] 处理.
    #[tracing::instrument(skip_all)]
    pub fn build_from(
        family: &Family<'a>,
        grammar: &Grammar<'a>,
        options: TableOptions,
    ) -> Result<Self, GrammarError> {
        let mut table = Self {
            rows: vec![Row::default(); family.len()],
            terms: grammar.terminals().chain([END]).collect(),
            non_terms: grammar.non_terminals().collect(),
            conflicts: Vec::new(),
        };
        let policy = options.conflict_policy;
        for (row, is) in family.item_sets().enumerate() {
            for item in is.items() {
                let prod = item.prod();
                match item.current_symbol() {
                    Some(sym @ Symbol::Literal(t)) => {
                        // 构造时每个待移入的符号都有出边, 这里找不到就不写入.
                        if let Some(to) = family.goto_of(row, sym) {
                            table.set_action(row, t, Action::Shift(to), policy)?;
                        }
                    }
                    Some(sym @ Symbol::Reference(nt)) => {
                        if let Some(to) = family.goto_of(row, sym) {
                            table.set_goto(row, nt, to, policy)?;
                        }
                    }
                    None if item.lookahead().is_end() && prod.name().is_root() => {
                        table.set_action(row, END, Action::Accept(prod.len()), policy)?;
                    }
                    None => {
                        let action = Action::Reduce(prod.name(), prod.len());
                        table.set_action(row, item.lookahead(), action, policy)?;
                    }
                }
            }
        }
        debug!(
            "table built: {} states, {} conflicts",
            table.rows.len(),
            table.conflicts.len()
        );
        Ok(table)
    }

    fn set_action(
        &mut self,
        state: usize,
        term: Terminal<'a>,
        action: Action<'a>,
        policy: ConflictPolicy,
    ) -> Result<(), GrammarError> {
        let previous = self.rows[state].actions.insert(term, action);
        self.check_conflict(state, term.into(), previous, action, policy)
    }

    fn set_goto(
        &mut self,
        state: usize,
        non_term: NonTerminal<'a>,
        to: usize,
        policy: ConflictPolicy,
    ) -> Result<(), GrammarError> {
        let previous = self.rows[state].gotos.insert(non_term, to);
        self.check_conflict(
            state,
            non_term.into(),
            previous.map(Action::Goto),
            Action::Goto(to),
            policy,
        )
    }

    fn check_conflict(
        &mut self,
        state: usize,
        symbol: Symbol<'a>,
        previous: Option<Action<'a>>,
        replacement: Action<'a>,
        policy: ConflictPolicy,
    ) -> Result<(), GrammarError> {
        let Some(previous) = previous.filter(|p| *p != replacement) else {
            return Ok(());
        };
        match policy {
            ConflictPolicy::Reject => Err(GrammarError::Conflict {
                state,
                symbol: symbol.to_string(),
                existing: previous.to_string(),
                incoming: replacement.to_string(),
            }),
            ConflictPolicy::Overwrite => {
                warn!("conflict on I_{state}, `{symbol}`: {previous} replaced by {replacement}");
                self.conflicts.push(Conflict {
                    state,
                    symbol,
                    previous,
                    replacement,
                });
                Ok(())
            }
        }
    }

    /// 状态数量, 即表的行数.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn action_cols(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn goto_cols(&self) -> usize {
        self.non_terms.len()
    }

    /// 查询 ACTION 表, `term` 为终结符名字, 空字符串表示输入结束.
    /// # Returns
    /// 如果没有这个状态或者表项为空, 那么返回 [`None`].
    #[must_use]
    pub fn action(&self, state: usize, term: &str) -> Option<Action<'a>> {
        self.rows.get(state)?.actions.get(term).copied()
    }

    /// 查询 GOTO(state, non_term), 如果没有这个状态或者没有这条出边, 那么返回 [`None`].
    #[must_use]
    pub fn goto(&self, state: usize, non_term: &str) -> Option<usize> {
        self.rows.get(state)?.gotos.get(non_term).copied()
    }

    /// 按符号查询表项, 非终结符的表项为 [`Action::Goto`].
    #[must_use]
    pub fn lookup(&self, state: usize, symbol: Symbol<'_>) -> Option<Action<'a>> {
        match symbol {
            Symbol::Literal(t) => self.action(state, t.as_str()),
            Symbol::Reference(nt) => self.goto(state, nt.as_str()).map(Action::Goto),
        }
    }

    /// 遍历一个项集状态的所有 ACTION 表项.
    /// 如果这个项集状态不存在, 那么返回 [`None`].
    #[must_use]
    pub fn actions(
        &self,
        state: usize,
    ) -> Option<impl Iterator<Item = (Terminal<'a>, Action<'a>)> + '_> {
        let row = self.rows.get(state)?;
        Some(row.actions.iter().map(|(t, a)| (*t, *a)))
    }

    /// 遍历一个项集状态的所有 GOTO 表项.
    #[must_use]
    pub fn gotos(&self, state: usize) -> Option<impl Iterator<Item = (NonTerminal<'a>, usize)> + '_> {
        let row = self.rows.get(state)?;
        Some(row.gotos.iter().map(|(nt, to)| (*nt, *to)))
    }

    /// 一个状态下可以接受的终结符, 按列的顺序排列.
    #[must_use]
    pub fn expected(&self, state: usize) -> Vec<Terminal<'a>> {
        let Some(row) = self.rows.get(state) else {
            return Vec::new();
        };
        self.terms
            .iter()
            .filter(|t| row.actions.contains_key(*t))
            .copied()
            .collect()
    }

    /// 生成过程中被覆盖的表项.
    #[must_use]
    pub fn conflicts(&self) -> &[Conflict<'a>] {
        &self.conflicts
    }

    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// 使用 markdown 形式输出表格.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut header_line = "| |".to_string();
        header_line += &self
            .terms
            .iter()
            .map(|t| format!(" `{t}` |"))
            .chain(self.non_terms.iter().map(|nt| format!(" `{nt}` |")))
            .collect::<String>();
        let sep_line: String = String::from("| - |")
            + &std::iter::repeat_n(" - |", self.terms.len() + self.non_terms.len())
                .collect::<String>();
        let mut data_lines = String::new();
        for (i, row) in self.rows.iter().enumerate() {
            let line = format!("| $I_{{{i}}}$ |")
                + &self
                    .terms
                    .iter()
                    .map(|t| match row.actions.get(t) {
                        Some(act) => format!(" {act} |"),
                        None => "  |".to_string(),
                    })
                    .chain(self.non_terms.iter().map(|nt| match row.gotos.get(nt) {
                        Some(to) => format!(" {to} |"),
                        None => "  |".to_string(),
                    }))
                    .collect::<String>();
            data_lines += &line;
            data_lines += "\n";
        }
        format!("{header_line}\n{sep_line}\n{}", data_lines.trim_end())
    }
}
