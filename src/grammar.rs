use bumpalo::Bump;
use indexmap::{IndexMap, IndexSet};
use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    str::CharIndices,
};
use tracing::{debug, warn};

use crate::{
    NonTerminal, Symbol, Terminal,
    error::{GrammarError, ParseProductionError},
    symbol::ROOT,
};

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Production<'a> {
    // 产生式 `:` 左侧的非终结符.
    name: NonTerminal<'a>,
    // 产生式 `:` 右侧的符号, 至少有一个.
    symbols: &'a [Symbol<'a>],
}

impl Debug for Production<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Production")
            .field(&format_args!(
                "{:?} -> {}",
                self.name,
                self.symbols
                    .iter()
                    .map(|s| format!("{:?} ", s))
                    .collect::<String>()
                    .trim_end()
            ))
            .finish()
    }
}

/// 按照文法源文件的格式输出, 非终结符带 `@` 前缀.
impl Display for Production<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!(
            "{} : {} ;",
            self.name,
            self.symbols
                .iter()
                .map(|s| match s {
                    Symbol::Literal(t) => format!("{t} "),
                    Symbol::Reference(nt) => format!("@{nt} "),
                })
                .collect::<String>()
                .trim_end()
        ))
    }
}

impl<'a> Production<'a> {
    #[must_use]
    pub fn new(name: NonTerminal<'a>, symbols: &'a [Symbol<'a>]) -> Self {
        Self { name, symbols }
    }

    #[must_use]
    pub fn name(&self) -> NonTerminal<'a> {
        self.name
    }

    #[must_use]
    pub fn symbols(&self) -> &'a [Symbol<'a>] {
        self.symbols
    }

    #[must_use]
    pub fn first_symbol(&self) -> Option<Symbol<'a>> {
        self.symbols.first().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexKind {
    End,
    Unknown,
    Colon,
    Semicolon,
    Reference,
    Literal,
}

impl LexKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::End => "end",
            Self::Unknown => "unknown",
            Self::Colon => "colon",
            Self::Semicolon => "semicolon",
            Self::Reference => "reference",
            Self::Literal => "literal",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Lexeme<'a> {
    kind: LexKind,
    /// 去掉 `@` 之后的符号名, 标点符号为其自身.
    text: &'a str,
    line: usize,
    column: usize,
}

/// 文法源文件的词法分析器.
struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let (pos, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some((pos, c))
    }

    fn is_punctuation(c: char) -> bool {
        matches!(c, ':' | ';' | '@')
    }

    fn next_lexeme(&mut self) -> Lexeme<'a> {
        while self.chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            self.bump();
        }
        let (line, column) = (self.line, self.column);
        let lexeme = |kind: LexKind, text: &'a str| Lexeme {
            kind,
            text,
            line,
            column,
        };
        let Some((start, c)) = self.bump() else {
            return lexeme(LexKind::End, "");
        };
        match c {
            ':' => return lexeme(LexKind::Colon, ":"),
            ';' => return lexeme(LexKind::Semicolon, ";"),
            _ => (),
        }
        let mut end = start + c.len_utf8();
        while let Some(&(pos, c)) = self.chars.peek() {
            if c.is_whitespace() || Self::is_punctuation(c) {
                break;
            }
            end = pos + c.len_utf8();
            self.bump();
        }
        match c {
            '@' if end == start + 1 => lexeme(LexKind::Unknown, "@"),
            '@' => lexeme(LexKind::Reference, &self.source[start + 1..end]),
            _ => lexeme(LexKind::Literal, &self.source[start..end]),
        }
    }
}

fn unexpected(expected: &'static [&'static str], found: Lexeme<'_>) -> GrammarError {
    debug!(
        "unexpected {:?} `{}` at {}:{}",
        found.kind, found.text, found.line, found.column
    );
    GrammarError::parse_production_error(
        found.line,
        found.column,
        ParseProductionError::UnexpectedToken {
            expected,
            found: found.kind.as_str(),
        },
    )
}

#[derive(Debug, Clone)]
pub struct Grammar<'a> {
    prods: Vec<&'a Production<'a>>,
    prod_indexes: HashMap<&'a Production<'a>, usize>,
    /// 以非终结符为键的产生式, 保持定义顺序.
    prods_by_name: IndexMap<NonTerminal<'a>, Vec<&'a Production<'a>>>,
    /// 按首次出现的顺序排列的终结符, 不包含 [`crate::END`].
    terminals: IndexSet<Terminal<'a>>,
    root: &'a Production<'a>,
}

impl PartialEq for Grammar<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.prods == other.prods
    }
}

impl Eq for Grammar<'_> {}

impl<'a> Grammar<'a> {
    /// 按产生式编号遍历产生式.
    pub fn prods(&self) -> &[&'a Production<'a>] {
        &self.prods
    }

    /// 获取产生式的编号, 如果产生式在文法中不存在, 那么返回 [`None`].
    #[must_use]
    pub fn index_of_prod(&self, prod: &Production<'a>) -> Option<usize> {
        self.prod_indexes.get(prod).copied()
    }

    /// 获取以某个非终结符为头部的所有产生式, 结果可能为空.
    #[must_use]
    pub fn prods_of(&self, nt: NonTerminal<'a>) -> &[&'a Production<'a>] {
        self.prods_by_name
            .get(&nt)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// `__root` 唯一的产生式.
    #[must_use]
    pub fn root_production(&self) -> &'a Production<'a> {
        self.root
    }

    pub fn non_terminals(&self) -> impl Iterator<Item = NonTerminal<'a>> + '_ {
        self.prods_by_name.keys().copied()
    }

    pub fn terminals(&self) -> impl Iterator<Item = Terminal<'a>> + '_ {
        self.terminals.iter().copied()
    }

    /// 解析文法源文件.
    ///
    /// 每个产生式形如 `name : symbol symbol ... ;`, 以 `@` 开头的符号为非终结符, 其余为终结符.
    /// 产生式和符号都分配在 `bump` 中, 符号名直接引用 `source`.
    ///
    /// 遇到第一个错误就返回, 不会返回部分构建的文法.
    pub fn from_source(source: &'a str, bump: &'a Bump) -> Result<Self, GrammarError> {
        let mut scanner = Scanner::new(source);
        let mut prods: Vec<&'a Production<'a>> = Vec::new();
        let mut prod_indexes = HashMap::new();
        let mut prods_by_name: IndexMap<NonTerminal<'a>, Vec<&'a Production<'a>>> =
            IndexMap::new();
        let mut terminals = IndexSet::new();
        loop {
            let name = scanner.next_lexeme();
            match name.kind {
                LexKind::End => break,
                LexKind::Literal => (),
                _ => Err(unexpected(&["literal"], name))?,
            }
            let colon = scanner.next_lexeme();
            if colon.kind != LexKind::Colon {
                Err(unexpected(&["colon"], colon))?
            }
            let mut symbols: Vec<Symbol<'a>> = Vec::new();
            loop {
                let lexeme = scanner.next_lexeme();
                match lexeme.kind {
                    LexKind::Literal => {
                        let t = Terminal::from(lexeme.text);
                        terminals.insert(t);
                        symbols.push(t.into());
                    }
                    LexKind::Reference => symbols.push(NonTerminal::from(lexeme.text).into()),
                    LexKind::Semicolon if !symbols.is_empty() => break,
                    _ if symbols.is_empty() => {
                        Err(unexpected(&["reference", "literal"], lexeme))?
                    }
                    _ => Err(unexpected(&["semicolon", "reference", "literal"], lexeme))?,
                }
            }
            let name = NonTerminal::from(name.text);
            let prod = Production::new(name, bump.alloc_slice_copy(&symbols));
            if prod_indexes.contains_key(&prod) {
                warn!("duplicated production ignored: {prod}");
                continue;
            }
            let prod = &*bump.alloc(prod);
            prod_indexes.insert(prod, prods.len());
            prods.push(prod);
            prods_by_name.entry(name).or_default().push(prod);
        }
        // 验证根非终结符.
        let root = match prods_by_name.get(ROOT.as_str()).map(Vec::as_slice) {
            None | Some([]) => Err(GrammarError::RootNotFound)?,
            Some([root]) => *root,
            Some(roots) => Err(GrammarError::MultipleRoots(roots.len()))?,
        };
        // 验证所有引用的非终结符都有定义.
        if let Some(nt) = prods
            .iter()
            .flat_map(|p| p.symbols())
            .filter_map(Symbol::as_reference)
            .find(|nt| !prods_by_name.contains_key(nt))
        {
            Err(GrammarError::UndefinedNonTerminal(nt.as_str().to_string()))?
        }
        debug!(
            "grammar loaded: {} productions, {} non-terminals, {} terminals",
            prods.len(),
            prods_by_name.len(),
            terminals.len()
        );
        Ok(Grammar {
            prods,
            prod_indexes,
            prods_by_name,
            terminals,
            root,
        })
    }
}

#[cfg(test)]
mod test {
    use bumpalo::Bump;

    use crate::{
        NonTerminal, Production, Symbol, Terminal,
        error::{GrammarError, ParseProductionError},
        grammar::Grammar,
        symbol::ROOT,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_productions() {
        let input = "
            __root : @stmt ;
            stmt : keyword_let id op_assign @expr semicolon ;
            expr:id;expr : @expr op_add id ;
        ";
        let bump = Bump::new();
        let grammar = Grammar::from_source(input, &bump).unwrap();

        let stmt = NonTerminal::from("stmt");
        let expr = NonTerminal::from("expr");
        let id = Terminal::from("id");
        let root_symbols = [Symbol::from(stmt)];
        let stmt_symbols: [Symbol; 5] = [
            Terminal::from("keyword_let").into(),
            id.into(),
            Terminal::from("op_assign").into(),
            expr.into(),
            Terminal::from("semicolon").into(),
        ];
        let expr_id_symbols = [Symbol::from(id)];
        let expr_add_symbols: [Symbol; 3] = [expr.into(), Terminal::from("op_add").into(), id.into()];
        let prods = [
            Production::new(ROOT, &root_symbols),
            Production::new(stmt, &stmt_symbols),
            Production::new(expr, &expr_id_symbols),
            Production::new(expr, &expr_add_symbols),
        ];

        assert_eq!(grammar.prods(), prods.iter().collect::<Vec<_>>());
        assert_eq!(grammar.root_production(), &prods[0]);
        assert_eq!(grammar.prods_of(expr), [&prods[2], &prods[3]]);
        assert_eq!(grammar.index_of_prod(&prods[3]), Some(3));
        assert_eq!(
            grammar.non_terminals().collect::<Vec<_>>(),
            [ROOT, stmt, expr]
        );
        assert_eq!(
            grammar
                .terminals()
                .map(|t| t.as_str())
                .collect::<Vec<_>>(),
            ["keyword_let", "id", "op_assign", "semicolon", "op_add"]
        );
        assert_eq!(
            prods[1].to_string(),
            "stmt : keyword_let id op_assign @expr semicolon ;"
        );
        assert_eq!(prods[1].first_symbol(), Some(Terminal::from("keyword_let").into()));
    }

    #[test]
    fn duplicated_production() {
        let bump = Bump::new();
        let grammar =
            Grammar::from_source("__root : @a ; a : x ; a : x ; a : y ;", &bump).unwrap();
        assert_eq!(grammar.prods().len(), 3);
        assert_eq!(grammar.prods_of("a".into()).len(), 2);
    }

    #[test]
    fn syntax_errors() {
        let bump = Bump::new();
        let unexpected = |line, column, expected: &'static [&'static str], found| {
            Err(GrammarError::ParseProduction {
                line,
                column,
                cause: ParseProductionError::UnexpectedToken { expected, found },
            })
        };
        assert_eq!(
            Grammar::from_source("__root : @a ;\na b ;", &bump),
            unexpected(2, 3, &["colon"], "literal")
        );
        assert_eq!(
            Grammar::from_source("@a : b ;", &bump),
            unexpected(1, 1, &["literal"], "reference")
        );
        assert_eq!(
            Grammar::from_source("__root : ;", &bump),
            unexpected(1, 10, &["reference", "literal"], "semicolon")
        );
        assert_eq!(
            Grammar::from_source("__root : a b", &bump),
            unexpected(1, 13, &["semicolon", "reference", "literal"], "end")
        );
        assert_eq!(
            Grammar::from_source("__root : a @ ;", &bump),
            unexpected(1, 12, &["semicolon", "reference", "literal"], "unknown")
        );
    }

    #[test]
    fn root_validation() {
        let bump = Bump::new();
        assert_eq!(
            Grammar::from_source("stmt : a ;", &bump),
            Err(GrammarError::RootNotFound)
        );
        assert_eq!(
            Grammar::from_source("", &bump),
            Err(GrammarError::RootNotFound)
        );
        assert_eq!(
            Grammar::from_source("__root : a ; __root : b ;", &bump),
            Err(GrammarError::MultipleRoots(2))
        );
        assert_eq!(
            Grammar::from_source("__root : @stmt ; stmt : @expr ;", &bump),
            Err(GrammarError::UndefinedNonTerminal("expr".to_string()))
        );
    }
}
