use std::{
    borrow::Borrow,
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
};

/// 终结符, 名字即词法分析器给出的 token 类型名.
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub struct Terminal<'a> {
    ident: &'a str,
}

impl Debug for Terminal<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!(r#"t{:?}"#, self.ident))
    }
}

impl Display for Terminal<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_end() {
            f.pad("$")
        } else {
            f.pad(self.ident)
        }
    }
}

// 必须和 str 的 hash 保持一致, 这样才能用 &str 直接查询以 Terminal 为键的表.
impl Hash for Terminal<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ident.hash(state);
    }
}

impl Borrow<str> for Terminal<'_> {
    fn borrow(&self) -> &str {
        self.ident
    }
}

impl<'a> From<&'a str> for Terminal<'a> {
    fn from(ident: &'a str) -> Self {
        Terminal { ident }
    }
}

impl<'a> Terminal<'a> {
    pub fn as_str(&self) -> &'a str {
        self.ident
    }

    /// 是否为输入结束标记 [`END`].
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.ident.is_empty()
    }
}

/// 非终结符.
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub struct NonTerminal<'a> {
    ident: &'a str,
}

impl Debug for NonTerminal<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!(r#"nt{:?}"#, self.ident))
    }
}

impl Display for NonTerminal<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.ident)
    }
}

impl Hash for NonTerminal<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ident.hash(state);
    }
}

impl Borrow<str> for NonTerminal<'_> {
    fn borrow(&self) -> &str {
        self.ident
    }
}

/// 输入结束标记, 以空字符串作为 lookahead 的键.
pub const END: Terminal<'static> = Terminal { ident: "" };
/// 文法的根非终结符, 有且只有一个产生式.
pub const ROOT: NonTerminal<'static> = NonTerminal { ident: "__root" };

impl<'a> From<&'a str> for NonTerminal<'a> {
    fn from(ident: &'a str) -> Self {
        Self { ident }
    }
}

impl<'a> NonTerminal<'a> {
    pub fn as_str(&self) -> &'a str {
        self.ident
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        *self == ROOT
    }
}

/// 产生式右侧的文法符号.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol<'a> {
    Literal(Terminal<'a>),
    Reference(NonTerminal<'a>),
}

impl Debug for Symbol<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(arg0) => f.pad(&format!("{:?}", arg0)),
            Self::Reference(arg0) => f.pad(&format!("{:?}", arg0)),
        }
    }
}

impl Display for Symbol<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(arg0) => f.pad(&format!("{}", arg0)),
            Self::Reference(arg0) => f.pad(&format!("{}", arg0)),
        }
    }
}

impl<'a> Symbol<'a> {
    /// 非终结符引用, 终结符返回 [`None`].
    #[must_use]
    pub fn as_reference(&self) -> Option<NonTerminal<'a>> {
        match self {
            Self::Literal(_) => None,
            Self::Reference(nt) => Some(*nt),
        }
    }
}

impl<'a> From<Terminal<'a>> for Symbol<'a> {
    fn from(value: Terminal<'a>) -> Self {
        Self::Literal(value)
    }
}

impl<'a> From<NonTerminal<'a>> for Symbol<'a> {
    fn from(value: NonTerminal<'a>) -> Self {
        Self::Reference(value)
    }
}
