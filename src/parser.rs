use std::fmt::Display;

use tracing::{debug, trace};

use crate::{
    ActionTable, NonTerminal,
    error::SyntaxError,
    symbol::ROOT,
    table::Action,
};

/// 源文件中的位置, 行列都从 1 开始.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// 分析器读取的 token.
///
/// `kind` 就是文法中终结符的名字, 空字符串表示输入结束.
pub trait InputToken {
    fn kind(&self) -> &str;

    fn location(&self) -> Option<Location> {
        None
    }
}

impl<T: InputToken + ?Sized> InputToken for &T {
    fn kind(&self) -> &str {
        (**self).kind()
    }

    fn location(&self) -> Option<Location> {
        (**self).location()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'s> {
    pub kind: &'s str,
    pub text: &'s str,
    pub location: Option<Location>,
}

impl<'s> Token<'s> {
    #[must_use]
    pub fn new(kind: &'s str, text: &'s str) -> Self {
        Self {
            kind,
            text,
            location: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// 把空白分隔的终结符名字切分成 token, 每个 token 的文本就是它的名字.
    #[must_use]
    pub fn split_kinds(source: &'s str) -> Vec<Self> {
        let mut tokens = Vec::new();
        for (line, text) in source.lines().enumerate() {
            let mut start = None;
            for (pos, c) in text.char_indices().chain([(text.len(), ' ')]) {
                match (start, c.is_whitespace()) {
                    (None, false) => start = Some(pos),
                    (Some(s), true) => {
                        let word = &text[s..pos];
                        tokens.push(Self::new(word, word).with_location(Location {
                            line: line + 1,
                            column: text[..s].chars().count() + 1,
                        }));
                        start = None;
                    }
                    _ => (),
                }
            }
        }
        tokens
    }
}

impl InputToken for Token<'_> {
    fn kind(&self) -> &str {
        self.kind
    }

    fn location(&self) -> Option<Location> {
        self.location
    }
}

/// 语法树, 叶子是移入的 token, 内部节点是归约得到的非终结符.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast<'a, T> {
    Leaf(T),
    Node {
        name: NonTerminal<'a>,
        children: Vec<Ast<'a, T>>,
    },
}

impl<'a, T> Ast<'a, T> {
    /// 内部节点的名字, 叶子返回 [`None`].
    #[must_use]
    pub fn name(&self) -> Option<NonTerminal<'a>> {
        match self {
            Self::Leaf(_) => None,
            Self::Node { name, .. } => Some(*name),
        }
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Leaf(_) => &[],
            Self::Node { children, .. } => children,
        }
    }

    /// 从左到右的所有叶子, 对于接受的输入就是输入本身.
    #[must_use]
    pub fn leaves(&self) -> Vec<&T> {
        let mut leaves = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::Leaf(token) => leaves.push(token),
                Self::Node { children, .. } => stack.extend(children.iter().rev()),
            }
        }
        leaves
    }
}

/// S 表达式形式: 叶子输出 token 的 kind, 内部节点输出 `(name child ...)`.
impl<T: InputToken> Display for Ast<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf(token) => write!(f, "{}", token.kind()),
            Self::Node { name, children } => {
                write!(f, "({name}")?;
                for child in children {
                    write!(f, " {child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// 表驱动的移入-归约分析器, 分析表可以被多次分析共享.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'t, 'a> {
    table: &'t ActionTable<'a>,
}

impl<'t, 'a> Parser<'t, 'a> {
    #[must_use]
    pub fn new(table: &'t ActionTable<'a>) -> Self {
        Self { table }
    }

    /// 分析 token 序列, 输入耗尽或者遇到 kind 为空字符串的 token 视为输入结束.
    ///
    /// 遇到第一个语法错误就返回, 不做错误恢复.
    #[tracing::instrument(skip_all)]
    pub fn parse<T: InputToken>(
        &self,
        tokens: impl IntoIterator<Item = T>,
    ) -> Result<Ast<'a, T>, SyntaxError> {
        let mut tokens = tokens.into_iter().enumerate();
        // 状态栈总是比节点栈多一个元素, 栈底是 I_0.
        let mut states = vec![0];
        let mut nodes: Vec<Ast<'a, T>> = Vec::new();
        let mut lookahead = tokens.next();
        loop {
            let state = *states.last().expect("state stack is never empty");
            let kind = lookahead.as_ref().map_or("", |(_, t)| t.kind());
            let Some(action) = self.table.action(state, kind) else {
                return Err(self.unexpected(state, lookahead));
            };
            match action {
                Action::Shift(next) => {
                    let Some((index, token)) = lookahead.take() else {
                        unreachable!("end of input is never shifted")
                    };
                    trace!("shift #{index} `{}`, push I_{next}", token.kind());
                    nodes.push(Ast::Leaf(token));
                    states.push(next);
                    lookahead = tokens.next();
                }
                Action::Reduce(name, count) => {
                    let children = Self::pop(&mut states, &mut nodes, count);
                    let exposed = *states.last().expect("state stack is never empty");
                    let Some(to) = self.table.goto(exposed, name.as_str()) else {
                        return Err(SyntaxError::MissingGoto {
                            state: exposed,
                            name: name.to_string(),
                        });
                    };
                    trace!("reduce {name} by {count} symbols, GOTO(I_{exposed}, {name}) = I_{to}");
                    nodes.push(Ast::Node { name, children });
                    states.push(to);
                }
                Action::Accept(count) => {
                    let children = Self::pop(&mut states, &mut nodes, count);
                    debug!("input accepted");
                    return Ok(Ast::Node {
                        name: ROOT,
                        children,
                    });
                }
                Action::Goto(_) => unreachable!("goto entries are never keyed by terminals"),
            }
        }
    }

    /// 弹出栈顶 `count` 个 (状态, 节点), 节点按从左到右的顺序返回.
    fn pop<T>(states: &mut Vec<usize>, nodes: &mut Vec<Ast<'a, T>>, count: usize) -> Vec<Ast<'a, T>> {
        assert!(
            count <= nodes.len() && states.len() == nodes.len() + 1,
            "cannot pop {count} symbols from a stack of {} nodes and {} states",
            nodes.len(),
            states.len()
        );
        states.truncate(states.len() - count);
        nodes.split_off(nodes.len() - count)
    }

    fn unexpected<T: InputToken>(&self, state: usize, lookahead: Option<(usize, T)>) -> SyntaxError {
        let expected: Vec<String> = self
            .table
            .expected(state)
            .into_iter()
            .map(|t| t.to_string())
            .collect();
        debug!("no action in I_{state}, expected: {expected:?}");
        match lookahead {
            Some((index, token)) if !token.kind().is_empty() => SyntaxError::UnexpectedToken {
                index,
                kind: token.kind().to_string(),
                location: token.location(),
                expected,
            },
            _ => SyntaxError::UnexpectedEnd { expected },
        }
    }
}

#[cfg(test)]
mod test {
    use bumpalo::Bump;
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    use crate::{
        ActionTable, TableOptions, build_table,
        error::SyntaxError,
        parser::{Ast, Location, Parser, Token},
    };
    use pretty_assertions::assert_eq;

    const LET_STMT: &str = "
        __root : @stmt ;
        stmt : keyword_let id op_assign id semicolon ;
    ";

    const EXPR: &str = "
        __root : @expr ;
        expr : @expr plus @term ;
        expr : @term ;
        term : @term star @factor ;
        term : @factor ;
        factor : lparen @expr rparen ;
        factor : id ;
    ";

    fn init_tracing() {
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .without_time()
                    .with_test_writer()
                    .with_filter(LevelFilter::TRACE),
            )
            .try_init();
    }

    fn table<'a>(source: &'a str, bump: &'a Bump) -> ActionTable<'a> {
        build_table(source, bump, TableOptions::default()).unwrap()
    }

    fn kinds<'s>(ast: &Ast<'_, Token<'s>>) -> Vec<&'s str> {
        ast.leaves().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn let_stmt() {
        init_tracing();
        let bump = Bump::new();
        let table = table(LET_STMT, &bump);
        let input = "keyword_let id op_assign id semicolon";
        let ast = Parser::new(&table)
            .parse(Token::split_kinds(input))
            .unwrap();
        assert_eq!(
            ast.to_string(),
            "(__root (stmt keyword_let id op_assign id semicolon))"
        );
        assert_eq!(ast.name().map(|n| n.as_str()), Some("__root"));
        let [stmt] = ast.children() else {
            panic!("one child of __root expected")
        };
        assert_eq!(stmt.name().map(|n| n.as_str()), Some("stmt"));
        assert_eq!(stmt.children().len(), 5);
        assert_eq!(kinds(&ast), input.split_whitespace().collect::<Vec<_>>());
    }

    #[test]
    fn let_stmt_errors() {
        init_tracing();
        let bump = Bump::new();
        let table = table(LET_STMT, &bump);
        let parser = Parser::new(&table);
        assert_eq!(
            parser.parse(Token::split_kinds("keyword_let id id")),
            Err(SyntaxError::UnexpectedToken {
                index: 2,
                kind: "id".to_string(),
                location: Some(Location {
                    line: 1,
                    column: 16
                }),
                expected: vec!["op_assign".to_string()],
            })
        );
        assert_eq!(
            parser.parse(Token::split_kinds("keyword_let id")),
            Err(SyntaxError::UnexpectedEnd {
                expected: vec!["op_assign".to_string()],
            })
        );
        assert_eq!(
            parser.parse(Token::split_kinds(
                "keyword_let id op_assign id semicolon\nsemicolon"
            )),
            Err(SyntaxError::UnexpectedToken {
                index: 5,
                kind: "semicolon".to_string(),
                location: Some(Location { line: 2, column: 1 }),
                expected: vec!["$".to_string()],
            })
        );
        assert_eq!(
            parser.parse(Vec::<Token>::new()),
            Err(SyntaxError::UnexpectedEnd {
                expected: vec!["keyword_let".to_string()],
            })
        );
    }

    #[test]
    fn explicit_end_token() {
        let bump = Bump::new();
        let table = table(LET_STMT, &bump);
        let mut tokens = Token::split_kinds("keyword_let id op_assign id semicolon");
        tokens.push(Token::new("", ""));
        let ast = Parser::new(&table).parse(&tokens).unwrap();
        assert_eq!(ast.leaves().len(), 5);

        let short = [Token::new("keyword_let", "let"), Token::new("", "")];
        assert_eq!(
            Parser::new(&table).parse(short),
            Err(SyntaxError::UnexpectedEnd {
                expected: vec!["id".to_string()],
            })
        );
    }

    #[test]
    fn expression_round_trip() {
        init_tracing();
        let bump = Bump::new();
        let table = table(EXPR, &bump);
        let parser = Parser::new(&table);
        let input = "id plus id star lparen id plus id rparen";
        let ast = parser.parse(Token::split_kinds(input)).unwrap();
        assert_eq!(kinds(&ast), input.split_whitespace().collect::<Vec<_>>());
        assert_eq!(
            ast.to_string(),
            "(__root (expr (expr (term (factor id))) plus (term (term (factor id)) star \
             (factor lparen (expr (expr (term (factor id))) plus (term (factor id))) rparen))))"
        );
        for input in ["id", "lparen lparen id rparen rparen", "id star id star id plus id"] {
            let ast = parser.parse(Token::split_kinds(input)).unwrap();
            assert_eq!(kinds(&ast), input.split_whitespace().collect::<Vec<_>>());
        }
    }

    #[test]
    fn list_round_trip() {
        let bump = Bump::new();
        let table = table(
            "__root : @list ;
            list : @list comma id ;
            list : id ;",
            &bump,
        );
        let input = "id comma id comma id";
        let ast = Parser::new(&table)
            .parse(Token::split_kinds(input))
            .unwrap();
        assert_eq!(kinds(&ast), input.split_whitespace().collect::<Vec<_>>());
        assert_eq!(
            ast.to_string(),
            "(__root (list (list (list id) comma id) comma id))"
        );
    }

    #[test]
    fn altered_tokens_are_rejected() {
        let bump = Bump::new();
        let table = table(EXPR, &bump);
        let parser = Parser::new(&table);
        let input = Token::split_kinds("id plus id star lparen id plus id rparen");
        for i in 0..input.len() {
            let mut altered = input.clone();
            altered[i] = Token::new("semicolon", ";");
            let Err(SyntaxError::UnexpectedToken { index, kind, .. }) = parser.parse(altered)
            else {
                panic!("token #{i} altered, syntax error expected");
            };
            assert_eq!((index, kind.as_str()), (i, "semicolon"));
        }
        // 换成文法中存在但位置不对的终结符.
        for (i, kind, expected) in [
            (1, "id", ["plus", "star", "$"].as_slice()),
            (3, "lparen", ["plus", "star", "$"].as_slice()),
            (4, "rparen", ["lparen", "id"].as_slice()),
        ] {
            let mut altered = input.clone();
            altered[i] = Token::new(kind, kind);
            assert_eq!(
                parser.parse(altered),
                Err(SyntaxError::UnexpectedToken {
                    index: i,
                    kind: kind.to_string(),
                    location: None,
                    expected: expected.iter().map(|s| s.to_string()).collect(),
                })
            );
        }
        let mut altered = input.clone();
        altered[8] = Token::new("plus", "+");
        assert!(matches!(
            parser.parse(altered),
            Err(SyntaxError::UnexpectedEnd { .. })
        ));
        // 删掉最后的右括号, 括号中的 factor -> id ⋅ 不能在输入结束时归约.
        assert_eq!(
            parser.parse(&input[..input.len() - 1]),
            Err(SyntaxError::UnexpectedEnd {
                expected: vec![
                    "plus".to_string(),
                    "star".to_string(),
                    "rparen".to_string()
                ],
            })
        );
    }

    #[test]
    fn split_kinds() {
        assert_eq!(
            Token::split_kinds("  a bb\n\tc "),
            [
                Token::new("a", "a").with_location(Location { line: 1, column: 3 }),
                Token::new("bb", "bb").with_location(Location { line: 1, column: 5 }),
                Token::new("c", "c").with_location(Location { line: 2, column: 2 }),
            ]
        );
        assert_eq!(Location { line: 3, column: 7 }.to_string(), "3:7");
    }
}
