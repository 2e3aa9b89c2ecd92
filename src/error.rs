use crate::parser::Location;

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum GrammarError {
    #[error("Error parsing productions, line: {line}, column: {column}, cause: {cause}.")]
    ParseProduction {
        line: usize,
        column: usize,
        cause: ParseProductionError,
    },
    #[error("Unable to find a root non-terminal, `__root` must be defined.")]
    RootNotFound,
    #[error("The root non-terminal must be defined once, found {0} productions.")]
    MultipleRoots(usize),
    #[error("Grammar does not contain the non-terminal: {0}.")]
    UndefinedNonTerminal(String),
    #[error("Ambiguous grammar, state {state} on `{symbol}`: {existing} conflicts with {incoming}.")]
    Conflict {
        state: usize,
        symbol: String,
        existing: String,
        incoming: String,
    },
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum ParseProductionError {
    #[error("{} expected, got '{found}'", fmt_alternatives(.expected))]
    UnexpectedToken {
        /// 可以接受的词法单元种类, 按优先顺序排列.
        expected: &'static [&'static str],
        found: &'static str,
    },
}

impl GrammarError {
    pub(crate) fn parse_production_error(
        line: usize,
        column: usize,
        cause: ParseProductionError,
    ) -> Self {
        Self::ParseProduction {
            line,
            column,
            cause,
        }
    }
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum SyntaxError {
    #[error("Unexpected token `{kind}` at #{index}{}, expected one of: {}.", fmt_location(.location), .expected.join(", "))]
    UnexpectedToken {
        /// 出错 token 在输入流中的序号, 从 0 开始.
        index: usize,
        kind: String,
        location: Option<Location>,
        expected: Vec<String>,
    },
    #[error("Unexpected end of input, expected one of: {}.", .expected.join(", "))]
    UnexpectedEnd { expected: Vec<String> },
    /// 归约之后暴露出来的状态没有对应的 GOTO 表项, 说明分析表本身有问题.
    #[error("State {state} has no goto entry for `{name}`.")]
    MissingGoto { state: usize, name: String },
}

fn fmt_alternatives(kinds: &[&str]) -> String {
    kinds
        .iter()
        .map(|k| format!("'{k}'"))
        .collect::<Vec<_>>()
        .join(" or ")
}

fn fmt_location(location: &Option<Location>) -> String {
    location
        .as_ref()
        .map(|l| format!(" ({l})"))
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use crate::error::{GrammarError, ParseProductionError};
    use pretty_assertions::assert_eq;

    #[test]
    fn display() {
        let err = GrammarError::parse_production_error(
            1,
            13,
            ParseProductionError::UnexpectedToken {
                expected: &["semicolon", "reference", "literal"],
                found: "end",
            },
        );
        assert_eq!(
            err.to_string(),
            "Error parsing productions, line: 1, column: 13, cause: \
             'semicolon' or 'reference' or 'literal' expected, got 'end'."
        );
        assert_eq!(
            ParseProductionError::UnexpectedToken {
                expected: &["colon"],
                found: "literal",
            }
            .to_string(),
            "'colon' expected, got 'literal'"
        );
    }
}
