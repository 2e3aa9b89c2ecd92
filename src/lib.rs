pub mod canonical;
pub mod error;
pub mod grammar;
pub mod item;
pub mod parser;
pub mod sets;
pub mod symbol;
pub mod table;

use bumpalo::Bump;

pub use error::{GrammarError, SyntaxError};
pub use grammar::{Grammar, Production};
pub use item::{Family, Item, ItemSet};
pub use parser::{Ast, InputToken, Location, Parser, Token};
pub use sets::{FirstSets, FollowSets};
pub use symbol::{END, NonTerminal, ROOT, Symbol, Terminal};
pub use table::{Action, ActionTable, ConflictPolicy, TableOptions};

/// 解析文法源文件并生成规范 LR(1) 分析表.
pub fn build_table<'a>(
    source: &'a str,
    bump: &'a Bump,
    options: TableOptions,
) -> Result<ActionTable<'a>, GrammarError> {
    let grammar = Grammar::from_source(source, bump)?;
    let family = Family::from_grammar(&grammar);
    ActionTable::build_from(&family, &grammar, options)
}

#[cfg(test)]
mod test {
    use bumpalo::Bump;

    use crate::{ConflictPolicy, GrammarError, TableOptions, build_table};
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_root() {
        let bump = Bump::new();
        assert_eq!(
            build_table(
                "stmt : keyword_let id op_assign id semicolon ;",
                &bump,
                TableOptions::default()
            ),
            Err(GrammarError::RootNotFound)
        );
    }

    #[test]
    fn strict_table() {
        let bump = Bump::new();
        let table = build_table(
            "__root : @stmt ; stmt : keyword_let id op_assign id semicolon ;",
            &bump,
            TableOptions {
                conflict_policy: ConflictPolicy::Reject,
            },
        )
        .unwrap();
        assert_eq!(table.rows(), 7);
    }
}
