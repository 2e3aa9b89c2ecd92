use std::io::{self, Read};

use bumpalo::Bump;
use clap::Parser as _;
use lr1_table::*;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 从标准输入读取文法, 输出规范 LR(1) 项集族和分析表.
#[derive(clap::Parser)]
struct AppArgs {
    /// 表项冲突时报错退出.
    #[clap(long)]
    strict: bool,
    /// 输出 FIRST 集和 FOLLOW 集.
    #[clap(long)]
    sets: bool,
    /// 用生成的分析表分析一串空白分隔的终结符.
    #[clap(short, long)]
    tokens: Option<String>,
    /// 日志级别, -v 为 debug, -vv 为 trace.
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn format_set<'s, 'a: 's>(set: impl IntoIterator<Item = &'s Terminal<'a>>) -> String {
    set.into_iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = AppArgs::parse();
    let level = match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .without_time()
                .with_writer(io::stderr)
                .with_filter(level),
        )
        .init();

    let mut inp = String::new();
    io::stdin().read_to_string(&mut inp)?;
    let bump = Bump::new();
    let grammar = Grammar::from_source(&inp, &bump)?;
    for (idx, prod) in grammar.prods().iter().enumerate() {
        println!("{idx:>4} {prod}");
    }
    println!();
    if args.sets {
        let first = FirstSets::compute(&grammar);
        for (nt, set) in first.iter() {
            println!("FIRST({nt}) = {{ {} }}", format_set(set));
        }
        let follow = FollowSets::compute(&grammar, &first);
        for (nt, set) in follow.iter() {
            println!("FOLLOW({nt}) = {{ {} }}", format_set(set));
        }
        println!();
    }
    let family = Family::from_grammar(&grammar);
    for (from, is) in family.item_sets().enumerate() {
        println!("I_{from}:");
        for item in is.items() {
            println!("{item}");
        }
        println!("gotos:");
        for (sym, to) in family.gotos_of(from) {
            println!("I_{from} -- {sym} --> I_{to}");
        }
        println!();
    }
    let options = TableOptions {
        conflict_policy: if args.strict {
            ConflictPolicy::Reject
        } else {
            ConflictPolicy::Overwrite
        },
    };
    let table = ActionTable::build_from(&family, &grammar, options)?;
    println!("--- Table ---");
    println!("{}", table.to_markdown());
    for conflict in table.conflicts() {
        println!(
            "conflict: I_{} on `{}`: {} replaced by {}",
            conflict.state, conflict.symbol, conflict.previous, conflict.replacement
        );
    }
    if let Some(tokens) = args.tokens {
        println!();
        let ast = Parser::new(&table).parse(Token::split_kinds(&tokens))?;
        println!("{ast}");
    }
    Ok(())
}
