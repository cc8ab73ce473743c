//! Builtin operator and function table
//!
//! Overload chains for every builtin are built once from the static table
//! below. The table is the only place operator precedence, merge policy and
//! fold eligibility are declared.

use crate::{CallInfo, CallKind, DataType, MergePolicy, OverloadChain, Symbol, SymbolKind};
use indexmap::IndexMap;
use std::sync::LazyLock;

/// Type shorthand usable in a `static` table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sig {
    Bool,
    Number,
    Text,
    Binary,
    Time,
    Code,
    Table,
    Row,
    Ordered,
    Ordinal,
    Any,
    Unknown,
}

impl Sig {
    pub fn data_type(self) -> DataType {
        match self {
            Sig::Bool => DataType::Bool,
            Sig::Number => DataType::Number,
            Sig::Text => DataType::Text,
            Sig::Binary => DataType::Binary,
            Sig::Time => DataType::Time,
            Sig::Code => DataType::Code,
            Sig::Table => DataType::Table,
            Sig::Row => DataType::Row,
            Sig::Ordered => DataType::Ordered,
            Sig::Ordinal => DataType::Ordinal,
            Sig::Any => DataType::Any,
            Sig::Unknown => DataType::Unknown,
        }
    }
}

struct Link {
    name: &'static str,
    args: &'static [Sig],
    ret: Sig,
    variadic: Option<Sig>,
    kind: CallKind,
    accums: usize,
    windowed: bool,
}

const fn fixed(name: &'static str, args: &'static [Sig], ret: Sig) -> Link {
    Link {
        name,
        args,
        ret,
        variadic: None,
        kind: CallKind::Fixed,
        accums: 0,
        windowed: false,
    }
}

const fn aggregate(name: &'static str, args: &'static [Sig], ret: Sig, accums: usize) -> Link {
    Link {
        accums,
        ..fixed(name, args, ret)
    }
}

const fn window(name: &'static str, args: &'static [Sig], ret: Sig, accums: usize) -> Link {
    Link {
        accums,
        windowed: true,
        ..fixed(name, args, ret)
    }
}

const fn variadic(name: &'static str, element: Sig, ret: Sig, kind: CallKind) -> Link {
    Link {
        variadic: Some(element),
        kind,
        ..fixed(name, &[], ret)
    }
}

use Sig::{Bool, Code, Number, Ordered, Ordinal, Row, Table, Text, Time, Unknown};

const NN: &[Sig] = &[Number, Number];
const TT: &[Sig] = &[Text, Text];
const RR: &[Sig] = &[Table, Table];
const BB: &[Sig] = &[Bool, Bool];

static LINKS: &[Link] = &[
    // logic
    fixed("or", BB, Bool),
    fixed("xor", BB, Bool),
    fixed("and", BB, Bool),
    fixed("not", &[Bool], Bool),
    // comparison
    fixed("=", BB, Bool),
    fixed("=", NN, Bool),
    fixed("=", TT, Bool),
    fixed("=", &[Sig::Binary, Sig::Binary], Bool),
    fixed("=", &[Time, Time], Bool),
    fixed("=", RR, Bool),
    fixed("=", &[Row, Row], Bool),
    fixed("<>", BB, Bool),
    fixed("<>", NN, Bool),
    fixed("<>", TT, Bool),
    fixed("<>", &[Time, Time], Bool),
    fixed("<>", RR, Bool),
    fixed("<>", &[Row, Row], Bool),
    fixed("<", NN, Bool),
    fixed("<", TT, Bool),
    fixed("<", &[Time, Time], Bool),
    fixed("<=", NN, Bool),
    fixed("<=", TT, Bool),
    fixed("<=", &[Time, Time], Bool),
    fixed(">", NN, Bool),
    fixed(">", TT, Bool),
    fixed(">", &[Time, Time], Bool),
    fixed(">=", NN, Bool),
    fixed(">=", TT, Bool),
    fixed(">=", &[Time, Time], Bool),
    fixed("sub", RR, Bool),
    fixed("sup", RR, Bool),
    // relational
    fixed("union", RR, Table),
    fixed("intersect", RR, Table),
    fixed("minus", RR, Table),
    fixed("join", RR, Table),
    fixed("compose", RR, Table),
    fixed("semijoin", RR, Table),
    fixed("antijoin", RR, Table),
    fixed("restrict", &[Table, Code], Table),
    variadic("union_all", Table, Table, CallKind::VariadicTable),
    // arithmetic
    fixed("+", NN, Number),
    fixed("+", &[Time, Number], Time),
    fixed("-", NN, Number),
    fixed("-", &[Time, Number], Time),
    fixed("&", TT, Text),
    fixed("*", NN, Number),
    fixed("/", NN, Number),
    fixed("div", NN, Number),
    fixed("mod", NN, Number),
    fixed("^", NN, Number),
    fixed("neg", &[Number], Number),
    // scalar functions
    fixed("length", &[Text], Number),
    fixed("upper", &[Text], Text),
    fixed("lower", &[Text], Text),
    fixed("trim", &[Text], Text),
    fixed("text", &[Sig::Any], Text),
    fixed("degree", &[Table], Number),
    fixed("degree", &[Row], Number),
    fixed("card", &[Table], Number),
    fixed("succ", &[Ordinal], Unknown),
    fixed("pred", &[Ordinal], Unknown),
    fixed("clamp", &[Ordered, Ordered, Ordered], Unknown),
    variadic("concat", Text, Text, CallKind::Variadic),
    // aggregates
    aggregate("count", &[], Number, 1),
    aggregate("sum", &[Number], Number, 1),
    aggregate("avg", &[Number], Number, 2),
    aggregate("max", &[Ordered], Unknown, 1),
    aggregate("min", &[Ordered], Unknown, 1),
    Link {
        kind: CallKind::Fold,
        ..aggregate("fold", &[Sig::Any], Unknown, 1)
    },
    // windowed
    window("ord", &[], Number, 1),
    window("ordg", &[], Number, 1),
    window("lag", &[Sig::Any, Number], Unknown, 0),
    window("lead", &[Sig::Any, Number], Unknown, 0),
    window("nth", &[Sig::Any, Number], Unknown, 0),
];

struct Operator {
    name: &'static str,
    precedence: u8,
    join: Option<MergePolicy>,
    foldable: bool,
}

const fn op(name: &'static str, precedence: u8, join: Option<MergePolicy>, foldable: bool) -> Operator {
    Operator {
        name,
        precedence,
        join,
        foldable,
    }
}

use MergePolicy::{Compare, Compose, Join, Left, Same};

static OPERATORS: &[Operator] = &[
    op("or", 1, None, true),
    op("xor", 1, None, true),
    op("and", 2, None, true),
    op("=", 4, Some(Compare), false),
    op("<>", 4, Some(Compare), false),
    op("<", 4, Some(Compare), false),
    op("<=", 4, Some(Compare), false),
    op(">", 4, Some(Compare), false),
    op(">=", 4, Some(Compare), false),
    op("sub", 4, Some(Compare), false),
    op("sup", 4, Some(Compare), false),
    op("union", 5, Some(Same), true),
    op("intersect", 5, Some(Same), true),
    op("minus", 5, Some(Same), false),
    op("join", 5, Some(Join), true),
    op("compose", 5, Some(Compose), false),
    op("semijoin", 5, Some(Left), false),
    op("antijoin", 5, Some(Left), false),
    op("+", 6, None, true),
    op("-", 6, None, false),
    op("&", 6, None, true),
    op("*", 7, None, true),
    op("/", 7, None, false),
    op("div", 7, None, false),
    op("mod", 7, None, false),
    op("^", 8, None, false),
];

/// Builtin symbols keyed by name
pub struct Builtins {
    symbols: IndexMap<&'static str, Symbol>,
}

static BUILTINS: LazyLock<Builtins> = LazyLock::new(Builtins::build);

impl Builtins {
    /// The process-wide, immutable builtin table
    pub fn get() -> &'static Builtins {
        &BUILTINS
    }

    fn build() -> Self {
        let mut chains: IndexMap<&'static str, OverloadChain> = IndexMap::new();
        for link in LINKS {
            let mut info = CallInfo::new(link.name, link.ret.data_type(), link.kind).accums(link.accums);
            for (i, arg) in link.args.iter().enumerate() {
                info = info.arg(format!("a{i}"), arg.data_type());
            }
            if let Some(element) = link.variadic {
                info = info.variadic(element.data_type());
            }
            if link.windowed {
                info = info.windowed();
            }
            chains.entry(link.name).or_default().push(info);
        }

        let symbols = chains
            .into_iter()
            .map(|(name, chain)| {
                let mut symbol = Symbol::callable(name, SymbolKind::Operator, chain);
                if let Some(op) = OPERATORS.iter().find(|op| op.name == name) {
                    symbol = symbol.with_precedence(op.precedence);
                    if let Some(policy) = op.join {
                        symbol = symbol.with_join(policy);
                    }
                    if op.foldable {
                        symbol = symbol.foldable();
                    }
                }
                (name, symbol)
            })
            .collect();
        Self { symbols }
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Infix precedence, if `name` is an infix operator
    pub fn precedence(&self, name: &str) -> Option<u8> {
        self.lookup(name).filter(|s| s.is_infix()).map(|s| s.precedence)
    }

    pub fn infix_operators(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values().filter(|s| s.is_infix())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_levels() {
        let b = Builtins::get();
        assert_eq!(b.precedence("or"), Some(1));
        assert_eq!(b.precedence("and"), Some(2));
        assert_eq!(b.precedence("<="), Some(4));
        assert_eq!(b.precedence("join"), Some(5));
        assert_eq!(b.precedence("+"), Some(6));
        assert_eq!(b.precedence("mod"), Some(7));
        assert_eq!(b.precedence("^"), Some(8));
        assert_eq!(b.precedence("length"), None);
    }

    #[test]
    fn test_chains_share_arity() {
        for symbol in Builtins::get().iter() {
            let links = symbol.links();
            assert!(
                links.iter().all(|l| l.arity() == links[0].arity()),
                "mixed arity in {}",
                symbol.name
            );
            for (i, a) in links.iter().enumerate() {
                for b in &links[i + 1..] {
                    assert!(!a.same_signature(b), "duplicate signature in {}", symbol.name);
                }
            }
        }
    }

    #[test]
    fn test_aggregate_metadata() {
        let b = Builtins::get();
        assert_eq!(b.lookup("avg").unwrap().links()[0].accum_count, 2);
        assert!(b.lookup("ord").unwrap().links()[0].windowed);
        assert!(b.lookup("+").unwrap().foldable);
        assert_eq!(b.lookup("semijoin").unwrap().join, Some(MergePolicy::Left));
    }
}
