//! Precedence climbing over flat infix chains
//!
//! The grammar hands over `first op x op x ...` without grouping. A run of
//! operators binding strictly tighter than the one on its left is reduced
//! into a subtree first; equal or looser operators fold left to right.

use std::iter::Peekable;

/// Reduce a flat chain into a tree
///
/// `combine` is called once per operator, innermost groups first, so any
/// side effects it has (type checking, accumulator allocation) happen in
/// evaluation order of the resulting tree.
pub fn climb<T, O, E>(
    first: T,
    rest: Vec<(O, T)>,
    precedence: impl Fn(&O) -> u8,
    mut combine: impl FnMut(T, O, T) -> Result<T, E>,
) -> Result<T, E> {
    let mut iter = rest.into_iter().peekable();
    climb_from(first, &mut iter, 0, &precedence, &mut combine)
}

fn climb_from<T, O, E, I>(
    mut lhs: T,
    iter: &mut Peekable<I>,
    min: u8,
    precedence: &impl Fn(&O) -> u8,
    combine: &mut impl FnMut(T, O, T) -> Result<T, E>,
) -> Result<T, E>
where
    I: Iterator<Item = (O, T)>,
{
    loop {
        let level = match iter.peek() {
            Some((op, _)) if precedence(op) >= min => precedence(op),
            _ => return Ok(lhs),
        };
        let Some((op, mut rhs)) = iter.next() else {
            return Ok(lhs);
        };
        loop {
            let next = match iter.peek() {
                Some((next, _)) if precedence(next) > level => precedence(next),
                _ => break,
            };
            rhs = climb_from(rhs, iter, next, precedence, combine)?;
        }
        lhs = combine(lhs, op, rhs)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;

    fn prec(op: &char) -> u8 {
        match op {
            '+' | '-' => 6,
            '*' | '/' => 7,
            '^' => 8,
            _ => 1,
        }
    }

    fn tree(first: &str, rest: &[(char, &str)]) -> String {
        let rest = rest.iter().map(|(o, x)| (*o, x.to_string())).collect();
        climb(first.to_string(), rest, prec, |l, o, r| {
            Ok::<_, Infallible>(format!("({l} {o} {r})"))
        })
        .unwrap()
    }

    #[test]
    fn higher_run_groups_first() {
        assert_eq!(tree("1", &[('+', "2"), ('*', "3")]), "(1 + (2 * 3))");
        assert_eq!(tree("1", &[('*', "2"), ('+', "3")]), "((1 * 2) + 3)");
        assert_eq!(tree("a", &[('+', "b"), ('*', "c"), ('^', "d"), ('-', "e")]), "((a + (b * (c ^ d))) - e)");
    }

    #[test]
    fn equal_levels_fold_left() {
        assert_eq!(tree("a", &[('-', "b"), ('-', "c"), ('+', "d")]), "(((a - b) - c) + d)");
        assert_eq!(tree("a", &[('*', "b"), ('/', "c")]), "((a * b) / c)");
    }

    #[test]
    fn single_operand() {
        assert_eq!(tree("x", &[]), "x");
    }

    #[test]
    fn combine_errors_propagate() {
        let rest = vec![('+', 2), ('*', 0)];
        let err = climb(1, rest, prec, |l, o, r| match (o, r) {
            ('*', 0) => Err("zero"),
            _ => Ok(l + r),
        });
        assert_eq!(err, Err("zero"));
    }
}
