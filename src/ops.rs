//! Word operations on singleton SLPs, built on the recompression engine and
//! on cutting SLPs along a single derivation path.

use crate::error::{GrammarError, Result};
use crate::recompression::Recompression;
use crate::slp::Slp;
use crate::symbol::{NonTerminal, Symbol};

/// Which end of a word an operation works from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Whether all axioms of `slp` denote the same word.
pub fn equal_words(slp: &Slp) -> Result<bool> {
    let mut engine = Recompression::for_equality(slp)?;
    engine.execute();
    engine.is_equal()
}

/// Whether two singleton SLPs denote the same word.
pub fn equal_words_pair(a: &Slp, b: &Slp) -> Result<bool> {
    a.axiom()?;
    b.axiom()?;
    let (union, _) = Slp::disjoint_union(&[a, b]);
    equal_words(&union)
}

fn matcher(text: &Slp, pattern: &Slp) -> Result<Recompression> {
    let mut engine = Recompression::for_matching(text, pattern)?;
    engine.execute();
    Ok(engine)
}

/// Starts (0-based, increasing) of all occurrences of `pattern` in `text`.
pub fn match_all(text: &Slp, pattern: &Slp) -> Result<Vec<u64>> {
    matcher(text, pattern)?.pattern_occurrence_positions()
}

/// Number of occurrences of `pattern` in `text`.
pub fn count_matches(text: &Slp, pattern: &Slp) -> Result<u64> {
    matcher(text, pattern)?.number_of_pattern_occurrences()
}

/// Start of the `k`-th occurrence of `pattern` in `text`, counting from 1.
pub fn match_kth(text: &Slp, pattern: &Slp, k: u64) -> Result<Option<u64>> {
    if k == 0 {
        return Err(GrammarError::invalid("occurrences are counted from 1"));
    }
    matcher(text, pattern)?.pattern_occurrence_position(k - 1)
}

/// Whether `val(prefix)` is a prefix of `val(u)`.
pub fn is_prefix_of(u: &Slp, prefix: &Slp) -> Result<bool> {
    let (_, len) = singleton(u)?;
    let (_, prefix_len) = singleton(prefix)?;
    if prefix_len > len {
        return Ok(false);
    }
    equal_words_pair(&take(u, prefix_len, Direction::Left)?, prefix)
}

/// Whether `val(u)` is a prefix of `val(p)` repeated forever.
///
/// That is the case exactly when `val(u)` is a prefix of `val(p) val(u)`.
pub fn is_multi_prefix_of(u: &Slp, p: &Slp) -> Result<bool> {
    let (_, len) = singleton(u)?;
    let (_, period) = singleton(p)?;
    if period == 0 {
        return Ok(len == 0);
    }
    is_prefix_of(&concatenate(&[p, u])?, u)
}

/// Whether `val(u)` and `val(v)` commute, i.e. are powers of one word.
pub fn has_same_period(u: &Slp, v: &Slp) -> Result<bool> {
    equal_words_pair(&concatenate(&[u, v])?, &concatenate(&[v, u])?)
}

/// A singleton SLP denoting the concatenation of the words of `parts`.
///
/// Every part must be a singleton.
pub fn concatenate(parts: &[&Slp]) -> Result<Slp> {
    let axioms = parts
        .iter()
        .map(|slp| slp.axiom())
        .collect::<Result<Vec<NonTerminal>>>()?;
    let (mut union, renames) = Slp::disjoint_union(parts);
    let right = axioms
        .iter()
        .zip(&renames)
        .map(|(axiom, rename)| Symbol::NonTerminal(rename[axiom]))
        .collect();
    let axiom = NonTerminal::new(union.next_free_id());
    union.set_rule(axiom, right);
    union.set_axioms([axiom]);
    Ok(union)
}

/// Rotates the word of `slp` by `m` letters (modulo its length).
pub fn shift(slp: &Slp, m: u64, direction: Direction) -> Result<Slp> {
    let (axiom, len) = singleton(slp)?;
    if len == 0 || m % len == 0 {
        return Ok(slp.clone());
    }
    let m = match direction {
        Direction::Left => m % len,
        Direction::Right => len - m % len,
    };
    let lengths = slp.lengths();
    let mut right = slp.suffix_symbols(axiom, len - m, &lengths);
    right.extend(slp.prefix_symbols(axiom, m, &lengths));
    Ok(rebuild(slp, right))
}

/// Removes `m` letters from one end of the word of `slp`. Removing at least
/// the whole word leaves the empty word.
pub fn delete(slp: &Slp, m: u64, direction: Direction) -> Result<Slp> {
    let (_, len) = singleton(slp)?;
    let kept = len.saturating_sub(m);
    let end = match direction {
        Direction::Left => Direction::Right,
        Direction::Right => Direction::Left,
    };
    take(slp, kept, end)
}

/// Keeps the first (`Left`) or last (`Right`) `n` letters.
fn take(slp: &Slp, n: u64, end: Direction) -> Result<Slp> {
    let (axiom, len) = singleton(slp)?;
    if n >= len {
        return Ok(slp.clone());
    }
    let lengths = slp.lengths();
    let right = match end {
        Direction::Left => slp.prefix_symbols(axiom, n, &lengths),
        Direction::Right => slp.suffix_symbols(axiom, n, &lengths),
    };
    Ok(rebuild(slp, right))
}

/// `slp` with a fresh axiom deriving `right`, pruned to what it reaches.
fn rebuild(slp: &Slp, right: Vec<Symbol>) -> Slp {
    let mut out = slp.clone();
    let axiom = NonTerminal::new(slp.next_free_id());
    out.set_rule(axiom, right);
    out.set_axioms([axiom]);
    out.retain_reachable();
    out
}

fn singleton(slp: &Slp) -> Result<(NonTerminal, u64)> {
    let axiom = slp.axiom()?;
    let len = slp
        .checked_len_of(axiom)
        .ok_or_else(|| GrammarError::invalid("word length exceeds u64::MAX"))?;
    Ok((axiom, len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::symbol::Production;

    fn literal(alphabet: &mut Alphabet, text: &str) -> Slp {
        let axiom = alphabet.fresh_non_terminal();
        Slp::from_word(&alphabet.word(text), axiom)
    }

    fn spell(alphabet: &Alphabet, slp: &Slp) -> String {
        let axiom = slp.axiom().unwrap();
        alphabet.spell(&slp.value(axiom))
    }

    /// S -> X X c, X -> a b
    fn ababc(alphabet: &mut Alphabet) -> Slp {
        let a = alphabet.terminal("a");
        let b = alphabet.terminal("b");
        let c = alphabet.terminal("c");
        let s = alphabet.fresh_non_terminal();
        let x = alphabet.fresh_non_terminal();
        Slp::new(
            vec![
                Production::new(s, vec![x.into(), x.into(), c.into()]),
                Production::new(x, vec![a.into(), b.into()]),
            ],
            [s],
        )
        .unwrap()
    }

    #[test]
    fn test_equal_words_pair() {
        let mut alphabet = Alphabet::new();
        let compressed = ababc(&mut alphabet);
        let same = literal(&mut alphabet, "ababc");
        let other = literal(&mut alphabet, "abacb");
        assert!(equal_words_pair(&compressed, &same).unwrap());
        assert!(!equal_words_pair(&compressed, &other).unwrap());

        let (both, _) = Slp::disjoint_union(&[&compressed, &same]);
        assert!(matches!(
            equal_words_pair(&both, &same),
            Err(GrammarError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_matching() {
        let mut alphabet = Alphabet::new();
        let text = literal(&mut alphabet, "abababa");
        let pattern = literal(&mut alphabet, "aba");
        assert_eq!(match_all(&text, &pattern).unwrap(), vec![0, 2, 4]);
        assert_eq!(count_matches(&text, &pattern).unwrap(), 3);
        assert_eq!(match_kth(&text, &pattern, 2).unwrap(), Some(2));
        assert_eq!(match_kth(&text, &pattern, 4).unwrap(), None);
        assert!(matches!(
            match_kth(&text, &pattern, 0),
            Err(GrammarError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_prefixes() {
        let mut alphabet = Alphabet::new();
        let u = ababc(&mut alphabet);
        let yes = literal(&mut alphabet, "aba");
        let no = literal(&mut alphabet, "abb");
        let long = literal(&mut alphabet, "ababcc");
        let empty = literal(&mut alphabet, "");
        assert!(is_prefix_of(&u, &yes).unwrap());
        assert!(!is_prefix_of(&u, &no).unwrap());
        assert!(!is_prefix_of(&u, &long).unwrap());
        assert!(is_prefix_of(&u, &empty).unwrap());
        assert!(is_prefix_of(&u, &u).unwrap());
    }

    #[test]
    fn test_multi_prefixes() {
        let mut alphabet = Alphabet::new();
        let p = literal(&mut alphabet, "abc");
        let power = literal(&mut alphabet, "abcabca");
        let broken = literal(&mut alphabet, "abcabd");
        let short = literal(&mut alphabet, "ab");
        let empty = literal(&mut alphabet, "");
        assert!(is_multi_prefix_of(&power, &p).unwrap());
        assert!(!is_multi_prefix_of(&broken, &p).unwrap());
        assert!(is_multi_prefix_of(&short, &p).unwrap());
        assert!(is_multi_prefix_of(&empty, &p).unwrap());
        assert!(!is_multi_prefix_of(&p, &empty).unwrap());
    }

    #[test]
    fn test_same_period() {
        let mut alphabet = Alphabet::new();
        let u = literal(&mut alphabet, "abab");
        let v = literal(&mut alphabet, "ababab");
        let w = literal(&mut alphabet, "aba");
        assert!(has_same_period(&u, &v).unwrap());
        assert!(!has_same_period(&u, &w).unwrap());
    }

    #[test]
    fn test_concatenate() {
        let mut alphabet = Alphabet::new();
        let u = ababc(&mut alphabet);
        let v = literal(&mut alphabet, "xy");
        let joined = concatenate(&[&u, &v, &u]).unwrap();
        assert_eq!(spell(&alphabet, &joined), "ababcxyababc");

        let (both, _) = Slp::disjoint_union(&[&u, &v]);
        assert!(concatenate(&[&both, &v]).is_err());
    }

    #[test]
    fn test_shift() {
        let mut alphabet = Alphabet::new();
        let u = ababc(&mut alphabet);
        assert_eq!(spell(&alphabet, &shift(&u, 3, Direction::Left).unwrap()), "bcaba");
        assert_eq!(spell(&alphabet, &shift(&u, 8, Direction::Left).unwrap()), "bcaba");
        assert_eq!(spell(&alphabet, &shift(&u, 2, Direction::Right).unwrap()), "bcaba");
        assert_eq!(spell(&alphabet, &shift(&u, 5, Direction::Right).unwrap()), "ababc");
    }

    #[test]
    fn test_delete() {
        let mut alphabet = Alphabet::new();
        let u = ababc(&mut alphabet);
        assert_eq!(spell(&alphabet, &delete(&u, 2, Direction::Left).unwrap()), "abc");
        assert_eq!(spell(&alphabet, &delete(&u, 1, Direction::Right).unwrap()), "abab");
        assert_eq!(spell(&alphabet, &delete(&u, 9, Direction::Left).unwrap()), "");
        assert_eq!(spell(&alphabet, &delete(&u, 0, Direction::Right).unwrap()), "ababc");
    }
}
