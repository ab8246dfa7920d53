//! Cross-module tests: worked examples, property tests and fuzz harnesses.

mod properties;

use crate::alphabet::Alphabet;
use crate::error::Result;
use crate::recompression::{CountMode, PairStrategy};
use crate::slp::Slp;
use crate::symbol::{NonTerminal, Production, Symbol, Terminal};
use ahash::AHashMap as HashMap;

pub(crate) const STRATEGIES: [PairStrategy; 3] = [
    PairStrategy::Partitioned,
    PairStrategy::Greedy(CountMode::Grammar),
    PairStrategy::Greedy(CountMode::Words),
];

/// Parses productions written as `"S -> aBc"`: upper case letters are
/// non-terminals, everything else is a terminal. The first production's left
/// side is the axiom.
pub(crate) fn parse(alphabet: &mut Alphabet, lines: &[&str]) -> Result<Slp> {
    let mut axiom = None;
    let mut productions = Vec::new();
    for line in lines {
        let (left, right) = line.split_once("->").unwrap_or((*line, ""));
        let left = alphabet.non_terminal(left.trim());
        axiom.get_or_insert(left);
        let right = right
            .trim()
            .chars()
            .map(|c| {
                let name = c.to_string();
                if c.is_ascii_uppercase() {
                    Symbol::NonTerminal(alphabet.non_terminal(&name))
                } else {
                    Symbol::Terminal(alphabet.terminal(&name))
                }
            })
            .collect();
        productions.push(Production::new(left, right));
    }
    Slp::new(productions, axiom)
}

/// Maps bytes onto a small alphabet `a`, `b`, `c`, ...
pub(crate) fn spell_bytes(bytes: &[u8], letters: u8) -> String {
    bytes.iter().map(|b| char::from(b'a' + b % letters)).collect()
}

pub(crate) fn literal(alphabet: &mut Alphabet, text: &str) -> Slp {
    let axiom = alphabet.fresh_non_terminal();
    Slp::from_word(&alphabet.word(text), axiom)
}

/// An SLP for `text` splitting every word in half and sharing equal halves.
pub(crate) fn balanced(alphabet: &mut Alphabet, text: &str) -> Slp {
    fn build(
        word: &[Terminal],
        alphabet: &mut Alphabet,
        memo: &mut HashMap<Vec<Terminal>, NonTerminal>,
        productions: &mut Vec<Production>,
    ) -> Symbol {
        if let [t] = word {
            return Symbol::Terminal(*t);
        }
        if let Some(&n) = memo.get(word) {
            return Symbol::NonTerminal(n);
        }
        let (left, right) = word.split_at(word.len() / 2);
        let left = build(left, alphabet, memo, productions);
        let right = build(right, alphabet, memo, productions);
        let n = alphabet.fresh_non_terminal();
        productions.push(Production::new(n, vec![left, right]));
        memo.insert(word.to_vec(), n);
        Symbol::NonTerminal(n)
    }

    let word = alphabet.word(text);
    if word.len() < 2 {
        return literal(alphabet, text);
    }
    let mut memo = HashMap::default();
    let mut productions = Vec::new();
    let top = build(&word, alphabet, &mut memo, &mut productions);
    let axiom = alphabet.fresh_non_terminal();
    productions.push(Production::new(axiom, vec![top]));
    Slp::new(productions, [axiom]).unwrap_or_else(|e| panic!("balanced SLP is valid: {e}"))
}

/// An SLP whose rules mix letters with references to earlier rules.
///
/// Every right-hand side entry is a letter (`true`, spelled modulo
/// `letters`) or a reference (`false`, picked modulo the rules built so far).
/// The last rule is the axiom.
pub(crate) fn irregular(alphabet: &mut Alphabet, shape: &[Vec<(bool, u8)>], letters: u8) -> Slp {
    let mut rules: Vec<NonTerminal> = Vec::with_capacity(shape.len());
    let mut productions = Vec::with_capacity(shape.len());
    for entries in shape {
        let left = alphabet.fresh_non_terminal();
        let right = entries
            .iter()
            .map(|&(letter, x)| {
                if letter || rules.is_empty() {
                    Symbol::Terminal(alphabet.terminal(&spell_bytes(&[x], letters)))
                } else {
                    Symbol::NonTerminal(rules[x as usize % rules.len()])
                }
            })
            .collect();
        productions.push(Production::new(left, right));
        rules.push(left);
    }
    let axiom = *rules.last().unwrap_or_else(|| panic!("at least one rule"));
    Slp::new(productions, [axiom]).unwrap_or_else(|e| panic!("irregular SLP is valid: {e}"))
}

pub(crate) fn expand(alphabet: &Alphabet, slp: &Slp) -> String {
    let axiom = slp.axiom().unwrap_or_else(|e| panic!("singleton expected: {e}"));
    alphabet.spell(&slp.value(axiom))
}

/// Decompress-and-scan oracle.
pub(crate) fn naive_positions(text: &str, pattern: &str) -> Vec<u64> {
    if pattern.is_empty() || pattern.len() > text.len() {
        return Vec::new();
    }
    (0..=text.len() - pattern.len())
        .filter(|&i| text[i..].starts_with(pattern))
        .map(|i| i as u64)
        .collect()
}
