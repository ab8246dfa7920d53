//! # Recompression - Equality and Pattern Matching on Compressed Words
//!
//! A Rust implementation of Jeż's recompression technique on straight-line
//! programs (SLPs): grammars with one production per non-terminal, so that
//! each non-terminal denotes exactly one, possibly exponentially long, word.
//!
//! Recompression works in phases. Each phase
//! 1. replaces every maximal block `a^k` by a fresh letter, and
//! 2. replaces pairs `ab` with `a` and `b` on opposite sides of a partition
//!    of the alphabet by a fresh letter,
//!
//! first popping letters out of rules so that no block or pair crosses a
//! rule boundary. Words shrink by a constant factor per phase while the
//! grammar stays polynomial, so two words are equal exactly when their
//! axioms end up as the same letter.
//!
//! ## Example
//!
//! ```
//! use recompression_rs::{equal_words_pair, match_all, Alphabet, Production, Slp};
//!
//! let mut alphabet = Alphabet::new();
//! let a = alphabet.terminal("a");
//! let b = alphabet.terminal("b");
//! let s = alphabet.non_terminal("S");
//! let x = alphabet.non_terminal("X");
//!
//! // S -> X X X, X -> a b
//! let text = Slp::new(
//!     vec![
//!         Production::new(s, vec![x.into(), x.into(), x.into()]),
//!         Production::new(x, vec![a.into(), b.into()]),
//!     ],
//!     [s],
//! )
//! .unwrap();
//!
//! let literal = Slp::from_word(&alphabet.word("ababab"), alphabet.non_terminal("T"));
//! assert!(equal_words_pair(&text, &literal).unwrap());
//!
//! let pattern = Slp::from_word(&alphabet.word("bab"), alphabet.non_terminal("P"));
//! assert_eq!(match_all(&text, &pattern).unwrap(), vec![1, 3]);
//! ```
//!
//! ## Performance
//!
//! - Polynomial in the grammar size, independent of the word lengths
//! - Occurrence counts and the k-th occurrence without expanding the text
//! - Mutable right-hand sides backed by generational indices (SlotMap)

mod alphabet;
mod cfg;
mod error;
mod grammar;
mod id_gen;
mod iter;
mod normalize;
mod ops;
mod radix;
mod recompression;
mod slp;
mod symbol;
mod word;

#[cfg(test)]
mod tests;

pub use alphabet::Alphabet;
pub use cfg::Cfg;
pub use error::{GrammarError, Result};
pub use iter::SlpIter;
pub use ops::{
    concatenate, count_matches, delete, equal_words, equal_words_pair, has_same_period,
    is_multi_prefix_of, is_prefix_of, match_all, match_kth, shift, Direction,
};
pub use recompression::{CountMode, EngineState, PairStrategy, Recompression, RecompressionStats};
pub use slp::Slp;
pub use symbol::{GrammarSymbol, NonTerminal, Production, Symbol, Terminal};
