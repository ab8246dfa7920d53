use super::{balanced, expand, irregular, literal, naive_positions, spell_bytes, STRATEGIES};
use crate::alphabet::Alphabet;
use crate::ops::{
    concatenate, count_matches, delete, equal_words_pair, has_same_period, is_multi_prefix_of,
    is_prefix_of, match_all, match_kth, shift, Direction,
};
use crate::recompression::Recompression;
use crate::slp::Slp;
use proptest::prelude::*;

fn word(letters: u8, max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<u8>(), 0..max_len).prop_map(move |bytes| spell_bytes(&bytes, letters))
}

fn nonempty_word(letters: u8, max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<u8>(), 1..max_len).prop_map(move |bytes| spell_bytes(&bytes, letters))
}

/// Right-hand sides for [`irregular`]: up to `max_rules` rules of up to four
/// entries each.
fn slp_shape(max_rules: usize) -> impl Strategy<Value = Vec<Vec<(bool, u8)>>> {
    let entry = (any::<bool>(), any::<u8>());
    prop::collection::vec(prop::collection::vec(entry, 0..5), 1..max_rules)
}

proptest! {
    /// Property 1: Round trip
    /// A compressed SLP expands back to the word it was built from.
    #[test]
    fn prop_roundtrip(text in word(3, 64)) {
        let mut alphabet = Alphabet::new();
        let slp = balanced(&mut alphabet, &text);
        let axiom = slp.axiom().unwrap();
        prop_assert_eq!(expand(&alphabet, &slp), text.clone());
        prop_assert_eq!(slp.len_of(axiom), text.len() as u64);
        prop_assert_eq!(slp.iter(axiom).count(), text.len());
    }

    /// Property 2: Equality soundness
    /// Two SLPs are reported equal exactly when their words are, in either
    /// order, and every SLP equals itself.
    #[test]
    fn prop_equality_matches_oracle(u in word(2, 40), v in word(2, 40)) {
        let mut alphabet = Alphabet::new();
        let a = balanced(&mut alphabet, &u);
        let b = literal(&mut alphabet, &v);
        prop_assert_eq!(equal_words_pair(&a, &b).unwrap(), u == v);
        prop_assert_eq!(equal_words_pair(&b, &a).unwrap(), u == v);
        prop_assert!(equal_words_pair(&a, &a).unwrap());
    }

    /// Property 3: Equal words under different grammars
    #[test]
    fn prop_equal_to_itself(u in word(3, 64)) {
        let mut alphabet = Alphabet::new();
        let a = balanced(&mut alphabet, &u);
        let b = literal(&mut alphabet, &u);
        prop_assert!(equal_words_pair(&a, &b).unwrap());
    }

    /// Property 4: Matching soundness
    /// Reported positions are exactly the occurrences found by scanning.
    #[test]
    fn prop_matching_matches_oracle(text in word(2, 48), pattern in nonempty_word(2, 6)) {
        let mut alphabet = Alphabet::new();
        let t = balanced(&mut alphabet, &text);
        let p = balanced(&mut alphabet, &pattern);
        let expected = naive_positions(&text, &pattern);
        prop_assert_eq!(count_matches(&t, &p).unwrap(), expected.len() as u64);
        prop_assert_eq!(match_all(&t, &p).unwrap(), expected);
    }

    /// Property 5: Strategies agree
    /// Every pair strategy finds the same occurrences.
    #[test]
    fn prop_strategies_agree(text in word(3, 40), pattern in nonempty_word(3, 5)) {
        let mut alphabet = Alphabet::new();
        let t = balanced(&mut alphabet, &text);
        let p = literal(&mut alphabet, &pattern);
        let expected = naive_positions(&text, &pattern);
        for strategy in STRATEGIES {
            let mut engine = Recompression::for_matching(&t, &p).unwrap().with_strategy(strategy);
            engine.execute();
            prop_assert_eq!(engine.pattern_occurrence_positions().unwrap(), expected.clone());
        }
    }

    /// Property 6: k-th occurrence
    /// The k-th occurrence is the k-th element of the sorted positions.
    #[test]
    fn prop_kth_is_sorted_position(text in word(2, 40), pattern in nonempty_word(2, 4), k in 1u64..8) {
        let mut alphabet = Alphabet::new();
        let t = balanced(&mut alphabet, &text);
        let p = literal(&mut alphabet, &pattern);
        let expected = naive_positions(&text, &pattern).get(k as usize - 1).copied();
        prop_assert_eq!(match_kth(&t, &p, k).unwrap(), expected);
    }

    /// Property 7: Concatenation homomorphism
    #[test]
    fn prop_concatenation(u in word(3, 30), v in word(3, 30)) {
        let mut alphabet = Alphabet::new();
        let a = balanced(&mut alphabet, &u);
        let b = balanced(&mut alphabet, &v);
        let joined = concatenate(&[&a, &b]).unwrap();
        prop_assert_eq!(expand(&alphabet, &joined), format!("{u}{v}"));
    }

    /// Property 8: Shift and delete
    #[test]
    fn prop_shift_and_delete(u in word(3, 30), m in 0u64..40) {
        let mut alphabet = Alphabet::new();
        let slp = balanced(&mut alphabet, &u);
        let len = u.len();

        let rotated = if len == 0 {
            String::new()
        } else {
            let m = m as usize % len;
            format!("{}{}", &u[m..], &u[..m])
        };
        prop_assert_eq!(expand(&alphabet, &shift(&slp, m, Direction::Left).unwrap()), rotated);

        let m = (m as usize).min(len);
        prop_assert_eq!(expand(&alphabet, &delete(&slp, m as u64, Direction::Left).unwrap()), &u[m..]);
        prop_assert_eq!(expand(&alphabet, &delete(&slp, m as u64, Direction::Right).unwrap()), &u[..len - m]);
    }

    /// Property 9: Prefixes and periods
    #[test]
    fn prop_prefix_queries(u in word(2, 24), p in word(2, 6)) {
        let mut alphabet = Alphabet::new();
        let a = balanced(&mut alphabet, &u);
        let b = balanced(&mut alphabet, &p);

        prop_assert_eq!(is_prefix_of(&a, &b).unwrap(), u.starts_with(&p));

        let power = p.repeat(u.len() + 1);
        let multi = if p.is_empty() { u.is_empty() } else { power.starts_with(&u) };
        prop_assert_eq!(is_multi_prefix_of(&a, &b).unwrap(), multi);

        let commute = format!("{u}{p}") == format!("{p}{u}");
        prop_assert_eq!(has_same_period(&a, &b).unwrap(), commute);
    }

    /// Property 10: Matching on irregular grammars
    /// Rules mixing letters and references produce blocks and pairs that
    /// cross rule boundaries; every strategy still finds exactly the
    /// occurrences found by scanning.
    #[test]
    fn prop_irregular_matching(letters in 1u8..4, text in slp_shape(7), pattern in slp_shape(4)) {
        let mut alphabet = Alphabet::new();
        let t = irregular(&mut alphabet, &text, letters);
        let p = irregular(&mut alphabet, &pattern, letters);
        let (text, pattern) = (expand(&alphabet, &t), expand(&alphabet, &p));
        prop_assume!(!pattern.is_empty());
        let expected = naive_positions(&text, &pattern);

        for strategy in STRATEGIES {
            let mut engine = Recompression::for_matching(&t, &p).unwrap().with_strategy(strategy);
            engine.execute();
            prop_assert_eq!(engine.number_of_pattern_occurrences().unwrap(), expected.len() as u64);
            prop_assert_eq!(engine.pattern_occurrence_positions().unwrap(), expected.clone());
            for (k, &position) in expected.iter().enumerate() {
                prop_assert_eq!(engine.pattern_occurrence_position(k as u64).unwrap(), Some(position));
            }
            prop_assert_eq!(engine.pattern_occurrence_position(expected.len() as u64).unwrap(), None);
        }
        prop_assert_eq!(match_all(&t, &p).unwrap(), expected.clone());
        prop_assert_eq!(count_matches(&t, &p).unwrap(), expected.len() as u64);
    }

    /// Property 11: Equality on irregular grammars
    #[test]
    fn prop_irregular_equality(letters in 1u8..4, shape in slp_shape(7), other in word(3, 24)) {
        let mut alphabet = Alphabet::new();
        let u = irregular(&mut alphabet, &shape, letters);
        let text = expand(&alphabet, &u);
        let same = literal(&mut alphabet, &text);
        let halved = balanced(&mut alphabet, &text);
        let v = literal(&mut alphabet, &other);

        for strategy in STRATEGIES {
            let (union, _) = Slp::disjoint_union(&[&u, &same, &halved]);
            let mut engine = Recompression::for_equality(&union).unwrap().with_strategy(strategy);
            engine.execute();
            prop_assert!(engine.is_equal().unwrap(), "{:?}", strategy);

            let (union, _) = Slp::disjoint_union(&[&u, &v]);
            let mut engine = Recompression::for_equality(&union).unwrap().with_strategy(strategy);
            engine.execute();
            prop_assert_eq!(engine.is_equal().unwrap(), text == other);
        }
    }
}

/// Fuzz: the first byte splits the input into text and pattern.
#[test]
fn fuzz_matching() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let Some((&split, rest)) = input.split_first() else {
            return;
        };
        let rest = &rest[..rest.len().min(64)];
        let split = (split as usize % 6 + 1).min(rest.len());
        let (pattern, text) = rest.split_at(split);
        if pattern.is_empty() {
            return;
        }
        let (pattern, text) = (spell_bytes(pattern, 2), spell_bytes(text, 2));

        let mut alphabet = Alphabet::new();
        let t = balanced(&mut alphabet, &text);
        let p = balanced(&mut alphabet, &pattern);
        assert_eq!(match_all(&t, &p).unwrap(), naive_positions(&text, &pattern));
    });
}

/// Fuzz: equality never disagrees with comparing the expanded words.
#[test]
fn fuzz_equality() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let input = &input[..input.len().min(64)];
        let (u, v) = input.split_at(input.len() / 2);
        let (u, v) = (spell_bytes(u, 2), spell_bytes(v, 2));

        let mut alphabet = Alphabet::new();
        let a = balanced(&mut alphabet, &u);
        let b = balanced(&mut alphabet, &v);
        assert_eq!(equal_words_pair(&a, &b).unwrap(), u == v);
        let c = literal(&mut alphabet, &u);
        assert!(equal_words_pair(&a, &c).unwrap());
    });
}
