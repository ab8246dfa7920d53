use super::letters::LetterTable;
use crate::grammar::{Grammar, Group};
use crate::word::{LetterId, RuleId};
use ahash::AHashMap as HashMap;

/// What the pattern was compressed to: `letter^run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PatternShape {
    pub letter: LetterId,
    pub run: u64,
}

impl PatternShape {
    /// Occurrences inside a maximal block `letter^count`.
    fn matches_in(&self, letter: LetterId, count: u64) -> u64 {
        if letter == self.letter && count >= self.run {
            count - self.run + 1
        } else {
            0
        }
    }
}

/// Per-rule occurrence counts and lengths of the final text grammar.
///
/// Built once when the engine finishes; counts saturate at `u64::MAX`.
#[derive(Debug)]
pub(crate) struct MatchIndex {
    text: RuleId,
    shape: PatternShape,
    weights: Vec<i128>,
    groups: HashMap<RuleId, Vec<Group>>,
    lengths: HashMap<RuleId, i128>,
    counts: HashMap<RuleId, u64>,
}

impl MatchIndex {
    pub(crate) fn build(grammar: &Grammar, letters: &LetterTable, text: RuleId, shape: PatternShape) -> Self {
        let weights: Vec<i128> = (0..letters.len())
            .map(|a| letters.weight(a as LetterId))
            .collect();
        let mut index = Self {
            text,
            shape,
            weights,
            groups: HashMap::default(),
            lengths: HashMap::default(),
            counts: HashMap::default(),
        };

        for rule in grammar.bottom_up() {
            let groups = grammar.groups(rule);
            let (mut length, mut count) = (0i128, 0u64);
            for group in &groups {
                let (l, c) = match *group {
                    Group::Letters { letter, count } => (
                        index.weight(letter) * i128::from(count),
                        shape.matches_in(letter, count),
                    ),
                    Group::Rule(r) => (index.lengths[&r], index.counts[&r]),
                };
                length += l;
                count = count.saturating_add(c);
            }
            index.groups.insert(rule, groups);
            index.lengths.insert(rule, length);
            index.counts.insert(rule, count);
        }
        index
    }

    fn weight(&self, letter: LetterId) -> i128 {
        self.weights[letter as usize]
    }

    pub(crate) fn count(&self) -> u64 {
        self.counts.get(&self.text).copied().unwrap_or(0)
    }

    /// Start of the `k`-th occurrence, found by descending along a single
    /// path of the derivation tree.
    pub(crate) fn position(&self, mut k: u64) -> Option<u64> {
        if k >= self.count() {
            return None;
        }
        let mut rule = self.text;
        let mut offset = 0i128;
        'descend: loop {
            for group in &self.groups[&rule] {
                match *group {
                    Group::Letters { letter, count } => {
                        let w = self.weight(letter);
                        let m = self.shape.matches_in(letter, count);
                        if k < m {
                            return to_position(offset + i128::from(k) * w);
                        }
                        k -= m;
                        offset += w * i128::from(count);
                    }
                    Group::Rule(r) => {
                        let m = self.counts[&r];
                        if k < m {
                            rule = r;
                            continue 'descend;
                        }
                        k -= m;
                        offset += self.lengths[&r];
                    }
                }
            }
            return None;
        }
    }

    /// Starts of all occurrences, in increasing order.
    pub(crate) fn positions(&self) -> Vec<u64> {
        let mut out = Vec::new();
        let mut stack = vec![(self.text, 0i128)];
        while let Some((rule, mut offset)) = stack.pop() {
            for group in &self.groups[&rule] {
                match *group {
                    Group::Letters { letter, count } => {
                        let w = self.weight(letter);
                        let m = self.shape.matches_in(letter, count);
                        out.extend((0..m).filter_map(|i| to_position(offset + i128::from(i) * w)));
                        offset += w * i128::from(count);
                    }
                    Group::Rule(r) => {
                        if self.counts[&r] > 0 {
                            stack.push((r, offset));
                        }
                        offset += self.lengths[&r];
                    }
                }
            }
        }
        out.sort_unstable();
        out
    }
}

fn to_position(offset: i128) -> Option<u64> {
    debug_assert!(offset >= 0, "occurrences start inside the text");
    u64::try_from(offset).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Terminal;
    use crate::word::Item;

    /// T -> X b X a a a, X -> a a b
    fn sample_index(shape_run: u64) -> MatchIndex {
        let mut letters = LetterTable::new();
        let a = letters.input(Terminal::new(0));
        let b = letters.input(Terminal::new(1));

        let mut grammar = Grammar::new();
        let x = grammar.add_rule(false);
        let t = grammar.add_rule(true);
        let (x_tail, t_tail) = (grammar.tail(x), grammar.tail(t));
        grammar.insert_before(x_tail, Item::Letter(a), 2);
        grammar.insert_before(x_tail, Item::Letter(b), 1);
        grammar.insert_before(t_tail, Item::RuleRef(x), 1);
        grammar.insert_before(t_tail, Item::Letter(b), 1);
        grammar.insert_before(t_tail, Item::RuleRef(x), 1);
        grammar.insert_before(t_tail, Item::Letter(a), 3);

        let shape = PatternShape {
            letter: a,
            run: shape_run,
        };
        MatchIndex::build(&grammar, &letters, t, shape)
    }

    #[test]
    fn test_single_letter_occurrences() {
        // aabbaabaaa
        let index = sample_index(1);
        assert_eq!(index.count(), 7);
        assert_eq!(index.positions(), vec![0, 1, 4, 5, 7, 8, 9]);
        assert_eq!(index.position(2), Some(4));
        assert_eq!(index.position(6), Some(9));
        assert_eq!(index.position(7), None);
    }

    #[test]
    fn test_run_occurrences() {
        let index = sample_index(2);
        assert_eq!(index.count(), 4);
        assert_eq!(index.positions(), vec![0, 4, 7, 8]);
        for (k, &p) in index.positions().iter().enumerate() {
            assert_eq!(index.position(k as u64), Some(p));
        }
    }

    #[test]
    fn test_matches_in_block() {
        let shape = PatternShape { letter: 3, run: 2 };
        assert_eq!(shape.matches_in(3, 5), 4);
        assert_eq!(shape.matches_in(3, 1), 0);
        assert_eq!(shape.matches_in(4, 5), 0);
    }
}
