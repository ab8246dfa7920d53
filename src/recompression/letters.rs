use crate::radix::radix_sort_by_key;
use crate::symbol::Terminal;
use crate::word::LetterId;
use ahash::AHashMap as HashMap;

/// How a letter came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum LetterKind {
    /// An input terminal, by its id.
    Input(u32),
    /// A maximal block `a^k`.
    Block,
    /// A pair `ab` of distinct letters.
    Pair,
    /// The first block of the pattern, or its image in the text.
    PatternStart,
    /// The last block of the pattern, or its image in the text.
    PatternEnd,
    /// Stands in for the shared letters of a text block where a pattern end
    /// and the next pattern start overlap. Carries a negative weight.
    Overlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LetterInfo {
    pub kind: LetterKind,
    pub phase: u32,
    pub weight: i128,
    /// Input terminal this letter is a run of, if any.
    pub block_of: Option<u32>,
}

/// The engine's alphabet.
///
/// Letters are dense ids into `letters`. Fresh letters of one phase are
/// memoized by what they were made of, so equal compression events yield the
/// same letter everywhere in the grammar.
#[derive(Debug, Default)]
pub(crate) struct LetterTable {
    letters: Vec<LetterInfo>,
    inputs: HashMap<u32, LetterId>,
    blocks: HashMap<(LetterKind, LetterId, u64), LetterId>,
    pairs: HashMap<(LetterId, LetterId), LetterId>,
    created: u64,
}

impl LetterTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.letters.len()
    }

    /// Total number of letters created so far, renumbering aside.
    pub(crate) fn created(&self) -> u64 {
        self.created
    }

    pub(crate) fn info(&self, letter: LetterId) -> &LetterInfo {
        &self.letters[letter as usize]
    }

    pub(crate) fn weight(&self, letter: LetterId) -> i128 {
        self.letters[letter as usize].weight
    }

    /// Public view of a letter.
    pub(crate) fn terminal(&self, letter: LetterId) -> Terminal {
        let info = self.info(letter);
        Terminal::compressed(letter, info.phase, info.weight, info.block_of)
    }

    fn push(&mut self, info: LetterInfo) -> LetterId {
        let id = LetterId::try_from(self.letters.len()).expect("letter id space exhausted");
        self.letters.push(info);
        self.created += 1;
        id
    }

    /// Interns an input terminal.
    pub(crate) fn input(&mut self, t: Terminal) -> LetterId {
        if let Some(&letter) = self.inputs.get(&t.id()) {
            return letter;
        }
        let letter = self.push(LetterInfo {
            kind: LetterKind::Input(t.id()),
            phase: 0,
            weight: 1,
            block_of: None,
        });
        self.inputs.insert(t.id(), letter);
        letter
    }

    fn block_like(&mut self, kind: LetterKind, base: LetterId, run: u64, phase: u32, weight: i128) -> LetterId {
        if let Some(&letter) = self.blocks.get(&(kind, base, run)) {
            return letter;
        }
        let base_info = *self.info(base);
        let block_of = match base_info.kind {
            LetterKind::Input(id) => Some(id),
            _ => base_info.block_of,
        };
        let letter = self.push(LetterInfo {
            kind,
            phase,
            weight,
            block_of,
        });
        self.blocks.insert((kind, base, run), letter);
        letter
    }

    /// Letter for the block `base^run`, `run >= 2`.
    pub(crate) fn block(&mut self, base: LetterId, run: u64, phase: u32) -> LetterId {
        debug_assert!(run >= 2, "blocks of length one stay as they are");
        let weight = self.weight(base) * i128::from(run);
        self.block_like(LetterKind::Block, base, run, phase, weight)
    }

    pub(crate) fn pattern_start(&mut self, base: LetterId, run: u64, phase: u32) -> LetterId {
        let weight = self.weight(base) * i128::from(run);
        self.block_like(LetterKind::PatternStart, base, run, phase, weight)
    }

    pub(crate) fn pattern_end(&mut self, base: LetterId, run: u64, phase: u32) -> LetterId {
        let weight = self.weight(base) * i128::from(run);
        self.block_like(LetterKind::PatternEnd, base, run, phase, weight)
    }

    /// Letter standing for `run` copies of `base` claimed by two pattern
    /// boundaries at once.
    pub(crate) fn overlap(&mut self, base: LetterId, run: u64, phase: u32) -> LetterId {
        let weight = -(self.weight(base) * i128::from(run));
        self.block_like(LetterKind::Overlap, base, run, phase, weight)
    }

    /// Letter for the pair `left right`.
    pub(crate) fn pair(&mut self, left: LetterId, right: LetterId, phase: u32) -> LetterId {
        if let Some(&letter) = self.pairs.get(&(left, right)) {
            return letter;
        }
        let weight = self.weight(left) + self.weight(right);
        let letter = self.push(LetterInfo {
            kind: LetterKind::Pair,
            phase,
            weight,
            block_of: None,
        });
        self.pairs.insert((left, right), letter);
        letter
    }

    /// Keeps only the `present` letters, renamed into `0..present.len()` in
    /// id order, and forgets the memoized compression events of the phase.
    ///
    /// Returns the renaming.
    pub(crate) fn renumber(&mut self, mut present: Vec<LetterId>) -> HashMap<LetterId, LetterId> {
        radix_sort_by_key(&mut present, |&a| a);
        let mut renaming = HashMap::with_capacity(present.len());
        let mut letters = Vec::with_capacity(present.len());
        for (new, &old) in present.iter().enumerate() {
            renaming.insert(old, new as LetterId);
            letters.push(self.letters[old as usize]);
        }
        self.letters = letters;
        self.inputs = self
            .inputs
            .iter()
            .filter_map(|(&t, old)| renaming.get(old).map(|&new| (t, new)))
            .collect();
        self.blocks.clear();
        self.pairs.clear();
        renaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_are_interned_once() {
        let mut table = LetterTable::new();
        let a = table.input(Terminal::new(7));
        let b = table.input(Terminal::new(3));
        assert_eq!(table.input(Terminal::new(7)), a);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.info(a).kind, LetterKind::Input(7));
    }

    #[test]
    fn test_fresh_letters_are_memoized_per_event() {
        let mut table = LetterTable::new();
        let a = table.input(Terminal::new(0));
        let b = table.input(Terminal::new(1));

        let aaa = table.block(a, 3, 1);
        assert_eq!(table.block(a, 3, 1), aaa);
        assert_ne!(table.block(a, 2, 1), aaa);
        assert_eq!(table.weight(aaa), 3);
        assert_eq!(table.info(aaa).block_of, Some(0));

        let ab = table.pair(a, b, 1);
        assert_eq!(table.pair(a, b, 1), ab);
        assert_ne!(table.pair(b, a, 1), ab);
        assert_eq!(table.weight(ab), 2);

        // Same run, different role.
        assert_ne!(table.pattern_start(a, 3, 1), aaa);
        let overlap = table.overlap(a, 2, 1);
        assert_eq!(table.weight(overlap), -2);
    }

    #[test]
    fn test_renumber_compacts_and_resets() {
        let mut table = LetterTable::new();
        let a = table.input(Terminal::new(0));
        let b = table.input(Terminal::new(1));
        let ab = table.pair(a, b, 1);

        let renaming = table.renumber(vec![ab, b]);
        assert_eq!(renaming[&b], 0);
        assert_eq!(renaming[&ab], 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.weight(1), 2);
        assert_eq!(table.created(), 3);

        // `a` is gone, so interning it again yields a new letter.
        let again = table.input(Terminal::new(0));
        assert_eq!(again, 2);
        assert_eq!(table.input(Terminal::new(1)), 0);
    }
}
