use super::blocks::Boundary;
use super::{CountMode, PairStrategy, Recompression};
use crate::radix::{left_in_partition, partition_count, radix_sort_by_key};
use crate::word::{Item, LetterId};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// A split of the letters of the phase into left and right letters. Only
/// pairs `ab` with `a` left and `b` right are compressed under it, and such
/// pairs never overlap.
#[derive(Debug)]
struct Partition {
    sides: HashMap<LetterId, Side>,
}

impl Partition {
    /// Partition number `index` of the letters, by the bits of their rank in
    /// `alphabet`.
    fn by_index(alphabet: &[LetterId], index: u32, boundary: Option<Boundary>) -> Self {
        let mut sides = HashMap::with_capacity(alphabet.len());
        for (rank, &a) in alphabet.iter().enumerate() {
            let left = u32::try_from(rank).map_or(false, |r| left_in_partition(r, index));
            sides.insert(a, if left { Side::Left } else { Side::Right });
        }
        Self::pinned(sides, boundary)
    }

    /// The pattern's start letter may only begin a pair and its end letter
    /// may only end one.
    fn pinned(mut sides: HashMap<LetterId, Side>, boundary: Option<Boundary>) -> Self {
        if let Some(b) = boundary {
            sides.insert(b.start, Side::Left);
            sides.insert(b.end, Side::Right);
        }
        Self { sides }
    }

    fn is_left(&self, a: LetterId) -> bool {
        self.sides.get(&a) == Some(&Side::Left)
    }

    fn is_right(&self, a: LetterId) -> bool {
        self.sides.get(&a) == Some(&Side::Right)
    }

    fn covers(&self, a: LetterId, b: LetterId) -> bool {
        self.is_left(a) && self.is_right(b)
    }
}

impl Recompression {
    /// Compresses pairs of the letters present after block compression.
    pub(super) fn compress_pairs(&mut self, boundary: Option<Boundary>) {
        let mut alphabet = self.grammar.letters_present();
        radix_sort_by_key(&mut alphabet, |&a| a);
        let partitions = partition_count(u32::try_from(alphabet.len()).unwrap_or(u32::MAX));

        let strategy = self.strategy;
        match strategy {
            PairStrategy::Partitioned => {
                for index in 0..partitions {
                    let partition = Partition::by_index(&alphabet, index, boundary);
                    let replaced = self.compress_partition(&partition);
                    trace!(phase = self.phase, index, replaced, "pair partition");
                }
            }
            PairStrategy::Greedy(mode) => loop {
                let greedy = self
                    .greedy_partition(&alphabet, boundary, mode)
                    .map_or(0, |partition| self.compress_partition(&partition));
                trace!(phase = self.phase, replaced = greedy, "greedy pair partition");
                if greedy > 0 {
                    continue;
                }
                let fallback = (0..partitions).any(|index| {
                    let partition = Partition::by_index(&alphabet, index, boundary);
                    self.compress_partition(&partition) > 0
                });
                if !fallback {
                    break;
                }
            },
        }
    }

    /// Compresses every pair covered by `partition` and returns how many
    /// explicit pairs were replaced.
    fn compress_partition(&mut self, partition: &Partition) -> usize {
        let (explicit, crossing) = self.count_covered(partition);
        if explicit + crossing == 0 {
            return 0;
        }
        if crossing > 0 {
            self.pop_pairs(partition);
        }
        self.replace_pairs(partition)
    }

    /// Counts covered pairs on right-hand sides, split into explicit ones
    /// and crossing ones (those with a rule on either side).
    fn count_covered(&self, partition: &Partition) -> (usize, usize) {
        let ends = self.grammar.boundary_letters();
        let (mut explicit, mut crossing) = (0, 0);
        for rule in self.grammar.bottom_up() {
            let keys = self.grammar.keys(rule);
            for window in keys.windows(2) {
                let (x, y) = (self.grammar.item(window[0]), self.grammar.item(window[1]));
                let last = match x {
                    Item::Letter(a) => Some(a),
                    Item::RuleRef(r) => ends.get(&r).map(|e| e.1),
                    _ => None,
                };
                let first = match y {
                    Item::Letter(b) => Some(b),
                    Item::RuleRef(r) => ends.get(&r).map(|e| e.0),
                    _ => None,
                };
                if let (Some(a), Some(b)) = (last, first) {
                    if partition.covers(a, b) {
                        if x.letter().is_some() && y.letter().is_some() {
                            explicit += 1;
                        } else {
                            crossing += 1;
                        }
                    }
                }
            }
        }
        (explicit, crossing)
    }

    /// Pops right letters off the front and left letters off the back of
    /// every rule, children first, so that covered pairs become explicit.
    fn pop_pairs(&mut self, partition: &Partition) {
        for rule in self.grammar.bottom_up() {
            if self.grammar.is_root(rule) {
                continue;
            }

            if let Some(key) = self.grammar.first(rule) {
                if let Some(b) = self.grammar.letter_at(key).filter(|&b| partition.is_right(b)) {
                    let single = self.grammar.words.split_run_front(key);
                    self.grammar.remove_node(single);
                    self.grammar.pop_front(rule, Item::Letter(b), 1);
                }
            }
            if self.grammar.is_empty(rule) {
                self.grammar.drop_empty_rule(rule);
                continue;
            }

            if let Some(key) = self.grammar.last(rule) {
                if let Some(a) = self.grammar.letter_at(key).filter(|&a| partition.is_left(a)) {
                    let single = self.grammar.words.split_run_back(key);
                    self.grammar.remove_node(single);
                    self.grammar.pop_back(rule, Item::Letter(a), 1);
                }
            }
            if self.grammar.is_empty(rule) {
                self.grammar.drop_empty_rule(rule);
            }
        }
    }

    /// Replaces explicit covered pairs, left to right.
    fn replace_pairs(&mut self, partition: &Partition) -> usize {
        let phase = self.phase;
        let mut replaced = 0;
        for rule in self.grammar.bottom_up() {
            let mut current = self.grammar.first(rule);
            while let Some(key) = current {
                let next = self.grammar.words.next(key);
                let pair = match (self.grammar.letter_at(key), next) {
                    (Some(a), Some(n)) => self
                        .grammar
                        .letter_at(n)
                        .filter(|&b| partition.covers(a, b))
                        .map(|b| (a, b, n)),
                    _ => None,
                };
                let Some((a, b, next)) = pair else {
                    current = next;
                    continue;
                };

                let left = self.grammar.words.split_run_back(key);
                let right = self.grammar.words.split_run_front(next);
                let letter = self.letters.pair(a, b, phase);
                let merged = self.grammar.insert_before(left, Item::Letter(letter), 1);
                self.grammar.remove_node(left);
                self.grammar.remove_node(right);
                replaced += 1;
                current = self.grammar.words.next(merged);
            }
        }
        replaced
    }

    /// How often each pair of distinct letters of `alphabet` occurs.
    fn pair_counts(&self, alphabet: &HashSet<LetterId>, mode: CountMode) -> HashMap<(LetterId, LetterId), u64> {
        let ends = self.grammar.boundary_letters();
        let uses = match mode {
            CountMode::Grammar => None,
            CountMode::Words => Some(self.grammar.occurrence_counts()),
        };

        let mut counts: HashMap<(LetterId, LetterId), u64> = HashMap::default();
        for rule in self.grammar.bottom_up() {
            let weight = uses
                .as_ref()
                .map_or(1, |uses| uses.get(&rule).copied().unwrap_or(0));
            let keys = self.grammar.keys(rule);
            for window in keys.windows(2) {
                let last = match self.grammar.item(window[0]) {
                    Item::Letter(a) => Some(a),
                    Item::RuleRef(r) => ends.get(&r).map(|e| e.1),
                    _ => None,
                };
                let first = match self.grammar.item(window[1]) {
                    Item::Letter(b) => Some(b),
                    Item::RuleRef(r) => ends.get(&r).map(|e| e.0),
                    _ => None,
                };
                if let (Some(a), Some(b)) = (last, first) {
                    if a != b && alphabet.contains(&a) && alphabet.contains(&b) {
                        let count = counts.entry((a, b)).or_default();
                        *count = count.saturating_add(weight);
                    }
                }
            }
        }
        counts
    }

    /// Greedy 2-colouring: letters are placed one by one on the side that
    /// covers more pair appearances with the letters already placed.
    ///
    /// Returns `None` when the colouring covers nothing.
    fn greedy_partition(
        &self,
        alphabet: &[LetterId],
        boundary: Option<Boundary>,
        mode: CountMode,
    ) -> Option<Partition> {
        let eligible: HashSet<LetterId> = alphabet.iter().copied().collect();
        let counts = self.pair_counts(&eligible, mode);
        if counts.is_empty() {
            return None;
        }

        let mut outgoing: HashMap<LetterId, Vec<(LetterId, u64)>> = HashMap::default();
        let mut incoming: HashMap<LetterId, Vec<(LetterId, u64)>> = HashMap::default();
        for (&(a, b), &count) in &counts {
            outgoing.entry(a).or_default().push((b, count));
            incoming.entry(b).or_default().push((a, count));
        }

        let mut sides: HashMap<LetterId, Side> = HashMap::with_capacity(alphabet.len());
        if let Some(b) = boundary {
            sides.insert(b.start, Side::Left);
            sides.insert(b.end, Side::Right);
        }
        for &a in alphabet {
            if sides.contains_key(&a) {
                continue;
            }
            let gain = |edges: Option<&Vec<(LetterId, u64)>>, other: Side| -> u64 {
                edges
                    .into_iter()
                    .flatten()
                    .filter(|(x, _)| sides.get(x) == Some(&other))
                    .fold(0u64, |acc, (_, count)| acc.saturating_add(*count))
            };
            let as_left = gain(outgoing.get(&a), Side::Right);
            let as_right = gain(incoming.get(&a), Side::Left);
            let side = if as_right > as_left { Side::Right } else { Side::Left };
            sides.insert(a, side);
        }

        let partition = Partition::pinned(sides, boundary);
        let covered = counts
            .iter()
            .filter(|((a, b), _)| partition.covers(*a, *b))
            .fold(0u64, |acc, (_, count)| acc.saturating_add(*count));
        (covered > 0).then_some(partition)
    }
}
