use super::Recompression;
use crate::grammar::Group;
use crate::word::{Item, LetterId, RuleId};
use slotmap::DefaultKey;
use tracing::trace;

/// First and last block of the pattern, as `(letter, length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PatternEnds {
    pub first: (LetterId, u64),
    pub last: (LetterId, u64),
}

/// Letters the pattern's first and last block were compressed to in the
/// current phase.
///
/// `start` only ever occurs as the left letter of a pair and `end` only as
/// the right one, so compressing pairs never glues a pattern occurrence to
/// its surroundings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Boundary {
    pub start: LetterId,
    pub end: LetterId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PatternForm {
    /// The pattern is a single block.
    Run(LetterId, u64),
    Ends(PatternEnds),
}

/// A maximal run of one letter inside a segment, over one or more nodes.
struct LetterRun {
    letter: LetterId,
    count: u64,
    keys: Vec<DefaultKey>,
}

impl Recompression {
    /// Pops the leading and the trailing block of every rule into all of its
    /// occurrences, children first.
    ///
    /// Afterwards every maximal block of every derived word is explicit on
    /// some right-hand side.
    pub(super) fn pop_blocks(&mut self) {
        let mut popped = 0usize;
        for rule in self.grammar.bottom_up() {
            if self.grammar.is_root(rule) {
                continue;
            }

            if let Some(a) = self.grammar.first(rule).and_then(|k| self.grammar.letter_at(k)) {
                let head = self.grammar.head(rule);
                let run = self.grammar.words.delete_prefix_while(
                    head,
                    |n| n.item == Item::Letter(a),
                    |n| n.run,
                );
                self.grammar.pop_front(rule, Item::Letter(a), run);
                popped += 1;
            }
            if self.grammar.is_empty(rule) {
                self.grammar.drop_empty_rule(rule);
                continue;
            }

            if let Some(b) = self.grammar.last(rule).and_then(|k| self.grammar.letter_at(k)) {
                let tail = self.grammar.tail(rule);
                let run = self.grammar.words.delete_suffix_while(
                    tail,
                    |n| n.item == Item::Letter(b),
                    |n| n.run,
                );
                self.grammar.pop_back(rule, Item::Letter(b), run);
                popped += 1;
            }
            if self.grammar.is_empty(rule) {
                self.grammar.drop_empty_rule(rule);
            }
        }
        trace!(phase = self.phase, popped, "popped blocks");
    }

    /// Shape of the pattern right after popping blocks.
    pub(super) fn pattern_form(&self, pattern: RuleId) -> PatternForm {
        let groups = self.grammar.groups(pattern);
        match groups.as_slice() {
            [Group::Letters { letter, count }] => PatternForm::Run(*letter, *count),
            [Group::Letters {
                letter: a,
                count: l,
            }, .., Group::Letters {
                letter: b,
                count: r,
            }] => PatternForm::Ends(PatternEnds {
                first: (*a, *l),
                last: (*b, *r),
            }),
            _ => unreachable!("after popping, the pattern starts and ends with a letter"),
        }
    }

    /// Replaces every maximal block by a single letter.
    ///
    /// With `ends` set, blocks are compressed for matching: the pattern's
    /// first and last block become `start` and `end`, and every text block
    /// that could hold a pattern start (or end) gets that letter at the
    /// matching position.
    pub(super) fn compress_blocks(&mut self, ends: Option<(RuleId, PatternEnds)>) -> Option<Boundary> {
        let phase = self.phase;
        let boundary = ends.map(|(_, e)| Boundary {
            start: self.letters.pattern_start(e.first.0, e.first.1, phase),
            end: self.letters.pattern_end(e.last.0, e.last.1, phase),
        });
        let pattern = ends.map(|(p, _)| p);

        let mut blocks = 0usize;
        for rule in self.grammar.bottom_up() {
            let first = self.grammar.first(rule);
            let last = self.grammar.last(rule);
            let is_pattern = Some(rule) == pattern;

            let head = self.grammar.head(rule);
            let segments = self.grammar.words.split(head, |n| n.item.rule().is_some());
            for segment in segments {
                for run in self.letter_runs(&segment) {
                    let image = match boundary {
                        Some(b) if is_pattern && Some(run.keys[0]) == first => vec![b.start],
                        Some(b) if is_pattern && run.keys.last() == last.as_ref() => vec![b.end],
                        _ => self.block_image(run.letter, run.count, ends.map(|(_, e)| e), boundary),
                    };
                    if self.replace_run(&run, &image) {
                        blocks += 1;
                    }
                }
            }
        }
        trace!(phase, blocks, "compressed blocks");
        boundary
    }

    fn letter_runs(&self, segment: &[DefaultKey]) -> Vec<LetterRun> {
        let mut runs: Vec<LetterRun> = Vec::new();
        for &key in segment {
            let node = &self.grammar.words.nodes[key];
            let Item::Letter(a) = node.item else {
                continue;
            };
            if let Some(run) = runs.last_mut().filter(|run| run.letter == a) {
                run.count = run.count.saturating_add(node.run);
                run.keys.push(key);
                continue;
            }
            runs.push(LetterRun {
                letter: a,
                count: node.run,
                keys: vec![key],
            });
        }
        runs
    }

    /// Letters replacing the block `c^k`.
    ///
    /// A block of the pattern's first letter at least as long as the first
    /// block may contain a pattern start `l` letters before its end; a block of
    /// the last letter at least as long as the last block may contain a
    /// pattern end `r` letters after its start. Both can hold for one block,
    /// and if `k < l + r` the two claims overlap, which an overlap letter of
    /// negative weight accounts for.
    fn block_image(
        &mut self,
        c: LetterId,
        k: u64,
        ends: Option<PatternEnds>,
        boundary: Option<Boundary>,
    ) -> Vec<LetterId> {
        let (Some(e), Some(b)) = (ends, boundary) else {
            return self.middle(c, i128::from(k)).into_iter().collect();
        };
        let (l, r) = (e.first.1, e.last.1);
        let holds_start = c == e.first.0 && k >= l;
        let holds_end = c == e.last.0 && k >= r;
        let k = i128::from(k);

        let mut image = Vec::with_capacity(3);
        match (holds_end, holds_start) {
            (false, false) => image.extend(self.middle(c, k)),
            (true, false) => {
                image.push(b.end);
                image.extend(self.middle(c, k - i128::from(r)));
            }
            (false, true) => {
                image.extend(self.middle(c, k - i128::from(l)));
                image.push(b.start);
            }
            (true, true) => {
                image.push(b.end);
                image.extend(self.middle(c, k - i128::from(l) - i128::from(r)));
                image.push(b.start);
            }
        }
        image
    }

    /// The part of a block not claimed by a pattern boundary.
    fn middle(&mut self, c: LetterId, j: i128) -> Option<LetterId> {
        let phase = self.phase;
        match j {
            0 => None,
            1 => Some(c),
            j if j < 0 => Some(self.letters.overlap(c, clamp(-j), phase)),
            j => Some(self.letters.block(c, clamp(j), phase)),
        }
    }

    /// Swaps the nodes of `run` for `image`. Returns false when nothing
    /// had to change.
    fn replace_run(&mut self, run: &LetterRun, image: &[LetterId]) -> bool {
        if run.keys.len() == 1 && run.count == 1 && *image == [run.letter] {
            return false;
        }
        let anchor = run.keys[0];
        for &letter in image {
            self.grammar.insert_before(anchor, Item::Letter(letter), 1);
        }
        for &key in &run.keys {
            self.grammar.remove_node(key);
        }
        true
    }
}

fn clamp(j: i128) -> u64 {
    u64::try_from(j).unwrap_or(u64::MAX)
}
