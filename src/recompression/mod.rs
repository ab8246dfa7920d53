//! Jeż's recompression for SLP-compressed words.
//!
//! The engine owns a mutable copy of the input grammar and rewrites it in
//! phases. Each phase compresses every maximal block `a^k` into one letter and
//! then a large share of the pairs `ab` into one letter each, popping letters
//! out of rules first so that no block or pair is cut differently in different
//! contexts. The words shrink by a constant factor per phase while the grammar
//! stays polynomial, so after `O(log n)` phases every word of interest is a
//! single letter and equality becomes letter equality.
//!
//! Matching runs the same loop on text and pattern together. The first and
//! last block of the pattern are compressed into dedicated letters so that
//! every occurrence of the pattern in the text is still an occurrence after
//! the phase.

mod blocks;
mod letters;
mod matches;
mod pairs;

use crate::error::{GrammarError, Result};
use crate::grammar::Grammar;
use crate::slp::Slp;
use crate::symbol::{NonTerminal, Terminal};
use crate::word::RuleId;
use blocks::PatternForm;
use letters::LetterTable;
use matches::{MatchIndex, PatternShape};
use tracing::debug;

/// How the pairs of a phase are split into compressible partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairStrategy {
    /// Fixed partitions by the bits of the letter ranks. Gives the proven
    /// bound on the number of phases.
    #[default]
    Partitioned,

    /// Greedy 2-colouring of the alphabet maximizing the number of pairs
    /// covered, repeated until no pair of old letters is left.
    Greedy(CountMode),
}

/// What the greedy strategy counts pair appearances in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    /// Explicit appearances on right-hand sides, one per production.
    Grammar,
    /// Appearances in the derived words, weighted by how often each
    /// production is used.
    Words,
}

/// Longest word the engine accepts. Lengths and positions are reported as
/// `u64`.
const MAX_LEN: i128 = u64::MAX as i128;

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Init,
    Running,
    Done,
}

/// Statistics about a recompression run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecompressionStats {
    /// Phases executed.
    pub phases: u32,
    /// Letters created, input letters included.
    pub letters_created: u64,
    /// Grammar size when the engine started.
    pub initial_size: usize,
    /// Largest grammar size seen at the end of a phase.
    pub peak_size: usize,
    /// Grammar size when the engine finished.
    pub final_size: usize,
}

#[derive(Debug)]
enum Mode {
    Equality { axioms: Vec<(NonTerminal, RuleId)> },
    Matching { text: RuleId, pattern: RuleId },
}

#[derive(Debug, Clone, Copy)]
enum Verdict {
    /// Decided from the lengths alone, before any phase.
    Lengths(bool),
    /// Every axiom was compressed to a single letter.
    Letters,
    /// The pattern was compressed to `letter^run`.
    Pattern(PatternShape),
    /// The pattern is longer than the text.
    NoMatch,
}

/// The recompression engine.
///
/// # Example
///
/// ```
/// use recompression_rs::{Alphabet, Production, Recompression, Slp};
///
/// let mut alphabet = Alphabet::new();
/// let a = alphabet.terminal("a");
/// let b = alphabet.terminal("b");
/// let x = alphabet.non_terminal("X");
/// let y = alphabet.non_terminal("Y");
/// let z = alphabet.non_terminal("Z");
///
/// // X -> abab, Y -> Z Z, Z -> ab
/// let slp = Slp::new(
///     vec![
///         Production::new(x, vec![a.into(), b.into(), a.into(), b.into()]),
///         Production::new(y, vec![z.into(), z.into()]),
///         Production::new(z, vec![a.into(), b.into()]),
///     ],
///     [x, y],
/// )
/// .unwrap();
///
/// let mut engine = Recompression::for_equality(&slp).unwrap();
/// engine.execute();
/// assert!(engine.is_equal().unwrap());
/// ```
#[derive(Debug)]
pub struct Recompression {
    grammar: Grammar,
    letters: LetterTable,
    mode: Mode,
    strategy: PairStrategy,
    state: EngineState,
    phase: u32,
    verdict: Option<Verdict>,
    /// Decision taken from the lengths when the engine was built.
    early: Option<Verdict>,
    matches: Option<MatchIndex>,
    stats: RecompressionStats,
}

impl Recompression {
    fn new(grammar: Grammar, letters: LetterTable, mode: Mode) -> Result<Self> {
        let early = length_verdict(&grammar, &letters, &mode)?;
        Ok(Self {
            grammar,
            letters,
            mode,
            strategy: PairStrategy::default(),
            state: EngineState::Init,
            phase: 0,
            verdict: None,
            early,
            matches: None,
            stats: RecompressionStats::default(),
        })
    }

    /// Engine deciding whether all axioms of `slp` denote the same word.
    ///
    /// Fails with `InvalidOperation` when the axioms have equal lengths
    /// beyond `u64::MAX`.
    pub fn for_equality(slp: &Slp) -> Result<Self> {
        let axioms: Vec<NonTerminal> = slp.axioms().iter().copied().collect();
        let mut grammar = Grammar::new();
        let mut letters = LetterTable::new();
        let roots = grammar.load(slp, &axioms, |t| letters.input(t));
        let axioms = axioms.into_iter().zip(roots).collect();
        Self::new(grammar, letters, Mode::Equality { axioms })
    }

    /// Engine locating the occurrences of `pattern` in `text`.
    ///
    /// Both SLPs must be singletons and the pattern must not be empty. A text
    /// longer than `u64::MAX` is rejected unless the pattern is longer still.
    pub fn for_matching(text: &Slp, pattern: &Slp) -> Result<Self> {
        let text_axiom = text.axiom()?;
        let pattern_axiom = pattern.axiom()?;
        if pattern.len_of(pattern_axiom) == 0 {
            return Err(GrammarError::invalid("the pattern denotes the empty word"));
        }

        let (union, renames) = Slp::disjoint_union(&[text, pattern]);
        let axioms = [renames[0][&text_axiom], renames[1][&pattern_axiom]];
        let mut grammar = Grammar::new();
        let mut letters = LetterTable::new();
        let roots = grammar.load(&union, &axioms, |t| letters.input(t));
        let mode = Mode::Matching {
            text: roots[0],
            pattern: roots[1],
        };
        Self::new(grammar, letters, mode)
    }

    /// Selects how pairs are compressed. Only takes effect before the first
    /// phase.
    pub fn with_strategy(mut self, strategy: PairStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> PairStrategy {
        self.strategy
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn has_finished(&self) -> bool {
        self.state == EngineState::Done
    }

    pub fn stats(&self) -> &RecompressionStats {
        &self.stats
    }

    /// Runs phases until the engine is done.
    pub fn execute(&mut self) {
        if self.state == EngineState::Init {
            self.start();
        }
        while !self.has_finished() {
            self.phase();
        }
    }

    /// Runs a single phase. Does nothing once the engine is done.
    pub fn phase(&mut self) {
        if self.state == EngineState::Init {
            self.start();
        }
        if self.has_finished() {
            return;
        }

        self.phase += 1;
        debug!(
            phase = self.phase,
            grammar_size = self.grammar.size(),
            alphabet = self.letters.len(),
            pattern_len = self.pattern_len(),
            "recompression phase"
        );

        self.pop_blocks();

        let ends = match self.mode {
            Mode::Matching { pattern, .. } => match self.pattern_form(pattern) {
                PatternForm::Run(letter, run) => {
                    self.finish(Verdict::Pattern(PatternShape { letter, run }));
                    return;
                }
                PatternForm::Ends(ends) => Some((pattern, ends)),
            },
            Mode::Equality { .. } => None,
        };

        let boundary = self.compress_blocks(ends);
        self.compress_pairs(boundary);
        self.renumber();

        self.stats.phases = self.phase;
        self.stats.peak_size = self.stats.peak_size.max(self.grammar.size());
        self.check_goal();
    }

    fn start(&mut self) {
        self.state = EngineState::Running;
        let size = self.grammar.size();
        self.stats.initial_size = size;
        self.stats.peak_size = size;

        match self.early.take() {
            Some(verdict) => self.finish(verdict),
            None => self.check_goal(),
        }
    }

    fn check_goal(&mut self) {
        let verdict = match &self.mode {
            Mode::Equality { axioms } => axioms
                .iter()
                .all(|(_, root)| self.grammar.single_letter(*root).is_some())
                .then_some(Verdict::Letters),
            Mode::Matching { pattern, .. } => self
                .grammar
                .single_letter(*pattern)
                .map(|letter| Verdict::Pattern(PatternShape { letter, run: 1 })),
        };
        if let Some(verdict) = verdict {
            self.finish(verdict);
        }
    }

    fn finish(&mut self, verdict: Verdict) {
        if let (Verdict::Pattern(shape), Mode::Matching { text, .. }) = (verdict, &self.mode) {
            self.matches = Some(MatchIndex::build(&self.grammar, &self.letters, *text, shape));
        }
        self.verdict = Some(verdict);
        self.state = EngineState::Done;
        self.stats.phases = self.phase;
        self.stats.letters_created = self.letters.created();
        self.stats.final_size = self.grammar.size();
        self.stats.peak_size = self.stats.peak_size.max(self.stats.final_size);
        debug!(
            phases = self.phase,
            letters = self.stats.letters_created,
            grammar_size = self.stats.final_size,
            "recompression done"
        );
    }

    /// Renames the letters still in use into a dense range.
    fn renumber(&mut self) {
        let present = self.grammar.letters_present();
        let renaming = self.letters.renumber(present);
        self.grammar.remap_letters(|a| renaming[&a]);
    }

    fn pattern_len(&self) -> Option<usize> {
        match self.mode {
            Mode::Matching { pattern, .. } => Some(self.grammar.keys(pattern).len()),
            Mode::Equality { .. } => None,
        }
    }

    fn verdict(&self) -> Result<Verdict> {
        match self.verdict {
            Some(verdict) if self.has_finished() => Ok(verdict),
            _ => Err(GrammarError::not_ready("the engine has not finished")),
        }
    }

    /// Whether all axioms denote the same word.
    pub fn is_equal(&self) -> Result<bool> {
        let Mode::Equality { axioms } = &self.mode else {
            return Err(GrammarError::invalid("the engine was built for matching"));
        };
        match self.verdict()? {
            Verdict::Lengths(equal) => Ok(equal),
            Verdict::Letters => {
                let mut letters = axioms
                    .iter()
                    .map(|(_, root)| self.grammar.single_letter(*root));
                let first = letters.next().flatten();
                Ok(letters.all(|letter| letter == first))
            }
            Verdict::Pattern(_) | Verdict::NoMatch => {
                unreachable!("matching verdicts only occur in matching mode")
            }
        }
    }

    /// The letter `axiom` was compressed to.
    ///
    /// Fails with `InvalidOperation` when the axiom is unknown or was not
    /// compressed to a single letter, which happens when the engine decided
    /// from the lengths alone.
    pub fn axiom_symbol(&self, axiom: NonTerminal) -> Result<Terminal> {
        self.verdict()?;
        let Mode::Equality { axioms } = &self.mode else {
            return Err(GrammarError::invalid("the engine was built for matching"));
        };
        let root = axioms
            .iter()
            .find(|(a, _)| *a == axiom)
            .map(|(_, root)| *root)
            .ok_or_else(|| GrammarError::invalid(format!("{axiom:?} is not an axiom")))?;
        self.grammar
            .single_letter(root)
            .map(|letter| self.letters.terminal(letter))
            .ok_or_else(|| GrammarError::invalid(format!("{axiom:?} is not a single letter")))
    }

    fn match_index(&self) -> Result<Option<&MatchIndex>> {
        if !matches!(self.mode, Mode::Matching { .. }) {
            return Err(GrammarError::invalid("the engine was built for equality"));
        }
        self.verdict()?;
        Ok(self.matches.as_ref())
    }

    /// Number of occurrences of the pattern in the text, saturating at
    /// `u64::MAX`.
    pub fn number_of_pattern_occurrences(&self) -> Result<u64> {
        Ok(self.match_index()?.map_or(0, MatchIndex::count))
    }

    /// Start of the `k`-th occurrence (0-based, in increasing order).
    pub fn pattern_occurrence_position(&self, k: u64) -> Result<Option<u64>> {
        Ok(self.match_index()?.and_then(|index| index.position(k)))
    }

    /// Starts of all occurrences, in increasing order.
    ///
    /// The number of occurrences can be exponential in the grammar size.
    pub fn pattern_occurrence_positions(&self) -> Result<Vec<u64>> {
        Ok(self
            .match_index()?
            .map(MatchIndex::positions)
            .unwrap_or_default())
    }
}

/// Decides what the lengths of the roots alone decide.
fn length_verdict(grammar: &Grammar, letters: &LetterTable, mode: &Mode) -> Result<Option<Verdict>> {
    let too_long = || GrammarError::invalid("word length exceeds u64::MAX");
    let lengths = grammar.lengths(|a| letters.weight(a)).ok_or_else(too_long)?;
    match mode {
        Mode::Equality { axioms } => {
            let values: Vec<i128> = axioms.iter().map(|(_, root)| lengths[root]).collect();
            match values.first() {
                None => Ok(Some(Verdict::Lengths(true))),
                Some(&first) if values.iter().any(|&len| len != first) => {
                    Ok(Some(Verdict::Lengths(false)))
                }
                Some(0) => Ok(Some(Verdict::Lengths(true))),
                Some(&first) if first > MAX_LEN => Err(too_long()),
                Some(_) => Ok(None),
            }
        }
        Mode::Matching { text, pattern } => {
            if lengths[pattern] > lengths[text] {
                Ok(Some(Verdict::NoMatch))
            } else if lengths[text] > MAX_LEN {
                Err(too_long())
            } else {
                Ok(None)
            }
        }
    }
}
