//! Grammar normalizer: nullability, pruning, epsilon elimination, binary and
//! Chomsky normal forms, and shortest generated words.
//!
//! Every analysis here runs in linear time (the shortest-word computation in
//! `O(|G| log |G|)`) by counting, per production, how many non-terminal
//! occurrences are still unresolved and firing the production when the
//! counter reaches zero.

use crate::cfg::Cfg;
use crate::id_gen::IdGenerator;
use crate::symbol::{GrammarSymbol, NonTerminal, Production, Symbol, Terminal};
use ahash::AHashMap as HashMap;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use tracing::debug;

/// Index over the productions of a grammar.
struct Index<'a> {
    productions: Vec<&'a Production>,
    /// Productions using a non-terminal, once per occurrence.
    uses: HashMap<NonTerminal, Vec<usize>>,
    /// Productions of a non-terminal.
    by_left: HashMap<NonTerminal, Vec<usize>>,
}

impl<'a> Index<'a> {
    fn new(cfg: &'a Cfg) -> Self {
        let productions: Vec<&Production> = cfg.productions().collect();
        let mut uses: HashMap<NonTerminal, Vec<usize>> = HashMap::default();
        let mut by_left: HashMap<NonTerminal, Vec<usize>> = HashMap::default();
        for (i, p) in productions.iter().enumerate() {
            by_left.entry(p.left).or_default().push(i);
            for n in p.non_terminals() {
                uses.entry(n).or_default().push(i);
            }
        }
        Self {
            productions,
            uses,
            by_left,
        }
    }

    fn uses(&self, n: NonTerminal) -> &[usize] {
        self.uses.get(&n).map_or(&[], Vec::as_slice)
    }

    fn of(&self, n: NonTerminal) -> &[usize] {
        self.by_left.get(&n).map_or(&[], Vec::as_slice)
    }

    /// Fires productions whose counter drops to zero, starting from those
    /// already at zero. Returns the fired productions and their left sides.
    ///
    /// A counter of `None` never fires.
    fn propagate(&self, mut remaining: Vec<Option<usize>>) -> (BTreeSet<usize>, BTreeSet<NonTerminal>) {
        let mut fired = BTreeSet::new();
        let mut resolved = BTreeSet::new();
        let mut queue = Vec::new();
        for (i, r) in remaining.iter().enumerate() {
            if *r == Some(0) {
                fired.insert(i);
                let left = self.productions[i].left;
                if resolved.insert(left) {
                    queue.push(left);
                }
            }
        }
        while let Some(n) = queue.pop() {
            for &i in self.uses(n) {
                let Some(r) = remaining[i].as_mut().filter(|r| **r > 0) else {
                    continue;
                };
                *r -= 1;
                if *r == 0 {
                    fired.insert(i);
                    let left = self.productions[i].left;
                    if resolved.insert(left) {
                        queue.push(left);
                    }
                }
            }
        }
        (fired, resolved)
    }
}

impl Cfg {
    /// Productions that derive the empty word.
    pub fn nullable_productions(&self) -> BTreeSet<Production> {
        let index = Index::new(self);
        let (fired, _) = index.propagate(Self::nullable_counters(&index));
        fired
            .into_iter()
            .map(|i| index.productions[i].clone())
            .collect()
    }

    /// Non-terminals that derive the empty word.
    pub fn nullable_non_terminals(&self) -> BTreeSet<NonTerminal> {
        let index = Index::new(self);
        index.propagate(Self::nullable_counters(&index)).1
    }

    fn nullable_counters(index: &Index<'_>) -> Vec<Option<usize>> {
        index
            .productions
            .iter()
            .map(|p| (p.terminal_count() == 0).then(|| p.right.len()))
            .collect()
    }

    /// Non-terminals that generate at least one word.
    pub fn productive_non_terminals(&self) -> BTreeSet<NonTerminal> {
        let index = Index::new(self);
        index.propagate(Self::operand_counters(&index)).1
    }

    fn operand_counters(index: &Index<'_>) -> Vec<Option<usize>> {
        index
            .productions
            .iter()
            .map(|p| Some(p.non_terminals().count()))
            .collect()
    }

    /// Keeps the productions that are both productive and reachable from an
    /// axiom through productive productions.
    pub fn delete_useless(&self) -> Cfg {
        let index = Index::new(self);
        let (productive, _) = index.propagate(Self::operand_counters(&index));

        let mut reachable = BTreeSet::new();
        let mut kept = BTreeSet::new();
        let mut stack: Vec<NonTerminal> = self.axioms().iter().copied().collect();
        while let Some(n) = stack.pop() {
            if !reachable.insert(n) {
                continue;
            }
            for &i in index.of(n).iter().filter(|&&i| productive.contains(&i)) {
                kept.insert(i);
                stack.extend(index.productions[i].non_terminals());
            }
        }

        let out = Cfg::new(
            kept.into_iter().map(|i| index.productions[i].clone()),
            self.axioms().iter().copied(),
        );
        if out.len() != self.len() {
            debug!(before = self.len(), after = out.len(), "deleted useless productions");
        }
        out
    }

    /// Every production with each subset of its nullable operands dropped,
    /// and no empty productions. Every non-terminal keeps its language
    /// minus the empty word.
    ///
    /// The number of variants is exponential in the number of nullable
    /// occurrences per right-hand side, which binarization bounds by two.
    fn epsilon_free(&self) -> Cfg {
        let nullable = self.nullable_non_terminals();
        let mut out = Cfg::new(Vec::new(), self.axioms().iter().copied());
        for p in self.productions() {
            let mut variants: Vec<Vec<Symbol>> = vec![Vec::new()];
            for symbol in &p.right {
                let optional = symbol
                    .as_non_terminal()
                    .is_some_and(|n| nullable.contains(&n));
                if optional {
                    let without = variants.clone();
                    for v in &mut variants {
                        v.push(*symbol);
                    }
                    variants.extend(without);
                } else {
                    for v in &mut variants {
                        v.push(*symbol);
                    }
                }
            }
            for right in variants {
                let unit_loop = right.len() == 1 && right[0] == Symbol::NonTerminal(p.left);
                if !right.is_empty() && !unit_loop {
                    out.insert(Production::new(p.left, right));
                }
            }
        }
        out
    }

    /// Removes empty productions without changing the generated language.
    ///
    /// An empty production is added back for every nullable axiom.
    pub fn eliminate_epsilon(&self) -> Cfg {
        let nullable = self.nullable_non_terminals();
        let mut out = self.epsilon_free();
        for &axiom in self.axioms() {
            if nullable.contains(&axiom) {
                out.insert(Production::new(axiom, Vec::new()));
            }
        }
        out.delete_useless()
    }

    /// Splits right-hand sides so that none has more than two non-terminal
    /// occurrences.
    pub fn to_binary(&self) -> Cfg {
        let mut ids = IdGenerator::starting_at(self.next_free_id());
        let mut out = Cfg::new(Vec::new(), self.axioms().iter().copied());
        for p in self.productions() {
            let mut left = p.left;
            let mut right = p.right.clone();
            loop {
                let operands: Vec<usize> = right
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| !s.is_terminal())
                    .map(|(i, _)| i)
                    .collect();
                if operands.len() <= 2 {
                    out.insert(Production::new(left, right));
                    break;
                }
                let rest = right.split_off(operands[1]);
                let fresh = NonTerminal::new(ids.get());
                right.push(fresh.into());
                out.insert(Production::new(left, right));
                left = fresh;
                right = rest;
            }
        }
        if out.len() != self.len() {
            debug!(before = self.len(), after = out.len(), "binarized grammar");
        }
        out
    }

    /// Replaces every terminal in a right-hand side other than a lone
    /// terminal by a non-terminal whose only production is that terminal.
    ///
    /// Existing non-terminals of that shape are reused.
    pub fn replace_all_terminals_by_rule(&self) -> Cfg {
        let index = Index::new(self);
        let mut units: BTreeMap<Terminal, NonTerminal> = BTreeMap::new();
        for p in self.productions() {
            if let [Symbol::Terminal(t)] = p.right.as_slice() {
                if index.of(p.left).len() == 1 {
                    units.entry(*t).or_insert(p.left);
                }
            }
        }

        let mut ids = IdGenerator::starting_at(self.next_free_id());
        let mut out = Cfg::new(Vec::new(), self.axioms().iter().copied());
        for p in self.productions() {
            if matches!(p.right.as_slice(), [Symbol::Terminal(_)]) {
                out.insert(p.clone());
                continue;
            }
            let right = p
                .right
                .iter()
                .map(|symbol| match symbol {
                    Symbol::Terminal(t) => {
                        let unit = *units.entry(*t).or_insert_with(|| NonTerminal::new(ids.get()));
                        Symbol::NonTerminal(unit)
                    }
                    n => *n,
                })
                .collect();
            out.insert(Production::new(p.left, right));
        }
        for (t, n) in units {
            out.insert(Production::new(n, vec![t.into()]));
        }
        out
    }

    /// Replaces unit productions `A -> B` by the productions of `B`.
    ///
    /// Empty productions are only inherited by axioms. After
    /// [`Cfg::eliminate_epsilon`] every nullable non-terminal already has
    /// variants without it, so this keeps the axioms' languages.
    pub fn remove_unit_rules(&self) -> Cfg {
        let index = Index::new(self);
        let mut out = Cfg::new(Vec::new(), self.axioms().iter().copied());
        for left in self.non_terminals() {
            let mut visited = BTreeSet::new();
            let mut stack = vec![left];
            while let Some(n) = stack.pop() {
                if !visited.insert(n) {
                    continue;
                }
                for &i in index.of(n) {
                    let p = index.productions[i];
                    match p.right.as_slice() {
                        [Symbol::NonTerminal(m)] => stack.push(*m),
                        [] if n != left && !self.axioms().contains(&left) => {}
                        right => {
                            out.insert(Production::new(left, right.to_vec()));
                        }
                    }
                }
            }
        }
        out
    }

    /// Chomsky normal form: every production is `A -> BC`, `A -> a`, or
    /// `S -> ε` for a nullable axiom `S`.
    pub fn to_cnf(&self) -> Cfg {
        self.delete_useless()
            .replace_all_terminals_by_rule()
            .to_binary()
            .eliminate_epsilon()
            .remove_unit_rules()
            .delete_useless()
    }

    /// Weak Chomsky normal form: every right-hand side is empty, a single
    /// terminal, or one or two non-terminals.
    pub fn to_weak_cnf(&self) -> Cfg {
        self.delete_useless()
            .replace_all_terminals_by_rule()
            .to_binary()
            .delete_useless()
    }

    pub fn is_cnf(&self) -> bool {
        self.productions().all(|p| match p.right.as_slice() {
            [] => self.axioms().contains(&p.left),
            [Symbol::Terminal(_)] => true,
            [Symbol::NonTerminal(_), Symbol::NonTerminal(_)] => true,
            _ => false,
        })
    }

    pub fn is_weak_cnf(&self) -> bool {
        self.productions().all(|p| match p.right.as_slice() {
            [] | [Symbol::Terminal(_)] => true,
            right => right.len() <= 2 && right.iter().all(|s| !s.is_terminal()),
        })
    }

    /// Length of a shortest word generated by every productive non-terminal,
    /// with the production a shortest derivation starts with.
    fn minimal_words(&self) -> (BTreeMap<NonTerminal, u64>, BTreeMap<NonTerminal, Production>) {
        let index = Index::new(self);
        let mut remaining: Vec<usize> = index
            .productions
            .iter()
            .map(|p| p.non_terminals().count())
            .collect();
        let mut partial: Vec<u64> = index
            .productions
            .iter()
            .map(|p| p.terminal_count() as u64)
            .collect();

        let mut heap = BinaryHeap::new();
        for (i, p) in index.productions.iter().enumerate() {
            if remaining[i] == 0 {
                heap.push(Reverse((partial[i], p.left, i)));
            }
        }

        let mut lengths = BTreeMap::new();
        let mut chosen = BTreeMap::new();
        while let Some(Reverse((len, n, i))) = heap.pop() {
            if lengths.contains_key(&n) {
                continue;
            }
            lengths.insert(n, len);
            chosen.insert(n, index.productions[i].clone());
            for &j in index.uses(n) {
                remaining[j] -= 1;
                partial[j] = partial[j].saturating_add(len);
                let left = index.productions[j].left;
                if remaining[j] == 0 && !lengths.contains_key(&left) {
                    heap.push(Reverse((partial[j], left, j)));
                }
            }
        }
        (lengths, chosen)
    }

    /// Length of a shortest word of every productive non-terminal.
    pub fn minimal_word_lengths(&self) -> BTreeMap<NonTerminal, u64> {
        self.minimal_words().0
    }

    /// Length of a shortest non-empty word of every non-terminal generating
    /// one.
    pub fn minimal_nonempty_word_lengths(&self) -> BTreeMap<NonTerminal, u64> {
        self.epsilon_free().minimal_word_lengths()
    }

    /// A shortest word generated by `n`, if `n` generates anything.
    pub fn shortest_word(&self, n: NonTerminal) -> Option<Vec<Terminal>> {
        let (_, chosen) = self.minimal_words();
        if !chosen.contains_key(&n) {
            return None;
        }
        // The chosen productions only use non-terminals settled before their
        // own left side, so they form an SLP.
        let slp = Cfg::new(chosen.into_values(), [n]).to_slp().ok()?;
        Some(slp.value(n))
    }

    /// A shortest non-empty word generated by `n`.
    pub fn shortest_nonempty_word(&self, n: NonTerminal) -> Option<Vec<Terminal>> {
        self.epsilon_free().shortest_word(n)
    }

    /// Non-terminals forced to generate exactly one word: each has a single
    /// production and every operand is itself such a non-terminal.
    pub fn slp_non_terminals(&self) -> BTreeSet<NonTerminal> {
        let index = Index::new(self);
        let counters = index
            .productions
            .iter()
            .map(|p| (index.of(p.left).len() == 1).then(|| p.non_terminals().count()))
            .collect();
        index.propagate(counters).1
    }
}
