use crate::error::{GrammarError, Result};
use crate::iter::SlpIter;
use crate::symbol::{NonTerminal, Production, Symbol, Terminal};
use std::collections::{BTreeMap, BTreeSet};

/// A straight-line program: an acyclic grammar with exactly one production
/// per non-terminal, so every non-terminal denotes exactly one word.
///
/// The axioms are the non-terminals whose words a query is about. An SLP with
/// a single axiom is called a singleton.
///
/// # Example
///
/// ```
/// use recompression_rs::{Alphabet, Production, Slp};
///
/// let mut alphabet = Alphabet::new();
/// let a = alphabet.terminal("a");
/// let b = alphabet.terminal("b");
/// let s = alphabet.non_terminal("S");
/// let x = alphabet.non_terminal("X");
///
/// let slp = Slp::new(
///     vec![
///         Production::new(s, vec![x.into(), x.into(), a.into()]),
///         Production::new(x, vec![a.into(), b.into()]),
///     ],
///     [s],
/// )
/// .unwrap();
///
/// assert_eq!(slp.len_of(s), 5);
/// assert_eq!(alphabet.spell(&slp.value(s)), "ababa");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slp {
    rules: BTreeMap<NonTerminal, Vec<Symbol>>,
    axioms: BTreeSet<NonTerminal>,
}

impl Slp {
    /// Builds an SLP, failing with `MalformedGrammar` when a non-terminal has
    /// more than one production, a referenced non-terminal or an axiom has
    /// none, or the productions are cyclic.
    pub fn new<P, A>(productions: P, axioms: A) -> Result<Self>
    where
        P: IntoIterator<Item = Production>,
        A: IntoIterator<Item = NonTerminal>,
    {
        let mut rules = BTreeMap::new();
        for production in productions {
            if rules.insert(production.left, production.right).is_some() {
                return Err(GrammarError::malformed(format!(
                    "{:?} has more than one production",
                    production.left
                )));
            }
        }

        let axioms: BTreeSet<NonTerminal> = axioms.into_iter().collect();
        for axiom in &axioms {
            if !rules.contains_key(axiom) {
                return Err(GrammarError::malformed(format!(
                    "axiom {axiom:?} has no production"
                )));
            }
        }
        for (left, right) in &rules {
            for n in right.iter().filter_map(Symbol::as_non_terminal) {
                if !rules.contains_key(&n) {
                    return Err(GrammarError::malformed(format!(
                        "{left:?} references {n:?}, which has no production"
                    )));
                }
            }
        }

        let slp = Self { rules, axioms };
        slp.try_topological_order()?;
        Ok(slp)
    }

    /// Builds the literal SLP `axiom -> word`.
    pub fn from_word(word: &[Terminal], axiom: NonTerminal) -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(axiom, word.iter().map(|&t| Symbol::Terminal(t)).collect());
        Self {
            rules,
            axioms: BTreeSet::from([axiom]),
        }
    }

    pub fn axioms(&self) -> &BTreeSet<NonTerminal> {
        &self.axioms
    }

    pub fn is_singleton(&self) -> bool {
        self.axioms.len() == 1
    }

    /// The single axiom of a singleton SLP.
    pub fn axiom(&self) -> Result<NonTerminal> {
        match (self.axioms.len(), self.axioms.iter().next()) {
            (1, Some(&axiom)) => Ok(axiom),
            (n, _) => Err(GrammarError::invalid(format!(
                "expected a singleton SLP, found {n} axioms"
            ))),
        }
    }

    /// Right-hand side of the production of `n`.
    pub fn rule(&self, n: NonTerminal) -> Option<&[Symbol]> {
        self.rules.get(&n).map(Vec::as_slice)
    }

    pub fn productions(&self) -> impl Iterator<Item = Production> + '_ {
        self.rules
            .iter()
            .map(|(&left, right)| Production::new(left, right.clone()))
    }

    pub fn non_terminals(&self) -> impl Iterator<Item = NonTerminal> + '_ {
        self.rules.keys().copied()
    }

    /// Total number of symbols over all right-hand sides.
    pub fn size(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    /// Non-terminals ordered so that every non-terminal comes after all the
    /// non-terminals on its right-hand side.
    pub fn topological_order(&self) -> Vec<NonTerminal> {
        self.try_topological_order()
            .expect("SLP invariants guarantee acyclicity")
    }

    fn try_topological_order(&self) -> Result<Vec<NonTerminal>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Open,
            Done,
        }

        let mut marks: BTreeMap<NonTerminal, Mark> = BTreeMap::new();
        let mut order = Vec::with_capacity(self.rules.len());

        for &start in self.rules.keys() {
            if marks.contains_key(&start) {
                continue;
            }
            marks.insert(start, Mark::Open);
            let mut stack: Vec<(NonTerminal, usize)> = vec![(start, 0)];

            while let Some(top) = stack.last_mut() {
                let (n, index) = *top;
                let right = &self.rules[&n];
                let next_child = right[index..]
                    .iter()
                    .position(|s| s.as_non_terminal().is_some())
                    .map(|offset| index + offset);

                match next_child {
                    Some(i) => {
                        top.1 = i + 1;
                        let child = right[i].as_non_terminal().expect("checked above");
                        match marks.get(&child) {
                            Some(Mark::Open) => {
                                return Err(GrammarError::malformed(format!(
                                    "cycle through {child:?}"
                                )));
                            }
                            Some(Mark::Done) => {}
                            None => {
                                marks.insert(child, Mark::Open);
                                stack.push((child, 0));
                            }
                        }
                    }
                    None => {
                        marks.insert(n, Mark::Done);
                        order.push(n);
                        stack.pop();
                    }
                }
            }
        }
        Ok(order)
    }

    /// Length of the word denoted by every non-terminal.
    pub fn lengths(&self) -> BTreeMap<NonTerminal, u64> {
        let mut lengths = BTreeMap::new();
        for n in self.topological_order() {
            let len = self.rules[&n]
                .iter()
                .map(|s| symbol_len(s, &lengths))
                .fold(0u64, u64::saturating_add);
            lengths.insert(n, len);
        }
        lengths
    }

    /// Length of the word denoted by `n` (0 for unknown non-terminals).
    pub fn len_of(&self, n: NonTerminal) -> u64 {
        self.lengths().get(&n).copied().unwrap_or(0)
    }

    /// Like [`Slp::len_of`], but `None` when the length exceeds `u64::MAX`
    /// instead of saturating.
    pub fn checked_len_of(&self, n: NonTerminal) -> Option<u64> {
        let mut lengths: BTreeMap<NonTerminal, Option<u64>> = BTreeMap::new();
        for m in self.topological_order() {
            let len = self.rules[&m].iter().try_fold(0u64, |total, s| match s {
                Symbol::Terminal(_) => total.checked_add(1),
                Symbol::NonTerminal(child) => total.checked_add(lengths.get(child).copied().flatten()?),
            });
            lengths.insert(m, len);
        }
        lengths.get(&n).copied().unwrap_or(Some(0))
    }

    /// Decompresses the word denoted by `n`.
    pub fn value(&self, n: NonTerminal) -> Vec<Terminal> {
        self.iter(n).collect()
    }

    /// Iterates over the letters of the word denoted by `n`.
    pub fn iter(&self, n: NonTerminal) -> SlpIter<'_> {
        SlpIter::new(self, n)
    }

    /// Smallest id not used by any non-terminal of this SLP.
    pub(crate) fn next_free_id(&self) -> u32 {
        self.rules
            .keys()
            .next_back()
            .map_or(0, |n| n.id() + 1)
    }

    /// Adds (or replaces) the production of `left`.
    pub(crate) fn set_rule(&mut self, left: NonTerminal, right: Vec<Symbol>) {
        self.rules.insert(left, right);
    }

    pub(crate) fn set_axioms<A: IntoIterator<Item = NonTerminal>>(&mut self, axioms: A) {
        self.axioms = axioms.into_iter().collect();
    }

    /// Drops every production unreachable from the axioms.
    pub(crate) fn retain_reachable(&mut self) {
        let mut reachable = BTreeSet::new();
        let mut stack: Vec<NonTerminal> = self.axioms.iter().copied().collect();
        while let Some(n) = stack.pop() {
            if !reachable.insert(n) {
                continue;
            }
            if let Some(right) = self.rules.get(&n) {
                stack.extend(right.iter().filter_map(Symbol::as_non_terminal));
            }
        }
        self.rules.retain(|n, _| reachable.contains(n));
    }

    /// Symbols whose concatenation denotes the first `n` letters of `val(of)`.
    ///
    /// Walks down a single root-to-leaf path, so the result has at most
    /// `depth * max_rule_len` symbols and no new productions are needed.
    pub(crate) fn prefix_symbols(
        &self,
        of: NonTerminal,
        mut n: u64,
        lengths: &BTreeMap<NonTerminal, u64>,
    ) -> Vec<Symbol> {
        let mut out = Vec::new();
        let mut right: &[Symbol] = &self.rules[&of];
        'descend: while n > 0 {
            for symbol in right {
                let len = symbol_len(symbol, lengths);
                if len <= n {
                    out.push(*symbol);
                    n -= len;
                    if n == 0 {
                        break 'descend;
                    }
                } else {
                    let child = symbol
                        .as_non_terminal()
                        .expect("a terminal never exceeds a positive budget");
                    right = &self.rules[&child];
                    continue 'descend;
                }
            }
            debug_assert!(n == 0, "prefix longer than the word");
            break;
        }
        out
    }

    /// Symbols whose concatenation denotes the last `n` letters of `val(of)`.
    pub(crate) fn suffix_symbols(
        &self,
        of: NonTerminal,
        mut n: u64,
        lengths: &BTreeMap<NonTerminal, u64>,
    ) -> Vec<Symbol> {
        let mut out = Vec::new();
        let mut right: &[Symbol] = &self.rules[&of];
        'descend: while n > 0 {
            for symbol in right.iter().rev() {
                let len = symbol_len(symbol, lengths);
                if len <= n {
                    out.push(*symbol);
                    n -= len;
                    if n == 0 {
                        break 'descend;
                    }
                } else {
                    let child = symbol
                        .as_non_terminal()
                        .expect("a terminal never exceeds a positive budget");
                    right = &self.rules[&child];
                    continue 'descend;
                }
            }
            debug_assert!(n == 0, "suffix longer than the word");
            break;
        }
        out.reverse();
        out
    }

    /// Disjoint union of several SLPs.
    ///
    /// Non-terminals of every part are renamed into a fresh, shared id range;
    /// terminals are kept as they are. Returns the union (whose axioms are the
    /// renamed axioms of all parts) and, per part, the renaming used.
    pub(crate) fn disjoint_union(parts: &[&Slp]) -> (Slp, Vec<BTreeMap<NonTerminal, NonTerminal>>) {
        let mut rules = BTreeMap::new();
        let mut axioms = BTreeSet::new();
        let mut renames = Vec::with_capacity(parts.len());
        let mut next = 0u32;

        for part in parts {
            let rename: BTreeMap<NonTerminal, NonTerminal> = part
                .rules
                .keys()
                .map(|&n| {
                    let fresh = NonTerminal::new(next);
                    next += 1;
                    (n, fresh)
                })
                .collect();
            for (left, right) in &part.rules {
                let right = right
                    .iter()
                    .map(|s| match s {
                        Symbol::NonTerminal(n) => Symbol::NonTerminal(rename[n]),
                        t => *t,
                    })
                    .collect();
                rules.insert(rename[left], right);
            }
            axioms.extend(part.axioms.iter().map(|a| rename[a]));
            renames.push(rename);
        }

        (Slp { rules, axioms }, renames)
    }
}

fn symbol_len(symbol: &Symbol, lengths: &BTreeMap<NonTerminal, u64>) -> u64 {
    match symbol {
        Symbol::Terminal(_) => 1,
        Symbol::NonTerminal(n) => lengths.get(n).copied().unwrap_or(0),
    }
}
