use crate::error::Result;
use crate::slp::Slp;
use crate::symbol::{NonTerminal, Production, Symbol, Terminal};
use std::collections::BTreeSet;

/// A context-free grammar with any number of productions per non-terminal.
///
/// Only the normalizer works on general grammars; the engine needs an
/// [`Slp`]. Productions are kept sorted and free of duplicates. A
/// non-terminal without productions is allowed and generates nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cfg {
    productions: BTreeSet<Production>,
    axioms: BTreeSet<NonTerminal>,
}

impl Cfg {
    pub fn new<P, A>(productions: P, axioms: A) -> Self
    where
        P: IntoIterator<Item = Production>,
        A: IntoIterator<Item = NonTerminal>,
    {
        Self {
            productions: productions.into_iter().collect(),
            axioms: axioms.into_iter().collect(),
        }
    }

    pub fn productions(&self) -> impl Iterator<Item = &Production> + '_ {
        self.productions.iter()
    }

    pub fn productions_of(&self, n: NonTerminal) -> impl Iterator<Item = &Production> + '_ {
        self.productions.iter().filter(move |p| p.left == n)
    }

    pub fn axioms(&self) -> &BTreeSet<NonTerminal> {
        &self.axioms
    }

    pub fn len(&self) -> usize {
        self.productions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    /// Total number of symbols over all right-hand sides.
    pub fn size(&self) -> usize {
        self.productions.iter().map(|p| p.right.len()).sum()
    }

    /// Non-terminals occurring anywhere: as a left side, on a right side or
    /// as an axiom.
    pub fn non_terminals(&self) -> BTreeSet<NonTerminal> {
        let mut out: BTreeSet<NonTerminal> = self.axioms.clone();
        for p in &self.productions {
            out.insert(p.left);
            out.extend(p.non_terminals());
        }
        out
    }

    pub fn terminals(&self) -> BTreeSet<Terminal> {
        self.productions
            .iter()
            .flat_map(|p| p.right.iter().filter_map(Symbol::as_terminal))
            .collect()
    }

    /// Smallest id not used by any non-terminal.
    pub(crate) fn next_free_id(&self) -> u32 {
        self.non_terminals()
            .iter()
            .next_back()
            .map_or(0, |n| n.id() + 1)
    }

    pub(crate) fn insert(&mut self, production: Production) -> bool {
        self.productions.insert(production)
    }

    /// Whether the grammar satisfies the SLP invariants.
    pub fn is_slp(&self) -> bool {
        self.to_slp().is_ok()
    }

    /// Converts to an SLP, failing with `MalformedGrammar` unless every
    /// non-terminal has exactly one production and the grammar is acyclic.
    pub fn to_slp(&self) -> Result<Slp> {
        Slp::new(self.productions.iter().cloned(), self.axioms.iter().copied())
    }
}

impl From<&Slp> for Cfg {
    fn from(slp: &Slp) -> Self {
        Cfg::new(slp.productions(), slp.axioms().iter().copied())
    }
}
