use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Common view over grammar symbols.
///
/// Generic algorithms (sorting, partitioning) only need the identity and the
/// terminal flag, so they are written against this trait rather than against
/// concrete symbol types.
pub trait GrammarSymbol: Copy + Eq + Hash + Ord {
    /// Identity of the symbol, unique within its class.
    fn id(&self) -> u32;

    /// Whether the symbol is a terminal letter.
    fn is_terminal(&self) -> bool;
}

/// A terminal letter.
///
/// Input letters are created with [`Terminal::new`] and have phase 0 and
/// weight 1. Letters produced by recompression carry the phase that created
/// them, the number of input letters they stand for, and, for a block of an
/// input letter, the id of that letter.
///
/// Equality, hashing and ordering only look at `id`.
#[derive(Clone, Copy)]
pub struct Terminal {
    id: u32,
    phase: u32,
    weight: i128,
    block_of: Option<u32>,
}

impl Terminal {
    /// Creates an input letter.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            phase: 0,
            weight: 1,
            block_of: None,
        }
    }

    pub(crate) fn compressed(id: u32, phase: u32, weight: i128, block_of: Option<u32>) -> Self {
        Self {
            id,
            phase,
            weight,
            block_of,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Recompression phase that introduced the letter (0 for input letters).
    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// Number of input letters this letter denotes.
    ///
    /// Boundary-overlap letters created while matching carry a negative
    /// weight; every other letter has a positive one.
    pub fn weight(&self) -> i128 {
        self.weight
    }

    /// For a compressed block `a^k` of an input letter `a`, the id of `a`.
    pub fn block_of(&self) -> Option<u32> {
        self.block_of
    }
}

impl PartialEq for Terminal {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Terminal {}

impl Hash for Terminal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Terminal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Terminal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.phase == 0 {
            write!(f, "t{}", self.id)
        } else {
            write!(f, "t{}@{}", self.id, self.phase)
        }
    }
}

impl GrammarSymbol for Terminal {
    fn id(&self) -> u32 {
        self.id
    }

    fn is_terminal(&self) -> bool {
        true
    }
}

/// A non-terminal, identified by its id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonTerminal(u32);

impl NonTerminal {
    pub fn new(id: u32) -> Self {
        NonTerminal(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

impl GrammarSymbol for NonTerminal {
    fn id(&self) -> u32 {
        self.0
    }

    fn is_terminal(&self) -> bool {
        false
    }
}

/// A symbol on the right-hand side of a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(Terminal),
    NonTerminal(NonTerminal),
}

impl Symbol {
    pub fn as_terminal(&self) -> Option<Terminal> {
        match self {
            Symbol::Terminal(t) => Some(*t),
            Symbol::NonTerminal(_) => None,
        }
    }

    pub fn as_non_terminal(&self) -> Option<NonTerminal> {
        match self {
            Symbol::Terminal(_) => None,
            Symbol::NonTerminal(n) => Some(*n),
        }
    }
}

impl From<Terminal> for Symbol {
    fn from(t: Terminal) -> Self {
        Symbol::Terminal(t)
    }
}

impl From<NonTerminal> for Symbol {
    fn from(n: NonTerminal) -> Self {
        Symbol::NonTerminal(n)
    }
}

impl GrammarSymbol for Symbol {
    fn id(&self) -> u32 {
        match self {
            Symbol::Terminal(t) => t.id(),
            Symbol::NonTerminal(n) => n.id(),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }
}

/// A production `left -> right`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Production {
    pub left: NonTerminal,
    pub right: Vec<Symbol>,
}

impl Production {
    pub fn new(left: NonTerminal, right: Vec<Symbol>) -> Self {
        Self { left, right }
    }

    /// Non-terminals on the right-hand side, with multiplicity.
    pub fn non_terminals(&self) -> impl Iterator<Item = NonTerminal> + '_ {
        self.right.iter().filter_map(Symbol::as_non_terminal)
    }

    /// Number of terminals on the right-hand side.
    pub fn terminal_count(&self) -> usize {
        self.right.iter().filter(|s| s.is_terminal()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.right.is_empty()
    }
}
