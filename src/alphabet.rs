use crate::id_gen::IdGenerator;
use crate::symbol::{NonTerminal, Terminal};
use ahash::AHashMap as HashMap;

/// Symbol table interning names into terminals and non-terminals.
///
/// One table belongs to one family of grammars; the caller owns it and decides
/// how long it lives. Ids are allocated monotonically, separately for
/// terminals and non-terminals.
///
/// # Example
///
/// ```
/// use recompression_rs::Alphabet;
///
/// let mut alphabet = Alphabet::new();
/// let a = alphabet.terminal("a");
/// assert_eq!(alphabet.terminal("a"), a);
/// assert_eq!(alphabet.terminal_name(a), Some("a"));
/// ```
#[derive(Debug, Default)]
pub struct Alphabet {
    terminals: HashMap<String, Terminal>,
    terminal_names: Vec<String>,
    non_terminals: HashMap<String, NonTerminal>,
    non_terminal_names: HashMap<u32, String>,
    terminal_ids: IdGenerator,
    non_terminal_ids: IdGenerator,
}

impl Alphabet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the terminal named `name`, creating it on first use.
    pub fn terminal(&mut self, name: &str) -> Terminal {
        if let Some(&t) = self.terminals.get(name) {
            return t;
        }
        let t = Terminal::new(self.terminal_ids.get());
        self.terminals.insert(name.to_owned(), t);
        self.terminal_names.push(name.to_owned());
        t
    }

    /// Returns the non-terminal named `name`, creating it on first use.
    pub fn non_terminal(&mut self, name: &str) -> NonTerminal {
        if let Some(&n) = self.non_terminals.get(name) {
            return n;
        }
        let n = NonTerminal::new(self.non_terminal_ids.get());
        self.non_terminals.insert(name.to_owned(), n);
        self.non_terminal_names.insert(n.id(), name.to_owned());
        n
    }

    /// Allocates an anonymous non-terminal.
    pub fn fresh_non_terminal(&mut self) -> NonTerminal {
        NonTerminal::new(self.non_terminal_ids.get())
    }

    /// Interns every character of `text` as a terminal.
    pub fn word(&mut self, text: &str) -> Vec<Terminal> {
        let mut buf = [0u8; 4];
        text.chars()
            .map(|c| self.terminal(c.encode_utf8(&mut buf)))
            .collect()
    }

    pub fn terminal_name(&self, t: Terminal) -> Option<&str> {
        self.terminal_names.get(t.id() as usize).map(String::as_str)
    }

    pub fn non_terminal_name(&self, n: NonTerminal) -> Option<&str> {
        self.non_terminal_names.get(&n.id()).map(String::as_str)
    }

    /// Renders a word of input letters using their names.
    pub fn spell(&self, word: &[Terminal]) -> String {
        word.iter()
            .map(|&t| self.terminal_name(t).unwrap_or("?"))
            .collect()
    }

    pub fn terminal_count(&self) -> usize {
        self.terminal_names.len()
    }
}
