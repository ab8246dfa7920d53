use crate::slp::Slp;
use crate::symbol::{NonTerminal, Symbol, Terminal};

/// Iterator that reconstructs the word of a non-terminal by expanding rules.
///
/// Uses an explicit stack of partially consumed right-hand sides, so the
/// recursion depth of the grammar never touches the call stack.
pub struct SlpIter<'a> {
    slp: &'a Slp,
    stack: Vec<(&'a [Symbol], usize)>,
}

impl<'a> SlpIter<'a> {
    pub(crate) fn new(slp: &'a Slp, start: NonTerminal) -> Self {
        let stack = slp
            .rule(start)
            .map(|right| vec![(right, 0)])
            .unwrap_or_default();
        Self { slp, stack }
    }
}

impl<'a> Iterator for SlpIter<'a> {
    type Item = Terminal;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            if top.1 >= top.0.len() {
                // End of rule, continue in the parent
                self.stack.pop();
                continue;
            }
            let symbol = top.0[top.1];
            top.1 += 1;

            match symbol {
                Symbol::Terminal(t) => return Some(t),
                Symbol::NonTerminal(n) => {
                    if let Some(right) = self.slp.rule(n) {
                        self.stack.push((right, 0));
                    }
                }
            }
        }
    }
}
