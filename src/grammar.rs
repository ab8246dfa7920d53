use crate::id_gen::IdGenerator;
use crate::slp::Slp;
use crate::symbol::{NonTerminal, Symbol, Terminal};
use crate::word::{Item, LetterId, RuleId, WordNode, Words};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use slotmap::DefaultKey;

/// A rule of the mutable grammar: the sentinels framing its right-hand side.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Rule {
    pub head: DefaultKey,
    pub tail: DefaultKey,
    /// Roots are the query subjects. They are never referenced, so nothing is
    /// ever popped out of them.
    pub root: bool,
}

/// A maximal stretch of a right-hand side, as seen by the match queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Group {
    /// Consecutive nodes of one letter, runs summed up.
    Letters { letter: LetterId, count: u64 },
    Rule(RuleId),
}

/// Mutable SLP owned by the recompression engine.
///
/// Right-hand sides live in one node arena; the occurrence index lists, per
/// rule, the nodes referencing it. Keys of removed nodes stay in the index
/// until the next lookup filters them out, which keeps removal O(1).
#[derive(Debug, Default)]
pub(crate) struct Grammar {
    pub words: Words,
    pub rules: HashMap<RuleId, Rule>,
    occurrences: HashMap<RuleId, Vec<DefaultKey>>,
    pub roots: Vec<RuleId>,
    rule_ids: IdGenerator,
}

impl Grammar {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates a rule with an empty right-hand side.
    pub(crate) fn add_rule(&mut self, root: bool) -> RuleId {
        let id = self.rule_ids.get();
        let (head, tail) = self.words.new_word(id);
        self.rules.insert(id, Rule { head, tail, root });
        if root {
            self.roots.push(id);
        }
        id
    }

    /// Copies the productions reachable from `axioms` into the grammar and
    /// returns the root rule of each axiom, in order.
    ///
    /// An axiom referenced from another production is wrapped in a fresh root
    /// `R -> axiom`, so that roots are never referenced.
    pub(crate) fn load<F>(&mut self, slp: &Slp, axioms: &[NonTerminal], mut letter: F) -> Vec<RuleId>
    where
        F: FnMut(Terminal) -> LetterId,
    {
        let mut reachable = HashSet::default();
        let mut referenced = HashSet::default();
        let mut stack: Vec<NonTerminal> = axioms.to_vec();
        while let Some(n) = stack.pop() {
            if !reachable.insert(n) {
                continue;
            }
            for child in slp.rule(n).unwrap_or_default().iter().filter_map(Symbol::as_non_terminal) {
                referenced.insert(child);
                stack.push(child);
            }
        }

        let mut ids: HashMap<NonTerminal, RuleId> = HashMap::default();
        let mut roots = Vec::with_capacity(axioms.len());
        for n in slp.topological_order() {
            if !reachable.contains(&n) {
                continue;
            }
            let is_axiom = axioms.contains(&n);
            let id = self.add_rule(is_axiom && !referenced.contains(&n));
            ids.insert(n, id);
            let tail = self.rules[&id].tail;
            for symbol in slp.rule(n).unwrap_or_default() {
                let item = match symbol {
                    Symbol::Terminal(t) => Item::Letter(letter(*t)),
                    Symbol::NonTerminal(child) => Item::RuleRef(ids[child]),
                };
                self.insert_before(tail, item, 1);
            }
        }

        for axiom in axioms {
            let id = ids[axiom];
            if self.rules[&id].root {
                roots.push(id);
            } else {
                let wrapper = self.add_rule(true);
                let tail = self.rules[&wrapper].tail;
                self.insert_before(tail, Item::RuleRef(id), 1);
                roots.push(wrapper);
            }
        }

        self.drop_empty_rules();
        roots
    }

    pub(crate) fn contains(&self, rule: RuleId) -> bool {
        self.rules.contains_key(&rule)
    }

    pub(crate) fn is_root(&self, rule: RuleId) -> bool {
        self.rules.get(&rule).is_some_and(|r| r.root)
    }

    pub(crate) fn head(&self, rule: RuleId) -> DefaultKey {
        self.rules[&rule].head
    }

    pub(crate) fn tail(&self, rule: RuleId) -> DefaultKey {
        self.rules[&rule].tail
    }

    pub(crate) fn first(&self, rule: RuleId) -> Option<DefaultKey> {
        self.words.first(self.head(rule))
    }

    pub(crate) fn last(&self, rule: RuleId) -> Option<DefaultKey> {
        self.words.last(self.tail(rule))
    }

    pub(crate) fn is_empty(&self, rule: RuleId) -> bool {
        self.words.is_empty(self.head(rule))
    }

    pub(crate) fn keys(&self, rule: RuleId) -> Vec<DefaultKey> {
        self.words.keys(self.head(rule))
    }

    pub(crate) fn item(&self, key: DefaultKey) -> Item {
        self.words.nodes[key].item
    }

    pub(crate) fn letter_at(&self, key: DefaultKey) -> Option<LetterId> {
        self.words.nodes[key].item.letter()
    }

    /// Inserts before `at`, registering the node if it references a rule.
    pub(crate) fn insert_before(&mut self, at: DefaultKey, item: Item, run: u64) -> DefaultKey {
        let key = self.words.insert_before(at, item, run);
        self.register(key, item);
        key
    }

    /// Inserts after `at`, registering the node if it references a rule.
    pub(crate) fn insert_after(&mut self, at: DefaultKey, item: Item, run: u64) -> DefaultKey {
        let key = self.words.insert_after(at, item, run);
        self.register(key, item);
        key
    }

    fn register(&mut self, key: DefaultKey, item: Item) {
        if let Item::RuleRef(rule) = item {
            self.occurrences.entry(rule).or_default().push(key);
        }
    }

    pub(crate) fn remove_node(&mut self, key: DefaultKey) -> WordNode {
        self.words.remove(key)
    }

    /// Live nodes referencing `rule`.
    pub(crate) fn occurrences(&mut self, rule: RuleId) -> Vec<DefaultKey> {
        let Some(list) = self.occurrences.get_mut(&rule) else {
            return Vec::new();
        };
        let nodes = &self.words.nodes;
        list.retain(|&k| nodes.get(k).is_some_and(|n| n.item == Item::RuleRef(rule)));
        list.clone()
    }

    /// Puts `run` copies of `item` in front of every occurrence of `rule`.
    pub(crate) fn pop_front(&mut self, rule: RuleId, item: Item, run: u64) {
        for occurrence in self.occurrences(rule) {
            self.insert_before(occurrence, item, run);
        }
    }

    /// Puts `run` copies of `item` after every occurrence of `rule`.
    pub(crate) fn pop_back(&mut self, rule: RuleId, item: Item, run: u64) {
        for occurrence in self.occurrences(rule) {
            self.insert_after(occurrence, item, run);
        }
    }

    /// Removes a rule whose right-hand side became empty, together with all
    /// its occurrences.
    pub(crate) fn drop_empty_rule(&mut self, rule: RuleId) {
        debug_assert!(self.is_empty(rule), "only empty rules are dropped");
        debug_assert!(!self.is_root(rule), "roots stay even when empty");
        for occurrence in self.occurrences(rule) {
            self.remove_node(occurrence);
        }
        let head = self.head(rule);
        self.words.free_word(head);
        self.rules.remove(&rule);
        self.occurrences.remove(&rule);
    }

    /// Drops every empty non-root rule, children first.
    pub(crate) fn drop_empty_rules(&mut self) {
        for rule in self.bottom_up() {
            if !self.is_root(rule) && self.is_empty(rule) {
                self.drop_empty_rule(rule);
            }
        }
    }

    /// Rules reachable from the roots, every rule after the rules it
    /// references.
    pub(crate) fn bottom_up(&self) -> Vec<RuleId> {
        let mut visited = HashSet::default();
        let mut order = Vec::with_capacity(self.rules.len());
        for &root in &self.roots {
            if !visited.insert(root) {
                continue;
            }
            let mut stack = vec![(root, self.first(root))];
            while let Some(top) = stack.last_mut() {
                match top.1 {
                    Some(key) => {
                        top.1 = self.words.next(key);
                        if let Item::RuleRef(child) = self.item(key) {
                            if visited.insert(child) {
                                stack.push((child, self.first(child)));
                            }
                        }
                    }
                    None => {
                        order.push(top.0);
                        stack.pop();
                    }
                }
            }
        }
        order
    }

    /// Rules reachable from the roots, every rule before the rules it
    /// references.
    pub(crate) fn top_down(&self) -> Vec<RuleId> {
        let mut order = self.bottom_up();
        order.reverse();
        order
    }

    /// Number of symbols over all right-hand sides.
    pub(crate) fn size(&self) -> usize {
        self.words.nodes.len() - 2 * self.rules.len()
    }

    /// Distinct letters occurring anywhere in the grammar.
    pub(crate) fn letters_present(&self) -> Vec<LetterId> {
        let mut seen = HashSet::default();
        let mut letters = Vec::new();
        for node in self.words.nodes.values() {
            if let Item::Letter(a) = node.item {
                if seen.insert(a) {
                    letters.push(a);
                }
            }
        }
        letters
    }

    pub(crate) fn remap_letters<F: Fn(LetterId) -> LetterId>(&mut self, map: F) {
        for node in self.words.nodes.values_mut() {
            if let Item::Letter(a) = node.item {
                node.item = Item::Letter(map(a));
            }
        }
    }

    /// The letter a right-hand side consists of, if it is a single letter.
    pub(crate) fn single_letter(&self, rule: RuleId) -> Option<LetterId> {
        let first = self.first(rule)?;
        let node = &self.words.nodes[first];
        if self.words.next(first).is_none() && node.run == 1 {
            node.item.letter()
        } else {
            None
        }
    }

    /// Right-hand side split into letter groups and rule references.
    pub(crate) fn groups(&self, rule: RuleId) -> Vec<Group> {
        let mut groups: Vec<Group> = Vec::new();
        let mut current = self.first(rule);
        while let Some(key) = current {
            let node = &self.words.nodes[key];
            match node.item {
                Item::Letter(a) => {
                    let extended = match groups.last_mut() {
                        Some(Group::Letters { letter, count }) if *letter == a => {
                            *count = count.saturating_add(node.run);
                            true
                        }
                        _ => false,
                    };
                    if !extended {
                        groups.push(Group::Letters {
                            letter: a,
                            count: node.run,
                        });
                    }
                }
                Item::RuleRef(r) => groups.push(Group::Rule(r)),
                Item::RuleHead | Item::RuleTail => {}
            }
            current = self.words.next(key);
        }
        groups
    }

    /// First and last letter of the word of every non-empty rule.
    pub(crate) fn boundary_letters(&self) -> HashMap<RuleId, (LetterId, LetterId)> {
        let mut ends: HashMap<RuleId, (LetterId, LetterId)> = HashMap::default();
        for rule in self.bottom_up() {
            let resolve = |key: Option<DefaultKey>, pick_last: bool| -> Option<LetterId> {
                match self.item(key?) {
                    Item::Letter(a) => Some(a),
                    Item::RuleRef(r) => ends.get(&r).map(|e| if pick_last { e.1 } else { e.0 }),
                    _ => None,
                }
            };
            let first = resolve(self.first(rule), false);
            let last = resolve(self.last(rule), true);
            if let (Some(first), Some(last)) = (first, last) {
                ends.insert(rule, (first, last));
            }
        }
        ends
    }

    /// Summed weight of every rule's word, or `None` if some sum does not
    /// fit in an `i128`.
    pub(crate) fn lengths<W: Fn(LetterId) -> i128>(&self, weight: W) -> Option<HashMap<RuleId, i128>> {
        let mut lengths: HashMap<RuleId, i128> = HashMap::default();
        for rule in self.bottom_up() {
            let mut total = 0i128;
            for key in self.keys(rule) {
                let node = &self.words.nodes[key];
                let part = match node.item {
                    Item::Letter(a) => weight(a).checked_mul(i128::from(node.run))?,
                    Item::RuleRef(r) => lengths.get(&r).copied().unwrap_or(0),
                    _ => 0,
                };
                total = total.checked_add(part)?;
            }
            lengths.insert(rule, total);
        }
        Some(lengths)
    }

    /// How many times each rule occurs in the derivation trees of the roots.
    pub(crate) fn occurrence_counts(&self) -> HashMap<RuleId, u64> {
        let mut counts: HashMap<RuleId, u64> = HashMap::default();
        for &root in &self.roots {
            *counts.entry(root).or_default() += 1;
        }
        for rule in self.top_down() {
            let count = counts.get(&rule).copied().unwrap_or(0);
            for key in self.keys(rule) {
                if let Item::RuleRef(child) = self.item(key) {
                    let entry = counts.entry(child).or_default();
                    *entry = entry.saturating_add(count);
                }
            }
        }
        counts
    }

    /// Fully expanded word of a rule, runs included. Only for small grammars.
    #[cfg(test)]
    pub(crate) fn expand(&self, rule: RuleId) -> Vec<LetterId> {
        let mut out = Vec::new();
        for key in self.keys(rule) {
            let node = &self.words.nodes[key];
            match node.item {
                Item::Letter(a) => out.extend(std::iter::repeat(a).take(node.run as usize)),
                Item::RuleRef(r) => out.extend(self.expand(r)),
                _ => {}
            }
        }
        out
    }
}
