use slotmap::{DefaultKey, SlotMap};

/// Id of a letter in the engine's letter table.
pub(crate) type LetterId = u32;

/// Id of a rule in the engine's grammar.
pub(crate) type RuleId = u32;

/// What a word node holds.
///
/// Every word is framed by a `RuleHead` and a `RuleTail` sentinel so that
/// splicing never needs to special-case the ends of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Item {
    /// `run` consecutive copies of a letter.
    Letter(LetterId),

    /// A reference to another rule.
    RuleRef(RuleId),

    /// Sentinel before the first symbol.
    RuleHead,

    /// Sentinel after the last symbol.
    RuleTail,
}

impl Item {
    pub(crate) fn is_sentinel(&self) -> bool {
        matches!(self, Item::RuleHead | Item::RuleTail)
    }

    pub(crate) fn letter(&self) -> Option<LetterId> {
        match self {
            Item::Letter(a) => Some(*a),
            _ => None,
        }
    }

    pub(crate) fn rule(&self) -> Option<RuleId> {
        match self {
            Item::RuleRef(r) => Some(*r),
            _ => None,
        }
    }
}

/// A node in the doubly-linked list of a right-hand side.
#[derive(Debug)]
pub(crate) struct WordNode {
    pub item: Item,
    /// Number of consecutive copies (always 1 for rule references).
    pub run: u64,
    /// Rule whose right-hand side contains the node.
    pub owner: RuleId,
    pub prev: Option<DefaultKey>,
    pub next: Option<DefaultKey>,
}

impl WordNode {
    fn new(item: Item, run: u64, owner: RuleId) -> Self {
        Self {
            item,
            run,
            owner,
            prev: None,
            next: None,
        }
    }
}

/// Arena holding the right-hand sides of all rules.
///
/// Nodes are addressed by generational keys, so a key held in the occurrence
/// index simply stops resolving once its node is removed. All structural edits
/// are O(1).
#[derive(Debug, Default)]
pub(crate) struct Words {
    pub nodes: SlotMap<DefaultKey, WordNode>,
}

impl Words {
    /// Creates an empty word for `owner` and returns its `(head, tail)`.
    pub(crate) fn new_word(&mut self, owner: RuleId) -> (DefaultKey, DefaultKey) {
        let tail = self
            .nodes
            .insert(WordNode::new(Item::RuleTail, 0, owner));
        let head = self
            .nodes
            .insert(WordNode::new(Item::RuleHead, 0, owner));
        self.nodes[head].next = Some(tail);
        self.nodes[tail].prev = Some(head);
        (head, tail)
    }

    /// Inserts a node right after `at` and returns its key.
    pub(crate) fn insert_after(&mut self, at: DefaultKey, item: Item, run: u64) -> DefaultKey {
        debug_assert!(
            !matches!(self.nodes[at].item, Item::RuleTail),
            "Cannot insert after a RuleTail"
        );
        let owner = self.nodes[at].owner;
        let key = self.nodes.insert(WordNode::new(item, run, owner));
        let after = self.nodes[at].next;

        self.nodes[key].prev = Some(at);
        self.nodes[key].next = after;
        self.nodes[at].next = Some(key);
        if let Some(after) = after {
            self.nodes[after].prev = Some(key);
        }
        key
    }

    /// Inserts a node right before `at` and returns its key.
    pub(crate) fn insert_before(&mut self, at: DefaultKey, item: Item, run: u64) -> DefaultKey {
        let prev = self.nodes[at]
            .prev
            .expect("Cannot insert before a RuleHead");
        self.insert_after(prev, item, run)
    }

    /// Unlinks and removes a node.
    pub(crate) fn remove(&mut self, key: DefaultKey) -> WordNode {
        debug_assert!(
            !self.nodes[key].item.is_sentinel(),
            "Sentinels are only removed together with their word"
        );
        let prev = self.nodes[key].prev;
        let next = self.nodes[key].next;
        if let Some(prev) = prev {
            self.nodes[prev].next = next;
        }
        if let Some(next) = next {
            self.nodes[next].prev = prev;
        }
        self.nodes.remove(key).expect("node must exist")
    }

    /// First symbol after `head`, if the word is not empty.
    pub(crate) fn first(&self, head: DefaultKey) -> Option<DefaultKey> {
        self.next(head)
    }

    /// Last symbol before `tail`, if the word is not empty.
    pub(crate) fn last(&self, tail: DefaultKey) -> Option<DefaultKey> {
        self.prev(tail)
    }

    /// Next symbol in the same word, stopping at the tail sentinel.
    pub(crate) fn next(&self, key: DefaultKey) -> Option<DefaultKey> {
        let next = self.nodes[key].next?;
        if self.nodes[next].item.is_sentinel() {
            None
        } else {
            Some(next)
        }
    }

    /// Previous symbol in the same word, stopping at the head sentinel.
    pub(crate) fn prev(&self, key: DefaultKey) -> Option<DefaultKey> {
        let prev = self.nodes[key].prev?;
        if self.nodes[prev].item.is_sentinel() {
            None
        } else {
            Some(prev)
        }
    }

    pub(crate) fn is_empty(&self, head: DefaultKey) -> bool {
        self.first(head).is_none()
    }

    /// Keys of all symbols of the word, left to right.
    pub(crate) fn keys(&self, head: DefaultKey) -> Vec<DefaultKey> {
        let mut keys = Vec::new();
        let mut current = self.first(head);
        while let Some(key) = current {
            keys.push(key);
            current = self.next(key);
        }
        keys
    }

    /// Removes leading nodes while `pred` holds and returns the summed
    /// `weight` of what was removed.
    pub(crate) fn delete_prefix_while<P, W>(
        &mut self,
        head: DefaultKey,
        mut pred: P,
        mut weight: W,
    ) -> u64
    where
        P: FnMut(&WordNode) -> bool,
        W: FnMut(&WordNode) -> u64,
    {
        let mut total = 0;
        while let Some(key) = self.first(head) {
            if !pred(&self.nodes[key]) {
                break;
            }
            total += weight(&self.nodes[key]);
            self.remove(key);
        }
        total
    }

    /// Mirror image of [`Words::delete_prefix_while`].
    pub(crate) fn delete_suffix_while<P, W>(
        &mut self,
        tail: DefaultKey,
        mut pred: P,
        mut weight: W,
    ) -> u64
    where
        P: FnMut(&WordNode) -> bool,
        W: FnMut(&WordNode) -> u64,
    {
        let mut total = 0;
        while let Some(key) = self.last(tail) {
            if !pred(&self.nodes[key]) {
                break;
            }
            total += weight(&self.nodes[key]);
            self.remove(key);
        }
        total
    }

    /// Splits the word at every node matching `is_separator`.
    ///
    /// Returns the maximal non-empty segments between separators; the
    /// separators themselves are not part of any segment.
    pub(crate) fn split<P>(&self, head: DefaultKey, mut is_separator: P) -> Vec<Vec<DefaultKey>>
    where
        P: FnMut(&WordNode) -> bool,
    {
        let mut segments = Vec::new();
        let mut segment = Vec::new();
        let mut current = self.first(head);
        while let Some(key) = current {
            if is_separator(&self.nodes[key]) {
                if !segment.is_empty() {
                    segments.push(std::mem::take(&mut segment));
                }
            } else {
                segment.push(key);
            }
            current = self.next(key);
        }
        if !segment.is_empty() {
            segments.push(segment);
        }
        segments
    }

    /// Detaches one copy from the front of a run node, leaving `run - 1`
    /// copies in place, and returns the key of the detached single copy.
    pub(crate) fn split_run_front(&mut self, key: DefaultKey) -> DefaultKey {
        let run = self.nodes[key].run;
        if run <= 1 {
            return key;
        }
        let item = self.nodes[key].item;
        self.nodes[key].run = run - 1;
        self.insert_before(key, item, 1)
    }

    /// Detaches one copy from the back of a run node.
    pub(crate) fn split_run_back(&mut self, key: DefaultKey) -> DefaultKey {
        let run = self.nodes[key].run;
        if run <= 1 {
            return key;
        }
        let item = self.nodes[key].item;
        self.nodes[key].run = run - 1;
        self.insert_after(key, item, 1)
    }

    /// Removes a whole word including its sentinels.
    pub(crate) fn free_word(&mut self, head: DefaultKey) -> Vec<WordNode> {
        let mut removed = Vec::new();
        let mut current = Some(head);
        while let Some(key) = current {
            current = self.nodes[key].next;
            if let Some(node) = self.nodes.remove(key) {
                removed.push(node);
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(words: &Words, head: DefaultKey) -> Vec<(LetterId, u64)> {
        words
            .keys(head)
            .into_iter()
            .filter_map(|k| words.nodes[k].item.letter().map(|a| (a, words.nodes[k].run)))
            .collect()
    }

    fn build(words: &mut Words, content: &[(LetterId, u64)]) -> (DefaultKey, DefaultKey) {
        let (head, tail) = words.new_word(0);
        for &(a, run) in content {
            words.insert_before(tail, Item::Letter(a), run);
        }
        (head, tail)
    }

    #[test]
    fn test_new_word_is_empty() {
        let mut words = Words::default();
        let (head, tail) = words.new_word(7);
        assert!(words.is_empty(head));
        assert_eq!(words.first(head), None);
        assert_eq!(words.last(tail), None);
        assert_eq!(words.nodes[head].owner, 7);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut words = Words::default();
        let (head, tail) = build(&mut words, &[(1, 1), (3, 1)]);
        let first = words.first(head).unwrap();
        let middle = words.insert_after(first, Item::Letter(2), 1);
        assert_eq!(letters(&words, head), vec![(1, 1), (2, 1), (3, 1)]);
        assert_eq!(words.nodes[middle].owner, 0);

        words.insert_before(first, Item::Letter(0), 2);
        assert_eq!(letters(&words, head), vec![(0, 2), (1, 1), (2, 1), (3, 1)]);

        words.remove(middle);
        assert_eq!(letters(&words, head), vec![(0, 2), (1, 1), (3, 1)]);
        assert_eq!(words.nodes[words.last(tail).unwrap()].item, Item::Letter(3));
    }

    #[test]
    fn test_delete_prefix_and_suffix_while() {
        let mut words = Words::default();
        let (head, tail) = build(&mut words, &[(1, 2), (1, 3), (2, 1), (4, 1), (4, 4)]);

        let removed = words.delete_prefix_while(
            head,
            |n| n.item == Item::Letter(1),
            |n| n.run,
        );
        assert_eq!(removed, 5);

        let removed = words.delete_suffix_while(
            tail,
            |n| n.item == Item::Letter(4),
            |n| n.run,
        );
        assert_eq!(removed, 5);
        assert_eq!(letters(&words, head), vec![(2, 1)]);
    }

    #[test]
    fn test_delete_prefix_can_empty_word() {
        let mut words = Words::default();
        let (head, _) = build(&mut words, &[(1, 1), (1, 1)]);
        let removed = words.delete_prefix_while(head, |_| true, |n| n.run);
        assert_eq!(removed, 2);
        assert!(words.is_empty(head));
    }

    #[test]
    fn test_split_on_separators() {
        let mut words = Words::default();
        let (head, tail) = build(&mut words, &[(1, 1), (2, 1)]);
        words.insert_before(tail, Item::RuleRef(5), 1);
        words.insert_before(tail, Item::Letter(3), 1);
        words.insert_before(tail, Item::RuleRef(6), 1);

        let segments = words.split(head, |n| n.item.rule().is_some());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 2);
        assert_eq!(segments[1].len(), 1);
    }

    #[test]
    fn test_split_runs() {
        let mut words = Words::default();
        let (head, _) = build(&mut words, &[(1, 3)]);
        let key = words.first(head).unwrap();
        let front = words.split_run_front(key);
        let back = words.split_run_back(key);
        assert_ne!(front, key);
        assert_ne!(back, key);
        assert_eq!(letters(&words, head), vec![(1, 1), (1, 1), (1, 1)]);
    }

    #[test]
    fn test_free_word_removes_everything() {
        let mut words = Words::default();
        let (head, _) = build(&mut words, &[(1, 1), (2, 2)]);
        let removed = words.free_word(head);
        assert_eq!(removed.len(), 4);
        assert!(words.nodes.is_empty());
    }
}
