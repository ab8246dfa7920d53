/// Monotonic id generator.
///
/// Ids are never reused: a grammar instance owns exactly one generator per
/// symbol class, so ids stay unique for the lifetime of that instance.
#[derive(Debug, Clone, Default)]
pub(crate) struct IdGenerator {
    next: u32,
}

impl IdGenerator {
    /// Creates a generator starting from ID 0.
    pub(crate) fn new() -> Self {
        Self { next: 0 }
    }

    /// Creates a generator whose first id is `next`.
    pub(crate) fn starting_at(next: u32) -> Self {
        Self { next }
    }

    /// Returns a fresh id.
    pub(crate) fn get(&mut self) -> u32 {
        let id = self.next;
        self.next = self
            .next
            .checked_add(1)
            .expect("symbol id space exhausted");
        id
    }
}
