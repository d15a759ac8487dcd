// id.rs: Stable semantic identifiers for analysis passes
//
// These IDs provide deterministic, span-independent identity for variables
// and effective directives. Allocated in source order during resolve and
// threaded through every later pass as arena indices.

/// Stable identifier for a declared variable (the root of every reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// Stable identifier for an effective directive. A combined
/// `parallel loop` owns two of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirId(pub u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl DirId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Allocator for stable IDs. Produces monotonically increasing IDs in
/// allocation (source) order, ensuring deterministic assignment.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_var: u32,
    next_dir: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_var(&mut self) -> VarId {
        let id = VarId(self.next_var);
        self.next_var += 1;
        id
    }

    pub fn alloc_dir(&mut self) -> DirId {
        let id = DirId(self.next_dir);
        self.next_dir += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_allocation_order() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.alloc_var(), VarId(0));
        assert_eq!(ids.alloc_dir(), DirId(0));
        assert_eq!(ids.alloc_var(), VarId(1));
        assert_eq!(ids.alloc_dir().index(), 1);
    }
}
