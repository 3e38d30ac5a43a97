use serde_derive::{Deserialize, Serialize};

use crate::fast_hash_map::FastHashMap;
use crate::func_table::FuncIndex;
use crate::thread::Thread;

/// Index into a [`FuncStackTable`].
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncStackIndex(pub usize);

/// A path of function ids from the root to a node.
///
/// This is the stable, filter-independent way of addressing a call tree
/// node: raw stack and func stack row ids are invalidated by filtering, but
/// function identity is not. Persisted selections are stored as func paths.
pub type FuncPath = Vec<FuncIndex>;

/// The deduplicated tree of "func stacks". Multiple raw stack rows collapse
/// into one func stack when they share the same function-id path (for
/// example recursion through different frame addresses of one function).
///
/// Rows are in topological order: a row's prefix always has a smaller index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuncStackTable {
    pub(crate) prefix: Vec<Option<FuncStackIndex>>,
    pub(crate) func: Vec<FuncIndex>,
    pub(crate) depth: Vec<usize>,
}

impl FuncStackTable {
    pub fn prefix(&self, func_stack: FuncStackIndex) -> Option<FuncStackIndex> {
        self.prefix[func_stack.0]
    }

    pub fn func(&self, func_stack: FuncStackIndex) -> FuncIndex {
        self.func[func_stack.0]
    }

    pub fn depth(&self, func_stack: FuncStackIndex) -> usize {
        self.depth[func_stack.0]
    }

    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }
}

/// The func stack tree of one filtered thread, plus the mapping from that
/// thread's stack table rows to func stacks.
///
/// This index must be rebuilt whenever the filtered thread changes; stack
/// row ids are not comparable across filter stages.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncStackInfo {
    pub func_stack_table: FuncStackTable,
    /// For each stack table row, the func stack it maps to.
    pub stack_index_to_func_stack_index: Vec<FuncStackIndex>,
}

impl FuncStackInfo {
    /// Walks the thread's stack table in dependency order and builds the
    /// deduplicated func stack tree.
    pub fn compute(thread: &Thread) -> Self {
        let stack_table = thread.stack_table();
        let mut func_stack_table = FuncStackTable::default();
        let mut stack_index_to_func_stack_index = Vec::with_capacity(stack_table.len());
        let mut index: FastHashMap<(Option<FuncStackIndex>, FuncIndex), FuncStackIndex> =
            FastHashMap::default();
        for stack in 0..stack_table.len() {
            // The prefix row has a smaller index, so its mapping exists.
            let prefix_func_stack =
                stack_table.prefix(stack).map(|p| stack_index_to_func_stack_index[p]);
            let func = thread.func_for_stack(stack);
            let func_stack = match index.get(&(prefix_func_stack, func)) {
                Some(func_stack) => *func_stack,
                None => {
                    let func_stack = FuncStackIndex(func_stack_table.len());
                    let depth = match prefix_func_stack {
                        Some(p) => func_stack_table.depth[p.0] + 1,
                        None => 0,
                    };
                    func_stack_table.prefix.push(prefix_func_stack);
                    func_stack_table.func.push(func);
                    func_stack_table.depth.push(depth);
                    index.insert((prefix_func_stack, func), func_stack);
                    func_stack
                }
            };
            stack_index_to_func_stack_index.push(func_stack);
        }
        FuncStackInfo {
            func_stack_table,
            stack_index_to_func_stack_index,
        }
    }

    pub fn func_stack_for_stack(&self, stack: usize) -> FuncStackIndex {
        self.stack_index_to_func_stack_index[stack]
    }

    /// Resolves a func path to the func stack it addresses, by matching
    /// function ids depth by depth from the root.
    ///
    /// Returns `None` when no matching child exists at some depth, i.e. when
    /// filtering removed the calls a persisted selection referred to. This
    /// is an ordinary outcome, not an error.
    pub fn func_stack_for_func_path(&self, func_path: &[FuncIndex]) -> Option<FuncStackIndex> {
        let table = &self.func_stack_table;
        let mut current: Option<FuncStackIndex> = None;
        for &func in func_path {
            // Children always have larger indices than their prefix, so the
            // search can start just past the current node.
            let search_start = current.map_or(0, |fs| fs.0 + 1);
            let next = (search_start..table.len()).find(|&fs| {
                table.prefix[fs] == current && table.func[fs] == func
            });
            current = match next {
                Some(fs) => Some(FuncStackIndex(fs)),
                None => return None,
            };
        }
        current
    }

    /// The func path for a func stack, root first. Inverse of
    /// [`FuncStackInfo::func_stack_for_func_path`].
    pub fn func_path_for_func_stack(&self, func_stack: FuncStackIndex) -> FuncPath {
        let table = &self.func_stack_table;
        let mut func_path = Vec::with_capacity(table.depth[func_stack.0] + 1);
        let mut current = Some(func_stack);
        while let Some(fs) = current {
            func_path.push(table.func[fs.0]);
            current = table.prefix[fs.0];
        }
        func_path.reverse();
        func_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryHandle;
    use crate::func_table::FuncFlags;

    fn thread_with_ab_ab_ac() -> (Thread, FuncIndex, FuncIndex, FuncIndex) {
        let mut thread = Thread::new("Main", 1, 1);
        let func_a = thread.add_func("A", FuncFlags::empty());
        let func_b = thread.add_func("B", FuncFlags::empty());
        let func_c = thread.add_func("C", FuncFlags::empty());
        let frame_a = thread.add_frame(func_a, None);
        let frame_b = thread.add_frame(func_b, None);
        let frame_c = thread.add_frame(func_c, None);
        let stack_a = thread.add_stack(None, frame_a, CategoryHandle::OTHER);
        let stack_ab = thread.add_stack(Some(stack_a), frame_b, CategoryHandle::OTHER);
        let stack_ac = thread.add_stack(Some(stack_a), frame_c, CategoryHandle::OTHER);
        thread.add_sample(Some(stack_ab), 0.0, 0.0);
        thread.add_sample(Some(stack_ab), 1.0, 0.0);
        thread.add_sample(Some(stack_ac), 2.0, 0.0);
        (thread, func_a, func_b, func_c)
    }

    #[test]
    fn shared_prefixes_collapse() {
        let (thread, func_a, func_b, func_c) = thread_with_ab_ab_ac();
        let info = FuncStackInfo::compute(&thread);
        let table = &info.func_stack_table;
        // Root A, A -> B, A -> C.
        assert_eq!(table.len(), 3);
        assert_eq!(table.func, vec![func_a, func_b, func_c]);
        assert_eq!(
            table.prefix,
            vec![None, Some(FuncStackIndex(0)), Some(FuncStackIndex(0))]
        );
        assert_eq!(table.depth, vec![0, 1, 1]);
    }

    #[test]
    fn paths_resolve_and_invert() {
        let (thread, func_a, func_b, func_c) = thread_with_ab_ab_ac();
        let info = FuncStackInfo::compute(&thread);
        let ab = info.func_stack_for_func_path(&[func_a, func_b]).unwrap();
        assert_eq!(info.func_path_for_func_stack(ab), vec![func_a, func_b]);
        assert_eq!(
            info.func_stack_for_func_path(&[func_a, func_c]),
            Some(FuncStackIndex(2))
        );
        // A path filtering has removed resolves to the sentinel, not a panic.
        assert_eq!(info.func_stack_for_func_path(&[func_b]), None);
        assert_eq!(info.func_stack_for_func_path(&[func_a, func_b, func_c]), None);
        assert_eq!(info.func_stack_for_func_path(&[]), None);
    }
}
