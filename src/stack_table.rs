use serde_derive::{Deserialize, Serialize};

use crate::category::CategoryHandle;
use crate::fast_hash_map::FastHashMap;

/// The stack nodes of a thread, in columnar form. Each row is one call stack
/// node: a frame plus a prefix row (the caller's stack node, or `None` for a
/// root). Rows are in dependency order; a row's prefix always has a smaller
/// row index than the row itself.
///
/// Row ids are only meaningful within one table instance. Filter stages
/// rebuild this table and renumber rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTable {
    pub(crate) prefix: Vec<Option<usize>>,
    pub(crate) frame: Vec<usize>,
    pub(crate) category: Vec<CategoryHandle>,

    // (prefix, frame) -> stack index
    #[serde(skip)]
    index: FastHashMap<(Option<usize>, usize), usize>,
}

impl StackTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Looks up or creates the stack node for `(prefix, frame)`.
    pub fn index_for_stack(
        &mut self,
        prefix: Option<usize>,
        frame: usize,
        category: CategoryHandle,
    ) -> usize {
        match self.index.get(&(prefix, frame)) {
            Some(stack) => *stack,
            None => {
                let stack = self.prefix.len();
                self.prefix.push(prefix);
                self.frame.push(frame);
                self.category.push(category);
                self.index.insert((prefix, frame), stack);
                stack
            }
        }
    }

    pub fn prefix(&self, stack: usize) -> Option<usize> {
        self.prefix[stack]
    }

    pub fn frame(&self, stack: usize) -> usize {
        self.frame[stack]
    }

    pub fn category(&self, stack: usize) -> CategoryHandle {
        self.category[stack]
    }

    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }
}

impl PartialEq for StackTable {
    fn eq(&self, other: &Self) -> bool {
        // The interning index is an implementation detail; two tables are the
        // same table if their columns are the same.
        self.prefix == other.prefix
            && self.frame == other.frame
            && self.category == other.category
    }
}
