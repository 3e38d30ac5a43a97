//! Per-thread selection and expansion state, addressed by func paths.
//!
//! Selections are stored as func paths rather than func stack ids so they
//! survive re-filtering: row ids are renumbered by every filter stage, but
//! function identity is stable. When a filter or a function merge changes
//! the addressing space, the paths are remapped here, always as a reaction
//! to the change and never the other way around.

use std::rc::Rc;

use crate::fast_hash_map::{FastHashMap, FastHashSet};
use crate::func_stack::FuncPath;
use crate::func_table::FuncIndex;
use crate::thread_filters::CallTreeFilter;

/// The selection, expansion and marker-selection state of one thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadViewOptions {
    selected_func_stack: Rc<FuncPath>,
    expanded_func_stacks: FastHashSet<FuncPath>,
    selected_marker: Option<usize>,
}

impl ThreadViewOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// The selected call path; empty means no selection.
    pub fn selected_func_stack(&self) -> &[FuncIndex] {
        &self.selected_func_stack
    }

    pub(crate) fn selected_func_stack_shared(&self) -> Rc<FuncPath> {
        Rc::clone(&self.selected_func_stack)
    }

    pub fn expanded_func_stacks(&self) -> &FastHashSet<FuncPath> {
        &self.expanded_func_stacks
    }

    pub fn selected_marker(&self) -> Option<usize> {
        self.selected_marker
    }

    /// Replaces the selection and expands every strict, non-empty ancestor
    /// prefix of the new path, so the path to the selected node is visible.
    /// Previously expanded nodes stay expanded.
    pub fn select_func_stack(&mut self, func_path: FuncPath) {
        for len in 1..func_path.len() {
            self.expanded_func_stacks.insert(func_path[..len].to_vec());
        }
        self.selected_func_stack = Rc::new(func_path);
    }

    /// Replaces the expanded set verbatim.
    pub fn set_expanded_func_stacks(&mut self, func_paths: impl IntoIterator<Item = FuncPath>) {
        self.expanded_func_stacks = func_paths.into_iter().collect();
    }

    pub fn select_marker(&mut self, marker: Option<usize>) {
        self.selected_marker = marker;
    }

    /// Remaps the selection and every expanded path for a newly added call
    /// tree filter. Prefix filters re-root the view, so paths are truncated
    /// accordingly; paths that do not survive the filter are discarded.
    /// Postfix filters leave the addressing space's root alone and remap
    /// nothing.
    pub fn apply_call_tree_filter(&mut self, filter: &CallTreeFilter) {
        match filter {
            CallTreeFilter::Prefix { func_path, .. } => {
                self.selected_func_stack =
                    Rc::new(path_remapped_through_prefix(&self.selected_func_stack, func_path));
                self.expanded_func_stacks = self
                    .expanded_func_stacks
                    .iter()
                    .map(|path| path_remapped_through_prefix(path, func_path))
                    .filter(|path| !path.is_empty())
                    .collect();
            }
            CallTreeFilter::Postfix { .. } => {}
        }
    }

    /// Remaps every function id in the selection and the expanded set
    /// through an old func -> new func mapping. Ids absent from the mapping
    /// pass through unchanged.
    pub fn remap_funcs(&mut self, old_func_to_new_func: &FastHashMap<FuncIndex, FuncIndex>) {
        let remap_path = |path: &[FuncIndex]| -> FuncPath {
            path.iter()
                .map(|func| *old_func_to_new_func.get(func).unwrap_or(func))
                .collect()
        };
        self.selected_func_stack = Rc::new(remap_path(&self.selected_func_stack));
        self.expanded_func_stacks = self
            .expanded_func_stacks
            .iter()
            .map(|path| remap_path(path))
            .collect();
    }
}

/// The path remap for a newly added prefix filter: a path that is shorter
/// than the prefix or disagrees with it at any position is discarded to the
/// empty path; a matching path drops the first `prefix.len() - 1` elements,
/// keeping the boundary function as the new root marker.
fn path_remapped_through_prefix(path: &[FuncIndex], prefix: &[FuncIndex]) -> FuncPath {
    if prefix.is_empty() {
        return path.to_vec();
    }
    if path.len() < prefix.len() || path[..prefix.len()] != *prefix {
        return Vec::new();
    }
    path[prefix.len() - 1..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(i: usize) -> FuncIndex {
        FuncIndex(i)
    }

    #[test]
    fn selecting_expands_all_strict_ancestors() {
        let mut options = ThreadViewOptions::new();
        options.select_func_stack(vec![f(1), f(2), f(3)]);
        assert_eq!(options.selected_func_stack(), &[f(1), f(2), f(3)]);
        assert!(options.expanded_func_stacks().contains(&vec![f(1)]));
        assert!(options.expanded_func_stacks().contains(&vec![f(1), f(2)]));
        assert!(!options.expanded_func_stacks().contains(&vec![f(1), f(2), f(3)]));

        // A second selection keeps the previous expansion.
        options.select_func_stack(vec![f(9), f(8)]);
        assert!(options.expanded_func_stacks().contains(&vec![f(1), f(2)]));
        assert!(options.expanded_func_stacks().contains(&vec![f(9)]));
    }

    #[test]
    fn prefix_remap_keeps_the_boundary_function() {
        // Selection [A, B, C] with prefix [A]: the boundary is A itself,
        // nothing above it existed, so the path is unchanged.
        assert_eq!(
            path_remapped_through_prefix(&[f(1), f(2), f(3)], &[f(1)]),
            vec![f(1), f(2), f(3)]
        );
        // Prefix [A, B]: drop everything above the boundary B.
        assert_eq!(
            path_remapped_through_prefix(&[f(1), f(2), f(3)], &[f(1), f(2)]),
            vec![f(2), f(3)]
        );
    }

    #[test]
    fn prefix_remap_discards_short_or_disagreeing_paths() {
        assert_eq!(path_remapped_through_prefix(&[f(1)], &[f(1), f(2)]), Vec::<FuncIndex>::new());
        assert_eq!(
            path_remapped_through_prefix(&[f(1), f(9), f(3)], &[f(1), f(2)]),
            Vec::<FuncIndex>::new()
        );
    }

    #[test]
    fn adding_a_prefix_filter_remaps_selection_and_expansion() {
        let mut options = ThreadViewOptions::new();
        options.select_func_stack(vec![f(1), f(2), f(3)]);
        options.set_expanded_func_stacks(vec![vec![f(1), f(2)], vec![f(7)]]);
        options.apply_call_tree_filter(&CallTreeFilter::Prefix {
            func_path: vec![f(1), f(2)],
            match_js_only: false,
        });
        assert_eq!(options.selected_func_stack(), &[f(2), f(3)]);
        // [1, 2] survives as the boundary-rooted [2]; [7] is discarded.
        assert_eq!(options.expanded_func_stacks().len(), 1);
        assert!(options.expanded_func_stacks().contains(&vec![f(2)]));
    }

    #[test]
    fn postfix_filters_do_not_touch_paths() {
        let mut options = ThreadViewOptions::new();
        options.select_func_stack(vec![f(1), f(2)]);
        options.apply_call_tree_filter(&CallTreeFilter::Postfix {
            func_path: vec![f(2)],
            match_js_only: false,
        });
        assert_eq!(options.selected_func_stack(), &[f(1), f(2)]);
    }

    #[test]
    fn func_merge_remaps_with_tolerant_passthrough() {
        let mut options = ThreadViewOptions::new();
        options.select_func_stack(vec![f(1), f(2), f(3)]);
        let mut mapping = FastHashMap::default();
        mapping.insert(f(2), f(9));
        options.remap_funcs(&mapping);
        // 2 is remapped; 1 and 3 are absent from the mapping and pass
        // through unchanged.
        assert_eq!(options.selected_func_stack(), &[f(1), f(9), f(3)]);
        assert!(options.expanded_func_stacks().contains(&vec![f(1), f(9)]));
    }
}
