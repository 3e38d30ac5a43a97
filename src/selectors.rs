//! The per-thread memoized selector graph.
//!
//! One [`ThreadSelectors`] is built per thread index at profile load time
//! and lives for the rest of the session, so cached derived views survive
//! thread switches. Each getter evaluates its upstream getters first and
//! then consults its own cache node; a node recomputes only when an upstream
//! value changed by identity.

use std::rc::Rc;

use log::trace;

use crate::cached_node::CachedNode;
use crate::call_tree::CallTree;
use crate::func_stack::{FuncPath, FuncStackIndex, FuncStackInfo};
use crate::markers::{
    filter_tracing_markers_to_range, get_jank_instances, get_tracing_markers, JankInstance,
    TracingMarker, JANK_THRESHOLD_MS,
};
use crate::session::SessionState;
use crate::stack_timing::{
    compute_func_stack_max_depth, get_leaf_category_stack_timing, get_stack_timing_by_depth,
    LeafCategoryTimingRow, StackTimingRow,
};
use crate::thread::Thread;
use crate::thread_filters::{
    collapse_platform_stack_frames, filter_thread_to_call_tree_filters, filter_thread_to_js_only,
    filter_thread_to_range, filter_thread_to_search_string, invert_call_stack, CallTreeFilter,
};

pub struct ThreadSelectors {
    thread_index: usize,
    range_filtered_thread: CachedNode<(Rc<Thread>, f64, f64), Thread>,
    call_tree_filtered_thread: CachedNode<(Rc<Thread>, Rc<Vec<CallTreeFilter>>), Thread>,
    filtered_thread: CachedNode<(Rc<Thread>, bool, Rc<str>, bool), Thread>,
    selection_filtered_thread: CachedNode<(Rc<Thread>, f64, f64), Thread>,
    func_stack_info: CachedNode<Rc<Thread>, FuncStackInfo>,
    selected_func_stack: CachedNode<(Rc<FuncStackInfo>, Rc<FuncPath>), Option<FuncStackIndex>>,
    call_tree: CachedNode<(Rc<Thread>, Rc<FuncStackInfo>, f64, bool), CallTree>,
    jank_instances: CachedNode<Rc<Thread>, Vec<JankInstance>>,
    tracing_markers: CachedNode<Rc<Thread>, Vec<TracingMarker>>,
    selection_tracing_markers:
        CachedNode<(Rc<Vec<TracingMarker>>, f64, f64), Vec<TracingMarker>>,
    flame_chart_thread: CachedNode<(Rc<Thread>, bool, Rc<str>, bool), Thread>,
    flame_chart_func_stack_info: CachedNode<Rc<Thread>, FuncStackInfo>,
    flame_chart_max_depth: CachedNode<(Rc<Thread>, Rc<FuncStackInfo>), usize>,
    stack_timing_by_depth:
        CachedNode<(Rc<Thread>, Rc<FuncStackInfo>, usize, f64), Vec<StackTimingRow>>,
    leaf_category_timing: CachedNode<(Rc<Thread>, f64), LeafCategoryTimingRow>,
}

impl ThreadSelectors {
    pub(crate) fn new(thread_index: usize) -> Self {
        ThreadSelectors {
            thread_index,
            range_filtered_thread: CachedNode::new(),
            call_tree_filtered_thread: CachedNode::new(),
            filtered_thread: CachedNode::new(),
            selection_filtered_thread: CachedNode::new(),
            func_stack_info: CachedNode::new(),
            selected_func_stack: CachedNode::new(),
            call_tree: CachedNode::new(),
            jank_instances: CachedNode::new(),
            tracing_markers: CachedNode::new(),
            selection_tracing_markers: CachedNode::new(),
            flame_chart_thread: CachedNode::new(),
            flame_chart_func_stack_info: CachedNode::new(),
            flame_chart_max_depth: CachedNode::new(),
            stack_timing_by_depth: CachedNode::new(),
            leaf_category_timing: CachedNode::new(),
        }
    }

    fn raw_thread(&self, state: &SessionState) -> Rc<Thread> {
        Rc::clone(&state.threads[self.thread_index])
    }

    /// The thread restricted to the display range.
    pub fn range_filtered_thread(&mut self, state: &SessionState) -> Rc<Thread> {
        let thread = self.raw_thread(state);
        let (start, end) = state.display_range;
        let thread_index = self.thread_index;
        self.range_filtered_thread
            .get_or_compute((thread, start, end), |(thread, start, end)| {
                trace!("recomputing range filtered thread {thread_index}");
                filter_thread_to_range(thread, *start, *end)
            })
    }

    fn call_tree_filtered_thread(&mut self, state: &SessionState) -> Rc<Thread> {
        let thread = self.range_filtered_thread(state);
        let filters = Rc::clone(&state.call_tree_filters[self.thread_index]);
        self.call_tree_filtered_thread
            .get_or_compute((thread, filters), |(thread, filters)| {
                filter_thread_to_call_tree_filters(thread, filters)
            })
    }

    /// The fully filtered thread: range, call tree filters, JS-only, search
    /// string and inversion, in pipeline order.
    pub fn filtered_thread(&mut self, state: &SessionState) -> Rc<Thread> {
        let thread = self.call_tree_filtered_thread(state);
        let inputs = (
            thread,
            state.js_only,
            Rc::clone(&state.search_string),
            state.invert_call_stack,
        );
        let thread_index = self.thread_index;
        self.filtered_thread
            .get_or_compute(inputs, |(thread, js_only, search_string, invert)| {
                trace!("recomputing filtered thread {thread_index}");
                let mut current = (**thread).clone();
                if *js_only {
                    current = filter_thread_to_js_only(&current);
                }
                if !search_string.is_empty() {
                    current = filter_thread_to_search_string(&current, search_string);
                }
                if *invert {
                    current = invert_call_stack(&current);
                }
                current
            })
    }

    /// The filtered thread further restricted to the active time-range
    /// selection. Without an active selection this is the filtered thread
    /// itself, same reference.
    pub fn selection_filtered_thread(&mut self, state: &SessionState) -> Rc<Thread> {
        let filtered = self.filtered_thread(state);
        match state.selection.active_range() {
            None => filtered,
            Some((start, end)) => self
                .selection_filtered_thread
                .get_or_compute((filtered, start, end), |(thread, start, end)| {
                    filter_thread_to_range(thread, *start, *end)
                }),
        }
    }

    /// The func stack index of the (selection-)filtered thread.
    pub fn func_stack_info(&mut self, state: &SessionState) -> Rc<FuncStackInfo> {
        let thread = self.selection_filtered_thread(state);
        self.func_stack_info
            .get_or_compute(thread, |thread| FuncStackInfo::compute(thread))
    }

    /// Resolves the persisted selection path against the current func stack
    /// tree. `None` when the selected calls no longer exist after filtering.
    pub fn selected_func_stack(
        &mut self,
        state: &SessionState,
        selected_path: Rc<FuncPath>,
    ) -> Option<FuncStackIndex> {
        let info = self.func_stack_info(state);
        *self
            .selected_func_stack
            .get_or_compute((info, selected_path), |(info, path)| {
                info.func_stack_for_func_path(path)
            })
    }

    pub fn call_tree(&mut self, state: &SessionState) -> Rc<CallTree> {
        let thread = self.selection_filtered_thread(state);
        let info = self.func_stack_info(state);
        let inputs = (thread, info, state.interval, state.js_only);
        let thread_index = self.thread_index;
        self.call_tree
            .get_or_compute(inputs, |(thread, info, interval, js_only)| {
                trace!("recomputing call tree for thread {thread_index}");
                CallTree::compute(thread, info, *interval, *js_only)
            })
    }

    /// Jank instances within the display range, at the fixed 50ms threshold.
    pub fn jank_instances(&mut self, state: &SessionState) -> Rc<Vec<JankInstance>> {
        let thread = self.range_filtered_thread(state);
        self.jank_instances
            .get_or_compute(thread, |thread| {
                get_jank_instances(thread, JANK_THRESHOLD_MS)
            })
    }

    /// Paired tracing markers within the display range.
    pub fn tracing_markers(&mut self, state: &SessionState) -> Rc<Vec<TracingMarker>> {
        let thread = self.range_filtered_thread(state);
        self.tracing_markers
            .get_or_compute(thread, |thread| get_tracing_markers(thread))
    }

    /// Tracing markers further restricted to the active selection.
    pub fn selection_filtered_tracing_markers(
        &mut self,
        state: &SessionState,
    ) -> Rc<Vec<TracingMarker>> {
        let markers = self.tracing_markers(state);
        match state.selection.active_range() {
            None => markers,
            Some((start, end)) => self.selection_tracing_markers.get_or_compute(
                (markers, start, end),
                |(markers, start, end)| filter_tracing_markers_to_range(markers, *start, *end),
            ),
        }
    }

    /// The flame chart's variant of the filtered thread: like
    /// [`ThreadSelectors::filtered_thread`] but with platform-detail
    /// collapsing in place of the JS-only filter.
    pub fn flame_chart_thread(&mut self, state: &SessionState) -> Rc<Thread> {
        let thread = self.call_tree_filtered_thread(state);
        let inputs = (
            thread,
            state.hide_platform_details,
            Rc::clone(&state.search_string),
            state.invert_call_stack,
        );
        self.flame_chart_thread.get_or_compute(
            inputs,
            |(thread, hide_platform_details, search_string, invert)| {
                let mut current = (**thread).clone();
                if *hide_platform_details {
                    current = collapse_platform_stack_frames(&current);
                }
                if !search_string.is_empty() {
                    current = filter_thread_to_search_string(&current, search_string);
                }
                if *invert {
                    current = invert_call_stack(&current);
                }
                current
            },
        )
    }

    pub fn flame_chart_func_stack_info(&mut self, state: &SessionState) -> Rc<FuncStackInfo> {
        let thread = self.flame_chart_thread(state);
        self.flame_chart_func_stack_info
            .get_or_compute(thread, |thread| FuncStackInfo::compute(thread))
    }

    /// The greatest func stack depth touched by any sample in the flame
    /// chart thread.
    pub fn flame_chart_max_depth(&mut self, state: &SessionState) -> usize {
        let thread = self.flame_chart_thread(state);
        let info = self.flame_chart_func_stack_info(state);
        *self
            .flame_chart_max_depth
            .get_or_compute((thread, info), |(thread, info)| {
                compute_func_stack_max_depth(thread, info)
            })
    }

    pub fn stack_timing_by_depth(&mut self, state: &SessionState) -> Rc<Vec<StackTimingRow>> {
        let thread = self.flame_chart_thread(state);
        let info = self.flame_chart_func_stack_info(state);
        let max_depth = self.flame_chart_max_depth(state);
        let inputs = (thread, info, max_depth, state.interval);
        let thread_index = self.thread_index;
        self.stack_timing_by_depth
            .get_or_compute(inputs, |(thread, info, max_depth, interval)| {
                trace!("recomputing stack timing for thread {thread_index}");
                get_stack_timing_by_depth(thread, info, *max_depth, *interval)
            })
    }

    /// The category-colored overview row of the flame chart.
    pub fn leaf_category_timing(&mut self, state: &SessionState) -> Rc<LeafCategoryTimingRow> {
        let thread = self.flame_chart_thread(state);
        self.leaf_category_timing
            .get_or_compute((thread, state.interval), |(thread, interval)| {
                get_leaf_category_stack_timing(thread, *interval)
            })
    }
}

/// The indirection through "the currently selected thread".
///
/// Its single dependency is the selected thread index; it forwards every
/// query to the indexed [`ThreadSelectors`] entry. Because the per-thread
/// nodes are retained, switching back to a previously viewed thread serves
/// its derived views from cache.
#[derive(Debug, Default)]
pub struct SelectedThreadSelectors {
    last_index: Option<usize>,
}

impl SelectedThreadSelectors {
    pub(crate) fn delegate_index(&mut self, selected_thread_index: usize) -> usize {
        if self.last_index != Some(selected_thread_index) {
            trace!("selected thread is now {selected_thread_index}");
            self.last_index = Some(selected_thread_index);
        }
        selected_thread_index
    }
}
