//! The analysis session: the owner of the current profile snapshot, the
//! per-thread selector sets, and the per-thread view state.
//!
//! The session is driven by [`AnalysisEvent`]s delivered by an external
//! state container, one per logical user or system action, and answers
//! queries for derived views. All inputs are immutable snapshots; state
//! changes replace whole values (a thread's `Rc`, a filter list's `Rc`), so
//! downstream cache nodes see them as identity changes.

use std::rc::Rc;

use debugid::DebugId;
use log::{debug, warn};

use crate::call_tree::CallTree;
use crate::fast_hash_map::{FastHashMap, FastIndexSet};
use crate::func_stack::{FuncPath, FuncStackIndex, FuncStackInfo};
use crate::func_table::FuncIndex;
use crate::markers::{JankInstance, TracingMarker};
use crate::profile::Profile;
use crate::selectors::{SelectedThreadSelectors, ThreadSelectors};
use crate::stack_timing::{LeafCategoryTimingRow, StackTimingRow};
use crate::thread::Thread;
use crate::thread_filters::CallTreeFilter;
use crate::view_state::ThreadViewOptions;

/// Where a loaded profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Addon,
    Web,
    File,
}

/// The progress of symbol resolution. Symbolication itself happens outside
/// this crate; the session only tracks the status it is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolicationStatus {
    NotStarted,
    Symbolicating,
    Done,
}

/// A library whose symbol table has been requested and not yet received.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestedLib {
    pub debug_name: String,
    pub breakpad_id: DebugId,
}

/// The current time-range selection, if any. While the user is dragging,
/// `is_modifying` is set and the range still filters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ProfileSelection {
    #[default]
    None,
    Range {
        start: f64,
        end: f64,
        is_modifying: bool,
    },
}

impl ProfileSelection {
    pub fn has_selection(&self) -> bool {
        matches!(self, ProfileSelection::Range { .. })
    }

    /// The range to filter by, or `None` when only the root display range is
    /// active.
    pub fn active_range(&self) -> Option<(f64, f64)> {
        match *self {
            ProfileSelection::None => None,
            ProfileSelection::Range { start, end, .. } => Some((start, end)),
        }
    }
}

/// One event delivered by the external state container.
#[derive(Debug)]
pub enum AnalysisEvent {
    ProfileLoaded {
        profile: Profile,
        source: DataSource,
    },
    /// An external rename/merge operation collapsed some function ids into
    /// others. The session redirects the thread's frame table through the
    /// mapping and remaps the thread's persisted selection paths.
    FunctionsCoalesced {
        thread_index: usize,
        old_func_to_new_func: FastHashMap<FuncIndex, FuncIndex>,
        funcs_renamed: Vec<FuncIndex>,
    },
    ThreadOrderChanged {
        thread_order: Vec<usize>,
    },
    TabOrderChanged {
        tab_order: Vec<usize>,
    },
    SymbolicationStarted,
    SymbolicationFinished,
    SelectedFuncStackChanged {
        thread_index: usize,
        func_path: FuncPath,
    },
    ExpandedFuncStacksChanged {
        thread_index: usize,
        func_paths: Vec<FuncPath>,
    },
    SelectedMarkerChanged {
        thread_index: usize,
        marker_index: Option<usize>,
    },
    CallTreeFilterAdded {
        thread_index: usize,
        filter: CallTreeFilter,
    },
    TimeRangeSelectionUpdated {
        selection: ProfileSelection,
    },
    SymbolTableRequested {
        lib: RequestedLib,
    },
    SymbolTableReceived {
        lib: RequestedLib,
    },
}

/// The immutable-snapshot inputs the selector graph reads from.
pub struct SessionState {
    pub(crate) profile: Rc<Profile>,
    pub(crate) threads: Vec<Rc<Thread>>,
    pub(crate) interval: f64,
    pub(crate) display_range: (f64, f64),
    pub(crate) selection: ProfileSelection,
    pub(crate) call_tree_filters: Vec<Rc<Vec<CallTreeFilter>>>,
    pub(crate) search_string: Rc<str>,
    pub(crate) js_only: bool,
    pub(crate) invert_call_stack: bool,
    pub(crate) hide_platform_details: bool,
    pub(crate) selected_thread_index: usize,
}

impl SessionState {
    fn empty() -> Self {
        SessionState {
            profile: Rc::new(Profile::default()),
            threads: Vec::new(),
            interval: 1.0,
            display_range: (0.0, 0.0),
            selection: ProfileSelection::None,
            call_tree_filters: Vec::new(),
            search_string: Rc::from(""),
            js_only: false,
            invert_call_stack: false,
            hide_platform_details: false,
            selected_thread_index: 0,
        }
    }
}

/// A single logical analysis session over one profile.
pub struct AnalysisSession {
    state: SessionState,
    selectors: Vec<ThreadSelectors>,
    selected: SelectedThreadSelectors,
    view_options: Vec<ThreadViewOptions>,
    thread_order: Vec<usize>,
    tab_order: Vec<usize>,
    symbolication_status: SymbolicationStatus,
    requested_libs: FastIndexSet<RequestedLib>,
}

impl AnalysisSession {
    pub fn new(profile: Profile, source: DataSource) -> Self {
        let mut session = AnalysisSession {
            state: SessionState::empty(),
            selectors: Vec::new(),
            selected: SelectedThreadSelectors::default(),
            view_options: Vec::new(),
            thread_order: Vec::new(),
            tab_order: Vec::new(),
            symbolication_status: SymbolicationStatus::NotStarted,
            requested_libs: FastIndexSet::default(),
        };
        session.load_profile(profile, source);
        session
    }

    fn load_profile(&mut self, profile: Profile, source: DataSource) {
        let thread_count = profile.threads().len();
        debug!("loading profile from {source:?} with {thread_count} threads");
        let threads: Vec<Rc<Thread>> = profile.threads().iter().cloned().map(Rc::new).collect();
        let interval = profile.interval();
        let display_range = profile.time_range();
        let profile = Rc::new(profile);
        self.thread_order = default_thread_order(profile.threads());
        self.state = SessionState {
            profile,
            threads,
            interval,
            display_range,
            selection: ProfileSelection::None,
            call_tree_filters: vec![Rc::new(Vec::new()); thread_count],
            search_string: Rc::from(""),
            js_only: false,
            invert_call_stack: false,
            hide_platform_details: false,
            selected_thread_index: 0,
        };
        // The selector table is sized to the thread count once, here; the
        // per-thread node sets then live for the rest of the session.
        self.selectors = (0..thread_count).map(ThreadSelectors::new).collect();
        self.selected = SelectedThreadSelectors::default();
        self.view_options = vec![ThreadViewOptions::new(); thread_count];
        self.tab_order = (0..thread_count).collect();
        self.symbolication_status = SymbolicationStatus::NotStarted;
        self.requested_libs.clear();
    }

    /// Applies one external event to the session state. Malformed events
    /// (an out-of-range thread index) are tolerated and logged, not errors.
    pub fn handle_event(&mut self, event: AnalysisEvent) {
        match event {
            AnalysisEvent::ProfileLoaded { profile, source } => {
                self.load_profile(profile, source);
            }
            AnalysisEvent::FunctionsCoalesced {
                thread_index,
                old_func_to_new_func,
                funcs_renamed,
            } => {
                if !self.check_thread_index(thread_index) {
                    return;
                }
                let merged = self.state.threads[thread_index].merge_functions(&old_func_to_new_func);
                self.state.threads[thread_index] = Rc::new(merged);
                self.view_options[thread_index].remap_funcs(&old_func_to_new_func);
                if !funcs_renamed.is_empty() {
                    debug!(
                        "{} funcs renamed on thread {thread_index}",
                        funcs_renamed.len()
                    );
                }
            }
            AnalysisEvent::ThreadOrderChanged { thread_order } => {
                self.thread_order = thread_order;
            }
            AnalysisEvent::TabOrderChanged { tab_order } => {
                self.tab_order = tab_order;
            }
            AnalysisEvent::SymbolicationStarted => {
                self.symbolication_status = SymbolicationStatus::Symbolicating;
            }
            AnalysisEvent::SymbolicationFinished => {
                self.symbolication_status = SymbolicationStatus::Done;
            }
            AnalysisEvent::SelectedFuncStackChanged {
                thread_index,
                func_path,
            } => {
                if !self.check_thread_index(thread_index) {
                    return;
                }
                self.view_options[thread_index].select_func_stack(func_path);
            }
            AnalysisEvent::ExpandedFuncStacksChanged {
                thread_index,
                func_paths,
            } => {
                if !self.check_thread_index(thread_index) {
                    return;
                }
                self.view_options[thread_index].set_expanded_func_stacks(func_paths);
            }
            AnalysisEvent::SelectedMarkerChanged {
                thread_index,
                marker_index,
            } => {
                if !self.check_thread_index(thread_index) {
                    return;
                }
                self.view_options[thread_index].select_marker(marker_index);
            }
            AnalysisEvent::CallTreeFilterAdded {
                thread_index,
                filter,
            } => {
                if !self.check_thread_index(thread_index) {
                    return;
                }
                // Selection state reacts to the filter change, never the
                // other way around.
                self.view_options[thread_index].apply_call_tree_filter(&filter);
                let mut filters = (*self.state.call_tree_filters[thread_index]).clone();
                filters.push(filter);
                self.state.call_tree_filters[thread_index] = Rc::new(filters);
            }
            AnalysisEvent::TimeRangeSelectionUpdated { selection } => {
                self.state.selection = selection;
            }
            AnalysisEvent::SymbolTableRequested { lib } => {
                // Membership only; a repeated request is a no-op.
                self.requested_libs.insert(lib);
            }
            AnalysisEvent::SymbolTableReceived { lib } => {
                self.requested_libs.shift_remove(&lib);
            }
        }
    }

    fn check_thread_index(&self, thread_index: usize) -> bool {
        if thread_index >= self.state.threads.len() {
            warn!("event for nonexistent thread {thread_index} ignored");
            return false;
        }
        true
    }

    // --- filter parameters (supplied by external collaborators) ---

    pub fn set_display_range(&mut self, start: f64, end: f64) {
        self.state.display_range = (start, end);
    }

    pub fn set_search_string(&mut self, search_string: &str) {
        // An unchanged string must not invalidate downstream caches.
        if *self.state.search_string != *search_string {
            self.state.search_string = Rc::from(search_string);
        }
    }

    pub fn set_js_only(&mut self, js_only: bool) {
        self.state.js_only = js_only;
    }

    pub fn set_invert_call_stack(&mut self, invert: bool) {
        self.state.invert_call_stack = invert;
    }

    pub fn set_hide_platform_details(&mut self, hide: bool) {
        self.state.hide_platform_details = hide;
    }

    pub fn set_selected_thread(&mut self, thread_index: usize) {
        if self.check_thread_index(thread_index) {
            self.state.selected_thread_index = thread_index;
        }
    }

    // --- query surface ---

    pub fn profile(&self) -> &Profile {
        &self.state.profile
    }

    pub fn selected_thread_index(&self) -> usize {
        self.state.selected_thread_index
    }

    pub fn thread_count(&self) -> usize {
        self.state.threads.len()
    }

    pub fn thread_order(&self) -> &[usize] {
        &self.thread_order
    }

    pub fn tab_order(&self) -> &[usize] {
        &self.tab_order
    }

    pub fn symbolication_status(&self) -> SymbolicationStatus {
        self.symbolication_status
    }

    /// The libraries whose symbol tables are still pending, in request order.
    pub fn requested_libs(&self) -> impl Iterator<Item = &RequestedLib> {
        self.requested_libs.iter()
    }

    pub fn selection(&self) -> ProfileSelection {
        self.state.selection
    }

    pub fn view_options(&self, thread_index: usize) -> &ThreadViewOptions {
        &self.view_options[thread_index]
    }

    pub fn filtered_thread_for_thread(&mut self, thread_index: usize) -> Rc<Thread> {
        self.selectors[thread_index].selection_filtered_thread(&self.state)
    }

    pub fn func_stack_info_for_thread(&mut self, thread_index: usize) -> Rc<FuncStackInfo> {
        self.selectors[thread_index].func_stack_info(&self.state)
    }

    pub fn call_tree_for_thread(&mut self, thread_index: usize) -> Rc<CallTree> {
        self.selectors[thread_index].call_tree(&self.state)
    }

    pub fn jank_instances_for_thread(&mut self, thread_index: usize) -> Rc<Vec<JankInstance>> {
        self.selectors[thread_index].jank_instances(&self.state)
    }

    pub fn tracing_markers_for_thread(&mut self, thread_index: usize) -> Rc<Vec<TracingMarker>> {
        self.selectors[thread_index].tracing_markers(&self.state)
    }

    pub fn stack_timing_by_depth_for_thread(
        &mut self,
        thread_index: usize,
    ) -> Rc<Vec<StackTimingRow>> {
        self.selectors[thread_index].stack_timing_by_depth(&self.state)
    }

    pub fn flame_chart_max_depth_for_thread(&mut self, thread_index: usize) -> usize {
        self.selectors[thread_index].flame_chart_max_depth(&self.state)
    }

    pub fn leaf_category_timing_for_thread(
        &mut self,
        thread_index: usize,
    ) -> Rc<LeafCategoryTimingRow> {
        self.selectors[thread_index].leaf_category_timing(&self.state)
    }

    /// Resolves a thread's persisted selection path against its current func
    /// stack tree. `None` when the selection no longer exists.
    pub fn selected_func_stack_for_thread(
        &mut self,
        thread_index: usize,
    ) -> Option<FuncStackIndex> {
        let path = self.view_options[thread_index].selected_func_stack_shared();
        self.selectors[thread_index].selected_func_stack(&self.state, path)
    }

    // --- the same queries, through the selected-thread indirection ---

    fn selected_index(&mut self) -> usize {
        self.selected
            .delegate_index(self.state.selected_thread_index)
    }

    pub fn filtered_thread(&mut self) -> Rc<Thread> {
        let index = self.selected_index();
        self.filtered_thread_for_thread(index)
    }

    pub fn func_stack_info(&mut self) -> Rc<FuncStackInfo> {
        let index = self.selected_index();
        self.func_stack_info_for_thread(index)
    }

    pub fn call_tree(&mut self) -> Rc<CallTree> {
        let index = self.selected_index();
        self.call_tree_for_thread(index)
    }

    pub fn jank_instances(&mut self) -> Rc<Vec<JankInstance>> {
        let index = self.selected_index();
        self.jank_instances_for_thread(index)
    }

    pub fn tracing_markers(&mut self) -> Rc<Vec<TracingMarker>> {
        let index = self.selected_index();
        self.tracing_markers_for_thread(index)
    }

    pub fn selection_filtered_tracing_markers(&mut self) -> Rc<Vec<TracingMarker>> {
        let index = self.selected_index();
        self.selectors[index].selection_filtered_tracing_markers(&self.state)
    }

    pub fn stack_timing_by_depth(&mut self) -> Rc<Vec<StackTimingRow>> {
        let index = self.selected_index();
        self.stack_timing_by_depth_for_thread(index)
    }

    pub fn flame_chart_max_depth(&mut self) -> usize {
        let index = self.selected_index();
        self.flame_chart_max_depth_for_thread(index)
    }

    pub fn leaf_category_timing(&mut self) -> Rc<LeafCategoryTimingRow> {
        let index = self.selected_index();
        self.leaf_category_timing_for_thread(index)
    }

    pub fn selected_func_stack(&mut self) -> Option<FuncStackIndex> {
        let index = self.selected_index();
        self.selected_func_stack_for_thread(index)
    }
}

/// The initial thread ordering: document order, with compositor threads
/// sorted to the end.
pub fn default_thread_order(threads: &[Thread]) -> Vec<usize> {
    let mut thread_order: Vec<usize> = (0..threads.len()).collect();
    thread_order.sort_by_key(|&i| (threads[i].name == "Compositor", i));
    thread_order
}
