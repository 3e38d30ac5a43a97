//! This crate analyzes profiles in the [Firefox Profiler](https://profiler.firefox.com/)'s
//! processed profile format: per-thread columnar call stack samples, markers
//! and metadata.
//!
//! The raw tables go in one end; filtered call trees, inverted stacks and
//! per-depth flame chart timings come out the other. An [`AnalysisSession`]
//! owns the profile snapshot and a memoized derived-value graph per thread,
//! so re-querying an unchanged view costs nothing, and it keeps the user's
//! selected/expanded call paths valid across re-filtering.
//!
//! Use [`Profile::from_reader`] to parse processed-profile JSON, or build a
//! [`Profile`] in code, then drive an [`AnalysisSession`] with events and
//! query it.
//!
//! ## Example
//!
//! ```
//! use fxprof_analysis::{
//!     AnalysisEvent, AnalysisSession, CategoryHandle, DataSource, FuncFlags, Profile, Thread,
//! };
//!
//! let mut thread = Thread::new("GeckoMain", 54132, 54132000);
//! let func_a = thread.add_func("A", FuncFlags::empty());
//! let func_b = thread.add_func("B", FuncFlags::empty());
//! let frame_a = thread.add_frame(func_a, None);
//! let frame_b = thread.add_frame(func_b, None);
//! let stack_a = thread.add_stack(None, frame_a, CategoryHandle::OTHER);
//! let stack_ab = thread.add_stack(Some(stack_a), frame_b, CategoryHandle::OTHER);
//! thread.add_sample(Some(stack_ab), 0.0, 0.0);
//! thread.add_sample(Some(stack_ab), 1.0, 0.0);
//!
//! let mut profile = Profile::new("My app", 1.0);
//! profile.add_thread(thread);
//!
//! let mut session = AnalysisSession::new(profile, DataSource::File);
//! let call_tree = session.call_tree();
//! let root = call_tree.roots()[0];
//! assert_eq!(call_tree.node(root).name, "A");
//! assert_eq!(call_tree.node(root).total_time, 2.0);
//!
//! session.handle_event(AnalysisEvent::SelectedFuncStackChanged {
//!     thread_index: 0,
//!     func_path: vec![func_a, func_b],
//! });
//! assert!(session.selected_func_stack().is_some());
//! ```

mod cached_node;
mod call_tree;
mod category;
mod category_color;
mod error;
mod fast_hash_map;
mod frame_table;
mod func_stack;
mod func_table;
mod marker_table;
mod markers;
mod profile;
mod resource_table;
mod sample_table;
mod selectors;
mod session;
mod stack_table;
mod stack_timing;
mod string_table;
mod thread;
mod thread_filters;
mod view_state;

pub use cached_node::{CachedNode, IdentityEq};
pub use call_tree::{CallNode, CallTree};
pub use category::{Category, CategoryHandle};
pub use category_color::CategoryColor;
pub use error::Error;
pub use frame_table::FrameTable;
pub use func_stack::{FuncPath, FuncStackIndex, FuncStackInfo, FuncStackTable};
pub use func_table::{FuncFlags, FuncIndex, FuncTable};
pub use marker_table::{MarkerPayload, MarkerTable, TracingInterval, TracingPayload};
pub use markers::{
    filter_tracing_markers_to_range, get_jank_instances, get_tracing_markers, JankInstance,
    TracingMarker, JANK_THRESHOLD_MS,
};
pub use profile::{Profile, ProfileMeta, TaskTable, TaskTracerData};
pub use resource_table::{ResourceIndex, ResourceTable};
pub use sample_table::SampleTable;
pub use selectors::{SelectedThreadSelectors, ThreadSelectors};
pub use session::{
    default_thread_order, AnalysisEvent, AnalysisSession, DataSource, ProfileSelection,
    RequestedLib, SessionState, SymbolicationStatus,
};
pub use stack_table::StackTable;
pub use stack_timing::{
    compute_func_stack_max_depth, get_leaf_category_stack_timing, get_stack_timing_by_depth,
    LeafCategoryTimingRow, StackTimingRow,
};
pub use string_table::{StringIndex, StringTable};
pub use thread::Thread;
pub use thread_filters::{
    collapse_platform_stack_frames, filter_thread_to_call_tree_filters,
    filter_thread_to_js_only, filter_thread_to_postfix_path, filter_thread_to_prefix_path,
    filter_thread_to_range, filter_thread_to_search_string, invert_call_stack, CallTreeFilter,
};
pub use view_state::ThreadViewOptions;
