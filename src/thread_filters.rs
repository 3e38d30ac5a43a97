//! The thread filter pipeline.
//!
//! Each stage is a pure function from a thread (plus filter parameters) to a
//! new thread. Stages never mutate their input; a stage that rebuilds the
//! stack table produces internally consistent but renumbered row ids, so
//! anything row-id-based (including the func stack index) must be re-derived
//! from the stage's output.
//!
//! Stage order: range, call tree filters, JS-only, search string, invert,
//! selection range.

use log::trace;

use crate::fast_hash_map::FastHashMap;
use crate::func_stack::FuncPath;
use crate::func_table::{FuncFlags, FuncIndex};
use crate::marker_table::MarkerTable;
use crate::sample_table::SampleTable;
use crate::stack_table::StackTable;
use crate::thread::Thread;

/// Restricts the analysis to calls under (prefix) or ending at (postfix) a
/// given call path. Filters are kept in an ordered list per thread and
/// applied left to right, each as a further truncation.
#[derive(Debug, Clone, PartialEq)]
pub enum CallTreeFilter {
    /// Keep only samples whose stack begins with `func_path`, re-rooted so
    /// that the boundary function (the last path element) becomes the root.
    Prefix {
        func_path: FuncPath,
        match_js_only: bool,
    },
    /// Keep only samples whose stack ends with `func_path`, truncated to the
    /// row where the suffix match completes.
    Postfix {
        func_path: FuncPath,
        match_js_only: bool,
    },
}

/// Retains samples and markers with `start <= time < end`. All other tables
/// are carried over unchanged; unreferenced stack rows are kept, never
/// pruned, so stack row ids remain comparable with the input's.
pub fn filter_thread_to_range(thread: &Thread, range_start: f64, range_end: f64) -> Thread {
    let mut samples = SampleTable::new();
    for i in 0..thread.samples.len() {
        let time = thread.samples.time(i);
        if time >= range_start && time < range_end {
            samples.add_sample(thread.samples.stack(i), time, thread.samples.responsiveness(i));
        }
    }
    let mut markers = MarkerTable::new();
    for i in 0..thread.markers.len() {
        let time = thread.markers.time(i);
        if time >= range_start && time < range_end {
            markers.add_marker(thread.markers.name(i), time, thread.markers.data[i].clone());
        }
    }
    trace!(
        "range filter [{range_start}, {range_end}) kept {} of {} samples",
        samples.len(),
        thread.samples.len()
    );
    Thread {
        samples,
        markers,
        ..thread.clone()
    }
}

/// Applies an ordered list of call tree filters, left to right. An empty
/// list is the identity.
pub fn filter_thread_to_call_tree_filters(thread: &Thread, filters: &[CallTreeFilter]) -> Thread {
    let mut current: Option<Thread> = None;
    for filter in filters {
        let input = current.as_ref().unwrap_or(thread);
        let next = match filter {
            CallTreeFilter::Prefix {
                func_path,
                match_js_only,
            } => filter_thread_to_prefix_path(input, func_path, *match_js_only),
            CallTreeFilter::Postfix {
                func_path,
                match_js_only,
            } => filter_thread_to_postfix_path(input, func_path, *match_js_only),
        };
        current = Some(next);
    }
    current.unwrap_or_else(|| thread.clone())
}

/// Keeps only samples whose stack begins with the given func path, and
/// re-roots each retained stack so that the boundary function becomes the
/// root of the new stack table.
///
/// With `match_js_only`, non-JS frames inside the prefix region neither
/// advance nor break the match; they are dropped from the re-rooted stacks.
pub fn filter_thread_to_prefix_path(
    thread: &Thread,
    prefix_path: &[FuncIndex],
    match_js_only: bool,
) -> Thread {
    let prefix_depth = prefix_path.len();
    let stack_table = &thread.stack_table;
    // How many prefix entries each stack row's path has matched so far;
    // `None` once the path has disagreed with the prefix.
    let mut match_count: Vec<Option<usize>> = Vec::with_capacity(stack_table.len());
    let mut old_stack_to_new_stack: Vec<Option<usize>> = vec![None; stack_table.len()];
    let mut new_stack_table = StackTable::new();
    for stack in 0..stack_table.len() {
        let prefix = stack_table.prefix(stack);
        let count_at_prefix = match prefix {
            Some(p) => match_count[p],
            None => Some(0),
        };
        let count = match count_at_prefix {
            None => None,
            Some(n) if n == prefix_depth => Some(n),
            Some(n) => {
                let func = thread.func_for_stack(stack);
                if func == prefix_path[n] {
                    Some(n + 1)
                } else if match_js_only && !thread.func_table.is_js(func) {
                    Some(n)
                } else {
                    None
                }
            }
        };
        if count == Some(prefix_depth) {
            let new_prefix = prefix.and_then(|p| old_stack_to_new_stack[p]);
            let new_stack = new_stack_table.index_for_stack(
                new_prefix,
                stack_table.frame(stack),
                stack_table.category(stack),
            );
            old_stack_to_new_stack[stack] = Some(new_stack);
        }
        match_count.push(count);
    }
    let mut samples = SampleTable::new();
    for i in 0..thread.samples.len() {
        match thread.samples.stack(i) {
            Some(old_stack) if match_count[old_stack] == Some(prefix_depth) => {
                samples.add_sample(
                    old_stack_to_new_stack[old_stack],
                    thread.samples.time(i),
                    thread.samples.responsiveness(i),
                );
            }
            None if prefix_depth == 0 => {
                samples.add_sample(None, thread.samples.time(i), thread.samples.responsiveness(i));
            }
            _ => {}
        }
    }
    Thread {
        stack_table: new_stack_table,
        samples,
        ..thread.clone()
    }
}

/// Keeps only samples whose stack ends with the given func path, truncating
/// each retained sample's stack to the ancestor row at which the suffix
/// match completes. The stack table is reused unchanged.
pub fn filter_thread_to_postfix_path(
    thread: &Thread,
    postfix_path: &[FuncIndex],
    match_js_only: bool,
) -> Thread {
    let postfix_depth = postfix_path.len();
    if postfix_depth == 0 {
        return thread.clone();
    }
    let stack_table = &thread.stack_table;
    let convert_stack = |leaf: usize| -> Option<usize> {
        let mut matches = 0;
        let mut stack = Some(leaf);
        while let Some(s) = stack {
            let func = thread.func_for_stack(s);
            if func == postfix_path[postfix_depth - 1 - matches] {
                matches += 1;
                if matches == postfix_depth {
                    return Some(s);
                }
            } else if !match_js_only || thread.func_table.is_js(func) {
                return None;
            }
            stack = stack_table.prefix(s);
        }
        None
    };
    let mut old_stack_to_new_stack: FastHashMap<usize, Option<usize>> = FastHashMap::default();
    let mut samples = SampleTable::new();
    for i in 0..thread.samples.len() {
        let new_stack = thread
            .samples
            .stack(i)
            .and_then(|leaf| *old_stack_to_new_stack.entry(leaf).or_insert_with(|| convert_stack(leaf)));
        if let Some(new_stack) = new_stack {
            samples.add_sample(
                Some(new_stack),
                thread.samples.time(i),
                thread.samples.responsiveness(i),
            );
        }
    }
    Thread {
        samples,
        ..thread.clone()
    }
}

/// Collapses consecutive native frames into their nearest JS ancestor,
/// producing stacks composed only of JS functions. Sample timestamps,
/// responsiveness and retained categories are preserved. Applying this
/// filter twice equals applying it once.
pub fn filter_thread_to_js_only(thread: &Thread) -> Thread {
    let stack_table = &thread.stack_table;
    let mut new_stack_table = StackTable::new();
    let mut old_stack_to_new_stack: Vec<Option<usize>> = Vec::with_capacity(stack_table.len());
    for stack in 0..stack_table.len() {
        let new_prefix = match stack_table.prefix(stack) {
            Some(p) => old_stack_to_new_stack[p],
            None => None,
        };
        let func = thread.func_for_stack(stack);
        let new_stack = if thread.func_table.is_js(func) {
            Some(new_stack_table.index_for_stack(
                new_prefix,
                stack_table.frame(stack),
                stack_table.category(stack),
            ))
        } else {
            // Collapse this native frame into its nearest JS ancestor.
            new_prefix
        };
        old_stack_to_new_stack.push(new_stack);
    }
    let mut samples = SampleTable::new();
    for i in 0..thread.samples.len() {
        let new_stack = thread.samples.stack(i).and_then(|s| old_stack_to_new_stack[s]);
        samples.add_sample(new_stack, thread.samples.time(i), thread.samples.responsiveness(i));
    }
    Thread {
        stack_table: new_stack_table,
        samples,
        ..thread.clone()
    }
}

/// Retains only samples whose stack contains at least one function whose
/// name contains the query, case-insensitively, and only markers whose name
/// matches the same way. An empty query is a no-op. The func table is never
/// changed.
pub fn filter_thread_to_search_string(thread: &Thread, search_string: &str) -> Thread {
    if search_string.is_empty() {
        return thread.clone();
    }
    let needle = search_string.to_lowercase();
    let func_matches: Vec<bool> = (0..thread.func_table.len())
        .map(|f| {
            thread
                .func_name(FuncIndex(f))
                .to_lowercase()
                .contains(&needle)
        })
        .collect();
    let stack_table = &thread.stack_table;
    // A stack matches if any function on its path matches.
    let mut stack_matches: Vec<bool> = Vec::with_capacity(stack_table.len());
    for stack in 0..stack_table.len() {
        let prefix_matches = stack_table.prefix(stack).map_or(false, |p| stack_matches[p]);
        stack_matches.push(prefix_matches || func_matches[thread.func_for_stack(stack).0]);
    }
    let mut samples = SampleTable::new();
    for i in 0..thread.samples.len() {
        if thread.samples.stack(i).map_or(false, |s| stack_matches[s]) {
            samples.add_sample(
                thread.samples.stack(i),
                thread.samples.time(i),
                thread.samples.responsiveness(i),
            );
        }
    }
    let mut markers = MarkerTable::new();
    for i in 0..thread.markers.len() {
        if thread.marker_name(i).to_lowercase().contains(&needle) {
            markers.add_marker(
                thread.markers.name(i),
                thread.markers.time(i),
                thread.markers.data[i].clone(),
            );
        }
    }
    Thread {
        samples,
        markers,
        ..thread.clone()
    }
}

/// Reverses every sample's stack: the root becomes the leaf and vice versa.
/// A fresh stack table is interned from the reversed paths, so distinct
/// leaves that share a function become one root in the inverted tree.
///
/// Inversion is not an involution: the merging above loses the information
/// needed to reconstruct the original tree.
pub fn invert_call_stack(thread: &Thread) -> Thread {
    let stack_table = &thread.stack_table;
    let mut new_stack_table = StackTable::new();
    let mut old_leaf_to_new_stack: FastHashMap<usize, usize> = FastHashMap::default();
    let mut samples = SampleTable::new();
    for i in 0..thread.samples.len() {
        let new_stack = thread.samples.stack(i).map(|leaf| {
            *old_leaf_to_new_stack.entry(leaf).or_insert_with(|| {
                let mut new_stack: Option<usize> = None;
                let mut current = Some(leaf);
                while let Some(s) = current {
                    new_stack = Some(new_stack_table.index_for_stack(
                        new_stack,
                        stack_table.frame(s),
                        stack_table.category(s),
                    ));
                    current = stack_table.prefix(s);
                }
                // The walk visits at least the leaf itself.
                new_stack.unwrap()
            })
        });
        samples.add_sample(new_stack, thread.samples.time(i), thread.samples.responsiveness(i));
    }
    Thread {
        stack_table: new_stack_table,
        samples,
        ..thread.clone()
    }
}

/// Collapses every run of consecutive non-JS frames into a single synthetic
/// "Platform" pseudo frame, keeping JS frames as they are. This is the flame
/// chart's "hide platform details" variant of stack simplification; the call
/// tree uses [`filter_thread_to_js_only`] instead.
pub fn collapse_platform_stack_frames(thread: &Thread) -> Thread {
    let mut string_table = thread.string_table.clone();
    let mut func_table = thread.func_table.clone();
    let mut frame_table = thread.frame_table.clone();
    let platform_name = string_table.index_for_string("Platform");
    let platform_func = func_table.add_func(platform_name, FuncFlags::empty(), None);
    let platform_frame = frame_table.add_frame(platform_func, None);

    let stack_table = &thread.stack_table;
    let mut new_stack_table = StackTable::new();
    let mut old_stack_to_new_stack: Vec<usize> = Vec::with_capacity(stack_table.len());
    // Whether a new stack row is a collapsed platform run.
    let mut is_collapsed: Vec<bool> = Vec::new();
    for stack in 0..stack_table.len() {
        let new_prefix = stack_table.prefix(stack).map(|p| old_stack_to_new_stack[p]);
        let func = thread.func_for_stack(stack);
        let new_stack = if thread.func_table.is_js(func) {
            let s = new_stack_table.index_for_stack(
                new_prefix,
                stack_table.frame(stack),
                stack_table.category(stack),
            );
            if is_collapsed.len() < new_stack_table.len() {
                is_collapsed.push(false);
            }
            s
        } else {
            match new_prefix {
                // Extend the ongoing platform run.
                Some(p) if is_collapsed[p] => p,
                _ => {
                    let s = new_stack_table.index_for_stack(
                        new_prefix,
                        platform_frame,
                        stack_table.category(stack),
                    );
                    if is_collapsed.len() < new_stack_table.len() {
                        is_collapsed.push(true);
                    }
                    s
                }
            }
        };
        old_stack_to_new_stack.push(new_stack);
    }
    let mut samples = SampleTable::new();
    for i in 0..thread.samples.len() {
        let new_stack = thread.samples.stack(i).map(|s| old_stack_to_new_stack[s]);
        samples.add_sample(new_stack, thread.samples.time(i), thread.samples.responsiveness(i));
    }
    Thread {
        string_table,
        func_table,
        frame_table,
        stack_table: new_stack_table,
        samples,
        ..thread.clone()
    }
}
