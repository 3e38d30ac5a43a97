//! Flame chart timing: per-depth time intervals for a filtered thread.
//!
//! A flame chart row at depth d shows one box per maximal run of consecutive
//! samples that share the same func stack at depth d. The leaf-category
//! variant merges runs by the sample's leaf category instead and feeds the
//! category-colored overview row.

use serde_derive::Serialize;

use crate::category::CategoryHandle;
use crate::func_stack::{FuncStackIndex, FuncStackInfo};
use crate::thread::Thread;

/// One flame chart row: the intervals at a single depth, in columnar form
/// and in ascending start order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTimingRow {
    pub start: Vec<f64>,
    pub end: Vec<f64>,
    pub func_stack: Vec<FuncStackIndex>,
}

impl StackTimingRow {
    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }
}

/// The category-colored overview row: intervals defined by each sample's
/// leaf category, independent of depth.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafCategoryTimingRow {
    pub start: Vec<f64>,
    pub end: Vec<f64>,
    pub category: Vec<CategoryHandle>,
}

impl LeafCategoryTimingRow {
    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }
}

/// The greatest func stack depth touched by any retained sample. Zero for a
/// thread without sampled stacks.
pub fn compute_func_stack_max_depth(thread: &Thread, func_stack_info: &FuncStackInfo) -> usize {
    let mut max_depth = 0;
    for i in 0..thread.samples().len() {
        if let Some(stack) = thread.samples().stack(i) {
            let func_stack = func_stack_info.func_stack_for_stack(stack);
            max_depth = max_depth.max(func_stack_info.func_stack_table.depth[func_stack.0]);
        }
    }
    max_depth
}

/// Computes one interval row per depth level `0..=max_depth`.
///
/// Adjacent samples with an identical func stack at a depth merge into one
/// interval. An interval closes at the first sample whose func stack at that
/// depth differs (or whose stack is empty); intervals still open after the
/// last sample close at `last sample time + interval`.
pub fn get_stack_timing_by_depth(
    thread: &Thread,
    func_stack_info: &FuncStackInfo,
    max_depth: usize,
    interval_ms: f64,
) -> Vec<StackTimingRow> {
    let table = &func_stack_info.func_stack_table;
    let mut rows = vec![StackTimingRow::default(); max_depth + 1];
    // One open interval per depth, for the func stack chain of the most
    // recent sample: (func stack, start time).
    let mut open: Vec<(FuncStackIndex, f64)> = Vec::new();
    let mut chain: Vec<FuncStackIndex> = Vec::new();
    let mut last_sample_time = 0.0;
    for i in 0..thread.samples().len() {
        let time = thread.samples().time(i);
        chain.clear();
        if let Some(stack) = thread.samples().stack(i) {
            let mut func_stack = Some(func_stack_info.func_stack_for_stack(stack));
            while let Some(fs) = func_stack {
                chain.push(fs);
                func_stack = table.prefix[fs.0];
            }
            chain.reverse();
        }
        // Find the first depth where this sample leaves the open intervals.
        let mut common_depth = 0;
        while common_depth < open.len()
            && common_depth < chain.len()
            && open[common_depth].0 == chain[common_depth]
        {
            common_depth += 1;
        }
        while open.len() > common_depth {
            let (func_stack, start) = open.pop().unwrap();
            let depth = open.len();
            rows[depth].start.push(start);
            rows[depth].end.push(time);
            rows[depth].func_stack.push(func_stack);
        }
        for depth in common_depth..chain.len() {
            open.push((chain[depth], time));
        }
        last_sample_time = time;
    }
    let end_time = last_sample_time + interval_ms;
    while let Some((func_stack, start)) = open.pop() {
        let depth = open.len();
        rows[depth].start.push(start);
        rows[depth].end.push(end_time);
        rows[depth].func_stack.push(func_stack);
    }
    rows
}

/// Computes the leaf-category overview row: maximal runs of consecutive
/// samples sharing the same leaf category.
pub fn get_leaf_category_stack_timing(thread: &Thread, interval_ms: f64) -> LeafCategoryTimingRow {
    let mut row = LeafCategoryTimingRow::default();
    let mut open: Option<(CategoryHandle, f64)> = None;
    let mut last_sample_time = 0.0;
    for i in 0..thread.samples().len() {
        let time = thread.samples().time(i);
        let leaf_category = thread
            .samples()
            .stack(i)
            .map(|s| thread.stack_table().category(s));
        match (open, leaf_category) {
            (Some((category, _)), Some(current)) if category == current => {}
            (previous, current) => {
                if let Some((category, start)) = previous {
                    row.start.push(start);
                    row.end.push(time);
                    row.category.push(category);
                }
                open = current.map(|category| (category, time));
            }
        }
        last_sample_time = time;
    }
    if let Some((category, start)) = open {
        row.start.push(start);
        row.end.push(last_sample_time + interval_ms);
        row.category.push(category);
    }
    row
}
