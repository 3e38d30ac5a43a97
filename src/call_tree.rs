use crate::func_stack::{FuncStackIndex, FuncStackInfo};
use crate::func_table::FuncIndex;
use crate::thread::Thread;

/// The display data for one call tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct CallNode {
    pub func_stack: FuncStackIndex,
    pub func: FuncIndex,
    pub name: String,
    /// The resource the function belongs to. Suppressed in JS-only trees,
    /// where the resource column is noise.
    pub lib: Option<String>,
    pub depth: usize,
    pub total_time: f64,
    pub self_time: f64,
}

/// An aggregated call tree over a filtered thread's func stacks.
///
/// Each node carries its self time (sample intervals attributed to exactly
/// that call path) and total time (self plus descendants). Nodes without any
/// attributed time are left out of the tree. Children are ordered by
/// descending total time, ties broken by ascending function id.
#[derive(Debug, Clone)]
pub struct CallTree {
    total_time: Vec<f64>,
    self_time: Vec<f64>,
    children: Vec<Vec<FuncStackIndex>>,
    roots: Vec<FuncStackIndex>,
    root_total_time: f64,
    funcs: Vec<FuncIndex>,
    depths: Vec<usize>,
    names: Vec<String>,
    libs: Vec<Option<String>>,
    js_only: bool,
}

impl CallTree {
    /// Builds the call tree in a single pass: per-func-stack sample counts,
    /// then totals by walking the table in reverse (children always have
    /// larger indices than their prefix), then the ordered adjacency.
    pub fn compute(
        thread: &Thread,
        func_stack_info: &FuncStackInfo,
        interval_ms: f64,
        js_only: bool,
    ) -> CallTree {
        let table = &func_stack_info.func_stack_table;
        let len = table.len();
        let mut self_count = vec![0u64; len];
        for i in 0..thread.samples().len() {
            if let Some(stack) = thread.samples().stack(i) {
                self_count[func_stack_info.func_stack_for_stack(stack).0] += 1;
            }
        }
        let mut total_count = self_count.clone();
        for fs in (0..len).rev() {
            if total_count[fs] == 0 {
                continue;
            }
            if let Some(prefix) = table.prefix[fs] {
                // Walking in reverse, total_count[fs] already includes all
                // of fs's descendants.
                total_count[prefix.0] += total_count[fs];
            }
        }
        let mut children: Vec<Vec<FuncStackIndex>> = vec![Vec::new(); len];
        let mut roots = Vec::new();
        for fs in 0..len {
            if total_count[fs] == 0 {
                continue;
            }
            match table.prefix[fs] {
                Some(prefix) => children[prefix.0].push(FuncStackIndex(fs)),
                None => roots.push(FuncStackIndex(fs)),
            }
        }
        let order = |a: &FuncStackIndex, b: &FuncStackIndex| {
            total_count[b.0]
                .cmp(&total_count[a.0])
                .then(table.func[a.0].cmp(&table.func[b.0]))
        };
        for child_list in &mut children {
            child_list.sort_by(|a, b| order(a, b));
        }
        roots.sort_by(|a, b| order(a, b));

        let names = table
            .func
            .iter()
            .map(|&func| thread.func_name(func).to_string())
            .collect();
        let libs = table
            .func
            .iter()
            .map(|&func| {
                if js_only {
                    return None;
                }
                thread.func_table().resource(func).map(|resource| {
                    thread
                        .string_table()
                        .get_string(thread.resource_table().name(resource))
                        .unwrap_or("")
                        .to_string()
                })
            })
            .collect();
        let root_total_time: f64 = roots
            .iter()
            .map(|fs| total_count[fs.0] as f64 * interval_ms)
            .sum();
        CallTree {
            total_time: total_count.iter().map(|&c| c as f64 * interval_ms).collect(),
            self_time: self_count.iter().map(|&c| c as f64 * interval_ms).collect(),
            children,
            roots,
            root_total_time,
            funcs: table.func.clone(),
            depths: table.depth.clone(),
            names,
            libs,
            js_only,
        }
    }

    pub fn roots(&self) -> &[FuncStackIndex] {
        &self.roots
    }

    pub fn children(&self, func_stack: FuncStackIndex) -> &[FuncStackIndex] {
        &self.children[func_stack.0]
    }

    /// The summed total time of all roots; equals the duration of all
    /// retained samples.
    pub fn root_total_time(&self) -> f64 {
        self.root_total_time
    }

    pub fn node(&self, func_stack: FuncStackIndex) -> CallNode {
        CallNode {
            func_stack,
            func: self.funcs[func_stack.0],
            name: self.names[func_stack.0].clone(),
            lib: self.libs[func_stack.0].clone(),
            depth: self.depths[func_stack.0],
            total_time: self.total_time[func_stack.0],
            self_time: self.self_time[func_stack.0],
        }
    }

    pub fn total_time(&self, func_stack: FuncStackIndex) -> f64 {
        self.total_time[func_stack.0]
    }

    pub fn self_time(&self, func_stack: FuncStackIndex) -> f64 {
        self.self_time[func_stack.0]
    }

    pub fn is_js_only(&self) -> bool {
        self.js_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryHandle;
    use crate::func_table::FuncFlags;

    // Stacks [A, B], [A, B], [A, C] with a 1ms interval.
    fn test_tree() -> (Thread, FuncStackInfo, CallTree) {
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
        let info = FuncStackInfo::compute(&thread);
        let tree = CallTree::compute(&thread, &info, 1.0, false);
        (thread, info, tree)
    }

    #[test]
    fn aggregates_self_and_total_times() {
        let (_, _, tree) = test_tree();
        assert_eq!(tree.roots().len(), 1);
        let root = &tree.roots()[0];
        let root_node = tree.node(*root);
        assert_eq!(root_node.name, "A");
        assert_eq!(root_node.total_time, 3.0);
        assert_eq!(root_node.self_time, 0.0);
        let children: Vec<CallNode> = tree.children(*root).iter().map(|&fs| tree.node(fs)).collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "B");
        assert_eq!(children[0].total_time, 2.0);
        assert_eq!(children[0].self_time, 2.0);
        assert_eq!(children[1].name, "C");
        assert_eq!(children[1].total_time, 1.0);
    }

    #[test]
    fn root_total_time_conserves_sample_durations() {
        let (thread, _, tree) = test_tree();
        assert_eq!(
            tree.root_total_time(),
            thread.samples().len() as f64 * 1.0
        );
    }

    #[test]
    fn unsampled_func_stacks_stay_out_of_the_tree() {
        let mut thread = Thread::new("Main", 1, 1);
        let func_a = thread.add_func("A", FuncFlags::empty());
        let func_b = thread.add_func("B", FuncFlags::empty());
        let frame_a = thread.add_frame(func_a, None);
        let frame_b = thread.add_frame(func_b, None);
        let stack_a = thread.add_stack(None, frame_a, CategoryHandle::OTHER);
        let _stack_ab = thread.add_stack(Some(stack_a), frame_b, CategoryHandle::OTHER);
        // Only A is ever sampled; the A -> B row exists but gets no time.
        thread.add_sample(Some(stack_a), 0.0, 0.0);
        let info = FuncStackInfo::compute(&thread);
        let tree = CallTree::compute(&thread, &info, 1.0, false);
        assert_eq!(tree.roots().len(), 1);
        assert!(tree.children(tree.roots()[0]).is_empty());
    }

    #[test]
    fn children_order_by_total_time_then_func() {
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
        // Equal totals: ties break by ascending func id, so B before C even
        // though C was sampled first.
        thread.add_sample(Some(stack_ac), 0.0, 0.0);
        thread.add_sample(Some(stack_ab), 1.0, 0.0);
        let info = FuncStackInfo::compute(&thread);
        let tree = CallTree::compute(&thread, &info, 1.0, false);
        let child_names: Vec<String> = tree
            .children(tree.roots()[0])
            .iter()
            .map(|&fs| tree.node(fs).name)
            .collect();
        assert_eq!(child_names, vec!["B", "C"]);
    }
}
