use serde_derive::{Deserialize, Serialize};

use crate::category::CategoryHandle;
use crate::fast_hash_map::FastHashMap;
use crate::frame_table::FrameTable;
use crate::func_table::{FuncFlags, FuncIndex, FuncTable};
use crate::marker_table::{MarkerPayload, MarkerTable};
use crate::resource_table::{ResourceIndex, ResourceTable};
use crate::sample_table::SampleTable;
use crate::stack_table::StackTable;
use crate::string_table::StringTable;

/// One thread of the profiled process, as a set of columnar tables.
///
/// Threads are immutable once built; every filter stage produces a new
/// `Thread` value with internally consistent but renumbered row ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pid: u32,
    #[serde(default)]
    pub tid: u32,
    pub(crate) string_table: StringTable,
    pub(crate) stack_table: StackTable,
    pub(crate) frame_table: FrameTable,
    pub(crate) func_table: FuncTable,
    pub(crate) resource_table: ResourceTable,
    pub(crate) samples: SampleTable,
    pub(crate) markers: MarkerTable,
}

impl Thread {
    pub fn new(name: &str, pid: u32, tid: u32) -> Self {
        Thread {
            name: name.to_string(),
            pid,
            tid,
            ..Default::default()
        }
    }

    pub fn add_func(&mut self, name: &str, flags: FuncFlags) -> FuncIndex {
        let name = self.string_table.index_for_string(name);
        self.func_table.add_func(name, flags, None)
    }

    pub fn add_func_with_resource(
        &mut self,
        name: &str,
        flags: FuncFlags,
        resource: ResourceIndex,
    ) -> FuncIndex {
        let name = self.string_table.index_for_string(name);
        self.func_table.add_func(name, flags, Some(resource))
    }

    pub fn add_resource(&mut self, name: &str) -> ResourceIndex {
        let name = self.string_table.index_for_string(name);
        self.resource_table.add_resource(name)
    }

    pub fn add_frame(&mut self, func: FuncIndex, address: Option<u64>) -> usize {
        self.frame_table.add_frame(func, address)
    }

    /// Looks up or creates the stack node for a frame on top of `prefix`.
    pub fn add_stack(
        &mut self,
        prefix: Option<usize>,
        frame: usize,
        category: CategoryHandle,
    ) -> usize {
        self.stack_table.index_for_stack(prefix, frame, category)
    }

    pub fn add_sample(&mut self, stack: Option<usize>, time: f64, responsiveness: f64) {
        self.samples.add_sample(stack, time, responsiveness);
    }

    pub fn add_marker(&mut self, name: &str, time: f64, data: Option<MarkerPayload>) {
        let name = self.string_table.index_for_string(name);
        self.markers.add_marker(name, time, data);
    }

    pub fn string_table(&self) -> &StringTable {
        &self.string_table
    }

    pub fn stack_table(&self) -> &StackTable {
        &self.stack_table
    }

    pub fn frame_table(&self) -> &FrameTable {
        &self.frame_table
    }

    pub fn func_table(&self) -> &FuncTable {
        &self.func_table
    }

    pub fn resource_table(&self) -> &ResourceTable {
        &self.resource_table
    }

    pub fn samples(&self) -> &SampleTable {
        &self.samples
    }

    pub fn markers(&self) -> &MarkerTable {
        &self.markers
    }

    /// The function of a stack table row, through its frame.
    pub fn func_for_stack(&self, stack: usize) -> FuncIndex {
        self.frame_table.func(self.stack_table.frame(stack))
    }

    pub fn func_name(&self, func: FuncIndex) -> &str {
        self.string_table
            .get_string(self.func_table.name(func))
            .unwrap_or("")
    }

    pub fn marker_name(&self, marker: usize) -> &str {
        self.string_table
            .get_string(self.markers.name(marker))
            .unwrap_or("")
    }

    /// A new thread with some function ids collapsed into others, per the
    /// supplied old func -> new func mapping. Funcs absent from the mapping
    /// pass through unchanged. Stacks, samples and markers are untouched;
    /// only the frame table's func column is redirected.
    pub fn merge_functions(&self, old_func_to_new_func: &FastHashMap<FuncIndex, FuncIndex>) -> Thread {
        let mut frame_table = self.frame_table.clone();
        frame_table.remap_funcs(old_func_to_new_func);
        Thread {
            frame_table,
            ..self.clone()
        }
    }
}
