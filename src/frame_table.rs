use serde_derive::{Deserialize, Serialize};

use crate::fast_hash_map::FastHashMap;
use crate::func_table::FuncIndex;

/// The frames of a thread, in columnar form. Stack table rows reference rows
/// of this table; each frame references its function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTable {
    pub(crate) func: Vec<FuncIndex>,
    pub(crate) address: Vec<Option<u64>>,
}

impl FrameTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_frame(&mut self, func: FuncIndex, address: Option<u64>) -> usize {
        let frame = self.func.len();
        self.func.push(func);
        self.address.push(address);
        frame
    }

    pub fn func(&self, frame: usize) -> FuncIndex {
        self.func[frame]
    }

    pub fn address(&self, frame: usize) -> Option<u64> {
        self.address[frame]
    }

    pub fn len(&self) -> usize {
        self.func.len()
    }

    pub fn is_empty(&self) -> bool {
        self.func.is_empty()
    }

    /// Redirects the func column through an old func -> new func mapping.
    /// Funcs absent from the mapping pass through unchanged.
    pub(crate) fn remap_funcs(&mut self, old_func_to_new_func: &FastHashMap<FuncIndex, FuncIndex>) {
        for func in &mut self.func {
            if let Some(new_func) = old_func_to_new_func.get(func) {
                *func = *new_func;
            }
        }
    }
}
