use serde_derive::{Deserialize, Serialize};

use crate::string_table::StringIndex;

/// Index into a thread's resource table.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIndex(pub usize);

/// The resources (libraries, scripts) that functions belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTable {
    pub(crate) name: Vec<StringIndex>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_resource(&mut self, name: StringIndex) -> ResourceIndex {
        let resource = ResourceIndex(self.name.len());
        self.name.push(name);
        resource
    }

    pub fn name(&self, resource: ResourceIndex) -> StringIndex {
        self.name[resource.0]
    }

    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}
