use bitflags::bitflags;
use serde_derive::{Deserialize, Serialize};

use crate::resource_table::ResourceIndex;
use crate::string_table::StringIndex;

bitflags! {
    /// Flags for a function in the func table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FuncFlags: u8 {
        /// This function comes from JS code.
        const JS = 1 << 0;
    }
}

/// Index into a thread's func table. Function identity is the stable,
/// filter-independent addressing scheme: filtering reassigns samples and
/// renumbers stacks, but never removes functions from the func table.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncIndex(pub usize);

/// The functions of a thread, in columnar form. Frame table rows reference
/// rows of this table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuncTable {
    pub(crate) name: Vec<StringIndex>,
    #[serde(rename = "isJS", with = "is_js_column")]
    pub(crate) flags: Vec<FuncFlags>,
    pub(crate) resource: Vec<Option<ResourceIndex>>,
}

impl FuncTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_func(
        &mut self,
        name: StringIndex,
        flags: FuncFlags,
        resource: Option<ResourceIndex>,
    ) -> FuncIndex {
        let func = FuncIndex(self.name.len());
        self.name.push(name);
        self.flags.push(flags);
        self.resource.push(resource);
        func
    }

    pub fn name(&self, func: FuncIndex) -> StringIndex {
        self.name[func.0]
    }

    pub fn is_js(&self, func: FuncIndex) -> bool {
        self.flags[func.0].contains(FuncFlags::JS)
    }

    pub fn resource(&self, func: FuncIndex) -> Option<ResourceIndex> {
        self.resource[func.0]
    }

    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

mod is_js_column {
    use serde::de::{Deserialize, Deserializer};
    use serde::ser::Serializer;

    use super::FuncFlags;

    pub fn serialize<S: Serializer>(flags: &[FuncFlags], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(flags.iter().map(|f| f.contains(FuncFlags::JS)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<FuncFlags>, D::Error> {
        let column = Vec::<bool>::deserialize(deserializer)?;
        Ok(column
            .into_iter()
            .map(|is_js| {
                if is_js {
                    FuncFlags::JS
                } else {
                    FuncFlags::empty()
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    use super::*;
    use crate::string_table::StringIndex;

    #[test]
    fn serializes_flags_as_bool_column() {
        let mut table = FuncTable::new();
        table.add_func(StringIndex(0), FuncFlags::empty(), None);
        table.add_func(StringIndex(1), FuncFlags::JS, Some(ResourceIndex(0)));

        assert_json_eq!(
            serde_json::to_value(&table).unwrap(),
            json!({
                "name": [0, 1],
                "isJS": [false, true],
                "resource": [null, 0],
            })
        );

        let back: FuncTable = serde_json::from_value(serde_json::to_value(&table).unwrap()).unwrap();
        assert_eq!(back, table);
    }
}
