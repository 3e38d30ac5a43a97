use std::io::Read;

use serde_derive::{Deserialize, Serialize};

use crate::category::{Category, CategoryHandle};
use crate::category_color::CategoryColor;
use crate::error::Error;
use crate::string_table::StringIndex;
use crate::thread::Thread;

/// Profile-wide metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMeta {
    /// Sampling interval in milliseconds.
    pub interval: f64,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Default for ProfileMeta {
    fn default() -> Self {
        ProfileMeta {
            interval: 1.0,
            product: String::new(),
            start_time: 0.0,
            categories: Vec::new(),
        }
    }
}

/// Side table produced by the task tracer instrumentation. Carried through
/// profile load and exposed as-is; nothing in this crate derives from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTracerData {
    pub task_table: TaskTable,
    pub string_array: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTable {
    pub dispatch_time: Vec<f64>,
    pub begin_time: Vec<Option<f64>>,
    pub end_time: Vec<Option<f64>>,
    pub label: Vec<StringIndex>,
}

/// A parsed profile: metadata plus one set of columnar tables per thread.
///
/// Raw tables are created once on profile load and never mutated in place;
/// all derived views are built from fresh copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub meta: ProfileMeta,
    pub(crate) threads: Vec<Thread>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasktracer: Option<TaskTracerData>,
}

impl Profile {
    pub fn new(product: &str, interval_ms: f64) -> Self {
        Profile {
            meta: ProfileMeta {
                interval: interval_ms,
                product: product.to_string(),
                ..Default::default()
            },
            threads: Vec::new(),
            tasktracer: None,
        }
    }

    pub fn add_category(&mut self, name: &str, color: CategoryColor) -> CategoryHandle {
        let handle = CategoryHandle(self.meta.categories.len() as u16);
        self.meta.categories.push(Category {
            name: name.to_string(),
            color,
        });
        handle
    }

    pub fn add_thread(&mut self, thread: Thread) -> usize {
        let thread_index = self.threads.len();
        self.threads.push(thread);
        thread_index
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn thread(&self, thread_index: usize) -> Option<&Thread> {
        self.threads.get(thread_index)
    }

    pub fn interval(&self) -> f64 {
        self.meta.interval
    }

    /// Reads a profile from processed-profile JSON and checks that its tables
    /// are internally consistent.
    pub fn from_reader<R: Read>(reader: R) -> Result<Profile, Error> {
        let profile: Profile = serde_json::from_reader(reader)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Profile, Error> {
        let profile: Profile = serde_json::from_value(value)?;
        profile.validate()?;
        Ok(profile)
    }

    /// The time range covering all samples and markers of all threads, as a
    /// half-open `[start, end)` interval. The end is padded by one sampling
    /// interval so the final samples are included.
    pub fn time_range(&self) -> (f64, f64) {
        let mut start = f64::INFINITY;
        let mut end = f64::NEG_INFINITY;
        for thread in &self.threads {
            for &time in &thread.samples.time {
                start = start.min(time);
                end = end.max(time);
            }
            for &time in &thread.markers.time {
                start = start.min(time);
                end = end.max(time);
            }
        }
        if start > end {
            return (0.0, 0.0);
        }
        (start, end + self.meta.interval)
    }

    fn validate(&self) -> Result<(), Error> {
        for (thread_index, thread) in self.threads.iter().enumerate() {
            let err = |reason| Error::InvalidProfile {
                thread_index,
                reason,
            };
            let stack_table = &thread.stack_table;
            for (stack, &prefix) in stack_table.prefix.iter().enumerate() {
                if let Some(prefix) = prefix {
                    if prefix >= stack {
                        return Err(err("stack table rows are not in dependency order"));
                    }
                }
                if stack_table.frame[stack] >= thread.frame_table.len() {
                    return Err(err("stack row references a nonexistent frame"));
                }
            }
            for &func in &thread.frame_table.func {
                if func.0 >= thread.func_table.len() {
                    return Err(err("frame row references a nonexistent func"));
                }
            }
            for &name in &thread.func_table.name {
                if name.0 as usize >= thread.string_table.len() {
                    return Err(err("func row references a nonexistent string"));
                }
            }
            for &resource in thread.func_table.resource.iter().flatten() {
                if resource.0 >= thread.resource_table.len() {
                    return Err(err("func row references a nonexistent resource"));
                }
            }
            for &stack in thread.samples.stack.iter().flatten() {
                if stack >= stack_table.len() {
                    return Err(err("sample references a nonexistent stack"));
                }
            }
            for &name in &thread.markers.name {
                if name.0 as usize >= thread.string_table.len() {
                    return Err(err("marker references a nonexistent string"));
                }
            }
        }
        Ok(())
    }
}
