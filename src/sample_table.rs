use serde_derive::{Deserialize, Serialize};

/// The sample table contains stacks with timestamps and responsiveness
/// values.
///
/// At a fixed but configurable rate, the profiler samples the current stack
/// of each thread and records it here. `responsiveness` is how long the
/// thread's event loop had been unresponsive at the time of the sample, in
/// milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleTable {
    /// An index into the thread's stack table for each sample. `None` means
    /// the empty stack.
    pub(crate) stack: Vec<Option<usize>>,
    pub(crate) time: Vec<f64>,
    pub(crate) responsiveness: Vec<f64>,
}

impl SampleTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_sample(&mut self, stack: Option<usize>, time: f64, responsiveness: f64) {
        self.stack.push(stack);
        self.time.push(time);
        self.responsiveness.push(responsiveness);
    }

    pub fn stack(&self, sample: usize) -> Option<usize> {
        self.stack[sample]
    }

    pub fn time(&self, sample: usize) -> f64 {
        self.time[sample]
    }

    pub fn responsiveness(&self, sample: usize) -> f64 {
        self.responsiveness[sample]
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}
