//! Derived marker views: paired tracing intervals and jank instances.

use log::trace;

use crate::fast_hash_map::FastHashMap;
use crate::marker_table::{MarkerPayload, TracingInterval};
use crate::string_table::StringIndex;
use crate::thread::Thread;

/// Responsiveness values at or above this many milliseconds count as jank.
pub const JANK_THRESHOLD_MS: f64 = 50.0;

/// A completed tracing interval, paired up from start/end marker payloads
/// with the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct TracingMarker {
    pub name: String,
    pub start: f64,
    pub dur: f64,
}

/// An interval during which the thread's event loop was unresponsive for
/// longer than the jank threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct JankInstance {
    pub start: f64,
    pub dur: f64,
    pub title: String,
}

/// Pairs `tracing` start/end payloads into completed intervals, by marker
/// name. An end without a matching start is dropped; a start without an end
/// stays open and is dropped too.
pub fn get_tracing_markers(thread: &Thread) -> Vec<TracingMarker> {
    let markers = thread.markers();
    let mut open_markers: FastHashMap<StringIndex, f64> = FastHashMap::default();
    let mut tracing_markers = Vec::new();
    for i in 0..markers.len() {
        let payload = match markers.data(i) {
            Some(MarkerPayload::Tracing(payload)) => payload,
            _ => continue,
        };
        let name = markers.name(i);
        let time = markers.time(i);
        match payload.interval {
            TracingInterval::Start => {
                open_markers.insert(name, time);
            }
            TracingInterval::End => match open_markers.remove(&name) {
                Some(start) => tracing_markers.push(TracingMarker {
                    name: thread.marker_name(i).to_string(),
                    start,
                    dur: time - start,
                }),
                None => {
                    trace!("dropping unmatched tracing end marker at {time}");
                }
            },
        }
    }
    tracing_markers.sort_by(|a, b| a.start.total_cmp(&b.start));
    tracing_markers
}

/// Retains the tracing markers that overlap `[range_start, range_end)`.
pub fn filter_tracing_markers_to_range(
    tracing_markers: &[TracingMarker],
    range_start: f64,
    range_end: f64,
) -> Vec<TracingMarker> {
    tracing_markers
        .iter()
        .filter(|m| m.start < range_end && m.start + m.dur >= range_start)
        .cloned()
        .collect()
}

/// Derives jank instances from the responsiveness column: every time the
/// responsiveness value resets, the preceding run is reported as jank if it
/// reached the threshold.
pub fn get_jank_instances(thread: &Thread, threshold_ms: f64) -> Vec<JankInstance> {
    let samples = thread.samples();
    let mut jank_instances = Vec::new();
    let mut last_responsiveness = 0.0;
    let mut last_timestamp = 0.0;
    let add_jank = |jank_instances: &mut Vec<JankInstance>, responsiveness: f64, timestamp: f64| {
        jank_instances.push(JankInstance {
            start: timestamp - responsiveness,
            dur: responsiveness,
            title: format!(
                "{responsiveness:.2}ms event processing delay on {}",
                thread.name
            ),
        });
    };
    for i in 0..samples.len() {
        let responsiveness = samples.responsiveness(i);
        if responsiveness < last_responsiveness && last_responsiveness >= threshold_ms {
            add_jank(&mut jank_instances, last_responsiveness, last_timestamp);
        }
        last_responsiveness = responsiveness;
        last_timestamp = samples.time(i);
    }
    if last_responsiveness >= threshold_ms {
        add_jank(&mut jank_instances, last_responsiveness, last_timestamp);
    }
    jank_instances
}
