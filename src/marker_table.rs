use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_derive::{Deserialize as DeriveDeserialize, Serialize as DeriveSerialize};
use serde_json::Value;

use crate::string_table::StringIndex;

/// Whether a tracing payload marks the start or the end of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeriveSerialize, DeriveDeserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingInterval {
    Start,
    End,
}

/// The payload of a `tracing` marker. A start/end pair with the same marker
/// name forms one tracing interval.
#[derive(Debug, Clone, PartialEq, DeriveSerialize, DeriveDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracingPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub interval: TracingInterval,
}

/// A marker payload. Payload kinds this crate has no typed model for are kept
/// as raw JSON, so a profile round-trips losslessly.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerPayload {
    Tracing(TracingPayload),
    Other(Value),
}

impl Serialize for MarkerPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MarkerPayload::Tracing(payload) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "tracing")?;
                if let Some(category) = &payload.category {
                    map.serialize_entry("category", category)?;
                }
                map.serialize_entry("interval", &payload.interval)?;
                map.end()
            }
            MarkerPayload::Other(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for MarkerPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.get("type").and_then(Value::as_str) == Some("tracing") {
            if let Ok(payload) = serde_json::from_value::<TracingPayload>(value.clone()) {
                return Ok(MarkerPayload::Tracing(payload));
            }
        }
        Ok(MarkerPayload::Other(value))
    }
}

/// The markers of a thread, in columnar form.
#[derive(Debug, Clone, Default, PartialEq, DeriveSerialize, DeriveDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerTable {
    pub(crate) name: Vec<StringIndex>,
    pub(crate) time: Vec<f64>,
    pub(crate) data: Vec<Option<MarkerPayload>>,
}

impl MarkerTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_marker(&mut self, name: StringIndex, time: f64, data: Option<MarkerPayload>) {
        self.name.push(name);
        self.time.push(time);
        self.data.push(data);
    }

    pub fn name(&self, marker: usize) -> StringIndex {
        self.name[marker]
    }

    pub fn time(&self, marker: usize) -> f64 {
        self.time[marker]
    }

    pub fn data(&self, marker: usize) -> Option<&MarkerPayload> {
        self.data[marker].as_ref()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}
