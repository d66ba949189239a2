use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Type codes from the agent metric output contract. Plugins and receivers
/// use the same single-letter codes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    #[serde(rename = "i")]
    Int32,
    #[serde(rename = "I")]
    Uint32,
    #[serde(rename = "l")]
    Int64,
    #[serde(rename = "L")]
    Uint64,
    #[serde(rename = "n")]
    Double,
    #[serde(rename = "s")]
    Text,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricType::Int32 => write!(f, "i"),
            MetricType::Uint32 => write!(f, "I"),
            MetricType::Int64 => write!(f, "l"),
            MetricType::Uint64 => write!(f, "L"),
            MetricType::Double => write!(f, "n"),
            MetricType::Text => write!(f, "s"),
        }
    }
}

/// A single metric value in the output contract:
/// `{"_type": "n", "_value": 42.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(rename = "_type")]
    pub metric_type: MetricType,
    #[serde(rename = "_value")]
    pub value: Value,
}

impl Metric {
    pub fn int32(value: i32) -> Self {
        Self {
            metric_type: MetricType::Int32,
            value: value.into(),
        }
    }

    pub fn uint32(value: u32) -> Self {
        Self {
            metric_type: MetricType::Uint32,
            value: value.into(),
        }
    }

    pub fn int64(value: i64) -> Self {
        Self {
            metric_type: MetricType::Int64,
            value: value.into(),
        }
    }

    pub fn uint64(value: u64) -> Self {
        Self {
            metric_type: MetricType::Uint64,
            value: value.into(),
        }
    }

    pub fn double(value: f64) -> Self {
        Self {
            metric_type: MetricType::Double,
            value: value.into(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self {
            metric_type: MetricType::Text,
            value: Value::String(value.into()),
        }
    }
}

/// A flat, ordered set of named metrics. Serializes to the JSON object the
/// local endpoint returns and the broker forwards.
pub type Metrics = BTreeMap<String, Metric>;

/// Merge `metrics` into `into`, prefixing every name with `namespace` and a
/// dot. Collisions overwrite, last writer wins.
pub fn merge_namespaced(into: &mut Metrics, namespace: &str, metrics: Metrics) {
    for (name, metric) in metrics {
        into.insert(format!("{namespace}.{name}"), metric);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_serializes_with_contract_keys() {
        let json = serde_json::to_value(Metric::double(1.5)).unwrap();
        assert_eq!(json, serde_json::json!({"_type": "n", "_value": 1.5}));

        let json = serde_json::to_value(Metric::uint64(10)).unwrap();
        assert_eq!(json, serde_json::json!({"_type": "L", "_value": 10}));

        let json = serde_json::to_value(Metric::text("ok")).unwrap();
        assert_eq!(json, serde_json::json!({"_type": "s", "_value": "ok"}));
    }

    #[test]
    fn metric_roundtrips_from_contract_json() {
        let metric: Metric = serde_json::from_str(r#"{"_type":"I","_value":7}"#).unwrap();
        assert_eq!(metric, Metric::uint32(7));
    }

    #[test]
    fn merge_namespaced_prefixes_names() {
        let mut all = Metrics::new();
        let mut cpu = Metrics::new();
        cpu.insert("usage".to_string(), Metric::double(12.0));
        merge_namespaced(&mut all, "cpu", cpu);

        assert!(all.contains_key("cpu.usage"));
        assert_eq!(all.len(), 1);
    }
}
