use hostmon_common::types::{merge_namespaced, Metrics};
use std::collections::HashMap;
use std::sync::Mutex;

/// Holds network-delivered metric submissions between fetches. Each
/// submitter writes under its own id; a new submission replaces whatever
/// that id held before.
#[derive(Debug, Default)]
pub struct ReceiverStore {
    groups: Mutex<HashMap<String, Metrics>>,
}

impl ReceiverStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, id: &str, metrics: Metrics) {
        self.groups.lock().unwrap().insert(id.to_string(), metrics);
    }

    /// Everything currently held, namespaced by submission id.
    pub fn snapshot(&self) -> Metrics {
        let groups = self.groups.lock().unwrap();
        let mut all = Metrics::new();
        for (id, metrics) in groups.iter() {
            merge_namespaced(&mut all, id, metrics.clone());
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostmon_common::types::Metric;

    #[test]
    fn submissions_are_namespaced_by_id() {
        let store = ReceiverStore::new();
        let mut metrics = Metrics::new();
        metrics.insert("requests".to_string(), Metric::uint64(5));
        store.put("webapp", metrics);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.get("webapp.requests"), Some(&Metric::uint64(5)));
    }

    #[test]
    fn a_new_submission_replaces_the_previous_one() {
        let store = ReceiverStore::new();

        let mut first = Metrics::new();
        first.insert("a".to_string(), Metric::uint64(1));
        first.insert("b".to_string(), Metric::uint64(2));
        store.put("job", first);

        let mut second = Metrics::new();
        second.insert("a".to_string(), Metric::uint64(9));
        store.put("job", second);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.get("job.a"), Some(&Metric::uint64(9)));
        assert!(!snapshot.contains_key("job.b"));
    }
}
