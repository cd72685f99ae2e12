//! Footer aggregation values with single-flight fetching.

use gridview_core::{AggregationKind, FieldId, GridError};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// A started aggregation fetch.
#[derive(Clone, Debug)]
pub struct AggregationRequest {
    pub fields: Vec<(FieldId, AggregationKind)>,
    pub cancel: CancellationToken,
}

/// Last known footer value per aggregated field; `None` means unknown.
#[derive(Debug, Default)]
pub struct AggregationCache {
    values: BTreeMap<FieldId, Option<Value>>,
    in_flight: Option<CancellationToken>,
}

impl AggregationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: FieldId) -> Option<&Value> {
        self.values.get(&field).and_then(Option::as_ref)
    }

    pub fn values(&self) -> &BTreeMap<FieldId, Option<Value>> {
        &self.values
    }

    /// Start a fetch for `fields`, cancelling the one still in flight.
    pub fn begin(&mut self, fields: Vec<(FieldId, AggregationKind)>) -> AggregationRequest {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        self.in_flight = Some(cancel.clone());
        AggregationRequest { fields, cancel }
    }

    /// Store the outcome of `request`.
    ///
    /// A superseded request changes nothing and yields
    /// [`GridError::Cancelled`]. A failed one clears every value to unknown
    /// and returns the error.
    pub fn complete(
        &mut self,
        request: &AggregationRequest,
        result: Result<BTreeMap<FieldId, Value>, GridError>,
    ) -> Result<(), GridError> {
        if request.cancel.is_cancelled() {
            return Err(GridError::Cancelled);
        }
        self.in_flight = None;
        match result {
            Ok(mut fetched) => {
                self.values = request
                    .fields
                    .iter()
                    .map(|(field, _)| (*field, fetched.remove(field)))
                    .collect();
                Ok(())
            }
            Err(err) => {
                for value in self.values.values_mut() {
                    *value = None;
                }
                for (field, _) in &request.fields {
                    self.values.insert(*field, None);
                }
                Err(err)
            }
        }
    }

    /// Forget the value of one field, as when its aggregation kind changes.
    pub fn clear_field(&mut self, field: FieldId) {
        self.values.insert(field, None);
    }

    /// Drop a deleted field entirely.
    pub fn remove_field(&mut self, field: FieldId) {
        self.values.remove(&field);
    }

    pub fn clear(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const AMOUNT: FieldId = FieldId(2);
    const NAME: FieldId = FieldId(1);

    fn fields() -> Vec<(FieldId, AggregationKind)> {
        vec![
            (AMOUNT, AggregationKind::Sum),
            (NAME, AggregationKind::EmptyCount),
        ]
    }

    #[test]
    fn completed_request_stores_values() {
        let mut cache = AggregationCache::new();
        let request = cache.begin(fields());
        let mut fetched = BTreeMap::new();
        fetched.insert(AMOUNT, json!("12.5"));
        cache.complete(&request, Ok(fetched)).expect("complete");
        assert_eq!(cache.get(AMOUNT), Some(&json!("12.5")));
        assert_eq!(cache.get(NAME), None);
        assert!(cache.values().contains_key(&NAME));
    }

    #[test]
    fn superseded_request_is_cancelled_and_ignored() {
        let mut cache = AggregationCache::new();
        let first = cache.begin(fields());
        let second = cache.begin(fields());
        assert!(first.cancel.is_cancelled());

        let mut stale = BTreeMap::new();
        stale.insert(AMOUNT, json!("1"));
        let result = cache.complete(&first, Ok(stale));
        assert!(result.expect_err("cancelled").is_cancelled());
        assert_eq!(cache.get(AMOUNT), None);

        let mut fresh = BTreeMap::new();
        fresh.insert(AMOUNT, json!("2"));
        cache.complete(&second, Ok(fresh)).expect("complete");
        assert_eq!(cache.get(AMOUNT), Some(&json!("2")));
    }

    #[test]
    fn failure_clears_values_to_unknown() {
        let mut cache = AggregationCache::new();
        let request = cache.begin(fields());
        let mut fetched = BTreeMap::new();
        fetched.insert(AMOUNT, json!("3"));
        cache.complete(&request, Ok(fetched)).expect("complete");

        let retry = cache.begin(fields());
        let result = cache.complete(&retry, Err(GridError::Transport("down".to_string())));
        assert!(matches!(result, Err(GridError::Transport(_))));
        assert_eq!(cache.get(AMOUNT), None);
    }
}
