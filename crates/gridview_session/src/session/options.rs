//! View definition changes: field options and footer aggregations.

use super::GridSession;
use crate::optimistic::settle;
use crate::source::RecordSource;
use gridview_core::{AggregationKind, FieldId, FieldOptions, GridError, View};
use std::collections::BTreeMap;
use tracing::debug;

impl GridSession {
    /// Refetch footer values of every aggregated field.
    ///
    /// # Errors
    /// [`GridError::Cancelled`] when a newer fetch superseded this one;
    /// otherwise the source error, with every value reset to unknown.
    pub async fn fetch_aggregations(&mut self, source: &dyn RecordSource) -> Result<(), GridError> {
        let fields: Vec<(FieldId, AggregationKind)> =
            self.context.view.aggregated_fields().collect();
        if fields.is_empty() {
            return Ok(());
        }
        let request = self.aggregations.begin(fields);
        let query = self.context.page_query(0, 0);
        let result = source
            .fetch_field_aggregations(&query, &request.fields, &request.cancel)
            .await;
        self.aggregations.complete(&request, result)
    }

    /// Change or remove the aggregation shown under `field`.
    ///
    /// # Errors
    /// The options update or the aggregation fetch failed.
    pub async fn set_field_aggregation(
        &mut self,
        source: &dyn RecordSource,
        field: FieldId,
        kind: Option<AggregationKind>,
    ) -> Result<(), GridError> {
        let mut options = self.context.view.options_for(field);
        options.aggregation = kind;
        self.update_field_options(source, BTreeMap::from([(field, options)]))
            .await?;
        self.aggregations.clear_field(field);
        self.fetch_aggregations(source).await
    }

    /// Apply field option changes locally and persist them.
    ///
    /// # Errors
    /// The source error, after the previous options were put back.
    pub async fn update_field_options(
        &mut self,
        source: &dyn RecordSource,
        changes: BTreeMap<FieldId, FieldOptions>,
    ) -> Result<(), GridError> {
        let field_options = &mut self.context.view.field_options;
        let previous: Vec<(FieldId, Option<FieldOptions>)> = changes
            .keys()
            .map(|field| (*field, field_options.get(field).cloned()))
            .collect();
        for (field, options) in &changes {
            field_options.insert(*field, options.clone());
        }
        let view_id = self.context.view.id;
        let field_options = &mut self.context.view.field_options;
        settle(
            source.update_field_options(view_id, &changes),
            previous,
            |previous| {
                for (field, options) in previous {
                    match options {
                        Some(options) => field_options.insert(field, options),
                        None => field_options.remove(&field),
                    };
                }
            },
        )
        .await?;
        debug!(view = view_id, fields = changes.len(), "updated field options");
        Ok(())
    }

    /// Put the listed fields first, in the given order.
    ///
    /// # Errors
    /// See [`Self::update_field_options`].
    pub async fn update_field_options_order(
        &mut self,
        source: &dyn RecordSource,
        order: &[FieldId],
    ) -> Result<(), GridError> {
        let mut reordered = self.context.view.clone();
        for field in order {
            reordered.field_options.entry(*field).or_default();
        }
        reordered.reorder_fields(order);
        self.update_field_options(source, reordered.field_options)
            .await
    }

    /// Edit filters, sorts or other view settings; follow with a refresh.
    pub fn update_view<F>(&mut self, update: F)
    where
        F: FnOnce(&mut View),
    {
        update(&mut self.context.view);
    }
}
