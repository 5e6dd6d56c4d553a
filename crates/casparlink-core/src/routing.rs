// ── Routing resolver ──
//
// Maps named inputs to what the device understands. Reads the
// store on every call, so a delete is visible to the very next route.

use std::sync::Arc;

use crate::error::CoreError;
use crate::store::ConfigStore;

/// A device-side locator derived from a config record, e.g. `DECKLINK 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteExpression(String);

impl RouteExpression {
    pub fn new(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone)]
pub struct RoutingResolver {
    store: Arc<dyn ConfigStore>,
}

impl RoutingResolver {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// Resolve an input id to the route expression built from its `source`.
    pub fn resolve(&self, input_id: &str) -> Result<RouteExpression, CoreError> {
        let input = self
            .store
            .input(input_id)
            .ok_or_else(|| CoreError::UnknownInput {
                id: input_id.to_owned(),
            })?;
        Ok(RouteExpression::new(input.source.trim()))
    }
}
