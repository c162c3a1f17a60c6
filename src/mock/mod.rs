//! Hands mocked data source results to the engine before refresh.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::diagnostics::Diagnostic;
use crate::engine::EngineContext;
use crate::plan::DataSourceAddress;
use crate::spec::MockedDataSource;
use crate::value::Value;

/// Mocked read results, one per data source address
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockTable {
    entries: IndexMap<DataSourceAddress, Value>,
}

impl MockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mock, returning the value it replaced
    pub fn insert(&mut self, address: DataSourceAddress, value: Value) -> Option<Value> {
        self.entries.insert(address, value)
    }

    pub fn get(&self, address: &DataSourceAddress) -> Option<&Value> {
        self.entries.get(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Register every mock with the engine context.
///
/// Duplicates keep the last declaration and mocks for data sources the
/// configuration never reads are still registered; both only warn. Errors
/// come from the engine refusing the table.
pub fn inject(ctx: &mut dyn EngineContext, mocks: &[MockedDataSource]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut table = MockTable::new();

    for mock in mocks {
        if table.insert(mock.address.clone(), mock.value.clone()).is_some() {
            diagnostics.push(
                Diagnostic::warning(
                    "Duplicate mock",
                    format!(
                        "{} is mocked more than once; the last declaration wins",
                        mock.address
                    ),
                )
                .with_location(mock.location.clone()),
            );
        }
    }

    let referenced = ctx.data_sources();
    for mock in mocks {
        if !referenced.contains(&mock.address) {
            warn!(address = %mock.address, "mock is not used by the configuration");
            diagnostics.push(
                Diagnostic::warning(
                    "Unused mock",
                    format!(
                        "mock for {} is not used by the configuration",
                        mock.address
                    ),
                )
                .with_location(mock.location.clone()),
            );
        }
    }

    debug!(count = table.len(), "registering mocks");
    diagnostics.extend(ctx.register_mocks(table));
    diagnostics
}
