use super::checkpointer::CheckpointerType;

/// Safety cap on executed nodes per invoke, overridable per call.
pub const DEFAULT_MAX_STEPS: u32 = 100;

/// Runtime settings attached to a compiled graph.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Persistence namespace root; subgraphs extend it as `parent:name`.
    pub namespace: String,
    /// Default step cap for [`invoke`](crate::runtimes::GraphEngine::invoke).
    pub max_steps: u32,
    /// Which checkpoint/memory backend the engine builds on construction.
    pub checkpointer: CheckpointerType,
    /// Database file for the SQLite backend.
    pub sqlite_db_name: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            namespace: "session".to_string(),
            max_steps: DEFAULT_MAX_STEPS,
            checkpointer: CheckpointerType::InMemory,
            sqlite_db_name: Self::resolve_sqlite_db_name(None),
        }
    }
}

impl RuntimeConfig {
    fn resolve_sqlite_db_name(provided: Option<String>) -> Option<String> {
        if let Some(name) = provided {
            return Some(name);
        }
        dotenvy::dotenv().ok();
        Some(std::env::var("SQLITE_DB_NAME").unwrap_or_else(|_| "tutorgraph.db".to_string()))
    }

    pub fn new(
        namespace: impl Into<String>,
        checkpointer: CheckpointerType,
        sqlite_db_name: Option<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            max_steps: DEFAULT_MAX_STEPS,
            checkpointer,
            sqlite_db_name: Self::resolve_sqlite_db_name(sqlite_db_name),
        }
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}
