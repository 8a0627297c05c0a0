//! PostgreSQL SQL dialect.

use crate::core::{Dialect, TriggerRef};

/// Identifier quoting, placeholders and the few statements that differ per engine.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        Self
    }

    fn quote_literal(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn byte_order(&self, expr: &str) -> String {
        format!("{} COLLATE \"C\"", expr)
    }

    fn generator_value_sql(&self, generator: &str) -> String {
        format!("SELECT last_value FROM {}", self.quote_ident(generator))
    }

    fn set_generator_sql(&self, generator: &str, value: i64) -> String {
        // setval takes a regclass literal, so the quoted name goes inside a string
        format!(
            "SELECT setval({}, {})",
            Self::quote_literal(&self.quote_ident(generator)),
            value
        )
    }

    fn set_trigger_enabled_sql(&self, trigger: &TriggerRef, enabled: bool) -> String {
        format!(
            "ALTER TABLE {} {} TRIGGER {}",
            self.quote_ident(&trigger.table),
            if enabled { "ENABLE" } else { "DISABLE" },
            self.quote_ident(&trigger.name)
        )
    }
}
