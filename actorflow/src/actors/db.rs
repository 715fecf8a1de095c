//! Runs a query for every trigger token.

use crate::actor::options::parse_bool;
use crate::actor::{Actor, ActorBase, ActorOption, Configurable};
use crate::configurable_options;
use crate::context::FlowContext;
use crate::core::{PayloadType, Token};
use crate::errors::ActorflowError;
use crate::provenance::ActorType;
use crate::variables::extract_names;
use async_trait::async_trait;
use tracing::debug;

/// Runs `sql` (after variable expansion) against the flow's database and
/// queues one map token per row.
///
/// An empty result is an error unless `lenient` is set.
#[derive(Debug)]
pub struct DbQuery {
    base: ActorBase,
    sql: String,
    lenient: bool,
}

impl DbQuery {
    /// Creates the actor.
    #[must_use]
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            sql: sql.into(),
            lenient: false,
        }
    }

    /// Accepts empty results.
    #[must_use]
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }
}

impl Configurable for DbQuery {
    const OPTIONS: &'static [ActorOption<Self>] = &[
        ActorOption {
            name: "sql",
            description: "The query; may contain variables.",
            set: |a, v| {
                a.sql = v.to_string();
                Ok(())
            },
            get: |a| a.sql.clone(),
        },
        ActorOption {
            name: "lenient",
            description: "Whether an empty result is acceptable.",
            set: |a, v| {
                a.lenient = parse_bool(v)?;
                Ok(())
            },
            get: |a| a.lenient.to_string(),
        },
    ];
}

#[async_trait]
impl Actor for DbQuery {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn generates(&self) -> Vec<PayloadType> {
        vec![PayloadType::Map]
    }

    fn referenced_variables(&self) -> Vec<String> {
        extract_names(&self.sql)
    }

    fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ActorflowError> {
        if self.sql.trim().is_empty() {
            return Err(ActorflowError::configuration(
                self.base.full_name(),
                "No SQL provided!",
            ));
        }
        ctx.database()?;
        Ok(())
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        let Some(trigger) = input else {
            return Ok(());
        };
        let sql = ctx.expand(&self.sql)?;
        let rows = ctx.database()?.execute_query(&sql)?;
        debug!(actor = %self.base.full_name(), rows = rows.len(), "Query executed");

        if rows.is_empty() && !self.lenient {
            return Err(ActorflowError::execution(
                self.base.full_name(),
                format!("No rows returned: {sql}"),
            ));
        }
        for row in rows {
            let token = ctx.provenance().derive(
                Some(&trigger),
                row,
                self.base.full_name(),
                ActorType::DataGenerator,
            );
            self.base.emit(token);
        }
        Ok(())
    }

    configurable_options!();
}
