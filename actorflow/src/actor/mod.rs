//! The actor contract.
//!
//! An actor is one pipeline stage. Implementations provide the hooks of
//! [`Actor`]; the [`lifecycle`] functions wrap those hooks with the state
//! machine, variable re-binding, stop handling and the conversion of every
//! failure into a message. The driver only ever calls the lifecycle
//! functions.
//!
//! ```text
//! Unconfigured -> SetUp -> Ready -> Executing -> (Ready | Stopped | Failed)
//! ```

mod backup;
mod base;
pub mod lifecycle;
pub mod options;
mod watcher;

pub use backup::BackupState;
pub use base::ActorBase;
pub use options::{ActorOption, Configurable};
pub use watcher::VariableWatcher;

use crate::context::FlowContext;
use crate::core::{ActorKind, PayloadType, Token};
use crate::errors::ActorflowError;
use crate::variables::VariableChangeEvent;
use async_trait::async_trait;

/// The contract every pipeline stage implements.
///
/// Only [`base`](Actor::base), [`base_mut`](Actor::base_mut) and
/// [`do_execute`](Actor::do_execute) are required. Everything else has a
/// default suited to a plain transformer that accepts anything.
#[async_trait]
pub trait Actor: Send + Sync + std::fmt::Debug {
    /// Returns the shared actor state.
    fn base(&self) -> &ActorBase;

    /// Returns the shared actor state, mutably.
    fn base_mut(&mut self) -> &mut ActorBase;

    /// Returns the role of the actor in a sequence.
    fn kind(&self) -> ActorKind {
        ActorKind::Transformer
    }

    /// Returns the payload types the actor accepts.
    fn accepts(&self) -> Vec<PayloadType> {
        vec![PayloadType::Unknown]
    }

    /// Returns the payload types the actor may generate.
    fn generates(&self) -> Vec<PayloadType> {
        vec![PayloadType::Unknown]
    }

    /// Places the actor below `parent`. Container actors override this to
    /// re-parent their children too.
    fn set_parent(&mut self, parent: &str) {
        self.base_mut().set_parent(parent);
    }

    /// Validates the configuration and allocates resources.
    ///
    /// Bound options have already been resolved when this runs. Must be
    /// idempotent: it runs again when a watched variable changes.
    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        Ok(())
    }

    /// Performs one unit of work, queueing zero or more outputs through
    /// [`ActorBase::emit`]. `input` is `None` for sources, standalones and
    /// re-executions of unfinished actors.
    async fn do_execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError>;

    /// Returns true while output tokens are waiting.
    fn has_pending_output(&self) -> bool {
        self.base().has_pending_output()
    }

    /// Returns the next output token.
    fn output(&mut self, _ctx: &FlowContext) -> Option<Token> {
        self.base_mut().pop_output()
    }

    /// Returns false to be executed again, without input, before upstream
    /// supplies the next token.
    fn is_finished(&self) -> bool {
        true
    }

    /// Releases resources. Runs even if set-up or execution never ran or
    /// failed.
    fn wrap_up(&mut self, _ctx: &FlowContext) {}

    /// Returns the variables referenced by the configuration, e.g. the
    /// placeholders of an expression.
    fn referenced_variables(&self) -> Vec<String> {
        Vec::new()
    }

    /// Returns the callable actors referenced by literal name, checked when
    /// the flow is built. Variable-bound references are only checked at
    /// set-up.
    fn referenced_callables(&self) -> Vec<String> {
        Vec::new()
    }

    /// Snapshots derived state that must survive a re-set-up.
    fn backup_state(&self) -> BackupState {
        BackupState::new()
    }

    /// Restores a snapshot taken by [`backup_state`](Actor::backup_state).
    fn restore_state(&mut self, _state: &mut BackupState) {}

    /// Called after a re-set-up caused by changes to watched variables, so
    /// the actor can invalidate caches built under the old values.
    fn variable_changed(&mut self, _events: &[VariableChangeEvent]) {}

    /// Applies a value to an actor-specific option.
    fn apply_option(&mut self, name: &str, _value: &str) -> Result<(), ActorflowError> {
        Err(ActorflowError::configuration(
            self.base().full_name(),
            format!("Unknown option: {name}"),
        ))
    }

    /// Returns the current value of an actor-specific option.
    fn option_value(&self, _name: &str) -> Option<String> {
        None
    }

    /// Returns the actor-specific option names.
    fn option_names(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

/// Implements the option methods of [`Actor`] from the type's
/// [`Configurable`] table. Use inside an `impl Actor for ...` block.
#[macro_export]
macro_rules! configurable_options {
    () => {
        fn apply_option(
            &mut self,
            name: &str,
            value: &str,
        ) -> Result<(), $crate::errors::ActorflowError> {
            $crate::actor::options::apply(self, name, value)
        }

        fn option_value(&self, name: &str) -> Option<String> {
            $crate::actor::options::value(self, name)
        }

        fn option_names(&self) -> Vec<&'static str> {
            $crate::actor::options::names::<Self>()
        }
    };
}
