//! Statically typed option tables.
//!
//! Each configurable actor publishes a compile-time table mapping option
//! names to a setter and a getter. A scripting or GUI layer sets options by
//! name through [`set_option`]; Rust callers use the actor's typed
//! constructors and setters directly.
//!
//! Setting an option to a placeholder such as `@{factor}` binds it to that
//! variable instead. Bound options are resolved at set-up and re-resolved
//! whenever the variable changes.

use super::Actor;
use crate::errors::ActorflowError;
use crate::variables::{extract_name, is_placeholder, pad_name};

/// Options every actor understands.
pub const COMMON_OPTIONS: [&str; 3] = ["skip", "stop-flow-on-error", "annotation"];

/// One entry of an actor's option table.
pub struct ActorOption<A> {
    /// The option name, e.g. `expression`.
    pub name: &'static str,
    /// Help text.
    pub description: &'static str,
    /// Parses and applies a value.
    pub set: fn(&mut A, &str) -> Result<(), String>,
    /// Renders the current value.
    pub get: fn(&A) -> String,
}

impl<A> std::fmt::Debug for ActorOption<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorOption")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// An actor with an option table.
pub trait Configurable: Sized + 'static {
    /// The option table.
    const OPTIONS: &'static [ActorOption<Self>];
}

/// Applies `value` to the typed option `name` of `actor`.
pub fn apply<A: Configurable + Actor>(
    actor: &mut A,
    name: &str,
    value: &str,
) -> Result<(), ActorflowError> {
    let option = A::OPTIONS.iter().find(|o| o.name == name).ok_or_else(|| {
        ActorflowError::configuration(actor.base().full_name(), format!("Unknown option: {name}"))
    })?;
    (option.set)(actor, value).map_err(|reason| {
        ActorflowError::configuration(
            actor.base().full_name(),
            format!("Invalid value '{value}' for option '{name}': {reason}"),
        )
    })
}

/// Returns the current value of the typed option `name`.
pub fn value<A: Configurable + Actor>(actor: &A, name: &str) -> Option<String> {
    A::OPTIONS
        .iter()
        .find(|o| o.name == name)
        .map(|o| (o.get)(actor))
}

/// Returns the typed option names of `A`.
#[must_use]
pub fn names<A: Configurable>() -> Vec<&'static str> {
    A::OPTIONS.iter().map(|o| o.name).collect()
}

/// Returns the description of the typed option `name`.
#[must_use]
pub fn description<A: Configurable>(name: &str) -> Option<&'static str> {
    A::OPTIONS
        .iter()
        .find(|o| o.name == name)
        .map(|o| o.description)
}

/// Returns all option names of `actor`, common ones first.
#[must_use]
pub fn option_names(actor: &dyn Actor) -> Vec<&'static str> {
    let mut names = COMMON_OPTIONS.to_vec();
    names.extend(actor.option_names());
    names
}

/// Sets an option by name.
///
/// A placeholder value binds the option to that variable; any other value
/// removes an existing binding and is applied immediately.
pub fn set_option(actor: &mut dyn Actor, name: &str, value: &str) -> Result<(), ActorflowError> {
    if !option_names(actor).contains(&name) {
        return Err(ActorflowError::configuration(
            actor.base().full_name(),
            format!("Unknown option: {name}"),
        ));
    }
    if is_placeholder(value) {
        actor.base_mut().bind(name, extract_name(value));
        return Ok(());
    }
    actor.base_mut().unbind(name);
    apply_value(actor, name, value)
}

/// Returns an option's value: the placeholder for bound options, the
/// current value otherwise.
#[must_use]
pub fn get_option(actor: &dyn Actor, name: &str) -> Option<String> {
    if let Some(variable) = actor.base().binding(name) {
        return Some(pad_name(variable));
    }
    match name {
        "skip" => Some(actor.base().skip().to_string()),
        "stop-flow-on-error" => Some(actor.base().stop_flow_on_error().to_string()),
        "annotation" => Some(actor.base().annotation().to_string()),
        _ => actor.option_value(name),
    }
}

/// Applies a concrete value to a common or typed option, leaving bindings
/// untouched.
pub fn apply_value(actor: &mut dyn Actor, name: &str, value: &str) -> Result<(), ActorflowError> {
    match name {
        "skip" => {
            let skip = parse_bool(value).map_err(|e| invalid(actor, name, value, &e))?;
            actor.base_mut().set_skip(skip);
            Ok(())
        }
        "stop-flow-on-error" => {
            let stop = parse_bool(value).map_err(|e| invalid(actor, name, value, &e))?;
            actor.base_mut().set_stop_flow_on_error(stop);
            Ok(())
        }
        "annotation" => {
            actor.base_mut().set_annotation(value);
            Ok(())
        }
        _ => actor.apply_option(name, value),
    }
}

fn invalid(actor: &dyn Actor, name: &str, value: &str, reason: &str) -> ActorflowError {
    ActorflowError::configuration(
        actor.base().full_name(),
        format!("Invalid value '{value}' for option '{name}': {reason}"),
    )
}

/// Parses a boolean option value.
pub fn parse_bool(value: &str) -> Result<bool, String> {
    value.trim().parse::<bool>().map_err(|e| e.to_string())
}

/// Parses a numeric option value.
pub fn parse_f64(value: &str) -> Result<f64, String> {
    value.trim().parse::<f64>().map_err(|e| e.to_string())
}

/// Parses an integer option value.
pub fn parse_i64(value: &str) -> Result<i64, String> {
    value.trim().parse::<i64>().map_err(|e| e.to_string())
}
