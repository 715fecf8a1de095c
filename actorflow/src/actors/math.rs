//! Evaluates an arithmetic expression for every numeric token.

use super::expression::Expr;
use crate::actor::options::{parse_bool, parse_i64};
use crate::actor::{Actor, ActorBase, ActorOption, Configurable};
use crate::configurable_options;
use crate::context::FlowContext;
use crate::core::{PayloadType, Token};
use crate::errors::ActorflowError;
use crate::provenance::ActorType;
use crate::variables::extract_names;
use async_trait::async_trait;

/// Evaluates `expression` with `X` bound to the input value.
///
/// Placeholders such as `pow(X,@{exp})` are expanded at set-up and the
/// parsed expression is cached; a change of `exp` re-runs set-up, so no
/// stale expression survives.
#[derive(Debug)]
pub struct MathExpression {
    base: ActorBase,
    expression: String,
    round_output: bool,
    num_decimals: u32,
    parsed: Option<Expr>,
}

impl MathExpression {
    /// Creates the actor.
    #[must_use]
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            expression: expression.into(),
            round_output: false,
            num_decimals: 3,
            parsed: None,
        }
    }

    /// Rounds every result to `num_decimals` places.
    #[must_use]
    pub fn with_rounding(mut self, num_decimals: u32) -> Self {
        self.round_output = true;
        self.num_decimals = num_decimals;
        self
    }

    /// Returns the configured, unexpanded expression.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn round(&self, value: f64) -> f64 {
        if !self.round_output {
            return value;
        }
        let factor = 10_f64.powi(i32::try_from(self.num_decimals).unwrap_or(i32::MAX));
        (value * factor).round() / factor
    }
}

impl Configurable for MathExpression {
    const OPTIONS: &'static [ActorOption<Self>] = &[
        ActorOption {
            name: "expression",
            description: "The expression to evaluate, using X for the input value.",
            set: |a, v| {
                a.expression = v.to_string();
                Ok(())
            },
            get: |a| a.expression.clone(),
        },
        ActorOption {
            name: "round-output",
            description: "Whether to round the result.",
            set: |a, v| {
                a.round_output = parse_bool(v)?;
                Ok(())
            },
            get: |a| a.round_output.to_string(),
        },
        ActorOption {
            name: "num-decimals",
            description: "The number of decimals to round to.",
            set: |a, v| {
                a.num_decimals = u32::try_from(parse_i64(v)?).map_err(|e| e.to_string())?;
                Ok(())
            },
            get: |a| a.num_decimals.to_string(),
        },
    ];
}

#[async_trait]
impl Actor for MathExpression {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn accepts(&self) -> Vec<PayloadType> {
        vec![PayloadType::Number]
    }

    fn generates(&self) -> Vec<PayloadType> {
        vec![PayloadType::Double]
    }

    fn referenced_variables(&self) -> Vec<String> {
        extract_names(&self.expression)
    }

    fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ActorflowError> {
        self.parsed = None;
        if self.expression.trim().is_empty() {
            return Err(ActorflowError::configuration(
                self.base.full_name(),
                "No expression provided!",
            ));
        }
        let expanded = ctx.expand(&self.expression)?;
        let parsed = Expr::parse(&expanded).map_err(|e| {
            ActorflowError::configuration(
                self.base.full_name(),
                format!("Invalid expression '{expanded}': {e}"),
            )
        })?;
        self.parsed = Some(parsed);
        Ok(())
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        let Some(token) = input else {
            return Ok(());
        };
        let expr = self.parsed.as_ref().ok_or_else(|| {
            ActorflowError::execution(self.base.full_name(), "Expression not set up")
        })?;
        let x = token.payload().as_f64().ok_or_else(|| {
            ActorflowError::execution(
                self.base.full_name(),
                format!("Not a number: {}", token.payload()),
            )
        })?;

        let value = self.round(expr.eval(x));
        let output = ctx.provenance().derive(
            Some(&token),
            value,
            self.base.full_name(),
            ActorType::Modifier,
        );
        self.base.emit(output);
        Ok(())
    }

    configurable_options!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::lifecycle;
    use crate::config::FlowConfig;
    use crate::core::Payload;

    async fn evaluate(actor: &mut MathExpression, ctx: &FlowContext, x: i64) -> Payload {
        lifecycle::execute(actor, Some(Token::new(x)), ctx).await.unwrap();
        lifecycle::output(actor, ctx).unwrap().into_payload()
    }

    #[tokio::test]
    async fn test_rounding() {
        let ctx = FlowContext::new("Flow", FlowConfig::default());
        let mut math = MathExpression::new("Math", "X / 3").with_rounding(2);
        lifecycle::set_up(&mut math, &ctx).unwrap();

        assert_eq!(evaluate(&mut math, &ctx, 1).await, Payload::from(0.33));
    }

    #[tokio::test]
    async fn test_empty_expression() {
        let ctx = FlowContext::new("Flow", FlowConfig::default());
        let mut math = MathExpression::new("Math", "  ");
        math.set_parent("Flow");

        let err = lifecycle::set_up(&mut math, &ctx).unwrap_err();
        assert_eq!(err, "Flow.Math: No expression provided!");
    }

    #[tokio::test]
    async fn test_unset_placeholder_is_configuration_error() {
        let ctx = FlowContext::new("Flow", FlowConfig::default());
        let mut math = MathExpression::new("Math", "pow(X,@{exp})");

        let err = lifecycle::set_up(&mut math, &ctx).unwrap_err();
        assert!(err.contains("Invalid expression 'pow(X,@{exp})'"));
    }

    #[tokio::test]
    async fn test_provenance_recorded() {
        let ctx = FlowContext::new("Flow", FlowConfig::default().with_provenance(true));
        let mut math = MathExpression::new("Math", "X + 1");
        math.set_parent("Flow");
        lifecycle::set_up(&mut math, &ctx).unwrap();

        lifecycle::execute(&mut math, Some(Token::new(1_i64)), &ctx)
            .await
            .unwrap();
        let token = lifecycle::output(&mut math, &ctx).unwrap();
        let chain = token.provenance().unwrap();
        assert_eq!(chain.actors(), vec!["Flow.Math"]);
    }

    #[test]
    fn test_referenced_variables() {
        let math = MathExpression::new("Math", "pow(X,@{exp}) + @{offset}");
        assert_eq!(math.referenced_variables(), vec!["exp", "offset"]);
    }
}
