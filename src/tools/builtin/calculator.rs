//! Arithmetic calculator backed by arbitrary-precision decimals.
//!
//! The engine never does the core computation in native floats: inputs are
//! converted to `Decimal` up front, so exact-decimal inputs produce exact
//! results (`0.1 + 0.2 == 0.3`, not `0.30000000000000004`).

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

use crate::models::{CalcOperation, CalculationRequest, CalculationResult};
use crate::tools::tool::{parse_params, Tool, ToolError, ToolOutput};
use crate::validate::validate_calculation;

/// Stateless calculation engine.
///
/// The engine re-checks its own preconditions (arity, zero divisors) so it
/// stays safe even when invoked without going through the validator.
#[derive(Debug, Clone)]
pub struct Calculator {
    max_precision: u32,
}

impl Calculator {
    pub fn new(max_precision: u32) -> Self {
        Self { max_precision }
    }

    /// Evaluate a calculation request.
    pub fn calculate(&self, req: &CalculationRequest) -> Result<CalculationResult, ToolError> {
        let numbers = req
            .numbers
            .iter()
            .map(|n| to_decimal(*n))
            .collect::<Result<Vec<_>, _>>()?;

        let result = match req.operation {
            CalcOperation::Add => fold_add(&numbers)?,
            CalcOperation::Subtract => {
                let (a, b) = binary_operands(&numbers, req.operation)?;
                a.checked_sub(b).ok_or_else(overflow)?
            }
            CalcOperation::Multiply => fold_mul(&numbers)?,
            CalcOperation::Divide => {
                let (a, b) = binary_operands(&numbers, req.operation)?;
                if b.is_zero() {
                    return Err(ToolError::DivisionByZero("cannot divide by zero".into()));
                }
                a.checked_div(b).ok_or_else(overflow)?
            }
            CalcOperation::Power => {
                let (base, exponent) = binary_operands(&numbers, req.operation)?;
                if base.is_zero() && exponent.is_sign_negative() && !exponent.is_zero() {
                    return Err(ToolError::InvalidArgument(
                        "cannot raise zero to a negative power".into(),
                    ));
                }
                base.checked_powd(exponent).ok_or_else(overflow)?
            }
            CalcOperation::Modulo => {
                let (a, b) = binary_operands(&numbers, req.operation)?;
                if b.is_zero() {
                    return Err(ToolError::DivisionByZero(
                        "cannot calculate modulo by zero".into(),
                    ));
                }
                a.checked_rem(b).ok_or_else(overflow)?
            }
        };

        let precision = req.precision.min(self.max_precision);
        let formatted = format_with_precision(result, precision);

        tracing::debug!(operation = %req.operation, ?numbers, %result, "calculated");

        Ok(CalculationResult {
            result,
            operation: req.operation,
            input_numbers: req.numbers.clone(),
            formatted,
        })
    }

    /// Sanity probe: 1 + 2 must equal 3.
    pub fn health_check(&self) -> bool {
        let req = CalculationRequest {
            operation: CalcOperation::Add,
            numbers: vec![1.0, 2.0],
            precision: 2,
        };
        self.calculate(&req)
            .map(|r| r.result == Decimal::from(3))
            .unwrap_or(false)
    }
}

fn to_decimal(n: f64) -> Result<Decimal, ToolError> {
    if !n.is_finite() {
        return Err(ToolError::InvalidArgument(format!("non-finite value: {n}")));
    }
    Decimal::from_f64(n)
        .ok_or_else(|| ToolError::InvalidArgument(format!("value out of decimal range: {n}")))
}

fn fold_add(numbers: &[Decimal]) -> Result<Decimal, ToolError> {
    numbers
        .iter()
        .try_fold(Decimal::ZERO, |acc, n| acc.checked_add(*n))
        .ok_or_else(overflow)
}

fn fold_mul(numbers: &[Decimal]) -> Result<Decimal, ToolError> {
    numbers
        .iter()
        .try_fold(Decimal::ONE, |acc, n| acc.checked_mul(*n))
        .ok_or_else(overflow)
}

fn binary_operands(
    numbers: &[Decimal],
    operation: CalcOperation,
) -> Result<(Decimal, Decimal), ToolError> {
    match numbers {
        [a, b] => Ok((*a, *b)),
        _ => Err(ToolError::InvalidArgument(format!(
            "operation {operation} requires exactly 2 numbers"
        ))),
    }
}

fn overflow() -> ToolError {
    ToolError::InvalidArgument("arithmetic overflow".into())
}

/// Render a decimal at the requested precision.
///
/// Precision 0 truncates toward the integral value; otherwise the value is
/// rounded (midpoint away from zero) and padded to exactly `precision`
/// fractional digits.
fn format_with_precision(value: Decimal, precision: u32) -> String {
    if precision == 0 {
        return value.trunc().normalize().to_string();
    }

    let rounded = value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    let rendered = rounded.normalize().to_string();
    match rendered.split_once('.') {
        Some((int, frac)) => format!("{int}.{frac:0<width$}", width = precision as usize),
        None => format!("{rendered}.{}", "0".repeat(precision as usize)),
    }
}

/// Tool wrapper: validation then evaluation.
pub struct CalculatorTool {
    calculator: Calculator,
}

impl CalculatorTool {
    pub fn new(calculator: Calculator) -> Self {
        Self { calculator }
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Perform arithmetic with decimal precision. Supports add, subtract, \
         multiply, divide, power, and modulo over 1-10 numbers."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide", "power", "modulo"],
                    "description": "Arithmetic operation to perform"
                },
                "numbers": {
                    "type": "array",
                    "items": { "type": "number" },
                    "minItems": 1,
                    "maxItems": 10,
                    "description": "Numbers to operate on; binary operations take exactly 2"
                },
                "precision": {
                    "type": "integer",
                    "minimum": 0,
                    "maximum": 15,
                    "default": 2,
                    "description": "Decimal digits in the formatted result"
                }
            },
            "required": ["operation", "numbers"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let request: CalculationRequest = parse_params(params)?;

        validate_calculation(&request).into_result()?;

        let result = self.calculator.calculate(&request)?;
        tracing::info!(operation = %request.operation, formatted = %result.formatted, "calculation completed");

        ToolOutput::from_serialize(&result, start.elapsed())
    }

    async fn health_check(&self) -> bool {
        self.calculator.health_check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn engine() -> Calculator {
        Calculator::new(15)
    }

    fn run(operation: CalcOperation, numbers: Vec<f64>, precision: u32) -> CalculationResult {
        engine()
            .calculate(&CalculationRequest {
                operation,
                numbers,
                precision,
            })
            .unwrap()
    }

    #[test]
    fn add_is_exact_for_decimal_inputs() {
        let result = run(CalcOperation::Add, vec![0.1, 0.2], 1);
        assert_eq!(result.result, dec!(0.3));
        assert_eq!(result.formatted, "0.3");
    }

    #[test]
    fn add_folds_all_numbers() {
        let result = run(CalcOperation::Add, vec![1.5, 2.5, 3.0], 2);
        assert_eq!(result.result, dec!(7));
        assert_eq!(result.formatted, "7.00");
    }

    #[test]
    fn subtract() {
        let result = run(CalcOperation::Subtract, vec![5.0, 7.5], 1);
        assert_eq!(result.result, dec!(-2.5));
        assert_eq!(result.formatted, "-2.5");
    }

    #[test]
    fn multiply_with_zero_precision_truncates() {
        let result = run(CalcOperation::Multiply, vec![2.0, 3.0, 4.0], 0);
        assert_eq!(result.result, dec!(24));
        assert_eq!(result.formatted, "24");
    }

    #[test]
    fn divide_rounds_and_pads() {
        let result = run(CalcOperation::Divide, vec![10.0, 4.0], 2);
        assert_eq!(result.result, dec!(2.5));
        assert_eq!(result.formatted, "2.50");
    }

    #[test]
    fn divide_by_zero_fails_at_engine_level() {
        // Bypasses the validator entirely; the engine must still refuse.
        let err = engine()
            .calculate(&CalculationRequest {
                operation: CalcOperation::Divide,
                numbers: vec![10.0, 0.0],
                precision: 2,
            })
            .unwrap_err();
        assert!(matches!(err, ToolError::DivisionByZero(_)), "got {err}");
    }

    #[test]
    fn modulo_by_zero_fails_at_engine_level() {
        let err = engine()
            .calculate(&CalculationRequest {
                operation: CalcOperation::Modulo,
                numbers: vec![10.0, 0.0],
                precision: 2,
            })
            .unwrap_err();
        assert!(matches!(err, ToolError::DivisionByZero(_)));
    }

    #[test]
    fn power() {
        let result = run(CalcOperation::Power, vec![2.0, 10.0], 0);
        assert_eq!(result.result, dec!(1024));
        assert_eq!(result.formatted, "1024");
    }

    #[test]
    fn zero_to_negative_power_rejected() {
        let err = engine()
            .calculate(&CalculationRequest {
                operation: CalcOperation::Power,
                numbers: vec![0.0, -1.0],
                precision: 2,
            })
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[test]
    fn modulo() {
        let result = run(CalcOperation::Modulo, vec![10.0, 3.0], 0);
        assert_eq!(result.result, dec!(1));
        assert_eq!(result.formatted, "1");
    }

    #[test]
    fn engine_enforces_binary_arity_without_validator() {
        let err = engine()
            .calculate(&CalculationRequest {
                operation: CalcOperation::Subtract,
                numbers: vec![1.0, 2.0, 3.0],
                precision: 2,
            })
            .unwrap_err();
        assert!(err.to_string().contains("exactly 2 numbers"));
    }

    #[test]
    fn formatting_pads_with_zeros() {
        let result = run(CalcOperation::Add, vec![1.0], 3);
        assert_eq!(result.formatted, "1.000");
    }

    #[test]
    fn zero_precision_truncates_toward_integral() {
        let result = run(CalcOperation::Divide, vec![-3.0, 2.0], 0);
        assert_eq!(result.formatted, "-1");
        let result = run(CalcOperation::Divide, vec![7.0, 2.0], 0);
        assert_eq!(result.formatted, "3");
    }

    #[test]
    fn negative_zero_renders_unsigned() {
        // A negative factor times zero produces -0 internally; it must
        // render without the sign at every precision.
        let result = run(CalcOperation::Multiply, vec![-1.0, 0.0], 0);
        assert_eq!(result.formatted, "0");
        let result = run(CalcOperation::Multiply, vec![-1.0, 0.0], 2);
        assert_eq!(result.formatted, "0.00");
        assert_eq!(result.result, dec!(0));
    }

    #[test]
    fn result_echoes_inputs() {
        let result = run(CalcOperation::Add, vec![1.0, 2.0], 2);
        assert_eq!(result.operation, CalcOperation::Add);
        assert_eq!(result.input_numbers, vec![1.0, 2.0]);
    }

    #[test]
    fn health_check_passes() {
        assert!(engine().health_check());
    }

    #[tokio::test]
    async fn tool_rejects_divide_by_zero_at_validation() {
        let tool = CalculatorTool::new(engine());
        let err = tool
            .execute(serde_json::json!({
                "operation": "divide",
                "numbers": [10, 0]
            }))
            .await
            .unwrap_err();
        // The validator fires before the engine does.
        assert!(matches!(err, ToolError::InvalidArgument(_)), "got {err}");
        assert!(err.to_string().contains("division by zero"));
    }

    #[tokio::test]
    async fn tool_reports_all_violations_at_once() {
        let tool = CalculatorTool::new(engine());
        let err = tool
            .execute(serde_json::json!({
                "operation": "subtract",
                "numbers": [1, 2, 3],
                "precision": 99
            }))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("precision"));
        assert!(msg.contains("exactly 2 numbers"));
    }

    #[tokio::test]
    async fn tool_happy_path() {
        let tool = CalculatorTool::new(engine());
        let out = tool
            .execute(serde_json::json!({
                "operation": "multiply",
                "numbers": [2, 3, 4],
                "precision": 0
            }))
            .await
            .unwrap();
        assert_eq!(out.result.get("formatted").unwrap(), "24");
    }
}
