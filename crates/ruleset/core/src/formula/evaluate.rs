//! Formula evaluation logic.
//!
//! Evaluates a parsed [`Expr`] against a JSON data context. Evaluation is pure:
//! it only reads the context and never allocates beyond path lookups.

use serde_json::Value;

use super::{BinaryOp, Expr, FormulaError, Function};
use crate::document::{coerce_number, get_path};

/// Evaluate an expression to a number.
///
/// ## Lookup rules
/// - `@path` resolves against `ctx` using dotted segments
/// - missing paths and non-numeric leaves resolve to 0 (logged when `warn_missing` is set)
///
/// ## Error Handling
/// - `DivisionByZero` for `/` or `%` by zero
/// - `NonFinite` if the final result is NaN or infinite
pub fn evaluate(expr: &Expr, ctx: &Value, warn_missing: bool) -> Result<f64, FormulaError> {
    let value = eval_node(expr, ctx, warn_missing)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::NonFinite)
    }
}

fn eval_node(expr: &Expr, ctx: &Value, warn_missing: bool) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(value) => Ok(*value),

        Expr::Path(path) => Ok(lookup(path, ctx, warn_missing)),

        Expr::Neg(inner) => Ok(-eval_node(inner, ctx, warn_missing)?),

        Expr::Binary { op, lhs, rhs } => {
            let l = eval_node(lhs, ctx, warn_missing)?;
            let r = eval_node(rhs, ctx, warn_missing)?;
            match op {
                BinaryOp::Add => Ok(l + r),
                BinaryOp::Sub => Ok(l - r),
                BinaryOp::Mul => Ok(l * r),
                BinaryOp::Div | BinaryOp::Rem if r == 0.0 => Err(FormulaError::DivisionByZero),
                BinaryOp::Div => Ok(l / r),
                BinaryOp::Rem => Ok(l % r),
            }
        }

        Expr::Call { func, args } => {
            let values = args
                .iter()
                .map(|arg| eval_node(arg, ctx, warn_missing))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(apply_function(*func, &values))
        }
    }
}

fn lookup(path: &str, ctx: &Value, warn_missing: bool) -> f64 {
    match get_path(ctx, path) {
        Some(value) => match coerce_number(value) {
            Some(number) => number,
            None => {
                if warn_missing {
                    tracing::warn!(
                        target: "ruleset::formula",
                        path,
                        value = %value,
                        "Formula reference is not numeric, using 0"
                    );
                }
                0.0
            }
        },
        None => {
            if warn_missing {
                tracing::warn!(
                    target: "ruleset::formula",
                    path,
                    "Formula reference not found in context, using 0"
                );
            }
            0.0
        }
    }
}

fn apply_function(func: Function, values: &[f64]) -> f64 {
    let first = values.first().copied().unwrap_or(0.0);
    match func {
        Function::Floor => first.floor(),
        Function::Ceil => first.ceil(),
        // Half rounds toward positive infinity
        Function::Round => (first + 0.5).floor(),
        Function::Trunc => first.trunc(),
        Function::Abs => first.abs(),
        Function::Sign => {
            if first == 0.0 {
                0.0
            } else {
                first.signum()
            }
        }
        Function::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Function::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::formula::parse::parse;

    fn eval(source: &str, ctx: &Value) -> Result<f64, FormulaError> {
        evaluate(&parse(source).unwrap(), ctx, false)
    }

    #[test]
    fn resolves_paths_and_arithmetic() {
        let ctx = json!({ "abilities": { "str": { "mod": 3 } }, "details": { "level": 5 } });
        assert_eq!(eval("@abilities.str.mod + 2", &ctx), Ok(5.0));
        assert_eq!(eval("@abilities.str.mod * (@details.level - 1)", &ctx), Ok(12.0));
        assert_eq!(eval("-@abilities.str.mod", &ctx), Ok(-3.0));
        assert_eq!(eval("7 % 4", &ctx), Ok(3.0));
    }

    #[test]
    fn missing_path_is_zero() {
        let ctx = json!({});
        assert_eq!(eval("@attributes.missing + 4", &ctx), Ok(4.0));
    }

    #[test]
    fn numeric_strings_coerce() {
        let ctx = json!({ "bonus": "2", "flag": true, "name": "Bob" });
        assert_eq!(eval("@bonus + @flag", &ctx), Ok(3.0));
        assert_eq!(eval("@name", &ctx), Ok(0.0));
    }

    #[test]
    fn functions() {
        let ctx = json!({ "level": 7 });
        assert_eq!(eval("floor(@level / 2)", &ctx), Ok(3.0));
        assert_eq!(eval("ceil(@level / 2)", &ctx), Ok(4.0));
        assert_eq!(eval("round(2.5)", &ctx), Ok(3.0));
        assert_eq!(eval("round(-2.5)", &ctx), Ok(-2.0));
        assert_eq!(eval("max(1, @level, 3)", &ctx), Ok(7.0));
        assert_eq!(eval("min(1, @level, 3)", &ctx), Ok(1.0));
        assert_eq!(eval("abs(-4) + sign(-9) + trunc(1.9)", &ctx), Ok(4.0));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let ctx = json!({ "zero": 0 });
        assert_eq!(eval("1 / @zero", &ctx), Err(FormulaError::DivisionByZero));
        assert_eq!(eval("1 % 0", &ctx), Err(FormulaError::DivisionByZero));
    }
}
