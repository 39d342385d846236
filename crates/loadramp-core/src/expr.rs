//! Engine expression helpers for values that can only be combined at runtime.

use std::time::Duration;

use crate::param::{duration_to_seconds, Param};

/// Builds an engine function call, escaping argument separators.
#[must_use]
pub fn function_call(name: &str, args: &[&str]) -> String {
    if args.is_empty() {
        return format!("${{{name}}}");
    }
    let args = args
        .iter()
        .map(|arg| arg.replace('\\', "\\\\").replace(',', "\\,"))
        .collect::<Vec<_>>()
        .join(",");
    format!("${{{name}({args})}}")
}

/// Wraps a script into a `__groovy` function call.
#[must_use]
pub fn groovy(script: &str) -> String {
    function_call("__groovy", &[script])
}

/// Groovy snippet evaluating `expr` (which may itself contain engine
/// functions or properties) to an int at runtime.
///
/// `${` is swapped for a placeholder so the engine leaves the inner text
/// alone until `CompoundVariable` resolves it.
#[must_use]
pub fn int_solving_expression(expr: &str) -> String {
    let mut placeholder = String::from("#");
    while expr.contains(&format!("{placeholder}{{")) {
        placeholder.push('#');
    }
    let escaped = expr
        .replace("${", &format!("{placeholder}{{"))
        .replace('\\', "\\\\")
        .replace('\'', "\\'");
    format!(
        "(new org.apache.jmeter.engine.util.CompoundVariable('{escaped}'.replace('{placeholder}','$')).execute() as int)"
    )
}

/// Adds two durations, deferring to a runtime expression when either one is
/// not a literal.
#[must_use]
pub fn sum_durations(left: &Param<Duration>, right: &Param<Duration>) -> Param<Duration> {
    match (left, right) {
        (Param::Literal(l), Param::Literal(r)) => Param::Literal(*l + *r),
        _ => {
            let left = seconds_text(left);
            let right = seconds_text(right);
            Param::Expression(groovy(&format!(
                "{} + {}",
                int_solving_expression(&left),
                int_solving_expression(&right)
            )))
        }
    }
}

fn seconds_text(param: &Param<Duration>) -> String {
    match param {
        Param::Literal(d) => duration_to_seconds(*d).to_string(),
        Param::Expression(expr) => expr.clone(),
    }
}
