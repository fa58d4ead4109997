use super::context::Context;
use super::eval::{display, truthy, truthy_value, Resolved};
use super::TemplateError;
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// The closed set of functions templates may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Func {
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Upper,
    Lower,
    Title,
    Trunc,
    Base,
    Dir,
    Replace,
    Contains,
    Join,
    Len,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Default,
    Cache,
}

impl Func {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "and" => Func::And,
            "or" => Func::Or,
            "not" => Func::Not,
            "eq" => Func::Eq,
            "ne" => Func::Ne,
            "lt" => Func::Lt,
            "le" => Func::Le,
            "gt" => Func::Gt,
            "ge" => Func::Ge,
            "upper" => Func::Upper,
            "lower" => Func::Lower,
            "title" => Func::Title,
            "trunc" => Func::Trunc,
            "base" => Func::Base,
            "dir" => Func::Dir,
            "replace" => Func::Replace,
            "contains" => Func::Contains,
            "join" => Func::Join,
            "len" => Func::Len,
            "add" => Func::Add,
            "sub" => Func::Sub,
            "mul" => Func::Mul,
            "div" => Func::Div,
            "mod" => Func::Mod,
            "default" => Func::Default,
            "cache" => Func::Cache,
            _ => return None,
        };
        Some(func)
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Func::And => "and",
            Func::Or => "or",
            Func::Not => "not",
            Func::Eq => "eq",
            Func::Ne => "ne",
            Func::Lt => "lt",
            Func::Le => "le",
            Func::Gt => "gt",
            Func::Ge => "ge",
            Func::Upper => "upper",
            Func::Lower => "lower",
            Func::Title => "title",
            Func::Trunc => "trunc",
            Func::Base => "base",
            Func::Dir => "dir",
            Func::Replace => "replace",
            Func::Contains => "contains",
            Func::Join => "join",
            Func::Len => "len",
            Func::Add => "add",
            Func::Sub => "sub",
            Func::Mul => "mul",
            Func::Div => "div",
            Func::Mod => "mod",
            Func::Default => "default",
            Func::Cache => "cache",
        }
    }

    /// `and`/`or` are variadic and evaluated lazily by the evaluator.
    pub(crate) fn is_short_circuit(self) -> bool {
        matches!(self, Func::And | Func::Or)
    }

    fn arity(self) -> usize {
        match self {
            Func::Not | Func::Upper | Func::Lower | Func::Title | Func::Base | Func::Dir | Func::Len
            | Func::Cache => 1,
            Func::Replace => 3,
            _ => 2,
        }
    }
}

fn incorrect(message: String) -> TemplateError {
    TemplateError::IncorrectTemplate(message)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// Call an eagerly evaluated function.
pub(crate) fn call(func: Func, args: Vec<Resolved>, ctx: &Context<'_>) -> Result<Resolved, TemplateError> {
    if args.len() != func.arity() {
        return Err(incorrect(format!(
            "wrong number of args for {}: want {} got {}",
            func.name(),
            func.arity(),
            args.len()
        )));
    }

    match func {
        Func::Not => Ok(Resolved::Value(Value::Bool(!truthy(&args[0])))),
        Func::Default => {
            let mut args = args.into_iter();
            let (fallback, value) = match (args.next(), args.next()) {
                (Some(fallback), Some(value)) => (fallback, value),
                _ => return Err(incorrect("wrong number of args for default".into())),
            };
            match value {
                Resolved::Value(value) if truthy_value(&value) => Ok(Resolved::Value(value)),
                _ => match fallback {
                    Resolved::Missing(path) => Err(incorrect(format!("{} is not defined", path))),
                    fallback => Ok(fallback),
                },
            }
        }
        _ => {
            let values = args
                .into_iter()
                .map(|arg| match arg {
                    Resolved::Value(value) => Ok(value),
                    Resolved::Missing(path) => Err(incorrect(format!(
                        "{} is not defined (argument of {})",
                        path,
                        func.name()
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            apply(func, &values, ctx).map(Resolved::Value)
        }
    }
}

fn apply(func: Func, args: &[Value], ctx: &Context<'_>) -> Result<Value, TemplateError> {
    match func {
        Func::Eq => Ok(Value::Bool(equal(func, &args[0], &args[1])?)),
        Func::Ne => Ok(Value::Bool(!equal(func, &args[0], &args[1])?)),
        Func::Lt | Func::Le | Func::Gt | Func::Ge => {
            let ordering = order(func, &args[0], &args[1])?;
            let result = match func {
                Func::Lt => ordering == Ordering::Less,
                Func::Le => ordering != Ordering::Greater,
                Func::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        Func::Upper => Ok(str_arg(func, args, 0)?.to_uppercase().into()),
        Func::Lower => Ok(str_arg(func, args, 0)?.to_lowercase().into()),
        Func::Title => Ok(title(str_arg(func, args, 0)?).into()),
        Func::Trunc => {
            let length = int_arg(func, args, 0)?;
            Ok(truncate(str_arg(func, args, 1)?, length).into())
        }
        Func::Base => Ok(base(str_arg(func, args, 0)?).into()),
        Func::Dir => Ok(dir(str_arg(func, args, 0)?).into()),
        Func::Replace => {
            let old = str_arg(func, args, 0)?;
            let new = str_arg(func, args, 1)?;
            Ok(str_arg(func, args, 2)?.replace(old, new).into())
        }
        Func::Contains => {
            let needle = str_arg(func, args, 0)?;
            Ok(Value::Bool(str_arg(func, args, 1)?.contains(needle)))
        }
        Func::Join => {
            let separator = str_arg(func, args, 0)?;
            match &args[1] {
                Value::Array(items) => Ok(items.iter().map(display).collect::<Vec<_>>().join(separator).into()),
                other => Err(type_error(func, 2, "list", other)),
            }
        }
        Func::Len => match &args[0] {
            Value::String(s) => Ok(s.chars().count().into()),
            Value::Array(items) => Ok(items.len().into()),
            Value::Object(map) => Ok(map.len().into()),
            other => Err(incorrect(format!("len of type {}", kind(other)))),
        },
        Func::Add | Func::Sub | Func::Mul | Func::Div | Func::Mod => arithmetic(func, &args[0], &args[1]),
        Func::Cache => {
            let key = str_arg(func, args, 0)?;
            Ok(ctx.cached(key).unwrap_or_default().into())
        }
        Func::And | Func::Or | Func::Not | Func::Default => {
            Err(incorrect(format!("{} cannot be applied to evaluated arguments", func.name())))
        }
    }
}

fn type_error(func: Func, position: usize, expected: &str, got: &Value) -> TemplateError {
    incorrect(format!(
        "wrong type for value; expected {}; got {} (argument {} of {})",
        expected,
        kind(got),
        position,
        func.name()
    ))
}

fn str_arg<'v>(func: Func, args: &'v [Value], index: usize) -> Result<&'v str, TemplateError> {
    match &args[index] {
        Value::String(s) => Ok(s),
        other => Err(type_error(func, index + 1, "string", other)),
    }
}

fn int_arg(func: Func, args: &[Value], index: usize) -> Result<i64, TemplateError> {
    args[index]
        .as_i64()
        .ok_or_else(|| type_error(func, index + 1, "int", &args[index]))
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(func: Func, position: usize, value: &Value) -> Result<Self, TemplateError> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Num::Int(i)),
                None => n
                    .as_f64()
                    .map(Num::Float)
                    .ok_or_else(|| type_error(func, position, "number", value)),
            },
            other => Err(type_error(func, position, "number", other)),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn arithmetic(func: Func, left: &Value, right: &Value) -> Result<Value, TemplateError> {
    let a = Num::of(func, 1, left)?;
    let b = Num::of(func, 2, right)?;

    if let (Num::Int(a), Num::Int(b)) = (a, b) {
        let result = match func {
            Func::Add => a.checked_add(b),
            Func::Sub => a.checked_sub(b),
            Func::Mul => a.checked_mul(b),
            Func::Div if b == 0 => return Err(incorrect("integer divide by zero".into())),
            Func::Div => a.checked_div(b),
            Func::Mod if b == 0 => return Err(incorrect("integer divide by zero".into())),
            _ => a.checked_rem(b),
        };
        return result
            .map(Value::from)
            .ok_or_else(|| incorrect(format!("integer overflow in {}", func.name())));
    }

    let (a, b) = (a.as_f64(), b.as_f64());
    if matches!(func, Func::Div | Func::Mod) && b == 0.0 {
        return Err(incorrect("divide by zero".into()));
    }
    let result = match func {
        Func::Add => a + b,
        Func::Sub => a - b,
        Func::Mul => a * b,
        Func::Div => a / b,
        _ => a % b,
    };
    Number::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| incorrect(format!("non-finite result in {}", func.name())))
}

fn equal(func: Func, left: &Value, right: &Value) -> Result<bool, TemplateError> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        (Value::String(a), Value::String(b)) => Ok(a == b),
        (Value::Number(_), Value::Number(_)) => Ok(order(func, left, right)? == Ordering::Equal),
        (a, b) => Err(incorrect(format!(
            "incompatible types for comparison: {} and {}",
            kind(a),
            kind(b)
        ))),
    }
}

fn order(func: Func, left: &Value, right: &Value) -> Result<Ordering, TemplateError> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Number(_), Value::Number(_)) => {
            match (Num::of(func, 1, left)?, Num::of(func, 2, right)?) {
                (Num::Int(a), Num::Int(b)) => Ok(a.cmp(&b)),
                (a, b) => a
                    .as_f64()
                    .partial_cmp(&b.as_f64())
                    .ok_or_else(|| incorrect("incomparable numbers".into())),
            }
        }
        (a, b) => Err(incorrect(format!(
            "incompatible types for comparison: {} and {}",
            kind(a),
            kind(b)
        ))),
    }
}

fn title(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.chars() {
        if c.is_whitespace() {
            word_start = true;
            out.push(c);
        } else if word_start {
            out.extend(c.to_uppercase());
            word_start = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// First `length` characters, or the last `-length` when negative.
fn truncate(text: &str, length: i64) -> String {
    let keep = length.unsigned_abs() as usize;
    if length >= 0 {
        text.chars().take(keep).collect()
    } else {
        let total = text.chars().count();
        text.chars().skip(total.saturating_sub(keep)).collect()
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

fn base(path: &str) -> String {
    let trimmed = path.trim_end_matches(is_separator);
    if trimmed.is_empty() {
        return match path.chars().next() {
            Some(root) => root.to_string(),
            None => ".".to_string(),
        };
    }
    trimmed.rsplit(is_separator).next().unwrap_or(trimmed).to_string()
}

fn dir(path: &str) -> String {
    let trimmed = path.trim_end_matches(is_separator);
    match trimmed.rfind(is_separator) {
        Some(0) => trimmed[..1].to_string(),
        Some(index) => trimmed[..index].to_string(),
        None if trimmed.is_empty() && !path.is_empty() => path[..1].to_string(),
        None => ".".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_both_directions() {
        assert_eq!(truncate("posh-line", 4), "posh");
        assert_eq!(truncate("posh-line", -4), "line");
        assert_eq!(truncate("日本語", 2), "日本");
        assert_eq!(truncate("ab", 10), "ab");
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(base("/home/user/src/"), "src");
        assert_eq!(base("C:\\Users\\me"), "me");
        assert_eq!(base("/"), "/");
        assert_eq!(dir("/home/user/src"), "/home/user");
        assert_eq!(dir("/home"), "/");
        assert_eq!(dir("file.txt"), ".");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title("hello wide world"), "Hello Wide World");
    }

    #[test]
    fn test_integer_and_float_arithmetic() {
        assert_eq!(arithmetic(Func::Add, &1.into(), &2.into()).unwrap(), Value::from(3));
        assert_eq!(arithmetic(Func::Div, &7.into(), &2.into()).unwrap(), Value::from(3));
        assert_eq!(arithmetic(Func::Div, &7.0.into(), &2.into()).unwrap(), Value::from(3.5));
        assert!(arithmetic(Func::Mod, &7.into(), &0.into()).is_err());
        assert!(arithmetic(Func::Add, &"1".into(), &2.into()).is_err());
    }
}
