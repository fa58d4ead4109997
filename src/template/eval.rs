use super::context::Context;
use super::funcs::{self, Func};
use super::parse::{Arg, Command, Node, Pipeline};
use super::TemplateError;
use serde_json::Value;

/// Result of evaluating an operand: a value, or the path that was not found.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolved {
    Value(Value),
    Missing(String),
}

pub(crate) fn truthy_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub(crate) fn truthy(resolved: &Resolved) -> bool {
    match resolved {
        Resolved::Value(value) => truthy_value(value),
        Resolved::Missing(_) => false,
    }
}

pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => format!("[{}]", items.iter().map(display).collect::<Vec<_>>().join(" ")),
        Value::Object(_) => value.to_string(),
    }
}

fn undefined(path: &str) -> TemplateError {
    TemplateError::IncorrectTemplate(format!("{} is not defined", path))
}

/// What `.` refers to while walking: the segment data at the root, or the
/// current element inside a `range`.
#[derive(Clone, Copy)]
struct Dot<'v> {
    value: &'v Value,
    root: bool,
}

pub(crate) fn execute(nodes: &[Node], ctx: &Context<'_>) -> Result<String, TemplateError> {
    let evaluator = Evaluator { ctx };
    let mut out = String::new();
    evaluator.walk(
        nodes,
        Dot {
            value: ctx.data(),
            root: true,
        },
        &mut out,
    )?;
    Ok(out)
}

struct Evaluator<'c, 'a> {
    ctx: &'c Context<'a>,
}

impl Evaluator<'_, '_> {
    fn walk(&self, nodes: &[Node], dot: Dot<'_>, out: &mut String) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(pipeline) => match self.pipeline(pipeline, dot)? {
                    Resolved::Value(value) => out.push_str(&display(&value)),
                    Resolved::Missing(path) => return Err(undefined(&path)),
                },
                Node::If { branches, otherwise } => {
                    let mut taken = false;
                    for (condition, body) in branches {
                        if truthy(&self.pipeline(condition, dot)?) {
                            self.walk(body, dot, out)?;
                            taken = true;
                            break;
                        }
                    }
                    if !taken {
                        self.walk(otherwise, dot, out)?;
                    }
                }
                Node::Range {
                    pipeline,
                    body,
                    otherwise,
                } => {
                    let items = match self.pipeline(pipeline, dot)? {
                        Resolved::Missing(path) => return Err(undefined(&path)),
                        Resolved::Value(Value::Null) => Vec::new(),
                        Resolved::Value(Value::Array(items)) => items,
                        Resolved::Value(Value::Object(map)) => map.into_iter().map(|(_, v)| v).collect(),
                        Resolved::Value(other) => {
                            return Err(TemplateError::IncorrectTemplate(format!(
                                "range can't iterate over {}",
                                display(&other)
                            )))
                        }
                    };

                    if items.is_empty() {
                        self.walk(otherwise, dot, out)?;
                    }
                    for item in &items {
                        self.walk(
                            body,
                            Dot {
                                value: item,
                                root: false,
                            },
                            out,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn pipeline(&self, pipeline: &Pipeline, dot: Dot<'_>) -> Result<Resolved, TemplateError> {
        let mut piped = None;
        for command in &pipeline.commands {
            piped = Some(self.command(command, dot, piped)?);
        }
        Ok(piped.unwrap_or(Resolved::Value(Value::Null)))
    }

    fn command(&self, command: &Command, dot: Dot<'_>, piped: Option<Resolved>) -> Result<Resolved, TemplateError> {
        match command {
            Command::Value(arg) => self.arg(arg, dot),
            Command::Call { func, args } if func.is_short_circuit() => {
                self.short_circuit(*func, args, dot, piped)
            }
            Command::Call { func, args } => {
                let mut values = args
                    .iter()
                    .map(|arg| self.arg(arg, dot))
                    .collect::<Result<Vec<_>, _>>()?;
                values.extend(piped);
                funcs::call(*func, values, self.ctx)
            }
        }
    }

    /// `and` stops at the first falsy operand, `or` at the first truthy one;
    /// the deciding operand is the result.
    fn short_circuit(
        &self,
        func: Func,
        args: &[Arg],
        dot: Dot<'_>,
        piped: Option<Resolved>,
    ) -> Result<Resolved, TemplateError> {
        let stop_on = func == Func::Or;
        let mut last = None;

        for arg in args {
            let resolved = self.arg(arg, dot)?;
            if truthy(&resolved) == stop_on {
                return Ok(resolved);
            }
            last = Some(resolved);
        }

        piped.or(last).ok_or_else(|| {
            TemplateError::IncorrectTemplate(format!(
                "wrong number of args for {}: want at least 1 got 0",
                func.name()
            ))
        })
    }

    fn arg(&self, arg: &Arg, dot: Dot<'_>) -> Result<Resolved, TemplateError> {
        match arg {
            Arg::Dot => Ok(Resolved::Value(dot.value.clone())),
            Arg::Literal(value) => Ok(Resolved::Value(value.clone())),
            Arg::Nested(pipeline) => self.pipeline(pipeline, dot),
            Arg::Field { global, path } => Ok(self.lookup(*global, path, dot)),
        }
    }

    fn lookup(&self, global: bool, path: &[String], dot: Dot<'_>) -> Resolved {
        let shown = if global {
            std::iter::once(".$".to_string())
                .chain(path.iter().map(|p| format!(".{}", p)))
                .collect::<String>()
        } else {
            path.iter().map(|p| format!(".{}", p)).collect::<String>()
        };

        let (mut current, rest) = if global {
            (self.ctx.globals(), path)
        } else if dot.root {
            let first = path[0].as_str();
            if first == "Data" {
                (self.ctx.data(), &path[1..])
            } else if dot.value.get(first).is_some() {
                (dot.value, path)
            } else if self.ctx.globals().get(first).is_some() {
                (self.ctx.globals(), path)
            } else {
                return Resolved::Missing(shown);
            }
        } else {
            (dot.value, path)
        };

        let env = self.ctx.globals().get("Env");
        for key in rest {
            match current.get(key.as_str()) {
                Some(next) => current = next,
                // Unset environment variables read as empty.
                None if env.map_or(false, |env| std::ptr::eq(env, current)) => {
                    return Resolved::Value(Value::String(String::new()));
                }
                None => return Resolved::Missing(shown),
            }
        }
        Resolved::Value(current.clone())
    }
}
