use super::funcs::Func;
use super::lexer::{tokenize, Token};
use super::TemplateError;
use serde_json::Value;

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
    If {
        branches: Vec<(Pipeline, Vec<Node>)>,
        otherwise: Vec<Node>,
    },
    Range {
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    pub(crate) commands: Vec<Command>,
}

#[derive(Debug, Clone)]
pub(crate) enum Command {
    Call { func: Func, args: Vec<Arg> },
    Value(Arg),
}

#[derive(Debug, Clone)]
pub(crate) enum Arg {
    Dot,
    Field { global: bool, path: Vec<String> },
    Literal(Value),
    Nested(Pipeline),
}

/// Raw split of the source into literal text and action bodies.
#[derive(Debug, PartialEq)]
enum Piece {
    Text(String),
    Action(String),
}

enum Directive {
    Output(Pipeline),
    If(Pipeline),
    Range(Pipeline),
    Stop(Stop),
}

enum Stop {
    Else,
    ElseIf(Pipeline),
    End,
}

fn invalid(message: impl Into<String>) -> TemplateError {
    TemplateError::InvalidTemplate(message.into())
}

/// Parse template source into its node list.
pub(crate) fn parse(source: &str) -> Result<Vec<Node>, TemplateError> {
    let pieces = scan(source)?;
    let mut parser = TreeParser {
        pieces: pieces.into_iter(),
    };

    let (nodes, stop) = parser.list()?;
    match stop {
        None => Ok(nodes),
        Some(Stop::End) => Err(invalid("unexpected {{end}}")),
        Some(Stop::Else) | Some(Stop::ElseIf(_)) => Err(invalid("unexpected {{else}}")),
    }
}

fn scan(source: &str) -> Result<Vec<Piece>, TemplateError> {
    let mut pieces = Vec::new();
    let mut rest = source;
    let mut trim_next = false;

    loop {
        let Some(open) = rest.find("{{") else {
            if rest.contains("}}") {
                return Err(invalid("unexpected \"}}\" outside of an action"));
            }
            let text = if trim_next { rest.trim_start() } else { rest };
            if !text.is_empty() {
                pieces.push(Piece::Text(text.to_string()));
            }
            return Ok(pieces);
        };

        let mut text = &rest[..open];
        if text.contains("}}") {
            return Err(invalid("unexpected \"}}\" outside of an action"));
        }
        if trim_next {
            text = text.trim_start();
        }

        let after = &rest[open + 2..];
        let trim_left = after.starts_with('-') && after[1..].starts_with(char::is_whitespace);
        if trim_left {
            text = text.trim_end();
        }
        if !text.is_empty() {
            pieces.push(Piece::Text(text.to_string()));
        }

        let body_start = usize::from(trim_left);
        let close = find_close(&after[body_start..])
            .ok_or_else(|| invalid("unclosed action: missing \"}}\""))?;
        let mut body = &after[body_start..body_start + close];

        trim_next = body.ends_with('-') && body[..body.len() - 1].ends_with(char::is_whitespace);
        if trim_next {
            body = &body[..body.len() - 1];
        }

        let body = body.trim();
        if body.starts_with("/*") {
            if !body.ends_with("*/") || body.len() < 4 {
                return Err(invalid("unclosed comment"));
            }
        } else if body.is_empty() {
            return Err(invalid("missing value for command"));
        } else {
            pieces.push(Piece::Action(body.to_string()));
        }

        rest = &after[body_start + close + 2..];
    }
}

/// Position of the closing `}}`, skipping over quoted strings.
fn find_close(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(b'"') if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'`' => quote = Some(b),
            None if b == b'}' && bytes.get(i + 1) == Some(&b'}') => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

fn directive(body: &str) -> Result<Directive, TemplateError> {
    let tokens = tokenize(body)?;
    let keyword = match tokens.first() {
        Some(Token::Ident(word)) => word.as_str(),
        _ => "",
    };

    match keyword {
        "if" => Ok(Directive::If(pipeline(&tokens[1..], "if")?)),
        "range" => Ok(Directive::Range(pipeline(&tokens[1..], "range")?)),
        "end" if tokens.len() == 1 => Ok(Directive::Stop(Stop::End)),
        "end" => Err(invalid("unexpected arguments after end")),
        "else" if tokens.len() == 1 => Ok(Directive::Stop(Stop::Else)),
        "else" => match tokens.get(1) {
            Some(Token::Ident(word)) if word == "if" => {
                Ok(Directive::Stop(Stop::ElseIf(pipeline(&tokens[2..], "else if")?)))
            }
            _ => Err(invalid("expected end after else")),
        },
        _ => Ok(Directive::Output(pipeline(&tokens, "command")?)),
    }
}

fn pipeline(tokens: &[Token], context: &str) -> Result<Pipeline, TemplateError> {
    if tokens.is_empty() {
        return Err(invalid(format!("missing value for {}", context)));
    }

    let mut stages = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| invalid("unexpected right paren"))?;
            }
            Token::Pipe if depth == 0 => {
                stages.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(invalid("unclosed left paren"));
    }
    stages.push(&tokens[start..]);

    let commands = stages
        .into_iter()
        .enumerate()
        .map(|(index, stage)| command(stage, index == 0))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Pipeline { commands })
}

fn command(tokens: &[Token], first: bool) -> Result<Command, TemplateError> {
    match tokens.first() {
        None => Err(invalid("missing command in pipeline")),
        Some(Token::Ident(name)) if !is_constant(name) => {
            let func = Func::from_name(name)
                .ok_or_else(|| invalid(format!("function {:?} not defined", name)))?;
            Ok(Command::Call {
                func,
                args: args(&tokens[1..])?,
            })
        }
        Some(_) => {
            let mut args = args(tokens)?;
            if args.len() != 1 {
                return Err(invalid("can't give argument to non-function"));
            }
            if !first {
                return Err(invalid("non executable command in pipeline stage"));
            }
            Ok(Command::Value(args.remove(0)))
        }
    }
}

fn is_constant(name: &str) -> bool {
    matches!(name, "true" | "false" | "nil")
}

fn args(tokens: &[Token]) -> Result<Vec<Arg>, TemplateError> {
    let mut args = Vec::new();
    let mut i = 0;

    while let Some(token) = tokens.get(i) {
        let arg = match token {
            Token::Dot => Arg::Dot,
            Token::Field { global, path } => Arg::Field {
                global: *global,
                path: path.clone(),
            },
            Token::Str(text) => Arg::Literal(Value::String(text.clone())),
            Token::Int(n) => Arg::Literal(Value::from(*n)),
            Token::Float(f) => Arg::Literal(Value::from(*f)),
            Token::Ident(name) => match name.as_str() {
                "true" => Arg::Literal(Value::Bool(true)),
                "false" => Arg::Literal(Value::Bool(false)),
                "nil" => Arg::Literal(Value::Null),
                other => {
                    return Err(invalid(format!(
                        "function {:?} used as an argument; wrap the call in parentheses",
                        other
                    )))
                }
            },
            Token::LParen => {
                let close = matching_paren(tokens, i)?;
                let nested = pipeline(&tokens[i + 1..close], "parenthesized pipeline")?;
                i = close;
                Arg::Nested(nested)
            }
            Token::RParen => return Err(invalid("unexpected right paren")),
            Token::Pipe => return Err(invalid("unexpected pipe")),
        };
        args.push(arg);
        i += 1;
    }

    Ok(args)
}

fn matching_paren(tokens: &[Token], open: usize) -> Result<usize, TemplateError> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(invalid("unclosed left paren"))
}

struct TreeParser {
    pieces: std::vec::IntoIter<Piece>,
}

impl TreeParser {
    /// Collect nodes until end of input or an `else`/`end` directive.
    fn list(&mut self) -> Result<(Vec<Node>, Option<Stop>), TemplateError> {
        let mut nodes = Vec::new();

        while let Some(piece) = self.pieces.next() {
            match piece {
                Piece::Text(text) => nodes.push(Node::Text(text)),
                Piece::Action(body) => match directive(&body)? {
                    Directive::Output(pipeline) => nodes.push(Node::Action(pipeline)),
                    Directive::If(condition) => nodes.push(self.if_node(condition)?),
                    Directive::Range(pipeline) => nodes.push(self.range_node(pipeline)?),
                    Directive::Stop(stop) => return Ok((nodes, Some(stop))),
                },
            }
        }

        Ok((nodes, None))
    }

    fn if_node(&mut self, condition: Pipeline) -> Result<Node, TemplateError> {
        let mut branches = Vec::new();
        let mut condition = condition;

        loop {
            let (body, stop) = self.list()?;
            branches.push((condition, body));
            match stop {
                Some(Stop::End) => {
                    return Ok(Node::If {
                        branches,
                        otherwise: Vec::new(),
                    })
                }
                Some(Stop::ElseIf(next)) => condition = next,
                Some(Stop::Else) => {
                    let (otherwise, stop) = self.list()?;
                    return match stop {
                        Some(Stop::End) => Ok(Node::If { branches, otherwise }),
                        Some(_) => Err(invalid("expected end after else")),
                        None => Err(invalid("unexpected EOF: missing {{end}}")),
                    };
                }
                None => return Err(invalid("unexpected EOF: missing {{end}}")),
            }
        }
    }

    fn range_node(&mut self, pipeline: Pipeline) -> Result<Node, TemplateError> {
        let (body, stop) = self.list()?;
        let otherwise = match stop {
            Some(Stop::End) => Vec::new(),
            Some(Stop::Else) => match self.list()? {
                (otherwise, Some(Stop::End)) => otherwise,
                (_, Some(_)) => return Err(invalid("expected end after else")),
                (_, None) => return Err(invalid("unexpected EOF: missing {{end}}")),
            },
            Some(Stop::ElseIf(_)) => return Err(invalid("else if is not allowed in range")),
            None => return Err(invalid("unexpected EOF: missing {{end}}")),
        };

        Ok(Node::Range {
            pipeline,
            body,
            otherwise,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_trims_whitespace_markers() {
        let pieces = scan("a   {{- .X -}}   b").unwrap();
        assert_eq!(
            pieces,
            vec![
                Piece::Text("a".into()),
                Piece::Action(".X".into()),
                Piece::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_scan_skips_comments_and_quoted_braces() {
        let pieces = scan(r#"{{/* note */}}x{{ "}}" }}"#).unwrap();
        assert_eq!(
            pieces,
            vec![Piece::Text("x".into()), Piece::Action(r#""}}""#.into())]
        );
    }

    #[test]
    fn test_unbalanced_markers_are_invalid() {
        for source in ["{{ .X", "a }} b", "{{ .X }} }}", "{{}}"] {
            assert!(
                matches!(parse(source), Err(TemplateError::InvalidTemplate(_))),
                "{source} should not parse"
            );
        }
    }

    #[test]
    fn test_block_structure_errors() {
        for source in [
            "{{ if .X }}a",
            "{{ end }}",
            "{{ if .X }}a{{ else }}b{{ else }}c{{ end }}",
            "{{ range .X }}{{ else if .Y }}{{ end }}",
            "{{ nosuch .X }}",
            "{{ .X .Y }}",
            "{{ .X | .Y }}",
        ] {
            assert!(
                matches!(parse(source), Err(TemplateError::InvalidTemplate(_))),
                "{source} should not parse"
            );
        }
    }

    #[test]
    fn test_else_if_chain_builds_branches() {
        let nodes = parse("{{ if .A }}a{{ else if .B }}b{{ else }}c{{ end }}").unwrap();
        match &nodes[0] {
            Node::If { branches, otherwise } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(otherwise.len(), 1);
            }
            other => panic!("expected if node, got {:?}", other),
        }
    }
}
