use super::TemplateError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// The bare `.`.
    Dot,
    /// `.A.B` or, with `global`, `.$` / `.$.A.B`.
    Field { global: bool, path: Vec<String> },
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Pipe,
    LParen,
    RParen,
}

fn is_ident_start(c: &char) -> bool {
    c.is_alphabetic() || *c == '_'
}

fn is_ident_char(c: &char) -> bool {
    c.is_alphanumeric() || *c == '_'
}

fn is_boundary(c: Option<&char>) -> bool {
    match c {
        None => true,
        Some(c) => c.is_whitespace() || *c == ')' || *c == '|',
    }
}

fn invalid(message: String) -> TemplateError {
    TemplateError::InvalidTemplate(message)
}

/// Split the body of one `{{ ... }}` action into tokens.
pub(crate) fn tokenize(action: &str) -> Result<Vec<Token>, TemplateError> {
    let chars: Vec<char> = action.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        match c {
            c if c.is_whitespace() => i += 1,
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '"' => {
                i += 1;
                let mut text = String::new();
                loop {
                    match chars.get(i) {
                        None => return Err(invalid("unterminated quoted string".into())),
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            let escaped = match chars.get(i + 1) {
                                Some('n') => '\n',
                                Some('t') => '\t',
                                Some('\\') => '\\',
                                Some('"') => '"',
                                Some(other) => {
                                    return Err(invalid(format!("unknown escape sequence \\{}", other)))
                                }
                                None => return Err(invalid("unterminated quoted string".into())),
                            };
                            text.push(escaped);
                            i += 2;
                        }
                        Some(&ch) => {
                            text.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            '`' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|ch| *ch == '`')
                    .map(|offset| start + offset)
                    .ok_or_else(|| invalid("unterminated raw quoted string".into()))?;
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '.' => {
                i += 1;
                let global = chars.get(i) == Some(&'$');
                if global {
                    i += 1;
                }

                let mut path = Vec::new();
                let mut need_dot = global;
                loop {
                    if need_dot {
                        let continues = chars.get(i) == Some(&'.')
                            && chars.get(i + 1).map_or(false, is_ident_start);
                        if !continues {
                            break;
                        }
                        i += 1;
                    } else if !chars.get(i).map_or(false, is_ident_start) {
                        break;
                    }

                    let start = i;
                    while chars.get(i).map_or(false, is_ident_char) {
                        i += 1;
                    }
                    path.push(chars[start..i].iter().collect());
                    need_dot = true;
                }

                if !is_boundary(chars.get(i)) {
                    return Err(invalid(format!("unexpected {:?} in field reference", chars[i])));
                }

                if !global && path.is_empty() {
                    tokens.push(Token::Dot);
                } else {
                    tokens.push(Token::Field { global, path });
                }
            }
            c if c.is_ascii_digit()
                || ((c == '-' || c == '+') && chars.get(i + 1).map_or(false, |n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while chars.get(i).map_or(false, |n| n.is_ascii_digit() || *n == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                if !is_boundary(chars.get(i)) {
                    return Err(invalid(format!("bad number syntax: {:?}", literal)));
                }
                let token = if literal.contains('.') {
                    literal.parse().map(Token::Float)
                        .map_err(|_| invalid(format!("bad number syntax: {:?}", literal)))?
                } else {
                    literal.parse().map(Token::Int)
                        .map_err(|_| invalid(format!("bad number syntax: {:?}", literal)))?
                };
                tokens.push(token);
            }
            c if is_ident_start(&c) => {
                let start = i;
                while chars.get(i).map_or(false, is_ident_char) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '$' => return Err(invalid("template variables are not supported; use .$ for globals".into())),
            other => return Err(invalid(format!("unexpected {:?} in action", other))),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(global: bool, path: &[&str]) -> Token {
        Token::Field {
            global,
            path: path.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_fields_and_globals() {
        let tokens = tokenize(". .Full .Env.HOME .$ .$.Shell").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Dot,
                field(false, &["Full"]),
                field(false, &["Env", "HOME"]),
                field(true, &[]),
                field(true, &["Shell"]),
            ]
        );
    }

    #[test]
    fn test_literals_and_pipes() {
        let tokens = tokenize(r#"trunc -3 "a\"b" | upper (add 1 2.5) `raw`"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("trunc".into()),
                Token::Int(-3),
                Token::Str("a\"b".into()),
                Token::Pipe,
                Token::Ident("upper".into()),
                Token::LParen,
                Token::Ident("add".into()),
                Token::Int(1),
                Token::Float(2.5),
                Token::RParen,
                Token::Str("raw".into()),
            ]
        );
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(tokenize(r#""open"#).is_err());
        assert!(tokenize(".Foo-bar").is_err());
        assert!(tokenize("$x").is_err());
        assert!(tokenize("1.2.3x").is_err());
    }
}
