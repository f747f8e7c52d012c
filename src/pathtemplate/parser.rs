use super::{PathSegment, PathTemplate, PathTemplateError, PathVariable, MULTI_WILDCARD, WILDCARD};

/// Parse `template` according to the grammar in the module docs.
pub fn parse(template: &str) -> Result<PathTemplate, PathTemplateError> {
    Parser::new(template).template()
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> PathTemplateError {
        PathTemplateError {
            template: self.input.to_string(),
            position,
            message: message.into(),
        }
    }

    fn error(&self, message: impl Into<String>) -> PathTemplateError {
        self.error_at(self.pos, message)
    }

    fn describe_current(&self) -> String {
        match self.input.get(self.pos..).and_then(|rest| rest.chars().next()) {
            Some(c) => format!("'{c}'"),
            None => "end of template".to_string(),
        }
    }

    fn template(mut self) -> Result<PathTemplate, PathTemplateError> {
        if self.peek() != Some(b'/') {
            return Err(self.error("template must start with '/'"));
        }
        self.pos += 1;

        let mut segments = Vec::new();
        loop {
            segments.push(self.segment()?);
            match self.peek() {
                Some(b'/') => {
                    self.pos += 1;
                }
                Some(b':') => {
                    self.pos += 1;
                    let verb = self.literal("verb")?;
                    segments.push(PathSegment::Verb(verb));
                    break;
                }
                None => break,
                Some(_) => {
                    return Err(self.error(format!(
                        "unexpected {} after segment",
                        self.describe_current()
                    )))
                }
            }
        }

        if self.pos != self.bytes.len() {
            return Err(self.error(format!(
                "verb must be the last token, found {}",
                self.describe_current()
            )));
        }
        Ok(PathTemplate { segments })
    }

    fn segment(&mut self) -> Result<PathSegment, PathTemplateError> {
        match self.peek() {
            Some(b'{') => self.variable().map(PathSegment::Variable),
            _ => self.plain_segment().map(PathSegment::Literal),
        }
    }

    fn plain_segment(&mut self) -> Result<String, PathTemplateError> {
        match self.peek() {
            Some(b'*') => self.wildcard(),
            Some(b'{') => Err(self.error("nested variables are not allowed")),
            Some(_) => self.literal("path segment"),
            None => Err(self.error("expected path segment, found end of template (trailing '/')")),
        }
    }

    fn wildcard(&mut self) -> Result<String, PathTemplateError> {
        let start = self.pos;
        self.pos += 1;
        let wildcard = if self.peek() == Some(b'*') {
            self.pos += 1;
            MULTI_WILDCARD
        } else {
            WILDCARD
        };
        match self.peek() {
            None | Some(b'/') | Some(b':') | Some(b'}') => Ok(wildcard.to_string()),
            Some(b'*') => Err(self.error_at(start, "wildcard must be exactly '*' or '**'")),
            Some(_) => Err(self.error_at(
                start,
                "wildcard must be a whole segment, not part of a literal",
            )),
        }
    }

    fn literal(&mut self, what: &str) -> Result<String, PathTemplateError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_unreserved(c) {
                self.pos += 1;
            } else if c == b'%' {
                let hex = self.bytes.get(self.pos + 1..self.pos + 3);
                match hex {
                    Some([a, b]) if a.is_ascii_hexdigit() && b.is_ascii_hexdigit() => {
                        self.pos += 3;
                    }
                    _ => return Err(self.error("'%' must be followed by two hex digits")),
                }
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error(format!("expected {what}, found {}", self.describe_current())));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn variable(&mut self) -> Result<PathVariable, PathTemplateError> {
        let open = self.pos;
        self.pos += 1;
        let field_path = self.field_path()?;

        let segments = if self.peek() == Some(b'=') {
            self.pos += 1;
            self.plain_segments()?
        } else {
            vec![WILDCARD.to_string()]
        };

        match self.peek() {
            Some(b'}') => {
                self.pos += 1;
                Ok(PathVariable {
                    field_path,
                    segments,
                })
            }
            Some(b'{') => Err(self.error("nested variables are not allowed")),
            None => Err(self.error_at(open, "unterminated variable, expected '}'")),
            Some(_) => Err(self.error(format!(
                "expected '}}' to close variable, found {}",
                self.describe_current()
            ))),
        }
    }

    fn plain_segments(&mut self) -> Result<Vec<String>, PathTemplateError> {
        let mut segments = vec![self.plain_segment()?];
        while self.peek() == Some(b'/') {
            self.pos += 1;
            segments.push(self.plain_segment()?);
        }
        Ok(segments)
    }

    fn field_path(&mut self) -> Result<Vec<String>, PathTemplateError> {
        let mut path = vec![self.ident()?];
        while self.peek() == Some(b'.') {
            self.pos += 1;
            path.push(self.ident()?);
        }
        Ok(path)
    }

    fn ident(&mut self) -> Result<String, PathTemplateError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => self.pos += 1,
            _ => {
                return Err(self.error(format!(
                    "expected field name, found {}",
                    self.describe_current()
                )))
            }
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }
}

/// RFC 3986 unreserved characters.
fn is_unreserved(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'-' | b'.' | b'_' | b'~')
}
