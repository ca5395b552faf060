//! Positional `{}` templates for command lines and output patterns

use crate::TemplateError;

/// A format string plus the values substituted into its `{}` placeholders.
///
/// `{{` and `}}` render as literal braces. The rendered string is used
/// verbatim: nothing is quoted or escaped after substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    format: String,
    args: Vec<String>,
}

/// Build a [`Template`] from a format string and positional values.
///
/// ```
/// use workflow_cli_test_utils::template;
/// let line = template!("deis login {} --username={}", "http://h", "bob");
/// assert_eq!(line.render().unwrap(), "deis login http://h --username=bob");
/// ```
#[macro_export]
macro_rules! template {
    ($format:expr $(, $arg:expr)* $(,)?) => {
        $crate::Template::new($format)$(.arg(&$arg))*
    };
}

impl Template {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            args: Vec::new(),
        }
    }

    /// Append the next positional value
    pub fn arg(mut self, value: impl std::fmt::Display) -> Self {
        self.args.push(value.to_string());
        self
    }

    /// Put `literal` (taken as-is, braces included) and a space in front
    pub fn prefixed(mut self, literal: &str) -> Self {
        let escaped = literal.replace('{', "{{").replace('}', "}}");
        self.format = format!("{escaped} {}", self.format);
        self
    }

    pub fn render(&self) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.format.len());
        let mut args = self.args.iter();
        let mut used = 0;
        let mut chars = self.format.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' => match chars.peek() {
                    Some((_, '{')) => {
                        chars.next();
                        out.push('{');
                    }
                    Some((_, '}')) => {
                        chars.next();
                        let value = args.next().ok_or_else(|| TemplateError::MissingArgument {
                            template: self.format.clone(),
                            index: used,
                        })?;
                        out.push_str(value);
                        used += 1;
                    }
                    _ => return Err(self.unmatched(position)),
                },
                '}' => match chars.peek() {
                    Some((_, '}')) => {
                        chars.next();
                        out.push('}');
                    }
                    _ => return Err(self.unmatched(position)),
                },
                c => out.push(c),
            }
        }

        if used != self.args.len() {
            return Err(TemplateError::UnusedArguments {
                template: self.format.clone(),
                placeholders: used,
                given: self.args.len(),
            });
        }

        Ok(out)
    }

    fn unmatched(&self, position: usize) -> TemplateError {
        TemplateError::UnmatchedBrace {
            template: self.format.clone(),
            position,
        }
    }
}

impl From<&str> for Template {
    fn from(format: &str) -> Self {
        Template::new(format)
    }
}

impl From<String> for Template {
    fn from(format: String) -> Self {
        Template::new(format)
    }
}
