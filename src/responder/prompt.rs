use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::errors::BotError;

/// Named values available to a template at render time.
pub type PromptContext = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// Plain-text prompt with `{field}` placeholders. `{{` and `}}` produce
/// literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, BotError> {
        let name = name.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    for next in chars.by_ref() {
                        if next == '}' {
                            closed = true;
                            break;
                        }
                        field.push(next);
                    }
                    let field = field.trim().to_string();
                    if !closed {
                        return Err(template_error(&name, "unclosed `{`"));
                    }
                    if !is_field_name(&field) {
                        return Err(template_error(
                            &name,
                            &format!("invalid placeholder `{{{}}}`", field),
                        ));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => {
                    return Err(template_error(&name, "single `}` (write `}}` for a literal brace)"));
                }
                _ => literal.push(ch),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { name, segments })
    }

    pub fn load(path: &Path) -> Result<Self, BotError> {
        let source = fs::read_to_string(path).map_err(|err| {
            BotError::ConfigMissing(format!("prompt template {}: {}", path.display(), err))
        })?;
        Self::parse(path.display().to_string(), &source)
    }

    /// Placeholder names in order of first appearance.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Field(field) = segment {
                if !fields.contains(&field.as_str()) {
                    fields.push(field);
                }
            }
        }
        fields
    }

    /// Fail unless every placeholder is one of `available`.
    pub fn check_fields<'a, I>(&self, available: I) -> Result<(), BotError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let available: Vec<&str> = available.into_iter().collect();
        match self.fields().into_iter().find(|field| !available.contains(field)) {
            Some(missing) => Err(template_error(
                &self.name,
                &format!("unknown field `{}`", missing),
            )),
            None => Ok(()),
        }
    }

    pub fn render(&self, context: &PromptContext) -> Result<String, BotError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => {
                    let value = context.get(field).ok_or_else(|| {
                        template_error(&self.name, &format!("no value for field `{}`", field))
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn is_field_name(field: &str) -> bool {
    let mut chars = field.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn template_error(name: &str, reason: &str) -> BotError {
    BotError::InvalidConfig(format!("prompt template {}: {}", name, reason))
}
