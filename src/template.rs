//! Placeholder substitution for template fragments.
//!
//! Fragments reference compiled values as `{{.Name}}` and are rendered with
//! `minijinja`. The leading `.` is dropped before parsing, the environment
//! starts empty (no filters, tests or globals) and undefined names are
//! strict. Each fragment is parsed and checked against the [`Placeholder`]
//! table when it is added to a [`TemplateSet`], so an unknown name or a
//! malformed action fails the whole compilation before any text is produced.

use std::collections::BTreeSet;

use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value};

/// Every value a fragment may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    CertsString,
    ConnectionMode,
    TimeoutConnect,
    TimeoutClient,
    TimeoutServer,
    TimeoutQueue,
    TimeoutTunnel,
    TimeoutHttpRequest,
    TimeoutHttpKeepAlive,
    StatsUser,
    StatsPass,
    UserList,
    ExtraGlobal,
    ExtraDefaults,
    DefaultBinds,
    ExtraFrontend,
    ContentFrontend,
    ContentFrontendTcp,
    ContentFrontendSni,
}

impl Placeholder {
    pub const ALL: [Self; 19] = [
        Self::CertsString,
        Self::ConnectionMode,
        Self::TimeoutConnect,
        Self::TimeoutClient,
        Self::TimeoutServer,
        Self::TimeoutQueue,
        Self::TimeoutTunnel,
        Self::TimeoutHttpRequest,
        Self::TimeoutHttpKeepAlive,
        Self::StatsUser,
        Self::StatsPass,
        Self::UserList,
        Self::ExtraGlobal,
        Self::ExtraDefaults,
        Self::DefaultBinds,
        Self::ExtraFrontend,
        Self::ContentFrontend,
        Self::ContentFrontendTcp,
        Self::ContentFrontendSni,
    ];

    /// The name used inside `{{.Name}}`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CertsString => "CertsString",
            Self::ConnectionMode => "ConnectionMode",
            Self::TimeoutConnect => "TimeoutConnect",
            Self::TimeoutClient => "TimeoutClient",
            Self::TimeoutServer => "TimeoutServer",
            Self::TimeoutQueue => "TimeoutQueue",
            Self::TimeoutTunnel => "TimeoutTunnel",
            Self::TimeoutHttpRequest => "TimeoutHttpRequest",
            Self::TimeoutHttpKeepAlive => "TimeoutHttpKeepAlive",
            Self::StatsUser => "StatsUser",
            Self::StatsPass => "StatsPass",
            Self::UserList => "UserList",
            Self::ExtraGlobal => "ExtraGlobal",
            Self::ExtraDefaults => "ExtraDefaults",
            Self::DefaultBinds => "DefaultBinds",
            Self::ExtraFrontend => "ExtraFrontend",
            Self::ContentFrontend => "ContentFrontend",
            Self::ContentFrontendTcp => "ContentFrontendTcp",
            Self::ContentFrontendSni => "ContentFrontendSNI",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Supplies the text substituted for each placeholder.
pub trait Fields {
    fn field(&self, placeholder: Placeholder) -> &str;
}

/// Render context holding every placeholder by name.
fn context(fields: &dyn Fields) -> Value {
    Value::from_iter(
        Placeholder::ALL
            .into_iter()
            .map(|p| (p.name(), fields.field(p))),
    )
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TemplateError {
    #[error("{fragment}:{line}: unknown placeholder '{name}'")]
    UnknownPlaceholder {
        fragment: String,
        line: usize,
        name: String,
    },

    #[error("{fragment}:{line}: {detail}")]
    Syntax {
        fragment: String,
        line: usize,
        detail: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("{fragment}:{line}: render failed")]
    Render {
        fragment: String,
        line: usize,
        #[source]
        source: minijinja::Error,
    },

    #[error("template syntax configuration rejected")]
    Config(#[source] minijinja::Error),
}

/// Drop the `.` that opens every `{{.Name}}` action.
fn strip_field_dots(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(open) = rest.find("{{") {
        let (before, after) = rest.split_at(open + 2);
        out.push_str(before);
        let trimmed = after.trim_start();
        out.push_str(&after[..after.len() - trimmed.len()]);
        rest = trimmed.strip_prefix('.').unwrap_or(trimmed);
    }
    out.push_str(rest);
    out
}

/// Byte offset of the first action that names `name`.
fn action_offset(source: &str, name: &str) -> usize {
    let mut from = 0;
    while let Some(open) = source[from..].find("{{") {
        let start = from + open + 2;
        let word = source[start..]
            .trim_start()
            .trim_start_matches('.')
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .next();
        if word == Some(name) {
            return start;
        }
        from = start;
    }
    0
}

fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Parsed fragments, rendered in the order they were added.
pub struct TemplateSet {
    env: Environment<'static>,
    fragments: Vec<String>,
}

impl TemplateSet {
    pub fn new() -> Result<Self, TemplateError> {
        // Jinja blocks and comments never occur in proxy configs; move their
        // delimiters off `{%` and `{#` so such text passes through untouched.
        let syntax = SyntaxConfig::builder()
            .variable_delimiters("{{", "}}")
            .block_delimiters("<%", "%>")
            .comment_delimiters("<#", "#>")
            .build()
            .map_err(TemplateError::Config)?;

        let mut env = Environment::empty();
        env.set_syntax(syntax);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);

        Ok(Self {
            env,
            fragments: Vec::new(),
        })
    }

    /// Parse `source` as `fragment` and resolve every name it references.
    pub fn add(&mut self, fragment: &str, source: &str) -> Result<(), TemplateError> {
        self.env
            .add_template_owned(fragment.to_string(), strip_field_dots(source))
            .map_err(|e| syntax_error(fragment, e))?;

        let unknown = self
            .placeholder_names(fragment)?
            .into_iter()
            .filter(|name| Placeholder::from_name(name).is_none())
            .min_by_key(|name| action_offset(source, name));
        if let Some(name) = unknown {
            self.env.remove_template(fragment);
            return Err(TemplateError::UnknownPlaceholder {
                fragment: fragment.to_string(),
                line: line_at(source, action_offset(source, &name)),
                name,
            });
        }

        self.fragments.push(fragment.to_string());
        Ok(())
    }

    fn placeholder_names(&self, fragment: &str) -> Result<BTreeSet<String>, TemplateError> {
        let template = self
            .env
            .get_template(fragment)
            .map_err(|e| syntax_error(fragment, e))?;
        Ok(template.undeclared_variables(false).into_iter().collect())
    }

    /// Placeholders referenced by an added fragment.
    pub fn placeholders(&self, fragment: &str) -> Result<BTreeSet<Placeholder>, TemplateError> {
        Ok(self
            .placeholder_names(fragment)?
            .iter()
            .filter_map(|name| Placeholder::from_name(name))
            .collect())
    }

    /// Render every fragment and join them with `separator`.
    pub fn render(&self, fields: &dyn Fields, separator: &str) -> Result<String, TemplateError> {
        let ctx = context(fields);
        let mut out = String::new();
        for (i, fragment) in self.fragments.iter().enumerate() {
            let rendered = self
                .env
                .get_template(fragment)
                .and_then(|t| t.render(&ctx))
                .map_err(|e| TemplateError::Render {
                    fragment: fragment.clone(),
                    line: e.line().unwrap_or(1),
                    source: e,
                })?;
            if i > 0 {
                out.push_str(separator);
            }
            out.push_str(&rendered);
        }
        Ok(out)
    }
}

fn syntax_error(fragment: &str, source: minijinja::Error) -> TemplateError {
    TemplateError::Syntax {
        fragment: fragment.to_string(),
        line: source.line().unwrap_or(1),
        detail: source.detail().unwrap_or("invalid template").to_string(),
        source,
    }
}
