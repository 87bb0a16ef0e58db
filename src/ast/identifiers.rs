use std::fmt;

/// Suffix modifier attached to an identifier with `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// `:isset` - whether the key was present in the submitted request map
    IsSet,
    /// `:length` - number of elements (or characters for strings)
    Length,
    /// `:lower` - lower-cased string form of the value
    Lower,
    /// `:each` - every element must satisfy the comparison
    Each,
}

impl Modifier {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "isset" => Some(Modifier::IsSet),
            "length" => Some(Modifier::Length),
            "lower" => Some(Modifier::Lower),
            "each" => Some(Modifier::Each),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Modifier::IsSet => "isset",
            Modifier::Length => "length",
            Modifier::Lower => "lower",
            Modifier::Each => "each",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Datetime macros, resolved against the evaluator's clock on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Macro {
    Now,
    Second,
    Minute,
    Hour,
    Weekday,
    Day,
    Month,
    Year,
    Yesterday,
    Tomorrow,
    TodayStart,
    TodayEnd,
    MonthStart,
    MonthEnd,
    YearStart,
    YearEnd,
}

impl Macro {
    pub const ALL: [Macro; 16] = [
        Macro::Now,
        Macro::Second,
        Macro::Minute,
        Macro::Hour,
        Macro::Weekday,
        Macro::Day,
        Macro::Month,
        Macro::Year,
        Macro::Yesterday,
        Macro::Tomorrow,
        Macro::TodayStart,
        Macro::TodayEnd,
        Macro::MonthStart,
        Macro::MonthEnd,
        Macro::YearStart,
        Macro::YearEnd,
    ];

    /// Looks up a macro by its name without the leading `@`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Macro::Now => "now",
            Macro::Second => "second",
            Macro::Minute => "minute",
            Macro::Hour => "hour",
            Macro::Weekday => "weekday",
            Macro::Day => "day",
            Macro::Month => "month",
            Macro::Year => "year",
            Macro::Yesterday => "yesterday",
            Macro::Tomorrow => "tomorrow",
            Macro::TodayStart => "todayStart",
            Macro::TodayEnd => "todayEnd",
            Macro::MonthStart => "monthStart",
            Macro::MonthEnd => "monthEnd",
            Macro::YearStart => "yearStart",
            Macro::YearEnd => "yearEnd",
        }
    }
}

/// Namespaces under `@request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestScope {
    Context,
    Method,
    Headers,
    Query,
    Body,
    Auth,
}

impl RequestScope {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "context" => Some(RequestScope::Context),
            "method" => Some(RequestScope::Method),
            "headers" => Some(RequestScope::Headers),
            "query" => Some(RequestScope::Query),
            "body" => Some(RequestScope::Body),
            "auth" => Some(RequestScope::Auth),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RequestScope::Context => "context",
            RequestScope::Method => "method",
            RequestScope::Headers => "headers",
            RequestScope::Query => "query",
            RequestScope::Body => "body",
            RequestScope::Auth => "auth",
        }
    }

    /// Scopes that are flat string values and take no further path.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestScope::Context | RequestScope::Method)
    }

    /// Scopes backed by a raw submitted map, where `:isset` applies.
    pub fn is_submitted_map(self) -> bool {
        matches!(
            self,
            RequestScope::Headers | RequestScope::Query | RequestScope::Body
        )
    }
}

/// Where an identifier's path is rooted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The target record's own fields
    Record,
    /// `@request.<scope>`
    Request(RequestScope),
    /// `@collection.<name>`
    Collection(String),
}

/// A resolved-at-evaluation field reference.
///
/// # Examples
/// ```text
/// author.name             -> Record, ["author", "name"]
/// @request.auth.id        -> Request(Auth), ["id"]
/// @request.body.tags:each -> Request(Body), ["tags"], Each
/// @collection.users.email -> Collection("users"), ["email"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub scope: Scope,
    pub path: Vec<String>,
    pub modifier: Option<Modifier>,
}

impl Identifier {
    pub fn field(path: &str) -> Self {
        Identifier {
            scope: Scope::Record,
            path: path.split('.').map(str::to_string).collect(),
            modifier: None,
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// Number of relation hops the path takes past its first segment.
    pub fn relation_depth(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Whether the identifier can yield several values.
    pub fn is_join(&self) -> bool {
        matches!(self.scope, Scope::Collection(_))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match &self.scope {
            Scope::Record => String::new(),
            Scope::Request(scope) => format!("@request.{}", scope.name()),
            Scope::Collection(name) => format!("@collection.{name}"),
        };
        f.write_str(&prefix)?;
        for (i, segment) in self.path.iter().enumerate() {
            if i > 0 || !prefix.is_empty() {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        if let Some(modifier) = self.modifier {
            write!(f, ":{modifier}")?;
        }
        Ok(())
    }
}
