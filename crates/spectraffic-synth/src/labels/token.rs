//! Placeholder and directive grammar

use std::fmt;

/// Semantic value category a directive asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    FullName,
    FirstName,
    LastName,
    Email,
    Ssn,
    UsBankingInfo,
    CreditCard,
    PhoneNumber,
    IpAddress,
    ZipCode,
    Address,
    City,
    Country,
    Date,
    Uuid,
    Url,
    Username,
    Password,
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl LabelKind {
    pub const ALL: [Self; 24] = [
        Self::FullName,
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Ssn,
        Self::UsBankingInfo,
        Self::CreditCard,
        Self::PhoneNumber,
        Self::IpAddress,
        Self::ZipCode,
        Self::Address,
        Self::City,
        Self::Country,
        Self::Date,
        Self::Uuid,
        Self::Url,
        Self::Username,
        Self::Password,
        Self::String,
        Self::Integer,
        Self::Number,
        Self::Boolean,
        Self::Array,
        Self::Object,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FullName => "full-name",
            Self::FirstName => "first-name",
            Self::LastName => "last-name",
            Self::Email => "email",
            Self::Ssn => "ssn",
            Self::UsBankingInfo => "us-banking-info",
            Self::CreditCard => "credit-card",
            Self::PhoneNumber => "phone-number",
            Self::IpAddress => "ip-address",
            Self::ZipCode => "zip-code",
            Self::Address => "address",
            Self::City => "city",
            Self::Country => "country",
            Self::Date => "date",
            Self::Uuid => "uuid",
            Self::Url => "url",
            Self::Username => "username",
            Self::Password => "password",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// `name` is accepted as an alias of `full-name`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s == "name" {
            return Some(Self::FullName);
        }
        Self::ALL.into_iter().find(|k| k.name() == s)
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One generation request, the text between the brackets of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Valid(LabelKind),
    Invalid(LabelKind),
    Mutated(LabelKind),
    Sequence(LabelKind),
    Random(LabelKind),
    /// `regex:<pattern>`
    Regex(String),
    /// Text with one or more `<regex:…>` spans
    Embedded(String),
}

/// Why a token was left as written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnresolvedPlaceholder {
    #[error("unknown label directive '{0}'")]
    UnknownDirective(String),
    #[error("no sequence is kept for label '{0}'")]
    NoSequence(LabelKind),
    #[error("invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
    #[error("label data pool '{0}' is empty or missing")]
    EmptyPool(String),
}

impl Directive {
    /// Parse the inside of `<…>`.
    ///
    /// # Errors
    ///
    /// Returns [`UnresolvedPlaceholder::UnknownDirective`] when the strategy
    /// prefix or the label is not recognised.
    pub fn parse(s: &str) -> Result<Self, UnresolvedPlaceholder> {
        let s = s.trim();
        if let Some(pattern) = s.strip_prefix("regex:") {
            return Ok(Self::Regex(pattern.to_string()));
        }
        if s.contains("<regex:") {
            return Ok(Self::Embedded(s.to_string()));
        }

        let unknown = || UnresolvedPlaceholder::UnknownDirective(s.to_string());
        let (strategy, label) = s.split_once('-').ok_or_else(unknown)?;
        let kind = LabelKind::parse(label).ok_or_else(unknown)?;
        match strategy {
            "valid" => Ok(Self::Valid(kind)),
            "invalid" => Ok(Self::Invalid(kind)),
            "mutated" => Ok(Self::Mutated(kind)),
            "sequence" => Ok(Self::Sequence(kind)),
            "random" => Ok(Self::Random(kind)),
            _ => Err(unknown()),
        }
    }
}

/// How a body leaf is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder<'a> {
    /// `<…>` or `gql<…>gql`, holding the text between the brackets
    Directive(&'a str),
    /// `$key$`
    Pool(&'a str),
    /// Unframed text containing `<regex:…>` spans
    Embedded(&'a str),
    Literal,
}

impl<'a> Placeholder<'a> {
    #[must_use]
    pub fn parse(leaf: &'a str) -> Self {
        let framed = leaf
            .strip_prefix("gql<")
            .and_then(|s| s.strip_suffix(">gql"))
            .or_else(|| leaf.strip_prefix('<').and_then(|s| s.strip_suffix('>')));
        if let Some(inner) = framed {
            // `<a>…<b>` is two spans, not one token
            if !inner.contains(['<', '>']) {
                return Self::Directive(inner);
            }
        }

        if leaf.len() >= 2 {
            if let Some(key) = leaf.strip_prefix('$').and_then(|s| s.strip_suffix('$')) {
                return Self::Pool(key);
            }
        }

        if leaf.contains("<regex:") {
            Self::Embedded(leaf)
        } else {
            Self::Literal
        }
    }
}
