//! String formats
//!
//! Each JSON-Schema format gets a string type: `string + format`. The `color`
//! format is not built into the validator and is checked by [`is_color`].

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::error::{Result, TraitError};
use crate::schema::Trait;
use crate::types::string;

/// The CSS 2.1 color keywords
const CSS21_COLORS: [&str; 17] = [
    "aqua", "black", "blue", "fuchsia", "gray", "green", "lime", "maroon", "navy", "olive", "orange",
    "purple", "red", "silver", "teal", "white", "yellow",
];

/// A JSON-Schema string format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    Color,
    DateTime,
    Time,
    Date,
    Email,
    IdnEmail,
    Hostname,
    IdnHostname,
    Ipv4,
    Ipv6,
    Uri,
    UriReference,
    Iri,
    IriReference,
    UriTemplate,
    JsonPointer,
    RelativeJsonPointer,
    Regex,
}

impl StringFormat {
    pub const ALL: [StringFormat; 18] = [
        StringFormat::Color,
        StringFormat::DateTime,
        StringFormat::Time,
        StringFormat::Date,
        StringFormat::Email,
        StringFormat::IdnEmail,
        StringFormat::Hostname,
        StringFormat::IdnHostname,
        StringFormat::Ipv4,
        StringFormat::Ipv6,
        StringFormat::Uri,
        StringFormat::UriReference,
        StringFormat::Iri,
        StringFormat::IriReference,
        StringFormat::UriTemplate,
        StringFormat::JsonPointer,
        StringFormat::RelativeJsonPointer,
        StringFormat::Regex,
    ];

    /// The keyword value used in schemas
    pub fn as_str(&self) -> &'static str {
        match self {
            StringFormat::Color => "color",
            StringFormat::DateTime => "date-time",
            StringFormat::Time => "time",
            StringFormat::Date => "date",
            StringFormat::Email => "email",
            StringFormat::IdnEmail => "idn-email",
            StringFormat::Hostname => "hostname",
            StringFormat::IdnHostname => "idn-hostname",
            StringFormat::Ipv4 => "ipv4",
            StringFormat::Ipv6 => "ipv6",
            StringFormat::Uri => "uri",
            StringFormat::UriReference => "uri-reference",
            StringFormat::Iri => "iri",
            StringFormat::IriReference => "iri-reference",
            StringFormat::UriTemplate => "uri-template",
            StringFormat::JsonPointer => "json-pointer",
            StringFormat::RelativeJsonPointer => "relative-json-pointer",
            StringFormat::Regex => "regex",
        }
    }

    /// Type name, e.g. `Datetime` for `date-time`
    pub fn type_name(&self) -> String {
        let flat: String = self.as_str().chars().filter(|c| *c != '-').collect();
        let mut chars = flat.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => flat,
        }
    }

    /// `string + format`
    pub fn trait_type(&self) -> Trait {
        let mut ty = string();
        ty.name = self.type_name();
        ty.schema.insert("format".to_string(), json!(self.as_str()));
        ty
    }
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StringFormat {
    type Err = TraitError;

    fn from_str(s: &str) -> Result<Self> {
        StringFormat::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| TraitError::UnknownFormat(s.to_string()))
    }
}

pub fn color() -> Trait {
    StringFormat::Color.trait_type()
}

pub fn date_time() -> Trait {
    StringFormat::DateTime.trait_type()
}

pub fn time() -> Trait {
    StringFormat::Time.trait_type()
}

pub fn date() -> Trait {
    StringFormat::Date.trait_type()
}

pub fn email() -> Trait {
    StringFormat::Email.trait_type()
}

pub fn idn_email() -> Trait {
    StringFormat::IdnEmail.trait_type()
}

pub fn hostname() -> Trait {
    StringFormat::Hostname.trait_type()
}

pub fn idn_hostname() -> Trait {
    StringFormat::IdnHostname.trait_type()
}

pub fn ipv4() -> Trait {
    StringFormat::Ipv4.trait_type()
}

pub fn ipv6() -> Trait {
    StringFormat::Ipv6.trait_type()
}

pub fn uri() -> Trait {
    StringFormat::Uri.trait_type()
}

pub fn uri_reference() -> Trait {
    StringFormat::UriReference.trait_type()
}

pub fn iri() -> Trait {
    StringFormat::Iri.trait_type()
}

pub fn iri_reference() -> Trait {
    StringFormat::IriReference.trait_type()
}

pub fn uri_template() -> Trait {
    StringFormat::UriTemplate.trait_type()
}

pub fn json_pointer() -> Trait {
    StringFormat::JsonPointer.trait_type()
}

pub fn relative_json_pointer() -> Trait {
    StringFormat::RelativeJsonPointer.trait_type()
}

pub fn regex() -> Trait {
    StringFormat::Regex.trait_type()
}

/// CSS 2.1 color keyword or `#rgb` / `#rrggbb` hex code
pub fn is_color(value: &str) -> bool {
    static HEX: OnceLock<Option<Regex>> = OnceLock::new();
    let hex = HEX.get_or_init(|| Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").ok());
    CSS21_COLORS.contains(&value.to_ascii_lowercase().as_str())
        || hex.as_ref().map_or(false, |re| re.is_match(value))
}

/// Resolve a JSON pointer inside `document`, checking the pointer's format first
pub fn resolve_pointer<'a>(pointer: &str, document: &'a Value) -> Result<&'a Value> {
    json_pointer().validate(&json!(pointer))?;
    document
        .pointer(pointer)
        .ok_or_else(|| TraitError::Pointer(pointer.to_string()))
}

/// Compile a pattern after checking it as a `regex` formatted string
pub fn compile_regex(pattern: &str) -> Result<Regex> {
    regex().validate(&json!(pattern))?;
    Ok(Regex::new(pattern)?)
}
