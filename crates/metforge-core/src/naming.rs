//! Accessor naming conventions
//!
//! Schema accessors and factory mutators may be spelled `getRetries`,
//! `isEnabled`, `setRetries` or bare `retries`. Every style maps onto one
//! canonical property name, which is what configuration keys are matched
//! against.
//!
//! A name only counts as prefixed when it is longer than the prefix and the
//! character following the prefix is upper-case, so `get` and `issuer` are
//! left alone while `getX` and `isSigned` are not.

/// Accessor prefix styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// `getX`
    Get,
    /// `isX`
    Is,
    /// `setX`
    Set,
}

impl Prefix {
    /// Order in which [`strip_any`] tries the prefixes
    pub const ALL: [Prefix; 3] = [Prefix::Get, Prefix::Is, Prefix::Set];

    /// The literal prefix
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Is => "is",
            Self::Set => "set",
        }
    }

    /// Whether `name` carries this prefix
    pub fn matches(self, name: &str) -> bool {
        let prefix = self.as_str();
        name.strip_prefix(prefix)
            .and_then(|rest| rest.chars().next())
            .is_some_and(char::is_uppercase)
    }

    /// Remove this prefix, or `None` when `name` does not carry it
    pub fn strip(self, name: &str) -> Option<String> {
        if !self.matches(name) {
            return None;
        }
        Some(decapitalize(&name[self.as_str().len()..]))
    }

    /// Turn a property name into an accessor name with this prefix
    pub fn apply(self, property: &str) -> String {
        format!("{}{}", self.as_str(), capitalize(property))
    }
}

/// Whether `name` carries the given prefix
pub fn has_prefix(prefix: Prefix, name: &str) -> bool {
    prefix.matches(name)
}

/// Strip one specific prefix, returning `name` unchanged when absent
pub fn strip_prefix(prefix: Prefix, name: &str) -> String {
    prefix.strip(name).unwrap_or_else(|| name.to_string())
}

/// Apply a prefix to a property name
pub fn apply_prefix(prefix: Prefix, property: &str) -> String {
    prefix.apply(property)
}

/// Strip the first matching prefix (get, is, set), else return `name` as is
pub fn strip_any(name: &str) -> String {
    Prefix::ALL
        .iter()
        .find_map(|prefix| prefix.strip(name))
        .unwrap_or_else(|| name.to_string())
}

// Bean-style: "Retries" -> "retries", but "URL" stays "URL".
fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if chars.next().is_some_and(char::is_uppercase) {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    out.extend(first.to_lowercase());
    out.push_str(&name[first.len_utf8()..]);
    out
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
