//! Method signatures
//!
//! Signatures compare structurally: two signatures are equal iff their name,
//! parameter type sequence and return type are all equal.

use std::fmt;
use std::str::FromStr;

use mimic_sdk::{NativeFunction, TypeRef};

/// Name, ordered parameter types and return type of a method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    name: String,
    params: Vec<TypeRef>,
    returns: TypeRef,
}

impl MethodSignature {
    /// Create a new signature
    pub fn new(name: impl Into<String>, params: Vec<TypeRef>, returns: TypeRef) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter types in order
    pub fn params(&self) -> &[TypeRef] {
        &self.params
    }

    /// Return type
    pub fn returns(&self) -> &TypeRef {
        &self.returns
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Check if both signatures occupy the same overload slot (name and
    /// parameter types equal, return type ignored)
    pub fn same_overload(&self, other: &MethodSignature) -> bool {
        self.name == other.name && self.params == other.params
    }

    /// Check if a native function's declared parameter and return types are
    /// exactly this signature's
    pub fn accepts_function(&self, function: &NativeFunction) -> bool {
        function.params() == self.params.as_slice() && function.returns() == &self.returns
    }

    /// Parameter list formatted as `(i32, string)`
    pub fn param_list(&self) -> String {
        format_types(&self.params)
    }
}

/// Format a type list as `(a, b)`
pub(crate) fn format_types<'a>(types: impl IntoIterator<Item = &'a TypeRef>) -> String {
    let names: Vec<String> = types.into_iter().map(|t| t.to_string()).collect();
    format!("({})", names.join(", "))
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} -> {}", self.name, self.param_list(), self.returns)
    }
}

/// Error returned when a signature string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid method signature '{input}': {reason}")]
pub struct ParseSignatureError {
    /// Offending input
    pub input: String,
    /// What was wrong with it
    pub reason: String,
}

impl FromStr for MethodSignature {
    type Err = ParseSignatureError;

    /// Parse `name(type, type) -> type`; a missing `-> type` means `void`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| ParseSignatureError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let open = s.find('(').ok_or_else(|| fail("missing '('"))?;
        let close = s.rfind(')').ok_or_else(|| fail("missing ')'"))?;
        if close < open {
            return Err(fail("unbalanced parentheses"));
        }

        let name = s[..open].trim();
        if name.is_empty() {
            return Err(fail("empty method name"));
        }

        let params = s[open + 1..close]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<TypeRef>().map_err(|e| fail(&e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        let rest = s[close + 1..].trim();
        let returns = if rest.is_empty() {
            TypeRef::Void
        } else {
            let ty = rest
                .strip_prefix("->")
                .ok_or_else(|| fail("expected '->' after parameter list"))?;
            ty.parse::<TypeRef>().map_err(|e| fail(&e.to_string()))?
        };

        Ok(MethodSignature::new(name, params, returns))
    }
}
