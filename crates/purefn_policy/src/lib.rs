//! purefn_policy: The capability policy.
//!
//! A pure, total decision procedure over identifier and property names. It is
//! consulted twice: statically by the validating tree walker for every
//! property name and literal element key, and again at run time by the
//! accessor capabilities for keys that only exist once the subject function
//! executes.
//!
//! Precedence: explicit allow > explicit deny > structural (base-object
//! property) deny > default allow.

/// Property names that are always permitted, even where a structural rule
/// would otherwise deny them. Enumeration-style data-field names.
pub const ALLOWED_PROPERTY_NAMES: &[&str] = &["length", "size", "name", "kind", "label", "value"];

/// Property names that are explicitly forbidden. These are the classic
/// sandbox-escape vectors: code construction, prototype surgery, and ambient
/// global roots.
pub const DENIED_PROPERTY_NAMES: &[&str] = &[
    "constructor",
    "prototype",
    "__proto__",
    "eval",
    "Function",
    "arguments",
    "caller",
    "callee",
    "globalThis",
    "window",
    "global",
    "process",
    "require",
    "import",
];

/// Own property names of the base object type. A name matching one of these
/// reaches inherited machinery on every object value, so the structural rule
/// denies it unless the allow-list says otherwise.
pub const BASE_OBJECT_PROPERTY_NAMES: &[&str] = &[
    "hasOwnProperty",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "toLocaleString",
    "toString",
    "valueOf",
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
];

/// The fixed, closed set of capability bindings visible to a subject program
/// as free identifiers: a clock source, a JSON codec, a regex constructor,
/// two collection constructors, and the four property accessors.
///
/// Immutable for the duration of one compilation and never derived from the
/// subject program.
pub const GLOBAL_BINDINGS: &[&str] = &[
    "now",
    "JSON",
    "RegExp",
    "Map",
    "Set",
    "getProp",
    "setProp",
    "keysOf",
    "deleteProp",
];

/// The prefix reserved for machinery injected by the guard transform.
/// Subject programs may not declare or reference such names; otherwise an
/// inner declaration could shadow the injected check and disable the bound.
pub const RESERVED_PREFIX: &str = "__";

/// Why a name was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The name is on the explicit deny-list.
    Explicit,
    /// The name is an own property of the base object type.
    BaseObjectProperty,
    /// The name starts with the reserved prefix.
    Reserved,
}

impl DenyReason {
    /// A short human-readable phrase for diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            DenyReason::Explicit => "explicitly denied",
            DenyReason::BaseObjectProperty => "base object property",
            DenyReason::Reserved => "reserved name",
        }
    }
}

/// The outcome of a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Decide whether a subject program may touch the given property name.
///
/// Pure and total: the same name always yields the same decision, and every
/// name yields one.
pub fn check_name(name: &str) -> Decision {
    if ALLOWED_PROPERTY_NAMES.contains(&name) {
        return Decision::Allowed;
    }
    if name.starts_with(RESERVED_PREFIX) {
        // Reserved names outrank the remaining rules so that `__proto__`
        // and guard identifiers report the same class of failure.
        if DENIED_PROPERTY_NAMES.contains(&name) {
            return Decision::Denied(DenyReason::Explicit);
        }
        if BASE_OBJECT_PROPERTY_NAMES.contains(&name) {
            return Decision::Denied(DenyReason::BaseObjectProperty);
        }
        return Decision::Denied(DenyReason::Reserved);
    }
    if DENIED_PROPERTY_NAMES.contains(&name) {
        return Decision::Denied(DenyReason::Explicit);
    }
    if BASE_OBJECT_PROPERTY_NAMES.contains(&name) {
        return Decision::Denied(DenyReason::BaseObjectProperty);
    }
    Decision::Allowed
}

/// Whether a free identifier is one of the fixed capability bindings.
pub fn is_global_binding(name: &str) -> bool {
    GLOBAL_BINDINGS.contains(&name)
}

/// Whether a name falls under the reserved guard-machinery prefix.
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}
