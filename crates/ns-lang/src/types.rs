use std::fmt;

/// Static type of an expression or declaration.
///
/// `Unknown` is what the checker assigns when a type cannot be known before
/// running the program: user function results, loop variables and indexed
/// elements. It is compatible with every other type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Integer,
    Boolean,
    String,
    Array,
    Map,
    None,
    File,
    Unknown,
}

impl Type {
    pub fn is_unknown(self) -> bool {
        self == Type::Unknown
    }

    /// `self` is one of `allowed`, or either side is unknown.
    pub fn accepts_any(self, allowed: &[Type]) -> bool {
        self.is_unknown() || allowed.is_empty() || allowed.contains(&self)
    }

    /// Can a value of type `self` be stored where `target` is expected?
    pub fn assignable_to(self, target: Type) -> bool {
        matches!(self, Type::Unknown | Type::None) || target.is_unknown() || self == target
    }

    /// Types that can key a map.
    pub fn is_key(self) -> bool {
        matches!(self, Type::Integer | Type::String | Type::Boolean | Type::Unknown)
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::Integer => "int",
            Type::Boolean => "bool",
            Type::String  => "string",
            Type::Array   => "array",
            Type::Map     => "map",
            Type::None    => "None",
            Type::File    => "file",
            Type::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Renders a list of alternatives as `int`, `int or string`, `array, map or string`.
pub fn describe(types: &[Type]) -> String {
    match types {
        [] => "any value".to_string(),
        [one] => one.name().to_string(),
        [init @ .., last] => {
            let head: Vec<_> = init.iter().map(|t| t.name()).collect();
            format!("{} or {}", head.join(", "), last.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_accepts_everything() {
        assert!(Type::Unknown.accepts_any(&[Type::Integer]));
        assert!(Type::Integer.accepts_any(&[Type::Integer, Type::String]));
        assert!(!Type::Boolean.accepts_any(&[Type::Integer]));
    }

    #[test]
    fn none_is_assignable_anywhere() {
        assert!(Type::None.assignable_to(Type::Integer));
        assert!(Type::Integer.assignable_to(Type::Unknown));
        assert!(!Type::String.assignable_to(Type::Integer));
    }

    #[test]
    fn describe_lists() {
        assert_eq!(describe(&[Type::Integer]), "int");
        assert_eq!(describe(&[Type::Array, Type::Map]), "array or map");
        assert_eq!(describe(&[Type::Integer, Type::String, Type::Boolean]), "int, string or bool");
    }
}
