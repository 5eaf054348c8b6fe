use std::{
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
    ptr,
};

use crate::types::TypeInfo;

/// A named, opaque injection token
///
/// Tokens are compared by identity, never by label. Declare them as statics:
///
/// ```rust
/// use stratum_di::{InjectionToken, Token};
///
/// static DB_URL: InjectionToken = InjectionToken::new("DB_URL");
/// static OTHER_DB_URL: InjectionToken = InjectionToken::new("DB_URL");
///
/// assert_ne!(Token::from(&DB_URL), Token::from(&OTHER_DB_URL));
/// ```
pub struct InjectionToken {
    label: &'static str,
}

impl InjectionToken {
    pub const fn new(label: &'static str) -> Self {
        InjectionToken { label }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Debug for InjectionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InjectionToken({})", self.label)
    }
}

impl Display for InjectionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InjectionToken {}", self.label)
    }
}

/// Identity used as key of an injector record
#[derive(Clone, Copy)]
pub struct Token(TokenKind);

#[derive(Clone, Copy)]
enum TokenKind {
    /// A type is its own token
    Type(TypeInfo),
    /// Address of a static [InjectionToken]
    Named(&'static InjectionToken),
    /// One registration of a multi provider, unique within its injector
    MultiSlot { of: &'static str, index: usize },
    /// An ad-hoc invocation, only used to label errors
    Call(&'static str),
}

impl Token {
    /// The type token of `T`
    pub fn of<T: 'static + ?Sized>() -> Token {
        Token(TokenKind::Type(TypeInfo::of::<T>()))
    }

    pub(crate) fn multi_slot(of: Token, index: usize) -> Token {
        Token(TokenKind::MultiSlot {
            of: of.name(),
            index,
        })
    }

    pub(crate) fn call<F: ?Sized>() -> Token {
        Token(TokenKind::Call(std::any::type_name::<F>()))
    }

    /// Type name or label of the token
    pub fn name(&self) -> &'static str {
        match self.0 {
            TokenKind::Type(info) => info.type_name,
            TokenKind::Named(named) => named.label,
            TokenKind::MultiSlot { of, .. } => of,
            TokenKind::Call(name) => name,
        }
    }
}

impl From<&'static InjectionToken> for Token {
    fn from(token: &'static InjectionToken) -> Self {
        Token(TokenKind::Named(token))
    }
}

impl From<TypeInfo> for Token {
    fn from(info: TypeInfo) -> Self {
        Token(TokenKind::Type(info))
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        match (self.0, other.0) {
            (TokenKind::Type(a), TokenKind::Type(b)) => a.type_id == b.type_id,
            (TokenKind::Named(a), TokenKind::Named(b)) => ptr::eq(a, b),
            (
                TokenKind::MultiSlot { of: a, index: i },
                TokenKind::MultiSlot { of: b, index: j },
            ) => i == j && a == b,
            (TokenKind::Call(a), TokenKind::Call(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.0 {
            TokenKind::Type(info) => {
                state.write_u8(0);
                info.type_id.hash(state);
            }
            TokenKind::Named(named) => {
                state.write_u8(1);
                ptr::hash(named, state);
            }
            TokenKind::MultiSlot { of, index } => {
                state.write_u8(2);
                of.hash(state);
                index.hash(state);
            }
            TokenKind::Call(name) => {
                state.write_u8(3);
                name.hash(state);
            }
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            TokenKind::Type(info) => f.write_str(info.type_name),
            TokenKind::Named(named) => Display::fmt(named, f),
            TokenKind::MultiSlot { of, index } => write!(f, "{of}[multi #{index}]"),
            TokenKind::Call(name) => write!(f, "call {name}"),
        }
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token({self})")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    static FIRST: InjectionToken = InjectionToken::new("SAME");
    static SECOND: InjectionToken = InjectionToken::new("SAME");

    #[test]
    fn named_tokens_compare_by_identity() {
        assert_eq!(Token::from(&FIRST), Token::from(&FIRST));
        assert_ne!(Token::from(&FIRST), Token::from(&SECOND));
    }

    #[test]
    fn type_tokens_compare_by_type() {
        assert_eq!(Token::of::<String>(), Token::of::<String>());
        assert_ne!(Token::of::<String>(), Token::of::<u32>());
        assert_ne!(Token::of::<String>(), Token::from(&FIRST));
    }

    #[test]
    fn tokens_work_as_map_keys() {
        let mut map = HashMap::new();
        map.insert(Token::from(&FIRST), 1);
        map.insert(Token::from(&SECOND), 2);
        map.insert(Token::of::<String>(), 3);

        assert_eq!(map.len(), 3);
        assert_eq!(map[&Token::from(&SECOND)], 2);
    }

    #[test]
    fn display_uses_label_or_type_name() {
        assert_eq!(Token::from(&FIRST).to_string(), "InjectionToken SAME");
        assert_eq!(Token::of::<u32>().to_string(), "u32");
    }
}
