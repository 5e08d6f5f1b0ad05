//! Token - チャンネルトークン
//!
//! トークンは subscribe / publish を同じ「チャンネル」に絞り込むための
//! 不透明な値です。比較は値の等価性で行い、型が違えば常に不一致です。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 型消去された等価比較
trait TokenValue: Any + Send + Sync + fmt::Debug {
    fn eq_value(&self, other: &dyn TokenValue) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T> TokenValue for T
where
    T: Any + Eq + Send + Sync + fmt::Debug,
{
    fn eq_value(&self, other: &dyn TokenValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Token はチャンネルを識別する不透明な値
///
/// # 使用例
/// ```
/// use tidings_core::Token;
///
/// assert_eq!(Token::from("orders"), Token::new("orders"));
/// assert_ne!(Token::from(1_u64), Token::from(1_i64));
/// ```
#[derive(Clone)]
pub struct Token(Arc<dyn TokenValue>);

impl Token {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Eq + Send + Sync + fmt::Debug,
    {
        Self(Arc::new(value))
    }

    /// 中身を型付きで取り出す
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_value(other.0.as_ref())
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.0).finish()
    }
}

impl From<&'static str> for Token {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<u64> for Token {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

/// 両方 None、または両方 Some で等しいときだけ一致
pub(crate) fn tokens_match(subscribed: Option<&Token>, published: Option<&Token>) -> bool {
    match (subscribed, published) {
        (None, None) => true,
        (Some(subscribed), Some(published)) => subscribed == published,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, PartialEq, Eq)]
    struct Channel(u8);

    #[test]
    fn tokens_compare_by_value() {
        assert_eq!(Token::new(Channel(1)), Token::new(Channel(1)));
        assert_ne!(Token::new(Channel(1)), Token::new(Channel(2)));
    }

    #[test]
    fn tokens_of_different_types_never_match() {
        assert_ne!(Token::from("1"), Token::from(1_u64));
        assert_ne!(Token::from(1_u32), Token::from(1_u64));
        // &'static str と String は別の型
        assert_ne!(Token::from("a"), Token::from(String::from("a")));
    }

    #[test]
    fn downcast_returns_inner_value() {
        let token = Token::new(Channel(7));
        assert_eq!(token.downcast_ref::<Channel>(), Some(&Channel(7)));
        assert!(token.downcast_ref::<u8>().is_none());
    }

    #[rstest]
    #[case::both_unset(None, None, true)]
    #[case::only_subscribed(Some("a"), None, false)]
    #[case::only_published(None, Some("a"), false)]
    #[case::equal(Some("a"), Some("a"), true)]
    #[case::different(Some("a"), Some("b"), false)]
    fn token_matching(
        #[case] subscribed: Option<&'static str>,
        #[case] published: Option<&'static str>,
        #[case] expected: bool,
    ) {
        let subscribed = subscribed.map(Token::from);
        let published = published.map(Token::from);
        assert_eq!(
            tokens_match(subscribed.as_ref(), published.as_ref()),
            expected
        );
    }
}
