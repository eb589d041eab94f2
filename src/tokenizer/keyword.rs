#[derive(
    Debug, Clone, PartialEq, strum::EnumString, strum::Display, strum::EnumIter, strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    If,
    Else,
    While,
    For,
    In,
    Break,
    Continue,
    True,
    False,
    Null,
}
