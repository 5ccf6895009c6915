pub mod customer;

use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fmt::{Debug, Display},
    ops::Deref,
    str::FromStr,
};
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync>;

pub trait Id:
    Copy
    + Eq
    + Ord
    + Deref<Target = Self::Inner>
    + From<Self::Inner>
    + Display
    + Debug
    + Serialize
    + for<'de> Deserialize<'de>
{
    type Inner: FromStr;

    /// パスパラメータ等の文字列からIDを得る
    ///
    /// 先頭の空白と符号を読み飛ばし、続く数字だけを読む (`"1abc"` は 1)。
    /// 負の値と数字で始まらない文字列はどのIDにもならない。
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim_start();
        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let end = unsigned
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(unsigned.len());
        let digits = &unsigned[..end];
        if digits.is_empty() || (negative && digits.bytes().any(|b| b != b'0')) {
            return None;
        }
        digits.parse::<Self::Inner>().ok().map(Self::from)
    }
}

pub trait Entity: Debug + Clone {
    type Id: Id;

    const ENTITY_NAME: &'static str;

    fn id(&self) -> Self::Id;
}

#[derive(Error, Debug)]
pub enum DataAccessError {
    #[error("Data read error: {0}")]
    ReadError(BoxError),
    #[error("Data write error: {0}")]
    WriteError(BoxError),
}

impl DataAccessError {
    pub fn read<E: Into<BoxError>>(error: E) -> Self {
        Self::ReadError(error.into())
    }

    pub fn write<E: Into<BoxError>>(error: E) -> Self {
        Self::WriteError(error.into())
    }
}
