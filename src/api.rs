//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use std::fmt;

/// シート選択方式
///
/// ストリーミング対象のシートを選択する方法を指定します。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SheetSelector {
    /// 位置指定（1始まり）
    ///
    /// 例: `SheetSelector::Position(1)` は最初のシートを選択（デフォルト）
    Position(usize),

    /// シート名指定
    ///
    /// 例: `SheetSelector::Name("Sheet1".to_string())`
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Position(1)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Position(position) => write!(f, "{}", position),
            SheetSelector::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for SheetSelector {
    fn from(position: usize) -> Self {
        SheetSelector::Position(position)
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

impl From<String> for SheetSelector {
    fn from(name: String) -> Self {
        SheetSelector::Name(name)
    }
}

/// ローダーが返すストリームのフレーミング
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// バイナリ（スプレッドシート形式はこちら）
    Binary,

    /// テキスト（区切り文字形式などのパーサー向け）
    Text,
}
