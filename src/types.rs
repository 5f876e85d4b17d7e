//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use std::fmt;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// 空セル
    Empty,

    /// 論理値
    Bool(bool),

    /// 整数
    Int(i64),

    /// 数値（f64）
    Float(f64),

    /// 文字列
    String(String),

    /// 日付・時刻
    DateTime(NaiveDateTime),

    /// エラー値（例: #DIV/0!）
    Error(String),
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 文字列値を参照として取得
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// 数値として取得（整数は`f64`に変換）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(n) => write!(f, "{}", n),
            CellValue::String(s) => f.write_str(s),
            CellValue::DateTime(dt) => write!(f, "{}", dt),
            CellValue::Error(e) => f.write_str(e),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

/// パーサーおよびプロセッサーが受け渡す拡張行
///
/// `values`が`None`の行は抑制された行を表し、呼び出し側には渡されません。
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ExtendedRow {
    /// 行番号（1始まり）
    pub row_number: usize,

    /// ヘッダー（ヘッダーが確定した行でのみ`Some`）
    pub header: Option<Vec<String>>,

    /// 行の値（`None`は行の抑制）
    pub values: Option<Vec<CellValue>>,
}

impl ExtendedRow {
    /// 新しい拡張行を生成
    pub fn new(
        row_number: usize,
        header: Option<Vec<String>>,
        values: Option<Vec<CellValue>>,
    ) -> Self {
        Self {
            row_number,
            header,
            values,
        }
    }

    /// 値を持つ拡張行を生成（ヘッダーなし）
    pub fn with_values(row_number: usize, values: Vec<CellValue>) -> Self {
        Self::new(row_number, None, Some(values))
    }

    /// 行を抑制する
    pub fn suppress(mut self) -> Self {
        self.values = None;
        self
    }

    /// 抑制された行かどうか
    pub fn is_suppressed(&self) -> bool {
        self.values.is_none()
    }
}

/// ヘッダー名をキーとして値を参照できる行
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRow {
    headers: Vec<String>,
    values: Vec<CellValue>,
}

impl KeyedRow {
    pub(crate) fn new(headers: Vec<String>, values: Vec<CellValue>) -> Self {
        Self { headers, values }
    }

    /// ヘッダー名で値を取得
    ///
    /// 同名のヘッダーが複数ある場合は最初の列を返します。
    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.headers
            .iter()
            .position(|header| header == name)
            .and_then(|index| self.values.get(index))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<CellValue> {
        self.values
    }

    /// `(ヘッダー名, 値)`のペアを列順に走査
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Serialize for KeyedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// `Table::readrow`が返す行
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Row {
    /// 位置ベースの値
    Values(Vec<CellValue>),

    /// ヘッダー名付きの値
    Keyed(KeyedRow),
}

impl Row {
    /// 列順の値を取得
    pub fn values(&self) -> &[CellValue] {
        match self {
            Row::Values(values) => values,
            Row::Keyed(row) => row.values(),
        }
    }

    pub fn into_values(self) -> Vec<CellValue> {
        match self {
            Row::Values(values) => values,
            Row::Keyed(row) => row.into_values(),
        }
    }

    pub fn as_keyed(&self) -> Option<&KeyedRow> {
        match self {
            Row::Keyed(row) => Some(row),
            Row::Values(_) => None,
        }
    }
}

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式のセル参照を座標に変換（例: "B3" -> (2, 1)）
    pub fn from_a1_notation(reference: &str) -> Option<Self> {
        let split = reference.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = reference.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        let mut col: u32 = 0;
        for ch in letters.chars() {
            let value = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            col = col.checked_mul(26)?.checked_add(value)?;
        }

        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }

        Some(Self::new(row - 1, col - 1))
    }
}

/// セル範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CellRange {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl CellRange {
    /// 新しい範囲を生成
    pub fn new(start: CellCoord, end: CellCoord) -> Self {
        Self { start, end }
    }

    /// 範囲内の座標を行優先で走査
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> {
        let (start, end) = (self.start, self.end);
        (start.row..=end.row)
            .flat_map(move |row| (start.col..=end.col).map(move |col| CellCoord::new(row, col)))
    }
}

/// セル結合範囲の情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MergedRegion {
    /// 結合範囲
    pub range: CellRange,

    /// 親セル（左上セル）の座標
    pub parent: CellCoord,
}

impl MergedRegion {
    /// 新しい結合範囲を生成
    pub fn new(range: CellRange) -> Self {
        Self {
            parent: range.start,
            range,
        }
    }
}
