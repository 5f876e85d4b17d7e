//! Processor Module
//!
//! テーブルの反復中に行を書き換え・抑制するプロセッサーの契約と、
//! 代表的なプロセッサー（ヘッダー抽出、行スキップ、文字列化）を提供するモジュール。

use std::collections::HashSet;

use log::trace;

use crate::error::SheetStreamError;
use crate::types::{CellValue, ExtendedRow};

/// 行を変換するプロセッサー
///
/// プロセッサーは登録順に呼び出され、前のプロセッサーの出力を入力として受け取ります。
/// `values`を`None`にして返すと、その行は抑制されます。
/// 総行数を前提にしてはいけません。
pub trait Processor {
    /// 1行を処理する
    fn process(&mut self, row: ExtendedRow) -> Result<ExtendedRow, SheetStreamError>;

    /// テーブルのオープン・リセット時に呼び出され、内部状態を初期化する
    fn reset(&mut self) {}
}

impl<F> Processor for F
where
    F: FnMut(ExtendedRow) -> Result<ExtendedRow, SheetStreamError>,
{
    fn process(&mut self, row: ExtendedRow) -> Result<ExtendedRow, SheetStreamError> {
        self(row)
    }
}

#[derive(Debug, Clone)]
enum HeaderSource {
    Row(usize),
    Fixed(Vec<String>),
}

/// ヘッダーを確定し、後続の行に付与するプロセッサー
///
/// 行番号を指定した場合、その行の値をヘッダーとして採用し、
/// ヘッダー行とそれ以前の行は抑制されます。
///
/// # 使用例
///
/// ```rust
/// use sheetstream::{CellValue, ExtendedRow, HeaderRowProcessor, Processor};
///
/// let mut processor = HeaderRowProcessor::new(1);
/// let header = processor
///     .process(ExtendedRow::with_values(1, vec!["id".into(), "name".into()]))
///     .unwrap();
/// assert!(header.is_suppressed());
/// assert_eq!(header.header, Some(vec!["id".to_string(), "name".to_string()]));
///
/// let row = processor
///     .process(ExtendedRow::with_values(2, vec![CellValue::Int(1), "english".into()]))
///     .unwrap();
/// assert_eq!(row.header, Some(vec!["id".to_string(), "name".to_string()]));
/// ```
#[derive(Debug, Clone)]
pub struct HeaderRowProcessor {
    source: HeaderSource,
    header: Option<Vec<String>>,
}

impl HeaderRowProcessor {
    /// 指定行（1始まり）をヘッダー行とする
    pub fn new(row_number: usize) -> Self {
        Self {
            source: HeaderSource::Row(row_number),
            header: None,
        }
    }

    /// 固定のヘッダーをすべての行に付与する
    pub fn fixed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        Self {
            header: Some(names.clone()),
            source: HeaderSource::Fixed(names),
        }
    }
}

impl Processor for HeaderRowProcessor {
    fn process(&mut self, mut row: ExtendedRow) -> Result<ExtendedRow, SheetStreamError> {
        if let HeaderSource::Row(header_row) = self.source {
            if row.row_number < header_row {
                return Ok(row.suppress());
            }
            if row.row_number == header_row {
                self.header = row
                    .values
                    .as_ref()
                    .map(|values| values.iter().map(CellValue::to_string).collect());
                trace!("header taken from row {}", header_row);
                row.header = self.header.clone();
                return Ok(row.suppress());
            }
        }

        if self.header.is_some() {
            row.header = self.header.clone();
        }
        Ok(row)
    }

    fn reset(&mut self) {
        if let HeaderSource::Row(_) = self.source {
            self.header = None;
        }
    }
}

/// 行番号またはコメント接頭辞で行を抑制するプロセッサー
///
/// # 使用例
///
/// ```rust
/// use sheetstream::{ExtendedRow, Processor, SkipRowsProcessor};
///
/// let mut processor = SkipRowsProcessor::new().row_number(2).comment_prefix("#");
/// let row = processor
///     .process(ExtendedRow::with_values(1, vec!["# comment".into()]))
///     .unwrap();
/// assert!(row.is_suppressed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SkipRowsProcessor {
    row_numbers: HashSet<usize>,
    comment_prefixes: Vec<String>,
    blank_rows: bool,
}

impl SkipRowsProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定行（1始まり）を抑制する
    pub fn row_number(mut self, row_number: usize) -> Self {
        self.row_numbers.insert(row_number);
        self
    }

    /// 先頭セルが指定の接頭辞で始まる行を抑制する
    pub fn comment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.comment_prefixes.push(prefix.into());
        self
    }

    /// すべてのセルが空の行を抑制する
    pub fn blank_rows(mut self, skip: bool) -> Self {
        self.blank_rows = skip;
        self
    }

    fn should_skip(&self, row_number: usize, values: &[CellValue]) -> bool {
        if self.row_numbers.contains(&row_number) {
            return true;
        }

        if self.blank_rows && values.iter().all(CellValue::is_empty) {
            return true;
        }

        match values.first().and_then(CellValue::as_str) {
            Some(first) => self
                .comment_prefixes
                .iter()
                .any(|prefix| first.starts_with(prefix.as_str())),
            None => false,
        }
    }
}

impl Processor for SkipRowsProcessor {
    fn process(&mut self, row: ExtendedRow) -> Result<ExtendedRow, SheetStreamError> {
        let skip = match row.values.as_deref() {
            Some(values) => self.should_skip(row.row_number, values),
            None => false,
        };

        if skip {
            trace!("row {} skipped", row.row_number);
            Ok(row.suppress())
        } else {
            Ok(row)
        }
    }
}

/// 空でないすべてのセルを文字列に変換するプロセッサー
///
/// 日付・時刻はISO 8601形式（`2000-01-01T17:00:00`）、それ以外は`Display`の表現になります。
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceStringsProcessor;

impl ForceStringsProcessor {
    pub fn new() -> Self {
        Self
    }

    fn stringify(value: CellValue) -> CellValue {
        match value {
            CellValue::Empty | CellValue::String(_) => value,
            CellValue::DateTime(dt) => {
                CellValue::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            other => CellValue::String(other.to_string()),
        }
    }
}

impl Processor for ForceStringsProcessor {
    fn process(&mut self, mut row: ExtendedRow) -> Result<ExtendedRow, SheetStreamError> {
        if let Some(values) = row.values.take() {
            row.values = Some(values.into_iter().map(Self::stringify).collect());
        }
        Ok(row)
    }
}
