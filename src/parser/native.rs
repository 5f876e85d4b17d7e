//! Native Parser Module
//!
//! メモリ上の行データ（`Vec<Vec<CellValue>>`）をそのまま拡張行として生成するパーサー。

use log::debug;

use crate::error::SheetStreamError;
use crate::parser::Parser;
use crate::types::{CellValue, ExtendedRow};

/// メモリ上の行データを流すパーサー
///
/// ローダーを持たず、`open()`のソース文字列は無視されます。
///
/// # 使用例
///
/// ```rust
/// use sheetstream::{CellValue, NativeParser, Parser};
///
/// let mut parser = NativeParser::new(vec![
///     vec![CellValue::from("id"), CellValue::from("name")],
///     vec![CellValue::Int(1), CellValue::from("english")],
/// ]);
/// parser.open("native", None).unwrap();
/// assert_eq!(parser.extended_rows().count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct NativeParser {
    rows: Vec<Vec<CellValue>>,
    encoding: Option<String>,
    cursor: Option<usize>,
}

impl NativeParser {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            rows,
            encoding: None,
            cursor: None,
        }
    }
}

impl Parser for NativeParser {
    fn open(&mut self, _source: &str, encoding: Option<&str>) -> Result<(), SheetStreamError> {
        self.encoding = encoding.map(str::to_string);
        self.cursor = Some(0);
        debug!("opened native source with {} rows", self.rows.len());
        Ok(())
    }

    fn close(&mut self) {
        self.cursor = None;
    }

    fn reset(&mut self) -> Result<(), SheetStreamError> {
        match self.cursor.as_mut() {
            Some(cursor) => {
                *cursor = 0;
                Ok(())
            }
            None => Err(SheetStreamError::closed("NativeParser", "reset")),
        }
    }

    fn closed(&self) -> bool {
        self.cursor.is_none()
    }

    fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    fn fragment(&self) -> Option<&str> {
        None
    }

    fn next_extended_row(&mut self) -> Option<Result<ExtendedRow, SheetStreamError>> {
        let cursor = self.cursor.as_mut()?;
        let values = self.rows.get(*cursor)?.clone();
        *cursor += 1;
        Some(Ok(ExtendedRow::with_values(*cursor, values)))
    }
}
