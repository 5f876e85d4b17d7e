//! Table Module
//!
//! パーサーとプロセッサーチェーンを束ね、行の逐次読み込み・一括読み込み・
//! ヘッダーの遅延検出を提供するオーケストレーター。

use log::debug;

use crate::error::SheetStreamError;
use crate::parser::Parser;
use crate::processor::Processor;
use crate::types::{ExtendedRow, KeyedRow, Row};

/// `open()`/`reset()`から次の巻き戻しまでの反復状態
#[derive(Debug, Default)]
struct Pass {
    /// 直前に割り当てた行インデックス（1始まり）
    index: Option<usize>,
    /// 現在のヘッダー
    header: Option<Vec<String>>,
}

/// 表形式データのストリーム
///
/// パーサー（ローダーを所有）とプロセッサーチェーンを所有し、
/// ヘッダーのキャッシュとストリーム先頭のマーカーを管理します。
///
/// # 使用例
///
/// ```rust
/// use sheetstream::{CellValue, HeaderRowProcessor, NativeParser, Table};
///
/// # fn main() -> Result<(), sheetstream::SheetStreamError> {
/// let parser = NativeParser::new(vec![
///     vec![CellValue::from("id"), CellValue::from("name")],
///     vec![CellValue::Int(1), CellValue::from("english")],
///     vec![CellValue::Int(2), CellValue::from("中国人")],
/// ]);
///
/// let mut table = Table::new("native", parser);
/// table.add_processor(HeaderRowProcessor::new(1));
/// table.open()?;
///
/// assert_eq!(table.headers()?, Some(&["id".to_string(), "name".to_string()][..]));
/// for row in table.readrow(true)? {
///     let row = row?;
///     println!("{:?}", row.as_keyed().and_then(|row| row.get("name")));
/// }
/// # Ok(())
/// # }
/// ```
pub struct Table {
    source: String,
    encoding: Option<String>,
    parser: Box<dyn Parser>,
    processors: Vec<Box<dyn Processor>>,
    headers: Option<Vec<String>>,
    pass: Pass,
    at_start: bool,
}

impl Table {
    /// 閉じた状態のテーブルを生成
    ///
    /// # 引数
    ///
    /// * `source` - パーサーのローダーに渡すソースの識別子
    /// * `parser` - 行を生成するパーサー
    pub fn new<P: Parser + 'static>(source: impl Into<String>, parser: P) -> Self {
        Self {
            source: source.into(),
            encoding: None,
            parser: Box::new(parser),
            processors: Vec::new(),
            headers: None,
            pass: Pass::default(),
            at_start: false,
        }
    }

    /// `open()`時にパーサーへ渡すエンコーディングを指定
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// プロセッサーを末尾に追加（登録順に実行される）
    pub fn add_processor<P: Processor + 'static>(&mut self, processor: P) -> &mut Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// ソースの識別子
    pub fn source(&self) -> &str {
        &self.source
    }

    /// エンコーディング（パーサーが開いている場合はパーサーの値）
    pub fn encoding(&self) -> Option<&str> {
        self.parser.encoding().or(self.encoding.as_deref())
    }

    /// パーサーが選択した部分（XLSXではシート名）
    pub fn fragment(&self) -> Option<&str> {
        self.parser.fragment()
    }

    pub fn closed(&self) -> bool {
        self.parser.closed()
    }

    /// テーブルを開く
    ///
    /// 既に開いている場合は何もしません。失敗した場合、テーブルは閉じたままで
    /// ヘッダーのキャッシュも変更されません。
    pub fn open(&mut self) -> Result<(), SheetStreamError> {
        if !self.closed() {
            return Ok(());
        }

        self.parser.open(&self.source, self.encoding.as_deref())?;
        self.headers = None;
        self.pass = Pass::default();
        self.reset_processors();
        self.at_start = true;
        debug!("table \"{}\" opened", self.source);
        Ok(())
    }

    /// テーブルを閉じる（冪等）
    pub fn close(&mut self) {
        if !self.closed() {
            debug!("table \"{}\" closed", self.source);
        }
        self.parser.close();
    }

    /// 先頭に巻き戻し、ヘッダーのキャッシュを破棄する
    pub fn reset(&mut self) -> Result<(), SheetStreamError> {
        if self.closed() {
            return Err(SheetStreamError::closed("Table", "reset"));
        }

        self.rewind()?;
        self.headers = None;
        Ok(())
    }

    /// ヘッダーを取得
    ///
    /// キャッシュがなく、`open()`/`reset()`以降に1行も消費されていない場合に限り、
    /// ヘッダーが確定するまでパイプラインを実行してから先頭に巻き戻します。
    /// 呼び出し側の反復位置は消費されません。
    pub fn headers(&mut self) -> Result<Option<&[String]>, SheetStreamError> {
        if self.closed() {
            return Err(SheetStreamError::closed("Table", "header discovery"));
        }

        if self.headers.is_none() && self.at_start {
            let probed = self.probe_headers();
            self.rewind()?;
            probed?;
            debug!("header probe found {:?}", self.headers);
        }

        Ok(self.headers.as_deref())
    }

    /// 行を1行ずつ読み込む
    ///
    /// 続けて呼び出した場合は前回の位置から読み進め、行番号も引き継がれます。
    /// `with_headers`が`true`の場合は`Row::Keyed`、それ以外は`Row::Values`を返します。
    pub fn readrow(&mut self, with_headers: bool) -> Result<RowIter<'_>, SheetStreamError> {
        Ok(RowIter {
            rows: self.readrow_extended()?,
            with_headers,
        })
    }

    /// プロセッサー適用後の拡張行を1行ずつ読み込む
    pub fn readrow_extended(&mut self) -> Result<ExtendedRowIter<'_>, SheetStreamError> {
        if self.closed() {
            return Err(SheetStreamError::closed("Table", "iteration"));
        }

        Ok(ExtendedRowIter { table: self })
    }

    /// 行を一括で読み込む
    ///
    /// `limit`を指定した場合、返す行数は`min(limit, 残りの行数)`です。
    pub fn read(
        &mut self,
        with_headers: bool,
        limit: Option<usize>,
    ) -> Result<Vec<Row>, SheetStreamError> {
        let rows = self.readrow(with_headers)?;
        match limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }

    /// 拡張行を一括で読み込む
    pub fn read_extended(
        &mut self,
        limit: Option<usize>,
    ) -> Result<Vec<ExtendedRow>, SheetStreamError> {
        let rows = self.readrow_extended()?;
        match limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }

    /// パーサーとプロセッサーを先頭状態に戻す（ヘッダーのキャッシュは保持）
    fn rewind(&mut self) -> Result<(), SheetStreamError> {
        self.parser.reset()?;
        self.pass = Pass::default();
        self.reset_processors();
        self.at_start = true;
        Ok(())
    }

    fn reset_processors(&mut self) {
        for processor in &mut self.processors {
            processor.reset();
        }
    }

    /// ヘッダーがキャッシュされるか、ストリームが終わるまで読み進める
    fn probe_headers(&mut self) -> Result<(), SheetStreamError> {
        while self.headers.is_none() {
            match self.next_row() {
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Ok(())
    }

    /// 反復の中核
    ///
    /// パーサーの行にインデックスを割り当て、プロセッサーを登録順に適用します。
    /// `values`が`None`になった時点で残りのプロセッサーは呼ばれず、その行は返されません。
    /// 結果のヘッダーは抑制された行であってもキャッシュされます。
    fn next_row(&mut self) -> Option<Result<ExtendedRow, SheetStreamError>> {
        let pass = &mut self.pass;
        loop {
            let raw = match self.parser.next_extended_row()? {
                Ok(raw) => raw,
                Err(e) => return Some(Err(e)),
            };
            self.at_start = false;

            if raw.header.is_some() {
                pass.header = raw.header;
            }
            let index = pass.index.map_or(1, |index| index + 1);
            pass.index = Some(index);

            let mut row = ExtendedRow::new(index, pass.header.clone(), raw.values);
            for processor in &mut self.processors {
                row = match processor.process(row) {
                    Ok(row) => row,
                    Err(e) => return Some(Err(e)),
                };
                if row.is_suppressed() {
                    break;
                }
            }

            if let Some(header) = &row.header {
                pass.header = Some(header.clone());
                self.headers = Some(header.clone());
            }

            if !row.is_suppressed() {
                return Some(Ok(row));
            }
        }
    }

    /// 拡張行を呼び出し側の行に変換
    fn to_row(&self, row: ExtendedRow, with_headers: bool) -> Result<Row, SheetStreamError> {
        let values = row.values.unwrap_or_default();
        if !with_headers {
            return Ok(Row::Values(values));
        }

        let headers = row
            .header
            .or_else(|| self.headers.clone())
            .ok_or(SheetStreamError::MissingHeaders)?;

        if headers.len() != values.len() {
            return Err(SheetStreamError::RowShape {
                row_number: row.row_number,
                headers: headers.len(),
                values: values.len(),
            });
        }

        Ok(Row::Keyed(KeyedRow::new(headers, values)))
    }
}

/// `Table::readrow_extended`が返すイテレーター
pub struct ExtendedRowIter<'a> {
    table: &'a mut Table,
}

impl Iterator for ExtendedRowIter<'_> {
    type Item = Result<ExtendedRow, SheetStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.table.next_row()
    }
}

/// `Table::readrow`が返すイテレーター
pub struct RowIter<'a> {
    rows: ExtendedRowIter<'a>,
    with_headers: bool,
}

impl Iterator for RowIter<'_> {
    type Item = Result<Row, SheetStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(e)),
        };
        Some(self.rows.table.to_row(row, self.with_headers))
    }
}
