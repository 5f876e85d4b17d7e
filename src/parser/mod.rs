//! Parser Module
//!
//! ソースを開き、`(行番号, ヘッダー, 値)`の拡張行を順に生成するパーサーの契約と実装。

mod metadata;
mod native;
mod workbook;
mod xlsx;

pub use native::NativeParser;
pub use xlsx::XlsxParser;

use crate::error::SheetStreamError;
use crate::types::ExtendedRow;

/// 形式ごとのパーサー
///
/// `open()`で読み込んだソースを、`reset()`のたびに先頭から1パス分の拡張行として生成します。
/// 行番号は1始まりで、1パス内で単調に増加します。
pub trait Parser {
    /// ソースを開く（既に開いている場合は閉じてから開き直す）
    fn open(&mut self, source: &str, encoding: Option<&str>) -> Result<(), SheetStreamError>;

    /// ストリームを破棄する（冪等）
    fn close(&mut self);

    /// 行カーソルを先頭に戻す（閉じている場合は状態エラー）
    fn reset(&mut self) -> Result<(), SheetStreamError>;

    /// 閉じているかどうか
    fn closed(&self) -> bool;

    /// 呼び出し側が指定したエンコーディング
    fn encoding(&self) -> Option<&str>;

    /// ソース内で選択された部分（XLSXではシート名）
    fn fragment(&self) -> Option<&str>;

    /// 次の拡張行を取得する
    ///
    /// パスの終端では`None`を返します。閉じたパーサーは常に`None`を返します。
    fn next_extended_row(&mut self) -> Option<Result<ExtendedRow, SheetStreamError>>;

    /// 現在のパスの残りの拡張行を走査するイテレーター
    fn extended_rows(&mut self) -> ExtendedRows<'_, Self>
    where
        Self: Sized,
    {
        ExtendedRows { parser: self }
    }
}

/// `Parser::extended_rows`が返すイテレーター
pub struct ExtendedRows<'a, P: Parser + ?Sized> {
    parser: &'a mut P,
}

impl<P: Parser + ?Sized> Iterator for ExtendedRows<'_, P> {
    type Item = Result<ExtendedRow, SheetStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_extended_row()
    }
}

impl<P: Parser + ?Sized> Parser for Box<P> {
    fn open(&mut self, source: &str, encoding: Option<&str>) -> Result<(), SheetStreamError> {
        (**self).open(source, encoding)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn reset(&mut self) -> Result<(), SheetStreamError> {
        (**self).reset()
    }

    fn closed(&self) -> bool {
        (**self).closed()
    }

    fn encoding(&self) -> Option<&str> {
        (**self).encoding()
    }

    fn fragment(&self) -> Option<&str> {
        (**self).fragment()
    }

    fn next_extended_row(&mut self) -> Option<Result<ExtendedRow, SheetStreamError>> {
        (**self).next_extended_row()
    }
}
