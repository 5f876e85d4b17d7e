//! Builder Module
//!
//! Fluent Builder APIを提供し、`XlsxParser`インスタンスを段階的に構築する。

use crate::api::SheetSelector;
use crate::error::SheetStreamError;
use crate::loader::Loader;
use crate::parser::XlsxParser;

/// XLSXパーサーの設定を保持する内部構造体
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct XlsxOptions {
    /// シート選択方式
    pub sheet: SheetSelector,

    /// 結合セルを展開するか
    pub fill_merged_cells: bool,

    /// 表示書式を再現するか
    pub preserve_formatting: bool,

    /// デコード後の失敗を警告に留めるか
    pub force_parse: bool,
}

/// Fluent Builder APIを提供する構造体
///
/// `XlsxParser`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust
/// use sheetstream::{BytesLoader, XlsxParserBuilder};
///
/// # fn main() -> Result<(), sheetstream::SheetStreamError> {
/// let parser = XlsxParserBuilder::new()
///     .with_sheet("Data")
///     .fill_merged_cells(true)
///     .preserve_formatting(true)
///     .build(BytesLoader::new(Vec::new()))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct XlsxParserBuilder {
    /// 内部設定（構築中）
    options: XlsxOptions,
}

impl XlsxParserBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - シート選択: 最初のシート（`SheetSelector::Position(1)`）
    /// - 結合セル: 展開しない
    /// - 表示書式: 再現しない（生の値）
    /// - force_parse: 無効
    pub fn new() -> Self {
        Self::default()
    }

    /// 対象のシートを選択する
    ///
    /// 1始まりの位置（`usize`）またはシート名（`&str`/`String`）を受け付けます。
    ///
    /// ```rust
    /// use sheetstream::{SheetSelector, XlsxParserBuilder};
    ///
    /// let by_position = XlsxParserBuilder::new().with_sheet(2usize);
    /// let by_name = XlsxParserBuilder::new().with_sheet("Sheet1");
    /// let explicit = XlsxParserBuilder::new().with_sheet(SheetSelector::Position(1));
    /// ```
    pub fn with_sheet(mut self, sheet: impl Into<SheetSelector>) -> Self {
        self.options.sheet = sheet.into();
        self
    }

    /// 結合セルの左上セルの値を、結合範囲内のすべてのセルに複製する
    pub fn fill_merged_cells(mut self, fill: bool) -> Self {
        self.options.fill_merged_cells = fill;
        self
    }

    /// Number Format Stringに基づいてセルの表示文字列を再現する
    ///
    /// 既知の書式（`0`、`0.00`、`#,##0`、`#,##0.00`、`#,###.00`、`m/d/yy`、`mm/dd/yy`、`d-mmm`）
    /// のみが文字列化され、それ以外のセルは生の値のまま返されます。
    pub fn preserve_formatting(mut self, preserve: bool) -> Self {
        self.options.preserve_formatting = preserve;
        self
    }

    /// ワークブックのデコード後に発生した失敗を警告に留める
    ///
    /// シートのセル範囲・書式・結合範囲の取得に失敗した場合、`log::warn!`で記録し、
    /// 空のシート・生の値・結合なしとして処理を継続します。
    /// ワークブック自体がデコードできない場合は常にエラーになります。
    pub fn force_parse(mut self, force: bool) -> Self {
        self.options.force_parse = force;
        self
    }

    /// ビルダーの設定を検証し、ローダーを所有する`XlsxParser`を構築する
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxParser)`: 閉じた状態のパーサー
    /// * `Err(SheetStreamError::Config)`: 設定が無効な場合（位置0、空のシート名）
    pub fn build<L: Loader + 'static>(self, loader: L) -> Result<XlsxParser, SheetStreamError> {
        match &self.options.sheet {
            SheetSelector::Position(0) => {
                return Err(SheetStreamError::Config(
                    "Sheet position is 1-based; position 0 does not exist".to_string(),
                ));
            }
            SheetSelector::Name(name) if name.is_empty() => {
                return Err(SheetStreamError::Config(
                    "Sheet name must not be empty".to_string(),
                ));
            }
            _ => {}
        }

        Ok(XlsxParser::from_options(Box::new(loader), self.options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FileLoader;

    #[test]
    fn test_builder_defaults() {
        let builder = XlsxParserBuilder::new();
        assert_eq!(builder.options, XlsxOptions::default());
        assert_eq!(builder.options.sheet, SheetSelector::Position(1));
        assert!(!builder.options.fill_merged_cells);
        assert!(!builder.options.preserve_formatting);
        assert!(!builder.options.force_parse);
    }

    #[test]
    fn test_builder_method_chaining() {
        let builder = XlsxParserBuilder::new()
            .with_sheet("Data")
            .fill_merged_cells(true)
            .preserve_formatting(true)
            .force_parse(true);

        assert_eq!(builder.options.sheet, SheetSelector::Name("Data".to_string()));
        assert!(builder.options.fill_merged_cells);
        assert!(builder.options.preserve_formatting);
        assert!(builder.options.force_parse);
    }

    #[test]
    fn test_build_success() {
        let parser = XlsxParserBuilder::new().with_sheet(SheetSelector::Position(2)).build(FileLoader);
        assert!(parser.is_ok());
    }

    #[test]
    fn test_build_with_position_zero() {
        match XlsxParserBuilder::new().with_sheet(SheetSelector::Position(0)).build(FileLoader) {
            Err(SheetStreamError::Config(msg)) => assert!(msg.contains("1-based")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_build_with_empty_sheet_name() {
        match XlsxParserBuilder::new().with_sheet("").build(FileLoader) {
            Err(SheetStreamError::Config(msg)) => assert!(msg.contains("empty")),
            _ => panic!("Expected Config error"),
        }
    }
}
