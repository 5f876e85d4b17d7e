//! XLSX Parser Module
//!
//! ローダーから取得したXLSXワークブックの1シートを、拡張行として順に生成するパーサー。

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom};

use log::{debug, warn};

use crate::api::LoadMode;
use crate::builder::{XlsxOptions, XlsxParserBuilder};
use crate::error::SheetStreamError;
use crate::formatter::CellFormatter;
use crate::grid::SheetGrid;
use crate::loader::{Loader, ReadSeek};
use crate::parser::metadata::XlsxMetadataParser;
use crate::parser::workbook::WorkbookParser;
use crate::parser::Parser;
use crate::security::SecurityConfig;
use crate::types::{CellCoord, ExtendedRow};

/// 開いているシートの状態
struct OpenSheet {
    /// シーク可能なローカルストリーム
    stream: Box<dyn ReadSeek>,
    /// デコード済みのグリッド
    grid: SheetGrid,
    /// 解決済みのシート名
    sheet_name: String,
    /// 次に返す行のインデックス（0始まり）
    cursor: usize,
}

/// XLSXパーサー
///
/// `open()`のたびにローダーからストリームを取得し、選択されたシートをデコードします。
/// `reset()`は再デコードを行わず、ストリームの先頭へのシークと行カーソルの巻き戻しのみを行います。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetstream::{FileLoader, Parser, XlsxParser};
///
/// # fn main() -> Result<(), sheetstream::SheetStreamError> {
/// let mut parser = XlsxParser::builder()
///     .with_sheet("Data")
///     .fill_merged_cells(true)
///     .build(FileLoader)?;
///
/// parser.open("report.xlsx", None)?;
/// for row in parser.extended_rows() {
///     let row = row?;
///     println!("{}: {:?}", row.row_number, row.values);
/// }
/// # Ok(())
/// # }
/// ```
pub struct XlsxParser {
    loader: Box<dyn Loader>,
    options: XlsxOptions,
    security: SecurityConfig,
    formatter: CellFormatter,
    encoding: Option<String>,
    sheet: Option<OpenSheet>,
}

impl XlsxParser {
    /// 設定用のビルダーを生成
    pub fn builder() -> XlsxParserBuilder {
        XlsxParserBuilder::new()
    }

    pub(crate) fn from_options(loader: Box<dyn Loader>, options: XlsxOptions) -> Self {
        Self {
            loader,
            options,
            security: SecurityConfig::default(),
            formatter: CellFormatter::new(),
            encoding: None,
            sheet: None,
        }
    }

    /// ストリームをデコードし、行カーソルを先頭に置いたシートを構築（内部ヘルパー）
    fn decode(
        &self,
        location: &str,
        mut stream: Box<dyn ReadSeek>,
    ) -> Result<OpenSheet, SheetStreamError> {
        let size = stream.seek(SeekFrom::End(0))?;
        self.security.check_input_size(size)?;
        stream.seek(SeekFrom::Start(0))?;

        let mut buffer = Vec::with_capacity(size as usize);
        stream.read_to_end(&mut buffer)?;

        let mut workbook = WorkbookParser::open(Cursor::new(buffer))?;
        let sheet_name = workbook.resolve_sheet(&self.options.sheet, location)?;
        debug!(
            "sheet {} of \"{}\" resolved to \"{}\"",
            self.options.sheet, location, sheet_name
        );

        let mut grid = workbook.sheet_grid(&sheet_name, self.options.force_parse)?;

        if self.options.fill_merged_cells {
            let filled = grid.fill_merged_cells();
            debug!("filled {} merged regions", filled);
        }

        if self.options.preserve_formatting {
            stream.seek(SeekFrom::Start(0))?;
            match self.read_format_codes(stream.as_mut(), &sheet_name) {
                Ok(codes) => grid.set_format_codes(codes),
                Err(e @ SheetStreamError::SecurityViolation(_)) => return Err(e),
                Err(e) if self.options.force_parse => {
                    warn!(
                        "failed to read number formats of \"{}\", values are returned raw: {}",
                        sheet_name, e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        stream.seek(SeekFrom::Start(0))?;

        Ok(OpenSheet {
            stream,
            grid,
            sheet_name,
            cursor: 0,
        })
    }

    fn read_format_codes(
        &self,
        stream: &mut dyn ReadSeek,
        sheet_name: &str,
    ) -> Result<HashMap<CellCoord, String>, SheetStreamError> {
        XlsxMetadataParser::new(stream, &self.security)?.format_codes(sheet_name)
    }
}

impl Parser for XlsxParser {
    fn open(&mut self, source: &str, encoding: Option<&str>) -> Result<(), SheetStreamError> {
        self.close();

        debug!("opening \"{}\"", source);
        let stream = self
            .loader
            .load(source, LoadMode::Binary, encoding)?
            .into_local_with_limit(self.security.max_input_file_size)?;

        let sheet = self.decode(source, stream)?;
        self.encoding = encoding.map(str::to_string);
        self.sheet = Some(sheet);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(sheet) = self.sheet.take() {
            debug!("closing sheet \"{}\"", sheet.sheet_name);
        }
    }

    fn reset(&mut self) -> Result<(), SheetStreamError> {
        let sheet = self
            .sheet
            .as_mut()
            .ok_or_else(|| SheetStreamError::closed("XlsxParser", "reset"))?;

        sheet.stream.seek(SeekFrom::Start(0))?;
        sheet.cursor = 0;
        debug!("rewound sheet \"{}\"", sheet.sheet_name);
        Ok(())
    }

    fn closed(&self) -> bool {
        self.sheet.is_none()
    }

    fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    fn fragment(&self) -> Option<&str> {
        self.sheet.as_ref().map(|sheet| sheet.sheet_name.as_str())
    }

    fn next_extended_row(&mut self) -> Option<Result<ExtendedRow, SheetStreamError>> {
        let sheet = self.sheet.as_mut()?;
        let index = sheet.cursor;
        let row = sheet.grid.row(index)?;

        let values = if self.options.preserve_formatting {
            row.iter()
                .enumerate()
                .map(|(col, value)| {
                    let coord = CellCoord::new(index as u32, col as u32);
                    self.formatter
                        .format(value.clone(), sheet.grid.format_code(coord))
                })
                .collect()
        } else {
            row.to_vec()
        };

        sheet.cursor += 1;
        Some(Ok(ExtendedRow::new(index + 1, None, Some(values))))
    }
}
