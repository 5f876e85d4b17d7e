//! Workbook Module
//!
//! calamineを使用したワークブックの解析。
//! シートの解決、セル値の変換、結合範囲の取得を行い、`SheetGrid`を構築します。

use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDateTime;
use log::{debug, warn};
use std::io::{Read, Seek};

use crate::api::SheetSelector;
use crate::error::SheetStreamError;
use crate::grid::SheetGrid;
use crate::types::{CellCoord, CellRange, CellValue, MergedRegion};

/// ワークブックパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
pub(crate) struct WorkbookParser<R: Read + Seek> {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<R>,
}

impl<R: Read + Seek> WorkbookParser<R> {
    /// ワークブックを開く
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックの読み込みに成功した場合
    /// * `Err(SheetStreamError::Parse)` - XLSXとしてデコードできない場合
    pub fn open(reader: R) -> Result<Self, SheetStreamError> {
        let workbook: Xlsx<R> =
            Xlsx::new(reader).map_err(|e| SheetStreamError::Parse(e.into()))?;
        Ok(Self { workbook })
    }

    /// すべてのシート名を取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// シート選択方式に基づいてシート名を解決
    ///
    /// # 引数
    ///
    /// * `selector` - シート選択方式（位置は1始まり）
    /// * `location` - エラーメッセージに含めるソースの識別子
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 解決されたシート名
    /// * `Err(SheetStreamError::Source)` - シートが見つからない場合
    pub fn resolve_sheet(
        &self,
        selector: &SheetSelector,
        location: &str,
    ) -> Result<String, SheetStreamError> {
        let names = self.sheet_names();
        let resolved = match selector {
            SheetSelector::Position(position) => position
                .checked_sub(1)
                .and_then(|index| names.get(index))
                .cloned(),
            SheetSelector::Name(name) => names.iter().find(|n| *n == name).cloned(),
        };

        resolved.ok_or_else(|| SheetStreamError::Source {
            location: location.to_string(),
            sheet: selector.to_string(),
        })
    }

    /// シートをデコードしてグリッドを構築
    ///
    /// # 引数
    ///
    /// * `sheet_name` - 解決済みのシート名
    /// * `force_parse` - セル範囲・結合範囲の取得失敗を警告に留めるかどうか
    pub fn sheet_grid(
        &mut self,
        sheet_name: &str,
        force_parse: bool,
    ) -> Result<SheetGrid, SheetStreamError> {
        let cells = match self.workbook.worksheet_range(sheet_name) {
            Ok(range) => {
                let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
                range
                    .used_cells()
                    .map(|(row, col, data)| {
                        let coord =
                            CellCoord::new(row_offset + row as u32, col_offset + col as u32);
                        (coord, convert_value(data))
                    })
                    .collect()
            }
            Err(e) if force_parse => {
                warn!(
                    "failed to read worksheet \"{}\", continuing with an empty sheet: {}",
                    sheet_name, e
                );
                Vec::new()
            }
            Err(e) => return Err(SheetStreamError::Parse(e.into())),
        };

        let merged_regions = match self.merged_regions(sheet_name) {
            Ok(regions) => regions,
            Err(e) if force_parse => {
                warn!(
                    "failed to read merged regions of \"{}\", continuing without them: {}",
                    sheet_name, e
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        debug!(
            "decoded sheet \"{}\": {} cells, {} merged regions",
            sheet_name,
            cells.len(),
            merged_regions.len()
        );

        Ok(SheetGrid::build(cells, merged_regions))
    }

    /// シートの結合範囲を取得
    fn merged_regions(&mut self, sheet_name: &str) -> Result<Vec<MergedRegion>, SheetStreamError> {
        self.workbook
            .load_merged_regions()
            .map_err(|e| SheetStreamError::Parse(e.into()))?;

        match self.workbook.worksheet_merge_cells(sheet_name) {
            Some(Ok(regions)) => Ok(regions
                .iter()
                .map(|dims| {
                    let start = CellCoord::new(dims.start.0, dims.start.1);
                    let end = CellCoord::new(dims.end.0, dims.end.1);
                    MergedRegion::new(CellRange::new(start, end))
                })
                .collect()),
            Some(Err(e)) => Err(SheetStreamError::Parse(e.into())),
            None => Ok(Vec::new()),
        }
    }
}

/// calamineのセル値を`CellValue`に変換
pub(crate) fn convert_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) if dt.is_datetime() => CellValue::DateTime(datetime),
            _ => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::String(s.clone())),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(format!("{:?}", e)),
        Data::Empty => CellValue::Empty,
    }
}

/// ISO 8601形式の日付・日時文字列を解析
fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
