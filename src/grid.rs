//! Grid Module
//!
//! スパースなセルデータから、A1を起点とする稠密なシートグリッドへの変換を提供するモジュール。
//! 結合セルの展開（左上セルの値を結合範囲内のすべてのセルに複製）もここで行います。

use std::collections::HashMap;

use crate::types::{CellCoord, CellValue, MergedRegion};

/// デコード済みシートの稠密なグリッド
///
/// グリッドはA1を起点とするため、行インデックス + 1 がシート上の物理行番号になります。
/// グリッドの範囲は、値を持つセルとすべての結合範囲を覆います。
#[derive(Debug, Clone, Default)]
pub(crate) struct SheetGrid {
    /// グリッドデータ（行 × 列）
    rows: Vec<Vec<CellValue>>,

    /// 未展開の結合範囲
    merged_regions: Vec<MergedRegion>,

    /// セル座標 -> Number Format String
    format_codes: HashMap<CellCoord, String>,
}

impl SheetGrid {
    /// スパースなセルデータからグリッドを構築
    ///
    /// # 引数
    ///
    /// * `cells` - 座標と値のペア（空セルは省略可能）
    /// * `merged_regions` - シートの結合範囲
    pub fn build<I>(cells: I, merged_regions: Vec<MergedRegion>) -> Self
    where
        I: IntoIterator<Item = (CellCoord, CellValue)>,
    {
        let cells: Vec<(CellCoord, CellValue)> = cells
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect();

        let (height, width) = Self::determine_grid_size(&cells, &merged_regions);

        let mut rows = vec![vec![CellValue::Empty; width]; height];
        for (coord, value) in cells {
            rows[coord.row as usize][coord.col as usize] = value;
        }

        Self {
            rows,
            merged_regions,
            format_codes: HashMap::new(),
        }
    }

    /// グリッドサイズを決定（内部ヘルパー）
    ///
    /// 値を持つセルと結合範囲の終端から最大行・列を算出します。
    fn determine_grid_size(
        cells: &[(CellCoord, CellValue)],
        merged_regions: &[MergedRegion],
    ) -> (usize, usize) {
        let ends = cells
            .iter()
            .map(|(coord, _)| *coord)
            .chain(merged_regions.iter().map(|region| region.range.end));

        let mut size: Option<(u32, u32)> = None;
        for end in ends {
            size = Some(match size {
                Some((rows, cols)) => (rows.max(end.row), cols.max(end.col)),
                None => (end.row, end.col),
            });
        }

        match size {
            Some((rows, cols)) => (rows as usize + 1, cols as usize + 1),
            None => (0, 0),
        }
    }

    /// セルごとのNumber Format Stringを設定
    pub fn set_format_codes(&mut self, format_codes: HashMap<CellCoord, String>) {
        self.format_codes = format_codes;
    }

    /// 結合セルを展開する
    ///
    /// 各結合範囲について左上セルの値を読み、結合を解除したうえで
    /// 範囲内のすべての座標にその値を書き込みます。
    /// 展開済みの結合範囲はグリッドから取り除かれるため、2回目以降の呼び出しは何もしません。
    ///
    /// # 戻り値
    ///
    /// 展開した結合範囲の数
    pub fn fill_merged_cells(&mut self) -> usize {
        let regions = std::mem::take(&mut self.merged_regions);
        for region in &regions {
            let value = self.value(region.parent).cloned().unwrap_or(CellValue::Empty);
            for coord in region.range.coords() {
                self.rows[coord.row as usize][coord.col as usize] = value.clone();
            }
        }
        regions.len()
    }

    /// 行数
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// 列数
    #[cfg(test)]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// 行を取得（0始まり）
    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// セル値を取得
    pub fn value(&self, coord: CellCoord) -> Option<&CellValue> {
        self.rows
            .get(coord.row as usize)
            .and_then(|row| row.get(coord.col as usize))
    }

    /// セルのNumber Format Stringを取得
    pub fn format_code(&self, coord: CellCoord) -> Option<&str> {
        self.format_codes.get(&coord).map(String::as_str)
    }

    /// 未展開の結合範囲
    #[cfg(test)]
    pub fn merged_regions(&self) -> &[MergedRegion] {
        &self.merged_regions
    }
}
