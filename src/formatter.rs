//! Formatter Module
//!
//! セルの表示文字列を再現するフォーマット処理を提供するモジュール。
//! Number Format Stringを正規化し、既知の書式と完全一致した場合のみ値を文字列化します。
//! 未知の書式は例外を発生させず、元の値をそのまま返します。

use chrono::NaiveDateTime;

use crate::types::CellValue;

/// 数値書式（書式コード -> 小数桁数, 千の位区切りの有無）
const NUMERIC_FORMATS: &[(&str, usize, bool)] = &[
    ("0", 0, false),
    ("0.00", 2, false),
    ("#,##0", 0, true),
    ("#,##0.00", 2, true),
    ("#,###.00", 2, true),
];

/// 日付書式（書式コード -> chrono互換のフォーマット文字列）
const TEMPORAL_FORMATS: &[(&str, &str)] = &[
    ("m/d/yy", "%-m/%d/%y"),
    ("mm/dd/yy", "%m/%d/%y"),
    ("d-mmm", "%d-%b"),
];

/// 書式コードを正規化する（小文字化し、バックスラッシュのエスケープを除去）
pub(crate) fn normalize_format_code(code: &str) -> String {
    code.to_lowercase().replace('\\', "")
}

/// セルフォーマッター
///
/// セル値のフォーマット処理のファサードとして機能します。
#[derive(Debug, Default)]
pub(crate) struct CellFormatter {
    /// 日付フォーマッター
    date_formatter: DateFormatter,

    /// 数値フォーマッター
    number_formatter: NumberFormatter,
}

impl CellFormatter {
    /// 新しいCellFormatterインスタンスを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// セル値を表示文字列に変換
    ///
    /// # 引数
    ///
    /// * `value` - セルの値
    /// * `format_code` - セルのNumber Format String（存在しない場合は`None`）
    ///
    /// # 戻り値
    ///
    /// 既知の書式に一致した場合は`CellValue::String`、それ以外は元の値
    pub fn format(&self, value: CellValue, format_code: Option<&str>) -> CellValue {
        let code = match format_code {
            Some(code) => normalize_format_code(code),
            None => return value,
        };

        let formatted = match &value {
            CellValue::Int(i) => self.number_formatter.format(*i as f64, &code),
            CellValue::Float(f) => self.number_formatter.format(*f, &code),
            CellValue::DateTime(dt) => self.date_formatter.format(dt, &code),
            _ => None,
        };

        formatted.map(CellValue::String).unwrap_or(value)
    }
}

/// 日付フォーマッター
#[derive(Debug, Default)]
pub(crate) struct DateFormatter;

impl DateFormatter {
    /// 正規化済みの書式コードで日付をフォーマット（未知の書式は`None`）
    pub fn format(&self, value: &NaiveDateTime, code: &str) -> Option<String> {
        TEMPORAL_FORMATS
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, template)| value.format(template).to_string())
    }
}

/// 数値フォーマッター
#[derive(Debug, Default)]
pub(crate) struct NumberFormatter;

impl NumberFormatter {
    /// 正規化済みの書式コードで数値をフォーマット（未知の書式は`None`）
    pub fn format(&self, value: f64, code: &str) -> Option<String> {
        NUMERIC_FORMATS
            .iter()
            .find(|(known, _, _)| *known == code)
            .map(|&(_, decimals, thousands)| format_decimal(value, decimals, thousands))
    }
}

/// 小数桁数と千の位区切りを指定して数値を文字列化
pub(crate) fn format_decimal(value: f64, decimals: usize, thousands: bool) -> String {
    let text = format!("{:.*}", decimals, value);
    if !thousands {
        return text;
    }

    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match unsigned.find('.') {
        Some(index) => unsigned.split_at(index),
        None => (unsigned, ""),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, ch) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}{}", sign, grouped, fraction)
}
