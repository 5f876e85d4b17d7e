//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// sheetstreamクレート全体で使用するエラー型
///
/// ローダーによるバイトストリームの取得、パーサーによるワークブックの解析、
/// テーブルの状態遷移、プロセッサーチェーンの実行中に発生するすべてのエラーを
/// 統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー（ファイル読み込み失敗など）
/// - `Parse`: ワークブックの解析中に発生したエラー（calamine由来）
/// - `Source`: 指定されたシートがワークブックに存在しない
/// - `State`: 閉じた状態のテーブル・パーサーに対する操作
/// - `MissingHeaders`: ヘッダーが未確定の状態でキー付き行を要求した
/// - `Config`: 設定の検証に失敗したエラー
#[derive(Error, Debug)]
pub enum SheetStreamError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ソースの読み込みに失敗したエラー
    ///
    /// ローダーがソースを開けなかった場合に、ソースの識別子とともに返されます。
    #[error("Failed to load source \"{location}\": {error}")]
    Load {
        /// ソースの識別子（ファイルパスなど）
        location: String,
        /// 元のI/Oエラー
        #[source]
        error: std::io::Error,
    },

    /// Excelファイルの解析中に発生したエラー
    ///
    /// `#[from]`属性により、`calamine::Error`から自動的に変換されます。
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 数値の解析エラー
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XMLパーツの解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// 指定されたシートがワークブックに存在しない
    ///
    /// `open()`時に発生します。呼び出し側は別のシート指定で開き直す必要があります。
    #[error("Excel document \"{location}\" doesn't have a sheet \"{sheet}\"")]
    Source {
        /// ソースの識別子
        location: String,
        /// 要求されたシート（1始まりの位置または名前）
        sheet: String,
    },

    /// 状態エラー
    ///
    /// 閉じたテーブル・パーサーに対して反復やリセットを要求した場合に発生します。
    #[error("Invalid state: {0}")]
    State(String),

    /// ヘッダーが確定していない状態でキー付き行を要求した
    #[error("No headers are available; add a header processor or read `headers()` first")]
    MissingHeaders,

    /// ヘッダーと値の列数が一致しない
    #[error("Row {row_number} has {values} values but the header has {headers} names")]
    RowShape {
        /// 行番号（1始まり）
        row_number: usize,
        /// ヘッダーの列数
        headers: usize,
        /// 値の列数
        values: usize,
    },

    /// 設定の検証に失敗したエラー
    ///
    /// `XlsxParserBuilder::build()`時に無効な設定が検出された場合に発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力サイズ制限やパストラバーサルなどのセキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl SheetStreamError {
    pub(crate) fn closed(what: &str, action: &str) -> Self {
        SheetStreamError::State(format!(
            "{} has to be opened by `{}::open()` before {} is available",
            what, what, action
        ))
    }
}
