//! XML Metadata Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得不可能な情報を抽出するモジュール。
//! セルごとのスタイルID（`s`属性）と、スタイルに対応するNumber Format Stringを提供します。

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::SheetStreamError;
use crate::security::{validate_zip_path, SecurityConfig};
use crate::types::CellCoord;

/// XLSXメタデータパーサー
///
/// XLSXファイル（ZIPアーカイブ）からXMLを直接解析し、
/// calamineで取得できない書式情報を抽出します。
pub(crate) struct XlsxMetadataParser<R: Read + Seek> {
    /// ZIPアーカイブ
    archive: ZipArchive<R>,
    /// numFmtId -> formatCode のマッピング（カスタム書式のみ）
    num_formats: HashMap<u32, String>,
    /// styleId -> numFmtId（cellXfs要素の並び順）
    cell_xfs: Vec<u32>,
    /// シート名 -> ワークシートXMLのパス
    sheet_paths: HashMap<String, String>,
}

impl<R: Read + Seek> XlsxMetadataParser<R> {
    /// XLSXファイル（ZIPアーカイブ）からメタデータを解析
    ///
    /// アーカイブ内の全エントリについてパスとサイズを検証したうえで、
    /// `xl/styles.xml`と`xl/workbook.xml`（およびそのリレーションシップ）を読み込みます。
    pub fn new(reader: R, security: &SecurityConfig) -> Result<Self, SheetStreamError> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| SheetStreamError::Zip(e.to_string()))?;

        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| SheetStreamError::Zip(e.to_string()))?;

            validate_zip_path(file.name()).map_err(|e| {
                SheetStreamError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;
            security.check_entry_size(file.name(), file.size())?;
        }

        let mut parser = Self {
            archive,
            num_formats: HashMap::new(),
            cell_xfs: Vec::new(),
            sheet_paths: HashMap::new(),
        };

        if let Some(content) = parser.read_entry("xl/styles.xml")? {
            let (num_formats, cell_xfs) = parse_styles(&content)?;
            parser.num_formats = num_formats;
            parser.cell_xfs = cell_xfs;
        }

        let relationships = match parser.read_entry("xl/_rels/workbook.xml.rels")? {
            Some(content) => parse_relationships(&content)?,
            None => HashMap::new(),
        };
        if let Some(content) = parser.read_entry("xl/workbook.xml")? {
            parser.sheet_paths = parse_workbook_sheets(&content)?
                .into_iter()
                .filter_map(|(name, id)| {
                    relationships
                        .get(&id)
                        .map(|target| (name, resolve_target(target)))
                })
                .collect();
        }

        Ok(parser)
    }

    /// styleIdからNumber Format Stringを取得
    ///
    /// ビルトイン書式ID（0-163）はハードコードされた対応表から、
    /// カスタム書式ID（164以上）は`<numFmts>`から解決します。
    pub fn get_format_string(&self, style_id: u32) -> Option<&str> {
        self.cell_xfs.get(style_id as usize).and_then(|&num_fmt_id| {
            if num_fmt_id < 164 {
                get_builtin_format(num_fmt_id)
            } else {
                self.num_formats.get(&num_fmt_id).map(String::as_str)
            }
        })
    }

    /// シートの各セルのNumber Format Stringを取得
    ///
    /// シートがワークブックに見つからない場合は空のマップを返します。
    pub fn format_codes(
        &mut self,
        sheet_name: &str,
    ) -> Result<HashMap<CellCoord, String>, SheetStreamError> {
        let path = match self.sheet_paths.get(sheet_name) {
            Some(path) => path.clone(),
            None => return Ok(HashMap::new()),
        };

        let content = match self.read_entry(&path)? {
            Some(content) => content,
            None => return Ok(HashMap::new()),
        };

        let codes = parse_cell_styles(&content)?
            .into_iter()
            .filter_map(|(coord, style_id)| {
                self.get_format_string(style_id)
                    .map(|code| (coord, code.to_string()))
            })
            .collect();
        Ok(codes)
    }

    /// ZIPエントリを読み込む（存在しない場合は`None`）
    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, SheetStreamError> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(SheetStreamError::Zip(e.to_string())),
        };

        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(Some(content))
    }
}

fn xml_error(e: impl std::fmt::Display) -> SheetStreamError {
    SheetStreamError::Xml(e.to_string())
}

/// 要素の属性を検索（ローカル名で照合し、エスケープを解除して返す）
fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, SheetStreamError> {
    for attr in element.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.local_name().as_ref() == name {
            let raw = std::str::from_utf8(&attr.value)?;
            let value = unescape(raw).map_err(xml_error)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// xl/styles.xml の解析
///
/// `<numFmts>` と `<cellXfs>` を解析します。
/// 自己終了タグ（`<numFmt .../>`、`<xf .../>`）は`Event::Empty`として届きます。
fn parse_styles(content: &[u8]) -> Result<(HashMap<u32, String>, Vec<u32>), SheetStreamError> {
    let mut reader = Reader::from_reader(content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut num_formats = HashMap::new();
    let mut cell_xfs = Vec::new();
    let mut in_num_fmts = false;
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"numFmts" => in_num_fmts = true,
                b"cellXfs" => in_cell_xfs = true,
                b"numFmt" if in_num_fmts => {
                    // <numFmt numFmtId="165" formatCode="0.000"/>
                    let id = attribute(&e, b"numFmtId")?;
                    let code = attribute(&e, b"formatCode")?;
                    if let (Some(id), Some(code)) = (id, code) {
                        let id: u32 = id.parse()?;
                        if id >= 164 {
                            num_formats.insert(id, code);
                        }
                    }
                }
                b"xf" if in_cell_xfs => {
                    // <xf numFmtId="4" fontId="0" fillId="0" borderId="0" applyNumberFormat="1"/>
                    let num_fmt_id = match attribute(&e, b"numFmtId")? {
                        Some(id) => id.parse()?,
                        None => 0,
                    };
                    cell_xfs.push(num_fmt_id);
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"numFmts" => in_num_fmts = false,
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((num_formats, cell_xfs))
}

/// xl/workbook.xml の解析
///
/// `<sheet name="..." r:id="..."/>` を文書順に`(シート名, リレーションシップID)`として返します。
fn parse_workbook_sheets(content: &[u8]) -> Result<Vec<(String, String)>, SheetStreamError> {
    let mut reader = Reader::from_reader(content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                if let (Some(name), Some(id)) = (attribute(&e, b"name")?, attribute(&e, b"id")?) {
                    sheets.push((name, id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// リレーションシップファイルを解析（Id -> Target）
fn parse_relationships(content: &[u8]) -> Result<HashMap<String, String>, SheetStreamError> {
    let mut reader = Reader::from_reader(content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    relationships.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// リレーションシップのターゲットをアーカイブ内のパスに変換
///
/// 絶対パス（`/xl/worksheets/sheet1.xml`）はそのまま、相対パスは`xl/`を基準に解決します。
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// ワークシートXMLから、スタイルIDを持つセルを抽出
///
/// `<c r="B3" s="2">` の`s`属性を座標と対応付けます。`r`属性を持たないセルは
/// 直前のセルの右隣として扱います。
fn parse_cell_styles(content: &[u8]) -> Result<Vec<(CellCoord, u32)>, SheetStreamError> {
    let mut reader = Reader::from_reader(content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut styles = Vec::new();
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    // <row r="15">（1始まり）
                    if let Some(r) = attribute(&e, b"r")? {
                        current_row = r.parse::<u32>()?.saturating_sub(1);
                    }
                    next_col = 0;
                }
                b"c" => {
                    let coord = match attribute(&e, b"r")? {
                        Some(reference) => CellCoord::from_a1_notation(&reference)
                            .ok_or_else(|| xml_error(format!("invalid cell reference: {}", reference)))?,
                        None => CellCoord::new(current_row, next_col),
                    };
                    current_row = coord.row;
                    next_col = coord.col + 1;

                    if let Some(style) = attribute(&e, b"s")? {
                        styles.push((coord, style.parse()?));
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"row" => {
                current_row += 1;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}

/// ビルトイン書式ID（0-163）のマッピング
///
/// Excelの標準書式IDとフォーマット文字列の対応表です。
fn get_builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0_);(#,##0)"),
        38 => Some("#,##0_);[Red](#,##0)"),
        39 => Some("#,##0.00_);(#,##0.00)"),
        40 => Some("#,##0.00_);[Red](#,##0.00)"),
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="d\-mmm"/></numFmts>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="4" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"><alignment/></xf>
  </cellXfs>
</styleSheet>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Data &amp; More" sheetId="1" r:id="rId1"/>
    <sheet name="Other" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

    const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" s="1"><v>1234.5</v></c></row>
    <row r="3"><c r="C3" s="2"><v>45000</v></c><c s="1"/></row>
  </sheetData>
</worksheet>"#;

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn full_archive() -> Vec<u8> {
        archive(&[
            ("xl/styles.xml", STYLES),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/worksheets/sheet1.xml", SHEET1),
        ])
    }

    #[test]
    fn test_get_builtin_format() {
        assert_eq!(get_builtin_format(0), Some("General"));
        assert_eq!(get_builtin_format(4), Some("#,##0.00"));
        assert_eq!(get_builtin_format(14), Some("mm-dd-yy"));
        assert_eq!(get_builtin_format(16), Some("d-mmm"));
        assert_eq!(get_builtin_format(50), None);
        assert_eq!(get_builtin_format(164), None);
    }

    #[test]
    fn test_parse_styles_handles_self_closing_tags() {
        let (num_formats, cell_xfs) = parse_styles(STYLES.as_bytes()).unwrap();
        assert_eq!(num_formats.get(&164).map(String::as_str), Some("d\\-mmm"));
        assert_eq!(cell_xfs, vec![0, 4, 164]);
    }

    #[test]
    fn test_parse_workbook_sheets_unescapes_names() {
        let sheets = parse_workbook_sheets(WORKBOOK.as_bytes()).unwrap();
        assert_eq!(
            sheets,
            vec![
                ("Data & More".to_string(), "rId1".to_string()),
                ("Other".to_string(), "rId2".to_string()),
            ]
        );
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn test_parse_cell_styles() {
        let styles = parse_cell_styles(SHEET1.as_bytes()).unwrap();
        assert_eq!(
            styles,
            vec![
                (CellCoord::new(0, 1), 1),
                (CellCoord::new(2, 2), 2),
                (CellCoord::new(2, 3), 1),
            ]
        );
    }

    #[test]
    fn test_format_codes_for_sheet() {
        let mut parser =
            XlsxMetadataParser::new(Cursor::new(full_archive()), &SecurityConfig::default())
                .unwrap();

        assert_eq!(parser.get_format_string(0), Some("General"));
        assert_eq!(parser.get_format_string(1), Some("#,##0.00"));
        assert_eq!(parser.get_format_string(2), Some("d\\-mmm"));
        assert_eq!(parser.get_format_string(3), None);

        let codes = parser.format_codes("Data & More").unwrap();
        assert_eq!(codes.get(&CellCoord::new(0, 1)).map(String::as_str), Some("#,##0.00"));
        assert_eq!(codes.get(&CellCoord::new(2, 2)).map(String::as_str), Some("d\\-mmm"));
        assert_eq!(codes.get(&CellCoord::new(0, 0)), None);

        // sheet2.xmlはアーカイブに存在しない
        assert!(parser.format_codes("Other").unwrap().is_empty());
        assert!(parser.format_codes("Missing").unwrap().is_empty());
    }

    #[test]
    fn test_missing_styles_yields_no_codes() {
        let data = archive(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/worksheets/sheet1.xml", SHEET1),
        ]);
        let mut parser =
            XlsxMetadataParser::new(Cursor::new(data), &SecurityConfig::default()).unwrap();
        assert!(parser.format_codes("Data & More").unwrap().is_empty());
    }

    #[test]
    fn test_entry_size_limit() {
        let security = SecurityConfig {
            max_entry_size: 16,
            max_input_file_size: u64::MAX,
        };
        let result = XlsxMetadataParser::new(Cursor::new(full_archive()), &security);
        assert!(matches!(result, Err(SheetStreamError::SecurityViolation(_))));
    }

    #[test]
    fn test_not_a_zip_archive() {
        let result = XlsxMetadataParser::new(
            Cursor::new(b"not a zip".to_vec()),
            &SecurityConfig::default(),
        );
        assert!(matches!(result, Err(SheetStreamError::Zip(_))));
    }
}
