//! Integration Tests for sheetstream
//!
//! XLSXワークブックをメモリ上で生成し、Loader → XlsxParser → Processor → Table の
//! パイプライン全体を検証します。

use rust_xlsxwriter::*;
use sheetstream::{
    BytesLoader, CellValue, ExtendedRow, FileLoader, ForceStringsProcessor, HeaderRowProcessor,
    Parser, SheetSelector, SheetStreamError, SkipRowsProcessor, Table, XlsxParserBuilder,
};
use std::io::Write;

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    /// Generate a header row followed by three people
    pub fn generate_people() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("People")?;

        worksheet.write_string(0, 0, "id")?;
        worksheet.write_string(0, 1, "name")?;
        worksheet.write_number(1, 0, 1.0)?;
        worksheet.write_string(1, 1, "english")?;
        worksheet.write_number(2, 0, 2.0)?;
        worksheet.write_string(2, 1, "中国人")?;
        worksheet.write_number(3, 0, 3.0)?;
        worksheet.write_string(3, 1, "español")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a workbook with 3 sheets
    pub fn generate_multi_sheets() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();

        for name in ["Sheet1", "Sheet2", "Sheet3"] {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(name)?;
            worksheet.write_string(0, 0, format!("{}_Data", name))?;
        }

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a sheet whose A2:A3 is merged with the value "X"
    ///
    /// Column B carries data on every row so that row 3 exists in the decoded range.
    pub fn generate_merged_cells() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        worksheet.write_string(0, 0, "group")?;
        worksheet.write_string(0, 1, "item")?;
        worksheet.merge_range(1, 0, 2, 0, "X", &Format::new())?;
        worksheet.write_string(1, 1, "first")?;
        worksheet.write_string(2, 1, "second")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate numbers and dates with display formats
    pub fn generate_formatted() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        let thousands = Format::new().set_num_format("#,##0.00");
        let two_decimals = Format::new().set_num_format("0.00");
        let us_date = Format::new().set_num_format("mm/dd/yy");
        let day_month = Format::new().set_num_format("d-mmm");
        let percent = Format::new().set_num_format("0.00%");

        // 45000 = 2023-03-15
        worksheet.write_number_with_format(0, 0, 1234.5, &thousands)?;
        worksheet.write_number_with_format(0, 1, 3.14159, &two_decimals)?;
        worksheet.write_number_with_format(0, 2, 45000.0, &us_date)?;
        worksheet.write_number_with_format(0, 3, 45000.0, &day_month)?;
        worksheet.write_number_with_format(0, 4, 0.25, &percent)?;
        worksheet.write_number(0, 5, 7.5)?;
        worksheet.write_string(0, 6, "text")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a single column of row numbers
    pub fn generate_numbered_rows(count: u32) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        for row in 0..count {
            worksheet.write_number(row, 0, f64::from(row + 1))?;
        }

        Ok(workbook.save_to_buffer()?)
    }
}

fn table(data: Vec<u8>, builder: XlsxParserBuilder) -> Table {
    let parser = builder.build(BytesLoader::new(data)).unwrap();
    let mut table = Table::new("memory.xlsx", parser);
    table.open().unwrap();
    table
}

fn values(table: &mut Table) -> Vec<Vec<CellValue>> {
    table
        .read(false, None)
        .unwrap()
        .into_iter()
        .map(|row| row.into_values())
        .collect()
}

#[test]
fn test_stream_people_with_headers() {
    let mut table = table(
        fixtures::generate_people().unwrap(),
        XlsxParserBuilder::new(),
    );
    table.add_processor(HeaderRowProcessor::new(1));

    assert_eq!(table.fragment(), Some("People"));
    assert_eq!(
        table.headers().unwrap(),
        Some(&["id".to_string(), "name".to_string()][..])
    );

    let rows = table.read(true, None).unwrap();
    assert_eq!(rows.len(), 3);
    let second = rows[1].as_keyed().unwrap();
    assert_eq!(second.get("id"), Some(&CellValue::Float(2.0)));
    assert_eq!(second.get("name"), Some(&CellValue::from("中国人")));
}

#[test]
fn test_sheet_selection_by_position() {
    let mut table = table(
        fixtures::generate_multi_sheets().unwrap(),
        XlsxParserBuilder::new().with_sheet(SheetSelector::Position(2)),
    );

    assert_eq!(table.fragment(), Some("Sheet2"));
    assert_eq!(values(&mut table), vec![vec![CellValue::from("Sheet2_Data")]]);
}

#[test]
fn test_sheet_selection_by_name() {
    let mut table = table(
        fixtures::generate_multi_sheets().unwrap(),
        XlsxParserBuilder::new().with_sheet("Sheet3"),
    );

    assert_eq!(table.fragment(), Some("Sheet3"));
    assert_eq!(values(&mut table), vec![vec![CellValue::from("Sheet3_Data")]]);
}

#[test]
fn test_nonexistent_sheet() {
    let parser = XlsxParserBuilder::new()
        .with_sheet("DoesNotExist")
        .build(BytesLoader::new(fixtures::generate_multi_sheets().unwrap()))
        .unwrap();
    let mut table = Table::new("workbook.xlsx", parser);

    match table.open() {
        Err(err @ SheetStreamError::Source { .. }) => {
            let msg = err.to_string();
            assert!(msg.contains("workbook.xlsx"));
            assert!(msg.contains("DoesNotExist"));
        }
        other => panic!("Expected Source error, got {:?}", other),
    }
    assert!(table.closed());
}

#[test]
fn test_sheet_position_out_of_range() {
    let parser = XlsxParserBuilder::new()
        .with_sheet(SheetSelector::Position(4))
        .build(BytesLoader::new(fixtures::generate_multi_sheets().unwrap()))
        .unwrap();
    let mut table = Table::new("workbook.xlsx", parser);

    match table.open() {
        Err(SheetStreamError::Source { sheet, .. }) => assert_eq!(sheet, "4"),
        other => panic!("Expected Source error, got {:?}", other),
    }
}

#[test]
fn test_merged_cells_filled() {
    let mut table = table(
        fixtures::generate_merged_cells().unwrap(),
        XlsxParserBuilder::new().fill_merged_cells(true),
    );

    let rows = values(&mut table);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1], vec![CellValue::from("X"), CellValue::from("first")]);
    assert_eq!(rows[2], vec![CellValue::from("X"), CellValue::from("second")]);
}

#[test]
fn test_merged_cells_not_filled() {
    let mut table = table(
        fixtures::generate_merged_cells().unwrap(),
        XlsxParserBuilder::new(),
    );

    let rows = values(&mut table);
    assert_eq!(rows[1][0], CellValue::from("X"));
    assert_eq!(rows[2][0], CellValue::Empty);
}

#[test]
fn test_merged_cells_survive_reset() {
    let mut table = table(
        fixtures::generate_merged_cells().unwrap(),
        XlsxParserBuilder::new().fill_merged_cells(true),
    );

    let first = values(&mut table);
    table.reset().unwrap();
    assert_eq!(values(&mut table), first);
}

#[test]
fn test_formatting_preserved() {
    let mut table = table(
        fixtures::generate_formatted().unwrap(),
        XlsxParserBuilder::new().preserve_formatting(true),
    );

    let rows = values(&mut table);
    assert_eq!(
        rows[0],
        vec![
            CellValue::from("1,234.50"),
            CellValue::from("3.14"),
            CellValue::from("03/15/23"),
            CellValue::from("15-Mar"),
            CellValue::Float(0.25),
            CellValue::Float(7.5),
            CellValue::from("text"),
        ]
    );
}

#[test]
fn test_raw_values_without_formatting() {
    let mut table = table(
        fixtures::generate_formatted().unwrap(),
        XlsxParserBuilder::new(),
    );

    let rows = values(&mut table);
    assert_eq!(rows[0][0], CellValue::Float(1234.5));
    assert_eq!(rows[0][1], CellValue::Float(3.14159));
    match &rows[0][2] {
        CellValue::DateTime(dt) => assert_eq!(dt.format("%Y-%m-%d").to_string(), "2023-03-15"),
        other => panic!("Expected DateTime, got {:?}", other),
    }
}

#[test]
fn test_reset_restores_position() {
    let mut table = table(
        fixtures::generate_numbered_rows(10).unwrap(),
        XlsxParserBuilder::new(),
    );

    let first = table.read(false, None).unwrap();
    assert_eq!(first.len(), 10);
    table.reset().unwrap();
    assert_eq!(table.read(false, None).unwrap(), first);
}

#[test]
fn test_read_limit() {
    let mut table = table(
        fixtures::generate_numbered_rows(10).unwrap(),
        XlsxParserBuilder::new(),
    );

    let rows = table.read(false, Some(3)).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].values(), &[CellValue::Float(3.0)]);
}

#[test]
fn test_chunked_reads_continue_numbering() {
    let mut table = table(
        fixtures::generate_people().unwrap(),
        XlsxParserBuilder::new(),
    );
    table.add_processor(HeaderRowProcessor::new(1));
    table.add_processor(SkipRowsProcessor::new().row_number(4));

    let first = table.read_extended(Some(1)).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].row_number, 2);

    let rest = table.read_extended(None).unwrap();
    assert_eq!(
        rest.iter().map(|row| row.row_number).collect::<Vec<_>>(),
        vec![3]
    );
    assert_eq!(
        rest[0].values,
        Some(vec![CellValue::Float(2.0), CellValue::from("中国人")])
    );
    assert_eq!(
        table.headers().unwrap(),
        Some(&["id".to_string(), "name".to_string()][..])
    );
}

#[test]
fn test_force_strings() {
    let mut table = table(
        fixtures::generate_people().unwrap(),
        XlsxParserBuilder::new(),
    );
    table.add_processor(HeaderRowProcessor::new(1));
    table.add_processor(ForceStringsProcessor::new());

    assert_eq!(
        values(&mut table),
        vec![
            vec![CellValue::from("1"), CellValue::from("english")],
            vec![CellValue::from("2"), CellValue::from("中国人")],
            vec![CellValue::from("3"), CellValue::from("español")],
        ]
    );
}

#[test]
fn test_keyed_rows_in_chunks() {
    let mut table = table(
        fixtures::generate_people().unwrap(),
        XlsxParserBuilder::new(),
    );
    table.add_processor(HeaderRowProcessor::new(1));

    let mut names = Vec::new();
    loop {
        let chunk = table.read(true, Some(2)).unwrap();
        if chunk.is_empty() {
            break;
        }
        for row in &chunk {
            names.push(row.as_keyed().unwrap().get("name").cloned());
        }
    }

    assert_eq!(
        names,
        vec![
            Some(CellValue::from("english")),
            Some(CellValue::from("中国人")),
            Some(CellValue::from("español")),
        ]
    );
}

#[test]
fn test_processor_suppression() {
    let mut table = table(
        fixtures::generate_numbered_rows(9).unwrap(),
        XlsxParserBuilder::new(),
    );
    table.add_processor(|row: ExtendedRow| -> Result<ExtendedRow, SheetStreamError> {
        if row.row_number % 3 == 0 {
            Ok(row.suppress())
        } else {
            Ok(row)
        }
    });

    let rows = table.read_extended(None).unwrap();
    assert_eq!(
        rows.iter().map(|row| row.row_number).collect::<Vec<_>>(),
        vec![1, 2, 4, 5, 7, 8]
    );
}

#[test]
fn test_skip_rows_and_headers_together() {
    let mut table = table(
        fixtures::generate_people().unwrap(),
        XlsxParserBuilder::new(),
    );
    table.add_processor(HeaderRowProcessor::new(1));
    table.add_processor(SkipRowsProcessor::new().row_number(3));

    let rows = table.read_extended(None).unwrap();
    assert_eq!(
        rows.iter().map(|row| row.row_number).collect::<Vec<_>>(),
        vec![2, 4]
    );
    assert!(rows
        .iter()
        .all(|row| row.header == Some(vec!["id".to_string(), "name".to_string()])));
}

#[test]
fn test_remote_stream_is_copied_locally() {
    let parser = XlsxParserBuilder::new()
        .build(BytesLoader::new(fixtures::generate_numbered_rows(4).unwrap()).remote(true))
        .unwrap();
    let mut table = Table::new("remote", parser);
    table.open().unwrap();

    let first = table.read(false, None).unwrap();
    assert_eq!(first.len(), 4);
    table.reset().unwrap();
    assert_eq!(table.read(false, None).unwrap(), first);
}

#[test]
fn test_file_loader() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&fixtures::generate_people().unwrap()).unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let parser = XlsxParserBuilder::new().build(FileLoader).unwrap();
    let mut table = Table::new(path, parser).with_encoding("utf-8");
    table.open().unwrap();

    assert_eq!(table.encoding(), Some("utf-8"));
    assert_eq!(table.read(false, None).unwrap().len(), 4);
}

#[test]
fn test_file_not_found() {
    let parser = XlsxParserBuilder::new().build(FileLoader).unwrap();
    let mut table = Table::new("nonexistent.xlsx", parser);

    match table.open() {
        Err(SheetStreamError::Load { location, .. }) => assert_eq!(location, "nonexistent.xlsx"),
        other => panic!("Expected Load error, got {:?}", other),
    }
    assert!(table.closed());
}

#[test]
fn test_close_and_reopen() {
    let mut table = table(
        fixtures::generate_numbered_rows(3).unwrap(),
        XlsxParserBuilder::new(),
    );
    table.read(false, Some(2)).unwrap();

    table.close();
    table.close();
    assert!(table.closed());
    assert!(matches!(table.read(false, None), Err(SheetStreamError::State(_))));

    table.open().unwrap();
    assert_eq!(table.read(false, None).unwrap().len(), 3);
}

#[test]
fn test_parser_used_directly() {
    let mut parser = XlsxParserBuilder::new()
        .build(BytesLoader::new(fixtures::generate_people().unwrap()))
        .unwrap();
    parser.open("memory.xlsx", None).unwrap();

    let rows: Vec<ExtendedRow> = parser.extended_rows().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|row| row.header.is_none()));
    assert_eq!(rows[3].row_number, 4);
}
