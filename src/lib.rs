//! sheetstream - Streaming tabular rows out of spreadsheets and in-memory sources
//!
//! This crate exposes a lazily-evaluated row pipeline: a [`Loader`] fetches the
//! bytes of a source, a [`Parser`] turns them into numbered rows, and an ordered
//! chain of [`Processor`]s rewrites or filters the rows before they reach the
//! caller through a [`Table`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sheetstream::{FileLoader, HeaderRowProcessor, Table, XlsxParser};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Stream the first sheet of a workbook from disk
//!     let parser = XlsxParser::builder().build(FileLoader)?;
//!
//!     let mut table = Table::new("example.xlsx", parser);
//!     table.add_processor(HeaderRowProcessor::new(1));
//!     table.open()?;
//!
//!     println!("headers: {:?}", table.headers()?);
//!     for row in table.readrow(true)? {
//!         println!("{:?}", row?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Merged Cells and Number Formats
//!
//! ```rust,no_run
//! use sheetstream::{FileLoader, Table, XlsxParserBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let parser = XlsxParserBuilder::new()
//!         .with_sheet("Report")           // select a sheet by name
//!         .fill_merged_cells(true)        // copy the top-left value into merged ranges
//!         .preserve_formatting(true)      // "1,234.50" instead of 1234.5
//!         .build(FileLoader)?;
//!
//!     let mut table = Table::new("report.xlsx", parser);
//!     table.open()?;
//!     let first_rows = table.read(false, Some(10))?;
//!     println!("{:?}", first_rows);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Remote Streams
//!
//! Loaders decide whether a stream is seekable. Non-seekable streams
//! ([`SourceStream::Remote`]) are copied into an anonymous temporary file on
//! `open()`, so `reset()` never refetches the source.
//!
//! ```rust,no_run
//! use sheetstream::{BytesLoader, Table, XlsxParser};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("example.xlsx")?;
//! let parser = XlsxParser::builder().build(BytesLoader::new(bytes).remote(true))?;
//! let mut table = Table::new("memory", parser);
//! table.open()?;
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod error;
mod formatter;
mod grid;
mod loader;
mod parser;
mod processor;
mod security;
mod table;
mod types;

// 公開API
pub use api::{LoadMode, SheetSelector};
pub use builder::XlsxParserBuilder;
pub use error::SheetStreamError;
pub use loader::{BytesLoader, FileLoader, Loader, ReadSeek, SourceStream};
pub use parser::{ExtendedRows, NativeParser, Parser, XlsxParser};
pub use processor::{ForceStringsProcessor, HeaderRowProcessor, Processor, SkipRowsProcessor};
pub use table::{ExtendedRowIter, RowIter, Table};
pub use types::{CellValue, ExtendedRow, KeyedRow, Row};
