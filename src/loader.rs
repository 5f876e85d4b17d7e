//! Loader Module
//!
//! ソースの識別子からバイトストリームを取得するローダーの契約と、
//! ローカルファイル・メモリバッファ用の実装を提供するモジュール。

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use log::debug;

use crate::api::LoadMode;
use crate::error::SheetStreamError;

/// `Read + Seek`をまとめたトレイト（トレイトオブジェクト用）
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// ローダーが返すバイトストリーム
///
/// リモートかどうかはローダーが明示的に決定します。リモートストリームは
/// シークできないため、パーサーは解析前にローカルの一時ファイルへ複製します。
pub enum SourceStream {
    /// シーク可能なローカルストリーム
    Local(Box<dyn ReadSeek>),

    /// シーク不可能なリモートストリーム
    Remote(Box<dyn Read>),
}

impl SourceStream {
    pub fn local<R: Read + Seek + 'static>(reader: R) -> Self {
        SourceStream::Local(Box::new(reader))
    }

    pub fn remote<R: Read + 'static>(reader: R) -> Self {
        SourceStream::Remote(Box::new(reader))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceStream::Remote(_))
    }

    /// シーク可能で先頭に位置するストリームに正規化する
    ///
    /// リモートストリームは匿名の一時ファイルへ全量コピーされ、
    /// 元のストリームはコピー直後に破棄されます。
    pub fn into_local(self) -> Result<Box<dyn ReadSeek>, SheetStreamError> {
        self.into_local_with_limit(u64::MAX)
    }

    /// サイズ上限付きで`into_local`を行う
    ///
    /// リモートストリームのコピーは`max_size + 1`バイトで打ち切られ、
    /// 上限を超えた場合は`SheetStreamError::SecurityViolation`を返します。
    /// ローカルストリームはコピーされないため、ここでは検査しません。
    pub fn into_local_with_limit(
        self,
        max_size: u64,
    ) -> Result<Box<dyn ReadSeek>, SheetStreamError> {
        match self {
            SourceStream::Local(mut stream) => {
                stream.seek(SeekFrom::Start(0))?;
                Ok(stream)
            }
            SourceStream::Remote(reader) => {
                let mut file = tempfile::tempfile()?;
                let mut limited = reader.take(max_size.saturating_add(1));
                let copied = io::copy(&mut limited, &mut file)?;
                drop(limited);

                if copied > max_size {
                    return Err(SheetStreamError::SecurityViolation(format!(
                        "Remote stream exceeds maximum size of {} bytes",
                        max_size
                    )));
                }

                file.seek(SeekFrom::Start(0))?;
                debug!(
                    "copied {} bytes of remote stream into a local temporary file",
                    copied
                );
                Ok(Box::new(file))
            }
        }
    }
}

impl fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStream::Local(_) => f.write_str("SourceStream::Local"),
            SourceStream::Remote(_) => f.write_str("SourceStream::Remote"),
        }
    }
}

/// ソースの識別子からバイトストリームを取得するローダー
///
/// `open()`ごとに1回呼び出され、毎回先頭から読める新しいストリームを返す必要があります。
pub trait Loader {
    /// ソースを読み込む
    ///
    /// # 引数
    ///
    /// * `source` - ソースの識別子（ファイルパスなど）
    /// * `mode` - バイナリ・テキストのフレーミング
    /// * `encoding` - 呼び出し側が指定したエンコーディング
    fn load(
        &self,
        source: &str,
        mode: LoadMode,
        encoding: Option<&str>,
    ) -> Result<SourceStream, SheetStreamError>;
}

/// ローカルファイルシステムのローダー
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl Loader for FileLoader {
    fn load(
        &self,
        source: &str,
        _mode: LoadMode,
        _encoding: Option<&str>,
    ) -> Result<SourceStream, SheetStreamError> {
        let file = File::open(source).map_err(|error| SheetStreamError::Load {
            location: source.to_string(),
            error,
        })?;
        Ok(SourceStream::local(file))
    }
}

/// メモリバッファのローダー
///
/// バッファは`Arc`で共有されるため、`load()`のたびにコピーは発生しません。
/// `remote(true)`を指定すると、シーク不可能なストリームとして返します。
#[derive(Debug, Clone)]
pub struct BytesLoader {
    data: Arc<[u8]>,
    remote: bool,
}

impl BytesLoader {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            remote: false,
        }
    }

    /// リモートストリームとして扱うかどうかを指定する
    pub fn remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }
}

/// `Arc<[u8]>`を`Read + Seek`として読むためのラッパー
struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Loader for BytesLoader {
    fn load(
        &self,
        _source: &str,
        _mode: LoadMode,
        _encoding: Option<&str>,
    ) -> Result<SourceStream, SheetStreamError> {
        let cursor = io::Cursor::new(SharedBytes(Arc::clone(&self.data)));
        if self.remote {
            Ok(SourceStream::remote(cursor))
        } else {
            Ok(SourceStream::local(cursor))
        }
    }
}
