use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use log::debug;
use tempfile::NamedTempFile;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A line-readable handle to a local file that may be plain text or gzip.
///
/// BGZF files are gzip members concatenated back to back, so the multi-member
/// decoder reads them as well.
pub enum InputReader {
    Plain(BufReader<File>),
    Gzip(BufReader<MultiGzDecoder<File>>),
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            InputReader::Plain(reader) => reader.read(buf),
            InputReader::Gzip(reader) => reader.read(buf),
        }
    }
}

impl BufRead for InputReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            InputReader::Plain(reader) => reader.fill_buf(),
            InputReader::Gzip(reader) => reader.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            InputReader::Plain(reader) => reader.consume(amt),
            InputReader::Gzip(reader) => reader.consume(amt),
        }
    }
}

/// Open a local file, choosing the decoder from its leading bytes rather than
/// its extension.
pub fn open<P: AsRef<Path>>(path: P) -> io::Result<InputReader> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let mut read = 0;
    while read < magic.len() {
        let bytes = file.read(&mut magic[read..])?;
        if bytes == 0 {
            break;
        }
        read += bytes;
    }
    file.seek(SeekFrom::Start(0))?;

    if read == magic.len() && magic == GZIP_MAGIC {
        debug!("Reading {} as gzip", path.display());
        Ok(InputReader::Gzip(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        debug!("Reading {} as plain text", path.display());
        Ok(InputReader::Plain(BufReader::new(file)))
    }
}

/// True when the path's final extension is `.gz`.
pub fn has_gz_suffix(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// Strip one trailing `.gz` from a path, if present.
pub fn strip_gz_suffix(path: &Path) -> PathBuf {
    if has_gz_suffix(path) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}

/// Append a suffix to the full file name (`x.walk.gz` -> `x.walk.gz.tbi`).
pub fn with_appended_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// A scratch file that lives as long as this handle does.
///
/// Sub-graphs produced by the external query tool are written here and read
/// back once; the file is deleted on drop.
pub struct ScratchFile {
    path: PathBuf,
    temp: NamedTempFile,
}

impl ScratchFile {
    pub fn new() -> io::Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("panct-")
            .suffix(".gfa")
            .tempfile()?;
        let path = temp.path().to_path_buf();
        Ok(Self { path, temp })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A second handle on the underlying file, used to capture child stdout.
    pub fn reopen(&self) -> io::Result<File> {
        self.temp.reopen()
    }
}
