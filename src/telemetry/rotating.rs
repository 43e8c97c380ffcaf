use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Local;
use chrono::NaiveDate;
use tracing_subscriber::fmt::MakeWriter;

/// Appends to `<prefix>_YYYY-MM-DD.log`, starting a new file when the local
/// date changes and rolling to `<prefix>_YYYY-MM-DD.N.log` once a file would
/// exceed `max_bytes`.
pub struct RotatingFileWriter {
  inner: Mutex<RotatingFile>,
}

impl RotatingFileWriter {
  pub fn new(dir: impl Into<PathBuf>, prefix: &str, max_bytes: u64) -> io::Result<Self> {
    let file = RotatingFile::open(dir.into(), prefix.to_string(), max_bytes, Local::now().date_naive())?;
    Ok(Self {
      inner: Mutex::new(file),
    })
  }
}

impl<'a> MakeWriter<'a> for RotatingFileWriter {
  type Writer = RotatingFileHandle<'a>;

  fn make_writer(&'a self) -> Self::Writer {
    RotatingFileHandle { writer: self }
  }
}

pub struct RotatingFileHandle<'a> {
  writer: &'a RotatingFileWriter,
}

impl Write for RotatingFileHandle<'_> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    let mut file = self
      .writer
      .inner
      .lock()
      .map_err(|_| io::Error::other("log file lock poisoned"))?;
    file.write_record(buf, Local::now().date_naive())
  }

  fn flush(&mut self) -> io::Result<()> {
    let mut file = self
      .writer
      .inner
      .lock()
      .map_err(|_| io::Error::other("log file lock poisoned"))?;
    file.file.flush()
  }
}

struct RotatingFile {
  dir: PathBuf,
  prefix: String,
  max_bytes: u64,
  date: NaiveDate,
  index: u32,
  file: File,
  written: u64,
}

impl RotatingFile {
  fn open(dir: PathBuf, prefix: String, max_bytes: u64, date: NaiveDate) -> io::Result<Self> {
    fs::create_dir_all(&dir)?;
    let (index, file, written) = open_segment(&dir, &prefix, date, 0, max_bytes)?;
    Ok(Self {
      dir,
      prefix,
      max_bytes,
      date,
      index,
      file,
      written,
    })
  }

  /// Writes one formatted record. Records are never split across files.
  fn write_record(&mut self, buf: &[u8], today: NaiveDate) -> io::Result<usize> {
    if today != self.date {
      self.reopen(today, 0)?;
    } else if self.max_bytes > 0 && self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
      self.reopen(today, self.index + 1)?;
    }
    self.file.write_all(buf)?;
    self.written += buf.len() as u64;
    Ok(buf.len())
  }

  fn reopen(&mut self, date: NaiveDate, index: u32) -> io::Result<()> {
    self.file.flush()?;
    let (index, file, written) = open_segment(&self.dir, &self.prefix, date, index, self.max_bytes)?;
    self.date = date;
    self.index = index;
    self.file = file;
    self.written = written;
    Ok(())
  }
}

fn open_segment(dir: &Path, prefix: &str, date: NaiveDate, mut index: u32, max_bytes: u64) -> io::Result<(u32, File, u64)> {
  loop {
    let path = segment_path(dir, prefix, date, index);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let written = file.metadata()?.len();
    if max_bytes == 0 || written < max_bytes {
      return Ok((index, file, written));
    }
    index += 1;
  }
}

fn segment_path(dir: &Path, prefix: &str, date: NaiveDate, index: u32) -> PathBuf {
  let date = date.format("%Y-%m-%d");
  if index == 0 {
    dir.join(format!("{prefix}_{date}.log"))
  } else {
    dir.join(format!("{prefix}_{date}.{index}.log"))
  }
}
