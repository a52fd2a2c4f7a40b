//! Daily rotating log file.
//!
//! # Responsibilities
//! - Append records to a single logical stream at a base path
//! - Keep each local calendar day in its own file
//! - Rename prior days to `<path>.<YYYY-MM-DD>`
//!
//! # Design Decisions
//! - One mutex covers the day check, any rotation, and the write, so
//!   concurrent writers never see a half-rotated file or interleave lines
//! - A file left at the base path by an earlier process is rotated away
//!   by its modification day before anything new is appended
//! - Rename collisions get a `-HHMMSS` suffix instead of overwriting
//! - Errors go straight back to the writer; nothing is buffered or retried

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local, NaiveDate};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Source of "now" for rotation decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// The open handle and the day it was opened for.
struct ActiveFile {
    file: File,
    day: NaiveDate,
}

/// A process-wide, date-partitioned, append-only log file.
pub struct RotatingFile {
    path: PathBuf,
    clock: Box<dyn Clock>,
    active: Mutex<Option<ActiveFile>>,
}

impl RotatingFile {
    /// Open the base path for today, rotating any stale file first.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        Self::with_clock(path, SystemClock)
    }

    pub fn with_clock(path: impl Into<PathBuf>, clock: impl Clock + 'static) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let sink = Self {
            path,
            clock: Box::new(clock),
            active: Mutex::new(None),
        };
        {
            let mut active = sink.lock();
            let now = sink.clock.now();
            *active = Some(sink.open_for_day(&now)?);
        }
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record` to today's file.
    pub fn write_record(&self, record: &[u8]) -> io::Result<()> {
        let mut active = self.lock();
        let now = self.clock.now();
        self.rotate_if_needed(&mut active, &now)?;
        match active.as_mut() {
            Some(current) => current.file.write_all(record),
            None => Err(io::Error::new(io::ErrorKind::Other, "log file is not open")),
        }
    }

    pub fn flush(&self) -> io::Result<()> {
        match self.lock().as_mut() {
            Some(current) => current.file.flush(),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveFile>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rotate_if_needed(
        &self,
        active: &mut Option<ActiveFile>,
        now: &DateTime<Local>,
    ) -> io::Result<()> {
        let today = now.date_naive();
        if matches!(active, Some(current) if current.day == today) {
            return Ok(());
        }
        if let Some(previous) = active.take() {
            let ActiveFile { mut file, day } = previous;
            file.flush()?;
            drop(file);
            safe_rename(&self.path, &dated_path(&self.path, day), now)?;
            tracing::debug!(path = %self.path.display(), day = %day.format(DAY_FORMAT), "Rotated log file");
        }
        *active = Some(self.open_for_day(now)?);
        Ok(())
    }

    fn open_for_day(&self, now: &DateTime<Local>) -> io::Result<ActiveFile> {
        let today = now.date_naive();
        rotate_stale_base_file(&self.path, today, now)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(ActiveFile { file, day: today })
    }
}

/// `<path>.<YYYY-MM-DD>`
pub fn dated_path(path: &Path, day: NaiveDate) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}", day.format(DAY_FORMAT)));
    PathBuf::from(name)
}

fn rotate_stale_base_file(path: &Path, today: NaiveDate, now: &DateTime<Local>) -> io::Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(error),
    };
    let modified: DateTime<Local> = metadata.modified()?.into();
    let file_day = modified.date_naive();
    if file_day == today {
        return Ok(());
    }
    safe_rename(path, &dated_path(path, file_day), now)
}

fn safe_rename(src: &Path, dst: &Path, now: &DateTime<Local>) -> io::Result<()> {
    match fs::metadata(src) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(error),
    }
    let target = free_target(dst, now);
    fs::rename(src, target)
}

fn free_target(dst: &Path, now: &DateTime<Local>) -> PathBuf {
    if !dst.exists() {
        return dst.to_path_buf();
    }
    let mut base = dst.as_os_str().to_owned();
    base.push(format!("-{}", now.format("%H%M%S")));
    let candidate = PathBuf::from(&base);
    if !candidate.exists() {
        return candidate;
    }
    let mut n = 1u32;
    loop {
        let mut numbered = base.clone();
        numbered.push(format!("-{n}"));
        let candidate = PathBuf::from(numbered);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
