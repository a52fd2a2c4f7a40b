//! Rotation behavior of the audit/log sink.

use std::fs::{self, File};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local, TimeZone};

use tool_gateway::observability::rotation::dated_path;
use tool_gateway::observability::{Clock, RotatingFile};

/// A clock the test moves by hand.
#[derive(Clone)]
struct ManualClock(Arc<Mutex<DateTime<Local>>>);

impl ManualClock {
    fn at(y: i32, m: u32, d: u32, h: u32) -> Self {
        let start = Local.with_ymd_and_hms(y, m, d, h, 0, 0).single().unwrap();
        Self(Arc::new(Mutex::new(start)))
    }

    fn set(&self, y: i32, m: u32, d: u32, h: u32) {
        *self.0.lock().unwrap() = Local.with_ymd_and_hms(y, m, d, h, 0, 0).single().unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.0.lock().unwrap()
    }
}

#[test]
fn test_rotates_at_day_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.log");
    let clock = ManualClock::at(2024, 3, 10, 23);
    let sink = RotatingFile::with_clock(&path, clock.clone()).unwrap();

    sink.write_record(b"{\"n\":1}\n").unwrap();
    clock.set(2024, 3, 11, 0);
    sink.write_record(b"{\"n\":2}\n").unwrap();
    sink.flush().unwrap();

    let day_ten = dated_path(&path, chrono::NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    assert_eq!(fs::read_to_string(&day_ten).unwrap(), "{\"n\":1}\n");
    assert_eq!(fs::read_to_string(&path).unwrap(), "{\"n\":2}\n");
}

#[test]
fn test_same_day_writes_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("gateway.log");
    let clock = ManualClock::at(2024, 7, 1, 9);
    let sink = RotatingFile::with_clock(&path, clock.clone()).unwrap();

    sink.write_record(b"a\n").unwrap();
    clock.set(2024, 7, 1, 17);
    sink.write_record(b"b\n").unwrap();
    sink.flush().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
}

#[test]
fn test_collision_gets_time_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.log");
    let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    fs::write(dated_path(&path, day), "earlier\n").unwrap();

    let clock = ManualClock::at(2024, 1, 5, 12);
    let sink = RotatingFile::with_clock(&path, clock.clone()).unwrap();
    sink.write_record(b"later\n").unwrap();
    clock.set(2024, 1, 6, 8);
    sink.write_record(b"next\n").unwrap();

    assert_eq!(fs::read_to_string(dated_path(&path, day)).unwrap(), "earlier\n");
    let mut suffixed = dated_path(&path, day).into_os_string();
    suffixed.push("-080000");
    assert_eq!(fs::read_to_string(&suffixed).unwrap(), "later\n");
}

#[test]
fn test_stale_file_rotated_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.log");
    fs::write(&path, "from a previous run\n").unwrap();

    let two_days_ago = SystemTime::now() - Duration::from_secs(2 * 24 * 60 * 60);
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(two_days_ago)
        .unwrap();
    let stale_day = DateTime::<Local>::from(two_days_ago).date_naive();

    let sink = RotatingFile::open(&path).unwrap();
    sink.write_record(b"fresh\n").unwrap();
    sink.flush().unwrap();

    assert_eq!(
        fs::read_to_string(dated_path(&path, stale_day)).unwrap(),
        "from a previous run\n"
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
}

#[test]
fn test_concurrent_writers_never_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.log");
    let clock = ManualClock::at(2024, 9, 1, 23);
    let sink = Arc::new(RotatingFile::with_clock(&path, clock.clone()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|writer| {
            let sink = sink.clone();
            let clock = clock.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    if writer == 0 && i == 100 {
                        clock.set(2024, 9, 2, 0);
                    }
                    let line = format!("{{\"writer\":{writer},\"i\":{i},\"pad\":\"{}\"}}\n", "x".repeat(64));
                    sink.write_record(line.as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    sink.flush().unwrap();

    let previous = dated_path(&path, chrono::NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
    let mut total = 0;
    for file in [&previous, &path] {
        let text = fs::read_to_string(file).unwrap_or_default();
        for line in text.lines() {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(record["writer"].is_u64());
            total += 1;
        }
    }
    assert_eq!(total, 8 * 200);
}
