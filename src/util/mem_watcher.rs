// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Memory usage monitoring. Currently only supported on Linux.

use std::fs::File;
use std::io::{Error, ErrorKind, Read, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use libc::pid_t;
use log::*;
use nom::bytes::complete::tag;
use nom::character::complete::digit1;
use nom::combinator::map_res;
use nom::multi::count;
use nom::sequence::{terminated, tuple};
use nom::IResult;

const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Memory usage information processed from `/proc/[pid]/statm`.
///
/// All values are in units of pages.
///
/// See `man 5 proc` and `Linux/fs/proc/array.c`.
#[derive(Debug, Default, PartialEq, Eq, Hash)]
pub struct Statm {
    /// Total virtual memory size.
    pub size: usize,
    /// Resident non-swapped memory.
    pub resident: usize,
    /// Shared memory.
    pub share: usize,
    /// Resident executable memory.
    pub text: usize,
    /// Resident data and stack memory.
    pub data: usize,
}

/// Samples the resident set size of the process on a background thread and
/// reports the initial and peak values.
pub struct MemoryWatcher {
    init_resident: usize,
    max_resident: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Default for MemoryWatcher {
    fn default() -> Self {
        MemoryWatcher {
            init_resident: 0,
            max_resident: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl MemoryWatcher {
    /// Records the current memory usage, or 0 if it cannot be read.
    pub fn new() -> Self {
        match statm_self() {
            Ok(statm) => {
                let mut watcher = MemoryWatcher::default();
                watcher.init_resident = statm.resident;
                watcher
            }
            Err(e) => {
                warn!("Unable to parse the statm file: {}", e);
                MemoryWatcher::default()
            }
        }
    }

    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);
        let max_resident = self.max_resident.clone();
        let running = self.running.clone();
        self.handle = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                if let Ok(statm) = statm_self() {
                    max_resident.fetch_max(statm.resident, Ordering::SeqCst);
                }
                thread::sleep(SAMPLE_INTERVAL);
            }
        }));
    }

    /// Stops sampling and logs the memory usage.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Memory watcher thread panicked");
            }
        }

        let max_rss = self.max_resident().max(self.init_resident);
        info!("Used Memory Before Analysis: {} MB", rss_in_megabytes(self.init_resident));
        info!("Max Memory in Analysis: {} MB", rss_in_megabytes(max_rss));
    }

    /// The peak resident set size observed so far, in pages.
    pub fn max_resident(&self) -> usize {
        self.max_resident.load(Ordering::SeqCst)
    }
}

impl Drop for MemoryWatcher {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn rss_in_megabytes(rss_pages: usize) -> usize {
    rss_pages * 4 / 1024
}

/// Transforms a `nom` parse result into a io result.
/// The parser must completely consume the input.
pub fn map_result<T>(result: IResult<&str, T>) -> Result<T> {
    match result {
        Ok((remaining, val)) => {
            if remaining.is_empty() {
                Ok(val)
            } else {
                Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("unable to parse whole input, remaining: {:?}", remaining),
                ))
            }
        }
        Err(err) => Err(Error::new(
            ErrorKind::InvalidInput,
            format!("unable to parse input: {:?}", err),
        )),
    }
}

fn parse_usize(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

/// Parses the statm file format.
///
/// The columns in the statm file include: size resident shared text lib data dt
fn parse_statm(input: &str) -> IResult<&str, Statm> {
    tuple((count(terminated(parse_usize, tag(" ")), 6), parse_usize))(input).map(|(next_input, res)| {
        let statm = Statm {
            size: res.0[0],
            resident: res.0[1],
            share: res.0[2],
            text: res.0[3],
            data: res.0[5],
        };
        (next_input, statm)
    })
}

/// Parses the provided statm file.
fn statm_file(file: &mut File) -> Result<Statm> {
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    map_result(parse_statm(buf.trim()))
}

/// Returns memory status information for the process with the provided pid.
pub fn statm(pid: pid_t) -> Result<Statm> {
    statm_file(&mut File::open(format!("/proc/{}/statm", pid))?)
}

/// Returns memory status information for the current process.
pub fn statm_self() -> Result<Statm> {
    statm_file(&mut File::open("/proc/self/statm")?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_statm_lines() {
        let statm = map_result(parse_statm("1000 200 30 4 0 50 0")).unwrap();
        assert_eq!(
            statm,
            Statm {
                size: 1000,
                resident: 200,
                share: 30,
                text: 4,
                data: 50
            }
        );
    }

    #[test]
    fn rejects_truncated_lines() {
        assert!(map_result(parse_statm("1000 200 30")).is_err());
        assert!(map_result(parse_statm("1 2 3 4 5 6 7 8")).is_err());
    }

    #[test]
    fn watcher_records_initial_resident_size() {
        let mut watcher = MemoryWatcher::new();
        let init = watcher.init_resident;
        assert_eq!(init > 0, statm_self().is_ok());
        watcher.start();
        watcher.stop();
        assert!(watcher.handle.is_none());
    }
}
