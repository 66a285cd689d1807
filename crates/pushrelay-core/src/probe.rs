//! Foreground detection
//!
//! Answers whether an interactive consumer is present right now. The relay
//! asks once per inbound message; a `true` answer routes the message to the
//! notification path instead of the background queue.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

// ----------------------------------------------------------------------------
// Probe Trait
// ----------------------------------------------------------------------------

/// Source of truth for "is an interactive consumer active?"
///
/// Implementations must not panic; when the answer cannot be determined they
/// return `false` so messages fall back to queuing.
pub trait ForegroundProbe: Send + Sync {
    fn is_interactive_consumer_active(&self) -> bool;
}

/// Probe with a fixed, externally switchable answer
#[derive(Debug, Default)]
pub struct StaticProbe {
    active: AtomicBool,
}

impl StaticProbe {
    pub fn new(active: bool) -> Self {
        Self {
            active: AtomicBool::new(active),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

impl ForegroundProbe for StaticProbe {
    fn is_interactive_consumer_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

// ----------------------------------------------------------------------------
// Process-based Probe
// ----------------------------------------------------------------------------

/// Importance class of a process as seen by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    Foreground,
    Background,
}

/// One row of the OS process table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub importance: Importance,
}

/// Session lock source; a locked session has no interactive consumer
pub trait LockState: Send + Sync {
    fn is_locked(&self) -> bool;
}

/// Lock source for environments without a lock screen
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverLocked;

impl LockState for NeverLocked {
    fn is_locked(&self) -> bool {
        false
    }
}

/// Snapshot source of all running processes
pub trait ProcessTable: Send + Sync {
    /// `None` when the table is unavailable
    fn processes(&self) -> Option<Vec<ProcessInfo>>;

    /// A single process, `None` when absent or the table is unavailable
    fn process(&self, pid: u32) -> Option<ProcessInfo> {
        self.processes()?.into_iter().find(|info| info.pid == pid)
    }
}

/// Probe that looks up the calling process in the OS process table
pub struct ProcessProbe {
    lock: Box<dyn LockState>,
    table: Box<dyn ProcessTable>,
    pid: u32,
}

impl ProcessProbe {
    pub fn new(lock: Box<dyn LockState>, table: Box<dyn ProcessTable>) -> Self {
        Self {
            lock,
            table,
            pid: std::process::id(),
        }
    }

    /// Probe for the current host: no lock screen, `/proc` process table
    pub fn native() -> Self {
        Self::new(Box::new(NeverLocked), Box::new(ProcfsTable::default()))
    }

    /// Look up a different process than the caller
    pub fn for_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }
}

impl ForegroundProbe for ProcessProbe {
    fn is_interactive_consumer_active(&self) -> bool {
        if self.lock.is_locked() {
            trace!("Session locked, no interactive consumer");
            return false;
        }

        match self.table.process(self.pid) {
            Some(info) => info.importance == Importance::Foreground,
            None => {
                trace!("Process {} not in process table, assuming background", self.pid);
                false
            }
        }
    }
}

impl std::fmt::Debug for ProcessProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessProbe").field("pid", &self.pid).finish()
    }
}

// ----------------------------------------------------------------------------
// procfs Process Table
// ----------------------------------------------------------------------------

/// Process table read from `/proc`
///
/// A process is foreground when its process group owns its controlling
/// terminal (`pgrp == tpgid`).
#[derive(Debug, Clone)]
pub struct ProcfsTable {
    root: std::path::PathBuf,
}

impl Default for ProcfsTable {
    fn default() -> Self {
        Self {
            root: std::path::PathBuf::from("/proc"),
        }
    }
}

impl ProcfsTable {
    /// Read from an alternative procfs mount
    pub fn with_root<P: Into<std::path::PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn read_stat(&self, pid: u32) -> Option<ProcessInfo> {
        let path = self.root.join(pid.to_string()).join("stat");
        let stat = std::fs::read_to_string(path).ok()?;
        parse_stat(pid, &stat)
    }
}

impl ProcessTable for ProcfsTable {
    fn processes(&self) -> Option<Vec<ProcessInfo>> {
        let entries = std::fs::read_dir(&self.root).ok()?;
        let processes = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            // Processes may exit between listing and reading.
            .filter_map(|pid| self.read_stat(pid))
            .collect();
        Some(processes)
    }

    fn process(&self, pid: u32) -> Option<ProcessInfo> {
        self.read_stat(pid)
    }
}

/// Parse the fields of `/proc/<pid>/stat` that decide importance
pub fn parse_stat(pid: u32, stat: &str) -> Option<ProcessInfo> {
    // The command name may contain spaces and parentheses; fields resume
    // after the last ')'.
    let rest = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // state ppid pgrp session tty_nr tpgid
    let pgrp: i64 = fields.get(2)?.parse().ok()?;
    let tpgid: i64 = fields.get(5)?.parse().ok()?;

    let importance = if tpgid > 0 && pgrp == tpgid {
        Importance::Foreground
    } else {
        Importance::Background
    };
    Some(ProcessInfo { pid, importance })
}
