// src/pipeline/event_log.rs
//
// Chronological, human-auditable event log. Diffs each frame's tracker
// output against the previous frame and writes one line per change to the
// console and, optionally, to a session file.
//
// The log owns the output file for the whole session. Closing (explicitly
// or on drop) writes the per-label totals and releases the file.

use crate::analysis::{Interaction, StateDelta};
use crate::error::{Result, TrackerError};
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::fs::File;
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// One formatted event: `FFFFF - message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub frame_index: u64,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05} - {}", self.frame_index, self.message)
    }
}

pub struct EventLog<W: Write = Stdout> {
    console: W,
    file: Option<File>,
    path: Option<PathBuf>,
    totals: IndexMap<String, u64>,
    active: IndexSet<Interaction>,
    last_frame_index: u64,
    closed: bool,
}

impl EventLog<Stdout> {
    /// Log to stdout, and to `output` when given. The file is created (or
    /// truncated) now and held open until the log is closed.
    pub fn open(output: Option<&Path>) -> Result<Self> {
        Self::with_console(io::stdout(), output)
    }
}

impl<W: Write> EventLog<W> {
    pub fn with_console(console: W, output: Option<&Path>) -> Result<Self> {
        let file = match output {
            Some(path) => {
                let file = File::create(path)?;
                info!("📝 Event log file: {}", path.display());
                Some(file)
            }
            None => None,
        };

        Ok(Self {
            console,
            file,
            path: output.map(Path::to_path_buf),
            totals: IndexMap::new(),
            active: IndexSet::new(),
            last_frame_index: 0,
            closed: false,
        })
    }

    /// Diff one frame's delta into events. Returns the entries written.
    pub fn update_state(&mut self, frame_index: u64, delta: &StateDelta) -> Result<Vec<LogEntry>> {
        let mut entries = Vec::new();

        for (label, &count) in &delta.new_instances {
            // Registered labels are known from their first delta, count or not.
            let total = self.totals.entry(label.clone()).or_insert(0);
            if count == 0 {
                continue;
            }
            *total += count as u64;
            let message = format!("{count} new instance of {label}. Total is now: {total}");
            entries.push(self.emit(frame_index, message)?);
        }

        let current: IndexSet<&Interaction> = delta.interactions.iter().collect();
        let started: Vec<Interaction> = current
            .iter()
            .filter(|i| !self.active.contains(**i))
            .map(|i| (*i).clone())
            .collect();
        let ended: Vec<Interaction> = self
            .active
            .iter()
            .filter(|i| !current.contains(i))
            .cloned()
            .collect();

        for interaction in started {
            entries.push(self.emit(frame_index, interaction.to_string())?);
            self.active.insert(interaction);
        }
        for interaction in ended {
            let message = format!(
                "{} no longer {} {}",
                interaction.object_a, interaction.verb, interaction.object_b
            );
            entries.push(self.emit(frame_index, message)?);
            self.active.shift_remove(&interaction);
        }

        self.last_frame_index = frame_index;
        Ok(entries)
    }

    /// Write the per-label totals and release the output file.
    pub fn close(mut self) -> Result<Vec<LogEntry>> {
        self.finish()
    }

    fn finish(&mut self) -> Result<Vec<LogEntry>> {
        if self.closed {
            return Ok(Vec::new());
        }
        self.closed = true;

        let summary: Vec<String> = self
            .totals
            .iter()
            .filter(|(_, total)| **total > 0)
            .map(|(label, total)| format!("{label} total: {total}"))
            .collect();

        let mut entries = Vec::with_capacity(summary.len());
        for message in summary {
            entries.push(self.emit(self.last_frame_index, message)?);
        }

        self.console.flush()?;
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
            if let Some(path) = &self.path {
                debug!("Event log file closed: {}", path.display());
            }
        }

        Ok(entries)
    }

    fn emit(&mut self, frame_index: u64, message: String) -> Result<LogEntry> {
        let entry = LogEntry {
            frame_index,
            message,
        };
        writeln!(self.console, "{entry}")?;
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{entry}")?;
        }
        Ok(entry)
    }

    /// Running total of new instances for `label`.
    pub fn cumulative_total(&self, label: &str) -> Result<u64> {
        self.totals
            .get(label)
            .copied()
            .ok_or_else(|| TrackerError::unregistered(label))
    }

    pub fn active_interactions(&self) -> impl Iterator<Item = &Interaction> {
        self.active.iter()
    }

    pub fn last_frame_index(&self) -> u64 {
        self.last_frame_index
    }

    pub fn console(&self) -> &W {
        &self.console
    }
}

impl<W: Write> Drop for EventLog<W> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            error!("❌ Failed to close event log: {}", e);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::EntityTracker;
    use crate::detections::Detections;
    use std::fs;

    fn quiet_log() -> EventLog<Vec<u8>> {
        EventLog::with_console(Vec::new(), None).unwrap()
    }

    fn touching(a: &str, b: &str) -> Interaction {
        Interaction::new(a, b, "touching")
    }

    fn interactions(list: &[Interaction]) -> StateDelta {
        StateDelta {
            new_instances: IndexMap::new(),
            interactions: list.to_vec(),
        }
    }

    fn instances(list: &[(&str, u32)]) -> StateDelta {
        StateDelta {
            new_instances: list.iter().map(|(l, c)| (l.to_string(), *c)).collect(),
            interactions: Vec::new(),
        }
    }

    fn messages(entries: &[LogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_line_format_is_zero_padded() {
        let entry = LogEntry {
            frame_index: 42,
            message: "A touching B".to_string(),
        };
        assert_eq!(entry.to_string(), "00042 - A touching B");
    }

    #[test]
    fn test_scenario_interaction_start_and_end() {
        let mut log = quiet_log();

        let started = log.update_state(0, &interactions(&[touching("A", "B")])).unwrap();
        assert_eq!(messages(&started), vec!["A touching B"]);

        let repeated = log.update_state(1, &interactions(&[touching("A", "B")])).unwrap();
        assert!(repeated.is_empty());

        let ended = log.update_state(2, &interactions(&[])).unwrap();
        assert_eq!(messages(&ended), vec!["A no longer touching B"]);
        assert_eq!(ended[0].frame_index, 2);
        assert_eq!(log.active_interactions().count(), 0);
    }

    #[test]
    fn test_duplicate_pairs_in_one_frame_report_once() {
        let mut log = quiet_log();
        let entries = log
            .update_state(0, &interactions(&[touching("A", "B"), touching("A", "B")]))
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_starts_before_ends_within_a_frame() {
        let mut log = quiet_log();
        log.update_state(0, &interactions(&[touching("hand", "dish"), touching("hand", "cup")]))
            .unwrap();

        let entries = log
            .update_state(1, &interactions(&[touching("hand", "bottle")]))
            .unwrap();
        assert_eq!(
            messages(&entries),
            vec![
                "hand touching bottle",
                "hand no longer touching dish",
                "hand no longer touching cup",
            ]
        );
    }

    #[test]
    fn test_new_instances_accumulate_and_skip_zero() {
        let mut log = quiet_log();

        let entries = log.update_state(4, &instances(&[("ball", 1), ("cup", 0)])).unwrap();
        assert_eq!(messages(&entries), vec!["1 new instance of ball. Total is now: 1"]);

        let entries = log.update_state(9, &instances(&[("ball", 2), ("cup", 0)])).unwrap();
        assert_eq!(messages(&entries), vec!["2 new instance of ball. Total is now: 3"]);

        assert_eq!(log.cumulative_total("ball").unwrap(), 3);
        assert_eq!(log.cumulative_total("cup").unwrap(), 0);
        assert!(matches!(
            log.cumulative_total("spoon"),
            Err(TrackerError::UnregisteredLabel(_))
        ));

        let summary = log.close().unwrap();
        assert_eq!(messages(&summary), vec!["ball total: 3"]);
    }

    #[test]
    fn test_registered_label_without_instances_agrees_with_tracker() {
        let mut tracker = EntityTracker::default();
        tracker.register_new_instance_type("cup");
        let mut log = quiet_log();

        let delta = tracker.update(&Detections::new(), 0);
        log.update_state(0, &delta).unwrap();

        assert_eq!(tracker.instance_count("cup").unwrap(), 0);
        assert_eq!(log.cumulative_total("cup").unwrap(), 0);
    }

    #[test]
    fn test_scenario_close_reports_totals_at_last_frame() {
        let mut log = quiet_log();
        log.update_state(10, &instances(&[("ball", 1)])).unwrap();
        log.update_state(20, &instances(&[("ball", 2)])).unwrap();
        log.update_state(42, &StateDelta::default()).unwrap();
        assert_eq!(log.last_frame_index(), 42);

        let summary = log.close().unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].to_string(), "00042 - ball total: 3");
    }

    #[test]
    fn test_console_receives_every_line() {
        let mut log = quiet_log();
        log.update_state(3, &interactions(&[touching("A", "B")])).unwrap();
        log.update_state(4, &interactions(&[])).unwrap();

        let text = String::from_utf8(log.console().clone()).unwrap();
        assert_eq!(text, "00003 - A touching B\n00004 - A no longer touching B\n");
    }

    #[test]
    fn test_file_mirrors_console() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");

        let mut log = EventLog::with_console(Vec::new(), Some(&path)).unwrap();
        log.update_state(4, &instances(&[("ball", 1)])).unwrap();
        log.update_state(7, &interactions(&[touching("hand", "ball")])).unwrap();
        log.close().unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "00004 - 1 new instance of ball. Total is now: 1\n\
             00007 - hand touching ball\n\
             00007 - ball total: 1\n"
        );
    }

    #[test]
    fn test_drop_flushes_totals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");

        {
            let mut log = EventLog::with_console(Vec::new(), Some(&path)).unwrap();
            log.update_state(12, &instances(&[("dish", 2)])).unwrap();
        }

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.ends_with("00012 - dish total: 2\n"));
    }

    #[test]
    fn test_unopenable_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("events.log");

        let result = EventLog::with_console(Vec::new(), Some(&path));
        assert!(matches!(result, Err(TrackerError::Io(_))));
    }
}
