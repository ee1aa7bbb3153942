use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use phishshield_core::ledger::{FlagLedger, FlaggedEntry, InMemoryLedger, LedgerSnapshot};

/// In-memory ledger mirrored to an append-only NDJSON file. Existing lines
/// are replayed on open; unreadable lines are skipped.
pub struct NdjsonFlagLedger {
    memory: InMemoryLedger,
    path: PathBuf,
    file: Mutex<File>,
}

impl NdjsonFlagLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let entries = replay(&path)?;
        tracing::info!(path = %path.display(), entries = entries.len(), "flagged entry log opened");
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            memory: InMemoryLedger::with_entries(entries),
            path,
            file: Mutex::new(file),
        })
    }

}

fn replay(path: &Path) -> Result<Vec<FlaggedEntry>, std::io::Error> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let mut entries = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FlaggedEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(line = idx + 1, error = %err, "skipping unreadable flagged entry")
            }
        }
    }
    Ok(entries)
}

impl FlagLedger for NdjsonFlagLedger {
    fn record(&self, entry: FlaggedEntry) {
        // File and memory appends happen under one lock so both keep the same order.
        let mut file = self.file.lock();
        let written = serde_json::to_vec(&entry)
            .map_err(std::io::Error::from)
            .and_then(|mut line| {
                line.push(b'\n');
                file.write_all(&line)
            });
        // The in-memory ledger stays authoritative for this process.
        if let Err(err) = written {
            tracing::warn!(path = %self.path.display(), error = %err, "flagged entry not persisted");
        }
        self.memory.record(entry);
    }

    fn list(&self) -> LedgerSnapshot {
        self.memory.list()
    }

    fn len(&self) -> usize {
        self.memory.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use phishshield_core::policy::Verdict;

    fn entry(url: &str) -> FlaggedEntry {
        FlaggedEntry {
            url: url.to_string(),
            domain: "evil.example".to_string(),
            verdict: Verdict::Dangerous,
            risk: 90,
            time: Utc.timestamp_opt(1_750_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn entries_survive_reopen_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("flagged.ndjson");
        {
            let ledger = NdjsonFlagLedger::open(&path).unwrap();
            ledger.record(entry("http://evil.example/1"));
            ledger.record(entry("http://evil.example/2"));
        }
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"not json\n")
            .unwrap();

        let reopened = NdjsonFlagLedger::open(&path).unwrap();
        let urls: Vec<String> = reopened.list().iter().map(|e| e.url.clone()).collect();
        assert_eq!(urls, vec!["http://evil.example/1", "http://evil.example/2"]);
        reopened.record(entry("http://evil.example/3"));
        assert_eq!(reopened.len(), 3);
    }

    #[test]
    fn concurrent_appends_replay_in_recorded_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flagged.ndjson");
        let ledger = std::sync::Arc::new(NdjsonFlagLedger::open(&path).unwrap());

        let workers: Vec<_> = (0..8)
            .map(|t| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        ledger.record(entry(&format!("http://evil.example/{t}/{i}")));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let live: Vec<String> = ledger.list().iter().map(|e| e.url.clone()).collect();
        drop(ledger);
        let replayed: Vec<String> = NdjsonFlagLedger::open(&path)
            .unwrap()
            .list()
            .iter()
            .map(|e| e.url.clone())
            .collect();
        assert_eq!(live.len(), 1600);
        assert_eq!(live, replayed);
    }
}
