//! Append-only metadata journal.
//!
//! The journal is a JSON array written one record at a time: the first record opens the
//! array, later records are appended behind a `,` separator and the last expected record
//! closes it. Every write is flushed, so an interrupted run leaves a file whose only
//! defects are a missing `]` and at most one partial record. [read_journal] repairs both.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use log::{debug, warn};
use crate::error::StoreError;
use crate::metadata::MetadataRecord;

pub const JOURNAL_FILENAME:&str = "journal.json";

pub struct JournalWriter {
    path:PathBuf,
    file:File,
    n_written:usize,
    n_expected:usize,
    closed:bool,
}

impl JournalWriter {

    /// Creates (truncates) the journal; it closes itself after `n_expected` records.
    pub fn create(path:&Path,n_expected:usize) -> Result<Self,StoreError> {
        let file = OpenOptions::new().create(true).write(true).truncate(true).open(path)?;
        Ok(Self {
            path: path.to_owned(),
            file,
            n_written: 0,
            n_expected,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn n_written(&self) -> usize {
        self.n_written
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn append(&mut self,record:&MetadataRecord) -> Result<(),StoreError> {
        if self.closed {
            return Err(StoreError::JournalFull(self.n_expected))
        }
        let line = serde_json::to_string(record)?;
        let mut entry = match self.n_written {
            0 => format!("[\n{}",line),
            _=> format!(",\n{}",line)
        };
        self.n_written += 1;
        if self.n_written == self.n_expected {
            entry.push_str("\n]\n");
            self.closed = true;
        }
        self.file.write_all(entry.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    /// Closes the array early (cancelled run). Closing an empty journal writes `[]`.
    pub fn close(&mut self) -> Result<(),StoreError> {
        if self.closed {
            return Ok(())
        }
        let tail = match self.n_written {
            0 => "[]\n",
            _=> "\n]\n"
        };
        self.file.write_all(tail.as_bytes())?;
        self.file.flush()?;
        self.closed = true;
        debug!("journal {:?} closed after {} records",self.path,self.n_written);
        Ok(())
    }
}

/// Records recovered from a journal file.
#[derive(Clone,Debug)]
pub struct JournalContents {
    pub records:Vec<MetadataRecord>,
    /// the file needed a closing bracket or lost a partial record
    pub repaired:bool,
}

/// Parses journal text, appending a missing `]` and dropping a trailing partial record.
pub fn parse_journal(text:&str) -> JournalContents {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return JournalContents { records: vec![], repaired: true }
    }
    let (candidate,bracket_added) = match trimmed.ends_with(']') {
        true => (trimmed.to_string(),false),
        false => (format!("{}\n]",trimmed),true)
    };
    if let Ok(records) = serde_json::from_str::<Vec<MetadataRecord>>(&candidate) {
        return JournalContents { records, repaired: bracket_added }
    }

    // one record per line; keep everything up to the first line that does not parse
    let mut records = vec![];
    for line in trimmed.lines() {
        let entry = line.trim().trim_start_matches('[').trim_end_matches(']').trim().trim_matches(',').trim();
        if entry.is_empty() {
            continue
        }
        match serde_json::from_str::<MetadataRecord>(entry) {
            Ok(r) => records.push(r),
            Err(e) => {
                warn!("dropping partial journal entry after record {}: {}",records.len(),e);
                break
            }
        }
    }
    JournalContents { records, repaired: true }
}

pub fn read_journal(path:&Path) -> Result<JournalContents,StoreError> {
    let mut f = File::open(path)?;
    let mut s = String::new();
    f.read_to_string(&mut s)?;
    let contents = parse_journal(&s);
    if contents.repaired {
        warn!("journal {:?} was truncated; recovered {} records",path,contents.records.len());
    }
    Ok(contents)
}

pub fn journal_text(records:&[MetadataRecord]) -> Result<String,StoreError> {
    let lines = records.iter().map(serde_json::to_string).collect::<Result<Vec<String>,_>>()?;
    Ok(match lines.is_empty() {
        true => String::from("[]\n"),
        false => format!("[\n{}\n]\n",lines.join(",\n"))
    })
}

/// Rewrites a truncated journal in place so later readers see a closed array.
pub fn repair_journal(path:&Path) -> Result<JournalContents,StoreError> {
    let contents = read_journal(path)?;
    if contents.repaired {
        let mut f = File::create(path)?;
        f.write_all(journal_text(&contents.records)?.as_bytes())?;
    }
    Ok(contents)
}
