//! Reading job descriptors from a workflow export.
//!
//! An export is `{"content": [{"retrievedFrom": {...}}, ...]}`, optionally
//! gzip-compressed. The whole document is validated up front so a malformed
//! entry fails the run before anything is submitted.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::debug;

use crate::error::LoadError;
use crate::state_machine::JobDescriptor;

#[derive(Debug, Deserialize)]
struct ExportDocument {
    content: Vec<ExportEntry>,
}

#[derive(Debug, Deserialize)]
struct ExportEntry {
    #[serde(rename = "retrievedFrom")]
    retrieved_from: JobDescriptor,
}

/// Opens `path`, or stdin when `None`. Files ending in `.gz` are decompressed.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>, LoadError> {
    let reader: Box<dyn Read> = match path {
        None => Box::new(io::stdin().lock()),
        Some(p) if p.extension().is_some_and(|ext| ext == "gz") => {
            Box::new(GzDecoder::new(File::open(p)?))
        }
        Some(p) => Box::new(File::open(p)?),
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Descriptors of an export in document order, optionally without commit-pinned ones.
#[derive(Debug)]
pub struct DescriptorSource {
    entries: std::vec::IntoIter<ExportEntry>,
    exclude_commit_pinned: bool,
    skipped: usize,
}

impl DescriptorSource {
    pub fn from_reader(reader: impl Read, exclude_commit_pinned: bool) -> Result<Self, LoadError> {
        let document: ExportDocument = serde_json::from_reader(reader)?;
        Ok(Self {
            entries: document.content.into_iter(),
            exclude_commit_pinned,
            skipped: 0,
        })
    }

    pub fn open(path: Option<&Path>, exclude_commit_pinned: bool) -> Result<Self, LoadError> {
        Self::from_reader(open_input(path)?, exclude_commit_pinned)
    }

    /// Descriptors dropped by the commit filter so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for DescriptorSource {
    type Item = JobDescriptor;

    fn next(&mut self) -> Option<JobDescriptor> {
        for entry in self.entries.by_ref() {
            let descriptor = entry.retrieved_from;
            if self.exclude_commit_pinned && descriptor.is_commit_pinned() {
                debug!(%descriptor, "skipping commit-pinned workflow");
                self.skipped += 1;
                continue;
            }
            return Some(descriptor);
        }
        None
    }
}
