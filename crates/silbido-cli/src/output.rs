//! JSON output formatting

use serde::Serialize;
use silbido_tonal::{Tonal, TonalHeader};
use std::path::Path;

/// Print a summary as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing result: {}", e),
    }
}

/// Overview of one annotation file
#[derive(Debug, Serialize)]
pub struct TonalFileSummary {
    pub path: String,
    pub has_header: bool,
    pub version: i32,
    pub user_version: i32,
    pub features: Vec<&'static str>,
    pub comment: Option<String>,
    pub timestamp: Option<String>,
    pub tonals: usize,
    pub nodes: usize,
    /// (first, last) node time in seconds over all tonals
    pub time_range_s: Option<(f64, f64)>,
    /// (lowest, highest) node frequency in Hz
    pub freq_range_hz: Option<(f64, f64)>,
    pub species: Vec<String>,
}

impl TonalFileSummary {
    pub fn new(path: &Path, header: &TonalHeader) -> Self {
        Self {
            path: path.display().to_string(),
            has_header: !header.is_headerless(),
            version: header.version,
            user_version: header.user_version,
            features: header.mask.flag_names(),
            comment: header.comment.clone(),
            timestamp: header.timestamp.clone(),
            tonals: 0,
            nodes: 0,
            time_range_s: None,
            freq_range_hz: None,
            species: Vec::new(),
        }
    }

    pub fn add(&mut self, tonal: &Tonal) {
        self.tonals += 1;
        self.nodes += tonal.nodes.len();

        for node in &tonal.nodes {
            if let Some(time) = node.time {
                self.time_range_s = Some(widen(self.time_range_s, time));
            }
            if let Some(freq) = node.freq {
                self.freq_range_hz = Some(widen(self.freq_range_hz, freq));
            }
        }

        if let Some(species) = &tonal.species {
            if !self.species.contains(species) {
                self.species.push(species.clone());
            }
        }
    }
}

fn widen(range: Option<(f64, f64)>, value: f64) -> (f64, f64) {
    match range {
        Some((low, high)) => (low.min(value), high.max(value)),
        None => (value, value),
    }
}
