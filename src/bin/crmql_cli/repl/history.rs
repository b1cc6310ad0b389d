use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{Context as _, Result};

/// Instructions saisies dans le REPL, une par ligne dans `path`
pub struct HistoryLog {
    path: PathBuf,
    entries: VecDeque<String>,
    capacity: usize,
}

impl HistoryLog {
    pub fn new<P: Into<PathBuf>>(path: P, capacity: usize) -> Self {
        HistoryLog {
            path: path.into(),
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Recharge le fichier; absent, l'historique reste vide
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Lecture de {:?}", self.path))?;

        self.entries.clear();
        for line in raw.lines() {
            self.record(line);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let mut raw = Vec::from(self.entries.clone()).join("\n");
        raw.push('\n');
        std::fs::write(&self.path, raw).with_context(|| format!("Écriture de {:?}", self.path))
    }

    /// Ajoute une ligne, sauf si vide ou identique à la précédente
    pub fn record(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || self.entries.back().is_some_and(|last| last == line) {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Entrées contenant le motif, sans tenir compte de la casse
    pub fn matching(&self, pattern: &str) -> Vec<&str> {
        let pattern = pattern.to_lowercase();
        self.entries()
            .filter(|entry| entry.to_lowercase().contains(&pattern))
            .collect()
    }
}
