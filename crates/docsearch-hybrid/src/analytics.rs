use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use docsearch_core::error::{Error, Result};
use docsearch_core::types::{AnalyticsRecord, PopularQuery};

/// Append-only search log. Once it grows past `cap`, it is compacted to the
/// newest `cap / 2` records.
#[derive(Debug)]
pub struct AnalyticsLog {
    records: Mutex<Vec<AnalyticsRecord>>,
    cap: usize,
}

impl AnalyticsLog {
    pub fn new(cap: usize) -> Self { Self { records: Mutex::new(Vec::new()), cap } }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<AnalyticsRecord>>> {
        self.records.lock().map_err(|_| Error::Cache("analytics lock poisoned".into()))
    }

    pub fn record(&self, record: AnalyticsRecord) -> Result<()> {
        let mut records = self.lock()?;
        records.push(record);
        if records.len() > self.cap {
            let keep = self.cap / 2;
            let drop = records.len() - keep;
            records.drain(..drop);
        }
        Ok(())
    }

    /// Oldest first.
    pub fn all(&self) -> Result<Vec<AnalyticsRecord>> { Ok(self.lock()?.clone()) }

    /// Newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<AnalyticsRecord>> {
        Ok(self.lock()?.iter().rev().take(limit).cloned().collect())
    }

    pub fn popular(&self, limit: usize) -> Result<Vec<PopularQuery>> {
        let records = self.lock()?;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for r in records.iter() {
            *counts.entry(r.query.as_str()).or_insert(0) += 1;
        }
        let mut popular: Vec<PopularQuery> =
            counts.into_iter().map(|(query, count)| PopularQuery { query: query.to_string(), count }).collect();
        popular.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
        popular.truncate(limit);
        Ok(popular)
    }

    pub fn len(&self) -> Result<usize> { Ok(self.lock()?.len()) }

    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.records.lock();
            panic!("poisoning analytics log");
        }));
    }
}
