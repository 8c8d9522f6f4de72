//! On-disk results cache
//!
//! Reports are stored as bincode blobs named
//! `<method>_<channel>[_trial<k>].bin` inside the cache directory, so a
//! finished run is never repeated.

use std::fs;
use std::path::{Path, PathBuf};

use channel_dataset::ChannelType;
use tracing::{debug, info};

use crate::error::DetectResult;
use crate::trainer::EvaluationReport;

#[derive(Debug, Clone)]
pub struct ResultsCache {
    dir: PathBuf,
}

impl ResultsCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, method: &str, channel: ChannelType, trial: Option<usize>) -> PathBuf {
        let name = match trial {
            Some(k) => format!("{}_{}_trial{}.bin", method, channel, k),
            None => format!("{}_{}.bin", method, channel),
        };
        self.dir.join(name)
    }

    pub fn load(&self, method: &str, channel: ChannelType, trial: Option<usize>) -> DetectResult<Option<EvaluationReport>> {
        let path = self.path_for(method, channel, trial);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let report = bincode::deserialize(&bytes)?;
        debug!(path = %path.display(), "loaded cached report");
        Ok(Some(report))
    }

    pub fn store(&self, report: &EvaluationReport, trial: Option<usize>) -> DetectResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&report.method, report.channel_type, trial);
        fs::write(&path, bincode::serialize(report)?)?;
        debug!(path = %path.display(), "stored report");
        Ok(path)
    }

    /// Cached report if present, otherwise `run` and store its result
    pub fn load_or_run<F>(
        &self,
        method: &str,
        channel: ChannelType,
        trial: Option<usize>,
        run: F,
    ) -> DetectResult<EvaluationReport>
    where
        F: FnOnce() -> DetectResult<EvaluationReport>,
    {
        if let Some(report) = self.load(method, channel, trial)? {
            info!(method, %channel, "using cached results");
            return Ok(report);
        }
        let report = run()?;
        self.store(&report, trial)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectError;

    fn report() -> EvaluationReport {
        EvaluationReport {
            method: "ViterbiNet".to_string(),
            channel_type: ChannelType::Siso,
            snr: 10.0,
            ser_by_block: vec![0.1, 0.05],
            fer_by_block: vec![0.1, 0.05],
            total_ser: 0.075,
            skipped_steps: 0,
        }
    }

    #[test]
    fn test_file_names() {
        let cache = ResultsCache::new("/tmp/x");
        assert_eq!(
            cache.path_for("DeepSIC", ChannelType::Mimo, None),
            PathBuf::from("/tmp/x/DeepSIC_MIMO.bin")
        );
        assert_eq!(
            cache.path_for("ViterbiNet", ChannelType::Siso, Some(2)),
            PathBuf::from("/tmp/x/ViterbiNet_SISO_trial2.bin")
        );
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultsCache::new(dir.path().join("nested"));
        assert!(cache.load("ViterbiNet", ChannelType::Siso, None).unwrap().is_none());

        cache.store(&report(), None).unwrap();
        assert_eq!(cache.load("ViterbiNet", ChannelType::Siso, None).unwrap(), Some(report()));
    }

    #[test]
    fn test_load_or_run_skips_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultsCache::new(dir.path());

        let mut calls = 0;
        let first = cache
            .load_or_run("ViterbiNet", ChannelType::Siso, Some(0), || {
                calls += 1;
                Ok(report())
            })
            .unwrap();
        let second = cache
            .load_or_run("ViterbiNet", ChannelType::Siso, Some(0), || {
                Err(DetectError::Config("should not run".to_string()))
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_blob_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultsCache::new(dir.path());
        fs::write(cache.path_for("ViterbiNet", ChannelType::Siso, None), b"\x01").unwrap();
        assert!(matches!(
            cache.load("ViterbiNet", ChannelType::Siso, None),
            Err(DetectError::Cache(_))
        ));
    }
}
