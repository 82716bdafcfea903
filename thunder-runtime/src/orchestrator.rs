//! Lookup orchestrator
//!
//! Fans a target out to every registered probe with bounded parallelism and
//! waits for all of them. Each probe runs in its own task, so an error or a
//! panic in one only costs that probe's contribution.

use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use thunder_net::EgressSource;
use thunder_probes::{Probe, ToolProbe, ToolSpec, DEFAULT_TOOL_TIMEOUT};

/// Default worker cap: one per external tool
pub const DEFAULT_MAX_WORKERS: usize = 2;

/// Lookup configuration
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Probes running at once
    pub max_workers: usize,
    /// Hard timeout for each external tool run
    pub tool_timeout: Duration,
    /// Where tools write their JSON reports
    pub scratch_dir: PathBuf,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            scratch_dir: std::env::temp_dir().join("thunder"),
        }
    }
}

/// A probe that contributed nothing because it failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub probe: String,
    pub reason: String,
}

/// Aggregated result of one lookup
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    pub target: String,
    /// Union of every probe's handles; never empty
    pub discovered: BTreeSet<String>,
    /// True when no probe found anything and the target stands in
    pub fell_back: bool,
    pub failures: Vec<ProbeFailure>,
}

/// Runs probes concurrently and joins their results
pub struct Orchestrator {
    probes: Vec<Arc<dyn Probe>>,
    max_workers: usize,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl Orchestrator {
    pub fn new(max_workers: usize) -> Self {
        Self {
            probes: Vec::new(),
            max_workers: max_workers.max(1),
        }
    }

    /// Orchestrator with the Sherlock and Maigret tool probes
    pub fn with_tools(config: &LookupConfig, source: Arc<dyn EgressSource>) -> Self {
        [ToolSpec::sherlock(), ToolSpec::maigret()]
            .into_iter()
            .fold(Self::new(config.max_workers), |orchestrator, spec| {
                let probe = ToolProbe::new(spec, Arc::clone(&source), config.scratch_dir.clone())
                    .with_timeout(config.tool_timeout);
                orchestrator.with_probe(Arc::new(probe))
            })
    }

    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    pub async fn run(&self, target: &str) -> LookupOutcome {
        info!(
            "Running {} probes for {} ({} workers)",
            self.probes.len(),
            target,
            self.max_workers
        );

        let results: Vec<_> = stream::iter(self.probes.iter().cloned())
            .map(|probe| {
                let target = target.to_string();
                async move {
                    let name = probe.name().to_string();
                    let task = tokio::spawn(async move { probe.probe(&target).await });
                    (name, task.await)
                }
            })
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        let mut discovered = BTreeSet::new();
        let mut failures = Vec::new();

        for (name, result) in results {
            let reason = match result {
                Ok(Ok(found)) => {
                    info!("Probe {} returned {} handles", name, found.len());
                    discovered.extend(found);
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) if e.is_panic() => "probe task panicked".to_string(),
                Err(e) => e.to_string(),
            };

            warn!("Probe {} failed: {}", name, reason);
            failures.push(ProbeFailure {
                probe: name,
                reason,
            });
        }

        let fell_back = discovered.is_empty();
        if fell_back {
            warn!("No additional profiles found - analysing {} alone", target);
            discovered.insert(target.to_string());
        }

        info!("{} handle variants to analyse", discovered.len());
        LookupOutcome {
            target: target.to_string(),
            discovered,
            fell_back,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thunder_net::{IdentitySource, NetConfig, ProxyPool, ScriptedTransport};
    use thunder_probes::ProbeError;

    struct FixedProbe(&'static str, Vec<&'static str>);

    #[async_trait]
    impl Probe for FixedProbe {
        fn name(&self) -> &str {
            self.0
        }

        async fn probe(&self, _target: &str) -> Result<BTreeSet<String>, ProbeError> {
            Ok(self.1.iter().map(|s| s.to_string()).collect())
        }
    }

    struct CrashingProbe;

    #[async_trait]
    impl Probe for CrashingProbe {
        fn name(&self) -> &str {
            "crashing"
        }

        async fn probe(&self, _target: &str) -> Result<BTreeSet<String>, ProbeError> {
            Err(ProbeError::ToolMissing("maigret".to_string()))
        }
    }

    struct PanickingProbe;

    #[async_trait]
    impl Probe for PanickingProbe {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn probe(&self, _target: &str) -> Result<BTreeSet<String>, ProbeError> {
            panic!("simulated crash");
        }
    }

    struct GaugeProbe {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Probe for GaugeProbe {
        fn name(&self) -> &str {
            "gauge"
        }

        async fn probe(&self, _target: &str) -> Result<BTreeSet<String>, ProbeError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(BTreeSet::new())
        }
    }

    #[tokio::test]
    async fn test_failed_probe_is_isolated() {
        let orchestrator = Orchestrator::default()
            .with_probe(Arc::new(FixedProbe("sherlock", vec!["alice"])))
            .with_probe(Arc::new(CrashingProbe));

        let outcome = orchestrator.run("alice").await;
        assert_eq!(outcome.discovered, BTreeSet::from(["alice".to_string()]));
        assert!(!outcome.fell_back);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].probe, "crashing");
    }

    #[tokio::test]
    async fn test_panicking_probe_is_isolated() {
        let orchestrator = Orchestrator::default()
            .with_probe(Arc::new(PanickingProbe))
            .with_probe(Arc::new(FixedProbe("maigret", vec!["alice_99"])));

        let outcome = orchestrator.run("alice").await;
        assert_eq!(outcome.discovered, BTreeSet::from(["alice_99".to_string()]));
        assert_eq!(outcome.failures[0].reason, "probe task panicked");
    }

    #[tokio::test]
    async fn test_union_is_case_sensitive_and_deduplicated() {
        let orchestrator = Orchestrator::default()
            .with_probe(Arc::new(FixedProbe("sherlock", vec!["alice", "Alice"])))
            .with_probe(Arc::new(FixedProbe("maigret", vec!["alice", "al1ce"])));

        let outcome = orchestrator.run("alice").await;
        assert_eq!(
            outcome.discovered,
            BTreeSet::from(["Alice".to_string(), "al1ce".to_string(), "alice".to_string()])
        );
    }

    #[tokio::test]
    async fn test_empty_results_fall_back_to_target() {
        let orchestrator = Orchestrator::default()
            .with_probe(Arc::new(FixedProbe("sherlock", vec![])))
            .with_probe(Arc::new(FixedProbe("maigret", vec![])));

        let outcome = orchestrator.run("marcela").await;
        assert!(outcome.fell_back);
        assert_eq!(outcome.discovered, BTreeSet::from(["marcela".to_string()]));
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_no_probes_falls_back() {
        let outcome = Orchestrator::new(2).run("solo").await;
        assert!(outcome.fell_back);
        assert_eq!(outcome.discovered.len(), 1);
    }

    #[test]
    fn test_with_tools_registers_both() {
        let source = Arc::new(IdentitySource::new(
            NetConfig::default(),
            ProxyPool::empty(),
            false,
            Arc::new(ScriptedTransport::new()),
        ));
        let config = LookupConfig {
            max_workers: 0,
            ..Default::default()
        };

        let orchestrator = Orchestrator::with_tools(&config, source);
        assert_eq!(orchestrator.probe_count(), 2);
        assert_eq!(orchestrator.max_workers, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_cap_is_respected() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut orchestrator = Orchestrator::new(2);
        for _ in 0..6 {
            orchestrator = orchestrator.with_probe(Arc::new(GaugeProbe {
                active: Arc::clone(&active),
                peak: Arc::clone(&peak),
            }));
        }

        orchestrator.run("alice").await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }
}
