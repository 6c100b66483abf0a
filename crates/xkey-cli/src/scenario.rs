//! JSON scenarios replayed against the in-memory host.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::debug;
use xkey_host::{CachedObject, Clock, InMemoryCache, ManualClock, MemoryObject};
use xkey_index::IndexStats;
use xkey_module::{Xkey, XkeyConfig};
use xkey_types::{Expiry, PurgeMode};

/// Object fields shared by `insert` and `inject` steps.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ObjectSpec {
    /// Scenario-local object id, referenced by later steps.
    pub object: u64,
    #[serde(default)]
    pub headers: Vec<String>,
    pub ttl: f64,
    #[serde(default)]
    pub grace: f64,
    #[serde(default)]
    pub keep: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Insert(ObjectSpec),
    Inject(ObjectSpec),
    Remove { object: u64 },
    Busy { object: u64, busy: bool },
    Advance { seconds: f64 },
    Purge { key: String },
    Softpurge { key: String },
    Stats,
}

/// Parse a scenario document.
pub fn parse(text: &str) -> anyhow::Result<Vec<Step>> {
    serde_json::from_str(text).context("invalid scenario")
}

/// Read and parse a scenario file.
pub fn load(path: &Path) -> anyhow::Result<Vec<Step>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read scenario {}", path.display()))?;
    parse(&text)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Purged {
        step: usize,
        mode: PurgeMode,
        key: String,
        objects: u64,
    },
    Stats {
        step: usize,
        stats: IndexStats,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub steps: usize,
    pub outcomes: Vec<Outcome>,
    pub final_stats: IndexStats,
    pub verified: bool,
}

/// A cache, a manual clock and an active xkey context wired together.
pub struct Replay {
    cache: Arc<InMemoryCache>,
    clock: Arc<ManualClock>,
    xkey: Xkey,
    objects: BTreeMap<u64, Arc<MemoryObject>>,
    verify: bool,
}

impl Replay {
    pub fn new(config: XkeyConfig, verify: bool) -> anyhow::Result<Self> {
        let cache = Arc::new(InMemoryCache::new());
        let clock = Arc::new(ManualClock::new(0.0));
        let xkey = Xkey::create(cache.clone(), clock.clone(), config)?;
        xkey.activate();
        Ok(Self {
            cache,
            clock,
            xkey,
            objects: BTreeMap::new(),
            verify,
        })
    }

    pub fn run(mut self, steps: &[Step]) -> anyhow::Result<Report> {
        let mut outcomes = Vec::new();
        for (i, step) in steps.iter().enumerate() {
            let n = i + 1;
            if let Some(outcome) = self
                .apply(n, step)
                .with_context(|| format!("step {n} failed"))?
            {
                outcomes.push(outcome);
            }
            if self.verify {
                self.xkey
                    .verify()
                    .with_context(|| format!("index inconsistent after step {n}"))?;
            }
        }

        let final_stats = self.xkey.stats();
        self.xkey.shutdown();
        Ok(Report {
            steps: steps.len(),
            outcomes,
            final_stats,
            verified: self.verify,
        })
    }

    fn apply(&mut self, n: usize, step: &Step) -> anyhow::Result<Option<Outcome>> {
        debug!(n, ?step, "replaying step");
        match step {
            Step::Insert(spec) => self.admit(spec, false)?,
            Step::Inject(spec) => self.admit(spec, true)?,
            Step::Remove { object } => {
                let obj = self.take(*object)?;
                self.cache.remove(obj.handle());
            }
            Step::Busy { object, busy } => self.lookup(*object)?.set_busy(*busy),
            Step::Advance { seconds } => {
                if !seconds.is_finite() || *seconds < 0.0 {
                    bail!("cannot advance the clock by {seconds}");
                }
                self.clock.advance(*seconds);
            }
            Step::Purge { key } => return Ok(Some(self.purge(n, PurgeMode::Hard, key))),
            Step::Softpurge { key } => return Ok(Some(self.purge(n, PurgeMode::Soft, key))),
            Step::Stats => {
                return Ok(Some(Outcome::Stats {
                    step: n,
                    stats: self.xkey.stats(),
                }))
            }
        }
        Ok(None)
    }

    fn admit(&mut self, spec: &ObjectSpec, injected: bool) -> anyhow::Result<()> {
        if self.objects.contains_key(&spec.object) {
            bail!("object {} already exists", spec.object);
        }
        let expiry = Expiry::new(self.now(), spec.ttl, spec.grace, spec.keep);
        let headers = spec.headers.clone();
        let obj = if injected {
            self.cache.inject(headers, expiry)
        } else {
            self.cache.insert(headers, expiry)
        };
        self.objects.insert(spec.object, obj);
        Ok(())
    }

    fn purge(&self, n: usize, mode: PurgeMode, key: &str) -> Outcome {
        Outcome::Purged {
            step: n,
            mode,
            key: key.to_string(),
            objects: self.xkey.purge_with(mode, Some(key)),
        }
    }

    fn lookup(&self, object: u64) -> anyhow::Result<&Arc<MemoryObject>> {
        self.objects
            .get(&object)
            .with_context(|| format!("unknown object {object}"))
    }

    fn take(&mut self, object: u64) -> anyhow::Result<Arc<MemoryObject>> {
        self.objects
            .remove(&object)
            .with_context(|| format!("unknown object {object}"))
    }

    fn now(&self) -> f64 {
        self.clock.now()
    }
}
