//! Prometheus metrics for codec resolution
//!
//! Each [`CodecRegistry`](crate::CodecRegistry) owns its own Prometheus
//! registry, so several codec registries can live in one process without
//! their collectors clashing.

use crate::core::error::Result;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use std::time::Instant;

/// Counters and gauges for one codec registry
pub struct RegistryMetrics {
    registry: Registry,
    /// Resolutions answered from the cache or the primitive table
    pub cache_hits: IntCounter,
    /// Resolutions that had to synthesize a codec
    pub cache_misses: IntCounter,
    /// Codecs synthesized, including ones that lost a publication race
    pub codecs_built: IntCounter,
    /// Synthesized codecs discarded because another thread published first
    pub duplicate_builds: IntCounter,
    /// Resolutions that ended in an error
    pub resolve_failures: IntCounter,
    /// Codecs currently cached, registered overrides included
    pub cache_entries: IntGauge,
    /// Time spent synthesizing one codec, children included
    pub build_duration: Histogram,
}

impl RegistryMetrics {
    /// Create and register every collector
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let cache_hits = IntCounter::with_opts(Opts::new(
            "cql_codec_cache_hits_total",
            "Codec resolutions served without synthesis",
        ))?;
        let cache_misses = IntCounter::with_opts(Opts::new(
            "cql_codec_cache_misses_total",
            "Codec resolutions that required synthesis",
        ))?;
        let codecs_built = IntCounter::with_opts(Opts::new(
            "cql_codec_codecs_built_total",
            "Codecs synthesized",
        ))?;
        let duplicate_builds = IntCounter::with_opts(Opts::new(
            "cql_codec_duplicate_builds_total",
            "Synthesized codecs discarded after a concurrent publication",
        ))?;
        let resolve_failures = IntCounter::with_opts(Opts::new(
            "cql_codec_resolve_failures_total",
            "Codec resolutions that failed",
        ))?;
        let cache_entries = IntGauge::with_opts(Opts::new(
            "cql_codec_cache_entries",
            "Codecs currently cached",
        ))?;
        let build_duration = Histogram::with_opts(
            HistogramOpts::new(
                "cql_codec_build_duration_seconds",
                "Time spent synthesizing a codec",
            )
            .buckets(vec![0.000_001, 0.000_01, 0.000_1, 0.001, 0.01, 0.1]),
        )?;

        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(codecs_built.clone()))?;
        registry.register(Box::new(duplicate_builds.clone()))?;
        registry.register(Box::new(resolve_failures.clone()))?;
        registry.register(Box::new(cache_entries.clone()))?;
        registry.register(Box::new(build_duration.clone()))?;

        Ok(Self {
            registry,
            cache_hits,
            cache_misses,
            codecs_built,
            duplicate_builds,
            resolve_failures,
            cache_entries,
            build_duration,
        })
    }

    /// Prometheus registry holding these collectors
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Gather every metric family
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn collect(&self) -> String {
        let encoder = prometheus::TextEncoder::new();
        encoder
            .encode_to_string(&self.registry.gather())
            .unwrap_or_default()
    }
}

/// Records elapsed time into a histogram when finished
pub struct Timer {
    start: Instant,
    histogram: Histogram,
}

impl Timer {
    /// Start timing
    pub fn start(histogram: Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram,
        }
    }

    /// Stop timing and record
    pub fn finish(self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
