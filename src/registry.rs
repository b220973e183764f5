//! Concurrent codec registry.
//!
//! Resolution order: registered overrides, the prebuilt primitive table,
//! then the synthesized cache. A miss builds the codec with no lock held
//! (children resolve recursively through this same registry) and publishes
//! it with one flat insertion. When two threads race on the same
//! descriptor both may build; the first insertion wins and the loser's
//! codec is dropped, so resolution never waits on another thread's build.
//!
//! Registration bumps an epoch before evicting dependents. A build that
//! straddles a registration sees the epoch move and, if its descriptor
//! embeds a registered one, withdraws what it published and resolves again.

use crate::codec::{equivalent, CodecBuilder, PrimitiveCodec, SharedCodec, TypeCodec};
use crate::core::config::RegistryConfig;
use crate::core::error::{Error, Result};
use crate::system::metrics::{RegistryMetrics, Timer};
use crate::types::{CollectionType, DataType, PrimitiveKind, Value};
use bytes::{Bytes, BytesMut};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Thread-safe descriptor to codec cache; share it as `Arc<CodecRegistry>`
pub struct CodecRegistry {
    primitives: [SharedCodec; PrimitiveKind::COUNT],
    synthesized: DashMap<DataType, SharedCodec>,
    registered: DashMap<DataType, SharedCodec>,
    /// Skips the override lookup until something has been registered
    has_registered: AtomicBool,
    /// Bumped by every successful registration
    epoch: AtomicU64,
    config: RegistryConfig,
    metrics: RegistryMetrics,
}

impl CodecRegistry {
    /// Registry with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(RegistryConfig::default())
    }

    /// Registry with explicit settings
    pub fn with_config(config: RegistryConfig) -> Result<Self> {
        let primitives = std::array::from_fn(|i| {
            Arc::new(PrimitiveCodec::new(PrimitiveKind::ALL[i])) as SharedCodec
        });
        Ok(Self {
            primitives,
            synthesized: DashMap::new(),
            registered: DashMap::new(),
            has_registered: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            config,
            metrics: RegistryMetrics::new()?,
        })
    }

    /// Settings this registry was built with
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Metrics for this registry
    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }

    /// Codec for `data_type`, synthesizing and caching it on first sight.
    ///
    /// Repeated calls with equal descriptors return the same codec.
    /// Failures are never cached.
    pub fn resolve(&self, data_type: &DataType) -> Result<SharedCodec> {
        if let Some(codec) = self.lookup(data_type) {
            self.metrics.cache_hits.inc();
            trace!(data_type = %data_type, "codec cache hit");
            return Ok(codec);
        }

        self.metrics.cache_misses.inc();
        let depth = data_type.depth();
        if depth > self.config.max_type_depth {
            self.metrics.resolve_failures.inc();
            return Err(Error::unsupported(format!(
                "{} nests {} levels, limit is {}",
                data_type, depth, self.config.max_type_depth
            )));
        }

        debug!(data_type = %data_type, "synthesizing codec");
        let epoch = self.epoch.load(Ordering::SeqCst);
        let timer = Timer::start(self.metrics.build_duration.clone());
        let built = CodecBuilder::new(self).build(data_type);
        timer.finish();

        let codec = match built {
            Ok(codec) => codec,
            Err(e) => {
                self.metrics.resolve_failures.inc();
                debug!(data_type = %data_type, error = %e, "codec synthesis failed");
                return Err(e);
            }
        };

        let published = self.install(data_type, codec);
        if self.epoch.load(Ordering::SeqCst) == epoch || !self.embeds_registered(data_type) {
            return Ok(published);
        }

        // a registration landed mid-build and may have missed this entry
        let withdrawn = self
            .synthesized
            .remove_if(data_type, |_, cached| Arc::ptr_eq(cached, &published));
        if withdrawn.is_some() {
            self.metrics.cache_entries.dec();
        }
        debug!(data_type = %data_type, "rebuilding codec after concurrent registration");
        self.resolve(data_type)
    }

    fn embeds_registered(&self, data_type: &DataType) -> bool {
        self.registered
            .iter()
            .any(|entry| mentions(data_type, entry.key()))
    }

    fn lookup(&self, data_type: &DataType) -> Option<SharedCodec> {
        if self.has_registered.load(Ordering::Acquire) {
            if let Some(codec) = self.registered.get(data_type) {
                return Some(codec.value().clone());
            }
        }
        if let DataType::Primitive(kind) = data_type {
            return Some(self.primitives[kind.index()].clone());
        }
        self.synthesized.get(data_type).map(|codec| codec.value().clone())
    }

    fn install(&self, data_type: &DataType, codec: SharedCodec) -> SharedCodec {
        self.metrics.codecs_built.inc();
        // an override registered while we were building wins
        if let Some(registered) = self.registered.get(data_type) {
            return registered.value().clone();
        }
        match self.synthesized.entry(data_type.clone()) {
            Entry::Occupied(existing) => {
                debug_assert!(equivalent(existing.get(), &codec));
                self.metrics.duplicate_builds.inc();
                debug!(data_type = %data_type, "discarding codec built concurrently");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                slot.insert(codec.clone());
                self.metrics.cache_entries.inc();
                codec
            }
        }
    }

    /// Install `codec` for `data_type` ahead of synthesis.
    ///
    /// The codec must report `data_type` as its descriptor and, for tuples
    /// and UDTs, the same arity. A registered codec is never replaced.
    /// Cached codecs that embed `data_type` are evicted so they get rebuilt
    /// around the override.
    pub fn register(&self, data_type: DataType, codec: SharedCodec) -> Result<()> {
        if codec.data_type() != &data_type {
            return Err(Error::ambiguous(format!(
                "codec for {} offered for {}",
                codec.data_type(),
                data_type
            )));
        }
        if codec.arity() != data_type.arity() {
            return Err(Error::ambiguous(format!(
                "codec arity {:?} does not match {} with arity {:?}",
                codec.arity(),
                data_type,
                data_type.arity()
            )));
        }

        match self.registered.entry(data_type.clone()) {
            Entry::Occupied(existing) => {
                if Arc::ptr_eq(existing.get(), &codec) {
                    return Ok(());
                }
                return Err(Error::ambiguous(format!(
                    "a different codec is already registered for {}",
                    data_type
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(codec);
            }
        }
        self.has_registered.store(true, Ordering::Release);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.metrics.cache_entries.inc();

        if self.synthesized.remove(&data_type).is_some() {
            self.metrics.cache_entries.dec();
            warn!(data_type = %data_type, "registered codec replaces a synthesized one");
        }
        let mut evicted = 0;
        self.synthesized.retain(|cached, _| {
            let stale = mentions(cached, &data_type);
            evicted += i64::from(stale);
            !stale
        });
        self.metrics.cache_entries.sub(evicted);

        info!(data_type = %data_type, "registered codec");
        Ok(())
    }

    /// Decode one value; `None` is SQL null
    pub fn decode(&self, data_type: &DataType, bytes: Option<Bytes>) -> Result<Value> {
        match bytes {
            None => Ok(Value::Null),
            Some(bytes) => self.resolve(data_type)?.decode(bytes),
        }
    }

    /// Encode one value; null encodes to `None`
    pub fn encode(&self, data_type: &DataType, value: &Value) -> Result<Option<Bytes>> {
        if value.is_null() {
            return Ok(None);
        }
        let codec = self.resolve(data_type)?;
        let mut out = BytesMut::new();
        codec.encode(value, &mut out)?;
        Ok(Some(out.freeze()))
    }

    /// Cached codecs, synthesized plus registered; primitives excluded
    pub fn len(&self) -> usize {
        self.synthesized.len() + self.registered.len()
    }

    /// Whether nothing beyond the primitive table is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `data_type` resolves without synthesis
    pub fn contains(&self, data_type: &DataType) -> bool {
        data_type.is_primitive()
            || self.registered.contains_key(data_type)
            || self.synthesized.contains_key(data_type)
    }

    /// Whether a codec was registered for exactly `data_type`
    pub fn is_registered(&self, data_type: &DataType) -> bool {
        self.registered.contains_key(data_type)
    }
}

/// Whether `needle` appears strictly inside `haystack`
fn mentions(haystack: &DataType, needle: &DataType) -> bool {
    let inside = |child: &DataType| child == needle || mentions(child, needle);
    match haystack {
        DataType::Primitive(_) | DataType::Custom(_) => false,
        DataType::Collection(collection) => match collection.as_ref() {
            CollectionType::List(element) | CollectionType::Set(element) => inside(element),
            CollectionType::Map(key, value) => inside(key) || inside(value),
        },
        DataType::Tuple(elements) => elements.iter().any(inside),
        DataType::Udt(udt) => udt.fields.iter().any(|f| inside(&f.data_type)),
    }
}
