//! Per-hit side computations registered by projections.
//!
//! A collector sees every hit of a query once, segment by segment, before the
//! extraction pass starts. Projections that need a per-hit computation (the rank
//! score, a distance to a point) register a [`CollectorFactory`] through the
//! requirements builder; the executor creates one collector per distinct
//! [`CollectorKey`] and exposes the populated collectors to value cursors through
//! [`Collectors`].

use std::{any::Any, fmt, sync::Arc};

use ahash::AHashMap;
use prism_common::{GeoPoint, Result, Value, error::Error};
use prism_index_core::{DocId, DocValues, Segment};

/// Identity of a collector: two factories with equal keys produce
/// interchangeable collectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectorKey {
    kind: &'static str,
    discriminator: String,
}

impl CollectorKey {
    pub fn new(kind: &'static str, discriminator: impl Into<String>) -> CollectorKey {
        CollectorKey {
            kind,
            discriminator: discriminator.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl fmt::Display for CollectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.discriminator.is_empty() {
            f.write_str(self.kind)
        } else {
            write!(f, "{}[{}]", self.kind, self.discriminator)
        }
    }
}

pub trait CollectorFactory: Send + Sync {
    fn key(&self) -> CollectorKey;

    fn create(&self) -> Box<dyn Collector>;
}

/// Receives the hits of a query.
///
/// `set_segment` is called before the hits of each segment with the position of
/// the segment in the scanned list (the [`SearchHit::segment`] of its hits);
/// `collect` is called once per hit with the segment-local document id and the
/// engine score. Results are keyed by that position, never by the segment's own
/// ordinal, which is only unique within its index.
///
/// [`SearchHit::segment`]: prism_index_core::SearchHit::segment
pub trait Collector: Send + Sync {
    fn set_segment(&mut self, position: usize, segment: &Arc<dyn Segment>) -> Result<()>;

    fn collect(&mut self, doc: DocId, score: f32) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// The populated collectors of one query, keyed by [`CollectorKey`].
#[derive(Default)]
pub struct Collectors {
    collectors: AHashMap<CollectorKey, Box<dyn Collector>>,
}

impl Collectors {
    pub fn new() -> Collectors {
        Default::default()
    }

    pub fn insert(&mut self, key: CollectorKey, collector: Box<dyn Collector>) {
        self.collectors.insert(key, collector);
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Collector>> {
        self.collectors.values_mut()
    }

    /// Returns the collector registered under `key`, downcast to `T`.
    ///
    /// # Errors
    ///
    /// Fails if no collector was registered under `key`, which means a projection
    /// did not declare the requirement it relies on.
    pub fn get<T: 'static>(&self, key: &CollectorKey) -> Result<&T> {
        self.collectors
            .get(key)
            .and_then(|collector| collector.as_any().downcast_ref::<T>())
            .ok_or_else(|| Error::invalid_operation(format!("collector {key} was not required")))
    }
}

/// Records the engine score of every hit.
#[derive(Default)]
pub struct ScoreCollector {
    segment: usize,
    scores: AHashMap<(usize, DocId), f32>,
}

impl ScoreCollector {
    pub const KIND: &'static str = "score";

    pub fn key() -> CollectorKey {
        CollectorKey::new(Self::KIND, "")
    }

    pub fn score(&self, segment: usize, doc: DocId) -> Option<f32> {
        self.scores.get(&(segment, doc)).copied()
    }
}

impl Collector for ScoreCollector {
    fn set_segment(&mut self, position: usize, _segment: &Arc<dyn Segment>) -> Result<()> {
        self.segment = position;
        Ok(())
    }

    fn collect(&mut self, doc: DocId, score: f32) -> Result<()> {
        self.scores.insert((self.segment, doc), score);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct ScoreCollectorFactory;

impl CollectorFactory for ScoreCollectorFactory {
    fn key(&self) -> CollectorKey {
        ScoreCollector::key()
    }

    fn create(&self) -> Box<dyn Collector> {
        Box::<ScoreCollector>::default()
    }
}

/// Computes, for every hit, the distance in meters between `center` and the
/// single point indexed in the doc-value column of `path`.
pub struct DistanceCollector {
    path: String,
    center: GeoPoint,
    segment: usize,
    column: Option<Arc<dyn DocValues>>,
    distances: AHashMap<(usize, DocId), f64>,
}

impl DistanceCollector {
    pub const KIND: &'static str = "distance";

    pub fn new(path: impl Into<String>, center: GeoPoint) -> DistanceCollector {
        DistanceCollector {
            path: path.into(),
            center,
            segment: 0,
            column: None,
            distances: AHashMap::new(),
        }
    }

    pub fn key(path: &str, center: GeoPoint) -> CollectorKey {
        CollectorKey::new(Self::KIND, format!("{path}@{center}"))
    }

    /// Distance in meters for a collected hit, `None` when the hit has no point.
    pub fn distance(&self, segment: usize, doc: DocId) -> Option<f64> {
        self.distances.get(&(segment, doc)).copied()
    }
}

impl Collector for DistanceCollector {
    fn set_segment(&mut self, position: usize, segment: &Arc<dyn Segment>) -> Result<()> {
        self.segment = position;
        self.column = segment.doc_values(&self.path)?;
        Ok(())
    }

    fn collect(&mut self, doc: DocId, _score: f32) -> Result<()> {
        let Some(column) = self.column.as_ref() else {
            return Ok(());
        };
        let point = column
            .values(doc)?
            .into_iter()
            .find_map(|value| match value {
                Value::GeoPoint(point) => Some(point),
                _ => None,
            });
        if let Some(point) = point {
            self.distances
                .insert((self.segment, doc), self.center.distance_meters(&point));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct DistanceCollectorFactory {
    pub path: String,
    pub center: GeoPoint,
}

impl CollectorFactory for DistanceCollectorFactory {
    fn key(&self) -> CollectorKey {
        DistanceCollector::key(&self.path, self.center)
    }

    fn create(&self) -> Box<dyn Collector> {
        Box::new(DistanceCollector::new(self.path.clone(), self.center))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collectors_lookup_by_key() {
        let mut collectors = Collectors::new();
        let mut score = ScoreCollector::default();
        score.collect(3, 0.5).unwrap();
        collectors.insert(ScoreCollector::key(), Box::new(score));

        let found = collectors.get::<ScoreCollector>(&ScoreCollector::key()).unwrap();
        assert_eq!(found.score(0, 3), Some(0.5));
        assert_eq!(found.score(0, 4), None);

        let missing = DistanceCollector::key("location", GeoPoint::new(0.0, 0.0));
        assert!(collectors.get::<DistanceCollector>(&missing).is_err());
        assert!(collectors.get::<DistanceCollector>(&ScoreCollector::key()).is_err());
    }

    #[test]
    fn test_distance_keys_distinguish_centers() {
        let a = DistanceCollector::key("location", GeoPoint::new(1.0, 2.0));
        let b = DistanceCollector::key("location", GeoPoint::new(1.0, 2.5));
        assert_ne!(a, b);
        assert_eq!(a, DistanceCollector::key("location", GeoPoint::new(1.0, 2.0)));
        assert_eq!(a.kind(), DistanceCollector::KIND);
    }
}
