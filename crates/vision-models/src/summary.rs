//! Video summary aggregation.
//!
//! A video summary condenses the per-frame analysis of a video into the few
//! people and keywords that recur with high confidence. Each category is reduced
//! in two passes:
//!
//! 1. [`OccurrenceIndex`] groups every detection by key (person name or keyword
//!    class), keeping first-seen key order and per-key sighting order.
//! 2. [`OccurrenceIndex::reduce`] drops keys that are seen too rarely or with too
//!    few confident sightings, keeps the best sighting of each remaining key, ranks
//!    keys by that score and truncates to the configured count.
//!
//! Both passes are pure: no I/O and no mutation of the source documents.

use std::cmp::Ordering;
use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::image::{FaceDetection, ImageDocument, ImageId, ImageKeyword};

// ============================================================================
// Thresholds
// ============================================================================

/// Thresholds deciding which keys of one category survive the summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OccurrenceThresholds {
    /// Minimum number of sightings for a key to be considered
    pub minimum_occurrence: usize,
    /// Score a sighting must reach to count as confident
    pub minimum_score: f64,
    /// Minimum number of confident sightings to keep the key
    pub minimum_score_occurrence: usize,
    /// Maximum number of keys in the result (`None` = unbounded)
    pub maximum_occurrence_count: Option<usize>,
}

impl OccurrenceThresholds {
    /// Default thresholds for recognized faces.
    pub const FACES: Self = Self {
        minimum_occurrence: 3,
        minimum_score: 0.85,
        minimum_score_occurrence: 2,
        maximum_occurrence_count: Some(5),
    };

    /// Default thresholds for keyword classes.
    pub const KEYWORDS: Self = Self {
        minimum_occurrence: 1,
        minimum_score: 0.60,
        minimum_score_occurrence: 1,
        maximum_occurrence_count: Some(5),
    };

    /// Whether a key with these sightings is kept.
    fn admits<T: OccurrenceKey>(&self, occurrences: &[Occurrence<T>]) -> bool {
        if occurrences.len() < self.minimum_occurrence {
            return false;
        }

        let confident = occurrences
            .iter()
            .filter(|o| o.score() >= self.minimum_score)
            .count();

        confident >= self.minimum_score_occurrence
    }
}

/// Thresholds for every summarized category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummaryConfig {
    pub faces: OccurrenceThresholds,
    pub keywords: OccurrenceThresholds,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            faces: OccurrenceThresholds::FACES,
            keywords: OccurrenceThresholds::KEYWORDS,
        }
    }
}

// ============================================================================
// Occurrences
// ============================================================================

/// Grouping key and confidence of a detection.
pub trait OccurrenceKey {
    /// Key the detection is grouped under, `None` to leave it out of the summary.
    fn occurrence_key(&self) -> Option<&str>;

    /// Confidence used for thresholds and ranking.
    fn occurrence_score(&self) -> f64;
}

impl OccurrenceKey for FaceDetection {
    fn occurrence_key(&self) -> Option<&str> {
        self.identity_name()
    }

    fn occurrence_score(&self) -> f64 {
        self.confidence()
    }
}

impl OccurrenceKey for ImageKeyword {
    fn occurrence_key(&self) -> Option<&str> {
        self.class.as_deref().filter(|class| !class.is_empty())
    }

    fn occurrence_score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// A detection together with the frame it was found in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Occurrence<T> {
    #[serde(flatten)]
    pub detection: T,

    /// Source image document
    pub image_id: ImageId,

    /// Public URL of the source image
    pub image_url: String,

    /// Timecode of the source frame, copied as stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timecode: Option<serde_json::Value>,
}

impl<T: OccurrenceKey> Occurrence<T> {
    /// Confidence of the underlying detection.
    pub fn score(&self) -> f64 {
        self.detection.occurrence_score()
    }
}

/// Key-ordered grouping of occurrences for one category.
#[derive(Debug, Clone)]
pub struct OccurrenceIndex<T> {
    keys: Vec<String>,
    buckets: HashMap<String, Vec<Occurrence<T>>>,
}

impl<T> Default for OccurrenceIndex<T> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            buckets: HashMap::new(),
        }
    }
}

impl<T: OccurrenceKey> OccurrenceIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an occurrence under its key. Detections without a key are ignored.
    pub fn insert(&mut self, occurrence: Occurrence<T>) {
        let Some(key) = occurrence.detection.occurrence_key().map(str::to_string) else {
            return;
        };

        match self.buckets.get_mut(&key) {
            Some(bucket) => bucket.push(occurrence),
            None => {
                self.keys.push(key.clone());
                self.buckets.insert(key, vec![occurrence]);
            }
        }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sightings recorded for a key, in insertion order.
    pub fn occurrences(&self, key: &str) -> Option<&[Occurrence<T>]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Filter, collapse, rank and truncate the index.
    pub fn reduce(mut self, thresholds: &OccurrenceThresholds) -> Vec<RankedOccurrences<T>> {
        let mut ranked = Vec::new();

        for key in self.keys {
            let Some(occurrences) = self.buckets.remove(&key) else {
                continue;
            };
            if !thresholds.admits(&occurrences) {
                continue;
            }
            if let Some(best) = best_occurrence(occurrences) {
                ranked.push(RankedOccurrences {
                    key,
                    occurrences: vec![best],
                });
            }
        }

        // Stable: keys with equal scores keep first-seen order
        ranked.sort_by(|a, b| compare_descending(a.score(), b.score()));

        if let Some(max) = thresholds.maximum_occurrence_count {
            ranked.truncate(max);
        }

        ranked
    }
}

/// Highest-scoring occurrence, the earliest one on ties.
fn best_occurrence<T: OccurrenceKey>(occurrences: Vec<Occurrence<T>>) -> Option<Occurrence<T>> {
    let mut best: Option<Occurrence<T>> = None;
    for occurrence in occurrences {
        let better = match &best {
            Some(current) => rank_score(occurrence.score()) > rank_score(current.score()),
            None => true,
        };
        if better {
            best = Some(occurrence);
        }
    }
    best
}

/// NaN scores rank below everything.
fn rank_score(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

fn compare_descending(a: f64, b: f64) -> Ordering {
    rank_score(b).total_cmp(&rank_score(a))
}

// ============================================================================
// Summary
// ============================================================================

/// One retained key of a summary and its best sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RankedOccurrences<T> {
    /// Person name or keyword class
    #[serde(skip)]
    pub key: String,

    /// Always a single occurrence once reduced
    pub occurrences: Vec<Occurrence<T>>,
}

impl<T: OccurrenceKey> RankedOccurrences<T> {
    /// Score of the retained occurrence.
    pub fn score(&self) -> f64 {
        self.occurrences
            .first()
            .map(Occurrence::score)
            .unwrap_or(f64::NEG_INFINITY)
    }
}

/// Summary of the recurring people and keywords of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoSummary {
    pub face_detection: Vec<RankedOccurrences<FaceDetection>>,
    pub image_keywords: Vec<RankedOccurrences<ImageKeyword>>,
}

impl VideoSummary {
    pub fn is_empty(&self) -> bool {
        self.face_detection.is_empty() && self.image_keywords.is_empty()
    }
}

/// Group the face and keyword detections of a set of frames.
///
/// `image_url` builds the public URL stored on each occurrence.
pub fn collect_occurrences<'a, I, F>(
    images: I,
    image_url: F,
) -> (OccurrenceIndex<FaceDetection>, OccurrenceIndex<ImageKeyword>)
where
    I: IntoIterator<Item = &'a ImageDocument>,
    F: Fn(&ImageId) -> String,
{
    let mut faces = OccurrenceIndex::new();
    let mut keywords = OccurrenceIndex::new();

    for image in images {
        let faces_in_image = image.faces();
        let keywords_in_image = image.keywords();
        if faces_in_image.is_empty() && keywords_in_image.is_empty() {
            continue;
        }

        let url = image_url(&image.id);

        for face in faces_in_image {
            faces.insert(Occurrence {
                detection: face.clone(),
                image_id: image.id.clone(),
                image_url: url.clone(),
                timecode: image.frame_timecode.clone(),
            });
        }

        for keyword in keywords_in_image {
            keywords.insert(Occurrence {
                detection: keyword.clone(),
                image_id: image.id.clone(),
                image_url: url.clone(),
                timecode: image.frame_timecode.clone(),
            });
        }
    }

    (faces, keywords)
}

/// Summarize the frames of a video.
pub fn summarize<'a, I, F>(images: I, config: &SummaryConfig, image_url: F) -> VideoSummary
where
    I: IntoIterator<Item = &'a ImageDocument>,
    F: Fn(&ImageId) -> String,
{
    let (faces, keywords) = collect_occurrences(images, image_url);

    VideoSummary {
        face_detection: faces.reduce(&config.faces),
        image_keywords: keywords.reduce(&config.keywords),
    }
}
