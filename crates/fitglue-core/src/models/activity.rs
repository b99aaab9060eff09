// ABOUTME: Standardized activity models including sessions, laps, records, and strength sets
// ABOUTME: Activity categories, muscle groups, and payload validation rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

/// Typed activity category for a standardized workout.
///
/// Wire values are `snake_case` (`"weight_training"`); providers may
/// override the category through their enrichment result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// Outdoor or treadmill running
    Running,
    /// Road, gravel, or indoor cycling
    Cycling,
    /// Pool or open-water swimming
    Swimming,
    /// Walking
    Walking,
    /// Hiking
    Hiking,
    /// Indoor or on-water rowing
    Rowing,
    /// Resistance / strength training
    WeightTraining,
    /// Yoga and mobility sessions
    Yoga,
    /// Anything that does not map onto a known category
    #[default]
    #[serde(other)]
    Other,
}

impl ActivityType {
    /// Human-readable display name
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Cycling => "Cycling",
            Self::Swimming => "Swimming",
            Self::Walking => "Walking",
            Self::Hiking => "Hiking",
            Self::Rowing => "Rowing",
            Self::WeightTraining => "Weight Training",
            Self::Yoga => "Yoga",
            Self::Other => "Workout",
        }
    }
}

/// Muscle group targeted by a strength exercise
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    /// Pectorals
    Chest,
    /// Lats, traps, and spinal erectors
    Back,
    /// Deltoids
    Shoulders,
    /// Biceps
    Biceps,
    /// Triceps
    Triceps,
    /// Forearms and grip
    Forearms,
    /// Abdominals and obliques
    Abs,
    /// Quadriceps
    Quads,
    /// Hamstrings
    Hamstrings,
    /// Glutes
    Glutes,
    /// Calves
    Calves,
    /// Unmapped muscle group
    #[serde(other)]
    Other,
}

impl MuscleGroup {
    /// Human-readable display name
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Chest => "Chest",
            Self::Back => "Back",
            Self::Shoulders => "Shoulders",
            Self::Biceps => "Biceps",
            Self::Triceps => "Triceps",
            Self::Forearms => "Forearms",
            Self::Abs => "Abs",
            Self::Quads => "Quads",
            Self::Hamstrings => "Hamstrings",
            Self::Glutes => "Glutes",
            Self::Calves => "Calves",
            Self::Other => "Other",
        }
    }
}

/// One sensor sample on the activity timeline.
///
/// All sensor fields are optional; absent fields are omitted on the wire and
/// encode as invalid-value sentinels in the FIT artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Sample timestamp (UTC)
    pub timestamp: DateTime<Utc>,
    /// Heart rate in BPM
    #[serde(
        default,
        alias = "heart_rate",
        skip_serializing_if = "Option::is_none"
    )]
    pub heart_rate: Option<u32>,
    /// Power in watts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<u32>,
    /// Latitude in degrees
    #[serde(default, alias = "lat", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in degrees
    #[serde(default, alias = "lng", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Altitude in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Cumulative distance covered so far, in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl Record {
    /// A record at `timestamp` with every sensor field absent
    #[must_use]
    pub const fn empty_at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            heart_rate: None,
            power: None,
            latitude: None,
            longitude: None,
            altitude: None,
            distance: None,
        }
    }

    /// Whether any sensor field carries a value
    #[must_use]
    pub const fn has_sensor_data(&self) -> bool {
        self.heart_rate.is_some()
            || self.power.is_some()
            || self.latitude.is_some()
            || self.longitude.is_some()
            || self.altitude.is_some()
            || self.distance.is_some()
    }
}

/// An ordered run of records within a session.
///
/// Record timestamps within a lap are monotonically non-decreasing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    /// When the lap started (UTC)
    #[serde(alias = "start_time")]
    pub start_time: DateTime<Utc>,
    /// Total elapsed time for the lap in seconds
    #[serde(alias = "total_elapsed_time")]
    pub total_elapsed_time: f64,
    /// Ordered sensor samples
    #[serde(default)]
    pub records: Vec<Record>,
}

/// One set of a strength exercise
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StrengthSet {
    /// Exercise name as reported upstream (e.g. "Bench Press")
    pub exercise: String,
    /// Repetitions performed
    pub reps: u32,
    /// Weight moved, in kilograms
    #[serde(default, alias = "weight_kg")]
    pub weight_kg: f64,
    /// Primary muscle group
    #[serde(alias = "primary_muscle")]
    pub primary_muscle: MuscleGroup,
    /// Secondary muscle groups
    #[serde(default, alias = "secondary_muscles")]
    pub secondary_muscles: Vec<MuscleGroup>,
    /// Superset membership, when the upstream source groups sets
    #[serde(
        default,
        alias = "superset_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub superset_id: Option<u32>,
}

/// The single session owned by a standardized activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// When the session started (UTC)
    #[serde(alias = "start_time")]
    pub start_time: DateTime<Utc>,
    /// Total elapsed time in seconds; must be positive for a valid payload
    #[serde(alias = "total_elapsed_time")]
    pub total_elapsed_time: f64,
    /// Total distance covered in meters
    #[serde(default, alias = "total_distance")]
    pub total_distance: f64,
    /// Ordered laps
    #[serde(default)]
    pub laps: Vec<Lap>,
    /// Strength sets, for resistance workouts
    #[serde(default, alias = "strength_sets")]
    pub strength_sets: Vec<StrengthSet>,
}

impl Session {
    /// Elapsed time rounded to the nearest whole second.
    ///
    /// This is the record count the fan-in pads the first lap to.
    #[must_use]
    pub fn elapsed_whole_seconds(&self) -> u64 {
        if self.total_elapsed_time <= 0.0 {
            return 0;
        }
        self.total_elapsed_time.round() as u64
    }
}

/// A normalized workout ingested from an upstream provider.
///
/// This is the working state the orchestrator threads through the provider
/// chain: each provider observes the mutations applied for the providers
/// declared before it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedActivity {
    /// Stable external identifier assigned by the upstream source
    #[serde(alias = "external_id")]
    pub external_id: String,
    /// Owning user
    #[serde(alias = "user_id")]
    pub user_id: Uuid,
    /// Source tag (e.g. `SOURCE_HEVY`); compared case-sensitively
    pub source: String,
    /// When the workout started (UTC)
    #[serde(alias = "start_time")]
    pub start_time: DateTime<Utc>,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Free-text description; providers append fragments to it
    #[serde(default)]
    pub description: String,
    /// Typed activity category
    #[serde(default, alias = "activity_type")]
    pub activity_type: ActivityType,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// The activity's single session, absent on malformed payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

impl StandardizedActivity {
    /// Validate the payload-structure invariants.
    ///
    /// A processable activity has exactly one session with a positive total
    /// elapsed time. Multi-session days are conservatively rejected upstream
    /// of this type: a `StandardizedActivity` structurally holds at most one
    /// session, so only absence and zero elapsed time remain detectable here.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MissingSession` when no session is present and
    /// `CoreError::ZeroElapsedTime` when the session has no duration. Both
    /// are non-retryable.
    pub fn validate(&self) -> Result<(), CoreError> {
        let session = self.session.as_ref().ok_or(CoreError::MissingSession)?;
        if session.total_elapsed_time <= 0.0 {
            return Err(CoreError::ZeroElapsedTime);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 7, 0, 0).unwrap()
    }

    fn activity_with_session(session: Option<Session>) -> StandardizedActivity {
        StandardizedActivity {
            external_id: "w-1".into(),
            user_id: Uuid::new_v4(),
            source: "SOURCE_HEVY".into(),
            start_time: start(),
            name: "Morning Session".into(),
            description: String::new(),
            activity_type: ActivityType::Running,
            tags: Vec::new(),
            session,
        }
    }

    #[test]
    fn validate_rejects_missing_session() {
        let activity = activity_with_session(None);
        assert!(matches!(
            activity.validate(),
            Err(CoreError::MissingSession)
        ));
    }

    #[test]
    fn validate_rejects_zero_elapsed_time() {
        let activity = activity_with_session(Some(Session {
            start_time: start(),
            total_elapsed_time: 0.0,
            total_distance: 0.0,
            laps: Vec::new(),
            strength_sets: Vec::new(),
        }));
        assert!(matches!(
            activity.validate(),
            Err(CoreError::ZeroElapsedTime)
        ));
    }

    #[test]
    fn validate_accepts_single_positive_session() {
        let activity = activity_with_session(Some(Session {
            start_time: start(),
            total_elapsed_time: 1800.0,
            total_distance: 5000.0,
            laps: Vec::new(),
            strength_sets: Vec::new(),
        }));
        assert!(activity.validate().is_ok());
    }

    #[test]
    fn elapsed_whole_seconds_rounds_to_nearest() {
        let session = Session {
            start_time: start(),
            total_elapsed_time: 1799.6,
            total_distance: 0.0,
            laps: Vec::new(),
            strength_sets: Vec::new(),
        };
        assert_eq!(session.elapsed_whole_seconds(), 1800);
    }

    #[test]
    fn activity_accepts_snake_case_aliases() {
        let json = r#"{
            "external_id": "abc",
            "user_id": "7b2a8f8e-95cf-4c5a-9c3e-111111111111",
            "source": "SOURCE_HEVY",
            "start_time": "2026-03-14T07:00:00Z",
            "activity_type": "weight_training",
            "session": {
                "start_time": "2026-03-14T07:00:00Z",
                "total_elapsed_time": 2700.0,
                "strength_sets": [
                    {"exercise": "Squat", "reps": 5, "weight_kg": 100.0, "primary_muscle": "quads"}
                ]
            },
            "unknown_future_field": true
        }"#;
        let activity: StandardizedActivity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.external_id, "abc");
        assert_eq!(activity.activity_type, ActivityType::WeightTraining);
        let session = activity.session.unwrap();
        assert_eq!(session.strength_sets.len(), 1);
        assert_eq!(session.strength_sets[0].primary_muscle, MuscleGroup::Quads);
    }

    #[test]
    fn activity_emits_camel_case() {
        let activity = activity_with_session(None);
        let json = serde_json::to_value(&activity).unwrap();
        assert!(json.get("externalId").is_some());
        assert!(json.get("startTime").is_some());
        assert!(json.get("external_id").is_none());
    }
}
