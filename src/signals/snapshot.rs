// =============================================================================
// Signal Snapshot Types
// =============================================================================
//
// A `SignalSnapshot` is one symbol's latest-day view: date, close and the nine
// named booleans. A `SignalSet` is the snapshot collection of one refresh
// cycle together with its refresh time; it is replaced wholesale, never
// merged.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The nine signal keys exposed per snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    TopPassivation,
    BottomPassivation,
    TopStructure,
    BottomStructure,
    TopDivergence,
    BottomDivergence,
    MainRise,
    TopEstablished,
    BottomEstablished,
}

impl SignalKind {
    pub const ALL: [SignalKind; 9] = [
        Self::TopPassivation,
        Self::BottomPassivation,
        Self::TopStructure,
        Self::BottomStructure,
        Self::TopDivergence,
        Self::BottomDivergence,
        Self::MainRise,
        Self::TopEstablished,
        Self::BottomEstablished,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopPassivation => "top_passivation",
            Self::BottomPassivation => "bottom_passivation",
            Self::TopStructure => "top_structure",
            Self::BottomStructure => "bottom_structure",
            Self::TopDivergence => "top_divergence",
            Self::BottomDivergence => "bottom_divergence",
            Self::MainRise => "main_rise",
            Self::TopEstablished => "top_established",
            Self::BottomEstablished => "bottom_established",
        }
    }

    /// Bullish classification set used when scoring forward returns.
    pub fn is_bullish(self) -> bool {
        matches!(
            self,
            Self::MainRise
                | Self::BottomEstablished
                | Self::BottomStructure
                | Self::BottomDivergence
                | Self::BottomPassivation
        )
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown signal type {s:?}"))
    }
}

/// Fixed nine-key boolean map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalFlags {
    pub top_passivation: bool,
    pub bottom_passivation: bool,
    pub top_structure: bool,
    pub bottom_structure: bool,
    pub top_divergence: bool,
    pub bottom_divergence: bool,
    pub main_rise: bool,
    pub top_established: bool,
    pub bottom_established: bool,
}

impl SignalFlags {
    pub fn get(&self, kind: SignalKind) -> bool {
        match kind {
            SignalKind::TopPassivation => self.top_passivation,
            SignalKind::BottomPassivation => self.bottom_passivation,
            SignalKind::TopStructure => self.top_structure,
            SignalKind::BottomStructure => self.bottom_structure,
            SignalKind::TopDivergence => self.top_divergence,
            SignalKind::BottomDivergence => self.bottom_divergence,
            SignalKind::MainRise => self.main_rise,
            SignalKind::TopEstablished => self.top_established,
            SignalKind::BottomEstablished => self.bottom_established,
        }
    }

    pub fn any(&self) -> bool {
        SignalKind::ALL.into_iter().any(|k| self.get(k))
    }

    pub fn active(&self) -> impl Iterator<Item = SignalKind> + '_ {
        SignalKind::ALL.into_iter().filter(|&k| self.get(k))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub code: String,
    pub name: String,
    pub date: NaiveDate,
    pub close: f64,
    pub signals: SignalFlags,
}

/// Snapshots of one refresh cycle plus the time the cycle finished.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub signals: Vec<SignalSnapshot>,
    #[serde(default, with = "update_time_format")]
    pub update_time: Option<NaiveDateTime>,
}

impl SignalSet {
    pub fn new(signals: Vec<SignalSnapshot>, update_time: NaiveDateTime) -> Self {
        Self {
            signals,
            update_time: Some(update_time),
        }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// `"YYYY-MM-DD HH:MM:SS"` on the wire, `null` when never refreshed.
pub mod update_time_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(t: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.serialize_str(&t.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}
