//! Order status machine.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::minutes_between;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::OrderError;

/// Where an order is in its life.
///
/// ```text
/// pending ──► in_preparation ──► ready ──► served ──► paid
///    │              │
///    └──────────────┴──► delayed
///
/// any non-terminal ──► cancelled
/// ```
///
/// `paid` and `cancelled` are terminal. `paid` is only reached by recording a
/// payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Taken, not yet started by the kitchen.
    #[default]
    Pending,

    /// The kitchen is working on it.
    InPreparation,

    /// Cooked and waiting to be carried out.
    Ready,

    /// On the table.
    Served,

    /// Settled (terminal).
    Paid,

    /// Flagged as running late.
    Delayed,

    /// Abandoned (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::InPreparation,
        OrderStatus::Ready,
        OrderStatus::Served,
        OrderStatus::Paid,
        OrderStatus::Delayed,
        OrderStatus::Cancelled,
    ];

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InPreparation => "in_preparation",
            OrderStatus::Ready => "ready",
            OrderStatus::Served => "served",
            OrderStatus::Paid => "paid",
            OrderStatus::Delayed => "delayed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Position on the main line. `delayed` shares a stage with
    /// `in_preparation`; `cancelled` is off the line.
    pub fn stage(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::InPreparation | OrderStatus::Delayed => Some(1),
            OrderStatus::Ready => Some(2),
            OrderStatus::Served => Some(3),
            OrderStatus::Paid => Some(4),
            OrderStatus::Cancelled => None,
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Returns true for the statuses the delay scan watches.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::InPreparation)
    }

    /// Returns true for the statuses shown on the kitchen queue.
    pub fn is_in_kitchen(&self) -> bool {
        self.is_open() || *self == OrderStatus::Delayed
    }

    /// Returns true if entering this status starts the preparation clock.
    pub fn starts_preparation(&self) -> bool {
        *self == OrderStatus::InPreparation
    }

    /// Returns true if entering this status stops the preparation clock.
    pub fn ends_preparation(&self) -> bool {
        matches!(
            self,
            OrderStatus::Ready | OrderStatus::Served | OrderStatus::Paid
        )
    }

    /// Returns true if moving from `self` to `to` goes back along the main line.
    pub fn is_regression_to(&self, to: OrderStatus) -> bool {
        matches!((self.stage(), to.stage()), (Some(from), Some(to)) if to < from)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::InvalidStatus {
                value: s.to_string(),
            })
    }
}

/// What to do when a transition moves an order back along the main line,
/// for example `served → pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegressionPolicy {
    /// Allow it and keep whatever timestamps are already set.
    #[default]
    Permit,

    /// Refuse it with `InvalidStateTransition`.
    Reject,

    /// Allow it and drop the timestamps of the stages being undone.
    ClearTimestamps,
}

/// Error returned when parsing an unknown regression policy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown regression policy '{0}' (expected permit, reject or clear_timestamps)")]
pub struct UnknownPolicy(pub String);

impl FromStr for RegressionPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permit" => Ok(RegressionPolicy::Permit),
            "reject" => Ok(RegressionPolicy::Reject),
            "clear_timestamps" => Ok(RegressionPolicy::ClearTimestamps),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// Kitchen timing captured from status changes.
///
/// `ended_at` is only ever set while `started_at` is set, and never earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreparationTimes {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl PreparationTimes {
    /// Minutes between start and end, rounded to two decimals. `None` unless
    /// both are set.
    pub fn duration_minutes(&self) -> Option<f64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(minutes_between(start, end)),
            _ => None,
        }
    }

    /// Returns the times after entering `status` at `now`.
    ///
    /// Timestamps that are already set are kept.
    pub fn entering(mut self, status: OrderStatus, now: DateTime<Utc>) -> Self {
        if status.starts_preparation() && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if status.ends_preparation()
            && self.ended_at.is_none()
            && let Some(start) = self.started_at
        {
            self.ended_at = Some(now.max(start));
        }
        self
    }

    /// Returns the times after regressing to `status`: stage 0 forgets the
    /// whole preparation, stage 1 only its end.
    pub fn rewound_to(mut self, status: OrderStatus) -> Self {
        match status.stage() {
            Some(0) => self = Self::default(),
            Some(1) => self.ended_at = None,
            _ => {}
        }
        self
    }
}
