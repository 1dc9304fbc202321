use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fleet::{Vehicle, VehicleId};
use crate::geo::{GeoPoint, RoutePlan};
use crate::workflows::matching::{Candidate, DeliveryAssignment, DeliveryMatch, DeliveryRequest};

pub(crate) const NO_CANDIDATES: &str = "no suitable candidates";

/// Identifier wrapper for workflow sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Reallocation,
    AssistanceDispatch,
    DeliveryCreation,
}

impl WorkflowKind {
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowKind::Reallocation => "reallocation",
            WorkflowKind::AssistanceDispatch => "assistance_dispatch",
            WorkflowKind::DeliveryCreation => "delivery_creation",
        }
    }
}

/// The request a session was opened for, with the coordinates resolved at
/// intake so resolution does not need to look them up again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowSubject {
    Reallocation {
        vehicle_id: VehicleId,
        source: GeoPoint,
        required_capacity: u8,
    },
    AssistanceDispatch {
        vehicle_id: VehicleId,
        position: GeoPoint,
    },
    DeliveryCreation {
        request: DeliveryRequest,
        pickup: Option<GeoPoint>,
        dropoff: Option<GeoPoint>,
    },
}

impl WorkflowSubject {
    pub fn kind(&self) -> WorkflowKind {
        match self {
            WorkflowSubject::Reallocation { .. } => WorkflowKind::Reallocation,
            WorkflowSubject::AssistanceDispatch { .. } => WorkflowKind::AssistanceDispatch,
            WorkflowSubject::DeliveryCreation { .. } => WorkflowKind::DeliveryCreation,
        }
    }

    /// Vehicle the request belongs to, if any.
    pub fn origin(&self) -> Option<&VehicleId> {
        match self {
            WorkflowSubject::Reallocation { vehicle_id, .. }
            | WorkflowSubject::AssistanceDispatch { vehicle_id, .. } => Some(vehicle_id),
            WorkflowSubject::DeliveryCreation { .. } => None,
        }
    }

    /// Free capacity the selected vehicle must still have at approval.
    pub fn required_capacity(&self) -> u8 {
        match self {
            WorkflowSubject::Reallocation {
                required_capacity, ..
            } => *required_capacity,
            WorkflowSubject::AssistanceDispatch { .. } => 0,
            WorkflowSubject::DeliveryCreation { request, .. } => request.required_capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    Pending,
    Processing { progress: u8 },
    Resolved,
}

impl SessionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Pending => "pending",
            SessionPhase::Processing { .. } => "processing",
            SessionPhase::Resolved => "resolved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced { progress: u8 },
    /// Returned by the one tick that reached 100.
    Resolved,
}

/// Side effects recorded once a session resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub route: Option<RoutePlan>,
    /// Vehicle record after the fleet mutation was applied.
    pub vehicle: Option<Vehicle>,
    /// Set when the fleet mutation could not be applied.
    pub error: Option<String>,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {session} is {phase}, expected pending")]
    NotPending {
        session: SessionId,
        phase: &'static str,
    },
    #[error("session {session} is {phase}, expected processing")]
    NotProcessing {
        session: SessionId,
        phase: &'static str,
    },
    #[error("session {0} has no selected vehicle")]
    NoSelection(SessionId),
    #[error("vehicle {vehicle} is not a candidate of session {session}")]
    UnknownCandidate {
        session: SessionId,
        vehicle: VehicleId,
    },
    #[error("progress increment must be between 1 and 100, got {0}")]
    InvalidIncrement(u8),
    #[error("session {0} is no longer open")]
    Closed(SessionId),
}

/// One workflow instance with its candidate list and approval state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSession {
    pub id: SessionId,
    pub kind: WorkflowKind,
    pub subject: WorkflowSubject,
    pub candidates: Vec<Candidate>,
    pub assignment: Option<DeliveryAssignment>,
    pub found: bool,
    pub reason: Option<String>,
    pub selected: Option<VehicleId>,
    pub phase: SessionPhase,
    pub created_at: DateTime<Utc>,
    pub resolution: Option<Resolution>,
}

impl WorkflowSession {
    /// Session backed by a ranked candidate list.
    pub fn ranked(id: SessionId, subject: WorkflowSubject, candidates: Vec<Candidate>) -> Self {
        let found = !candidates.is_empty();
        Self {
            id,
            kind: subject.kind(),
            subject,
            candidates,
            assignment: None,
            found,
            reason: (!found).then(|| NO_CANDIDATES.to_string()),
            selected: None,
            phase: SessionPhase::Pending,
            created_at: Utc::now(),
            resolution: None,
        }
    }

    /// Delivery session; a matched vehicle starts out selected.
    pub fn delivery(id: SessionId, subject: WorkflowSubject, outcome: DeliveryMatch) -> Self {
        let (assignment, reason) = match outcome {
            DeliveryMatch::Matched(assignment) => (Some(assignment), None),
            DeliveryMatch::Unmatched { reason } => (None, Some(reason)),
        };
        Self {
            id,
            kind: subject.kind(),
            subject,
            candidates: Vec::new(),
            selected: assignment.as_ref().map(|a| a.vehicle_id.clone()),
            found: assignment.is_some(),
            assignment,
            reason,
            phase: SessionPhase::Pending,
            created_at: Utc::now(),
            resolution: None,
        }
    }

    pub fn progress(&self) -> u8 {
        match self.phase {
            SessionPhase::Pending => 0,
            SessionPhase::Processing { progress } => progress,
            SessionPhase::Resolved => 100,
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.phase, SessionPhase::Processing { .. })
    }

    /// Resolved, with the fleet update still in flight.
    pub fn is_settling(&self) -> bool {
        self.phase == SessionPhase::Resolved && self.resolution.is_none()
    }

    /// Whether the session still has exclusive use of its vehicles.
    pub fn holds_vehicles(&self) -> bool {
        self.is_processing() || self.is_settling()
    }

    pub fn is_candidate(&self, vehicle: &VehicleId) -> bool {
        self.candidates
            .iter()
            .any(|candidate| &candidate.vehicle_id == vehicle)
            || self
                .assignment
                .as_ref()
                .is_some_and(|assignment| &assignment.vehicle_id == vehicle)
    }

    /// Vehicles this session would mutate once processing starts.
    pub fn involved_vehicles(&self) -> Vec<&VehicleId> {
        self.subject
            .origin()
            .into_iter()
            .chain(self.selected.as_ref())
            .collect()
    }

    /// Switch the selected candidate. Fleet state is untouched.
    pub fn select(&mut self, vehicle: VehicleId) -> Result<(), SessionError> {
        self.ensure_pending()?;
        if !self.is_candidate(&vehicle) {
            return Err(SessionError::UnknownCandidate {
                session: self.id.clone(),
                vehicle,
            });
        }
        self.selected = Some(vehicle);
        Ok(())
    }

    /// Commit the current selection and start processing at 0%.
    pub fn approve(&mut self) -> Result<VehicleId, SessionError> {
        self.ensure_pending()?;
        let selected = self
            .selected
            .clone()
            .ok_or_else(|| SessionError::NoSelection(self.id.clone()))?;
        self.phase = SessionPhase::Processing { progress: 0 };
        Ok(selected)
    }

    /// Drop the current selection. The session stays pending so another
    /// candidate can be chosen.
    pub fn deny(&mut self) -> Result<(), SessionError> {
        self.ensure_pending()?;
        self.selected = None;
        Ok(())
    }

    /// Advance the progress counter, saturating at 100. The tick that reaches
    /// 100 moves the session to `Resolved`; any later tick is rejected.
    pub fn tick(&mut self, increment: u8) -> Result<TickOutcome, SessionError> {
        if increment == 0 || increment > 100 {
            return Err(SessionError::InvalidIncrement(increment));
        }
        let SessionPhase::Processing { progress } = self.phase else {
            return Err(SessionError::NotProcessing {
                session: self.id.clone(),
                phase: self.phase.label(),
            });
        };

        let next = progress.saturating_add(increment).min(100);
        if next == 100 {
            self.phase = SessionPhase::Resolved;
            Ok(TickOutcome::Resolved)
        } else {
            self.phase = SessionPhase::Processing { progress: next };
            Ok(TickOutcome::Advanced { progress: next })
        }
    }

    pub fn record_resolution(&mut self, resolution: Resolution) {
        self.resolution = Some(resolution);
    }

    fn ensure_pending(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Pending => Ok(()),
            phase => Err(SessionError::NotPending {
                session: self.id.clone(),
                phase: phase.label(),
            }),
        }
    }
}
