use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use super::domain::{AssistanceRequest, ReallocationRequest};
use crate::config::SessionConfig;
use crate::fleet::{ensure_can_carry, FleetError, FleetStore, Vehicle, VehicleId};
use crate::geo::{plan_route, LocationResolver, RoutePlan, RouteProvider};
use crate::workflows::matching::{match_delivery, DeliveryRequest, MatchRequest, MatchingEngine};
use crate::workflows::session::{
    ProgressDriver, ProgressTicker, Resolution, SessionError, SessionId, TickOutcome,
    WorkflowSession, WorkflowSubject,
};

struct SessionEntry {
    session: WorkflowSession,
    ticker: Option<ProgressTicker>,
}

/// Service composing the fleet store, matching engine, and external
/// location collaborators around the open workflow sessions.
pub struct DispatchService {
    fleet: Arc<FleetStore>,
    engine: MatchingEngine,
    routes: Arc<dyn RouteProvider>,
    resolver: LocationResolver,
    config: SessionConfig,
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
    sequence: AtomicU64,
}

impl DispatchService {
    pub fn new(
        fleet: Arc<FleetStore>,
        engine: MatchingEngine,
        routes: Arc<dyn RouteProvider>,
        resolver: LocationResolver,
        config: SessionConfig,
    ) -> Self {
        Self {
            fleet,
            engine,
            routes,
            resolver,
            config,
            sessions: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn fleet(&self) -> &Arc<FleetStore> {
        &self.fleet
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    /// Rank responders for the load of `request.vehicle_id`.
    pub fn start_reallocation(
        &self,
        request: ReallocationRequest,
    ) -> Result<WorkflowSession, DispatchError> {
        let vehicle = self.fleet.get(&request.vehicle_id)?;
        if !vehicle.is_delayed() {
            return Err(FleetError::NotDelayed(vehicle.id).into());
        }
        let source = request.source.unwrap_or(vehicle.position);
        let candidates = self.engine.rank(
            &MatchRequest {
                source,
                required_capacity: request.required_capacity,
                origin: Some(vehicle.id.clone()),
            },
            &self.fleet.snapshot()?,
        );

        let session = WorkflowSession::ranked(
            self.next_session_id(),
            WorkflowSubject::Reallocation {
                vehicle_id: vehicle.id,
                source,
                required_capacity: request.required_capacity,
            },
            candidates,
        );
        info!(
            session = %session.id,
            vehicle = %request.vehicle_id,
            candidates = session.candidates.len(),
            "reallocation session opened"
        );
        Ok(self.insert(session))
    }

    /// Rank responders for a stranded vehicle. Responders carry no load, so
    /// the capacity gate is open.
    pub fn start_assistance(
        &self,
        request: AssistanceRequest,
    ) -> Result<WorkflowSession, DispatchError> {
        let vehicle = self.fleet.get(&request.vehicle_id)?;
        if !vehicle.needs_assistance() {
            return Err(FleetError::NoAssistanceRequested(vehicle.id).into());
        }

        let candidates = self.engine.rank(
            &MatchRequest {
                source: vehicle.position,
                required_capacity: 0,
                origin: Some(vehicle.id.clone()),
            },
            &self.fleet.snapshot()?,
        );

        let session = WorkflowSession::ranked(
            self.next_session_id(),
            WorkflowSubject::AssistanceDispatch {
                vehicle_id: vehicle.id,
                position: vehicle.position,
            },
            candidates,
        );
        info!(
            session = %session.id,
            vehicle = %request.vehicle_id,
            candidates = session.candidates.len(),
            "assistance session opened"
        );
        Ok(self.insert(session))
    }

    /// Resolve both ends of a new delivery and pick a vehicle for it.
    pub async fn start_delivery(
        &self,
        request: DeliveryRequest,
    ) -> Result<WorkflowSession, DispatchError> {
        let pickup = self.resolver.resolve(&request.pickup).await;
        let dropoff = self.resolver.resolve(&request.dropoff).await;
        let outcome = match_delivery(&self.fleet.snapshot()?, &request, pickup);

        let session = WorkflowSession::delivery(
            self.next_session_id(),
            WorkflowSubject::DeliveryCreation {
                request,
                pickup,
                dropoff,
            },
            outcome,
        );
        info!(
            session = %session.id,
            found = session.found,
            tier = ?session.assignment.as_ref().map(|assignment| assignment.tier),
            "delivery session opened"
        );
        Ok(self.insert(session))
    }

    pub fn get(&self, id: &SessionId) -> Result<WorkflowSession, DispatchError> {
        let sessions = self.lock();
        sessions
            .get(id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| DispatchError::SessionNotFound(id.clone()))
    }

    /// Open sessions ordered by id.
    pub fn sessions(&self) -> Vec<WorkflowSession> {
        let mut sessions: Vec<_> = self
            .lock()
            .values()
            .map(|entry| entry.session.clone())
            .collect();
        sessions.sort_by(|a, b| a.id.cmp(&b.id));
        sessions
    }

    pub fn select(
        &self,
        id: &SessionId,
        vehicle: VehicleId,
    ) -> Result<WorkflowSession, DispatchError> {
        let mut sessions = self.lock();
        let entry = entry_mut(&mut sessions, id)?;
        entry.session.select(vehicle)?;
        Ok(entry.session.clone())
    }

    pub fn deny(&self, id: &SessionId) -> Result<WorkflowSession, DispatchError> {
        let mut sessions = self.lock();
        let entry = entry_mut(&mut sessions, id)?;
        entry.session.deny()?;
        info!(session = %id, "selection denied");
        Ok(entry.session.clone())
    }

    /// Commit the selection and start the progress ticker.
    ///
    /// Rejected while any vehicle the session touches is held by another
    /// session, and when the selected vehicle is no longer active or no
    /// longer has room for the load it was ranked for. Assistance responders
    /// are dispatched here, before processing starts.
    pub fn approve(self: &Arc<Self>, id: &SessionId) -> Result<WorkflowSession, DispatchError> {
        let mut sessions = self.lock();
        let current = sessions
            .get(id)
            .ok_or_else(|| DispatchError::SessionNotFound(id.clone()))?;

        let mut next = current.session.clone();
        let selected = next.approve()?;
        ensure_vehicles_free(&sessions, &next)?;
        ensure_can_carry(&self.fleet.get(&selected)?, next.subject.required_capacity())?;

        if let WorkflowSubject::AssistanceDispatch { vehicle_id, .. } = &next.subject {
            self.fleet.dispatch_assistance(vehicle_id, &selected)?;
        }

        let ticker = ProgressTicker::spawn(id.clone(), self.config, Arc::clone(self));
        let entry = entry_mut(&mut sessions, id)?;
        entry.session = next;
        entry.ticker = Some(ticker);

        info!(session = %id, vehicle = %selected, kind = entry.session.kind.label(), "session approved");
        Ok(entry.session.clone())
    }

    /// Close a session, cancelling its ticker if one is running. A session
    /// whose fleet update is still being applied cannot be closed.
    pub fn abandon(&self, id: &SessionId) -> Result<WorkflowSession, DispatchError> {
        let mut sessions = self.lock();
        if entry_mut(&mut sessions, id)?.session.is_settling() {
            return Err(DispatchError::ResolutionPending(id.clone()));
        }
        let entry = sessions
            .remove(id)
            .ok_or_else(|| DispatchError::SessionNotFound(id.clone()))?;
        if let Some(ticker) = &entry.ticker {
            ticker.abort();
        }
        info!(session = %id, phase = entry.session.phase.label(), "session abandoned");
        Ok(entry.session)
    }

    /// Wait for a processing session's ticker to finish and return the
    /// session as it stands afterwards.
    pub async fn wait(&self, id: &SessionId) -> Result<WorkflowSession, DispatchError> {
        let ticker = {
            let mut sessions = self.lock();
            entry_mut(&mut sessions, id)?.ticker.take()
        };
        if let Some(ticker) = ticker {
            if let Err(error) = ticker.join().await {
                warn!(session = %id, %error, "progress ticker did not complete");
            }
        }
        self.get(id)
    }

    fn insert(&self, session: WorkflowSession) -> WorkflowSession {
        self.lock().insert(
            session.id.clone(),
            SessionEntry {
                session: session.clone(),
                ticker: None,
            },
        );
        session
    }

    fn next_session_id(&self) -> SessionId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        SessionId(format!("wf-{id:06}"))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn settle(&self, session: &WorkflowSession) -> Resolution {
        let mut route = None;
        let outcome = self.apply(session, &mut route).await;
        let resolved_at = Utc::now();
        match outcome {
            Ok(vehicle) => Resolution {
                route,
                vehicle: Some(vehicle),
                error: None,
                resolved_at,
            },
            Err(error) => {
                warn!(session = %session.id, %error, "resolved session could not update the fleet");
                Resolution {
                    route,
                    vehicle: None,
                    error: Some(error.to_string()),
                    resolved_at,
                }
            }
        }
    }

    async fn apply(
        &self,
        session: &WorkflowSession,
        route: &mut Option<RoutePlan>,
    ) -> Result<Vehicle, DispatchError> {
        let selected = session
            .selected
            .as_ref()
            .ok_or_else(|| SessionError::NoSelection(session.id.clone()))?;
        let unit = self.fleet.get(selected)?;

        match &session.subject {
            WorkflowSubject::Reallocation {
                vehicle_id,
                source,
                required_capacity,
            } => {
                let plan = plan_route(self.routes.as_ref(), *source, unit.position).await;
                let points = plan.points.clone();
                *route = Some(plan);
                Ok(self
                    .fleet
                    .approve_reallocation(vehicle_id, selected, *required_capacity, points)?)
            }
            WorkflowSubject::AssistanceDispatch {
                vehicle_id,
                position,
            } => {
                let plan = plan_route(self.routes.as_ref(), unit.position, *position).await;
                let points = plan.points.clone();
                *route = Some(plan);
                self.fleet.complete_assistance(vehicle_id, points)?;
                Ok(self.fleet.get(selected)?)
            }
            WorkflowSubject::DeliveryCreation {
                request,
                pickup,
                dropoff,
            } => {
                let from = pickup.unwrap_or(unit.position);
                let points = match dropoff {
                    Some(to) => {
                        let plan = plan_route(self.routes.as_ref(), from, *to).await;
                        let points = plan.points.clone();
                        *route = Some(plan);
                        points
                    }
                    None => {
                        warn!(session = %session.id, dropoff = %request.dropoff, "dropoff unresolved; no route attached");
                        Vec::new()
                    }
                };
                Ok(self.fleet.merge_delivery_route(
                    selected,
                    &request.dropoff,
                    request.required_capacity,
                    points,
                )?)
            }
        }
    }
}

#[async_trait]
impl ProgressDriver for DispatchService {
    fn advance(&self, session: &SessionId, increment: u8) -> Result<TickOutcome, SessionError> {
        let mut sessions = self.lock();
        let entry = sessions
            .get_mut(session)
            .ok_or_else(|| SessionError::Closed(session.clone()))?;
        entry.session.tick(increment)
    }

    async fn resolved(&self, session: &SessionId) {
        let Ok(snapshot) = self.get(session) else {
            return;
        };

        let resolution = self.settle(&snapshot).await;
        info!(
            session = %session,
            route = ?resolution.route.as_ref().map(|plan| plan.source),
            applied = resolution.error.is_none(),
            "session resolved"
        );

        if let Some(entry) = self.lock().get_mut(session) {
            entry.session.record_resolution(resolution);
        }
    }
}

fn entry_mut<'a>(
    sessions: &'a mut HashMap<SessionId, SessionEntry>,
    id: &SessionId,
) -> Result<&'a mut SessionEntry, DispatchError> {
    sessions
        .get_mut(id)
        .ok_or_else(|| DispatchError::SessionNotFound(id.clone()))
}

fn ensure_vehicles_free(
    sessions: &HashMap<SessionId, SessionEntry>,
    candidate: &WorkflowSession,
) -> Result<(), DispatchError> {
    let involved = candidate.involved_vehicles();
    let busy = sessions
        .values()
        .filter(|entry| entry.session.id != candidate.id && entry.session.holds_vehicles())
        .find_map(|entry| {
            entry
                .session
                .involved_vehicles()
                .into_iter()
                .find(|vehicle| involved.contains(vehicle))
                .map(|vehicle| (vehicle.clone(), entry.session.id.clone()))
        });

    match busy {
        Some((vehicle, session)) => Err(DispatchError::VehicleBusy { vehicle, session }),
        None => Ok(()),
    }
}

/// Error raised by the dispatch service.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Fleet(#[from] FleetError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("session {0} is still applying its resolution")]
    ResolutionPending(SessionId),
    #[error("vehicle {vehicle} is already being processed by session {session}")]
    VehicleBusy {
        vehicle: VehicleId,
        session: SessionId,
    },
}
