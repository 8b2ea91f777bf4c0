use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    AttendanceRecord, Camp, CampDay, CampDayCompensationSnapshot, CampDayId, CampId,
    CompensationPlan, PayoutAmounts, PerformanceMetrics, PlanCode, PlanParameters, Registration,
    SessionCompensation, SessionKey, SnapshotKey, TenantId,
};
use super::repository::{
    CampRoster, DailySnapshotRepository, PlanRepository, RepositoryError,
    SessionCompensationRepository,
};

#[derive(Default)]
struct StoreState {
    plans: BTreeMap<PlanCode, CompensationPlan>,
    sessions: BTreeMap<SessionKey, SessionCompensation>,
    snapshots: BTreeMap<SnapshotKey, CampDayCompensationSnapshot>,
    camps: HashMap<CampId, Camp>,
    camp_days: HashMap<CampDayId, CampDay>,
    attendance: HashMap<CampDayId, Vec<AttendanceRecord>>,
    registrations: HashMap<CampId, Vec<Registration>>,
}

/// Process-local store backing every compensation repository.
///
/// A single mutex guards all tables, so upserts on the composite keys resolve concurrent
/// creates to one row.
#[derive(Default, Clone)]
pub struct InMemoryCompensationStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryCompensationStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("compensation store lock poisoned".into()))
    }

    pub fn add_camp(&self, camp: Camp) -> Result<(), RepositoryError> {
        self.lock()?.camps.insert(camp.camp_id.clone(), camp);
        Ok(())
    }

    pub fn add_camp_day(&self, day: CampDay) -> Result<(), RepositoryError> {
        self.lock()?.camp_days.insert(day.camp_day_id.clone(), day);
        Ok(())
    }

    pub fn record_attendance(&self, record: AttendanceRecord) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let day = state.attendance.entry(record.camp_day_id.clone()).or_default();
        match day
            .iter_mut()
            .find(|existing| existing.registration_id == record.registration_id)
        {
            Some(existing) => *existing = record,
            None => day.push(record),
        }
        Ok(())
    }

    pub fn add_registration(&self, registration: Registration) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let camp = state
            .registrations
            .entry(registration.camp_id.clone())
            .or_default();
        match camp
            .iter_mut()
            .find(|existing| existing.registration_id == registration.registration_id)
        {
            Some(existing) => *existing = registration,
            None => camp.push(registration),
        }
        Ok(())
    }
}

impl PlanRepository for InMemoryCompensationStore {
    fn fetch_plan(&self, code: &PlanCode) -> Result<Option<CompensationPlan>, RepositoryError> {
        Ok(self.lock()?.plans.get(code).cloned())
    }

    fn save_plan(&self, plan: CompensationPlan) -> Result<CompensationPlan, RepositoryError> {
        self.lock()?
            .plans
            .insert(plan.plan_code.clone(), plan.clone());
        Ok(plan)
    }

    fn list_plans(&self) -> Result<Vec<CompensationPlan>, RepositoryError> {
        Ok(self.lock()?.plans.values().cloned().collect())
    }
}

impl SessionCompensationRepository for InMemoryCompensationStore {
    fn fetch_session(
        &self,
        key: &SessionKey,
    ) -> Result<Option<SessionCompensation>, RepositoryError> {
        Ok(self.lock()?.sessions.get(key).cloned())
    }

    fn create_session(
        &self,
        record: SessionCompensation,
    ) -> Result<SessionCompensation, RepositoryError> {
        let mut state = self.lock()?;
        let key = record.key();
        if state.sessions.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        state.sessions.insert(key, record.clone());
        Ok(record)
    }

    fn refresh_plan_snapshot(
        &self,
        key: &SessionKey,
        plan_code: PlanCode,
        plan: PlanParameters,
        updated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError> {
        let mut state = self.lock()?;
        let record = open_session(&mut state, key)?;
        record.plan_code = plan_code;
        record.plan = plan;
        record.updated_at = updated_at;
        Ok(record.clone())
    }

    fn update_metrics(
        &self,
        key: &SessionKey,
        metrics: PerformanceMetrics,
        updated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError> {
        let mut state = self.lock()?;
        let record = open_session(&mut state, key)?;
        record.metrics = metrics;
        record.updated_at = updated_at;
        Ok(record.clone())
    }

    fn finalize_session(
        &self,
        key: &SessionKey,
        metrics: PerformanceMetrics,
        payout: PayoutAmounts,
        calculated_at: DateTime<Utc>,
    ) -> Result<SessionCompensation, RepositoryError> {
        let mut state = self.lock()?;
        let record = open_session(&mut state, key)?;
        record.metrics = metrics;
        record.payout = payout;
        record.calculated_at = Some(calculated_at);
        record.is_finalized = true;
        record.updated_at = calculated_at;
        Ok(record.clone())
    }

    fn sessions_for_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<SessionCompensation>, RepositoryError> {
        Ok(self
            .lock()?
            .sessions
            .values()
            .filter(|record| &record.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn all_sessions(&self) -> Result<Vec<SessionCompensation>, RepositoryError> {
        Ok(self.lock()?.sessions.values().cloned().collect())
    }
}

// Looked up and checked under the caller's lock so a finalize cannot slip in between.
fn open_session<'a>(
    state: &'a mut StoreState,
    key: &SessionKey,
) -> Result<&'a mut SessionCompensation, RepositoryError> {
    let record = state
        .sessions
        .get_mut(key)
        .ok_or(RepositoryError::NotFound)?;
    if record.is_finalized {
        return Err(RepositoryError::Finalized);
    }
    Ok(record)
}

impl DailySnapshotRepository for InMemoryCompensationStore {
    fn fetch_snapshot(
        &self,
        key: &SnapshotKey,
    ) -> Result<Option<CampDayCompensationSnapshot>, RepositoryError> {
        Ok(self.lock()?.snapshots.get(key).cloned())
    }

    fn upsert_snapshot(
        &self,
        snapshot: CampDayCompensationSnapshot,
    ) -> Result<CampDayCompensationSnapshot, RepositoryError> {
        let key = SnapshotKey {
            camp_day_id: snapshot.camp_day_id.clone(),
            staff_profile_id: snapshot.staff_profile_id.clone(),
        };
        self.lock()?.snapshots.insert(key, snapshot.clone());
        Ok(snapshot)
    }

    fn snapshots_for_session(
        &self,
        key: &SessionKey,
    ) -> Result<Vec<CampDayCompensationSnapshot>, RepositoryError> {
        Ok(self
            .lock()?
            .snapshots
            .values()
            .filter(|snapshot| {
                snapshot.camp_id == key.camp_id && snapshot.staff_profile_id == key.staff_profile_id
            })
            .cloned()
            .collect())
    }
}

impl CampRoster for InMemoryCompensationStore {
    fn camp(&self, camp_id: &CampId) -> Result<Option<Camp>, RepositoryError> {
        Ok(self.lock()?.camps.get(camp_id).cloned())
    }

    fn camp_day(&self, camp_day_id: &CampDayId) -> Result<Option<CampDay>, RepositoryError> {
        Ok(self.lock()?.camp_days.get(camp_day_id).cloned())
    }

    fn attendance_for_day(
        &self,
        camp_day_id: &CampDayId,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        Ok(self
            .lock()?
            .attendance
            .get(camp_day_id)
            .cloned()
            .unwrap_or_default())
    }

    fn registrations_for_camp(
        &self,
        camp_id: &CampId,
    ) -> Result<Vec<Registration>, RepositoryError> {
        Ok(self
            .lock()?
            .registrations
            .get(camp_id)
            .cloned()
            .unwrap_or_default())
    }
}
