//! In-memory backend and fixtures shared by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::domain::{DeveloperId, Gender, LevelId};
use tokio::sync::Notify;

use crate::{
    entity::{
        Developer, DeveloperFields, DeveloperRoster, Fetched, Level, LevelCatalog, LevelFields,
        LevelOption,
    },
    error::GatewayError,
    gateway::EntityGateway,
    notify::{NotificationSink, RecordingNotifier},
};

pub(crate) fn level(id: i64, name: &str) -> Level {
    Level {
        id: LevelId(id),
        name: name.to_string(),
        developer_count: 0,
    }
}

pub(crate) fn developer(id: i64, level_id: i64) -> Developer {
    Developer {
        id: DeveloperId(id),
        level_id: LevelId(level_id),
        name: format!("Developer {id}"),
        gender: Gender::Male,
        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 15).expect("date"),
        age: 34,
        hobby: "chess".to_string(),
    }
}

pub(crate) fn recorder() -> (Arc<RecordingNotifier>, Arc<dyn NotificationSink>) {
    let recorder = Arc::new(RecordingNotifier::default());
    let sink: Arc<dyn NotificationSink> = recorder.clone();
    (recorder, sink)
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub(crate) levels: Vec<Level>,
    pub(crate) developers: Vec<Developer>,
    /// Embed developers in the level list response.
    pub(crate) nested: bool,
    pub(crate) next_id: i64,
    pub(crate) fail_next: Option<GatewayError>,
    pub(crate) fail_call: Option<(String, GatewayError)>,
    pub(crate) calls: Vec<String>,
}

/// Backend double that applies writes to its own state and logs each call as
/// `"<METHOD> <path>"`.
#[derive(Default)]
pub(crate) struct FakeGateway {
    state: Mutex<FakeState>,
    gate: Mutex<Option<Arc<Notify>>>,
    read_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeGateway {
    pub(crate) fn with(levels: Vec<Level>, developers: Vec<Developer>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                levels,
                developers,
                next_id: 100,
                ..FakeState::default()
            }),
            gate: Mutex::new(None),
            read_gate: Mutex::new(None),
        })
    }

    pub(crate) fn nested(self: Arc<Self>) -> Arc<Self> {
        self.state.lock().expect("state").nested = true;
        self
    }

    pub(crate) fn set_next_id(&self, id: i64) {
        self.state.lock().expect("state").next_id = id;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().expect("state").calls.clone()
    }

    pub(crate) fn fail_next(&self, err: GatewayError) {
        self.state.lock().expect("state").fail_next = Some(err);
    }

    /// Fails the first call logged as `call`.
    pub(crate) fn fail_call(&self, call: &str, err: GatewayError) {
        self.state.lock().expect("state").fail_call = Some((call.to_string(), err));
    }

    /// Holds every write until the returned `Notify` fires.
    pub(crate) fn hold_writes(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().expect("gate") = Some(notify.clone());
        notify
    }

    /// Holds the next level list until the returned `Notify` fires.
    pub(crate) fn hold_level_list(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.read_gate.lock().expect("gate") = Some(notify.clone());
        notify
    }

    pub(crate) fn remove_developer_server_side(&self, id: i64) {
        self.state
            .lock()
            .expect("state")
            .developers
            .retain(|developer| developer.id != DeveloperId(id));
    }

    fn begin(&self, call: String) -> Result<(), GatewayError> {
        let mut state = self.state.lock().expect("state");
        if state
            .fail_call
            .as_ref()
            .is_some_and(|(failing, _)| *failing == call)
        {
            state.calls.push(call);
            return match state.fail_call.take() {
                Some((_, err)) => Err(err),
                None => Ok(()),
            };
        }
        state.calls.push(call);
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn write_gate(&self) {
        let gate = self.gate.lock().expect("gate").clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn next_id(&self) -> i64 {
        let mut state = self.state.lock().expect("state");
        state.next_id += 1;
        state.next_id
    }
}

pub(crate) fn not_found(path: &str) -> GatewayError {
    GatewayError::NotFound {
        url: format!("http://fake/{path}"),
        message: Some(format!("{path} not found")),
    }
}

#[async_trait]
impl EntityGateway<Level> for FakeGateway {
    async fn list(&self) -> Result<Fetched<Level>, GatewayError> {
        self.begin("GET levels".into())?;
        let gate = self.read_gate.lock().expect("gate").take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let state = self.state.lock().expect("state");
        let roster = state
            .nested
            .then(|| DeveloperRoster::from_developers(&state.developers));
        Ok(Fetched::new(state.levels.clone()).with_context(roster))
    }

    async fn fetch_context(&self) -> Result<DeveloperRoster, GatewayError> {
        self.begin("GET developers".into())?;
        Ok(DeveloperRoster::from_developers(
            &self.state.lock().expect("state").developers,
        ))
    }

    async fn create(&self, fields: &LevelFields) -> Result<Level, GatewayError> {
        self.begin("POST levels".into())?;
        self.write_gate().await;
        let created = level(self.next_id(), &fields.name);
        self.state
            .lock()
            .expect("state")
            .levels
            .push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: LevelId, fields: &LevelFields) -> Result<Level, GatewayError> {
        self.begin(format!("PUT levels/{id}"))?;
        self.write_gate().await;
        let mut state = self.state.lock().expect("state");
        let stored = state
            .levels
            .iter_mut()
            .find(|level| level.id == id)
            .ok_or_else(|| not_found(&format!("levels/{id}")))?;
        stored.name = fields.name.clone();
        Ok(stored.clone())
    }

    async fn delete(&self, id: LevelId) -> Result<(), GatewayError> {
        self.begin(format!("DELETE levels/{id}"))?;
        let mut state = self.state.lock().expect("state");
        let before = state.levels.len();
        state.levels.retain(|level| level.id != id);
        if state.levels.len() == before {
            return Err(not_found(&format!("levels/{id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityGateway<Developer> for FakeGateway {
    async fn list(&self) -> Result<Fetched<Developer>, GatewayError> {
        self.begin("GET developers".into())?;
        Ok(Fetched::new(
            self.state.lock().expect("state").developers.clone(),
        ))
    }

    async fn fetch_context(&self) -> Result<LevelCatalog, GatewayError> {
        self.begin("GET levels".into())?;
        let state = self.state.lock().expect("state");
        Ok(LevelCatalog(
            state
                .levels
                .iter()
                .map(|level| LevelOption {
                    id: level.id,
                    name: level.name.clone(),
                })
                .collect(),
        ))
    }

    async fn create(&self, fields: &DeveloperFields) -> Result<Developer, GatewayError> {
        self.begin("POST developers".into())?;
        self.write_gate().await;
        let created = Developer {
            id: DeveloperId(self.next_id()),
            level_id: fields.level_id,
            name: fields.name.clone(),
            gender: fields.gender,
            date_of_birth: fields.date_of_birth,
            age: fields.age,
            hobby: fields.hobby.clone(),
        };
        self.state
            .lock()
            .expect("state")
            .developers
            .push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: DeveloperId,
        fields: &DeveloperFields,
    ) -> Result<Developer, GatewayError> {
        self.begin(format!("PUT developers/{id}"))?;
        self.write_gate().await;
        let mut state = self.state.lock().expect("state");
        let stored = state
            .developers
            .iter_mut()
            .find(|developer| developer.id == id)
            .ok_or_else(|| not_found(&format!("developers/{id}")))?;
        stored.level_id = fields.level_id;
        stored.name = fields.name.clone();
        stored.gender = fields.gender;
        stored.date_of_birth = fields.date_of_birth;
        stored.age = fields.age;
        stored.hobby = fields.hobby.clone();
        Ok(stored.clone())
    }

    async fn delete(&self, id: DeveloperId) -> Result<(), GatewayError> {
        self.begin(format!("DELETE developers/{id}"))?;
        let mut state = self.state.lock().expect("state");
        let before = state.developers.len();
        state.developers.retain(|developer| developer.id != id);
        if state.developers.len() == before {
            return Err(not_found(&format!("developers/{id}")));
        }
        Ok(())
    }
}
