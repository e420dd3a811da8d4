//! RPC method handlers organized by domain.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use worktrack_core::{
    render, Category, Effect, Outcome, SessionId, SubCategoryCatalog, SubCategoryOption,
    TaskDraft, TaskId, TaskSnapshot, UiEvent, UiSession,
};
use worktrack_store::{Database, Filter, Patch, SubCategoryRepo, TaskCollection, TaskRepo};

use crate::client::ClientRegistry;
use crate::errors::HandlerError;
use crate::event_bridge::TrackerEvent;
use crate::health;
use crate::rpc::{self, RpcResponse};

/// Source of "today" for date rules.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

type HandlerResult = Result<Value, HandlerError>;

/// Shared state available to all RPC handlers.
pub struct HandlerState {
    pub db: Database,
    pub tasks: TaskRepo,
    pub subcategories: SubCategoryRepo,
    pub catalog: Arc<SubCategoryCatalog>,
    /// One UI session per open page.
    pub sessions: DashMap<SessionId, UiSession>,
    pub events: broadcast::Sender<TrackerEvent>,
    pub clients: Arc<ClientRegistry>,
    pub started_at: Instant,
    clock: Clock,
}

impl HandlerState {
    pub fn new(
        db: Database,
        catalog: Arc<SubCategoryCatalog>,
        clients: Arc<ClientRegistry>,
        events: broadcast::Sender<TrackerEvent>,
    ) -> Self {
        Self {
            tasks: TaskRepo::new(db.clone()),
            subcategories: SubCategoryRepo::new(db.clone()),
            db,
            catalog,
            sessions: DashMap::new(),
            events,
            clients,
            started_at: Instant::now(),
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the local-date clock.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    fn publish(&self, event: TrackerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish_counts(&self) {
        match self.tasks.counts() {
            Ok(counts) => self.publish(TrackerEvent::tasks_changed(counts)),
            Err(e) => warn!(error = %e, "could not read counts for change notification"),
        }
    }

    /// Fresh read of storage for one render.
    fn snapshot(&self, list_visible: bool) -> Result<TaskSnapshot, HandlerError> {
        Ok(TaskSnapshot {
            counts: self.tasks.counts()?,
            tasks: if list_visible {
                self.tasks.list_all()?
            } else {
                Vec::new()
            },
        })
    }

    fn view(&self, session: &UiSession) -> HandlerResult {
        let snapshot = self.snapshot(session.list_visible)?;
        let view = render(session, &self.catalog, &snapshot, self.today());
        Ok(serde_json::to_value(view)?)
    }

    /// Carry out a session effect and feed the result back into the session.
    fn run_effect(&self, session: &mut UiSession, effect: Effect) {
        match effect {
            Effect::Persist(record) => match self.tasks.insert(&record) {
                Ok(_) => {
                    session.record_persisted();
                    self.publish_counts();
                }
                Err(e) => {
                    warn!(error = %e, task_id = %record.id, "task not stored");
                    session.record_failed(&e.to_string());
                }
            },
            Effect::AddSubCategory { category, name } => {
                match self.add_sub_category(category, &name) {
                    Ok((option, _)) => session.sub_category_added(&option),
                    Err(e) => session.sub_category_failed(&e.to_string()),
                }
            }
        }
    }

    /// Persist and announce genuinely new options, then add them to the
    /// catalog. A failed write leaves the catalog as it was.
    fn add_sub_category(
        &self,
        category: Category,
        name: &str,
    ) -> Result<(SubCategoryOption, bool), HandlerError> {
        let (option, new) = self.catalog.resolve(category, name)?;
        if !new {
            return Ok((option, false));
        }
        let _ = self.subcategories.add(category, &option)?;
        let (option, added) = self.catalog.add(category, &option.label)?;
        if added {
            info!(category = %category, key = %option.key, "sub-category added");
            self.publish(TrackerEvent::SubCategoryAdded {
                category,
                option: option.clone(),
            });
        }
        Ok((option, added))
    }
}

/// Dispatch an RPC method to the appropriate handler.
pub async fn dispatch(
    state: &Arc<HandlerState>,
    method: &str,
    params: &Value,
    id: Option<Value>,
) -> RpcResponse {
    let result = match method {
        // Form sessions
        "form.open" => form_open(state),
        "form.view" => form_view(state, params),
        "form.event" => form_event(state, params),
        "form.close" => form_close(state, params),

        // Tasks
        "tasks.list" => tasks_list(state),
        "tasks.count" => tasks_count(state),
        "tasks.create" => tasks_create(state, params),
        "tasks.update" => tasks_update(state, params),
        "tasks.delete" => tasks_delete(state, params),
        "tasks.complete" => tasks_complete(state, params),

        // Sub-categories
        "subcategory.list" => subcategory_list(state, params),
        "subcategory.add" => subcategory_add(state, params),

        // System
        "health" => health(state),

        _ => return RpcResponse::method_not_found(id, method),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(e) => e.into_response(id),
    }
}

fn session_id(params: &Value) -> Result<SessionId, HandlerError> {
    rpc::require_str(params, "sessionId")
        .map(SessionId::from_raw)
        .map_err(HandlerError::InvalidParams)
}

fn category_param(params: &Value) -> Result<Category, HandlerError> {
    rpc::require_str(params, "category")
        .map_err(HandlerError::InvalidParams)?
        .parse()
        .map_err(HandlerError::InvalidParams)
}

fn collection_param(params: &Value) -> Result<TaskCollection, HandlerError> {
    rpc::require_str(params, "collection")
        .map_err(HandlerError::InvalidParams)?
        .parse()
        .map_err(HandlerError::InvalidParams)
}

fn filter_param(params: &Value) -> Result<Filter, HandlerError> {
    Ok(Filter::from_json(params.get("filter").unwrap_or(&Value::Null))?)
}

// ── Form sessions ──────────────────────────────────────────────────────

fn form_open(state: &Arc<HandlerState>) -> HandlerResult {
    let session_id = SessionId::new();
    let session = UiSession::new(state.today());
    let view = state.view(&session)?;
    let _ = state.sessions.insert(session_id.clone(), session);
    debug!(session_id = %session_id, "form session opened");
    Ok(json!({ "sessionId": session_id, "view": view }))
}

fn form_view(state: &Arc<HandlerState>, params: &Value) -> HandlerResult {
    let session_id = session_id(params)?;
    let session = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| HandlerError::NotFound(format!("form session {session_id}")))?;
    Ok(json!({ "view": state.view(&session)? }))
}

#[instrument(skip_all, fields(session_id))]
fn form_event(state: &Arc<HandlerState>, params: &Value) -> HandlerResult {
    let session_id = session_id(params)?;
    let _ = tracing::Span::current().record("session_id", session_id.as_str());
    let event: UiEvent = serde_json::from_value(
        params
            .get("event")
            .cloned()
            .ok_or_else(|| HandlerError::InvalidParams("Missing required parameter: event".into()))?,
    )
    .map_err(|e| HandlerError::InvalidParams(format!("invalid event: {e}")))?;

    let mut session = state
        .sessions
        .get_mut(&session_id)
        .ok_or_else(|| HandlerError::NotFound(format!("form session {session_id}")))?;

    debug!(?event, "applying ui event");
    match session.apply(event, &state.catalog, state.today()) {
        Outcome::NoUpdate => return Ok(json!({ "updated": false })),
        Outcome::Updated => {}
        Outcome::Effect(effect) => state.run_effect(&mut session, effect),
    }
    Ok(json!({ "updated": true, "view": state.view(&session)? }))
}

fn form_close(state: &Arc<HandlerState>, params: &Value) -> HandlerResult {
    let session_id = session_id(params)?;
    let closed = state.sessions.remove(&session_id).is_some();
    Ok(json!({ "closed": closed }))
}

// ── Tasks ──────────────────────────────────────────────────────────────

fn tasks_list(state: &Arc<HandlerState>) -> HandlerResult {
    let tasks = state.tasks.list_all()?;
    let counts = state.tasks.counts()?;
    Ok(json!({ "tasks": tasks, "counts": counts }))
}

fn tasks_count(state: &Arc<HandlerState>) -> HandlerResult {
    let counts = state.tasks.counts()?;
    Ok(json!({
        "inProgress": counts.in_progress,
        "completed": counts.completed,
        "total": counts.total(),
    }))
}

fn tasks_create(state: &Arc<HandlerState>, params: &Value) -> HandlerResult {
    let today = state.today();
    let mut fields = params
        .as_object()
        .cloned()
        .ok_or_else(|| HandlerError::InvalidParams("params must be an object".into()))?;
    if !fields.contains_key("start_date") && !fields.contains_key("task_date") {
        let _ = fields.insert("start_date".into(), json!(today));
    }
    let draft: TaskDraft = serde_json::from_value(Value::Object(fields))
        .map_err(|e| HandlerError::InvalidParams(format!("invalid task: {e}")))?;

    let record = draft.into_record(&state.catalog, today)?;
    let _ = state.tasks.insert(&record)?;
    state.publish_counts();
    Ok(serde_json::to_value(record)?)
}

fn tasks_update(state: &Arc<HandlerState>, params: &Value) -> HandlerResult {
    let collection = collection_param(params)?;
    let filter = filter_param(params)?;
    let patch = params
        .get("patch")
        .ok_or_else(|| HandlerError::InvalidParams("Missing required parameter: patch".into()))?;
    let patch = Patch::from_json(patch)?;

    let ack = state
        .tasks
        .update_matching(collection, &filter, &patch, &state.catalog, state.today())?;
    if ack.matched_count > 0 {
        state.publish_counts();
    }
    Ok(serde_json::to_value(ack)?)
}

fn tasks_delete(state: &Arc<HandlerState>, params: &Value) -> HandlerResult {
    let collection = collection_param(params)?;
    let filter = filter_param(params)?;

    let ack = state.tasks.delete_matching(collection, &filter)?;
    if ack.deleted_count > 0 {
        state.publish_counts();
    }
    Ok(serde_json::to_value(ack)?)
}

fn tasks_complete(state: &Arc<HandlerState>, params: &Value) -> HandlerResult {
    let task_id = rpc::require_str(params, "taskId")
        .map(TaskId::from_raw)
        .map_err(HandlerError::InvalidParams)?;
    let today = state.today();
    let end_date = rpc::optional_date(params, "endDate")
        .map_err(HandlerError::InvalidParams)?
        .unwrap_or(today);

    let record = state.tasks.complete(&task_id, end_date, today)?;
    state.publish_counts();
    Ok(serde_json::to_value(record)?)
}

// ── Sub-categories ─────────────────────────────────────────────────────

fn subcategory_list(state: &Arc<HandlerState>, params: &Value) -> HandlerResult {
    let category = category_param(params)?;
    Ok(json!({ "options": state.catalog.options(category) }))
}

fn subcategory_add(state: &Arc<HandlerState>, params: &Value) -> HandlerResult {
    let category = category_param(params)?;
    let name = rpc::require_str(params, "name").map_err(HandlerError::InvalidParams)?;
    let (option, added) = state.add_sub_category(category, name)?;
    Ok(json!({ "option": option, "added": added }))
}

// ── System ─────────────────────────────────────────────────────────────

fn health(state: &Arc<HandlerState>) -> HandlerResult {
    Ok(serde_json::to_value(health_report(state))?)
}

/// Live health counters, shared by the `health` method and `/health`.
pub(crate) fn health_report(state: &HandlerState) -> health::HealthResponse {
    let db_ok = state
        .db
        .with_conn(|conn| {
            conn.execute_batch("SELECT 1")?;
            Ok(true)
        })
        .unwrap_or(false);

    health::health_check(
        state.started_at,
        state.clients.count(),
        state.sessions.len(),
        db_ok,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use worktrack_core::form::{ADDED_MESSAGE, REMINDER_MESSAGE};
    use worktrack_core::CatalogPreset;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn setup() -> Arc<HandlerState> {
        let db = Database::in_memory().unwrap();
        let catalog = Arc::new(SubCategoryCatalog::from_preset(CatalogPreset::Extended));
        let clients = Arc::new(ClientRegistry::new(32, Duration::from_secs(30)));
        let (events, _) = broadcast::channel(16);
        Arc::new(HandlerState::new(db, catalog, clients, events).with_clock(today))
    }

    async fn call(state: &Arc<HandlerState>, method: &str, params: Value) -> RpcResponse {
        dispatch(state, method, &params, Some(json!(1))).await
    }

    async fn ok(state: &Arc<HandlerState>, method: &str, params: Value) -> Value {
        let resp = call(state, method, params).await;
        assert!(resp.success, "{method} failed: {:?}", resp.error);
        resp.result.unwrap()
    }

    async fn err_code(state: &Arc<HandlerState>, method: &str, params: Value) -> String {
        let resp = call(state, method, params).await;
        assert!(!resp.success, "{method} unexpectedly succeeded");
        resp.error.unwrap().code
    }

    async fn open(state: &Arc<HandlerState>) -> String {
        ok(state, "form.open", json!({})).await["sessionId"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn send(state: &Arc<HandlerState>, session: &str, event: Value) -> Value {
        ok(state, "form.event", json!({ "sessionId": session, "event": event })).await
    }

    #[tokio::test]
    async fn dispatch_unknown_method() {
        let state = setup();
        assert_eq!(err_code(&state, "foo.bar", json!({})).await, "METHOD_NOT_FOUND");
        assert_eq!(err_code(&state, "system.ping", json!({})).await, "METHOD_NOT_FOUND");
    }

    #[tokio::test]
    async fn form_open_renders_initial_view() {
        let state = setup();
        let result = ok(&state, "form.open", json!({})).await;
        assert!(result["sessionId"].as_str().unwrap().starts_with("sess_"));
        let view = &result["view"];
        assert_eq!(view["phase"], "idle");
        assert_eq!(view["startDate"], "2024-06-01");
        assert_eq!(view["startDateMax"], "2024-06-01");
        assert_eq!(view["totalCount"], 0);
        assert_eq!(view["endDateVisible"], false);
        assert!(view["dialog"].is_null());
        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn full_form_flow_stores_completed_task() {
        let state = setup();
        let mut rx = state.events.subscribe();
        let sid = open(&state).await;

        send(&state, &sid, json!({"type": "category_selected", "category": "Office"})).await;
        let view = send(&state, &sid, json!({"type": "sub_category_selected", "key": "coding"})).await;
        assert_eq!(view["view"]["subCategory"], "coding");
        send(&state, &sid, json!({"type": "start_date_changed", "date": "2024-01-01"})).await;
        send(&state, &sid, json!({"type": "description_changed", "text": "fix bug"})).await;

        let prompt = send(&state, &sid, json!({"type": "status_toggled", "complete": true})).await;
        assert_eq!(prompt["view"]["dialog"]["kind"], "confirm_completion");
        assert_eq!(prompt["view"]["endDateVisible"], false);

        let confirmed = send(&state, &sid, json!({"type": "completion_confirmed"})).await;
        assert_eq!(confirmed["view"]["endDateVisible"], true);
        assert_eq!(confirmed["view"]["endDate"], "2024-06-01");
        assert_eq!(confirmed["view"]["endDateMin"], "2024-01-01");

        send(&state, &sid, json!({"type": "end_date_changed", "date": "2024-01-02"})).await;
        let submitted = send(&state, &sid, json!({"type": "submitted"})).await;

        let view = &submitted["view"];
        assert_eq!(submitted["updated"], true);
        assert_eq!(view["dialog"]["message"], ADDED_MESSAGE);
        assert_eq!(view["description"], "");
        assert_eq!(view["phase"], "editing");
        assert_eq!(view["totalCount"], 1);
        assert_eq!(view["inProgressCount"], 0);

        let list = ok(&state, "tasks.list", json!({})).await;
        let task = &list["tasks"][0];
        assert_eq!(task["category"], "Office");
        assert_eq!(task["sub_category"], "coding");
        assert_eq!(task["start_date"], "2024-01-01");
        assert_eq!(task["task_description"], "fix bug");
        assert_eq!(task["task_status"], 1);
        assert_eq!(task["end_date"], "2024-01-02");

        assert_eq!(
            rx.try_recv().unwrap(),
            TrackerEvent::tasks_changed(worktrack_core::TaskCounts {
                in_progress: 0,
                completed: 1
            })
        );
    }

    #[tokio::test]
    async fn blank_description_shows_reminder() {
        let state = setup();
        let sid = open(&state).await;
        let result = send(&state, &sid, json!({"type": "submitted"})).await;
        assert_eq!(result["view"]["phase"], "submitted");
        assert_eq!(result["view"]["dialog"]["message"], REMINDER_MESSAGE);
        assert_eq!(result["view"]["totalCount"], 0);
    }

    #[tokio::test]
    async fn no_op_event_skips_render() {
        let state = setup();
        let sid = open(&state).await;
        let result = send(&state, &sid, json!({"type": "dialog_dismissed"})).await;
        assert_eq!(result["updated"], false);
        assert!(result.get("view").is_none());
    }

    #[tokio::test]
    async fn list_toggle_includes_tasks() {
        let state = setup();
        ok(&state, "tasks.create", json!({"category": "Personal", "description": "read"})).await;
        let sid = open(&state).await;
        let shown = send(&state, &sid, json!({"type": "list_toggled"})).await;
        assert_eq!(shown["view"]["listVisible"], true);
        assert_eq!(shown["view"]["tasks"].as_array().unwrap().len(), 1);
        let hidden = send(&state, &sid, json!({"type": "list_toggled"})).await;
        assert!(hidden["view"]["tasks"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ad_hoc_sub_category_is_added_and_selected() {
        let state = setup();
        let mut rx = state.events.subscribe();
        let sid = open(&state).await;
        let typed = send(&state, &sid, json!({"type": "sub_category_search_changed", "text": "Reading"})).await;
        assert_eq!(typed["view"]["canAddSubCategory"], true);

        let added = send(&state, &sid, json!({"type": "sub_category_add_confirmed"})).await;
        assert_eq!(added["view"]["subCategory"], "reading");
        assert!(state.catalog.contains(Category::Personal, "reading"));
        assert_eq!(state.subcategories.list().unwrap().len(), 1);
        assert!(matches!(
            rx.try_recv().unwrap(),
            TrackerEvent::SubCategoryAdded { category: Category::Personal, .. }
        ));
    }

    #[tokio::test]
    async fn form_event_errors() {
        let state = setup();
        assert_eq!(
            err_code(&state, "form.event", json!({"sessionId": "sess_nope", "event": {"type": "submitted"}})).await,
            "NOT_FOUND"
        );
        let sid = open(&state).await;
        assert_eq!(
            err_code(&state, "form.event", json!({"sessionId": sid, "event": {"type": "explode"}})).await,
            "INVALID_PARAMS"
        );
        assert_eq!(err_code(&state, "form.event", json!({})).await, "INVALID_PARAMS");
    }

    #[tokio::test]
    async fn form_close_drops_session() {
        let state = setup();
        let sid = open(&state).await;
        assert_eq!(ok(&state, "form.close", json!({"sessionId": sid})).await["closed"], true);
        assert_eq!(ok(&state, "form.close", json!({"sessionId": sid})).await["closed"], false);
        assert_eq!(err_code(&state, "form.view", json!({"sessionId": sid})).await, "NOT_FOUND");
    }

    #[tokio::test]
    async fn tasks_create_defaults_start_date() {
        let state = setup();
        let record = ok(&state, "tasks.create", json!({"category": "Office", "task_description": "triage"})).await;
        assert_eq!(record["start_date"], "2024-06-01");
        assert_eq!(record["task_status"], 0);
        assert!(record["_id"].as_str().unwrap().starts_with("task_"));

        let counts = ok(&state, "tasks.count", json!({})).await;
        assert_eq!(counts, json!({"inProgress": 1, "completed": 0, "total": 1}));
    }

    #[tokio::test]
    async fn tasks_create_validates() {
        let state = setup();
        assert_eq!(
            err_code(&state, "tasks.create", json!({"category": "Office", "description": "  "})).await,
            "INVALID_PARAMS"
        );
        assert_eq!(
            err_code(&state, "tasks.create", json!({"category": "Office", "description": "x", "start_date": "2030-01-01"})).await,
            "INVALID_PARAMS"
        );
        assert_eq!(
            err_code(&state, "tasks.create", json!({"category": "Garden", "description": "x"})).await,
            "INVALID_PARAMS"
        );
    }

    #[tokio::test]
    async fn tasks_complete_moves_record() {
        let state = setup();
        let record = ok(&state, "tasks.create", json!({"category": "Office", "description": "a", "start_date": "2024-05-01"})).await;
        let task_id = record["_id"].as_str().unwrap();

        let done = ok(&state, "tasks.complete", json!({"taskId": task_id, "endDate": "2024-05-03"})).await;
        assert_eq!(done["task_status"], 1);
        assert_eq!(done["end_date"], "2024-05-03");
        assert_eq!(ok(&state, "tasks.count", json!({})).await["inProgress"], 0);

        assert_eq!(
            err_code(&state, "tasks.complete", json!({"taskId": task_id})).await,
            "INVALID_PARAMS"
        );
        assert_eq!(
            err_code(&state, "tasks.complete", json!({"taskId": "task_missing"})).await,
            "NOT_FOUND"
        );
    }

    #[tokio::test]
    async fn tasks_update_and_delete() {
        let state = setup();
        let record = ok(&state, "tasks.create", json!({"category": "Office", "description": "draft"})).await;
        let task_id = record["_id"].clone();

        let updated = ok(
            &state,
            "tasks.update",
            json!({
                "collection": "in_progress_tasks",
                "filter": {"_id": task_id},
                "patch": {"$set": {"task_description": "final"}}
            }),
        )
        .await;
        assert_eq!(updated["matchedCount"], 1);
        assert_eq!(ok(&state, "tasks.list", json!({})).await["tasks"][0]["task_description"], "final");

        assert_eq!(
            err_code(&state, "tasks.delete", json!({"collection": "in_progress_tasks", "filter": {}})).await,
            "INVALID_PARAMS"
        );
        assert_eq!(
            err_code(&state, "tasks.delete", json!({"collection": "archive", "filter": {"_id": task_id}})).await,
            "INVALID_PARAMS"
        );
        let deleted = ok(
            &state,
            "tasks.delete",
            json!({"collection": "in_progress_tasks", "filter": {"category": "Office"}}),
        )
        .await;
        assert_eq!(deleted["deletedCount"], 1);
    }

    #[tokio::test]
    async fn tasks_update_rejects_broken_records() {
        let state = setup();
        let record = ok(
            &state,
            "tasks.create",
            json!({"category": "Office", "description": "a", "start_date": "2024-01-01", "task_status": 1, "end_date": "2024-01-02"}),
        )
        .await;
        let filter = json!({"_id": record["_id"]});

        for patch in [json!({"start_date": "2024-05-01"}), json!({"category": "Garden"})] {
            assert_eq!(
                err_code(
                    &state,
                    "tasks.update",
                    json!({"collection": "completed_tasks", "filter": filter, "patch": patch}),
                )
                .await,
                "INVALID_PARAMS"
            );
        }

        let list = ok(&state, "tasks.list", json!({})).await;
        assert_eq!(list["tasks"][0]["start_date"], "2024-01-01");
        assert_eq!(list["tasks"][0]["category"], "Office");
    }

    #[tokio::test]
    async fn subcategory_add_keeps_catalog_when_write_fails() {
        let state = setup();
        state
            .db
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE sub_categories")?;
                Ok(())
            })
            .unwrap();

        let params = json!({"category": "Office", "name": "Reviewing"});
        assert_eq!(err_code(&state, "subcategory.add", params.clone()).await, "INTERNAL_ERROR");
        assert!(!state.catalog.contains(Category::Office, "reviewing"));
        // A retry tries the write again instead of reporting a known option.
        assert_eq!(err_code(&state, "subcategory.add", params).await, "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn subcategory_list_and_add() {
        let state = setup();
        let list = ok(&state, "subcategory.list", json!({"category": "Office"})).await;
        let keys: Vec<&str> = list["options"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, ["debugging", "coding"]);

        let added = ok(&state, "subcategory.add", json!({"category": "Office", "name": "Reviewing"})).await;
        assert_eq!(added["added"], true);
        assert_eq!(added["option"]["key"], "reviewing");
        let again = ok(&state, "subcategory.add", json!({"category": "Office", "name": "reviewing"})).await;
        assert_eq!(again["added"], false);

        assert_eq!(
            err_code(&state, "subcategory.add", json!({"category": "Office", "name": " "})).await,
            "INVALID_PARAMS"
        );
    }

    #[tokio::test]
    async fn health_reports_database() {
        let state = setup();
        let body = ok(&state, "health", json!({})).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "ok");
        assert_eq!(body["connections"], 0);
    }
}
