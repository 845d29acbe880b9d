use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::backend::{SubmissionBackend, SubmitError};
use super::store::FormStore;
use super::validation::{HiddenFieldPolicy, validate_all, validate_field};
use super::values::{ErrorMap, FieldValue, FormValues};
use super::visibility::{ConditionFallback, DependencyIndex, is_visible_with};
use crate::schema::{FormField, FormSchema, SchemaError};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

pub const DEFAULT_SUBMIT_LABEL: &str = "Submit";
pub const DEFAULT_LOADING_LABEL: &str = "Submitting...";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for FormId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Validating,
    Invalid,
    Submitting,
    Submitted,
    Failed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    pub hidden_fields: HiddenFieldPolicy,
    pub unknown_condition: ConditionFallback,
    /// Drop the error of a field as soon as a change hides it.
    pub clear_hidden_errors: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            hidden_fields: HiddenFieldPolicy::Validate,
            unknown_condition: ConditionFallback::Visible,
            clear_hidden_errors: true,
        }
    }
}

/// A value change coming from a control, already coerced to the field type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldChanged {
    pub field_id: String,
    pub value: FieldValue,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubmitOutcome {
    /// The backend accepted the values; the store has been reset.
    Submitted(FormValues),
    /// At least one field failed validation; nothing was sent.
    Invalid(ErrorMap),
    /// The backend refused; values and errors are untouched.
    Failed(SubmitError),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubmitButtonView {
    pub label: String,
    pub loading: bool,
    pub disabled: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormSnapshot {
    pub values: FormValues,
    pub errors: ErrorMap,
    pub submit_state: SubmitState,
    pub submit_count: u32,
    pub is_valid: bool,
    pub submitted: Option<FormValues>,
    pub last_failure: Option<SubmitError>,
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("form state lock poisoned while {0}")]
    StatePoisoned(&'static str),
    #[error("invalid submit state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    #[error("form submit is already in progress")]
    AlreadySubmitting,
    #[error("field `{0}` is not part of the schema")]
    UnknownField(String),
    #[error("form was disposed")]
    Disposed,
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type FormResult<T> = Result<T, FormError>;

struct FormState {
    errors: ErrorMap,
    submit_state: SubmitState,
    submit_count: u32,
    submitted: Option<FormValues>,
    last_failure: Option<SubmitError>,
}

/// Drives one form: field changes, validation and submission.
///
/// Cloning yields another handle to the same form.
#[derive(Clone)]
pub struct FormController {
    pub(super) id: FormId,
    pub(super) schema: Arc<FormSchema>,
    pub(super) options: FormOptions,
    pub(super) store: FormStore,
    dependencies: Arc<DependencyIndex>,
    backend: Arc<dyn SubmissionBackend>,
    state: Arc<RwLock<FormState>>,
    disposed: Arc<AtomicBool>,
}

impl FormController {
    pub fn new(
        schema: FormSchema,
        backend: impl SubmissionBackend,
        options: FormOptions,
    ) -> FormResult<Self> {
        schema.check_field_ids()?;
        Ok(Self {
            id: FormId::next(),
            dependencies: Arc::new(DependencyIndex::build(&schema.fields)),
            schema: Arc::new(schema),
            options,
            store: FormStore::new(),
            backend: Arc::new(backend),
            state: Arc::new(RwLock::new(FormState {
                errors: ErrorMap::new(),
                submit_state: SubmitState::Idle,
                submit_count: 0,
                submitted: None,
                last_failure: None,
            })),
            disposed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn form_id(&self) -> FormId {
        self.id
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn options(&self) -> FormOptions {
        self.options
    }

    pub fn store(&self) -> &FormStore {
        &self.store
    }

    /// Writes a changed value and re-validates that field only.
    ///
    /// Refused with [`FormError::AlreadySubmitting`] while a submission holds
    /// the values; observers run after the state lock is released.
    pub fn apply(&self, change: FieldChanged) -> FormResult<()> {
        self.ensure_live()?;
        let field = self.field(&change.field_id)?;
        let error = validate_field(field, Some(&change.value));

        let next = {
            let mut state = write_lock(&self.state, "writing field validation result")?;
            if matches!(
                state.submit_state,
                SubmitState::Validating | SubmitState::Submitting
            ) {
                return Err(FormError::AlreadySubmitting);
            }
            let next = self
                .store
                .write_value(change.field_id.clone(), change.value)?;
            debug!(
                form = %self.id,
                field = %change.field_id,
                valid = error.is_none(),
                "field changed"
            );
            match error {
                Some(message) => {
                    state.errors.insert(change.field_id.clone(), message);
                }
                None => {
                    state.errors.remove(&change.field_id);
                }
            }
            if self.options.clear_hidden_errors {
                for dependent in self.newly_hidden_dependents(&change.field_id, &next) {
                    if state.errors.remove(&dependent).is_some() {
                        debug!(
                            form = %self.id,
                            field = %dependent,
                            "cleared error of hidden field"
                        );
                    }
                }
            }
            next
        };
        self.store.notify(&next)
    }

    /// Replaces the error map with a fresh validation of every field.
    pub fn validate_form(&self) -> FormResult<bool> {
        let values = self.store.values()?;
        let errors = self.collect_errors(&values);
        let mut state = write_lock(&self.state, "applying form validation result")?;
        state.errors = errors;
        Ok(state.errors.is_empty())
    }

    pub async fn submit(&self) -> FormResult<SubmitOutcome> {
        self.ensure_live()?;
        {
            let mut state = write_lock(&self.state, "preparing submit")?;
            if state.submit_state != SubmitState::Idle {
                return Err(FormError::AlreadySubmitting);
            }
            transition_submit_state(&mut state, SubmitState::Validating)?;
            state.submit_count = state.submit_count.saturating_add(1);
        }

        let result = self.run_submit().await;
        if result.is_err() {
            self.release_submit();
        }
        result
    }

    async fn run_submit(&self) -> FormResult<SubmitOutcome> {
        let values = self.store.values()?;
        let errors = self.collect_errors(&values);
        if !errors.is_empty() {
            let mut state = write_lock(&self.state, "handling submit validation failure")?;
            state.errors = errors.clone();
            transition_submit_state(&mut state, SubmitState::Invalid)?;
            transition_submit_state(&mut state, SubmitState::Idle)?;
            info!(form = %self.id, failing = errors.len(), "submit blocked by validation");
            return Ok(SubmitOutcome::Invalid(errors));
        }

        {
            let mut state = write_lock(&self.state, "moving submit state to submitting")?;
            state.errors.clear();
            state.last_failure = None;
            transition_submit_state(&mut state, SubmitState::Submitting)?;
        }
        info!(form = %self.id, fields = values.len(), "submitting form");

        let result = self.backend.submit(&values).await;
        if self.is_disposed() {
            debug!(form = %self.id, "submit finished after dispose; result dropped");
            return Err(FormError::Disposed);
        }

        match result {
            Ok(()) => {
                self.store.reset()?;
                let mut state = write_lock(&self.state, "completing submit")?;
                transition_submit_state(&mut state, SubmitState::Submitted)?;
                state.errors.clear();
                state.submitted = Some(values.clone());
                transition_submit_state(&mut state, SubmitState::Idle)?;
                info!(form = %self.id, "form submitted");
                Ok(SubmitOutcome::Submitted(values))
            }
            Err(error) => {
                let mut state = write_lock(&self.state, "recording submit failure")?;
                transition_submit_state(&mut state, SubmitState::Failed)?;
                state.last_failure = Some(error.clone());
                transition_submit_state(&mut state, SubmitState::Idle)?;
                warn!(form = %self.id, %error, "submission failed");
                Ok(SubmitOutcome::Failed(error))
            }
        }
    }

    /// Drops the latch after a submit that ended in an error.
    fn release_submit(&self) {
        match self.state.write() {
            Ok(mut state) => state.submit_state = SubmitState::Idle,
            Err(_) => warn!(form = %self.id, "form state poisoned; submit latch left set"),
        }
    }

    /// Whether the submit action is offered right now.
    ///
    /// Stricter than validation: an empty form, or any `Null` value, also
    /// disables submission.
    pub fn can_submit(&self) -> FormResult<bool> {
        let state = read_lock(&self.state, "reading submit availability")?;
        if state.submit_state != SubmitState::Idle || !state.errors.is_empty() {
            return Ok(false);
        }
        drop(state);
        let values = self.store.values()?;
        Ok(!values.is_empty() && !values.values().any(|value| value == &FieldValue::Null))
    }

    pub fn submit_button(&self) -> FormResult<SubmitButtonView> {
        let loading = self.submit_state()? == SubmitState::Submitting;
        let button = self.schema.submit_button.as_ref();
        let label = if loading {
            button
                .and_then(|button| button.loading_text.clone())
                .unwrap_or_else(|| DEFAULT_LOADING_LABEL.to_string())
        } else {
            button
                .and_then(|button| button.text.clone())
                .unwrap_or_else(|| DEFAULT_SUBMIT_LABEL.to_string())
        };
        Ok(SubmitButtonView {
            label,
            loading,
            disabled: !self.can_submit()?,
        })
    }

    pub fn submit_state(&self) -> FormResult<SubmitState> {
        Ok(read_lock(&self.state, "reading submit state")?.submit_state)
    }

    pub fn error(&self, field_id: &str) -> FormResult<Option<String>> {
        Ok(read_lock(&self.state, "reading field error")?
            .errors
            .get(field_id)
            .cloned())
    }

    pub fn errors(&self) -> FormResult<ErrorMap> {
        Ok(read_lock(&self.state, "reading errors")?.errors.clone())
    }

    pub fn clear_errors(&self) -> FormResult<()> {
        write_lock(&self.state, "clearing all field errors")?
            .errors
            .clear();
        Ok(())
    }

    /// Values of the last successful submission.
    pub fn submitted(&self) -> FormResult<Option<FormValues>> {
        Ok(read_lock(&self.state, "reading submitted values")?
            .submitted
            .clone())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        let values = self.store.values()?;
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot {
            values,
            errors: state.errors.clone(),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
            is_valid: state.errors.is_empty(),
            submitted: state.submitted.clone(),
            last_failure: state.last_failure.clone(),
        })
    }

    pub fn is_field_visible(&self, field: &FormField) -> FormResult<bool> {
        let values = self.store.values()?;
        Ok(is_visible_with(field, &values, self.options.unknown_condition))
    }

    /// Marks the form as torn down. Pending submissions complete without
    /// touching the store, and further changes are refused.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(super) fn field(&self, field_id: &str) -> FormResult<&FormField> {
        self.schema
            .field(field_id)
            .ok_or_else(|| FormError::UnknownField(field_id.to_string()))
    }

    fn ensure_live(&self) -> FormResult<()> {
        if self.is_disposed() {
            return Err(FormError::Disposed);
        }
        Ok(())
    }

    fn collect_errors(&self, values: &FormValues) -> ErrorMap {
        validate_all(
            &self.schema.fields,
            values,
            self.options.hidden_fields,
            self.options.unknown_condition,
        )
    }

    fn newly_hidden_dependents(&self, target: &str, values: &FormValues) -> Vec<String> {
        self.dependencies
            .dependents_of(target)
            .filter_map(|id| self.schema.field(id))
            .filter(|field| !is_visible_with(field, values, self.options.unknown_condition))
            .map(|field| field.id.clone())
            .collect()
    }
}

fn transition_submit_state(state: &mut FormState, next: SubmitState) -> FormResult<()> {
    let current = state.submit_state;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Invalid)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (SubmitState::Submitting, SubmitState::Submitted)
            | (SubmitState::Submitting, SubmitState::Failed)
            | (_, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    state.submit_state = next;
    Ok(())
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
