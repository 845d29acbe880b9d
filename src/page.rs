//! Page surface: routes and the loading/error/ready lifecycle of the form page.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::form::{
    FieldControls, FormController, FormError, FormOptions, FormResult, SubmissionBackend,
};
use crate::loader::{LoadError, SchemaLoader};

pub const LANDING_TITLE: &str = "Dynamic Form Builder";
pub const LANDING_LINK: &str = "Go to Form";
pub const LOADING_MESSAGE: &str = "Loading form schema...";
pub const EMPTY_MESSAGE: &str = "No schema found.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Route {
    Landing,
    Form,
}

impl Route {
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "" => Some(Self::Landing),
            "/form" => Some(Self::Form),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Form => "/form",
        }
    }
}

/// The landing page: a heading and a link to the form route.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LandingView {
    pub title: &'static str,
    pub link_label: &'static str,
    pub link_target: Route,
}

impl Default for LandingView {
    fn default() -> Self {
        Self {
            title: LANDING_TITLE,
            link_label: LANDING_LINK,
            link_target: Route::Form,
        }
    }
}

#[derive(Clone)]
pub enum PageState {
    Loading,
    Failed(String),
    /// The source answered but had no schema.
    Empty,
    Ready(FormController),
}

impl PageState {
    /// Text shown in place of the form, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Loading => Some(LOADING_MESSAGE.to_string()),
            Self::Failed(message) => Some(format!("Error: {message}")),
            Self::Empty => Some(EMPTY_MESSAGE.to_string()),
            Self::Ready(_) => None,
        }
    }

    pub fn controller(&self) -> Option<&FormController> {
        match self {
            Self::Ready(controller) => Some(controller),
            _ => None,
        }
    }
}

impl std::fmt::Debug for PageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => f.write_str("Loading"),
            Self::Failed(message) => f.debug_tuple("Failed").field(message).finish(),
            Self::Empty => f.write_str("Empty"),
            Self::Ready(controller) => {
                f.debug_tuple("Ready").field(&controller.form_id()).finish()
            }
        }
    }
}

/// The form route. Clones share state, so one handle can unmount while
/// another is loading.
#[derive(Clone)]
pub struct FormPage {
    state: Arc<RwLock<PageState>>,
    mounted: Arc<AtomicBool>,
}

impl Default for FormPage {
    fn default() -> Self {
        Self::new()
    }
}

impl FormPage {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(PageState::Loading)),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Fetches the schema and builds a fresh controller for it, disposing the
    /// previous one. A result that arrives after [`FormPage::unmount`] is
    /// dropped.
    pub async fn load<L>(
        &self,
        loader: &L,
        backend: impl SubmissionBackend,
        options: FormOptions,
    ) -> FormResult<()>
    where
        L: SchemaLoader + ?Sized,
    {
        {
            let mut state = self.write_state()?;
            if let Some(previous) = state.controller() {
                previous.dispose();
            }
            *state = PageState::Loading;
        }
        let loaded = loader.load().await;
        if !self.is_mounted() {
            debug!("schema arrived after the page unmounted, dropping it");
            return Ok(());
        }

        let next = match loaded {
            Ok(schema) => match FormController::new(schema, backend, options) {
                Ok(controller) => {
                    debug!(form = %controller.form_id(), "form page ready");
                    PageState::Ready(controller)
                }
                Err(error) => {
                    warn!(%error, "schema rejected by the form engine");
                    PageState::Failed(error.to_string())
                }
            },
            Err(LoadError::Empty) => {
                warn!("schema source returned no schema");
                PageState::Empty
            }
            Err(error) => {
                warn!(%error, "failed to load form schema");
                PageState::Failed(error.to_string())
            }
        };
        let mut state = self.write_state()?;
        *state = next;
        if !self.is_mounted() {
            if let Some(controller) = state.controller() {
                controller.dispose();
            }
        }
        Ok(())
    }

    pub fn state(&self) -> FormResult<PageState> {
        Ok(self.read_state()?.clone())
    }

    pub fn controller(&self) -> FormResult<Option<FormController>> {
        Ok(self.read_state()?.controller().cloned())
    }

    /// Draws the form fields, or returns `None` while the page shows a message.
    pub fn render_form<C>(&self, controls: &C) -> FormResult<Option<Vec<C::Output>>>
    where
        C: FieldControls,
    {
        match self.controller()? {
            Some(controller) => controller.render_fields(controls).map(Some),
            None => Ok(None),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Leaves the route. Any in-flight submission is told to drop its result.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        if let Ok(state) = self.state.read() {
            if let Some(controller) = state.controller() {
                controller.dispose();
            }
        }
    }

    fn read_state(&self) -> FormResult<RwLockReadGuard<'_, PageState>> {
        self.state
            .read()
            .map_err(|_| FormError::StatePoisoned("reading page state"))
    }

    fn write_state(&self) -> FormResult<RwLockWriteGuard<'_, PageState>> {
        self.state
            .write()
            .map_err(|_| FormError::StatePoisoned("writing page state"))
    }
}
