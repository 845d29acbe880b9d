mod backend;
mod binding;
mod controller;
mod store;
mod summary;
mod validation;
mod values;
mod visibility;


#[cfg(feature = "http")]
pub use backend::HttpSubmission;
pub use backend::{
    BoxedSubmitFuture, DEFAULT_SUBMIT_DELAY, SimulatedSubmission, SubmissionBackend, SubmitError,
};
pub use binding::{
    ChangeEmitter, CheckboxProps, ControlBase, DateProps, FieldControls, NumberProps, RawInput,
    SelectChoice, SelectProps, TextProps, coerce_input,
};
pub use controller::{
    DEFAULT_LOADING_LABEL, DEFAULT_SUBMIT_LABEL, FieldChanged, FormController, FormError, FormId,
    FormOptions, FormResult, FormSnapshot, SubmitButtonView, SubmitOutcome, SubmitState,
};
pub use store::{FormStore, SubscriptionId};
pub use summary::{SubmissionSummary, SummaryCell, SummaryRow, humanize_key};
pub use validation::{HiddenFieldPolicy, validate_all, validate_field};
pub use values::{ErrorMap, FieldValue, FormValues, parse_decimal};
pub use visibility::{ConditionFallback, DependencyIndex, is_visible, is_visible_with};
