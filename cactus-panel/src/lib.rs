// Library entry point for the binary and the integration tests

pub mod command;
pub mod console;
pub mod controller;
pub mod poll;
pub mod settings;
pub mod surfaces;
pub mod view_model;

pub use controller::{CreationForm, InstancePanelController, RefreshOutcome};
pub use settings::PanelSettings;
