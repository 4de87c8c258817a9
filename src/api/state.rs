//! Application state for the Crew Staffing Engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::calculation::StaffingEngine;
use crate::config::StandardLoader;

/// Shared application state.
///
/// Contains the loaded staffing standards and an engine built from the
/// loader's settings.
#[derive(Clone)]
pub struct AppState {
    /// The loaded staffing standards.
    standards: Arc<StandardLoader>,
    /// The engine used for every request.
    engine: Arc<StaffingEngine>,
}

impl AppState {
    /// Creates a new application state with the given standard loader.
    pub fn new(standards: StandardLoader) -> Self {
        let engine = StaffingEngine::new(standards.settings().clone());
        Self {
            standards: Arc::new(standards),
            engine: Arc::new(engine),
        }
    }

    /// Returns a reference to the standard loader.
    pub fn standards(&self) -> &StandardLoader {
        &self.standards
    }

    /// Returns a reference to the staffing engine.
    pub fn engine(&self) -> &StaffingEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_engine_uses_loader_settings() {
        let mut settings = EngineSettings::default();
        settings.default_main_reserve_rate = rust_decimal::Decimal::from(12);
        let loader = StandardLoader::from_parts(settings.clone(), Vec::new()).unwrap();

        let state = AppState::new(loader);
        assert_eq!(state.engine().settings(), &settings);
    }
}
