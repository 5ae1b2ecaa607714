// Library interface for fakeloc
// This allows tests and the manager CLI to access the crate's functionality

pub mod bridge;
pub mod config;
pub mod constants;
pub mod gate;
pub mod hooks;
pub mod location;
pub mod manager;
pub mod store;
pub mod synthesis;

use bridge::ConfigBridge;
use gate::{ActivationGate, GateDecision, GateState};
use hooks::registry::HookRegistry;
use hooks::{AppContext, CallResult, InstallReport, LocationApi};
use location::LocationRecord;
use log::info;

/// A target process as seen by the engine: one activation gate plus the
/// hook table its location calls go through
pub struct TargetProcess {
    package_name: String,
    gate: ActivationGate,
    registry: HookRegistry,
}

impl TargetProcess {
    pub fn new(package_name: impl Into<String>, bridge: ConfigBridge) -> Self {
        Self::with_registry(package_name, bridge, HookRegistry::new())
    }

    /// Process whose platform hook table is `registry`
    pub fn with_registry(
        package_name: impl Into<String>,
        bridge: ConfigBridge,
        registry: HookRegistry,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            gate: ActivationGate::new(bridge),
            registry,
        }
    }

    /// Run the process lifecycle: package load, then application creation
    pub fn start(&mut self) -> (GateDecision, Option<InstallReport>) {
        info!("Loading package {}", self.package_name);
        let decision = self.gate.handle_load_package(&self.package_name);
        let context = AppContext::new(self.package_name.clone());
        let report = self.gate.on_application_create(context, &mut self.registry);
        (decision, report)
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn is_hooked(&self, api: LocationApi) -> bool {
        self.registry.is_hooked(api)
    }

    /// What the app's own code receives from a location query
    pub fn query_location(&self, api: LocationApi, real: Option<LocationRecord>) -> Option<LocationRecord> {
        match self.registry.invoke(api, Some("gps"), CallResult::Location(real.clone())) {
            CallResult::Location(location) => location,
            CallResult::Enabled(_) => real,
        }
    }

    /// What the app's own code receives from a provider status query
    pub fn query_provider_enabled(&self, provider: &str, real: bool) -> bool {
        match self
            .registry
            .invoke(LocationApi::ProviderEnabled, Some(provider), CallResult::Enabled(real))
        {
            CallResult::Enabled(enabled) => enabled,
            CallResult::Location(_) => real,
        }
    }
}
