//! Per-process activation
//!
//! The gate is consulted once when a package loads. If the process is not
//! the manager and spoofing is switched on, it arms itself; the hooks are
//! then installed from the application-creation callback, the earliest point
//! with a usable application context. Nothing is re-evaluated afterwards.

use crate::bridge::ConfigBridge;
use crate::constants::MANAGER_PACKAGE_NAME;
use crate::hooks::{AppContext, HookPlatform, InstallReport, LocationApiHooks};
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::OnceLock;

const TAG: &str = "[ActivationGate]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Inactive,
    HooksInstalled,
}

/// Result of the load-time evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The loading process is the manager itself
    SkipManager,
    /// Spoofing is switched off
    SkipInactive,
    /// Hooks will be installed when the application is created
    Arm,
}

pub struct ActivationGate {
    bridge: ConfigBridge,
    manager_package: String,
    decision: OnceLock<GateDecision>,
    state: Mutex<GateState>,
    hooks: Mutex<Option<LocationApiHooks>>,
}

impl ActivationGate {
    pub fn new(bridge: ConfigBridge) -> Self {
        Self::for_manager(bridge, MANAGER_PACKAGE_NAME)
    }

    /// Gate that treats `manager_package` as the manager's identifier
    pub fn for_manager(bridge: ConfigBridge, manager_package: impl Into<String>) -> Self {
        Self {
            bridge,
            manager_package: manager_package.into(),
            decision: OnceLock::new(),
            state: Mutex::new(GateState::Inactive),
            hooks: Mutex::new(None),
        }
    }

    pub fn state(&self) -> GateState {
        *self.state.lock()
    }

    pub fn decision(&self) -> Option<GateDecision> {
        self.decision.get().copied()
    }

    /// Evaluate activation for the loading package
    ///
    /// Only the first call evaluates; later calls return the same decision.
    pub fn handle_load_package(&self, package_name: &str) -> GateDecision {
        *self.decision.get_or_init(|| {
            // The manager never hooks itself
            if package_name == self.manager_package {
                debug!("{} Skipping manager package {}", TAG, package_name);
                return GateDecision::SkipManager;
            }

            if !self.bridge.is_playing() {
                debug!("{} Spoofing inactive, not hooking {}", TAG, package_name);
                return GateDecision::SkipInactive;
            }

            info!("{} Armed for {}", TAG, package_name);
            GateDecision::Arm
        })
    }

    /// Application-creation callback
    ///
    /// Performs the single INACTIVE -> HOOKS_INSTALLED transition when the
    /// gate is armed. Returns the install report on that transition and
    /// `None` on every other call.
    pub fn on_application_create(
        &self,
        context: AppContext,
        platform: &mut dyn HookPlatform,
    ) -> Option<InstallReport> {
        if self.decision() != Some(GateDecision::Arm) {
            return None;
        }

        let mut state = self.state.lock();
        if *state == GateState::HooksInstalled {
            return None;
        }

        info!(
            "{} Target app's context has been acquired: {} (pid {})",
            TAG, context.package_name, context.process_id
        );

        let hooks = LocationApiHooks::new(context, self.bridge.clone());
        let report = hooks.init_hooks(platform);
        *self.hooks.lock() = Some(hooks);
        *state = GateState::HooksInstalled;

        info!(
            "{} Fake location is active ({} hooks installed, {} failed)",
            TAG,
            report.installed.len(),
            report.failed.len()
        );
        Some(report)
    }

    /// Context of the installed hooks, once the gate has fired
    pub fn hooked_context(&self) -> Option<AppContext> {
        self.hooks.lock().as_ref().map(|h| h.context().clone())
    }
}
