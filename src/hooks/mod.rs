pub mod interceptor;
pub mod registry;

use crate::bridge::ConfigBridge;
use crate::location::LocationRecord;
use anyhow::Result;
use interceptor::SpoofInterceptor;
use log::{info, warn};
use std::fmt;
use std::sync::Arc;

/// Platform entry points through which an app can learn the device location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationApi {
    /// Synchronous query for the last cached fix
    LastKnownLocation,
    /// One-shot asynchronous request for a fresh fix
    CurrentLocation,
    /// Listener callback delivering continuous updates
    LocationUpdates,
    /// Whether a location provider is enabled
    ProviderEnabled,
}

impl LocationApi {
    pub const ALL: [LocationApi; 4] = [
        LocationApi::LastKnownLocation,
        LocationApi::CurrentLocation,
        LocationApi::LocationUpdates,
        LocationApi::ProviderEnabled,
    ];
}

impl fmt::Display for LocationApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocationApi::LastKnownLocation => "getLastKnownLocation",
            LocationApi::CurrentLocation => "getCurrentLocation",
            LocationApi::LocationUpdates => "onLocationChanged",
            LocationApi::ProviderEnabled => "isProviderEnabled",
        };
        f.write_str(name)
    }
}

/// What the hooked method returned
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    Location(Option<LocationRecord>),
    Enabled(bool),
}

/// A single invocation, seen after the original implementation ran
#[derive(Debug)]
pub struct HookedCall {
    pub api: LocationApi,
    /// Provider name passed by the caller, if any
    pub provider: Option<String>,
    pub result: CallResult,
}

/// Runs after the original method and may replace its result
pub trait Interceptor: Send + Sync {
    fn after_call(&self, call: &mut HookedCall);
}

/// Capability the host provides for installing interceptors
pub trait HookPlatform {
    /// Attach `interceptor` to run after `api`
    ///
    /// # Errors
    ///
    /// Returns an error if the entry point does not exist in this process.
    fn hook_after(&mut self, api: LocationApi, interceptor: Arc<dyn Interceptor>) -> Result<()>;
}

/// Context captured from the target application at creation time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    pub package_name: String,
    pub process_id: u32,
}

impl AppContext {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            process_id: std::process::id(),
        }
    }
}

/// Outcome of installing every hook
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InstallReport {
    pub installed: Vec<LocationApi>,
    pub failed: Vec<(LocationApi, String)>,
}

impl InstallReport {
    pub fn all_installed(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The set of location hooks for one process
pub struct LocationApiHooks {
    context: AppContext,
    interceptor: Arc<SpoofInterceptor>,
}

impl LocationApiHooks {
    pub fn new(context: AppContext, bridge: ConfigBridge) -> Self {
        let interceptor = Arc::new(SpoofInterceptor::new(context.clone(), bridge));
        Self {
            context,
            interceptor,
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Install a hook on every entry point
    ///
    /// Each entry point is installed on its own; one failure is logged and
    /// recorded without stopping the rest.
    pub fn init_hooks(&self, platform: &mut dyn HookPlatform) -> InstallReport {
        let mut report = InstallReport::default();

        for api in LocationApi::ALL {
            match platform.hook_after(api, self.interceptor.clone()) {
                Ok(()) => {
                    info!("[LocationApiHooks] Hooked {} in {}", api, self.context.package_name);
                    report.installed.push(api);
                }
                Err(e) => {
                    warn!(
                        "[LocationApiHooks] Failed to hook {} in {}: {:#}",
                        api, self.context.package_name, e
                    );
                    report.failed.push((api, format!("{:#}", e)));
                }
            }
        }

        report
    }
}
