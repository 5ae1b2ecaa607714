use super::{AppContext, CallResult, HookedCall, Interceptor};
use crate::bridge::{base_location_from, params_from, ConfigBridge};
use crate::constants::LOCATION_PROVIDERS;
use crate::synthesis::synthesize;
use log::debug;

/// Replaces location results with synthesized ones
///
/// Every call reads the preferences afresh, once, and takes both the base
/// location and the overrides from that read. With no usable base location
/// the original result is left untouched.
pub struct SpoofInterceptor {
    context: AppContext,
    bridge: ConfigBridge,
}

impl SpoofInterceptor {
    pub fn new(context: AppContext, bridge: ConfigBridge) -> Self {
        Self { context, bridge }
    }
}

impl Interceptor for SpoofInterceptor {
    fn after_call(&self, call: &mut HookedCall) {
        let prefs = self.bridge.snapshot();
        let Some(base) = base_location_from(&prefs) else {
            debug!(
                "[{}] No base location configured, passing {} through",
                self.context.package_name, call.api
            );
            return;
        };

        match &mut call.result {
            CallResult::Location(location) => {
                let params = params_from(&prefs);
                let spoofed = synthesize(&base, location.as_ref(), &params, &mut rand::rng());
                debug!(
                    "[{}] {} -> ({:.6}, {:.6})",
                    self.context.package_name, call.api, spoofed.latitude, spoofed.longitude
                );
                *location = Some(spoofed);
            }
            CallResult::Enabled(enabled) => {
                if is_location_provider(call.provider.as_deref()) {
                    *enabled = true;
                }
            }
        }
    }
}

fn is_location_provider(provider: Option<&str>) -> bool {
    provider.is_some_and(|name| LOCATION_PROVIDERS.contains(&name))
}
