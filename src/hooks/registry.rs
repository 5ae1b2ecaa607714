use super::{CallResult, HookPlatform, HookedCall, Interceptor, LocationApi};
use anyhow::{bail, Result};
use log::error;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// In-process dispatch table standing in for the host's method hooking
///
/// Entry points marked unsupported refuse installation, the way a platform
/// build without that API would. Invocation takes `&self`, so a registry
/// shared behind an `Arc` can be called from any thread.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<LocationApi, Vec<Arc<dyn Interceptor>>>,
    unsupported: HashSet<LocationApi>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose platform lacks the given entry points
    pub fn with_unsupported(apis: impl IntoIterator<Item = LocationApi>) -> Self {
        Self {
            hooks: HashMap::new(),
            unsupported: apis.into_iter().collect(),
        }
    }

    pub fn is_hooked(&self, api: LocationApi) -> bool {
        self.hooks.get(&api).is_some_and(|h| !h.is_empty())
    }

    /// Run the interceptors attached to `api` over the original result
    ///
    /// An interceptor that panics is skipped and the result it was given is
    /// restored.
    pub fn invoke(&self, api: LocationApi, provider: Option<&str>, original: CallResult) -> CallResult {
        let mut call = HookedCall {
            api,
            provider: provider.map(str::to_string),
            result: original,
        };

        for interceptor in self.hooks.get(&api).into_iter().flatten() {
            let before = call.result.clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| interceptor.after_call(&mut call)));
            if outcome.is_err() {
                error!("Interceptor for {} panicked, keeping original result", api);
                call.result = before;
            }
        }

        call.result
    }
}

impl HookPlatform for HookRegistry {
    fn hook_after(&mut self, api: LocationApi, interceptor: Arc<dyn Interceptor>) -> Result<()> {
        if self.unsupported.contains(&api) {
            bail!("method {} not found", api);
        }
        self.hooks.entry(api).or_default().push(interceptor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationRecord;

    struct Panics;
    impl Interceptor for Panics {
        fn after_call(&self, call: &mut HookedCall) {
            call.result = CallResult::Enabled(false);
            panic!("boom");
        }
    }

    struct Disables;
    impl Interceptor for Disables {
        fn after_call(&self, call: &mut HookedCall) {
            call.result = CallResult::Enabled(false);
        }
    }

    #[test]
    fn test_unhooked_api_returns_original() {
        let registry = HookRegistry::new();
        let original = CallResult::Location(Some(LocationRecord::new(1.0, 2.0)));
        assert_eq!(
            registry.invoke(LocationApi::LastKnownLocation, None, original.clone()),
            original
        );
    }

    #[test]
    fn test_unsupported_api_refuses_install() {
        let mut registry = HookRegistry::with_unsupported([LocationApi::CurrentLocation]);
        assert!(registry
            .hook_after(LocationApi::CurrentLocation, Arc::new(Disables))
            .is_err());
        assert!(registry
            .hook_after(LocationApi::ProviderEnabled, Arc::new(Disables))
            .is_ok());
        assert!(!registry.is_hooked(LocationApi::CurrentLocation));
        assert!(registry.is_hooked(LocationApi::ProviderEnabled));
    }

    #[test]
    fn test_panicking_interceptor_restores_result() {
        let mut registry = HookRegistry::new();
        registry
            .hook_after(LocationApi::ProviderEnabled, Arc::new(Panics))
            .unwrap();
        let result = registry.invoke(LocationApi::ProviderEnabled, Some("gps"), CallResult::Enabled(true));
        assert_eq!(result, CallResult::Enabled(true));
    }
}
