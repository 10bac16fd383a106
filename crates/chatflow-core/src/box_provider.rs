//! BoxAiProvider -- object-safe dynamic dispatch wrapper for AiProvider.
//!
//! 1. Define an object-safe `AiProviderDyn` trait with boxed futures
//! 2. Blanket-impl `AiProviderDyn` for all `T: AiProvider`
//! 3. `BoxAiProvider` wraps `Box<dyn AiProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use chatflow_types::error::AiError;

use crate::provider::{AiProvider, AiRequest};

/// Object-safe version of [`AiProvider`] with boxed futures.
///
/// Exists solely to enable dynamic dispatch (`dyn AiProviderDyn`). A
/// blanket implementation is provided for all types implementing
/// `AiProvider`.
pub trait AiProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn complete_boxed<'a>(
        &'a self,
        request: &'a AiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, AiError>> + Send + 'a>>;
}

/// Blanket implementation: any `AiProvider` automatically implements
/// `AiProviderDyn`.
impl<T: AiProvider> AiProviderDyn for T {
    fn name(&self) -> &str {
        AiProvider::name(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        request: &'a AiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, AiError>> + Send + 'a>> {
        Box::pin(self.complete(request))
    }
}

/// Type-erased AI provider for runtime backend selection.
///
/// Since `AiProvider` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxAiProvider` provides equivalent methods that delegate to
/// the inner `AiProviderDyn` trait object.
pub struct BoxAiProvider {
    inner: Box<dyn AiProviderDyn + Send + Sync>,
}

impl BoxAiProvider {
    /// Wrap a concrete `AiProvider` in a type-erased box.
    pub fn new<T: AiProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    /// Human-readable provider name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Send one completion request and receive the response text.
    pub async fn complete(&self, request: &AiRequest) -> Result<String, AiError> {
        self.inner.complete_boxed(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    impl AiProvider for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _request: &AiRequest) -> Result<String, AiError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_box_provider_delegates() {
        let boxed = BoxAiProvider::new(Canned("42"));
        assert_eq!(boxed.name(), "canned");
        let request = AiRequest {
            model: "m".to_string(),
            system: "s".to_string(),
            history: vec![],
            query: "q".to_string(),
            temperature: 0.7,
            max_tokens: 64,
        };
        assert_eq!(boxed.complete(&request).await.unwrap(), "42");
    }
}
