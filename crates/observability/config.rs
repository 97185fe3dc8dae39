use std::env;

#[derive(Clone)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) log_filter: String,
    /// Collected while parsing, logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

pub(crate) const DEFAULT_LOG_FILTER: &str = "info";

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(component: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let component = component.trim().to_string();
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let service_name = read("SERVICE_NAME").unwrap_or_else(|| component.clone());
        let environment = read("STAGE").unwrap_or_else(|| "unknown".to_string());

        let mut warnings = Vec::new();
        let log_filter = match read("RUST_LOG") {
            Some(raw) if tracing_subscriber::EnvFilter::try_new(&raw).is_ok() => raw,
            Some(raw) => {
                warnings.push(format!(
                    "RUST_LOG={raw:?} is not a valid filter; falling back to {DEFAULT_LOG_FILTER:?}"
                ));
                DEFAULT_LOG_FILTER.to_string()
            }
            None => DEFAULT_LOG_FILTER.to_string(),
        };

        Self {
            service_context: ServiceContext {
                service_name,
                environment,
                component,
            },
            log_filter,
            warnings,
        }
    }
}
