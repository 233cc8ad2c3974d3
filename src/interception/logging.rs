// src/interception/logging.rs
//! Call logging interceptor

use crate::interception::interceptor::Interceptor;
use crate::interception::invocation::Invocation;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One logged call
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    /// Member name
    pub member: String,

    /// Rendered arguments at entry
    pub arguments: Vec<String>,

    /// Rendered return value, or the error message
    pub outcome: Result<String, String>,

    /// Time spent in the rest of the chain
    pub elapsed: Duration,
}

/// Records every call passing through it and emits a tracing event
#[derive(Debug, Default)]
pub struct LoggingInterceptor {
    records: Mutex<Vec<CallRecord>>,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded calls
    pub fn records(&self) -> Vec<CallRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Interceptor for LoggingInterceptor {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> anyhow::Result<()> {
        let member = invocation.method().qualified_name();
        let arguments: Vec<String> = invocation.arguments().iter().map(|a| a.to_string()).collect();
        debug!("Calling {}({})", member, arguments.join(", "));

        let start = Instant::now();
        let result = invocation.proceed();
        let elapsed = start.elapsed();

        let outcome = match &result {
            Ok(()) => {
                let rendered = invocation
                    .return_value()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "<unset>".to_string());
                debug!("{} returned {} in {:?}", member, rendered, elapsed);
                Ok(rendered)
            }
            Err(e) => {
                warn!("{} failed after {:?}: {}", member, elapsed, e);
                Err(e.to_string())
            }
        };

        self.records.lock().push(CallRecord {
            member,
            arguments,
            outcome,
            elapsed,
        });

        result
    }
}
