use std::sync::Arc;

use tracing::error;

use dietrack_core::{Scope, ValueSource};
use dietrack_store::DefinitionStore;

use crate::error::EngineError;

/// Separator between context and key in a storage token (`DUT.Foo`).
const TOKEN_SEPARATOR: char = '.';

/// Reader for global-variable tokens. The surrounding test program decides
/// what "global" means; the engine only sees this trait.
pub trait GlobalVariables: Send + Sync {
    fn read(&self, name: &str) -> Result<String, EngineError>;
}

/// Global variables backed by process environment variables. The default
/// reader for the CLI; tests inject their own maps.
pub struct EnvGlobals;

impl GlobalVariables for EnvGlobals {
    fn read(&self, name: &str) -> Result<String, EngineError> {
        std::env::var(name)
            .map_err(|_| EngineError::MissingValue { token: name.to_string() })
    }
}

/// Resolves an externally-named input into a literal string value.
///
/// Stateless: both collaborators are injected, and nothing is cached
/// between calls.
#[derive(Clone)]
pub struct VariableResolver {
    store: Arc<dyn DefinitionStore>,
    globals: Arc<dyn GlobalVariables>,
}

impl VariableResolver {
    pub fn new(store: Arc<dyn DefinitionStore>, globals: Arc<dyn GlobalVariables>) -> Self {
        Self { store, globals }
    }

    pub fn resolve(&self, source: ValueSource, name: &str) -> Result<String, EngineError> {
        match source {
            ValueSource::Literal => Ok(name.to_string()),
            ValueSource::GlobalVariable => self.globals.read(name),
            ValueSource::PersistentStorage => {
                let (scope, key) = parse_storage_token(name)?;
                self.store
                    .get(key, scope)?
                    .ok_or_else(|| EngineError::MissingValue { token: name.to_string() })
            }
        }
    }
}

/// Parse a `Context.Key` storage token. Exactly one separator is required,
/// and the context must be one of the recognized scope names.
fn parse_storage_token(token: &str) -> Result<(Scope, &str), EngineError> {
    let mut parts = token.split(TOKEN_SEPARATOR);
    let (context, key) = match (parts.next(), parts.next(), parts.next()) {
        (Some(context), Some(key), None) if !context.is_empty() && !key.is_empty() => {
            (context, key)
        }
        _ => {
            error!(token, "storage token must be `Context.Key`");
            return Err(EngineError::Format(format!(
                "storage token `{token}` must be `Context.Key`"
            )));
        }
    };
    let scope: Scope = context.parse().map_err(|e: String| {
        error!(token, "unrecognized storage context");
        EngineError::Format(e)
    })?;
    Ok((scope, key))
}
