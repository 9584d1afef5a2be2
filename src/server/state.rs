//! Server state management.

use crate::config::ServerConfig;
use crate::database::ConnectionManager;
use crate::error::{McpError, Result};
use crate::protocol::Implementation;
use crate::security::{LimitPolicy, QueryValidator};
use crate::tools::ToolRegistry;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Immutable per-process state shared by every request.
pub struct ServerState {
    pub config: ServerConfig,
    pub connection_manager: Arc<ConnectionManager>,
    pub tools: ToolRegistry,
    initialized: AtomicBool,
    client_info: RwLock<Option<Implementation>>,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        connection_manager: Arc<ConnectionManager>,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            config,
            connection_manager,
            tools,
            initialized: AtomicBool::new(false),
            client_info: RwLock::new(None),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn set_initialized(&self, client_info: Implementation) {
        *self.client_info.write() = Some(client_info);
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn client_info(&self) -> Option<Implementation> {
        self.client_info.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_manager.is_connected()
    }
}

pub struct ServerStateBuilder {
    config: Option<ServerConfig>,
    connection_manager: Option<Arc<ConnectionManager>>,
    validator: QueryValidator,
}

impl ServerStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            connection_manager: None,
            validator: QueryValidator::default(),
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an existing manager instead of one built from the config.
    pub fn connection_manager(mut self, connection_manager: Arc<ConnectionManager>) -> Self {
        self.connection_manager = Some(connection_manager);
        self
    }

    pub fn validator(mut self, validator: QueryValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn build(self) -> Result<ServerState> {
        let config = self.config.ok_or_else(|| McpError::Internal {
            message: "Config is required".into(),
        })?;

        let connection_manager = self
            .connection_manager
            .unwrap_or_else(|| Arc::new(ConnectionManager::new(config.database.clone())));

        let tools = crate::tools::create_registry(
            Arc::clone(&connection_manager),
            self.validator,
            LimitPolicy::new(config.limits),
        );

        Ok(ServerState::new(config, connection_manager, tools))
    }
}

impl Default for ServerStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_config() {
        assert!(ServerStateBuilder::new().build().is_err());
    }

    #[test]
    fn test_builder_registers_tools_without_connecting() {
        let state = ServerStateBuilder::new()
            .config(ServerConfig::default())
            .build()
            .unwrap();

        assert_eq!(state.tools.len(), 7);
        assert!(!state.is_connected());
        assert!(!state.is_initialized());
    }
}
