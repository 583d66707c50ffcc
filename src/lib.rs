//! Resocket tools - companion library for the workspace binaries
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, logging, shutdown)
//! - **resocket**: Managed WebSocket connection (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use resocket_tools::bin_common::{init_tracing, load_config_from_env, ConfigType};
//! use resocket_tools::resocket::WebSocketConnection;
//! ```

// Re-export workspace libraries for convenience
pub use resocket;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod logging;
    pub mod shutdown;

    pub use cli::{
        endpoint_from_env, load_config_from_env, load_connection_options, parse_args, ConfigType,
    };
    pub use logging::init_tracing;
    pub use shutdown::ShutdownManager;
}
