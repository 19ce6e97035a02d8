//! Chat platform integration for guildkeeper.
//!
//! - **Gateway** (`gateway`) - event stream pump with reconnection and a readiness signal
//! - **Events** (`events`) - platform event model and the dispatcher that routes it
//! - **Commands** (`commands`) - slash-command parsing, permission checks and routing
//! - **Messages** (`messages`) - embed builder and shared reply templates
//! - **Platform** (`platform`) - outbound operations against the host platform
//!
//! ```text
//! GatewayTransport → GatewayRunner → EventDispatcher → Handlers → server services
//!                                                          ↓
//!                                   ChatPlatform  ←  OutgoingMessage
//! ```

pub mod commands;
pub mod events;
pub mod gateway;
pub mod messages;
pub mod platform;

pub use commands::{BotCommand, CommandContext, CommandService, Permission, SlashCommandPayload};
pub use events::{ChatEnvelope, ChatEvent, EventContext, EventDispatcher};
pub use gateway::{GatewayRunner, GatewayTransport, NoopGatewayTransport, ReconnectPolicy};
pub use messages::{MessageBuilder, OutgoingMessage};
pub use platform::{ChatPlatform, LoggingPlatform, PlatformError};
