//! notewa-gateway: Fonnte WhatsApp dispatcher and a dry-run stand-in

pub mod dry_run;
pub mod fonnte;
pub mod reply;

pub use dry_run::DryRunDispatcher;
pub use fonnte::{FonnteGateway, GatewayConfig, DEFAULT_BASE_URL};
pub use reply::GatewayReply;
