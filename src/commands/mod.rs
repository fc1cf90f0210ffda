// Frontend-facing commands
//
// Thin async wrappers over the shared state. They return serialisable
// responses and stringify errors so any UI bridge can forward them as-is.

pub mod logs;
pub mod metrics;
pub mod paywall;
