// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (access token + profile + organization context)
//
// Root-level endpoints (service descriptor, health) live in `root`.
pub mod protected; // Access token required (/api/*)
pub mod public; // No authentication required (/auth/*)
pub mod root; // Service descriptor and health (/, /health)
