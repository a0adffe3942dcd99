// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Session acquisition endpoints. These are the only routes outside /api/*
// and the health checks that are served without an access token.
//
// Route Prefix: /auth/*
// Middleware: none beyond CORS and tracing
pub mod auth;
