// ─── InterfaceOficial Installer Core ───
// Resolves a game version through its inheritance chain and installs every
// file it needs into a local store.
//
// Architecture:
//   core/
//     version/    — Catalog fetch, version JSON model, platform rules, resolver
//     installer/  — Jar, libraries, assets; diagnosis and repair
//     downloader/ — Streaming downloads with SHA-1 verify-then-refetch
//     task        — Named, nested units of work with progress events
//     maven/      — Artifact coordinates → repository paths
//     store       — On-disk layout of the installation root
//     platform    — OS name, version and architecture
//     config      — Persisted installer settings
//     http, error — Shared HTTP client and error type

pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod installer;
pub mod maven;
pub mod platform;
pub mod store;
pub mod task;
pub mod version;
