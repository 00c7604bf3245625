//! # Folio Architecture
//!
//! Folio is a small document store: every record is a JSON file, every
//! collection is a directory. There is no server, no index and no log; the
//! filesystem *is* the database, and anything that can read a directory of JSON
//! files can read a folio store.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs)                                     │
//! │  - Parses arguments, prints JSON, owns logging setup        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Driver (driver.rs)                                         │
//! │  - open / write / read / update / delete / read_all         │
//! │  - Name validation, collection locking, doctor              │
//! └─────────────────────────────────────────────────────────────┘
//!                   │                          │
//!                   ▼                          ▼
//! ┌───────────────────────────┐  ┌──────────────────────────────┐
//! │  Identity (identity.rs)   │  │  Storage (store/)            │
//! │  - ExplicitId             │  │  - atomic: tmp + rename      │
//! │  - AutoIncrement          │  │  - locks: one per collection │
//! └───────────────────────────┘  └──────────────────────────────┘
//! ```
//!
//! ## Key Principle: Never a Torn Record
//!
//! A record file is only ever replaced by renaming a fully written temp file
//! over it. Readers therefore see the old record or the new one, and a crash
//! mid-write leaves at worst a stray `*.tmp` file, which
//! [`Driver::doctor`](driver::Driver::doctor) cleans up.
//!
//! ## Module Overview
//!
//! - [`driver`]: the store API
//! - [`identity`]: how record ids are chosen
//! - [`store`]: atomic file writer and lock registry
//! - [`model`]: `Record`, `Envelope`, the `Identified` trait
//! - [`config`]: `folio.json` store configuration
//! - [`error`]: error types

pub mod config;
pub mod driver;
pub mod error;
pub mod identity;
pub mod model;
pub mod store;

pub use driver::{AutoDriver, Driver, KeyedDriver};
pub use error::{FolioError, Result};
pub use model::{Envelope, Identified, Record};
