//! # CLI Module
//!
//! ## Commands
//!
//! ### `generate`
//!
//! Generate into a new directory and record the configuration there:
//!
//! ```bash
//! clientgen generate --output src/generated/secretmanager \
//!     --language rust \
//!     --specification-format protobuf \
//!     --specification-source google/cloud/secretmanager/v1 \
//!     --service-config google/cloud/secretmanager/v1/secretmanager_v1.yaml \
//!     --source descriptor-set=protos.binpb
//! ```
//!
//! Anything left out is inherited from `.clientgen.toml` in the project root.
//!
//! ### `refresh`
//!
//! Regenerate one directory from its `.clientgen.toml`:
//!
//! ```bash
//! clientgen refresh src/generated/secretmanager
//! ```
//!
//! ### `refresh-all`
//!
//! Regenerate every configured directory below the project root, reporting
//! all failures at the end:
//!
//! ```bash
//! clientgen refresh-all --jobs 8 --dry-run
//! ```

mod commands;


pub use commands::{execute, run_cli, Cli, Commands};
