//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled     |
//! |----------|----------------------|
//! | `serve`  | `Serve`, `InitDb`    |
//! | `seed`   | `Seed`               |
//! | `token`  | `Token`              |
//! | `config` | `Config`             |

pub mod config;
pub mod seed;
pub mod serve;
pub mod token;

pub use config::cmd_config;
pub use seed::cmd_seed;
pub use serve::{cmd_init_db, cmd_serve};
pub use token::cmd_token;
