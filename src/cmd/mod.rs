//! CLI command implementations.
//!
//! | Module     | Commands handled            |
//! |------------|-----------------------------|
//! | `login`    | `Login`                     |
//! | `simulate` | `Simulate`                  |
//! | `config`   | `Config`                    |
//! | `attempt`  | shared attempt driver/output |

pub mod attempt;
pub mod config;
pub mod login;
pub mod simulate;

pub use config::cmd_config;
pub use login::cmd_login;
pub use simulate::cmd_simulate;
