//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements   | Connects to                    |
//! |----------------|--------------|--------------------------------|
//! | `environment`  | Environment  | In-memory simulated host       |
//! | `log_sink`     | EventSink    | `log` facade                   |
//! | `store`        | ConfigPort   | In-memory postcard / JSON file |
//! | `time`         | Clock        | Host local time                |

pub mod environment;
pub mod log_sink;
pub mod store;
pub mod time;
