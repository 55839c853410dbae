//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter       | Implements   | Connects to                        |
//! |---------------|--------------|------------------------------------|
//! | `config_file` | ConfigPort   | JSON file on the host              |
//! | `fs_store`    | FileStore    | host directory (SD card stand-in)  |
//! | `mem_store`   | FileStore    | in-memory map (tests, simulation)  |
//! | `log_sink`    | StatusSink   | serial log output                  |
//! | `sim_printer` | UartPort     | simulated motion controller        |
//! | `sim_uart`    | UartPort     | stdout / recording buffer          |
//! | `weight`      | WeightSensor | fixed load-cell reading            |

pub mod config_file;
pub mod fs_store;
pub mod log_sink;
pub mod mem_store;
pub mod sim_printer;
pub mod sim_uart;
pub mod weight;
