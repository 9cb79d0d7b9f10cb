pub mod client;
pub mod crd;
pub mod logging;
pub mod output;
pub mod settings;
pub mod state;
pub mod util;
